// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway routes driven through the axum router with in-memory stores.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use relay_config::model::ServerConfig;
use relay_core::{
    ConversationId, EventLog, GenerationProvider, JobId, JobStatus, JobStore, NewEntry,
};
use relay_gateway::{router, start_server, GatewayState};
use relay_test_utils::{MockProvider, TestHarness};

fn state(harness: &TestHarness, with_runner: bool) -> GatewayState {
    GatewayState {
        log: harness.log.clone(),
        jobs: harness.jobs.clone(),
        conversations: harness.conversations.clone(),
        runner: with_runner.then(|| harness.runner.clone()),
        provider: Some(harness.provider.clone() as Arc<dyn GenerationProvider>),
        subscribe: harness.config.subscribe.clone(),
        default_model: harness.config.generation.default_model.clone(),
        start_time: Instant::now(),
        shutdown: CancellationToken::new(),
    }
}

fn app(harness: &TestHarness) -> Router {
    router(state(harness, true))
}

async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, String) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

/// Parse an SSE body into `(event, data)` pairs, skipping keep-alive comments.
fn frames(body: &str) -> Vec<(String, Value)> {
    body.split("\n\n")
        .filter_map(|frame| {
            let mut event = None;
            let mut data = None;
            for line in frame.lines() {
                if let Some(v) = line.strip_prefix("event: ") {
                    event = Some(v.to_string());
                } else if let Some(v) = line.strip_prefix("data: ") {
                    data = serde_json::from_str(v).ok();
                }
            }
            Some((event?, data?))
        })
        .collect()
}

async fn wait_status(harness: &TestHarness, job: &JobId, status: JobStatus) {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        if harness.jobs.get(job).await.unwrap().is_some_and(|m| m.status == status) {
            return;
        }
        assert!(Instant::now() < deadline, "job {job} never reached {status}");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

#[tokio::test]
async fn status_of_unknown_job_is_404() {
    let harness = TestHarness::new();
    let (status, body) = send(app(&harness), "GET", "/stream/status/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert!(body["error"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn start_then_live_subscribe_streams_to_done() {
    let harness = TestHarness::new();
    let (status, body) = send(
        app(&harness),
        "POST",
        "/stream/start",
        Some(json!({ "conversationId": "c1", "content": "hi", "jobId": "j1" })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["jobId"], "j1");

    let (status, body) = send(app(&harness), "GET", "/stream/subscribe/j1", None).await;
    if status == StatusCode::BAD_REQUEST {
        // The job finished before the subscriber arrived; replay covers it.
        let (status, body) =
            send(app(&harness), "GET", "/stream/subscribe/j1?replay=true", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(frames(&body).last().unwrap().0, "done");
    } else {
        assert_eq!(status, StatusCode::OK);
        let frames = frames(&body);
        assert_eq!(frames[0].0, "metadata");
        assert_eq!(frames.last().unwrap().0, "done");
        let text: String = frames
            .iter()
            .filter(|(event, data)| event == "entry" && data["type"] == "chunk")
            .map(|(_, data)| data["data"].as_str().unwrap())
            .collect();
        assert_eq!(text, "Hello, world");
    }

    wait_status(&harness, &JobId::from("j1"), JobStatus::Completed).await;
    let stored = harness.conversations.messages(&ConversationId::from("c1")).await;
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].content, "Hello, world");
}

#[tokio::test]
async fn live_subscribe_from_cursor_skips_earlier_entries() {
    let harness = TestHarness::builder()
        .with_provider(MockProvider::new(["a", "b", "c"]).gated())
        .build();
    send(
        app(&harness),
        "POST",
        "/stream/start",
        Some(json!({ "conversationId": "c1", "content": "hi", "jobId": "j1" })),
    )
    .await;
    let job = JobId::from("j1");
    harness.provider.release(1);
    while harness.log.read_all(&job).await.unwrap().is_empty() {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    let first = harness.log.read_all(&job).await.unwrap()[0].id;

    let uri = format!("/stream/subscribe/j1?fromId={first}");
    let ((status, body), ()) = tokio::join!(send(app(&harness), "GET", &uri, None), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        harness.provider.release(2);
    });
    assert_eq!(status, StatusCode::OK);
    let chunks: Vec<_> = frames(&body)
        .into_iter()
        .filter(|(event, data)| event == "entry" && data["type"] == "chunk")
        .map(|(_, data)| data["data"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(chunks, ["b", "c"]);
}

#[tokio::test]
async fn second_start_for_running_job_is_409() {
    let harness = TestHarness::builder()
        .with_provider(MockProvider::new(["a"]).gated())
        .build();
    let start = json!({ "conversationId": "c1", "content": "hi", "jobId": "j1" });

    let (status, _) = send(app(&harness), "POST", "/stream/start", Some(start.clone())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let (status, _) = send(app(&harness), "POST", "/stream/start", Some(start)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    harness.provider.release(1);
}

#[tokio::test]
async fn start_without_runner_is_503() {
    let harness = TestHarness::new();
    let app = router(state(&harness, false));
    let (status, _) = send(
        app,
        "POST",
        "/stream/start",
        Some(json!({ "conversationId": "c1", "content": "hi" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn start_with_blank_content_is_400() {
    let harness = TestHarness::new();
    let (status, _) = send(
        app(&harness),
        "POST",
        "/stream/start",
        Some(json!({ "conversationId": "c1", "content": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn live_subscribe_to_finished_job_points_to_replay() {
    let harness = TestHarness::new();
    harness
        .writer
        .run(harness.spec("j1", "c1", "q"), harness.provider.clone())
        .await
        .unwrap();

    let (status, body) = send(app(&harness), "GET", "/stream/subscribe/j1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("replay=true"));
}

#[tokio::test]
async fn replay_is_repeatable() {
    let harness = TestHarness::new();
    harness
        .writer
        .run(harness.spec("j1", "c1", "q"), harness.provider.clone())
        .await
        .unwrap();

    let (status, first) =
        send(app(&harness), "GET", "/stream/subscribe/j1?replay=true", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = send(app(&harness), "GET", "/stream/subscribe/j1?replay=true", None).await;
    assert_eq!(frames(&first), frames(&second));

    let events: Vec<_> = frames(&first).into_iter().map(|(event, _)| event).collect();
    assert_eq!(events.last().map(String::as_str), Some("done"));
    assert!(!events.contains(&"metadata".to_string()));
}

#[tokio::test]
async fn malformed_cursor_is_400() {
    let harness = TestHarness::new();
    harness
        .jobs
        .initialize(&JobId::from("j1"), &ConversationId::from("c1"), "m")
        .await
        .unwrap();
    let (status, body) =
        send(app(&harness), "GET", "/stream/subscribe/j1?fromId=12-x", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("12-x"));
}

#[tokio::test]
async fn subscribe_to_unknown_job_is_404() {
    let harness = TestHarness::new();
    let (status, _) =
        send(app(&harness), "GET", "/stream/subscribe/ghost?replay=true", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_streaming_job_then_cancel_again() {
    let harness = TestHarness::builder()
        .with_provider(MockProvider::new(["a", "b", "c"]).gated())
        .build();
    send(
        app(&harness),
        "POST",
        "/stream/start",
        Some(json!({ "conversationId": "c1", "content": "hi", "jobId": "j1" })),
    )
    .await;

    let (status, body) = send(app(&harness), "POST", "/stream/cancel/j1", None).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["cancellationRequested"], true);

    let job = JobId::from("j1");
    wait_status(&harness, &job, JobStatus::Cancelled).await;

    let (status, body) = send(app(&harness), "POST", "/stream/cancel/j1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("not streaming"));

    let (status, _) = send(app(&harness), "POST", "/stream/cancel/ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_reports_metadata_fields() {
    let harness = TestHarness::new();
    let job = JobId::from("j1");
    harness
        .jobs
        .initialize(&job, &ConversationId::from("c1"), "m")
        .await
        .unwrap();
    harness.jobs.increment_chunk_count(&job).await.unwrap();
    harness.log.append(&job, NewEntry::chunk("x")).await.unwrap();

    let (status, body) = send(app(&harness), "GET", "/stream/status/j1", None).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "streaming");
    assert_eq!(body["conversationId"], "c1");
    assert_eq!(body["chunkCount"], 1);
}

#[tokio::test]
async fn health_lists_every_adapter() {
    let harness = TestHarness::new();
    let (status, body) = send(app(&harness), "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["adapters"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn shutdown_closes_live_subscription_to_running_job() {
    let harness = TestHarness::builder()
        .with_provider(MockProvider::new(["a", "b"]).gated())
        .build();
    let state = state(&harness, true);
    let shutdown = state.shutdown.clone();
    let app = router(state);
    let job = harness
        .runner
        .start(harness.spec("j1", "c1", "q"))
        .await
        .unwrap();

    let ((status, body), ()) = tokio::time::timeout(
        Duration::from_secs(3),
        async {
            let uri = format!("/stream/subscribe/{job}");
            tokio::join!(send(app, "GET", &uri, None), async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                shutdown.cancel();
            })
        },
    )
    .await
    .expect("subscription should close on shutdown");
    assert_eq!(status, StatusCode::OK);
    let frames = frames(&body);
    assert_eq!(frames.first().unwrap().0, "metadata");
    assert_eq!(frames.last().unwrap().0, "done");

    // The producer is gated and still running.
    assert_eq!(
        harness.jobs.get(&job).await.unwrap().unwrap().status,
        JobStatus::Streaming
    );
}

#[tokio::test]
async fn server_stops_promptly_with_a_subscriber_attached() {
    let harness = TestHarness::builder()
        .with_provider(MockProvider::new(["a"]).gated())
        .build();
    let job = harness
        .runner
        .start(harness.spec("j1", "c1", "q"))
        .await
        .unwrap();

    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let config = ServerConfig {
        host: "127.0.0.1".into(),
        port,
        ..ServerConfig::default()
    };
    let state = state(&harness, true);
    let shutdown = state.shutdown.clone();
    let server = tokio::spawn(async move { start_server(&config, state).await });

    let deadline = Instant::now() + Duration::from_secs(2);
    let mut conn = loop {
        match tokio::net::TcpStream::connect(("127.0.0.1", port)).await {
            Ok(conn) => break conn,
            Err(e) => {
                assert!(Instant::now() < deadline, "server never accepted: {e}");
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    };
    conn.write_all(
        format!("GET /stream/subscribe/{job} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes(),
    )
    .await
    .unwrap();
    let mut buf = vec![0u8; 4096];
    let n = conn.read(&mut buf).await.unwrap();
    assert!(String::from_utf8_lossy(&buf[..n]).contains("text/event-stream"));

    shutdown.cancel();
    let stopped = tokio::time::timeout(Duration::from_secs(3), server).await;
    assert!(matches!(stopped, Ok(Ok(Ok(())))), "server did not stop: {stopped:?}");
}
