// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events framing for subscriptions.
//!
//! SSE event format:
//! ```text
//! event: metadata
//! data: {"jobId":"...","status":"streaming",...}
//!
//! event: entry
//! id: 1700000000000-0
//! data: {"id":"1700000000000-0","type":"chunk","timestamp":1700000000000,"data":"Hel"}
//!
//! event: done
//! data: {"jobId":"..."}
//! ```

use std::time::Duration;

use axum::http::header::{CACHE_CONTROL, CONNECTION};
use axum::http::HeaderValue;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use serde_json::json;

use relay_core::JobId;

use crate::subscription::SubscriptionEvent;

/// Convert one subscription event to an SSE frame.
pub fn to_event(job_id: &JobId, event: SubscriptionEvent) -> Result<Event, axum::Error> {
    match event {
        SubscriptionEvent::Metadata(meta) => Event::default().event("metadata").json_data(meta),
        SubscriptionEvent::Entry(entry) => Event::default()
            .event("entry")
            .id(entry.id.to_string())
            .json_data(entry),
        SubscriptionEvent::Done => Event::default()
            .event("done")
            .json_data(json!({ "jobId": job_id })),
        SubscriptionEvent::Error(message) => Event::default()
            .event("error")
            .json_data(json!({ "error": message })),
    }
}

/// Wrap a subscription stream in an SSE response with keep-alive comments.
pub fn response<S>(job_id: JobId, events: S, keep_alive: Duration) -> Response
where
    S: Stream<Item = SubscriptionEvent> + Send + 'static,
{
    let frames = events.map(move |event| to_event(&job_id, event));
    let mut response = Sse::new(frames)
        .keep_alive(KeepAlive::new().interval(keep_alive))
        .into_response();

    let headers = response.headers_mut();
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    response
}
