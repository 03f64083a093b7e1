// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the streaming API.
//!
//! Handles GET /stream/status/{job_id}, POST /stream/cancel/{job_id},
//! GET /stream/subscribe/{job_id}, POST /stream/start, and GET /health.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use relay_core::types::ConversationMessage;
use relay_core::{
    AdapterType, ConversationId, EntryId, HealthStatus, JobId, JobMetadata, JobStatus,
    PluginAdapter, RelayError,
};
use relay_stream::JobSpec;

use crate::error::ApiError;
use crate::server::GatewayState;
use crate::sse;
use crate::subscription::{self, DeliverySettings};

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error description.
    pub error: String,
}

/// Query string for GET /stream/subscribe/{job_id}.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeQuery {
    /// Deliver entries strictly after this cursor. Defaults to the start.
    #[serde(default)]
    pub from_id: Option<String>,
    /// Read the stored history once instead of tailing the log.
    #[serde(default)]
    pub replay: bool,
}

/// Response body for POST /stream/cancel/{job_id}.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub job_id: JobId,
    pub cancellation_requested: bool,
}

/// Request body for POST /stream/start.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub conversation_id: String,
    /// Text of the user message that triggers the job.
    pub content: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Caller-chosen job id; a random one is generated when absent.
    #[serde(default)]
    pub job_id: Option<String>,
}

/// Response body for POST /stream/start.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    pub job_id: JobId,
    pub conversation_id: ConversationId,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" when every adapter is healthy, otherwise "degraded".
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub adapters: Vec<AdapterHealth>,
}

/// Health of one adapter.
#[derive(Debug, Serialize)]
pub struct AdapterHealth {
    pub name: String,
    pub kind: AdapterType,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

async fn require_job(state: &GatewayState, job_id: &JobId) -> Result<JobMetadata, ApiError> {
    state.jobs.get(job_id).await?.ok_or_else(|| {
        ApiError::from(RelayError::NotFound {
            kind: "job",
            id: job_id.to_string(),
        })
    })
}

/// GET /stream/status/{job_id}
pub async fn get_status(
    State(state): State<GatewayState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobMetadata>, ApiError> {
    let job_id = JobId(job_id);
    Ok(Json(require_job(&state, &job_id).await?))
}

/// POST /stream/cancel/{job_id}
///
/// Sets the cancellation flag; the producer observes it on its next poll.
pub async fn post_cancel(
    State(state): State<GatewayState>,
    Path(job_id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    let job_id = JobId(job_id);
    let meta = require_job(&state, &job_id).await?;
    let not_streaming =
        |status: JobStatus| ApiError::bad_request(format!("job {job_id} is not streaming ({status})"));

    if meta.status != JobStatus::Streaming {
        return Err(not_streaming(meta.status));
    }
    if !state.jobs.request_cancellation(&job_id).await? {
        // Finished between the status read and the request.
        let status = state
            .jobs
            .get(&job_id)
            .await?
            .map_or(JobStatus::Completed, |m| m.status);
        return Err(not_streaming(status));
    }

    info!(job_id = %job_id, "cancellation requested");
    Ok(Json(CancelResponse {
        job_id,
        cancellation_requested: true,
    }))
}

/// GET /stream/subscribe/{job_id}?fromId=<cursor>&replay=<bool>
///
/// Validation failures are answered synchronously; once the event stream is
/// open, problems are reported as an `error` event.
pub async fn get_subscribe(
    State(state): State<GatewayState>,
    Path(job_id): Path<String>,
    Query(query): Query<SubscribeQuery>,
) -> Result<Response, ApiError> {
    let job_id = JobId(job_id);
    let from = match query.from_id.as_deref() {
        Some(cursor) => cursor.parse::<EntryId>()?,
        None => EntryId::ZERO,
    };
    let meta = require_job(&state, &job_id).await?;

    if !query.replay && meta.status.is_terminal() {
        return Err(ApiError::bad_request(format!(
            "job {job_id} has already finished ({}); retry with replay=true to read its history",
            meta.status
        )));
    }

    debug!(job_id = %job_id, from = %from, replay = query.replay, "subscriber attached");
    let events = if query.replay {
        subscription::replay(state.log.clone(), job_id.clone(), from).boxed()
    } else {
        subscription::live(
            state.log.clone(),
            state.jobs.clone(),
            job_id.clone(),
            from,
            meta,
            DeliverySettings::from(&state.subscribe),
            state.shutdown.clone(),
        )
        .boxed()
    };
    Ok(sse::response(job_id, events, state.subscribe.keep_alive()))
}

/// POST /stream/start
///
/// Appends the user message to the stored history and starts a producer.
/// Replies 202 once the job is streaming.
pub async fn post_start(
    State(state): State<GatewayState>,
    Json(body): Json<StartRequest>,
) -> Result<Response, ApiError> {
    let Some(runner) = state.runner.as_ref() else {
        return Err(ApiError::unavailable("no generation provider is configured"));
    };
    if body.content.trim().is_empty() {
        return Err(ApiError::bad_request("content must not be empty"));
    }

    let conversation_id = ConversationId(body.conversation_id);
    let mut history = state
        .conversations
        .find_by_id(&conversation_id)
        .await?
        .map(|c| c.messages)
        .unwrap_or_default();
    history.push(ConversationMessage::user(
        uuid::Uuid::new_v4().to_string(),
        body.content,
    ));

    let spec = JobSpec {
        job_id: body.job_id.map(JobId).unwrap_or_else(JobId::generate),
        conversation_id: conversation_id.clone(),
        model: body.model.unwrap_or_else(|| state.default_model.clone()),
        history,
    };
    let job_id = runner.start(spec).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(StartResponse {
            job_id,
            conversation_id,
        }),
    )
        .into_response())
}

fn adapter_health(
    name: &str,
    kind: AdapterType,
    result: Result<HealthStatus, RelayError>,
) -> AdapterHealth {
    let (status, detail) = match result {
        Ok(HealthStatus::Healthy) => ("healthy", None),
        Ok(HealthStatus::Degraded(d)) => ("degraded", Some(d)),
        Ok(HealthStatus::Unhealthy(d)) => ("unhealthy", Some(d)),
        Err(e) => ("unhealthy", Some(e.to_string())),
    };
    AdapterHealth {
        name: name.to_string(),
        kind,
        status: status.to_string(),
        detail,
    }
}

/// GET /health
///
/// Runs every adapter's health check. Replies 503 if any adapter is unhealthy.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let mut adapters = vec![
        adapter_health(
            state.log.name(),
            state.log.adapter_type(),
            state.log.health_check().await,
        ),
        adapter_health(
            state.jobs.name(),
            state.jobs.adapter_type(),
            state.jobs.health_check().await,
        ),
        adapter_health(
            state.conversations.name(),
            state.conversations.adapter_type(),
            state.conversations.health_check().await,
        ),
    ];
    if let Some(provider) = &state.provider {
        adapters.push(adapter_health(
            provider.name(),
            provider.adapter_type(),
            provider.health_check().await,
        ));
    }

    let all_healthy = adapters.iter().all(|a| a.status == "healthy");
    let any_unhealthy = adapters.iter().any(|a| a.status == "unhealthy");
    let body = HealthResponse {
        status: if all_healthy { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        adapters,
    };
    let code = if any_unhealthy {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (code, Json(body)).into_response()
}
