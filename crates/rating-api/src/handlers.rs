use crate::{ApiResult, AppState};
use axum::{body::Bytes, extract::State, Json};
use rating_core::DeltaPayload;
use rating_graph::BatchReport;
use serde::Serialize;
use tracing::debug;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Accepts a delta notification whatever its content type. An empty body is
/// an empty batch.
pub async fn receive_delta(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<BatchReport>> {
    debug!(payload = %String::from_utf8_lossy(&body), "Received delta");

    let payload = if body.iter().all(u8::is_ascii_whitespace) {
        DeltaPayload::ChangeSets(Vec::new())
    } else {
        DeltaPayload::from_slice(&body)?
    };

    let report = state.pipeline.process(&payload.into_batch()).await;
    Ok(Json(report))
}
