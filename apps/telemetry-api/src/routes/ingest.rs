use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::services::telemetry::types::IngestEvent;
use crate::services::telemetry::{TelemetryService, WriteError};
use crate::state::AppState;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
pub struct IngestAccepted {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/installations/{installation_id}/ingest",
    tag = "ingest",
    params(("installation_id" = String, Path, description = "Installation id")),
    request_body = IngestEvent,
    responses(
        (status = 202, description = "Event stored", body = IngestAccepted),
        (status = 400, description = "Invalid event", body = crate::error::ErrorBody),
        (status = 500, description = "Store write failed", body = crate::error::ErrorBody)
    )
)]
pub(crate) async fn ingest_event(
    State(telemetry): State<Arc<TelemetryService>>,
    Path(installation_id): Path<String>,
    Json(event): Json<IngestEvent>,
) -> AppResult<(StatusCode, Json<IngestAccepted>)> {
    match telemetry.write_event(&installation_id, &event).await {
        Ok(()) => Ok((
            StatusCode::ACCEPTED,
            Json(IngestAccepted {
                message: "Data accepted".to_string(),
            }),
        )),
        Err(WriteError::Invalid(err)) => Err(AppError::bad_request(err.to_string())),
        Err(WriteError::Store(_)) => Err(AppError::internal(
            "Failed to write data to the database.",
        )),
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/installations/{installation_id}/ingest", post(ingest_event))
}
