use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use super::historical::{grouped_history, HistoricalRange};
use crate::error::{AppError, AppResult};
use crate::services::telemetry::types::{Domain, GroupedHistoricalData, RealtimePhysicalData};
use crate::services::telemetry::TelemetryService;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/installations/{installation_id}/physical/realtime",
    tag = "physical",
    params(("installation_id" = String, Path, description = "Installation id")),
    responses(
        (status = 200, description = "Latest physical snapshot", body = RealtimePhysicalData),
        (status = 404, description = "No recent physical data", body = crate::error::ErrorBody)
    )
)]
pub(crate) async fn realtime_physical(
    State(telemetry): State<Arc<TelemetryService>>,
    Path(installation_id): Path<String>,
) -> AppResult<Json<RealtimePhysicalData>> {
    telemetry
        .realtime_physical(&installation_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Physical realtime data not found"))
}

#[utoipa::path(
    get,
    path = "/api/v1/installations/{installation_id}/physical/historical",
    tag = "physical",
    params(
        ("installation_id" = String, Path, description = "Installation id"),
        HistoricalRange
    ),
    responses(
        (status = 200, description = "Physical series for the window", body = GroupedHistoricalData),
        (status = 400, description = "Invalid time window", body = crate::error::ErrorBody),
        (status = 404, description = "No physical data in the window", body = crate::error::ErrorBody)
    )
)]
pub(crate) async fn historical_physical(
    State(telemetry): State<Arc<TelemetryService>>,
    Path(installation_id): Path<String>,
    Query(range): Query<HistoricalRange>,
) -> AppResult<Json<GroupedHistoricalData>> {
    grouped_history(&telemetry, Domain::Physical, &installation_id, range)
        .await
        .map(Json)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/installations/{installation_id}/physical/realtime",
            get(realtime_physical),
        )
        .route(
            "/installations/{installation_id}/physical/historical",
            get(historical_physical),
        )
}
