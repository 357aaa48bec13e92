use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use super::historical::{grouped_history, HistoricalRange};
use crate::error::{AppError, AppResult};
use crate::services::telemetry::types::{Domain, GroupedHistoricalData, RealtimeElectricalData};
use crate::services::telemetry::TelemetryService;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/installations/{installation_id}/electrical/realtime",
    tag = "electrical",
    params(("installation_id" = String, Path, description = "Installation id")),
    responses(
        (status = 200, description = "Latest electrical snapshot", body = RealtimeElectricalData),
        (status = 404, description = "No recent electrical data", body = crate::error::ErrorBody)
    )
)]
pub(crate) async fn realtime_electrical(
    State(telemetry): State<Arc<TelemetryService>>,
    Path(installation_id): Path<String>,
) -> AppResult<Json<RealtimeElectricalData>> {
    telemetry
        .realtime_electrical(&installation_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("Electrical realtime data not found"))
}

#[utoipa::path(
    get,
    path = "/api/v1/installations/{installation_id}/electrical/historical",
    tag = "electrical",
    params(
        ("installation_id" = String, Path, description = "Installation id"),
        HistoricalRange
    ),
    responses(
        (status = 200, description = "Electrical series for the window", body = GroupedHistoricalData),
        (status = 400, description = "Invalid time window", body = crate::error::ErrorBody),
        (status = 404, description = "No electrical data in the window", body = crate::error::ErrorBody)
    )
)]
pub(crate) async fn historical_electrical(
    State(telemetry): State<Arc<TelemetryService>>,
    Path(installation_id): Path<String>,
    Query(range): Query<HistoricalRange>,
) -> AppResult<Json<GroupedHistoricalData>> {
    grouped_history(&telemetry, Domain::Electrical, &installation_id, range)
        .await
        .map(Json)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/installations/{installation_id}/electrical/realtime",
            get(realtime_electrical),
        )
        .route(
            "/installations/{installation_id}/electrical/historical",
            get(historical_electrical),
        )
}
