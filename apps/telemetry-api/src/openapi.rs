use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;
use utoipa::OpenApi;

use crate::config::DEFAULT_API_PREFIX;
use crate::error::ErrorBody;
use crate::routes::{electrical, health, ingest, physical, root};
use crate::services::telemetry::types::{
    GroupedHistoricalData, HistoricalDataPoint, IngestEvent, PhaseData, PhysicalVariableValue,
    RealtimeElectricalData, RealtimePhysicalData, SeverityLevel, VariableValue,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Installation Telemetry API",
        description = "Realtime snapshots, historical series and ingestion for monitored installations."
    ),
    paths(
        root::welcome,
        health::healthz_handler,
        electrical::realtime_electrical,
        electrical::historical_electrical,
        physical::realtime_physical,
        physical::historical_physical,
        ingest::ingest_event
    ),
    components(schemas(
        ErrorBody,
        health::HealthResponse,
        root::WelcomeResponse,
        ingest::IngestAccepted,
        SeverityLevel,
        VariableValue,
        PhaseData,
        RealtimeElectricalData,
        PhysicalVariableValue,
        RealtimePhysicalData,
        HistoricalDataPoint,
        GroupedHistoricalData,
        IngestEvent
    )),
    tags(
        (name = "electrical", description = "Electrical measurements"),
        (name = "physical", description = "Environmental measurements"),
        (name = "ingest", description = "Telemetry ingestion"),
        (name = "meta", description = "Service metadata")
    )
)]
pub struct ApiDoc;

pub fn openapi_json() -> Value {
    serde_json::to_value(ApiDoc::openapi()).unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed to serialize openapi document");
        Value::Null
    })
}

/// The document with data paths moved from the default prefix to `prefix`.
/// Root and health paths are served outside the prefix and stay put.
pub fn openapi_json_for_prefix(prefix: &str) -> Value {
    let mut doc = openapi_json();
    if prefix == DEFAULT_API_PREFIX {
        return doc;
    }
    if let Some(paths) = doc.get_mut("paths").and_then(Value::as_object_mut) {
        let moved = std::mem::take(paths)
            .into_iter()
            .map(|(path, item)| match path.strip_prefix(DEFAULT_API_PREFIX) {
                Some(rest) if rest.starts_with('/') => (format!("{prefix}{rest}"), item),
                _ => (path, item),
            })
            .collect();
        *paths = moved;
    }
    doc
}

async fn openapi_handler(State(state): State<AppState>) -> Json<Value> {
    Json(openapi_json_for_prefix(&state.config.api_prefix))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_handler))
}
