use chrono::{DateTime, Utc};

use crate::error::{AppError, AppResult};
use crate::services::telemetry::types::{Domain, GroupedHistoricalData};
use crate::services::telemetry::TelemetryService;

#[derive(Debug, Clone, serde::Deserialize, utoipa::IntoParams)]
pub(crate) struct HistoricalRange {
    /// Window start (RFC3339, inclusive).
    start_time: DateTime<Utc>,
    /// Window end (RFC3339, exclusive).
    end_time: DateTime<Utc>,
}

pub(crate) async fn grouped_history(
    telemetry: &TelemetryService,
    domain: Domain,
    installation_id: &str,
    range: HistoricalRange,
) -> AppResult<GroupedHistoricalData> {
    if range.start_time >= range.end_time {
        return Err(AppError::bad_request("End time must be after start time"));
    }
    telemetry
        .historical(domain, installation_id, range.start_time, range.end_time)
        .await
        .ok_or_else(|| {
            let label = match domain {
                Domain::Electrical => "Electrical",
                Domain::Physical => "Physical",
            };
            AppError::not_found(format!(
                "{label} historical data not found for the specified criteria"
            ))
        })
}
