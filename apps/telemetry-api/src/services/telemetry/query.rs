use chrono::{DateTime, Duration, Utc};

use super::types::Domain;

pub const INSTALLATION_TAG: &str = "installation_id";
pub const DEFAULT_REALTIME_LOOKBACK_SECONDS: i64 = 5 * 60;
pub const MAX_REALTIME_LOOKBACK_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Half-open time window: `start` inclusive, `end` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.start && time < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Only the most recent record per (measurement, field).
    Latest,
    /// Every matching record, time ordered.
    Range,
}

/// Declarative range query handed to the store. Building one does no I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub bucket: String,
    pub measurements: Vec<String>,
    pub installation_id: String,
    pub range: TimeRange,
    pub mode: QueryMode,
}

#[derive(Debug, Clone)]
pub struct QueryPlanner {
    bucket: String,
    realtime_lookback: Duration,
}

impl QueryPlanner {
    pub fn new(bucket: impl Into<String>, realtime_lookback: Duration) -> Self {
        Self {
            bucket: bucket.into(),
            realtime_lookback,
        }
    }

    /// Latest-value query over the recent lookback window ending at `now`.
    pub fn latest(&self, domain: Domain, installation_id: &str, now: DateTime<Utc>) -> QuerySpec {
        // `now` itself belongs to the window, so the exclusive bound sits just past it.
        let range = TimeRange {
            start: now
                .checked_sub_signed(self.realtime_lookback)
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            end: now
                .checked_add_signed(Duration::microseconds(1))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        self.spec(domain, installation_id, range, QueryMode::Latest)
    }

    /// Full scan of `[start, end)`. Callers reject `start >= end` beforehand.
    pub fn range(
        &self,
        domain: Domain,
        installation_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> QuerySpec {
        self.spec(
            domain,
            installation_id,
            TimeRange { start, end },
            QueryMode::Range,
        )
    }

    fn spec(
        &self,
        domain: Domain,
        installation_id: &str,
        range: TimeRange,
        mode: QueryMode,
    ) -> QuerySpec {
        QuerySpec {
            bucket: self.bucket.clone(),
            measurements: domain
                .measurements()
                .iter()
                .map(|measurement| measurement.to_string())
                .collect(),
            installation_id: installation_id.to_string(),
            range,
            mode,
        }
    }
}
