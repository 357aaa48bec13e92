use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ApiConfig, StoreKind};
use crate::services::telemetry::query::INSTALLATION_TAG;
use crate::services::telemetry::records::{FieldValue, TimeSeriesRecord};
use crate::services::telemetry::types::{InstallationThresholds, Thresholds};
use crate::services::telemetry::{MemoryStore, StaticThresholdRegistry};
use crate::state::AppState;

pub const SITE: &str = "siteA-mainpanel";

pub fn test_config() -> ApiConfig {
    ApiConfig {
        project_name: "Installation Telemetry API".to_string(),
        api_prefix: "/api/v1".to_string(),
        store: StoreKind::Memory,
        database_url: None,
        db_pool_size: 1,
        db_acquire_timeout: Duration::from_secs(1),
        bucket: "telemetry_points".to_string(),
        realtime_lookback_seconds: 300,
        thresholds_path: None,
        auto_create_schema: false,
    }
}

pub fn test_thresholds() -> StaticThresholdRegistry {
    let mut by_installation = HashMap::new();
    by_installation.insert(
        SITE.to_string(),
        InstallationThresholds {
            voltage: Some(Thresholds {
                critical_low: Some(207.0),
                low: Some(218.5),
                high: Some(241.5),
                critical_high: Some(253.0),
            }),
            temperature: Some(Thresholds {
                critical_low: None,
                low: Some(5.0),
                high: Some(40.0),
                critical_high: Some(50.0),
            }),
            ..Default::default()
        },
    );
    StaticThresholdRegistry::new(by_installation)
}

pub fn test_state(store: Arc<MemoryStore>) -> AppState {
    AppState::new(test_config(), store, Arc::new(test_thresholds()))
}

pub fn record(
    measurement: &str,
    field: &str,
    value: FieldValue,
    time: DateTime<Utc>,
    extra_tags: &[(&str, &str)],
) -> TimeSeriesRecord {
    let mut tags = BTreeMap::new();
    tags.insert(INSTALLATION_TAG.to_string(), SITE.to_string());
    for (key, tag) in extra_tags {
        tags.insert(key.to_string(), tag.to_string());
    }
    TimeSeriesRecord {
        measurement: Some(measurement.to_string()),
        field: Some(field.to_string()),
        tags,
        value: Some(value),
        time: Some(time),
    }
}
