use anyhow::{Context, Result};
use axum::extract::FromRef;
use std::sync::Arc;

use crate::config::{ApiConfig, StoreKind};
use crate::services::telemetry::{
    MemoryStore, QueryPlanner, StaticThresholdRegistry, TelemetryService, ThresholdRegistry,
    TimeSeriesStore, TimescaleStore,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub telemetry: Arc<TelemetryService>,
}

impl AppState {
    pub fn new(
        config: ApiConfig,
        store: Arc<dyn TimeSeriesStore>,
        thresholds: Arc<dyn ThresholdRegistry>,
    ) -> Self {
        let planner = QueryPlanner::new(config.bucket.clone(), config.realtime_lookback());
        Self {
            config: Arc::new(config),
            telemetry: Arc::new(TelemetryService::new(store, thresholds, planner)),
        }
    }

    /// Builds the long-lived store and threshold registry from config.
    pub async fn from_config(config: ApiConfig) -> Result<Self> {
        let thresholds = load_thresholds(&config)?;
        let store = build_store(&config).await?;
        Ok(Self::new(config, store, thresholds))
    }
}

fn load_thresholds(config: &ApiConfig) -> Result<Arc<dyn ThresholdRegistry>> {
    let registry = match &config.thresholds_path {
        Some(path) => StaticThresholdRegistry::from_json_file(path)
            .context("failed to load TELEMETRY_THRESHOLDS_PATH")?,
        None => {
            tracing::warn!("TELEMETRY_THRESHOLDS_PATH not set; all severities will be Unknown");
            StaticThresholdRegistry::empty()
        }
    };
    Ok(Arc::new(registry))
}

async fn build_store(config: &ApiConfig) -> Result<Arc<dyn TimeSeriesStore>> {
    match config.store {
        StoreKind::Memory => {
            tracing::info!("using in-memory telemetry store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreKind::Timescale => {
            let database_url = config
                .database_url
                .as_deref()
                .context("database url is required for the timescale store")?;
            let store = TimescaleStore::connect_lazy(
                database_url,
                config.db_pool_size,
                config.db_acquire_timeout,
                &config.bucket,
            )
            .context("failed to create lazy telemetry store pool")?;
            if config.auto_create_schema {
                // The API still serves (as not found) while the database is down.
                if let Err(err) = store.ensure_schema().await {
                    tracing::warn!(
                        bucket = %config.bucket,
                        "failed to ensure telemetry schema: {err:#}"
                    );
                }
            }
            Ok(Arc::new(store))
        }
    }
}

impl FromRef<AppState> for Arc<TelemetryService> {
    fn from_ref(state: &AppState) -> Arc<TelemetryService> {
        state.telemetry.clone()
    }
}
