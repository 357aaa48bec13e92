use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::telemetry::query::{
    DEFAULT_REALTIME_LOOKBACK_SECONDS, MAX_REALTIME_LOOKBACK_SECONDS,
};
use crate::services::telemetry::timescale::is_valid_bucket;

const DEFAULT_PROJECT_NAME: &str = "Installation Telemetry API";
pub const DEFAULT_API_PREFIX: &str = "/api/v1";
const DEFAULT_BUCKET: &str = "telemetry_points";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Timescale,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "timescale" | "postgres" | "postgresql" => Ok(StoreKind::Timescale),
            "memory" => Ok(StoreKind::Memory),
            other => {
                anyhow::bail!("unknown TELEMETRY_STORE {other:?} (expected timescale or memory)")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub project_name: String,
    pub api_prefix: String,
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub db_pool_size: u32,
    pub db_acquire_timeout: Duration,
    pub bucket: String,
    pub realtime_lookback_seconds: i64,
    pub thresholds_path: Option<PathBuf>,
    pub auto_create_schema: bool,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves the config from an arbitrary key lookup; `from_env` passes
    /// the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let vars = Vars(&lookup);

        let store = match vars.optional_string("TELEMETRY_STORE") {
            Some(value) => value.parse::<StoreKind>()?,
            None => StoreKind::Timescale,
        };

        let database_url = vars
            .optional_string("TELEMETRY_DATABASE_URL")
            .or_else(|| vars.optional_string("DATABASE_URL"))
            .map(normalize_database_url);
        if store == StoreKind::Timescale && database_url.is_none() {
            anyhow::bail!(
                "TELEMETRY_DATABASE_URL or DATABASE_URL is required for the timescale store"
            );
        }

        let bucket = vars.string("TELEMETRY_BUCKET", DEFAULT_BUCKET);
        if !is_valid_bucket(&bucket) {
            return Err(anyhow::anyhow!("{bucket:?} is not a plain SQL identifier"))
                .context("TELEMETRY_BUCKET is invalid");
        }

        let realtime_lookback_seconds = vars
            .parsed::<i64>("TELEMETRY_REALTIME_LOOKBACK_SECONDS")
            .filter(|value| (1..=MAX_REALTIME_LOOKBACK_SECONDS).contains(value))
            .unwrap_or(DEFAULT_REALTIME_LOOKBACK_SECONDS);

        Ok(Self {
            project_name: vars.string("TELEMETRY_API_PROJECT_NAME", DEFAULT_PROJECT_NAME),
            api_prefix: normalize_prefix(&vars.string("TELEMETRY_API_PREFIX", DEFAULT_API_PREFIX)),
            store,
            database_url,
            db_pool_size: vars
                .parsed::<u32>("TELEMETRY_DB_POOL_SIZE")
                .filter(|value| *value > 0)
                .unwrap_or(10),
            db_acquire_timeout: Duration::from_secs(
                vars.parsed::<u64>("TELEMETRY_DB_ACQUIRE_TIMEOUT_SECS")
                    .unwrap_or(8),
            ),
            bucket,
            realtime_lookback_seconds,
            thresholds_path: vars
                .optional_string("TELEMETRY_THRESHOLDS_PATH")
                .map(PathBuf::from),
            auto_create_schema: vars.bool("TELEMETRY_AUTO_CREATE_SCHEMA", true),
        })
    }

    pub fn realtime_lookback(&self) -> chrono::Duration {
        chrono::Duration::try_seconds(self.realtime_lookback_seconds)
            .filter(|lookback| *lookback > chrono::Duration::zero())
            .unwrap_or_else(|| chrono::Duration::seconds(DEFAULT_REALTIME_LOOKBACK_SECONDS))
    }
}

struct Vars<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    fn optional_string(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional_string(key)
            .unwrap_or_else(|| default.to_string())
    }

    fn parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        self.optional_string(key)
            .and_then(|value| value.parse::<T>().ok())
    }

    fn bool(&self, key: &str, default: bool) -> bool {
        match self.optional_string(key).map(|value| value.to_lowercase()) {
            Some(value) if value == "1" || value == "true" || value == "yes" => true,
            Some(value) if value == "0" || value == "false" || value == "no" => false,
            _ => default,
        }
    }
}

/// `""` and `"/"` mean no prefix; otherwise one leading slash, no trailing.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn normalize_database_url(url: String) -> String {
    for driver_prefix in ["postgresql+psycopg://", "postgresql+asyncpg://"] {
        if let Some(stripped) = url.strip_prefix(driver_prefix) {
            return format!("postgresql://{stripped}");
        }
    }
    url
}
