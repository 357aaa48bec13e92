use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use super::query::QuerySpec;
use super::records::{FieldValue, TimeSeriesRecord};

/// A storable point: one measurement at one instant with one or more fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
    pub time: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("invalid bucket name {0:?}")]
    InvalidBucket(String),
    #[error("point rejected: {0}")]
    Rejected(String),
    #[error("store is closed")]
    Closed,
}

/// The external time-series store. Implementations are shared across
/// requests and must be safe for concurrent use; timeouts and retries are
/// their concern, not the caller's.
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    /// Runs a declarative query. Zero rows is a normal outcome.
    async fn query(&self, spec: &QuerySpec) -> Result<Vec<TimeSeriesRecord>, StoreError>;

    async fn write(&self, point: &Point) -> Result<(), StoreError>;

    /// Releases the underlying connection handle. Called once on shutdown.
    async fn close(&self);
}
