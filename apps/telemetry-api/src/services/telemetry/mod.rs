//! Installation telemetry pipeline: query planning, record mapping,
//! severity classification and ingestion over a pluggable time-series store.

pub mod ingest;
pub mod mapper;
pub mod memory;
pub mod query;
pub mod records;
pub mod service;
pub mod severity;
pub mod store;
pub mod thresholds;
pub mod timescale;
pub mod types;
pub mod units;

pub use memory::MemoryStore;
pub use query::{QueryPlanner, QuerySpec};
pub use service::{TelemetryService, WriteError};
pub use store::{Point, StoreError, TimeSeriesStore};
pub use thresholds::{StaticThresholdRegistry, ThresholdRegistry};
pub use timescale::TimescaleStore;
