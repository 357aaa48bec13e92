use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::query::{QueryMode, QuerySpec, INSTALLATION_TAG};
use super::records::TimeSeriesRecord;
use super::store::{Point, StoreError, TimeSeriesStore};

/// Process-local store with the same filtering rules as the Timescale
/// store. Backs tests and `TELEMETRY_STORE=memory` runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<TimeSeriesRecord>>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<TimeSeriesRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            closed: AtomicBool::new(false),
        }
    }

    pub async fn records(&self) -> Vec<TimeSeriesRecord> {
        self.records.read().await.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }
}

fn record_matches(spec: &QuerySpec, record: &TimeSeriesRecord) -> bool {
    let Some(measurement) = record.measurement.as_deref() else {
        return false;
    };
    let Some(time) = record.time else {
        return false;
    };
    record.tags.get(INSTALLATION_TAG).map(String::as_str) == Some(spec.installation_id.as_str())
        && spec.measurements.iter().any(|m| m == measurement)
        && spec.range.contains(time)
}

#[async_trait]
impl TimeSeriesStore for MemoryStore {
    async fn query(&self, spec: &QuerySpec) -> Result<Vec<TimeSeriesRecord>, StoreError> {
        self.ensure_open()?;
        let records = self.records.read().await;
        let mut matching: Vec<TimeSeriesRecord> = records
            .iter()
            .filter(|record| record_matches(spec, record))
            .cloned()
            .collect();
        // stable: equal timestamps keep insertion order
        matching.sort_by_key(|record| record.time);

        if spec.mode == QueryMode::Range {
            return Ok(matching);
        }

        let mut latest: HashMap<(Option<String>, Option<String>), TimeSeriesRecord> =
            HashMap::new();
        for record in matching {
            latest.insert((record.measurement.clone(), record.field.clone()), record);
        }
        let mut collapsed: Vec<TimeSeriesRecord> = latest.into_values().collect();
        collapsed.sort_by_key(|record| record.time);
        Ok(collapsed)
    }

    async fn write(&self, point: &Point) -> Result<(), StoreError> {
        self.ensure_open()?;
        if !point.tags.contains_key(INSTALLATION_TAG) {
            return Err(StoreError::Rejected(format!(
                "point for {} has no {INSTALLATION_TAG} tag",
                point.measurement
            )));
        }
        let mut records = self.records.write().await;
        for (field, value) in &point.fields {
            records.push(TimeSeriesRecord {
                measurement: Some(point.measurement.clone()),
                field: Some(field.clone()),
                tags: point.tags.clone(),
                value: Some(value.clone()),
                time: Some(point.time),
            });
        }
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }
}
