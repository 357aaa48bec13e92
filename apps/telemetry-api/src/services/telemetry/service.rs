use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::ingest::{build_point, IngestError};
use super::mapper::{map_historical, map_realtime_electrical, map_realtime_physical};
use super::query::{QueryPlanner, QuerySpec};
use super::records::TimeSeriesRecord;
use super::store::{StoreError, TimeSeriesStore};
use super::thresholds::ThresholdRegistry;
use super::types::{
    Domain, GroupedHistoricalData, IngestEvent, RealtimeElectricalData, RealtimePhysicalData,
};

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("invalid ingest event: {0}")]
    Invalid(#[from] IngestError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Request-level entry point: one store call per request, everything else
/// in-process. Store failures never escape; reads collapse to `None` and
/// writes to `false`.
#[derive(Clone)]
pub struct TelemetryService {
    store: Arc<dyn TimeSeriesStore>,
    thresholds: Arc<dyn ThresholdRegistry>,
    planner: QueryPlanner,
}

impl TelemetryService {
    pub fn new(
        store: Arc<dyn TimeSeriesStore>,
        thresholds: Arc<dyn ThresholdRegistry>,
        planner: QueryPlanner,
    ) -> Self {
        Self {
            store,
            thresholds,
            planner,
        }
    }

    pub fn store(&self) -> &Arc<dyn TimeSeriesStore> {
        &self.store
    }

    async fn fetch(&self, spec: &QuerySpec, path: &'static str) -> Option<Vec<TimeSeriesRecord>> {
        match self.store.query(spec).await {
            Ok(records) => Some(records),
            Err(err) => {
                tracing::error!(
                    installation_id = %spec.installation_id,
                    path,
                    error = %err,
                    "telemetry store query failed"
                );
                None
            }
        }
    }

    pub async fn realtime_electrical(
        &self,
        installation_id: &str,
    ) -> Option<RealtimeElectricalData> {
        let spec = self
            .planner
            .latest(Domain::Electrical, installation_id, Utc::now());
        let records = self.fetch(&spec, "realtime_electrical").await?;
        let thresholds = self.thresholds.lookup(installation_id);
        let snapshot = map_realtime_electrical(installation_id, thresholds.as_ref(), &records);
        if snapshot.is_none() {
            tracing::warn!(
                installation_id,
                records = records.len(),
                "no realtime electrical data"
            );
        }
        snapshot
    }

    pub async fn realtime_physical(&self, installation_id: &str) -> Option<RealtimePhysicalData> {
        let spec = self
            .planner
            .latest(Domain::Physical, installation_id, Utc::now());
        let records = self.fetch(&spec, "realtime_physical").await?;
        let thresholds = self.thresholds.lookup(installation_id);
        let snapshot = map_realtime_physical(installation_id, thresholds.as_ref(), &records);
        if snapshot.is_none() {
            tracing::warn!(
                installation_id,
                records = records.len(),
                "no realtime physical data"
            );
        }
        snapshot
    }

    /// Series for `[start, end)`. An empty or inverted window yields `None`
    /// without touching the store; the HTTP layer rejects it first.
    pub async fn historical(
        &self,
        domain: Domain,
        installation_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<GroupedHistoricalData> {
        if start >= end {
            return None;
        }
        let spec = self.planner.range(domain, installation_id, start, end);
        let records = self.fetch(&spec, "historical").await?;
        let grouped = map_historical(domain, installation_id, start, end, &records);
        if grouped.is_none() {
            tracing::warn!(
                installation_id,
                domain = domain.as_str(),
                %start,
                %end,
                "no historical data"
            );
        }
        grouped
    }

    /// Validates and writes one event, reporting why it failed.
    pub async fn write_event(
        &self,
        installation_id: &str,
        event: &IngestEvent,
    ) -> Result<(), WriteError> {
        let point = build_point(installation_id, event).map_err(|err| {
            tracing::warn!(installation_id, error = %err, "rejected ingest event");
            err
        })?;
        self.store.write(&point).await.map_err(|err| {
            tracing::error!(
                installation_id,
                measurement = %point.measurement,
                error = %err,
                "telemetry store write failed"
            );
            err
        })?;
        tracing::debug!(
            installation_id,
            measurement = %point.measurement,
            fields = point.fields.len(),
            "ingested event"
        );
        Ok(())
    }

    pub async fn ingest(&self, installation_id: &str, event: &IngestEvent) -> bool {
        self.write_event(installation_id, event).await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::telemetry::memory::MemoryStore;
    use crate::services::telemetry::query::INSTALLATION_TAG;
    use crate::services::telemetry::records::FieldValue;
    use crate::services::telemetry::store::Point;
    use crate::services::telemetry::thresholds::StaticThresholdRegistry;
    use crate::services::telemetry::types::{InstallationThresholds, SeverityLevel, Thresholds};
    use chrono::Duration;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts every store call the service makes.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        queries: AtomicUsize,
        writes: AtomicUsize,
    }

    impl CountingStore {
        fn queries(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }

        fn writes(&self) -> usize {
            self.writes.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TimeSeriesStore for CountingStore {
        async fn query(&self, spec: &QuerySpec) -> Result<Vec<TimeSeriesRecord>, StoreError> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.inner.query(spec).await
        }

        async fn write(&self, point: &Point) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.write(point).await
        }

        async fn close(&self) {
            self.inner.close().await;
        }
    }

    fn record(measurement: &str, field: &str, value: f64, time: DateTime<Utc>) -> TimeSeriesRecord {
        let mut tags = BTreeMap::new();
        tags.insert(INSTALLATION_TAG.to_string(), "siteA".to_string());
        TimeSeriesRecord {
            measurement: Some(measurement.to_string()),
            field: Some(field.to_string()),
            tags,
            value: Some(FieldValue::Float(value)),
            time: Some(time),
        }
    }

    fn service_with(store: Arc<dyn TimeSeriesStore>) -> TelemetryService {
        let mut by_installation = HashMap::new();
        by_installation.insert(
            "siteA".to_string(),
            InstallationThresholds {
                voltage: Some(Thresholds {
                    critical_low: Some(207.0),
                    low: Some(218.5),
                    high: Some(241.5),
                    critical_high: Some(253.0),
                }),
                ..Default::default()
            },
        );
        TelemetryService::new(
            store,
            Arc::new(StaticThresholdRegistry::new(by_installation)),
            QueryPlanner::new("telemetry_points", Duration::minutes(5)),
        )
    }

    fn event(fields: serde_json::Value) -> IngestEvent {
        serde_json::from_value(json!({
            "timestamp": Utc::now(),
            "measurement": "voltage",
            "fields": fields,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn realtime_electrical_classifies_against_registry() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::with_records(vec![
            record("voltage", "phase_a", 230.0, now - Duration::seconds(20)),
            record("voltage", "phase_b", 250.0, now - Duration::seconds(10)),
        ]));
        let snapshot = service_with(store)
            .realtime_electrical("siteA")
            .await
            .expect("snapshot");
        let phases = snapshot.voltage.expect("voltage");
        assert_eq!(phases.a.unwrap().severity, SeverityLevel::Normal);
        assert_eq!(phases.b.unwrap().severity, SeverityLevel::High);
        assert!(phases.c.is_none());
        assert_eq!(snapshot.timestamp, now - Duration::seconds(10));
    }

    #[tokio::test]
    async fn stale_or_unknown_installations_are_absent() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::with_records(vec![record(
            "temperature",
            "value",
            21.0,
            now - Duration::hours(1),
        )]));
        let service = service_with(store);
        assert!(service.realtime_physical("siteA").await.is_none());
        assert!(service.realtime_physical("siteB").await.is_none());
    }

    #[tokio::test]
    async fn historical_rejects_inverted_window_and_groups_series() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::with_records(vec![
            record("frequency", "value", 50.0, now - Duration::minutes(30)),
            record("frequency", "value", 50.1, now - Duration::minutes(20)),
        ]));
        let service = service_with(store);
        assert!(service
            .historical(Domain::Electrical, "siteA", now, now)
            .await
            .is_none());

        let grouped = service
            .historical(Domain::Electrical, "siteA", now - Duration::hours(1), now)
            .await
            .expect("series");
        let values: Vec<f64> = grouped.data["Frequency"].iter().map(|p| p.value).collect();
        assert_eq!(values, vec![50.0, 50.1]);
    }

    #[tokio::test]
    async fn ingest_writes_coerced_point_and_reads_back() {
        let store = Arc::new(MemoryStore::new());
        let service = service_with(store.clone());
        assert!(service.ingest("siteA", &event(json!({"phase_a": "229.9"}))).await);

        let stored = store.records().await;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].value, Some(FieldValue::Float(229.9)));

        let snapshot = service.realtime_electrical("siteA").await.expect("snapshot");
        assert_eq!(snapshot.voltage.unwrap().a.unwrap().value, Some(229.9));
    }

    #[tokio::test]
    async fn empty_event_is_rejected_without_a_write() {
        let store = Arc::new(CountingStore::default());
        let service = service_with(store.clone());
        assert!(!service.ingest("siteA", &event(json!({}))).await);
        assert!(matches!(
            service.write_event("siteA", &event(json!({}))).await,
            Err(WriteError::Invalid(IngestError::NoFields))
        ));
        assert_eq!(store.writes(), 0);

        assert!(service.ingest("siteA", &event(json!({"phase_a": 231.0}))).await);
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn inverted_window_never_reaches_the_store() {
        let store = Arc::new(CountingStore::default());
        let service = service_with(store.clone());
        let now = Utc::now();
        for (start, end) in [(now, now), (now, now - Duration::hours(1))] {
            assert!(service
                .historical(Domain::Physical, "siteA", start, end)
                .await
                .is_none());
        }
        assert_eq!(store.queries(), 0);

        assert!(service
            .historical(Domain::Physical, "siteA", now - Duration::hours(1), now)
            .await
            .is_none());
        assert_eq!(store.queries(), 1);
    }

    #[tokio::test]
    async fn store_failures_surface_as_absence_or_false() {
        let now = Utc::now();
        let store = Arc::new(MemoryStore::with_records(vec![record(
            "voltage",
            "phase_a",
            230.0,
            now - Duration::seconds(5),
        )]));
        store.close().await;
        let service = service_with(store);
        assert!(service.realtime_electrical("siteA").await.is_none());
        assert!(!service.ingest("siteA", &event(json!({"phase_a": 230}))).await);
        assert!(matches!(
            service.write_event("siteA", &event(json!({"phase_a": 230}))).await,
            Err(WriteError::Store(StoreError::Closed))
        ));
    }
}
