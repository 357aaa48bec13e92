use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json as SqlJson;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::BTreeMap;
use std::time::Duration;

use super::query::{QueryMode, QuerySpec, INSTALLATION_TAG};
use super::records::{FieldValue, TimeSeriesRecord};
use super::store::{Point, StoreError, TimeSeriesStore};

/// True for `name` or `schema.name` made of ASCII identifier characters.
/// Bucket names are spliced into SQL, so nothing else is accepted.
pub fn is_valid_bucket(bucket: &str) -> bool {
    let parts: Vec<&str> = bucket.split('.').collect();
    if parts.len() > 2 {
        return false;
    }
    parts.iter().all(|part| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
            && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
            && part.len() <= 63
    })
}

const TIMESCALEDB_INSTALLED_SQL: &str =
    "SELECT EXISTS (SELECT 1 FROM pg_extension WHERE extname = 'timescaledb')";

/// Idempotent; existing rows are moved into chunks.
const CREATE_HYPERTABLE_SQL: &str =
    "SELECT create_hypertable($1::regclass, 'time', if_not_exists => TRUE, migrate_data => TRUE)";

fn checked_bucket(bucket: &str) -> Result<&str, StoreError> {
    if is_valid_bucket(bucket) {
        Ok(bucket)
    } else {
        Err(StoreError::InvalidBucket(bucket.to_string()))
    }
}

#[derive(Debug, FromRow)]
struct PointRow {
    time: DateTime<Utc>,
    measurement: String,
    field: String,
    value_double: Option<f64>,
    value_text: Option<String>,
    value_bool: Option<bool>,
    tags: SqlJson<JsonValue>,
}

impl PointRow {
    fn into_record(self) -> TimeSeriesRecord {
        let value = match (self.value_double, self.value_text, self.value_bool) {
            (Some(value), _, _) => Some(FieldValue::Float(value)),
            (None, Some(text), _) => Some(FieldValue::Text(text)),
            (None, None, Some(flag)) => Some(FieldValue::Bool(flag)),
            (None, None, None) => None,
        };
        let tags: BTreeMap<String, String> = match self.tags.0 {
            JsonValue::Object(map) => map
                .into_iter()
                .filter_map(|(key, value)| match value {
                    JsonValue::String(text) => Some((key, text)),
                    JsonValue::Null => None,
                    other => Some((key, other.to_string())),
                })
                .collect(),
            _ => BTreeMap::new(),
        };
        TimeSeriesRecord {
            measurement: Some(self.measurement),
            field: Some(self.field),
            tags,
            value,
            time: Some(self.time),
        }
    }
}

/// Postgres/Timescale-backed store. One row per (time, installation,
/// measurement, field), typed value columns, remaining tags as jsonb.
#[derive(Clone)]
pub struct TimescaleStore {
    pool: PgPool,
    bucket: String,
}

impl TimescaleStore {
    /// Builds the store on a lazily connected pool; nothing touches the
    /// network until the first query or write.
    pub fn connect_lazy(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
        bucket: &str,
    ) -> Result<Self, StoreError> {
        let bucket = checked_bucket(bucket)?.to_string();
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect_lazy(database_url)?;
        Ok(Self { pool, bucket })
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        let table = &self.bucket;
        let index_base = table.rsplit('.').next().unwrap_or(table);
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                time timestamptz NOT NULL,
                installation_id text NOT NULL,
                measurement text NOT NULL,
                field text NOT NULL,
                value_double double precision NULL,
                value_text text NULL,
                value_bool boolean NULL,
                tags jsonb NOT NULL DEFAULT '{{}}'::jsonb
            )
            "#
        ))
        .execute(&self.pool)
        .await?;
        if self.timescaledb_installed().await? {
            sqlx::query(CREATE_HYPERTABLE_SQL)
                .bind(table.as_str())
                .execute(&self.pool)
                .await?;
            tracing::info!(bucket = %table, "telemetry bucket is a hypertable");
        } else {
            tracing::warn!(
                bucket = %table,
                "timescaledb extension not installed; using a plain table"
            );
        }
        sqlx::query(&format!(
            "CREATE INDEX IF NOT EXISTS {index_base}_lookup_idx ON {table} (installation_id, measurement, time DESC)"
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn timescaledb_installed(&self) -> Result<bool, StoreError> {
        let installed = sqlx::query_scalar::<_, bool>(TIMESCALEDB_INSTALLED_SQL)
            .fetch_one(&self.pool)
            .await?;
        Ok(installed)
    }
}

fn select_sql(spec: &QuerySpec, table: &str) -> String {
    match spec.mode {
        QueryMode::Latest => format!(
            r#"
            SELECT DISTINCT ON (measurement, field)
                time, measurement, field, value_double, value_text, value_bool, tags
            FROM {table}
            WHERE installation_id = $1
              AND measurement = ANY($2)
              AND time >= $3
              AND time < $4
            ORDER BY measurement, field, time DESC
            "#
        ),
        QueryMode::Range => format!(
            r#"
            SELECT time, measurement, field, value_double, value_text, value_bool, tags
            FROM {table}
            WHERE installation_id = $1
              AND measurement = ANY($2)
              AND time >= $3
              AND time < $4
            ORDER BY time ASC
            "#
        ),
    }
}

#[async_trait]
impl TimeSeriesStore for TimescaleStore {
    async fn query(&self, spec: &QuerySpec) -> Result<Vec<TimeSeriesRecord>, StoreError> {
        let table = checked_bucket(&spec.bucket)?;
        let rows: Vec<PointRow> = sqlx::query_as(&select_sql(spec, table))
            .bind(&spec.installation_id)
            .bind(&spec.measurements)
            .bind(spec.range.start)
            .bind(spec.range.end)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(PointRow::into_record).collect())
    }

    async fn write(&self, point: &Point) -> Result<(), StoreError> {
        let installation_id = point
            .tags
            .get(INSTALLATION_TAG)
            .cloned()
            .ok_or_else(|| {
                StoreError::Rejected(format!(
                    "point for {} has no {INSTALLATION_TAG} tag",
                    point.measurement
                ))
            })?;
        if point.fields.is_empty() {
            return Err(StoreError::Rejected(format!(
                "point for {} has no fields",
                point.measurement
            )));
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} (time, installation_id, measurement, field, value_double, value_text, value_bool, tags) ",
            self.bucket
        ));
        builder.push_values(point.fields.iter(), |mut b, (field, value)| {
            let (double, text, flag) = match value {
                FieldValue::Float(number) => (Some(*number), None, None),
                FieldValue::Text(text) => (None, Some(text.clone()), None),
                FieldValue::Bool(flag) => (None, None, Some(*flag)),
            };
            b.push_bind(point.time)
                .push_bind(installation_id.clone())
                .push_bind(point.measurement.clone())
                .push_bind(field.clone())
                .push_bind(double)
                .push_bind(text)
                .push_bind(flag)
                .push_bind(SqlJson(point.tags.clone()));
        });

        let result = builder.build().execute(&self.pool).await?;
        tracing::debug!(
            measurement = %point.measurement,
            installation_id = %installation_id,
            rows = result.rows_affected(),
            "wrote telemetry point"
        );
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::telemetry::query::QueryPlanner;
    use crate::services::telemetry::types::Domain;
    use chrono::Duration as ChronoDuration;
    use std::env;

    #[test]
    fn bucket_names_must_be_plain_identifiers() {
        assert!(is_valid_bucket("telemetry_points"));
        assert!(is_valid_bucket("metrics.telemetry_points"));
        assert!(is_valid_bucket("_raw1"));
        assert!(!is_valid_bucket(""));
        assert!(!is_valid_bucket("1points"));
        assert!(!is_valid_bucket("points; DROP TABLE x"));
        assert!(!is_valid_bucket("a.b.c"));
        assert!(!is_valid_bucket("points-raw"));
    }

    #[test]
    fn latest_sql_collapses_per_measurement_field() {
        let planner = QueryPlanner::new("telemetry_points", ChronoDuration::minutes(5));
        let spec = planner.latest(Domain::Electrical, "siteA", Utc::now());
        let sql = select_sql(&spec, "telemetry_points");
        assert!(sql.contains("DISTINCT ON (measurement, field)"));
        assert!(sql.contains("time < $4"));

        let spec = planner.range(
            Domain::Electrical,
            "siteA",
            Utc::now() - ChronoDuration::hours(1),
            Utc::now(),
        );
        let sql = select_sql(&spec, "telemetry_points");
        assert!(!sql.contains("DISTINCT"));
        assert!(sql.contains("ORDER BY time ASC"));
    }

    #[test]
    fn hypertable_creation_is_idempotent_and_keyed_on_time() {
        assert!(TIMESCALEDB_INSTALLED_SQL.contains("extname = 'timescaledb'"));
        assert!(CREATE_HYPERTABLE_SQL.contains("$1::regclass, 'time'"));
        assert!(CREATE_HYPERTABLE_SQL.contains("if_not_exists => TRUE"));
        assert!(CREATE_HYPERTABLE_SQL.contains("migrate_data => TRUE"));
    }

    #[test]
    fn rows_prefer_numeric_value_and_stringify_tags() {
        let row = PointRow {
            time: Utc::now(),
            measurement: "level".to_string(),
            field: "tank_1".to_string(),
            value_double: None,
            value_text: Some("1.5".to_string()),
            value_bool: None,
            tags: SqlJson(serde_json::json!({"installation_id": "siteA", "slot": 3, "note": null})),
        };
        let record = row.into_record();
        assert_eq!(record.value, Some(FieldValue::Text("1.5".to_string())));
        assert_eq!(record.tags["installation_id"], "siteA");
        assert_eq!(record.tags["slot"], "3");
        assert!(!record.tags.contains_key("note"));
    }

    #[tokio::test]
    async fn invalid_bucket_is_rejected_before_connecting() {
        let err = TimescaleStore::connect_lazy(
            "postgresql://postgres@localhost/postgres",
            1,
            Duration::from_secs(1),
            "bad bucket",
        )
        .err()
        .unwrap();
        assert!(matches!(err, StoreError::InvalidBucket(_)));
    }

    #[tokio::test]
    async fn round_trips_points_through_postgres() -> anyhow::Result<()> {
        if env::var("TELEMETRY_INTEGRATION_TEST").ok().as_deref() != Some("1") {
            return Ok(());
        }
        let database_url = match env::var("TELEMETRY_TEST_DATABASE_URL") {
            Ok(value) => value,
            Err(_) => return Ok(()),
        };

        let bucket = format!("telemetry_test_{}", std::process::id());
        let store =
            TimescaleStore::connect_lazy(&database_url, 2, Duration::from_secs(5), &bucket)?;
        store.ensure_schema().await?;
        store.ensure_schema().await?;
        if store.timescaledb_installed().await? {
            let hypertables: i64 = sqlx::query_scalar(
                "SELECT count(*) FROM timescaledb_information.hypertables WHERE hypertable_name = $1",
            )
            .bind(bucket.as_str())
            .fetch_one(&store.pool)
            .await?;
            assert_eq!(hypertables, 1);
        }

        let now = Utc::now();
        let mut tags = BTreeMap::new();
        tags.insert(INSTALLATION_TAG.to_string(), "siteA".to_string());
        tags.insert("device".to_string(), "PZEM-1".to_string());
        for (offset, value) in [(30, 228.0), (10, 230.0)] {
            let mut fields = BTreeMap::new();
            fields.insert("phase_a".to_string(), FieldValue::Float(value));
            fields.insert("mode".to_string(), FieldValue::Text("auto".to_string()));
            store
                .write(&Point {
                    measurement: "voltage".to_string(),
                    tags: tags.clone(),
                    fields,
                    time: now - ChronoDuration::seconds(offset),
                })
                .await?;
        }

        let planner = QueryPlanner::new(bucket.clone(), ChronoDuration::minutes(5));
        let latest = store
            .query(&planner.latest(Domain::Electrical, "siteA", now))
            .await?;
        assert_eq!(latest.len(), 2);
        let phase_a = latest
            .iter()
            .find(|record| record.field.as_deref() == Some("phase_a"))
            .expect("phase_a");
        assert_eq!(phase_a.value, Some(FieldValue::Float(230.0)));
        assert_eq!(phase_a.tags["device"], "PZEM-1");

        let range = store
            .query(&planner.range(
                Domain::Electrical,
                "siteA",
                now - ChronoDuration::minutes(1),
                now,
            ))
            .await?;
        assert_eq!(range.len(), 4);

        sqlx::query(&format!("DROP TABLE IF EXISTS {bucket}"))
            .execute(&store.pool)
            .await?;
        store.close().await;
        Ok(())
    }
}
