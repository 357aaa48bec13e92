use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};

use super::records::{scan_records, ParsedRecord, RecordError, TimeSeriesRecord};
use super::types::{
    Domain, GroupedHistoricalData, HistoricalDataPoint, InstallationThresholds, PhaseData,
    PhysicalVariableValue, RealtimeElectricalData, RealtimePhysicalData, VariableValue,
    MEASUREMENT_ACTIVE_POWER, MEASUREMENT_APPARENT_POWER, MEASUREMENT_CURRENT, MEASUREMENT_ENERGY,
    MEASUREMENT_FREQUENCY, MEASUREMENT_HUMIDITY, MEASUREMENT_LEVEL, MEASUREMENT_POWER_FACTOR,
    MEASUREMENT_REACTIVE_POWER, MEASUREMENT_TEMPERATURE, MEASUREMENT_VOLTAGE,
};
use super::units::unit_for;

const FIELD_PHASE_A: &str = "phase_a";
const FIELD_PHASE_B: &str = "phase_b";
const FIELD_PHASE_C: &str = "phase_c";
const FIELD_VALUE: &str = "value";
const FIELD_TOTAL: &str = "total";
const FIELD_TOTAL_KWH: &str = "total_kwh";
const LOCATION_TAG: &str = "location";

/// Measurements whose electrical series name never carries the field.
const FIELDLESS_ELECTRICAL_SERIES: &[&str] = &[MEASUREMENT_FREQUENCY, MEASUREMENT_ENERGY];

type FieldValues<'a> = HashMap<&'a str, VariableValue>;

fn classify_record(
    record: &ParsedRecord<'_>,
    thresholds: Option<&InstallationThresholds>,
) -> VariableValue {
    let bounds = thresholds.and_then(|config| config.for_measurement(record.measurement));
    VariableValue::classified(
        record.value,
        unit_for(record.measurement, Some(record.field)),
        bounds,
    )
}

fn log_skipped(installation_id: &str, path: &'static str, skipped: &[RecordError]) {
    for err in skipped {
        tracing::warn!(
            installation_id,
            path,
            error = %err,
            "skipping unparseable telemetry record"
        );
    }
}

fn latest_time(records: &[ParsedRecord<'_>]) -> Option<DateTime<Utc>> {
    records.iter().map(|record| record.time).max()
}

fn phase_data(fields: Option<&FieldValues<'_>>) -> Option<PhaseData> {
    let fields = fields?;
    Some(PhaseData {
        a: fields.get(FIELD_PHASE_A).cloned(),
        b: fields.get(FIELD_PHASE_B).cloned(),
        c: fields.get(FIELD_PHASE_C).cloned(),
    })
}

fn field_value(
    accumulated: &HashMap<&str, FieldValues<'_>>,
    measurement: &str,
    field: &str,
) -> Option<VariableValue> {
    accumulated
        .get(measurement)
        .and_then(|fields| fields.get(field))
        .cloned()
}

/// Folds a latest-value batch into one electrical snapshot. Returns `None`
/// when no record resolves to a measurement of the snapshot.
pub fn map_realtime_electrical(
    installation_id: &str,
    thresholds: Option<&InstallationThresholds>,
    records: &[TimeSeriesRecord],
) -> Option<RealtimeElectricalData> {
    let (parsed, skipped) = scan_records(records);
    log_skipped(installation_id, "realtime_electrical", &skipped);

    let mut accumulated: HashMap<&str, FieldValues<'_>> = HashMap::new();
    for record in &parsed {
        accumulated
            .entry(record.measurement)
            .or_default()
            .insert(record.field, classify_record(record, thresholds));
    }

    let timestamp = latest_time(&parsed)?;
    let snapshot = RealtimeElectricalData {
        timestamp,
        asset_id: installation_id.to_string(),
        voltage: phase_data(accumulated.get(MEASUREMENT_VOLTAGE)),
        current: phase_data(accumulated.get(MEASUREMENT_CURRENT)),
        active_power: phase_data(accumulated.get(MEASUREMENT_ACTIVE_POWER)),
        apparent_power: phase_data(accumulated.get(MEASUREMENT_APPARENT_POWER)),
        reactive_power: phase_data(accumulated.get(MEASUREMENT_REACTIVE_POWER)),
        power_factor: phase_data(accumulated.get(MEASUREMENT_POWER_FACTOR)),
        frequency: field_value(&accumulated, MEASUREMENT_FREQUENCY, FIELD_VALUE),
        total_active_power: field_value(&accumulated, MEASUREMENT_ACTIVE_POWER, FIELD_TOTAL),
        total_energy_kwh: field_value(&accumulated, MEASUREMENT_ENERGY, FIELD_TOTAL_KWH),
    };

    tracing::debug!(
        installation_id,
        consumed = parsed.len(),
        skipped = skipped.len(),
        "mapped realtime electrical batch"
    );
    snapshot.has_any_measurement().then_some(snapshot)
}

/// Folds a latest-value batch into one physical snapshot. A record whose
/// field is `value` replaces any earlier record of the same measurement;
/// other fields only fill an empty slot.
pub fn map_realtime_physical(
    installation_id: &str,
    thresholds: Option<&InstallationThresholds>,
    records: &[TimeSeriesRecord],
) -> Option<RealtimePhysicalData> {
    let (parsed, skipped) = scan_records(records);
    log_skipped(installation_id, "realtime_physical", &skipped);

    let mut latest: HashMap<&str, PhysicalVariableValue> = HashMap::new();
    for record in &parsed {
        if latest.contains_key(record.measurement) && record.field != FIELD_VALUE {
            continue;
        }
        let value = PhysicalVariableValue::new(
            classify_record(record, thresholds),
            record.tags.get(LOCATION_TAG).cloned(),
        );
        latest.insert(record.measurement, value);
    }

    let timestamp = latest_time(&parsed)?;
    let snapshot = RealtimePhysicalData {
        timestamp,
        asset_id: installation_id.to_string(),
        temperature: latest.remove(MEASUREMENT_TEMPERATURE),
        humidity: latest.remove(MEASUREMENT_HUMIDITY),
        level: latest.remove(MEASUREMENT_LEVEL),
    };

    tracing::debug!(
        installation_id,
        consumed = parsed.len(),
        skipped = skipped.len(),
        "mapped realtime physical batch"
    );
    snapshot.has_any_measurement().then_some(snapshot)
}

/// Title-cases an identifier the way series names are displayed:
/// underscores become spaces, and a letter is upper-cased unless it follows
/// another letter (`tank_1` -> `Tank 1`, `phase_a` -> `Phase A`).
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut after_letter = false;
    for ch in raw.chars() {
        if ch == '_' {
            out.push(' ');
            after_letter = false;
        } else if ch.is_alphabetic() {
            if after_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            after_letter = true;
        } else {
            out.push(ch);
            after_letter = false;
        }
    }
    out
}

/// Display name of the historical series a record belongs to.
pub fn series_name(domain: Domain, measurement: &str, field: &str, value: Option<f64>) -> String {
    let base = title_case(measurement);
    let with_field = match domain {
        Domain::Electrical => !FIELDLESS_ELECTRICAL_SERIES.contains(&measurement),
        Domain::Physical => field != FIELD_VALUE && value.is_some(),
    };
    if with_field {
        format!("{base} {}", title_case(field))
    } else {
        base
    }
}

/// Groups a range-scan batch into named series. Points keep the order the
/// store returned them in. Returns `None` when no series resolves.
pub fn map_historical(
    domain: Domain,
    installation_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    records: &[TimeSeriesRecord],
) -> Option<GroupedHistoricalData> {
    let (parsed, mut skipped) = scan_records(records);

    let mut data: BTreeMap<String, Vec<HistoricalDataPoint>> = BTreeMap::new();
    for record in &parsed {
        // A series point needs a number; non-finite readings are dropped here.
        let Some(value) = record.value else {
            skipped.push(RecordError::MissingValue {
                measurement: record.measurement.to_string(),
                field: record.field.to_string(),
            });
            continue;
        };
        data.entry(series_name(domain, record.measurement, record.field, Some(value)))
            .or_default()
            .push(HistoricalDataPoint {
                timestamp: record.time,
                value,
                unit: unit_for(record.measurement, Some(record.field)).to_string(),
            });
    }
    log_skipped(installation_id, historical_path(domain), &skipped);

    tracing::debug!(
        installation_id,
        domain = domain.as_str(),
        series = data.len(),
        skipped = skipped.len(),
        "mapped historical batch"
    );
    if data.is_empty() {
        return None;
    }
    Some(GroupedHistoricalData {
        asset_id: installation_id.to_string(),
        start_time: start,
        end_time: end,
        data,
    })
}

fn historical_path(domain: Domain) -> &'static str {
    match domain {
        Domain::Electrical => "historical_electrical",
        Domain::Physical => "historical_physical",
    }
}
