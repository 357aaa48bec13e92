use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use super::query::INSTALLATION_TAG;
use super::records::{parse_numeric_text, FieldValue};
use super::store::Point;
use super::types::IngestEvent;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error("installation id is required")]
    MissingInstallation,
    #[error("measurement is required")]
    MissingMeasurement,
    #[error("at least one non-null field is required")]
    NoFields,
    #[error("field {field:?} has unsupported {kind} value")]
    UnsupportedField { field: String, kind: &'static str },
}

/// Coerces one inbound field. Numbers and numeric strings become floats;
/// other strings and booleans keep their type; `null` yields `None`.
pub fn coerce_field(field: &str, value: &JsonValue) -> Result<Option<FieldValue>, IngestError> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Bool(flag) => Ok(Some(FieldValue::Bool(*flag))),
        JsonValue::Number(number) => number
            .as_f64()
            .filter(|value| value.is_finite())
            .map(|value| Some(FieldValue::Float(value)))
            .ok_or_else(|| IngestError::UnsupportedField {
                field: field.to_string(),
                kind: "number",
            }),
        JsonValue::String(text) => Ok(Some(match parse_numeric_text(text) {
            Some(number) => FieldValue::Float(number),
            None => FieldValue::Text(text.clone()),
        })),
        JsonValue::Array(_) => Err(IngestError::UnsupportedField {
            field: field.to_string(),
            kind: "array",
        }),
        JsonValue::Object(_) => Err(IngestError::UnsupportedField {
            field: field.to_string(),
            kind: "object",
        }),
    }
}

/// Builds the storable point for an event. Event tags are copied verbatim,
/// then the `installation_id` tag is set from the caller's installation.
pub fn build_point(installation_id: &str, event: &IngestEvent) -> Result<Point, IngestError> {
    let installation_id = installation_id.trim();
    if installation_id.is_empty() {
        return Err(IngestError::MissingInstallation);
    }
    let measurement = event.measurement.trim();
    if measurement.is_empty() {
        return Err(IngestError::MissingMeasurement);
    }

    let mut fields = BTreeMap::new();
    for (name, raw) in &event.fields {
        if name.trim().is_empty() {
            continue;
        }
        if let Some(value) = coerce_field(name, raw)? {
            fields.insert(name.clone(), value);
        }
    }
    if fields.is_empty() {
        return Err(IngestError::NoFields);
    }

    let mut tags = event.tags.clone().unwrap_or_default();
    tags.insert(INSTALLATION_TAG.to_string(), installation_id.to_string());

    Ok(Point {
        measurement: measurement.to_string(),
        tags,
        fields,
        time: event.timestamp,
    })
}
