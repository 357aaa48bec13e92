use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// A typed scalar as stored in, or read back from, the time-series store.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Text(String),
    Bool(bool),
}

impl FieldValue {
    fn kind(&self) -> &'static str {
        match self {
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "text",
            FieldValue::Bool(_) => "bool",
        }
    }
}

/// One row as returned by the store. Every part is optional because the
/// store does not guarantee well-formed rows; [`TimeSeriesRecord::parse`]
/// decides whether a record is usable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesRecord {
    pub measurement: Option<String>,
    pub field: Option<String>,
    pub tags: BTreeMap<String, String>,
    pub value: Option<FieldValue>,
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord<'a> {
    pub measurement: &'a str,
    pub field: &'a str,
    /// `None` when the stored number is not finite.
    pub value: Option<f64>,
    pub time: DateTime<Utc>,
    pub tags: &'a BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("record has no measurement")]
    MissingMeasurement,
    #[error("record for {measurement} has no field")]
    MissingField { measurement: String },
    #[error("record {measurement}.{field} has no value")]
    MissingValue { measurement: String, field: String },
    #[error("record {measurement}.{field} has no time")]
    MissingTime { measurement: String, field: String },
    #[error("record {measurement}.{field} has non-numeric {kind} value")]
    NonNumeric {
        measurement: String,
        field: String,
        kind: &'static str,
    },
}

impl TimeSeriesRecord {
    pub fn parse(&self) -> Result<ParsedRecord<'_>, RecordError> {
        let measurement = self
            .measurement
            .as_deref()
            .filter(|value| !value.is_empty())
            .ok_or(RecordError::MissingMeasurement)?;
        let field = self
            .field
            .as_deref()
            .filter(|value| !value.is_empty())
            .ok_or_else(|| RecordError::MissingField {
                measurement: measurement.to_string(),
            })?;
        let raw = self.value.as_ref().ok_or_else(|| RecordError::MissingValue {
            measurement: measurement.to_string(),
            field: field.to_string(),
        })?;
        let time = self.time.ok_or_else(|| RecordError::MissingTime {
            measurement: measurement.to_string(),
            field: field.to_string(),
        })?;

        let value = match raw {
            FieldValue::Float(value) => Some(*value).filter(|v| v.is_finite()),
            FieldValue::Text(text) => Some(parse_numeric_text(text).ok_or_else(|| {
                RecordError::NonNumeric {
                    measurement: measurement.to_string(),
                    field: field.to_string(),
                    kind: raw.kind(),
                }
            })?),
            FieldValue::Bool(_) => {
                return Err(RecordError::NonNumeric {
                    measurement: measurement.to_string(),
                    field: field.to_string(),
                    kind: raw.kind(),
                })
            }
        };

        Ok(ParsedRecord {
            measurement,
            field,
            value,
            time,
            tags: &self.tags,
        })
    }
}

/// Numeric reading of a string, as upstream bridges send them ("22.5").
/// Non-finite spellings ("nan", "inf") are not numbers here.
pub fn parse_numeric_text(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parses every record, keeping the usable ones and returning the failures
/// separately so one bad row never sinks a batch.
pub fn scan_records(records: &[TimeSeriesRecord]) -> (Vec<ParsedRecord<'_>>, Vec<RecordError>) {
    let mut parsed = Vec::with_capacity(records.len());
    let mut skipped = Vec::new();
    for result in records.iter().map(TimeSeriesRecord::parse) {
        match result {
            Ok(record) => parsed.push(record),
            Err(err) => skipped.push(err),
        }
    }
    (parsed, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(value: Option<FieldValue>) -> TimeSeriesRecord {
        TimeSeriesRecord {
            measurement: Some("temperature".to_string()),
            field: Some("value".to_string()),
            tags: BTreeMap::new(),
            value,
            time: Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()),
        }
    }

    #[test]
    fn numeric_strings_parse_as_numbers() {
        let rec = record(Some(FieldValue::Text(" 22.5 ".to_string())));
        assert_eq!(rec.parse().unwrap().value, Some(22.5));
    }

    #[test]
    fn non_finite_floats_become_absent() {
        let rec = record(Some(FieldValue::Float(f64::NAN)));
        assert_eq!(rec.parse().unwrap().value, None);
    }

    #[test]
    fn text_and_bool_values_are_rejected() {
        let text = record(Some(FieldValue::Text("auto".to_string())));
        assert!(matches!(
            text.parse(),
            Err(RecordError::NonNumeric { kind: "text", .. })
        ));
        let flag = record(Some(FieldValue::Bool(true)));
        assert!(matches!(
            flag.parse(),
            Err(RecordError::NonNumeric { kind: "bool", .. })
        ));
    }

    #[test]
    fn missing_parts_are_reported_in_order() {
        let mut rec = record(Some(FieldValue::Float(1.0)));
        rec.time = None;
        assert!(matches!(rec.parse(), Err(RecordError::MissingTime { .. })));
        rec.value = None;
        assert!(matches!(rec.parse(), Err(RecordError::MissingValue { .. })));
        rec.field = Some(String::new());
        assert!(matches!(rec.parse(), Err(RecordError::MissingField { .. })));
        rec.measurement = None;
        assert_eq!(rec.parse(), Err(RecordError::MissingMeasurement));
    }

    #[test]
    fn scan_separates_usable_records_from_failures() {
        let records = vec![
            record(Some(FieldValue::Float(21.0))),
            record(None),
            record(Some(FieldValue::Float(22.0))),
        ];
        let (parsed, skipped) = scan_records(&records);
        assert_eq!(parsed.len(), 2);
        assert_eq!(skipped.len(), 1);
        assert_eq!(parsed[1].value, Some(22.0));
    }
}
