use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::severity::classify;

pub const MEASUREMENT_VOLTAGE: &str = "voltage";
pub const MEASUREMENT_CURRENT: &str = "current";
pub const MEASUREMENT_ACTIVE_POWER: &str = "active_power";
pub const MEASUREMENT_APPARENT_POWER: &str = "apparent_power";
pub const MEASUREMENT_REACTIVE_POWER: &str = "reactive_power";
pub const MEASUREMENT_POWER_FACTOR: &str = "power_factor";
pub const MEASUREMENT_FREQUENCY: &str = "frequency";
pub const MEASUREMENT_ENERGY: &str = "energy";
pub const MEASUREMENT_TEMPERATURE: &str = "temperature";
pub const MEASUREMENT_HUMIDITY: &str = "humidity";
pub const MEASUREMENT_LEVEL: &str = "level";

const ELECTRICAL_MEASUREMENTS: &[&str] = &[
    MEASUREMENT_VOLTAGE,
    MEASUREMENT_CURRENT,
    MEASUREMENT_ACTIVE_POWER,
    MEASUREMENT_APPARENT_POWER,
    MEASUREMENT_REACTIVE_POWER,
    MEASUREMENT_POWER_FACTOR,
    MEASUREMENT_FREQUENCY,
    MEASUREMENT_ENERGY,
];

const PHYSICAL_MEASUREMENTS: &[&str] = &[
    MEASUREMENT_TEMPERATURE,
    MEASUREMENT_HUMIDITY,
    MEASUREMENT_LEVEL,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Electrical,
    Physical,
}

impl Domain {
    /// Measurements queried for this domain, on both the realtime and historical paths.
    pub fn measurements(self) -> &'static [&'static str] {
        match self {
            Domain::Electrical => ELECTRICAL_MEASUREMENTS,
            Domain::Physical => PHYSICAL_MEASUREMENTS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Electrical => "electrical",
            Domain::Physical => "physical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
pub enum SeverityLevel {
    #[serde(rename = "Normal")]
    Normal,
    #[serde(rename = "Low")]
    Low,
    #[serde(rename = "High")]
    High,
    #[serde(rename = "Critical Low")]
    CriticalLow,
    #[serde(rename = "Critical High")]
    CriticalHigh,
    #[serde(rename = "Unknown")]
    Unknown,
}

/// Bounds a value is classified against. Callers keep
/// `critical_low <= low <= high <= critical_high`; nothing here validates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Thresholds {
    #[serde(default)]
    pub critical_low: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub critical_high: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct InstallationThresholds {
    #[serde(default)]
    pub voltage: Option<Thresholds>,
    #[serde(default)]
    pub current: Option<Thresholds>,
    #[serde(default)]
    pub frequency: Option<Thresholds>,
    #[serde(default)]
    pub power_factor: Option<Thresholds>,
    #[serde(default)]
    pub temperature: Option<Thresholds>,
    #[serde(default)]
    pub humidity: Option<Thresholds>,
    #[serde(default)]
    pub level: Option<Thresholds>,
}

impl InstallationThresholds {
    pub fn for_measurement(&self, measurement: &str) -> Option<&Thresholds> {
        match measurement {
            MEASUREMENT_VOLTAGE => self.voltage.as_ref(),
            MEASUREMENT_CURRENT => self.current.as_ref(),
            MEASUREMENT_FREQUENCY => self.frequency.as_ref(),
            MEASUREMENT_POWER_FACTOR => self.power_factor.as_ref(),
            MEASUREMENT_TEMPERATURE => self.temperature.as_ref(),
            MEASUREMENT_HUMIDITY => self.humidity.as_ref(),
            MEASUREMENT_LEVEL => self.level.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct VariableValue {
    pub value: Option<f64>,
    pub unit: String,
    pub severity: SeverityLevel,
}

impl VariableValue {
    /// Builds a classified value. An absent value is always `Unknown`.
    pub fn classified(value: Option<f64>, unit: &str, thresholds: Option<&Thresholds>) -> Self {
        Self {
            value,
            unit: unit.to_string(),
            severity: classify(value, thresholds),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PhaseData {
    #[serde(rename = "Phase A")]
    pub a: Option<VariableValue>,
    #[serde(rename = "Phase B")]
    pub b: Option<VariableValue>,
    #[serde(rename = "Phase C")]
    pub c: Option<VariableValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RealtimeElectricalData {
    pub timestamp: DateTime<Utc>,
    pub asset_id: String,
    pub voltage: Option<PhaseData>,
    pub current: Option<PhaseData>,
    #[serde(rename = "Active Power (kW)")]
    pub active_power: Option<PhaseData>,
    #[serde(rename = "Apparent Power (kVA)")]
    pub apparent_power: Option<PhaseData>,
    #[serde(rename = "Reactive Power (kVAR)")]
    pub reactive_power: Option<PhaseData>,
    #[serde(rename = "Power Factor")]
    pub power_factor: Option<PhaseData>,
    pub frequency: Option<VariableValue>,
    #[serde(rename = "Total Active Power (kW)")]
    pub total_active_power: Option<VariableValue>,
    #[serde(rename = "Total Energy (kWh)")]
    pub total_energy_kwh: Option<VariableValue>,
}

impl RealtimeElectricalData {
    pub fn has_any_measurement(&self) -> bool {
        self.voltage.is_some()
            || self.current.is_some()
            || self.active_power.is_some()
            || self.apparent_power.is_some()
            || self.reactive_power.is_some()
            || self.power_factor.is_some()
            || self.frequency.is_some()
            || self.total_active_power.is_some()
            || self.total_energy_kwh.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PhysicalVariableValue {
    pub value: Option<f64>,
    pub unit: String,
    pub severity: SeverityLevel,
    pub sensor_location: Option<String>,
}

impl PhysicalVariableValue {
    pub fn new(value: VariableValue, sensor_location: Option<String>) -> Self {
        Self {
            value: value.value,
            unit: value.unit,
            severity: value.severity,
            sensor_location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RealtimePhysicalData {
    pub timestamp: DateTime<Utc>,
    pub asset_id: String,
    pub temperature: Option<PhysicalVariableValue>,
    pub humidity: Option<PhysicalVariableValue>,
    #[serde(rename = "Level")]
    pub level: Option<PhysicalVariableValue>,
}

impl RealtimePhysicalData {
    pub fn has_any_measurement(&self) -> bool {
        self.temperature.is_some() || self.humidity.is_some() || self.level.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HistoricalDataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GroupedHistoricalData {
    pub asset_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub data: BTreeMap<String, Vec<HistoricalDataPoint>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct IngestEvent {
    pub timestamp: DateTime<Utc>,
    pub measurement: String,
    #[schema(value_type = Object)]
    pub fields: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub tags: Option<BTreeMap<String, String>>,
}
