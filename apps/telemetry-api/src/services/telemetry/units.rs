pub const UNKNOWN_UNIT: &str = "unknown_unit";

const UNIT_VOLT: &str = "V";
const UNIT_AMPERE: &str = "A";
const UNIT_KW: &str = "kW";
const UNIT_KVA: &str = "kVA";
const UNIT_KVAR: &str = "kVAR";
const UNIT_HZ: &str = "Hz";
const UNIT_KWH: &str = "kWh";
const UNIT_CELSIUS: &str = "°C";
const UNIT_PERCENT: &str = "%";
const UNIT_METER: &str = "m";

/// Unit for a measurement. Never fails: unresolvable measurements get
/// [`UNKNOWN_UNIT`]. Units are per measurement, so the field does not change
/// the result today.
pub fn unit_for(measurement: &str, _field: Option<&str>) -> &'static str {
    match measurement {
        "voltage" => UNIT_VOLT,
        "current" => UNIT_AMPERE,
        "active_power" => UNIT_KW,
        "apparent_power" => UNIT_KVA,
        "reactive_power" => UNIT_KVAR,
        // dimensionless
        "power_factor" => "",
        "frequency" => UNIT_HZ,
        "energy" => UNIT_KWH,
        "temperature" => UNIT_CELSIUS,
        "humidity" => UNIT_PERCENT,
        "level" => UNIT_METER,
        _ => UNKNOWN_UNIT,
    }
}
