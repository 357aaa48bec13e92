use super::types::{SeverityLevel, Thresholds};

/// Classifies `value` against `thresholds`. Rules are checked in a fixed
/// order and the first match wins: critical low, low, critical high, high.
/// Overlapping bounds therefore resolve toward the earlier rule.
pub fn classify(value: Option<f64>, thresholds: Option<&Thresholds>) -> SeverityLevel {
    let (Some(value), Some(thresholds)) = (value, thresholds) else {
        return SeverityLevel::Unknown;
    };

    if thresholds.critical_low.is_some_and(|bound| value < bound) {
        return SeverityLevel::CriticalLow;
    }
    if thresholds.low.is_some_and(|bound| value < bound) {
        return SeverityLevel::Low;
    }
    if thresholds.critical_high.is_some_and(|bound| value > bound) {
        return SeverityLevel::CriticalHigh;
    }
    if thresholds.high.is_some_and(|bound| value > bound) {
        return SeverityLevel::High;
    }
    SeverityLevel::Normal
}
