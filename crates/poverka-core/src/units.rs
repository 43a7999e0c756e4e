//! Instrument unit detection.

use poverka_types::TransformFunction;

/// Unit assumed when the device type names no known instrument.
pub const DEFAULT_UNIT: &str = "В";

// Prefixed names come first: "милливольтметр" also contains "вольтметр".
const UNIT_BY_TYPE: [(&str, &str); 6] = [
    ("милливольтметр", "мВ"),
    ("киловольтметр", "кВ"),
    ("миллиамперметр", "мА"),
    ("килоамперметр", "кА"),
    ("вольтметр", "В"),
    ("амперметр", "А"),
];

/// Unit shown on the scale of an instrument, derived from its type name.
///
/// ```
/// use poverka_core::units::device_unit;
///
/// assert_eq!(device_unit("Миллиамперметр"), "мА");
/// assert_eq!(device_unit("Вольтметр щитовой"), "В");
/// assert_eq!(device_unit("Омметр"), "В");
/// ```
pub fn device_unit(device_type: &str) -> &'static str {
    let lowered = device_type.to_lowercase();
    UNIT_BY_TYPE
        .iter()
        .find(|(name, _)| lowered.contains(name))
        .map(|(_, unit)| *unit)
        .unwrap_or(DEFAULT_UNIT)
}

/// Unit of the raw reference readings: the shunt unit, or the instrument
/// unit when readings are taken directly.
pub fn reading_unit(transform: TransformFunction, device_type: &str) -> &'static str {
    transform
        .reading_unit()
        .unwrap_or_else(|| device_unit(device_type))
}
