//! Reduced-error calculation for analog instrument verification.
//!
//! A verification point pairs a nominal scale mark with two raw reference
//! readings, one taken while the input rises and one while it falls. The raw
//! readings are converted back to the instrument unit through the selected
//! [`TransformFunction`], then compared with the scale mark relative to the
//! full measurement range.
//!
//! # Example
//!
//! ```
//! use poverka_core::calibration::{MeasurementGroup, RangeBounds};
//! use poverka_types::TransformFunction;
//!
//! let range = RangeBounds::parse("0", "100");
//! let mut group = MeasurementGroup::generate(3, range);
//! assert_eq!(group.scale_marks(), vec![0.0, 50.0, 100.0]);
//! let max_allowed = group.max_allowed_error;
//!
//! let point = &mut group.points_mut()[1];
//! point.update(51.0, 50.0, TransformFunction::None, range);
//! assert!((point.error_ascending() - 1.0).abs() < 1e-9);
//! assert!(!point.exceeds(max_allowed));
//! ```

use serde::{Deserialize, Serialize};

use poverka_types::TransformFunction;

/// Lower bound used when the entered value cannot be parsed.
pub const DEFAULT_LOWER_RANGE: f64 = 0.0;

/// Upper bound used when the entered value cannot be parsed.
pub const DEFAULT_UPPER_RANGE: f64 = 100.0;

/// Point count used when the entered value cannot be parsed.
pub const DEFAULT_POINT_COUNT: usize = 5;

/// Largest number of points a group may hold.
pub const MAX_POINT_COUNT: usize = 100;

/// Maximum allowed reduced error, in percent.
pub const DEFAULT_MAX_ALLOWED_ERROR: f64 = 1.5;

/// Name of the single group generated for a session.
pub const DEFAULT_GROUP_NAME: &str = "Основная приведённая погрешность";

/// Shunt voltage corresponding to the full scale of the 75 mV transform.
pub const SHUNT_75MV_FULL_SCALE: f64 = 75.0;

/// Reverse conversion factor for the 5 A transform.
pub const SHUNT_5A_FACTOR: f64 = 5.0;

/// Parse a decimal as entered by the operator.
///
/// Accepts a comma as the decimal separator. Returns `None` for empty,
/// malformed or non-finite input.
pub fn parse_decimal(s: &str) -> Option<f64> {
    let normalized = s.trim().replace(',', ".");
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an entered point count, falling back to [`DEFAULT_POINT_COUNT`].
/// Counts above [`MAX_POINT_COUNT`] are clamped.
pub fn parse_point_count(s: &str) -> usize {
    s.trim()
        .parse::<usize>()
        .unwrap_or(DEFAULT_POINT_COUNT)
        .min(MAX_POINT_COUNT)
}

/// Measurement range of the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeBounds {
    /// Lower bound in the instrument unit.
    pub lower: f64,
    /// Upper bound in the instrument unit.
    pub upper: f64,
}

impl Default for RangeBounds {
    fn default() -> Self {
        Self {
            lower: DEFAULT_LOWER_RANGE,
            upper: DEFAULT_UPPER_RANGE,
        }
    }
}

impl RangeBounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Parse entered bounds, coercing each malformed value to its default.
    pub fn parse(lower: &str, upper: &str) -> Self {
        Self {
            lower: parse_decimal(lower).unwrap_or(DEFAULT_LOWER_RANGE),
            upper: parse_decimal(upper).unwrap_or(DEFAULT_UPPER_RANGE),
        }
    }

    /// Width of the range (`upper - lower`). May be zero or negative.
    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Factor converting a raw reference reading into the instrument unit.
///
/// `range / 75` for the 75 mV shunt, `5` for the 5 A transformer and `1`
/// when readings are taken directly.
pub fn reverse_conversion_factor(transform: TransformFunction, range: f64) -> f64 {
    match transform {
        TransformFunction::Shunt75mV => range / SHUNT_75MV_FULL_SCALE,
        TransformFunction::Shunt5A => SHUNT_5A_FACTOR,
        TransformFunction::None => 1.0,
    }
}

/// Raw reading converted into the instrument unit.
pub fn transformed_value(raw: f64, transform: TransformFunction, range: f64) -> f64 {
    raw * reverse_conversion_factor(transform, range)
}

/// Reduced error in percent of the range. Zero when the range is zero.
pub fn percent_error(transformed: f64, scale_mark: f64, range: f64) -> f64 {
    if range == 0.0 {
        0.0
    } else {
        (transformed - scale_mark) / range * 100.0
    }
}

/// Value the reference source has to be set to for a scale mark.
///
/// This is the inverse of [`transformed_value`]; it returns zero when the
/// conversion factor is zero.
pub fn forward_scale_mark(scale_mark: f64, transform: TransformFunction, range: f64) -> f64 {
    let factor = reverse_conversion_factor(transform, range);
    if factor == 0.0 {
        0.0
    } else {
        scale_mark / factor
    }
}

/// Evenly spaced scale marks from `lower` to `upper` inclusive.
///
/// A single point sits at `lower`; zero points yields an empty list.
pub fn generate_scale_marks(count: usize, range: RangeBounds) -> Vec<f64> {
    let step = if count > 1 {
        range.span() / (count - 1) as f64
    } else {
        0.0
    };
    (0..count).map(|i| range.lower + i as f64 * step).collect()
}

/// One calibration point.
///
/// The derived values are only written by [`MeasurementPoint::recompute`],
/// which updates all of them at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPoint {
    id: usize,
    scale_mark: f64,
    reference_ascending: f64,
    reference_descending: f64,
    transformed_ascending: f64,
    transformed_descending: f64,
    error_ascending: f64,
    error_descending: f64,
    variation: f64,
}

impl MeasurementPoint {
    /// A point with zero readings and zero derived values.
    pub fn new(id: usize, scale_mark: f64) -> Self {
        Self {
            id,
            scale_mark,
            reference_ascending: 0.0,
            reference_descending: 0.0,
            transformed_ascending: 0.0,
            transformed_descending: 0.0,
            error_ascending: 0.0,
            error_descending: 0.0,
            variation: 0.0,
        }
    }

    /// A point with the given readings, already computed.
    pub fn with_readings(
        id: usize,
        scale_mark: f64,
        ascending: f64,
        descending: f64,
        transform: TransformFunction,
        range: RangeBounds,
    ) -> Self {
        let mut point = Self::new(id, scale_mark);
        point.update(ascending, descending, transform, range);
        point
    }

    /// Replace the raw readings and recompute the derived values.
    pub fn update(
        &mut self,
        ascending: f64,
        descending: f64,
        transform: TransformFunction,
        range: RangeBounds,
    ) {
        self.reference_ascending = ascending;
        self.reference_descending = descending;
        self.recompute(transform, range);
    }

    /// Recompute every derived value from the readings, scale mark, range
    /// and transform.
    pub fn recompute(&mut self, transform: TransformFunction, range: RangeBounds) {
        let span = range.span();
        self.transformed_ascending = transformed_value(self.reference_ascending, transform, span);
        self.transformed_descending = transformed_value(self.reference_descending, transform, span);
        self.error_ascending = percent_error(self.transformed_ascending, self.scale_mark, span);
        self.error_descending = percent_error(self.transformed_descending, self.scale_mark, span);
        self.variation = (self.transformed_ascending - self.transformed_descending).abs();
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn scale_mark(&self) -> f64 {
        self.scale_mark
    }

    /// Raw reference reading while the input rises.
    pub fn reference_ascending(&self) -> f64 {
        self.reference_ascending
    }

    /// Raw reference reading while the input falls.
    pub fn reference_descending(&self) -> f64 {
        self.reference_descending
    }

    pub fn transformed_ascending(&self) -> f64 {
        self.transformed_ascending
    }

    pub fn transformed_descending(&self) -> f64 {
        self.transformed_descending
    }

    /// Reduced error of the ascending reading, in percent.
    pub fn error_ascending(&self) -> f64 {
        self.error_ascending
    }

    /// Reduced error of the descending reading, in percent.
    pub fn error_descending(&self) -> f64 {
        self.error_descending
    }

    /// Hysteresis between the ascending and descending readings.
    pub fn variation(&self) -> f64 {
        self.variation
    }

    /// Returns `true` if either error exceeds `max_allowed` in magnitude.
    pub fn exceeds(&self, max_allowed: f64) -> bool {
        self.error_ascending.abs() > max_allowed || self.error_descending.abs() > max_allowed
    }
}

/// A named set of points sharing one tolerance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementGroup {
    pub name: String,
    /// Maximum allowed reduced error, in percent.
    pub max_allowed_error: f64,
    points: Vec<MeasurementPoint>,
}

impl MeasurementGroup {
    pub fn new(name: impl Into<String>, max_allowed_error: f64, points: Vec<MeasurementPoint>) -> Self {
        Self {
            name: name.into(),
            max_allowed_error,
            points,
        }
    }

    /// The default group with `count` evenly spaced, empty points.
    pub fn generate(count: usize, range: RangeBounds) -> Self {
        let points = generate_scale_marks(count.min(MAX_POINT_COUNT), range)
            .into_iter()
            .enumerate()
            .map(|(id, mark)| MeasurementPoint::new(id, mark))
            .collect();
        Self::new(DEFAULT_GROUP_NAME, DEFAULT_MAX_ALLOWED_ERROR, points)
    }

    pub fn points(&self) -> &[MeasurementPoint] {
        &self.points
    }

    /// Mutable access to the points. Derived values stay consistent because
    /// only [`MeasurementPoint::recompute`] can change them.
    pub fn points_mut(&mut self) -> &mut [MeasurementPoint] {
        &mut self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn scale_marks(&self) -> Vec<f64> {
        self.points.iter().map(MeasurementPoint::scale_mark).collect()
    }

    /// Recompute every point.
    pub fn recompute(&mut self, transform: TransformFunction, range: RangeBounds) {
        for point in &mut self.points {
            point.recompute(transform, range);
        }
    }

    /// Returns `true` if any point is out of tolerance.
    pub fn has_errors(&self) -> bool {
        self.points.iter().any(|p| p.exceeds(self.max_allowed_error))
    }

    /// Signed ascending error with the largest magnitude, or zero.
    pub fn max_error_ascending(&self) -> f64 {
        max_by_magnitude(self.points.iter().map(MeasurementPoint::error_ascending))
    }

    /// Signed descending error with the largest magnitude, or zero.
    pub fn max_error_descending(&self) -> f64 {
        max_by_magnitude(self.points.iter().map(MeasurementPoint::error_descending))
    }

    /// Largest variation, or zero.
    pub fn max_variation(&self) -> f64 {
        self.points
            .iter()
            .map(MeasurementPoint::variation)
            .fold(0.0, f64::max)
    }
}

fn max_by_magnitude(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, |best, v| if v.abs() > best.abs() { v } else { best })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn range_0_100() -> RangeBounds {
        RangeBounds::new(0.0, 100.0)
    }

    #[test]
    fn test_point_count_is_clamped() {
        assert_eq!(parse_point_count("7"), 7);
        assert_eq!(parse_point_count("abc"), DEFAULT_POINT_COUNT);
        assert_eq!(parse_point_count("4000000000"), MAX_POINT_COUNT);
        assert_eq!(MeasurementGroup::generate(1_000_000, range_0_100()).len(), MAX_POINT_COUNT);
    }

    #[test]
    fn test_group_json_carries_derived_values() {
        let mut group = MeasurementGroup::generate(3, range_0_100());
        group.points_mut()[1].update(51.0, 50.5, TransformFunction::None, range_0_100());

        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["max_allowed_error"], 1.5);
        assert_eq!(json["points"].as_array().unwrap().len(), 3);
        let point = &json["points"][1];
        assert_eq!(point["scale_mark"], 50.0);
        assert!((point["error_ascending"].as_f64().unwrap() - 1.0).abs() < EPS);
        assert!((point["variation"].as_f64().unwrap() - 0.5).abs() < EPS);

        let back: MeasurementGroup = serde_json::from_value(json).unwrap();
        assert_eq!(back, group);
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("12.5"), Some(12.5));
        assert_eq!(parse_decimal(" 12,5 "), Some(12.5));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal("NaN"), None);
    }

    #[test]
    fn test_range_parse_defaults() {
        assert_eq!(RangeBounds::parse("x", ""), RangeBounds::new(0.0, 100.0));
        assert_eq!(RangeBounds::parse("-10", "oops"), RangeBounds::new(-10.0, 100.0));
        assert_eq!(RangeBounds::parse("20", "250"), RangeBounds::new(20.0, 250.0));
    }

    #[test]
    fn test_parse_point_count() {
        assert_eq!(parse_point_count("7"), 7);
        assert_eq!(parse_point_count(""), DEFAULT_POINT_COUNT);
        assert_eq!(parse_point_count("-3"), DEFAULT_POINT_COUNT);
    }

    #[test]
    fn test_shunt_75mv_example() {
        let factor = reverse_conversion_factor(TransformFunction::Shunt75mV, 100.0);
        assert!((factor - 100.0 / 75.0).abs() < EPS);

        let point = MeasurementPoint::with_readings(
            0,
            50.0,
            37.5,
            37.5,
            TransformFunction::Shunt75mV,
            range_0_100(),
        );
        assert!((point.transformed_ascending() - 50.0).abs() < EPS);
        assert!(point.error_ascending().abs() < EPS);
    }

    #[test]
    fn test_shunt_5a_example() {
        assert!((transformed_value(2.5, TransformFunction::Shunt5A, 100.0) - 12.5).abs() < EPS);
    }

    #[test]
    fn test_zero_range_has_zero_error() {
        let range = RangeBounds::new(10.0, 10.0);
        let point = MeasurementPoint::with_readings(0, 10.0, 99.0, -5.0, TransformFunction::None, range);
        assert_eq!(point.error_ascending(), 0.0);
        assert_eq!(point.error_descending(), 0.0);
    }

    #[test]
    fn test_forward_scale_mark_inverts_reverse_factor() {
        let f = forward_scale_mark(50.0, TransformFunction::Shunt75mV, 100.0);
        assert!((f - 37.5).abs() < EPS);
        assert!((forward_scale_mark(12.5, TransformFunction::Shunt5A, 100.0) - 2.5).abs() < EPS);
        assert_eq!(forward_scale_mark(50.0, TransformFunction::None, 100.0), 50.0);
        assert_eq!(forward_scale_mark(50.0, TransformFunction::Shunt75mV, 0.0), 0.0);
    }

    #[test]
    fn test_generate_scale_marks() {
        assert_eq!(generate_scale_marks(3, range_0_100()), vec![0.0, 50.0, 100.0]);
        assert_eq!(generate_scale_marks(1, RangeBounds::new(5.0, 20.0)), vec![5.0]);
        assert!(generate_scale_marks(0, range_0_100()).is_empty());
    }

    #[test]
    fn test_end_to_end_three_points() {
        let range = RangeBounds::parse("0", "100");
        let mut group = MeasurementGroup::generate(3, range);
        assert_eq!(group.name, DEFAULT_GROUP_NAME);
        assert_eq!(group.max_allowed_error, 1.5);

        let point = &mut group.points_mut()[1];
        point.update(51.0, 50.0, TransformFunction::None, range);
        assert!((group.points()[1].error_ascending() - 1.0).abs() < EPS);

        // Mark 100 still has zero readings, which is -100 %.
        assert!(group.has_errors());

        let mut passing = MeasurementGroup::generate(3, range);
        for (point, (asc, desc)) in passing
            .points_mut()
            .iter_mut()
            .zip([(0.0, 0.0), (51.0, 50.5), (100.0, 99.8)])
        {
            point.update(asc, desc, TransformFunction::None, range);
        }
        assert!(!passing.has_errors());
        assert!((passing.max_error_ascending() - 1.0).abs() < EPS);
        assert!((passing.max_error_descending() - 0.5).abs() < EPS);
        assert!((passing.max_variation() - 0.5).abs() < EPS);
    }

    #[test]
    fn test_group_failure_threshold() {
        let range = range_0_100();
        let within = MeasurementPoint::with_readings(0, 50.0, 51.4, 48.6, TransformFunction::None, range);
        let group = MeasurementGroup::new("g", 1.5, vec![within]);
        assert!(!group.has_errors());

        let over = MeasurementPoint::with_readings(0, 50.0, 50.0, 48.4, TransformFunction::None, range);
        let group = MeasurementGroup::new("g", 1.5, vec![over]);
        assert!(group.has_errors());
        assert!((group.max_error_descending() + 1.6).abs() < 1e-6);
    }

    #[test]
    fn test_empty_group_aggregates() {
        let group = MeasurementGroup::new("g", 1.5, Vec::new());
        assert!(group.is_empty());
        assert!(!group.has_errors());
        assert_eq!(group.max_error_ascending(), 0.0);
        assert_eq!(group.max_variation(), 0.0);
    }

    proptest! {
        #[test]
        fn prop_no_transform_is_identity(raw in -1e6f64..1e6, mark in -1e3f64..1e3,
                                         lower in -1e3f64..1e3, width in 0.1f64..1e3) {
            let range = RangeBounds::new(lower, lower + width);
            let p = MeasurementPoint::with_readings(0, mark, raw, raw, TransformFunction::None, range);
            prop_assert_eq!(p.transformed_ascending(), raw);
            let expected = (raw - mark) / range.span() * 100.0;
            prop_assert!((p.error_ascending() - expected).abs() <= expected.abs() * 1e-12 + 1e-9);
        }

        #[test]
        fn prop_variation_is_abs_difference(asc in -1e4f64..1e4, desc in -1e4f64..1e4,
                                            upper in -1e3f64..1e3) {
            let range = RangeBounds::new(0.0, upper);
            for transform in TransformFunction::ALL {
                let p = MeasurementPoint::with_readings(0, 1.0, asc, desc, transform, range);
                prop_assert!(p.variation() >= 0.0);
                prop_assert_eq!(p.variation(), (p.transformed_ascending() - p.transformed_descending()).abs());
            }
        }

        #[test]
        fn prop_zero_range_zero_error(raw in -1e6f64..1e6, bound in -1e3f64..1e3) {
            let range = RangeBounds::new(bound, bound);
            for transform in TransformFunction::ALL {
                let p = MeasurementPoint::with_readings(0, bound, raw, -raw, transform, range);
                prop_assert_eq!(p.error_ascending(), 0.0);
                prop_assert_eq!(p.error_descending(), 0.0);
            }
        }

        #[test]
        fn prop_generated_marks_span_range(n in 2usize..50, lower in -1e3f64..1e3, width in -1e3f64..1e3) {
            let range = RangeBounds::new(lower, lower + width);
            let marks = generate_scale_marks(n, range);
            prop_assert_eq!(marks.len(), n);
            prop_assert_eq!(marks[0], lower);
            prop_assert!((marks[n - 1] - range.upper).abs() < 1e-9);
            let step = range.span() / (n - 1) as f64;
            for pair in marks.windows(2) {
                prop_assert!((pair[1] - pair[0] - step).abs() < 1e-9);
            }
        }

        #[test]
        fn prop_group_fails_iff_point_exceeds(errors in proptest::collection::vec((-3.0f64..3.0, -3.0f64..3.0), 1..10)) {
            let range = RangeBounds::new(0.0, 100.0);
            let points: Vec<_> = errors
                .iter()
                .enumerate()
                .map(|(i, (a, d))| MeasurementPoint::with_readings(i, 50.0, 50.0 + a, 50.0 + d, TransformFunction::None, range))
                .collect();
            let expected = points.iter().any(|p| p.error_ascending().abs() > 1.5 || p.error_descending().abs() > 1.5);
            let group = MeasurementGroup::new("g", 1.5, points);
            prop_assert_eq!(group.has_errors(), expected);
        }
    }
}
