//! Verification session state.
//!
//! A [`VerificationSession`] holds the form fields of one instrument
//! verification, the climate conditions it was performed under and the
//! measurement groups with their computed errors. Range, transform and
//! point-count setters keep the derived values of every point in step.
//!
//! Sessions can also be described in a TOML file ([`SessionInput`]) so a
//! whole verification can be replayed from the command line.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use time::{Date, Month};
use tracing::debug;

use poverka_types::{
    ClimateConditions, DeviceProfile, TransformFunction, VerificationRecord, VerificationStatus,
};

use crate::calibration::{
    DEFAULT_MAX_ALLOWED_ERROR, MAX_POINT_COUNT, MeasurementGroup, RangeBounds,
    parse_point_count,
};
use crate::error::{Error, Result};
use crate::status::OperationStatus;
use crate::units::device_unit;

/// Progress of the operations a session goes through.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStatuses {
    /// Saving the record to the store. Carries the record ID.
    pub save: OperationStatus<String>,
    /// Generating the PDF protocol. Carries the file path.
    pub pdf: OperationStatus<String>,
    /// Loading today's climate conditions.
    pub climate: OperationStatus,
}

/// One verification in progress.
#[derive(Debug, Clone)]
pub struct VerificationSession {
    pub protocol_number: String,
    pub device_number: String,
    pub device_type: String,
    pub device_model: String,
    pub registry_number: String,
    pub accuracy_class: String,
    pub conditions: ClimateConditions,
    pub statuses: SessionStatuses,
    lower_range: String,
    upper_range: String,
    point_count: String,
    transform: TransformFunction,
    max_allowed_error: f64,
    groups: Vec<MeasurementGroup>,
    passed: bool,
}

impl Default for VerificationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl VerificationSession {
    /// An empty session with the default group of five points over 0..100.
    pub fn new() -> Self {
        let mut session = Self {
            protocol_number: String::new(),
            device_number: String::new(),
            device_type: String::new(),
            device_model: String::new(),
            registry_number: String::new(),
            accuracy_class: String::new(),
            conditions: ClimateConditions::default(),
            statuses: SessionStatuses::default(),
            lower_range: String::new(),
            upper_range: String::new(),
            point_count: String::new(),
            transform: TransformFunction::None,
            max_allowed_error: DEFAULT_MAX_ALLOWED_ERROR,
            groups: Vec::new(),
            passed: true,
        };
        session.regenerate_groups(session.point_count());
        session
    }

    /// Use a different tolerance for generated groups.
    pub fn with_max_allowed_error(mut self, max_allowed_error: f64) -> Self {
        self.max_allowed_error = max_allowed_error;
        for group in &mut self.groups {
            group.max_allowed_error = max_allowed_error;
        }
        self
    }

    pub fn lower_range(&self) -> &str {
        &self.lower_range
    }

    pub fn upper_range(&self) -> &str {
        &self.upper_range
    }

    /// Parsed range, with defaults for malformed bounds.
    pub fn range(&self) -> RangeBounds {
        RangeBounds::parse(&self.lower_range, &self.upper_range)
    }

    /// Parsed point count, with the default for malformed input.
    pub fn point_count(&self) -> usize {
        parse_point_count(&self.point_count)
    }

    pub fn transform(&self) -> TransformFunction {
        self.transform
    }

    pub fn max_allowed_error(&self) -> f64 {
        self.max_allowed_error
    }

    pub fn groups(&self) -> &[MeasurementGroup] {
        &self.groups
    }

    /// Instrument unit derived from the device type.
    pub fn unit(&self) -> &'static str {
        device_unit(&self.device_type)
    }

    /// Set the range bounds and recompute every point.
    ///
    /// Scale marks are kept; call [`regenerate_groups`](Self::regenerate_groups)
    /// to respace them over the new range.
    pub fn set_range(&mut self, lower: impl Into<String>, upper: impl Into<String>) {
        self.lower_range = lower.into();
        self.upper_range = upper.into();
        self.recompute_all();
    }

    /// Select the transform function and recompute every point.
    pub fn set_transform(&mut self, transform: TransformFunction) {
        self.transform = transform;
        self.recompute_all();
    }

    /// Set the entered point count.
    ///
    /// Groups are regenerated only when the parsed count differs from the
    /// current group size, so entered readings survive re-entering the same
    /// count.
    pub fn set_point_count(&mut self, count: impl Into<String>) {
        self.point_count = count.into();
        let n = self.point_count();
        if self.groups.first().map(MeasurementGroup::len) != Some(n) {
            self.regenerate_groups(n);
        }
    }

    /// Replace all groups with the default group of `count` empty points.
    pub fn regenerate_groups(&mut self, count: usize) {
        debug!("Regenerating measurement group with {count} points");
        let mut group = MeasurementGroup::generate(count, self.range());
        group.max_allowed_error = self.max_allowed_error;
        self.groups = vec![group];
    }

    /// Enter the readings of one point and recompute it.
    pub fn update_reading(
        &mut self,
        group: usize,
        point: usize,
        ascending: f64,
        descending: f64,
    ) -> Result<()> {
        let range = self.range();
        let transform = self.transform;
        let group_count = self.groups.len();
        let target = self.groups.get_mut(group).ok_or(Error::GroupNotFound {
            index: group,
            count: group_count,
        })?;
        let point_count = target.len();
        let target = target
            .points_mut()
            .get_mut(point)
            .ok_or(Error::PointNotFound {
                group,
                index: point,
                count: point_count,
            })?;
        target.update(ascending, descending, transform, range);
        Ok(())
    }

    fn recompute_all(&mut self) {
        let range = self.range();
        for group in &mut self.groups {
            group.recompute(self.transform, range);
        }
    }

    /// Returns `true` if any reading has been entered.
    pub fn has_readings(&self) -> bool {
        self.groups.iter().flat_map(MeasurementGroup::points).any(|p| {
            p.reference_ascending() != 0.0 || p.reference_descending() != 0.0
        })
    }

    /// Set the pass flag from the group failure flags and return the status.
    pub fn determine_status(&mut self) -> VerificationStatus {
        self.passed = !self.groups.iter().any(MeasurementGroup::has_errors);
        self.status()
    }

    /// Status from the last [`determine_status`](Self::determine_status) call.
    pub fn status(&self) -> VerificationStatus {
        if self.passed {
            VerificationStatus::Passed
        } else {
            VerificationStatus::Failed
        }
    }

    /// Text summary of the measurement table stored with the record.
    pub fn measurement_summary(&self) -> String {
        let unit = self.unit();
        let mut out = String::new();
        for group in &self.groups {
            out.push_str(&format!(
                "{} (допуск: {}%):\n",
                group.name, group.max_allowed_error
            ));
            for p in group.points() {
                out.push_str(&format!(
                    "{:.1} {}: ↑{:.2} ({:.2}%), ↓{:.2} ({:.2}%), Δ={:.2}\n",
                    p.scale_mark(),
                    unit,
                    p.reference_ascending(),
                    p.error_ascending(),
                    p.reference_descending(),
                    p.error_descending(),
                    p.variation()
                ));
            }
        }
        out
    }

    /// Build the record to store for a verification performed on `today`.
    ///
    /// A session without any reading is saved as
    /// [`VerificationStatus::Pending`].
    pub fn to_record(&self, today: Date) -> VerificationRecord {
        let status = if self.has_readings() {
            self.status()
        } else {
            VerificationStatus::Pending
        };
        VerificationRecord {
            id: VerificationRecord::new_id(),
            protocol_number: self.protocol_number.clone(),
            device_number: self.device_number.clone(),
            device_type: self.device_type.clone(),
            device_model: self.device_model.clone(),
            lower_range: self.lower_range.clone(),
            upper_range: self.upper_range.clone(),
            registry_number: self.registry_number.clone(),
            accuracy_class: self.accuracy_class.clone(),
            verification_date: today,
            next_verification_date: add_one_year(today),
            status,
            measurement_result: self.measurement_summary(),
            document_paths: Vec::new(),
            point_count: u32::try_from(self.point_count()).unwrap_or(u32::MAX),
            transform_function: self.transform,
        }
    }

    /// Fill the device fields from a stored profile.
    pub fn apply_profile(&mut self, profile: &DeviceProfile) {
        self.device_number = profile.device_number.clone();
        self.device_type = profile.device_type.clone();
        self.device_model = profile.device_model.clone();
        self.registry_number = profile.registry_number.clone();
        self.accuracy_class = profile.accuracy_class.clone();
        self.transform = profile.transform_function;
        self.lower_range = profile.lower_range.clone();
        self.upper_range = profile.upper_range.clone();
        self.point_count = profile.point_count.to_string();
        self.regenerate_groups(self.point_count());
    }

    /// Fill the conditions from the latest climate reading.
    ///
    /// `latest` is the local day the reading was taken and its values. Only a
    /// reading from `today` is accepted.
    pub fn load_climate(
        &mut self,
        latest: Option<(Date, ClimateConditions)>,
        today: Date,
    ) -> Result<()> {
        self.statuses.climate = OperationStatus::Loading;
        let result = match latest {
            Some((day, conditions)) if day == today => {
                self.conditions = conditions;
                Ok(())
            }
            _ => Err(Error::NoClimateData),
        };
        self.statuses.climate = match &result {
            Ok(()) => OperationStatus::Success(()),
            Err(e) => OperationStatus::Error(e.to_string()),
        };
        result
    }
}

/// Same day one year later; 29 February maps to 28 February.
pub fn add_one_year(date: Date) -> Date {
    let year = date.year() + 1;
    date.replace_year(year).unwrap_or_else(|_| {
        Date::from_calendar_date(year, Month::February, 28).unwrap_or(date)
    })
}

/// Readings of one point in a session file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointInput {
    pub ascending: f64,
    pub descending: f64,
}

/// Declarative description of a verification session.
///
/// Empty fields leave the session (or an applied profile) untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionInput {
    pub protocol_number: String,
    pub device_number: String,
    pub device_type: String,
    pub device_model: String,
    pub lower_range: String,
    pub upper_range: String,
    pub registry_number: String,
    pub accuracy_class: String,
    /// Number of points; taken from `points` when absent.
    pub point_count: Option<u32>,
    pub transform: Option<TransformFunction>,
    /// Conditions to use instead of the climate journal.
    pub conditions: Option<ClimateConditions>,
    /// Readings in scale-mark order.
    pub points: Vec<PointInput>,
}

impl SessionInput {
    /// Read a session file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|source| Error::InvalidSession {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Apply the described fields and readings to a session.
    ///
    /// A description with more than [`MAX_POINT_COUNT`] points is rejected
    /// before the session is touched.
    pub fn apply_to(&self, session: &mut VerificationSession) -> Result<()> {
        let requested = self
            .point_count
            .map_or(0, |n| usize::try_from(n).unwrap_or(usize::MAX))
            .max(self.points.len());
        if requested > MAX_POINT_COUNT {
            return Err(Error::TooManyPoints {
                count: requested,
                max: MAX_POINT_COUNT,
            });
        }

        fn set(target: &mut String, value: &str) {
            if !value.is_empty() {
                *target = value.to_string();
            }
        }

        set(&mut session.protocol_number, &self.protocol_number);
        set(&mut session.device_number, &self.device_number);
        set(&mut session.device_type, &self.device_type);
        set(&mut session.device_model, &self.device_model);
        set(&mut session.registry_number, &self.registry_number);
        set(&mut session.accuracy_class, &self.accuracy_class);

        if let Some(transform) = self.transform {
            session.set_transform(transform);
        }
        if !self.lower_range.is_empty() || !self.upper_range.is_empty() {
            let lower = pick(&self.lower_range, session.lower_range());
            let upper = pick(&self.upper_range, session.upper_range());
            session.set_range(lower, upper);
        }

        let count = match self.point_count {
            Some(n) => Some(usize::try_from(n).unwrap_or(usize::MAX)),
            None if !self.points.is_empty() => Some(self.points.len()),
            None => None,
        };
        if let Some(n) = count {
            session.point_count = n.to_string();
            session.regenerate_groups(n);
        }

        if let Some(conditions) = &self.conditions {
            session.conditions = conditions.clone();
        }

        for (index, point) in self.points.iter().enumerate() {
            session.update_reading(0, index, point.ascending, point.descending)?;
        }
        Ok(())
    }

    /// A commented skeleton of a session file.
    pub fn template() -> &'static str {
        SESSION_TEMPLATE
    }
}

fn pick(entered: &str, current: &str) -> String {
    if entered.is_empty() {
        current.to_string()
    } else {
        entered.to_string()
    }
}

const SESSION_TEMPLATE: &str = r#"# Verification session
protocol_number = "1"
device_number = ""
device_type = "Вольтметр"
device_model = ""
lower_range = "0"
upper_range = "100"
registry_number = ""
accuracy_class = "1.5"
# none, 75mV or 5A
transform = "none"
point_count = 5

# Omit to use today's reading from the climate journal.
# [conditions]
# temperature = "21.5"
# humidity = "45"
# pressure = "99.8"

# One entry per scale mark, from the lower bound upwards.
[[points]]
ascending = 0.0
descending = 0.0

[[points]]
ascending = 25.0
descending = 25.0

[[points]]
ascending = 50.0
descending = 50.0

[[points]]
ascending = 75.0
descending = 75.0

[[points]]
ascending = 100.0
descending = 100.0
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_session_file_rejects_huge_point_count() {
        let input =
            SessionInput::parse("protocol_number = \"9\"\npoint_count = 4000000000\n").unwrap();
        let mut session = VerificationSession::new();
        let err = input.apply_to(&mut session).unwrap_err();
        assert!(matches!(err, Error::TooManyPoints { max: MAX_POINT_COUNT, .. }));
        // Rejected before any field was applied
        assert_eq!(session.protocol_number, "");
        assert_eq!(session.point_count(), 5);

        session.set_point_count("4000000000");
        assert_eq!(session.groups()[0].len(), MAX_POINT_COUNT);
        let record = session.to_record(date!(2024 - 02 - 16));
        assert_eq!(record.point_count, MAX_POINT_COUNT as u32);
    }

    #[test]
    fn test_new_session_defaults() {
        let session = VerificationSession::new();
        assert_eq!(session.point_count(), 5);
        assert_eq!(session.groups().len(), 1);
        assert_eq!(
            session.groups()[0].scale_marks(),
            vec![0.0, 25.0, 50.0, 75.0, 100.0]
        );
        assert_eq!(session.status(), VerificationStatus::Passed);
        assert!(!session.has_readings());
    }

    #[test]
    fn test_point_count_regenerates_only_on_change() {
        let mut session = VerificationSession::new();
        session.update_reading(0, 1, 25.2, 25.1).unwrap();

        session.set_point_count("5");
        assert!(session.has_readings(), "same count keeps readings");

        session.set_point_count("abc");
        assert!(session.has_readings(), "malformed count falls back to 5");

        session.set_point_count("3");
        assert_eq!(session.groups()[0].len(), 3);
        assert!(!session.has_readings());
    }

    #[test]
    fn test_set_range_recomputes_points() {
        let mut session = VerificationSession::new();
        session.update_reading(0, 2, 51.0, 50.0).unwrap();
        assert!((session.groups()[0].points()[2].error_ascending() - 1.0).abs() < EPS);

        session.set_range("0", "200");
        let point = &session.groups()[0].points()[2];
        assert!((point.error_ascending() - 0.5).abs() < EPS);
        assert_eq!(point.scale_mark(), 50.0);
    }

    #[test]
    fn test_set_transform_recomputes_points() {
        let mut session = VerificationSession::new();
        session.update_reading(0, 2, 37.5, 37.5).unwrap();
        session.set_transform(TransformFunction::Shunt75mV);
        let point = &session.groups()[0].points()[2];
        assert!((point.transformed_ascending() - 50.0).abs() < EPS);
        assert!(point.error_ascending().abs() < EPS);
    }

    #[test]
    fn test_update_reading_out_of_bounds() {
        let mut session = VerificationSession::new();
        assert!(matches!(
            session.update_reading(1, 0, 0.0, 0.0),
            Err(Error::GroupNotFound { index: 1, count: 1 })
        ));
        assert!(matches!(
            session.update_reading(0, 5, 0.0, 0.0),
            Err(Error::PointNotFound { group: 0, index: 5, count: 5 })
        ));
    }

    #[test]
    fn test_determine_status() {
        let mut session = VerificationSession::new();
        session.set_point_count("3");
        session.update_reading(0, 1, 51.0, 50.0).unwrap();
        // Mark 100 has no readings: -100 %.
        assert_eq!(session.determine_status(), VerificationStatus::Failed);

        session.update_reading(0, 2, 100.0, 100.0).unwrap();
        assert_eq!(session.determine_status(), VerificationStatus::Passed);
    }

    #[test]
    fn test_measurement_summary_format() {
        let mut session = VerificationSession::new();
        session.set_point_count("2");
        session.update_reading(0, 1, 101.0, 99.5).unwrap();
        let summary = session.measurement_summary();
        let lines: Vec<&str> = summary.lines().collect();
        assert_eq!(lines[0], "Основная приведённая погрешность (допуск: 1.5%):");
        assert_eq!(lines[1], "0.0 В: ↑0.00 (0.00%), ↓0.00 (0.00%), Δ=0.00");
        assert_eq!(lines[2], "100.0 В: ↑101.00 (1.00%), ↓99.50 (-0.50%), Δ=1.50");
    }

    #[test]
    fn test_to_record() {
        let mut session = VerificationSession::new();
        session.protocol_number = "17".into();
        session.device_number = "A-1024".into();
        session.set_range("0", "150");
        session.set_transform(TransformFunction::Shunt5A);
        session.update_reading(0, 0, 0.0, 0.0).unwrap();
        session.determine_status();

        let pending = session.to_record(date!(2024 - 02 - 16));
        assert_eq!(pending.status, VerificationStatus::Pending);

        session.update_reading(0, 4, 20.0, 20.0).unwrap();
        session.determine_status();
        let record = session.to_record(date!(2024 - 02 - 16));
        assert_eq!(record.next_verification_date, date!(2025 - 02 - 16));
        assert_eq!(record.point_count, 5);
        assert_eq!(record.transform_function, TransformFunction::Shunt5A);
        assert_eq!(record.upper_range, "150");
        assert_eq!(record.status, session.status());
        assert!(record.document_paths.is_empty());
        assert_ne!(record.id, session.to_record(date!(2024 - 02 - 16)).id);
    }

    #[test]
    fn test_add_one_year_leap_day() {
        assert_eq!(add_one_year(date!(2024 - 02 - 29)), date!(2025 - 02 - 28));
        assert_eq!(add_one_year(date!(2023 - 12 - 31)), date!(2024 - 12 - 31));
    }

    #[test]
    fn test_apply_profile() {
        let profile = DeviceProfile {
            device_number: "A-1024".into(),
            device_type: "Миллиамперметр".into(),
            device_model: "М42300".into(),
            lower_range: "0".into(),
            upper_range: "20".into(),
            point_count: 3,
            transform_function: TransformFunction::Shunt75mV,
            registry_number: "1234-56".into(),
            accuracy_class: "1.0".into(),
        };
        let mut session = VerificationSession::new();
        session.apply_profile(&profile);
        assert_eq!(session.unit(), "мА");
        assert_eq!(session.groups()[0].scale_marks(), vec![0.0, 10.0, 20.0]);
        assert_eq!(session.transform(), TransformFunction::Shunt75mV);
    }

    #[test]
    fn test_load_climate() {
        let today = date!(2024 - 02 - 16);
        let conditions = ClimateConditions::new("21.5", "45", "99.1");

        let mut session = VerificationSession::new();
        let err = session
            .load_climate(Some((date!(2024 - 02 - 15), conditions.clone())), today)
            .unwrap_err();
        assert!(matches!(err, Error::NoClimateData));
        assert_eq!(
            session.statuses.climate.error_message(),
            Some("Отсутствуют климатические данные за текущий день")
        );

        session.load_climate(Some((today, conditions.clone())), today).unwrap();
        assert_eq!(session.conditions, conditions);
        assert_eq!(session.statuses.climate, OperationStatus::Success(()));

        assert!(session.load_climate(None, today).is_err());
    }

    #[test]
    fn test_session_input_applies_readings() {
        let input = SessionInput::parse(
            r#"
            protocol_number = "42"
            device_type = "Вольтметр"
            lower_range = "0"
            upper_range = "100"
            transform = "none"

            [[points]]
            ascending = 0.0
            descending = 0.0

            [[points]]
            ascending = 51.0
            descending = 50.0

            [[points]]
            ascending = 100.0
            descending = 100.0
            "#,
        )
        .unwrap();

        let mut session = VerificationSession::new();
        input.apply_to(&mut session).unwrap();
        assert_eq!(session.protocol_number, "42");
        assert_eq!(session.groups()[0].scale_marks(), vec![0.0, 50.0, 100.0]);
        assert!((session.groups()[0].points()[1].error_ascending() - 1.0).abs() < EPS);
        assert_eq!(session.determine_status(), VerificationStatus::Passed);
    }

    #[test]
    fn test_session_input_too_many_points() {
        let input = SessionInput {
            point_count: Some(2),
            points: vec![PointInput::default(); 3],
            ..SessionInput::default()
        };
        let mut session = VerificationSession::new();
        assert!(matches!(
            input.apply_to(&mut session),
            Err(Error::PointNotFound { index: 2, .. })
        ));
    }

    #[test]
    fn test_session_input_keeps_profile_fields() {
        let mut session = VerificationSession::new();
        session.device_model = "М42100".into();
        session.set_range("0", "150");

        let input = SessionInput {
            upper_range: "300".into(),
            ..SessionInput::default()
        };
        input.apply_to(&mut session).unwrap();
        assert_eq!(session.device_model, "М42100");
        assert_eq!(session.lower_range(), "0");
        assert_eq!(session.upper_range(), "300");
    }

    #[test]
    fn test_template_parses() {
        let input = SessionInput::parse(SessionInput::template()).unwrap();
        assert_eq!(input.points.len(), 5);
        assert_eq!(input.point_count, Some(5));
        assert_eq!(input.transform, Some(TransformFunction::None));

        let mut session = VerificationSession::new();
        input.apply_to(&mut session).unwrap();
        assert_eq!(session.determine_status(), VerificationStatus::Passed);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "point_count = \"many\"").unwrap();
        let err = SessionInput::load(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidSession { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }
}
