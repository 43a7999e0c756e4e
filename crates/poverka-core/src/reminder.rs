//! Daily climate-journal reminder.
//!
//! A single alarm fires every day at a fixed local time. When it fires on a
//! working day and no climate reading has been recorded yet, a desktop
//! notification asks the operator to fill in the journal. Delivery is best
//! effort: a firing observed too long after its scheduled time is dropped
//! rather than caught up.
//!
//! # Example
//!
//! ```
//! use poverka_core::reminder::{ReminderDecision, ReminderSchedule, SkipReason, decide};
//! use time::macros::{date, datetime};
//!
//! let schedule = ReminderSchedule::default();
//! let next = schedule.next_fire(datetime!(2024-02-16 10:30 UTC)).unwrap();
//! assert_eq!(next, datetime!(2024-02-17 09:00 UTC));
//!
//! // Saturday
//! assert_eq!(
//!     decide(date!(2024 - 02 - 17), false),
//!     ReminderDecision::Skip(SkipReason::Weekend)
//! );
//! ```

use serde::{Deserialize, Serialize};
use time::{Date, Duration, OffsetDateTime, Time, Weekday};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Notification title.
pub const REMINDER_TITLE: &str = "Заполните данные о климате";

/// Notification body.
pub const REMINDER_BODY: &str = "Не забудьте ввести температуру, давление и влажность.";

/// Human-readable name of the reminder channel.
pub const REMINDER_CHANNEL: &str = "Напоминания о климате";

/// When the daily reminder fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderSchedule {
    /// Hour of day, local time.
    pub hour: u8,
    /// Minute of the hour.
    pub minute: u8,
    /// How late a firing may be observed and still count.
    pub window_minutes: u32,
}

impl Default for ReminderSchedule {
    fn default() -> Self {
        Self {
            hour: 9,
            minute: 0,
            window_minutes: 5,
        }
    }
}

impl ReminderSchedule {
    /// The configured time of day.
    pub fn fire_time(&self) -> Result<Time> {
        Time::from_hms(self.hour, self.minute, 0).map_err(|_| Error::InvalidSchedule {
            hour: self.hour,
            minute: self.minute,
        })
    }

    pub fn window(&self) -> Duration {
        Duration::minutes(i64::from(self.window_minutes))
    }

    /// Next firing strictly after `now`, in the offset of `now`.
    pub fn next_fire(&self, now: OffsetDateTime) -> Result<OffsetDateTime> {
        let today = now.replace_time(self.fire_time()?);
        if today <= now {
            Ok(today + Duration::days(1))
        } else {
            Ok(today)
        }
    }

    /// Returns `true` if a firing scheduled at `scheduled` and observed at
    /// `observed` is still inside the delivery window.
    pub fn is_on_time(&self, scheduled: OffsetDateTime, observed: OffsetDateTime) -> bool {
        observed >= scheduled && observed - scheduled <= self.window()
    }
}

/// Why a firing did not produce a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// Saturday or Sunday.
    Weekend,
    /// A climate reading already exists for today.
    AlreadyRecorded,
    /// The firing was observed after the delivery window.
    Missed,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Weekend => write!(f, "weekend"),
            SkipReason::AlreadyRecorded => write!(f, "climate data already recorded today"),
            SkipReason::Missed => write!(f, "alarm missed its delivery window"),
        }
    }
}

/// Outcome of a reminder firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderDecision {
    Notify,
    Skip(SkipReason),
}

/// Returns `true` for Saturday and Sunday.
pub fn is_weekend(date: Date) -> bool {
    matches!(date.weekday(), Weekday::Saturday | Weekday::Sunday)
}

/// Decide whether to notify on `today`.
pub fn decide(today: Date, has_climate_today: bool) -> ReminderDecision {
    if is_weekend(today) {
        ReminderDecision::Skip(SkipReason::Weekend)
    } else if has_climate_today {
        ReminderDecision::Skip(SkipReason::AlreadyRecorded)
    } else {
        ReminderDecision::Notify
    }
}

/// Sink for reminder notifications.
pub trait Notifier {
    /// Show a notification with the given title and body.
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Evaluates reminder firings and forwards them to a [`Notifier`].
#[derive(Debug, Clone)]
pub struct Reminder<N> {
    schedule: ReminderSchedule,
    notifier: N,
}

impl<N: Notifier> Reminder<N> {
    pub fn new(schedule: ReminderSchedule, notifier: N) -> Self {
        Self { schedule, notifier }
    }

    pub fn schedule(&self) -> &ReminderSchedule {
        &self.schedule
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Handle one firing observed right now, without a scheduled time.
    pub fn check(&self, today: Date, has_climate_today: bool) -> Result<ReminderDecision> {
        let decision = decide(today, has_climate_today);
        match decision {
            ReminderDecision::Notify => {
                info!("No climate data for {today}, sending reminder");
                self.notifier.notify(REMINDER_TITLE, REMINDER_BODY)?;
            }
            ReminderDecision::Skip(reason) => debug!("Reminder skipped: {reason}"),
        }
        Ok(decision)
    }

    /// Handle a firing that was due at `scheduled` and observed at `observed`.
    ///
    /// `has_climate_today` is only consulted if the firing is on time.
    pub fn fire(
        &self,
        scheduled: OffsetDateTime,
        observed: OffsetDateTime,
        has_climate_today: impl FnOnce(Date) -> Result<bool>,
    ) -> Result<ReminderDecision> {
        if !self.schedule.is_on_time(scheduled, observed) {
            debug!("Reminder due at {scheduled} observed at {observed}, dropping");
            return Ok(ReminderDecision::Skip(SkipReason::Missed));
        }
        let today = observed.date();
        let recorded = has_climate_today(today)?;
        self.check(today, recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use time::macros::{date, datetime, offset};

    #[derive(Default)]
    struct RecordingNotifier {
        sent: RefCell<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, title: &str, body: &str) -> Result<()> {
            self.sent
                .borrow_mut()
                .push((title.to_string(), body.to_string()));
            Ok(())
        }
    }

    struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn notify(&self, _title: &str, _body: &str) -> Result<()> {
            Err(Error::Notification("no notification daemon".into()))
        }
    }

    #[test]
    fn test_next_fire_later_today() {
        let schedule = ReminderSchedule::default();
        let now = datetime!(2024-02-16 07:15 +5);
        assert_eq!(schedule.next_fire(now).unwrap(), datetime!(2024-02-16 09:00 +5));
    }

    #[test]
    fn test_next_fire_exactly_at_time_rolls_over() {
        let schedule = ReminderSchedule::default();
        let now = datetime!(2024-02-16 09:00 +5);
        let next = schedule.next_fire(now).unwrap();
        assert_eq!(next, datetime!(2024-02-17 09:00 +5));
        assert_eq!(next.offset(), offset!(+5));
    }

    #[test]
    fn test_invalid_schedule() {
        let schedule = ReminderSchedule {
            hour: 25,
            ..ReminderSchedule::default()
        };
        assert!(matches!(
            schedule.next_fire(datetime!(2024-02-16 07:00 UTC)),
            Err(Error::InvalidSchedule { hour: 25, minute: 0 })
        ));
    }

    #[test]
    fn test_window() {
        let schedule = ReminderSchedule::default();
        let due = datetime!(2024-02-16 09:00 UTC);
        assert!(schedule.is_on_time(due, due));
        assert!(schedule.is_on_time(due, datetime!(2024-02-16 09:05 UTC)));
        assert!(!schedule.is_on_time(due, datetime!(2024-02-16 09:05:01 UTC)));
        assert!(!schedule.is_on_time(due, datetime!(2024-02-16 08:59 UTC)));
    }

    #[test]
    fn test_decide() {
        // 2024-02-16 is a Friday.
        assert_eq!(decide(date!(2024 - 02 - 16), false), ReminderDecision::Notify);
        assert_eq!(
            decide(date!(2024 - 02 - 16), true),
            ReminderDecision::Skip(SkipReason::AlreadyRecorded)
        );
        assert_eq!(
            decide(date!(2024 - 02 - 18), false),
            ReminderDecision::Skip(SkipReason::Weekend)
        );
        assert!(is_weekend(date!(2024 - 02 - 17)));
        assert!(!is_weekend(date!(2024 - 02 - 19)));
    }

    #[test]
    fn test_check_sends_notification() {
        let reminder = Reminder::new(ReminderSchedule::default(), RecordingNotifier::default());
        let decision = reminder.check(date!(2024 - 02 - 16), false).unwrap();
        assert_eq!(decision, ReminderDecision::Notify);

        let sent = reminder.notifier().sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, REMINDER_TITLE);
        assert_eq!(sent[0].1, REMINDER_BODY);
    }

    #[test]
    fn test_fire_drops_missed_alarm() {
        let reminder = Reminder::new(ReminderSchedule::default(), RecordingNotifier::default());
        let due = datetime!(2024-02-16 09:00 UTC);
        let decision = reminder
            .fire(due, datetime!(2024-02-16 11:00 UTC), |_| {
                panic!("store must not be consulted for a missed alarm")
            })
            .unwrap();
        assert_eq!(decision, ReminderDecision::Skip(SkipReason::Missed));
        assert!(reminder.notifier().sent.borrow().is_empty());
    }

    #[test]
    fn test_fire_on_time_consults_store() {
        let reminder = Reminder::new(ReminderSchedule::default(), RecordingNotifier::default());
        let due = datetime!(2024-02-16 09:00 UTC);
        let decision = reminder
            .fire(due, datetime!(2024-02-16 09:01 UTC), |day| {
                assert_eq!(day, date!(2024 - 02 - 16));
                Ok(true)
            })
            .unwrap();
        assert_eq!(decision, ReminderDecision::Skip(SkipReason::AlreadyRecorded));
    }

    #[test]
    fn test_notifier_error_propagates() {
        let reminder = Reminder::new(ReminderSchedule::default(), FailingNotifier);
        let err = reminder.check(date!(2024 - 02 - 16), false).unwrap_err();
        assert!(err.to_string().contains("no notification daemon"));
    }
}
