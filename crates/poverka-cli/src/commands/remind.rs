//! Daily climate-journal reminder.

use anyhow::{Context, Result};
use notify_rust::Notification;
use poverka_core::reminder::REMINDER_CHANNEL;
use poverka_core::{Notifier, Reminder, ReminderDecision, ReminderSchedule};
use poverka_store::Store;
use time::{OffsetDateTime, UtcOffset};
use tracing::{debug, info, warn};

use crate::cli::RemindAction;
use crate::util::{AppContext, format_timestamp};

/// Posts reminders as desktop notifications, under the reminder channel
/// name.
#[derive(Debug, Clone, Copy)]
pub struct DesktopNotifier {
    app_name: &'static str,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self {
            app_name: REMINDER_CHANNEL,
        }
    }
}

impl DesktopNotifier {
    fn notification(&self, title: &str, body: &str) -> Notification {
        let mut notification = Notification::new();
        notification.summary(title).body(body).appname(self.app_name);
        notification
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, title: &str, body: &str) -> poverka_core::Result<()> {
        self.notification(title, body)
            .show()
            .map(|_| ())
            .map_err(|e| poverka_core::Error::Notification(e.to_string()))
    }
}

/// Execute a remind subcommand.
pub async fn cmd_remind(action: RemindAction, ctx: &AppContext) -> Result<()> {
    let schedule = ctx.config.reminder.clone();
    schedule.fire_time().context("Invalid reminder time in config")?;

    match action {
        RemindAction::Check { force } => check(ctx, schedule, force),
        RemindAction::Next => {
            let next = schedule.next_fire(ctx.now())?;
            println!("{}", format_timestamp(next, ctx.offset)?);
            Ok(())
        }
        RemindAction::Daemon => daemon(ctx, schedule).await,
    }
}

fn has_climate_on(store: &Store, ctx: &AppContext, day: time::Date) -> poverka_core::Result<bool> {
    store
        .has_climate_on(day, ctx.offset)
        .map_err(poverka_core::Error::store)
}

/// Evaluate the reminder once. Without `force` the firing must fall inside
/// today's window.
fn check(ctx: &AppContext, schedule: ReminderSchedule, force: bool) -> Result<()> {
    let store = ctx.open_store()?;
    let reminder = Reminder::new(schedule, DesktopNotifier::default());
    let now = ctx.now();

    let decision = if force {
        let recorded = has_climate_on(&store, ctx, now.date())?;
        reminder.check(now.date(), recorded)?
    } else {
        let scheduled = now.replace_time(reminder.schedule().fire_time()?);
        if now < scheduled {
            if !ctx.quiet {
                println!("Reminder not due until {}", format_timestamp(scheduled, ctx.offset)?);
            }
            return Ok(());
        }
        reminder.fire(scheduled, now, |day| has_climate_on(&store, ctx, day))?
    };

    report(decision, ctx.quiet);
    Ok(())
}

fn report(decision: ReminderDecision, quiet: bool) {
    if quiet {
        return;
    }
    match decision {
        ReminderDecision::Notify => println!("Reminder sent"),
        ReminderDecision::Skip(reason) => println!("Reminder skipped: {}", reason),
    }
}

/// Sleep until each scheduled time and fire the reminder, until Ctrl-C.
///
/// Best effort: a firing observed outside its window (for example after a
/// suspend) is dropped, not replayed.
///
/// The local offset is looked up again before every wait. Where the lookup
/// is refused once threads are running (most Unix platforms), the offset
/// from startup is kept, so across a daylight-saving change the reminder
/// fires an hour early or late until the daemon is restarted.
async fn daemon(ctx: &AppContext, schedule: ReminderSchedule) -> Result<()> {
    if !ctx.quiet {
        eprintln!("Reminder daemon started. Press Ctrl-C to stop.");
    }

    let mut ctx = ctx.clone();
    loop {
        ctx.offset = current_offset(ctx.offset);
        let now = ctx.now();
        let scheduled = next_wakeup(&schedule, now)?;
        let wait = std::time::Duration::try_from(scheduled - now).unwrap_or_default();
        info!("Next reminder at {}", format_timestamp(scheduled, ctx.offset)?);

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Reminder daemon stopped");
                return Ok(());
            }
        }

        let task_ctx = ctx.clone();
        let task_schedule = schedule.clone();
        let result = tokio::task::spawn_blocking(move || {
            fire_once(&task_ctx, task_schedule, scheduled, task_ctx.now())
        })
        .await
        .context("Reminder task failed")?;

        match result {
            Ok(decision) => report(decision, ctx.quiet),
            Err(e) => warn!("Reminder failed: {:#}", e),
        }
    }
}

/// Local offset right now, or `fallback` when it cannot be determined.
fn current_offset(fallback: UtcOffset) -> UtcOffset {
    match UtcOffset::current_local_offset() {
        Ok(offset) => {
            if offset != fallback {
                info!("Local offset changed to {}", offset);
            }
            offset
        }
        Err(e) => {
            debug!("Keeping offset {}: {}", fallback, e);
            fallback
        }
    }
}

/// Next firing after `now`, in the offset `now` carries.
fn next_wakeup(schedule: &ReminderSchedule, now: OffsetDateTime) -> Result<OffsetDateTime> {
    Ok(schedule.next_fire(now)?)
}

fn fire_once(
    ctx: &AppContext,
    schedule: ReminderSchedule,
    scheduled: OffsetDateTime,
    observed: OffsetDateTime,
) -> Result<ReminderDecision> {
    let store = ctx.open_store()?;
    let reminder = Reminder::new(schedule, DesktopNotifier::default());
    let decision = reminder.fire(scheduled, observed, |day| has_climate_on(&store, ctx, day))?;
    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn test_notifier_uses_channel_name() {
        let notification = DesktopNotifier::default().notification("title", "body");
        assert_eq!(notification.appname, REMINDER_CHANNEL);
        assert_eq!(notification.summary, "title");
        assert_eq!(notification.body, "body");
    }

    #[test]
    fn test_next_wakeup_follows_refreshed_offset() {
        let schedule = ReminderSchedule::default();
        let instant = datetime!(2024-03-31 05:00 UTC);

        // Same instant before and after a daylight-saving change
        let winter = next_wakeup(&schedule, instant.to_offset(offset!(+1))).unwrap();
        let summer = next_wakeup(&schedule, instant.to_offset(offset!(+2))).unwrap();

        assert_eq!(winter.time(), time::macros::time!(09:00));
        assert_eq!(summer.time(), time::macros::time!(09:00));
        assert_eq!(winter - summer, time::Duration::hours(1));
    }

    #[test]
    fn test_current_offset_is_valid() {
        let fallback = offset!(+3);
        let offset = current_offset(fallback);
        assert!(offset.whole_hours().abs() <= 14);
    }
}
