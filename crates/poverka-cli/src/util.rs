//! Utility functions for CLI operations.

use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use dialoguer::{Confirm, theme::ColorfulTheme};
use poverka_store::Store;
use poverka_types::parse_date;
use time::macros::format_description;
use time::{Date, Month, OffsetDateTime, UtcOffset};

use crate::config::Config;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Config,
    pub db_path: PathBuf,
    /// Local UTC offset, captured before the runtime starts its threads.
    pub offset: UtcOffset,
    pub quiet: bool,
    pub no_color: bool,
}

impl AppContext {
    /// Current time in the local offset.
    pub fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }

    pub fn today(&self) -> Date {
        self.now().date()
    }

    pub fn open_store(&self) -> Result<Store> {
        Store::open(&self.db_path)
            .with_context(|| format!("Failed to open database {}", self.db_path.display()))
    }

    /// Parse an optional day argument, defaulting to today.
    pub fn date_or_today(&self, arg: Option<&str>) -> Result<Date> {
        match arg {
            Some(s) => parse_day(s, self.today()),
            None => Ok(self.today()),
        }
    }
}

/// Parse a day as `YYYY-MM-DD`, `DD.MM.YYYY`, `today`, `tomorrow` or
/// `yesterday`.
pub fn parse_day(s: &str, today: Date) -> Result<Date> {
    let parsed = match s.trim().to_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => today.next_day(),
        "yesterday" => today.previous_day(),
        _ => None,
    };
    match parsed {
        Some(date) => Ok(date),
        None => Ok(parse_date(s)?),
    }
}

/// Parse a month as `YYYY-MM` or `MM.YYYY`.
pub fn parse_month(s: &str) -> Result<(i32, Month)> {
    let s = s.trim();
    let (year, month) = if let Some((y, m)) = s.split_once('-') {
        (y, m)
    } else if let Some((m, y)) = s.split_once('.') {
        (y, m)
    } else {
        bail!("Invalid month '{}'. Use YYYY-MM", s);
    };
    let year: i32 = year
        .parse()
        .with_context(|| format!("Invalid year in '{}'", s))?;
    let month: u8 = month
        .parse()
        .with_context(|| format!("Invalid month in '{}'", s))?;
    let month = Month::try_from(month).with_context(|| format!("Invalid month in '{}'", s))?;
    Ok((year, month))
}

/// Ask before a destructive action. `yes` skips the prompt; without a
/// terminal the action is refused.
pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    if !io::stdin().is_terminal() || !io::stderr().is_terminal() {
        bail!("Refusing to continue without confirmation. Pass --yes to proceed.");
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to get user confirmation")
}

/// Write output to file or stdout.
pub fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

/// Timestamp as local `YYYY-MM-DD HH:MM`.
pub fn format_timestamp(ts: OffsetDateTime, offset: UtcOffset) -> Result<String> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]");
    Ok(ts.to_offset(offset).format(&format)?)
}

/// Pretty-printed JSON followed by a newline.
pub fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    json.push('\n');
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn test_parse_day_keywords() {
        let today = date!(2024 - 02 - 29);
        assert_eq!(parse_day("today", today).unwrap(), today);
        assert_eq!(parse_day("Tomorrow", today).unwrap(), date!(2024 - 03 - 01));
        assert_eq!(parse_day("yesterday", today).unwrap(), date!(2024 - 02 - 28));
    }

    #[test]
    fn test_parse_day_formats() {
        let today = date!(2024 - 01 - 01);
        assert_eq!(parse_day("2024-02-16", today).unwrap(), date!(2024 - 02 - 16));
        assert_eq!(parse_day("16.02.2024", today).unwrap(), date!(2024 - 02 - 16));
        assert!(parse_day("next week", today).is_err());
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-02").unwrap(), (2024, Month::February));
        assert_eq!(parse_month("11.2023").unwrap(), (2023, Month::November));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("February").is_err());
    }

    #[test]
    fn test_format_timestamp_uses_offset() {
        let ts = time::macros::datetime!(2024-02-16 04:30 UTC);
        let text = format_timestamp(ts, time::macros::offset!(+5)).unwrap();
        assert_eq!(text, "2024-02-16 09:30");
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_output(Some(path.as_path()), "hello\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");
    }

    #[test]
    fn test_confirm_with_yes_skips_prompt() {
        assert!(confirm("Delete everything?", true).unwrap());
    }
}
