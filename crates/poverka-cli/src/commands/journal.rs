//! Verification journal.

use anyhow::Result;
use poverka_types::{VerificationRecord, format_date};
use tabled::{builder::Builder, settings::Style};

use crate::cli::OutputFormat;
use crate::style::format_status_colored;
use crate::util::{AppContext, to_json, write_output};

/// List stored verifications, optionally filtered by device number.
pub fn cmd_journal(search: Option<&str>, format: OutputFormat, ctx: &AppContext) -> Result<()> {
    let store = ctx.open_store()?;
    let records = match search.filter(|s| !s.trim().is_empty()) {
        Some(pattern) => store.search_verifications(pattern.trim())?,
        None => store.list_verifications()?,
    };

    if format == OutputFormat::Json {
        return write_output(None, &to_json(&records)?);
    }

    if records.is_empty() {
        if !ctx.quiet {
            match search {
                Some(pattern) => println!("No verifications match '{}'.", pattern),
                None => println!("The journal is empty. Record one with 'poverka verify run --save'."),
            }
        }
        return Ok(());
    }

    println!("{}", journal_table(&records, ctx.no_color));
    Ok(())
}

fn journal_table(records: &[VerificationRecord], no_color: bool) -> String {
    let mut builder = Builder::default();
    builder.push_record([
        "Date", "Protocol", "Device No.", "Type", "Model", "Range", "Status", "Next due",
    ]);
    for record in records {
        builder.push_record([
            format_date(record.verification_date),
            record.protocol_number.clone(),
            record.device_number.clone(),
            record.device_type.clone(),
            record.device_model.clone(),
            format!("{}..{}", record.lower_range, record.upper_range),
            format_status_colored(record.status, no_color),
            format_date(record.next_verification_date),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}
