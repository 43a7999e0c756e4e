//! Climate journal commands.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use anyhow::{Context, Result, bail};
use poverka_core::{ClimateConditions, ClimateValidator};
use poverka_store::{ClimateQuery, ClimateRecord, Store, day_bounds};
use tabled::{builder::Builder, settings::Style};

use crate::cli::{ClimateAction, OutputFormat};
use crate::util::{AppContext, confirm, format_timestamp, parse_day, to_json, write_output};

/// Execute a climate subcommand.
pub fn cmd_climate(action: ClimateAction, ctx: &AppContext) -> Result<()> {
    let store = ctx.open_store()?;

    match action {
        ClimateAction::Add {
            temperature,
            humidity,
            pressure,
        } => add_entry(&store, ctx, ClimateConditions::new(temperature, humidity, pressure)),
        ClimateAction::List { limit, output } => {
            let mut query = ClimateQuery::new();
            if limit > 0 {
                query = query.limit(limit);
            }
            show_entries(&store, ctx, &query, output.format, "No climate entries recorded.")
        }
        ClimateAction::Today { output } => {
            let query = ClimateQuery::day(ctx.today(), ctx.offset);
            show_entries(&store, ctx, &query, output.format, "Nothing recorded today.")
        }
        ClimateAction::ClearToday { yes } => clear_today(&store, ctx, yes),
        ClimateAction::Export {
            output,
            since,
            until,
        } => export(&store, ctx, output.as_deref(), since, until),
    }
}

fn add_entry(store: &Store, ctx: &AppContext, conditions: ClimateConditions) -> Result<()> {
    let validator = ClimateValidator::new(ctx.config.climate.clone());
    if let Err(errors) = validator.validate(&conditions) {
        for error in errors.iter() {
            eprintln!("  {}", error);
        }
        bail!("Climate entry rejected ({} invalid field(s))", errors.len());
    }

    let id = store
        .insert_climate(&conditions, ctx.now())
        .context("Failed to save climate entry")?;

    if !ctx.quiet {
        println!(
            "Recorded #{}: {} °C, {} %, {} kPa",
            id, conditions.temperature, conditions.humidity, conditions.pressure
        );
    }
    Ok(())
}

fn show_entries(
    store: &Store,
    ctx: &AppContext,
    query: &ClimateQuery,
    format: OutputFormat,
    empty_message: &str,
) -> Result<()> {
    let records = store.query_climate(query)?;

    if format == OutputFormat::Json {
        return write_output(None, &to_json(&records)?);
    }

    if records.is_empty() {
        if !ctx.quiet {
            println!("{}", empty_message);
        }
        return Ok(());
    }

    println!("{}", climate_table(&records, ctx)?);
    Ok(())
}

fn climate_table(records: &[ClimateRecord], ctx: &AppContext) -> Result<String> {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Time", "Temperature, °C", "Humidity, %", "Pressure, kPa"]);
    for record in records {
        builder.push_record([
            record.id.to_string(),
            format_timestamp(record.timestamp, ctx.offset)?,
            record.temperature.clone(),
            record.humidity.clone(),
            record.pressure.clone(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    Ok(table.to_string())
}

fn clear_today(store: &Store, ctx: &AppContext, yes: bool) -> Result<()> {
    let query = ClimateQuery::day(ctx.today(), ctx.offset);
    let count = store.count_climate(&query)?;
    if count == 0 {
        if !ctx.quiet {
            println!("Nothing recorded today.");
        }
        return Ok(());
    }

    if !confirm(&format!("Delete {} climate entries recorded today?", count), yes)? {
        println!("Cancelled.");
        return Ok(());
    }

    let deleted = store.delete_climate(&query)?;
    if !ctx.quiet {
        println!("Deleted {} entries.", deleted);
    }
    Ok(())
}

fn export(
    store: &Store,
    ctx: &AppContext,
    output: Option<&Path>,
    since: Option<String>,
    until: Option<String>,
) -> Result<()> {
    let mut query = ClimateQuery::new().oldest_first();
    if let Some(since) = since {
        let day = parse_day(&since, ctx.today())?;
        query = query.since(day_bounds(day, ctx.offset).0);
    }
    if let Some(until) = until {
        let day = parse_day(&until, ctx.today())?;
        query = query.until(day_bounds(day, ctx.offset).1);
    }

    let written = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            store.export_climate_csv(&query, BufWriter::new(file))?
        }
        None => store.export_climate_csv(&query, io::stdout().lock())?,
    };

    if !ctx.quiet {
        eprintln!("Exported {} climate entries", written);
    }
    Ok(())
}
