//! Error calculation and verification sessions.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use poverka_core::calibration::{forward_scale_mark, parse_decimal};
use poverka_core::protocol::{ProtocolConfig, ProtocolData, ProtocolOutcome, write_protocol};
use poverka_core::{
    MeasurementGroup, MeasurementPoint, OperationStatus, RangeBounds, SessionInput,
    TransformFunction, VerificationSession, VerificationStatus,
};
use poverka_store::Store;
use serde::Serialize;
use serde_json::json;
use tabled::{builder::Builder, settings::Style};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::cli::{OutputFormat, VerifyAction};
use crate::style::{format_error_colored, format_status_colored, maybe_spinner};
use crate::util::{AppContext, to_json, write_output};

/// Execute a verify subcommand.
pub async fn cmd_verify(action: VerifyAction, ctx: &AppContext) -> Result<()> {
    match action {
        VerifyAction::Point {
            scale_mark,
            ascending,
            descending,
            lower,
            upper,
            transform,
            max_error,
            output,
        } => {
            let input = PointArgs {
                scale_mark: number(&scale_mark, "scale mark")?,
                ascending: number(&ascending, "ascending reading")?,
                descending: number(&descending, "descending reading")?,
                range: RangeBounds::new(
                    number(&lower, "lower range")?,
                    number(&upper, "upper range")?,
                ),
                transform,
                max_error: max_error.unwrap_or(ctx.config.protocol.max_allowed_error),
            };
            single_point(&input, output.format, ctx.no_color)
        }
        VerifyAction::Run {
            session,
            profile,
            save,
            pdf,
            output,
        } => run_session(ctx, &session, profile.as_deref(), save, pdf, output.format).await,
        VerifyAction::Template { output } => {
            write_output(output.as_deref(), SessionInput::template())?;
            if let Some(path) = output {
                if !ctx.quiet {
                    eprintln!("Session template written to {}", path.display());
                }
            }
            Ok(())
        }
    }
}

fn number(s: &str, what: &str) -> Result<f64> {
    match parse_decimal(s) {
        Some(v) => Ok(v),
        None => bail!("Invalid {}: '{}'", what, s),
    }
}

struct PointArgs {
    scale_mark: f64,
    ascending: f64,
    descending: f64,
    range: RangeBounds,
    transform: TransformFunction,
    max_error: f64,
}

fn single_point(args: &PointArgs, format: OutputFormat, no_color: bool) -> Result<()> {
    if args.range.span() == 0.0 {
        warn!("Range has zero width, errors are reported as zero");
    }
    let point = MeasurementPoint::with_readings(
        0,
        args.scale_mark,
        args.ascending,
        args.descending,
        args.transform,
        args.range,
    );
    let setpoint = forward_scale_mark(args.scale_mark, args.transform, args.range.span());
    let status = if point.exceeds(args.max_error) {
        VerificationStatus::Failed
    } else {
        VerificationStatus::Passed
    };

    if format == OutputFormat::Json {
        let report = json!({
            "scale_mark": args.scale_mark,
            "setpoint": setpoint,
            "transform": args.transform,
            "lower_range": args.range.lower,
            "upper_range": args.range.upper,
            "max_allowed_error": args.max_error,
            "point": point,
            "status": status,
        });
        return write_output(None, &to_json(&report)?);
    }

    let reading_unit = args.transform.reading_unit().unwrap_or("");
    println!("Scale mark:   {}", args.scale_mark);
    if args.transform.is_transformed() {
        println!("Set source:   {:.4} {}", setpoint, reading_unit);
    }
    println!(
        "Ascending:    {} -> {:.4}, error {} %",
        args.ascending,
        point.transformed_ascending(),
        format_error_colored(point.error_ascending(), args.max_error, no_color)
    );
    println!(
        "Descending:   {} -> {:.4}, error {} %",
        args.descending,
        point.transformed_descending(),
        format_error_colored(point.error_descending(), args.max_error, no_color)
    );
    println!("Variation:    {:.4}", point.variation());
    println!("Tolerance:    ±{} %", args.max_error);
    println!("Verdict:      {}", format_status_colored(status, no_color));
    Ok(())
}

/// Machine-readable result of a session run.
#[derive(Serialize)]
struct SessionReport<'a> {
    protocol_number: &'a str,
    device_number: &'a str,
    device_type: &'a str,
    transform: TransformFunction,
    lower_range: f64,
    upper_range: f64,
    status: VerificationStatus,
    groups: &'a [MeasurementGroup],
    protocol: Option<&'a Path>,
    superseded: Option<usize>,
}

async fn run_session(
    ctx: &AppContext,
    path: &Path,
    profile: Option<&str>,
    save: bool,
    pdf: bool,
    format: OutputFormat,
) -> Result<()> {
    let input = SessionInput::load(path)
        .with_context(|| format!("Failed to load session {}", path.display()))?;
    let today = ctx.today();

    let mut session =
        VerificationSession::new().with_max_allowed_error(ctx.config.protocol.max_allowed_error);

    {
        let store = ctx.open_store()?;
        if let Some(number) = profile {
            let profile = store.device_profile(number)?;
            debug!("Applying stored profile of {}", profile.device_number);
            session.apply_profile(&profile);
        }
        input.apply_to(&mut session)?;
        if input.conditions.is_none() {
            load_climate(&store, ctx, &mut session)?;
        }
    }

    let mut status = session.determine_status();
    if !session.has_readings() {
        status = VerificationStatus::Pending;
    }

    let mut outcome = None;
    if pdf {
        let result = generate_protocol(ctx, &session, ctx.now()).await;
        session.statuses.pdf = match &result {
            Ok(o) => o.status(),
            Err(e) => OperationStatus::Error(format!("{:#}", e)),
        };
        outcome = Some(result?);
    }

    let mut superseded = None;
    if save {
        let mut record = session.to_record(today);
        if let Some(outcome) = &outcome {
            record.document_paths.push(outcome.path.display().to_string());
        }
        let store = ctx.open_store()?;
        let result = store.save_verification(&record);
        session.statuses.save = match &result {
            Ok(_) => OperationStatus::Success(record.id.clone()),
            Err(e) => OperationStatus::Error(e.to_string()),
        };
        superseded = Some(result.context("Failed to save verification")?);
    }

    if format == OutputFormat::Json {
        let range = session.range();
        let report = SessionReport {
            protocol_number: &session.protocol_number,
            device_number: &session.device_number,
            device_type: &session.device_type,
            transform: session.transform(),
            lower_range: range.lower,
            upper_range: range.upper,
            status,
            groups: session.groups(),
            protocol: outcome.as_ref().map(|o| o.path.as_path()),
            superseded,
        };
        return write_output(None, &to_json(&report)?);
    }

    print_session(&session, status, ctx.no_color);
    if let Some(outcome) = &outcome {
        if let Some(error) = &outcome.section_error {
            eprintln!("Warning: protocol is incomplete: {}", error);
        }
        if !outcome.font.is_unicode() {
            eprintln!(
                "Warning: no Cyrillic font found, protocol text was transliterated. \
                 Set protocol.font_path in the config file."
            );
        }
        println!("Protocol: {}", outcome.path.display());
    }
    if let Some(superseded) = superseded {
        if superseded > 0 {
            println!(
                "Saved to journal, replacing {} earlier record(s) of {}",
                superseded, session.device_number
            );
        } else {
            println!("Saved to journal");
        }
    }
    Ok(())
}

/// Fill the session conditions from today's latest journal entry.
fn load_climate(store: &Store, ctx: &AppContext, session: &mut VerificationSession) -> Result<()> {
    let latest = store
        .latest_climate()?
        .map(|record| (record.timestamp.to_offset(ctx.offset).date(), record.conditions()));
    if let Err(e) = session.load_climate(latest, ctx.today()) {
        if !ctx.quiet {
            eprintln!("Warning: {}", e);
        }
    }
    Ok(())
}

async fn generate_protocol(
    ctx: &AppContext,
    session: &VerificationSession,
    now: OffsetDateTime,
) -> Result<ProtocolOutcome> {
    let data = ProtocolData::from_session(session, now.date());
    let config: ProtocolConfig = ctx.config.protocol.clone();
    let dir: PathBuf = ctx.config.documents_dir();

    let spinner = maybe_spinner("Generating protocol...", ctx.quiet);
    let result = tokio::task::spawn_blocking(move || write_protocol(&data, &config, &dir, now))
        .await
        .context("Protocol generation task failed")?;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    result.context("Failed to write protocol")
}

fn print_session(session: &VerificationSession, status: VerificationStatus, no_color: bool) {
    let transform = session.transform();
    let range = session.range();
    let unit = session.unit();

    println!(
        "Protocol {}  {} {} No. {}",
        session.protocol_number, session.device_type, session.device_model, session.device_number
    );
    println!(
        "Range {}..{} {}, transform {}",
        range.lower, range.upper, unit, transform
    );
    if !session.conditions.is_empty() {
        println!(
            "Conditions: {} °C, {} %, {} kPa",
            session.conditions.temperature,
            session.conditions.humidity,
            session.conditions.pressure
        );
    }

    for group in session.groups() {
        println!();
        println!("{} (±{} %)", group.name, group.max_allowed_error);
        println!("{}", group_table(group, transform, range, no_color));
    }
    println!();
    println!("Verdict: {}", format_status_colored(status, no_color));
}

fn group_table(
    group: &MeasurementGroup,
    transform: TransformFunction,
    range: RangeBounds,
    no_color: bool,
) -> String {
    let mut builder = Builder::default();
    let mut header = vec!["No.", "Mark"];
    if transform.is_transformed() {
        header.push("Set");
    }
    header.extend(["Up", "Down", "Error up, %", "Error down, %", "Variation"]);
    builder.push_record(header);

    for point in group.points() {
        let mut row = vec![(point.id() + 1).to_string(), format!("{}", point.scale_mark())];
        if transform.is_transformed() {
            row.push(format!(
                "{:.4}",
                forward_scale_mark(point.scale_mark(), transform, range.span())
            ));
        }
        row.push(format!("{}", point.reference_ascending()));
        row.push(format!("{}", point.reference_descending()));
        row.push(format_error_colored(
            point.error_ascending(),
            group.max_allowed_error,
            no_color,
        ));
        row.push(format_error_colored(
            point.error_descending(),
            group.max_allowed_error,
            no_color,
        ));
        row.push(format!("{:.4}", point.variation()));
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}
