//! Known devices, derived from stored verifications.

use anyhow::{Context, Result};
use poverka_types::{DeviceProfile, format_date};
use tabled::{builder::Builder, settings::Style};

use crate::cli::{DeviceAction, OutputFormat};
use crate::style::format_status_colored;
use crate::util::{AppContext, confirm, to_json, write_output};

/// Execute a device subcommand.
pub fn cmd_device(action: DeviceAction, ctx: &AppContext) -> Result<()> {
    let store = ctx.open_store()?;

    match action {
        DeviceAction::List { output } => {
            let profiles = store.device_profiles()?;
            if output.format == OutputFormat::Json {
                return write_output(None, &to_json(&profiles)?);
            }
            if profiles.is_empty() {
                if !ctx.quiet {
                    println!("No devices yet. They appear after 'poverka verify run --save'.");
                }
                return Ok(());
            }
            println!("{}", profile_table(&profiles));
            Ok(())
        }
        DeviceAction::Show { number, output } => {
            let record = store
                .get_verification_by_device(&number)?
                .with_context(|| format!("Device '{}' not found", number))?;
            if output.format == OutputFormat::Json {
                return write_output(None, &to_json(&record)?);
            }

            println!(
                "Device:        {} {} No. {}",
                record.device_type, record.device_model, record.device_number
            );
            println!("Range:         {}..{}", record.lower_range, record.upper_range);
            println!("Registry:      {}", record.registry_number);
            println!("Accuracy:      {}", record.accuracy_class);
            println!("Transform:     {}", record.transform_function);
            println!("Points:        {}", record.point_count);
            println!("Protocol:      {}", record.protocol_number);
            println!("Verified:      {}", format_date(record.verification_date));
            println!("Next due:      {}", format_date(record.next_verification_date));
            println!(
                "Status:        {}",
                format_status_colored(record.status, ctx.no_color)
            );
            for path in &record.document_paths {
                println!("Document:      {}", path);
            }
            if !record.measurement_result.is_empty() {
                println!();
                print!("{}", record.measurement_result);
            }
            Ok(())
        }
        DeviceAction::Delete { number, yes } => {
            // Fail early on an unknown number instead of asking first
            store.device_profile(&number)?;
            if !confirm(&format!("Delete all verification records of '{}'?", number), yes)? {
                println!("Cancelled.");
                return Ok(());
            }
            let deleted = store.delete_verification_by_device(&number)?;
            if !ctx.quiet {
                println!("Deleted {} record(s) of '{}'", deleted, number);
            }
            Ok(())
        }
    }
}

fn profile_table(profiles: &[DeviceProfile]) -> String {
    let mut builder = Builder::default();
    builder.push_record([
        "Device No.", "Type", "Model", "Range", "Points", "Transform", "Registry", "Class",
    ]);
    for p in profiles {
        builder.push_record([
            p.device_number.clone(),
            p.device_type.clone(),
            p.device_model.clone(),
            format!("{}..{}", p.lower_range, p.upper_range),
            p.point_count.to_string(),
            p.transform_function.to_string(),
            p.registry_number.clone(),
            p.accuracy_class.clone(),
        ]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}
