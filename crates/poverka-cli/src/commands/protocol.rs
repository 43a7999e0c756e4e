//! Generated protocol files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use poverka_core::protocol::{ProtocolFile, list_protocols};
use tabled::{builder::Builder, settings::Style};
use time::OffsetDateTime;

use crate::cli::ProtocolAction;
use crate::style::format_size;
use crate::util::{AppContext, format_timestamp};

/// Execute a protocol subcommand.
pub fn cmd_protocol(action: ProtocolAction, ctx: &AppContext) -> Result<()> {
    let dir = ctx.config.documents_dir();

    match action {
        ProtocolAction::List => {
            let files = list_protocols(&dir)
                .with_context(|| format!("Failed to list {}", dir.display()))?;
            if files.is_empty() {
                if !ctx.quiet {
                    println!("No protocols in {}.", dir.display());
                }
                return Ok(());
            }
            println!("{}", protocol_table(&files, ctx)?);
            Ok(())
        }
        ProtocolAction::Open { file } => {
            let path = resolve_protocol(&dir, &file)?;
            open::that(&path).with_context(|| format!("Failed to open {}", path.display()))?;
            if !ctx.quiet {
                println!("Opened {}", path.display());
            }
            Ok(())
        }
    }
}

/// A path as given, or a file name inside the documents directory.
fn resolve_protocol(dir: &Path, file: &Path) -> Result<PathBuf> {
    if file.is_file() {
        return Ok(file.to_path_buf());
    }
    let in_dir = dir.join(file);
    if in_dir.is_file() {
        return Ok(in_dir);
    }
    bail!(
        "Protocol '{}' not found. Run 'poverka protocol list' to see available files.",
        file.display()
    )
}

fn protocol_table(files: &[ProtocolFile], ctx: &AppContext) -> Result<String> {
    let mut builder = Builder::default();
    builder.push_record(["File", "Size", "Modified"]);
    for file in files {
        let modified = match file.modified {
            Some(t) => format_timestamp(OffsetDateTime::from(t), ctx.offset)?,
            None => String::new(),
        };
        builder.push_record([file.name.clone(), format_size(file.size), modified]);
    }
    let mut table = builder.build();
    table.with(Style::rounded());
    Ok(table.to_string())
}
