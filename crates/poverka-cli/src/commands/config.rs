//! Config command.

use anyhow::{Result, bail};

use crate::cli::ConfigAction;
use crate::config::Config;
use crate::util::AppContext;

pub fn cmd_config(action: ConfigAction, ctx: &AppContext) -> Result<()> {
    let path = Config::path();

    match action {
        ConfigAction::Show => {
            if !ctx.quiet {
                println!("# {}", path.display());
                println!("# database in use: {}", ctx.db_path.display());
                println!("# protocols in: {}", ctx.config.documents_dir().display());
                println!();
            }
            print!("{}", ctx.config.to_toml()?);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config file already exists at {}. Pass --force to overwrite it.",
                    path.display()
                );
            }
            Config::default().save_to(&path)?;
            if !ctx.quiet {
                println!("Created config at {}", path.display());
            }
        }
    }

    Ok(())
}
