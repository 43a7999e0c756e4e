//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use poverka_types::{TaskPriority, TransformFunction};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Reusable output format arguments
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Task priority as accepted on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    #[default]
    Normal,
    High,
    Urgent,
}

impl From<PriorityArg> for TaskPriority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Normal => TaskPriority::Normal,
            PriorityArg::High => TaskPriority::High,
            PriorityArg::Urgent => TaskPriority::Urgent,
        }
    }
}

#[derive(Parser)]
#[command(name = "poverka")]
#[command(
    author,
    version,
    about = "Climate journal, tasks and verification protocols for a metrology workshop",
    long_about = None
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = clap::builder::BoolishValueParser::new())]
    pub no_color: bool,

    /// Database file (overrides the config file)
    #[arg(long, global = true, env = "POVERKA_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record and review laboratory climate conditions
    Climate {
        #[command(subcommand)]
        action: ClimateAction,
    },

    /// Plan and track daily tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Calculate instrument errors and record verifications
    Verify {
        #[command(subcommand)]
        action: VerifyAction,
    },

    /// Known devices from past verifications
    Device {
        #[command(subcommand)]
        action: DeviceAction,
    },

    /// Verification journal, newest first
    Journal {
        /// Device number pattern (`%` and `_` wildcards allowed)
        #[arg(short, long)]
        search: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generated PDF protocols
    Protocol {
        #[command(subcommand)]
        action: ProtocolAction,
    },

    /// Daily reminder to fill in the climate journal
    Remind {
        #[command(subcommand)]
        action: RemindAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Climate journal subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum ClimateAction {
    /// Record the current conditions
    Add {
        /// Temperature in °C
        #[arg(allow_hyphen_values = true)]
        temperature: String,
        /// Relative humidity in %
        humidity: String,
        /// Atmospheric pressure in kPa
        pressure: String,
    },

    /// Show recent entries
    List {
        /// Number of entries to show (0 for all)
        #[arg(short = 'n', long, default_value = "20")]
        limit: u32,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show today's entries
    Today {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Delete today's entries
    ClearToday {
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Export entries as CSV
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// First day to include (YYYY-MM-DD or DD.MM.YYYY)
        #[arg(long)]
        since: Option<String>,

        /// Last day to include (YYYY-MM-DD or DD.MM.YYYY)
        #[arg(long)]
        until: Option<String>,
    },
}

/// Task subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum TaskAction {
    /// Add a task
    Add {
        /// Task title
        title: String,

        /// Day of the task (defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        /// Longer description
        #[arg(short = 'D', long, default_value = "")]
        description: String,

        /// Priority
        #[arg(short, long, value_enum, default_value = "normal")]
        priority: PriorityArg,

        /// Free-form category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// List the tasks of a day, open tasks first
    #[command(alias = "ls")]
    List {
        /// Day to list (defaults to today)
        #[arg(short, long)]
        date: Option<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Mark a task as completed
    Done {
        /// Task id
        id: i64,
    },

    /// Flip the completion flag of a task
    Toggle {
        /// Task id
        id: i64,
    },

    /// Change fields of a task
    Edit {
        /// Task id
        id: i64,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New description
        #[arg(short = 'D', long)]
        description: Option<String>,

        /// New priority
        #[arg(short, long, value_enum)]
        priority: Option<PriorityArg>,

        /// New category (empty to clear)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Move a task to another day
    Move {
        /// Task id
        id: i64,
        /// Target day
        date: String,
    },

    /// Delete a task
    #[command(alias = "rm")]
    Delete {
        /// Task id
        id: i64,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Days of a month that have tasks
    Dates {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,
    },

    /// Delete completed tasks dated before a day
    Cleanup {
        /// Cut-off day (defaults to today)
        #[arg(short, long)]
        before: Option<String>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Count open tasks for a day or a period
    Count {
        /// Single day (defaults to today)
        #[arg(short, long, conflicts_with_all = ["from", "to"])]
        date: Option<String>,

        /// First day of the period
        #[arg(long, requires = "to")]
        from: Option<String>,

        /// Last day of the period
        #[arg(long, requires = "from")]
        to: Option<String>,
    },
}

/// Verification subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum VerifyAction {
    /// Calculate the error of a single scale mark
    Point {
        /// Scale mark in instrument units
        #[arg(allow_hyphen_values = true)]
        scale_mark: String,

        /// Reference reading while increasing
        #[arg(allow_hyphen_values = true)]
        ascending: String,

        /// Reference reading while decreasing
        #[arg(allow_hyphen_values = true)]
        descending: String,

        /// Lower end of the range
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        lower: String,

        /// Upper end of the range
        #[arg(long, default_value = "100", allow_hyphen_values = true)]
        upper: String,

        /// Reference conversion (none, 75mV, 5A)
        #[arg(short, long, default_value = "none", value_parser = parse_transform)]
        transform: TransformFunction,

        /// Allowed reduced error in % (defaults to the configured value)
        #[arg(long)]
        max_error: Option<f64>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Evaluate a session file
    Run {
        /// Session file in TOML
        session: PathBuf,

        /// Fill device fields from a stored device number
        #[arg(short, long)]
        profile: Option<String>,

        /// Save the result to the journal
        #[arg(short, long)]
        save: bool,

        /// Generate a PDF protocol
        #[arg(long)]
        pdf: bool,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Print a session file skeleton
    Template {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Device subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum DeviceAction {
    /// List known devices
    #[command(alias = "ls")]
    List {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Show the latest verification of a device
    Show {
        /// Device (serial) number
        number: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Delete the verification records of a device
    #[command(alias = "rm")]
    Delete {
        /// Device (serial) number
        number: String,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Protocol subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum ProtocolAction {
    /// List generated protocols, newest first
    #[command(alias = "ls")]
    List,

    /// Open a protocol in the system viewer
    Open {
        /// File name in the documents directory, or a path
        file: PathBuf,
    },
}

/// Reminder subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum RemindAction {
    /// Evaluate the reminder once, now
    Check {
        /// Ignore the schedule window
        #[arg(short, long)]
        force: bool,
    },

    /// Keep running and fire the reminder every day
    Daemon,

    /// Show when the reminder fires next
    Next,
}

/// Configuration subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Parse a transform name, accepting the stored and the short spellings
fn parse_transform(s: &str) -> Result<TransformFunction, String> {
    s.parse::<TransformFunction>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_climate_add() {
        let cli = Cli::try_parse_from(["poverka", "climate", "add", "21,5", "45", "99.3"]).unwrap();
        match cli.command {
            Commands::Climate {
                action:
                    ClimateAction::Add {
                        temperature,
                        humidity,
                        pressure,
                    },
            } => {
                assert_eq!(temperature, "21,5");
                assert_eq!(humidity, "45");
                assert_eq!(pressure, "99.3");
            }
            _ => panic!("expected climate add"),
        }
    }

    #[test]
    fn test_parse_verify_point_transform() {
        let cli = Cli::try_parse_from([
            "poverka", "verify", "point", "50", "37.5", "37.6", "--transform", "75mV",
        ])
        .unwrap();
        match cli.command {
            Commands::Verify {
                action: VerifyAction::Point { transform, .. },
            } => assert_eq!(transform, TransformFunction::Shunt75mV),
            _ => panic!("expected verify point"),
        }
    }

    #[test]
    fn test_task_count_period_requires_both_ends() {
        assert!(Cli::try_parse_from(["poverka", "task", "count", "--from", "2024-02-01"]).is_err());
        assert!(
            Cli::try_parse_from([
                "poverka",
                "task",
                "count",
                "--from",
                "2024-02-01",
                "--to",
                "2024-02-29"
            ])
            .is_ok()
        );
    }

    #[test]
    fn test_priority_arg_conversion() {
        assert_eq!(TaskPriority::from(PriorityArg::Urgent), TaskPriority::Urgent);
        assert_eq!(TaskPriority::from(PriorityArg::default()), TaskPriority::Normal);
    }
}
