//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Default port of the locally served application
pub const DEFAULT_PORT: u16 = 3000;

/// Default host of the locally served application
pub const DEFAULT_HOST: &str = "http://127.0.0.1";

/// pagecheck: verify the UI behaviour of a locally served page
#[derive(Parser, Debug)]
#[command(name = "pagecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario against a live page
    Run(RunArgs),

    /// Parse and validate a scenario file
    Validate(ValidateArgs),

    /// Print a scenario as YAML
    Show(ShowArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario file (defaults to the built-in salary calculator scenario)
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,

    /// Base URL of the served application, without port
    #[arg(long, env = "PAGECHECK_HOST")]
    pub host: Option<String>,

    /// Port the application listens on
    #[arg(short, long, env = "PAGECHECK_PORT")]
    pub port: Option<u16>,

    /// Directory for screenshots, logs and the verdict
    #[arg(short, long, env = "PAGECHECK_OUTPUT_DIR", default_value = "target/pagecheck")]
    pub output_dir: PathBuf,

    /// Per-wait timeout in milliseconds
    #[arg(long, env = "PAGECHECK_TIMEOUT_MS", default_value = "5000")]
    pub timeout_ms: u64,

    /// Interval between condition polls in milliseconds
    #[arg(long, default_value = "50")]
    pub poll_interval_ms: u64,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the chromium sandbox (needed in most containers)
    #[arg(long, env = "PAGECHECK_NO_SANDBOX")]
    pub no_sandbox: bool,

    /// Path to the chromium executable
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium_path: Option<PathBuf>,

    /// Output format for the verdict
    #[arg(long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the validate command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Scenario file to validate
    pub file: PathBuf,
}

/// Arguments for the show command
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Scenario file (defaults to the built-in salary calculator scenario)
    #[arg(short, long)]
    pub scenario: Option<PathBuf>,
}

/// Verdict output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable step lines
    #[default]
    Text,
    /// The verdict as JSON on stdout
    Json,
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
