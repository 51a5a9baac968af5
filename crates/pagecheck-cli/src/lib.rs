//! pagecheck CLI library
//!
//! Command-line interface for running pagecheck scenarios against a locally
//! served page.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod logging;
mod output;

pub use commands::{
    Cli, ColorArg, Commands, FormatArg, RunArgs, ShowArgs, ValidateArgs, DEFAULT_HOST,
    DEFAULT_PORT,
};
pub use config::{load_scenario, CliConfig, ColorChoice, RunConfig, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{step_line, verdict_json, OutputFormat, ProgressReporter};
