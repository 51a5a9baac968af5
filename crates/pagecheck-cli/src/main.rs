//! pagecheck: run UI verification scenarios
//!
//! ## Usage
//!
//! ```bash
//! pagecheck run --port 3000               # Built-in salary calculator scenario
//! pagecheck run --scenario flows/theme.yaml --headed
//! pagecheck validate flows/theme.yaml     # Check a scenario file
//! pagecheck show                          # Print the built-in scenario
//! ```

use clap::Parser;
use pagecheck_cli::{
    handlers::{execute_run, execute_show, execute_validate},
    logging::init_tracing,
    Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();

    let config = build_config(&cli);
    init_tracing(config.verbosity, config.color.should_color());

    match cli.command {
        Commands::Run(args) => execute_run(&config, &args),
        Commands::Validate(args) => execute_validate(&config, &args),
        Commands::Show(args) => execute_show(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let verbosity = Verbosity::from_flags(cli.quiet, cli.verbose);
    let color: ColorChoice = cli.color.clone().into();
    CliConfig::new().with_verbosity(verbosity).with_color(color)
}
