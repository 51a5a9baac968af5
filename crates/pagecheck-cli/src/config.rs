//! CLI configuration

use crate::commands::{RunArgs, DEFAULT_HOST, DEFAULT_PORT};
use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;
use pagecheck::{salary_calculator, DriverConfig, RunnerOptions, Scenario};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - failures only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - step log lines
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Derive the level from the `-q` flag and the `-v` count
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Check if debug mode
    #[must_use]
    pub const fn is_debug(self) -> bool {
        matches!(self, Self::Debug)
    }

    /// Default tracing filter directive for this level
    #[must_use]
    pub const fn filter_directive(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "pagecheck=info,pagecheck_cli=info,warn",
            Self::Debug => "pagecheck=debug,pagecheck_cli=debug,info",
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// Global CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }
}

/// Resolved configuration of one `run` invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Scenario file, or `None` for the built-in scenario
    pub scenario: Option<PathBuf>,
    /// Host override
    pub host: Option<String>,
    /// Port override
    pub port: Option<u16>,
    /// Artifact directory
    pub output_dir: PathBuf,
    /// Per-wait timeout
    pub timeout_ms: u64,
    /// Poll interval
    pub poll_interval_ms: u64,
    /// Run without a visible window
    pub headless: bool,
    /// Keep the chromium sandbox enabled
    pub sandbox: bool,
    /// Chromium executable
    pub chromium_path: Option<PathBuf>,
    /// Verdict output format
    pub format: OutputFormat,
}

impl RunConfig {
    /// Resolve and check the run arguments
    ///
    /// # Errors
    ///
    /// Returns an invalid-argument error if a timeout or interval is zero or
    /// the poll interval exceeds the timeout
    pub fn from_args(args: &RunArgs) -> CliResult<Self> {
        if args.timeout_ms == 0 {
            return Err(CliError::invalid_argument("--timeout-ms must be positive"));
        }
        if args.poll_interval_ms == 0 {
            return Err(CliError::invalid_argument(
                "--poll-interval-ms must be positive",
            ));
        }
        if args.poll_interval_ms > args.timeout_ms {
            return Err(CliError::invalid_argument(format!(
                "--poll-interval-ms ({}) exceeds --timeout-ms ({})",
                args.poll_interval_ms, args.timeout_ms
            )));
        }
        if args.output_dir.as_os_str().is_empty() {
            return Err(CliError::invalid_argument("--output-dir must not be empty"));
        }

        Ok(Self {
            scenario: args.scenario.clone(),
            host: args.host.clone(),
            port: args.port,
            output_dir: args.output_dir.clone(),
            timeout_ms: args.timeout_ms,
            poll_interval_ms: args.poll_interval_ms,
            headless: !args.headed,
            sandbox: !args.no_sandbox,
            chromium_path: args.chromium_path.clone(),
            format: args.format.into(),
        })
    }

    /// Load the scenario, apply host and port overrides, and validate it
    pub fn load_scenario(&self) -> CliResult<Scenario> {
        let mut scenario = load_scenario(self.scenario.as_deref())?;
        if let Some(ref host) = self.host {
            scenario = scenario.with_base_url(host.clone());
        }
        if let Some(port) = self.port {
            scenario = scenario.with_port(port);
        }
        scenario.validate()?;
        Ok(scenario)
    }

    /// Runner options for this run
    #[must_use]
    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions::new()
            .with_timeout(self.timeout_ms)
            .with_poll_interval(self.poll_interval_ms)
            .with_output_dir(self.output_dir.clone())
    }

    /// Browser configuration for this run
    #[must_use]
    pub fn driver_config(&self) -> DriverConfig {
        let mut config = DriverConfig::new().headless(self.headless);
        if !self.sandbox {
            config = config.no_sandbox();
        }
        if let Some(ref path) = self.chromium_path {
            config = config.chromium_path(path.display().to_string());
        }
        config
    }
}

/// Load a scenario file, or build the built-in scenario with default host
/// and port
pub fn load_scenario(path: Option<&Path>) -> CliResult<Scenario> {
    match path {
        Some(path) => Ok(Scenario::from_file(path)?),
        None => Ok(salary_calculator(DEFAULT_HOST, DEFAULT_PORT)),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;

    fn run_args(extra: &[&str]) -> RunArgs {
        let mut argv = vec!["pagecheck", "run"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => args,
            other => panic!("expected run, got {other:?}"),
        }
    }

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_default_verbosity() {
            assert_eq!(Verbosity::default(), Verbosity::Normal);
        }

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(false, 3), Verbosity::Debug);
            assert_eq!(Verbosity::from_flags(true, 2), Verbosity::Quiet);
        }

        #[test]
        fn test_predicates() {
            assert!(Verbosity::Quiet.is_quiet());
            assert!(!Verbosity::Normal.is_verbose());
            assert!(Verbosity::Verbose.is_verbose());
            assert!(Verbosity::Debug.is_verbose());
            assert!(Verbosity::Debug.is_debug());
            assert!(!Verbosity::Verbose.is_debug());
        }

        #[test]
        fn test_filter_directive_widens_with_level() {
            assert_eq!(Verbosity::Quiet.filter_directive(), "error");
            assert!(Verbosity::Verbose
                .filter_directive()
                .contains("pagecheck=info"));
            assert!(Verbosity::Debug
                .filter_directive()
                .contains("pagecheck=debug"));
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_explicit_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }

        #[test]
        fn test_config_builder() {
            let config = CliConfig::new()
                .with_verbosity(Verbosity::Debug)
                .with_color(ColorChoice::Never);
            assert_eq!(config.verbosity, Verbosity::Debug);
            assert_eq!(config.color, ColorChoice::Never);
        }
    }

    mod run_config_tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = RunConfig::from_args(&run_args(&[])).unwrap();
            assert!(config.headless);
            assert!(config.sandbox);
            assert_eq!(config.timeout_ms, 5000);
            assert_eq!(config.format, OutputFormat::Text);
        }

        #[test]
        fn test_rejects_zero_timeout() {
            let err = RunConfig::from_args(&run_args(&["--timeout-ms", "0"])).unwrap_err();
            assert!(err.to_string().contains("--timeout-ms"));
            assert_eq!(err.exit_code(), 2);
        }

        #[test]
        fn test_rejects_poll_interval_above_timeout() {
            let err = RunConfig::from_args(&run_args(&[
                "--timeout-ms",
                "100",
                "--poll-interval-ms",
                "500",
            ]))
            .unwrap_err();
            assert!(err.to_string().contains("exceeds"));
        }

        #[test]
        fn test_builtin_scenario_with_overrides() {
            let config = RunConfig::from_args(&run_args(&[
                "--host",
                "http://localhost",
                "--port",
                "8123",
            ]))
            .unwrap();
            let scenario = config.load_scenario().unwrap();
            assert_eq!(scenario.name, pagecheck::builtin::SALARY_CALCULATOR);
            assert_eq!(scenario.url("/"), "http://localhost:8123/");
        }

        #[test]
        fn test_override_is_validated() {
            let config =
                RunConfig::from_args(&run_args(&["--host", "ftp://example.com"])).unwrap();
            assert!(matches!(
                config.load_scenario(),
                Err(CliError::Scenario(_))
            ));
        }

        #[test]
        fn test_runner_options() {
            let config = RunConfig::from_args(&run_args(&[
                "--timeout-ms",
                "2000",
                "--poll-interval-ms",
                "25",
                "--output-dir",
                "out",
            ]))
            .unwrap();
            let options = config.runner_options();
            assert_eq!(options.element_timeout_ms, 2000);
            assert_eq!(options.assertion_timeout_ms, 2000);
            assert_eq!(options.poll_interval_ms, 25);
            assert_eq!(options.output_dir, PathBuf::from("out"));
        }

        #[test]
        fn test_driver_config() {
            let config = RunConfig::from_args(&run_args(&[
                "--headed",
                "--no-sandbox",
                "--chromium-path",
                "/usr/bin/chromium",
            ]))
            .unwrap();
            let driver = config.driver_config();
            assert!(!driver.headless);
            assert!(!driver.sandbox);
            assert_eq!(driver.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        }
    }
}
