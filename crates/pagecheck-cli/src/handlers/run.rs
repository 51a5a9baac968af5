//! Run command handler

use crate::commands::RunArgs;
use crate::config::{CliConfig, RunConfig};
use crate::error::{CliError, CliResult};
use crate::output::{verdict_json, OutputFormat, ProgressReporter};
use pagecheck::{PageDriver, Scenario, ScenarioRunner, Verdict};

/// Execute the run command
///
/// Returns [`CliError::ScenarioFailed`] when the scenario ran and failed, so
/// the caller can exit with 1; any error before the run maps to exit code 2.
pub fn execute_run(config: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let run = RunConfig::from_args(args)?;
    let scenario = run.load_scenario()?;

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::config(format!("Failed to create runtime: {e}")))?;

    log_run_start(&run, &scenario);
    let verdict = runtime.block_on(async {
        let driver = launch_driver(&run).await?;
        tracing::debug!(headless = run.headless, sandbox = run.sandbox, "browser ready");
        Ok::<_, CliError>(run_with_driver(config, &run, &scenario, driver).await)
    })?;

    emit(config, &run, &verdict)?;
    into_result(&verdict)
}

#[cfg(feature = "browser")]
async fn launch_driver(run: &RunConfig) -> CliResult<pagecheck::ChromiumDriver> {
    Ok(pagecheck::ChromiumDriver::launch(run.driver_config()).await?)
}

#[cfg(not(feature = "browser"))]
#[allow(clippy::unused_async)]
async fn launch_driver(_run: &RunConfig) -> CliResult<pagecheck::MockDriver> {
    Err(CliError::config(
        "pagecheck-cli was built without the `browser` feature",
    ))
}

/// Log what is about to run and where its artifacts go
pub fn log_run_start(run: &RunConfig, scenario: &Scenario) {
    tracing::info!(
        scenario = %scenario.name,
        target = %scenario.url("/"),
        steps = scenario.steps.len(),
        output_dir = %run.output_dir.display(),
        timeout_ms = run.timeout_ms,
        "running scenario"
    );
}

/// Run `scenario` on an already launched driver, with a spinner in text mode
pub async fn run_with_driver<D: PageDriver>(
    config: &CliConfig,
    run: &RunConfig,
    scenario: &Scenario,
    driver: D,
) -> Verdict {
    let mut reporter = reporter_for(config, run);
    if !config.verbosity.is_verbose() {
        reporter.start_run(&scenario.name, scenario.runnable_steps());
    }
    let verdict = ScenarioRunner::new(driver, run.runner_options())
        .run(scenario)
        .await;
    reporter.finish_run();
    verdict
}

/// Print the verdict in the requested format
pub fn emit(config: &CliConfig, run: &RunConfig, verdict: &Verdict) -> CliResult<()> {
    match run.format {
        OutputFormat::Text => reporter_for(config, run).report(verdict),
        OutputFormat::Json => println!("{}", verdict_json(verdict)?),
    }
    Ok(())
}

/// Map the verdict onto the command result
pub fn into_result(verdict: &Verdict) -> CliResult<()> {
    match verdict.failure() {
        None => Ok(()),
        Some(failure) => Err(CliError::ScenarioFailed {
            scenario: verdict.scenario.clone(),
            step: failure.step_index,
        }),
    }
}

fn reporter_for(config: &CliConfig, run: &RunConfig) -> ProgressReporter {
    let quiet = config.verbosity.is_quiet() || run.format == OutputFormat::Json;
    ProgressReporter::new(config.color.should_color(), quiet)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use crate::config::{ColorChoice, Verbosity};
    use clap::Parser;
    use pagecheck::builtin::{CHART_SEGMENTS, THEME_TOGGLE};
    use pagecheck::{FailureKind, MockDriver, MockElement};
    use tempfile::TempDir;

    fn run_config(dir: &TempDir, extra: &[&str]) -> RunConfig {
        let out = dir.path().display().to_string();
        let mut argv = vec!["pagecheck", "run", "--output-dir", out.as_str()];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Run(args) => RunConfig::from_args(&args).unwrap(),
            other => panic!("expected run, got {other:?}"),
        }
    }

    fn quiet() -> CliConfig {
        CliConfig::new()
            .with_verbosity(Verbosity::Quiet)
            .with_color(ColorChoice::Never)
    }

    mod run_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_builtin_scenario_passes_on_mock_page() {
            let dir = TempDir::new().unwrap();
            let run = run_config(&dir, &[]);
            let scenario = run.load_scenario().unwrap();

            let verdict = run_with_driver(&quiet(), &run, &scenario, MockDriver::salary_page()).await;

            assert!(verdict.passed(), "{verdict}");
            assert!(into_result(&verdict).is_ok());
            assert!(dir.path().join("verdict.json").exists());
            assert!(dir.path().join("01_light_mode_initial.png").exists());
        }

        #[tokio::test(start_paused = true)]
        async fn test_regressed_chart_exits_one() {
            let dir = TempDir::new().unwrap();
            let run = run_config(&dir, &[]);
            let scenario = run.load_scenario().unwrap();
            let driver = MockDriver::salary_page()
                .with_revealed(CHART_SEGMENTS, MockElement::visible().with_count(2));

            let verdict = run_with_driver(&quiet(), &run, &scenario, driver).await;

            let failure = verdict.failure().unwrap();
            assert_eq!(failure.kind, FailureKind::AssertionTimeout);
            let err = into_result(&verdict).unwrap_err();
            assert_eq!(err.exit_code(), 1);
            assert!(err.to_string().contains("step 14"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_theme_toggle_is_not_found() {
            let dir = TempDir::new().unwrap();
            let run = run_config(&dir, &["--timeout-ms", "500"]);
            let scenario = run.load_scenario().unwrap();
            let driver = MockDriver::salary_page().without_element(THEME_TOGGLE);

            let verdict = run_with_driver(&quiet(), &run, &scenario, driver).await;

            let failure = verdict.failure().unwrap();
            assert_eq!(failure.kind, FailureKind::ElementNotFound);
            assert!(dir.path().join("error.png").exists());
        }
    }

    mod logging_tests {
        use super::*;
        use std::io::Write;
        use std::sync::{Arc, Mutex};

        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl Write for Captured {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        #[test]
        fn test_run_start_is_logged() {
            let dir = TempDir::new().unwrap();
            let run = run_config(&dir, &["--port", "8123"]);
            let scenario = run.load_scenario().unwrap();
            let captured = Captured::default();
            let writer = captured.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || writer.clone())
                .with_ansi(false)
                .finish();

            tracing::subscriber::with_default(subscriber, || log_run_start(&run, &scenario));

            let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
            assert!(output.contains("running scenario"), "{output}");
            assert!(output.contains("salary-calculator"));
            assert!(output.contains("http://127.0.0.1:8123/"));
        }
    }

    mod emit_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_json_emit_succeeds() {
            let dir = TempDir::new().unwrap();
            let run = run_config(&dir, &["--format", "json"]);
            let scenario = run.load_scenario().unwrap();
            let verdict = run_with_driver(&quiet(), &run, &scenario, MockDriver::salary_page()).await;

            assert!(emit(&quiet(), &run, &verdict).is_ok());
        }
    }
}
