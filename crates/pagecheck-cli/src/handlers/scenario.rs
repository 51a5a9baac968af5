//! Validate and show command handlers

use crate::commands::{ShowArgs, ValidateArgs};
use crate::config::{load_scenario, CliConfig};
use crate::error::CliResult;
use crate::output::ProgressReporter;
use pagecheck::Scenario;

/// Execute the validate command
pub fn execute_validate(config: &CliConfig, args: &ValidateArgs) -> CliResult<()> {
    tracing::debug!(path = %args.file.display(), "validating scenario");
    let scenario = load_scenario(Some(&args.file))?;
    scenario.validate()?;

    let reporter = ProgressReporter::new(config.color.should_color(), config.verbosity.is_quiet());
    reporter.success(&summary(&scenario));
    Ok(())
}

/// Execute the show command
pub fn execute_show(args: &ShowArgs) -> CliResult<()> {
    let scenario = load_scenario(args.scenario.as_deref())?;
    print!("{}", scenario.to_yaml()?);
    Ok(())
}

/// One-line description of a valid scenario
#[must_use]
pub fn summary(scenario: &Scenario) -> String {
    let pending = scenario.steps.len() - scenario.runnable_steps();
    format!(
        "{}: {} step(s), {} pending, target {}",
        scenario.name,
        scenario.steps.len(),
        pending,
        scenario.url("/")
    )
}
