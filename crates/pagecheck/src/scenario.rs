//! Scenario schema: an ordered script of steps against one page.
//!
//! Scenarios are plain data. They can be built in code or loaded from YAML:
//!
//! ```yaml
//! name: "theme"
//! base_url: "http://127.0.0.1"
//! port: 3000
//! steps:
//!   - description: "Open the calculator"
//!     action: { type: navigate, path: "/?notest=true" }
//!     expect:
//!       - { type: lacks_class, target: "html", class: "dark" }
//!     screenshot: "light_mode_initial"
//!   - description: "Toggle to dark mode"
//!     action: { type: toggle, target: "#theme-toggle-btn", observe: "html", class: "dark" }
//!     settle_ms: 500
//! ```

use crate::assertion::Expectation;
use crate::locator::Locator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Key pressed by keyboard activation when none is given
pub const DEFAULT_ACTIVATION_KEY: &str = "Enter";

/// A complete scenario run against one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name
    pub name: String,
    /// Scheme and host of the target, e.g. `http://127.0.0.1`
    pub base_url: String,
    /// Port the target server listens on
    pub port: u16,
    /// Steps, executed strictly in declaration order
    pub steps: Vec<Step>,
}

/// One action plus its post-conditions and optional artifact request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Human-readable description, used in logs and artifact names
    pub description: String,
    /// Interaction to perform; a bare `wait` of 0ms makes an assert-only step
    #[serde(default)]
    pub action: Action,
    /// Post-conditions that must all hold after the action
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expect: Vec<Expectation>,
    /// Screenshot name to capture after the step
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
    /// Minimum delay between the action and the first assertion poll
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settle_ms: Option<u64>,
    /// Marks a check as not yet verified; the step is skipped with this reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending: Option<String>,
}

/// How a toggle control is activated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Pointer click
    #[default]
    Click,
    /// Focus then key press
    Keyboard,
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click => f.write_str("click"),
            Self::Keyboard => f.write_str("keyboard"),
        }
    }
}

const fn one() -> u32 {
    1
}

/// Interaction performed by a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Navigate to a path below the scenario's base URL
    Navigate {
        /// Path and query, starting with `/`
        path: String,
    },
    /// Reload the current page
    Reload,
    /// Click an element
    Click {
        /// Element to click
        target: Locator,
    },
    /// Replace the value of an input
    Fill {
        /// Input element
        target: Locator,
        /// New value
        value: String,
    },
    /// Move keyboard focus to an element
    Focus {
        /// Element to focus
        target: Locator,
    },
    /// Press a key
    Press {
        /// Key name, e.g. `Enter`
        key: String,
        /// Element to press on; the focused element when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<Locator>,
    },
    /// Sleep for a fixed duration
    Wait {
        /// Duration in milliseconds
        ms: u64,
    },
    /// Activate a two-state control and verify its state by parity
    Toggle {
        /// Control to activate
        target: Locator,
        /// Element whose class flips; the control itself when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        observe: Option<Locator>,
        /// Class token that flips
        class: String,
        /// Click or keyboard activation
        #[serde(default)]
        via: Activation,
        /// Key for keyboard activation (default `Enter`)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        /// Number of activations
        #[serde(default = "one")]
        times: u32,
        /// Delay between consecutive activations
        #[serde(default)]
        interval_ms: u64,
    },
}

impl Default for Action {
    fn default() -> Self {
        Self::Wait { ms: 0 }
    }
}

impl Action {
    /// Navigate to a path
    #[must_use]
    pub fn navigate(path: impl Into<String>) -> Self {
        Self::Navigate { path: path.into() }
    }

    /// Click an element
    #[must_use]
    pub fn click(target: impl Into<Locator>) -> Self {
        Self::Click {
            target: target.into(),
        }
    }

    /// Fill an input
    #[must_use]
    pub fn fill(target: impl Into<Locator>, value: impl Into<String>) -> Self {
        Self::Fill {
            target: target.into(),
            value: value.into(),
        }
    }

    /// Focus an element
    #[must_use]
    pub fn focus(target: impl Into<Locator>) -> Self {
        Self::Focus {
            target: target.into(),
        }
    }

    /// Press a key on the focused element
    #[must_use]
    pub fn press(key: impl Into<String>) -> Self {
        Self::Press {
            key: key.into(),
            target: None,
        }
    }

    /// Sleep for `ms` milliseconds
    #[must_use]
    pub const fn wait(ms: u64) -> Self {
        Self::Wait { ms }
    }

    /// Toggle a control once by click, observing the class on the control itself
    #[must_use]
    pub fn toggle(target: impl Into<Locator>, class: impl Into<String>) -> Self {
        Self::Toggle {
            target: target.into(),
            observe: None,
            class: class.into(),
            via: Activation::Click,
            key: None,
            times: 1,
            interval_ms: 0,
        }
    }

    /// Observe the toggled class on another element (toggle only)
    #[must_use]
    pub fn observing(mut self, element: impl Into<Locator>) -> Self {
        if let Self::Toggle { observe, .. } = &mut self {
            *observe = Some(element.into());
        }
        self
    }

    /// Activate by keyboard instead of click (toggle only)
    #[must_use]
    pub fn via_keyboard(mut self) -> Self {
        if let Self::Toggle { via, .. } = &mut self {
            *via = Activation::Keyboard;
        }
        self
    }

    /// Repeat the activation `n` times, `interval_ms` apart (toggle only)
    #[must_use]
    pub fn repeated(mut self, n: u32, interval: u64) -> Self {
        if let Self::Toggle {
            times, interval_ms, ..
        } = &mut self
        {
            *times = n;
            *interval_ms = interval;
        }
        self
    }

    /// Locators that must resolve before the action runs
    #[must_use]
    pub fn targets(&self) -> Vec<&Locator> {
        match self {
            Self::Click { target } | Self::Fill { target, .. } | Self::Focus { target } => {
                vec![target]
            }
            Self::Press { target, .. } => target.iter().collect(),
            Self::Toggle {
                target, observe, ..
            } => std::iter::once(target).chain(observe.iter()).collect(),
            Self::Navigate { .. } | Self::Reload | Self::Wait { .. } => Vec::new(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate { path } => write!(f, "navigate {path}"),
            Self::Reload => f.write_str("reload"),
            Self::Click { target } => write!(f, "click '{target}'"),
            Self::Fill { target, value } => write!(f, "fill '{target}' with {value:?}"),
            Self::Focus { target } => write!(f, "focus '{target}'"),
            Self::Press { key, target } => match target {
                Some(target) => write!(f, "press {key} on '{target}'"),
                None => write!(f, "press {key}"),
            },
            Self::Wait { ms } => write!(f, "wait {ms}ms"),
            Self::Toggle {
                target, via, times, ..
            } => write!(f, "toggle '{target}' x{times} via {via}"),
        }
    }
}

impl Step {
    /// Create a step
    #[must_use]
    pub fn new(description: impl Into<String>, action: Action) -> Self {
        Self {
            description: description.into(),
            action,
            expect: Vec::new(),
            screenshot: None,
            settle_ms: None,
            pending: None,
        }
    }

    /// A check that is declared but not yet verified
    #[must_use]
    pub fn not_yet_verified(description: impl Into<String>, reason: impl Into<String>) -> Self {
        let mut step = Self::new(description, Action::default());
        step.pending = Some(reason.into());
        step
    }

    /// Add a post-condition
    #[must_use]
    pub fn expect(mut self, expectation: Expectation) -> Self {
        self.expect.push(expectation);
        self
    }

    /// Request a screenshot after the step
    #[must_use]
    pub fn screenshot(mut self, name: impl Into<String>) -> Self {
        self.screenshot = Some(name.into());
        self
    }

    /// Set the settle delay
    #[must_use]
    pub const fn settle_ms(mut self, ms: u64) -> Self {
        self.settle_ms = Some(ms);
        self
    }

    /// Whether the step is skipped as not yet verified
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn validate(&self, index: usize) -> Result<(), ScenarioError> {
        let invalid = |message: String| ScenarioError::InvalidStep {
            index: index + 1,
            message,
        };

        if self.description.trim().is_empty() {
            return Err(invalid("description is empty".to_string()));
        }
        if self.pending.is_some() {
            return Ok(());
        }
        if let Some(empty) = self.action.targets().into_iter().find(|l| l.is_empty()) {
            return Err(invalid(format!("empty selector in action ({empty:?})")));
        }
        if let Some(exp) = self.expect.iter().find(|e| e.target().is_empty()) {
            return Err(invalid(format!("empty selector in expectation {exp}")));
        }
        match &self.action {
            Action::Navigate { path } if !path.starts_with('/') => {
                Err(invalid(format!("navigate path {path:?} must start with '/'")))
            }
            Action::Toggle { times: 0, .. } => {
                Err(invalid("toggle needs at least one activation".to_string()))
            }
            Action::Toggle { class, .. } if class.trim().is_empty() => {
                Err(invalid("toggle class is empty".to_string()))
            }
            Action::Press { key, .. } if key.trim().is_empty() => {
                Err(invalid("key is empty".to_string()))
            }
            _ => Ok(()),
        }
    }
}

impl Scenario {
    /// Create an empty scenario
    #[must_use]
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, port: u16) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            port,
            steps: Vec::new(),
        }
    }

    /// Append a step
    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Override the target host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the target port
    #[must_use]
    pub const fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Absolute URL for a path on the target
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}:{}{}", self.base_url.trim_end_matches('/'), self.port, path)
    }

    /// Number of steps that will actually execute
    #[must_use]
    pub fn runnable_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.is_pending()).count()
    }

    /// Parse and validate a scenario from YAML.
    ///
    /// # Errors
    /// Returns error if YAML is invalid or validation fails.
    pub fn from_yaml(yaml: &str) -> Result<Self, ScenarioError> {
        let scenario: Self =
            serde_yaml_ng::from_str(yaml).map_err(|e| ScenarioError::ParseError(e.to_string()))?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load and validate a scenario file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or the scenario is invalid.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| ScenarioError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml(&yaml)
    }

    /// Serialize to YAML.
    ///
    /// # Errors
    /// Returns error if serialization fails.
    pub fn to_yaml(&self) -> Result<String, ScenarioError> {
        serde_yaml_ng::to_string(self).map_err(|e| ScenarioError::ParseError(e.to_string()))
    }

    /// Validate the scenario structure.
    ///
    /// # Errors
    /// Returns the first structural problem found.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.name.trim().is_empty() {
            return Err(ScenarioError::EmptyName);
        }
        if self.port == 0 {
            return Err(ScenarioError::InvalidPort);
        }
        validate_base_url(&self.base_url)?;
        if self.steps.is_empty() {
            return Err(ScenarioError::EmptySteps);
        }
        for (index, step) in self.steps.iter().enumerate() {
            step.validate(index)?;
        }
        Ok(())
    }
}

fn validate_base_url(base_url: &str) -> Result<(), ScenarioError> {
    let invalid = |reason: &str| ScenarioError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: reason.to_string(),
    };
    let host = base_url
        .strip_prefix("http://")
        .or_else(|| base_url.strip_prefix("https://"))
        .ok_or_else(|| invalid("scheme must be http:// or https://"))?
        .trim_end_matches('/');

    if host.is_empty() {
        return Err(invalid("host is empty"));
    }
    if host.contains('/') {
        return Err(invalid("paths belong in navigate steps"));
    }
    if host.contains(':') && !host.starts_with('[') {
        return Err(invalid("the port is configured separately"));
    }
    Ok(())
}

/// Errors that can occur during scenario parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScenarioError {
    #[error("Failed to parse YAML: {0}")]
    ParseError(String),

    #[error("Failed to read scenario {path}: {message}")]
    Read { path: String, message: String },

    #[error("Scenario name cannot be empty")]
    EmptyName,

    #[error("Port must be non-zero")]
    InvalidPort,

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Steps cannot be empty")]
    EmptySteps,

    #[error("Step {index}: {message}")]
    InvalidStep { index: usize, message: String },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const VALID_SCENARIO: &str = r##"
name: "theme"
base_url: "http://127.0.0.1"
port: 3000
steps:
  - description: "Open the calculator"
    action: { type: navigate, path: "/?notest=true" }
    expect:
      - { type: lacks_class, target: "html", class: "dark" }
      - { type: visible, target: "#theme-toggle-btn .sun-icon" }
    screenshot: "light_mode_initial"
  - description: "Toggle to dark mode"
    action: { type: toggle, target: "#theme-toggle-btn", observe: "html", class: "dark" }
    settle_ms: 500
  - description: "Rapid accordion toggles"
    action:
      type: toggle
      target: "[data-details-for='proventos']"
      class: active
      times: 5
      interval_ms: 50
  - description: "Keyboard activation"
    action: { type: toggle, target: "[data-details-for='proventos']", class: active, via: keyboard }
  - description: "Reload"
    action: { type: reload }
  - description: "Duplicate ID fix"
    pending: "not yet verified"
"##;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_parse_valid_scenario() {
            let scenario = Scenario::from_yaml(VALID_SCENARIO).expect("Should parse");
            assert_eq!(scenario.name, "theme");
            assert_eq!(scenario.port, 3000);
            assert_eq!(scenario.steps.len(), 6);
            assert_eq!(scenario.runnable_steps(), 5);
            assert_eq!(scenario.steps[0].expect.len(), 2);
            assert_eq!(
                scenario.steps[0].screenshot.as_deref(),
                Some("light_mode_initial")
            );
            assert_eq!(scenario.steps[1].settle_ms, Some(500));
        }

        #[test]
        fn test_toggle_defaults() {
            let scenario = Scenario::from_yaml(VALID_SCENARIO).unwrap();
            match &scenario.steps[1].action {
                Action::Toggle {
                    observe,
                    via,
                    times,
                    interval_ms,
                    key,
                    ..
                } => {
                    assert_eq!(observe.as_ref().map(Locator::selector), Some("html"));
                    assert_eq!(*via, Activation::Click);
                    assert_eq!(*times, 1);
                    assert_eq!(*interval_ms, 0);
                    assert!(key.is_none());
                }
                other => panic!("unexpected action {other:?}"),
            }
            match &scenario.steps[3].action {
                Action::Toggle { via, .. } => assert_eq!(*via, Activation::Keyboard),
                other => panic!("unexpected action {other:?}"),
            }
        }

        #[test]
        fn test_pending_step_has_default_action() {
            let scenario = Scenario::from_yaml(VALID_SCENARIO).unwrap();
            let step = &scenario.steps[5];
            assert!(step.is_pending());
            assert_eq!(step.action, Action::Wait { ms: 0 });
        }

        #[test]
        fn test_yaml_round_trip_preserves_scenario() {
            let scenario = Scenario::from_yaml(VALID_SCENARIO).unwrap();
            let yaml = scenario.to_yaml().unwrap();
            assert_eq!(Scenario::from_yaml(&yaml).unwrap(), scenario);
        }

        #[test]
        fn test_reject_malformed_yaml() {
            let result = Scenario::from_yaml("name: [unclosed");
            assert!(matches!(result, Err(ScenarioError::ParseError(_))));
        }

        #[test]
        fn test_reject_unknown_action() {
            let yaml = VALID_SCENARIO.replace("type: reload", "type: teleport");
            assert!(matches!(
                Scenario::from_yaml(&yaml),
                Err(ScenarioError::ParseError(_))
            ));
        }

        #[test]
        fn test_from_file_missing() {
            let result = Scenario::from_file("/nonexistent/scenario.yaml");
            assert!(matches!(result, Err(ScenarioError::Read { .. })));
        }

        #[test]
        fn test_from_file() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("theme.yaml");
            std::fs::write(&path, VALID_SCENARIO).unwrap();
            assert_eq!(Scenario::from_file(&path).unwrap().name, "theme");
        }
    }

    mod validation_tests {
        use super::*;

        #[test]
        fn test_reject_port_zero() {
            let yaml = VALID_SCENARIO.replace("port: 3000", "port: 0");
            assert_eq!(
                Scenario::from_yaml(&yaml).unwrap_err(),
                ScenarioError::InvalidPort
            );
        }

        #[test]
        fn test_reject_empty_steps() {
            let scenario = Scenario::new("empty", "http://127.0.0.1", 3000);
            assert_eq!(scenario.validate().unwrap_err(), ScenarioError::EmptySteps);
        }

        #[test]
        fn test_reject_empty_name() {
            let scenario = Scenario::new(" ", "http://127.0.0.1", 3000)
                .step(Step::new("reload", Action::Reload));
            assert_eq!(scenario.validate().unwrap_err(), ScenarioError::EmptyName);
        }

        #[test]
        fn test_reject_bad_base_urls() {
            for url in [
                "127.0.0.1",
                "ftp://127.0.0.1",
                "http://",
                "http://127.0.0.1:3000",
                "http://127.0.0.1/app",
            ] {
                let scenario =
                    Scenario::new("s", url, 3000).step(Step::new("reload", Action::Reload));
                assert!(
                    matches!(
                        scenario.validate(),
                        Err(ScenarioError::InvalidBaseUrl { .. })
                    ),
                    "{url} should be rejected"
                );
            }
        }

        #[test]
        fn test_accept_good_base_urls() {
            for url in ["http://127.0.0.1", "https://localhost/", "http://[::1]"] {
                let scenario =
                    Scenario::new("s", url, 3000).step(Step::new("reload", Action::Reload));
                assert!(scenario.validate().is_ok(), "{url} should be accepted");
            }
        }

        #[test]
        fn test_reject_zero_toggle() {
            let scenario = Scenario::new("s", "http://127.0.0.1", 3000).step(Step::new(
                "toggle",
                Action::toggle("#btn", "active").repeated(0, 50),
            ));
            assert!(matches!(
                scenario.validate(),
                Err(ScenarioError::InvalidStep { index: 1, .. })
            ));
        }

        #[test]
        fn test_reject_relative_navigate() {
            let scenario = Scenario::new("s", "http://127.0.0.1", 3000)
                .step(Step::new("go", Action::navigate("index.html")));
            assert!(matches!(
                scenario.validate(),
                Err(ScenarioError::InvalidStep { index: 1, .. })
            ));
        }

        #[test]
        fn test_reject_empty_selectors() {
            let scenario = Scenario::new("s", "http://127.0.0.1", 3000)
                .step(Step::new("reload", Action::Reload))
                .step(Step::new("click", Action::click("")));
            assert!(matches!(
                scenario.validate(),
                Err(ScenarioError::InvalidStep { index: 2, .. })
            ));

            let scenario = Scenario::new("s", "http://127.0.0.1", 3000)
                .step(Step::new("reload", Action::Reload).expect(Expectation::visible(" ")));
            assert!(matches!(
                scenario.validate(),
                Err(ScenarioError::InvalidStep { index: 1, .. })
            ));
        }

        #[test]
        fn test_pending_steps_skip_action_checks() {
            let scenario = Scenario::new("s", "http://127.0.0.1", 3000)
                .step(Step::not_yet_verified("Duplicate ID fix", "unknown"));
            assert!(scenario.validate().is_ok());
        }
    }

    mod action_tests {
        use super::*;

        #[test]
        fn test_url_join() {
            let scenario = Scenario::new("s", "http://127.0.0.1/", 3000);
            assert_eq!(
                scenario.url("/?notest=true"),
                "http://127.0.0.1:3000/?notest=true"
            );
            assert_eq!(scenario.with_port(8080).url("/"), "http://127.0.0.1:8080/");
        }

        #[test]
        fn test_toggle_builders() {
            let action = Action::toggle("#theme-toggle-btn", "dark")
                .observing("html")
                .via_keyboard()
                .repeated(5, 50);
            match &action {
                Action::Toggle {
                    observe,
                    via,
                    times,
                    interval_ms,
                    ..
                } => {
                    assert_eq!(observe.as_ref().unwrap().selector(), "html");
                    assert_eq!(*via, Activation::Keyboard);
                    assert_eq!(*times, 5);
                    assert_eq!(*interval_ms, 50);
                }
                other => panic!("unexpected action {other:?}"),
            }
            assert_eq!(action.targets().len(), 2);
        }

        #[test]
        fn test_toggle_modifiers_ignore_other_actions() {
            assert_eq!(Action::Reload.via_keyboard(), Action::Reload);
            assert_eq!(Action::click("#a").observing("html"), Action::click("#a"));
        }

        #[test]
        fn test_targets() {
            assert!(Action::Reload.targets().is_empty());
            assert!(Action::press("Enter").targets().is_empty());
            assert_eq!(Action::fill("#salario", "5000").targets().len(), 1);
        }

        #[test]
        fn test_display() {
            assert_eq!(Action::navigate("/").to_string(), "navigate /");
            assert_eq!(Action::press("Enter").to_string(), "press Enter");
            assert_eq!(
                Action::toggle("#b", "active").repeated(5, 50).to_string(),
                "toggle '#b' x5 via click"
            );
        }
    }
}
