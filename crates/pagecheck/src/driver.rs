//! PageDriver - abstract page automation trait.
//!
//! The runner only talks to a page through [`PageDriver`], which keeps the
//! scenario semantics independent of the automation backend:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  ScenarioRunner ──► PageDriver (trait)                        │
//! │                        ├── ChromiumDriver  (CDP, `browser`)   │
//! │                        └── MockDriver      (in-memory page)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::locator::Locator;
use crate::result::PagecheckResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Snapshot of what a locator currently resolves to.
///
/// `visible`, `classes` and `text` describe the first match only; `count`
/// covers every match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    /// Number of matching elements
    pub count: usize,
    /// Whether the first match is rendered with a non-empty box
    pub visible: bool,
    /// Class tokens of the first match
    #[serde(default)]
    pub classes: Vec<String>,
    /// Text content of the first match
    #[serde(default)]
    pub text: Option<String>,
}

impl ElementState {
    /// State of a locator with no match
    #[must_use]
    pub fn missing() -> Self {
        Self::default()
    }

    /// Whether at least one element matched
    #[must_use]
    pub const fn exists(&self) -> bool {
        self.count > 0
    }

    /// Whether the first match carries a class token
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// A console message emitted by the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    /// Console level (`log`, `warning`, `error`, ...)
    pub level: String,
    /// Message text
    pub text: String,
}

impl ConsoleMessage {
    /// Create a new console message
    #[must_use]
    pub fn new(level: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            text: text.into(),
        }
    }
}

/// Browser configuration for a driver
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Timeout for navigation and reload
    pub navigation_timeout: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sandbox: true,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

impl DriverConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set headless mode
    #[must_use]
    pub const fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }
}

/// Abstract driver trait for one browser page.
///
/// Element-targeting methods take a [`Locator`] that the caller has already
/// resolved; implementations act on its first match.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL and wait for the load to settle
    async fn navigate(&mut self, url: &str) -> PagecheckResult<()>;

    /// Reload the current page and wait for the load to settle
    async fn reload(&mut self) -> PagecheckResult<()>;

    /// Snapshot the element state behind a locator
    async fn inspect(&self, locator: &Locator) -> PagecheckResult<ElementState>;

    /// Click the first match
    async fn click(&mut self, locator: &Locator) -> PagecheckResult<()>;

    /// Replace the value of an input with `text`, firing input events
    async fn fill(&mut self, locator: &Locator, text: &str) -> PagecheckResult<()>;

    /// Move keyboard focus to the first match
    async fn focus(&mut self, locator: &Locator) -> PagecheckResult<()>;

    /// Press a key on `target`, or on the focused element when `None`
    async fn press_key(&mut self, target: Option<&Locator>, key: &str) -> PagecheckResult<()>;

    /// Capture a PNG screenshot of the viewport
    async fn screenshot(&self) -> PagecheckResult<Vec<u8>>;

    /// Take every console message received since the last call
    async fn drain_console(&mut self) -> Vec<ConsoleMessage>;

    /// Close the page and the browser
    async fn close(&mut self) -> PagecheckResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    mod element_state_tests {
        use super::*;

        #[test]
        fn test_missing_state() {
            let state = ElementState::missing();
            assert!(!state.exists());
            assert!(!state.visible);
            assert!(state.classes.is_empty());
        }

        #[test]
        fn test_has_class_matches_whole_tokens() {
            let state = ElementState {
                count: 1,
                visible: true,
                classes: vec!["details-btn".into(), "active".into()],
                text: None,
            };
            assert!(state.has_class("active"));
            assert!(!state.has_class("act"));
            assert!(!state.has_class("details"));
        }

        #[test]
        fn test_deserializes_browser_payload() {
            let json = r#"{"count":3,"visible":true,"classes":["chart-segment"],"text":null}"#;
            let state: ElementState = serde_json::from_str(json).expect("valid payload");
            assert_eq!(state.count, 3);
            assert!(state.has_class("chart-segment"));
            assert!(state.text.is_none());
        }
    }

    mod driver_config_tests {
        use super::*;

        #[test]
        fn test_config_default() {
            let config = DriverConfig::default();
            assert!(config.headless);
            assert!(config.sandbox);
            assert!(config.chromium_path.is_none());
            assert_eq!(config.navigation_timeout, Duration::from_secs(30));
        }

        #[test]
        fn test_config_builder() {
            let config = DriverConfig::new()
                .headless(false)
                .viewport(800, 600)
                .chromium_path("/usr/bin/chromium")
                .no_sandbox()
                .navigation_timeout(Duration::from_secs(5));

            assert!(!config.headless);
            assert_eq!(config.viewport_width, 800);
            assert_eq!(config.viewport_height, 600);
            assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
            assert!(!config.sandbox);
            assert_eq!(config.navigation_timeout, Duration::from_secs(5));
        }
    }

    #[test]
    fn test_console_message_new() {
        let msg = ConsoleMessage::new("error", "boom");
        assert_eq!(msg.level, "error");
        assert_eq!(msg.text, "boom");
    }
}
