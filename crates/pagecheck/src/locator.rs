//! Locator abstraction for element selection.
//!
//! A [`Locator`] is an opaque reference to zero or more DOM elements. It is
//! nothing but a selector: it is resolved lazily against the live page every
//! time an action or assertion needs it, so it stays valid across reloads
//! where the underlying nodes are torn down and rebuilt.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default timeout for resolving a locator (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Default polling interval for resolution and assertions (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// A CSS-selector based locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator {
    selector: String,
}

impl Locator {
    /// Create a new locator with a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
        }
    }

    /// Scope a child selector under this locator.
    ///
    /// `page.locator("#chart").locator(".chart-segment")` matches every
    /// `.chart-segment` that is a descendant of `#chart`.
    #[must_use]
    pub fn locator(&self, child: impl AsRef<str>) -> Self {
        Self {
            selector: format!("{} {}", self.selector, child.as_ref()),
        }
    }

    /// Locator for elements carrying a data attribute with a given value
    #[must_use]
    pub fn by_data(attribute: &str, value: &str) -> Self {
        Self::new(format!("[data-{attribute}='{value}']"))
    }

    /// Get the CSS selector
    #[must_use]
    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// Whether the selector is blank
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selector.trim().is_empty()
    }

    /// The selector as a JavaScript string literal
    #[must_use]
    pub fn js_literal(&self) -> String {
        serde_json::Value::String(self.selector.clone()).to_string()
    }

    /// JavaScript expression returning the first match (or `null`)
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("document.querySelector({})", self.js_literal())
    }

    /// JavaScript expression producing an [`ElementState`](crate::ElementState)
    /// snapshot of this locator.
    ///
    /// Visibility follows the usual browser-automation definition: the first
    /// match has a non-empty bounding box and is not hidden by
    /// `display`/`visibility`.
    #[must_use]
    pub fn to_inspect_script(&self) -> String {
        format!(
            r"(() => {{
  const all = document.querySelectorAll({sel});
  const el = all[0];
  if (!el) {{ return {{ count: 0, visible: false, classes: [], text: null }}; }}
  const style = window.getComputedStyle(el);
  const rect = el.getBoundingClientRect();
  const visible = style.display !== 'none'
    && style.visibility !== 'hidden'
    && rect.width > 0 && rect.height > 0;
  return {{
    count: all.length,
    visible: visible,
    classes: Array.from(el.classList),
    text: el.textContent,
  }};
}})()",
            sel = self.js_literal()
        )
    }

    /// JavaScript statement that clears the value of the first match
    #[must_use]
    pub fn to_clear_script(&self) -> String {
        format!(
            "(() => {{ const el = {}; if (el) {{ el.value = ''; }} return el !== null; }})()",
            self.to_query()
        )
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.selector)
    }
}

impl From<&str> for Locator {
    fn from(selector: &str) -> Self {
        Self::new(selector)
    }
}

impl From<String> for Locator {
    fn from(selector: String) -> Self {
        Self::new(selector)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod query_tests {
        use super::*;

        #[test]
        fn test_css_query() {
            let query = Locator::new("button.primary").to_query();
            assert!(query.contains("querySelector"));
            assert!(query.contains("button.primary"));
        }

        #[test]
        fn test_quotes_are_escaped() {
            let loc = Locator::new(r#"[data-calculator="salarioLiquido"]"#);
            assert_eq!(loc.js_literal(), r#""[data-calculator=\"salarioLiquido\"]""#);
        }

        #[test]
        fn test_inspect_script_reports_all_fields() {
            let script = Locator::new("html").to_inspect_script();
            for field in ["count", "visible", "classes", "text"] {
                assert!(script.contains(field), "missing {field}");
            }
            assert!(script.contains("\"html\""));
        }

        #[test]
        fn test_clear_script_targets_first_match() {
            let script = Locator::new("#salario-bruto").to_clear_script();
            assert!(script.contains("el.value = ''"));
            assert!(script.contains("#salario-bruto"));
        }
    }

    mod composition_tests {
        use super::*;

        #[test]
        fn test_child_locator() {
            let chart = Locator::new("#salario-liquido-chart-container");
            let segments = chart.locator(".chart-segment");
            assert_eq!(
                segments.selector(),
                "#salario-liquido-chart-container .chart-segment"
            );
        }

        #[test]
        fn test_by_data() {
            let loc = Locator::by_data("details-for", "proventos");
            assert_eq!(loc.selector(), "[data-details-for='proventos']");
        }

        #[test]
        fn test_is_empty() {
            assert!(Locator::new("  ").is_empty());
            assert!(!Locator::new("html").is_empty());
        }

        #[test]
        fn test_display() {
            assert_eq!(Locator::new("#a .b").to_string(), "#a .b");
        }
    }

    mod serde_tests {
        use super::*;

        #[test]
        fn test_serializes_as_plain_string() {
            let json = serde_json::to_string(&Locator::new("#theme-toggle-btn")).unwrap();
            assert_eq!(json, "\"#theme-toggle-btn\"");
            let back: Locator = serde_json::from_str(&json).unwrap();
            assert_eq!(back.selector(), "#theme-toggle-btn");
        }
    }

    #[test]
    fn test_defaults() {
        assert_eq!(DEFAULT_TIMEOUT_MS, 5000);
        assert_eq!(DEFAULT_POLL_INTERVAL_MS, 50);
    }
}
