//! Post-conditions checked after a step.
//!
//! An [`Expectation`] is a predicate over the [`ElementState`] a locator
//! resolves to. The runner polls every expectation of a step until all of
//! them hold or the assertion timeout elapses.

use crate::driver::ElementState;
use crate::locator::Locator;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A post-condition over one locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    /// First match is rendered
    Visible {
        /// Element to check
        target: Locator,
    },
    /// Nothing matches, or the first match is not rendered
    Hidden {
        /// Element to check
        target: Locator,
    },
    /// First match carries the class token
    HasClass {
        /// Element to check
        target: Locator,
        /// Class token
        class: String,
    },
    /// First match exists and does not carry the class token
    LacksClass {
        /// Element to check
        target: Locator,
        /// Class token
        class: String,
    },
    /// Exactly `expected` elements match
    Count {
        /// Elements to count
        target: Locator,
        /// Exact number of matches
        expected: usize,
    },
    /// Text content of the first match contains `text`
    ContainsText {
        /// Element to check
        target: Locator,
        /// Expected substring
        text: String,
    },
}

impl Expectation {
    /// Expect the element to be visible
    #[must_use]
    pub fn visible(target: impl Into<Locator>) -> Self {
        Self::Visible {
            target: target.into(),
        }
    }

    /// Expect the element to be hidden
    #[must_use]
    pub fn hidden(target: impl Into<Locator>) -> Self {
        Self::Hidden {
            target: target.into(),
        }
    }

    /// Expect the element to carry a class
    #[must_use]
    pub fn has_class(target: impl Into<Locator>, class: impl Into<String>) -> Self {
        Self::HasClass {
            target: target.into(),
            class: class.into(),
        }
    }

    /// Expect the element to not carry a class
    #[must_use]
    pub fn lacks_class(target: impl Into<Locator>, class: impl Into<String>) -> Self {
        Self::LacksClass {
            target: target.into(),
            class: class.into(),
        }
    }

    /// Expect an exact match count
    #[must_use]
    pub fn count(target: impl Into<Locator>, expected: usize) -> Self {
        Self::Count {
            target: target.into(),
            expected,
        }
    }

    /// Expect the element text to contain a substring
    #[must_use]
    pub fn contains_text(target: impl Into<Locator>, text: impl Into<String>) -> Self {
        Self::ContainsText {
            target: target.into(),
            text: text.into(),
        }
    }

    /// Class-state expectation for a toggle: `has_class` when `on`, else `lacks_class`
    #[must_use]
    pub fn class_state(target: impl Into<Locator>, class: impl Into<String>, on: bool) -> Self {
        if on {
            Self::has_class(target, class)
        } else {
            Self::lacks_class(target, class)
        }
    }

    /// The locator this expectation inspects
    #[must_use]
    pub const fn target(&self) -> &Locator {
        match self {
            Self::Visible { target }
            | Self::Hidden { target }
            | Self::HasClass { target, .. }
            | Self::LacksClass { target, .. }
            | Self::Count { target, .. }
            | Self::ContainsText { target, .. } => target,
        }
    }

    /// Whether the expectation can only hold when the target matches something
    #[must_use]
    pub const fn requires_element(&self) -> bool {
        !matches!(self, Self::Hidden { .. } | Self::Count { .. })
    }

    /// Check the expectation against a state snapshot.
    ///
    /// # Errors
    ///
    /// Returns a description of the mismatch
    pub fn check(&self, state: &ElementState) -> Result<(), String> {
        let ok = match self {
            Self::Visible { .. } => state.exists() && state.visible,
            Self::Hidden { .. } => !state.exists() || !state.visible,
            Self::HasClass { class, .. } => state.exists() && state.has_class(class),
            Self::LacksClass { class, .. } => state.exists() && !state.has_class(class),
            Self::Count { expected, .. } => state.count == *expected,
            Self::ContainsText { text, .. } => state
                .text
                .as_deref()
                .is_some_and(|actual| actual.contains(text.as_str())),
        };
        if ok {
            Ok(())
        } else {
            Err(self.mismatch(state))
        }
    }

    fn mismatch(&self, state: &ElementState) -> String {
        if !state.exists() && !matches!(self, Self::Count { .. }) {
            return format!("expected {self}, but nothing matches");
        }
        match self {
            Self::Visible { .. } => format!("expected {self}, but it is not rendered"),
            Self::Hidden { .. } => format!("expected {self}, but it is rendered"),
            Self::HasClass { .. } | Self::LacksClass { .. } => {
                format!("expected {self}, classes are [{}]", state.classes.join(" "))
            }
            Self::Count { .. } => format!("expected {self}, found {}", state.count),
            Self::ContainsText { .. } => format!(
                "expected {self}, text is {:?}",
                state.text.as_deref().unwrap_or_default()
            ),
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible { target } => write!(f, "'{target}' to be visible"),
            Self::Hidden { target } => write!(f, "'{target}' to be hidden"),
            Self::HasClass { target, class } => write!(f, "'{target}' to have class '{class}'"),
            Self::LacksClass { target, class } => {
                write!(f, "'{target}' to not have class '{class}'")
            }
            Self::Count { target, expected } => write!(f, "'{target}' to match {expected} element(s)"),
            Self::ContainsText { target, text } => write!(f, "'{target}' to contain text {text:?}"),
        }
    }
}
