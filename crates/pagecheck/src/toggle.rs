//! Toggle ledger: odd/even verification for two-state controls.
//!
//! A toggle control (theme switch, accordion) is tracked by the element whose
//! class flips and the class token itself. Before every toggle burst the
//! runner samples the control's real state as `initial`, so reloads and plain
//! clicks between bursts never leave a stale baseline. Activations of the
//! burst are counted and the expected state is
//! `initial XOR (activations is odd)`, no matter whether the activations were
//! clicks or key presses. The lifetime activation count is kept for logging.

use std::collections::HashMap;

/// Identity of a toggle control
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ToggleKey {
    /// Selector of the element whose class flips
    pub selector: String,
    /// Class token that flips
    pub class: String,
}

impl ToggleKey {
    /// Create a new key
    #[must_use]
    pub fn new(selector: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            class: class.into(),
        }
    }
}

/// Tracked state of one control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleState {
    /// State observed before the current burst
    pub initial: bool,
    /// Activations since `initial` was observed
    pub activations: u64,
    /// Activations over the whole run
    pub total: u64,
}

impl ToggleState {
    /// Start tracking from an observed state
    #[must_use]
    pub const fn new(initial: bool) -> Self {
        Self {
            initial,
            activations: 0,
            total: 0,
        }
    }

    /// Expected state after all recorded activations
    #[must_use]
    pub const fn expected(&self) -> bool {
        self.initial ^ (self.activations % 2 == 1)
    }
}

/// Per-scenario record of every toggle control
#[derive(Debug, Clone, Default)]
pub struct ToggleLedger {
    controls: HashMap<ToggleKey, ToggleState>,
}

impl ToggleLedger {
    /// Create an empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a control is already tracked
    #[must_use]
    pub fn is_tracked(&self, key: &ToggleKey) -> bool {
        self.controls.contains_key(key)
    }

    /// Set the baseline of a control to its observed state; parity counting
    /// restarts from here while the lifetime total is kept
    pub fn observe(&mut self, key: ToggleKey, observed: bool) {
        let state = self
            .controls
            .entry(key)
            .or_insert_with(|| ToggleState::new(observed));
        state.initial = observed;
        state.activations = 0;
    }

    /// Record `times` activations and return the expected state, or `None`
    /// when the control was never observed
    pub fn record(&mut self, key: &ToggleKey, times: u32) -> Option<bool> {
        let state = self.controls.get_mut(key)?;
        state.activations += u64::from(times);
        state.total += u64::from(times);
        Some(state.expected())
    }

    /// Expected state of a tracked control
    #[must_use]
    pub fn expected(&self, key: &ToggleKey) -> Option<bool> {
        self.controls.get(key).map(ToggleState::expected)
    }

    /// Tracked state of a control
    #[must_use]
    pub fn get(&self, key: &ToggleKey) -> Option<&ToggleState> {
        self.controls.get(key)
    }

    /// Number of tracked controls
    #[must_use]
    pub fn len(&self) -> usize {
        self.controls.len()
    }

    /// Whether no control is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn accordion() -> ToggleKey {
        ToggleKey::new("[data-details-for='proventos']", "active")
    }

    #[test]
    fn test_untracked_control() {
        let mut ledger = ToggleLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.record(&accordion(), 1), None);
        assert_eq!(ledger.expected(&accordion()), None);
    }

    #[test]
    fn test_open_close_sequence() {
        let mut ledger = ToggleLedger::new();
        ledger.observe(accordion(), false);
        assert_eq!(ledger.record(&accordion(), 1), Some(true));
        ledger.observe(accordion(), true);
        assert_eq!(ledger.record(&accordion(), 1), Some(false));
    }

    #[test]
    fn test_rapid_burst_of_five_leaves_open() {
        let mut ledger = ToggleLedger::new();
        ledger.observe(accordion(), false);
        assert_eq!(ledger.record(&accordion(), 5), Some(true));
        ledger.observe(accordion(), true);
        assert_eq!(ledger.record(&accordion(), 1), Some(false));
        let state = ledger.get(&accordion()).unwrap();
        assert_eq!(state.activations, 1);
        assert_eq!(state.total, 6);
    }

    #[test]
    fn test_observe_rebases_after_outside_change() {
        // A reload closed the accordion after one activation
        let mut ledger = ToggleLedger::new();
        ledger.observe(accordion(), false);
        assert_eq!(ledger.record(&accordion(), 1), Some(true));
        ledger.observe(accordion(), false);
        assert_eq!(ledger.expected(&accordion()), Some(false));
        assert_eq!(ledger.record(&accordion(), 1), Some(true));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_controls_are_independent() {
        let mut ledger = ToggleLedger::new();
        let theme = ToggleKey::new("html", "dark");
        ledger.observe(theme.clone(), false);
        ledger.observe(accordion(), true);
        ledger.record(&theme, 1);
        assert_eq!(ledger.expected(&theme), Some(true));
        assert_eq!(ledger.expected(&accordion()), Some(true));
        assert!(ledger.is_tracked(&theme));
    }

    proptest! {
        #[test]
        fn prop_state_is_initial_xor_odd(initial in any::<bool>(), bursts in prop::collection::vec(0u32..20, 0..16)) {
            let mut ledger = ToggleLedger::new();
            let key = accordion();
            ledger.observe(key.clone(), initial);
            let mut total = 0u64;
            for burst in bursts {
                total += u64::from(burst);
                let expected = ledger.record(&key, burst).unwrap();
                prop_assert_eq!(expected, initial ^ (total % 2 == 1));
            }
        }

        #[test]
        fn prop_split_bursts_match_single_burst(initial in any::<bool>(), a in 0u32..50, b in 0u32..50) {
            let key = accordion();
            let mut split = ToggleLedger::new();
            split.observe(key.clone(), initial);
            split.record(&key, a);
            split.record(&key, b);

            let mut single = ToggleLedger::new();
            single.observe(key.clone(), initial);
            single.record(&key, a + b);

            prop_assert_eq!(split.expected(&key), single.expected(&key));
        }
    }
}
