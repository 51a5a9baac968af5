//! MockDriver - an in-memory page for exercising scenarios without a browser.
//!
//! The mock keeps two element tables: the page *definition* (what the server
//! renders on every load) and the live *DOM* (definition plus everything the
//! scenario changed since the last load). Elements are keyed by the exact
//! selector a scenario uses.
//!
//! Behaviour is declared with rules:
//! - [`ToggleRule`]: clicking (or pressing an activation key on) a trigger
//!   flips a class on an observed element, optionally persisted across
//!   reloads the way `localStorage` would.
//! - [`LinkedVisibility`]: an element is only rendered while another element
//!   does (or does not) carry a class.
//! - [`RevealRule`]: elements appear after a click or once a set of inputs is
//!   filled, optionally after a render delay.
//!
//! Failures can be injected per call site, and every call is recorded in a
//! [`MockHistory`] that outlives the driver.

use crate::builtin::{
    ACCORDION, CHART_SEGMENTS, CHART_SVG, GROSS_SALARY, HEALTH_DISCOUNT, HTML, MOON_ICON,
    SALARY_TAB, SUN_ICON, THEME_TOGGLE,
};
use crate::driver::{ConsoleMessage, ElementState, PageDriver};
use crate::locator::Locator;
use crate::result::{PagecheckError, PagecheckResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

/// Bytes returned by [`MockDriver::screenshot`] (the PNG signature)
pub const MOCK_PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Keys that activate a focused toggle unless a rule says otherwise
pub const ACTIVATION_KEYS: &[&str] = &["Enter", "Space"];

/// One element (or group of identical elements) of the mock page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockElement {
    /// Number of elements the selector matches
    pub count: usize,
    /// Whether the element is rendered
    pub visible: bool,
    /// Class tokens
    pub classes: Vec<String>,
    /// Text content
    pub text: Option<String>,
    /// Input value
    pub value: String,
}

impl MockElement {
    /// A single rendered element
    #[must_use]
    pub fn visible() -> Self {
        Self {
            count: 1,
            visible: true,
            classes: Vec::new(),
            text: None,
            value: String::new(),
        }
    }

    /// A single element that is in the DOM but not rendered
    #[must_use]
    pub fn hidden() -> Self {
        Self {
            visible: false,
            ..Self::visible()
        }
    }

    /// Add a class token
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set the match count
    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Set the text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    fn set_class(&mut self, class: &str, on: bool) {
        self.classes.retain(|c| c != class);
        if on {
            self.classes.push(class.to_string());
        }
    }

    fn state(&self) -> ElementState {
        ElementState {
            count: self.count,
            visible: self.visible,
            classes: self.classes.clone(),
            text: self.text.clone(),
        }
    }
}

/// Clicking or key-activating `trigger` flips `class` on `observed`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleRule {
    /// Control that is activated
    pub trigger: String,
    /// Element whose class flips
    pub observed: String,
    /// Class token
    pub class: String,
    /// Keys that activate the control while it has focus
    pub keys: Vec<String>,
    /// Whether the state survives a reload
    pub persistent: bool,
}

impl ToggleRule {
    /// A non-persistent rule activated by click and [`ACTIVATION_KEYS`]
    #[must_use]
    pub fn new(
        trigger: impl Into<String>,
        observed: impl Into<String>,
        class: impl Into<String>,
    ) -> Self {
        Self {
            trigger: trigger.into(),
            observed: observed.into(),
            class: class.into(),
            keys: ACTIVATION_KEYS.iter().map(ToString::to_string).collect(),
            persistent: false,
        }
    }

    /// Persist the state across reloads
    #[must_use]
    pub const fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Replace the activation keys
    #[must_use]
    pub fn keys(mut self, keys: &[&str]) -> Self {
        self.keys = keys.iter().map(ToString::to_string).collect();
        self
    }
}

/// `element` is only rendered while `observed` has (or lacks) `class`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedVisibility {
    /// Element whose visibility is derived
    pub element: String,
    /// Element carrying the class
    pub observed: String,
    /// Class token
    pub class: String,
    /// Rendered when the class is present (`true`) or absent (`false`)
    pub when_present: bool,
}

/// What makes a [`RevealRule`] fire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealTrigger {
    /// A click on this selector
    Click(String),
    /// Every listed input holds a non-empty value
    Filled(Vec<String>),
}

/// Elements that appear after a trigger fires
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealRule {
    /// Trigger
    pub trigger: RevealTrigger,
    /// Elements inserted into the DOM
    pub elements: Vec<(String, MockElement)>,
    /// Render delay after the trigger
    pub delay: Duration,
}

/// Shared record of every driver call, readable after the driver is consumed
#[derive(Debug, Clone, Default)]
pub struct MockHistory(Arc<Mutex<Vec<String>>>);

impl MockHistory {
    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, call: String) {
        self.lock().push(call);
    }

    /// Every call so far
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Check if a call starting with `prefix` was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.lock().iter().any(|c| c.starts_with(prefix))
    }

    /// Number of calls starting with `prefix`
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        self.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[derive(Debug, Default)]
struct Failures {
    navigation: Option<String>,
    inspect: HashSet<String>,
    screenshot: bool,
    panic_on_click: HashSet<String>,
    panic_on_close: bool,
}

#[derive(Debug, Default)]
struct Page {
    definition: HashMap<String, MockElement>,
    dom: HashMap<String, MockElement>,
    url: Option<String>,
    focused: Option<String>,
    storage: HashMap<(String, String), bool>,
    scheduled: Vec<(Instant, Vec<(String, MockElement)>)>,
    console: VecDeque<ConsoleMessage>,
    closed: bool,
}

impl Page {
    fn apply_due(&mut self, now: Instant) {
        let (due, later): (Vec<_>, Vec<_>) =
            self.scheduled.drain(..).partition(|(at, _)| *at <= now);
        self.scheduled = later;
        for (_, elements) in due {
            for (selector, element) in elements {
                self.dom.entry(selector).or_insert(element);
            }
        }
    }

    fn element(&self, selector: &str) -> PagecheckResult<&MockElement> {
        self.dom
            .get(selector)
            .ok_or_else(|| PagecheckError::input(format!("no element matches '{selector}'")))
    }
}

/// In-memory [`PageDriver`]
#[derive(Debug, Default)]
pub struct MockDriver {
    page: Mutex<Page>,
    toggles: Vec<ToggleRule>,
    linked: Vec<LinkedVisibility>,
    reveals: Vec<RevealRule>,
    load_console: Vec<ConsoleMessage>,
    failures: Failures,
    history: MockHistory,
}

impl MockDriver {
    /// Create an empty mock page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn page(&self) -> MutexGuard<'_, Page> {
        self.page.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn page_mut(&mut self) -> &mut Page {
        self.page.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an element to the page definition
    #[must_use]
    pub fn with_element(mut self, selector: impl Into<String>, element: MockElement) -> Self {
        self.page_mut().definition.insert(selector.into(), element);
        self
    }

    /// Remove an element from the definition and from every reveal rule
    #[must_use]
    pub fn without_element(mut self, selector: &str) -> Self {
        self.page_mut().definition.remove(selector);
        for rule in &mut self.reveals {
            rule.elements.retain(|(s, _)| s != selector);
        }
        self
    }

    /// Add a toggle rule
    #[must_use]
    pub fn with_toggle(mut self, rule: ToggleRule) -> Self {
        self.toggles.push(rule);
        self
    }

    /// Make every toggle rule on `observed`/`class` forget its state on reload
    #[must_use]
    pub fn forget_on_reload(mut self, observed: &str, class: &str) -> Self {
        for rule in &mut self.toggles {
            if rule.observed == observed && rule.class == class {
                rule.persistent = false;
            }
        }
        self
    }

    /// Add a linked-visibility rule
    #[must_use]
    pub fn with_linked_visibility(mut self, link: LinkedVisibility) -> Self {
        self.linked.push(link);
        self
    }

    /// Add a reveal rule
    #[must_use]
    pub fn with_reveal(mut self, rule: RevealRule) -> Self {
        self.reveals.push(rule);
        self
    }

    /// Replace what a reveal rule inserts under `selector`
    #[must_use]
    pub fn with_revealed(mut self, selector: &str, element: MockElement) -> Self {
        for rule in &mut self.reveals {
            for (s, e) in &mut rule.elements {
                if s == selector {
                    *e = element.clone();
                }
            }
        }
        self
    }

    /// Queue a console message emitted on every page load
    #[must_use]
    pub fn with_load_console(mut self, message: ConsoleMessage) -> Self {
        self.load_console.push(message);
        self
    }

    /// Make navigation and reload fail
    #[must_use]
    pub fn fail_navigation(mut self, message: impl Into<String>) -> Self {
        self.failures.navigation = Some(message.into());
        self
    }

    /// Make inspecting `selector` fail with a driver error
    #[must_use]
    pub fn fail_inspect(mut self, selector: impl Into<String>) -> Self {
        self.failures.inspect.insert(selector.into());
        self
    }

    /// Make screenshots fail
    #[must_use]
    pub const fn fail_screenshot(mut self) -> Self {
        self.failures.screenshot = true;
        self
    }

    /// Panic when `selector` is clicked
    #[must_use]
    pub fn panic_on_click(mut self, selector: impl Into<String>) -> Self {
        self.failures.panic_on_click.insert(selector.into());
        self
    }

    /// Panic when the page is closed
    #[must_use]
    pub const fn panic_on_close(mut self) -> Self {
        self.failures.panic_on_close = true;
        self
    }

    /// Handle to the call history
    #[must_use]
    pub fn history(&self) -> MockHistory {
        self.history.clone()
    }

    /// Check if a call starting with `prefix` was made
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.history.was_called(prefix)
    }

    /// Currently focused selector
    #[must_use]
    pub fn focused(&self) -> Option<String> {
        self.page().focused.clone()
    }

    /// A mock of the salary calculator page: theme switch persisted in
    /// storage, sidebar tab that renders the net-salary form, a proventos
    /// accordion, and a chart that renders three segments once gross salary
    /// and health discount are filled.
    #[must_use]
    pub fn salary_page() -> Self {
        Self::new()
            .with_element(HTML, MockElement::visible())
            .with_element(THEME_TOGGLE, MockElement::visible())
            .with_element(SUN_ICON, MockElement::visible())
            .with_element(MOON_ICON, MockElement::visible())
            .with_element(SALARY_TAB, MockElement::visible().with_class("sidebar-link"))
            .with_toggle(ToggleRule::new(THEME_TOGGLE, HTML, "dark").persistent(true))
            .with_linked_visibility(LinkedVisibility {
                element: SUN_ICON.to_string(),
                observed: HTML.to_string(),
                class: "dark".to_string(),
                when_present: false,
            })
            .with_linked_visibility(LinkedVisibility {
                element: MOON_ICON.to_string(),
                observed: HTML.to_string(),
                class: "dark".to_string(),
                when_present: true,
            })
            .with_reveal(RevealRule {
                trigger: RevealTrigger::Click(SALARY_TAB.to_string()),
                elements: vec![
                    (
                        ACCORDION.to_string(),
                        MockElement::visible().with_class("details-btn"),
                    ),
                    (GROSS_SALARY.to_string(), MockElement::visible()),
                    (HEALTH_DISCOUNT.to_string(), MockElement::visible()),
                ],
                delay: Duration::from_millis(200),
            })
            .with_toggle(ToggleRule::new(ACCORDION, ACCORDION, "active"))
            .with_reveal(RevealRule {
                trigger: RevealTrigger::Filled(vec![
                    GROSS_SALARY.to_string(),
                    HEALTH_DISCOUNT.to_string(),
                ]),
                elements: vec![
                    (CHART_SVG.to_string(), MockElement::visible().with_class("chart-svg")),
                    (
                        CHART_SEGMENTS.to_string(),
                        MockElement::visible().with_class("chart-segment").with_count(3),
                    ),
                ],
                delay: Duration::from_millis(300),
            })
            .with_load_console(ConsoleMessage::new("log", "calculators initialised"))
    }

    fn open(&self) -> PagecheckResult<MutexGuard<'_, Page>> {
        let mut page = self.page();
        if page.closed {
            return Err(PagecheckError::page("page closed"));
        }
        page.apply_due(Instant::now());
        Ok(page)
    }

    fn load(&self, page: &mut Page, url: &str) -> PagecheckResult<()> {
        if let Some(message) = &self.failures.navigation {
            return Err(PagecheckError::NavigationError {
                url: url.to_string(),
                message: message.clone(),
            });
        }
        page.dom = page.definition.clone();
        for rule in self.toggles.iter().filter(|r| r.persistent) {
            let key = (rule.observed.clone(), rule.class.clone());
            if let (Some(on), Some(el)) = (page.storage.get(&key), page.dom.get_mut(&rule.observed)) {
                el.set_class(&rule.class, *on);
            }
        }
        page.url = Some(url.to_string());
        page.focused = None;
        page.scheduled.clear();
        page.console.extend(self.load_console.iter().cloned());
        Ok(())
    }

    fn activate(&self, page: &mut Page, trigger: &str, key: Option<&str>) {
        for rule in self.toggles.iter().filter(|r| r.trigger == trigger) {
            if key.is_some_and(|k| !rule.keys.iter().any(|rk| rk == k)) {
                continue;
            }
            let Some(el) = page.dom.get_mut(&rule.observed) else {
                continue;
            };
            let on = !el.has_class(&rule.class);
            el.set_class(&rule.class, on);
            if rule.persistent {
                page.storage
                    .insert((rule.observed.clone(), rule.class.clone()), on);
            }
        }
    }

    fn fire_reveals(&self, page: &mut Page, clicked: Option<&str>) {
        let now = Instant::now();
        for rule in &self.reveals {
            let fired = match &rule.trigger {
                RevealTrigger::Click(selector) => clicked == Some(selector.as_str()),
                RevealTrigger::Filled(inputs) => inputs
                    .iter()
                    .all(|i| page.dom.get(i).is_some_and(|e| !e.value.is_empty())),
            };
            if fired {
                page.scheduled.push((now + rule.delay, rule.elements.clone()));
            }
        }
        page.apply_due(now);
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn navigate(&mut self, url: &str) -> PagecheckResult<()> {
        self.history.push(format!("navigate:{url}"));
        let mut page = self.open()?;
        self.load(&mut page, url)
    }

    async fn reload(&mut self) -> PagecheckResult<()> {
        self.history.push("reload".to_string());
        let mut page = self.open()?;
        let url = page.url.clone().ok_or_else(|| PagecheckError::NavigationError {
            url: "about:blank".to_string(),
            message: "nothing to reload".to_string(),
        })?;
        self.load(&mut page, &url)
    }

    async fn inspect(&self, locator: &Locator) -> PagecheckResult<ElementState> {
        let selector = locator.selector();
        self.history.push(format!("inspect:{selector}"));
        let page = self.open()?;
        if self.failures.inspect.contains(selector) {
            return Err(PagecheckError::page(format!(
                "evaluation failed for '{selector}'"
            )));
        }
        let Some(element) = page.dom.get(selector) else {
            return Ok(ElementState::missing());
        };
        let mut state = element.state();
        for link in self.linked.iter().filter(|l| l.element == selector) {
            let present = page
                .dom
                .get(&link.observed)
                .is_some_and(|o| o.has_class(&link.class));
            state.visible &= present == link.when_present;
        }
        Ok(state)
    }

    async fn click(&mut self, locator: &Locator) -> PagecheckResult<()> {
        let selector = locator.selector();
        self.history.push(format!("click:{selector}"));
        let mut page = self.open()?;
        if self.failures.panic_on_click.contains(selector) {
            drop(page);
            panic!("mock page crashed on click at '{selector}'");
        }
        if !page.element(selector)?.visible {
            return Err(PagecheckError::input(format!(
                "'{selector}' is not visible"
            )));
        }
        page.focused = Some(selector.to_string());
        self.activate(&mut page, selector, None);
        self.fire_reveals(&mut page, Some(selector));
        Ok(())
    }

    async fn fill(&mut self, locator: &Locator, text: &str) -> PagecheckResult<()> {
        let selector = locator.selector();
        self.history.push(format!("fill:{selector}={text}"));
        let mut page = self.open()?;
        page.element(selector)?;
        if let Some(el) = page.dom.get_mut(selector) {
            el.value = text.to_string();
        }
        page.focused = Some(selector.to_string());
        self.fire_reveals(&mut page, None);
        Ok(())
    }

    async fn focus(&mut self, locator: &Locator) -> PagecheckResult<()> {
        let selector = locator.selector();
        self.history.push(format!("focus:{selector}"));
        let mut page = self.open()?;
        page.element(selector)?;
        page.focused = Some(selector.to_string());
        Ok(())
    }

    async fn press_key(&mut self, target: Option<&Locator>, key: &str) -> PagecheckResult<()> {
        self.history.push(format!("press:{key}"));
        let mut page = self.open()?;
        if let Some(target) = target {
            page.element(target.selector())?;
            page.focused = Some(target.selector().to_string());
        }
        let focused = page
            .focused
            .clone()
            .ok_or_else(|| PagecheckError::input(format!("no element has focus for {key}")))?;
        self.activate(&mut page, &focused, Some(key));
        Ok(())
    }

    async fn screenshot(&self) -> PagecheckResult<Vec<u8>> {
        self.history.push("screenshot".to_string());
        self.open()?;
        if self.failures.screenshot {
            return Err(PagecheckError::ScreenshotError {
                message: "mock screenshot failure".to_string(),
            });
        }
        Ok(MOCK_PNG.to_vec())
    }

    async fn drain_console(&mut self) -> Vec<ConsoleMessage> {
        self.page().console.drain(..).collect()
    }

    async fn close(&mut self) -> PagecheckResult<()> {
        self.history.push("close".to_string());
        self.page().closed = true;
        if self.failures.panic_on_close {
            panic!("mock page crashed while closing");
        }
        Ok(())
    }
}
