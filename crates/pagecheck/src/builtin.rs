//! Built-in scenario for the salary calculator.
//!
//! Verifies, in order: the light/dark theme switch and its persistence across
//! reloads, the proventos accordion of the net-salary form (click, rapid
//! clicks and keyboard activation), and that the results chart renders again
//! after the form is filled.

use crate::assertion::Expectation;
use crate::locator::Locator;
use crate::scenario::{Action, Scenario, Step};

/// Root element carrying the theme class
pub const HTML: &str = "html";
/// Theme switch button
pub const THEME_TOGGLE: &str = "#theme-toggle-btn";
/// Light theme icon inside the switch
pub const SUN_ICON: &str = "#theme-toggle-btn .sun-icon";
/// Dark theme icon inside the switch
pub const MOON_ICON: &str = "#theme-toggle-btn .moon-icon";
/// Sidebar tab of the net-salary calculator
pub const SALARY_TAB: &str = ".sidebar-link[data-calculator='salarioLiquido']";
/// Proventos accordion button
pub const ACCORDION: &str = "[data-details-for='salario-liquido-proventos-details']";
/// Gross salary input
pub const GROSS_SALARY: &str = "#salario-bruto-salario-liquido";
/// Health plan discount input
pub const HEALTH_DISCOUNT: &str = "#desconto-saude-salario-liquido";
/// Results chart container
pub const CHART_CONTAINER: &str = "#salario-liquido-chart-container";
/// Chart SVG inside the container
pub const CHART_SVG: &str = "#salario-liquido-chart-container svg.chart-svg";
/// Chart segments inside the container
pub const CHART_SEGMENTS: &str = "#salario-liquido-chart-container .chart-segment";

/// Scenario name
pub const SALARY_CALCULATOR: &str = "salary-calculator";

/// Settle delay after theme changes and accordion transitions
const TRANSITION_MS: u64 = 500;
/// Settle delay after switching calculator tabs
const TAB_SWITCH_MS: u64 = 1000;

/// The salary calculator verification scenario.
///
/// Expects the application server to be listening on `base_url:port`.
#[must_use]
pub fn salary_calculator(base_url: &str, port: u16) -> Scenario {
    let theme_switch = Locator::new(THEME_TOGGLE);
    let chart = Locator::new(CHART_CONTAINER);

    let theme = || Action::toggle(THEME_TOGGLE, "dark").observing(HTML);
    let accordion = || Action::toggle(ACCORDION, "active");

    Scenario::new(SALARY_CALCULATOR, base_url, port)
        .step(
            Step::new("Open the calculator in light mode", Action::navigate("/?notest=true"))
                .expect(Expectation::lacks_class(HTML, "dark"))
                .expect(Expectation::visible(theme_switch.locator(".sun-icon")))
                .screenshot("light_mode_initial"),
        )
        .step(
            Step::new("Toggle to dark mode", theme())
                .settle_ms(TRANSITION_MS)
                .expect(Expectation::visible(theme_switch.locator(".moon-icon")))
                .screenshot("dark_mode_toggled"),
        )
        .step(
            Step::new("Dark mode persists after reload", Action::Reload)
                .settle_ms(TRANSITION_MS)
                .expect(Expectation::has_class(HTML, "dark"))
                .expect(Expectation::visible(theme_switch.locator(".moon-icon")))
                .screenshot("dark_mode_reloaded"),
        )
        .step(Step::new("Toggle back to light mode", theme()).settle_ms(TRANSITION_MS))
        .step(
            Step::new("Light mode persists after reload", Action::Reload)
                .settle_ms(TRANSITION_MS)
                .expect(Expectation::lacks_class(HTML, "dark")),
        )
        .step(
            Step::new("Open the net salary calculator", Action::click(SALARY_TAB))
                .settle_ms(TAB_SWITCH_MS)
                .expect(Expectation::lacks_class(ACCORDION, "active")),
        )
        .step(
            Step::new("Open the proventos accordion", accordion())
                .settle_ms(TRANSITION_MS)
                .screenshot("accordion_open"),
        )
        .step(Step::new("Close the proventos accordion", accordion()).settle_ms(TRANSITION_MS))
        .step(
            Step::new(
                "Five rapid clicks leave the accordion open",
                accordion().repeated(5, 50),
            )
            .settle_ms(TRANSITION_MS),
        )
        .step(Step::new("Close the accordion again", accordion()).settle_ms(TRANSITION_MS))
        .step(
            Step::new("Enter opens the focused accordion", accordion().via_keyboard())
                .settle_ms(TRANSITION_MS)
                .screenshot("accordion_kbd_open"),
        )
        .step(
            Step::new("Enter closes the focused accordion", accordion().via_keyboard())
                .settle_ms(TRANSITION_MS),
        )
        .step(Step::new(
            "Enter the gross salary",
            Action::fill(GROSS_SALARY, "5000"),
        ))
        .step(
            Step::new("Enter the health discount", Action::fill(HEALTH_DISCOUNT, "100"))
                .settle_ms(TRANSITION_MS)
                .expect(Expectation::visible(chart.locator("svg.chart-svg")))
                .expect(Expectation::count(chart.locator(".chart-segment"), 3))
                .screenshot("svg_chart_restored"),
        )
        .step(Step::not_yet_verified(
            "Duplicate ID fix",
            "not yet verified",
        ))
}
