//! Command handlers - extracted from main.rs for testability

pub mod run;
pub mod scenario;

pub use run::{emit, execute_run, into_result, run_with_driver};
pub use scenario::{execute_show, execute_validate, summary};
