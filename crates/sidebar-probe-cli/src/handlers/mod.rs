//! Command handlers, kept out of main.rs so they can be tested directly

pub mod config;
pub mod list;
pub mod run;
pub mod validate;

pub use config::execute_config;
pub use list::execute_list;
pub use run::{builtin_scenario, execute_run, load_scenario, run_with};
pub use validate::execute_validate;
