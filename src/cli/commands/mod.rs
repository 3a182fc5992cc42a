//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod fetch;
mod run;
mod tool;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use fetch::run_fetch;
pub use run::run_batch;
pub use tool::{run_calc, run_wikipedia};
