//! Command-line interface and orchestration for mr-tracker
//!
//! This module implements the CLI commands and connects the aggregation engine
//! to configuration, progress display and report output.
//!
//! # Implementation Model
//!
//! ## Commands
//!
//! - **report**: Resolve a group hierarchy, fetch merge and tag activity for every
//!   project below it, and print or export the resulting report
//! - **init**: Generate a default configuration file
//! - **validate**: Check a configuration file for syntax and value errors
//!
//! ## Execution Flow
//!
//! The `run` function parses command-line arguments using clap and routes
//! to the appropriate command handler. `report` proceeds in three steps:
//!
//! 1. Load configuration and merge in command-line overrides
//! 2. Run the engine's aggregator, showing progress on stderr
//! 3. Render the outcome to the console and/or Excel and CSV files, then list
//!    any diagnostics that were recorded

mod common;
mod config;
mod host;
mod init;
mod progress_reporter;
mod report;
mod run;
mod validate;

#[cfg(debug_assertions)]
pub use config::Config;

#[cfg(test)]
pub use host::TestHost;

pub use common::{ColorMode, LogLevel};
pub use host::Host;
pub use init::{InitArgs, init_config};
pub use progress_reporter::ProgressReporter;
pub use report::{ReportArgs, process_report};
pub use run::run;
pub use validate::{ValidateArgs, validate_config};
