//! Command dispatch logic for mr-tracker

use super::{InitArgs, ReportArgs, ValidateArgs, init_config, process_report, validate_config};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "mr-tracker", version, author, long_about = None)]
#[command(about = "Track merged requests and release tags across a GitLab group hierarchy")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: TrackerSubcommand,
}

#[derive(Subcommand, Debug)]
enum TrackerSubcommand {
    /// Aggregate merge and tag activity below a group and emit a report
    Report(Box<ReportArgs>),
    /// Generate a default configuration file
    Init(InitArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the corresponding
/// subcommand. It's designed to be called from main.rs with the program arguments.
///
/// # Errors
///
/// Returns an error if command parsing fails or if the executed command fails
pub async fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    match &Cli::parse_from(args).command {
        TrackerSubcommand::Report(report_args) => process_report(host, report_args).await,
        TrackerSubcommand::Init(init_args) => init_config(host, init_args),
        TrackerSubcommand::Validate(validate_args) => validate_config(host, validate_args),
    }
}
