//! The `report` command: aggregate activity and emit it.

use super::Host;
use super::ProgressReporter;
use super::common::{ColorMode, LogLevel, init_logging};
use super::config::Config;
use crate::Result;
use crate::engine::{Aggregator, BranchPair, Credentials, EngineContext, Progress, RunOutcome, RunRequest, Window};
use crate::reports::{default_excel_file_name, generate_console, generate_csv, generate_xlsx};
use camino::Utf8PathBuf;
use chrono::{Days, NaiveDate, Utc};
use clap::Parser;
use core::time::Duration;
use ohno::{IntoAppError, bail};
use std::fs;
use std::io::Write;

const LOG_TARGET: &str = "    report";

/// Default lookback when `--since` is omitted.
const DEFAULT_LOOKBACK_DAYS: u64 = 7;

#[derive(Parser, Debug)]
pub struct ReportArgs {
    /// GitLab personal access token with the `api` or `read_api` scope
    #[arg(long, value_name = "TOKEN", env = "GITLAB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Root of the GitLab REST API (overrides `base_url` from the configuration)
    #[arg(long, value_name = "URL", env = "GITLAB_URL")]
    pub base_url: Option<String>,

    /// Full path of the root group, e.g. `my-org/backend`
    #[arg(long, short = 'g', value_name = "PATH")]
    pub group: Option<String>,

    /// Source branch of the tracked merges
    #[arg(long, value_name = "BRANCH")]
    pub from_branch: Option<String>,

    /// Target branch of the tracked merges
    #[arg(long, value_name = "BRANCH")]
    pub to_branch: Option<String>,

    /// First day of the window, in UTC (default is seven days ago)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub since: Option<NaiveDate>,

    /// Last day of the window, in UTC (default is today)
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub until: Option<NaiveDate>,

    /// Path to configuration file (default is `mr-tracker.toml`)
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Control when to use colored output
    #[arg(long, value_name = "WHEN", default_value = "auto")]
    pub color: ColorMode,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "none")]
    pub log_level: LogLevel,

    /// Write the report to an Excel file (default name is `gitlab_activity_{start}_to_{end}.xlsx`)
    #[arg(long, value_name = "PATH", num_args = 0..=1, help_heading = "Report Output")]
    pub excel: Option<Option<Utf8PathBuf>>,

    /// Write the report to a CSV file
    #[arg(long, value_name = "PATH", help_heading = "Report Output")]
    pub csv: Option<Utf8PathBuf>,

    /// Print the report to the console even when writing files
    #[arg(long, help_heading = "Report Output")]
    pub console: bool,

    /// Exit with status code 1 if any problem was recorded during the run
    #[arg(long)]
    pub strict: bool,
}

/// The inputs of a run once configuration and arguments are merged.
#[derive(Debug)]
struct ResolvedArgs {
    credentials: Credentials,
    request: RunRequest,
    config: Config,
}

fn resolve(args: &ReportArgs, config: Config, today: NaiveDate) -> Result<ResolvedArgs> {
    let Some(token) = args.token.as_deref() else {
        bail!("a GitLab access token is required; pass --token or set GITLAB_TOKEN");
    };

    let base_url = args.base_url.as_deref().unwrap_or(&config.base_url);
    let credentials = Credentials::new(token, base_url)?;

    let group_path = args
        .group
        .clone()
        .or_else(|| config.group_path.clone())
        .into_app_err("a root group is required; pass --group or set group_path in the configuration")?;

    let until = args.until.unwrap_or(today);
    let since = match args.since {
        Some(since) => since,
        None => until
            .checked_sub_days(Days::new(DEFAULT_LOOKBACK_DAYS))
            .into_app_err("computing the default start date")?,
    };

    if since > until {
        bail!("--since ({since}) must not be later than --until ({until})");
    }
    let window = Window::from_dates(since, until)?;

    let branches = BranchPair::new(
        args.from_branch.clone().unwrap_or_else(|| config.source_branch.clone()),
        args.to_branch.clone().unwrap_or_else(|| config.target_branch.clone()),
    );

    Ok(ResolvedArgs {
        credentials,
        request: RunRequest {
            group_path,
            branches,
            window,
        },
        config,
    })
}

pub async fn process_report<H: Host>(host: &mut H, args: &ReportArgs) -> Result<()> {
    init_logging(args.log_level);

    let config = Config::load(&Utf8PathBuf::from("."), args.config.as_ref())?;
    let ResolvedArgs {
        credentials,
        request,
        config,
    } = resolve(args, config, Utc::now().date_naive())?;

    log::info!(target: LOG_TARGET, "using {credentials:?}");

    let ctx = EngineContext::new(&credentials, config.engine_settings())?;

    // Showing progress and log lines together garbles the terminal.
    let delay = if args.log_level == LogLevel::None {
        Duration::from_millis(300)
    } else {
        Duration::from_secs(365 * 24 * 60 * 60)
    };
    let progress = ProgressReporter::new(delay, args.color.use_colors(&std::io::stderr()));

    let result = Aggregator::new(&ctx, &progress).run(&request).await;
    progress.done();

    let outcome = result.map_err(|e| ohno::AppError::new(e.to_string()))?;

    emit(host, args, &config, &request, &outcome)
}

fn emit<H: Host>(host: &mut H, args: &ReportArgs, config: &Config, request: &RunRequest, outcome: &RunOutcome) -> Result<()> {
    let generating_files = args.excel.is_some() || args.csv.is_some();

    if args.console || !generating_files {
        let mut console_output = String::new();
        generate_console(
            outcome,
            request,
            config.release_notes,
            args.color.use_colors(&std::io::stdout()),
            &mut console_output,
        )?;
        let _ = write!(host.output(), "{console_output}");
    }

    if let Some(path) = &args.excel {
        let path = path.clone().unwrap_or_else(|| Utf8PathBuf::from(default_excel_file_name(&request.window)));
        let mut file = fs::File::create(&path).into_app_err_with(|| format!("creating Excel report '{path}'"))?;
        generate_xlsx(&outcome.rows, &mut file)?;
        let _ = writeln!(host.output(), "Excel report written to {path}");
    }

    if let Some(path) = &args.csv {
        let file = fs::File::create(path).into_app_err_with(|| format!("creating CSV report '{path}'"))?;
        generate_csv(&outcome.rows, file)?;
        let _ = writeln!(host.output(), "CSV report written to {path}");
    }

    if !outcome.diagnostics.is_empty() {
        let _ = writeln!(host.error(), "\n{} problem(s) were worked around during the run:", outcome.diagnostics.len());
        for diag in &outcome.diagnostics {
            let _ = writeln!(host.error(), "  {diag}");
        }
    }

    if outcome.timed_out {
        let _ = writeln!(host.error(), "\nThe run deadline expired; the report is incomplete.");
    }

    if args.strict && !outcome.diagnostics.is_empty() {
        return Err(ohno::AppError::new("problems were recorded during the run and --strict is set"));
    }

    Ok(())
}
