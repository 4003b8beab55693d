//! Settings shared by the subcommands.

use clap::ValueEnum;
use std::io::IsTerminal;

/// When to colorize console output and the progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Always,
    Never,

    /// Colorize only when the stream is a terminal
    Auto,
}

impl ColorMode {
    /// Decide whether to emit ANSI colors on a stream.
    pub fn use_colors(self, stream: &impl IsTerminal) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => stream.is_terminal(),
        }
    }
}

/// Verbosity of the log lines written to stderr.
///
/// Each level includes everything above it; `none` disables logging entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    None,
    Error,
    Warn,
    Info,

    /// Per-request lines and retries
    Debug,

    /// Cache hits and misses as well
    Trace,
}

/// Install the global logger for `log_level`.
///
/// `RUST_LOG` takes precedence over the command line. Module targets are shown
/// from `debug` on, where lines from several components interleave.
pub fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    // A second initialization (e.g. from tests) is harmless.
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .try_init();
}
