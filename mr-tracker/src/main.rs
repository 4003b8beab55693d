//! Track merged requests and release tags across a GitLab group hierarchy.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use mr_tracker_lib::{Host, run};
use std::io::{Write, stderr, stdout};
use std::process::ExitCode;

/// Host bound to the process' standard streams.
#[derive(Debug, Clone, Copy, Default)]
struct ProcessHost;

#[cfg_attr(coverage_nightly, coverage(off))]
impl Host for ProcessHost {
    fn output(&mut self) -> impl Write {
        stdout()
    }

    fn error(&mut self) -> impl Write {
        stderr()
    }

    fn exit(&mut self, code: i32) {
        std::process::exit(code);
    }
}

#[tokio::main]
#[cfg_attr(coverage_nightly, coverage(off))]
async fn main() -> ExitCode {
    let mut host = ProcessHost;
    match run(&mut host, std::env::args()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = writeln!(host.error(), "❌ {e}");
            ExitCode::FAILURE
        }
    }
}
