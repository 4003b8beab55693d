use crate::engine::{DeterminateFn, IndeterminateFn, Progress};
use core::fmt::{Debug, Formatter};
use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::task::JoinHandle;

/// Refresh rate for progress updates (10 Hz).
const REFRESH_INTERVAL: Duration = Duration::from_millis(100);

const BAR_TEMPLATE: &str = "{prefix:>12.bold.cyan} [{bar:25}] {msg}";
const BAR_TEMPLATE_NO_COLOR: &str = "{prefix:>12} [{bar:25}] {msg}";
const SPINNER_TEMPLATE: &str = "{prefix:>12.bold.cyan} {spinner} {msg}";
const SPINNER_TEMPLATE_NO_COLOR: &str = "{prefix:>12} {spinner} {msg}";

#[derive(Debug)]
struct ReporterState {
    /// The bar stays hidden until this instant, so quick runs print nothing.
    visible_after: Instant,
    visible: AtomicBool,
    counting: AtomicBool,
    phase_started: Mutex<Instant>,
}

/// Progress display on stderr for aggregation runs.
///
/// Shows the current phase (Resolving, Enumerating, Fetching) and, while
/// fetching, how many projects are done out of how many.
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
    state: Arc<ReporterState>,
    callback: Arc<Mutex<DeterminateFn>>,
    refresh_task: Arc<JoinHandle<()>>,
    use_colors: bool,
}

impl ProgressReporter {
    /// Create a new progress reporter.
    ///
    /// Nothing is drawn unless the run is still going after `delay`.
    #[must_use]
    pub fn new(delay: Duration, use_colors: bool) -> Self {
        let bar = ProgressBar::hidden();

        let state = Arc::new(ReporterState {
            visible_after: Instant::now() + delay,
            visible: AtomicBool::new(false),
            counting: AtomicBool::new(false),
            phase_started: Mutex::new(Instant::now()),
        });

        let callback = Arc::new(Mutex::new(Box::new(|| (0u64, 0u64, String::new())) as DeterminateFn));

        Self {
            refresh_task: Arc::new(tokio::spawn(refresh_task(bar.clone(), Arc::clone(&state), Arc::clone(&callback)))),
            bar,
            state,
            callback,
            use_colors,
        }
    }

    fn set_callback(&self, callback: DeterminateFn) {
        *self.callback.lock().unwrap_or_else(PoisonError::into_inner) = callback;
    }
}

impl Progress for ProgressReporter {
    fn set_phase(&self, phase: &str) {
        self.bar.set_prefix(phase.to_string());
        *self.state.phase_started.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn set_determinate(&self, callback: DeterminateFn) {
        self.set_callback(callback);
        self.state.counting.store(true, Ordering::Relaxed);
        self.bar.disable_steady_tick();
        self.bar.set_length(0);
        self.bar.set_position(0);

        let template = if self.use_colors { BAR_TEMPLATE } else { BAR_TEMPLATE_NO_COLOR };
        if let Ok(style) = ProgressStyle::default_bar().template(template) {
            self.bar.set_style(style.progress_chars("=> "));
        }
    }

    fn set_indeterminate(&self, callback: IndeterminateFn) {
        self.set_callback(Box::new(move || (0, 0, callback())));
        self.state.counting.store(false, Ordering::Relaxed);
        self.bar.enable_steady_tick(REFRESH_INTERVAL);

        let template = if self.use_colors { SPINNER_TEMPLATE } else { SPINNER_TEMPLATE_NO_COLOR };
        if let Ok(style) = ProgressStyle::default_spinner().template(template) {
            self.bar.set_style(style.tick_chars("|/-\\ "));
        }
    }

    fn done(&self) {
        self.refresh_task.abort();
        if self.state.visible.load(Ordering::Relaxed) {
            self.bar.finish_and_clear();
        }
    }
}

impl Debug for ProgressReporter {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("bar", &self.bar)
            .field("state", &self.state)
            .field("callback", &"<callback>")
            .field("refresh_task", &"<task>")
            .field("use_colors", &self.use_colors)
            .finish()
    }
}

/// Background refresh task that periodically updates the progress bar.
async fn refresh_task(bar: ProgressBar, state: Arc<ReporterState>, callback: Arc<Mutex<DeterminateFn>>) {
    let mut interval = tokio::time::interval(REFRESH_INTERVAL);
    #[expect(clippy::infinite_loop, reason = "task runs until aborted")]
    loop {
        let _ = interval.tick().await;

        if !state.visible.load(Ordering::Relaxed) && Instant::now() >= state.visible_after {
            state.visible.store(true, Ordering::Relaxed);
            bar.set_draw_target(ProgressDrawTarget::stderr_with_hz(10));
        }

        if !state.visible.load(Ordering::Relaxed) {
            continue;
        }

        let (length, position, mut message) = {
            let guard = callback.lock().unwrap_or_else(PoisonError::into_inner);
            guard()
        };

        if !state.counting.load(Ordering::Relaxed) {
            let elapsed = state.phase_started.lock().unwrap_or_else(PoisonError::into_inner).elapsed().as_secs();
            message = format!("{elapsed}s: {message}");
        }

        if length > 0 {
            bar.set_length(length);
            bar.set_position(position);
        }
        bar.set_message(message);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hidden_reporter_accepts_all_phases() {
        let reporter = ProgressReporter::new(Duration::from_secs(3600), false);
        reporter.set_phase("Resolving");
        reporter.set_indeterminate(Box::new(|| "group hierarchy".to_string()));
        reporter.set_phase("Fetching");
        reporter.set_determinate(Box::new(|| (10, 4, "4/10 projects".to_string())));
        reporter.done();
        assert!(!reporter.state.visible.load(Ordering::Relaxed));
    }
}
