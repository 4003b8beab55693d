//! Progress reporting hooks for an aggregation run.

/// Produces `(total, completed, message)` each time the indicator refreshes.
pub type DeterminateFn = Box<dyn Fn() -> (u64, u64, String) + Send + Sync + 'static>;

/// Produces the message shown while the amount of work is still unknown.
pub type IndeterminateFn = Box<dyn Fn() -> String + Send + Sync + 'static>;

/// Receives progress from the engine while a run is in flight.
///
/// The engine never blocks on a reporter; callbacks are polled by the
/// reporter at its own pace and must be cheap.
pub trait Progress: Send + Sync {
    /// Name the current phase: `Resolving`, `Enumerating` or `Fetching`.
    fn set_phase(&self, phase: &str);

    /// Switch to a bar with a known total.
    fn set_determinate(&self, callback: DeterminateFn);

    /// Switch to a spinner, used while groups and projects are still being discovered.
    fn set_indeterminate(&self, callback: IndeterminateFn);

    fn done(&self);
}

/// A [`Progress`] that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn set_phase(&self, _phase: &str) {}
    fn set_determinate(&self, _callback: DeterminateFn) {}
    fn set_indeterminate(&self, _callback: IndeterminateFn) {}
    fn done(&self) {}
}
