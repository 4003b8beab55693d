use super::RetryPolicy;
use core::time::Duration;

/// Tunables shared by every component of an engine context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Items requested per page from list endpoints.
    pub page_size: u32,

    /// Most merged requests kept per project.
    pub merge_request_limit: u32,

    /// How long a cached response stays fresh.
    pub cache_ttl: Duration,

    /// Upper bound on outstanding requests.
    pub max_concurrency: usize,

    pub retry: RetryPolicy,

    /// Deadline for a whole run; unfinished work after this is dropped.
    pub run_timeout: Duration,

    /// Whether to look up release notes for each project's latest tag.
    pub release_notes: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            merge_request_limit: 5,
            cache_ttl: Duration::from_secs(300),
            max_concurrency: 8,
            retry: RetryPolicy::default(),
            run_timeout: Duration::from_secs(600),
            release_notes: true,
        }
    }
}
