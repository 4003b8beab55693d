use super::{Client, Credentials, EngineCaches, EngineSettings, Throttler};
use std::sync::Arc;

/// Everything the engine components share for one set of credentials.
///
/// The caches live here so that entries fetched with one token can never be
/// served to a context built from different credentials.
#[derive(Debug)]
pub struct EngineContext {
    client: Client,
    caches: EngineCaches,
    throttler: Arc<Throttler>,
    settings: EngineSettings,
}

impl EngineContext {
    pub fn new(credentials: &Credentials, settings: EngineSettings) -> crate::Result<Self> {
        Ok(Self {
            client: Client::new(credentials, settings.retry)?,
            caches: EngineCaches::new(settings.cache_ttl),
            throttler: Throttler::new(settings.max_concurrency),
            settings,
        })
    }

    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub const fn caches(&self) -> &EngineCaches {
        &self.caches
    }

    #[must_use]
    pub fn throttler(&self) -> &Throttler {
        &self.throttler
    }

    #[must_use]
    pub const fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Forget every cached response so the next run refetches everything.
    pub fn invalidate_caches(&self) {
        self.caches.invalidate_all();
    }
}
