use crate::Result;
use core::fmt::{Debug, Formatter};
use ohno::{IntoAppError, bail};

/// Access token plus API endpoint for one session.
///
/// Immutable once created. The token never appears in `Debug` output or logs.
#[derive(Clone)]
pub struct Credentials {
    token: String,
    base_url: String,
}

impl Credentials {
    /// Create credentials for the API rooted at `base_url` (e.g. `https://gitlab.com/api/v4`).
    ///
    /// # Errors
    ///
    /// Returns an error if the token is empty or the URL is not an absolute http(s) URL.
    pub fn new(token: impl Into<String>, base_url: &str) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            bail!("a GitLab access token is required");
        }

        let parsed = url::Url::parse(base_url).into_app_err_with(|| format!("parsing GitLab API URL '{base_url}'"))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!("GitLab API URL '{base_url}' must use http or https");
        }

        Ok(Self {
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// API root without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}
