use crate::Result;
use crate::engine::{EngineSettings, RetryPolicy};
use camino::{Utf8Path, Utf8PathBuf};
use core::time::Duration;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;

/// The default configuration TOML content, embedded from `default_config.toml`
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../../default_config.toml");

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "mr-tracker.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root of the GitLab REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Root group to aggregate when `--group` is not given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_path: Option<String>,

    #[serde(default = "default_source_branch")]
    pub source_branch: String,

    #[serde(default = "default_target_branch")]
    pub target_branch: String,

    /// Duration fetched data stays fresh
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub cache_ttl: Duration,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    #[serde(default = "default_merge_request_limit")]
    pub merge_request_limit: u32,

    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    #[serde(default = "default_run_timeout", with = "humantime_serde")]
    pub run_timeout: Duration,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_base_delay", with = "humantime_serde")]
    pub retry_base_delay: Duration,

    #[serde(default = "default_release_notes")]
    pub release_notes: bool,
}

fn default_base_url() -> String {
    "https://gitlab.com/api/v4".to_string()
}

fn default_source_branch() -> String {
    "develop".to_string()
}

fn default_target_branch() -> String {
    "testing1.1".to_string()
}

const fn default_cache_ttl() -> Duration {
    Duration::from_mins(5)
}

const fn default_max_concurrency() -> usize {
    8
}

const fn default_page_size() -> u32 {
    100
}

const fn default_merge_request_limit() -> u32 {
    5
}

const fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

const fn default_run_timeout() -> Duration {
    Duration::from_mins(10)
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_retry_base_delay() -> Duration {
    Duration::from_secs(1)
}

const fn default_release_notes() -> bool {
    true
}

impl Config {
    /// Load configuration from a file or use defaults
    ///
    /// Without an explicit path, `mr-tracker.toml` in `base_dir` is used if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation
    pub fn load(base_dir: &Utf8Path, config_path: Option<&Utf8PathBuf>) -> Result<Self> {
        let (final_path, text) = if let Some(path) = config_path {
            let text = fs::read_to_string(path).into_app_err_with(|| format!("reading mr-tracker configuration file '{path}'"))?;
            (path.clone(), text)
        } else {
            let path = base_dir.join(CONFIG_FILE_NAME);
            match fs::read_to_string(&path) {
                Ok(text) => (path, text),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Ok(Self::default());
                }
                Err(e) => return Err(e).into_app_err_with(|| format!("reading mr-tracker configuration file '{path}'")),
            }
        };

        let config: Self = toml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{final_path}'"))?;
        config.validate()?;

        log::debug!("loaded configuration from '{final_path}'");
        Ok(config)
    }

    /// Save the default configuration to a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written
    pub fn save_default(output_path: &Utf8Path) -> Result<()> {
        fs::write(output_path, DEFAULT_CONFIG_TOML).into_app_err_with(|| format!("writing default configuration to {output_path}"))?;
        Ok(())
    }

    /// Engine tunables derived from this configuration.
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            page_size: self.page_size,
            merge_request_limit: self.merge_request_limit,
            cache_ttl: self.cache_ttl,
            max_concurrency: self.max_concurrency,
            retry: RetryPolicy {
                max_retries: self.max_retries,
                base_delay: self.retry_base_delay,
                request_timeout: self.request_timeout,
            },
            run_timeout: self.run_timeout,
            release_notes: self.release_notes,
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range
    fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(app_err!("max_concurrency must be at least 1"));
        }

        if !(1..=100).contains(&self.page_size) {
            return Err(app_err!("page_size must be between 1 and 100, got {}", self.page_size));
        }

        if !(1..=5).contains(&self.merge_request_limit) {
            return Err(app_err!(
                "merge_request_limit must be between 1 and 5, got {}",
                self.merge_request_limit
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(app_err!("request_timeout must be greater than zero"));
        }

        if self.run_timeout.is_zero() {
            return Err(app_err!("run_timeout must be greater than zero"));
        }

        let url = url::Url::parse(&self.base_url).into_app_err_with(|| format!("base_url '{}' is not a valid URL", self.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(app_err!("base_url '{}' must use http or https", self.base_url));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG_TOML).expect("default_config.toml should be valid TOML that deserializes to Config")
    }
}
