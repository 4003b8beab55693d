//! Retrying HTTP GET built from [`seatbelt`] retry and timeout middleware.
//!
//! Network errors, per-attempt timeouts, 5xx and 429 responses are retried
//! with exponential backoff. Anything else is handed back to the caller
//! untouched so that it can be classified into an [`ApiError`].

use super::ApiError;
use core::time::Duration;
use layered::{Execute, Service, Stack};
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use seatbelt::retry::{Backoff, Retry};
use seatbelt::timeout::Timeout;
use seatbelt::{RecoveryInfo, ResilienceContext};
use tick::Clock;

const LOG_TARGET: &str = "      http";

/// Upper bound on a server-provided `Retry-After` delay.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Delay used for 429 responses that carry no usable `Retry-After` header.
const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(5);

/// Controls how hard the client tries before giving up on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retry attempts on top of the first request.
    pub max_retries: u32,

    /// Delay before the first retry; doubled for each later attempt.
    pub base_delay: Duration,

    /// Deadline for one attempt, covering both the send and the body read.
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// The outcome of one attempt that reached the server.
///
/// The body is only read for statuses that will not be retried.
#[derive(Debug, Clone)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: String,
    pub retry_after: Option<Duration>,
}

/// Parse the `Retry-After` header value as seconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let s = headers.get(reqwest::header::RETRY_AFTER).and_then(|h| h.to_str().ok())?;
    s.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Classify the outcome of one attempt for retry purposes.
fn should_retry_response(result: &Result<RawResponse, ApiError>) -> RecoveryInfo {
    match result {
        // Network failures and per-attempt timeouts are transient.
        Err(ApiError::Transient(_) | ApiError::Timeout(_)) => RecoveryInfo::retry(),

        Ok(resp) if resp.status == StatusCode::TOO_MANY_REQUESTS => {
            let delay = resp.retry_after.unwrap_or(DEFAULT_RATE_LIMIT_DELAY).min(MAX_RETRY_AFTER);
            RecoveryInfo::retry().delay(delay)
        }

        Ok(resp) if resp.status.is_server_error() => RecoveryInfo::retry(),

        _ => RecoveryInfo::never(),
    }
}

/// Send the request once and read the body unless the status will be retried.
async fn attempt(client: reqwest::Client, url: Url) -> Result<RawResponse, ApiError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| ApiError::Transient(e.without_url().to_string()))?;

    let status = resp.status();
    if is_retryable(status) {
        return Ok(RawResponse {
            status,
            body: String::new(),
            retry_after: parse_retry_after(resp.headers()),
        });
    }

    let body = resp
        .text()
        .await
        .map_err(|e| ApiError::Transient(e.without_url().to_string()))?;

    Ok(RawResponse {
        status,
        body,
        retry_after: None,
    })
}

fn with_query(url: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
    let mut target = Url::parse(url).map_err(|e| ApiError::Malformed(format!("invalid request URL '{url}': {e}")))?;
    if !query.is_empty() {
        let _ = target.query_pairs_mut().extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
    }
    Ok(target)
}

/// Send an HTTP GET request with automatic retry and timeout.
///
/// Returns the first non-retryable response. When every attempt fails the
/// result is [`ApiError::Timeout`] if the last attempt timed out, and
/// [`ApiError::Transient`] otherwise.
pub(crate) async fn resilient_get(
    client: &reqwest::Client,
    url: &str,
    query: &[(&str, String)],
    policy: &RetryPolicy,
) -> Result<RawResponse, ApiError> {
    let target = with_query(url, query)?;

    let clock = Clock::new_tokio();
    let context = ResilienceContext::new(&clock).name("gitlab_get");
    let request_timeout = policy.request_timeout;

    let client = client.clone();
    let service = (
        Retry::layer("retry", &context)
            .clone_input()
            .recovery_with(|result: &Result<RawResponse, ApiError>, _| should_retry_response(result))
            .max_retry_attempts(policy.max_retries)
            .base_delay(policy.base_delay)
            .backoff(Backoff::Exponential)
            .on_retry(|_output, args| {
                log::debug!(
                    target: LOG_TARGET,
                    "retrying HTTP GET (attempt {}, delay {}ms)",
                    args.attempt().index() + 1,
                    args.retry_delay().as_millis(),
                );
            }),
        Timeout::layer("timeout", &context)
            .timeout_error(move |_| ApiError::Timeout(request_timeout))
            .timeout(request_timeout),
        Execute::new(move |url: Url| attempt(client.clone(), url)),
    )
        .into_service();

    let raw = service.execute(target).await?;
    if is_retryable(raw.status) {
        return Err(ApiError::Transient(format!("HTTP {}", raw.status)));
    }

    Ok(raw)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, RETRY_AFTER};

    #[test]
    fn retry_after_parses_seconds() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));
    }

    #[test]
    fn retry_after_ignores_http_dates() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn only_server_errors_and_rate_limits_retry() {
        assert!(is_retryable(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(!is_retryable(StatusCode::NOT_FOUND));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable(StatusCode::OK));
    }

    #[test]
    fn query_is_appended_to_url() {
        let url = with_query(
            "https://gitlab.example.com/api/v4/projects/1/merge_requests",
            &[("state", "merged".to_string()), ("source_branch", "feature/x".to_string())],
        )
        .unwrap();
        assert_eq!(url.query(), Some("state=merged&source_branch=feature%2Fx"));
    }

    #[test]
    fn empty_query_leaves_url_untouched() {
        let url = with_query("https://gitlab.example.com/api/v4/groups/1", &[]).unwrap();
        assert_eq!(url.as_str(), "https://gitlab.example.com/api/v4/groups/1");
    }

    #[test]
    fn unparseable_url_is_malformed() {
        assert!(matches!(with_query("not a url", &[]), Err(ApiError::Malformed(_))));
    }
}
