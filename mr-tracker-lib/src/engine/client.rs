//! GitLab REST client
//!
//! Thin wrapper over [`reqwest`] that authenticates every request, retries
//! transient failures, and classifies the outcome into an [`ApiError`].

use super::resilient_http::{RawResponse, resilient_get};
use super::{ApiError, Credentials, RetryPolicy};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;

const LOG_TARGET: &str = "    client";

/// Hard stop for runaway pagination.
const MAX_PAGES: u32 = 1000;

/// Characters escaped when a group path is embedded as a single URL segment.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.').remove(b'~');

/// Encode a namespaced path (e.g. `bfi/backend`) as one URL path segment.
#[must_use]
pub fn encode_path_segment(path: &str) -> String {
    utf8_percent_encode(path, PATH_SEGMENT).to_string()
}

/// Authenticated GitLab API client.
#[derive(Debug, Clone)]
#[expect(clippy::struct_field_names, reason = "client field stores the underlying HTTP client")]
pub struct Client {
    client: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl Client {
    /// Create a client that sends the credentials' token with every request.
    pub fn new(credentials: &Credentials, retry: RetryPolicy) -> crate::Result<Self> {
        let mut auth_val = HeaderValue::from_str(&format!("Bearer {}", credentials.token()))?;
        auth_val.set_sensitive(true);

        let mut headers = HeaderMap::new();
        let _ = headers.insert(AUTHORIZATION, auth_val);

        let client = reqwest::Client::builder()
            .user_agent(concat!("mr-tracker/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: credentials.base_url().to_string(),
            retry,
        })
    }

    /// Get the base URL for this client
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch `path` (relative to the API root, starting with `/`) and parse the JSON body.
    pub async fn call(&self, path: &str, query: &[(&str, String)]) -> Result<Value, ApiError> {
        let url = format!("{}{path}", self.base_url);
        log::debug!(target: LOG_TARGET, "GET {path}");

        let raw = resilient_get(&self.client, &url, query, &self.retry).await?;
        classify(path, raw)
    }

    /// Fetch every page of a list endpoint.
    ///
    /// Requests `page=1, 2, ...` with `per_page = page_size` and stops at the
    /// first empty page. Any failing page fails the whole listing; partial
    /// results are discarded.
    pub async fn paginate(&self, path: &str, query: &[(&str, String)], page_size: u32) -> Result<Vec<Value>, ApiError> {
        let mut items = Vec::new();

        for page in 1..=MAX_PAGES {
            let mut page_query = query.to_vec();
            page_query.push(("per_page", page_size.to_string()));
            page_query.push(("page", page.to_string()));

            let batch = match self.call(path, &page_query).await? {
                Value::Array(batch) => batch,
                other => {
                    return Err(ApiError::Malformed(format!(
                        "expected a JSON array from {path} (page {page}), got {}",
                        json_kind(&other)
                    )));
                }
            };

            if batch.is_empty() {
                return Ok(items);
            }

            items.extend(batch);
        }

        log::warn!(target: LOG_TARGET, "stopped paginating {path} after {MAX_PAGES} pages");
        Ok(items)
    }
}

/// Decode a JSON value into a typed record, treating a shape mismatch as [`ApiError::Malformed`].
pub(crate) fn decode<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Malformed(format!("could not decode {what}: {e}")))
}

fn classify(path: &str, raw: RawResponse) -> Result<Value, ApiError> {
    let RawResponse { status, body, .. } = raw;

    if status.is_success() {
        return serde_json::from_str(&body).map_err(|e| ApiError::Malformed(format!("invalid JSON from {path}: {e}")));
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Auth { status: status.as_u16() }),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound),
        _ => Err(ApiError::Malformed(format!("unexpected HTTP status {status} from {path}"))),
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn raw(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
            retry_after: None,
        }
    }

    #[test]
    fn nested_group_paths_encode_as_one_segment() {
        assert_eq!(encode_path_segment("bfi/backend"), "bfi%2Fbackend");
        assert_eq!(encode_path_segment("my-group_1.x~y"), "my-group_1.x~y");
        assert_eq!(encode_path_segment("a b"), "a%20b");
    }

    #[test]
    fn success_parses_json() {
        let value = classify("/groups/1", raw(200, r#"{"id": 1}"#)).unwrap();
        assert_eq!(value["id"], 1);
    }

    #[test]
    fn success_with_bad_json_is_malformed() {
        assert!(matches!(classify("/groups/1", raw(200, "<html>")), Err(ApiError::Malformed(_))));
    }

    #[test]
    fn auth_statuses_are_classified() {
        assert_eq!(classify("/x", raw(401, "")), Err(ApiError::Auth { status: 401 }));
        assert_eq!(classify("/x", raw(403, "")), Err(ApiError::Auth { status: 403 }));
    }

    #[test]
    fn not_found_is_classified() {
        assert_eq!(classify("/x", raw(404, r#"{"message":"404 Group Not Found"}"#)), Err(ApiError::NotFound));
    }

    #[test]
    fn other_client_errors_are_malformed() {
        assert!(matches!(classify("/x", raw(400, "")), Err(ApiError::Malformed(_))));
        assert!(matches!(classify("/x", raw(422, "")), Err(ApiError::Malformed(_))));
    }

    #[test]
    fn decode_reports_shape_mismatch() {
        let result: Result<Vec<u64>, _> = decode(serde_json::json!({"id": 1}), "ids");
        assert!(matches!(result, Err(ApiError::Malformed(msg)) if msg.contains("ids")));
    }

    #[test]
    fn new_client_keeps_base_url() {
        let creds = Credentials::new("token", "https://gitlab.example.com/api/v4/").unwrap();
        let client = Client::new(&creds, RetryPolicy::default()).unwrap();
        assert_eq!(client.base_url(), "https://gitlab.example.com/api/v4");
    }
}
