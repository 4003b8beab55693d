//! Per-project merged requests and release tags.

use super::cache::{MergeKey, TagListing};
use super::client::decode;
use super::{
    ApiError, Diagnostic, DiagnosticKind, DiagnosticScope, EngineContext, MergeRecord, Project, RunError, TagRecord, Window,
    encode_path_segment, latest_tag,
};
use chrono::{DateTime, Utc};
use core::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const LOG_TARGET: &str = "  activity";

/// The source and target branch of the merges being tracked, e.g. `develop → testing1.1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct BranchPair {
    pub source: String,
    pub target: String,
}

impl BranchPair {
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl Display for BranchPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} → {}", self.source, self.target)
    }
}

/// What one project did inside the window.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectActivity {
    pub project: Project,

    /// Most recent merges first, as ordered by the server.
    pub merges: Vec<MergeRecord>,

    /// In-window tags in the order the server listed them.
    pub tags: Vec<TagRecord>,

    /// Release description of the latest tag, when it was looked up.
    pub release_notes: Option<String>,
}

impl ProjectActivity {
    /// Returns `true` if the project merged or tagged anything in the window.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.merges.is_empty() || !self.tags.is_empty()
    }

    /// The tag with the newest commit.
    #[must_use]
    pub fn latest_tag(&self) -> Option<&TagRecord> {
        latest_tag(&self.tags)
    }

    #[must_use]
    pub fn newest_merge(&self) -> Option<&MergeRecord> {
        self.merges.first()
    }
}

#[derive(Debug, Deserialize)]
struct RawAuthor {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawMergeRequest {
    iid: u64,
    title: String,
    web_url: String,
    merged_at: Option<DateTime<Utc>>,
    author: Option<RawAuthor>,
    source_branch: String,
    target_branch: String,
}

impl From<RawMergeRequest> for MergeRecord {
    fn from(raw: RawMergeRequest) -> Self {
        Self {
            iid: raw.iid,
            title: raw.title,
            web_url: raw.web_url,
            merged_at: raw.merged_at,
            author_name: raw.author.map(|a| a.name).unwrap_or_default(),
            source_branch: raw.source_branch,
            target_branch: raw.target_branch,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawCommit {
    committed_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTag {
    name: String,
    commit: Option<RawCommit>,
}

#[derive(Debug, Deserialize)]
struct RawRelease {
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTagDetail {
    release: Option<RawRelease>,
}

/// Keep the tags whose commit date parses and lies inside `window`.
///
/// Every tag that had to be dropped for bad data yields a diagnostic.
fn filter_tags(items: Vec<Value>, window: &Window, project: &Project) -> TagListing {
    let mut listing = TagListing::default();
    let scope = || DiagnosticScope::Project(project.path_with_namespace.clone());

    for item in items {
        let tag: RawTag = match serde_json::from_value(item) {
            Ok(tag) => tag,
            Err(e) => {
                listing
                    .skipped
                    .push(Diagnostic::new(DiagnosticKind::Malformed, scope(), format!("skipping unreadable tag entry: {e}")));
                continue;
            }
        };

        let Some(raw_date) = tag.commit.and_then(|c| c.committed_date) else {
            listing.skipped.push(Diagnostic::new(
                DiagnosticKind::Malformed,
                scope(),
                format!("skipping tag '{}' without a commit date", tag.name),
            ));
            continue;
        };

        let committed_at = match DateTime::parse_from_rfc3339(&raw_date) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                listing.skipped.push(Diagnostic::new(
                    DiagnosticKind::Malformed,
                    scope(),
                    format!("skipping tag '{}' with unparseable commit date '{raw_date}': {e}", tag.name),
                ));
                continue;
            }
        };

        if window.contains(committed_at) {
            listing.tags.push(TagRecord { name: tag.name, committed_at });
        }
    }

    listing
}

/// Fetches merges and tags for single projects.
#[derive(Debug, Clone, Copy)]
pub struct ActivityFetcher<'a> {
    ctx: &'a EngineContext,
}

impl<'a> ActivityFetcher<'a> {
    #[must_use]
    pub const fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    /// Fetch the merged requests and in-window tags of `project`.
    ///
    /// Failures of either half are recorded as diagnostics and that half is
    /// treated as empty. Only a rejected token aborts.
    pub async fn fetch_activity(
        &self,
        project: &Project,
        branches: &BranchPair,
        window: &Window,
    ) -> Result<(ProjectActivity, Vec<Diagnostic>), RunError> {
        let _permit = self.ctx.throttler().acquire().await;

        let (merges, tags) = tokio::join!(self.merges(project, branches, window), self.tags(project, window));

        let mut diagnostics = Vec::new();
        let scope = || DiagnosticScope::Project(project.path_with_namespace.clone());

        let merges = match merges {
            Ok(merges) => merges,
            Err(e) => {
                if let Some(fatal) = RunError::from_fatal(&e) {
                    return Err(fatal);
                }
                diagnostics.push(Diagnostic::from_api_error(scope(), "listing merge requests", &e));
                Vec::new()
            }
        };

        let tags = match tags {
            Ok(listing) => {
                diagnostics.extend(listing.skipped);
                listing.tags
            }
            Err(e) => {
                if let Some(fatal) = RunError::from_fatal(&e) {
                    return Err(fatal);
                }
                diagnostics.push(Diagnostic::from_api_error(scope(), "listing tags", &e));
                Vec::new()
            }
        };

        log::debug!(
            target: LOG_TARGET,
            "{}: {} merges, {} tags in window",
            project.path_with_namespace,
            merges.len(),
            tags.len()
        );

        Ok((
            ProjectActivity {
                project: project.clone(),
                merges,
                tags,
                release_notes: None,
            },
            diagnostics,
        ))
    }

    /// Look up the release description attached to a tag.
    ///
    /// Returns `Ok(None)` when the tag has no release, no description, or no longer exists.
    pub async fn fetch_tag_detail(&self, project: &Project, tag_name: &str) -> Result<Option<String>, ApiError> {
        let ctx = self.ctx;
        let id = project.id;
        ctx.caches()
            .tag_details
            .memoize((id, tag_name.to_string()), || async move {
                let _permit = ctx.throttler().acquire().await;
                let path = format!("/projects/{id}/repository/tags/{}", encode_path_segment(tag_name));
                let detail: RawTagDetail = match ctx.client().call(&path, &[]).await {
                    Ok(value) => decode(value, "tag detail")?,
                    Err(ApiError::NotFound) => return Ok(None),
                    Err(e) => return Err(e),
                };

                Ok(detail
                    .release
                    .and_then(|r| r.description)
                    .filter(|d| !d.trim().is_empty()))
            })
            .await
    }

    async fn merges(&self, project: &Project, branches: &BranchPair, window: &Window) -> Result<Vec<MergeRecord>, ApiError> {
        let ctx = self.ctx;
        let key = MergeKey {
            project: project.id,
            branches: branches.clone(),
            window: *window,
        };

        ctx.caches()
            .merges
            .memoize(key, || async move {
                let limit = ctx.settings().merge_request_limit;
                let query = [
                    ("source_branch", branches.source.clone()),
                    ("target_branch", branches.target.clone()),
                    ("state", "merged".to_string()),
                    ("updated_after", window.after_param()),
                    ("updated_before", window.before_param()),
                    ("per_page", limit.to_string()),
                ];

                let value = match ctx.client().call(&format!("/projects/{}/merge_requests", project.id), &query).await {
                    Ok(value) => value,
                    Err(ApiError::NotFound) => {
                        log::debug!(target: LOG_TARGET, "{}: merge requests not found, treating as empty", project.path_with_namespace);
                        return Ok(Vec::new());
                    }
                    Err(e) => return Err(e),
                };

                let raw: Vec<RawMergeRequest> = decode(value, "merge requests")?;
                Ok(raw.into_iter().take(limit as usize).map(MergeRecord::from).collect())
            })
            .await
    }

    async fn tags(&self, project: &Project, window: &Window) -> Result<TagListing, ApiError> {
        let ctx = self.ctx;
        ctx.caches()
            .tags
            .memoize((project.id, *window), || async move {
                let items = match ctx
                    .client()
                    .paginate(&format!("/projects/{}/repository/tags", project.id), &[], ctx.settings().page_size)
                    .await
                {
                    Ok(items) => items,
                    Err(ApiError::NotFound) => return Ok(TagListing::default()),
                    Err(e) => return Err(e),
                };

                Ok(filter_tags(items, window, project))
            })
            .await
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::engine::ProjectId;
    use chrono::{NaiveDate, TimeZone};
    use serde_json::json;

    fn window() -> Window {
        Window::from_dates(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()).unwrap()
    }

    fn project() -> Project {
        Project {
            id: ProjectId(1),
            path_with_namespace: "bfi/backend/api".into(),
        }
    }

    #[test]
    fn tags_on_window_bounds_are_kept() {
        let items = vec![
            json!({"name": "start", "commit": {"committed_date": "2024-01-01T00:00:00.000000Z"}}),
            json!({"name": "end", "commit": {"committed_date": "2024-01-07T23:59:59.999999Z"}}),
            json!({"name": "early", "commit": {"committed_date": "2023-12-31T23:59:59.999999Z"}}),
            json!({"name": "late", "commit": {"committed_date": "2024-01-08T00:00:00.000000Z"}}),
        ];

        let listing = filter_tags(items, &window(), &project());
        let names: Vec<_> = listing.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["start", "end"]);
        assert!(listing.skipped.is_empty());
    }

    #[test]
    fn offsets_are_normalized_to_utc() {
        let items = vec![json!({"name": "v1", "commit": {"committed_date": "2024-01-08T01:30:00.000+02:00"}})];

        let listing = filter_tags(items, &window(), &project());
        assert_eq!(listing.tags.len(), 1);
        assert_eq!(listing.tags[0].committed_at, Utc.with_ymd_and_hms(2024, 1, 7, 23, 30, 0).unwrap());
    }

    #[test]
    fn bad_tags_are_skipped_with_diagnostics() {
        let items = vec![
            json!({"name": "no-commit"}),
            json!({"name": "null-date", "commit": {"committed_date": null}}),
            json!({"name": "garbage", "commit": {"committed_date": "yesterday"}}),
            json!("not an object"),
            json!({"name": "ok", "commit": {"committed_date": "2024-01-03T10:00:00Z"}}),
        ];

        let listing = filter_tags(items, &window(), &project());
        assert_eq!(listing.tags.len(), 1);
        assert_eq!(listing.skipped.len(), 4);
        assert!(listing.skipped.iter().all(|d| d.kind == DiagnosticKind::Malformed));
        assert!(
            listing
                .skipped
                .iter()
                .all(|d| d.scope == DiagnosticScope::Project("bfi/backend/api".into()))
        );
    }

    #[test]
    fn merge_request_payload_is_flattened() {
        let raw: RawMergeRequest = serde_json::from_value(json!({
            "id": 900,
            "iid": 12,
            "title": "Release prep",
            "web_url": "https://gitlab.example.com/bfi/backend/api/-/merge_requests/12",
            "merged_at": "2024-01-05T09:00:00.000Z",
            "author": {"id": 3, "name": "Dev One", "username": "dev1"},
            "source_branch": "develop",
            "target_branch": "testing1.1",
            "state": "merged"
        }))
        .unwrap();

        let record = MergeRecord::from(raw);
        assert_eq!(record.iid, 12);
        assert_eq!(record.author_name, "Dev One");
        assert_eq!(record.merged_at, Some(Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap()));
    }

    #[test]
    fn activity_needs_merges_or_tags() {
        let mut activity = ProjectActivity {
            project: project(),
            merges: Vec::new(),
            tags: Vec::new(),
            release_notes: None,
        };
        assert!(!activity.is_active());

        activity.tags.push(TagRecord {
            name: "v1".into(),
            committed_at: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        });
        assert!(activity.is_active());
    }

    #[test]
    fn branch_pair_display() {
        assert_eq!(BranchPair::new("develop", "testing1.1").to_string(), "develop → testing1.1");
    }
}
