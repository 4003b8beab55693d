//! GitLab entities the engine works with.
//!
//! Only the fields the aggregation needs are kept; everything else in the API
//! payloads is ignored during deserialization.

use chrono::{DateTime, Utc};
use core::fmt::{Display, Formatter};
use serde::{Deserialize, Serialize};

/// Numeric identifier of a GitLab group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl Display for GroupId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// Numeric identifier of a GitLab project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProjectId(pub u64);

impl Display for ProjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// A group as returned by the group lookup and subgroup listing endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupNode {
    pub id: GroupId,
    #[serde(default)]
    pub path: String,
}

/// A project owned by a group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Project {
    pub id: ProjectId,
    pub path_with_namespace: String,
}

impl Project {
    /// The last segment of the namespaced path, e.g. `api` for `bfi/backend/api`.
    #[must_use]
    pub fn repository_name(&self) -> &str {
        self.path_with_namespace.rsplit('/').next().unwrap_or(&self.path_with_namespace)
    }
}

/// One merged request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeRecord {
    pub iid: u64,
    pub title: String,
    pub web_url: String,
    pub merged_at: Option<DateTime<Utc>>,
    pub author_name: String,
    pub source_branch: String,
    pub target_branch: String,
}

/// A release tag whose commit falls inside the requested window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagRecord {
    pub name: String,
    pub committed_at: DateTime<Utc>,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn repository_name_is_last_path_segment() {
        let project = Project { id: ProjectId(7), path_with_namespace: "bfi/backend/payments-api".into() };
        assert_eq!(project.repository_name(), "payments-api");
    }

    #[test]
    fn repository_name_without_namespace() {
        let project = Project { id: ProjectId(7), path_with_namespace: "standalone".into() };
        assert_eq!(project.repository_name(), "standalone");
    }

    #[test]
    fn project_ignores_unknown_fields() {
        let json = r#"{
            "id": 42,
            "name": "API",
            "path_with_namespace": "bfi/backend/api",
            "visibility": "private",
            "default_branch": "main"
        }"#;

        let project: Project = serde_json::from_str(json).unwrap();
        assert_eq!(project.id, ProjectId(42));
        assert_eq!(project.path_with_namespace, "bfi/backend/api");
    }

    #[test]
    fn group_node_reads_gitlab_payload() {
        let json = r#"{"id": 9, "name": "Backend", "path": "backend", "full_path": "bfi/backend", "parent_id": 2}"#;
        let group: GroupNode = serde_json::from_str(json).unwrap();
        assert_eq!(group.id, GroupId(9));
        assert_eq!(group.path, "backend");
    }

    #[test]
    fn group_node_accepts_missing_path() {
        let group: GroupNode = serde_json::from_str(r#"{"id": 5}"#).unwrap();
        assert_eq!(group.id, GroupId(5));
        assert!(group.path.is_empty());
    }
}
