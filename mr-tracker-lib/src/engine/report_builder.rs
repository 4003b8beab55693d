//! Flattening per-project activity into report rows.

use super::{BranchPair, ProjectActivity, TagRecord, Window};
use serde::Serialize;
use std::collections::BTreeSet;

/// Shown in the tag column for projects that merged but did not tag.
pub const NO_TAG_MARKER: &str = "none";

/// One line of the exported report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub repository_name: String,
    pub source_branch: String,
    pub target_branch: String,

    /// `None` when the project has no tag in the window.
    pub tag_name: Option<String>,
}

impl ReportRow {
    /// The tag column as exported.
    #[must_use]
    pub fn tag_display(&self) -> &str {
        self.tag_name.as_deref().unwrap_or(NO_TAG_MARKER)
    }
}

/// Sort tags newest commit first. Tags with equal commit times keep their relative order.
pub fn sort_tags_latest_first(tags: &mut [TagRecord]) {
    tags.sort_by(|a, b| b.committed_at.cmp(&a.committed_at));
}

/// The tag [`sort_tags_latest_first`] would put first, without reordering anything.
#[must_use]
pub fn latest_tag(tags: &[TagRecord]) -> Option<&TagRecord> {
    tags.iter()
        .fold(None, |best: Option<&TagRecord>, tag| match best {
            Some(b) if b.committed_at >= tag.committed_at => Some(b),
            _ => Some(tag),
        })
}

/// Build one row per active project, sorted by repository name.
///
/// Tags outside `window` are ignored. A project listed twice contributes one
/// row. Rows with the same repository name (sibling namespaces) are ordered by
/// their full path.
#[must_use]
pub fn build_report(activities: &[ProjectActivity], branches: &BranchPair, window: &Window) -> Vec<ReportRow> {
    let mut seen = BTreeSet::new();
    let mut keyed = Vec::new();

    for activity in activities {
        if !seen.insert(activity.project.id) {
            continue;
        }

        let mut tags: Vec<_> = activity.tags.iter().filter(|t| window.contains(t.committed_at)).cloned().collect();
        if activity.merges.is_empty() && tags.is_empty() {
            continue;
        }

        sort_tags_latest_first(&mut tags);

        let row = ReportRow {
            repository_name: activity.project.repository_name().to_string(),
            source_branch: branches.source.clone(),
            target_branch: branches.target.clone(),
            tag_name: tags.into_iter().next().map(|t| t.name),
        };

        keyed.push((activity.project.path_with_namespace.as_str(), row));
    }

    keyed.sort_by(|(path_a, a), (path_b, b)| a.repository_name.cmp(&b.repository_name).then_with(|| path_a.cmp(path_b)));
    keyed.into_iter().map(|(_, row)| row).collect()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::engine::{MergeRecord, Project, ProjectId};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    fn window() -> Window {
        Window::from_dates(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()).unwrap()
    }

    fn branches() -> BranchPair {
        BranchPair::new("develop", "testing1.1")
    }

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap()
    }

    fn tag(name: &str, committed_at: DateTime<Utc>) -> TagRecord {
        TagRecord {
            name: name.into(),
            committed_at,
        }
    }

    fn merge(iid: u64) -> MergeRecord {
        MergeRecord {
            iid,
            title: format!("MR {iid}"),
            web_url: format!("https://gitlab.example.com/mr/{iid}"),
            merged_at: Some(at(3, 12)),
            author_name: "dev".into(),
            source_branch: "develop".into(),
            target_branch: "testing1.1".into(),
        }
    }

    fn activity(id: u64, path: &str, merges: Vec<MergeRecord>, tags: Vec<TagRecord>) -> ProjectActivity {
        ProjectActivity {
            project: Project {
                id: ProjectId(id),
                path_with_namespace: path.into(),
            },
            merges,
            tags,
            release_notes: None,
        }
    }

    #[test]
    fn latest_tag_wins_regardless_of_api_order() {
        let activities = [activity(1, "g/api", Vec::new(), vec![tag("v1", at(2, 0)), tag("v2", at(4, 0))])];

        let rows = build_report(&activities, &branches(), &window());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].tag_name.as_deref(), Some("v2"));
    }

    #[test]
    fn merges_without_tags_use_marker() {
        let activities = [activity(1, "g/api", vec![merge(1)], Vec::new())];

        let rows = build_report(&activities, &branches(), &window());
        assert_eq!(rows[0].tag_name, None);
        assert_eq!(rows[0].tag_display(), NO_TAG_MARKER);
        assert_eq!(rows[0].source_branch, "develop");
        assert_eq!(rows[0].target_branch, "testing1.1");
    }

    #[test]
    fn inactive_projects_produce_no_row() {
        let activities = [activity(1, "g/idle", Vec::new(), Vec::new())];
        assert!(build_report(&activities, &branches(), &window()).is_empty());
    }

    #[test]
    fn out_of_window_tags_do_not_count() {
        let stale = tag("v0", Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap());
        let activities = [activity(1, "g/api", Vec::new(), vec![stale])];
        assert!(build_report(&activities, &branches(), &window()).is_empty());
    }

    #[test]
    fn rows_sorted_by_repository_name_ordinally() {
        let activities = [
            activity(1, "g/zeta", vec![merge(1)], Vec::new()),
            activity(2, "g/Beta", vec![merge(2)], Vec::new()),
            activity(3, "other/alpha", vec![merge(3)], Vec::new()),
        ];

        let names: Vec<_> = build_report(&activities, &branches(), &window())
            .into_iter()
            .map(|r| r.repository_name)
            .collect();
        assert_eq!(names, ["Beta", "alpha", "zeta"]);
    }

    #[test]
    fn duplicate_projects_yield_one_row() {
        let activities = [
            activity(7, "g/api", vec![merge(1)], Vec::new()),
            activity(7, "g/api", vec![merge(1)], Vec::new()),
        ];
        assert_eq!(build_report(&activities, &branches(), &window()).len(), 1);
    }

    #[test]
    fn same_repository_name_ordered_by_full_path() {
        let activities = [
            activity(1, "b/api", vec![merge(1)], vec![tag("b1", at(2, 0))]),
            activity(2, "a/api", vec![merge(2)], vec![tag("a1", at(2, 0))]),
        ];

        let tags: Vec<_> = build_report(&activities, &branches(), &window())
            .into_iter()
            .filter_map(|r| r.tag_name)
            .collect();
        assert_eq!(tags, ["a1", "b1"]);
    }

    #[test]
    fn sort_and_latest_agree_on_ties() {
        let mut tags = vec![tag("first", at(5, 0)), tag("second", at(5, 0)), tag("old", at(1, 0))];
        let latest = latest_tag(&tags).map(|t| t.name.clone());
        sort_tags_latest_first(&mut tags);
        assert_eq!(latest.as_deref(), Some("first"));
        assert_eq!(tags[0].name, "first");
        assert_eq!(tags[2].name, "old");
    }
}
