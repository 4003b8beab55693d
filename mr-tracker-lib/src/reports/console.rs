use super::{COLUMN_HEADERS, NO_RELEASE_NOTES, row_cells};
use crate::Result;
use crate::engine::{ProjectActivity, RunOutcome, RunRequest};
use core::fmt::Write;
use owo_colors::OwoColorize;

/// Render the outcome of a run for the terminal.
///
/// `release_notes` controls whether the latest tag's release description is shown.
pub fn generate<W: Write>(outcome: &RunOutcome, request: &RunRequest, release_notes: bool, use_colors: bool, writer: &mut W) -> Result<()> {
    let heading = |text: &str| if use_colors { text.bold().to_string() } else { text.to_string() };

    writeln!(writer, "{}", heading("GitLab Activity Summary"))?;
    writeln!(writer, "  Total projects         : {}", outcome.projects_total)?;
    writeln!(writer, "  Projects with activity : {}", outcome.activities.len())?;
    writeln!(writer, "  Date range             : {}", request.window)?;
    writeln!(writer, "  Branch flow            : {}", request.branches)?;

    if outcome.activities.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "No merged requests or tags in this timeframe.")?;
        return Ok(());
    }

    for activity in &outcome.activities {
        writeln!(writer)?;
        write_activity(activity, release_notes, use_colors, writer)?;
    }

    writeln!(writer)?;
    write_table(outcome, use_colors, writer)
}

fn write_activity<W: Write>(activity: &ProjectActivity, release_notes: bool, use_colors: bool, writer: &mut W) -> Result<()> {
    let name = activity.project.repository_name();
    if use_colors {
        writeln!(writer, "{} ({})", name.bold().cyan(), activity.project.path_with_namespace.dimmed())?;
    } else {
        writeln!(writer, "{name} ({})", activity.project.path_with_namespace)?;
    }

    writeln!(writer, "  Merged requests : {}", activity.merges.len())?;
    if let Some(merge) = activity.newest_merge() {
        writeln!(writer, "  Latest merge    : !{} {}", merge.iid, merge.title)?;
        let merged = merge
            .merged_at
            .map_or_else(|| "unknown time".to_string(), |ts| ts.format("%Y-%m-%d %H:%M UTC").to_string());
        writeln!(writer, "                    merged {merged} by {}", merge.author_name)?;
        writeln!(writer, "                    {}", merge.web_url)?;
    }

    match activity.latest_tag() {
        Some(tag) => {
            let name = if use_colors { tag.name.green().to_string() } else { tag.name.clone() };
            writeln!(writer, "  Latest tag      : {name} ({})", tag.committed_at.format("%Y-%m-%d"))?;
            if release_notes {
                let notes = activity.release_notes.as_deref().unwrap_or(NO_RELEASE_NOTES);
                let mut lines = notes.lines();
                writeln!(writer, "  Release notes   : {}", lines.next().unwrap_or_default())?;
                for line in lines {
                    writeln!(writer, "                    {line}")?;
                }
            }
        }
        None => {
            let message = "No tags released in this timeframe";
            if use_colors {
                writeln!(writer, "  {}", message.yellow())?;
            } else {
                writeln!(writer, "  {message}")?;
            }
        }
    }

    Ok(())
}

fn write_table<W: Write>(outcome: &RunOutcome, use_colors: bool, writer: &mut W) -> Result<()> {
    let mut widths = COLUMN_HEADERS.map(str::len);
    for row in &outcome.rows {
        for (width, cell) in widths.iter_mut().zip(row_cells(row)) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header = format_line(COLUMN_HEADERS, widths);
    if use_colors {
        writeln!(writer, "{}", header.bold())?;
    } else {
        writeln!(writer, "{header}")?;
    }

    let total: usize = widths.iter().sum::<usize>() + 3 * (widths.len() - 1);
    writeln!(writer, "{}", "─".repeat(total))?;

    for row in &outcome.rows {
        writeln!(writer, "{}", format_line(row_cells(row), widths))?;
    }

    Ok(())
}

fn format_line(cells: [&str; 4], widths: [usize; 4]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" │ ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::engine::{BranchPair, MergeRecord, Project, ProjectId, ReportRow, TagRecord, Window};
    use chrono::{NaiveDate, TimeZone, Utc};

    fn request() -> RunRequest {
        RunRequest {
            group_path: "bfi".into(),
            branches: BranchPair::new("develop", "testing1.1"),
            window: Window::from_dates(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 7).unwrap())
                .unwrap(),
        }
    }

    fn outcome() -> RunOutcome {
        let merge = MergeRecord {
            iid: 12,
            title: "Release prep".into(),
            web_url: "https://gitlab.example.com/bfi/api/-/merge_requests/12".into(),
            merged_at: Some(Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap()),
            author_name: "Dev One".into(),
            source_branch: "develop".into(),
            target_branch: "testing1.1".into(),
        };

        let tagged = ProjectActivity {
            project: Project { id: ProjectId(1), path_with_namespace: "bfi/api".into() },
            merges: vec![merge.clone()],
            tags: vec![TagRecord { name: "v1.0.0".into(), committed_at: Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap() }],
            release_notes: Some("First line\nSecond line".into()),
        };

        let untagged = ProjectActivity {
            project: Project { id: ProjectId(2), path_with_namespace: "bfi/web".into() },
            merges: vec![merge],
            tags: Vec::new(),
            release_notes: None,
        };

        RunOutcome {
            rows: vec![
                ReportRow { repository_name: "api".into(), source_branch: "develop".into(), target_branch: "testing1.1".into(), tag_name: Some("v1.0.0".into()) },
                ReportRow { repository_name: "web".into(), source_branch: "develop".into(), target_branch: "testing1.1".into(), tag_name: None },
            ],
            activities: vec![tagged, untagged],
            projects_total: 5,
            diagnostics: Vec::new(),
            timed_out: false,
        }
    }

    #[test]
    fn test_summary_and_details() {
        let mut out = String::new();
        generate(&outcome(), &request(), true, false, &mut out).unwrap();

        assert!(out.contains("Total projects         : 5"));
        assert!(out.contains("Projects with activity : 2"));
        assert!(out.contains("Date range             : 2024-01-01 to 2024-01-07"));
        assert!(out.contains("Branch flow            : develop → testing1.1"));
        assert!(out.contains("!12 Release prep"));
        assert!(out.contains("merged 2024-01-05 09:00 UTC by Dev One"));
        assert!(out.contains("Latest tag      : v1.0.0 (2024-01-06)"));
        assert!(out.contains("Release notes   : First line"));
        assert!(out.contains("No tags released in this timeframe"));
    }

    #[test]
    fn test_table_lists_rows_with_marker() {
        let mut out = String::new();
        generate(&outcome(), &request(), false, false, &mut out).unwrap();

        assert!(out.contains("Repository Name │ Merged From Branch │ Merged To Branch │ Tag Name"));
        assert!(out.lines().any(|l| l.starts_with("web") && l.ends_with("none")));
        assert!(!out.contains("Release notes"));
    }

    #[test]
    fn test_no_activity() {
        let empty = RunOutcome { rows: Vec::new(), activities: Vec::new(), projects_total: 3, diagnostics: Vec::new(), timed_out: false };
        let mut out = String::new();
        generate(&empty, &request(), true, false, &mut out).unwrap();
        assert!(out.contains("No merged requests or tags in this timeframe."));
    }

    #[test]
    fn test_color_mode_never_has_no_escapes() {
        let mut out = String::new();
        generate(&outcome(), &request(), true, false, &mut out).unwrap();
        assert!(!out.contains('\x1b'));

        let mut colored = String::new();
        generate(&outcome(), &request(), true, true, &mut colored).unwrap();
        assert!(colored.contains('\x1b'));
    }
}
