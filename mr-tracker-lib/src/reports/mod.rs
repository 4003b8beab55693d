//! Report rendering for aggregation results
//!
//! Every generator works from the engine's [`ReportRow`] contract: the four
//! columns in [`COLUMN_HEADERS`], one row per active project, already sorted by
//! repository name.
//!
//! # Implementation Model
//!
//! - **Console**: activity summary, per-project detail (newest merge, latest tag,
//!   release notes) and the report table, optionally colored
//! - **CSV**: the report table, quoted per RFC 4180 by the `csv` crate
//! - **Excel**: the report table on a `GitLab Activity` sheet with a bold header
//!
//! [`ReportRow`]: crate::engine::ReportRow

mod console;
mod csv;
mod excel;

use crate::engine::{ReportRow, Window};

pub use console::generate as generate_console;
pub use csv::generate as generate_csv;
pub use excel::generate as generate_xlsx;

/// Column titles of the exported report, in order.
pub const COLUMN_HEADERS: [&str; 4] = ["Repository Name", "Merged From Branch", "Merged To Branch", "Tag Name"];

/// Worksheet name used in Excel output.
pub const SHEET_NAME: &str = "GitLab Activity";

/// Shown when a tag carries no release description.
pub const NO_RELEASE_NOTES: &str = "No release description available";

/// File name used for `--excel` without an explicit path.
#[must_use]
pub fn default_excel_file_name(window: &Window) -> String {
    format!(
        "gitlab_activity_{}_to_{}.xlsx",
        window.after().date_naive(),
        window.before().date_naive()
    )
}

/// The cells of a row, in [`COLUMN_HEADERS`] order.
fn row_cells(row: &ReportRow) -> [&str; 4] {
    [row.repository_name.as_str(), row.source_branch.as_str(), row.target_branch.as_str(), row.tag_display()]
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn excel_file_name_uses_window_dates() {
        let window = Window::from_dates(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()).unwrap();
        assert_eq!(default_excel_file_name(&window), "gitlab_activity_2024-01-01_to_2024-01-07.xlsx");
    }

    #[test]
    fn missing_tag_uses_marker_cell() {
        let row = ReportRow {
            repository_name: "api".into(),
            source_branch: "develop".into(),
            target_branch: "testing1.1".into(),
            tag_name: None,
        };
        assert_eq!(row_cells(&row), ["api", "develop", "testing1.1", "none"]);
    }
}
