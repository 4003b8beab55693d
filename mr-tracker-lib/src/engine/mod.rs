//! Aggregation of merge and release activity across a GitLab group hierarchy
//!
//! This module is responsible for turning a root group path, a branch pair and a date
//! window into a flat, sorted set of report rows.
//!
//! # Implementation Model
//!
//! Data flows leaf-first through a handful of small components:
//! - **[`Client`]**: authenticated GET calls with retry, timeout and status classification,
//!   plus a pagination helper that stops at the first empty page
//! - **[`Cache`]**: a TTL-bounded, single-flight memoizer shared by every fetch
//! - **[`HierarchyResolver`]**: transitive closure of subgroup ids below a root group
//! - **[`ProjectEnumerator`]**: de-duplicated projects owned by a set of groups
//! - **[`ActivityFetcher`]**: merged requests and in-window tags for one project
//! - **[`build_report`]**: one row per active project, sorted by repository name
//!
//! The [`Aggregator`] wires these together, runs per-project fetches concurrently
//! under a bounded [`Throttler`], enforces an overall run deadline, and returns the
//! report rows together with every non-fatal [`Diagnostic`] recorded along the way.
//! Only failures to resolve the root group and authentication failures abort a run.

mod activity;
mod aggregator;
mod api_error;
mod cache;
mod client;
mod context;
mod credentials;
mod diagnostics;
mod hierarchy;
mod models;
mod progress;
mod projects;
mod report_builder;
mod resilient_http;
mod run_error;
mod settings;
mod throttler;
mod window;

pub use activity::{ActivityFetcher, BranchPair, ProjectActivity};
pub use aggregator::{Aggregator, RunOutcome, RunRequest};
pub use api_error::ApiError;
pub use cache::{Cache, EngineCaches, MergeKey, TagListing};
pub use client::{Client, encode_path_segment};
pub use context::EngineContext;
pub use credentials::Credentials;
pub use diagnostics::{Diagnostic, DiagnosticKind, DiagnosticScope, Diagnostics};
pub use hierarchy::{HierarchyResolver, ResolvedHierarchy};
pub use models::{GroupId, GroupNode, MergeRecord, Project, ProjectId, TagRecord};
pub use progress::{DeterminateFn, IndeterminateFn, NoProgress, Progress};
pub use projects::{EnumeratedProjects, ProjectEnumerator};
pub use report_builder::{NO_TAG_MARKER, ReportRow, build_report, latest_tag, sort_tags_latest_first};
pub use resilient_http::RetryPolicy;
pub use run_error::RunError;
pub use settings::EngineSettings;
pub use throttler::Throttler;
pub use window::Window;
