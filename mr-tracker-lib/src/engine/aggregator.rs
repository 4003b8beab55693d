//! One end-to-end aggregation run.

use super::{
    ActivityFetcher, BranchPair, Diagnostic, DiagnosticKind, DiagnosticScope, Diagnostics, EngineContext, HierarchyResolver,
    Progress, Project, ProjectActivity, ProjectEnumerator, ReportRow, RunError, Window, build_report,
};
use core::sync::atomic::{AtomicU64, Ordering};
use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use std::sync::Arc;
use tokio::time::{Instant, timeout_at};

const LOG_TARGET: &str = "aggregator";

/// What to aggregate.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Full path of the root group, e.g. `bfi/backend`.
    pub group_path: String,
    pub branches: BranchPair,
    pub window: Window,
}

/// The result of a run that was not aborted.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Report rows, sorted by repository name.
    pub rows: Vec<ReportRow>,

    /// Activity of every active project, in the same order as `rows`.
    pub activities: Vec<ProjectActivity>,

    /// Projects discovered below the root group, active or not.
    pub projects_total: usize,

    pub diagnostics: Vec<Diagnostic>,

    /// `true` if the run deadline expired and some work was abandoned.
    pub timed_out: bool,
}

/// Per-project results gathered before the deadline.
struct FetchedProjects {
    active: Vec<ProjectActivity>,
    finished: usize,

    /// Sorted by project path so the order does not depend on completion order.
    diagnostics: Vec<Diagnostic>,
    timed_out: bool,
}

impl RunOutcome {
    fn timed_out(diagnostics: Diagnostics, projects_total: usize) -> Self {
        Self {
            rows: Vec::new(),
            activities: Vec::new(),
            projects_total,
            diagnostics: diagnostics.into_vec(),
            timed_out: true,
        }
    }
}

/// Drives the resolver, enumerator and fetcher for one engine context.
pub struct Aggregator<'a> {
    ctx: &'a EngineContext,
    progress: &'a dyn Progress,
}

impl core::fmt::Debug for Aggregator<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Aggregator").field("ctx", &self.ctx).finish_non_exhaustive()
    }
}

impl<'a> Aggregator<'a> {
    #[must_use]
    pub fn new(ctx: &'a EngineContext, progress: &'a dyn Progress) -> Self {
        Self { ctx, progress }
    }

    /// Forget every cached response.
    pub fn invalidate_caches(&self) {
        self.ctx.invalidate_caches();
    }

    /// Aggregate activity below `request.group_path`.
    ///
    /// Fails only when the root group cannot be resolved or the token is
    /// rejected. If the run deadline passes, unfinished work is dropped and
    /// whatever completed is returned with `timed_out` set.
    pub async fn run(&self, request: &RunRequest) -> Result<RunOutcome, RunError> {
        let run_timeout = self.ctx.settings().run_timeout;
        let deadline = Instant::now() + run_timeout;
        let mut diagnostics = Diagnostics::new();

        log::info!(
            target: LOG_TARGET,
            "aggregating '{}' for {} over {}",
            request.group_path,
            request.branches,
            request.window
        );

        self.progress.set_phase("Resolving");
        let group_path = request.group_path.clone();
        self.progress.set_indeterminate(Box::new(move || format!("group hierarchy of {group_path}")));

        let Ok(hierarchy) = timeout_at(deadline, HierarchyResolver::new(self.ctx).resolve_group_ids(&request.group_path)).await else {
            diagnostics.record(deadline_diagnostic(run_timeout, "while resolving the group hierarchy"));
            return Ok(RunOutcome::timed_out(diagnostics, 0));
        };
        let hierarchy = hierarchy?;
        diagnostics.extend(hierarchy.diagnostics.into_vec());

        self.progress.set_phase("Enumerating");
        let group_count = hierarchy.group_ids.len();
        self.progress.set_indeterminate(Box::new(move || format!("projects in {group_count} groups")));

        let Ok(enumerated) = timeout_at(deadline, ProjectEnumerator::new(self.ctx).list_projects(&hierarchy.group_ids)).await else {
            diagnostics.record(deadline_diagnostic(run_timeout, "while listing projects"));
            return Ok(RunOutcome::timed_out(diagnostics, 0));
        };
        let mut enumerated = enumerated?;
        diagnostics.extend(core::mem::take(&mut enumerated.diagnostics).into_vec());

        let projects_total = enumerated.len();
        let fetched = self.fetch_all(enumerated.iter(), request, deadline).await?;

        for diag in fetched.diagnostics {
            diagnostics.record(diag);
        }

        if fetched.timed_out {
            diagnostics.record(deadline_diagnostic(
                run_timeout,
                &format!("with {} of {projects_total} projects unfinished", projects_total - fetched.finished),
            ));
        }

        let mut activities = fetched.active;
        activities.sort_by(|a, b| {
            a.project
                .repository_name()
                .cmp(b.project.repository_name())
                .then_with(|| a.project.path_with_namespace.cmp(&b.project.path_with_namespace))
        });

        let rows = build_report(&activities, &request.branches, &request.window);

        log::info!(
            target: LOG_TARGET,
            "{} of {projects_total} projects active, {} diagnostics",
            rows.len(),
            diagnostics.len()
        );

        Ok(RunOutcome {
            rows,
            activities,
            projects_total,
            diagnostics: diagnostics.into_vec(),
            timed_out: fetched.timed_out,
        })
    }

    /// Fetch activity for every project concurrently until done or `deadline`.
    ///
    /// Outstanding fetches are dropped when the deadline passes.
    async fn fetch_all<'p>(
        &self,
        projects: impl Iterator<Item = &'p Project>,
        request: &RunRequest,
        deadline: Instant,
    ) -> Result<FetchedProjects, RunError> {
        let mut pending: FuturesUnordered<_> = projects.map(|project| self.fetch_one(project, request)).collect();

        let total = u64::try_from(pending.len()).unwrap_or(u64::MAX);
        let completed = Arc::new(AtomicU64::new(0));

        self.progress.set_phase("Fetching");
        let completed_clone = Arc::clone(&completed);
        self.progress.set_determinate(Box::new(move || {
            let done = completed_clone.load(Ordering::Relaxed);
            (total, done, format!("{done}/{total} projects"))
        }));

        let mut active = Vec::new();
        let mut finished = 0;
        let mut per_project = Vec::new();
        let mut timed_out = false;

        loop {
            match timeout_at(deadline, pending.next()).await {
                Ok(Some(result)) => {
                    let (activity, diags) = result?;
                    finished += 1;
                    let _ = completed.fetch_add(1, Ordering::Relaxed);

                    if !diags.is_empty() {
                        per_project.push((activity.project.path_with_namespace.clone(), diags));
                    }
                    if activity.is_active() {
                        active.push(activity);
                    }
                }
                Ok(None) => break,
                Err(_) => {
                    timed_out = true;
                    break;
                }
            }
        }

        per_project.sort_by(|(a, _), (b, _)| a.cmp(b));

        Ok(FetchedProjects {
            active,
            finished,
            diagnostics: per_project.into_iter().flat_map(|(_, diags)| diags).collect(),
            timed_out,
        })
    }

    async fn fetch_one(&self, project: &Project, request: &RunRequest) -> Result<(ProjectActivity, Vec<Diagnostic>), RunError> {
        let fetcher = ActivityFetcher::new(self.ctx);
        let (mut activity, mut diagnostics) = fetcher.fetch_activity(project, &request.branches, &request.window).await?;

        if !self.ctx.settings().release_notes {
            return Ok((activity, diagnostics));
        }

        let Some(tag_name) = activity.latest_tag().map(|t| t.name.clone()) else {
            return Ok((activity, diagnostics));
        };

        match fetcher.fetch_tag_detail(project, &tag_name).await {
            Ok(notes) => activity.release_notes = notes,
            Err(e) => {
                if let Some(fatal) = RunError::from_fatal(&e) {
                    return Err(fatal);
                }
                diagnostics.push(Diagnostic::from_api_error(
                    DiagnosticScope::Project(project.path_with_namespace.clone()),
                    &format!("looking up release notes for tag '{tag_name}'"),
                    &e,
                ));
            }
        }

        Ok((activity, diagnostics))
    }
}

fn deadline_diagnostic(run_timeout: core::time::Duration, context: &str) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::Timeout,
        DiagnosticScope::Run,
        format!("run deadline of {}s exceeded {context}", run_timeout.as_secs()),
    )
}
