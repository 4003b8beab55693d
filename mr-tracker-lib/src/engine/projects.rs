//! Listing the projects owned by a set of groups.

use super::client::decode;
use super::{ApiError, Diagnostic, DiagnosticScope, Diagnostics, EngineContext, GroupId, Project, ProjectId, RunError};
use futures_util::future::join_all;
use std::collections::{BTreeMap, BTreeSet};

const LOG_TARGET: &str = "  projects";

/// Projects found across a set of groups, de-duplicated by id.
#[derive(Debug, Clone, Default)]
pub struct EnumeratedProjects {
    pub projects: BTreeMap<ProjectId, Project>,

    /// Groups whose listing failed and was treated as empty.
    pub diagnostics: Diagnostics,
}

impl EnumeratedProjects {
    /// Projects in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProjectEnumerator<'a> {
    ctx: &'a EngineContext,
}

impl<'a> ProjectEnumerator<'a> {
    #[must_use]
    pub const fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    /// List the projects directly owned by each group in `group_ids`.
    ///
    /// Groups are listed concurrently. A project reachable through several
    /// groups is kept once.
    pub async fn list_projects(&self, group_ids: &BTreeSet<GroupId>) -> Result<EnumeratedProjects, RunError> {
        let listings = join_all(group_ids.iter().map(|&id| self.list_group_projects(id))).await;

        let mut result = EnumeratedProjects::default();
        for (&group, listing) in group_ids.iter().zip(listings) {
            match listing {
                Ok(projects) => {
                    for project in projects {
                        let _ = result.projects.entry(project.id).or_insert(project);
                    }
                }

                Err(e) => {
                    if let Some(fatal) = RunError::from_fatal(&e) {
                        return Err(fatal);
                    }

                    result
                        .diagnostics
                        .record(Diagnostic::from_api_error(DiagnosticScope::Group(group), "listing projects", &e));
                }
            }
        }

        log::info!(target: LOG_TARGET, "found {} projects in {} groups", result.len(), group_ids.len());
        Ok(result)
    }

    async fn list_group_projects(&self, id: GroupId) -> Result<Vec<Project>, ApiError> {
        let ctx = self.ctx;
        ctx.caches()
            .group_projects
            .memoize(id, || async move {
                let _permit = ctx.throttler().acquire().await;
                let items = ctx
                    .client()
                    .paginate(&format!("/groups/{id}/projects"), &[], ctx.settings().page_size)
                    .await?;
                decode(items.into(), "projects")
            })
            .await
    }
}
