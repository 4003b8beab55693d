//! Discovery of every group id reachable from a root group.

use super::client::decode;
use super::{
    ApiError, Diagnostic, DiagnosticScope, Diagnostics, EngineContext, GroupId, GroupNode, RunError, encode_path_segment,
};
use futures_util::future::join_all;
use std::collections::BTreeSet;

const LOG_TARGET: &str = " hierarchy";

/// The transitive closure of subgroups below a root group.
#[derive(Debug, Clone)]
pub struct ResolvedHierarchy {
    pub root_id: GroupId,

    /// Every reachable group id, the root included. Each id appears once.
    pub group_ids: BTreeSet<GroupId>,

    /// Subgroup listings that failed and were treated as empty.
    pub diagnostics: Diagnostics,
}

/// Walks a group tree breadth-first.
#[derive(Debug, Clone, Copy)]
pub struct HierarchyResolver<'a> {
    ctx: &'a EngineContext,
}

impl<'a> HierarchyResolver<'a> {
    #[must_use]
    pub const fn new(ctx: &'a EngineContext) -> Self {
        Self { ctx }
    }

    /// Resolve `root_path` (e.g. `bfi/backend`) and collect the ids of all its descendants.
    ///
    /// Failing to resolve the root aborts with a [`RunError`]; a failing subgroup
    /// listing deeper in the tree only contributes a diagnostic, unless the
    /// token is rejected.
    pub async fn resolve_group_ids(&self, root_path: &str) -> Result<ResolvedHierarchy, RunError> {
        let root_id = self
            .resolve_root(root_path)
            .await
            .map_err(|e| RunError::from_root_failure(root_path, e))?;

        log::info!(target: LOG_TARGET, "group '{root_path}' resolved to id {root_id}");

        let mut diagnostics = Diagnostics::new();
        let mut group_ids = BTreeSet::from([root_id]);
        let mut frontier = vec![root_id];

        while !frontier.is_empty() {
            let listings = join_all(frontier.iter().map(|&id| self.list_subgroups(id))).await;

            let mut next = Vec::new();
            for (&parent, listing) in frontier.iter().zip(listings) {
                match listing {
                    Ok(children) => {
                        for child in children {
                            if group_ids.insert(child.id) {
                                next.push(child.id);
                            }
                        }
                    }

                    Err(e) => {
                        if let Some(fatal) = RunError::from_fatal(&e) {
                            return Err(fatal);
                        }

                        diagnostics.record(Diagnostic::from_api_error(DiagnosticScope::Group(parent), "listing subgroups", &e));
                    }
                }
            }

            frontier = next;
        }

        log::info!(target: LOG_TARGET, "found {} groups below '{root_path}'", group_ids.len());

        Ok(ResolvedHierarchy {
            root_id,
            group_ids,
            diagnostics,
        })
    }

    async fn resolve_root(&self, root_path: &str) -> Result<GroupId, ApiError> {
        let ctx = self.ctx;
        ctx.caches()
            .group_ids
            .memoize(root_path.to_string(), || async move {
                let _permit = ctx.throttler().acquire().await;
                let value = ctx.client().call(&format!("/groups/{}", encode_path_segment(root_path)), &[]).await?;
                let group: GroupNode = decode(value, "group")?;
                Ok(group.id)
            })
            .await
    }

    async fn list_subgroups(&self, id: GroupId) -> Result<Vec<GroupNode>, ApiError> {
        let ctx = self.ctx;
        ctx.caches()
            .subgroups
            .memoize(id, || async move {
                let _permit = ctx.throttler().acquire().await;
                let items = ctx
                    .client()
                    .paginate(&format!("/groups/{id}/subgroups"), &[], ctx.settings().page_size)
                    .await?;
                decode(items.into(), "subgroups")
            })
            .await
    }
}
