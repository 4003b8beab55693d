//! Non-fatal problems collected during a run.

use super::{ApiError, GroupId};
use core::fmt::{Display, Formatter};
use serde::Serialize;

const LOG_TARGET: &str = "     diags";

/// What kind of problem a [`Diagnostic`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    NotFound,
    Transient,
    Malformed,
    Timeout,
    Auth,
}

impl From<&ApiError> for DiagnosticKind {
    fn from(error: &ApiError) -> Self {
        match error {
            ApiError::Auth { .. } => Self::Auth,
            ApiError::NotFound => Self::NotFound,
            ApiError::Transient(_) => Self::Transient,
            ApiError::Malformed(_) => Self::Malformed,
            ApiError::Timeout(_) => Self::Timeout,
        }
    }
}

impl Display for DiagnosticKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not found",
            Self::Transient => "transient",
            Self::Malformed => "malformed",
            Self::Timeout => "timeout",
            Self::Auth => "auth",
        })
    }
}

/// Where a [`Diagnostic`] was raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticScope {
    Run,
    Group(GroupId),
    Project(String),
}

impl Display for DiagnosticScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Run => f.write_str("run"),
            Self::Group(id) => write!(f, "group {id}"),
            Self::Project(path) => write!(f, "project {path}"),
        }
    }
}

/// A non-fatal problem the run worked around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub scope: DiagnosticScope,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn new(kind: DiagnosticKind, scope: DiagnosticScope, message: impl Into<String>) -> Self {
        Self {
            kind,
            scope,
            message: message.into(),
        }
    }

    /// Build a diagnostic describing a failed API call.
    #[must_use]
    pub fn from_api_error(scope: DiagnosticScope, context: &str, error: &ApiError) -> Self {
        Self::new(error.into(), scope, format!("{context}: {error}"))
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.scope, self.message)
    }
}

/// Ordered collection of diagnostics for one run.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Append a diagnostic and log it.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        log::warn!(target: LOG_TARGET, "{diagnostic}");
        self.items.push(diagnostic);
    }

    /// Append diagnostics that were already logged where they were raised.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_api_error() {
        assert_eq!(DiagnosticKind::from(&ApiError::NotFound), DiagnosticKind::NotFound);
        assert_eq!(DiagnosticKind::from(&ApiError::Transient("x".into())), DiagnosticKind::Transient);
        assert_eq!(DiagnosticKind::from(&ApiError::Malformed("x".into())), DiagnosticKind::Malformed);
    }

    #[test]
    fn display_includes_scope_and_message() {
        let diag = Diagnostic::from_api_error(
            DiagnosticScope::Project("bfi/backend/api".into()),
            "listing merge requests",
            &ApiError::Transient("HTTP 503".into()),
        );

        let text = diag.to_string();
        assert!(text.starts_with("[transient] project bfi/backend/api: listing merge requests"));
        assert!(text.contains("HTTP 503"));
    }

    #[test]
    fn collector_keeps_order() {
        let mut diags = Diagnostics::new();
        diags.record(Diagnostic::new(DiagnosticKind::NotFound, DiagnosticScope::Group(GroupId(3)), "first"));
        diags.extend([Diagnostic::new(DiagnosticKind::Timeout, DiagnosticScope::Run, "second")]);

        assert_eq!(diags.len(), 2);
        let messages: Vec<_> = diags.into_vec().into_iter().map(|d| d.message).collect();
        assert_eq!(messages, ["first", "second"]);
    }
}
