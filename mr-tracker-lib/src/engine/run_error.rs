use super::ApiError;
use core::fmt::{Display, Formatter};

/// A failure that aborts an aggregation run.
///
/// Everything else that can go wrong during a run is recorded as a
/// [`Diagnostic`](super::Diagnostic) and the run carries on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// The root group path does not exist (or is not visible with this token).
    RootNotFound(String),

    /// The token was rejected by the server.
    Unauthorized { status: u16 },

    /// The root group could not be resolved for a reason other than 404 or auth.
    RootUnavailable { path: String, cause: ApiError },
}

impl RunError {
    /// Map a failure while resolving the root group.
    pub(crate) fn from_root_failure(path: &str, error: ApiError) -> Self {
        match error {
            ApiError::NotFound => Self::RootNotFound(path.to_string()),
            ApiError::Auth { status } => Self::Unauthorized { status },
            cause => Self::RootUnavailable { path: path.to_string(), cause },
        }
    }

    /// The run-aborting form of `error`, if it is fatal anywhere in a run.
    ///
    /// Only a rejected token is; every other failure becomes a diagnostic.
    pub(crate) const fn from_fatal(error: &ApiError) -> Option<Self> {
        match error {
            ApiError::Auth { status } => Some(Self::Unauthorized { status: *status }),
            _ => None,
        }
    }
}

impl Display for RunError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RootNotFound(path) => write!(f, "group '{path}' was not found"),
            Self::Unauthorized { status } => {
                write!(f, "GitLab rejected the access token (HTTP {status}); check that it is valid and has the 'api' scope")
            }
            Self::RootUnavailable { path, cause } => write!(f, "could not resolve group '{path}': {cause}"),
        }
    }
}

impl core::error::Error for RunError {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn only_auth_is_fatal_elsewhere() {
        assert_eq!(RunError::from_fatal(&ApiError::Auth { status: 403 }), Some(RunError::Unauthorized { status: 403 }));
        assert_eq!(RunError::from_fatal(&ApiError::Auth { status: 401 }), Some(RunError::Unauthorized { status: 401 }));
        assert_eq!(RunError::from_fatal(&ApiError::NotFound), None);
        assert_eq!(RunError::from_fatal(&ApiError::Transient("503".into())), None);
        assert_eq!(RunError::from_fatal(&ApiError::Malformed("not a list".into())), None);
        assert_eq!(RunError::from_fatal(&ApiError::Timeout(core::time::Duration::from_secs(30))), None);
    }

    #[test]
    fn root_failures_are_mapped_distinctly() {
        assert_eq!(RunError::from_root_failure("bfi/backend", ApiError::NotFound), RunError::RootNotFound("bfi/backend".into()));
        assert_eq!(
            RunError::from_root_failure("bfi", ApiError::Auth { status: 401 }),
            RunError::Unauthorized { status: 401 }
        );
        assert!(matches!(
            RunError::from_root_failure("bfi", ApiError::Transient("HTTP 503".into())),
            RunError::RootUnavailable { cause: ApiError::Transient(_), .. }
        ));
    }
}
