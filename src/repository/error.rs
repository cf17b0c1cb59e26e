use crate::context::Interrupted;
use crate::store::StoreError;

/// Errors returned by repository operations
///
/// Each variant names the operation that failed; store errors keep their
/// source so the whole chain can be logged.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("log entry {id} not found")]
    NotFound { id: i64 },

    #[error("{op}: {source}")]
    StoreFailure {
        op: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{op}: operation cancelled")]
    Cancelled { op: &'static str },

    #[error("{op}: deadline exceeded")]
    DeadlineExceeded { op: &'static str },
}

impl RepoError {
    pub(crate) fn store(op: &'static str, source: StoreError) -> Self {
        Self::StoreFailure { op, source }
    }

    pub(crate) fn interrupted(op: &'static str, reason: Interrupted) -> Self {
        match reason {
            Interrupted::Cancelled => Self::Cancelled { op },
            Interrupted::DeadlineExceeded => Self::DeadlineExceeded { op },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::DeadlineExceeded { .. })
    }
}
