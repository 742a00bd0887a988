use thiserror::Error;

/// Failures surfaced across the selection, history and metrics boundary.
#[derive(Debug, Error)]
pub enum WheelError {
    #[error("Missing required fields: {}", .missing.join(", "))]
    Validation { missing: Vec<&'static str> },

    #[error("Invalid request body: {0}")]
    MalformedBody(String),

    #[error("No selectable entries in the pool")]
    NoSelectableEntries,

    #[error("A spin is already in progress")]
    SpinInProgress,

    #[error("Store error: {0:#}")]
    Store(anyhow::Error),

    #[error(
        "Clear aborted after {chunks_completed} batch(es) with {deleted} record(s) deleted: {cause:#}"
    )]
    PartialBatchFailure {
        deleted: usize,
        chunks_completed: usize,
        cause: anyhow::Error,
    },
}

impl WheelError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::MalformedBody(_))
    }
}

impl From<anyhow::Error> for WheelError {
    fn from(err: anyhow::Error) -> Self {
        Self::Store(err)
    }
}
