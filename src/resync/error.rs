//! Errors of the synchronization engine.

use crate::checkpoint::CheckpointError;
use crate::client::ClientError;
use crate::director::DirectorError;
use crate::storage::StorageError;

/// Failure of a synchronization step.
#[derive(Debug, thiserror::Error)]
pub enum ResyncError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Director(#[from] DirectorError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("{0}")]
    ScenarioConflict(String),

    #[error("{0}")]
    ParentNotFound(String),

    #[error("Tenant events for type {0} are not supported")]
    UnsupportedTenantType(String),

    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ResyncError>,
    },
}

impl ResyncError {
    /// Wrap with a contextual message.
    pub fn context(self, context: impl Into<String>) -> Self {
        ResyncError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error below any context wrappers.
    pub fn root(&self) -> &ResyncError {
        match self {
            ResyncError::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Adds context to fallible synchronization results.
pub trait WithContext<T> {
    fn context(self, context: impl Into<String>) -> Result<T, ResyncError>;

    fn with_context<F, S>(self, f: F) -> Result<T, ResyncError>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> WithContext<T> for Result<T, E>
where
    E: Into<ResyncError>,
{
    fn context(self, context: impl Into<String>) -> Result<T, ResyncError> {
        self.map_err(|e| e.into().context(context))
    }

    fn with_context<F, S>(self, f: F) -> Result<T, ResyncError>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.into().context(f()))
    }
}
