use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchoolError {
    #[error("record store unavailable: {0}")]
    StorageUnavailable(String),

    #[error("failed to render {artifact}: {message}")]
    RenderFailure {
        artifact: &'static str,
        message: String,
    },

    #[error("{0}")]
    InvalidInput(String),

    #[error("credential verifier failed: {0}")]
    Credential(String),
}

impl SchoolError {
    pub fn render(artifact: &'static str, message: impl ToString) -> Self {
        SchoolError::RenderFailure {
            artifact,
            message: message.to_string(),
        }
    }

    /// Stable error code reported over the sidecar protocol.
    pub fn code(&self) -> &'static str {
        match self {
            SchoolError::StorageUnavailable(_) => "storage_unavailable",
            SchoolError::RenderFailure { .. } => "render_failed",
            SchoolError::InvalidInput(_) => "bad_params",
            SchoolError::Credential(_) => "credential_failed",
        }
    }
}

impl From<rusqlite::Error> for SchoolError {
    fn from(e: rusqlite::Error) -> Self {
        SchoolError::StorageUnavailable(e.to_string())
    }
}

pub type SchoolResult<T> = Result<T, SchoolError>;
