use thiserror::Error;

/// Failure taxonomy shared by every pipeline stage.
///
/// Stages fail closed: a failed dependency never gets substituted with
/// empty or default data, the error carries up to the orchestrator instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Tool invocation failed: {0}")]
    ToolInvocation(String),

    #[error("Tool '{tool}' timed out after {seconds}s")]
    ToolTimeout { tool: String, seconds: u64 },

    #[error("Document not loaded: {0}")]
    DocumentNotLoaded(String),

    #[error("Store operation failed: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, Error>;
