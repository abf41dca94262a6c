/// Centralized error types for archlens using thiserror
///
/// Each pipeline stage reports failures through its own enum; the top-level
/// [`LensError`] wraps them so callers can match on the stage that failed.
use thiserror::Error;

/// Main error type for the analysis pipeline
#[derive(Error, Debug)]
pub enum LensError {
    #[error("Chunking error: {0}")]
    Chunking(#[from] ChunkingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors related to chunk planning and similarity grouping
#[derive(Error, Debug)]
pub enum ChunkingError {
    #[error("No source files to chunk")]
    EmptyInput,

    #[error("Invalid token budget: {0}")]
    InvalidBudget(String),

    #[error("Failed to vectorize chunks: {0}")]
    Vectorization(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to the analysis cache
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Failed to load cache entry from '{path}': {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Failed to save cache entry to '{path}': {reason}")]
    SaveFailed { path: String, reason: String },

    #[error("Failed to parse cache entry '{path}': {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Failed to create cache directory: {0}")]
    DirectoryCreationFailed(String),

    #[error("Failed to remove cache entry '{path}': {reason}")]
    RemoveFailed { path: String, reason: String },
}

/// Errors returned by a text-generation backend call
#[derive(Error, Debug, Clone)]
pub enum GenerationError {
    #[error("Backend request failed: {0}")]
    Backend(String),

    #[error("Generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Backend returned an empty response")]
    EmptyResponse,

    #[error("Generation task failed: {0}")]
    TaskFailed(String),
}

/// Terminal failures of one analysis request
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("No source files supplied for repository '{repository}'")]
    EmptyInput { repository: String },

    #[error("All {failed} chunk analyses failed for repository '{repository}': {reason}")]
    AllChunksFailed {
        repository: String,
        failed: usize,
        reason: String,
    },
}

/// Errors related to user input
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Path does not exist: {0}")]
    PathNotFound(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Unknown cache namespace: {0}")]
    UnknownNamespace(String),
}

impl From<anyhow::Error> for LensError {
    fn from(err: anyhow::Error) -> Self {
        LensError::Other(format!("{:#}", err))
    }
}

impl LensError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        LensError::Other(msg.into())
    }

    /// Check if this is a user error (bad input or configuration) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            LensError::Validation(_) | LensError::Config(ConfigError::InvalidValue { .. })
        )
    }

    /// Check if retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LensError::Generation(GenerationError::Timeout(_))
                | LensError::Generation(GenerationError::Backend(_))
                | LensError::Io(_)
        )
    }
}
