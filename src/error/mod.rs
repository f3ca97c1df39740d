use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Lineage error: {0}")]
    Lineage(#[from] LineageError),

    #[error("Iteration error: {0}")]
    Iteration(#[from] IterationError),

    #[error("Refinement backend error: {0}")]
    Refinement(#[from] RefinementError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Version lineage errors
#[derive(Debug, Error)]
pub enum LineageError {
    #[error("No versions exist in the lineage")]
    EmptyLineage,

    #[error("Version {version} not found")]
    VersionNotFound { version: u32 },

    /// Informational outcome, not a failure. The target version was already
    /// locked; callers surface this as a notice and treat it as a no-op.
    #[error("Version {version} is already locked")]
    AlreadyLocked { version: u32 },
}

/// Refinement turn errors
#[derive(Debug, Error)]
pub enum IterationError {
    #[error("Instruction cannot be empty")]
    EmptyInstruction,

    #[error("A refinement turn is already in flight")]
    Busy,

    #[error("Refinement failed: {message}")]
    RefinementFailed { message: String },
}

/// Analysis backend API errors
#[derive(Debug, Error)]
pub enum RefinementError {
    #[error("Backend unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Backend rejected the request: {message}")]
    Rejected { message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Element persistence errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Element not found: {element_id}")]
    ElementNotFound { element_id: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for lineage operations
pub type LineageResult<T> = Result<T, LineageError>;

/// Result type alias for iteration operations
pub type IterationResult<T> = Result<T, IterationError>;

/// Result type alias for refinement backend operations
pub type RefinementResult<T> = Result<T, RefinementError>;

/// Result type alias for element storage operations
pub type StorageResult<T> = Result<T, StorageError>;
