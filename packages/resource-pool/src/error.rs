//! Typed errors for the resource pool engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Per-unit failures during
//! discovery and unified search (one domain, one bound entry) are recorded
//! as data inside the result structs and never surface as `Err` — only
//! invalid input and storage faults do.

use thiserror::Error;

/// Errors that can occur during resource pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Malformed URL, missing required field, or scope/tenant mismatch.
    /// Surfaced synchronously to the caller, never retried.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// Site entry or source item not found.
    #[error("not found: {key}")]
    NotFound { key: String },

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Chat completion transport failed (LLM fallback only).
    #[error("completion error: {0}")]
    Completion(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl PoolError {
    /// Shorthand for an `InvalidInput` error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Box::new(err))
    }
}

/// Errors from a single outbound fetch or probe.
///
/// These are always scoped to one unit of work; the orchestrators convert
/// them into structured per-unit error records.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL failed to parse or is not http(s).
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// HTTP transport failed (after the single built-in retry).
    #[error("HTTP error fetching {url}: {message}")]
    Http { url: String, message: String },

    /// Non-2xx response.
    #[error("status {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// Request timed out.
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// Response body could not be decoded or parsed.
    #[error("decode error for {url}: {message}")]
    Decode { url: String, message: String },
}

/// Result type alias for resource pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;
