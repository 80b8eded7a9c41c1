//! Error types for port operations.

/// Repository operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Storage operation failed - includes operation name for tracing.
    #[error("Storage error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepoError {
    /// Create a Database error with operation context.
    pub fn database(operation: &'static str, message: impl ToString) -> Self {
        Self::Database {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }
}

/// Errors from the game API.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GameApiError {
    /// The API answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    /// No response at all (DNS, connect, timeout).
    #[error("{endpoint} request failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },

    /// A success response whose body could not be understood.
    #[error("{endpoint} returned an invalid response: {message}")]
    InvalidResponse {
        endpoint: &'static str,
        message: String,
    },
}

impl GameApiError {
    /// Whether the API answered at all.
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status { .. })
    }
}

/// Errors from the chat platform.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlatformError {
    #[error("Chat platform request failed in {operation}: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },
}

impl PlatformError {
    pub fn request(operation: &'static str, message: impl ToString) -> Self {
        Self::Request {
            operation,
            message: message.to_string(),
        }
    }
}
