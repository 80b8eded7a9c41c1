//! Error sanitization for chat replies.
//!
//! Keeps storage and transport details out of the channel.

/// Log the full error server-side and return a generic reply.
pub fn sanitize_error<E: std::fmt::Display>(error: &E, operation: &str) -> String {
    tracing::error!(
        error = %error,
        operation = operation,
        "Command failed"
    );

    format!("Failed to {operation} - please try again")
}
