//! Game API key value object.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DomainError;

/// Upper bound on key length; real keys are 72 characters.
const MAX_API_KEY_LENGTH: usize = 200;

/// Number of leading characters kept when a key is shown redacted.
const REDACTED_PREFIX: usize = 8;

/// A syntactically valid game API key (trimmed, non-empty, <=200 chars,
/// ASCII alphanumerics and `-` only).
///
/// Syntax is all this checks. Whether the key grants access is decided by the
/// game API during verification.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiKey(String);

impl ApiKey {
    /// Create a new validated API key.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if:
    /// - The key is empty after trimming
    /// - The key exceeds 200 characters
    /// - The key contains anything other than ASCII alphanumerics and `-`
    pub fn new(key: impl Into<String>) -> Result<Self, DomainError> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(DomainError::validation("API key cannot be empty"));
        }
        if trimmed.len() > MAX_API_KEY_LENGTH {
            return Err(DomainError::validation(format!(
                "API key cannot exceed {} characters",
                MAX_API_KEY_LENGTH
            )));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(DomainError::validation(
                "API key may only contain letters, digits and dashes",
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the key as a string slice. Only adapters talking to the game API
    /// and the durable store should need this.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// The key with everything past the first few characters masked.
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(REDACTED_PREFIX).collect();
        format!("{prefix}…")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.redacted()).finish()
    }
}

impl TryFrom<String> for ApiKey {
    type Error = DomainError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ApiKey> for String {
    fn from(key: ApiKey) -> String {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str =
        "564F181A-F0FC-114A-A55D-3C1DCD45F3767AF3848F-AB29-4EBF-9594-F91E6A75E015";

    #[test]
    fn accepts_real_key_shape() {
        let key = ApiKey::new(format!("  {KEY}\n")).unwrap();
        assert_eq!(key.expose(), KEY);
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(ApiKey::new("").is_err());
        assert!(ApiKey::new("   ").is_err());
        assert!(ApiKey::new("abc def").is_err());
        assert!(ApiKey::new("abc;drop").is_err());
        assert!(ApiKey::new("a".repeat(201)).is_err());
    }

    #[test]
    fn debug_output_is_redacted() {
        let key = ApiKey::new(KEY).unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("564F181A"));
        assert!(!debug.contains("F91E6A75E015"));
    }
}
