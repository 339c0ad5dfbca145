//! ID generation utilities.

use crate::{AppError, AppResult};
use ulid::Ulid;

/// Maximum length of any entity id (matches the `string_len(32)` columns).
pub const MAX_ID_LEN: usize = 32;

/// ID generator for entities.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    _private: (),
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Generate a new ULID-based ID.
    ///
    /// ULIDs are:
    /// - Lexicographically sortable
    /// - Monotonically increasing within the same millisecond
    /// - Shorter than UUIDs when represented as strings
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }
}

/// Reject malformed ids before they reach the store.
///
/// Accepts non-empty ASCII alphanumeric strings (plus `-` and `_`) of at most
/// [`MAX_ID_LEN`] characters.
pub fn validate_id(field: &str, id: &str) -> AppResult<()> {
    if id.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    if id.len() > MAX_ID_LEN {
        return Err(AppError::Validation(format!(
            "{field} must be at most {MAX_ID_LEN} characters"
        )));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::Validation(format!(
            "{field} contains invalid characters"
        )));
    }
    Ok(())
}
