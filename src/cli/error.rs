// Error handling utilities for consistent error messages and exit codes

use thiserror::Error;

/// An error caused by the user's input rather than by the system.
/// `main` prints these as `Error: ...` and exits with code 1; anything else
/// is reported as an internal error with code 2.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct UserError(pub String);

/// Shorthand for returning a user error from a handler
pub fn user_error<T>(message: impl Into<String>) -> anyhow::Result<T> {
    Err(UserError(message.into()).into())
}

/// Check whether an error chain is a user error
pub fn is_user_error(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<UserError>())
}

/// Validate that a string is not empty
pub fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} cannot be empty", field_name))
    } else {
        Ok(())
    }
}

/// Validate that an entity ID is valid (positive integer)
pub fn validate_entity_id(id_str: &str) -> Result<i64, String> {
    id_str.parse::<i64>()
        .map_err(|_| format!("Invalid ID: '{}'. ID must be a number.", id_str))
        .and_then(|id| {
            if id > 0 {
                Ok(id)
            } else {
                Err(format!("Invalid ID: {}. ID must be positive.", id))
            }
        })
}

/// Validate a probability percentage
pub fn validate_probability(value: &str) -> Result<i64, String> {
    let trimmed = value.trim().trim_end_matches('%');
    trimmed.parse::<i64>()
        .map_err(|_| format!("Invalid probability: '{}'. Probability must be a whole number.", value))
        .and_then(|p| {
            if (0..=100).contains(&p) {
                Ok(p)
            } else {
                Err(format!("Invalid probability: {}. Probability must be between 0 and 100.", p))
            }
        })
}
