// ⚠️ Error taxonomy for the account / session / audit core
//
// Every error is scoped to the single interaction that caused it.
// None of them is fatal to the process.

use thiserror::Error;

/// Input rejected before any store access.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("please fill all fields ({0} is empty)")]
    MissingField(&'static str),

    #[error("passwords do not match")]
    PasswordMismatch,

    #[error("{field} must be between {min} and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },

    #[error("unknown value '{value}' for {field}")]
    UnknownCategory { field: &'static str, value: String },

    #[error("malformed feature payload: {0}")]
    MalformedPayload(String),
}

#[derive(Debug, Error)]
pub enum Error {
    /// Username or email already registered.
    #[error("username or email already exists")]
    Conflict,

    #[error("invalid username or password")]
    Authentication,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Reset requested for a username/email pair with no matching record.
    #[error("no user found with that username & email")]
    NotFound,

    #[error("could not compute an estimate: {0}")]
    PredictionFailure(String),

    /// Logging failed after a successful prediction. Reported, never retried.
    #[error("prediction was not recorded in history: {0}")]
    AuditLogWrite(String),

    #[error("'{action}' is not allowed while {state}")]
    InvalidTransition { action: &'static str, state: String },

    #[error("sign in to request an estimate")]
    NotAuthenticated,

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True for errors the caller recovers from by showing a message.
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Error::Storage(_) | Error::Serialization(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        let err: Error = ValidationError::MissingField("email").into();
        assert_eq!(err.to_string(), "please fill all fields (email is empty)");

        let err: Error = ValidationError::PasswordMismatch.into();
        assert_eq!(err.to_string(), "passwords do not match");
    }

    #[test]
    fn test_user_facing_classification() {
        assert!(Error::Conflict.is_user_facing());
        assert!(Error::AuditLogWrite("disk full".to_string()).is_user_facing());
        assert!(!Error::Storage(rusqlite::Error::InvalidQuery).is_user_facing());
    }
}
