//! Error types for anota-core

use thiserror::Error;

use crate::auth::AuthError;

/// Result type alias using anota-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in anota-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Draft has neither a title nor content
    #[error("Add a title or content to save")]
    EmptyDraft,

    /// No authenticated user was resolved for the current view
    #[error("User not identified")]
    MissingOwner,

    /// No signed-in session is available for an authenticated request
    #[error("No active session; sign in first")]
    NotSignedIn,

    /// Another upload or save is still outstanding
    #[error("Another operation is still in progress")]
    Busy,

    /// Invalid input
    #[error("{0}")]
    InvalidInput(String),

    /// Access to a device capability was refused
    #[error("{0}")]
    PermissionDenied(String),

    /// Error message reported by the backend service
    #[error("{0}")]
    Backend(String),

    /// Backend returned a record that does not map to the entry model
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Backend is not configured for this build
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal state could not be accessed
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used to decide how an error is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caught locally before any request was sent.
    Validation,
    /// A device capability was denied.
    Permission,
    /// The backend reported a failure; its message is safe to show.
    Backend,
    /// Anything else; the detail stays in the logs.
    Unexpected,
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyDraft
            | Self::MissingOwner
            | Self::NotSignedIn
            | Self::Busy
            | Self::InvalidInput(_) => ErrorKind::Validation,
            Self::PermissionDenied(_) => ErrorKind::Permission,
            Self::Backend(_) => ErrorKind::Backend,
            Self::InvalidRecord(_)
            | Self::Config(_)
            | Self::Http(_)
            | Self::Io(_)
            | Self::Serialization(_)
            | Self::Internal(_) => ErrorKind::Unexpected,
        }
    }
}

impl From<AuthError> for Error {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::NotConfigured => Self::Config(value.to_string()),
            AuthError::InvalidConfiguration(message) => Self::Config(message.to_string()),
            AuthError::MissingCredentials(message) => Self::InvalidInput(message.to_string()),
            AuthError::SignedOut => Self::NotSignedIn,
            AuthError::Http(error) => Self::Http(error),
            AuthError::Json(error) => Self::Serialization(error),
            AuthError::Api(message) => Self::Backend(message),
            AuthError::SecureStorage(message) => Self::Internal(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_classified_before_requests() {
        assert_eq!(Error::EmptyDraft.kind(), ErrorKind::Validation);
        assert_eq!(Error::MissingOwner.kind(), ErrorKind::Validation);
        assert_eq!(Error::Busy.kind(), ErrorKind::Validation);
    }

    #[test]
    fn auth_api_errors_keep_backend_message() {
        let error = Error::from(AuthError::Api("Invalid login credentials (400)".to_string()));
        assert_eq!(error.kind(), ErrorKind::Backend);
        assert_eq!(error.to_string(), "Invalid login credentials (400)");
    }

    #[test]
    fn transport_errors_are_unexpected() {
        let error = Error::from(std::io::Error::other("boom"));
        assert_eq!(error.kind(), ErrorKind::Unexpected);
    }
}
