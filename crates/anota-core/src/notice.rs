//! User-facing notifications and confirmation prompts.

use std::fmt;

use crate::error::{Error, ErrorKind};

/// Message shown when access to the media library is refused.
pub const MEDIA_PERMISSION_MESSAGE: &str =
    "Access to your media library is needed to attach a photo or video.";
/// Fallback for unexpected failures while uploading media.
pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload media";
/// Fallback for unexpected failures while saving an entry.
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save entry";
/// Fallback for unexpected failures while loading entries.
pub const LIST_FAILED_MESSAGE: &str = "Failed to load entries";
/// Fallback for unexpected failures while deleting an entry.
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete entry";
/// Fallback for unexpected failures during sign-in or sign-up.
pub const AUTH_FAILED_MESSAGE: &str = "Authentication failed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A short message for the user, as an alert or a line on stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            title: "Error".to_string(),
            message: message.into(),
        }
    }

    /// Turn an operation failure into a notice.
    ///
    /// Validation and backend messages are shown as they are; anything
    /// unexpected is logged and replaced by `fallback`.
    pub fn from_error(error: &Error, fallback: &str) -> Self {
        match (error, error.kind()) {
            (Error::EmptyDraft, _) => Self::warning("Warning", error.to_string()),
            (_, ErrorKind::Permission) => Self::warning("Permission required", error.to_string()),
            (_, ErrorKind::Validation | ErrorKind::Backend) => Self::error(error.to_string()),
            (_, ErrorKind::Unexpected) => {
                tracing::error!("{fallback}: {error}");
                Self::error(fallback)
            }
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.message)
    }
}

/// Asks the user a yes/no question before a destructive action.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}
