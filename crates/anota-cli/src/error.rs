use std::io;

use anota_core::auth::AuthError;
use anota_core::Notice;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] anota_core::Error),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("{}", .0.message)]
    Notice(Notice),
    #[error("Entry ID cannot be empty")]
    EmptyEntryId,
    #[error("Entry not found for id/prefix: {0}")]
    EntryNotFound(String),
    #[error("{0}")]
    AmbiguousEntryId(String),
    #[error("Editor command failed: {0}")]
    EditorFailed(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Profile '{0}' has no backend configured. Run `anota config init --profile {0}` or set SUPABASE_URL and SUPABASE_ANON_KEY."
    )]
    NotConfigured(String),
}

impl CliError {
    /// Convert a core failure into the message shown for `operation`.
    pub fn notice(error: &anota_core::Error, fallback: &str) -> Self {
        Self::Notice(Notice::from_error(error, fallback))
    }
}
