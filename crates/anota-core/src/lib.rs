//! anota-core - Core library for Anota
//!
//! This crate contains the entry model, the backend adapters (Supabase and
//! in-memory), and the view logic shared by Anota interfaces: drafting and
//! committing an entry, attaching media, listing, and signing in.

pub mod auth;
pub mod backend;
pub mod config;
pub mod draft;
pub mod editor;
pub mod error;
pub mod list;
pub mod media;
pub mod models;
pub mod notice;
pub mod session;
pub mod util;

pub use backend::{Backend, InMemoryBackend, SupabaseBackend};
pub use config::BackendConfig;
pub use draft::Draft;
pub use editor::{CommitOutcome, EntryEditor};
pub use error::{Error, ErrorKind, Result};
pub use list::{EntryListView, ListInvalidation};
pub use models::{Entry, EntryId};
pub use notice::{Confirm, Notice, NoticeLevel};
