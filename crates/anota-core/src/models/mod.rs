//! Data models for Anota

mod entry;

pub use entry::{Entry, EntryId, EntryRecord, MAX_CONTENT_CHARS, MAX_TITLE_CHARS};
