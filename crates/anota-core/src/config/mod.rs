//! Backend configuration for client apps.
//!
//! The Supabase project URL and anon key are public, safe-to-ship values.
//! Row-level security on the backend does the actual access control.

use std::env;

use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_MEDIA_BUCKET: &str = "ANOTA_MEDIA_BUCKET";
pub const ENV_ENTRIES_TABLE: &str = "ANOTA_ENTRIES_TABLE";

pub const DEFAULT_MEDIA_BUCKET: &str = "galeria";
pub const DEFAULT_ENTRIES_TABLE: &str = "entries";

/// Where entries and their media live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Supabase project URL, without trailing slash.
    pub supabase_url: String,
    /// Public anon key sent as `apikey` on every request.
    pub supabase_anon_key: String,
    /// Storage bucket that receives uploaded media.
    pub media_bucket: String,
    /// Table holding entry rows.
    pub entries_table: String,
}

impl BackendConfig {
    /// Build a config with the default bucket and table names.
    pub fn new(supabase_url: impl Into<String>, supabase_anon_key: impl Into<String>) -> Result<Self> {
        let supabase_url = normalize_url(supabase_url.into())?;
        let supabase_anon_key = normalize_text_option(Some(supabase_anon_key.into()))
            .ok_or_else(|| Error::Config(format!("{ENV_SUPABASE_ANON_KEY} must not be empty")))?;

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            media_bucket: DEFAULT_MEDIA_BUCKET.to_string(),
            entries_table: DEFAULT_ENTRIES_TABLE.to_string(),
        })
    }

    /// Override the storage bucket; blank values keep the current one.
    #[must_use]
    pub fn with_media_bucket(mut self, bucket: Option<String>) -> Self {
        if let Some(bucket) = normalize_text_option(bucket) {
            self.media_bucket = bucket.trim_matches('/').to_string();
        }
        self
    }

    /// Override the entries table; blank values keep the current one.
    #[must_use]
    pub fn with_entries_table(mut self, table: Option<String>) -> Self {
        if let Some(table) = normalize_text_option(table) {
            self.entries_table = table;
        }
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when neither Supabase variable is set.
    /// Returns an error when only one of them is provided.
    pub fn from_env() -> Result<Option<Self>> {
        parse_config(|key| env::var(key).ok())
    }
}

fn parse_config(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<BackendConfig>> {
    let url = normalize_text_option(lookup(ENV_SUPABASE_URL));
    let anon_key = normalize_text_option(lookup(ENV_SUPABASE_ANON_KEY));

    let (url, anon_key) = match (url, anon_key) {
        (None, None) => return Ok(None),
        (Some(url), Some(anon_key)) => (url, anon_key),
        (None, Some(_)) => {
            return Err(Error::Config(format!(
                "Backend configuration is incomplete. Missing: {ENV_SUPABASE_URL}"
            )))
        }
        (Some(_), None) => {
            return Err(Error::Config(format!(
                "Backend configuration is incomplete. Missing: {ENV_SUPABASE_ANON_KEY}"
            )))
        }
    };

    Ok(Some(
        BackendConfig::new(url, anon_key)?
            .with_media_bucket(lookup(ENV_MEDIA_BUCKET))
            .with_entries_table(lookup(ENV_ENTRIES_TABLE)),
    ))
}

fn normalize_url(raw: String) -> Result<String> {
    let value = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config(format!("{ENV_SUPABASE_URL} must not be empty")))?;
    if !is_http_url(&value) {
        return Err(Error::Config(format!(
            "{ENV_SUPABASE_URL} must start with http:// or https://"
        )));
    }
    Ok(value.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn parse_from_map(map: &HashMap<&str, &str>) -> Result<Option<BackendConfig>> {
        parse_config(|key| map.get(key).map(|value| (*value).to_string()))
    }

    #[test]
    fn parse_config_none_returns_none() {
        let map = HashMap::new();
        assert!(parse_from_map(&map).unwrap().is_none());
    }

    #[test]
    fn parse_config_requires_both_supabase_values() {
        let mut map = HashMap::new();
        map.insert(ENV_SUPABASE_URL, "https://project.supabase.co");

        let err = parse_from_map(&map).unwrap_err();
        match err {
            Error::Config(message) => assert!(message.contains(ENV_SUPABASE_ANON_KEY)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn parse_config_applies_defaults_and_normalizes_url() {
        let mut map = HashMap::new();
        map.insert(ENV_SUPABASE_URL, " https://project.supabase.co/ ");
        map.insert(ENV_SUPABASE_ANON_KEY, "anon");

        let config = parse_from_map(&map).unwrap().unwrap();
        assert_eq!(config.supabase_url, "https://project.supabase.co");
        assert_eq!(config.media_bucket, DEFAULT_MEDIA_BUCKET);
        assert_eq!(config.entries_table, DEFAULT_ENTRIES_TABLE);
    }

    #[test]
    fn parse_config_honors_overrides() {
        let mut map = HashMap::new();
        map.insert(ENV_SUPABASE_URL, "https://project.supabase.co");
        map.insert(ENV_SUPABASE_ANON_KEY, "anon");
        map.insert(ENV_MEDIA_BUCKET, "/media/");
        map.insert(ENV_ENTRIES_TABLE, "journal");

        let config = parse_from_map(&map).unwrap().unwrap();
        assert_eq!(config.media_bucket, "media");
        assert_eq!(config.entries_table, "journal");
    }

    #[test]
    fn parse_config_rejects_url_without_scheme() {
        let mut map = HashMap::new();
        map.insert(ENV_SUPABASE_URL, "project.supabase.co");
        map.insert(ENV_SUPABASE_ANON_KEY, "anon");

        assert!(matches!(parse_from_map(&map), Err(Error::Config(_))));
    }
}
