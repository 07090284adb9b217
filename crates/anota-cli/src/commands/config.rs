use std::env;

use anota_core::config::{
    ENV_ENTRIES_TABLE, ENV_MEDIA_BUCKET, ENV_SUPABASE_ANON_KEY, ENV_SUPABASE_URL,
};
use anota_core::util::is_http_url;

use crate::cli::ConfigCommands;
use crate::config_profiles::{normalize_text_option, CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            supabase_url,
            supabase_anon_key,
            media_bucket,
            entries_table,
            no_activate,
        } => run_config_init(
            profile,
            CliProfile {
                supabase_url,
                supabase_anon_key,
                media_bucket,
                entries_table,
            },
            no_activate,
        ),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    explicit: CliProfile,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged = merge_profile(explicit, &existing, |key| env::var(key).ok());
    validate_profile(&merged)?;
    *config.profile_mut_or_default(&profile_name) = merged.clone();

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let missing_fields = missing_fields(&merged);
    if missing_fields.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `anota auth login --email <email> --password <password>`."
        );
    } else {
        println!(
            "Profile '{}' is missing: {}",
            profile_name,
            missing_fields.join(", ")
        );
    }

    Ok(())
}

/// Explicit flags win, then environment variables, then the stored profile.
pub fn merge_profile(
    explicit: CliProfile,
    existing: &CliProfile,
    lookup: impl Fn(&str) -> Option<String>,
) -> CliProfile {
    let pick = |explicit: Option<String>, key: &str, existing: &Option<String>| {
        normalize_text_option(explicit)
            .or_else(|| normalize_text_option(lookup(key)))
            .or_else(|| normalize_text_option(existing.clone()))
    };

    CliProfile {
        supabase_url: pick(explicit.supabase_url, ENV_SUPABASE_URL, &existing.supabase_url),
        supabase_anon_key: pick(
            explicit.supabase_anon_key,
            ENV_SUPABASE_ANON_KEY,
            &existing.supabase_anon_key,
        ),
        media_bucket: pick(explicit.media_bucket, ENV_MEDIA_BUCKET, &existing.media_bucket),
        entries_table: pick(
            explicit.entries_table,
            ENV_ENTRIES_TABLE,
            &existing.entries_table,
        ),
    }
}

pub fn missing_fields(profile: &CliProfile) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if profile.supabase_url().is_none() {
        missing.push("supabase_url");
    }
    if profile.supabase_anon_key().is_none() {
        missing.push("supabase_anon_key");
    }
    missing
}

fn validate_profile(profile: &CliProfile) -> Result<(), CliError> {
    if let Some(url) = profile.supabase_url() {
        if !is_http_url(&url) {
            return Err(CliError::Config(
                "supabase_url must include http:// or https://".to_string(),
            ));
        }
    }
    Ok(())
}
