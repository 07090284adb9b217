//! Keychain-backed session storage and backend construction per profile.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use anota_core::auth::{AuthError, AuthResult, AuthSession, SessionPersistence};
use anota_core::{BackendConfig, SupabaseBackend};

use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "anota-cli";

pub type CliBackend = SupabaseBackend<SessionStore>;

/// Session JSON stored under `supabase_session:{profile}`.
#[derive(Clone)]
pub struct SessionStore {
    username: String,
}

impl SessionStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            username: format!("supabase_session:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

impl SessionPersistence for SessionStore {
    #[cfg(not(test))]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard
            .get(&self.username)
            .map(|raw| serde_json::from_str(raw))
            .transpose()
            .map_err(AuthError::from)
    }

    #[cfg(not(test))]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_session(&self) -> AuthResult<()> {
        let entry = self.entry()?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

/// Backend for the resolved profile.
///
/// Profile settings win; a profile without any backend settings falls back
/// to `SUPABASE_URL` / `SUPABASE_ANON_KEY` from the environment.
pub struct ProfileBackend {
    pub profile_name: String,
    pub config: BackendConfig,
    pub backend: CliBackend,
}

impl ProfileBackend {
    pub fn open(explicit_profile: Option<&str>) -> Result<Self, CliError> {
        let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = profiles.resolve_profile_name(explicit_profile);
        let config = resolve_backend_config(&profile_name, profiles.profile(&profile_name))?;

        tracing::debug!(
            "Using profile '{}' against {}",
            profile_name,
            config.supabase_url
        );
        let backend = SupabaseBackend::new(config.clone(), SessionStore::new(&profile_name))?;
        Ok(Self {
            profile_name,
            config,
            backend,
        })
    }
}

pub fn resolve_backend_config(
    profile_name: &str,
    profile: Option<&CliProfile>,
) -> Result<BackendConfig, CliError> {
    if let Some(config) = profile
        .map(CliProfile::backend_config)
        .transpose()
        .map_err(CliError::Config)?
        .flatten()
    {
        return Ok(config);
    }
    BackendConfig::from_env()?.ok_or_else(|| CliError::NotConfigured(profile_name.to_string()))
}

pub fn clear_stored_session(profile_name: &str) -> AuthResult<()> {
    SessionStore::new(profile_name).clear_session()
}
