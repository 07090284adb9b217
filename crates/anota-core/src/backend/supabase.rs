//! Supabase-hosted backend: auth, PostgREST table, and Storage.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::rest::PostgrestClient;
use super::storage::StorageClient;
use super::{AuthService, ObjectStore, Query, TableStore};
use crate::auth::{AuthSession, AuthUser, SessionPersistence, SignUpOutcome, SupabaseAuthClient};
use crate::config::BackendConfig;
use crate::Result;

/// All three backend capabilities over one HTTP connection pool.
///
/// Table and storage requests carry the signed-in user's access token so
/// row-level security applies; without a session they fail with
/// [`crate::Error::NotSignedIn`] before anything is sent.
#[derive(Clone)]
pub struct SupabaseBackend<S: SessionPersistence> {
    config: BackendConfig,
    auth: SupabaseAuthClient<S>,
    rest: PostgrestClient,
    storage: StorageClient,
}

impl<S: SessionPersistence> SupabaseBackend<S> {
    pub fn new(config: BackendConfig, store: S) -> Result<Self> {
        let client = Client::builder().build()?;
        let auth = SupabaseAuthClient::with_client(
            &config.supabase_url,
            config.supabase_anon_key.clone(),
            store,
            client.clone(),
        )?;
        let rest = PostgrestClient::new(
            &config.supabase_url,
            &config.supabase_anon_key,
            client.clone(),
        );
        let storage = StorageClient::new(&config.supabase_url, &config.supabase_anon_key, client);

        Ok(Self {
            config,
            auth,
            rest,
            storage,
        })
    }

    pub const fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Restore the persisted session without contacting `/user`.
    pub async fn restore_session(&self) -> Result<Option<AuthSession>> {
        Ok(self.auth.restore_session().await?)
    }

    async fn access_token(&self) -> Result<String> {
        Ok(self.auth.access_token().await?)
    }
}

#[async_trait]
impl<S: SessionPersistence> AuthService for SupabaseBackend<S> {
    async fn current_user(&self) -> Result<Option<AuthUser>> {
        Ok(self.auth.current_user().await?)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        Ok(self.auth.sign_in(email, password).await?)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        Ok(self.auth.sign_up(email, password).await?)
    }

    async fn sign_out(&self) -> Result<()> {
        Ok(self.auth.sign_out().await?)
    }
}

#[async_trait]
impl<S: SessionPersistence> TableStore for SupabaseBackend<S> {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        let token = self.access_token().await?;
        self.rest.select(&token, table, query).await
    }

    async fn upsert(&self, table: &str, record: Value) -> Result<()> {
        let token = self.access_token().await?;
        self.rest.upsert(&token, table, &record).await
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<()> {
        let token = self.access_token().await?;
        self.rest.delete(&token, table, query).await
    }
}

#[async_trait]
impl<S: SessionPersistence> ObjectStore for SupabaseBackend<S> {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> Result<()> {
        let token = self.access_token().await?;
        self.storage
            .upload(&token, bucket, path, bytes, content_type, overwrite)
            .await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.storage.public_url(bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::auth::AuthResult;
    use crate::backend::Direction;
    use crate::Error;

    #[derive(Clone, Default)]
    struct MemorySessionStore {
        session: Arc<Mutex<Option<AuthSession>>>,
    }

    impl SessionPersistence for MemorySessionStore {
        fn load_session(&self) -> AuthResult<Option<AuthSession>> {
            Ok(self.session.lock().unwrap().clone())
        }

        fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
            *self.session.lock().unwrap() = Some(session.clone());
            Ok(())
        }

        fn clear_session(&self) -> AuthResult<()> {
            *self.session.lock().unwrap() = None;
            Ok(())
        }
    }

    fn backend() -> SupabaseBackend<MemorySessionStore> {
        let config = BackendConfig::new("https://demo.supabase.co", "anon").unwrap();
        SupabaseBackend::new(config, MemorySessionStore::default()).unwrap()
    }

    #[test]
    fn public_url_uses_project_storage_endpoint() {
        assert_eq!(
            backend().public_url("galeria", "entries/a.png"),
            "https://demo.supabase.co/storage/v1/object/public/galeria/entries/a.png"
        );
    }

    #[tokio::test]
    async fn data_requests_without_session_fail_before_sending() {
        let backend = backend();
        let error = backend
            .select("entries", &Query::new())
            .await
            .unwrap_err();
        assert!(matches!(error, Error::NotSignedIn));

        let error = backend
            .upload("galeria", "entries/a.png", vec![1], "image/png", true)
            .await
            .unwrap_err();
        assert!(matches!(error, Error::NotSignedIn));
    }

    #[tokio::test]
    async fn current_user_without_session_is_none() {
        assert!(backend().current_user().await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "Requires SUPABASE_URL, SUPABASE_ANON_KEY, ANOTA_TEST_EMAIL, ANOTA_TEST_PASSWORD"]
    async fn live_sign_in_and_list_entries() {
        let _ = dotenvy::dotenv();

        let config = BackendConfig::from_env()
            .expect("backend env parsing should not error")
            .expect("backend config should be present");
        let email = std::env::var("ANOTA_TEST_EMAIL").expect("ANOTA_TEST_EMAIL");
        let password = std::env::var("ANOTA_TEST_PASSWORD").expect("ANOTA_TEST_PASSWORD");
        let table = config.entries_table.clone();
        let backend = SupabaseBackend::new(config, MemorySessionStore::default()).unwrap();

        let session = backend.sign_in(&email, &password).await.unwrap();
        let user = backend.current_user().await.unwrap().unwrap();
        assert_eq!(user.id, session.user.id);

        backend
            .select(
                &table,
                &Query::new().order_by("created_at", Direction::Descending),
            )
            .await
            .unwrap_or_else(|error| panic!("listing entries failed: {error}"));

        backend.sign_out().await.unwrap();
        assert!(backend.restore_session().await.unwrap().is_none());
    }
}
