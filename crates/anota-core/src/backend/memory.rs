//! In-process backend with the same contract as the hosted one.
//!
//! Rows are scoped to the signed-in user the way row-level security scopes
//! them on the server. Failures can be queued per operation and uploads can
//! be held open, which is what the view tests need.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{Map, Value};
use tokio::sync::Notify;
use uuid::Uuid;

use super::storage::public_object_url;
use super::{AuthService, Direction, ObjectStore, Query, TableStore};
use crate::auth::{validate_credentials, AuthSession, AuthUser, SignUpOutcome};
use crate::util::unix_timestamp_now;
use crate::{Error, Result};

const PUBLIC_BASE_URL: &str = "http://localhost:54321";
const RLS_VIOLATION: &str = "new row violates row-level security policy (403)";

/// Backend operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    SignIn,
    SignUp,
    Select,
    Upsert,
    Delete,
    Upload,
}

/// Object bytes as stored by [`InMemoryBackend::upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[derive(Default)]
struct State {
    users: HashMap<String, (String, AuthUser)>,
    current_user: Option<AuthUser>,
    require_confirmation: bool,
    tables: HashMap<String, Vec<Value>>,
    objects: HashMap<(String, String), StoredObject>,
    failures: HashMap<Operation, VecDeque<String>>,
    calls: HashMap<Operation, usize>,
    upload_gate: Option<Arc<Notify>>,
    last_created_at: Option<DateTime<Utc>>,
}

impl State {
    fn record_call(&mut self, operation: Operation) -> Result<()> {
        *self.calls.entry(operation).or_default() += 1;
        match self
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            Some(message) => Err(Error::Backend(message)),
            None => Ok(()),
        }
    }

    fn signed_in_user(&self) -> Result<&AuthUser> {
        self.current_user.as_ref().ok_or(Error::NotSignedIn)
    }

    fn next_created_at(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let created_at = match self.last_created_at {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_created_at = Some(created_at);
        created_at
    }
}

/// Backend kept entirely in memory; clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend with `user_id` already signed in.
    #[must_use]
    pub fn with_signed_in_user(user_id: &str) -> Self {
        let backend = Self::new();
        if let Ok(mut state) = backend.lock() {
            state.current_user = Some(AuthUser {
                id: user_id.to_string(),
                email: None,
            });
        }
        backend
    }

    /// Register an account that can later sign in.
    pub fn register_user(&self, email: &str, password: &str) -> Result<AuthUser> {
        let user = AuthUser {
            id: Uuid::now_v7().to_string(),
            email: Some(email.trim().to_string()),
        };
        self.lock()?.users.insert(
            email.trim().to_ascii_lowercase(),
            (password.to_string(), user.clone()),
        );
        Ok(user)
    }

    /// Make sign-up answer without a session, as when e-mail confirmation is on.
    pub fn require_email_confirmation(&self, required: bool) -> Result<()> {
        self.lock()?.require_confirmation = required;
        Ok(())
    }

    /// Queue a backend error for the next call of `operation`.
    pub fn fail_next(&self, operation: Operation, message: impl Into<String>) -> Result<()> {
        self.lock()?
            .failures
            .entry(operation)
            .or_default()
            .push_back(message.into());
        Ok(())
    }

    /// Number of calls made to `operation`, failed ones included.
    pub fn call_count(&self, operation: Operation) -> usize {
        self.lock()
            .map(|state| state.calls.get(&operation).copied().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Hold every upload until the returned handle is notified.
    pub fn hold_uploads(&self) -> Result<Arc<Notify>> {
        let gate = Arc::new(Notify::new());
        self.lock()?.upload_gate = Some(Arc::clone(&gate));
        Ok(gate)
    }

    /// Seed a row directly, bypassing row-level checks.
    pub fn insert_row(&self, table: &str, row: Value) -> Result<()> {
        self.lock()?
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row);
        Ok(())
    }

    /// Every row of `table`, regardless of owner, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock()
            .map(|state| state.tables.get(table).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<StoredObject> {
        self.lock().ok().and_then(|state| {
            state
                .objects
                .get(&(bucket.to_string(), path.to_string()))
                .cloned()
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|error| Error::Internal(format!("backend state poisoned: {error}")))
    }
}

#[async_trait]
impl AuthService for InMemoryBackend {
    async fn current_user(&self) -> Result<Option<AuthUser>> {
        Ok(self.lock()?.current_user.clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        validate_credentials(email, password)?;
        let mut state = self.lock()?;
        state.record_call(Operation::SignIn)?;

        let user = match state.users.get(&email.trim().to_ascii_lowercase()) {
            Some((stored_password, user)) if stored_password == password => user.clone(),
            _ => return Err(Error::Backend("Invalid login credentials (400)".to_string())),
        };
        state.current_user = Some(user.clone());
        Ok(memory_session(user))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        validate_credentials(email, password)?;
        let key = email.trim().to_ascii_lowercase();
        {
            let mut state = self.lock()?;
            state.record_call(Operation::SignUp)?;
            if state.users.contains_key(&key) {
                return Err(Error::Backend("User already registered (422)".to_string()));
            }
        }

        let user = self.register_user(email, password)?;
        let mut state = self.lock()?;
        if state.require_confirmation {
            return Ok(SignUpOutcome::ConfirmationRequired);
        }
        state.current_user = Some(user.clone());
        Ok(SignUpOutcome::SignedIn(memory_session(user)))
    }

    async fn sign_out(&self) -> Result<()> {
        self.lock()?.current_user = None;
        Ok(())
    }
}

#[async_trait]
impl TableStore for InMemoryBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        let mut state = self.lock()?;
        state.record_call(Operation::Select)?;
        let owner = state.signed_in_user()?.id.clone();

        let mut rows = state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| is_owned_by(row, &owner) && query.matches(row))
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if let Some((column, direction)) = query.order() {
            rows.sort_by(|left, right| {
                let ordering = compare_values(
                    left.get(column).unwrap_or(&Value::Null),
                    right.get(column).unwrap_or(&Value::Null),
                );
                match direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }
        Ok(rows)
    }

    async fn upsert(&self, table: &str, record: Value) -> Result<()> {
        let Value::Object(record) = record else {
            return Err(Error::InvalidInput("Upsert record must be an object".to_string()));
        };

        let mut state = self.lock()?;
        state.record_call(Operation::Upsert)?;
        let owner = state.signed_in_user()?.id.clone();
        if record.get("user_id").and_then(Value::as_str) != Some(owner.as_str()) {
            return Err(Error::Backend(RLS_VIOLATION.to_string()));
        }

        let key = record.get("id").filter(|id| !id.is_null()).cloned();
        if let Some(key) = key {
            if let Some(existing) = state
                .tables
                .entry(table.to_string())
                .or_default()
                .iter_mut()
                .find(|row| row.get("id") == Some(&key))
            {
                if !is_owned_by(existing, &owner) {
                    return Err(Error::Backend(RLS_VIOLATION.to_string()));
                }
                if let Value::Object(existing) = existing {
                    existing.extend(record);
                }
                return Ok(());
            }
        }

        let created_at = state.next_created_at();
        let mut row = Map::new();
        row.insert("id".to_string(), Value::from(Uuid::now_v7().to_string()));
        row.insert(
            "created_at".to_string(),
            Value::from(created_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        row.extend(record.into_iter().filter(|(_, value)| !value.is_null()));
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(Value::Object(row));
        Ok(())
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<()> {
        if !query.has_filters() {
            return Err(Error::InvalidInput(
                "Refusing to delete without a match key".to_string(),
            ));
        }

        let mut state = self.lock()?;
        state.record_call(Operation::Delete)?;
        let owner = state.signed_in_user()?.id.clone();
        if let Some(rows) = state.tables.get_mut(table) {
            rows.retain(|row| !(is_owned_by(row, &owner) && query.matches(row)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryBackend {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> Result<()> {
        let gate = {
            let state = self.lock()?;
            state.signed_in_user()?;
            state.upload_gate.clone()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.lock()?;
        state.record_call(Operation::Upload)?;
        let key = (bucket.to_string(), path.to_string());
        if !overwrite && state.objects.contains_key(&key) {
            return Err(Error::Backend("The resource already exists (409)".to_string()));
        }
        state.objects.insert(
            key,
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        public_object_url(PUBLIC_BASE_URL, bucket, path)
    }
}

fn memory_session(user: AuthUser) -> AuthSession {
    AuthSession {
        access_token: format!("memory-access-{}", user.id),
        refresh_token: format!("memory-refresh-{}", user.id),
        expires_at: unix_timestamp_now() + 3600,
        user,
    }
}

fn is_owned_by(row: &Value, owner: &str) -> bool {
    row.get("user_id").and_then(Value::as_str) == Some(owner)
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => left
            .as_f64()
            .partial_cmp(&right.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (left, right) => left.to_string().cmp(&right.to_string()),
    }
}
