//! Backend capabilities consumed by the views.
//!
//! Everything durable lives in a hosted backend: auth, an entries table, and
//! an object store for media. Views depend on these traits only; the Supabase
//! adapter talks HTTP and the in-memory adapter backs tests and demos.

mod memory;
mod rest;
mod storage;
mod supabase;

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::{AuthSession, AuthUser, SignUpOutcome};
use crate::Result;

pub use memory::{InMemoryBackend, Operation, StoredObject};
pub use storage::public_object_url;
pub use supabase::SupabaseBackend;

#[async_trait]
pub trait AuthService: Send + Sync {
    /// The signed-in user, or `None` when there is no valid session.
    async fn current_user(&self) -> Result<Option<AuthUser>>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<SignUpOutcome>;

    async fn sign_out(&self) -> Result<()>;
}

#[async_trait]
pub trait TableStore: Send + Sync {
    /// Rows of `table` matching `query`, in the requested order.
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>>;

    /// Insert `record`, or update the row with the same primary key.
    async fn upsert(&self, table: &str, record: Value) -> Result<()>;

    /// Delete rows matching `query`; a query without filters is rejected.
    async fn delete(&self, table: &str, query: &Query) -> Result<()>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> Result<()>;

    /// URL that serves the object without authentication.
    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// A backend offering every capability the views need.
pub trait Backend: AuthService + TableStore + ObjectStore {}

impl<T: AuthService + TableStore + ObjectStore> Backend for T {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    const fn as_postgrest(self) -> &'static str {
        match self {
            Self::Ascending => "asc",
            Self::Descending => "desc",
        }
    }
}

/// Ordering and equality filters for a table request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    order: Option<(String, Direction)>,
    filters: Vec<(String, Value)>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.order = Some((column.into(), direction));
        self
    }

    /// Match rows whose `column` equals `value`.
    #[must_use]
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order(&self) -> Option<(&str, Direction)> {
        self.order
            .as_ref()
            .map(|(column, direction)| (column.as_str(), *direction))
    }

    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// Whether `row` satisfies every equality filter.
    pub fn matches(&self, row: &Value) -> bool {
        self.filters
            .iter()
            .all(|(column, expected)| row.get(column).unwrap_or(&Value::Null) == expected)
    }

    /// Filters and ordering rendered as PostgREST query parameters.
    pub fn to_postgrest_params(&self) -> Vec<(String, String)> {
        let mut params = self
            .filters
            .iter()
            .map(|(column, value)| {
                let rendered = match value {
                    Value::Null => "is.null".to_string(),
                    Value::String(text) => format!("eq.{text}"),
                    other => format!("eq.{other}"),
                };
                (column.clone(), rendered)
            })
            .collect::<Vec<_>>();

        if let Some((column, direction)) = &self.order {
            params.push((
                "order".to_string(),
                format!("{column}.{}", direction.as_postgrest()),
            ));
        }
        params
    }
}
