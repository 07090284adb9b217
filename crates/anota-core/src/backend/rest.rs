//! PostgREST table client (`/rest/v1`).

use reqwest::{Client, RequestBuilder};
use serde_json::Value;

use super::Query;
use crate::util::parse_api_error;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub(super) struct PostgrestClient {
    rest_url: String,
    anon_key: String,
    client: Client,
}

impl PostgrestClient {
    pub(super) fn new(project_url: &str, anon_key: &str, client: Client) -> Self {
        Self {
            rest_url: format!("{project_url}/rest/v1"),
            anon_key: anon_key.to_string(),
            client,
        }
    }

    pub(super) async fn select(
        &self,
        access_token: &str,
        table: &str,
        query: &Query,
    ) -> Result<Vec<Value>> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        params.extend(query.to_postgrest_params());

        let request = self
            .authorized(self.client.get(self.table_url(table)), access_token)
            .header("Accept", "application/json")
            .query(&params);
        let response = send(request).await?;
        let rows = response.json::<Vec<Value>>().await?;
        tracing::debug!("Selected {} rows from {}", rows.len(), table);
        Ok(rows)
    }

    pub(super) async fn upsert(&self, access_token: &str, table: &str, record: &Value) -> Result<()> {
        let request = self
            .authorized(self.client.post(self.table_url(table)), access_token)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(record);
        send(request).await?;
        Ok(())
    }

    pub(super) async fn delete(&self, access_token: &str, table: &str, query: &Query) -> Result<()> {
        if !query.has_filters() {
            return Err(Error::InvalidInput(
                "Refusing to delete without a match key".to_string(),
            ));
        }

        let request = self
            .authorized(self.client.delete(self.table_url(table)), access_token)
            .header("Prefer", "return=minimal")
            .query(&query.to_postgrest_params());
        send(request).await?;
        Ok(())
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.rest_url, urlencoding::encode(table))
    }

    fn authorized(&self, request: RequestBuilder, access_token: &str) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
    }
}

async fn send(request: RequestBuilder) -> Result<reqwest::Response> {
    let response = request.send().await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Backend(parse_api_error(status, &body)));
    }
    Ok(response)
}
