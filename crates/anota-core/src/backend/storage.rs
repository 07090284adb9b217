//! Supabase Storage client (`/storage/v1`).

use reqwest::Client;

use crate::util::parse_api_error;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub(super) struct StorageClient {
    project_url: String,
    anon_key: String,
    client: Client,
}

impl StorageClient {
    pub(super) fn new(project_url: &str, anon_key: &str, client: Client) -> Self {
        Self {
            project_url: project_url.to_string(),
            anon_key: anon_key.to_string(),
            client,
        }
    }

    pub(super) async fn upload(
        &self,
        access_token: &str,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        overwrite: bool,
    ) -> Result<()> {
        let path = normalize_object_path(path)?;
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.project_url,
            urlencoding::encode(bucket),
            encode_path(&path)
        );
        let size = bytes.len();

        let response = self
            .client
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", if overwrite { "true" } else { "false" })
            .body(bytes)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Backend(parse_api_error(status, &body)));
        }

        tracing::debug!("Uploaded {} bytes to {}/{}", size, bucket, path);
        Ok(())
    }

    pub(super) fn public_url(&self, bucket: &str, path: &str) -> String {
        public_object_url(&self.project_url, bucket, path)
    }
}

/// Public URL of an object in a public bucket.
pub fn public_object_url(project_url: &str, bucket: &str, path: &str) -> String {
    format!(
        "{}/storage/v1/object/public/{}/{}",
        project_url.trim_end_matches('/'),
        urlencoding::encode(bucket),
        encode_path(path.trim_matches('/'))
    )
}

fn normalize_object_path(path: &str) -> Result<String> {
    let path = path.trim().trim_matches('/').to_string();
    if path.is_empty() {
        return Err(Error::InvalidInput(
            "Object path cannot be empty".to_string(),
        ));
    }
    Ok(path)
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_object_url_keeps_path_separators() {
        assert_eq!(
            public_object_url(
                "https://demo.supabase.co/",
                "galeria",
                "/entries/user-1_1700000000000.png"
            ),
            "https://demo.supabase.co/storage/v1/object/public/galeria/entries/user-1_1700000000000.png"
        );
    }

    #[test]
    fn encode_path_escapes_each_segment() {
        assert_eq!(encode_path("entries/my photo.png"), "entries/my%20photo.png");
    }

    #[test]
    fn normalize_object_path_rejects_empty() {
        let err = normalize_object_path("  / ").unwrap_err();
        match err {
            Error::InvalidInput(message) => assert!(message.contains("path")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
