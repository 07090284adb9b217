//! Media picked for an entry: sources, asset metadata, and storage paths.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{Error, Result};

/// Kind of media an entry can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a MIME type; anything that is not an image or video is `None`.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        let normalized = mime_type.trim().to_ascii_lowercase();
        if normalized.starts_with("image/") {
            Some(Self::Image)
        } else if normalized.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }

    pub const fn default_extension(self) -> &'static str {
        match self {
            Self::Image => "png",
            Self::Video => "mp4",
        }
    }

    pub const fn default_content_type(self) -> &'static str {
        match self {
            Self::Image => "image/png",
            Self::Video => "video/mp4",
        }
    }
}

/// A picked image or video, read fully into memory.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub file_name: String,
    pub mime_type: Option<String>,
    pub kind: MediaKind,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for MediaAsset {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("MediaAsset")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("kind", &self.kind)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl MediaAsset {
    /// Build an asset, inferring its MIME type from the file name when the
    /// source did not report a usable one.
    pub fn new(
        file_name: impl Into<String>,
        reported_mime_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self> {
        let file_name = file_name.into();
        let mime_type = infer_media_mime_type(reported_mime_type, &file_name);
        let kind = mime_type
            .as_deref()
            .and_then(MediaKind::from_mime)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "Only images and videos can be attached ({file_name})"
                ))
            })?;

        Ok(Self {
            file_name,
            mime_type,
            kind,
            bytes,
        })
    }

    /// Lowercased file extension, falling back to the kind's default.
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::trim)
            .filter(|extension| !extension.is_empty())
            .map_or_else(
                || self.kind.default_extension().to_string(),
                str::to_ascii_lowercase,
            )
    }

    pub fn content_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .unwrap_or(self.kind.default_content_type())
    }
}

/// Where media comes from: a device gallery, a file chooser, a fixed path.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Ask for access; `Ok(false)` means the user refused.
    async fn request_permission(&self) -> Result<bool>;

    /// Let the user choose an asset; `Ok(None)` means the pick was cancelled.
    async fn pick(&self) -> Result<Option<MediaAsset>>;
}

/// Media source backed by a path on the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileMediaSource {
    path: Option<PathBuf>,
}

impl FileMediaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A source with nothing chosen; picking from it is a cancelled pick.
    pub const fn empty() -> Self {
        Self { path: None }
    }
}

#[async_trait]
impl MediaSource for FileMediaSource {
    async fn request_permission(&self) -> Result<bool> {
        let Some(path) = &self.path else {
            return Ok(true);
        };
        match tokio::fs::metadata(path).await {
            Ok(_) => Ok(true),
            Err(error) if error.kind() == std::io::ErrorKind::PermissionDenied => Ok(false),
            Err(error) => Err(Error::InvalidInput(format!(
                "Cannot open {}: {error}",
                path.display()
            ))),
        }
    }

    async fn pick(&self) -> Result<Option<MediaAsset>> {
        let Some(path) = &self.path else {
            return Ok(None);
        };
        let bytes = tokio::fs::read(path).await.map_err(|error| {
            if error.kind() == std::io::ErrorKind::PermissionDenied {
                Error::PermissionDenied(format!("Cannot read {}", path.display()))
            } else {
                Error::Io(error)
            }
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        MediaAsset::new(file_name, None, bytes).map(Some)
    }
}

/// Object path for an upload: `entries/{owner}_{unix_millis}.{ext}`.
pub fn storage_path(owner: &str, asset: &MediaAsset, unix_millis: i64) -> String {
    format!("entries/{owner}_{unix_millis}.{}", asset.extension())
}

fn infer_media_mime_type(reported: Option<&str>, file_name: &str) -> Option<String> {
    if let Some(reported) = reported.map(str::trim).filter(|value| !value.is_empty()) {
        if !reported.eq_ignore_ascii_case("application/octet-stream") {
            return Some(reported.to_ascii_lowercase());
        }
    }
    mime_guess::from_path(file_name)
        .first_raw()
        .map(str::to_string)
}
