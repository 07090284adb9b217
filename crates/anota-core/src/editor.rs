//! Create/edit view state: the draft, its media slot, and the commit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::backend::Backend;
use crate::config::{BackendConfig, DEFAULT_ENTRIES_TABLE, DEFAULT_MEDIA_BUCKET};
use crate::draft::Draft;
use crate::list::ListInvalidation;
use crate::media::{storage_path, MediaSource};
use crate::models::{Entry, EntryId};
use crate::notice::MEDIA_PERMISSION_MESSAGE;
use crate::session::resolve_owner;
use crate::{Error, Result};

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new entry was inserted; the backend assigned its id.
    Created,
    /// The entry with this id was updated in place.
    Updated(EntryId),
}

/// Editing session for one entry.
///
/// Methods take `&self` so a view can keep the editor in an `Arc` and start
/// an upload while still reading the draft. Only one upload or commit runs
/// at a time; a second attempt fails with [`Error::Busy`] without sending
/// anything.
pub struct EntryEditor<B: Backend + ?Sized> {
    backend: Arc<B>,
    bucket: String,
    table: String,
    invalidation: ListInvalidation,
    draft: Mutex<Draft>,
    owner: Mutex<Option<String>>,
    busy: AtomicBool,
}

impl<B: Backend + ?Sized> EntryEditor<B> {
    /// Editor for a new, empty entry.
    pub fn new(backend: Arc<B>, invalidation: ListInvalidation) -> Self {
        Self::with_draft(backend, invalidation, Draft::new())
    }

    /// Editor pre-filled from an existing entry.
    pub fn editing(backend: Arc<B>, invalidation: ListInvalidation, entry: &Entry) -> Self {
        Self::with_draft(backend, invalidation, Draft::from_entry(entry))
    }

    fn with_draft(backend: Arc<B>, invalidation: ListInvalidation, draft: Draft) -> Self {
        Self {
            backend,
            bucket: DEFAULT_MEDIA_BUCKET.to_string(),
            table: DEFAULT_ENTRIES_TABLE.to_string(),
            invalidation,
            draft: Mutex::new(draft),
            owner: Mutex::new(None),
            busy: AtomicBool::new(false),
        }
    }

    /// Use the bucket and table named in `config`.
    #[must_use]
    pub fn with_config(mut self, config: &BackendConfig) -> Self {
        self.bucket.clone_from(&config.media_bucket);
        self.table.clone_from(&config.entries_table);
        self
    }

    /// Resolve the signed-in user when the view is shown.
    pub async fn on_focus(&self) -> Result<Option<String>> {
        let owner = resolve_owner(self.backend.as_ref()).await?;
        if owner.is_none() {
            tracing::debug!("Editor opened without a signed-in user");
        }
        self.owner_slot()?.clone_from(&owner);
        Ok(owner)
    }

    /// Owner resolved by the last [`Self::on_focus`].
    pub fn owner(&self) -> Result<Option<String>> {
        Ok(self.owner_slot()?.clone())
    }

    /// Snapshot of the current draft.
    pub fn draft(&self) -> Result<Draft> {
        Ok(self.lock_draft()?.clone())
    }

    /// Apply a change to the draft.
    pub fn update<R>(&self, change: impl FnOnce(&mut Draft) -> R) -> Result<R> {
        Ok(change(&mut *self.lock_draft()?))
    }

    pub fn set_title(&self, title: &str) -> Result<()> {
        self.update(|draft| draft.set_title(title))
    }

    pub fn set_content(&self, content: &str) -> Result<()> {
        self.update(|draft| draft.set_content(content))
    }

    /// Drop the attached media from the draft; the stored object is left alone.
    pub fn remove_media(&self) -> Result<()> {
        self.update(Draft::clear_media)
    }

    /// Whether an upload or commit is outstanding.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Pick media from `source`, upload it, and attach its public URL.
    ///
    /// Returns `Ok(None)` when the pick was cancelled. A refused permission
    /// fails with [`Error::PermissionDenied`]. On any failure the previously
    /// attached media stays in place.
    pub async fn attach_media(&self, source: &dyn MediaSource) -> Result<Option<String>> {
        let _busy = self.begin()?;

        if !source.request_permission().await? {
            return Err(Error::PermissionDenied(MEDIA_PERMISSION_MESSAGE.to_string()));
        }
        let Some(asset) = source.pick().await? else {
            tracing::debug!("Media pick cancelled");
            return Ok(None);
        };
        let owner = self.owner()?.ok_or(Error::MissingOwner)?;

        let path = storage_path(&owner, &asset, Utc::now().timestamp_millis());
        let content_type = asset.content_type().to_string();
        self.backend
            .upload(&self.bucket, &path, asset.bytes, &content_type, true)
            .await?;

        let url = self.backend.public_url(&self.bucket, &path);
        self.update(|draft| draft.attach_media(url.clone()))?;
        tracing::info!("Attached {} as {}", content_type, path);
        Ok(Some(url))
    }

    /// Save the draft with a single upsert.
    ///
    /// Blank drafts and a missing owner are rejected before any request.
    /// On success every list sharing this editor's invalidation token goes
    /// stale; on failure the draft is left as it was.
    pub async fn commit(&self) -> Result<CommitOutcome> {
        let _busy = self.begin()?;

        let owner = self.owner()?.ok_or(Error::MissingOwner)?;
        let committed = self.draft()?;
        let record = committed.to_record(&owner)?;
        let outcome = record
            .id
            .clone()
            .map_or(CommitOutcome::Created, CommitOutcome::Updated);

        self.backend
            .upsert(&self.table, serde_json::to_value(&record)?)
            .await?;

        self.update(|draft| draft.accept_saved(&committed))?;
        self.invalidation.invalidate();
        match &outcome {
            CommitOutcome::Created => tracing::info!("Created entry"),
            CommitOutcome::Updated(id) => tracing::info!("Updated entry {}", id),
        }
        Ok(outcome)
    }

    fn begin(&self) -> Result<BusyGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::Busy);
        }
        Ok(BusyGuard(&self.busy))
    }

    fn lock_draft(&self) -> Result<MutexGuard<'_, Draft>> {
        self.draft
            .lock()
            .map_err(|error| Error::Internal(format!("draft lock poisoned: {error}")))
    }

    fn owner_slot(&self) -> Result<MutexGuard<'_, Option<String>>> {
        self.owner
            .lock()
            .map_err(|error| Error::Internal(format!("owner lock poisoned: {error}")))
    }
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;
    use crate::backend::{InMemoryBackend, Operation};
    use crate::list::EntryListView;
    use crate::media::{MediaAsset, MediaKind};

    struct StubSource {
        permission: bool,
        asset: Option<MediaAsset>,
    }

    impl StubSource {
        fn picking(file_name: &str) -> Self {
            Self {
                permission: true,
                asset: Some(MediaAsset::new(file_name, None, vec![1, 2, 3]).unwrap()),
            }
        }
    }

    #[async_trait]
    impl MediaSource for StubSource {
        async fn request_permission(&self) -> Result<bool> {
            Ok(self.permission)
        }

        async fn pick(&self) -> Result<Option<MediaAsset>> {
            Ok(self.asset.clone())
        }
    }

    async fn editor_for(backend: &Arc<InMemoryBackend>) -> EntryEditor<InMemoryBackend> {
        let editor = EntryEditor::new(Arc::clone(backend), ListInvalidation::new());
        editor.on_focus().await.unwrap();
        editor
    }

    #[tokio::test]
    async fn blank_draft_sends_nothing() {
        let backend = Arc::new(InMemoryBackend::with_signed_in_user("user-1"));
        let editor = editor_for(&backend).await;
        editor.set_title("   ").unwrap();

        assert!(matches!(editor.commit().await, Err(Error::EmptyDraft)));
        assert_eq!(backend.call_count(Operation::Upsert), 0);
    }

    #[tokio::test]
    async fn commit_without_owner_sends_nothing() {
        let backend = Arc::new(InMemoryBackend::new());
        let editor = editor_for(&backend).await;
        editor.set_content("text").unwrap();

        assert!(matches!(editor.commit().await, Err(Error::MissingOwner)));
        assert_eq!(backend.call_count(Operation::Upsert), 0);
    }

    #[tokio::test]
    async fn groceries_entry_is_created_and_listed_first() {
        let backend = Arc::new(InMemoryBackend::with_signed_in_user("user-1"));
        backend
            .insert_row(
                "entries",
                json!({ "id": "old", "user_id": "user-1", "title": "Earlier", "created_at": "2020-01-01T00:00:00Z" }),
            )
            .unwrap();
        let invalidation = ListInvalidation::new();
        let mut list = EntryListView::new(Arc::clone(&backend), invalidation.clone());
        list.load().await.unwrap();

        let editor = EntryEditor::new(Arc::clone(&backend), invalidation);
        editor.on_focus().await.unwrap();
        editor.set_title("  Groceries ").unwrap();
        editor.set_content("milk, eggs\n").unwrap();

        assert_eq!(editor.commit().await.unwrap(), CommitOutcome::Created);
        assert_eq!(backend.call_count(Operation::Upsert), 1);
        assert!(list.is_stale());

        let entries = list.on_focus().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "Groceries");
        assert_eq!(entries[0].content, "milk, eggs");
        assert_eq!(entries[0].owner, "user-1");
        assert_eq!(entries[0].media_url, None);
        assert!(!editor.draft().unwrap().has_unsaved_changes());
    }

    #[tokio::test]
    async fn title_only_entry_is_saved_with_empty_content() {
        let backend = Arc::new(InMemoryBackend::with_signed_in_user("user-1"));
        let invalidation = ListInvalidation::new();
        let editor = EntryEditor::new(Arc::clone(&backend), invalidation.clone());
        editor.on_focus().await.unwrap();
        editor.set_title("Groceries").unwrap();

        assert_eq!(editor.commit().await.unwrap(), CommitOutcome::Created);

        let mut list = EntryListView::new(Arc::clone(&backend), invalidation);
        let entries = list.load().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Groceries");
        assert_eq!(entries[0].content, "");
        assert_eq!(entries[0].media_url, None);
    }

    #[tokio::test]
    async fn editing_updates_the_same_row() {
        let backend = Arc::new(InMemoryBackend::with_signed_in_user("user-1"));
        backend
            .insert_row(
                "entries",
                json!({
                    "id": 42,
                    "user_id": "user-1",
                    "title": "Draft",
                    "content": "body",
                    "media_url": "https://cdn.example/a.png",
                    "created_at": "2024-01-01T00:00:00Z"
                }),
            )
            .unwrap();
        let mut list = EntryListView::new(Arc::clone(&backend), ListInvalidation::new());
        let entry = list.load().await.unwrap()[0].clone();

        let editor = EntryEditor::editing(Arc::clone(&backend), ListInvalidation::new(), &entry);
        editor.on_focus().await.unwrap();
        editor.set_title("Final").unwrap();
        editor.remove_media().unwrap();

        assert_eq!(
            editor.commit().await.unwrap(),
            CommitOutcome::Updated(EntryId::Number(42))
        );
        assert_eq!(
            editor.commit().await.unwrap(),
            CommitOutcome::Updated(EntryId::Number(42))
        );

        let rows = backend.rows("entries");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], json!(42));
        assert_eq!(rows[0]["title"], "Final");
        assert_eq!(rows[0]["media_url"], Value::Null);
        assert_eq!(rows[0]["created_at"], "2024-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn commits_of_new_drafts_each_insert() {
        let backend = Arc::new(InMemoryBackend::with_signed_in_user("user-1"));
        let editor = editor_for(&backend).await;
        editor.set_title("Twice").unwrap();

        editor.commit().await.unwrap();
        editor.commit().await.unwrap();

        let rows = backend.rows("entries");
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0]["id"], rows[1]["id"]);
    }

    #[tokio::test]
    async fn failed_commit_keeps_the_draft() {
        let backend = Arc::new(InMemoryBackend::with_signed_in_user("user-1"));
        backend.fail_next(Operation::Upsert, "permission denied for table entries").unwrap();
        let editor = editor_for(&backend).await;
        editor.set_title("Keep me").unwrap();

        let error = editor.commit().await.unwrap_err();
        assert_eq!(error.to_string(), "permission denied for table entries");
        let draft = editor.draft().unwrap();
        assert_eq!(draft.title(), "Keep me");
        assert!(draft.has_unsaved_changes());
        assert!(!editor.is_busy());
    }

    #[tokio::test]
    async fn attach_media_uploads_and_stores_public_url() {
        let backend = Arc::new(InMemoryBackend::with_signed_in_user("user-1"));
        let editor = editor_for(&backend).await;

        let url = editor
            .attach_media(&StubSource::picking("beach.jpg"))
            .await
            .unwrap()
            .unwrap();

        let path = url
            .split("/object/public/galeria/")
            .nth(1)
            .unwrap()
            .to_string();
        assert!(path.starts_with("entries/user-1_"));
        assert!(path.ends_with(".jpg"));
        let object = backend.object("galeria", &path).unwrap();
        assert_eq!(object.content_type, "image/jpeg");
        assert_eq!(object.bytes, vec![1, 2, 3]);
        assert_eq!(editor.draft().unwrap().media_url(), Some(url.as_str()));
    }

    #[tokio::test]
    async fn failed_upload_keeps_previous_media() {
        let backend = Arc::new(InMemoryBackend::with_signed_in_user("user-1"));
        let editor = editor_for(&backend).await;
        let first = editor
            .attach_media(&StubSource::picking("one.png"))
            .await
            .unwrap();

        backend.fail_next(Operation::Upload, "Payload too large (413)").unwrap();
        let error = editor
            .attach_media(&StubSource::picking("two.mp4"))
            .await
            .unwrap_err();

        assert_eq!(error.to_string(), "Payload too large (413)");
        assert_eq!(editor.draft().unwrap().media_url().map(str::to_string), first);
    }

    #[tokio::test]
    async fn denied_permission_and_cancelled_pick_change_nothing() {
        let backend = Arc::new(InMemoryBackend::with_signed_in_user("user-1"));
        let editor = editor_for(&backend).await;

        let denied = StubSource {
            permission: false,
            asset: Some(MediaAsset::new("a.png", None, vec![]).unwrap()),
        };
        assert!(matches!(
            editor.attach_media(&denied).await,
            Err(Error::PermissionDenied(_))
        ));

        let cancelled = StubSource {
            permission: true,
            asset: None,
        };
        assert_eq!(editor.attach_media(&cancelled).await.unwrap(), None);
        assert_eq!(backend.call_count(Operation::Upload), 0);
        assert_eq!(editor.draft().unwrap().media_url(), None);
    }

    #[tokio::test]
    async fn upload_without_owner_is_rejected() {
        let backend = Arc::new(InMemoryBackend::new());
        let editor = editor_for(&backend).await;
        let source = StubSource {
            permission: true,
            asset: Some(MediaAsset {
                file_name: "clip".to_string(),
                mime_type: None,
                kind: MediaKind::Video,
                bytes: vec![],
            }),
        };

        assert!(matches!(
            editor.attach_media(&source).await,
            Err(Error::MissingOwner)
        ));
        assert_eq!(backend.call_count(Operation::Upload), 0);
    }

    #[tokio::test]
    async fn second_operation_while_uploading_is_busy() {
        let backend = Arc::new(InMemoryBackend::with_signed_in_user("user-1"));
        let gate = backend.hold_uploads().unwrap();
        let editor = Arc::new(editor_for(&backend).await);
        editor.set_title("Busy").unwrap();

        let uploading = {
            let editor = Arc::clone(&editor);
            tokio::spawn(async move {
                editor
                    .attach_media(&StubSource::picking("slow.png"))
                    .await
            })
        };
        while !editor.is_busy() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(editor.commit().await, Err(Error::Busy)));
        assert!(matches!(
            editor.attach_media(&StubSource::picking("other.png")).await,
            Err(Error::Busy)
        ));
        assert_eq!(backend.call_count(Operation::Upsert), 0);

        gate.notify_one();
        assert!(uploading.await.unwrap().unwrap().is_some());
        assert!(!editor.is_busy());
        assert_eq!(backend.call_count(Operation::Upload), 1);

        editor.commit().await.unwrap();
        assert_eq!(backend.call_count(Operation::Upsert), 1);
    }

    #[tokio::test]
    async fn config_selects_bucket_and_table() {
        let backend = Arc::new(InMemoryBackend::with_signed_in_user("user-1"));
        let config = BackendConfig::new("https://demo.supabase.co", "anon")
            .unwrap()
            .with_media_bucket(Some("photos".to_string()))
            .with_entries_table(Some("journal".to_string()));
        let editor = EntryEditor::new(Arc::clone(&backend), ListInvalidation::new()).with_config(&config);
        editor.on_focus().await.unwrap();
        editor.set_content("hello").unwrap();

        let url = editor
            .attach_media(&StubSource::picking("a.png"))
            .await
            .unwrap()
            .unwrap();
        editor.commit().await.unwrap();

        assert!(url.contains("/object/public/photos/entries/user-1_"));
        assert_eq!(backend.rows("journal").len(), 1);
        assert!(backend.rows("entries").is_empty());
    }
}
