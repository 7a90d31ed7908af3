//! Photo archive: a day-partitioned folder tree in a content store.
//!
//! Layout: `<root>/<DD-MM-YYYY>/<HHMM>.jpg`, every file readable by anyone
//! with the link. Two photos archived in the same minute get the same name;
//! the content store keeps both as separate objects.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use fieldlog_core::clock::{archive_file_name, archive_folder};
use fieldlog_core::{Clock, StagedPhoto};
use tracing::{error, info};

use crate::StoreError;

pub const JPEG_MIME: &str = "image/jpeg";

/// An uploaded object and its retrieval link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub id: String,
    pub link: String,
}

/// Durable file storage with folders and public links.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Id of the folder called `name` directly under `parent`, if any.
    async fn find_folder(&self, parent: &str, name: &str) -> Result<Option<String>, StoreError>;

    async fn create_folder(&self, parent: &str, name: &str) -> Result<String, StoreError>;

    async fn upload(
        &self,
        folder: &str,
        name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, StoreError>;

    /// Grant read access to anyone holding the link.
    async fn share_publicly(&self, object_id: &str) -> Result<(), StoreError>;
}

/// Archives report photos and hands back their public links.
pub struct PhotoArchiver {
    store: Arc<dyn ContentStore>,
    root_folder: String,
    clock: Arc<dyn Clock>,
}

impl PhotoArchiver {
    pub fn new(store: Arc<dyn ContentStore>, root_folder: String, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            root_folder,
            clock,
        }
    }

    /// Archive `photo` and return its public link, or `""` on any failure.
    ///
    /// Consumes the staged photo; its temporary file is gone when this
    /// returns, whatever the outcome.
    pub async fn archive(&self, photo: StagedPhoto, message_id: i64) -> String {
        let result = self.try_archive(&photo, message_id).await;
        drop(photo);
        match result {
            Ok(link) => link,
            Err(e) => {
                error!(message_id, error = %e, "photo archive failed");
                String::new()
            }
        }
    }

    async fn try_archive(
        &self,
        photo: &StagedPhoto,
        message_id: i64,
    ) -> Result<String, StoreError> {
        let now = self.clock.now();
        let folder_name = archive_folder(&now);
        let folder = self.day_folder(&folder_name).await?;

        let bytes = tokio::fs::read(photo.path()).await?;
        let file_name = archive_file_name(&now);
        let object = self
            .store
            .upload(&folder, &file_name, JPEG_MIME, bytes)
            .await?;
        self.store.share_publicly(&object.id).await?;

        info!(
            message_id,
            folder = %folder_name,
            file = %file_name,
            size = photo.size(),
            object_id = %object.id,
            "photo archived"
        );
        Ok(object.link)
    }

    async fn day_folder(&self, name: &str) -> Result<String, StoreError> {
        if let Some(id) = self.store.find_folder(&self.root_folder, name).await? {
            return Ok(id);
        }
        let id = self.store.create_folder(&self.root_folder, name).await?;
        info!(folder = %name, "archive folder created");
        Ok(id)
    }
}

// ── In-memory content store ──

/// A stored file in [`MemoryContentStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    pub id: String,
    pub folder: String,
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
    pub public: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryFolder {
    pub id: String,
    pub parent: String,
    pub name: String,
}

#[derive(Default)]
struct ContentState {
    next_id: u64,
    folders: Vec<MemoryFolder>,
    objects: Vec<MemoryObject>,
    fail_uploads: bool,
}

impl ContentState {
    fn next_id(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("{kind}-{}", self.next_id)
    }
}

/// Content store held in memory. Links look like `memory://<object id>`.
#[derive(Default)]
pub struct MemoryContentStore {
    state: Mutex<ContentState>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.state().fail_uploads = fail;
    }

    pub fn folders(&self) -> Vec<MemoryFolder> {
        self.state().folders.clone()
    }

    pub fn objects(&self) -> Vec<MemoryObject> {
        self.state().objects.clone()
    }

    fn state(&self) -> MutexGuard<'_, ContentState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn find_folder(&self, parent: &str, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .state()
            .folders
            .iter()
            .find(|f| f.parent == parent && f.name == name)
            .map(|f| f.id.clone()))
    }

    async fn create_folder(&self, parent: &str, name: &str) -> Result<String, StoreError> {
        let mut state = self.state();
        let id = state.next_id("folder");
        state.folders.push(MemoryFolder {
            id: id.clone(),
            parent: parent.to_string(),
            name: name.to_string(),
        });
        Ok(id)
    }

    async fn upload(
        &self,
        folder: &str,
        name: &str,
        mime: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, StoreError> {
        let mut state = self.state();
        if state.fail_uploads {
            return Err(StoreError::Other("upload refused".into()));
        }
        let id = state.next_id("file");
        state.objects.push(MemoryObject {
            id: id.clone(),
            folder: folder.to_string(),
            name: name.to_string(),
            mime: mime.to_string(),
            bytes,
            public: false,
        });
        Ok(StoredObject {
            link: format!("memory://{id}"),
            id,
        })
    }

    async fn share_publicly(&self, object_id: &str) -> Result<(), StoreError> {
        let mut state = self.state();
        let object = state
            .objects
            .iter_mut()
            .find(|o| o.id == object_id)
            .ok_or_else(|| StoreError::Other(format!("no object {object_id}")))?;
        object.public = true;
        Ok(())
    }
}
