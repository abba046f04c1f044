//! Durable local persistence of in-progress drafts.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use tokio::fs;
use tracing::{debug, warn};

use crate::domain::drafts::Draft;
use crate::util::lock::mutex_lock;

const DRAFT_EXTENSION: &str = "json";

#[derive(Debug, Error)]
pub enum DraftStoreError {
    #[error("draft storage i/o failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode draft `{id}`: {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode draft file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl DraftStoreError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Key-value store of drafts, keyed by draft id.
#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Persist `draft`, stamping `updated_at` with the current time whatever
    /// the caller supplied. Returns the stored copy.
    async fn save(&self, draft: &Draft) -> Result<Draft, DraftStoreError>;

    async fn load(&self, id: &str) -> Result<Option<Draft>, DraftStoreError>;

    /// Deleting a missing draft is not an error.
    async fn delete(&self, id: &str) -> Result<(), DraftStoreError>;

    /// Every stored draft, most recently updated first.
    async fn list_all(&self) -> Result<Vec<Draft>, DraftStoreError>;

    /// Move a draft from `old_id` to `draft.id`. The new key is written
    /// before the old one is removed, so a failure never loses the draft.
    async fn rekey(&self, old_id: &str, draft: &Draft) -> Result<Draft, DraftStoreError> {
        let saved = self.save(draft).await?;
        if old_id != draft.id {
            self.delete(old_id).await?;
        }
        Ok(saved)
    }
}

fn stamped(draft: &Draft) -> Draft {
    let mut stored = draft.clone();
    stored.updated_at = OffsetDateTime::now_utc();
    stored
}

fn newest_first(drafts: &mut [Draft]) {
    drafts.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// One JSON file per draft inside a directory.
///
/// File names are the hex encoding of the draft id so arbitrary ids map to
/// safe names. Writes go to a temporary sibling and are renamed into place.
#[derive(Debug, Clone)]
pub struct FsDraftStore {
    dir: PathBuf,
}

impl FsDraftStore {
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, DraftStoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|err| DraftStoreError::io(&dir, err))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{DRAFT_EXTENSION}", hex::encode(id.as_bytes())))
    }

    async fn read(path: &Path) -> Result<Option<Draft>, DraftStoreError> {
        let bytes = match fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(DraftStoreError::io(path, err)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| DraftStoreError::Decode {
                path: path.to_path_buf(),
                source,
            })
    }
}

#[async_trait]
impl DraftStore for FsDraftStore {
    async fn save(&self, draft: &Draft) -> Result<Draft, DraftStoreError> {
        let stored = stamped(draft);
        let bytes = serde_json::to_vec_pretty(&stored).map_err(|source| {
            DraftStoreError::Encode {
                id: stored.id.clone(),
                source,
            }
        })?;

        let path = self.path_for(&stored.id);
        let tmp = path.with_extension(format!("{DRAFT_EXTENSION}.tmp"));
        fs::write(&tmp, &bytes)
            .await
            .map_err(|err| DraftStoreError::io(&tmp, err))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|err| DraftStoreError::io(&path, err))?;

        debug!(
            target = "quire::editor::drafts",
            draft_id = %stored.id,
            bytes = bytes.len(),
            "draft saved locally"
        );
        Ok(stored)
    }

    async fn load(&self, id: &str) -> Result<Option<Draft>, DraftStoreError> {
        Self::read(&self.path_for(id)).await
    }

    async fn delete(&self, id: &str) -> Result<(), DraftStoreError> {
        let path = self.path_for(id);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(DraftStoreError::io(&path, err)),
        }
    }

    async fn list_all(&self) -> Result<Vec<Draft>, DraftStoreError> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|err| DraftStoreError::io(&self.dir, err))?;
        let mut drafts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| DraftStoreError::io(&self.dir, err))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(DRAFT_EXTENSION) {
                continue;
            }
            match Self::read(&path).await {
                Ok(Some(draft)) => drafts.push(draft),
                Ok(None) => {}
                Err(err) => warn!(
                    target = "quire::editor::drafts",
                    path = %path.display(),
                    error = %err,
                    "skipping unreadable draft file"
                ),
            }
        }
        newest_first(&mut drafts);
        Ok(drafts)
    }
}

/// Process-local store for short-lived sessions and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraftStore {
    drafts: Arc<Mutex<HashMap<String, Draft>>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = mutex_lock(&self.drafts, "quire::editor::drafts", "ids")
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl DraftStore for MemoryDraftStore {
    async fn save(&self, draft: &Draft) -> Result<Draft, DraftStoreError> {
        let stored = stamped(draft);
        mutex_lock(&self.drafts, "quire::editor::drafts", "save")
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn load(&self, id: &str) -> Result<Option<Draft>, DraftStoreError> {
        Ok(mutex_lock(&self.drafts, "quire::editor::drafts", "load")
            .get(id)
            .cloned())
    }

    async fn delete(&self, id: &str) -> Result<(), DraftStoreError> {
        mutex_lock(&self.drafts, "quire::editor::drafts", "delete").remove(id);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Draft>, DraftStoreError> {
        let mut drafts: Vec<Draft> = mutex_lock(&self.drafts, "quire::editor::drafts", "list")
            .values()
            .cloned()
            .collect();
        newest_first(&mut drafts);
        Ok(drafts)
    }
}
