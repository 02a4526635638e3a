//! Storage seam for company data.
//!
//! Records are kept as JSON arrays in a flat key-value store, one key per
//! collection per company (`jie_jobs_<company_id>`, `jie_clients_<company_id>`,
//! ...), plus the company record itself under `jie_company_<company_id>`.
//! The store is injected so the job book never owns storage and the
//! calculator never sees it.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::{PipelineError, PipelineResult};
use crate::types::Company;

const KEY_PREFIX: &str = "jie";

/// Flat string key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PipelineResult<Option<String>>;

    async fn put(&self, key: &str, value: String) -> PipelineResult<()>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(|poisoned| {
            log::warn!("MemoryStore read lock was poisoned during len, recovering");
            poisoned.into_inner()
        });
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> PipelineResult<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(|poisoned| {
            log::warn!("MemoryStore read lock was poisoned, recovering");
            poisoned.into_inner()
        });
        Ok(entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> PipelineResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(|poisoned| {
            log::warn!("MemoryStore write lock was poisoned, recovering");
            poisoned.into_inner()
        });
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// File store
// ---------------------------------------------------------------------------

/// One `<key>.json` file per key under a directory.
///
/// Writes land in `<key>.json.tmp` and are renamed over the old file, so a
/// reader sees either the previous value or the new one.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl AsRef<Path>) -> PipelineResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PipelineResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(PipelineError::Storage(format!("invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> PipelineResult<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: String) -> PipelineResult<()> {
        let path = self.path_for(key)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            log::warn!("failed to move {} into place: {}", tmp.display(), e);
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Typed repository
// ---------------------------------------------------------------------------

/// The record collections kept per company.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Jobs,
    Quotes,
    LaborRoles,
    Materials,
    Equipment,
    Clients,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Jobs => "jobs",
            Collection::Quotes => "quotes",
            Collection::LaborRoles => "labor_roles",
            Collection::Materials => "materials",
            Collection::Equipment => "equipment",
            Collection::Clients => "clients",
        }
    }

    pub fn storage_key(&self, company_id: &str) -> String {
        format!("{}_{}_{}", KEY_PREFIX, self.as_str(), company_id)
    }
}

/// Typed access to one company's collections.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn KeyValueStore>,
    company_id: String,
}

impl Repository {
    pub fn new(store: Arc<dyn KeyValueStore>, company_id: impl Into<String>) -> Self {
        Self {
            store,
            company_id: company_id.into(),
        }
    }

    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    /// Load a collection. A key that was never written loads as empty.
    pub async fn load<T: DeserializeOwned>(&self, collection: Collection) -> PipelineResult<Vec<T>> {
        let key = collection.storage_key(&self.company_id);
        match self.store.get(&key).await? {
            Some(raw) if !raw.trim().is_empty() => Ok(serde_json::from_str(&raw)?),
            _ => Ok(Vec::new()),
        }
    }

    /// Replace a collection.
    pub async fn save<T: Serialize + Sync>(
        &self,
        collection: Collection,
        records: &[T],
    ) -> PipelineResult<()> {
        let key = collection.storage_key(&self.company_id);
        let raw = serde_json::to_string(records)?;
        self.store.put(&key, raw).await?;
        log::debug!("saved {} records to {}", records.len(), key);
        Ok(())
    }

    fn company_key(&self) -> String {
        format!("{}_company_{}", KEY_PREFIX, self.company_id)
    }

    /// The stored company record, if one was ever saved.
    pub async fn load_company(&self) -> PipelineResult<Option<Company>> {
        match self.store.get(&self.company_key()).await? {
            Some(raw) if !raw.trim().is_empty() => Ok(Some(serde_json::from_str(&raw)?)),
            _ => Ok(None),
        }
    }

    pub async fn save_company(&self, company: &Company) -> PipelineResult<()> {
        let key = self.company_key();
        self.store.put(&key, serde_json::to_string(company)?).await?;
        log::debug!("saved company record to {}", key);
        Ok(())
    }
}
