use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::index::UsageIndex;
use crate::model::DocumentId;

use super::error::CacheError;
use super::metadata::{CacheMetadata, DocumentFingerprint};
use super::schema::CachedDocumentUsage;

/// Cache writer
pub struct CacheWriter {
    cache_dir: PathBuf,
}

impl CacheWriter {
    pub fn new(state_root: &Path) -> Self {
        Self {
            cache_dir: state_root.join(".usage-tracker/cache/v1"),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn ensure_cache_dir(&self) -> std::io::Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Atomic full replace: write to a temp file, then rename over the
    /// previous snapshot so readers never see a half-written file.
    fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes)?;
        fs::rename(&tmp, path)
    }

    /// Save the entire index snapshot to cache
    pub fn save_full(
        &self,
        index: &UsageIndex,
        fingerprints: &HashMap<DocumentId, DocumentFingerprint>,
    ) -> Result<(), CacheError> {
        self.ensure_cache_dir()?;

        let mut metadata = CacheMetadata::new();
        metadata.documents = fingerprints.clone();

        let metadata_json = serde_json::to_string_pretty(&metadata)
            .map_err(|e| CacheError::Serialize(e.to_string()))?;
        Self::write_atomic(&self.cache_dir.join("metadata.json"), metadata_json.as_bytes())?;

        let snapshot = index.snapshot();
        let entries: Vec<CachedDocumentUsage> = snapshot
            .iter_documents()
            .map(|(id, counts)| CachedDocumentUsage {
                id,
                counts: counts.iter().map(|(t, n)| (t.clone(), *n)).collect(),
            })
            .collect();

        let data = bincode::serialize(&entries).map_err(|e| CacheError::Serialize(e.to_string()))?;
        Self::write_atomic(&self.cache_dir.join("usage.bin"), &data)?;

        info!(
            "Saved usage cache: {} documents, {} bytes",
            entries.len(),
            data.len()
        );
        Ok(())
    }

    /// Drop the persisted snapshot entirely (teardown)
    pub fn purge(&self) -> Result<(), CacheError> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            debug!("Purged usage cache at {}", self.cache_dir.display());
        }
        Ok(())
    }
}
