use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::index::UsageIndex;
use crate::model::DocumentId;

use super::error::CacheError;
use super::metadata::{CacheMetadata, DocumentFingerprint, CACHE_VERSION};
use super::schema::CachedDocumentUsage;

/// キャッシュ検証結果
pub struct CacheValidation {
    /// 指紋が一致し、キャッシュから復元できるドキュメント
    pub valid: HashSet<DocumentId>,
    /// 指紋不一致・キャッシュ未登録で再抽出が必要なドキュメント
    pub invalid: HashSet<DocumentId>,
}

/// キャッシュローダー
pub struct CacheLoader {
    cache_dir: PathBuf,
}

impl CacheLoader {
    pub fn new(state_root: &Path) -> Self {
        Self {
            cache_dir: state_root.join(".usage-tracker/cache/v1"),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// 現在のドキュメント指紋に対してキャッシュの有効性を検証する
    pub fn validate(
        &self,
        current: &HashMap<DocumentId, DocumentFingerprint>,
    ) -> Result<CacheValidation, CacheError> {
        let metadata_path = self.cache_dir.join("metadata.json");
        if !metadata_path.exists() {
            return Err(CacheError::NotFound);
        }

        let metadata_content = fs::read_to_string(&metadata_path)?;
        let metadata: CacheMetadata = serde_json::from_str(&metadata_content)
            .map_err(|e| CacheError::Deserialize(e.to_string()))?;

        // バージョン互換性チェック
        if !metadata.is_compatible() {
            warn!(
                "Cache version mismatch: {} (expected {})",
                metadata.version, CACHE_VERSION
            );
            return Err(CacheError::VersionMismatch);
        }

        let mut valid = HashSet::new();
        let mut invalid = HashSet::new();

        for (id, fingerprint) in current {
            match metadata.documents.get(id) {
                Some(cached) if cached == fingerprint => {
                    valid.insert(*id);
                }
                Some(_) => {
                    debug!("Cache invalid for document {}: fingerprint changed", id);
                    invalid.insert(*id);
                }
                None => {
                    debug!("Cache miss for document {}", id);
                    invalid.insert(*id);
                }
            }
        }

        Ok(CacheValidation { valid, invalid })
    }

    /// キャッシュからインデックスを復元する
    ///
    /// upsertの再生で復元するため、2テーブルの整合はストア側の不変条件で
    /// 保証される。復元できたドキュメントidの集合を返す。
    pub fn load(
        &self,
        index: &UsageIndex,
        valid: &HashSet<DocumentId>,
    ) -> Result<HashSet<DocumentId>, CacheError> {
        let data_path = self.cache_dir.join("usage.bin");
        if !data_path.exists() {
            return Err(CacheError::NotFound);
        }

        let data = fs::read(&data_path)?;
        let entries: Vec<CachedDocumentUsage> = bincode::deserialize(&data)?;
        let total = entries.len();

        let mut loaded = HashSet::new();
        for entry in entries {
            // 削除済み・変更済みドキュメントの行は読み飛ばす
            if !valid.contains(&entry.id) {
                continue;
            }
            index.upsert_document(entry.id, entry.counts.into_iter().collect());
            loaded.insert(entry.id);
        }

        info!(
            "Loaded {} of {} cached documents (valid: {})",
            loaded.len(),
            total,
            valid.len()
        );
        Ok(loaded)
    }
}
