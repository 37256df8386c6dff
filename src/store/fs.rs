//! Filesystem-backed document store
//!
//! Documents live as individual `*.json` files under a root directory,
//! one `DocumentRecord` per file. This is the reference store used by the
//! standalone daemon; hosts with a real database implement `DocumentStore`
//! themselves.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::cache::DocumentFingerprint;
use crate::config::DocumentMatcher;
use crate::error::StoreError;
use crate::model::{DocumentId, DocumentRecord};

use super::DocumentStore;

pub struct FsDocumentStore {
    root: PathBuf,
    matcher: DocumentMatcher,
    /// 直近のスキャンで得たid→パスの対応
    paths: DashMap<DocumentId, PathBuf>,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_matcher(root, DocumentMatcher::default())
    }

    pub fn with_matcher(root: impl Into<PathBuf>, matcher: DocumentMatcher) -> Self {
        Self {
            root: root.into(),
            matcher,
            paths: DashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Collect matching document file paths under the root.
    fn collect_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::Unavailable(format!(
                "document root {} is not a directory",
                self.root.display()
            )));
        }
        let mut files = Vec::new();
        self.collect_dir(&self.root, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn collect_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), StoreError> {
        // ルート直下のread_dir失敗はストア到達不能。それより深い失敗はスキップ
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if dir == self.root => {
                return Err(StoreError::Unavailable(format!(
                    "cannot read {}: {}",
                    dir.display(),
                    e
                )));
            }
            Err(e) => {
                warn!("Skipping unreadable directory {}: {}", dir.display(), e);
                return Ok(());
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            let relative = path.strip_prefix(&self.root).unwrap_or(&path);

            if path.is_dir() {
                if self.matcher.should_descend(relative) {
                    self.collect_dir(&path, files)?;
                }
                continue;
            }

            let is_json = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("json"));
            if is_json && self.matcher.should_include(relative) {
                files.push(path);
            }
        }
        Ok(())
    }

    /// Read and parse a single document file. Unparseable files are logged
    /// and reported as `None` so one broken file never takes down a scan.
    fn read_record(&self, path: &Path) -> Option<DocumentRecord> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Cannot read document file {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str::<DocumentRecord>(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Invalid document file {}: {}", path.display(), e);
                None
            }
        }
    }

    fn rescan(&self) -> Result<Vec<(PathBuf, DocumentId, bool)>, StoreError> {
        let files = self.collect_paths()?;
        self.paths.clear();

        // 1件ずつ読んで捨てる。コーパス全体のツリーは同時に保持しない
        let mut scanned = Vec::with_capacity(files.len());
        for path in files {
            let Some(record) = self.read_record(&path) else {
                continue;
            };
            self.paths.insert(record.id, path.clone());
            scanned.push((path, record.id, record.is_eligible()));
        }
        debug!("Scanned {} document files", scanned.len());
        Ok(scanned)
    }
}

impl DocumentStore for FsDocumentStore {
    fn get(&self, id: DocumentId) -> Result<Option<DocumentRecord>, StoreError> {
        let path = match self.paths.get(&id) {
            Some(entry) => entry.value().clone(),
            None => {
                // 未知のidは一度だけ再スキャンしてから探す
                self.rescan()?;
                match self.paths.get(&id) {
                    Some(entry) => entry.value().clone(),
                    None => return Ok(None),
                }
            }
        };

        if !path.exists() {
            self.paths.remove(&id);
            return Ok(None);
        }
        Ok(self.read_record(&path).filter(|record| record.id == id))
    }

    fn list_eligible(&self) -> Result<Vec<DocumentId>, StoreError> {
        let mut ids: Vec<DocumentId> = self
            .rescan()?
            .into_iter()
            .filter(|(_, _, eligible)| *eligible)
            .map(|(_, id, _)| id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }

    fn fingerprints(
        &self,
    ) -> Result<Option<HashMap<DocumentId, DocumentFingerprint>>, StoreError> {
        let scanned = self.rescan()?;
        let mut fingerprints = HashMap::with_capacity(scanned.len());
        for (path, id, _) in scanned {
            let Ok(meta) = fs::metadata(&path) else {
                continue;
            };
            let mtime = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs())
                .unwrap_or(0);
            fingerprints.insert(
                id,
                DocumentFingerprint {
                    mtime,
                    size: meta.len(),
                },
            );
        }
        Ok(Some(fingerprints))
    }
}
