//! テスト・組み込み用のインメモリドキュメントストア

use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;

use crate::error::StoreError;
use crate::model::{DocumentId, DocumentRecord};

use super::DocumentStore;

/// DashMapに全レコードを持つストア
///
/// `set_unavailable(true)` でストア到達不能を再現できる（テスト用）。
pub struct MemoryDocumentStore {
    documents: DashMap<DocumentId, DocumentRecord>,
    unavailable: AtomicBool,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn insert(&self, record: DocumentRecord) {
        self.documents.insert(record.id, record);
    }

    pub fn remove(&self, id: DocumentId) -> Option<DocumentRecord> {
        self.documents.remove(&id).map(|(_, record)| record)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self, id: DocumentId) -> Result<Option<DocumentRecord>, StoreError> {
        self.check_available()?;
        Ok(self.documents.get(&id).map(|entry| entry.value().clone()))
    }

    fn list_eligible(&self) -> Result<Vec<DocumentId>, StoreError> {
        self.check_available()?;
        let mut ids: Vec<DocumentId> = self
            .documents
            .iter()
            .filter(|entry| entry.value().is_eligible())
            .map(|entry| *entry.key())
            .collect();
        // 再構築の決定性のためid昇順
        ids.sort_unstable();
        Ok(ids)
    }
}
