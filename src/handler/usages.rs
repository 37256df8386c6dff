use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::StoreError;
use crate::index::UsageIndex;
use crate::model::{DocumentId, UsageLocation};
use crate::store::DocumentStore;

/// 使用箇所詳細クエリ
///
/// 指定ウィジェット種別を使うドキュメントを (タイトル, URL) で返す。
/// インデックスは保存イベントに追従するが状態変更に遅れることがあるため、
/// 読み取り時点でも公開済みであることを確認する。
pub struct UsagesHandler {
    index: Arc<UsageIndex>,
    store: Arc<dyn DocumentStore>,
}

impl UsagesHandler {
    pub fn new(index: Arc<UsageIndex>, store: Arc<dyn DocumentStore>) -> Self {
        Self { index, store }
    }

    pub fn get_usages(&self, widget_type: &str) -> Result<Vec<UsageLocation>, StoreError> {
        let mut seen: HashSet<DocumentId> = HashSet::new();
        let mut locations = Vec::new();

        for id in self.index.documents_for(widget_type) {
            if !seen.insert(id) {
                continue;
            }
            let Some(record) = self.store.get(id)? else {
                debug!("Document {} no longer in store, omitting from usages", id);
                continue;
            };
            if !record.status.is_published() || record.kind.is_shadow() {
                continue;
            }
            locations.push(UsageLocation {
                title: record.title,
                url: record.url,
            });
        }

        Ok(locations)
    }
}
