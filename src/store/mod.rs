pub mod fs;
pub mod memory;

use std::collections::HashMap;

use crate::cache::DocumentFingerprint;
use crate::error::StoreError;
use crate::model::{DocumentId, DocumentRecord};

pub use fs::FsDocumentStore;
pub use memory::MemoryDocumentStore;

/// ドキュメントストアの境界
///
/// ストア本体は外部コラボレータ。コアはここを通して読むだけで、
/// ドキュメントの所有・変更はしない。
pub trait DocumentStore: Send + Sync {
    /// idでレコードを取得する。存在しなければ `None`
    fn get(&self, id: DocumentId) -> Result<Option<DocumentRecord>, StoreError>;

    /// インデックス対象（公開済み・レイアウトあり）のid一覧
    fn list_eligible(&self) -> Result<Vec<DocumentId>, StoreError>;

    /// キャッシュ検証用のドキュメント指紋。対応しないストアは `None`
    fn fingerprints(
        &self,
    ) -> Result<Option<HashMap<DocumentId, DocumentFingerprint>>, StoreError> {
        Ok(None)
    }
}
