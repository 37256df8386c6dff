//! 使用状況インデックス
//!
//! 2つの逆引きテーブルを保持する:
//! - 集計テーブル: ウィジェット種別 → 全ドキュメント合計の出現回数
//! - メンバーシップテーブル: ウィジェット種別 → 使用ドキュメントid集合
//!
//! 両テーブルはドキュメントごとの出現マップ（`document_usages`）からの
//! 射影であり、必ず同じコミットで更新される。集計は出現回数の合計
//! （1ドキュメントで3回使えば3を加算）、メンバーシップは多重度なしの
//! ドキュメント所属で、意図的に非対称。

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use crate::model::DocumentId;

/// インデックスの実体（スナップショット単位で差し替え可能）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexTables {
    /// ドキュメントごとの出現マップ。両テーブルの導出元
    document_usages: HashMap<DocumentId, HashMap<String, u32>>,
    /// 種別 → 合計出現回数
    counts: BTreeMap<String, u64>,
    /// 種別 → 使用ドキュメント集合
    memberships: HashMap<String, BTreeSet<DocumentId>>,
}

impl IndexTables {
    /// ドキュメント1件分の行を丸ごと差し替える
    ///
    /// 出現回数0の種別と空の種別名は行にならない。空のマップを渡すと
    /// 削除と同じ効果になる。
    pub fn upsert(&mut self, id: DocumentId, per_type_counts: HashMap<String, u32>) {
        self.remove(id);

        let mut kept: HashMap<String, u32> = per_type_counts
            .into_iter()
            .filter(|(ty, n)| !ty.is_empty() && *n > 0)
            .collect();
        kept.shrink_to_fit();

        if kept.is_empty() {
            return;
        }

        for (ty, n) in &kept {
            *self.counts.entry(ty.clone()).or_insert(0) += u64::from(*n);
            self.memberships.entry(ty.clone()).or_default().insert(id);
        }
        self.document_usages.insert(id, kept);
    }

    /// ドキュメント1件分の行を削除し、影響を受けた集計を調整する
    pub fn remove(&mut self, id: DocumentId) {
        let Some(old) = self.document_usages.remove(&id) else {
            return;
        };

        for (ty, n) in old {
            if let Some(total) = self.counts.get_mut(&ty) {
                *total = total.saturating_sub(u64::from(n));
                if *total == 0 {
                    self.counts.remove(&ty);
                }
            }
            if let Some(members) = self.memberships.get_mut(&ty) {
                members.remove(&id);
                if members.is_empty() {
                    self.memberships.remove(&ty);
                }
            }
        }
    }

    /// count > 0 の (種別, 合計) を種別の昇順で返す
    pub fn list_non_zero(&self) -> Vec<(String, u64)> {
        self.counts
            .iter()
            .filter(|&(_, &n)| n > 0)
            .map(|(ty, &n)| (ty.clone(), n))
            .collect()
    }

    /// 種別を使用しているドキュメントidを昇順で返す
    pub fn documents_for(&self, widget_type: &str) -> Vec<DocumentId> {
        self.memberships
            .get(widget_type)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn usage_for_document(&self, id: DocumentId) -> Option<HashMap<String, u32>> {
        self.document_usages.get(&id).cloned()
    }

    /// ドキュメントごとの出現マップを列挙する（永続化用）
    pub fn iter_documents(&self) -> impl Iterator<Item = (DocumentId, &HashMap<String, u32>)> {
        self.document_usages.iter().map(|(id, counts)| (*id, counts))
    }

    pub fn document_count(&self) -> usize {
        self.document_usages.len()
    }

    pub fn widget_type_count(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document_usages.is_empty()
    }
}

/// 共有可能なインデックスストア
///
/// すべての読み書きは1つのロックを通る。全面再構築は影スナップショットを
/// ロック外で組み立ててから書きロック1回で差し替えるため、読み手が
/// 再構築途中の状態を観測することはない。
pub struct UsageIndex {
    tables: RwLock<IndexTables>,
}

impl UsageIndex {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(IndexTables::default()),
        }
    }

    pub fn upsert_document(&self, id: DocumentId, per_type_counts: HashMap<String, u32>) {
        let mut tables = self.tables.write().expect("index lock poisoned");
        tables.upsert(id, per_type_counts);
    }

    pub fn remove_document(&self, id: DocumentId) {
        let mut tables = self.tables.write().expect("index lock poisoned");
        tables.remove(id);
    }

    /// 両テーブルをスナップショットで一括置換する
    pub fn replace_all(&self, snapshot: IndexTables) {
        let mut tables = self.tables.write().expect("index lock poisoned");
        *tables = snapshot;
    }

    pub fn clear(&self) {
        self.replace_all(IndexTables::default());
    }

    pub fn list_non_zero(&self) -> Vec<(String, u64)> {
        self.tables
            .read()
            .expect("index lock poisoned")
            .list_non_zero()
    }

    pub fn documents_for(&self, widget_type: &str) -> Vec<DocumentId> {
        self.tables
            .read()
            .expect("index lock poisoned")
            .documents_for(widget_type)
    }

    pub fn usage_for_document(&self, id: DocumentId) -> Option<HashMap<String, u32>> {
        self.tables
            .read()
            .expect("index lock poisoned")
            .usage_for_document(id)
    }

    pub fn document_count(&self) -> usize {
        self.tables
            .read()
            .expect("index lock poisoned")
            .document_count()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().expect("index lock poisoned").is_empty()
    }

    /// 永続化・比較用のスナップショットを取得する
    pub fn snapshot(&self) -> IndexTables {
        self.tables.read().expect("index lock poisoned").clone()
    }
}

impl Default for UsageIndex {
    fn default() -> Self {
        Self::new()
    }
}
