//! 再インデックスのオーケストレーション
//!
//! 全面再構築と、保存イベント起点の単一ドキュメント更新の2経路。
//! どちらもソースのドキュメントから再計算するため、途中で中断しても
//! 再実行すれば必ず同じ正しい状態に収束する。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::analyzer::UsageExtractor;
use crate::error::StoreError;
use crate::index::{IndexTables, UsageIndex};
use crate::model::DocumentId;
use crate::store::DocumentStore;

/// 全面再構築の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebuildOutcome {
    Completed(RebuildSummary),
    /// 既に再構築が走っている。スケジューラにとってはエラーではなく無視
    AlreadyRunning,
}

/// 全面再構築のサマリ
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RebuildSummary {
    /// 正常に抽出できたドキュメント数
    pub indexed: usize,
    /// 対象外としてスキップした数（取得できなかったものを含む）
    pub skipped: usize,
    /// 抽出に失敗し、使用ゼロ扱いにしたドキュメント数
    pub warnings: usize,
    /// 再構築後のウィジェット種別数
    pub widget_types: usize,
}

/// 単一ドキュメント更新の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// 抽出してupsertした
    Indexed,
    /// インデックスから取り除いた（削除・非公開・レイアウトなし）
    Removed,
    /// リビジョン・自動保存だったので無視した
    SkippedShadow,
    /// 抽出に失敗したため使用ゼロとして記録した
    Warned,
    /// より新しい保存が割り込んだためコミットしなかった
    Stale,
}

impl UpdateOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOutcome::Indexed => "indexed",
            UpdateOutcome::Removed => "removed",
            UpdateOutcome::SkippedShadow => "skipped_shadow",
            UpdateOutcome::Warned => "warned",
            UpdateOutcome::Stale => "stale",
        }
    }
}

pub struct ReindexOrchestrator {
    store: Arc<dyn DocumentStore>,
    index: Arc<UsageIndex>,
    extractor: UsageExtractor,
    batch_size: usize,
    /// 再構築の単一飛行ガード
    rebuild_running: AtomicBool,
    /// 同一ドキュメントへの保存を直列化するためのバージョン番号
    save_versions: DashMap<DocumentId, u64>,
}

impl ReindexOrchestrator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: Arc<UsageIndex>,
        extractor: UsageExtractor,
        batch_size: usize,
    ) -> Self {
        Self {
            store,
            index,
            extractor,
            batch_size: batch_size.max(1),
            rebuild_running: AtomicBool::new(false),
            save_versions: DashMap::new(),
        }
    }

    /// コーパス全体からインデックスを作り直す
    ///
    /// バッチ単位でドキュメントを読み、影スナップショットに蓄積して
    /// 最後に1回で差し替える。個々のドキュメントの失敗は警告に数えて
    /// 続行し、ストア到達不能のみ操作全体を中止する（コミット前なので
    /// 既存のインデックスはそのまま残る）。
    pub fn rebuild_all(&self) -> Result<RebuildOutcome, StoreError> {
        if self
            .rebuild_running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Rebuild already in flight, ignoring trigger");
            return Ok(RebuildOutcome::AlreadyRunning);
        }

        let result = self.run_rebuild();
        self.rebuild_running.store(false, Ordering::SeqCst);
        result.map(RebuildOutcome::Completed)
    }

    fn run_rebuild(&self) -> Result<RebuildSummary, StoreError> {
        let ids = self.store.list_eligible()?;
        info!("Rebuilding usage index over {} documents", ids.len());

        let mut shadow = IndexTables::default();
        let mut summary = RebuildSummary::default();

        for batch in ids.chunks(self.batch_size) {
            // バッチの作業セットはこのループ内でのみ生存する
            for &id in batch {
                let record = match self.store.get(id)? {
                    Some(record) => record,
                    None => {
                        summary.skipped += 1;
                        continue;
                    }
                };
                if !record.is_eligible() {
                    summary.skipped += 1;
                    continue;
                }

                match self.extractor.extract(id, record.layout.as_ref()) {
                    Ok(usage) => {
                        shadow.upsert(id, usage.counts);
                        summary.indexed += 1;
                    }
                    Err(e) => {
                        warn!("Extraction failed for document {}: {}", id, e);
                        summary.warnings += 1;
                    }
                }
            }
            debug!(
                "Rebuild progress: {}/{} documents",
                summary.indexed + summary.skipped + summary.warnings,
                ids.len()
            );
        }

        summary.widget_types = shadow.widget_type_count();
        self.index.replace_all(shadow);
        info!(
            "Rebuild complete: {} indexed, {} skipped, {} warnings, {} widget types",
            summary.indexed, summary.skipped, summary.warnings, summary.widget_types
        );
        Ok(summary)
    }

    /// ドキュメント保存イベントへの反応
    ///
    /// コストは保存された1ドキュメントのツリーに限定される。
    pub fn document_saved(&self, id: DocumentId) -> Result<UpdateOutcome, StoreError> {
        let version = self.bump_version(id);

        let record = match self.store.get(id)? {
            Some(record) => record,
            None => {
                self.commit_removal(id, version);
                return Ok(UpdateOutcome::Removed);
            }
        };

        // リビジョン・自動保存の影コピーでインデックスを汚さない
        if record.kind.is_shadow() {
            debug!("Ignoring shadow copy save for document {}", id);
            return Ok(UpdateOutcome::SkippedShadow);
        }

        if !record.is_eligible() {
            self.commit_removal(id, version);
            return Ok(UpdateOutcome::Removed);
        }

        match self.extractor.extract(id, record.layout.as_ref()) {
            Ok(usage) => {
                if self.is_stale(id, version) {
                    return Ok(UpdateOutcome::Stale);
                }
                self.index.upsert_document(id, usage.counts);
                debug!("Reindexed document {}", id);
                Ok(UpdateOutcome::Indexed)
            }
            Err(e) => {
                warn!("Extraction failed for document {}: {}", id, e);
                if self.is_stale(id, version) {
                    return Ok(UpdateOutcome::Stale);
                }
                // 壊れたレイアウトは使用ゼロとして扱う
                self.index.upsert_document(id, Default::default());
                Ok(UpdateOutcome::Warned)
            }
        }
    }

    /// ドキュメント削除・非公開化イベントへの反応
    pub fn document_removed(&self, id: DocumentId) {
        let version = self.bump_version(id);
        self.commit_removal(id, version);
        debug!("Removed document {} from usage index", id);
    }

    /// 再構築が走っているかどうか
    pub fn is_rebuilding(&self) -> bool {
        self.rebuild_running.load(Ordering::SeqCst)
    }

    fn bump_version(&self, id: DocumentId) -> u64 {
        let mut entry = self.save_versions.entry(id).or_insert(0);
        *entry += 1;
        *entry
    }

    /// 抽出中により新しい保存が来ていたら負け（last-writer-wins）
    fn is_stale(&self, id: DocumentId, version: u64) -> bool {
        self.save_versions.get(&id).map(|v| *v) != Some(version)
    }

    fn commit_removal(&self, id: DocumentId, version: u64) {
        if !self.is_stale(id, version) {
            self.index.remove_document(id);
        }
    }
}
