//! 単一ドキュメント更新経路の統合テスト
//!
//! 保存イベントに対する増分更新・影コピーの無視・再構築の単一飛行を
//! 検証する。

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use widget_usage_tracker::analyzer::UsageExtractor;
use widget_usage_tracker::error::StoreError;
use widget_usage_tracker::index::UsageIndex;
use widget_usage_tracker::model::{
    DocumentId, DocumentKind, DocumentRecord, DocumentStatus, LayoutBlob,
};
use widget_usage_tracker::reindex::{RebuildOutcome, ReindexOrchestrator, UpdateOutcome};
use widget_usage_tracker::store::{DocumentStore, MemoryDocumentStore};

fn published(id: u64, layout: &str) -> DocumentRecord {
    DocumentRecord {
        id: DocumentId(id),
        title: format!("Doc {}", id),
        url: format!("https://example.test/?p={}", id),
        status: DocumentStatus::Published,
        kind: DocumentKind::Regular,
        layout: Some(LayoutBlob::Raw(layout.to_string())),
    }
}

fn setup(store: Arc<MemoryDocumentStore>) -> (Arc<UsageIndex>, ReindexOrchestrator) {
    let index = Arc::new(UsageIndex::new());
    let orchestrator =
        ReindexOrchestrator::new(store, Arc::clone(&index), UsageExtractor::default(), 50);
    (index, orchestrator)
}

// ============================================================
// 1. 保存イベント
// ============================================================

#[test]
fn test_save_then_edit_replaces_rows() {
    let store = Arc::new(MemoryDocumentStore::new());
    store.insert(published(1, r#"[{"widgetType":"button"}]"#));

    let (index, orchestrator) = setup(Arc::clone(&store));
    assert_eq!(
        orchestrator.document_saved(DocumentId(1)).unwrap(),
        UpdateOutcome::Indexed
    );
    assert_eq!(index.list_non_zero(), vec![("button".to_string(), 1)]);

    // 編集でbuttonが消えてvideoが入った
    store.insert(published(1, r#"[{"widgetType":"video"},{"widgetType":"video"}]"#));
    orchestrator.document_saved(DocumentId(1)).unwrap();

    assert_eq!(index.list_non_zero(), vec![("video".to_string(), 2)]);
    assert!(index.documents_for("button").is_empty(), "旧行は残らない");
}

#[test]
fn test_unpublish_removes_from_index() {
    let store = Arc::new(MemoryDocumentStore::new());
    store.insert(published(1, r#"[{"widgetType":"button"}]"#));

    let (index, orchestrator) = setup(Arc::clone(&store));
    orchestrator.document_saved(DocumentId(1)).unwrap();

    let mut draft = published(1, r#"[{"widgetType":"button"}]"#);
    draft.status = DocumentStatus::Draft;
    store.insert(draft);

    assert_eq!(
        orchestrator.document_saved(DocumentId(1)).unwrap(),
        UpdateOutcome::Removed
    );
    assert!(index.is_empty());
}

#[test]
fn test_shadow_copies_never_pollute_index() {
    let store = Arc::new(MemoryDocumentStore::new());
    let (index, orchestrator) = setup(Arc::clone(&store));

    for kind in [DocumentKind::Revision, DocumentKind::Autosave] {
        let mut shadow = published(9, r#"[{"widgetType":"button"}]"#);
        shadow.kind = kind;
        store.insert(shadow);
        assert_eq!(
            orchestrator.document_saved(DocumentId(9)).unwrap(),
            UpdateOutcome::SkippedShadow,
            "影コピーの保存は無視されるべき"
        );
    }
    assert!(index.is_empty());
}

#[test]
fn test_deleted_document_removed_via_notification() {
    let store = Arc::new(MemoryDocumentStore::new());
    store.insert(published(1, r#"[{"widgetType":"button"}]"#));

    let (index, orchestrator) = setup(Arc::clone(&store));
    orchestrator.document_saved(DocumentId(1)).unwrap();

    store.remove(DocumentId(1));
    orchestrator.document_removed(DocumentId(1));

    assert!(index.documents_for("button").is_empty());
}

// ============================================================
// 2. 再構築の単一飛行
// ============================================================

/// getのたびに少し眠るストア。再構築を意図的に長引かせる
struct SlowStore {
    inner: Arc<MemoryDocumentStore>,
    delay: Duration,
}

impl DocumentStore for SlowStore {
    fn get(&self, id: DocumentId) -> Result<Option<DocumentRecord>, StoreError> {
        thread::sleep(self.delay);
        self.inner.get(id)
    }

    fn list_eligible(&self) -> Result<Vec<DocumentId>, StoreError> {
        self.inner.list_eligible()
    }
}

#[test]
fn test_second_rebuild_trigger_is_noop() {
    let inner = Arc::new(MemoryDocumentStore::new());
    for id in 1..=30u64 {
        inner.insert(published(id, r#"[{"widgetType":"button"}]"#));
    }
    let store = Arc::new(SlowStore {
        inner,
        delay: Duration::from_millis(10),
    });

    let index = Arc::new(UsageIndex::new());
    let orchestrator = Arc::new(ReindexOrchestrator::new(
        store,
        Arc::clone(&index),
        UsageExtractor::default(),
        10,
    ));

    let background = {
        let orchestrator = Arc::clone(&orchestrator);
        thread::spawn(move || orchestrator.rebuild_all().unwrap())
    };

    // 最初の再構築が確実に走り出すまで待つ
    while !orchestrator.is_rebuilding() {
        thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(
        orchestrator.rebuild_all().unwrap(),
        RebuildOutcome::AlreadyRunning,
        "実行中の再構築があれば2本目はno-op"
    );

    let outcome = background.join().unwrap();
    assert!(matches!(outcome, RebuildOutcome::Completed(_)));
    assert_eq!(index.list_non_zero(), vec![("button".to_string(), 30)]);

    // 終わった後は再び実行できる
    assert!(matches!(
        orchestrator.rebuild_all().unwrap(),
        RebuildOutcome::Completed(_)
    ));
}

// ============================================================
// 3. ストア到達不能
// ============================================================

#[test]
fn test_store_outage_preserves_previous_state() {
    let store = Arc::new(MemoryDocumentStore::new());
    store.insert(published(1, r#"[{"widgetType":"button"}]"#));

    let (index, orchestrator) = setup(Arc::clone(&store));
    orchestrator.rebuild_all().unwrap();
    let before = index.snapshot();

    store.set_unavailable(true);
    assert!(orchestrator.rebuild_all().is_err(), "到達不能は操作を中止する");
    assert!(orchestrator.document_saved(DocumentId(1)).is_err());
    assert_eq!(index.snapshot(), before, "コミット済みの状態は無傷で残る");

    store.set_unavailable(false);
    assert!(matches!(
        orchestrator.rebuild_all().unwrap(),
        RebuildOutcome::Completed(_)
    ));
}
