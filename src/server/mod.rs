pub mod protocol;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::analyzer::UsageExtractor;
use crate::cache::{CacheError, CacheLoader, CacheWriter};
use crate::config::TrackerConfig;
use crate::error::ServerError;
use crate::handler::{CountsHandler, UsagesHandler};
use crate::index::UsageIndex;
use crate::model::DocumentId;
use crate::reindex::{RebuildOutcome, ReindexOrchestrator};
use crate::store::DocumentStore;
use crate::util::sanitize_widget_param;

use protocol::{Request, Response};

/// インデックスデーモン本体
///
/// ストアと設定を受け取り、インデックス・オーケストレータ・クエリ
/// ハンドラを束ねる。要求の認可とパラメータのサニタイズはこの境界層が
/// 行い、コアには検証済みの値だけが渡る。
pub struct Backend {
    config: TrackerConfig,
    index: Arc<UsageIndex>,
    store: Arc<dyn DocumentStore>,
    orchestrator: Arc<ReindexOrchestrator>,
    counts_handler: CountsHandler,
    usages_handler: UsagesHandler,
    /// キャッシュディレクトリを置くルート
    state_root: PathBuf,
    /// キャッシュ復元済みなら起動直後の定期再構築を1回スキップする
    skip_first_tick: Arc<AtomicBool>,
}

/// 現在のインデックスをスナップショットとして保存する（失敗は警告のみ）
fn persist_cache(store: &dyn DocumentStore, index: &UsageIndex, state_root: &Path) {
    let fingerprints = match store.fingerprints() {
        Ok(Some(fingerprints)) => fingerprints,
        Ok(None) => return,
        Err(e) => {
            warn!("Cannot fingerprint documents for cache: {}", e);
            return;
        }
    };
    if let Err(e) = CacheWriter::new(state_root).save_full(index, &fingerprints) {
        warn!("Failed to save usage cache: {}", e);
    }
}

/// キャッシュからインデックスを復元し、不足分だけ個別に追い付く
///
/// 復元できたら `true`。キャッシュ不在・不適合は失敗ではなく、
/// 最初の定期tickの全面再構築に任せる。
fn restore_from_cache(
    store: &dyn DocumentStore,
    index: &UsageIndex,
    orchestrator: &ReindexOrchestrator,
    state_root: &Path,
) -> Result<bool, ServerError> {
    let Some(fingerprints) = store.fingerprints()? else {
        debug!("Store provides no fingerprints, skipping cache");
        return Ok(false);
    };

    let loader = CacheLoader::new(state_root);
    let validation = match loader.validate(&fingerprints) {
        Ok(validation) => validation,
        Err(CacheError::NotFound) => {
            debug!("No usage cache found");
            return Ok(false);
        }
        Err(e) => {
            warn!("Usage cache unusable: {}", e);
            return Ok(false);
        }
    };

    let loaded = loader.load(index, &validation.valid)?;

    // キャッシュに無かった・無効だった分だけ再抽出する
    let mut caught_up = 0;
    for id in store.list_eligible()? {
        if !loaded.contains(&id) {
            orchestrator.document_saved(id)?;
            caught_up += 1;
        }
    }
    info!(
        "Restored {} documents from cache, re-extracted {}",
        loaded.len(),
        caught_up
    );

    if caught_up > 0 {
        persist_cache(store, index, state_root);
    }
    Ok(true)
}

impl Backend {
    pub fn new(
        config: TrackerConfig,
        store: Arc<dyn DocumentStore>,
        state_root: impl Into<PathBuf>,
    ) -> Self {
        let index = Arc::new(UsageIndex::new());
        let extractor = UsageExtractor::new(config.max_tree_depth, config.max_node_visits);
        let orchestrator = Arc::new(ReindexOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&index),
            extractor,
            config.batch_size,
        ));

        Self {
            counts_handler: CountsHandler::new(Arc::clone(&index)),
            usages_handler: UsagesHandler::new(Arc::clone(&index), Arc::clone(&store)),
            config,
            index,
            store,
            orchestrator,
            state_root: state_root.into(),
            skip_first_tick: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn index(&self) -> &Arc<UsageIndex> {
        &self.index
    }

    pub fn orchestrator(&self) -> &Arc<ReindexOrchestrator> {
        &self.orchestrator
    }

    /// 起動時の初期化：キャッシュが使えればそこから復元する
    pub async fn initialize(&self) {
        if !self.config.cache {
            return;
        }

        let store = Arc::clone(&self.store);
        let index = Arc::clone(&self.index);
        let orchestrator = Arc::clone(&self.orchestrator);
        let state_root = self.state_root.clone();

        let result = tokio::task::spawn_blocking(move || {
            restore_from_cache(&*store, &index, &orchestrator, &state_root)
        })
        .await;

        match result {
            Ok(Ok(true)) => {
                self.skip_first_tick.store(true, Ordering::SeqCst);
            }
            Ok(Ok(false)) => {}
            Ok(Err(e)) => warn!("Cache restore failed, scheduler will rebuild: {}", e),
            Err(e) => warn!("Initialization task failed: {}", e),
        }
    }

    /// 定期再構築タスクを起動する。最初のtickは起動直後に発火する
    pub fn spawn_scheduler(&self) -> tokio::task::JoinHandle<()> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let skip_first_tick = Arc::clone(&self.skip_first_tick);
        let store = Arc::clone(&self.store);
        let index = Arc::clone(&self.index);
        let state_root = self.state_root.clone();
        let cache_enabled = self.config.cache;
        let interval = Duration::from_secs(self.config.rebuild_interval_secs.max(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;

                if skip_first_tick.swap(false, Ordering::SeqCst) {
                    debug!("Index restored from cache, skipping immediate rebuild");
                    continue;
                }

                let orch = Arc::clone(&orchestrator);
                let result = tokio::task::spawn_blocking(move || orch.rebuild_all()).await;
                match result {
                    Ok(Ok(RebuildOutcome::Completed(summary))) => {
                        info!(
                            "Scheduled rebuild done: {} indexed, {} warnings",
                            summary.indexed, summary.warnings
                        );
                        if cache_enabled {
                            let store = Arc::clone(&store);
                            let index = Arc::clone(&index);
                            let state_root = state_root.clone();
                            let persisted = tokio::task::spawn_blocking(move || {
                                persist_cache(&*store, &index, &state_root)
                            })
                            .await;
                            if let Err(e) = persisted {
                                warn!("Cache persistence task failed: {}", e);
                            }
                        }
                    }
                    Ok(Ok(RebuildOutcome::AlreadyRunning)) => {
                        debug!("Scheduled rebuild skipped, one already in flight");
                    }
                    Ok(Err(e)) => warn!("Scheduled rebuild failed: {}", e),
                    Err(e) => warn!("Rebuild task failed: {}", e),
                }
            }
        })
    }

    fn check_nonce(&self, provided: Option<&str>) -> bool {
        match self.config.nonce.as_deref() {
            Some(expected) => provided == Some(expected),
            None => true,
        }
    }

    /// 手動トリガーの全面再構築（ブロッキングプールで実行）
    async fn run_rebuild(&self) -> Response {
        let orchestrator = Arc::clone(&self.orchestrator);
        let result = tokio::task::spawn_blocking(move || orchestrator.rebuild_all()).await;

        match result {
            Ok(Ok(RebuildOutcome::Completed(summary))) => {
                if self.config.cache {
                    let store = Arc::clone(&self.store);
                    let index = Arc::clone(&self.index);
                    let state_root = self.state_root.clone();
                    let persisted = tokio::task::spawn_blocking(move || {
                        persist_cache(&*store, &index, &state_root)
                    })
                    .await;
                    if let Err(e) = persisted {
                        warn!("Cache persistence task failed: {}", e);
                    }
                }
                Response::Rebuilt {
                    summary: Some(summary),
                    already_running: false,
                }
            }
            Ok(Ok(RebuildOutcome::AlreadyRunning)) => Response::Rebuilt {
                summary: None,
                already_running: true,
            },
            Ok(Err(e)) => Response::Error {
                message: e.to_string(),
            },
            Err(e) => Response::Error {
                message: format!("rebuild task failed: {}", e),
            },
        }
    }

    /// 1要求を処理する。`None` はシャットダウン
    pub async fn handle(&self, request: Request) -> Option<Response> {
        match request {
            Request::GetCounts { nonce } => {
                if !self.check_nonce(nonce.as_deref()) {
                    return Some(Response::Error {
                        message: "invalid nonce".to_string(),
                    });
                }
                Some(Response::Counts {
                    counts: self.counts_handler.get_counts(),
                })
            }

            Request::GetUsages { widget, nonce } => {
                if !self.check_nonce(nonce.as_deref()) {
                    return Some(Response::Error {
                        message: "invalid nonce".to_string(),
                    });
                }
                let Some(widget) = sanitize_widget_param(&widget) else {
                    return Some(Response::Error {
                        message: "invalid widget parameter".to_string(),
                    });
                };
                match self.usages_handler.get_usages(&widget) {
                    Ok(usages) => Some(Response::Usages { widget, usages }),
                    Err(e) => Some(Response::Error {
                        message: e.to_string(),
                    }),
                }
            }

            // 保存イベントは1ドキュメント分に収まるのでインラインで処理し、
            // 応答を返す時点で反映済みであることを保証する
            Request::DocumentSaved { id } => {
                match self.orchestrator.document_saved(DocumentId(id)) {
                    Ok(outcome) => Some(Response::Saved {
                        outcome: outcome.as_str(),
                    }),
                    Err(e) => Some(Response::Error {
                        message: e.to_string(),
                    }),
                }
            }

            Request::DocumentRemoved { id } => {
                self.orchestrator.document_removed(DocumentId(id));
                Some(Response::Removed)
            }

            Request::Rebuild => Some(self.run_rebuild().await),

            Request::Shutdown => None,
        }
    }

    /// 行区切りJSONで要求を読み、応答を書き出す
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<Request>(line) {
                Ok(request) => match self.handle(request).await {
                    Some(response) => response,
                    None => {
                        Self::write_response(&mut writer, &Response::ShuttingDown).await?;
                        info!("Shutdown requested");
                        break;
                    }
                },
                Err(e) => Response::Error {
                    message: format!("invalid request: {}", e),
                },
            };
            Self::write_response(&mut writer, &response).await?;
        }

        Ok(())
    }

    async fn write_response<W>(writer: &mut W, response: &Response) -> std::io::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut json = serde_json::to_string(response).unwrap_or_else(|e| {
            error!("Failed to serialize response: {}", e);
            r#"{"result":"error","message":"internal serialization failure"}"#.to_string()
        });
        json.push('\n');
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await
    }
}
