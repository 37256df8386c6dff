use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use widget_usage_tracker::config::TrackerConfig;
use widget_usage_tracker::server::Backend;
use widget_usage_tracker::store::FsDocumentStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let config = TrackerConfig::load_from_dir(&root);
    let matcher = match config.document_matcher() {
        Ok(matcher) => matcher,
        Err(e) => {
            tracing::warn!("Invalid glob configuration ({}), using defaults", e);
            Default::default()
        }
    };

    let store = Arc::new(FsDocumentStore::with_matcher(&root, matcher));
    let backend = Arc::new(Backend::new(config, store, &root));

    backend.initialize().await;
    let scheduler = backend.spawn_scheduler();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();
    if let Err(e) = Arc::clone(&backend).serve(stdin, stdout).await {
        tracing::error!("Server IO error: {}", e);
    }

    scheduler.abort();
}
