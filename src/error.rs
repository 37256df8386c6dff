use thiserror::Error;

/// レイアウト解析エラー
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Malformed tree: {0}")]
    MalformedTree(String),
}

/// ドキュメントストア操作エラー
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// サーバー全体のエラー
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Cache error: {0}")]
    Cache(#[from] crate::cache::CacheError),
}
