//! usage-tracker.json の設定

use std::fs;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;

use crate::analyzer::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_VISITS};

/// トラッカー全体の設定
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerConfig {
    /// 対象ドキュメントファイルのglobパターン（空の場合は全ファイル対象）
    #[serde(default)]
    pub include: Vec<String>,
    /// 除外対象のglobパターン
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// 全面再構築のバッチサイズ
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// 定期再構築の間隔（秒）
    #[serde(default = "default_rebuild_interval")]
    pub rebuild_interval_secs: u64,
    /// インデックススナップショットの永続化を有効にする（デフォルト: false）
    #[serde(default)]
    pub cache: bool,
    /// ツリー走査の最大深さ
    #[serde(default = "default_max_depth")]
    pub max_tree_depth: usize,
    /// ツリー走査の最大訪問ノード数
    #[serde(default = "default_max_visits")]
    pub max_node_visits: usize,
    /// クエリ要求に要求する共有トークン（未設定ならチェックなし）
    #[serde(default)]
    pub nonce: Option<String>,
}

fn default_exclude() -> Vec<String> {
    vec![
        "**/.*".to_string(),
        "**/.*/**".to_string(),
        "**/node_modules/**".to_string(),
    ]
}

fn default_batch_size() -> usize {
    50
}

fn default_rebuild_interval() -> u64 {
    3600
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_max_visits() -> usize {
    DEFAULT_MAX_VISITS
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: default_exclude(),
            batch_size: default_batch_size(),
            rebuild_interval_secs: default_rebuild_interval(),
            cache: false,
            max_tree_depth: default_max_depth(),
            max_node_visits: default_max_visits(),
            nonce: None,
        }
    }
}

impl TrackerConfig {
    /// 指定ディレクトリから usage-tracker.json を読み込む
    pub fn load_from_dir(dir: &Path) -> Self {
        Self::load_from_path(&dir.join("usage-tracker.json"))
    }

    /// 指定パスから設定を読み込む。失敗時は警告してデフォルト
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// DocumentMatcherを作成
    pub fn document_matcher(&self) -> Result<DocumentMatcher, String> {
        DocumentMatcher::new(&self.include, &self.exclude)
    }
}

/// ドキュメントファイルのパスマッチング
#[derive(Debug, Clone)]
pub struct DocumentMatcher {
    include: Option<GlobSet>,
    exclude: GlobSet,
}

impl DocumentMatcher {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, String> {
        let include_set = if include.is_empty() {
            None
        } else {
            Some(Self::build_set(include, "include")?)
        };
        let exclude_set = Self::build_set(exclude, "exclude")?;

        Ok(Self {
            include: include_set,
            exclude: exclude_set,
        })
    }

    fn build_set(patterns: &[String], label: &str) -> Result<GlobSet, String> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| format!("Invalid {} pattern '{}': {}", label, pattern, e))?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| format!("Failed to build {} set: {}", label, e))
    }

    /// ドキュメントファイルとして読むべきかどうか
    pub fn should_include(&self, relative_path: &Path) -> bool {
        if self.exclude.is_match(relative_path) {
            return false;
        }
        match &self.include {
            Some(include_set) => include_set.is_match(relative_path),
            None => true,
        }
    }

    /// ディレクトリを降りるべきかどうか（excludeのみチェック）
    pub fn should_descend(&self, relative_path: &Path) -> bool {
        !self.exclude.is_match(relative_path)
    }
}

impl Default for DocumentMatcher {
    fn default() -> Self {
        DocumentMatcher::new(&[], &default_exclude()).expect("default globs are valid")
    }
}
