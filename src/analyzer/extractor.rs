//! ドキュメント1件分の使用状況抽出

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::error::AnalyzerError;
use crate::model::{DocumentId, DocumentUsage, LayoutBlob};

use super::walker::{TreeWalker, DEFAULT_MAX_DEPTH, DEFAULT_MAX_VISITS};

/// レイアウトブロブからウィジェット出現回数を抽出する
///
/// 副作用なし。ブロブが無い・空なら空の使用状況、パース不能なら
/// `AnalyzerError::Parse`（呼び出し側でログして続行する非致命エラー）。
#[derive(Debug, Clone)]
pub struct UsageExtractor {
    max_depth: usize,
    max_visits: usize,
}

impl UsageExtractor {
    pub fn new(max_depth: usize, max_visits: usize) -> Self {
        Self {
            max_depth,
            max_visits,
        }
    }

    pub fn extract(
        &self,
        id: DocumentId,
        blob: Option<&LayoutBlob>,
    ) -> Result<DocumentUsage, AnalyzerError> {
        let Some(blob) = blob else {
            return Ok(DocumentUsage::empty(id));
        };
        if blob.is_empty() {
            return Ok(DocumentUsage::empty(id));
        }

        match blob {
            LayoutBlob::Raw(raw) => {
                let tree: Value = serde_json::from_str(raw)
                    .map_err(|e| AnalyzerError::Parse(format!("document {}: {}", id, e)))?;
                self.extract_tree(id, &tree)
            }
            LayoutBlob::Tree(tree) => self.extract_tree(id, tree),
        }
    }

    fn extract_tree(&self, id: DocumentId, tree: &Value) -> Result<DocumentUsage, AnalyzerError> {
        let mut counts: HashMap<String, u32> = HashMap::new();

        for item in TreeWalker::with_limits(tree, self.max_depth, self.max_visits) {
            let (widget_type, _depth) = item?;
            *counts.entry(widget_type).or_insert(0) += 1;
        }

        debug!(
            "extracted {} widget types from document {}",
            counts.len(),
            id
        );
        Ok(DocumentUsage { id, counts })
    }
}

impl Default for UsageExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, DEFAULT_MAX_VISITS)
    }
}
