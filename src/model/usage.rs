use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::document::DocumentId;

/// 1ドキュメント分のウィジェット使用状況
///
/// `counts` はウィジェット種別ごとの出現回数。使用種別の集合は
/// `counts` のキー集合と常に一致する。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentUsage {
    pub id: DocumentId,
    pub counts: HashMap<String, u32>,
}

impl DocumentUsage {
    pub fn empty(id: DocumentId) -> Self {
        Self {
            id,
            counts: HashMap::new(),
        }
    }

    /// このドキュメントに現れるウィジェット種別
    pub fn widget_types(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// 全種別の出現回数合計
    pub fn total_occurrences(&self) -> u64 {
        self.counts.values().map(|&n| u64::from(n)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// 集計テーブルの1行（種別ごとの合計出現回数）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCount {
    #[serde(rename = "type")]
    pub widget_type: String,
    pub count: u64,
    /// コア同梱ウィジェットかどうか
    pub builtin: bool,
}

/// 使用箇所の1行（タイトルとパーマリンク相当のURL）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLocation {
    pub title: String,
    pub url: String,
}
