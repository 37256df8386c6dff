use std::sync::Arc;

use crate::analyzer::is_builtin_widget;
use crate::index::UsageIndex;
use crate::model::UsageCount;

/// 使用回数一覧クエリ
///
/// count > 0 のウィジェット種別のみを種別の昇順で返す。
pub struct CountsHandler {
    index: Arc<UsageIndex>,
}

impl CountsHandler {
    pub fn new(index: Arc<UsageIndex>) -> Self {
        Self { index }
    }

    pub fn get_counts(&self) -> Vec<UsageCount> {
        self.index
            .list_non_zero()
            .into_iter()
            .map(|(widget_type, count)| UsageCount {
                builtin: is_builtin_widget(&widget_type),
                widget_type,
                count,
            })
            .collect()
    }
}
