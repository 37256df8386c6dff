//! 行区切りJSONの要求・応答

use serde::{Deserialize, Serialize};

use crate::model::{UsageCount, UsageLocation};
use crate::reindex::RebuildSummary;

/// 受信する要求（1行に1つのJSONオブジェクト）
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Request {
    /// 使用回数一覧（要nonce）
    GetCounts {
        #[serde(default)]
        nonce: Option<String>,
    },
    /// 指定ウィジェットの使用箇所一覧（要nonce）
    GetUsages {
        widget: String,
        #[serde(default)]
        nonce: Option<String>,
    },
    /// ドキュメント保存通知（リビジョン・自動保存は送られない想定だが
    /// 送られても無視される）
    DocumentSaved { id: u64 },
    /// ドキュメント削除通知
    DocumentRemoved { id: u64 },
    /// 全面再構築の手動トリガー
    Rebuild,
    Shutdown,
}

/// 送信する応答
#[derive(Debug, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Response {
    Counts {
        counts: Vec<UsageCount>,
    },
    Usages {
        widget: String,
        usages: Vec<UsageLocation>,
    },
    Saved {
        outcome: &'static str,
    },
    Removed,
    Rebuilt {
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<RebuildSummary>,
        already_running: bool,
    },
    ShuttingDown,
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_counts() {
        let request: Request =
            serde_json::from_str(r#"{"action":"get_counts","nonce":"abc"}"#).unwrap();
        assert!(matches!(request, Request::GetCounts { nonce: Some(n) } if n == "abc"));
    }

    #[test]
    fn test_parse_get_usages_without_nonce() {
        let request: Request =
            serde_json::from_str(r#"{"action":"get_usages","widget":"button"}"#).unwrap();
        assert!(matches!(
            request,
            Request::GetUsages { widget, nonce: None } if widget == "button"
        ));
    }

    #[test]
    fn test_parse_document_saved() {
        let request: Request =
            serde_json::from_str(r#"{"action":"document_saved","id":42}"#).unwrap();
        assert!(matches!(request, Request::DocumentSaved { id: 42 }));
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        assert!(serde_json::from_str::<Request>(r#"{"action":"drop_tables"}"#).is_err());
    }

    #[test]
    fn test_counts_response_shape() {
        let response = Response::Counts {
            counts: vec![UsageCount {
                widget_type: "button".to_string(),
                count: 3,
                builtin: true,
            }],
        };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(
            json,
            r#"{"result":"counts","counts":[{"type":"button","count":3,"builtin":true}]}"#
        );
    }
}
