use std::fmt;

use serde::{Deserialize, Serialize};

/// ドキュメントの識別子（ストア側で採番される）
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct DocumentId(pub u64);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for DocumentId {
    fn from(raw: u64) -> Self {
        DocumentId(raw)
    }
}

/// ドキュメントの公開状態
///
/// ストア側が将来追加する未知の状態は `Unknown` に落ち、公開扱いにはしない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DocumentStatus {
    Published,
    Draft,
    Trash,
    Unknown,
}

impl DocumentStatus {
    pub fn is_published(&self) -> bool {
        matches!(self, DocumentStatus::Published)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Published => "publish",
            DocumentStatus::Draft => "draft",
            DocumentStatus::Trash => "trash",
            DocumentStatus::Unknown => "unknown",
        }
    }
}

impl From<String> for DocumentStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "publish" => DocumentStatus::Published,
            "draft" => DocumentStatus::Draft,
            "trash" => DocumentStatus::Trash,
            _ => DocumentStatus::Unknown,
        }
    }
}

impl From<DocumentStatus> for String {
    fn from(status: DocumentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl Default for DocumentStatus {
    fn default() -> Self {
        DocumentStatus::Published
    }
}

/// ドキュメントの種別
///
/// リビジョンや自動保存はメタデータ上の影コピーであり、
/// インデックスに入れてはならない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Regular,
    Revision,
    Autosave,
}

impl DocumentKind {
    /// 影コピー（リビジョン・自動保存）かどうか
    pub fn is_shadow(&self) -> bool {
        matches!(self, DocumentKind::Revision | DocumentKind::Autosave)
    }
}

impl Default for DocumentKind {
    fn default() -> Self {
        DocumentKind::Regular
    }
}

/// レイアウトブロブ
///
/// ストアによっては生のJSON文字列のまま、またはパース済みツリーで保持される。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LayoutBlob {
    Raw(String),
    Tree(serde_json::Value),
}

impl LayoutBlob {
    /// 中身が空（空文字列・空配列）かどうか
    pub fn is_empty(&self) -> bool {
        match self {
            LayoutBlob::Raw(s) => s.trim().is_empty(),
            LayoutBlob::Tree(v) => match v {
                serde_json::Value::Array(items) => items.is_empty(),
                serde_json::Value::Null => true,
                _ => false,
            },
        }
    }
}

/// ドキュメント1件分のレコード
///
/// ストアが所有・更新する。コアは読み取りと変更通知への反応のみ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default)]
    pub kind: DocumentKind,
    #[serde(default)]
    pub layout: Option<LayoutBlob>,
}

impl DocumentRecord {
    /// インデックス対象かどうか（公開済み・通常ドキュメント・レイアウトあり）
    pub fn is_eligible(&self) -> bool {
        self.status.is_published() && !self.kind.is_shadow() && self.has_layout()
    }

    pub fn has_layout(&self) -> bool {
        self.layout.as_ref().is_some_and(|blob| !blob.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        let status: DocumentStatus = serde_json::from_str("\"publish\"").unwrap();
        assert!(status.is_published());
        let status: DocumentStatus = serde_json::from_str("\"draft\"").unwrap();
        assert!(!status.is_published());
    }

    #[test]
    fn test_unknown_status_is_not_published() {
        let status: DocumentStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(status, DocumentStatus::Unknown);
        assert!(!status.is_published());
    }

    #[test]
    fn test_record_defaults() {
        let record: DocumentRecord = serde_json::from_str(r#"{"id": 7}"#).unwrap();
        assert_eq!(record.id, DocumentId(7));
        assert_eq!(record.status, DocumentStatus::Published);
        assert_eq!(record.kind, DocumentKind::Regular);
        assert!(!record.is_eligible(), "レイアウトがなければ対象外");
    }

    #[test]
    fn test_revision_is_shadow() {
        let record: DocumentRecord =
            serde_json::from_str(r#"{"id": 7, "kind": "revision", "layout": []}"#).unwrap();
        assert!(record.kind.is_shadow());
        assert!(!record.is_eligible());
    }

    #[test]
    fn test_layout_blob_untagged() {
        let raw: LayoutBlob = serde_json::from_str(r#""[{\"widgetType\":\"button\"}]""#).unwrap();
        assert!(matches!(raw, LayoutBlob::Raw(_)));
        let tree: LayoutBlob = serde_json::from_str(r#"[{"widgetType":"button"}]"#).unwrap();
        assert!(matches!(tree, LayoutBlob::Tree(_)));
        assert!(!tree.is_empty());
        let empty: LayoutBlob = serde_json::from_str(r#""  ""#).unwrap();
        assert!(empty.is_empty());
    }
}
