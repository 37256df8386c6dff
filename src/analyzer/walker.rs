//! レイアウトツリーの走査
//!
//! ページビルダーのレイアウトは任意の深さでネストしたコンポーネントツリー。
//! ソース側が非循環を保証しない前提で、深さと訪問ノード数に上限を設けて
//! 明示的なスタックで走査する（再帰は使わない）。

use serde_json::Value;

use crate::error::AnalyzerError;

/// 許容する最大ネスト深さ
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// 1ツリーあたりの最大訪問ノード数
pub const DEFAULT_MAX_VISITS: usize = 100_000;

/// ノードのウィジェット種別を保持するキー
const TYPE_KEY: &str = "widgetType";

/// 子ノード配列を保持するキー
const CHILDREN_KEY: &str = "elements";

/// ツリー全体を遅延走査するイテレータ
///
/// ルートを含む全ノードのうち、空でない種別を持つものについて
/// `(widget_type, depth)` を深さ優先で返す。上限超過時は
/// `AnalyzerError::MalformedTree` を1度だけ返して打ち切る。
pub struct TreeWalker<'a> {
    stack: Vec<(&'a Value, usize)>,
    visits: usize,
    max_depth: usize,
    max_visits: usize,
    aborted: bool,
}

impl<'a> TreeWalker<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self::with_limits(root, DEFAULT_MAX_DEPTH, DEFAULT_MAX_VISITS)
    }

    pub fn with_limits(root: &'a Value, max_depth: usize, max_visits: usize) -> Self {
        let mut stack = Vec::new();
        match root {
            // ドキュメントルートはノード配列
            Value::Array(items) => {
                for item in items.iter().rev() {
                    stack.push((item, 0));
                }
            }
            Value::Object(_) => stack.push((root, 0)),
            // それ以外の形は空ツリー扱い
            _ => {}
        }

        Self {
            stack,
            visits: 0,
            max_depth,
            max_visits,
            aborted: false,
        }
    }

    fn abort(&mut self, reason: String) -> Option<Result<(String, usize), AnalyzerError>> {
        self.aborted = true;
        self.stack.clear();
        Some(Err(AnalyzerError::MalformedTree(reason)))
    }
}

impl<'a> Iterator for TreeWalker<'a> {
    type Item = Result<(String, usize), AnalyzerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.aborted {
            return None;
        }

        while let Some((node, depth)) = self.stack.pop() {
            // オブジェクト以外の子はスキップ
            let Some(map) = node.as_object() else {
                continue;
            };

            self.visits += 1;
            if self.visits > self.max_visits {
                return self.abort(format!(
                    "node visit limit exceeded ({} nodes)",
                    self.max_visits
                ));
            }
            if depth > self.max_depth {
                return self.abort(format!(
                    "nesting depth {} exceeds limit {}",
                    depth, self.max_depth
                ));
            }

            // 子を積む（順序維持のため逆順push）
            // `elements` が配列以外でも走査全体は失敗させない
            if let Some(Value::Array(children)) = map.get(CHILDREN_KEY) {
                for child in children.iter().rev() {
                    self.stack.push((child, depth + 1));
                }
            }

            if let Some(ty) = map.get(TYPE_KEY).and_then(Value::as_str) {
                if !ty.is_empty() {
                    return Some(Ok((ty.to_string(), depth)));
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn walk_all(root: &Value) -> Result<Vec<(String, usize)>, AnalyzerError> {
        TreeWalker::new(root).collect()
    }

    /// 深さNのネストしたコンテナの末端にウィジェットを1つ置いたツリー
    fn nested_tree(levels: usize) -> Value {
        let mut node = json!({ "widgetType": "button" });
        for _ in 0..levels {
            node = json!({ "elements": [node] });
        }
        json!([node])
    }

    #[test]
    fn test_walks_nested_widgets_with_depth() {
        let tree = json!([
            {
                "elType": "section",
                "elements": [
                    { "widgetType": "heading" },
                    {
                        "elType": "column",
                        "elements": [ { "widgetType": "button" } ]
                    }
                ]
            },
            { "widgetType": "image" }
        ]);

        let result = walk_all(&tree).unwrap();
        assert_eq!(
            result,
            vec![
                ("heading".to_string(), 1),
                ("button".to_string(), 2),
                ("image".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_untyped_nodes_are_containers() {
        let tree = json!([ { "elements": [ { "widgetType": "video" } ] } ]);
        let result = walk_all(&tree).unwrap();
        assert_eq!(result, vec![("video".to_string(), 1)]);
    }

    #[test]
    fn test_empty_type_is_skipped() {
        let tree = json!([ { "widgetType": "" }, { "widgetType": "button" } ]);
        let result = walk_all(&tree).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_malformed_children_do_not_fail_walk() {
        let tree = json!([
            { "widgetType": "button", "elements": "not-an-array" },
            { "widgetType": "image", "elements": [ 42, "junk", null, { "widgetType": "video" } ] }
        ]);
        let result = walk_all(&tree).unwrap();
        let types: Vec<&str> = result.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(types, vec!["button", "image", "video"]);
    }

    #[test]
    fn test_non_object_root_is_empty() {
        assert!(walk_all(&json!("junk")).unwrap().is_empty());
        assert!(walk_all(&json!(null)).unwrap().is_empty());
    }

    #[test]
    fn test_depth_limit_raises_malformed_tree() {
        // 深さ70はデフォルト上限64を超える
        let tree = nested_tree(70);
        let err = walk_all(&tree).unwrap_err();
        assert!(matches!(err, AnalyzerError::MalformedTree(_)));
    }

    #[test]
    fn test_depth_within_limit_is_accepted() {
        let tree = nested_tree(DEFAULT_MAX_DEPTH);
        let result = walk_all(&tree).unwrap();
        assert_eq!(result, vec![("button".to_string(), DEFAULT_MAX_DEPTH)]);
    }

    #[test]
    fn test_visit_limit_raises_malformed_tree() {
        let children: Vec<Value> = (0..10).map(|_| json!({ "widgetType": "w" })).collect();
        let tree = json!([ { "elements": children } ]);
        let err: Result<Vec<_>, _> = TreeWalker::with_limits(&tree, 64, 5).collect();
        assert!(matches!(err.unwrap_err(), AnalyzerError::MalformedTree(_)));
    }

    #[test]
    fn test_walk_stops_after_abort() {
        let tree = nested_tree(70);
        let mut walker = TreeWalker::new(&tree);
        while let Some(item) = walker.next() {
            if item.is_err() {
                break;
            }
        }
        assert!(walker.next().is_none(), "打ち切り後は何も返さない");
    }
}
