/// ウィジェット種別パラメータの最大長
const MAX_WIDGET_PARAM_LEN: usize = 64;

/// クエリ境界でのウィジェット種別パラメータのサニタイズ
///
/// 前後の空白を落とし、英数字と `-` `_` のみ・64文字以内のものだけ通す。
/// コアに渡る前に境界層で必ず通すこと。
pub fn sanitize_widget_param(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_WIDGET_PARAM_LEN {
        return None;
    }
    let valid = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Some(trimmed.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("button", Some("button"))]
    #[case("  image-box  ", Some("image-box"))]
    #[case("my_widget2", Some("my_widget2"))]
    #[case("", None)]
    #[case("   ", None)]
    #[case("a b", None)]
    #[case("<script>", None)]
    #[case("type'; DROP TABLE--", None)]
    fn test_sanitize_widget_param(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(sanitize_widget_param(raw).as_deref(), expected);
    }

    #[test]
    fn test_sanitize_rejects_overlong_param() {
        let long = "w".repeat(65);
        assert!(sanitize_widget_param(&long).is_none());
        let ok = "w".repeat(64);
        assert!(sanitize_widget_param(&ok).is_some());
    }
}
