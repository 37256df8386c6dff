//! コア同梱ウィジェットの定義

use phf::phf_set;

/// ページビルダーにコアとして同梱されるウィジェット種別（O(1)ルックアップ）
static BUILTIN_WIDGET_SET: phf::Set<&'static str> = phf_set! {
    // 基本
    "heading", "image", "text-editor", "video", "button",
    "divider", "spacer", "google-maps", "icon",
    // 汎用
    "image-box", "icon-box", "star-rating", "image-carousel",
    "image-gallery", "icon-list", "counter", "progress",
    "testimonial", "tabs", "accordion", "toggle", "social-icons",
    "alert", "audio", "shortcode", "html", "menu-anchor",
    "sidebar", "read-more", "text-path",
    // サイト
    "theme-post-title", "theme-post-content", "theme-post-featured-image",
    "theme-site-logo", "theme-site-title", "nav-menu", "search-form",
    // 埋め込み
    "blockquote", "facebook-button", "facebook-comments",
    "facebook-embed", "facebook-page",
};

/// コア同梱ウィジェットかどうか
pub fn is_builtin_widget(widget_type: &str) -> bool {
    BUILTIN_WIDGET_SET.contains(widget_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        assert!(is_builtin_widget("heading"));
        assert!(is_builtin_widget("button"));
        assert!(!is_builtin_widget("my-custom-widget"));
        assert!(!is_builtin_widget(""));
    }
}
