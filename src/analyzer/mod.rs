pub mod extractor;
pub mod walker;
pub mod widgets;

pub use extractor::UsageExtractor;
pub use walker::{TreeWalker, DEFAULT_MAX_DEPTH, DEFAULT_MAX_VISITS};
pub use widgets::is_builtin_widget;
