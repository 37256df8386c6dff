mod document;
mod usage;

pub use document::{DocumentId, DocumentKind, DocumentRecord, DocumentStatus, LayoutBlob};
pub use usage::{DocumentUsage, UsageCount, UsageLocation};
