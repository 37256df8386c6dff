use serde::{Deserialize, Serialize};

use crate::model::DocumentId;

/// Cached per-document usage data
///
/// The index is rebuilt from these rows by replaying upserts, so the
/// cache can never desynchronize the two derived tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedDocumentUsage {
    pub id: DocumentId,
    pub counts: Vec<(String, u32)>,
}
