use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::DocumentId;

/// Cache format version
pub const CACHE_VERSION: u32 = 1;

/// Cache metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub version: u32,
    pub tool_version: String,
    pub documents: HashMap<DocumentId, DocumentFingerprint>,
}

/// Document fingerprint for cache validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub mtime: u64,
    pub size: u64,
}

impl CacheMetadata {
    pub fn new() -> Self {
        Self {
            version: CACHE_VERSION,
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            documents: HashMap::new(),
        }
    }

    pub fn is_compatible(&self) -> bool {
        self.version == CACHE_VERSION && self.tool_version == env!("CARGO_PKG_VERSION")
    }
}

impl Default for CacheMetadata {
    fn default() -> Self {
        Self::new()
    }
}
