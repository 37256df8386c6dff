pub mod error;
pub mod loader;
pub mod metadata;
pub mod schema;
pub mod writer;

pub use error::CacheError;
pub use loader::{CacheLoader, CacheValidation};
pub use metadata::{CacheMetadata, DocumentFingerprint, CACHE_VERSION};
pub use writer::CacheWriter;
