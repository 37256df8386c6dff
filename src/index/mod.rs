mod store;

pub use store::{IndexTables, UsageIndex};
