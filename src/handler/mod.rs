mod counts;
mod usages;

pub use counts::CountsHandler;
pub use usages::UsagesHandler;
