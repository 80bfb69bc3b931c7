pub mod metrics;
pub mod write_back;

pub use metrics::{CacheMetrics, OperationStats};
pub use write_back::{BackgroundWriter, WriteBackConfig};
