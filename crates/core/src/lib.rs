pub mod aggregate;
pub mod bucket;
pub mod clock;
pub mod error;
pub mod query;
pub mod retention;
pub mod sample;
pub mod store;

pub use bucket::{day_bounds, BucketKey, BucketSummary};
pub use clock::{Clock, FixedClock, LocalClock};
pub use error::{MonitorError, Result};
pub use query::UsageService;
pub use retention::{Granularity, Lookback, RetentionPolicy};
pub use sample::Sample;
pub use store::{MemoryStore, SampleStore};
