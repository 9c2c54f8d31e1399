pub mod fanout;
pub mod pipeline;

pub use fanout::{FanOutConfig, FanOutReport, FanOutScheduler, TaskFailure};
pub use pipeline::{DiscoveryPipeline, NeedProfile, PostAnalysis};
