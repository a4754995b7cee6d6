pub mod statistics;
pub mod tracker;

pub use statistics::{RunningStats, Statistic};
pub use tracker::TrainingMetrics;
