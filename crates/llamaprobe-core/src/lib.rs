pub mod collector;
pub mod config;
pub mod error;
pub mod metrics;
pub mod rating;
pub mod result;

pub use collector::{CollectedRun, MetricsCollector};
pub use config::{OllamaConfig, ProbeConfig, RunConfig, StorageConfig};
pub use error::{ProbeError, Result};
pub use metrics::RunMetrics;
pub use rating::{performance_score, rate, PerformanceRating};
pub use result::{Performance, ResultLog, TestResult};
