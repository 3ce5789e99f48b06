mod export;
mod store;
mod viewer;

pub use export::{export_csv, write_csv, CSV_HEADER};
pub use store::ResultStore;
pub use viewer::{
    compare_models, newest_first, response_preview, summarize, ModelComparison, ModelStats,
    RatingCount, ResultSummary,
};

// Re-export core types so the CLI can depend on services alone for history work
pub use llamaprobe_core::{PerformanceRating, ResultLog, TestResult};
