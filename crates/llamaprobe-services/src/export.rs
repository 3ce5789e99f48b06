use std::fs::File;
use std::io::Write;
use std::path::Path;

use llamaprobe_core::{Result, TestResult};
use tracing::info;

pub const CSV_HEADER: [&str; 11] = [
    "Timestamp",
    "Model",
    "Query",
    "Response",
    "Total_Time",
    "Time_to_First_Token",
    "Total_Tokens",
    "Tokens_per_Second",
    "Response_Length",
    "Performance_Rating",
    "Performance_Score",
];

/// Writes the header plus one row per result; returns the number of data rows.
pub fn write_csv<W: Write>(results: &[TestResult], writer: W) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;

    for r in results {
        csv.write_record([
            r.timestamp.clone(),
            r.model_name.clone(),
            r.query.clone(),
            r.response.clone(),
            decimal(r.metrics.total_time),
            decimal(r.metrics.time_to_first_token),
            r.metrics.total_tokens.to_string(),
            decimal(r.metrics.tokens_per_second),
            r.metrics.response_length_chars.to_string(),
            r.performance.rating.label().to_string(),
            decimal(r.performance.performance_score),
        ])?;
    }

    csv.flush()?;
    Ok(results.len())
}

/// Floats always carry a decimal point (`2.0`, not `2`).
fn decimal(v: f64) -> String {
    format!("{:?}", v)
}

pub fn export_csv(results: &[TestResult], path: &Path) -> Result<usize> {
    let file = File::create(path)?;
    let rows = write_csv(results, file)?;
    info!(rows, "Exported results to {:?}", path);
    Ok(rows)
}
