use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::{performance_score, rate, CollectedRun, PerformanceRating, RunMetrics};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Performance {
    pub rating: PerformanceRating,
    pub rating_stars: String,
    pub performance_score: f64,
}

impl Performance {
    pub fn from_metrics(metrics: &RunMetrics) -> Self {
        let rating = rate(metrics.tokens_per_second, metrics.time_to_first_token);
        Self {
            rating,
            rating_stars: rating.star_string(),
            performance_score: performance_score(
                metrics.tokens_per_second,
                metrics.time_to_first_token,
            ),
        }
    }
}

/// One completed run. Written once, never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// RFC 3339 local time; string order is chronological.
    pub timestamp: String,
    pub model_name: String,
    #[serde(default)]
    pub host: String,
    pub query: String,
    pub response: String,
    pub metrics: RunMetrics,
    pub performance: Performance,
}

impl TestResult {
    pub fn new(
        timestamp: DateTime<Local>,
        model_name: impl Into<String>,
        host: impl Into<String>,
        query: impl Into<String>,
        run: CollectedRun,
    ) -> Self {
        let performance = Performance::from_metrics(&run.metrics);
        Self {
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Micros, false),
            model_name: model_name.into(),
            host: host.into(),
            query: query.into(),
            response: run.response,
            metrics: run.metrics,
            performance,
        }
    }

    pub fn rating(&self) -> PerformanceRating {
        self.performance.rating
    }

    /// `YYYY-MM-DD HH:MM:SS` for display.
    pub fn display_time(&self) -> String {
        self.timestamp.chars().take(19).collect::<String>().replace('T', " ")
    }
}

/// On-disk layout of the results file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultLog {
    #[serde(default)]
    pub test_results: Vec<TestResult>,
}

impl ResultLog {
    pub fn len(&self) -> usize {
        self.test_results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_results.is_empty()
    }

    pub fn push(&mut self, result: TestResult) {
        self.test_results.push(result);
    }

    pub fn results(&self) -> &[TestResult] {
        &self.test_results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_run() -> CollectedRun {
        CollectedRun {
            response: "Qubits can be zero and one at once.".to_string(),
            metrics: RunMetrics::compute(0.5, 0.1, 10, "Qubits can be zero and one at once."),
        }
    }

    #[test]
    fn test_new_derives_performance() {
        let ts = Local.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let result = TestResult::new(ts, "smollm2:135m", "http://localhost:11434", "q", sample_run());

        assert_eq!(result.metrics.tokens_per_second, 20.0);
        // 20 is not > 20, so this is one tier below Excellent.
        assert_eq!(result.rating(), PerformanceRating::VeryGood);
        assert_eq!(result.performance.rating_stars, "⭐⭐⭐⭐");
        assert!((result.performance.performance_score - (14.0 + 9.9 * 0.3)).abs() < 1e-9);
        assert!(result.timestamp.starts_with("2025-03-14T09:26:53"));
        assert_eq!(result.display_time(), "2025-03-14 09:26:53");
    }

    #[test]
    fn test_log_json_shape() {
        let ts = Local.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        let mut log = ResultLog::default();
        log.push(TestResult::new(ts, "m", "h", "q", sample_run()));

        let value = serde_json::to_value(&log).unwrap();
        let entry = &value["test_results"][0];
        assert_eq!(entry["model_name"], "m");
        assert_eq!(entry["metrics"]["total_tokens"], 10);
        assert_eq!(entry["performance"]["rating"], "Very Good");
        assert!(entry["performance"]["performance_score"].is_number());
    }

    #[test]
    fn test_legacy_entry_without_host_parses() {
        let json = r#"{"test_results": [{
            "timestamp": "2024-11-02T10:00:00.123456",
            "model_name": "smollm2:135m",
            "query": "hi",
            "response": "hello",
            "metrics": {"total_time": 1.0, "time_to_first_token": 0.2, "total_tokens": 1,
                        "tokens_per_second": 1.0, "response_length_chars": 5},
            "performance": {"rating": "Needs Improvement", "rating_stars": "⭐",
                            "performance_score": 3.1}
        }]}"#;
        let log: ResultLog = serde_json::from_str(json).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.results()[0].host, "");
        assert_eq!(log.results()[0].display_time(), "2024-11-02 10:00:00");
    }
}
