use std::time::Instant;

use crate::RunMetrics;

/// Accumulates streamed fragments into a response and its timing metrics.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    start: Instant,
    first_fragment: Option<Instant>,
    total_tokens: u64,
    fragments: usize,
    response: String,
}

/// Output of a fully consumed stream.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedRun {
    pub response: String,
    pub metrics: RunMetrics,
}

impl MetricsCollector {
    pub fn start() -> Self {
        Self::started_at(Instant::now())
    }

    pub fn started_at(start: Instant) -> Self {
        Self {
            start,
            first_fragment: None,
            total_tokens: 0,
            fragments: 0,
            response: String::new(),
        }
    }

    pub fn record_at(&mut self, fragment: &str, at: Instant) {
        self.first_fragment.get_or_insert(at);
        self.fragments += 1;
        // Counted per fragment, so a word split across two fragments counts twice.
        self.total_tokens += fragment.split_whitespace().count() as u64;
        self.response.push_str(fragment);
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    pub fn finish(self) -> CollectedRun {
        self.finish_at(Instant::now())
    }

    pub fn finish_at(self, end: Instant) -> CollectedRun {
        let total_time = end.saturating_duration_since(self.start).as_secs_f64();
        let time_to_first_token = self
            .first_fragment
            .map(|t| t.saturating_duration_since(self.start).as_secs_f64())
            .unwrap_or(0.0);

        let metrics = RunMetrics::compute(
            total_time,
            time_to_first_token,
            self.total_tokens,
            &self.response,
        );

        CollectedRun {
            response: self.response,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_empty_stream_reports_zero_ttft() {
        let start = Instant::now();
        let run = MetricsCollector::started_at(start).finish_at(start + Duration::from_secs(2));

        assert_eq!(run.metrics.time_to_first_token, 0.0);
        assert_eq!(run.metrics.total_tokens, 0);
        assert_eq!(run.metrics.tokens_per_second, 0.0);
        assert_eq!(run.metrics.total_time, 2.0);
        assert!(run.response.is_empty());
    }

    #[test]
    fn test_first_fragment_timing() {
        let start = Instant::now();
        let mut c = MetricsCollector::started_at(start);
        c.record_at("Quantum", start + Duration::from_millis(500));
        c.record_at(" computing uses", start + Duration::from_millis(700));
        c.record_at(" qubits.", start + Duration::from_millis(900));
        let run = c.finish_at(start + Duration::from_secs(1));

        assert_eq!(run.metrics.time_to_first_token, 0.5);
        assert_eq!(run.metrics.total_time, 1.0);
        assert_eq!(run.metrics.total_tokens, 4);
        assert_eq!(run.metrics.tokens_per_second, 4.0);
        assert_eq!(run.response, "Quantum computing uses qubits.");
    }

    #[test]
    fn test_word_count_is_per_fragment() {
        let start = Instant::now();
        let mut c = MetricsCollector::started_at(start);
        c.record_at("hel", start);
        c.record_at("lo world", start);
        assert_eq!(c.fragments(), 2);
        let run = c.finish_at(start + Duration::from_secs(1));

        // "hello world" is two words, but the split fragment counts as three.
        assert_eq!(run.response, "hello world");
        assert_eq!(run.metrics.total_tokens, 3);
    }

    #[test]
    fn test_whitespace_only_fragments() {
        let start = Instant::now();
        let mut c = MetricsCollector::started_at(start);
        c.record_at("\n\n", start + Duration::from_millis(100));
        let run = c.finish_at(start + Duration::from_millis(200));

        assert_eq!(run.metrics.total_tokens, 0);
        assert_eq!(run.metrics.response_length_chars, 2);
        assert_eq!(run.metrics.average_word_length, 2.0);
        assert!(run.metrics.time_to_first_token > 0.0);
    }
}
