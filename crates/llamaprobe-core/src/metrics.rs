use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Seconds from request start to the end of the stream.
    pub total_time: f64,
    /// Seconds from request start to the first fragment; 0 when nothing arrived.
    pub time_to_first_token: f64,
    /// Whitespace-delimited words, counted per fragment.
    pub total_tokens: u64,
    pub tokens_per_second: f64,
    pub response_length_chars: u64,
    #[serde(default)]
    pub average_word_length: f64,
}

impl RunMetrics {
    pub fn compute(
        total_time: f64,
        time_to_first_token: f64,
        total_tokens: u64,
        response: &str,
    ) -> Self {
        let response_length_chars = response.chars().count() as u64;

        let tokens_per_second = if total_time > 0.0 {
            total_tokens as f64 / total_time
        } else {
            0.0
        };

        let average_word_length = response_length_chars as f64 / total_tokens.max(1) as f64;

        Self {
            total_time,
            time_to_first_token,
            total_tokens,
            tokens_per_second,
            response_length_chars,
            average_word_length,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_per_second() {
        let m = RunMetrics::compute(4.0, 0.5, 10, "a b c d e f g h i j");
        assert_eq!(m.tokens_per_second, 10.0 / 4.0);
    }

    #[test]
    fn test_zero_total_time_gives_zero_tps() {
        let m = RunMetrics::compute(0.0, 0.0, 12, "words");
        assert_eq!(m.tokens_per_second, 0.0);
    }

    #[test]
    fn test_average_word_length() {
        let m = RunMetrics::compute(1.0, 0.1, 2, "hello world");
        assert_eq!(m.response_length_chars, 11);
        assert_eq!(m.average_word_length, 5.5);
    }

    #[test]
    fn test_average_word_length_without_tokens() {
        let m = RunMetrics::compute(1.0, 0.1, 0, "   \n ");
        assert_eq!(m.response_length_chars, 5);
        assert_eq!(m.average_word_length, 5.0);
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        let m = RunMetrics::compute(1.0, 0.1, 1, "héllo");
        assert_eq!(m.response_length_chars, 5);
    }

    #[test]
    fn test_missing_average_word_length_defaults() {
        let json = r#"{
            "total_time": 2.0,
            "time_to_first_token": 0.3,
            "total_tokens": 40,
            "tokens_per_second": 20.0,
            "response_length_chars": 200
        }"#;
        let m: RunMetrics = serde_json::from_str(json).unwrap();
        assert_eq!(m.total_tokens, 40);
        assert_eq!(m.average_word_length, 0.0);
    }
}
