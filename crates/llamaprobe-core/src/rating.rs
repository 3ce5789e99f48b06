use serde::{Deserialize, Serialize};

/// Discrete performance tier derived from throughput and first-token latency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PerformanceRating {
    Excellent,
    #[serde(rename = "Very Good")]
    VeryGood,
    Good,
    Fair,
    #[serde(rename = "Needs Improvement")]
    NeedsImprovement,
}

impl PerformanceRating {
    pub fn label(&self) -> &'static str {
        match self {
            PerformanceRating::Excellent => "Excellent",
            PerformanceRating::VeryGood => "Very Good",
            PerformanceRating::Good => "Good",
            PerformanceRating::Fair => "Fair",
            PerformanceRating::NeedsImprovement => "Needs Improvement",
        }
    }

    pub fn stars(&self) -> u8 {
        match self {
            PerformanceRating::Excellent => 5,
            PerformanceRating::VeryGood => 4,
            PerformanceRating::Good => 3,
            PerformanceRating::Fair => 2,
            PerformanceRating::NeedsImprovement => 1,
        }
    }

    pub fn star_string(&self) -> String {
        "⭐".repeat(self.stars() as usize)
    }

    pub fn all() -> &'static [PerformanceRating] {
        &[
            PerformanceRating::Excellent,
            PerformanceRating::VeryGood,
            PerformanceRating::Good,
            PerformanceRating::Fair,
            PerformanceRating::NeedsImprovement,
        ]
    }
}

impl std::fmt::Display for PerformanceRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// (min tokens/sec exclusive, max first-token seconds exclusive, tier), checked in order.
const TIERS: &[(f64, f64, PerformanceRating)] = &[
    (20.0, 2.0, PerformanceRating::Excellent),
    (15.0, 3.0, PerformanceRating::VeryGood),
    (10.0, 5.0, PerformanceRating::Good),
    (5.0, 10.0, PerformanceRating::Fair),
];

/// Both axes must pass: high throughput with a slow first token still lands in
/// `NeedsImprovement`.
pub fn rate(tokens_per_second: f64, time_to_first_token: f64) -> PerformanceRating {
    TIERS
        .iter()
        .find(|(min_tps, max_ttft, _)| {
            tokens_per_second > *min_tps && time_to_first_token < *max_ttft
        })
        .map(|(_, _, rating)| *rating)
        .unwrap_or(PerformanceRating::NeedsImprovement)
}

/// Informational sort key; does not influence [`rate`].
pub fn performance_score(tokens_per_second: f64, time_to_first_token: f64) -> f64 {
    tokens_per_second * 0.7 + (10.0 - time_to_first_token) * 0.3
}
