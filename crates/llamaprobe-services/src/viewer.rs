//! Aggregations over the stored result log: summary, per-model comparison and
//! newest-first listing.

use llamaprobe_core::{PerformanceRating, TestResult};

const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    pub total_tests: usize,
    /// Distinct model names in first-seen order.
    pub models: Vec<String>,
    pub avg_tokens_per_second: f64,
    pub avg_total_time: f64,
    pub avg_time_to_first_token: f64,
    /// Rating histogram in first-seen order.
    pub ratings: Vec<RatingCount>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RatingCount {
    pub rating: PerformanceRating,
    pub count: usize,
    /// Share of all tests, rounded to one decimal.
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelStats {
    pub model: String,
    pub tests: usize,
    pub avg_tokens_per_second: f64,
    pub avg_total_time: f64,
    pub common_rating: PerformanceRating,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModelComparison {
    /// Fewer than two distinct models in the log.
    Unavailable { distinct_models: usize },
    Models(Vec<ModelStats>),
}

pub fn summarize(results: &[TestResult]) -> Option<ResultSummary> {
    if results.is_empty() {
        return None;
    }

    let total_tests = results.len();

    let mut models: Vec<String> = Vec::new();
    let mut ratings: Vec<RatingCount> = Vec::new();
    for r in results {
        if !models.contains(&r.model_name) {
            models.push(r.model_name.clone());
        }
        match ratings.iter_mut().find(|c| c.rating == r.rating()) {
            Some(c) => c.count += 1,
            None => ratings.push(RatingCount {
                rating: r.rating(),
                count: 1,
                percentage: 0.0,
            }),
        }
    }

    for c in &mut ratings {
        c.percentage = round1(c.count as f64 / total_tests as f64 * 100.0);
    }

    Some(ResultSummary {
        total_tests,
        models,
        avg_tokens_per_second: mean(results, |r| r.metrics.tokens_per_second),
        avg_total_time: mean(results, |r| r.metrics.total_time),
        avg_time_to_first_token: mean(results, |r| r.metrics.time_to_first_token),
        ratings,
    })
}

pub fn compare_models(results: &[TestResult]) -> ModelComparison {
    let mut groups: Vec<(&str, Vec<&TestResult>)> = Vec::new();
    for r in results {
        match groups.iter_mut().find(|(m, _)| *m == r.model_name) {
            Some((_, group)) => group.push(r),
            None => groups.push((r.model_name.as_str(), vec![r])),
        }
    }

    if groups.len() < 2 {
        return ModelComparison::Unavailable {
            distinct_models: groups.len(),
        };
    }

    let stats = groups
        .into_iter()
        .map(|(model, group)| {
            let n = group.len() as f64;
            let tps: f64 = group.iter().map(|r| r.metrics.tokens_per_second).sum();
            let total: f64 = group.iter().map(|r| r.metrics.total_time).sum();
            ModelStats {
                model: model.to_string(),
                tests: group.len(),
                avg_tokens_per_second: tps / n,
                avg_total_time: total / n,
                common_rating: modal_rating(&group),
            }
        })
        .collect();

    ModelComparison::Models(stats)
}

/// Most frequent rating; ties go to whichever was seen first.
fn modal_rating(group: &[&TestResult]) -> PerformanceRating {
    let mut counts: Vec<(PerformanceRating, usize)> = Vec::new();
    for r in group {
        match counts.iter_mut().find(|(rating, _)| *rating == r.rating()) {
            Some((_, n)) => *n += 1,
            None => counts.push((r.rating(), 1)),
        }
    }

    counts
        .iter()
        .fold(None, |best: Option<(PerformanceRating, usize)>, &(rating, n)| match best {
            Some((_, best_n)) if best_n >= n => best,
            _ => Some((rating, n)),
        })
        .map(|(rating, _)| rating)
        .unwrap_or(PerformanceRating::NeedsImprovement)
}

/// Sorted by timestamp string, newest first. RFC 3339 strings order chronologically.
pub fn newest_first(results: &[TestResult], limit: Option<usize>) -> Vec<&TestResult> {
    let mut sorted: Vec<&TestResult> = results.iter().collect();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    if let Some(limit) = limit {
        sorted.truncate(limit);
    }
    sorted
}

pub fn response_preview(response: &str) -> String {
    match response.chars().count() > PREVIEW_CHARS {
        true => format!("{}...", response.chars().take(PREVIEW_CHARS).collect::<String>()),
        false => response.to_string(),
    }
}

fn mean(results: &[TestResult], f: impl Fn(&TestResult) -> f64) -> f64 {
    results.iter().map(f).sum::<f64>() / results.len() as f64
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
