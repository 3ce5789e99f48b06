use std::io::{self, Write};

use chrono::Local;
use llamaprobe_benchmark::OllamaModel;
use llamaprobe_core::{ProbeConfig, ProbeError, RunConfig};
use llamaprobe_services::{
    newest_first, response_preview, ModelComparison, ResultSummary, TestResult,
};

const RULE: &str = "============================================================";

pub fn run_header(out: &mut impl Write, config: &ProbeConfig) -> io::Result<()> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "🤖 OLLAMA LOCAL MODEL TESTING")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "📋 Configuration:")?;
    writeln!(out, "   Model: {}", config.run.model)?;
    writeln!(out, "   Host: {}", config.ollama.host)?;
    writeln!(out, "   Time: {}", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out, "❓ Query: {}", config.run.query)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out)
}

pub fn stream_header(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "🚀 Starting query execution...")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "📤 Response Stream:")?;
    writeln!(out)?;
    out.flush()
}

/// Connectivity and missing-model failures, with the fix the user most likely needs.
pub fn availability_error(out: &mut impl Write, err: &ProbeError) -> io::Result<()> {
    match err {
        ProbeError::ModelNotFound { model, available } => {
            writeln!(out, "❌ Error: Model '{}' is not available.", model)?;
            writeln!(out, "📋 Available models:")?;
            for name in available {
                writeln!(out, "   • {}", name)?;
            }
            writeln!(out, "💡 To install a model, run: ollama pull {}", model)
        }
        _ => {
            writeln!(out, "❌ Error connecting to Ollama: {}", err)?;
            writeln!(out, "💡 Make sure Ollama is running: ollama serve")
        }
    }
}

pub fn metrics(out: &mut impl Write, result: &TestResult, run: &RunConfig) -> io::Result<()> {
    let m = &result.metrics;

    writeln!(out, "{}", RULE)?;
    writeln!(out, "📊 PERFORMANCE EVALUATION")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "⏱️  Total Time: {:.2} seconds", m.total_time)?;
    writeln!(out, "🚀 Time to First Token: {:.2} seconds", m.time_to_first_token)?;

    if run.show_token_stats {
        writeln!(out, "🔢 Total Tokens: {}", m.total_tokens)?;
        writeln!(out, "⚡ Tokens/Second: {:.2}", m.tokens_per_second)?;
    }

    if run.show_detailed_metrics {
        writeln!(out, "📝 Response Length: {} characters", m.response_length_chars)?;
        writeln!(out, "📏 Average Word Length: {:.1} chars/word", m.average_word_length)?;
    }

    writeln!(
        out,
        "🏆 Performance Rating: {} {}",
        result.performance.rating, result.performance.rating_stars
    )?;
    writeln!(out, "📈 Performance Score: {:.2}", result.performance.performance_score)?;
    writeln!(out, "{}", RULE)
}

pub fn models(out: &mut impl Write, models: &[OllamaModel]) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Available Models:")?;
    writeln!(out, "{:-<65}", "")?;
    writeln!(out, "  {:<4} {:<40} {}", "#", "Name", "Quantization")?;
    writeln!(out, "{:-<65}", "")?;
    for (i, m) in models.iter().enumerate() {
        let quant = m
            .details
            .as_ref()
            .and_then(|d| d.quantization_level.as_deref())
            .unwrap_or("-");
        writeln!(out, "  {:<4} {:<40} {}", i + 1, m.name, quant)?;
    }
    writeln!(out)
}

pub fn summary(out: &mut impl Write, summary: &ResultSummary) -> io::Result<()> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "📊 TEST RESULTS SUMMARY")?;
    writeln!(out, "{}", RULE)?;

    writeln!(out, "📈 Overall Statistics:")?;
    writeln!(out, "   Total Tests: {}", summary.total_tests)?;
    writeln!(out, "   Models Tested: {}", summary.models.len())?;
    writeln!(out, "   Models: {}", summary.models.join(", "))?;

    writeln!(out, "⚡ Performance Averages:")?;
    writeln!(out, "   Tokens/Second: {:.2}", summary.avg_tokens_per_second)?;
    writeln!(out, "   Total Time: {:.2}s", summary.avg_total_time)?;
    writeln!(out, "   Time to First Token: {:.2}s", summary.avg_time_to_first_token)?;

    writeln!(out, "🏆 Performance Ratings:")?;
    for c in &summary.ratings {
        writeln!(out, "   {}: {} ({:.1}%)", c.rating, c.count, c.percentage)?;
    }
    writeln!(out)
}

/// Newest first. Without a limit, tests are numbered by log position.
pub fn results(
    out: &mut impl Write,
    results: &[TestResult],
    limit: Option<usize>,
) -> io::Result<()> {
    if results.is_empty() {
        return writeln!(out, "📝 No test results found.");
    }

    writeln!(out, "{}", RULE)?;
    writeln!(out, "📋 DETAILED TEST RESULTS")?;
    writeln!(out, "{}", RULE)?;

    if let Some(limit) = limit {
        writeln!(out, "Showing latest {} results:", limit)?;
    }

    for (i, r) in newest_first(results, limit).into_iter().enumerate() {
        let number = match limit {
            Some(_) => i + 1,
            None => results.len() - i,
        };

        writeln!(out)?;
        writeln!(out, "📋 Test #{}", number)?;
        writeln!(out, "🕒 Time: {}", r.display_time())?;
        writeln!(out, "🤖 Model: {}", r.model_name)?;
        writeln!(out, "❓ Query: {}", r.query)?;
        writeln!(out, "📊 Metrics:")?;
        writeln!(out, "   ⏱️  Total Time: {:.3}s", r.metrics.total_time)?;
        writeln!(out, "   🚀 First Token: {:.3}s", r.metrics.time_to_first_token)?;
        writeln!(out, "   🔢 Tokens: {}", r.metrics.total_tokens)?;
        writeln!(out, "   ⚡ Tokens/Sec: {:.2}", r.metrics.tokens_per_second)?;
        writeln!(
            out,
            "🏆 Rating: {} {}",
            r.performance.rating, r.performance.rating_stars
        )?;
        writeln!(out, "💬 Response: {}", response_preview(&r.response))?;
        writeln!(out, "{:-<40}", "")?;
    }
    Ok(())
}

pub fn comparison(out: &mut impl Write, comparison: &ModelComparison) -> io::Result<()> {
    let stats = match comparison {
        ModelComparison::Unavailable { .. } => {
            return writeln!(out, "📊 Need at least 2 different models to compare.");
        }
        ModelComparison::Models(stats) => stats,
    };

    writeln!(out, "{}", RULE)?;
    writeln!(out, "🆚 MODEL COMPARISON")?;
    writeln!(out, "{}", RULE)?;

    for s in stats {
        writeln!(out)?;
        writeln!(out, "🤖 {}", s.model)?;
        writeln!(out, "   Tests: {}", s.tests)?;
        writeln!(out, "   Avg Tokens/Sec: {:.2}", s.avg_tokens_per_second)?;
        writeln!(out, "   Avg Time: {:.2}s", s.avg_total_time)?;
        writeln!(out, "   Common Rating: {}", s.common_rating)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use llamaprobe_core::{Performance, RunMetrics};
    use llamaprobe_services::{compare_models, summarize};

    fn result(ts: &str, model: &str, tps: f64) -> TestResult {
        let metrics = RunMetrics::compute(2.0, 0.5, (tps * 2.0) as u64, "some response text");
        TestResult {
            timestamp: ts.to_string(),
            model_name: model.to_string(),
            host: String::new(),
            query: "q".to_string(),
            response: "some response text".to_string(),
            performance: Performance::from_metrics(&metrics),
            metrics,
        }
    }

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_metrics_respects_display_flags() {
        let r = result("2025-06-01T10:00:00", "m", 30.0);
        let mut run = RunConfig::default();

        let full = render(|o| metrics(o, &r, &run));
        assert!(full.contains("Tokens/Second: 30.00"));
        assert!(full.contains("Average Word Length"));
        assert!(full.contains("Excellent ⭐⭐⭐⭐⭐"));

        run.show_token_stats = false;
        run.show_detailed_metrics = false;
        let terse = render(|o| metrics(o, &r, &run));
        assert!(!terse.contains("Tokens/Second"));
        assert!(!terse.contains("Response Length"));
        assert!(terse.contains("Performance Rating"));
    }

    #[test]
    fn test_results_numbering() {
        let results = vec![
            result("2025-06-01T10:00:00", "a", 30.0),
            result("2025-06-01T12:00:00", "b", 30.0),
            result("2025-06-01T11:00:00", "c", 30.0),
        ];

        let all = render(|o| super::results(o, &results, None));
        let first = all.find("Test #3").unwrap();
        let last = all.find("Test #1").unwrap();
        assert!(first < last);
        // Newest is listed first.
        assert!(all.find("Model: b").unwrap() < all.find("Model: c").unwrap());

        let latest = render(|o| super::results(o, &results, Some(2)));
        assert!(latest.contains("Showing latest 2 results:"));
        assert!(latest.contains("Test #2"));
        assert!(!latest.contains("Model: a"));
    }

    #[test]
    fn test_empty_results_message() {
        let text = render(|o| super::results(o, &[], None));
        assert!(text.contains("No test results found"));
    }

    #[test]
    fn test_summary_and_comparison_render() {
        let results = vec![
            result("2025-06-01T10:00:00", "a", 30.0),
            result("2025-06-01T11:00:00", "b", 12.0),
        ];

        let s = summarize(&results).unwrap();
        let text = render(|o| summary(o, &s));
        assert!(text.contains("Total Tests: 2"));
        assert!(text.contains("Models: a, b"));
        assert!(text.contains("Excellent: 1 (50.0%)"));

        let text = render(|o| comparison(o, &compare_models(&results)));
        assert!(text.contains("MODEL COMPARISON"));
        assert!(text.contains("🤖 b"));

        let text = render(|o| comparison(o, &compare_models(&results[..1])));
        assert!(text.contains("Need at least 2 different models"));
    }

    #[test]
    fn test_model_not_found_lists_available() {
        let err = ProbeError::ModelNotFound {
            model: "llama3.2:1b".into(),
            available: vec!["smollm2:135m".into()],
        };
        let text = render(|o| availability_error(o, &err));
        assert!(text.contains("• smollm2:135m"));
        assert!(text.contains("ollama pull llama3.2:1b"));
    }
}
