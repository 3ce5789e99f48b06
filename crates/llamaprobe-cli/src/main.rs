mod display;
mod menu;

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use llamaprobe_benchmark::{OllamaClient, RunOutcome, TestRunner};
use llamaprobe_core::config::normalize_host;
use llamaprobe_core::ProbeConfig;
use llamaprobe_services::{export_csv, ResultStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::menu::MenuCommand;

#[derive(Parser)]
#[command(name = "llamaprobe")]
#[command(about = "LlamaProbe - single-prompt Ollama model tester", long_about = None)]
struct Cli {
    /// Ollama host URL (overrides OLLAMA_HOST)
    #[arg(long, global = true)]
    host: Option<String>,

    /// Result log path (overrides LLAMAPROBE_RESULTS)
    #[arg(long, global = true)]
    results: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream one query against a model and rate the run
    Run {
        /// Model to test (overrides LLAMAPROBE_MODEL)
        #[arg(short, long)]
        model: Option<String>,

        /// Prompt to send
        #[arg(short, long)]
        query: Option<String>,

        /// Hide response length and average word length
        #[arg(long)]
        no_detailed_metrics: bool,

        /// Hide token count and tokens/second
        #[arg(long)]
        no_token_stats: bool,

        /// Do not append the result to the log
        #[arg(long)]
        no_save: bool,
    },

    /// List available models
    Models,

    /// Show Ollama connectivity
    Status,

    /// Browse saved results interactively
    View,

    /// Print summary statistics of saved results
    Summary,

    /// Print the most recent saved results
    Latest {
        /// Number of results to show (at least 1)
        #[arg(short = 'n', long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
        count: u64,
    },

    /// Compare saved results per model
    Compare,

    /// Export saved results to CSV
    Export {
        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ProbeConfig::from_env();
    if let Some(host) = &cli.host {
        config.ollama.host = normalize_host(host);
    }
    if let Some(results) = cli.results {
        config.storage.results_path = results;
    }

    match cli.command {
        Some(Commands::Run {
            model,
            query,
            no_detailed_metrics,
            no_token_stats,
            no_save,
        }) => {
            if let Some(model) = model {
                config.run.model = model;
            }
            if let Some(query) = query {
                config.run.query = query;
            }
            config.run.show_detailed_metrics = !no_detailed_metrics;
            config.run.show_token_stats = !no_token_stats;
            config.validate()?;
            cmd_run(&config, !no_save).await?
        }
        None => {
            config.validate()?;
            cmd_run(&config, true).await?
        }
        Some(Commands::Models) => cmd_models(&config).await?,
        Some(Commands::Status) => cmd_status(&config).await?,
        Some(Commands::View) => cmd_view(&config)?,
        Some(Commands::Summary) => cmd_history(&config, MenuCommand::Summary)?,
        Some(Commands::Latest { count }) => cmd_latest(&config, count)?,
        Some(Commands::Compare) => cmd_history(&config, MenuCommand::Compare)?,
        Some(Commands::Export { output }) => cmd_export(&config, output)?,
    }

    Ok(())
}

async fn cmd_run(config: &ProbeConfig, save: bool) -> Result<()> {
    let mut stdout = io::stdout();
    display::run_header(&mut stdout, config)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let runner = TestRunner::new(&config.ollama.host);

    let available = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            println!();
            println!("⚠️  Query interrupted by user.");
            return Ok(());
        }
        available = runner.client().ensure_model_available(&config.run.model) => available,
    };
    if let Err(e) = available {
        display::availability_error(&mut stdout, &e)?;
        return Ok(());
    }
    println!("✅ Model '{}' is available.", config.run.model);
    println!();

    display::stream_header(&mut stdout)?;

    match runner.run(&config.run, &mut stdout, &cancel).await {
        Ok(RunOutcome::Completed(result)) => {
            println!();
            println!();
            display::metrics(&mut stdout, &result, &config.run)?;

            if save {
                let store = ResultStore::new(&config.storage.results_path);
                match store.append(&result) {
                    Ok(total) => {
                        debug!(total, "Result appended");
                        println!("💾 Results saved to {}", store.path().display());
                    }
                    Err(e) => {
                        warn!("Failed to save result: {}", e);
                        println!("⚠️  Could not save results: {}", e);
                    }
                }
            }
        }
        Ok(RunOutcome::Interrupted { fragments }) => {
            debug!(fragments, "Run interrupted");
            println!();
            println!("⚠️  Query interrupted by user.");
        }
        Err(e) if e.is_availability() => display::availability_error(&mut stdout, &e)?,
        Err(e) => {
            println!();
            println!("❌ Error during query execution: {}", e);
        }
    }

    println!();
    println!("✨ Testing completed!");
    stdout.flush()?;
    Ok(())
}

async fn cmd_models(config: &ProbeConfig) -> Result<()> {
    let client = OllamaClient::new(&config.ollama.host);
    let models = client.list_models().await?;

    let mut stdout = io::stdout();
    display::models(&mut stdout, &models)?;
    println!("  Use: llamaprobe run --model <NAME>");
    println!();
    Ok(())
}

async fn cmd_status(config: &ProbeConfig) -> Result<()> {
    println!("System Status:");
    println!("{:-<40}", "");
    println!("  Ollama Host: {}", config.ollama.host);
    println!("  Default Model: {}", config.run.model);
    println!("  Results File: {}", config.storage.results_path.display());

    let client = OllamaClient::new(&config.ollama.host);
    match client.list_models().await {
        Ok(models) => {
            println!("  Ollama: connected ({} models available)", models.len());
        }
        Err(e) => {
            println!("  Ollama: disconnected ({})", e);
        }
    }

    Ok(())
}

/// Loads the log, printing a hint when there is nothing to show.
fn load_history(config: &ProbeConfig) -> Option<Vec<llamaprobe_services::TestResult>> {
    let log = ResultStore::new(&config.storage.results_path).load_all();
    if log.is_empty() {
        println!("📝 No test results found.");
        println!("💡 Run `llamaprobe run` first to generate test results.");
        return None;
    }
    Some(log.test_results)
}

fn cmd_view(config: &ProbeConfig) -> Result<()> {
    let Some(results) = load_history(config) else {
        return Ok(());
    };

    println!("🔍 OLLAMA TEST RESULTS VIEWER");
    println!("📁 Loaded {} test results", results.len());

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    menu::run_menu(&results, &config.storage.csv_path, stdin.lock(), &mut stdout)?;
    Ok(())
}

fn cmd_history(config: &ProbeConfig, cmd: MenuCommand) -> Result<()> {
    let Some(results) = load_history(config) else {
        return Ok(());
    };
    let mut stdout = io::stdout();
    menu::dispatch(cmd, &results, &config.storage.csv_path, &mut stdout)?;
    Ok(())
}

fn cmd_latest(config: &ProbeConfig, count: u64) -> Result<()> {
    let Some(results) = load_history(config) else {
        return Ok(());
    };
    let limit = usize::try_from(count).unwrap_or(usize::MAX);
    display::results(&mut io::stdout(), &results, Some(limit))?;
    Ok(())
}

fn cmd_export(config: &ProbeConfig, output: Option<PathBuf>) -> Result<()> {
    let Some(results) = load_history(config) else {
        return Ok(());
    };
    let path = output.unwrap_or_else(|| config.storage.csv_path.clone());
    let rows = export_csv(&results, &path)?;
    println!("✅ Exported {} results to {}", rows, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_count_defaults_to_five() {
        let cli = Cli::try_parse_from(["llamaprobe", "latest"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Latest { count: 5 })));

        let cli = Cli::try_parse_from(["llamaprobe", "latest", "-n", "12"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Latest { count: 12 })));
    }

    #[test]
    fn test_latest_rejects_zero() {
        assert!(Cli::try_parse_from(["llamaprobe", "latest", "-n", "0"]).is_err());
        assert!(Cli::try_parse_from(["llamaprobe", "latest", "--count", "-3"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["llamaprobe", "summary", "--results", "/tmp/r.json"]).unwrap();
        assert_eq!(cli.results, Some(PathBuf::from("/tmp/r.json")));
        assert!(matches!(cli.command, Some(Commands::Summary)));
    }
}
