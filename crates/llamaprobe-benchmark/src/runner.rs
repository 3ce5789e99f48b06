use std::io::Write;
use std::time::Instant;

use chrono::Local;
use futures::{Stream, StreamExt};
use llamaprobe_core::{CollectedRun, MetricsCollector, Result, RunConfig, TestResult};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::ollama::{OllamaClient, StreamFragment};

/// How a single test run ended.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(TestResult),
    /// Cancelled by the user; no metrics computed, nothing to persist.
    Interrupted { fragments: usize },
}

/// How consuming a fragment stream ended.
#[derive(Debug, Clone)]
pub enum StreamOutcome {
    Finished(CollectedRun),
    Interrupted { fragments: usize },
}

pub struct TestRunner {
    client: OllamaClient,
}

impl TestRunner {
    pub fn new(ollama_host: &str) -> Self {
        Self {
            client: OllamaClient::new(ollama_host),
        }
    }

    pub fn client(&self) -> &OllamaClient {
        &self.client
    }

    /// Issue one streamed chat, echoing fragments to `sink` as they arrive.
    #[instrument(skip(self, config, sink, cancel), fields(model = %config.model))]
    pub async fn run<W: Write>(
        &self,
        config: &RunConfig,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome> {
        info!("Starting test run");

        let timestamp = Local::now();
        let collector = MetricsCollector::start();

        let stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Run cancelled before the stream opened");
                return Ok(RunOutcome::Interrupted { fragments: 0 });
            }
            stream = self.client.chat_stream(&config.model, &config.query) => stream?,
        };

        match drive_stream(collector, stream, sink, cancel).await? {
            StreamOutcome::Finished(run) => {
                info!(
                    tokens = run.metrics.total_tokens,
                    tps = run.metrics.tokens_per_second,
                    ttft = run.metrics.time_to_first_token,
                    "Test run complete"
                );
                Ok(RunOutcome::Completed(TestResult::new(
                    timestamp,
                    &config.model,
                    self.client.host(),
                    &config.query,
                    run,
                )))
            }
            StreamOutcome::Interrupted { fragments } => {
                info!(fragments, "Run cancelled mid-stream");
                Ok(RunOutcome::Interrupted { fragments })
            }
        }
    }
}

/// Consume `stream` into `collector`. Each fragment is written and flushed to
/// `sink` before it is recorded. Cancellation wins over a ready fragment.
pub async fn drive_stream<S, W>(
    mut collector: MetricsCollector,
    mut stream: S,
    sink: &mut W,
    cancel: &CancellationToken,
) -> Result<StreamOutcome>
where
    S: Stream<Item = Result<StreamFragment>> + Unpin,
    W: Write,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(StreamOutcome::Interrupted {
                    fragments: collector.fragments(),
                });
            }
            next = stream.next() => next,
        };

        let Some(fragment) = next else { break };
        let fragment = fragment?;
        let received = Instant::now();

        sink.write_all(fragment.content.as_bytes())?;
        sink.flush()?;

        collector.record_at(&fragment.content, received);
    }

    debug!(fragments = collector.fragments(), "Stream exhausted");
    Ok(StreamOutcome::Finished(collector.finish()))
}
