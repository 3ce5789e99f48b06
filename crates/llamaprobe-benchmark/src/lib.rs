pub mod ollama;
pub mod runner;

pub use ollama::{FragmentStream, OllamaClient, OllamaModel, StreamFragment};
pub use runner::{drive_stream, RunOutcome, StreamOutcome, TestRunner};
