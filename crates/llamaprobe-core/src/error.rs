use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Model '{model}' is not available")]
    ModelNotFound { model: String, available: Vec<String> },

    #[error("Ollama error: {0}")]
    Ollama(String),

    #[error("Connection refused at {host} - is Ollama running?")]
    ConnectionRefused { host: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl ProbeError {
    /// Errors raised before any fragment was produced: server down or model missing.
    pub fn is_availability(&self) -> bool {
        matches!(
            self,
            ProbeError::ModelNotFound { .. } | ProbeError::ConnectionRefused { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;
