use crate::{ProbeError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "smollm2:135m";
pub const DEFAULT_QUERY: &str = "Explain quantum computing in simple terms.";
pub const DEFAULT_RESULTS_FILE: &str = "ollama_test_results.json";
pub const DEFAULT_CSV_FILE: &str = "ollama_test_results.csv";

pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";
pub const ENV_MODEL: &str = "LLAMAPROBE_MODEL";
pub const ENV_RESULTS: &str = "LLAMAPROBE_RESULTS";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    pub host: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub model: String,
    pub query: String,
    pub show_detailed_metrics: bool,
    pub show_token_stats: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            query: DEFAULT_QUERY.to_string(),
            show_detailed_metrics: true,
            show_token_stats: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub results_path: PathBuf,
    pub csv_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            results_path: PathBuf::from(DEFAULT_RESULTS_FILE),
            csv_path: PathBuf::from(DEFAULT_CSV_FILE),
        }
    }
}

impl ProbeConfig {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(host) = lookup(ENV_OLLAMA_HOST).filter(|v| !v.trim().is_empty()) {
            self.ollama.host = normalize_host(&host);
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            self.run.model = model;
        }
        if let Some(path) = lookup(ENV_RESULTS).filter(|v| !v.trim().is_empty()) {
            self.storage.results_path = PathBuf::from(path);
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.run.model.trim().is_empty() {
            return Err(ProbeError::Config("model name must not be empty".into()));
        }
        if self.run.query.trim().is_empty() {
            return Err(ProbeError::Config("query must not be empty".into()));
        }
        let host = &self.ollama.host;
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(ProbeError::Config(format!(
                "Ollama host must start with http:// or https://, got '{}'",
                host
            )));
        }
        Ok(())
    }
}

/// Ollama accepts `OLLAMA_HOST=127.0.0.1:11434` without a scheme; the HTTP client does not.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    match host.starts_with("http://") || host.starts_with("https://") {
        true => host.to_string(),
        false => format!("http://{}", host),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_legacy_constants() {
        let config = ProbeConfig::default();
        assert_eq!(config.ollama.host, "http://localhost:11434");
        assert_eq!(config.run.model, "smollm2:135m");
        assert!(config.run.show_detailed_metrics);
        assert!(config.run.show_token_stats);
        assert_eq!(config.storage.results_path, PathBuf::from("ollama_test_results.json"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_OLLAMA_HOST, "10.0.0.5:11434/"),
            (ENV_MODEL, "llama3.2:1b"),
            (ENV_RESULTS, "/tmp/results.json"),
        ]
        .into_iter()
        .collect();

        let config =
            ProbeConfig::default().with_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.ollama.host, "http://10.0.0.5:11434");
        assert_eq!(config.run.model, "llama3.2:1b");
        assert_eq!(config.storage.results_path, PathBuf::from("/tmp/results.json"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let config = ProbeConfig::default().with_env_overrides(|_| Some("  ".to_string()));
        assert_eq!(config.ollama.host, DEFAULT_OLLAMA_HOST);
        assert_eq!(config.run.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ProbeConfig::default();
        config.run.model = String::new();
        assert!(matches!(config.validate(), Err(ProbeError::Config(_))));

        let mut config = ProbeConfig::default();
        config.ollama.host = "localhost:11434".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ProbeConfig =
            serde_json::from_str(r#"{"ollama": {"host": "http://gpu-box:11434"}}"#).unwrap();
        assert_eq!(config.ollama.host, "http://gpu-box:11434");
        assert_eq!(config.run.query, DEFAULT_QUERY);
    }
}
