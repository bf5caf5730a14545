//! Configuration management for Parley
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{ParleyError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure for Parley
///
/// Holds everything the service needs at startup: the HTTP listener, the
/// completion provider, the search provider, extraction limits, the chat
/// store location, and log formatting.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Completion provider configuration (OpenAI-compatible, Ollama)
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Web search configuration used by the `search` mode
    #[serde(default)]
    pub search: SearchConfig,
    /// Uploaded file extraction limits
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Chat store configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Maximum accepted request body for uploads (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Header carrying the caller identity, set by the upstream auth proxy
    #[serde(default = "default_identity_header")]
    pub identity_header: String,
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024 // 25 MB
}

fn default_identity_header() -> String {
    "x-user-id".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
            identity_header: default_identity_header(),
        }
    }
}

/// Provider configuration
///
/// Specifies which completion provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// OpenAI-compatible chat completions configuration
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
}

fn default_provider_type() -> String {
    "openai".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            openai: OpenAiConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// OpenAI-compatible provider configuration (DeepSeek by default)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Base URL; `/chat/completions` is appended
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,

    /// Model to request
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// API key (prefer the `DEEPSEEK_API_KEY` / `OPENAI_API_KEY` env vars)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

fn default_openai_api_base() -> String {
    "https://api.deepseek.com".to_string()
}

fn default_openai_model() -> String {
    "deepseek-chat".to_string()
}

fn default_request_timeout() -> u64 {
    120
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: default_openai_api_base(),
            model: default_openai_model(),
            api_key: None,
            timeout_seconds: default_request_timeout(),
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model to use for Ollama
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:latest".to_string()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
        }
    }
}

/// Web search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search endpoint base URL; `/search` is appended
    #[serde(default = "default_search_api_base")]
    pub api_base: String,

    /// Serper API key (prefer the `SERPER_API_KEY` env var)
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// Number of organic results injected into the directive
    #[serde(default = "default_search_max_results")]
    pub max_results: usize,
}

fn default_search_api_base() -> String {
    "https://google.serper.dev".to_string()
}

fn default_search_max_results() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_base: default_search_api_base(),
            api_key: None,
            max_results: default_search_max_results(),
        }
    }
}

/// Uploaded file extraction limits
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionConfig {
    /// Files whose declared size exceeds this are skipped (bytes)
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Extracted text is truncated to this many characters
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Number of CSV records kept
    #[serde(default = "default_csv_max_rows")]
    pub csv_max_rows: usize,
}

fn default_max_file_bytes() -> u64 {
    5 * 1024 * 1024 // 5 MB
}

fn default_max_chars() -> usize {
    10_000
}

fn default_csv_max_rows() -> usize {
    10
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            max_chars: default_max_chars(),
            csv_max_rows: default_csv_max_rows(),
        }
    }
}

/// Chat store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Database directory; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the database directory, falling back to the platform data dir
    ///
    /// # Errors
    ///
    /// Returns `ParleyError::Storage` if no data directory can be determined
    pub fn resolve_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }

        let proj_dirs = ProjectDirs::from("dev", "parley", "parley")
            .ok_or_else(|| ParleyError::Storage("Could not determine data directory".into()))?;

        Ok(proj_dirs.data_dir().join("chats.db"))
    }
}

/// Log output configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Emit JSON-formatted log lines
    #[serde(default)]
    pub json: bool,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file yields defaults; the caller reports it once logging is up.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ParleyError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| ParleyError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(provider_type) = std::env::var("PARLEY_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(model) = std::env::var("PARLEY_OPENAI_MODEL") {
            self.provider.openai.model = model;
        }

        if let Ok(api_base) = std::env::var("PARLEY_OPENAI_API_BASE") {
            self.provider.openai.api_base = api_base;
        }

        if let Ok(ollama_host) = std::env::var("PARLEY_OLLAMA_HOST") {
            self.provider.ollama.host = ollama_host;
        }

        if let Ok(ollama_model) = std::env::var("PARLEY_OLLAMA_MODEL") {
            self.provider.ollama.model = ollama_model;
        }

        if let Ok(bind) = std::env::var("PARLEY_BIND") {
            self.server.bind = bind;
        }

        if let Ok(path) = std::env::var("PARLEY_STORAGE_PATH") {
            tracing::debug!(path = %path, "Env override: PARLEY_STORAGE_PATH");
            self.storage.path = Some(PathBuf::from(path));
        }

        if let Ok(max_bytes) = std::env::var("PARLEY_MAX_FILE_BYTES") {
            match max_bytes.parse::<u64>() {
                Ok(v) => self.extraction.max_file_bytes = v,
                Err(_) => tracing::warn!("Invalid PARLEY_MAX_FILE_BYTES: {}", max_bytes),
            }
        }

        // Credentials
        if let Ok(key) = std::env::var("DEEPSEEK_API_KEY") {
            self.provider.openai.api_key = Some(key);
        } else if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.provider.openai.api_key = Some(key);
        }

        if let Ok(key) = std::env::var("SERPER_API_KEY") {
            self.search.api_key = Some(key);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let Some(path) = &cli.storage_path {
            self.storage.path = Some(path.clone());
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set. Missing credentials are
    /// not a validation failure; they surface per request.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let valid_providers = ["openai", "ollama"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(ParleyError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        validate_url("provider.openai.api_base", &self.provider.openai.api_base)?;
        validate_url("provider.ollama.host", &self.provider.ollama.host)?;
        validate_url("search.api_base", &self.search.api_base)?;

        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(ParleyError::Config(format!(
                "server.bind is not a socket address: {}",
                self.server.bind
            ))
            .into());
        }

        if self.server.identity_header.trim().is_empty() {
            return Err(ParleyError::Config(
                "server.identity_header cannot be empty".to_string(),
            )
            .into());
        }

        if self.provider.openai.timeout_seconds == 0 {
            return Err(ParleyError::Config(
                "provider.openai.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.search.max_results == 0 {
            return Err(ParleyError::Config(
                "search.max_results must be greater than 0".to_string(),
            )
            .into());
        }

        if self.extraction.max_file_bytes == 0 || self.extraction.max_chars == 0 {
            return Err(ParleyError::Config(
                "extraction limits must be greater than 0".to_string(),
            )
            .into());
        }

        if (self.server.max_upload_bytes as u64) < self.extraction.max_file_bytes {
            return Err(ParleyError::Config(
                "server.max_upload_bytes must be at least extraction.max_file_bytes".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| ParleyError::Config(format!("{} is not a valid URL: {}", field, e)).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn test_cli() -> crate::cli::Cli {
        crate::cli::Cli {
            config: None,
            verbose: false,
            storage_path: None,
            command: crate::cli::Commands::Serve { bind: None },
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.provider.provider_type, "openai");
        assert_eq!(config.provider.openai.model, "deepseek-chat");
        assert_eq!(config.server.bind, "127.0.0.1:3000");
        assert_eq!(config.extraction.max_file_bytes, 5 * 1024 * 1024);
        assert_eq!(config.extraction.max_chars, 10_000);
        assert_eq!(config.search.max_results, 5);
    }

    #[test]
    fn test_config_validation_success() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_provider() {
        let mut config = Config::default();
        config.provider.provider_type = "gemini".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_url() {
        let mut config = Config::default();
        config.search.api_base = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_bind() {
        let mut config = Config::default();
        config.server.bind = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_limits() {
        let mut config = Config::default();
        config.extraction.max_chars = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.max_results = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_upload_smaller_than_file_limit() {
        let mut config = Config::default();
        config.server.max_upload_bytes = 1024;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_yaml() {
        let yaml = r#"
server:
  bind: 0.0.0.0:8080
provider:
  type: ollama
  ollama:
    host: http://ollama:11434
    model: qwen2.5:7b
search:
  max_results: 3
extraction:
  max_chars: 2000
logging:
  json: true
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.provider.provider_type, "ollama");
        assert_eq!(config.provider.ollama.model, "qwen2.5:7b");
        assert_eq!(config.provider.openai.model, "deepseek-chat");
        assert_eq!(config.search.max_results, 3);
        assert_eq!(config.extraction.max_chars, 2000);
        assert_eq!(config.extraction.max_file_bytes, 5 * 1024 * 1024);
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_keys_are_not_serialized() {
        let mut config = Config::default();
        config.provider.openai.api_key = Some("sk-secret".to_string());
        config.search.api_key = Some("serper-secret".to_string());
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(!yaml.contains("sk-secret"));
        assert!(!yaml.contains("serper-secret"));
    }

    #[test]
    fn test_storage_path_explicit() {
        let storage = StorageConfig {
            path: Some(PathBuf::from("/tmp/parley-test.db")),
        };
        assert_eq!(
            storage.resolve_path().unwrap(),
            PathBuf::from("/tmp/parley-test.db")
        );
    }

    #[test]
    fn test_load_nonexistent_file_uses_defaults() {
        let config = Config::load("nonexistent.yaml", &test_cli()).unwrap();
        assert_eq!(config.server.identity_header, "x-user-id");
    }

    #[test]
    fn test_cli_storage_path_override() {
        let mut cli = test_cli();
        cli.storage_path = Some(PathBuf::from("/tmp/override.db"));
        let config = Config::load("nonexistent.yaml", &cli).unwrap();
        assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/override.db")));
    }

    #[test]
    #[serial]
    fn test_apply_env_vars_overrides_provider_and_keys() {
        std::env::set_var("PARLEY_PROVIDER", "ollama");
        std::env::set_var("PARLEY_OLLAMA_MODEL", "mistral:latest");
        std::env::set_var("SERPER_API_KEY", "serper-test");
        std::env::set_var("PARLEY_MAX_FILE_BYTES", "not-a-number");

        let mut cfg = Config::default();
        cfg.apply_env_vars();

        assert_eq!(cfg.provider.provider_type, "ollama");
        assert_eq!(cfg.provider.ollama.model, "mistral:latest");
        assert_eq!(cfg.search.api_key.as_deref(), Some("serper-test"));
        assert_eq!(cfg.extraction.max_file_bytes, 5 * 1024 * 1024);

        std::env::remove_var("PARLEY_PROVIDER");
        std::env::remove_var("PARLEY_OLLAMA_MODEL");
        std::env::remove_var("SERPER_API_KEY");
        std::env::remove_var("PARLEY_MAX_FILE_BYTES");
    }
}
