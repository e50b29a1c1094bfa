//! Configuration file support

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use synth_ai::Provider;

/// Configuration for synth-dialog
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub client: ClientConfig,
    pub cashier: CashierSection,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub dialog: DialogConfig,
    pub paths: PathsConfig,
}

/// Chat-completion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// compressa, openai, ollama or custom
    pub provider: String,
    pub base_url: Option<String>,
    pub model: Option<String>,
    /// Environment variable holding the API key
    pub api_key_env: Option<String>,
    /// API key (environment variables are preferred)
    pub api_key: Option<String>,
    pub stream: bool,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "compressa".to_string(),
            base_url: None,
            model: None,
            api_key_env: None,
            api_key: None,
            stream: false,
            request_timeout_secs: 120,
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            max_tokens: Some(60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CashierSection {
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub restaurant_name: String,
}

impl Default for CashierSection {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: None,
            restaurant_name: "Vkusno i tochka".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// hashing (offline) or remote (`/embeddings` endpoint). Unset means
    /// remote when a model or base URL is given, hashing otherwise.
    pub provider: Option<String>,
    pub model: Option<String>,
    /// Defaults to the chat endpoint's base URL
    pub base_url: Option<String>,
    /// Vector size for the hashing embedder
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: None,
            model: None,
            base_url: None,
            dimensions: 384,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub include_category_summaries: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 2,
            chunk_size: 100,
            chunk_overlap: 10,
            include_category_summaries: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogConfig {
    pub max_exchanges: u32,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self { max_exchanges: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub menu: PathBuf,
    pub orders_dir: PathBuf,
    pub results_dir: PathBuf,
    pub analysis_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            menu: PathBuf::from("menu.csv"),
            orders_dir: PathBuf::from("Orders"),
            results_dir: PathBuf::from("results"),
            analysis_file: PathBuf::from("analysis.csv"),
        }
    }
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("synth-dialog")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SYNTH_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Save config to `path`
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, content)
    }

    /// Create a default config file if it doesn't exist
    pub fn init(path: &Path) -> std::io::Result<PathBuf> {
        if !path.exists() {
            Config::default().save(path)?;
        }
        Ok(path.to_path_buf())
    }

    pub fn provider(&self) -> Provider {
        Provider::parse(&self.llm.provider)
    }

    /// Embedding backend to use for menu retrieval
    pub fn embedding_provider(&self) -> &str {
        match &self.embedding.provider {
            Some(name) => name.as_str(),
            None if self.embedding.model.is_some() || self.embedding.base_url.is_some() => "remote",
            None => "hashing",
        }
    }

    /// Environment variable the API key is read from, if any
    pub fn api_key_env(&self) -> Option<String> {
        self.llm
            .api_key_env
            .clone()
            .or_else(|| self.provider().api_key_env_var().map(String::from))
    }

    /// Get the API key, checking config then env
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(key) = self.llm.api_key.as_ref().filter(|k| !k.is_empty()) {
            return Some(key.clone());
        }
        std::env::var(self.api_key_env()?).ok().filter(|k| !k.is_empty())
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# synth-dialog configuration file
# Place at ~/.config/synth-dialog/config.toml (Linux) or set SYNTH_CONFIG_PATH

[llm]
# compressa, openai, ollama or custom
provider = "compressa"
# base_url = "https://compressa-api.mil-team.ru/v1"
# model = "Compressa-Qwen2.5-14B-Instruct"
# The key is read from this variable; a .env file in the working directory is loaded first
# api_key_env = "API_COMPRESSA_KEY"
stream = false
request_timeout_secs = 120
max_retries = 0

[client]
temperature = 0.4
max_tokens = 60

[cashier]
temperature = 0.0
restaurant_name = "Vkusno i tochka"

[embedding]
# hashing: offline, ranks menu chunks by shared words and trigrams rather
#   than meaning. Fine for short menus, weaker on paraphrases.
# remote: a sentence-embedding model behind an /embeddings endpoint, e.g.
#   all-MiniLM-L6-v2 served locally. Chosen automatically when model or
#   base_url is set and provider is left out.
# provider = "hashing"
dimensions = 384
# model = "all-MiniLM-L6-v2"
# base_url = "http://localhost:8080/v1"

[retrieval]
top_k = 2
chunk_size = 100
chunk_overlap = 10
include_category_summaries = true

[dialog]
max_exchanges = 10

[paths]
menu = "menu.csv"
orders_dir = "Orders"
results_dir = "results"
analysis_file = "analysis.csv"
"#
}
