//! Configuration management
//!
//! Manages store location, completion provider settings and batch tuning.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ai::llm::ProviderKind;

/// Environment variables consulted when no API key is configured
const GEMINI_KEY_ENV: &str = "GEMINI_API_KEY";
const OPENROUTER_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Feedback file settings
    #[serde(default)]
    pub store: StoreConfig,
    /// Completion provider settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// Batch processing settings
    #[serde(default)]
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Feedback file; defaults to `sentiment_feedback_output.txt` in the data directory
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: ProviderKind,
    /// Overrides the provider's default endpoint
    #[serde(default)]
    pub base_url: Option<String>,
    /// Model name for OpenAI-compatible providers
    #[serde(default = "default_model")]
    pub model: String,
    /// Falls back to GEMINI_API_KEY / OPENROUTER_API_KEY
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

fn default_provider() -> ProviderKind {
    ProviderKind::Gemini
}

fn default_model() -> String {
    "google/gemini-flash-1.5".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    1024
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: None,
            model: default_model(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

impl LlmConfig {
    /// Configured key, or the provider's environment variable
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| {
                let var = match self.provider {
                    ProviderKind::Gemini => GEMINI_KEY_ENV,
                    ProviderKind::OpenAiCompatible => OPENROUTER_KEY_ENV,
                };
                std::env::var(var).ok().filter(|k| !k.trim().is_empty())
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Enhancements allowed in flight at once
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

fn default_max_concurrency() -> usize {
    crate::feedback::batch::DEFAULT_MAX_CONCURRENCY
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, writing defaults if missing
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Config::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Configured feedback file, or the default one in the data directory
    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store.path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("sentiment_feedback_output.txt")),
        }
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "retailstore", "feedback-insights")
        .context("Failed to get project directories")
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

/// Print the effective configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("Feedback Insights Configuration");
    println!("  store.path:            {}", config.store_path()?.display());
    println!("  llm.provider:          {}", config.llm.provider.name());
    println!(
        "  llm.base_url:          {}",
        config.llm.base_url.as_deref().unwrap_or("(provider default)")
    );
    println!("  llm.model:             {}", config.llm.model);
    println!(
        "  llm.api_key:           {}",
        if config.llm.resolve_api_key().is_some() { "Configured" } else { "Not configured" }
    );
    println!("  llm.timeout_secs:      {}", config.llm.timeout_secs);
    println!("  llm.temperature:       {}", config.llm.temperature);
    println!("  llm.max_output_tokens: {}", config.llm.max_output_tokens);
    println!("  batch.max_concurrency: {}", config.batch.max_concurrency);
    Ok(())
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| "# Default configuration\n".to_string())
}
