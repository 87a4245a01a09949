//! Crate configuration: file location, defaults, and env-var expansion.
//!
//! Follows the teacher's `Config::load`/`config_path` shape, trimmed of
//! the Neo4j/multi-provider surface this domain does not need, and
//! extended with the pipeline's concurrency/retry/storage knobs.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_chunk_size_words")]
    pub chunk_size_words: usize,
    #[serde(default = "default_chunk_overlap_words")]
    pub chunk_overlap_words: usize,
    #[serde(default = "default_max_concurrent_chunks")]
    pub max_concurrent_chunks: usize,
    #[serde(default = "default_llm_timeout_s")]
    pub llm_timeout_s: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_s")]
    pub backoff_base_s: u64,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
}

fn default_chunk_size_words() -> usize {
    750
}
fn default_chunk_overlap_words() -> usize {
    50
}
fn default_max_concurrent_chunks() -> usize {
    5
}
fn default_llm_timeout_s() -> f64 {
    60.0
}
fn default_max_retries() -> u32 {
    5
}
fn default_backoff_base_s() -> u64 {
    2
}
fn default_embedding_model() -> String {
    "BAAI/bge-small-en-v1.5".to_string()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chunk_size_words: default_chunk_size_words(),
            chunk_overlap_words: default_chunk_overlap_words(),
            max_concurrent_chunks: default_max_concurrent_chunks(),
            llm_timeout_s: default_llm_timeout_s(),
            max_retries: default_max_retries(),
            backoff_base_s: default_backoff_base_s(),
            embedding_model: default_embedding_model(),
            data_dir: default_data_dir(),
            llm: LlmConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .context("could not determine config directory")?
            .join("factcheck");
        Ok(dir)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from disk, falling back to defaults if no file exists.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            let mut config = Self::default();
            config.expand_env_vars();
            return Ok(config);
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file at {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file at {}", path.display()))?;

        config.expand_env_vars();
        Ok(config)
    }

    /// Write the default configuration to disk, creating parent directories as needed.
    pub fn write_default(force: bool) -> Result<PathBuf> {
        let path = Self::config_path()?;
        if path.exists() && !force {
            anyhow::bail!(
                "configuration already exists at {} (use --force to overwrite)",
                path.display()
            );
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(&Config::default())?;
        fs::write(&path, content)
            .with_context(|| format!("failed to write config file at {}", path.display()))?;
        Ok(path)
    }

    fn expand_env_vars(&mut self) {
        self.llm.api_key = expand_env_var(&self.llm.api_key);
    }
}

/// Expand environment variable references like ${VAR_NAME}
fn expand_env_var(value: &str) -> String {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).unwrap_or_default()
    } else if let Some(var_name) = value.strip_prefix('$') {
        std::env::var(var_name).unwrap_or_default()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_env_var_braces() {
        // SAFETY: test is single-threaded
        unsafe { std::env::set_var("TEST_VAR_A", "value_a") };
        assert_eq!(expand_env_var("${TEST_VAR_A}"), "value_a");
        unsafe { std::env::remove_var("TEST_VAR_A") };
    }

    #[test]
    fn test_expand_env_var_dollar() {
        unsafe { std::env::set_var("TEST_VAR_B", "value_b") };
        assert_eq!(expand_env_var("$TEST_VAR_B"), "value_b");
        unsafe { std::env::remove_var("TEST_VAR_B") };
    }

    #[test]
    fn test_expand_env_var_literal() {
        assert_eq!(expand_env_var("literal_value"), "literal_value");
    }

    #[test]
    fn test_expand_env_var_missing_returns_empty() {
        assert_eq!(expand_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), "");
    }

    #[test]
    fn test_expand_env_var_empty_string() {
        assert_eq!(expand_env_var(""), "");
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.chunk_size_words, 750);
        assert_eq!(config.chunk_overlap_words, 50);
        assert_eq!(config.max_concurrent_chunks, 5);
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.backoff_base_s, 2);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
    }

    #[test]
    fn test_config_from_toml_partial() {
        let toml_str = r#"
            chunk_size_words = 500

            [llm]
            api_key = "sk-test"
            model = "claude-sonnet-4-20250514"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.chunk_size_words, 500);
        assert_eq!(config.chunk_overlap_words, 50); // default
        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.llm.model.as_deref(), Some("claude-sonnet-4-20250514"));
    }

    #[test]
    fn test_config_roundtrip_toml() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.chunk_size_words, config.chunk_size_words);
        assert_eq!(deserialized.max_retries, config.max_retries);
        assert_eq!(deserialized.data_dir, config.data_dir);
    }
}
