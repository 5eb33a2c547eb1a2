//! Service configuration loaded from the environment

use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use ragdesk_cache::CacheConfig;
use tracing::debug;

use crate::error::{RagError, Result};
use crate::llm::ClaudeModel;
use crate::search::embedding_dimension;

/// Which language model backend answers questions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenAi,
    ClaudeCli,
}

impl FromStr for LlmProvider {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "claude-cli" | "claude" => Ok(LlmProvider::ClaudeCli),
            other => Err(RagError::Configuration(format!(
                "Unknown LLM_PROVIDER: {} (expected openai or claude-cli)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Partition names in configuration order
    pub partitions: Vec<String>,
    pub default_top_k: usize,
    pub cache_max_size: usize,
    pub cache_ttl: Duration,
    pub embedding_model: String,
    pub embedding_dim: usize,
    pub vector_db_path: PathBuf,
    pub llm_provider: LlmProvider,
    pub llm_model: String,
    pub llm_temperature: f32,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
    pub log_level: String,
}

impl Settings {
    /// Read `.env` if present, then the process environment
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenv::dotenv() {
            debug!("Loaded environment from {:?}", path);
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str, default: &str| -> String {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let settings = Self {
            host: var("HOST", "0.0.0.0"),
            port: parse("PORT", &var("PORT", "8000"))?,
            partitions: split_list(&var("PARTITIONS", "computer-networking-pdf,networking-pdf")),
            default_top_k: parse("DEFAULT_TOP_K", &var("DEFAULT_TOP_K", "5"))?,
            cache_max_size: parse("CACHE_MAX_SIZE", &var("CACHE_MAX_SIZE", "128"))?,
            cache_ttl: Duration::from_secs(parse(
                "CACHE_TTL_SECONDS",
                &var("CACHE_TTL_SECONDS", "600"),
            )?),
            embedding_model: var("EMBEDDING_MODEL", "multilingual-e5-small"),
            embedding_dim: parse("EMBEDDING_DIM", &var("EMBEDDING_DIM", "384"))?,
            vector_db_path: PathBuf::from(var("VECTOR_DB_PATH", "./data/vectors")),
            llm_provider: var("LLM_PROVIDER", "openai").parse()?,
            llm_model: var("LLM_MODEL", "gpt-3.5-turbo"),
            llm_temperature: parse("LLM_TEMPERATURE", &var("LLM_TEMPERATURE", "0.3"))?,
            openai_api_key: lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            openai_base_url: var("OPENAI_BASE_URL", crate::llm::openai::DEFAULT_BASE_URL),
            cors_origins: split_list(&var("CORS_ORIGINS", "*")),
            rate_limit_requests: parse("RATE_LIMIT_REQUESTS", &var("RATE_LIMIT_REQUESTS", "100"))?,
            rate_limit_window: Duration::from_secs(parse(
                "RATE_LIMIT_WINDOW",
                &var("RATE_LIMIT_WINDOW", "60"),
            )?),
            log_level: var("LOG_LEVEL", "info").to_ascii_lowercase(),
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.partitions.is_empty() {
            return Err(RagError::Configuration("PARTITIONS must name at least one partition".to_string()));
        }
        for (name, value) in [
            ("DEFAULT_TOP_K", self.default_top_k),
            ("CACHE_MAX_SIZE", self.cache_max_size),
            ("EMBEDDING_DIM", self.embedding_dim),
        ] {
            if value == 0 {
                return Err(RagError::Configuration(format!("{} must be positive", name)));
            }
        }
        if self.cache_ttl.is_zero() {
            return Err(RagError::Configuration("CACHE_TTL_SECONDS must be positive".to_string()));
        }
        if self.rate_limit_requests == 0 || self.rate_limit_window.is_zero() {
            return Err(RagError::Configuration(
                "RATE_LIMIT_REQUESTS and RATE_LIMIT_WINDOW must be positive".to_string(),
            ));
        }

        match embedding_dimension(&self.embedding_model) {
            None => {
                return Err(RagError::Configuration(format!(
                    "Unsupported embedding model: {}",
                    self.embedding_model
                )))
            }
            Some(dim) if dim != self.embedding_dim => {
                return Err(RagError::Configuration(format!(
                    "EMBEDDING_DIM is {} but {} produces {}-dimensional vectors",
                    self.embedding_dim, self.embedding_model, dim
                )))
            }
            Some(_) => {}
        }

        if self.llm_provider == LlmProvider::OpenAi && self.openai_api_key.is_none() {
            return Err(RagError::Configuration(
                "OPENAI_API_KEY is required when LLM_PROVIDER is openai".to_string(),
            ));
        }
        if self.llm_provider == LlmProvider::ClaudeCli {
            self.llm_model.parse::<ClaudeModel>().map_err(|_| {
                RagError::Configuration(format!(
                    "LLM_MODEL must be opus, sonnet or haiku when LLM_PROVIDER is claude-cli, got {}",
                    self.llm_model
                ))
            })?;
        }
        Ok(())
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::builder()
            .ttl(self.cache_ttl)
            .max_entries(self.cache_max_size)
            .build()
    }
}

fn parse<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| RagError::Configuration(format!("Invalid value for {}: {:?} ({})", name, raw, e)))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
