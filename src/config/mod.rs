//! Configuration handling for the application.
//!
//! Everything is read from environment variables with development defaults,
//! so a bare `cargo run --bin api` works against a local SQLite file. Numeric
//! values are validated up front; a malformed value fails start-up instead of
//! silently falling back.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

/// Environment variable names.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_LLM_API_KEY: &str = "LLM_API_KEY";
pub const ENV_OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";
pub const ENV_LLM_BASE_URL: &str = "LLM_BASE_URL";
pub const ENV_LLM_MODEL: &str = "LLM_MODEL";
pub const ENV_LLM_MAX_TOKENS: &str = "LLM_MAX_TOKENS";
pub const ENV_LLM_TEMPERATURE: &str = "LLM_TEMPERATURE";
pub const ENV_LLM_TIMEOUT_SECS: &str = "LLM_TIMEOUT_SECS";
pub const ENV_EMBEDDING_BASE_URL: &str = "EMBEDDING_BASE_URL";
pub const ENV_EMBEDDING_MODEL: &str = "EMBEDDING_MODEL";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "FETCH_TIMEOUT_SECS";

const DEFAULT_DATABASE_URL: &str = "sqlite://.data/docaudit.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_LLM_MODEL: &str = "meta-llama/llama-3.3-8b-instruct:free";
const DEFAULT_LLM_MAX_TOKENS: u32 = 1024;
const DEFAULT_LLM_TEMPERATURE: f32 = 0.2;
const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Settings for the hosted language model.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
}

/// Settings for the embedding endpoint. `base_url == None` selects the local
/// hashing embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingSettings {
    pub base_url: Option<String>,
    pub model: String,
}

/// Application runtime configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    database_url: String,
    bind_addr: String,
    fetch_timeout: Duration,
    llm: LlmSettings,
    embedding: EmbeddingSettings,
}

impl Config {
    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = non_empty(ENV_LLM_API_KEY).or_else(|| non_empty(ENV_OPENROUTER_API_KEY));

        let temperature: f32 = parse_or(ENV_LLM_TEMPERATURE, DEFAULT_LLM_TEMPERATURE)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                field: ENV_LLM_TEMPERATURE,
                reason: format!("{temperature} is outside 0.0..=2.0"),
            });
        }

        let llm = LlmSettings {
            api_key,
            base_url: non_empty(ENV_LLM_BASE_URL)
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            model: non_empty(ENV_LLM_MODEL).unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            max_tokens: parse_or(ENV_LLM_MAX_TOKENS, DEFAULT_LLM_MAX_TOKENS)?,
            temperature,
            timeout: Duration::from_secs(positive(
                ENV_LLM_TIMEOUT_SECS,
                parse_or(ENV_LLM_TIMEOUT_SECS, DEFAULT_LLM_TIMEOUT_SECS)?,
            )?),
        };

        let embedding = EmbeddingSettings {
            base_url: non_empty(ENV_EMBEDDING_BASE_URL),
            model: non_empty(ENV_EMBEDDING_MODEL)
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
        };

        Ok(Self {
            database_url: non_empty(ENV_DATABASE_URL)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            bind_addr: non_empty(ENV_BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            fetch_timeout: Duration::from_secs(positive(
                ENV_FETCH_TIMEOUT_SECS,
                parse_or(ENV_FETCH_TIMEOUT_SECS, DEFAULT_FETCH_TIMEOUT_SECS)?,
            )?),
            llm,
            embedding,
        })
    }

    /// Database connection string (SQLite URL).
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
    /// TCP bind address (host:port) for the HTTP server.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }
    /// Total timeout for fetching a page.
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }
    pub fn llm(&self) -> &LlmSettings {
        &self.llm
    }
    pub fn embedding(&self) -> &EmbeddingSettings {
        &self.embedding
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            field: key,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn positive(key: &'static str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            field: key,
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Ensure environment-variable manipulating tests run serially.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            ENV_DATABASE_URL,
            ENV_BIND_ADDR,
            ENV_LLM_API_KEY,
            ENV_OPENROUTER_API_KEY,
            ENV_LLM_BASE_URL,
            ENV_LLM_MODEL,
            ENV_LLM_MAX_TOKENS,
            ENV_LLM_TEMPERATURE,
            ENV_LLM_TIMEOUT_SECS,
            ENV_EMBEDDING_BASE_URL,
            ENV_EMBEDDING_MODEL,
            ENV_FETCH_TIMEOUT_SECS,
        ] {
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn test_defaults_when_env_missing() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.database_url(), DEFAULT_DATABASE_URL);
        assert_eq!(cfg.bind_addr(), DEFAULT_BIND_ADDR);
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.llm().api_key, None);
        assert_eq!(cfg.llm().model, DEFAULT_LLM_MODEL);
        assert_eq!(cfg.embedding().base_url, None);
    }

    #[test]
    fn test_overrides_when_env_present() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_DATABASE_URL, "sqlite::memory:");
            env::set_var(ENV_BIND_ADDR, "0.0.0.0:9000");
            env::set_var(ENV_OPENROUTER_API_KEY, "or-key");
            env::set_var(ENV_LLM_MAX_TOKENS, "512");
            env::set_var(ENV_LLM_TEMPERATURE, "0.7");
            env::set_var(ENV_EMBEDDING_BASE_URL, "http://localhost:9999/v1");
        }
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.database_url(), "sqlite::memory:");
        assert_eq!(cfg.bind_addr(), "0.0.0.0:9000");
        assert_eq!(cfg.llm().api_key.as_deref(), Some("or-key"));
        assert_eq!(cfg.llm().max_tokens, 512);
        assert!((cfg.llm().temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(
            cfg.embedding().base_url.as_deref(),
            Some("http://localhost:9999/v1")
        );
        clear_env();
    }

    #[test]
    fn test_explicit_llm_key_wins_over_openrouter_key() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_LLM_API_KEY, "primary");
            env::set_var(ENV_OPENROUTER_API_KEY, "secondary");
        }
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.llm().api_key.as_deref(), Some("primary"));
        clear_env();
    }

    #[test]
    fn test_rejects_malformed_numbers() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        unsafe {
            env::set_var(ENV_LLM_MAX_TOKENS, "lots");
        }
        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains(ENV_LLM_MAX_TOKENS));

        clear_env();
        unsafe {
            env::set_var(ENV_FETCH_TIMEOUT_SECS, "0");
        }
        assert!(Config::from_env().is_err());

        clear_env();
        unsafe {
            env::set_var(ENV_LLM_TEMPERATURE, "3.5");
        }
        assert!(Config::from_env().is_err());
        clear_env();
    }
}
