//! Application settings loading from config.toml
//!
//! Every section has defaults, so an empty or partial file still produces a working
//! configuration. Secrets (API keys, service keys) never live in this file; they are
//! read from the environment by the services that need them.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::{path::Path, path::PathBuf, time::Duration};

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Catalog cache settings
    pub catalog: CatalogConfig,
    /// AI assistant proxy settings
    pub assistant: AssistantConfig,
    /// Object storage settings
    pub storage: StorageConfig,
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the HTTP server binds to
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// `[catalog]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Seconds a cached catalog snapshot is served before it is refreshed
    pub cache_ttl_secs: u64,
    /// Optional JSON snapshot served when the database is unreachable and nothing
    /// has been cached yet
    pub fallback_snapshot: Option<PathBuf>,
}

impl CatalogConfig {
    /// Cache TTL as a [`Duration`].
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 60,
            fallback_snapshot: None,
        }
    }
}

/// `[assistant]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Base URL of the chat-completion API
    pub endpoint: String,
    /// Model name sent with every request
    pub model: String,
    /// Fixed system persona
    pub persona: String,
    /// Maximum number of questions a generated quiz may contain
    pub quiz_max_questions: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            persona: "You are a friendly drone-flight instructor for school students. \
                      Answer clearly and keep explanations short."
                .to_string(),
            quiz_max_questions: crate::core::quiz::DEFAULT_MAX_QUESTIONS,
        }
    }
}

/// `[storage]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base URL of the managed storage service
    pub base_url: String,
    /// Bucket for product images
    pub product_bucket: String,
    /// Bucket for curriculum documents
    pub curriculum_bucket: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            product_bucket: "product-images".to_string(),
            curriculum_bucket: "curriculum-docs".to_string(),
        }
    }
}

/// Loads application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - A field has the wrong type
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {}: {e}", path_ref.display()),
    })
}

/// Loads configuration from the default location (./config.toml), falling back to
/// built-in defaults when the file does not exist.
pub fn load_default_config() -> Result<AppConfig> {
    let path = Path::new("config.toml");
    if path.exists() {
        load_config(path)
    } else {
        tracing::warn!("config.toml not found, using built-in defaults");
        Ok(AppConfig::default())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            [server]
            bind_address = "127.0.0.1:3000"

            [catalog]
            cache_ttl_secs = 5
            fallback_snapshot = "catalog_snapshot.json"

            [assistant]
            endpoint = "http://localhost:9999/v1"
            model = "tiny"
            persona = "Be brief."
            quiz_max_questions = 3

            [storage]
            base_url = "https://storage.example.test"
            product_bucket = "shop"
            curriculum_bucket = "docs"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:3000");
        assert_eq!(config.catalog.cache_ttl(), Duration::from_secs(5));
        assert_eq!(
            config.catalog.fallback_snapshot,
            Some(PathBuf::from("catalog_snapshot.json"))
        );
        assert_eq!(config.assistant.quiz_max_questions, 3);
        assert_eq!(config.storage.product_bucket, "shop");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: AppConfig = toml::from_str("[server]\nbind_address = \"0.0.0.0:1\"").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:1");
        assert_eq!(config.catalog.cache_ttl_secs, 60);
        assert!(config.catalog.fallback_snapshot.is_none());
        assert_eq!(config.assistant.quiz_max_questions, 10);
        assert_eq!(config.storage.curriculum_bucket, "curriculum-docs");
    }

    #[test]
    fn test_invalid_type_is_config_error() {
        let dir = std::env::temp_dir().join(format!("drone-academy-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[catalog]\ncache_ttl_secs = \"soon\"").unwrap();

        let result = load_config(&path);
        assert!(matches!(result, Err(Error::Config { message: _ })));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = load_config("/definitely/not/here/config.toml");
        assert!(matches!(result, Err(Error::Config { message: _ })));
    }
}
