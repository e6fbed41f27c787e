use crate::ApiConfig;
use config::{Config, ConfigError, Environment, File};
use embedding_lab_core::{
    embedding::RetryPolicy, openai::OpenAiSettings, store::StoreConfig, CoreConfig,
};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config/embedding-lab";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub openai: OpenAiApiSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub max_request_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub collection: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiApiSettings {
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub embedding_model: String,
    pub chat_model: String,
    pub max_retries: u32,
    pub retry_interval_ms: u64,
}

impl Settings {
    /// Loads defaults, then `config/embedding-lab.{toml,yaml,json}` if present,
    /// then `LAB__SECTION__KEY` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Some(DEFAULT_CONFIG_FILE))
    }

    pub fn load_from(file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081_i64)?
            .set_default("server.cors_origins", vec!["*"])?
            .set_default("server.max_request_size", 16_i64 * 1024 * 1024)?
            .set_default("database.url", "sqlite:./data/embedding_lab.db")?
            .set_default("database.collection", "vectors")?
            .set_default("database.max_connections", 5_i64)?
            .set_default("openai.embedding_model", "text-embedding-ada-002")?
            .set_default("openai.chat_model", "gpt-3.5-turbo")?
            .set_default("openai.max_retries", 10_i64)?
            .set_default("openai.retry_interval_ms", 5000_i64)?;

        if let Some(path) = file {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        let mut settings: Settings = builder
            .add_source(
                Environment::with_prefix("LAB")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.openai.api_key = fallback_api_key(
            settings.openai.api_key.take(),
            std::env::var("OPENAI_API_KEY").ok(),
        );

        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Invalid server port".to_string());
        }

        if self.database.collection.trim().is_empty() {
            return Err("Collection name is required".to_string());
        }

        if self.database.max_connections == 0 {
            return Err("At least one database connection is required".to_string());
        }

        if self.openai.max_retries == 0 {
            return Err("max_retries must be at least 1".to_string());
        }

        Ok(())
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            cors_origins: self.server.cors_origins.clone(),
            max_request_size: self.server.max_request_size,
        }
    }

    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            store_config: StoreConfig {
                database_url: self.database.url.clone(),
                collection: self.database.collection.clone(),
                max_connections: self.database.max_connections,
                ..Default::default()
            },
            openai: OpenAiSettings {
                api_base: self.openai.api_base.clone(),
                embedding_model: self.openai.embedding_model.clone(),
                chat_model: self.openai.chat_model.clone(),
            },
            retry: RetryPolicy::new(
                self.openai.max_retries,
                Duration::from_millis(self.openai.retry_interval_ms),
            ),
            api_key: self.openai.api_key.clone(),
        }
    }
}

/// Blank keys count as absent, so `OPENAI_API_KEY=` in a `.env` file
/// does not hide a missing credential.
fn fallback_api_key(configured: Option<String>, env: Option<String>) -> Option<String> {
    let non_blank = |key: Option<String>| key.filter(|k| !k.trim().is_empty());
    non_blank(configured).or_else(|| non_blank(env))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::load_from(None).unwrap();

        assert_eq!(settings.server.port, 8081);
        assert_eq!(settings.server.cors_origins, vec!["*".to_string()]);
        assert_eq!(settings.database.collection, "vectors");
        assert_eq!(settings.openai.embedding_model, "text-embedding-ada-002");
        assert_eq!(settings.openai.max_retries, 10);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_core_config_conversion() {
        let settings = Settings::load_from(None).unwrap();
        let core = settings.core_config();

        assert_eq!(core.store_config.collection, "vectors");
        assert_eq!(core.retry.max_attempts, 10);
        assert_eq!(core.retry.interval, Duration::from_millis(5000));
        assert_eq!(core.openai.chat_model, "gpt-3.5-turbo");
    }

    #[test]
    fn test_blank_api_keys_are_absent() {
        assert_eq!(fallback_api_key(Some(String::new()), Some("  ".to_string())), None);
        assert_eq!(fallback_api_key(None, Some(String::new())), None);
        assert_eq!(
            fallback_api_key(Some(" ".to_string()), Some("sk-env".to_string())),
            Some("sk-env".to_string())
        );
        assert_eq!(
            fallback_api_key(Some("sk-file".to_string()), Some("sk-env".to_string())),
            Some("sk-file".to_string())
        );
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::load_from(None).unwrap();
        settings.openai.max_retries = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::load_from(None).unwrap();
        settings.database.collection = String::new();
        assert!(settings.validate().is_err());

        let mut settings = Settings::load_from(None).unwrap();
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }
}
