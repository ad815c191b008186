//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Pipeline configuration.
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Pipeline behavior configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Operator recorded on generated journal headers.
    #[serde(default = "default_created_by")]
    pub created_by: String,
    /// Rows per bulk insert statement.
    #[serde(default = "default_insert_chunk_size")]
    pub insert_chunk_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            created_by: default_created_by(),
            insert_chunk_size: default_insert_chunk_size(),
        }
    }
}

fn default_created_by() -> String {
    "saldo-pipeline".to_string()
}

fn default_insert_chunk_size() -> usize {
    1000
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("SALDO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
