use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use common::StorageConfig;
use field::database::DatabaseConfig;

/// blobctl configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("BLOBFIELD_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("database.url", "sqlite://./blobfield.sqlite?mode=rwc")?
            .set_default("database.in_max", 1000_i64)?
            .set_default("database.max_connections", 10_i64)?
            .set_default("storage.path", "./filestore")?
            .set_default("storage.max_blob_size", 256_i64 * 1024 * 1024)?
            .set_default("storage.namespace", "default")?
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("BLOBFIELD").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
