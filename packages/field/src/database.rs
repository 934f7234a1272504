use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use serde::Deserialize;

use crate::cursor::DEFAULT_IN_MAX;

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    /// Ids per `IN (...)` list when reading in chunks. Default: 1000.
    #[serde(default = "default_in_max")]
    pub in_max: usize,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_in_max() -> usize {
    DEFAULT_IN_MAX
}
fn default_max_connections() -> u32 {
    10
}

pub async fn init_db(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(config.url.to_owned());

    opt.max_connections(config.max_connections)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .sqlx_logging(false);

    Database::connect(opt).await
}
