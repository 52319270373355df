pub mod doctor;
pub mod init;
pub mod serve;
pub mod sessions;

use std::path::Path;

use banter_config::AppConfig;
use banter_memory::SqliteSessionStore;

pub(crate) fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load(path).map_err(|e| format!("Failed to load config: {e}"))?)
}

pub(crate) async fn open_store(
    config: &AppConfig,
) -> Result<SqliteSessionStore, Box<dyn std::error::Error>> {
    Ok(SqliteSessionStore::new(&config.database.path, config.database.max_connections).await?)
}
