use clap::Args;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Relational metadata store settings.
#[derive(Debug, Clone, Args)]
pub struct DbSettings {
    /// Full connection string; overrides the individual settings below
    #[arg(long = "db-conn-str", env = "DB_CONN_STR")]
    pub conn_str: Option<String>,
    #[arg(long = "db-name", env = "DB_NAME", default_value = "search_engine")]
    pub name: String,
    #[arg(long = "db-user", env = "DB_USER", default_value = "admin")]
    pub user: String,
    #[arg(long = "db-pass", env = "DB_PASS", hide_env_values = true)]
    pub pass: Option<String>,
    #[arg(long = "db-host", env = "DB_HOST", default_value = "postgres_service")]
    pub host: String,
    #[arg(long = "db-port", env = "DB_PORT", default_value_t = 5432)]
    pub port: u16,
}

impl DbSettings {
    pub fn connection_string(&self) -> Result<String, ConfigError> {
        if let Some(conn) = &self.conn_str {
            return Ok(conn.clone());
        }
        let pass = self.pass.as_deref().ok_or(ConfigError::MissingPassword)?;
        Ok(format!(
            "dbname={} user={} password={} host={} port={}",
            self.name, self.user, pass, self.host, self.port
        ))
    }
}

/// Everything the worker needs, built once at startup.
#[derive(Debug, Clone, Args)]
pub struct IndexerConfig {
    /// Redis URL of the work queue
    #[arg(long, env = "REDIS_URL", default_value = "redis://redis_service:6379/")]
    pub redis_url: String,
    /// Name of the list holding document ids to index
    #[arg(long, env = "QUEUE_NAME", default_value = "indexing_queue")]
    pub queue_name: String,
    /// Seconds a queue pop may block; 0 waits forever
    #[arg(long, default_value_t = 0)]
    pub pop_timeout_secs: u64,
    /// Inverted index directory
    #[arg(long, env = "INDEX_PATH", default_value = "/shared_data/search_index.db")]
    pub index_path: PathBuf,
    /// Directory that archive paths from the metadata store are relative to
    #[arg(long, env = "WARC_BASE_PATH", default_value = "/shared_data/")]
    pub warc_base_path: PathBuf,
    /// Connection attempts per dependency before giving up
    #[arg(long, default_value_t = 10)]
    pub connect_attempts: u32,
    /// Delay before the first reconnect; doubles per attempt
    #[arg(long, default_value_t = 5)]
    pub connect_delay_secs: u64,
    #[command(flatten)]
    pub db: DbSettings,
}

impl IndexerConfig {
    pub fn connect_delay(&self) -> Duration {
        Duration::from_secs(self.connect_delay_secs)
    }
}

/// Metadata paths are relative to the archive base directory, even when
/// written with a leading slash.
pub fn resolve_archive_path(base: &Path, file_path: &str) -> PathBuf {
    base.join(file_path.trim_start_matches('/'))
}
