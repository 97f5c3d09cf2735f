use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::ledger::types::Page;

/// Environment variable overriding `postgres_url`
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Mirror text logs to stdout (ignored for JSON output)
    #[serde(default = "default_log_stdout")]
    pub log_stdout: bool,
    /// PostgreSQL connection URL for the ledger store
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

fn default_log_stdout() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

/// History pagination limits
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LedgerConfig {
    pub default_page_limit: i64,
    pub max_page_limit: i64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_page_limit: 10,
            max_page_limit: 100,
        }
    }
}

impl LedgerConfig {
    /// Resolve optional caller paging into a bounded `LIMIT`/`OFFSET`
    pub fn page(&self, limit: Option<i64>, offset: Option<i64>) -> Page {
        let max = self.max_page_limit.max(1);
        Page {
            limit: limit.unwrap_or(self.default_page_limit).clamp(1, max),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", config_path))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// `DATABASE_URL` wins over the configured `postgres_url`
    pub fn database_url(&self) -> Option<String> {
        std::env::var(DATABASE_URL_ENV)
            .ok()
            .filter(|url| !url.is_empty())
            .or_else(|| self.postgres_url.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: info
log_dir: ./logs
log_file: ledger.log
use_json: false
rotation: daily
"#;

    #[test]
    fn test_defaults_for_optional_sections() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.database.acquire_timeout_secs, 5);
        assert_eq!(config.ledger, LedgerConfig::default());
        assert!(config.postgres_url.is_none());
        assert!(config.log_stdout);
    }

    #[test]
    fn test_ledger_section() {
        let yaml = format!("{}ledger:\n  default_page_limit: 20\n  max_page_limit: 50\n", MINIMAL);
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.ledger.default_page_limit, 20);
        assert_eq!(config.ledger.page(Some(80), None).limit, 50);
    }

    #[test]
    fn test_page_resolution() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.page(None, None), Page { limit: 10, offset: 0 });
        assert_eq!(ledger.page(Some(0), Some(-3)), Page { limit: 1, offset: 0 });
        assert_eq!(ledger.page(Some(1000), Some(40)), Page { limit: 100, offset: 40 });
    }

    #[test]
    fn test_missing_file() {
        assert!(AppConfig::load("does-not-exist").is_err());
    }

    #[test]
    fn test_shipped_dev_config_parses() {
        let config = AppConfig::load("dev").unwrap();
        assert_eq!(config.rotation, "daily");
        assert!(config.postgres_url.is_some());
    }
}
