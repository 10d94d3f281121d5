use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use name_indexer::CrawlConfig;

/// Names the optional JSON config file
const CONFIG_FILE_VAR: &str = "NAME_INDEXER_CONFIG";

/// Application configuration: defaults, then an optional JSON file, then
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub store_url: String,
    pub names_file: PathBuf,
    pub profiles_file: PathBuf,
    pub minutes_between_index: u64,
    /// Pages fetched per listing; zero or negative walks every page
    pub pages_to_fetch: i64,
    pub max_simultaneous_fetches: usize,
    pub batch_size: usize,
    pub lookup_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:6270".to_string(),
            store_url: "sqlite://search_index.db?mode=rwc".to_string(),
            names_file: PathBuf::from("/var/name-indexer/names.json"),
            profiles_file: PathBuf::from("/var/name-indexer/profiles.json"),
            minutes_between_index: 120,
            pages_to_fetch: -1,
            max_simultaneous_fetches: 75,
            batch_size: 50,
            lookup_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration once at startup.
    pub fn load() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let mut config = match env::var(CONFIG_FILE_VAR) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| env::var(name).ok())?;
        Ok(config)
    }

    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Override fields from variables returned by `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("NAME_INDEXER_API_URL") {
            self.api_url = url;
        }
        if let Some(url) = lookup("NAME_INDEXER_STORE_URL") {
            self.store_url = url;
        }
        if let Some(path) = lookup("NAME_INDEXER_NAMES_FILE") {
            self.names_file = PathBuf::from(path);
        }
        if let Some(path) = lookup("NAME_INDEXER_PROFILES_FILE") {
            self.profiles_file = PathBuf::from(path);
        }
        if let Some(value) = lookup("NAME_INDEXER_INDEX_EVERY") {
            self.minutes_between_index = parse_var("NAME_INDEXER_INDEX_EVERY", &value)?;
        }
        if let Some(value) = lookup("NAME_INDEXER_PAGES_TO_FETCH") {
            self.pages_to_fetch = parse_var("NAME_INDEXER_PAGES_TO_FETCH", &value)?;
        }
        if let Some(value) = lookup("NAME_INDEXER_MAX_FETCHES") {
            self.max_simultaneous_fetches = parse_var("NAME_INDEXER_MAX_FETCHES", &value)?;
        }
        Ok(())
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig::new()
            .with_page_limit(self.pages_to_fetch)
            .with_batch_size(self.batch_size)
            .with_lookup_timeout(Duration::from_secs(self.lookup_timeout_secs))
    }

    pub fn index_interval(&self) -> Duration {
        Duration::from_secs(self.minutes_between_index.saturating_mul(60))
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{name} must be a valid number"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env_overrides_defaults() {
        let env = vars(&[
            ("NAME_INDEXER_API_URL", "http://directory:6270"),
            ("NAME_INDEXER_INDEX_EVERY", "15"),
            ("NAME_INDEXER_PAGES_TO_FETCH", "3"),
        ]);
        let mut config = Config::default();

        config.apply_overrides(|k| env.get(k).cloned()).unwrap();

        assert_eq!(config.api_url, "http://directory:6270");
        assert_eq!(config.index_interval(), Duration::from_secs(15 * 60));
        assert_eq!(config.crawl_config().page_limit, Some(3));
        assert_eq!(config.max_simultaneous_fetches, 75);
    }

    #[test]
    fn test_bad_number_is_rejected() {
        let env = vars(&[("NAME_INDEXER_MAX_FETCHES", "lots")]);
        let err = Config::default()
            .apply_overrides(|k| env.get(k).cloned())
            .unwrap_err();
        assert!(err.to_string().contains("NAME_INDEXER_MAX_FETCHES"));
    }

    #[test]
    fn test_file_fills_missing_fields_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"batch_size": 10, "pages_to_fetch": 0}"#).unwrap();

        let config = Config::from_file(&path).unwrap();

        assert_eq!(config.batch_size, 10);
        assert_eq!(config.crawl_config().page_limit, None);
        assert_eq!(config.api_url, "http://localhost:6270");
    }
}
