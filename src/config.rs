use std::path::PathBuf;

use crate::{storage::json::DEFAULT_BACKUPS_TO_KEEP, store::DB_KEY};

pub const DATA_DIR_ENV: &str = "TODOSTORE_DATA_DIR";
pub const LOG_ENV: &str = "TODOSTORE_LOG";
pub const BACKUPS_ENV: &str = "TODOSTORE_BACKUPS";
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directory holding `<storage_key>.json` and its backups
    pub data_dir: PathBuf,
    pub storage_key: String,
    pub backups_to_keep: usize,
    /// `tracing` filter directive, e.g. `debug` or `todostore=info`
    pub log_filter: String,
    /// Problems found while resolving, logged once the subscriber is installed
    pub warnings: Vec<String>,
}

impl Config {
    /// Resolve from an explicit data dir (CLI flag) and the process environment.
    pub fn resolve(data_dir: Option<PathBuf>) -> Self {
        Self::from_lookup(data_dir, |name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(data_dir: Option<PathBuf>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = data_dir
            .or_else(|| lookup(DATA_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(default_data_dir);

        let mut warnings = vec![];
        let backups_to_keep = lookup(BACKUPS_ENV)
            .and_then(|raw| match raw.trim().parse() {
                Ok(n) => Some(n),
                Err(_) => {
                    warnings.push(format!("Ignoring invalid {}='{}'", BACKUPS_ENV, raw));
                    None
                }
            })
            .unwrap_or(DEFAULT_BACKUPS_TO_KEEP);

        Self {
            data_dir,
            storage_key: DB_KEY.to_string(),
            backups_to_keep,
            log_filter: lookup(LOG_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            warnings,
        }
    }

    /// Emit the warnings collected by [`Config::from_lookup`]. Call after
    /// [`crate::logging::init`].
    pub fn log_warnings(&self) {
        for warning in &self.warnings {
            tracing::warn!("{}", warning);
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("todostore")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins_over_env() {
        let config = Config::from_lookup(Some(PathBuf::from("/flag")), |name| match name {
            DATA_DIR_ENV => Some(String::from("/env")),
            _ => None,
        });
        assert_eq!(config.data_dir, PathBuf::from("/flag"));
    }

    #[test]
    fn test_env_values() {
        let config = Config::from_lookup(None, |name| match name {
            DATA_DIR_ENV => Some(String::from("/env")),
            BACKUPS_ENV => Some(String::from("2")),
            LOG_ENV => Some(String::from("debug")),
            _ => None,
        });
        assert_eq!(config.data_dir, PathBuf::from("/env"));
        assert_eq!(config.backups_to_keep, 2);
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.storage_key, DB_KEY);
        assert!(config.warnings.is_empty());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(None, |name| match name {
            BACKUPS_ENV => Some(String::from("lots")),
            _ => None,
        });
        assert!(config.data_dir.ends_with("todostore"));
        assert_eq!(config.backups_to_keep, DEFAULT_BACKUPS_TO_KEEP);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_invalid_backups_value_is_kept_as_warning() {
        let config = Config::from_lookup(None, |name| match name {
            BACKUPS_ENV => Some(String::from("lots")),
            _ => None,
        });
        assert_eq!(config.backups_to_keep, DEFAULT_BACKUPS_TO_KEEP);
        assert_eq!(config.warnings.len(), 1);
        assert!(config.warnings[0].contains(BACKUPS_ENV));
        assert!(config.warnings[0].contains("lots"));
    }
}
