//! Application configuration.
//!
//! Resolution order: built-in defaults, then `<data_dir>/config.json` when it
//! exists, then environment overrides. The data directory itself comes from
//! `OFFICE_LEDGER_DATA_DIR` (default `./data`) so the config file can be
//! found.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_DATA_DIR: &str = "OFFICE_LEDGER_DATA_DIR";
pub const ENV_LOG_DIR: &str = "OFFICE_LEDGER_LOG_DIR";
pub const ENV_LOG_FILTER: &str = "RUST_LOG";

const CONFIG_FILE: &str = "config.json";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_DB_FILE: &str = "ledger.db";
const DEFAULT_LOG_FILTER: &str = "info,office_ledger_lib=debug";

/// Table names in the record store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetNames {
    pub daily: String,
    pub balance: String,
    pub memo_long: String,
    pub memo_mid: String,
    pub memo_short: String,
    pub planned_tasks: String,
    pub active_tasks: String,
}

impl Default for SheetNames {
    fn default() -> Self {
        Self {
            daily: "일일결산".into(),
            balance: "잔액".into(),
            memo_long: "장기메모".into(),
            memo_mid: "중기메모".into(),
            memo_short: "단기메모".into(),
            planned_tasks: "예정업무".into(),
            active_tasks: "진행업무".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// SQLite file name, relative to `data_dir`.
    pub db_file: String,
    /// Defaults to `<data_dir>/logs`.
    pub log_dir: Option<PathBuf>,
    pub log_filter: String,
    pub sheets: SheetNames,
    /// Set when `config.json` existed but could not be used.
    #[serde(skip)]
    pub file_error: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            db_file: DEFAULT_DB_FILE.into(),
            log_dir: None,
            log_filter: DEFAULT_LOG_FILTER.into(),
            sheets: SheetNames::default(),
            file_error: None,
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl AppConfig {
    /// Resolve the configuration from the environment and the data directory.
    pub fn load() -> Self {
        let data_dir = env_non_empty(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        let mut config = Self::from_dir(&data_dir);
        config.data_dir = data_dir;

        if let Some(dir) = env_non_empty(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(filter) = env_non_empty(ENV_LOG_FILTER) {
            config.log_filter = filter;
        }
        config
    }

    /// Defaults overlaid with `<data_dir>/config.json`, without env overrides.
    pub fn from_dir(data_dir: &Path) -> Self {
        let path = data_dir.join(CONFIG_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Self {
                    data_dir: data_dir.to_path_buf(),
                    ..Self::default()
                };
            }
            Err(e) => {
                return Self {
                    data_dir: data_dir.to_path_buf(),
                    file_error: Some(format!("{}: {e}", path.display())),
                    ..Self::default()
                };
            }
        };

        match serde_json::from_str::<Self>(&raw) {
            Ok(mut parsed) => {
                parsed.data_dir = data_dir.to_path_buf();
                parsed
            }
            Err(e) => Self {
                data_dir: data_dir.to_path_buf(),
                file_error: Some(format!("{}: {e}", path.display())),
                ..Self::default()
            },
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(&self.db_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("office_ledger_cfg_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("create scratch dir");
        dir
    }

    fn clear_env() {
        std::env::remove_var(ENV_DATA_DIR);
        std::env::remove_var(ENV_LOG_DIR);
        std::env::remove_var(ENV_LOG_FILTER);
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.db_path(), PathBuf::from("data").join("ledger.db"));
        assert_eq!(config.log_dir(), PathBuf::from("data").join("logs"));
        assert_eq!(config.sheets.daily, "일일결산");
        assert_eq!(config.sheets.balance, "잔액");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = scratch_dir("missing");
        let config = AppConfig::from_dir(&dir);
        assert_eq!(config.data_dir, dir);
        assert_eq!(config.db_file, "ledger.db");
        assert!(config.file_error.is_none());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_partial_file_overlays_defaults() {
        let dir = scratch_dir("partial");
        fs::write(
            dir.join("config.json"),
            r#"{ "db_file": "office.db", "sheets": { "daily": "ledger" } }"#,
        )
        .unwrap();

        let config = AppConfig::from_dir(&dir);
        assert_eq!(config.db_path(), dir.join("office.db"));
        assert_eq!(config.sheets.daily, "ledger");
        assert_eq!(config.sheets.balance, "잔액");
        assert_eq!(config.log_filter, "info,office_ledger_lib=debug");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = scratch_dir("malformed");
        fs::write(dir.join("config.json"), "{ not json").unwrap();

        let config = AppConfig::from_dir(&dir);
        assert_eq!(config.db_file, "ledger.db");
        assert!(config.file_error.is_some());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        let dir = scratch_dir("env");
        std::env::set_var(ENV_DATA_DIR, &dir);
        std::env::set_var(ENV_LOG_DIR, dir.join("custom-logs"));
        std::env::set_var(ENV_LOG_FILTER, "warn");

        let config = AppConfig::load();
        assert_eq!(config.data_dir, dir);
        assert_eq!(config.log_dir(), dir.join("custom-logs"));
        assert_eq!(config.log_filter, "warn");

        clear_env();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    #[serial]
    fn test_blank_env_is_ignored() {
        clear_env();
        std::env::set_var(ENV_DATA_DIR, "   ");
        let config = AppConfig::load();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        clear_env();
    }
}
