use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};

use crate::lookup::open_food_facts::DEFAULT_BASE_URL;

pub const DATA_DIR_VAR: &str = "ALLERGEN_SCAN_DATA_DIR";
pub const LOOKUP_URL_VAR: &str = "ALLERGEN_SCAN_LOOKUP_URL";
pub const LOOKUP_TIMEOUT_VAR: &str = "ALLERGEN_SCAN_LOOKUP_TIMEOUT_SECS";
pub const DEBUG_VAR: &str = "ALLERGEN_SCAN_DEBUG";

const DATABASE_FILE: &str = "allergen_scanner.sqlite3";
const SETTINGS_FILE: &str = "settings.json";

/// Runtime configuration for the scanner.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    /// Holds the history database and the settings file
    pub data_dir: PathBuf,

    /// Root of the Open Food Facts API
    pub lookup_base_url: String,

    /// Upper bound on a single product lookup
    pub lookup_timeout: Duration,

    pub debug: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./allergen-scan-data"),
            lookup_base_url: DEFAULT_BASE_URL.to_string(),
            lookup_timeout: Duration::from_secs(15),
            debug: false,
        }
    }
}

impl ScannerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Unset or blank keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(dir) = get(DATA_DIR_VAR) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(url) = get(LOOKUP_URL_VAR) {
            config.lookup_base_url = url;
        }
        if let Some(secs) = get(LOOKUP_TIMEOUT_VAR) {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("{LOOKUP_TIMEOUT_VAR} must be whole seconds, got '{secs}'"))?;
            config.lookup_timeout = Duration::from_secs(secs.max(1));
        }
        config.debug = get(DEBUG_VAR)
            .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(config)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ScannerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ScannerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, ScannerConfig::default());
        assert_eq!(config.lookup_timeout, Duration::from_secs(15));
        assert_eq!(config.log_level(), log::LevelFilter::Info);
        assert!(config
            .database_path()
            .ends_with("allergen-scan-data/allergen_scanner.sqlite3"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_from(&[
            (DATA_DIR_VAR, "/tmp/scanner"),
            (LOOKUP_URL_VAR, "http://localhost:8080/"),
            (LOOKUP_TIMEOUT_VAR, "3"),
            (DEBUG_VAR, "TRUE"),
        ])
        .unwrap();

        assert_eq!(config.settings_path(), PathBuf::from("/tmp/scanner/settings.json"));
        assert_eq!(config.lookup_base_url, "http://localhost:8080/");
        assert_eq!(config.lookup_timeout, Duration::from_secs(3));
        assert!(config.debug);
        assert_eq!(config.log_level(), log::LevelFilter::Debug);
    }

    #[test]
    fn blank_values_fall_back_and_bad_timeout_is_rejected() {
        let config = config_from(&[(DATA_DIR_VAR, "  "), (DEBUG_VAR, "yes")]).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./allergen-scan-data"));
        assert!(!config.debug);

        let err = config_from(&[(LOOKUP_TIMEOUT_VAR, "soon")]).unwrap_err();
        assert!(err.to_string().contains(LOOKUP_TIMEOUT_VAR));
    }
}
