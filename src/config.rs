//! Runtime configuration loaded from environment variables (and `.env`).

use std::env;
use std::path::PathBuf;

use crate::report::DEFAULT_PLATFORM_NAME;

/// Where records live, where reports go, and the platform name printed in
/// report footers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding `users.json` and `activities.json`
    pub data_dir: PathBuf,
    /// Directory exported reports are saved into
    pub report_dir: PathBuf,
    /// Name shown in document footers
    pub platform_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            report_dir: PathBuf::from("."),
            platform_name: DEFAULT_PLATFORM_NAME.to_string(),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads `ACTIVITY_DATA_DIR`,
    /// `ACTIVITY_REPORT_DIR` and `ACTIVITY_PLATFORM_NAME`. Unset values fall
    /// back to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let platform_name = match lookup("ACTIVITY_PLATFORM_NAME") {
            Some(name) if name.trim().is_empty() => {
                return Err(ConfigError::Empty("ACTIVITY_PLATFORM_NAME"))
            }
            Some(name) => name.trim().to_string(),
            None => defaults.platform_name,
        };

        Ok(Self {
            data_dir: lookup("ACTIVITY_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            report_dir: lookup("ACTIVITY_REPORT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.report_dir),
            platform_name,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Environment variable {0} is set but empty")]
    Empty(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).expect("Config should load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_values_from_environment() {
        let config = Config::from_lookup(lookup_from(&[
            ("ACTIVITY_DATA_DIR", "/var/lib/activities"),
            ("ACTIVITY_REPORT_DIR", "/tmp/reports"),
            ("ACTIVITY_PLATFORM_NAME", " Campus Portal "),
        ]))
        .expect("Config should load");

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/activities"));
        assert_eq!(config.report_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.platform_name, "Campus Portal");
    }

    #[test]
    fn test_blank_platform_name_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("ACTIVITY_PLATFORM_NAME", "  ")]));
        assert!(matches!(err, Err(ConfigError::Empty("ACTIVITY_PLATFORM_NAME"))));
    }
}
