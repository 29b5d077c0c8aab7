//! Optional JSON configuration.
//!
//! ```json
//! { "calendar_start": "2024-03-01", "identifier_limit": 30, "output": "home.smt" }
//! ```
//!
//! Every key may be left out.

use crate::Error;
use anyhow::Context;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_IDENTIFIER_LIMIT: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// First calendar day.  Defaults to two days before today.
    pub calendar_start: Option<NaiveDate>,
    /// Longest name written to the runtime stream.
    pub identifier_limit: usize,
    /// Used when no `-o` is given.
    pub output: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calendar_start: None,
            identifier_limit: DEFAULT_IDENTIFIER_LIMIT,
            output: None,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(json).map_err(Error::Config)?;
        if config.identifier_limit == 0 {
            return Err(Error::InvalidArguments("identifier_limit must be at least 1".to_string()));
        }
        Ok(config)
    }

    /// Defaults when no file is named.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let json = std::fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
        let config = Self::from_json(&json).with_context(|| format!("Loading configuration {}", path.display()))?;
        log::info!("configuration loaded from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.identifier_limit, 30);
    }

    #[test]
    fn test_config_values() {
        let config =
            Config::from_json(r#"{ "calendar_start": "2025-01-30", "identifier_limit": 12, "output": "out.smt" }"#)
                .unwrap();
        assert_eq!(config.calendar_start, NaiveDate::from_ymd_opt(2025, 1, 30));
        assert_eq!(config.identifier_limit, 12);
        assert_eq!(config.output, Some(PathBuf::from("out.smt")));
    }

    #[test]
    fn test_rejected_configs() {
        let test_cases = vec![
            r#"{ "colour": "red" }"#,
            r#"{ "calendar_start": "30/01/2025" }"#,
            r#"{ "identifier_limit": -1 }"#,
            r#"{ "identifier_limit": 0 }"#,
            "not json",
        ];
        for json in test_cases {
            assert!(Config::from_json(json).is_err(), "{json}");
        }
    }

    #[test]
    fn no_path_means_defaults() {
        assert_eq!(Config::load(None).unwrap(), Config::default());
    }
}
