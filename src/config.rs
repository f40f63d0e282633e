//! Runtime configuration
//!
//! Read once from environment variables. Every key has a default suitable
//! for local development:
//!
//! | Variable                | Default                          |
//! |-------------------------|----------------------------------|
//! | `DATA_DIR`              | `data`                           |
//! | `PORT`                  | `3000`                           |
//! | `LUKE_API_URL`          | LUKE food consumption table      |
//! | `FIRST_YEAR`            | `1950`                           |
//! | `LAST_YEAR`             | `2023`                           |
//! | `CONSUMPTION_TTL_SECS`  | `3600`                           |
//! | `SESSION_IDLE_SECS`     | `1800`                           |

use crate::fetch::{DEFAULT_FIRST_YEAR, DEFAULT_LAST_YEAR, LUKE_API_URL};
use crate::consumption::YearRange;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the two emission-factor CSV files
    pub data_dir: PathBuf,
    pub port: u16,
    pub luke_api_url: String,
    /// Years requested from the statistics API
    pub years: YearRange,
    /// How long a fetched consumption table is reused
    pub consumption_ttl: Duration,
    /// Idle time after which a diet session is dropped
    pub session_idle: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            port: 3000,
            luke_api_url: LUKE_API_URL.to_string(),
            years: YearRange::new(DEFAULT_FIRST_YEAR, DEFAULT_LAST_YEAR),
            consumption_ttl: Duration::from_secs(3600),
            session_idle: Duration::from_secs(1800),
        }
    }
}

impl Config {
    /// Build configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Unparseable numbers are reported rather than silently replaced by
    /// the default.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_dir = lookup("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let port = parse_or(&lookup, "PORT", defaults.port)?;

        let luke_api_url = lookup("LUKE_API_URL").unwrap_or(defaults.luke_api_url);

        let first_year = parse_or(&lookup, "FIRST_YEAR", defaults.years.start)?;
        let last_year = parse_or(&lookup, "LAST_YEAR", defaults.years.end)?;
        if first_year > last_year {
            anyhow::bail!("FIRST_YEAR ({}) is after LAST_YEAR ({})", first_year, last_year);
        }

        let consumption_ttl = Duration::from_secs(parse_or(
            &lookup,
            "CONSUMPTION_TTL_SECS",
            defaults.consumption_ttl.as_secs(),
        )?);
        let session_idle = Duration::from_secs(parse_or(
            &lookup,
            "SESSION_IDLE_SECS",
            defaults.session_idle.as_secs(),
        )?);

        Ok(Self {
            data_dir,
            port,
            luke_api_url,
            years: YearRange::new(first_year, last_year),
            consumption_ttl,
            session_idle,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: '{}' ({})", key, raw, e)),
        None => Ok(default),
    }
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
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.years, YearRange::new(1950, 2023));
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.luke_api_url, LUKE_API_URL);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATA_DIR", "/srv/food"),
            ("PORT", "8080"),
            ("FIRST_YEAR", "2000"),
            ("LAST_YEAR", "2010"),
            ("SESSION_IDLE_SECS", "60"),
        ]))
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("/srv/food"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.years, YearRange::new(2000, 2010));
        assert_eq!(config.session_idle, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let err = Config::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_inverted_year_range_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("FIRST_YEAR", "2020"),
            ("LAST_YEAR", "2000"),
        ]));
        assert!(result.is_err());
    }
}
