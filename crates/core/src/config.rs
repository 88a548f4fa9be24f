use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{name} must be a valid {expected}, got {value:?}")]
pub struct ConfigError {
    pub name: &'static str,
    pub expected: &'static str,
    pub value: String,
}

/// Tunables for the versioning engine, loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersioningConfig {
    /// Edits older than this start a new snapshot instead of updating in place.
    pub session_timeout: Duration,
    /// Quiet period after the last keystroke before an autosave fires.
    pub autosave_delay: Duration,
    /// Snapshots kept per document by retention pruning.
    pub retention_keep: usize,
    /// Change-notification channel capacity.
    pub event_bus_capacity: usize,
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(30 * 60),
            autosave_delay: Duration::from_secs(30),
            retention_keep: 20,
            event_bus_capacity: 1024,
        }
    }
}

impl VersioningConfig {
    /// Load configuration from environment variables, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            session_timeout: Duration::from_secs(parse_or(
                &lookup,
                "SESSION_TIMEOUT_SECS",
                "u64",
                defaults.session_timeout.as_secs(),
            )?),
            autosave_delay: Duration::from_secs(parse_or(
                &lookup,
                "AUTOSAVE_DELAY_SECS",
                "u64",
                defaults.autosave_delay.as_secs(),
            )?),
            retention_keep: parse_or(&lookup, "RETENTION_KEEP", "usize", defaults.retention_keep)?,
            event_bus_capacity: parse_or(
                &lookup,
                "EVENT_BUS_CAPACITY",
                "usize",
                defaults.event_bus_capacity,
            )?,
        })
    }

    pub fn session_timeout_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.session_timeout)
            .unwrap_or_else(|_| chrono::Duration::days(365 * 100))
    }
}

pub fn parse_or<F, T>(
    lookup: &F,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError {
            name,
            expected,
            value: raw,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = VersioningConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, VersioningConfig::default());
        assert_eq!(config.session_timeout, Duration::from_secs(1800));
        assert_eq!(config.retention_keep, 20);
    }

    #[test]
    fn reads_overrides() {
        let config = VersioningConfig::from_lookup(lookup(&[
            ("SESSION_TIMEOUT_SECS", "600"),
            ("RETENTION_KEEP", " 5 "),
        ]))
        .unwrap();
        assert_eq!(config.session_timeout, Duration::from_secs(600));
        assert_eq!(config.retention_keep, 5);
        assert_eq!(config.autosave_delay, Duration::from_secs(30));
    }

    #[test]
    fn rejects_garbage() {
        let err = VersioningConfig::from_lookup(lookup(&[("AUTOSAVE_DELAY_SECS", "soon")]))
            .unwrap_err();
        assert_eq!(err.name, "AUTOSAVE_DELAY_SECS");
        assert_eq!(err.value, "soon");
    }
}
