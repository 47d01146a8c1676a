//! Client configuration
//!
//! Settings are loaded from `settings.json` in the Nuvola config directory
//! when present, otherwise every field takes its default. Login credentials
//! come from the environment so they never have to be written to disk.

use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::Deserialize;
use std::time::Duration;

use crate::sync::WindowPolicy;

/// Settings filename in the Nuvola config directory
const SETTINGS_FILE: &str = "settings.json";

const DEFAULT_REFRESH_SECS: u64 = 6 * 60 * 60;

/// Tunable behaviour of the client
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Scheme and host of the remote service
    pub base_url: String,
    /// Cookie carrying the session credential
    pub session_cookie: String,
    /// `code` values in a JSON body that mean the access credential expired
    pub expired_codes: Vec<i64>,
    pub timeout_secs: u64,
    pub refresh: RefreshIntervals,
    pub homeworks: WindowPolicy,
    pub topics: WindowPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "https://nuvola.madisoft.it".to_string(),
            session_cookie: "nuvola".to_string(),
            expired_codes: vec![401],
            timeout_secs: 30,
            refresh: RefreshIntervals::default(),
            homeworks: WindowPolicy::default(),
            topics: WindowPolicy::default(),
        }
    }
}

impl Settings {
    /// Load settings from the config directory, falling back to defaults
    pub fn load() -> Result<Self> {
        if config::config_exists(SETTINGS_FILE) {
            return config::load_json(SETTINGS_FILE);
        }
        Ok(Self::default())
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse settings JSON")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Staleness thresholds, in seconds, for each collection
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshIntervals {
    pub homeworks: u64,
    pub events: u64,
    pub topics: u64,
    pub irregularities: u64,
    pub time_windows: u64,
    pub subjects: u64,
}

impl Default for RefreshIntervals {
    fn default() -> Self {
        Self {
            homeworks: DEFAULT_REFRESH_SECS,
            events: DEFAULT_REFRESH_SECS,
            topics: DEFAULT_REFRESH_SECS,
            irregularities: DEFAULT_REFRESH_SECS,
            time_windows: DEFAULT_REFRESH_SECS,
            subjects: DEFAULT_REFRESH_SECS,
        }
    }
}

/// Convert a seconds setting into a chrono delta
pub(crate) fn seconds(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

/// Username and password for the web login
#[derive(Clone)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Load credentials from `NUVOLA_USERNAME` and `NUVOLA_PASSWORD`
    ///
    /// Returns `None` unless both are set and non-empty.
    pub fn from_env() -> Option<Self> {
        let username = std::env::var("NUVOLA_USERNAME").ok()?;
        let password = std::env::var("NUVOLA_PASSWORD").ok()?;
        if username.is_empty() || password.is_empty() {
            return None;
        }
        Some(Self { username, password })
    }
}
