//! Shared configuration for the lifeline CLI.
//!
//! TOML profiles, trigger tuning, token resolution (env + keyring +
//! plaintext), and translation into `lifeline_core` config types. The CLI
//! layers its flag overrides on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use lifeline_core::{Coordinate, RetryPolicy, ServiceConfig, TlsVerification, TriggerConfig};

const KEYRING_SERVICE: &str = "lifeline";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Countdown and dispatch tuning.
    #[serde(default)]
    pub trigger: TriggerSettings,

    /// Fixed position reported with alerts when no live fix is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<LocationSettings>,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            trigger: TriggerSettings::default(),
            location: None,
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use when none is given.
    pub fn default_profile_name(&self) -> &str {
        self.default_profile.as_deref().unwrap_or("default")
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default)]
    pub insecure: bool,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_timeout() -> u64 {
    15
}

/// Trigger tuning in milliseconds, as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TriggerSettings {
    pub hold_ms: u64,
    pub tick_ms: u64,
    pub location_timeout_ms: u64,
    pub submit_timeout_ms: u64,
    /// One entry per retry.
    pub retry_backoff_ms: Vec<u64>,
    pub history_limit: usize,
}

impl Default for TriggerSettings {
    fn default() -> Self {
        Self {
            hold_ms: 3000,
            tick_ms: 100,
            location_timeout_ms: 5000,
            submit_timeout_ms: 15_000,
            retry_backoff_ms: vec![1000, 3000],
            history_limit: 20,
        }
    }
}

impl TriggerSettings {
    pub fn to_trigger_config(&self) -> Result<TriggerConfig, ConfigError> {
        let config = TriggerConfig {
            hold_duration: Duration::from_millis(self.hold_ms),
            tick_interval: Duration::from_millis(self.tick_ms),
            location_timeout: Duration::from_millis(self.location_timeout_ms),
            submit_timeout: Duration::from_millis(self.submit_timeout_ms),
            retry: RetryPolicy {
                backoff: self
                    .retry_backoff_ms
                    .iter()
                    .copied()
                    .map(Duration::from_millis)
                    .collect(),
            },
            history_limit: self.history_limit,
        };
        config.validate().map_err(|e| ConfigError::Validation {
            field: "trigger".into(),
            reason: e.to_string(),
        })?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct LocationSettings {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationSettings {
    pub fn to_coordinate(&self) -> Result<Coordinate, ConfigError> {
        Coordinate::new(self.latitude, self.longitude).map_err(|e| ConfigError::Validation {
            field: "location".into(),
            reason: e.to_string(),
        })
    }
}

/// A named backend profile.
#[derive(Debug, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL including the API prefix (e.g. "https://sos.example.org/api").
    pub server: String,

    /// Bearer token (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Environment variable holding the bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Profile {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            token: None,
            token_env: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "lifeline", "lifeline").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("lifeline");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
///
/// A missing file yields defaults. A file or env override that does not
/// parse is an error, never a silent fallback.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from a specific file, with `LIFELINE_` env overrides
/// (nested keys split on `__`, e.g. `LIFELINE_TRIGGER__HOLD_MS`).
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LIFELINE_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution (without CLI flags) ────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/token"),
    )?)
}

/// Resolve the bearer token from the credential chain (no CLI flag step).
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's token_env → env var lookup
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a bearer token in the system keyring.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(token)?;
    Ok(())
}

/// Build a `ServiceConfig` from a profile, no CLI flag overrides.
///
/// A profile without any token yields an unauthenticated config; the
/// backend answers 401 if it requires one.
pub fn profile_to_service_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<ServiceConfig, ConfigError> {
    let url: url::Url = profile
        .server
        .parse()
        .map_err(|_| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL: {}", profile.server),
        })?;

    let token = match resolve_token(profile, profile_name) {
        Ok(token) => Some(token),
        Err(ConfigError::NoCredentials { .. }) => None,
        Err(e) => return Err(e),
    };

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(ServiceConfig {
        url,
        token,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or_else(default_timeout)),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.default_profile_name(), "default");
        assert_eq!(config.trigger, TriggerSettings::default());
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn save_then_load_keeps_profiles_and_tuning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.trigger.hold_ms = 5000;
        config.location = Some(LocationSettings {
            latitude: 12.97,
            longitude: 77.59,
        });
        config
            .profiles
            .insert("home".into(), Profile::new("http://10.0.0.2:5000/api"));
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.trigger.hold_ms, 5000);
        assert_eq!(loaded.location, config.location);
        assert_eq!(loaded.profiles["home"].server, "http://10.0.0.2:5000/api");
    }

    #[test]
    fn partial_trigger_table_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[trigger]\nhold_ms = 1500\n").unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.trigger.hold_ms, 1500);
        assert_eq!(loaded.trigger.retry_backoff_ms, vec![1000, 3000]);
    }

    #[test]
    fn malformed_value_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[trigger]\nhold_ms = \"three\"\n\n[location]\nlatitude = 1.0\nlongitude = 2.0\n",
        )
        .unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Figment(_)), "got: {err:?}");
        assert!(err.to_string().contains("hold_ms"), "got: {err}");
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[profiles.home\nserver = ").unwrap();

        assert!(load_config_from(&path).is_err());
    }

    #[test]
    fn trigger_settings_convert() {
        let config = TriggerSettings::default().to_trigger_config().unwrap();
        assert_eq!(config.hold_duration, Duration::from_secs(3));
        assert_eq!(config.retry.max_retries(), 2);
    }

    #[test]
    fn zero_hold_is_a_validation_error() {
        let settings = TriggerSettings {
            hold_ms: 0,
            ..TriggerSettings::default()
        };
        assert!(matches!(
            settings.to_trigger_config(),
            Err(ConfigError::Validation { .. })
        ));
    }

    #[test]
    fn out_of_range_location_is_rejected() {
        let settings = LocationSettings {
            latitude: 91.0,
            longitude: 0.0,
        };
        assert!(settings.to_coordinate().is_err());
    }

    #[test]
    fn plaintext_token_feeds_service_config() {
        let mut profile = Profile::new("https://sos.example.org/api");
        profile.token = Some("tok".into());
        profile.insecure = Some(true);

        let service = profile_to_service_config(&profile, "lifeline-test-plaintext").unwrap();
        assert_eq!(service.url.as_str(), "https://sos.example.org/api");
        assert_eq!(service.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(service.timeout, Duration::from_secs(15));
        assert_eq!(
            service.token.as_ref().map(|t| t.expose_secret().to_owned()),
            Some("tok".to_owned())
        );
    }

    #[test]
    fn invalid_server_url_is_rejected() {
        let profile = Profile::new("not a url");
        assert!(matches!(
            profile_to_service_config(&profile, "x"),
            Err(ConfigError::Validation { ref field, .. }) if field == "server"
        ));
    }
}
