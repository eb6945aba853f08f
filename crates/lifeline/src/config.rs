//! CLI configuration: thin wrapper around `lifeline_config` shared types.
//!
//! Re-exports the shared types and adds resolution that respects
//! `GlobalOpts` flag overrides (--server, --token, --insecure, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use lifeline_core::{ServiceConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use lifeline_config::{
    Config, LocationSettings, Profile, config_path, load_config, save_config,
    store_token,
};

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .unwrap_or_else(|| config.default_profile_name().to_owned())
}

fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    names.sort();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

fn parse_server(url_str: &str) -> Result<url::Url, CliError> {
    url_str.parse().map_err(|_| CliError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {url_str}"),
    })
}

/// Build the `ServiceConfig` for this invocation.
///
/// Starts from the active profile (if any) and applies flag overrides on
/// top. Without a profile, `--server` alone is enough.
pub fn resolve_service_config(
    global: &GlobalOpts,
    config: &Config,
) -> Result<ServiceConfig, CliError> {
    let profile_name = active_profile_name(global, config);

    let mut service = match (config.profiles.get(&profile_name), &global.server) {
        (Some(profile), _) => lifeline_config::profile_to_service_config(profile, &profile_name)?,
        (None, _) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(config),
            });
        }
        (None, Some(server)) => {
            let mut service = ServiceConfig::new(parse_server(server)?);
            service.timeout = Duration::from_secs(config.defaults.timeout);
            service
        }
        (None, None) => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref server) = global.server {
        service.url = parse_server(server)?;
    }
    if let Some(ref token) = global.token {
        service.token = Some(SecretString::from(token.clone()));
    }
    if global.insecure || config.defaults.insecure {
        service.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        service.timeout = Duration::from_secs(secs);
    }

    Ok(service)
}
