//! Config subcommand handlers.

use dialoguer::{Input, Select};
use serde::Serialize;
use tracing::warn;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, LocationSettings, Profile};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

const REDACTED: &str = "********";

/// Copy of the config safe to print: plaintext tokens are masked.
fn redacted(cfg: &Config) -> Result<toml::Value, CliError> {
    let mut value = toml::Value::try_from(cfg).map_err(|e| CliError::Config {
        message: format!("failed to serialize config: {e}"),
    })?;
    if let Some(profiles) = value.get_mut("profiles").and_then(toml::Value::as_table_mut) {
        for (_, profile) in profiles.iter_mut() {
            if let Some(token) = profile.get_mut("token") {
                *token = toml::Value::String(REDACTED.into());
            }
        }
    }
    Ok(value)
}

fn render_toml<T: Serialize>(value: &T) -> String {
    toml::to_string_pretty(value).unwrap_or_else(|e| format!("# failed to render config: {e}"))
}

// ── Init wizard ─────────────────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("lifeline configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // The wizard rewrites the file, so a broken one is replaced rather than fatal.
    let mut cfg = config::load_config().unwrap_or_else(|e| {
        warn!(error = %e, "existing config is invalid, starting from defaults");
        eprintln!("   Existing config could not be read ({e}); it will be replaced.");
        Config::default()
    });

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default(cfg.default_profile_name().to_owned())
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Backend URL
    let server: String = Input::new()
        .with_prompt("Backend URL (including /api)")
        .default("http://localhost:8000/api".into())
        .interact_text()
        .map_err(prompt_err)?;
    server.parse::<url::Url>().map_err(|_| CliError::Validation {
        field: "server".into(),
        reason: format!("invalid URL: {server}"),
    })?;

    let mut profile = Profile::new(server);

    // 3. Token
    let token = rpassword::prompt_password("Bearer token (empty for none): ").map_err(prompt_err)?;
    if !token.is_empty() {
        let store_choices = &[
            "Store in system keyring (recommended)",
            "Save to config file (plaintext)",
        ];
        let store_selection = Select::new()
            .with_prompt("Where to store the token?")
            .items(store_choices)
            .default(0)
            .interact()
            .map_err(prompt_err)?;

        if store_selection == 0 {
            config::store_token(&profile_name, &token)?;
            eprintln!("   Token stored in system keyring");
        } else {
            profile.token = Some(token);
        }
    }

    // 4. Fallback location
    let location: String = Input::new()
        .with_prompt("Fallback location as \"lat,lon\" (empty for none)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    if !location.trim().is_empty() {
        cfg.location = Some(parse_location(&location)?);
    }

    // 5. Write config
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    config::save_config(&cfg)?;

    eprintln!("\nConfiguration written to {}", config_path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: lifeline health");
    Ok(())
}

fn parse_location(input: &str) -> Result<LocationSettings, CliError> {
    let invalid = || CliError::Validation {
        field: "location".into(),
        reason: format!("expected \"lat,lon\", got '{input}'"),
    };
    let (lat, lon) = input.split_once(',').ok_or_else(invalid)?;
    let settings = LocationSettings {
        latitude: lat.trim().parse().map_err(|_| invalid())?,
        longitude: lon.trim().parse().map_err(|_| invalid())?,
    };
    settings.to_coordinate()?;
    Ok(settings)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let safe = redacted(&cfg)?;
            let out = output::render_single(
                &global.output,
                &safe,
                render_toml::<toml::Value>,
                |_| config::config_path().display().to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config::config_path().display());
            Ok(())
        }

        ConfigCommand::SetToken { profile } => {
            let cfg = config::load_config()?;
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));

            if !cfg.profiles.contains_key(&profile_name) {
                let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
                available.sort();
                return Err(CliError::ProfileNotFound {
                    name: profile_name,
                    available: if available.is_empty() {
                        "(none)".into()
                    } else {
                        available.join(", ")
                    },
                });
            }

            let token = rpassword::prompt_password(format!("Token for '{profile_name}': "))
                .map_err(prompt_err)?;
            if token.is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "token cannot be empty".into(),
                });
            }
            config::store_token(&profile_name, &token)?;
            eprintln!("Token stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}
