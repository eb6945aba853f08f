//! Command dispatch: bridges CLI args -> core calls -> output formatting.

pub mod alerts;
pub mod config_cmd;
pub mod health;
pub mod sos;
pub mod util;

use lifeline_core::AlertService;

use crate::cli::{Command, GlobalOpts};
use crate::config::Config;
use crate::error::CliError;

/// Dispatch a backend-bound command to its handler.
pub async fn dispatch(
    cmd: Command,
    service: &AlertService,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Sos(args) => sos::handle(service, config, args, global).await,
        Command::Alerts(args) => alerts::handle(service, args, global).await,
        Command::Health => health::handle(service, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Config {
            message: "command does not use the alert backend".into(),
        }),
    }
}
