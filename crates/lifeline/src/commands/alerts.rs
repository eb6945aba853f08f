//! Alert history, lookup, and resolution.

use tabled::Tabled;

use lifeline_core::{Alert, AlertService};

use crate::cli::{AlertsArgs, AlertsCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Raised")]
    raised: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Trigger")]
    trigger: String,
    #[tabled(rename = "Location")]
    location: String,
}

impl From<&Alert> for AlertRow {
    fn from(a: &Alert) -> Self {
        Self {
            id: a.id.clone(),
            raised: util::format_time(a.raised_at.as_ref()),
            status: a.status.to_string(),
            trigger: a
                .trigger_type
                .map_or_else(|| "-".into(), |t| t.to_string()),
            location: a.location.map_or_else(|| "-".into(), |c| c.to_string()),
        }
    }
}

fn detail(a: &Alert) -> String {
    let mut lines = vec![
        format!("ID:        {}", a.id),
        format!("Status:    {}", a.status),
        format!("Raised:    {}", util::format_time(a.raised_at.as_ref())),
    ];
    if let Some(trigger) = a.trigger_type {
        lines.push(format!("Trigger:   {trigger}"));
    }
    match a.location {
        Some(coord) => lines.push(format!("Location:  {coord}")),
        None => lines.push("Location:  (none)".into()),
    }
    if let Some(ref url) = a.location_url {
        lines.push(format!("Map:       {url}"));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    service: &AlertService,
    args: AlertsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        AlertsCommand::List => {
            let alerts = service.history().await?;
            let out = output::render_list(
                &global.output,
                &alerts,
                |a| AlertRow::from(a),
                |a| a.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AlertsCommand::Get { id } => {
            let alert = service.alert(&id).await?;
            let out = output::render_single(&global.output, &alert, detail, |a| a.id.clone());
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AlertsCommand::Deactivate { id } => {
            let prompt = format!("Mark alert {id} as resolved?");
            if !util::confirm("alerts deactivate", &prompt, global.yes)? {
                return Ok(());
            }
            service.deactivate(&id).await?;
            if !global.quiet {
                eprintln!("Alert {id} deactivated");
            }
            Ok(())
        }
    }
}
