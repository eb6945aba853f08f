//! Backend health check.

use owo_colors::OwoColorize;

use lifeline_core::{AlertService, HealthStatus};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn detail(health: &HealthStatus, url: &str, color: bool) -> String {
    let status = match (color, health.is_healthy()) {
        (false, _) => health.status.clone(),
        (true, true) => health.status.green().to_string(),
        (true, false) => health.status.red().to_string(),
    };
    let mut lines = vec![format!("Backend:   {url}"), format!("Status:    {status}")];
    if let Some(ref ts) = health.timestamp {
        lines.push(format!("Timestamp: {ts}"));
    }
    lines.join("\n")
}

pub async fn handle(service: &AlertService, global: &GlobalOpts) -> Result<(), CliError> {
    let health = service.health().await?;
    let url = service.base_url().to_string();
    let color = output::should_color(&global.color);

    let out = output::render_single(
        &global.output,
        &health,
        |h| detail(h, &url, color),
        |h| h.status.clone(),
    );
    output::print_output(&out, global.quiet);

    if health.is_healthy() {
        Ok(())
    } else {
        Err(CliError::Unhealthy {
            status: health.status,
        })
    }
}
