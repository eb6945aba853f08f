//! `lifeline sos`: press-and-hold countdown, then dispatch.
//!
//! The hold starts as soon as the command runs. Ctrl-C (or `--release-after`)
//! releases it; if that lands before the countdown ends the alert is
//! cancelled, otherwise it goes out regardless.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use lifeline_core::{
    AlertService, Coordinate, CoreError, FailureKind, LocationError, LocationProvider,
    SessionState, TriggerController, TriggerSession, TriggerType,
};

use crate::cli::{GlobalOpts, SosArgs};
use crate::config::{Config, LocationSettings};
use crate::error::CliError;
use crate::output;

// ── Location source ─────────────────────────────────────────────────

/// Position taken from flags or the config file, if any.
struct StaticLocation(Option<Coordinate>);

impl LocationProvider for StaticLocation {
    async fn current_location(&self, _timeout: Duration) -> Result<Coordinate, LocationError> {
        self.0.ok_or_else(|| LocationError::Unavailable {
            reason: "no location given (use --lat/--lon or [location] in config)".into(),
        })
    }
}

fn resolve_location(args: &SosArgs, config: &Config) -> Result<StaticLocation, CliError> {
    if args.no_location {
        return Ok(StaticLocation(None));
    }
    if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        return Ok(StaticLocation(Some(Coordinate::new(lat, lon)?)));
    }
    let configured = config
        .location
        .as_ref()
        .map(LocationSettings::to_coordinate)
        .transpose()?;
    Ok(StaticLocation(configured))
}

// ── Rendering ───────────────────────────────────────────────────────

fn countdown_bar(hold: Duration, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(u64::try_from(hold.as_millis()).unwrap_or(u64::MAX));
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.red} {msg:<24} [{bar:30.red/white}]")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar.set_message("SOS armed, Ctrl-C to cancel");
    bar
}

fn update_bar(bar: &ProgressBar, session: &TriggerSession) {
    match session.state {
        SessionState::Arming => {
            let elapsed = session.required_hold.saturating_sub(session.remaining);
            bar.set_position(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
            bar.set_message(format!(
                "SOS in {:.1}s, Ctrl-C to cancel",
                session.remaining.as_secs_f64()
            ));
        }
        SessionState::Dispatching => {
            if let Some(len) = bar.length() {
                bar.set_position(len);
            }
            let msg = if session.attempts > 1 {
                format!("sending alert (attempt {})", session.attempts)
            } else {
                "sending alert".into()
            };
            bar.set_message(msg);
            bar.enable_steady_tick(Duration::from_millis(100));
        }
        _ => bar.finish_and_clear(),
    }
}

fn detail(session: &TriggerSession, color: bool) -> String {
    let mut lines = vec![
        format!("Session:   {}", session.id),
        format!("State:     {}", output::state_label(session.state, color)),
        format!("Trigger:   {}", session.trigger_type),
        format!(
            "Armed at:  {}",
            session.armed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
    ];

    if session.state != SessionState::Cancelled {
        let location = match (&session.location, &session.location_error) {
            (Some(coord), _) => coord.to_string(),
            (None, Some(err)) => format!("(none: {err})"),
            (None, None) => "(none)".into(),
        };
        lines.push(format!("Location:  {location}"));
    }

    if let Some(receipt) = session.receipt() {
        lines.push(format!("Alert ID:  {}", receipt.alert_id));
        lines.push(format!("Notified:  {} contact(s)", receipt.notified_contacts));
        if let Some(ref url) = receipt.location_url {
            lines.push(format!("Map:       {url}"));
        }
        if let Some(ref message) = receipt.message {
            lines.push(format!("Message:   {message}"));
        }
    }
    if let Some(failure) = session.failure() {
        lines.push(format!("Error:     {}", failure.message));
        lines.push(format!("Attempts:  {}", failure.attempts));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

/// Resolves when the user lets go: after `after`, or on Ctrl-C.
async fn release_signal(after: Option<Duration>) {
    match after {
        Some(delay) => tokio::time::sleep(delay).await,
        None => {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

pub async fn handle(
    service: &AlertService,
    config: &Config,
    args: SosArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut trigger = config.trigger.to_trigger_config()?;
    if let Some(hold) = args.hold {
        trigger.hold_duration = hold;
        trigger.tick_interval = trigger.tick_interval.min(hold);
    }
    let hold = trigger.hold_duration;

    let location = resolve_location(&args, config)?;
    let controller = TriggerController::new(trigger, location, service.clone())?;

    let trigger_type = if args.auto {
        TriggerType::Auto
    } else {
        TriggerType::Manual
    };
    let mut handle = controller.begin(trigger_type)?;
    let bar = countdown_bar(hold, global.quiet);

    let release = release_signal(args.release_after);
    tokio::pin!(release);
    let mut released = false;

    let session = loop {
        tokio::select! {
            update = handle.changed() => match update {
                Some(session) if session.is_terminal() => break session,
                Some(session) => update_bar(&bar, &session),
                None => break handle.current(),
            },
            () = &mut release, if !released => {
                released = true;
                match controller.cancel_hold(&handle.id()) {
                    Ok(_) => {}
                    Err(CoreError::CancellationTooLate { .. }) => {
                        bar.suspend(|| {
                            if !global.quiet {
                                eprintln!("Too late to cancel: the alert is being sent");
                            }
                        });
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    };
    bar.finish_and_clear();
    controller.shutdown().await;

    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &session,
        |s| detail(s, color),
        |s| s.server_id().map_or_else(|| s.id.to_string(), str::to_owned),
    );
    output::print_output(&out, global.quiet);

    match session.state {
        SessionState::Cancelled => {
            if !global.quiet {
                eprintln!("Hold released, alert cancelled");
            }
            Ok(())
        }
        SessionState::Confirmed => Ok(()),
        _ => {
            let (kind, reason, attempts) = session.failure().map_or_else(
                || {
                    (
                        FailureKind::Other,
                        format!("session ended in state {}", session.state),
                        session.attempts,
                    )
                },
                |f| (f.kind, f.message.clone(), f.attempts),
            );
            Err(CliError::dispatch_failed(
                session.id.to_string(),
                kind,
                reason,
                attempts,
            ))
        }
    }
}
