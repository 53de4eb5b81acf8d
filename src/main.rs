mod command;
mod config;
mod map;
mod session;
mod telemetry;

use std::sync::Arc;

use command::{ApiClient, CalibrationStep, CommandDispatcher, ConsoleCommand};
use config::ConsoleConfig;
use map::{compose, Projector, RenderSink, TraceRenderer};
use session::{HttpNegotiator, SessionConfig, SessionEvent, SessionManager, WebRtcFactory};
use telemetry::{ingest_line, Applied, FeedEvent, TelemetryFeed, WorldModel};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let config = ConsoleConfig::from_env();

    info!("Operator console starting");
    info!("  WHEP endpoint: {}", config.whep_url);
    info!("  command API:   {}", config.api_base);
    info!("  telemetry:     {}", config.telemetry_url);

    let http = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let world = Arc::new(WorldModel::new());
    let projector = Projector::new(config.pixels_per_meter, config.map_width, config.map_height);
    let dispatcher = CommandDispatcher::new(
        ApiClient::new(http.clone(), config.api_base.clone()),
        projector,
        world.clone(),
    );

    let mut session = SessionManager::spawn(
        Arc::new(WebRtcFactory),
        Arc::new(HttpNegotiator::new(http, config.whep_url.clone())),
        SessionConfig {
            retry_base: config.retry_base,
            retry_max: config.retry_max,
        },
    );

    // Video starts unattended, the way the console always has.
    session.connect().await?;

    let feed = TelemetryFeed::spawn(config.telemetry_url.clone(), config.feed_retry);
    tokio::spawn(handle_feed_events(feed, world, projector));

    run_console(&mut session, &dispatcher).await?;

    info!("Operator console stopped");
    Ok(())
}

/// Main event loop: session status on one side, operator input on the other.
async fn run_console(
    session: &mut SessionManager,
    dispatcher: &CommandDispatcher,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = session.recv() => match event {
                Some(SessionEvent::StatusChanged(status)) => {
                    let controls = status.controls();
                    info!(
                        connect = controls.connect_enabled,
                        disconnect = controls.disconnect_enabled,
                        "video: {status}"
                    );
                }
                Some(SessionEvent::ReconnectScheduled { delay, attempt }) => {
                    info!("Retrying WHEP in {}ms (attempt {attempt})", delay.as_millis());
                }
                None => {
                    warn!("session worker stopped");
                    break;
                }
            },
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    handle_operator_line(session, dispatcher, line.trim()).await?;
                }
                Ok(None) => {
                    debug!("stdin closed, console continues headless");
                    stdin_open = false;
                }
                Err(err) => {
                    warn!("stdin read failed: {err}");
                    stdin_open = false;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                session.disconnect().await?;
                break;
            }
        }
    }

    Ok(())
}

async fn handle_operator_line(
    session: &SessionManager,
    dispatcher: &CommandDispatcher,
    line: &str,
) -> anyhow::Result<()> {
    if line.is_empty() {
        return Ok(());
    }
    match parse_operator_line(line) {
        Some(OperatorAction::Connect) => session.connect().await?,
        Some(OperatorAction::Disconnect) => session.disconnect().await?,
        Some(OperatorAction::Command(cmd)) => dispatcher.dispatch(cmd).await,
        None => warn!("Unrecognized input: {line}"),
    }
    Ok(())
}

enum OperatorAction {
    Connect,
    Disconnect,
    Command(ConsoleCommand),
}

fn parse_operator_line(line: &str) -> Option<OperatorAction> {
    let mut parts = line.split_whitespace();
    let action = match parts.next()? {
        "connect" => OperatorAction::Connect,
        "disconnect" => OperatorAction::Disconnect,
        "goto" => {
            let x = parts.next()?.parse().ok()?;
            let y = parts.next()?.parse().ok()?;
            OperatorAction::Command(ConsoleCommand::Goto { x, y })
        }
        "click" => {
            let x = parts.next()?.parse().ok()?;
            let y = parts.next()?.parse().ok()?;
            OperatorAction::Command(ConsoleCommand::MapClick { x, y })
        }
        "cmd" => {
            let rest = line.split_once(char::is_whitespace)?.1.trim();
            if rest.is_empty() {
                return None;
            }
            OperatorAction::Command(ConsoleCommand::Rover(rest.to_string()))
        }
        "recalibrate-yaw" => OperatorAction::Command(ConsoleCommand::RecalibrateYaw),
        "call-ugv" => OperatorAction::Command(ConsoleCommand::CallUgv),
        "calib" => {
            let step = match parts.next()? {
                "start" => CalibrationStep::Start,
                "right" => CalibrationStep::Right,
                "forward" => CalibrationStep::Forward,
                "finish" => CalibrationStep::Finish,
                _ => return None,
            };
            OperatorAction::Command(ConsoleCommand::Calibration(step))
        }
        _ => return None,
    };
    Some(action)
}

/// Applies telemetry to the world model and redraws the map when a
/// pose or the calibration changed.
async fn handle_feed_events(mut feed: TelemetryFeed, world: Arc<WorldModel>, projector: Projector) {
    let mut renderer = TraceRenderer;
    loop {
        match feed.next_event().await {
            Some(FeedEvent::Connected) => {
                info!("[VIO] telemetry link up");
            }
            Some(FeedEvent::Line(line)) => {
                match ingest_line(&world, &line).await {
                    Some(Applied::PoseChanged | Applied::CalibrationChanged) => {
                        let frame = compose(&projector, &world.snapshot().await);
                        renderer.render(&frame);
                    }
                    Some(Applied::LogOnly) | None => {}
                }
            }
            Some(FeedEvent::Disconnected { reason }) => {
                warn!("[VIO] telemetry link lost: {reason}");
            }
            None => {
                debug!("telemetry feed closed");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rover_verbs() {
        assert!(matches!(
            parse_operator_line("goto 1.5 -2"),
            Some(OperatorAction::Command(ConsoleCommand::Goto { x, y }))
                if x == 1.5 && y == -2.0
        ));
        assert!(matches!(
            parse_operator_line("cmd GOTO 1 2"),
            Some(OperatorAction::Command(ConsoleCommand::Rover(cmd))) if cmd == "GOTO 1 2"
        ));
        assert!(matches!(
            parse_operator_line("calib right"),
            Some(OperatorAction::Command(ConsoleCommand::Calibration(
                CalibrationStep::Right
            )))
        ));
    }

    #[test]
    fn test_parse_session_verbs() {
        assert!(matches!(
            parse_operator_line("connect"),
            Some(OperatorAction::Connect)
        ));
        assert!(matches!(
            parse_operator_line("disconnect"),
            Some(OperatorAction::Disconnect)
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_lines() {
        assert!(parse_operator_line("goto 1").is_none());
        assert!(parse_operator_line("click a b").is_none());
        assert!(parse_operator_line("calib sideways").is_none());
        assert!(parse_operator_line("launch").is_none());
    }
}
