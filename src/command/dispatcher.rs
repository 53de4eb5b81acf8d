use std::sync::Arc;

use tracing::{info, warn};

use crate::map::{Projector, ScreenPoint, WorldPoint};
use crate::telemetry::WorldModel;

use super::client::{ApiClient, CalibrationStep};

/// An operator action bound for the vehicle backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    /// Direct world-frame waypoint.
    Goto { x: f64, y: f64 },
    /// Click on the map canvas, in screen pixels.
    MapClick { x: f64, y: f64 },
    /// Raw command line forwarded verbatim to the rover.
    Rover(String),
    RecalibrateYaw,
    Calibration(CalibrationStep),
    CallUgv,
}

/// Formats a world-frame waypoint the way the rover parses it.
pub fn goto_command(target: WorldPoint) -> String {
    format!("GOTO {:.2} {:.2}", target.x, target.y)
}

/// Routes operator commands to the backend API.
///
/// Dispatch is fire-and-forget: delivery failures are logged and the
/// console moves on, no command is ever retried.
pub struct CommandDispatcher {
    api: ApiClient,
    projector: Projector,
    world: Arc<WorldModel>,
}

impl CommandDispatcher {
    pub fn new(api: ApiClient, projector: Projector, world: Arc<WorldModel>) -> Self {
        Self {
            api,
            projector,
            world,
        }
    }

    pub async fn dispatch(&self, command: ConsoleCommand) {
        match command {
            ConsoleCommand::Goto { x, y } => {
                self.send_rover(goto_command(WorldPoint { x, y })).await;
            }
            ConsoleCommand::MapClick { x, y } => {
                let cmd = self.click_goto(ScreenPoint { x, y }).await;
                self.send_rover(cmd).await;
            }
            ConsoleCommand::Rover(cmd) => {
                self.send_rover(cmd).await;
            }
            ConsoleCommand::RecalibrateYaw => {
                match self.api.recalibrate_yaw().await {
                    Ok(reply) => info!(%reply, "yaw recalibration requested"),
                    Err(err) => warn!(error = %err, "yaw recalibration failed"),
                }
            }
            ConsoleCommand::Calibration(step) => {
                match self.api.calibration_step(step).await {
                    Ok(reply) => info!(?step, %reply, "calibration step acknowledged"),
                    Err(err) => warn!(?step, error = %err, "calibration step failed"),
                }
            }
            ConsoleCommand::CallUgv => {
                match self.api.call_ugv().await {
                    Ok(message) => info!("Server: {message}"),
                    Err(err) => warn!(error = %err, "UGV call failed"),
                }
            }
        }
    }

    /// Converts a map click into the GOTO command for that world point.
    pub async fn click_goto(&self, point: ScreenPoint) -> String {
        let calibration = self.world.snapshot().await.calibration;
        goto_command(self.projector.screen_to_world(&calibration, point))
    }

    async fn send_rover(&self, cmd: String) {
        info!("SEND {cmd}");
        if let Err(err) = self.api.send_rover_command(&cmd).await {
            warn!(%cmd, error = %err, "rover command delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::command::test_http::canned_backend;
    use super::*;
    use crate::telemetry::{ingest_line, WorldModel};
    use reqwest::Client;

    fn projector() -> Projector {
        Projector::new(20.0, 640, 480)
    }

    fn dispatcher(base: String, world: Arc<WorldModel>) -> CommandDispatcher {
        CommandDispatcher::new(ApiClient::new(Client::new(), base), projector(), world)
    }

    #[test]
    fn test_goto_keeps_two_decimals() {
        assert_eq!(
            goto_command(WorldPoint { x: 1.5, y: -2.25 }),
            "GOTO 1.50 -2.25"
        );
        assert_eq!(goto_command(WorldPoint { x: 0.0, y: 0.0 }), "GOTO 0.00 0.00");
    }

    #[tokio::test]
    async fn test_center_click_targets_world_origin() {
        let world = Arc::new(WorldModel::default());
        let dispatcher = dispatcher("http://127.0.0.1:9".into(), world);
        let center = projector().center();

        assert_eq!(dispatcher.click_goto(center).await, "GOTO 0.00 0.00");
    }

    #[tokio::test]
    async fn test_click_accounts_for_calibration() {
        let world = Arc::new(WorldModel::default());
        ingest_line(&world, "DRONE,3.0,4.0,0.0").await;
        ingest_line(&world, "CALIB_DONE").await;
        let dispatcher = dispatcher("http://127.0.0.1:9".into(), world);
        let center = projector().center();

        // The map is recentered on the drone, so its screen center now
        // names the drone's world position.
        assert_eq!(dispatcher.click_goto(center).await, "GOTO 3.00 4.00");
    }

    #[tokio::test]
    async fn test_dispatch_map_click_sends_goto() {
        let (base, request) = canned_backend("200 OK", "text/plain", "ok").await;
        let dispatcher = dispatcher(base, Arc::new(WorldModel::default()));

        dispatcher
            .dispatch(ConsoleCommand::MapClick { x: 320.0, y: 240.0 })
            .await;

        let request = request.await.expect("request captured");
        assert!(request.contains("POST /api/rover-command"));
        assert!(request.contains(r#"{"cmd":"GOTO 0.00 0.00"}"#));
    }

    #[tokio::test]
    async fn test_dispatch_survives_unreachable_backend() {
        let dispatcher = dispatcher(
            "http://127.0.0.1:9".into(),
            Arc::new(WorldModel::default()),
        );

        // Fire-and-forget: a dead backend only produces a log line.
        dispatcher.dispatch(ConsoleCommand::Rover("STOP".into())).await;
        dispatcher.dispatch(ConsoleCommand::CallUgv).await;
    }
}
