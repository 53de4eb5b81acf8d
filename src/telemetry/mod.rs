//! Telemetry ingestion and world model
//!
//! This module handles:
//! - The WebSocket feed worker and its reconnect loop
//! - The comma-delimited telemetry packet grammar
//! - The shared world model (poses + map calibration)

mod feed;
mod packet;
mod world;

pub use feed::{FeedEvent, TelemetryFeed};
pub use packet::{classify, TelemetryPacket};
pub use world::{Applied, MapCalibration, VehiclePose, WorldModel, WorldState};

use tracing::{info, trace};

/// Classify one feed line and apply it to the world.
///
/// Returns `None` for discarded lines, which must leave the world
/// untouched and trigger no redraw. Calibration traffic is surfaced in
/// the log with the `[VIO]` prefix the operators grep for.
pub async fn ingest_line(world: &WorldModel, line: &str) -> Option<Applied> {
    trace!("[VIO] {line}");

    let packet = match classify(line) {
        Some(packet) => packet,
        None => return None,
    };

    // Calibration traffic is rare and operator-relevant; pose traffic
    // arrives at VIO rate and stays at trace level.
    match &packet {
        TelemetryPacket::CalibrationDone => info!("[VIO] {line} (map recentered on drone)"),
        TelemetryPacket::CalibrationStatus(status) => info!("[VIO] {status}"),
        _ => {}
    }

    Some(world.apply(&packet).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_discarded_line_leaves_world_untouched() {
        let world = WorldModel::new();
        world
            .apply(&TelemetryPacket::DronePose {
                x: 1.0,
                y: 2.0,
                yaw: 0.0,
            })
            .await;
        let before = world.snapshot().await;

        assert_eq!(ingest_line(&world, "ROVER,1.50").await, None);
        assert_eq!(ingest_line(&world, "1.0,2.0").await, None);

        assert_eq!(world.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_rover_line_changes_pose() {
        let world = WorldModel::new();
        let applied = ingest_line(&world, "ROVER,1.50,-2.25,0.30").await;
        assert_eq!(applied, Some(Applied::PoseChanged));

        let rover = world.snapshot().await.rover;
        assert_eq!(rover.x, 1.50);
        assert_eq!(rover.y, -2.25);
        assert_eq!(rover.heading, 0.30);
    }

    #[tokio::test]
    async fn test_calibration_line_changes_calibration_only() {
        let world = WorldModel::new();
        ingest_line(&world, "vio,3.0,4.0,0.0").await;

        let applied = ingest_line(&world, "CALIB_DONE").await;
        assert_eq!(applied, Some(Applied::CalibrationChanged));

        let state = world.snapshot().await;
        assert_eq!(state.calibration.offset_x, -3.0);
        assert_eq!(state.calibration.offset_y, -4.0);
    }

    #[tokio::test]
    async fn test_status_line_is_log_only() {
        let world = WorldModel::new();
        let applied = ingest_line(&world, "CALIB_YAW_OK").await;
        assert_eq!(applied, Some(Applied::LogOnly));
    }
}
