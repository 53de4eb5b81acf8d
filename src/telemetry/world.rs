//! World model shared between telemetry ingest and the map
//!
//! This module handles:
//! - Latest-value pose state for the drone and the rover
//! - Map calibration (world-frame offset locking the drone to the origin)
//! - Classifying each applied packet so the caller knows whether to redraw

use tokio::sync::RwLock;

use crate::telemetry::packet::TelemetryPacket;

/// Planar pose in the world frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehiclePose {
    pub x: f64,
    pub y: f64,
    /// Heading in whatever unit the producer sends (yaw for the drone);
    /// rendered as-is, never converted
    pub heading: f64,
}

/// Additive world-frame offset applied before projection
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MapCalibration {
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Snapshot of everything the map renders
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldState {
    /// Drone pose; starts at the origin until the first VIO packet lands
    pub drone: VehiclePose,
    /// Rover pose; starts at the origin until the first ROVER packet lands
    pub rover: VehiclePose,
    pub calibration: MapCalibration,
}

/// What applying a packet did to the world, from the renderer's view
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Applied {
    /// A pose moved; the map must redraw
    PoseChanged,
    /// Calibration changed; the map must redraw
    CalibrationChanged,
    /// Nothing the map cares about; log and move on
    LogOnly,
}

/// Single-writer world model.
///
/// The telemetry ingest task is the only writer; the map and the command
/// dispatcher read snapshots.
pub struct WorldModel {
    state: RwLock<WorldState>,
}

impl WorldModel {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(WorldState::default()),
        }
    }

    /// Apply one classified packet to the world.
    pub async fn apply(&self, packet: &TelemetryPacket) -> Applied {
        match packet {
            TelemetryPacket::DronePose { x, y, yaw } => {
                let mut state = self.state.write().await;
                state.drone = VehiclePose {
                    x: *x,
                    y: *y,
                    heading: *yaw,
                };
                Applied::PoseChanged
            }
            TelemetryPacket::RoverPose { x, y, heading } => {
                let mut state = self.state.write().await;
                state.rover = VehiclePose {
                    x: *x,
                    y: *y,
                    heading: *heading,
                };
                Applied::PoseChanged
            }
            TelemetryPacket::CalibrationDone => {
                // Lock the drone's current position to the map origin
                let mut state = self.state.write().await;
                state.calibration = MapCalibration {
                    offset_x: -state.drone.x,
                    offset_y: -state.drone.y,
                };
                Applied::CalibrationChanged
            }
            TelemetryPacket::CalibrationStatus(_) => Applied::LogOnly,
        }
    }

    /// Current world state for rendering or click-to-world transforms.
    pub async fn snapshot(&self) -> WorldState {
        *self.state.read().await
    }
}

impl Default for WorldModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drone_pose_update() {
        let world = WorldModel::new();
        let applied = world
            .apply(&TelemetryPacket::DronePose {
                x: 0.12,
                y: 3.40,
                yaw: -0.78,
            })
            .await;

        assert_eq!(applied, Applied::PoseChanged);
        let state = world.snapshot().await;
        assert_eq!(state.drone.x, 0.12);
        assert_eq!(state.drone.y, 3.40);
        assert_eq!(state.drone.heading, -0.78);
    }

    #[tokio::test]
    async fn test_rover_starts_at_origin_until_first_packet() {
        let world = WorldModel::new();
        assert_eq!(world.snapshot().await.rover, VehiclePose::default());

        world
            .apply(&TelemetryPacket::RoverPose {
                x: 1.50,
                y: -2.25,
                heading: 0.30,
            })
            .await;

        let rover = world.snapshot().await.rover;
        assert_eq!(rover.x, 1.50);
        assert_eq!(rover.y, -2.25);
        assert_eq!(rover.heading, 0.30);
    }

    #[tokio::test]
    async fn test_calibration_recenters_on_drone() {
        let world = WorldModel::new();
        world
            .apply(&TelemetryPacket::DronePose {
                x: 3.0,
                y: 4.0,
                yaw: 0.0,
            })
            .await;

        let applied = world.apply(&TelemetryPacket::CalibrationDone).await;
        assert_eq!(applied, Applied::CalibrationChanged);

        let state = world.snapshot().await;
        assert_eq!(state.calibration.offset_x, -3.0);
        assert_eq!(state.calibration.offset_y, -4.0);
        // Calibrated world position of the drone is now the origin
        assert_eq!(state.drone.x + state.calibration.offset_x, 0.0);
        assert_eq!(state.drone.y + state.calibration.offset_y, 0.0);
    }

    #[tokio::test]
    async fn test_calibration_status_does_not_touch_state() {
        let world = WorldModel::new();
        let before = world.snapshot().await;

        let applied = world
            .apply(&TelemetryPacket::CalibrationStatus("CALIB_STEP,2".into()))
            .await;

        assert_eq!(applied, Applied::LogOnly);
        assert_eq!(world.snapshot().await, before);
    }
}
