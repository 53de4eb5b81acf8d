//! Map frame composition and render sinks
//!
//! Rendering is split from state: [`compose`] projects a world snapshot
//! into a [`MapFrame`] of screen-space markers, and a [`RenderSink`]
//! consumes frames. The console ships a tracing-backed sink; tests swap
//! in recording sinks.

use tracing::debug;

use crate::map::projection::{Projector, ScreenPoint, WorldPoint};
use crate::telemetry::{VehiclePose, WorldState};

/// One vehicle marker in screen space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub at: ScreenPoint,
    /// Heading as the producer reported it; sinks draw the direction
    /// tick from it without converting
    pub heading: f64,
}

/// Everything a sink needs to draw one map frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapFrame {
    pub drone: Marker,
    pub rover: Marker,
}

/// Project a world snapshot into screen space.
pub fn compose(projector: &Projector, state: &WorldState) -> MapFrame {
    let calib = &state.calibration;
    let marker = |pose: &VehiclePose| Marker {
        at: projector.world_to_screen(
            calib,
            WorldPoint {
                x: pose.x,
                y: pose.y,
            },
        ),
        heading: pose.heading,
    };
    MapFrame {
        drone: marker(&state.drone),
        rover: marker(&state.rover),
    }
}

/// Consumer of composed map frames
pub trait RenderSink: Send {
    fn render(&mut self, frame: &MapFrame);
}

/// Sink that writes frames to the log; the console's default
pub struct TraceRenderer;

impl RenderSink for TraceRenderer {
    fn render(&mut self, frame: &MapFrame) {
        debug!(
            drone_x = frame.drone.at.x,
            drone_y = frame.drone.at.y,
            rover_x = frame.rover.at.x,
            rover_y = frame.rover.at.y,
            "map frame"
        );
    }
}
