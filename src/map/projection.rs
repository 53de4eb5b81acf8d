//! World-frame to map-frame projection
//!
//! The map is a fixed-size raster with the world origin at its center,
//! +x right and +y up (screen y grows downward, so y is flipped). A
//! calibration offset is added in world space before scaling, which is
//! how "recenter on the drone" works without touching any pose.

use crate::telemetry::MapCalibration;

/// A point on the map raster, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

/// A point in the world frame, in meters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

/// Stateless projector between world meters and map pixels
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    pixels_per_meter: f64,
    width: u32,
    height: u32,
}

impl Projector {
    pub fn new(pixels_per_meter: f64, width: u32, height: u32) -> Self {
        Self {
            pixels_per_meter,
            width,
            height,
        }
    }

    pub fn world_to_screen(&self, calib: &MapCalibration, point: WorldPoint) -> ScreenPoint {
        ScreenPoint {
            x: f64::from(self.width) / 2.0 + (point.x + calib.offset_x) * self.pixels_per_meter,
            y: f64::from(self.height) / 2.0 - (point.y + calib.offset_y) * self.pixels_per_meter,
        }
    }

    /// Exact inverse of [`world_to_screen`](Self::world_to_screen); used to
    /// turn map clicks into GOTO targets.
    pub fn screen_to_world(&self, calib: &MapCalibration, point: ScreenPoint) -> WorldPoint {
        WorldPoint {
            x: (point.x - f64::from(self.width) / 2.0) / self.pixels_per_meter - calib.offset_x,
            y: (f64::from(self.height) / 2.0 - point.y) / self.pixels_per_meter - calib.offset_y,
        }
    }

    /// Map center in pixels
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint {
            x: f64::from(self.width) / 2.0,
            y: f64::from(self.height) / 2.0,
        }
    }
}
