//! Telemetry packet grammar
//!
//! Inbound telemetry is newline-free, comma-delimited UTF-8 text. Packets
//! are classified by string prefix:
//!
//! ```text
//! ROVER,<x>,<y>,<heading>   rover pose update
//! CALIB_DONE                calibration complete, recenter on the drone
//! CALIB_<anything>          calibration status, log-only
//! <tag>,<x>,<y>,<yaw>       drone pose update (default, tag ignored)
//! ```
//!
//! Lines with fewer comma fields than their shape requires are discarded
//! silently; a discarded line never touches pose state. Numeric fields are
//! not validated: a non-numeric field becomes NaN in the pose, matching the
//! upstream producers' contract of always sending well-formed numbers.

/// A classified telemetry packet
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryPacket {
    /// Rover pose update
    RoverPose { x: f64, y: f64, heading: f64 },
    /// Calibration routine finished
    CalibrationDone,
    /// Calibration progress line, carried verbatim for the log
    CalibrationStatus(String),
    /// Drone pose update from the VIO stream
    DronePose { x: f64, y: f64, yaw: f64 },
}

/// Field counts required by each pose shape (tag/prefix included)
const ROVER_FIELDS: usize = 4;
const DRONE_FIELDS: usize = 4;

/// Classify one telemetry line.
///
/// Returns `None` for lines that must be discarded (too few fields for
/// their shape). Discarding is silent by design.
pub fn classify(line: &str) -> Option<TelemetryPacket> {
    if line.starts_with("ROVER") {
        let parts: Vec<&str> = line.split(',').collect();
        if parts.len() < ROVER_FIELDS {
            return None;
        }
        return Some(TelemetryPacket::RoverPose {
            x: numeric(parts[1]),
            y: numeric(parts[2]),
            heading: numeric(parts[3]),
        });
    }

    if line.starts_with("CALIB_DONE") {
        return Some(TelemetryPacket::CalibrationDone);
    }

    if line.starts_with("CALIB_") {
        return Some(TelemetryPacket::CalibrationStatus(line.to_string()));
    }

    // Default shape: <tag>,<x>,<y>,<yaw> from the VIO stream
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < DRONE_FIELDS {
        return None;
    }
    Some(TelemetryPacket::DronePose {
        x: numeric(parts[1]),
        y: numeric(parts[2]),
        yaw: numeric(parts[3]),
    })
}

/// Parse a numeric field without validation: unparseable input becomes NaN
fn numeric(field: &str) -> f64 {
    field.trim().parse().unwrap_or(f64::NAN)
}
