//! Top-down tactical map
//!
//! This module handles:
//! - World-frame to map-frame projection (and its inverse, for clicks)
//! - Composing world snapshots into drawable frames

mod projection;
mod render;

pub use projection::{Projector, ScreenPoint, WorldPoint};
pub use render::{compose, MapFrame, Marker, RenderSink, TraceRenderer};
