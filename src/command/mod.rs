//! Operator command delivery
//!
//! This module handles:
//! - The backend HTTP API client (rover commands, calibration, UGV call)
//! - Translating map clicks into world-frame GOTO commands
//! - Fire-and-forget dispatch with logged outcomes

mod client;
mod dispatcher;

pub use client::{ApiClient, CalibrationStep, CommandError};
pub use dispatcher::{goto_command, CommandDispatcher, ConsoleCommand};

#[cfg(test)]
pub(crate) use client::test_http;
