//! HTTP client for the vehicle command backend

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("endpoint rejected command with HTTP {status}")]
    Rejected { status: u16 },
}

/// Steps of the rover calibration routine, in the order the operator
/// walks through them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationStep {
    Start,
    Right,
    Forward,
    Finish,
}

impl CalibrationStep {
    fn path(&self) -> &'static str {
        match self {
            CalibrationStep::Start => "/api/calib/start",
            CalibrationStep::Right => "/api/calib/right",
            CalibrationStep::Forward => "/api/calib/forward",
            CalibrationStep::Finish => "/api/calib/finish",
        }
    }
}

#[derive(Serialize)]
struct RoverCommand<'a> {
    cmd: &'a str,
}

#[derive(Deserialize)]
struct UgvReply {
    message: String,
}

/// Thin client over the command backend's HTTP API
pub struct ApiClient {
    client: reqwest::Client,
    base: String,
}

impl ApiClient {
    /// `base` is the backend origin without a trailing slash.
    pub fn new(client: reqwest::Client, base: String) -> Self {
        Self { client, base }
    }

    /// `POST /api/rover-command` with a JSON `{"cmd": ...}` body.
    pub async fn send_rover_command(&self, cmd: &str) -> Result<(), CommandError> {
        debug!(%cmd, "posting rover command");
        let resp = self
            .client
            .post(format!("{}/api/rover-command", self.base))
            .json(&RoverCommand { cmd })
            .send()
            .await?;
        self.check(resp.status())?;
        Ok(())
    }

    /// `POST /api/recalibrate-yaw`; the plain-text reply goes to the log.
    pub async fn recalibrate_yaw(&self) -> Result<String, CommandError> {
        self.post_for_text("/api/recalibrate-yaw").await
    }

    /// One step of the calibration routine; plain-text reply.
    pub async fn calibration_step(&self, step: CalibrationStep) -> Result<String, CommandError> {
        self.post_for_text(step.path()).await
    }

    /// `POST /api/call-ugv`; the JSON reply carries an operator message.
    pub async fn call_ugv(&self) -> Result<String, CommandError> {
        let resp = self
            .client
            .post(format!("{}/api/call-ugv", self.base))
            .send()
            .await?;
        self.check(resp.status())?;
        let reply: UgvReply = resp.json().await?;
        Ok(reply.message)
    }

    async fn post_for_text(&self, path: &str) -> Result<String, CommandError> {
        let resp = self
            .client
            .post(format!("{}{}", self.base, path))
            .send()
            .await?;
        self.check(resp.status())?;
        Ok(resp.text().await?)
    }

    fn check(&self, status: reqwest::StatusCode) -> Result<(), CommandError> {
        if status.is_success() {
            Ok(())
        } else {
            Err(CommandError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
