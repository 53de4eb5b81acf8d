//! Console configuration

use std::time::Duration;

/// Configuration for the operator console
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// WHEP negotiation endpoint for the drone video stream
    pub whep_url: String,
    /// Base URL for the rover command/calibration API
    pub api_base: String,
    /// Telemetry WebSocket address
    pub telemetry_url: String,
    /// Delay before the first reconnect attempt after a failure
    pub retry_base: Duration,
    /// Delay for every subsequent reconnect attempt (the backoff cap)
    pub retry_max: Duration,
    /// Delay between telemetry socket reconnects
    pub feed_retry: Duration,
    /// Timeout for outbound HTTP requests (negotiation and commands)
    pub http_timeout: Duration,
    /// Map scale in screen pixels per world meter
    pub pixels_per_meter: f64,
    /// Map surface width in pixels
    pub map_width: u32,
    /// Map surface height in pixels
    pub map_height: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            whep_url: "http://127.0.0.1:8080/drone/whep".into(),
            api_base: "http://127.0.0.1:8080".into(),
            telemetry_url: "ws://127.0.0.1:8765".into(),
            retry_base: Duration::from_millis(500),
            retry_max: Duration::from_secs(5),
            feed_retry: Duration::from_secs(2),
            http_timeout: Duration::from_secs(10),
            pixels_per_meter: 20.0,
            map_width: 640,
            map_height: 480,
        }
    }
}

impl ConsoleConfig {
    /// Build a config from defaults with environment overrides applied
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("CONSOLE_WHEP_URL") {
            config.whep_url = url;
        }
        if let Ok(base) = std::env::var("CONSOLE_API_BASE") {
            config.api_base = base;
        }
        if let Ok(url) = std::env::var("CONSOLE_TELEMETRY_URL") {
            config.telemetry_url = url;
        }
        config
    }
}
