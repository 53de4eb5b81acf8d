//! Telemetry feed over WebSocket
//!
//! This module handles:
//! - Connecting to the telemetry WebSocket endpoint
//! - Delivering text frames upstream as feed events
//! - Reconnecting on a fixed delay whenever the socket drops
//!
//! The feed never gives up: connect failures and disconnects both land
//! back in the retry loop until the console shuts down.

use std::time::Duration;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Events emitted by the feed worker
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Socket established
    Connected,
    /// One telemetry line, exactly as received
    Line(String),
    /// Socket lost; the worker retries on its own
    Disconnected { reason: String },
}

/// Handle to the background feed worker
pub struct TelemetryFeed {
    event_rx: mpsc::Receiver<FeedEvent>,
}

impl TelemetryFeed {
    /// Spawn the feed worker against `url`, retrying every `retry` after
    /// a failure or disconnect.
    pub fn spawn(url: String, retry: Duration) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        tokio::spawn(feed_loop(url, retry, event_tx));
        Self { event_rx }
    }

    /// Next feed event; `None` once the worker has stopped.
    pub async fn next_event(&mut self) -> Option<FeedEvent> {
        self.event_rx.recv().await
    }
}

async fn feed_loop(url: String, retry: Duration, event_tx: mpsc::Sender<FeedEvent>) {
    loop {
        match connect_async(&url).await {
            Ok((mut stream, _)) => {
                info!(%url, "telemetry feed connected");
                if event_tx.send(FeedEvent::Connected).await.is_err() {
                    return;
                }

                let reason = read_frames(&mut stream, &event_tx).await;
                warn!(%reason, "telemetry feed lost");
                if event_tx
                    .send(FeedEvent::Disconnected { reason })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Err(e) => {
                warn!(%url, error = %e, "telemetry feed connect failed");
            }
        }

        if event_tx.is_closed() {
            return;
        }
        tokio::time::sleep(retry).await;
    }
}

/// Pump frames until the socket closes; returns the loss reason.
async fn read_frames<S>(
    stream: &mut tokio_tungstenite::WebSocketStream<S>,
    event_tx: &mpsc::Sender<FeedEvent>,
) -> String
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(line)) => {
                if event_tx.send(FeedEvent::Line(line)).await.is_err() {
                    return "console shut down".to_string();
                }
            }
            Ok(Message::Close(_)) => return "closed by peer".to_string(),
            Ok(other) => {
                debug!(kind = ?other, "ignoring non-text telemetry frame");
            }
            Err(e) => return e.to_string(),
        }
    }
    "stream ended".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::SinkExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    async fn serve_once(listener: TcpListener, lines: Vec<&'static str>) {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = accept_async(stream).await.expect("handshake");
        for line in lines {
            ws.send(Message::Text(line.to_string())).await.expect("send");
        }
        ws.close(None).await.expect("close");
    }

    #[tokio::test]
    async fn test_feed_delivers_lines_then_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}", listener.local_addr().expect("addr"));
        tokio::spawn(serve_once(listener, vec!["ROVER,1.0,2.0,3.0", "CALIB_DONE"]));

        let mut feed = TelemetryFeed::spawn(url, Duration::from_millis(20));
        assert_eq!(feed.next_event().await, Some(FeedEvent::Connected));
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Line("ROVER,1.0,2.0,3.0".into()))
        );
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Line("CALIB_DONE".into()))
        );
        assert!(matches!(
            feed.next_event().await,
            Some(FeedEvent::Disconnected { .. })
        ));
    }

    #[tokio::test]
    async fn test_feed_reconnects_after_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}", listener.local_addr().expect("addr"));
        tokio::spawn(async move {
            for line in ["first", "second"] {
                let (stream, _) = listener.accept().await.expect("accept");
                let mut ws = accept_async(stream).await.expect("handshake");
                ws.send(Message::Text(format!("{line},0,0,0")))
                    .await
                    .expect("send");
                ws.close(None).await.expect("close");
            }
        });

        let mut feed = TelemetryFeed::spawn(url, Duration::from_millis(20));
        assert_eq!(feed.next_event().await, Some(FeedEvent::Connected));
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Line("first,0,0,0".into()))
        );
        assert!(matches!(
            feed.next_event().await,
            Some(FeedEvent::Disconnected { .. })
        ));

        // Second session arrives after the retry delay
        assert_eq!(feed.next_event().await, Some(FeedEvent::Connected));
        assert_eq!(
            feed.next_event().await,
            Some(FeedEvent::Line("second,0,0,0".into()))
        );
    }
}
