//! Video transport abstraction over the WebRTC peer connection
//!
//! The session worker talks to the transport through the [`VideoTransport`]
//! and [`TransportFactory`] traits so the lifecycle logic can be exercised
//! without real media plumbing. The production implementation wraps a
//! receive-only peer connection.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

/// Asynchronous health reports from a live transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportHealth {
    Connected,
    Disconnected,
    Failed,
    /// The transport was closed locally; never triggers a reconnect
    Closed,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer connection error: {0}")]
    Peer(#[from] webrtc::Error),
    #[error("no local description after candidate gathering")]
    MissingLocalDescription,
}

/// One receive-only video transport.
///
/// At most one instance is live at a time; the session worker tears the
/// previous one down before creating the next.
#[async_trait]
pub trait VideoTransport: Send {
    /// Produce the local offer, waiting until candidate gathering has
    /// completed so the offer carries every candidate.
    async fn create_offer(&mut self) -> Result<String, TransportError>;

    /// Apply the remote answer returned by the negotiation endpoint.
    async fn apply_answer(&mut self, sdp: &str) -> Result<(), TransportError>;

    /// Tear down the transport. Errors are swallowed; teardown must always
    /// leave the transport released.
    async fn close(&mut self);
}

/// Creates transports for connect attempts
#[async_trait]
pub trait TransportFactory: Send + Sync {
    type Transport: VideoTransport + 'static;

    /// Build a fresh transport. Health reports for its whole lifetime are
    /// delivered on `health_tx`.
    async fn create(
        &self,
        health_tx: mpsc::Sender<TransportHealth>,
    ) -> Result<Self::Transport, TransportError>;
}

/// Production transport: a WebRTC peer connection with one recvonly video
/// transceiver.
pub struct WebRtcTransport {
    pc: Arc<RTCPeerConnection>,
}

#[async_trait]
impl VideoTransport for WebRtcTransport {
    async fn create_offer(&mut self) -> Result<String, TransportError> {
        let offer = self.pc.create_offer(None).await?;
        let mut gather_complete = self.pc.gathering_complete_promise().await;
        self.pc.set_local_description(offer).await?;
        // No timeout here: with no ICE servers configured gathering is
        // host-candidates only and completes promptly.
        let _ = gather_complete.recv().await;

        self.pc
            .local_description()
            .await
            .map(|desc| desc.sdp)
            .ok_or(TransportError::MissingLocalDescription)
    }

    async fn apply_answer(&mut self, sdp: &str) -> Result<(), TransportError> {
        let answer = RTCSessionDescription::answer(sdp.to_string())?;
        self.pc.set_remote_description(answer).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.pc.close().await {
            debug!(error = %e, "peer connection close reported an error");
        }
    }
}

/// Factory for [`WebRtcTransport`]
pub struct WebRtcFactory;

#[async_trait]
impl TransportFactory for WebRtcFactory {
    type Transport = WebRtcTransport;

    async fn create(
        &self,
        health_tx: mpsc::Sender<TransportHealth>,
    ) -> Result<WebRtcTransport, TransportError> {
        // Default codecs cover the H264 the drone streams; the answerer
        // narrows the list down during negotiation.
        let mut media = MediaEngine::default();
        media.register_default_codecs()?;
        let mut registry = Registry::new();
        registry = register_default_interceptors(registry, &mut media)?;
        let api = APIBuilder::new()
            .with_media_engine(media)
            .with_interceptor_registry(registry)
            .build();
        // The console reaches the drone over the local link; no STUN/TURN
        let pc = Arc::new(api.new_peer_connection(RTCConfiguration::default()).await?);

        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            let report = match state {
                RTCPeerConnectionState::Connected => Some(TransportHealth::Connected),
                RTCPeerConnectionState::Disconnected => Some(TransportHealth::Disconnected),
                RTCPeerConnectionState::Failed => Some(TransportHealth::Failed),
                RTCPeerConnectionState::Closed => Some(TransportHealth::Closed),
                _ => None,
            };
            debug!(?state, "peer connection state");
            let health_tx = health_tx.clone();
            Box::pin(async move {
                if let Some(health) = report {
                    let _ = health_tx.send(health).await;
                }
            })
        }));

        pc.on_track(Box::new(move |track, _, _| {
            info!(id = %track.id(), kind = %track.kind(), ssrc = track.ssrc(), "remote track attached");
            Box::pin(async {})
        }));

        pc.add_transceiver_from_kind(
            RTPCodecType::Video,
            Some(RTCRtpTransceiverInit {
                direction: RTCRtpTransceiverDirection::Recvonly,
                send_encodings: vec![],
            }),
        )
        .await?;

        Ok(WebRtcTransport { pc })
    }
}
