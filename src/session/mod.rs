//! WHEP video session
//!
//! This module handles:
//! - Offer/answer negotiation against the WHEP endpoint
//! - The WebRTC transport behind a trait seam
//! - The session lifecycle worker (connect, health, teardown, backoff)

mod manager;
mod negotiation;
mod transport;

pub use manager::{Controls, SessionConfig, SessionEvent, SessionManager, SessionStatus};
pub use negotiation::{HttpNegotiator, NegotiationError, SessionNegotiator};
pub use transport::{
    TransportError, TransportFactory, TransportHealth, VideoTransport, WebRtcFactory,
    WebRtcTransport,
};
