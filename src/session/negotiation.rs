//! WHEP offer/answer exchange
//!
//! One HTTP round trip: POST the local offer as `application/sdp`, any 2xx
//! response carries the answer SDP in the body. Everything else is a
//! rejection carrying the status code.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("endpoint rejected offer with HTTP {status}")]
    Rejected { status: u16 },
    #[error("negotiation request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Exchanges a local offer for a remote answer
#[async_trait]
pub trait SessionNegotiator: Send + Sync {
    async fn negotiate(&self, offer_sdp: String) -> Result<String, NegotiationError>;
}

/// WHEP negotiation against an HTTP endpoint
pub struct HttpNegotiator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNegotiator {
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl SessionNegotiator for HttpNegotiator {
    async fn negotiate(&self, offer_sdp: String) -> Result<String, NegotiationError> {
        debug!(endpoint = %self.endpoint, offer_len = offer_sdp.len(), "posting offer");
        let resp = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/sdp")
            .body(offer_sdp)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(NegotiationError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::test_http::canned_backend;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_success_returns_answer_sdp() {
        let (endpoint, req_rx) =
            canned_backend("200 OK", "application/sdp", "v=0\r\nanswer body").await;
        let negotiator = HttpNegotiator::new(reqwest::Client::new(), endpoint);

        let answer = negotiator
            .negotiate("v=0\r\noffer body".to_string())
            .await
            .expect("negotiation should succeed");
        assert_eq!(answer, "v=0\r\nanswer body");

        let request = req_rx.await.expect("request captured");
        assert!(request.starts_with("POST / "));
        assert!(request.to_ascii_lowercase().contains("content-type: application/sdp"));
        assert!(request.ends_with("v=0\r\noffer body"));
    }

    #[tokio::test]
    async fn test_server_error_is_rejected_with_status() {
        let (endpoint, _req_rx) =
            canned_backend("500 Internal Server Error", "text/plain", "boom").await;
        let negotiator = HttpNegotiator::new(reqwest::Client::new(), endpoint);

        let err = negotiator
            .negotiate("v=0".to_string())
            .await
            .expect_err("non-2xx must be rejected");
        assert!(matches!(err, NegotiationError::Rejected { status: 500 }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_request_error() {
        // Bind-then-drop leaves a port nothing is listening on
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let endpoint = format!("http://{}", listener.local_addr().expect("addr"));
        drop(listener);

        let negotiator = HttpNegotiator::new(reqwest::Client::new(), endpoint);
        let err = negotiator
            .negotiate("v=0".to_string())
            .await
            .expect_err("connect must fail");
        assert!(matches!(err, NegotiationError::Request(_)));
    }
}
