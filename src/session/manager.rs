//! Video session lifecycle with two-tier reconnect backoff
//!
//! This module handles:
//! - The connect/disconnect state machine for the WHEP video session
//! - Driving negotiation attempts without blocking command handling
//! - Reacting to transport health reports
//! - Perpetual reconnection: base delay for the first retry, the capped
//!   maximum for every retry after that, reset by a successful connect

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::session::negotiation::{NegotiationError, SessionNegotiator};
use crate::session::transport::{
    TransportError, TransportFactory, TransportHealth, VideoTransport,
};

/// Operator-visible session status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Connecting,
    Connected,
    Disconnecting,
    Failed,
    Disconnected,
    Error,
}

impl SessionStatus {
    /// Which of the two session controls is live for this status.
    pub fn controls(&self) -> Controls {
        let connected = matches!(self, SessionStatus::Connected);
        Controls {
            connect_enabled: !connected,
            disconnect_enabled: connected,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Connecting => "connecting...",
            SessionStatus::Connected => "connected",
            SessionStatus::Disconnecting => "disconnecting...",
            SessionStatus::Failed => "failed",
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::Error => "error",
        };
        f.write_str(label)
    }
}

/// Enable/disable state of the connect and disconnect controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub connect_enabled: bool,
    pub disconnect_enabled: bool,
}

/// Backoff tiers for the reconnect timer
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay before the first retry after a fresh failure
    pub retry_base: Duration,
    /// Delay before every subsequent retry
    pub retry_max: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            retry_base: Duration::from_millis(500),
            retry_max: Duration::from_secs(5),
        }
    }
}

#[derive(Debug)]
enum SessionCommand {
    Connect,
    Disconnect,
}

/// Events emitted by the session worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    StatusChanged(SessionStatus),
    /// A reconnect timer was armed; `attempt` counts retries since the
    /// last successful connect
    ReconnectScheduled { delay: Duration, attempt: u32 },
}

/// Handle to the session worker
pub struct SessionManager {
    cmd_tx: mpsc::Sender<SessionCommand>,
    event_rx: mpsc::Receiver<SessionEvent>,
}

impl SessionManager {
    /// Spawn the session worker. The factory builds one transport per
    /// connect attempt; the negotiator performs the offer/answer exchange.
    pub fn spawn<F, N>(factory: Arc<F>, negotiator: Arc<N>, config: SessionConfig) -> Self
    where
        F: TransportFactory + 'static,
        N: SessionNegotiator + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (event_tx, event_rx) = mpsc::channel(64);

        let worker = SessionWorker {
            factory,
            negotiator,
            config,
            cmd_rx,
            event_tx,
            status: SessionStatus::Idle,
            active: None,
            inflight: None,
            pending_restart: false,
            closing: false,
            attempt: 0,
            reconnect_at: None,
        };
        tokio::spawn(worker.run());

        Self { cmd_tx, event_rx }
    }

    /// Request a (re)connect. Any existing session is torn down first.
    pub async fn connect(&self) -> Result<()> {
        self.cmd_tx
            .send(SessionCommand::Connect)
            .await
            .map_err(|_| anyhow!("session worker stopped"))
    }

    /// Request teardown. Safe to call when no session exists.
    pub async fn disconnect(&self) -> Result<()> {
        self.cmd_tx
            .send(SessionCommand::Disconnect)
            .await
            .map_err(|_| anyhow!("session worker stopped"))
    }

    /// Receive the next session event
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.event_rx.recv().await
    }
}

/// A session whose negotiation completed
struct ActiveSession<T> {
    transport: T,
    health_rx: mpsc::Receiver<TransportHealth>,
}

#[derive(Debug, Error)]
enum AttemptError {
    #[error("transport: {0}")]
    Transport(#[from] TransportError),
    #[error("negotiation: {0}")]
    Negotiation(#[from] NegotiationError),
    #[error("connect task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

enum Wake<T> {
    Command(Option<SessionCommand>),
    Attempt(Result<ActiveSession<T>, AttemptError>),
    Health(TransportHealth),
    RetryTimer,
}

struct SessionWorker<F: TransportFactory, N> {
    factory: Arc<F>,
    negotiator: Arc<N>,
    config: SessionConfig,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    event_tx: mpsc::Sender<SessionEvent>,
    status: SessionStatus,
    active: Option<ActiveSession<F::Transport>>,
    inflight: Option<JoinHandle<Result<ActiveSession<F::Transport>, AttemptError>>>,
    /// Connect was requested while a negotiation was in flight; restart
    /// once that attempt lands
    pending_restart: bool,
    /// Operator requested teardown; suppresses reconnect scheduling and
    /// discards any in-flight negotiation result
    closing: bool,
    /// Retries since the last successful connect
    attempt: u32,
    reconnect_at: Option<Instant>,
}

impl<F, N> SessionWorker<F, N>
where
    F: TransportFactory + 'static,
    N: SessionNegotiator + 'static,
{
    async fn run(mut self) {
        loop {
            let wake = tokio::select! {
                cmd = self.cmd_rx.recv() => Wake::Command(cmd),
                outcome = next_attempt(&mut self.inflight) => Wake::Attempt(outcome),
                health = next_health(&mut self.active) => Wake::Health(health),
                _ = sleep_until(self.reconnect_at.unwrap_or_else(Instant::now)),
                    if self.reconnect_at.is_some() => Wake::RetryTimer,
            };

            match wake {
                Wake::Command(Some(SessionCommand::Connect)) => self.start_connect().await,
                Wake::Command(Some(SessionCommand::Disconnect)) => self.disconnect().await,
                Wake::Command(None) => {
                    self.shutdown().await;
                    return;
                }
                Wake::Attempt(outcome) => {
                    self.inflight = None;
                    self.on_attempt(outcome).await;
                }
                Wake::Health(health) => self.on_health(health).await,
                Wake::RetryTimer => {
                    self.reconnect_at = None;
                    info!("reconnecting");
                    self.start_connect().await;
                }
            }
        }
    }

    /// Begin a connect attempt, tearing down any prior session first.
    async fn start_connect(&mut self) {
        self.reconnect_at = None;
        self.closing = false;

        if self.inflight.is_some() {
            // Let the in-flight negotiation land; its result is discarded
            // and a fresh attempt started then
            self.pending_restart = true;
            self.set_status(SessionStatus::Connecting).await;
            return;
        }
        self.pending_restart = false;

        if let Some(mut session) = self.active.take() {
            session.transport.close().await;
            debug!("previous session released");
        }

        self.set_status(SessionStatus::Connecting).await;
        self.spawn_attempt();
    }

    fn spawn_attempt(&mut self) {
        let factory = Arc::clone(&self.factory);
        let negotiator = Arc::clone(&self.negotiator);
        self.inflight = Some(tokio::spawn(run_attempt(factory, negotiator)));
    }

    /// Tear down whatever exists. Idempotent: from idle this only
    /// re-announces the idle status.
    async fn disconnect(&mut self) {
        self.closing = true;
        self.pending_restart = false;
        self.reconnect_at = None;

        if self.active.is_none() && self.inflight.is_none() {
            // Nothing to tear down; re-announce idle so the controls
            // settle even if the status never moved
            self.status = SessionStatus::Idle;
            let _ = self
                .event_tx
                .send(SessionEvent::StatusChanged(SessionStatus::Idle))
                .await;
            return;
        }

        self.set_status(SessionStatus::Disconnecting).await;
        if let Some(mut session) = self.active.take() {
            session.transport.close().await;
        }
        // An in-flight negotiation is left to land; on_attempt discards
        // its result because closing is set
        self.set_status(SessionStatus::Idle).await;
        info!("WHEP session closed");
    }

    async fn on_attempt(&mut self, outcome: Result<ActiveSession<F::Transport>, AttemptError>) {
        if self.closing {
            if let Ok(mut session) = outcome {
                session.transport.close().await;
                debug!("discarded negotiation result after disconnect");
            }
            return;
        }

        if self.pending_restart {
            self.pending_restart = false;
            if let Ok(mut session) = outcome {
                session.transport.close().await;
            }
            self.spawn_attempt();
            return;
        }

        match outcome {
            Ok(session) => {
                self.active = Some(session);
                self.attempt = 0;
                info!("WHEP session established");
                self.set_status(SessionStatus::Connected).await;
            }
            Err(e) => {
                warn!(error = %e, "connect attempt failed");
                self.set_status(SessionStatus::Error).await;
                self.schedule_reconnect().await;
            }
        }
    }

    async fn on_health(&mut self, health: TransportHealth) {
        match health {
            TransportHealth::Connected => {
                self.set_status(SessionStatus::Connected).await;
            }
            TransportHealth::Disconnected => {
                self.set_status(SessionStatus::Disconnected).await;
                if !self.closing {
                    self.schedule_reconnect().await;
                }
            }
            TransportHealth::Failed => {
                self.set_status(SessionStatus::Failed).await;
                if !self.closing {
                    self.schedule_reconnect().await;
                }
            }
            TransportHealth::Closed => {
                debug!("transport reported closed");
            }
        }
    }

    /// Arm the single reconnect timer: base delay on the first retry,
    /// the capped maximum on every later one. Arming replaces any timer
    /// already pending.
    async fn schedule_reconnect(&mut self) {
        self.attempt += 1;
        let delay = if self.attempt == 1 {
            self.config.retry_base
        } else {
            self.config.retry_max
        };
        self.reconnect_at = Some(Instant::now() + delay);
        info!(attempt = self.attempt, ?delay, "reconnect scheduled");
        let _ = self
            .event_tx
            .send(SessionEvent::ReconnectScheduled {
                delay,
                attempt: self.attempt,
            })
            .await;
    }

    async fn set_status(&mut self, status: SessionStatus) {
        if self.status == status {
            return;
        }
        self.status = status;
        debug!(%status, "session status");
        let _ = self
            .event_tx
            .send(SessionEvent::StatusChanged(status))
            .await;
    }

    async fn shutdown(&mut self) {
        if let Some(handle) = self.inflight.take() {
            handle.abort();
        }
        if let Some(mut session) = self.active.take() {
            session.transport.close().await;
        }
    }
}

/// One full connect attempt: transport, offer, negotiation, answer.
///
/// Runs as its own task so the worker keeps servicing commands while the
/// offer is gathering or the HTTP call is in flight. On any failure the
/// transport is released before the error is returned.
async fn run_attempt<F, N>(
    factory: Arc<F>,
    negotiator: Arc<N>,
) -> Result<ActiveSession<F::Transport>, AttemptError>
where
    F: TransportFactory,
    N: SessionNegotiator,
{
    let (health_tx, health_rx) = mpsc::channel(8);
    let mut transport = factory.create(health_tx).await?;

    match negotiate_session(&mut transport, negotiator.as_ref()).await {
        Ok(()) => Ok(ActiveSession {
            transport,
            health_rx,
        }),
        Err(e) => {
            transport.close().await;
            Err(e)
        }
    }
}

async fn negotiate_session<T, N>(transport: &mut T, negotiator: &N) -> Result<(), AttemptError>
where
    T: VideoTransport,
    N: SessionNegotiator + ?Sized,
{
    let offer = transport.create_offer().await?;
    let answer = negotiator.negotiate(offer).await?;
    transport.apply_answer(&answer).await?;
    Ok(())
}

/// Resolve when the in-flight attempt lands; never resolves without one.
async fn next_attempt<T>(
    inflight: &mut Option<JoinHandle<Result<ActiveSession<T>, AttemptError>>>,
) -> Result<ActiveSession<T>, AttemptError> {
    match inflight {
        Some(handle) => match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(AttemptError::Task(e)),
        },
        None => std::future::pending().await,
    }
}

/// Next health report from the active session; pends forever without one.
async fn next_health<T>(active: &mut Option<ActiveSession<T>>) -> TransportHealth {
    match active {
        Some(session) => match session.health_rx.recv().await {
            Some(health) => health,
            None => std::future::pending().await,
        },
        None => std::future::pending().await,
    }
}
