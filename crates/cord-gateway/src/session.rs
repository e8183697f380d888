//! Per-shard session state machine
//!
//! A [`Shard`] owns one logical gateway session across any number of
//! physical connections: it dials through its connector, performs the
//! Hello/Identify (or Resume) handshake, runs the heartbeat, forwards
//! dispatches to the client, and reconnects with bounded backoff when the
//! connection degrades. The caller drives it through a [`ShardHandle`].
//!
//! Lifecycle: `Connecting -> Identifying|Resuming -> Ready`, dropping to
//! `Degraded` on recoverable failures and `Closed` on shutdown or a fatal
//! error. Failures inside a session never propagate out unless they are
//! unrecoverable (bad credentials, retry budget spent).

use crate::backoff::Backoff;
use crate::error::GatewayError;
use crate::heartbeat::Heartbeater;
use crate::protocol::{
    CloseCode, ConnectionProperties, Envelope, Identify, Intents, Opcode, Resume, StatusUpdate,
};
use crate::transport::{Connect, TransportEvent};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// How long to wait for the server's Hello before giving up on a
/// freshly opened connection.
const HELLO_TIMEOUT: Duration = Duration::from_secs(60);

/// Buffer for caller-submitted frames awaiting a live session
const USER_FRAME_BUFFER: usize = 32;

/// Highest sequence number observed on a session.
///
/// Sequence numbers may arrive out of order relative to processing;
/// the watermark only ever moves forward. Shared between the session
/// loop (writer) and the heartbeat task (reader).
#[derive(Debug, Default)]
pub struct SequenceWatermark {
    seen: AtomicBool,
    value: AtomicU64,
}

impl SequenceWatermark {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a dispatched sequence number into the watermark
    pub fn observe(&self, sequence: u64) {
        self.value.fetch_max(sequence, Ordering::SeqCst);
        self.seen.store(true, Ordering::SeqCst);
    }

    /// Current watermark, or `None` before the first dispatch
    #[must_use]
    pub fn get(&self) -> Option<u64> {
        if self.seen.load(Ordering::SeqCst) {
            Some(self.value.load(Ordering::SeqCst))
        } else {
            None
        }
    }

    /// Clear the watermark; done before a fresh Identify
    pub fn reset(&self) {
        self.seen.store(false, Ordering::SeqCst);
        self.value.store(0, Ordering::SeqCst);
    }
}

/// Shard lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShardStatus {
    /// Dialing the gateway
    Connecting,
    /// Handshaking a fresh session
    Identifying,
    /// Reattaching to a prior session
    Resuming,
    /// Live and receiving dispatches
    Ready,
    /// Connection lost; reconnecting
    Degraded,
    /// Shut down or failed fatally
    Closed,
}

impl ShardStatus {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Connecting => "Connecting",
            Self::Identifying => "Identifying",
            Self::Resuming => "Resuming",
            Self::Ready => "Ready",
            Self::Degraded => "Degraded",
            Self::Closed => "Closed",
        }
    }

    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl std::fmt::Display for ShardStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Static configuration for one shard
#[derive(Debug, Clone)]
pub struct ShardConfig {
    pub token: String,
    pub gateway_url: String,
    pub intents: Intents,
    pub shard_index: u32,
    pub shard_count: u32,
    pub properties: ConnectionProperties,
    pub backoff: Backoff,
}

impl ShardConfig {
    #[must_use]
    pub fn new(token: impl Into<String>, gateway_url: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            gateway_url: gateway_url.into(),
            intents: Intents::default(),
            shard_index: 0,
            shard_count: 1,
            properties: ConnectionProperties::default(),
            backoff: Backoff::new(),
        }
    }

    #[must_use]
    pub fn with_shard(mut self, index: u32, count: u32) -> Self {
        self.shard_index = index;
        self.shard_count = count.max(1);
        self
    }

    #[must_use]
    pub fn with_intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

/// How one physical session ended
#[derive(Debug)]
enum SessionEnd {
    /// Caller asked for shutdown
    Shutdown,
    /// Reconnect; `resume: false` discards the session identity first
    Reconnect { resume: bool },
}

/// One gateway shard: the owning side of the session state machine.
///
/// `run` consumes the shard and loops until shutdown or a fatal error;
/// interaction happens through the [`ShardHandle`] returned by [`Shard::new`].
pub struct Shard {
    config: ShardConfig,
    connector: Box<dyn Connect>,
    session_id: Option<String>,
    sequence: Arc<SequenceWatermark>,
    events: mpsc::Sender<Envelope>,
    status: watch::Sender<ShardStatus>,
    shutdown: watch::Receiver<bool>,
    user_rx: Option<mpsc::Receiver<Envelope>>,
}

impl Shard {
    /// Build a shard and its control handle.
    ///
    /// Dispatch frames are forwarded on `events`; if that receiver is
    /// dropped the shard shuts down.
    #[must_use]
    pub fn new(
        config: ShardConfig,
        connector: Box<dyn Connect>,
        events: mpsc::Sender<Envelope>,
    ) -> (Self, ShardHandle) {
        let (status_tx, status_rx) = watch::channel(ShardStatus::Connecting);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (user_tx, user_rx) = mpsc::channel(USER_FRAME_BUFFER);
        let sequence = Arc::new(SequenceWatermark::new());

        let handle = ShardHandle {
            shard_index: config.shard_index,
            status: status_rx,
            shutdown: shutdown_tx,
            outbound: user_tx,
            sequence: sequence.clone(),
        };

        let shard = Self {
            config,
            connector,
            session_id: None,
            sequence,
            events,
            status: status_tx,
            shutdown: shutdown_rx,
            user_rx: Some(user_rx),
        };

        (shard, handle)
    }

    /// Run the shard until shutdown or a fatal error.
    ///
    /// Recoverable failures (dropped sockets, heartbeat timeouts,
    /// server-requested reconnects) are absorbed here: the shard goes
    /// `Degraded` and redials, resuming the prior session when the
    /// close allows it.
    pub async fn run(mut self) -> Result<(), GatewayError> {
        let mut backoff = self.config.backoff.clone();

        loop {
            if *self.shutdown.borrow() {
                self.set_status(ShardStatus::Closed);
                return Ok(());
            }

            self.set_status(ShardStatus::Connecting);
            let transport = match self.connector.connect(&self.config.gateway_url).await {
                Ok(transport) => transport,
                Err(e) => {
                    match backoff.next_delay() {
                        Some(delay) => {
                            tracing::warn!(
                                shard = self.config.shard_index,
                                error = %e,
                                delay_ms = delay.as_millis() as u64,
                                "connect failed, backing off"
                            );
                            self.idle(delay).await;
                            continue;
                        }
                        None => {
                            self.set_status(ShardStatus::Closed);
                            return Err(GatewayError::RetriesExhausted {
                                attempts: backoff.attempts(),
                            });
                        }
                    }
                }
            };

            let end = match self.run_session(transport).await {
                Ok(end) => end,
                Err(e) if e.is_fatal() => {
                    tracing::error!(shard = self.config.shard_index, error = %e, "shard failed");
                    self.set_status(ShardStatus::Closed);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(shard = self.config.shard_index, error = %e, "session error");
                    SessionEnd::Reconnect { resume: true }
                }
            };

            match end {
                SessionEnd::Shutdown => {
                    self.set_status(ShardStatus::Closed);
                    tracing::info!(shard = self.config.shard_index, "shard shut down");
                    return Ok(());
                }
                SessionEnd::Reconnect { resume } => {
                    if !resume {
                        self.session_id = None;
                    }
                    let reached_ready = *self.status.borrow() == ShardStatus::Ready;
                    self.set_status(ShardStatus::Degraded);

                    // A session that reached Ready restores the retry
                    // budget; one that died mid-handshake consumes it,
                    // so a rejecting server cannot spin us.
                    if reached_ready {
                        backoff.reset();
                    } else if let Some(delay) = backoff.next_delay() {
                        self.idle(delay).await;
                    } else {
                        self.set_status(ShardStatus::Closed);
                        return Err(GatewayError::RetriesExhausted {
                            attempts: backoff.attempts(),
                        });
                    }
                }
            }
        }
    }

    /// Run one physical connection from Hello to its end
    async fn run_session(
        &mut self,
        transport: Box<dyn crate::transport::GatewayTransport>,
    ) -> Result<SessionEnd, GatewayError> {
        let (mut sink, mut stream) = transport.split();

        let first = match tokio::time::timeout(HELLO_TIMEOUT, stream.next()).await {
            Err(_) => {
                tracing::warn!(shard = self.config.shard_index, "no hello before timeout");
                return Ok(SessionEnd::Reconnect { resume: true });
            }
            Ok(event) => event,
        };

        let hello = match first {
            Err(e) => {
                tracing::warn!(shard = self.config.shard_index, error = %e, "socket error awaiting hello");
                return Ok(SessionEnd::Reconnect { resume: true });
            }
            Ok(None) => return Ok(SessionEnd::Reconnect { resume: true }),
            Ok(Some(TransportEvent::Closed(code))) => return self.classify_close(code),
            Ok(Some(TransportEvent::Frame(envelope))) => match envelope.as_hello() {
                Some(hello) => hello,
                None => {
                    return Err(GatewayError::Protocol(format!(
                        "expected hello, got {}",
                        envelope.op
                    )))
                }
            },
        };

        let interval = Duration::from_millis(hello.heartbeat_interval);
        tracing::debug!(
            shard = self.config.shard_index,
            interval_ms = hello.heartbeat_interval,
            "hello received"
        );

        // All writes go through one channel drained by a single writer
        // task, so heartbeats, control frames, and caller frames never
        // interleave on the socket.
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Envelope>(64);
        let (timeout_tx, mut timeout_rx) = mpsc::channel(1);
        let heartbeater = Heartbeater::spawn(
            interval,
            self.sequence.clone(),
            outbound_tx.clone(),
            timeout_tx,
        );

        // Handshake goes out before the writer starts draining, so it is
        // always the first frame on the wire.
        if let Some(session_id) = self.session_id.clone() {
            self.set_status(ShardStatus::Resuming);
            let payload = Resume {
                token: self.config.token.clone(),
                session_id,
                seq: self.sequence.get().unwrap_or(0),
            };
            sink.send_frame(Envelope::resume(&payload)).await?;
        } else {
            self.set_status(ShardStatus::Identifying);
            self.sequence.reset();
            let payload = Identify {
                token: self.config.token.clone(),
                properties: self.config.properties.clone(),
                intents: self.config.intents,
                shard: [self.config.shard_index, self.config.shard_count],
            };
            sink.send_frame(Envelope::identify(&payload)).await?;
        }

        let writer = tokio::spawn(async move {
            while let Some(envelope) = outbound_rx.recv().await {
                if sink.send_frame(envelope).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let mut shutdown = self.shutdown.clone();
        let mut user_rx = self
            .user_rx
            .take()
            .ok_or_else(|| GatewayError::Protocol("session already running".to_string()))?;

        let end = loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow_and_update() {
                        break Ok(SessionEnd::Shutdown);
                    }
                }
                Some(()) = timeout_rx.recv() => {
                    tracing::warn!(shard = self.config.shard_index, "heartbeat timed out");
                    break Ok(SessionEnd::Reconnect { resume: true });
                }
                maybe = user_rx.recv() => match maybe {
                    Some(envelope) => {
                        if outbound_tx.send(envelope).await.is_err() {
                            break Ok(SessionEnd::Reconnect { resume: true });
                        }
                    }
                    // All handles dropped: nobody is driving this shard.
                    None => break Ok(SessionEnd::Shutdown),
                },
                event = stream.next() => match event {
                    Err(e) => {
                        tracing::warn!(shard = self.config.shard_index, error = %e, "socket error");
                        break Ok(SessionEnd::Reconnect { resume: true });
                    }
                    Ok(None) => break Ok(SessionEnd::Reconnect { resume: true }),
                    Ok(Some(TransportEvent::Closed(code))) => break self.classify_close(code),
                    Ok(Some(TransportEvent::Frame(envelope))) => {
                        if let Some(end) = self.handle_frame(envelope, &heartbeater, &outbound_tx).await {
                            break Ok(end);
                        }
                    }
                },
            }
        };

        self.user_rx = Some(user_rx);
        heartbeater.shutdown();
        drop(outbound_tx);
        let _ = writer.await;

        end
    }

    /// React to one inbound frame; `Some` ends the session
    async fn handle_frame(
        &mut self,
        envelope: Envelope,
        heartbeater: &Heartbeater,
        outbound: &mpsc::Sender<Envelope>,
    ) -> Option<SessionEnd> {
        match envelope.op {
            Opcode::Dispatch => {
                if let Some(sequence) = envelope.s {
                    self.sequence.observe(sequence);
                }

                match envelope.event_name() {
                    Some("READY") => {
                        if let Some(id) = envelope.d.get("session_id").and_then(Value::as_str) {
                            self.session_id = Some(id.to_string());
                        }
                        tracing::info!(
                            shard = self.config.shard_index,
                            session_id = self.session_id.as_deref().unwrap_or(""),
                            "shard ready"
                        );
                        self.set_status(ShardStatus::Ready);
                    }
                    Some("RESUMED") => {
                        tracing::info!(shard = self.config.shard_index, "session resumed");
                        self.set_status(ShardStatus::Ready);
                    }
                    _ => {}
                }

                if self.events.send(envelope).await.is_err() {
                    return Some(SessionEnd::Shutdown);
                }
                None
            }
            Opcode::Heartbeat => {
                // Server-requested beat, outside the normal cadence
                let beat = Envelope::heartbeat(self.sequence.get());
                if outbound.send(beat).await.is_err() {
                    return Some(SessionEnd::Reconnect { resume: true });
                }
                None
            }
            Opcode::HeartbeatAck => {
                heartbeater.record_ack();
                None
            }
            Opcode::Reconnect => {
                tracing::info!(shard = self.config.shard_index, "server requested reconnect");
                Some(SessionEnd::Reconnect { resume: true })
            }
            Opcode::InvalidSession => {
                let resumable = envelope.invalid_session_resumable().unwrap_or(false);
                tracing::warn!(
                    shard = self.config.shard_index,
                    resumable,
                    "session invalidated"
                );
                if resumable {
                    Some(SessionEnd::Reconnect { resume: true })
                } else if *self.status.borrow() == ShardStatus::Resuming {
                    // The resume was rejected; fall back to a fresh
                    // Identify on the same connection.
                    self.session_id = None;
                    self.sequence.reset();
                    self.set_status(ShardStatus::Identifying);
                    let payload = Identify {
                        token: self.config.token.clone(),
                        properties: self.config.properties.clone(),
                        intents: self.config.intents,
                        shard: [self.config.shard_index, self.config.shard_count],
                    };
                    if outbound.send(Envelope::identify(&payload)).await.is_err() {
                        return Some(SessionEnd::Reconnect { resume: false });
                    }
                    None
                } else {
                    Some(SessionEnd::Reconnect { resume: false })
                }
            }
            op => {
                tracing::debug!(shard = self.config.shard_index, op = %op, "ignoring frame");
                None
            }
        }
    }

    /// Map a peer close into a session outcome
    fn classify_close(&mut self, code: Option<CloseCode>) -> Result<SessionEnd, GatewayError> {
        match code {
            Some(code) if code.is_fatal() => {
                tracing::error!(shard = self.config.shard_index, close = %code, "fatal close");
                Err(GatewayError::FatalAuth(code))
            }
            Some(code) => {
                tracing::warn!(shard = self.config.shard_index, close = %code, "connection closed");
                Ok(SessionEnd::Reconnect {
                    resume: code.should_resume(),
                })
            }
            None => Ok(SessionEnd::Reconnect { resume: true }),
        }
    }

    fn set_status(&self, status: ShardStatus) {
        if *self.status.borrow() != status {
            tracing::debug!(
                shard = self.config.shard_index,
                status = status.name(),
                "status change"
            );
            let _ = self.status.send(status);
        }
    }

    /// Sleep that wakes early on shutdown
    async fn idle(&self, delay: Duration) {
        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            () = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => {}
        }
    }
}

/// Control handle for a running [`Shard`]
#[derive(Debug)]
pub struct ShardHandle {
    shard_index: u32,
    status: watch::Receiver<ShardStatus>,
    shutdown: watch::Sender<bool>,
    outbound: mpsc::Sender<Envelope>,
    sequence: Arc<SequenceWatermark>,
}

impl ShardHandle {
    /// Current lifecycle status
    #[must_use]
    pub fn status(&self) -> ShardStatus {
        *self.status.borrow()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.status().is_ready()
    }

    #[must_use]
    pub fn shard_index(&self) -> u32 {
        self.shard_index
    }

    /// Current sequence watermark
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        self.sequence.get()
    }

    /// Ask the shard to stop; it closes its connection and exits
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Wait until the shard reaches a status matching `pred`
    pub async fn wait_for_status(
        &mut self,
        pred: impl FnMut(ShardStatus) -> bool,
    ) -> Result<ShardStatus, GatewayError> {
        let mut pred = pred;
        let status = self
            .status
            .wait_for(|status| pred(*status))
            .await
            .map_err(|_| GatewayError::NotReady)?;
        Ok(*status)
    }

    /// Wait until the shard is Ready
    pub async fn wait_until_ready(&mut self) -> Result<(), GatewayError> {
        self.wait_for_status(ShardStatus::is_ready).await?;
        Ok(())
    }

    /// Send a presence update on a Ready session
    pub async fn update_status(&self, status: StatusUpdate) -> Result<(), GatewayError> {
        if !status.is_valid_status() {
            return Err(GatewayError::Protocol(format!(
                "invalid status: {}",
                status.status
            )));
        }
        if !self.is_ready() {
            return Err(GatewayError::NotReady);
        }
        self.outbound
            .send(Envelope::status_update(&status))
            .await
            .map_err(|_| GatewayError::NotReady)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watermark_only_moves_forward() {
        let watermark = SequenceWatermark::new();
        assert_eq!(watermark.get(), None);

        watermark.observe(5);
        watermark.observe(9);
        watermark.observe(7);
        assert_eq!(watermark.get(), Some(9));
    }

    #[test]
    fn test_watermark_zero_is_observable() {
        let watermark = SequenceWatermark::new();
        watermark.observe(0);
        assert_eq!(watermark.get(), Some(0));
    }

    #[test]
    fn test_watermark_reset() {
        let watermark = SequenceWatermark::new();
        watermark.observe(42);
        watermark.reset();
        assert_eq!(watermark.get(), None);
    }

    #[test]
    fn test_status_names() {
        assert_eq!(ShardStatus::Ready.name(), "Ready");
        assert!(ShardStatus::Ready.is_ready());
        assert!(!ShardStatus::Resuming.is_ready());
    }

    #[test]
    fn test_shard_config_floors_count() {
        let config = ShardConfig::new("t", "wss://gw").with_shard(0, 0);
        assert_eq!(config.shard_count, 1);
    }
}
