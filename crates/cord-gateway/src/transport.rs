//! Gateway transport seam
//!
//! The session state machine talks to a [`GatewayTransport`] rather than
//! a socket, so the protocol logic is testable against an in-memory
//! transport. A transport splits into a read half and a write half; the
//! session serializes all writes through a single task owning the sink.
//! Production connections go through [`WsConnector`] over
//! `tokio-tungstenite`.

use crate::error::GatewayError;
use crate::protocol::{CloseCode, Envelope};
use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::collections::VecDeque;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

/// One unit read from the transport
#[derive(Debug)]
pub enum TransportEvent {
    /// A decoded envelope
    Frame(Envelope),
    /// The peer closed the connection, possibly with a gateway close code
    Closed(Option<CloseCode>),
}

/// A framed, bidirectional gateway connection
pub trait GatewayTransport: Send {
    /// Split into write and read halves
    fn split(self: Box<Self>) -> (Box<dyn FrameSink>, Box<dyn FrameStream>);
}

/// The read half of a transport
#[async_trait]
pub trait FrameStream: Send {
    /// Next inbound event; `None` when the stream has ended.
    ///
    /// Malformed frames are reported (logged) and skipped, never fatal.
    async fn next(&mut self) -> Result<Option<TransportEvent>, GatewayError>;
}

/// The write half of a transport
#[async_trait]
pub trait FrameSink: Send {
    /// Send one envelope
    async fn send_frame(&mut self, envelope: Envelope) -> Result<(), GatewayError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), GatewayError>;
}

/// Opens gateway transports; one implementation per environment
#[async_trait]
pub trait Connect: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn GatewayTransport>, GatewayError>;
}

#[async_trait]
impl<C: Connect + ?Sized> Connect for std::sync::Arc<C> {
    async fn connect(&self, url: &str) -> Result<Box<dyn GatewayTransport>, GatewayError> {
        (**self).connect(url).await
    }
}

// === Production WebSocket transport ===

type WsInner = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport over tokio-tungstenite
pub struct WsTransport {
    inner: WsInner,
}

impl GatewayTransport for WsTransport {
    fn split(self: Box<Self>) -> (Box<dyn FrameSink>, Box<dyn FrameStream>) {
        let (sink, stream) = self.inner.split();
        (Box::new(WsSink { inner: sink }), Box::new(WsStream { inner: stream }))
    }
}

struct WsStream {
    inner: SplitStream<WsInner>,
}

struct WsSink {
    inner: SplitSink<WsInner, Message>,
}

#[async_trait]
impl FrameStream for WsStream {
    async fn next(&mut self) -> Result<Option<TransportEvent>, GatewayError> {
        loop {
            let message = match self.inner.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(GatewayError::Transport(e.to_string())),
                Some(Ok(m)) => m,
            };

            match message {
                Message::Text(text) => match Envelope::decode(text.as_bytes()) {
                    Ok(envelope) => return Ok(Some(TransportEvent::Frame(envelope))),
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping malformed text frame");
                    }
                },
                Message::Binary(bytes) => match Envelope::decode(&bytes) {
                    Ok(envelope) => return Ok(Some(TransportEvent::Frame(envelope))),
                    Err(e) => {
                        tracing::warn!(error = %e, "dropping malformed binary frame");
                    }
                },
                Message::Close(frame) => {
                    let code = frame.and_then(|f| CloseCode::from_u16(f.code.into()));
                    return Ok(Some(TransportEvent::Closed(code)));
                }
                // Pongs are bookkeeping; pings are answered by tungstenite.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }
}

#[async_trait]
impl FrameSink for WsSink {
    async fn send_frame(&mut self, envelope: Envelope) -> Result<(), GatewayError> {
        let json = envelope.encode()?;
        self.inner
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), GatewayError> {
        self.inner
            .close()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))
    }
}

/// Connector dialing real gateway URLs
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

impl WsConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connect for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn GatewayTransport>, GatewayError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| GatewayError::Connect(e.to_string()))?;

        tracing::debug!(url, "gateway socket established");
        Ok(Box::new(WsTransport { inner: stream }))
    }
}

// === In-memory transport (tests and simulations) ===

/// In-memory transport backed by channels; the counterpart
/// [`TransportPeer`] plays the server side.
pub struct ChannelTransport {
    incoming: mpsc::Receiver<TransportEvent>,
    outgoing: mpsc::Sender<Envelope>,
}

/// The "server" end of a [`ChannelTransport`]
pub struct TransportPeer {
    events: mpsc::Sender<TransportEvent>,
    frames: mpsc::Receiver<Envelope>,
}

impl ChannelTransport {
    /// Create a connected transport/peer pair
    #[must_use]
    pub fn pair(buffer: usize) -> (Self, TransportPeer) {
        let (events_tx, events_rx) = mpsc::channel(buffer);
        let (frames_tx, frames_rx) = mpsc::channel(buffer);
        (
            Self {
                incoming: events_rx,
                outgoing: frames_tx,
            },
            TransportPeer {
                events: events_tx,
                frames: frames_rx,
            },
        )
    }
}

impl TransportPeer {
    /// Deliver an envelope to the client side
    pub async fn send(&self, envelope: Envelope) {
        let _ = self.events.send(TransportEvent::Frame(envelope)).await;
    }

    /// Deliver a close to the client side
    pub async fn close(&self, code: Option<CloseCode>) {
        let _ = self.events.send(TransportEvent::Closed(code)).await;
    }

    /// Next frame the client sent
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.frames.recv().await
    }

    /// Next frame, skipping heartbeats
    pub async fn recv_non_heartbeat(&mut self) -> Option<Envelope> {
        loop {
            let envelope = self.frames.recv().await?;
            if envelope.op != crate::protocol::Opcode::Heartbeat {
                return Some(envelope);
            }
        }
    }
}

impl GatewayTransport for ChannelTransport {
    fn split(self: Box<Self>) -> (Box<dyn FrameSink>, Box<dyn FrameStream>) {
        (
            Box::new(ChannelSink {
                outgoing: self.outgoing,
            }),
            Box::new(ChannelStream {
                incoming: self.incoming,
            }),
        )
    }
}

struct ChannelStream {
    incoming: mpsc::Receiver<TransportEvent>,
}

struct ChannelSink {
    outgoing: mpsc::Sender<Envelope>,
}

#[async_trait]
impl FrameStream for ChannelStream {
    async fn next(&mut self) -> Result<Option<TransportEvent>, GatewayError> {
        Ok(self.incoming.recv().await)
    }
}

#[async_trait]
impl FrameSink for ChannelSink {
    async fn send_frame(&mut self, envelope: Envelope) -> Result<(), GatewayError> {
        self.outgoing
            .send(envelope)
            .await
            .map_err(|_| GatewayError::Transport("peer closed".to_string()))
    }

    async fn close(&mut self) -> Result<(), GatewayError> {
        Ok(())
    }
}

/// Connector vending a queue of prepared in-memory transports, one per
/// connect call.
#[derive(Default)]
pub struct ChannelConnector {
    queue: Mutex<VecDeque<ChannelTransport>>,
}

impl ChannelConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transport for the next connect attempt
    pub async fn expect_connection(&self, transport: ChannelTransport) {
        self.queue.lock().await.push_back(transport);
    }
}

#[async_trait]
impl Connect for ChannelConnector {
    async fn connect(&self, _url: &str) -> Result<Box<dyn GatewayTransport>, GatewayError> {
        match self.queue.lock().await.pop_front() {
            Some(transport) => Ok(Box::new(transport)),
            None => Err(GatewayError::Connect("no queued transport".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Opcode;

    #[tokio::test]
    async fn test_channel_transport_roundtrip() {
        let (transport, mut peer) = ChannelTransport::pair(8);
        let (mut sink, mut stream) = Box::new(transport).split();

        peer.send(Envelope::heartbeat(Some(3))).await;
        match stream.next().await.unwrap() {
            Some(TransportEvent::Frame(env)) => assert_eq!(env.op, Opcode::Heartbeat),
            other => panic!("unexpected event: {other:?}"),
        }

        sink.send_frame(Envelope::heartbeat(None)).await.unwrap();
        assert_eq!(peer.recv().await.unwrap().op, Opcode::Heartbeat);
    }

    #[tokio::test]
    async fn test_channel_transport_close_code() {
        let (transport, peer) = ChannelTransport::pair(8);
        let (_sink, mut stream) = Box::new(transport).split();
        peer.close(Some(CloseCode::AuthenticationFailed)).await;

        match stream.next().await.unwrap() {
            Some(TransportEvent::Closed(code)) => {
                assert_eq!(code, Some(CloseCode::AuthenticationFailed));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connector_queue_exhaustion() {
        let connector = ChannelConnector::new();
        let (transport, _peer) = ChannelTransport::pair(1);
        connector.expect_connection(transport).await;

        assert!(connector.connect("wss://unused").await.is_ok());
        assert!(matches!(
            connector.connect("wss://unused").await,
            Err(GatewayError::Connect(_))
        ));
    }
}
