//! # cord-gateway
//!
//! The persistent gateway connection: wire codec, heartbeat controller,
//! and the per-shard session state machine with resume support.

pub mod backoff;
pub mod error;
pub mod heartbeat;
pub mod protocol;
pub mod session;
pub mod transport;

pub use backoff::Backoff;
pub use error::GatewayError;
pub use heartbeat::Heartbeater;
pub use protocol::{CloseCode, Envelope, Intents, Opcode, WireError};
pub use session::{SequenceWatermark, Shard, ShardConfig, ShardHandle, ShardStatus};
pub use transport::{
    ChannelConnector, ChannelTransport, Connect, FrameSink, FrameStream, GatewayTransport,
    TransportEvent, TransportPeer, WsConnector,
};
