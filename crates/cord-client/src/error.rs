//! Client error types

use cord_common::config::ConfigError;
use cord_core::DecodeError;
use cord_gateway::GatewayError;
use thiserror::Error;

/// Top-level client error surfaced to the caller.
///
/// Per-envelope and per-handler failures never appear here; they go to
/// the dispatch error channel. Only unrecoverable conditions (fatal
/// gateway errors, configuration problems) reach the facade's caller.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A spawned task failed at the runtime level
    #[error("runtime error: {0}")]
    Runtime(String),
}

/// REST collaborator errors
#[derive(Debug, Error)]
pub enum HttpError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Credentials rejected
    #[error("unauthorized")]
    Unauthorized,

    /// Authenticated but not permitted
    #[error("forbidden")]
    Forbidden,

    /// Other non-success response from the API
    #[error("api error {status}: {body}")]
    Api { status: u16, body: String },

    /// Still rate limited after the retry budget
    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },
}

/// A middleware transform failed for one envelope
#[derive(Debug, Error)]
pub enum MiddlewareError {
    /// The payload did not decode into its typed form
    #[error("payload decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Recoverable per-envelope failures reported on the error channel.
///
/// Dispatch continues after any of these; they exist so callers can
/// observe failures without them interrupting the event stream.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("middleware for {event} failed: {source}")]
    Middleware {
        event: String,
        #[source]
        source: MiddlewareError,
    },

    #[error("handler for {event} failed: {message}")]
    Handler { event: String, message: String },

    #[error("handler for {event} panicked")]
    HandlerPanic { event: String },
}
