//! # cord-client
//!
//! The client facade over the gateway: typed event dispatch through a
//! middleware pipeline, a shared domain-state cache, handler
//! registration, and the REST collaborator.
//!
//! ```no_run
//! use cord_client::{Client, Event};
//! use cord_common::config::ClientConfig;
//!
//! # async fn run() -> Result<(), cord_client::ClientError> {
//! let config = ClientConfig::from_env()?;
//! let mut client = Client::builder(config).build()?;
//!
//! client.on("on_message", |event| async move {
//!     if let Event::MessageCreate(message) = event {
//!         tracing::info!(content = %message.content, "message");
//!     }
//!     Ok(())
//! });
//!
//! client.start();
//! client.wait().await
//! # }
//! ```

pub mod cache;
pub mod client;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod http;
pub mod middleware;

pub use cache::Cache;
pub use client::{Client, ClientBuilder};
pub use context::ClientContext;
pub use cord_core::Event;
pub use dispatcher::{Dispatcher, HandlerMode, RegistrationHandle};
pub use error::{ClientError, DispatchError, HttpError, MiddlewareError};
pub use http::RestClient;
pub use middleware::{MiddlewareRegistry, Transform};
