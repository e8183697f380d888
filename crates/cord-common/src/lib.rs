//! # cord-common
//!
//! Configuration loading and tracing setup shared across the workspace.

pub mod config;
pub mod telemetry;

pub use config::{ClientConfig, ConfigError, Environment};
pub use telemetry::{init_tracing, init_tracing_with_config, try_init_tracing, TracingConfig};
