//! routegate library
//!
//! Configuration and engine assembly shared by the binary and integration tests.

pub mod config;
pub mod engine;

pub use config::{ConfigError, GatewayConfig};
pub use engine::Engine;
