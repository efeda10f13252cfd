//! # Vhagar Core
//! Configuration, error types, shared counters and the outbound HTTP client.

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;

pub use config::VhagarConfig;
pub use error::{Result, VhagarError};
pub use metrics::Metrics;
