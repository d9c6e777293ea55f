//! Delve Core - Shared data structures, configuration and infrastructure
//!
//! This crate defines the types, error taxonomy, configuration and runtime
//! helpers used by every other delve crate

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use logging::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use tokio;
pub use tracing;
