//! ClipCraft Common Utilities
//!
//! Shared infrastructure for all ClipCraft crates:
//! - Error taxonomy, result aliases, and the pipeline outcome value
//! - Settings store (config file loading and saving)
//! - Progress event broadcasting and cancellation signals
//! - Tracing/logging initialization

pub mod cancel;
pub mod config;
pub mod error;
pub mod logging;
pub mod progress;

pub use cancel::*;
pub use config::*;
pub use error::*;
pub use progress::*;
