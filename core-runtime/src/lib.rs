//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the player core:
//! - Logging and tracing setup
//! - Bridge configuration with fail-fast validation
//! - Event bus for playback, queue and alert events
//!
//! Every other `core-*` crate depends on this one for its logging
//! conventions and event types.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
