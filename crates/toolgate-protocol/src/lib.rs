//! Shared boundary types for the toolgate pipeline.
//!
//! This crate defines the types crossing the three boundary contracts:
//! - Model backend -> dispatcher: streamed deltas
//! - Dispatcher/policy -> host environment: asks and responses
//! - Policy settings surface: persisted auto-approval configuration
//!
//! Everything here is plain serde data; no runtime behavior.

mod ask;
mod delta;
mod settings;

pub use ask::*;
pub use delta::*;
pub use settings::*;
