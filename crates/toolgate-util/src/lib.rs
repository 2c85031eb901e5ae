//! Shared utilities for toolgate.
//!
//! This crate provides common utilities used across the toolgate workspace:
//! - ULID-based identifier generation
//! - Logging setup with tracing
//! - Wildcard pattern matching for allow-list entries
//! - Token estimation for context-window budgeting

pub mod id;
pub mod log;
pub mod token;
pub mod wildcard;

pub use id::Identifier;
pub use token::{
    conservative_estimate, EstimateError, StreamingEstimator, TokenEstimate, TokenEstimator,
};
