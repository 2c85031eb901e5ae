//! Core tool-gating logic for toolgate.
//!
//! This crate provides the central pipeline between a streaming model
//! backend and a host environment:
//! - Tool catalog (tool to capability-group membership)
//! - Per-turn tool filtering by mode, gates, and model capability
//! - Auto-approval policy over pending asks
//! - Command allow/deny classification
//! - Tool execution dispatcher (streamed deltas to pushed results)
//! - Token budget guard for oversized tool results

pub mod approval;
pub mod ask;
pub mod budget;
pub mod catalog;
pub mod command;
pub mod dispatcher;
pub mod error;
pub mod filter;
pub mod host;
pub mod invocation;
pub mod mode;

pub use approval::{ApprovalPolicy, Decision};
pub use ask::{AskBroker, AskEvent, ASK_GUARD_TIMEOUT};
pub use budget::{
    BudgetGuard, BudgetParams, TokenBudgetResult, HARD_CEILING, PREVIEW_BYTES,
    SMALL_FILE_THRESHOLD,
};
pub use catalog::{ToolGroup, ALWAYS_AVAILABLE_TOOLS};
pub use command::{decide_command, CommandDecision};
pub use dispatcher::{
    CallResult, CallState, Dispatcher, DispatcherConfig, ToolCallAccumulator, TurnOutcome,
};
pub use error::{CoreError, CoreResult, DispatchError};
pub use filter::{
    filter_mcp_tools_for_mode, filter_tools, FilterContext, ModelToolCapability, ToolDescriptor,
};
pub use host::{ExecutionOutput, Host};
pub use invocation::{AskContext, ToolInvocation};
pub use mode::{builtin_modes, ModeConfig, ModeRegistry, DEFAULT_MODE_SLUG};
