//! Persisted auto-approval settings.
//!
//! A flat mapping of named booleans/lists/numbers read from user or
//! workspace configuration. Field names on the wire are fixed; the core
//! reads these on every ask resolution and never mutates them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The ten coarse toggles plus auxiliary options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoApprovalSettings {
    /// Master switch; when false every blocking ask escalates to the user.
    pub auto_approval_enabled: bool,

    /// Approve read-only tools.
    pub always_allow_read_only: bool,
    /// Extend read-only approval to paths outside the workspace.
    pub always_allow_read_only_outside_workspace: bool,
    /// Approve write tools.
    pub always_allow_write: bool,
    /// Extend write approval to paths outside the workspace.
    pub always_allow_write_outside_workspace: bool,
    /// Extend write approval to protected files.
    pub always_allow_write_protected: bool,
    /// Approve browser session launches.
    pub always_allow_browser: bool,
    /// Retry failed API requests without confirmation.
    pub always_approve_resubmit: bool,
    /// Approve MCP server access (further gated per server/tool).
    pub always_allow_mcp: bool,
    /// Approve mode switches.
    pub always_allow_mode_switch: bool,
    /// Approve sub-task creation and completion.
    pub always_allow_subtasks: bool,
    /// Classify commands against the allow/deny lists.
    pub always_allow_execute: bool,
    /// Auto-answer follow-up questions after a timeout.
    pub always_allow_followup_questions: bool,
    /// Approve todo-list updates.
    pub always_allow_update_todo_list: bool,

    /// Delay before a follow-up question auto-answers, in milliseconds.
    /// Zero disables the timeout path.
    pub followup_auto_approve_timeout_ms: u64,

    /// Per-server MCP policies, keyed by server name.
    pub mcp_servers: HashMap<String, McpServerPolicy>,

    /// Command prefixes that may auto-approve.
    pub allowed_commands: Vec<String>,
    /// Command prefixes that auto-deny.
    pub denied_commands: Vec<String>,
}

/// Per-server MCP approval policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct McpServerPolicy {
    /// Tool-name patterns (wildcards allowed) approved for this server.
    pub always_allow: Vec<String>,
}
