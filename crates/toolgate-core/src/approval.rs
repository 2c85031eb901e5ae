//! Auto-approval policy.
//!
//! Resolves one ask into approve, deny, escalate-to-human, or
//! approve-after-timeout with a synthesized response. Stateless per call:
//! the decision is a function of the ask kind, its payload, and the
//! persisted settings snapshot.
//!
//! Every approval path requires BOTH the coarse category toggle AND any
//! finer-grained override the ask carries (outside-workspace paths,
//! protected files, per-server MCP allow lists). A single broad toggle is
//! never sufficient to silently approve a riskier variant of an action.
//! Any payload parse failure degrades to escalation, never to approval.

use crate::ask::AskEvent;
use crate::command::{decide_command, CommandDecision};
use std::time::Duration;
use toolgate_protocol::{
    AskKind, AskResponse, AutoApprovalSettings, FollowupPayload, McpPayload, ToolAskPayload,
};
use toolgate_util::wildcard;
use tracing::debug;

/// Ask sub-tools classified as read-only.
const READ_ONLY_TOOLS: &[&str] = &[
    "readFile",
    "listFiles",
    "listFilesTopLevel",
    "listFilesRecursive",
    "listCodeDefinitionNames",
    "searchFiles",
    "codebaseSearch",
];

/// Ask sub-tools classified as writes.
const WRITE_TOOLS: &[&str] = &[
    "editedExistingFile",
    "appliedDiff",
    "newFileCreated",
    "insertContent",
    "searchAndReplace",
    "generateImage",
];

/// Resolution of one ask.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Proceed without human input.
    Approve,
    /// Reject without human input.
    Deny,
    /// Escalate to the human.
    Ask,
    /// Auto-resolve with `response` after `timeout`, unless the human
    /// answers first.
    ApproveAfter {
        timeout: Duration,
        response: AskResponse,
    },
}

/// The auto-approval policy over one settings snapshot.
#[derive(Debug, Clone)]
pub struct ApprovalPolicy {
    settings: AutoApprovalSettings,
}

impl ApprovalPolicy {
    /// Create a policy from a settings snapshot.
    pub fn new(settings: AutoApprovalSettings) -> Self {
        Self { settings }
    }

    /// The settings snapshot this policy reads.
    pub fn settings(&self) -> &AutoApprovalSettings {
        &self.settings
    }

    /// Resolve one ask.
    pub fn decide(&self, event: &AskEvent) -> Decision {
        // Informational asks never gate execution.
        if event.kind.is_non_blocking() {
            return Decision::Approve;
        }

        if !self.settings.auto_approval_enabled {
            return Decision::Ask;
        }

        let decision = match event.kind {
            AskKind::Followup => self.decide_followup(event),
            AskKind::BrowserActionLaunch => self.gate(self.settings.always_allow_browser),
            AskKind::UseMcpServer => self.decide_mcp(event),
            AskKind::Command => self.decide_command_ask(event),
            AskKind::ApiReqFailed => self.gate(self.settings.always_approve_resubmit),
            AskKind::Tool => self.decide_tool(event),
            AskKind::CompletionResult | AskKind::ResumeTask => Decision::Approve,
        };

        debug!(kind = ?event.kind, ask_id = %event.id, decision = ?discriminant_name(&decision), "ask resolved");
        decision
    }

    fn gate(&self, toggle: bool) -> Decision {
        if toggle {
            Decision::Approve
        } else {
            Decision::Ask
        }
    }

    fn decide_followup(&self, event: &AskEvent) -> Decision {
        if !self.settings.always_allow_followup_questions {
            return Decision::Ask;
        }
        let timeout_ms = self.settings.followup_auto_approve_timeout_ms;
        if timeout_ms == 0 {
            return Decision::Ask;
        }

        let payload: FollowupPayload = match serde_json::from_str(&event.payload) {
            Ok(p) => p,
            Err(_) => return Decision::Ask,
        };
        match payload.suggest.first() {
            Some(suggestion) => Decision::ApproveAfter {
                timeout: Duration::from_millis(timeout_ms),
                response: AskResponse::message(suggestion.answer_text()),
            },
            None => Decision::Ask,
        }
    }

    fn decide_mcp(&self, event: &AskEvent) -> Decision {
        if !self.settings.always_allow_mcp {
            return Decision::Ask;
        }
        let payload: McpPayload = match serde_json::from_str(&event.payload) {
            Ok(p) => p,
            Err(_) => return Decision::Ask,
        };
        match payload {
            McpPayload::UseMcpTool {
                server_name,
                tool_name,
                ..
            } => {
                let allowed = self
                    .settings
                    .mcp_servers
                    .get(&server_name)
                    .map(|policy| {
                        wildcard::find_matching_pattern(
                            policy.always_allow.iter().map(String::as_str),
                            &tool_name,
                        )
                        .is_some()
                    })
                    .unwrap_or(false);
                self.gate(allowed)
            }
            McpPayload::AccessMcpResource { .. } => Decision::Approve,
        }
    }

    fn decide_command_ask(&self, event: &AskEvent) -> Decision {
        if !self.settings.always_allow_execute {
            return Decision::Ask;
        }
        match decide_command(
            &event.payload,
            &self.settings.allowed_commands,
            &self.settings.denied_commands,
        ) {
            CommandDecision::AutoApprove => Decision::Approve,
            CommandDecision::AutoDeny => Decision::Deny,
            CommandDecision::Ask => Decision::Ask,
        }
    }

    fn decide_tool(&self, event: &AskEvent) -> Decision {
        let payload: ToolAskPayload = match serde_json::from_str(&event.payload) {
            Ok(p) => p,
            Err(_) => return Decision::Ask,
        };
        let s = &self.settings;

        match payload.tool.as_str() {
            "updateTodoList" => self.gate(s.always_allow_update_todo_list),
            "fetchInstructions" => match payload.content.as_deref() {
                Some("create_mode") => self.gate(s.always_allow_mode_switch),
                Some("create_mcp_server") => self.gate(s.always_allow_mcp),
                _ => Decision::Ask,
            },
            "switchMode" => self.gate(s.always_allow_mode_switch),
            "newTask" | "finishTask" => self.gate(s.always_allow_subtasks),
            tool if READ_ONLY_TOOLS.contains(&tool) => {
                let allowed = s.always_allow_read_only
                    && (!payload.is_outside_workspace
                        || s.always_allow_read_only_outside_workspace);
                self.gate(allowed)
            }
            tool if WRITE_TOOLS.contains(&tool) => {
                let protected = payload.is_protected || event.is_protected;
                let allowed = s.always_allow_write
                    && (!payload.is_outside_workspace || s.always_allow_write_outside_workspace)
                    && (!protected || s.always_allow_write_protected);
                self.gate(allowed)
            }
            _ => Decision::Ask,
        }
    }
}

fn discriminant_name(decision: &Decision) -> &'static str {
    match decision {
        Decision::Approve => "approve",
        Decision::Deny => "deny",
        Decision::Ask => "ask",
        Decision::ApproveAfter { .. } => "approve_after",
    }
}
