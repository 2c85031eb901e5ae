//! Ask kinds, responses, and ask payload shapes.

use serde::{Deserialize, Serialize};

/// Kind of a pending confirmation point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AskKind {
    /// A proposed tool invocation (JSON tool descriptor payload).
    Tool,
    /// A proposed shell command (command string payload).
    Command,
    /// Launching a browser session.
    BrowserActionLaunch,
    /// Invoking an MCP server tool or resource.
    UseMcpServer,
    /// A follow-up question with suggested answers.
    Followup,
    /// A failed API request awaiting retry confirmation.
    ApiReqFailed,
    /// The task believes it is finished.
    CompletionResult,
    /// A paused task is being resumed.
    ResumeTask,
}

impl AskKind {
    /// Non-blocking asks are informational and never gate execution.
    pub fn is_non_blocking(&self) -> bool {
        matches!(self, AskKind::CompletionResult | AskKind::ResumeTask)
    }
}

/// How the ask was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AskResponseKind {
    /// Approved via the primary button.
    #[serde(rename = "yesButtonClicked")]
    YesButtonClicked,
    /// Denied via the secondary button.
    #[serde(rename = "noButtonClicked")]
    NoButtonClicked,
    /// Answered with free-form text.
    #[serde(rename = "messageResponse")]
    MessageResponse,
}

/// Response resolving an ask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    /// Response kind.
    #[serde(rename = "askResponse")]
    pub kind: AskResponseKind,
    /// Free-form text accompanying a message response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl AskResponse {
    /// An approval response.
    pub fn yes() -> Self {
        Self {
            kind: AskResponseKind::YesButtonClicked,
            text: None,
        }
    }

    /// A denial response.
    pub fn no() -> Self {
        Self {
            kind: AskResponseKind::NoButtonClicked,
            text: None,
        }
    }

    /// A free-form message response.
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            kind: AskResponseKind::MessageResponse,
            text: Some(text.into()),
        }
    }

    /// Whether this response approves the pending action.
    pub fn is_approval(&self) -> bool {
        self.kind == AskResponseKind::YesButtonClicked
    }
}

/// Payload of a `followup` ask.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FollowupPayload {
    /// The question being asked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    /// Suggested answers, first is the default.
    #[serde(default)]
    pub suggest: Vec<Suggestion>,
}

/// One suggested answer. Accepts both plain strings and structured
/// `{"answer": ...}` objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Suggestion {
    /// Plain string suggestion.
    Text(String),
    /// Structured suggestion, optionally switching mode.
    Answer {
        /// The answer text.
        answer: String,
        /// Mode to switch to when selected.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mode: Option<String>,
    },
}

impl Suggestion {
    /// The answer text regardless of shape.
    pub fn answer_text(&self) -> &str {
        match self {
            Suggestion::Text(s) => s,
            Suggestion::Answer { answer, .. } => answer,
        }
    }
}

/// Payload of a `use_mcp_server` ask.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum McpPayload {
    /// Invoking a tool exposed by an MCP server.
    UseMcpTool {
        #[serde(rename = "serverName")]
        server_name: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arguments: Option<serde_json::Value>,
    },
    /// Reading a resource exposed by an MCP server.
    AccessMcpResource {
        #[serde(rename = "serverName")]
        server_name: String,
        uri: String,
    },
}

/// Payload of a `tool` ask: the JSON tool descriptor shown to the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolAskPayload {
    /// Declared sub-tool name (e.g. `readFile`, `editedExistingFile`).
    pub tool: String,
    /// Path the tool touches, for file operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Whether the path is outside the workspace root.
    #[serde(default, rename = "isOutsideWorkspace")]
    pub is_outside_workspace: bool,
    /// Whether the path matches a protected-file pattern.
    #[serde(default, rename = "isProtected")]
    pub is_protected: bool,
    /// Target mode for mode-switch and fetch-instructions descriptors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Content preview for write descriptors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
