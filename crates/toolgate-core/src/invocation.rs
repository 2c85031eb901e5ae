//! Typed tool invocations.
//!
//! Argument payloads arrive as JSON blobs keyed by tool name. Parsing
//! turns them into a tagged union so each tool's argument shape is
//! statically known downstream; tools without a typed shape yet fall back
//! to the opaque variant.

use serde::Deserialize;
use serde_json::{json, Value};
use toolgate_protocol::{AskKind, FollowupPayload, McpPayload};

/// Arguments for a file read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReadFileArgs {
    pub path: String,
    #[serde(default)]
    pub start_line: Option<u32>,
    #[serde(default)]
    pub end_line: Option<u32>,
}

/// Arguments for a directory listing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ListFilesArgs {
    pub path: String,
    #[serde(default)]
    pub recursive: bool,
}

/// Arguments for a regex search over files.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchFilesArgs {
    pub path: String,
    pub regex: String,
    #[serde(default)]
    pub file_pattern: Option<String>,
}

/// Arguments for a full-file write.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WriteToFileArgs {
    pub path: String,
    pub content: String,
}

/// Arguments for inserting content at a line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InsertContentArgs {
    pub path: String,
    pub line: u32,
    pub content: String,
}

/// Arguments for applying a diff.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApplyDiffArgs {
    pub path: String,
    pub diff: String,
}

/// Arguments for a search-and-replace edit.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchAndReplaceArgs {
    pub path: String,
    pub search: String,
    pub replace: String,
}

/// Arguments for a command execution.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecuteCommandArgs {
    pub command: String,
    #[serde(default)]
    pub cwd: Option<String>,
}

/// Arguments for an MCP tool invocation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UseMcpToolArgs {
    pub server_name: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Arguments for an MCP resource access.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccessMcpResourceArgs {
    pub server_name: String,
    pub uri: String,
}

/// Arguments for a browser action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BrowserActionArgs {
    pub action: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub coordinate: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

/// Arguments for a mode switch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SwitchModeArgs {
    pub mode_slug: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Arguments for spawning a sub-task.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTaskArgs {
    pub mode: String,
    pub message: String,
}

/// Arguments for a follow-up question to the user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AskFollowupQuestionArgs {
    pub question: String,
    #[serde(default)]
    pub follow_up: Vec<String>,
}

/// Arguments for a completion attempt.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttemptCompletionArgs {
    pub result: String,
}

/// One fully-parsed tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolInvocation {
    ReadFile(ReadFileArgs),
    ListFiles(ListFilesArgs),
    SearchFiles(SearchFilesArgs),
    WriteToFile(WriteToFileArgs),
    InsertContent(InsertContentArgs),
    ApplyDiff(ApplyDiffArgs),
    SearchAndReplace(SearchAndReplaceArgs),
    ExecuteCommand(ExecuteCommandArgs),
    UseMcpTool(UseMcpToolArgs),
    AccessMcpResource(AccessMcpResourceArgs),
    BrowserAction(BrowserActionArgs),
    SwitchMode(SwitchModeArgs),
    NewTask(NewTaskArgs),
    AskFollowupQuestion(AskFollowupQuestionArgs),
    AttemptCompletion(AttemptCompletionArgs),
    UpdateTodoList { todos: Value },
    /// Tool without a typed argument shape yet.
    Opaque { name: String, args: Value },
}

/// Facts about an invocation's target the dispatcher resolves against the
/// workspace before raising an ask.
#[derive(Debug, Clone, Copy, Default)]
pub struct AskContext {
    /// Target path lies outside the workspace root.
    pub is_outside_workspace: bool,
    /// Target path matches a protected pattern.
    pub is_protected: bool,
    /// Target file already exists (distinguishes edit from create).
    pub file_exists: bool,
}

impl ToolInvocation {
    /// Parse an invocation from a tool name and its accumulated argument
    /// buffer. An empty buffer parses as an empty object.
    pub fn parse(name: &str, arguments: &str) -> Result<Self, serde_json::Error> {
        let raw = if arguments.trim().is_empty() {
            "{}"
        } else {
            arguments
        };
        let value: Value = serde_json::from_str(raw)?;

        let invocation = match name {
            "read_file" => Self::ReadFile(serde_json::from_value(value)?),
            "list_files" => Self::ListFiles(serde_json::from_value(value)?),
            "search_files" => Self::SearchFiles(serde_json::from_value(value)?),
            "write_to_file" => Self::WriteToFile(serde_json::from_value(value)?),
            "insert_content" => Self::InsertContent(serde_json::from_value(value)?),
            "apply_diff" => Self::ApplyDiff(serde_json::from_value(value)?),
            "search_and_replace" => Self::SearchAndReplace(serde_json::from_value(value)?),
            "execute_command" => Self::ExecuteCommand(serde_json::from_value(value)?),
            "use_mcp_tool" => Self::UseMcpTool(serde_json::from_value(value)?),
            "access_mcp_resource" => Self::AccessMcpResource(serde_json::from_value(value)?),
            "browser_action" => Self::BrowserAction(serde_json::from_value(value)?),
            "switch_mode" => Self::SwitchMode(serde_json::from_value(value)?),
            "new_task" => Self::NewTask(serde_json::from_value(value)?),
            "ask_followup_question" => Self::AskFollowupQuestion(serde_json::from_value(value)?),
            "attempt_completion" => Self::AttemptCompletion(serde_json::from_value(value)?),
            "update_todo_list" => Self::UpdateTodoList { todos: value },
            other => Self::Opaque {
                name: other.to_string(),
                args: value,
            },
        };
        Ok(invocation)
    }

    /// The catalog name of this invocation.
    pub fn name(&self) -> &str {
        match self {
            Self::ReadFile(_) => "read_file",
            Self::ListFiles(_) => "list_files",
            Self::SearchFiles(_) => "search_files",
            Self::WriteToFile(_) => "write_to_file",
            Self::InsertContent(_) => "insert_content",
            Self::ApplyDiff(_) => "apply_diff",
            Self::SearchAndReplace(_) => "search_and_replace",
            Self::ExecuteCommand(_) => "execute_command",
            Self::UseMcpTool(_) => "use_mcp_tool",
            Self::AccessMcpResource(_) => "access_mcp_resource",
            Self::BrowserAction(_) => "browser_action",
            Self::SwitchMode(_) => "switch_mode",
            Self::NewTask(_) => "new_task",
            Self::AskFollowupQuestion(_) => "ask_followup_question",
            Self::AttemptCompletion(_) => "attempt_completion",
            Self::UpdateTodoList { .. } => "update_todo_list",
            Self::Opaque { name, .. } => name,
        }
    }

    /// The primary file-system path this invocation touches, if any.
    pub fn primary_path(&self) -> Option<&str> {
        match self {
            Self::ReadFile(a) => Some(&a.path),
            Self::ListFiles(a) => Some(&a.path),
            Self::SearchFiles(a) => Some(&a.path),
            Self::WriteToFile(a) => Some(&a.path),
            Self::InsertContent(a) => Some(&a.path),
            Self::ApplyDiff(a) => Some(&a.path),
            Self::SearchAndReplace(a) => Some(&a.path),
            _ => None,
        }
    }

    /// The ask kind raised before executing this invocation.
    pub fn ask_kind(&self) -> AskKind {
        match self {
            Self::ExecuteCommand(_) => AskKind::Command,
            Self::UseMcpTool(_) | Self::AccessMcpResource(_) => AskKind::UseMcpServer,
            Self::BrowserAction(_) => AskKind::BrowserActionLaunch,
            Self::AskFollowupQuestion(_) => AskKind::Followup,
            Self::AttemptCompletion(_) => AskKind::CompletionResult,
            _ => AskKind::Tool,
        }
    }

    /// Build the opaque ask payload the policy inspects.
    pub fn ask_payload(&self, ctx: &AskContext) -> String {
        match self {
            Self::ReadFile(a) => tool_payload("readFile", &a.path, ctx),
            Self::ListFiles(a) => {
                let tool = if a.recursive {
                    "listFilesRecursive"
                } else {
                    "listFilesTopLevel"
                };
                tool_payload(tool, &a.path, ctx)
            }
            Self::SearchFiles(a) => tool_payload("searchFiles", &a.path, ctx),
            Self::WriteToFile(a) => {
                let tool = if ctx.file_exists {
                    "editedExistingFile"
                } else {
                    "newFileCreated"
                };
                tool_payload(tool, &a.path, ctx)
            }
            Self::InsertContent(a) => tool_payload("insertContent", &a.path, ctx),
            Self::ApplyDiff(a) => tool_payload("appliedDiff", &a.path, ctx),
            Self::SearchAndReplace(a) => tool_payload("searchAndReplace", &a.path, ctx),
            Self::ExecuteCommand(a) => a.command.clone(),
            Self::UseMcpTool(a) => serialize_or_empty(&McpPayload::UseMcpTool {
                server_name: a.server_name.clone(),
                tool_name: a.tool_name.clone(),
                arguments: a.arguments.clone(),
            }),
            Self::AccessMcpResource(a) => serialize_or_empty(&McpPayload::AccessMcpResource {
                server_name: a.server_name.clone(),
                uri: a.uri.clone(),
            }),
            Self::BrowserAction(a) => a.url.clone().unwrap_or_else(|| a.action.clone()),
            Self::SwitchMode(a) => json!({"tool": "switchMode", "mode": a.mode_slug}).to_string(),
            Self::NewTask(a) => {
                json!({"tool": "newTask", "mode": a.mode, "content": a.message}).to_string()
            }
            Self::AskFollowupQuestion(a) => serialize_or_empty(&FollowupPayload {
                question: Some(a.question.clone()),
                suggest: a
                    .follow_up
                    .iter()
                    .cloned()
                    .map(toolgate_protocol::Suggestion::Text)
                    .collect(),
            }),
            Self::AttemptCompletion(a) => a.result.clone(),
            Self::UpdateTodoList { .. } => json!({"tool": "updateTodoList"}).to_string(),
            Self::Opaque { name, args } => json!({"tool": name, "args": args}).to_string(),
        }
    }
}

fn tool_payload(tool: &str, path: &str, ctx: &AskContext) -> String {
    json!({
        "tool": tool,
        "path": path,
        "isOutsideWorkspace": ctx.is_outside_workspace,
        "isProtected": ctx.is_protected,
    })
    .to_string()
}

fn serialize_or_empty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}
