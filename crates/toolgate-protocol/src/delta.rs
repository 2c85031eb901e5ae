//! Streamed model-backend deltas.

use serde::{Deserialize, Serialize};

/// One delta from a streaming model response.
///
/// Tool-call fields populate incrementally across multiple deltas sharing
/// the same `index`; any field may be absent on a given delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelDelta {
    /// Assistant text delta.
    Text {
        /// Text fragment.
        text: String,
    },
    /// Reasoning/thinking text delta.
    Reasoning {
        /// Reasoning fragment.
        text: String,
    },
    /// Partial tool call, merged by `index`.
    ToolCallPartial {
        /// Position of the call within this turn.
        index: u32,
        /// Call ID, usually present only on the first delta.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Tool name, usually present only on the first delta.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// JSON argument fragment to append.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arguments: Option<String>,
    },
    /// Token usage counters for the turn so far.
    Usage {
        #[serde(rename = "inputTokens")]
        input_tokens: u32,
        #[serde(rename = "outputTokens")]
        output_tokens: u32,
    },
}

impl ModelDelta {
    /// Create a text delta.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a reasoning delta.
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::Reasoning { text: text.into() }
    }

    /// Create a usage delta.
    pub fn usage(input_tokens: u32, output_tokens: u32) -> Self {
        Self::Usage {
            input_tokens,
            output_tokens,
        }
    }

    /// Check if this is a tool-call delta.
    pub fn is_tool_call(&self) -> bool {
        matches!(self, ModelDelta::ToolCallPartial { .. })
    }
}

/// Accumulated token usage for a conversation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    /// Input tokens used.
    pub input_tokens: u32,
    /// Output tokens generated.
    pub output_tokens: u32,
}

impl Usage {
    /// Create a new usage with input and output tokens.
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Total tokens (input + output).
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }

    /// Merge with another usage (adding all counts).
    pub fn merge(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}
