//! Static tool catalog.
//!
//! Source of truth for tool-to-capability-group membership. The catalog is
//! defined at process start and never changes; unknown tool names simply
//! belong to no group.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Capability groups a mode can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolGroup {
    Read,
    Edit,
    Browser,
    Command,
    Mcp,
    Modes,
}

impl ToolGroup {
    /// All groups, in display order.
    pub const ALL: &'static [ToolGroup] = &[
        ToolGroup::Read,
        ToolGroup::Edit,
        ToolGroup::Browser,
        ToolGroup::Command,
        ToolGroup::Mcp,
        ToolGroup::Modes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolGroup::Read => "read",
            ToolGroup::Edit => "edit",
            ToolGroup::Browser => "browser",
            ToolGroup::Command => "command",
            ToolGroup::Mcp => "mcp",
            ToolGroup::Modes => "modes",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "read" => Some(ToolGroup::Read),
            "edit" => Some(ToolGroup::Edit),
            "browser" => Some(ToolGroup::Browser),
            "command" => Some(ToolGroup::Command),
            "mcp" => Some(ToolGroup::Mcp),
            "modes" => Some(ToolGroup::Modes),
            _ => None,
        }
    }
}

/// Tools offered under every mode, regardless of capability groups.
pub const ALWAYS_AVAILABLE_TOOLS: &[&str] = &[
    "ask_followup_question",
    "attempt_completion",
    "switch_mode",
    "new_task",
    "update_todo_list",
];

/// Ordinary tool membership per group.
static GROUP_TOOLS: Lazy<HashMap<ToolGroup, &'static [&'static str]>> = Lazy::new(|| {
    let mut map: HashMap<ToolGroup, &'static [&'static str]> = HashMap::new();
    map.insert(
        ToolGroup::Read,
        &[
            "read_file",
            "fetch_instructions",
            "search_files",
            "list_files",
            "list_code_definition_names",
            "codebase_search",
        ],
    );
    map.insert(
        ToolGroup::Edit,
        &[
            "apply_diff",
            "write_to_file",
            "insert_content",
            "search_and_replace",
            "generate_image",
        ],
    );
    map.insert(ToolGroup::Browser, &["browser_action"]);
    map.insert(ToolGroup::Command, &["execute_command", "run_slash_command"]);
    map.insert(ToolGroup::Mcp, &["use_mcp_tool", "access_mcp_resource"]);
    map.insert(ToolGroup::Modes, &["switch_mode", "new_task"]);
    map
});

/// Opt-in sibling tools per group. Never offered unless explicitly named
/// in a model's included-tools list.
static CUSTOM_TOOLS: Lazy<HashMap<ToolGroup, &'static [&'static str]>> = Lazy::new(|| {
    let mut map: HashMap<ToolGroup, &'static [&'static str]> = HashMap::new();
    map.insert(ToolGroup::Edit, &["edit_file"]);
    map
});

/// A tool's catalog membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolMembership {
    /// The group the tool belongs to.
    pub group: ToolGroup,
    /// Whether it is an opt-in custom tool of that group.
    pub custom: bool,
}

/// Ordinary tools in a capability group.
pub fn tools_in_group(group: ToolGroup) -> &'static [&'static str] {
    GROUP_TOOLS.get(&group).copied().unwrap_or(&[])
}

/// Opt-in custom tools in a capability group.
pub fn custom_tools_in_group(group: ToolGroup) -> &'static [&'static str] {
    CUSTOM_TOOLS.get(&group).copied().unwrap_or(&[])
}

/// Whether a tool is offered under every mode.
pub fn is_always_available(tool: &str) -> bool {
    ALWAYS_AVAILABLE_TOOLS.contains(&tool)
}

/// Look up a tool's group membership. Unknown names belong to no group.
pub fn membership(tool: &str) -> Option<ToolMembership> {
    for group in ToolGroup::ALL {
        if tools_in_group(*group).contains(&tool) {
            return Some(ToolMembership {
                group: *group,
                custom: false,
            });
        }
        if custom_tools_in_group(*group).contains(&tool) {
            return Some(ToolMembership {
                group: *group,
                custom: true,
            });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_membership() {
        assert!(tools_in_group(ToolGroup::Read).contains(&"read_file"));
        assert!(tools_in_group(ToolGroup::Edit).contains(&"write_to_file"));
        assert!(tools_in_group(ToolGroup::Browser).contains(&"browser_action"));
        assert!(tools_in_group(ToolGroup::Command).contains(&"execute_command"));
        assert!(tools_in_group(ToolGroup::Mcp).contains(&"use_mcp_tool"));
        assert!(tools_in_group(ToolGroup::Modes).contains(&"switch_mode"));
    }

    #[test]
    fn test_always_available() {
        assert!(is_always_available("ask_followup_question"));
        assert!(is_always_available("attempt_completion"));
        assert!(!is_always_available("write_to_file"));
        assert!(!is_always_available("no_such_tool"));
    }

    #[test]
    fn test_membership_ordinary() {
        let m = membership("read_file").unwrap();
        assert_eq!(m.group, ToolGroup::Read);
        assert!(!m.custom);
    }

    #[test]
    fn test_membership_custom() {
        let m = membership("edit_file").unwrap();
        assert_eq!(m.group, ToolGroup::Edit);
        assert!(m.custom);
    }

    #[test]
    fn test_unknown_tool_has_no_group() {
        assert!(membership("definitely_not_a_tool").is_none());
    }

    #[test]
    fn test_custom_tools_not_in_ordinary_list() {
        assert!(!tools_in_group(ToolGroup::Edit).contains(&"edit_file"));
        assert!(custom_tools_in_group(ToolGroup::Edit).contains(&"edit_file"));
    }

    #[test]
    fn test_group_parse_roundtrip() {
        for group in ToolGroup::ALL {
            assert_eq!(ToolGroup::parse(group.as_str()), Some(*group));
        }
        assert_eq!(ToolGroup::parse("MCP"), Some(ToolGroup::Mcp));
        assert_eq!(ToolGroup::parse("unknown"), None);
    }
}
