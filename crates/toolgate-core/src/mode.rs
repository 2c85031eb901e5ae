//! Mode configurations.
//!
//! A mode grants an ordered set of capability groups and a persona. Modes
//! come from built-in defaults merged with user-authored custom modes;
//! resolution never fails, falling back to the default `code` mode for
//! absent or unknown slugs.

use crate::catalog::ToolGroup;
use serde::{Deserialize, Serialize};

/// Slug of the fallback mode.
pub const DEFAULT_MODE_SLUG: &str = "code";

/// One mode configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModeConfig {
    /// Unique slug.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Role/persona text injected into the system prompt.
    pub role_definition: String,
    /// Capability groups this mode permits, in order.
    pub groups: Vec<ToolGroup>,
    /// Guidance on when to pick this mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when_to_use: Option<String>,
}

impl ModeConfig {
    /// Create a new mode.
    pub fn new(slug: impl Into<String>, name: impl Into<String>, groups: Vec<ToolGroup>) -> Self {
        Self {
            slug: slug.into(),
            name: name.into(),
            role_definition: String::new(),
            groups,
            when_to_use: None,
        }
    }

    /// Set the role definition.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role_definition = role.into();
        self
    }

    /// Check if this mode permits a capability group.
    pub fn allows_group(&self, group: ToolGroup) -> bool {
        self.groups.contains(&group)
    }
}

/// Built-in mode definitions.
pub fn builtin_modes() -> Vec<ModeConfig> {
    vec![
        ModeConfig::new(
            "code",
            "Code",
            vec![
                ToolGroup::Read,
                ToolGroup::Edit,
                ToolGroup::Browser,
                ToolGroup::Command,
                ToolGroup::Mcp,
                ToolGroup::Modes,
            ],
        )
        .with_role("You are a skilled software engineer with deep knowledge of many languages."),
        ModeConfig::new(
            "architect",
            "Architect",
            vec![ToolGroup::Read, ToolGroup::Browser, ToolGroup::Mcp],
        )
        .with_role("You are a technical leader focused on planning and design."),
        ModeConfig::new(
            "ask",
            "Ask",
            vec![ToolGroup::Read, ToolGroup::Browser, ToolGroup::Mcp],
        )
        .with_role("You are a knowledgeable assistant answering questions about the codebase."),
        ModeConfig::new(
            "debug",
            "Debug",
            vec![
                ToolGroup::Read,
                ToolGroup::Edit,
                ToolGroup::Browser,
                ToolGroup::Command,
                ToolGroup::Mcp,
                ToolGroup::Modes,
            ],
        )
        .with_role("You are an expert debugger methodically diagnosing problems."),
        ModeConfig::new("orchestrator", "Orchestrator", vec![ToolGroup::Modes])
            .with_role("You coordinate complex work by delegating to specialized modes."),
    ]
}

/// Registry of available modes.
///
/// Custom modes override built-ins with the same slug and are otherwise
/// appended in order.
#[derive(Debug, Clone)]
pub struct ModeRegistry {
    modes: Vec<ModeConfig>,
}

impl ModeRegistry {
    /// Create a registry with the built-in modes.
    pub fn with_builtins() -> Self {
        Self {
            modes: builtin_modes(),
        }
    }

    /// Merge user-authored custom modes over the built-ins.
    pub fn merge_custom(&mut self, custom: Vec<ModeConfig>) {
        for mode in custom {
            if let Some(existing) = self.modes.iter_mut().find(|m| m.slug == mode.slug) {
                *existing = mode;
            } else {
                self.modes.push(mode);
            }
        }
    }

    /// Get a mode by slug.
    pub fn get(&self, slug: &str) -> Option<&ModeConfig> {
        self.modes.iter().find(|m| m.slug == slug)
    }

    /// Resolve a slug to a mode, falling back to the default mode.
    ///
    /// Never fails: the built-in `code` mode is always present.
    pub fn resolve(&self, slug: &str) -> &ModeConfig {
        self.get(slug)
            .or_else(|| self.get(DEFAULT_MODE_SLUG))
            .unwrap_or(&self.modes[0])
    }

    /// All modes, in order.
    pub fn all(&self) -> impl Iterator<Item = &ModeConfig> {
        self.modes.iter()
    }
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
