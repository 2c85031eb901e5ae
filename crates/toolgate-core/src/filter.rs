//! Per-turn tool filtering.
//!
//! Computes the concrete tool set exposed to the model for one turn from
//! the mode's capability groups, conditional gates, and per-model
//! include/exclude metadata. Filtering never fails; absent or malformed
//! mode data degrades to the default mode.

use crate::catalog::{self, ToolGroup};
use crate::mode::ModeRegistry;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Experiment flag gating the image generation tool.
pub const EXPERIMENT_IMAGE_GENERATION: &str = "imageGeneration";
/// Experiment flag gating the slash-command runner tool.
pub const EXPERIMENT_RUN_SLASH_COMMAND: &str = "runSlashCommand";

/// Per-model tool metadata, supplied by the model backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelToolCapability {
    /// Tools never offered, even if the mode permits them.
    pub excluded_tools: Vec<String>,
    /// Opt-in tools to add back, still subject to the mode's groups.
    pub included_tools: Vec<String>,
    /// Native function calling vs. XML-embedded tool syntax.
    pub supports_native_tools: bool,
}

/// A candidate tool offered to the model.
///
/// The descriptor is opaque to the filter (native function-call schema or
/// legacy XML description); filtering preserves its original shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    /// Tool name.
    pub name: String,
    /// Backend-specific descriptor.
    pub descriptor: Value,
}

impl ToolDescriptor {
    /// Create a descriptor with an opaque payload.
    pub fn new(name: impl Into<String>, descriptor: Value) -> Self {
        Self {
            name: name.into(),
            descriptor,
        }
    }

    /// Create a name-only descriptor.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, Value::Null)
    }
}

/// Inputs to one filtering pass, passed explicitly rather than read from
/// shared state.
#[derive(Debug, Clone)]
pub struct FilterContext<'a> {
    /// Current mode slug; unknown slugs fall back to the default mode.
    pub mode_slug: &'a str,
    /// Available modes.
    pub modes: &'a ModeRegistry,
    /// Experiment flags.
    pub experiments: &'a HashMap<String, bool>,
    /// Whether a codebase index is active.
    pub codebase_index_active: bool,
    /// Whether any connected MCP server exposes at least one resource.
    pub mcp_resources_available: bool,
    /// Whether the todo-list tool is enabled.
    pub todo_list_enabled: bool,
    /// Per-model include/exclude metadata.
    pub capability: &'a ModelToolCapability,
}

impl FilterContext<'_> {
    fn experiment_enabled(&self, flag: &str) -> bool {
        self.experiments.get(flag).copied().unwrap_or(false)
    }
}

/// Compute the tool names allowed for this turn.
fn allowed_tool_names<'a>(ctx: &'a FilterContext<'a>) -> HashSet<&'a str> {
    let mode = ctx.modes.resolve(ctx.mode_slug);

    // Always-available tools plus every ordinary tool of a permitted group.
    let mut allowed: HashSet<&str> = catalog::ALWAYS_AVAILABLE_TOOLS.iter().copied().collect();
    for group in &mode.groups {
        allowed.extend(catalog::tools_in_group(*group));
    }

    // Conditional gates.
    if !ctx.codebase_index_active {
        allowed.remove("codebase_search");
    }
    if !ctx.mcp_resources_available {
        allowed.remove("access_mcp_resource");
    }
    if !ctx.todo_list_enabled {
        allowed.remove("update_todo_list");
    }
    if !ctx.experiment_enabled(EXPERIMENT_IMAGE_GENERATION) {
        allowed.remove("generate_image");
    }
    if !ctx.experiment_enabled(EXPERIMENT_RUN_SLASH_COMMAND) {
        allowed.remove("run_slash_command");
    }

    // Model exclusions win over everything that came before.
    for tool in &ctx.capability.excluded_tools {
        allowed.remove(tool.as_str());
    }

    // Model inclusions add back only tools that belong to a permitted
    // group; tools with no catalog membership are never added, and an
    // exclusion always wins over an inclusion.
    for tool in &ctx.capability.included_tools {
        if ctx.capability.excluded_tools.contains(tool) {
            continue;
        }
        if let Some(membership) = catalog::membership(tool) {
            if mode.allows_group(membership.group) {
                allowed.insert(tool.as_str());
            }
        }
    }

    allowed
}

/// Filter the candidate tool list for one turn.
///
/// Returns the candidates whose names survive filtering, preserving each
/// candidate's original descriptor shape and order.
pub fn filter_tools(candidates: &[ToolDescriptor], ctx: &FilterContext<'_>) -> Vec<ToolDescriptor> {
    let allowed = allowed_tool_names(ctx);
    let filtered: Vec<ToolDescriptor> = candidates
        .iter()
        .filter(|c| allowed.contains(c.name.as_str()))
        .cloned()
        .collect();

    debug!(
        mode = ctx.mode_slug,
        candidates = candidates.len(),
        offered = filtered.len(),
        "filtered tool set"
    );
    filtered
}

/// Filter MCP tool descriptors for a mode.
///
/// MCP tools are all-or-nothing per mode: the full list if the mode
/// includes the `mcp` group, else empty. Model include/exclude metadata
/// and conditional gates do not apply here.
pub fn filter_mcp_tools_for_mode(
    tools: &[ToolDescriptor],
    mode_slug: &str,
    modes: &ModeRegistry,
) -> Vec<ToolDescriptor> {
    let mode = modes.resolve(mode_slug);
    if mode.allows_group(ToolGroup::Mcp) {
        tools.to_vec()
    } else {
        Vec::new()
    }
}
