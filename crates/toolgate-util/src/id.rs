//! ULID-based identifier generation with prefixes.
//!
//! Identifiers in toolgate follow the pattern: `prefix_ulid`
//! For example: `ask_01HQXYZ...` for approval requests.

use ulid::Ulid;

/// Known identifier prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPrefix {
    /// A pending approval request.
    Ask,
    /// A tool call in flight.
    Call,
    /// A conversation task.
    Task,
}

impl IdPrefix {
    /// Get the string prefix for this identifier type.
    pub fn as_str(&self) -> &'static str {
        match self {
            IdPrefix::Ask => "ask",
            IdPrefix::Call => "cal",
            IdPrefix::Task => "tsk",
        }
    }

    /// Parse a prefix from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ask" => Some(IdPrefix::Ask),
            "cal" => Some(IdPrefix::Call),
            "tsk" => Some(IdPrefix::Task),
            _ => None,
        }
    }
}

/// Identifier generation and parsing utilities.
pub struct Identifier;

impl Identifier {
    /// Generate a new ascending identifier (newer = larger).
    pub fn ascending(prefix: IdPrefix) -> String {
        let ulid = Ulid::new();
        format!("{}_{}", prefix.as_str(), ulid.to_string().to_lowercase())
    }

    /// Parse an identifier into its prefix and ULID parts.
    pub fn parse(id: &str) -> Option<(IdPrefix, Ulid)> {
        let parts: Vec<&str> = id.splitn(2, '_').collect();
        if parts.len() != 2 {
            return None;
        }

        let prefix = IdPrefix::parse(parts[0])?;
        let ulid = Ulid::from_string(parts[1]).ok()?;
        Some((prefix, ulid))
    }

    /// Check if an identifier has the expected prefix.
    pub fn has_prefix(id: &str, prefix: IdPrefix) -> bool {
        id.starts_with(prefix.as_str()) && id.chars().nth(prefix.as_str().len()) == Some('_')
    }

    /// Generate an approval request ID.
    pub fn ask() -> String {
        Self::ascending(IdPrefix::Ask)
    }

    /// Generate a tool call ID.
    pub fn call() -> String {
        Self::ascending(IdPrefix::Call)
    }

    /// Generate a task ID.
    pub fn task() -> String {
        Self::ascending(IdPrefix::Task)
    }
}
