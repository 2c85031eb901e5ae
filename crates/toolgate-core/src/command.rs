//! Command allow/deny classification.
//!
//! A pure function over the command text and the configured allow/deny
//! prefix lists. No I/O and no shell parsing; subshell syntax is detected
//! textually and blocks auto-approval since it can smuggle arbitrary
//! commands past a prefix match.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Outcome of classifying a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandDecision {
    /// Matched the allow list; may run without confirmation.
    AutoApprove,
    /// Matched the deny list; rejected without confirmation.
    AutoDeny,
    /// No list decides; ask the user.
    Ask,
}

static SUBSHELL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\(|`").expect("static regex"));

/// Length of the longest matching prefix pattern, if any.
///
/// Patterns match case-insensitively against the start of the command.
/// The `*` entry matches every command with the lowest possible priority.
fn longest_match(command: &str, patterns: &[String]) -> Option<usize> {
    let lowered = command.to_lowercase();
    let mut best: Option<usize> = None;
    for pattern in patterns {
        let matched = if pattern == "*" {
            Some(0)
        } else if lowered.starts_with(&pattern.to_lowercase()) {
            Some(pattern.len())
        } else {
            None
        };
        if let Some(len) = matched {
            if best.map_or(true, |b| len > b) {
                best = Some(len);
            }
        }
    }
    best
}

/// Classify a command against the allow/deny prefix lists.
///
/// Longest match wins; the deny list wins ties. Commands containing
/// subshell syntax are auto-denied when a deny list exists and escalate
/// otherwise.
pub fn decide_command(
    command: &str,
    allowed: &[String],
    denied: &[String],
) -> CommandDecision {
    let command = command.trim();
    if command.is_empty() {
        return CommandDecision::Ask;
    }

    if SUBSHELL.is_match(command) {
        return if denied.is_empty() {
            CommandDecision::Ask
        } else {
            CommandDecision::AutoDeny
        };
    }

    let allow_len = longest_match(command, allowed);
    let deny_len = longest_match(command, denied);

    match (allow_len, deny_len) {
        (Some(a), Some(d)) if d >= a => CommandDecision::AutoDeny,
        (Some(_), _) => CommandDecision::AutoApprove,
        (None, Some(_)) => CommandDecision::AutoDeny,
        (None, None) => CommandDecision::Ask,
    }
}
