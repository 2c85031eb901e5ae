//! Wildcard pattern matching.
//!
//! This module provides simple wildcard matching for allow-list entries,
//! such as per-server MCP tool names. Supports `*` as a wildcard that
//! matches any sequence of characters.

/// Match a string against a wildcard pattern.
///
/// The pattern can contain:
/// - `*` - matches any sequence of characters (including empty)
/// - Any other character - matches itself literally
///
/// # Examples
///
/// ```
/// use toolgate_util::wildcard::matches;
///
/// assert!(matches("get_*", "get_issue"));
/// assert!(matches("*", "anything"));
/// assert!(!matches("get_*", "list_issues"));
/// ```
pub fn matches(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();

    matches_recursive(&pattern_chars, &text_chars, 0, 0)
}

fn matches_recursive(pattern: &[char], text: &[char], pi: usize, ti: usize) -> bool {
    // Both exhausted - match!
    if pi == pattern.len() && ti == text.len() {
        return true;
    }

    // Pattern exhausted but text remains - no match
    if pi == pattern.len() {
        return false;
    }

    // Handle wildcard
    if pattern[pi] == '*' {
        // Try matching zero characters (skip the *)
        if matches_recursive(pattern, text, pi + 1, ti) {
            return true;
        }

        // Try matching one or more characters
        if ti < text.len() && matches_recursive(pattern, text, pi, ti + 1) {
            return true;
        }

        return false;
    }

    // Text exhausted but pattern has more non-* characters
    if ti == text.len() {
        return false;
    }

    // Match single character
    if pattern[pi] == text[ti] {
        return matches_recursive(pattern, text, pi + 1, ti + 1);
    }

    false
}

/// Check if a name matches any of the patterns.
///
/// Returns the first matching pattern, or None if no match.
pub fn find_matching_pattern<'a, I>(patterns: I, text: &str) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    patterns.into_iter().find(|&p| matches(p, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(matches("hello", "hello"));
        assert!(!matches("hello", "world"));
    }

    #[test]
    fn test_wildcard_end() {
        assert!(matches("get_*", "get_issue"));
        assert!(matches("get_*", "get_"));
        assert!(!matches("get_*", "list_issues"));
    }

    #[test]
    fn test_wildcard_start() {
        assert!(matches("*_file", "read_file"));
        assert!(matches("*_file", "_file"));
        assert!(!matches("*_file", "read_files"));
    }

    #[test]
    fn test_wildcard_middle() {
        assert!(matches("get_*_comments", "get_issue_comments"));
        assert!(!matches("get_*_comments", "get_issue"));
    }

    #[test]
    fn test_multiple_wildcards() {
        assert!(matches("*issue*", "get_issue_comments"));
        assert!(matches("*issue*", "issue"));
    }

    #[test]
    fn test_just_wildcard() {
        assert!(matches("*", "anything"));
        assert!(matches("*", ""));
    }

    #[test]
    fn test_empty_pattern() {
        assert!(matches("", ""));
        assert!(!matches("", "something"));
    }

    #[test]
    fn test_consecutive_wildcards() {
        assert!(matches("**", "anything"));
        assert!(matches("a**b", "ab"));
        assert!(matches("a**b", "aXXXb"));
    }

    #[test]
    fn test_find_matching_pattern_returns_first_match() {
        let patterns = ["get_*", "list_*"];
        assert_eq!(
            find_matching_pattern(patterns, "get_issue"),
            Some("get_*")
        );
        assert_eq!(
            find_matching_pattern(patterns, "list_issues"),
            Some("list_*")
        );
        assert_eq!(find_matching_pattern(patterns, "delete_repo"), None);
    }
}
