//! Token estimation for context-window budgeting.
//!
//! The canonical estimator is a streaming heuristic that scans text in
//! fixed-size chunks and can stop as soon as a token limit is exceeded,
//! so oversized content is never scanned to the end. A conservative
//! character-ratio fallback exists for callers whose estimator fails on
//! pathological input; the two are never compared against each other.

use thiserror::Error;

/// Canonical chars-per-token ratio used by the streaming estimator.
pub const CHARS_PER_TOKEN: usize = 4;

/// Conservative chars-per-token ratio for the fallback path.
pub const FALLBACK_CHARS_PER_TOKEN: usize = 2;

/// Scan window for the streaming estimator, in bytes.
const CHUNK_BYTES: usize = 4096;

/// Error from a token estimator implementation.
#[derive(Debug, Error)]
#[error("token estimation failed: {0}")]
pub struct EstimateError(pub String);

/// Result of estimating tokens against a limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenEstimate {
    /// Estimated token count. When `exceeded_limit` is set this is the
    /// count at the point scanning stopped, not the full-text count.
    pub tokens: usize,
    /// Whether the estimate crossed the limit before the end of the text.
    pub exceeded_limit: bool,
}

/// A token estimator that can abort early once a limit is exceeded.
pub trait TokenEstimator: Send + Sync {
    /// Estimate tokens for `text`, stopping early once `limit` is exceeded.
    fn estimate(&self, text: &str, limit: usize) -> Result<TokenEstimate, EstimateError>;
}

/// The canonical streaming estimator.
///
/// Counts bytes in [`CHUNK_BYTES`] windows at [`CHARS_PER_TOKEN`] bytes per
/// token and returns as soon as the running count exceeds the limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamingEstimator;

impl TokenEstimator for StreamingEstimator {
    fn estimate(&self, text: &str, limit: usize) -> Result<TokenEstimate, EstimateError> {
        let bytes = text.as_bytes();
        let mut seen = 0usize;

        for chunk in bytes.chunks(CHUNK_BYTES) {
            seen += chunk.len();
            let tokens = seen.div_ceil(CHARS_PER_TOKEN);
            if tokens > limit {
                return Ok(TokenEstimate {
                    tokens,
                    exceeded_limit: true,
                });
            }
        }

        Ok(TokenEstimate {
            tokens: bytes.len().div_ceil(CHARS_PER_TOKEN),
            exceeded_limit: false,
        })
    }
}

/// Conservative character-based estimate for when the estimator fails.
///
/// Assumes [`FALLBACK_CHARS_PER_TOKEN`] characters per token, which
/// over-counts for typical text and therefore errs toward truncating.
pub fn conservative_estimate(text: &str) -> usize {
    text.len().div_ceil(FALLBACK_CHARS_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text() {
        let est = StreamingEstimator.estimate("", 100).unwrap();
        assert_eq!(est.tokens, 0);
        assert!(!est.exceeded_limit);
    }

    #[test]
    fn test_small_text_under_limit() {
        let est = StreamingEstimator.estimate("hello world", 100).unwrap();
        assert_eq!(est.tokens, 3); // 11 bytes / 4, rounded up
        assert!(!est.exceeded_limit);
    }

    #[test]
    fn test_exact_ratio() {
        let text = "a".repeat(200_000);
        let est = StreamingEstimator.estimate(&text, usize::MAX).unwrap();
        assert_eq!(est.tokens, 50_000);
        assert!(!est.exceeded_limit);
    }

    #[test]
    fn test_early_exit_on_limit() {
        let text = "a".repeat(200_000);
        let est = StreamingEstimator.estimate(&text, 48_000).unwrap();
        assert!(est.exceeded_limit);
        // Stops mid-scan: the reported count is past the limit but well
        // short of the full-text count.
        assert!(est.tokens > 48_000);
        assert!(est.tokens < 50_000);
    }

    #[test]
    fn test_limit_boundary_not_exceeded() {
        let text = "a".repeat(400);
        let est = StreamingEstimator.estimate(&text, 100).unwrap();
        assert_eq!(est.tokens, 100);
        assert!(!est.exceeded_limit);
    }

    #[test]
    fn test_conservative_estimate() {
        assert_eq!(conservative_estimate(""), 0);
        assert_eq!(conservative_estimate("abcd"), 2);
        assert_eq!(conservative_estimate("abcde"), 3);
    }

    #[test]
    fn test_conservative_overcounts_canonical() {
        let text = "x".repeat(1000);
        let canonical = StreamingEstimator
            .estimate(&text, usize::MAX)
            .unwrap()
            .tokens;
        assert!(conservative_estimate(&text) > canonical);
    }
}
