//! Token budget enforcement for tool results.
//!
//! Decides whether a file read (or a similarly sized tool result) must be
//! truncated before being handed back to the model so a single result
//! cannot blow the remaining context window. Pure decisions live in
//! [`BudgetGuard::evaluate`]; [`BudgetGuard::check_read`] adds the
//! file-system probing, and any I/O failure there degrades to
//! "do not truncate" so the ordinary read path reports the error instead.

use std::path::Path;
use tokio::io::AsyncReadExt;
use toolgate_util::{conservative_estimate, StreamingEstimator, TokenEstimator};
use tracing::debug;

/// Files under this size skip budget checking entirely.
pub const SMALL_FILE_THRESHOLD: u64 = 100 * 1024;
/// Files above this size are never read in full; only a head preview is
/// considered.
pub const HARD_CEILING: u64 = 20 * 1024 * 1024;
/// Size of the head preview taken for files above the hard ceiling.
pub const PREVIEW_BYTES: usize = 64 * 1024;
/// Chars-per-token heuristic used for the truncation cutoff.
pub const TRUNCATE_CHARS_PER_TOKEN: usize = 3;

/// Outcome of budget-checking one candidate tool result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBudgetResult {
    /// Whether the content must be truncated.
    pub should_truncate: bool,
    /// Character cutoff when truncating.
    pub max_chars: Option<usize>,
    /// Head-only preview of an oversized artifact, as opposed to a
    /// full-content truncation.
    pub is_preview: bool,
    /// Human-readable notice to attach to the result.
    pub reason: Option<String>,
}

impl TokenBudgetResult {
    fn pass_through() -> Self {
        Self {
            should_truncate: false,
            max_chars: None,
            is_preview: false,
            reason: None,
        }
    }
}

/// Inputs describing the remaining context window.
#[derive(Debug, Clone, Copy)]
pub struct BudgetParams {
    /// Total context window of the model, in tokens.
    pub context_window: usize,
    /// Tokens already consumed by the conversation.
    pub tokens_used: usize,
}

/// Fraction of the remaining window a single tool result may consume.
/// The reservation leaves headroom for the model's response and
/// conversation overhead.
fn available_budget(params: &BudgetParams) -> usize {
    let remaining = params.context_window.saturating_sub(params.tokens_used);
    remaining * 6 / 10
}

fn truncation_notice(max_chars: usize, is_preview: bool) -> String {
    let what = if is_preview {
        "Showing a preview of the start of the file"
    } else {
        "Showing the first part of the file"
    };
    format!(
        "File content exceeds the available context budget. {what} \
         ({max_chars} characters). Use a line-range read to retrieve \
         specific omitted sections."
    )
}

/// Budget guard over one token estimator.
pub struct BudgetGuard {
    estimator: Box<dyn TokenEstimator>,
}

impl BudgetGuard {
    /// Create a guard with the default streaming estimator.
    pub fn new() -> Self {
        Self::with_estimator(Box::new(StreamingEstimator))
    }

    /// Create a guard with a specific estimator.
    pub fn with_estimator(estimator: Box<dyn TokenEstimator>) -> Self {
        Self { estimator }
    }

    /// Budget-check candidate content of a known total size.
    ///
    /// `file_size` is the size of the whole artifact; `content` is what
    /// was actually read (a head preview when the artifact is above the
    /// hard ceiling). Files above the ceiling are always flagged
    /// `is_preview` so the model knows more content exists than shown.
    pub fn evaluate(
        &self,
        file_size: u64,
        content: &str,
        params: &BudgetParams,
    ) -> TokenBudgetResult {
        if file_size < SMALL_FILE_THRESHOLD {
            return TokenBudgetResult::pass_through();
        }
        let is_preview = file_size > HARD_CEILING;

        let budget = available_budget(params);
        if budget == 0 {
            return TokenBudgetResult {
                should_truncate: true,
                max_chars: Some(0),
                is_preview,
                reason: Some(truncation_notice(0, is_preview)),
            };
        }

        let exceeded = match self.estimator.estimate(content, budget) {
            Ok(estimate) => {
                debug!(
                    tokens = estimate.tokens,
                    budget,
                    exceeded = estimate.exceeded_limit,
                    "estimated tool result size"
                );
                estimate.exceeded_limit
            }
            Err(err) => {
                debug!(%err, "token estimation failed, using conservative fallback");
                conservative_estimate(content) > budget
            }
        };

        if exceeded {
            let max_chars = budget * TRUNCATE_CHARS_PER_TOKEN;
            TokenBudgetResult {
                should_truncate: true,
                max_chars: Some(max_chars),
                is_preview,
                reason: Some(truncation_notice(max_chars, is_preview)),
            }
        } else {
            TokenBudgetResult {
                should_truncate: false,
                max_chars: None,
                is_preview,
                reason: if is_preview {
                    Some(truncation_notice(PREVIEW_BYTES, true))
                } else {
                    None
                },
            }
        }
    }

    /// Budget-check a file on disk before it is read for the model.
    ///
    /// Any stat or read failure returns a pass-through result; reporting
    /// the I/O error is the read path's job, not this guard's.
    pub async fn check_read(&self, path: &Path, params: &BudgetParams) -> TokenBudgetResult {
        let metadata = match tokio::fs::metadata(path).await {
            Ok(m) => m,
            Err(_) => return TokenBudgetResult::pass_through(),
        };
        let file_size = metadata.len();
        if file_size < SMALL_FILE_THRESHOLD {
            return TokenBudgetResult::pass_through();
        }

        let content = if file_size > HARD_CEILING {
            match read_head(path, PREVIEW_BYTES).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => return TokenBudgetResult::pass_through(),
            }
        } else {
            match tokio::fs::read(path).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => return TokenBudgetResult::pass_through(),
            }
        };

        self.evaluate(file_size, &content, params)
    }
}

impl Default for BudgetGuard {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_head(path: &Path, limit: usize) -> std::io::Result<Vec<u8>> {
    let file = tokio::fs::File::open(path).await?;
    let mut buf = Vec::with_capacity(limit);
    file.take(limit as u64).read_to_end(&mut buf).await?;
    Ok(buf)
}
