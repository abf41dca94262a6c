//! Token estimation for chunk budgets
//!
//! Two estimators are provided:
//! - [`BpeEstimator`]: exact cl100k_base counts via tiktoken
//! - [`HeuristicEstimator`]: a conservative character-based estimate that never
//!   needs any model data
//!
//! Both are deterministic and never fail. When the BPE tables cannot be loaded
//! the BPE estimator degrades to the heuristic one.

use crate::config::TokenizerConfig;
use std::sync::{Arc, OnceLock};
use tiktoken_rs::{CoreBPE, cl100k_base};

/// Opaque cost function measuring text in model tokens
pub trait TokenEstimator: Send + Sync {
    /// Estimated token count of `text`
    fn estimate(&self, text: &str) -> usize;

    /// Short name used in logs
    fn name(&self) -> &str;

    /// Cost of one line inside a chunk, including its line terminator
    fn line_cost(&self, line: &str) -> usize {
        self.estimate(line) + 1
    }
}

/// Character-based estimate that errs on the high side
///
/// ASCII characters cost `1 / chars_per_token` of a token; every other
/// character costs a full token. The total is rounded up, so the estimate of a
/// concatenation never exceeds the sum of the parts.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicEstimator {
    chars_per_token: usize,
}

impl HeuristicEstimator {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for HeuristicEstimator {
    fn default() -> Self {
        Self::new(3)
    }
}

impl TokenEstimator for HeuristicEstimator {
    fn estimate(&self, text: &str) -> usize {
        let per_token = self.chars_per_token;
        let units: usize = text
            .chars()
            .map(|c| if c.is_ascii() { 1 } else { per_token })
            .sum();
        units.div_ceil(per_token)
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

static CL100K: OnceLock<Option<CoreBPE>> = OnceLock::new();

fn cl100k() -> Option<&'static CoreBPE> {
    CL100K
        .get_or_init(|| match cl100k_base() {
            Ok(bpe) => Some(bpe),
            Err(e) => {
                tracing::warn!(
                    "Failed to load cl100k_base tables, using heuristic estimates: {}",
                    e
                );
                None
            }
        })
        .as_ref()
}

/// Exact BPE token counts with a heuristic fallback
pub struct BpeEstimator {
    bpe: Option<&'static CoreBPE>,
    fallback: HeuristicEstimator,
}

impl BpeEstimator {
    pub fn new(fallback: HeuristicEstimator) -> Self {
        Self {
            bpe: cl100k(),
            fallback,
        }
    }

    /// Whether exact counting is available
    pub fn is_exact(&self) -> bool {
        self.bpe.is_some()
    }
}

impl TokenEstimator for BpeEstimator {
    fn estimate(&self, text: &str) -> usize {
        match self.bpe {
            Some(bpe) => bpe.encode_ordinary(text).len(),
            None => self.fallback.estimate(text),
        }
    }

    fn name(&self) -> &str {
        if self.is_exact() { "cl100k_base" } else { "heuristic" }
    }
}

/// Build the estimator selected by configuration
pub fn estimator_from_config(config: &TokenizerConfig) -> Arc<dyn TokenEstimator> {
    let heuristic = HeuristicEstimator::new(config.chars_per_token);
    match config.estimator.as_str() {
        "heuristic" => Arc::new(heuristic),
        _ => Arc::new(BpeEstimator::new(heuristic)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_empty() {
        assert_eq!(HeuristicEstimator::default().estimate(""), 0);
    }

    #[test]
    fn test_heuristic_rounds_up() {
        let est = HeuristicEstimator::default();
        assert_eq!(est.estimate("a"), 1);
        assert_eq!(est.estimate("abc"), 1);
        assert_eq!(est.estimate("abcd"), 2);
    }

    #[test]
    fn test_heuristic_non_ascii_costs_full_token() {
        let est = HeuristicEstimator::default();
        assert_eq!(est.estimate("日本語"), 3);
        assert_eq!(est.estimate("ab日"), 2);
    }

    #[test]
    fn test_heuristic_is_subadditive() {
        let est = HeuristicEstimator::default();
        let samples = ["", "a", "ab", "MOVE WS-A TO WS-B.", "é", "fn main() {}", "      "];
        for a in samples {
            for b in samples {
                let joined = format!("{}{}", a, b);
                assert!(est.estimate(&joined) <= est.estimate(a) + est.estimate(b));
            }
        }
    }

    #[test]
    fn test_heuristic_deterministic() {
        let est = HeuristicEstimator::new(4);
        let text = "PERFORM 1000-INIT THRU 1000-EXIT.";
        assert_eq!(est.estimate(text), est.estimate(text));
    }

    #[test]
    fn test_line_cost_includes_terminator() {
        let est = HeuristicEstimator::default();
        assert_eq!(est.line_cost(""), 1);
        assert_eq!(est.line_cost("abc"), 2);
    }

    #[test]
    fn test_zero_chars_per_token_is_clamped() {
        let est = HeuristicEstimator::new(0);
        assert_eq!(est.estimate("abcd"), 4);
    }

    #[test]
    fn test_bpe_counts_tokens() {
        let est = BpeEstimator::new(HeuristicEstimator::default());
        assert_eq!(est.estimate(""), 0);
        assert!(est.estimate("IDENTIFICATION DIVISION.") > 0);
        let text = "hello world";
        assert_eq!(est.estimate(text), est.estimate(text));
    }

    #[test]
    fn test_estimator_from_config() {
        let mut config = TokenizerConfig::default();
        config.estimator = "heuristic".to_string();
        let est = estimator_from_config(&config);
        assert_eq!(est.name(), "heuristic");
        assert_eq!(est.estimate("abcdef"), 2);
    }
}
