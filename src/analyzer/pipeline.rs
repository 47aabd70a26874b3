//! Parser → aggregator → transformer, composed for one input text.
//!
//! Every run produces a fresh, immutable [`AnalysisResult`]. Nothing is shared
//! between runs, so the same text and configuration always yield the same
//! result.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

use super::log_parser::parse_log;
use super::normalizer::{LineNormalizer, QuoteNormalization};
use super::rolling::enrich;
use super::types::{EnrichedRecord, LineDiagnostic, SummaryStats};

/// Default trailing window length for both the statistics and the moving averages.
pub const DEFAULT_WINDOW_SIZE: NonZeroUsize = NonZeroUsize::new(20).unwrap();

/// Largest window accepted from config or the UI.
pub const MAX_WINDOW_SIZE: usize = 1000;

/// Parameters threaded through one analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub window_size: NonZeroUsize,
    pub quote_normalization: QuoteNormalization,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            quote_normalization: QuoteNormalization::default(),
        }
    }
}

/// Everything the viewer needs to render one loaded log.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// Human-readable origin of the text (usually the file name).
    pub source: String,
    pub window_size: NonZeroUsize,
    /// Built-in strategy used, or `None` when a custom normalizer was passed.
    pub quote_normalization: Option<QuoteNormalization>,
    pub records: Vec<EnrichedRecord>,
    pub stats: SummaryStats,
    pub diagnostics: Vec<LineDiagnostic>,
    pub non_blank_lines: usize,
}

impl AnalysisResult {
    /// False when not a single valid record was found.
    pub fn has_data(&self) -> bool {
        self.stats.total_steps > 0
    }
}

/// Analyze `text` with the normalizer selected by `config`.
pub fn analyze(source: impl Into<String>, text: &str, config: &AnalysisConfig) -> AnalysisResult {
    let mut result = analyze_with(source, text, config.window_size, config.quote_normalization.normalizer());
    result.quote_normalization = Some(config.quote_normalization);
    result
}

/// Analyze `text` with an explicit normalizer.
pub fn analyze_with(source: impl Into<String>, text: &str, window_size: NonZeroUsize, normalizer: &dyn LineNormalizer) -> AnalysisResult {
    let source = source.into();
    let parsed = parse_log(text, normalizer);

    let stats = SummaryStats::compute(&parsed.records, window_size);
    let records = enrich(parsed.records, window_size);

    log::info!(
        "Analyzed {}: {} records, {} skipped of {} non-blank lines (window {})",
        source,
        records.len(),
        parsed.diagnostics.len(),
        parsed.non_blank_lines,
        window_size
    );

    AnalysisResult {
        source,
        window_size,
        quote_normalization: None,
        records,
        stats,
        diagnostics: parsed.diagnostics,
        non_blank_lines: parsed.non_blank_lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::normalizer::PythonLiteralNormalizer;

    const EXAMPLE: &str = "{'epoch':1,'loss':1.0,'grad_norm':2.0}\n{'epoch':2,'loss':0.5,'grad_norm':1.0}\nmalformed line\n{'epoch':3,'loss':0.8,'grad_norm':1.5}";

    #[test]
    fn test_example_log() {
        let result = analyze("example.log", EXAMPLE, &AnalysisConfig::default());

        assert!(result.has_data());
        assert_eq!(result.stats.total_steps, 3);
        assert_eq!(result.records.len(), 3);
        assert_eq!(result.stats.global_min, 0.5);
        assert_eq!(result.stats.recent_min, 0.5);
        assert!((result.records[2].moving_avg_loss - 0.7666666666666667).abs() < 1e-9);
        assert_eq!(result.records[2].record.epoch, Some(3.0));
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].line_number, 3);
        assert_eq!(result.non_blank_lines, 4);
    }

    #[test]
    fn test_empty_file() {
        let result = analyze("empty.log", "", &AnalysisConfig::default());
        assert!(!result.has_data());
        assert!(result.records.is_empty());
        assert_eq!(result.stats, SummaryStats::default());
    }

    #[test]
    fn test_only_malformed_lines() {
        let result = analyze("bad.log", "nope\n{'loss': 1.0}\n", &AnalysisConfig::default());
        assert!(!result.has_data());
        assert_eq!(result.diagnostics.len(), 2);
        assert_eq!(result.stats.recent_mean, 0.0);
    }

    #[test]
    fn test_count_bound() {
        let result = analyze("example.log", EXAMPLE, &AnalysisConfig::default());
        assert_eq!(result.records.len(), result.stats.total_steps);
        assert!(result.stats.total_steps <= result.non_blank_lines);
    }

    #[test]
    fn test_idempotent() {
        let text: String = (0..100)
            .map(|i| format!("{{'epoch': {}, 'loss': {}, 'grad_norm': {}}}\n", i, 1.0 / (i as f64 + 1.0), (i % 9) as f64 * 0.37))
            .collect();
        let config = AnalysisConfig {
            window_size: NonZeroUsize::new(7).unwrap(),
            ..AnalysisConfig::default()
        };
        let first = analyze("run.log", &text, &config);
        let second = analyze("run.log", &text, &config);

        assert_eq!(first.stats.recent_mean.to_bits(), second.stats.recent_mean.to_bits());
        for (a, b) in first.records.iter().zip(&second.records) {
            assert_eq!(a.moving_avg_loss.to_bits(), b.moving_avg_loss.to_bits());
            assert_eq!(a.moving_avg_grad_norm.to_bits(), b.moving_avg_grad_norm.to_bits());
        }
        assert_eq!(first, second);
    }

    #[test]
    fn test_window_size_threads_through_stats_and_series() {
        let text = "{'loss':4.0,'grad_norm':4.0}\n{'loss':2.0,'grad_norm':2.0}\n{'loss':6.0,'grad_norm':0.0}";
        let config = AnalysisConfig {
            window_size: NonZeroUsize::new(2).unwrap(),
            ..AnalysisConfig::default()
        };
        let result = analyze("w2.log", text, &config);
        assert_eq!(result.window_size.get(), 2);
        assert_eq!(result.stats.recent_mean, 4.0);
        assert_eq!(result.stats.recent_min, 2.0);
        assert_eq!(result.records[2].moving_avg_loss, 4.0);
        assert_eq!(result.records[2].moving_avg_grad_norm, 1.0);
    }

    #[test]
    fn test_quote_normalization_is_selectable() {
        let text = "{'loss': 1.0, 'grad_norm': 2.0, 'note': \"it's\"}";
        let blanket = analyze("q.log", text, &AnalysisConfig::default());
        assert!(!blanket.has_data());

        let config = AnalysisConfig {
            quote_normalization: QuoteNormalization::PythonLiteral,
            ..AnalysisConfig::default()
        };
        let python = analyze("q.log", text, &config);
        assert!(python.has_data());
        assert_eq!(python.quote_normalization, Some(QuoteNormalization::PythonLiteral));
        assert_eq!(blanket.quote_normalization, Some(QuoteNormalization::Blanket));
    }

    #[test]
    fn test_analyze_with_custom_normalizer() {
        let result = analyze_with("custom", "{'loss': 1.0, 'grad_norm': None}", DEFAULT_WINDOW_SIZE, &PythonLiteralNormalizer);
        // None becomes null, which is not a number
        assert!(!result.has_data());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.quote_normalization, None);
    }
}
