//! Type definitions specific to the analyzer module.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One successfully parsed training measurement.
///
/// `loss` and `grad_norm` are required; every other key of the source line is
/// kept in `extra` so the chart tooltip (and anything downstream) can still
/// show it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// X-axis coordinate. Lines without an epoch still count as records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epoch: Option<f64>,
    pub loss: f64,
    pub grad_norm: f64,
    /// Pass-through fields (learning rate, step, ...), in source order.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A record with its trailing moving averages attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: Record,
    /// Mean `loss` over the trailing window ending at this record.
    pub moving_avg_loss: f64,
    /// Mean `grad_norm` over the same window.
    pub moving_avg_grad_norm: f64,
}

/// Aggregate metrics over a whole run.
///
/// An empty run yields the `Default` value: every numeric field is `0.0` and
/// `total_steps` is 0.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    /// Mean loss over the last `min(window, total_steps)` records.
    pub recent_mean: f64,
    /// Minimum loss over the same trailing window.
    pub recent_min: f64,
    /// Minimum loss over the whole run.
    pub global_min: f64,
    pub total_steps: usize,
}

/// Why a non-blank line was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiagnostic {
    /// 1-based physical line number in the source text.
    pub line_number: usize,
    pub line: String,
    pub reason: String,
}

/// Error for a single log line that could not become a [`Record`].
#[derive(Debug)]
pub enum LineParseError {
    /// The normalized text is not valid JSON.
    Syntax(serde_json::Error),
    /// Valid JSON, but not an object (e.g. a bare number or an array).
    NotAnObject(&'static str),
    /// An object missing `loss`/`grad_norm`, or with non-numeric values.
    InvalidRecord(serde_json::Error),
}

impl std::fmt::Display for LineParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineParseError::Syntax(e) => write!(f, "Invalid JSON: {}", e),
            LineParseError::NotAnObject(kind) => write!(f, "Expected an object, found {}", kind),
            LineParseError::InvalidRecord(e) => write!(f, "Invalid record: {}", e),
        }
    }
}

impl std::error::Error for LineParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LineParseError::Syntax(e) | LineParseError::InvalidRecord(e) => Some(e),
            LineParseError::NotAnObject(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enriched_record_serializes_flat() {
        let mut extra = Map::new();
        extra.insert("learning_rate".to_string(), Value::from(0.001));
        let enriched = EnrichedRecord {
            record: Record {
                epoch: Some(1.0),
                loss: 0.5,
                grad_norm: 2.0,
                extra,
            },
            moving_avg_loss: 0.75,
            moving_avg_grad_norm: 1.5,
        };

        let json = serde_json::to_value(&enriched).unwrap();
        assert_eq!(json["epoch"], 1.0);
        assert_eq!(json["loss"], 0.5);
        assert_eq!(json["grad_norm"], 2.0);
        assert_eq!(json["learning_rate"], 0.001);
        assert_eq!(json["movingAvgLoss"], 0.75);
        assert_eq!(json["movingAvgGradNorm"], 1.5);
    }

    #[test]
    fn test_missing_epoch_is_omitted() {
        let record = Record {
            epoch: None,
            loss: 0.5,
            grad_norm: 2.0,
            extra: Map::new(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("epoch").is_none());
        assert_eq!(json["loss"], 0.5);

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_summary_stats_keys() {
        let stats = SummaryStats {
            recent_mean: 0.5,
            recent_min: 0.25,
            global_min: 0.125,
            total_steps: 4,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["recentMean"], 0.5);
        assert_eq!(json["recentMin"], 0.25);
        assert_eq!(json["globalMin"], 0.125);
        assert_eq!(json["totalSteps"], 4);
    }

    #[test]
    fn test_default_stats_are_zero_sentinel() {
        let stats = SummaryStats::default();
        assert_eq!(stats.recent_mean, 0.0);
        assert_eq!(stats.recent_min, 0.0);
        assert_eq!(stats.global_min, 0.0);
        assert_eq!(stats.total_steps, 0);
    }
}
