//! Parse training log text into an ordered sequence of `Record`s.
//!
//! Each non-blank line is expected to hold one JSON-shaped metrics object,
//! typically quoted the Python way:
//!
//! ```text
//! {'loss': 0.6931, 'grad_norm': 1.284, 'learning_rate': 2e-05, 'epoch': 0.01}
//! {'loss': 0.6512, 'grad_norm': 1.107, 'learning_rate': 2e-05, 'epoch': 0.02}
//! ```
//!
//! Lines that fail to parse are dropped with a warning and a `LineDiagnostic`;
//! they never abort the whole log.

use serde_json::Value;

use super::normalizer::LineNormalizer;
use super::types::{LineDiagnostic, LineParseError, Record};

/// Output of [`parse_log`].
#[derive(Debug, Clone, Default)]
pub struct ParsedLog {
    /// Valid records in input order.
    pub records: Vec<Record>,
    /// One entry per dropped non-blank line.
    pub diagnostics: Vec<LineDiagnostic>,
    /// Number of lines that were not empty or whitespace-only.
    pub non_blank_lines: usize,
}

/// Parse the full text of a log.
///
/// # Parameters
///
/// * `text` - Whole file contents
/// * `normalizer` - Strategy used to turn each line into strict JSON
///
/// # Returns
///
/// The parsed records (order preserved) together with diagnostics for every
/// skipped line. `records.len() + diagnostics.len() == non_blank_lines`.
pub fn parse_log(text: &str, normalizer: &dyn LineNormalizer) -> ParsedLog {
    let mut parsed = ParsedLog::default();
    // A UTF-8 byte order mark is not part of the first line
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    for (index, raw_line) in text.split('\n').enumerate() {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.trim().is_empty() {
            continue;
        }
        parsed.non_blank_lines += 1;

        match parse_record_line(line, normalizer) {
            Ok(record) => {
                log::trace!("Line {}: loss={} grad_norm={}", index + 1, record.loss, record.grad_norm);
                parsed.records.push(record);
            }
            Err(e) => {
                log::warn!("Skipping line {}: {} ({})", index + 1, e, line);
                parsed.diagnostics.push(LineDiagnostic {
                    line_number: index + 1,
                    line: line.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    parsed
}

/// Parse a single non-blank line into a `Record`.
pub fn parse_record_line(line: &str, normalizer: &dyn LineNormalizer) -> Result<Record, LineParseError> {
    let normalized = normalizer.normalize(line);
    let value: Value = serde_json::from_str(&normalized).map_err(LineParseError::Syntax)?;

    let kind = match &value {
        Value::Object(_) => None,
        Value::Null => Some("null"),
        Value::Bool(_) => Some("a boolean"),
        Value::Number(_) => Some("a number"),
        Value::String(_) => Some("a string"),
        Value::Array(_) => Some("an array"),
    };
    if let Some(kind) = kind {
        return Err(LineParseError::NotAnObject(kind));
    }

    serde_json::from_value(value).map_err(LineParseError::InvalidRecord)
}
