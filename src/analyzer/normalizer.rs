//! Line normalization: turn a single-quoted, JSON-shaped log line into strict JSON.
//!
//! Training scripts typically print their metric dicts with Python's `repr`,
//! which quotes keys with `'` instead of `"`. Two strategies are provided:
//! - [`BlanketQuoteNormalizer`]: swap every `'` for `"`. Fast, but corrupts
//!   values that contain an apostrophe.
//! - [`PythonLiteralNormalizer`]: a small scanner that understands quoted
//!   strings and the `True`/`False`/`None` literals.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Rewrites one raw log line into text that `serde_json` can parse.
pub trait LineNormalizer {
    fn normalize<'a>(&self, line: &'a str) -> Cow<'a, str>;
}

/// Replace every single-quote character with a double-quote character.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlanketQuoteNormalizer;

impl LineNormalizer for BlanketQuoteNormalizer {
    fn normalize<'a>(&self, line: &'a str) -> Cow<'a, str> {
        if line.contains('\'') {
            Cow::Owned(line.replace('\'', "\""))
        } else {
            Cow::Borrowed(line)
        }
    }
}

/// Convert a Python dict literal into JSON, keeping apostrophes inside values intact.
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonLiteralNormalizer;

#[derive(Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    SingleQuoted,
    DoubleQuoted,
}

impl LineNormalizer for PythonLiteralNormalizer {
    fn normalize<'a>(&self, line: &'a str) -> Cow<'a, str> {
        let mut out = String::with_capacity(line.len() + 8);
        let mut state = ScanState::Outside;
        let mut chars = line.chars().peekable();

        while let Some(c) = chars.next() {
            match state {
                ScanState::Outside => match c {
                    '\'' => {
                        out.push('"');
                        state = ScanState::SingleQuoted;
                    }
                    '"' => {
                        out.push('"');
                        state = ScanState::DoubleQuoted;
                    }
                    c if c.is_ascii_alphabetic() || c == '_' => {
                        let mut word = String::from(c);
                        while let Some(&next) = chars.peek() {
                            if next.is_ascii_alphanumeric() || next == '_' {
                                word.push(next);
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        out.push_str(match word.as_str() {
                            "True" => "true",
                            "False" => "false",
                            "None" => "null",
                            other => other,
                        });
                    }
                    c => out.push(c),
                },
                ScanState::SingleQuoted => match c {
                    '\\' => match chars.next() {
                        // \' is only meaningful in Python; JSON wants a bare apostrophe
                        Some('\'') => out.push('\''),
                        Some(escaped) => {
                            out.push('\\');
                            out.push(escaped);
                        }
                        None => out.push('\\'),
                    },
                    '"' => out.push_str("\\\""),
                    '\'' => {
                        out.push('"');
                        state = ScanState::Outside;
                    }
                    c => out.push(c),
                },
                ScanState::DoubleQuoted => match c {
                    '\\' => {
                        out.push('\\');
                        if let Some(escaped) = chars.next() {
                            out.push(escaped);
                        }
                    }
                    '"' => {
                        out.push('"');
                        state = ScanState::Outside;
                    }
                    c => out.push(c),
                },
            }
        }

        Cow::Owned(out)
    }
}

/// Selects the normalization strategy used by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuoteNormalization {
    #[default]
    Blanket,
    PythonLiteral,
}

impl QuoteNormalization {
    pub fn normalizer(self) -> &'static dyn LineNormalizer {
        match self {
            QuoteNormalization::Blanket => &BlanketQuoteNormalizer,
            QuoteNormalization::PythonLiteral => &PythonLiteralNormalizer,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuoteNormalization::Blanket => "Blanket ' → \"",
            QuoteNormalization::PythonLiteral => "Python literal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blanket_replaces_every_quote() {
        let line = "{'epoch': 3, 'loss': 0.512, 'grad_norm': 1.02}";
        assert_eq!(
            BlanketQuoteNormalizer.normalize(line),
            "{\"epoch\": 3, \"loss\": 0.512, \"grad_norm\": 1.02}"
        );
    }

    #[test]
    fn test_blanket_borrows_when_nothing_to_replace() {
        let line = "{\"loss\": 1.0}";
        assert!(matches!(BlanketQuoteNormalizer.normalize(line), Cow::Borrowed(_)));
    }

    #[test]
    fn test_blanket_corrupts_apostrophe_in_value() {
        let line = "{'loss': 1.0, 'grad_norm': 2.0, 'note': \"it's fine\"}";
        let normalized = BlanketQuoteNormalizer.normalize(line);
        assert!(serde_json::from_str::<serde_json::Value>(&normalized).is_err());
    }

    #[test]
    fn test_python_literal_keeps_apostrophe_in_double_quoted_value() {
        let line = "{'loss': 1.0, 'grad_norm': 2.0, 'note': \"it's fine\"}";
        let normalized = PythonLiteralNormalizer.normalize(line);
        let value: serde_json::Value = serde_json::from_str(&normalized).unwrap();
        assert_eq!(value["note"], "it's fine");
    }

    #[test]
    fn test_python_literal_escapes() {
        let line = r#"{'msg': 'say "hi"', 'other': 'don\'t'}"#;
        let normalized = PythonLiteralNormalizer.normalize(line);
        let value: serde_json::Value = serde_json::from_str(&normalized).unwrap();
        assert_eq!(value["msg"], "say \"hi\"");
        assert_eq!(value["other"], "don't");
    }

    #[test]
    fn test_python_literal_keywords() {
        let line = "{'done': True, 'skipped': False, 'extra': None, 'label': 'None'}";
        let normalized = PythonLiteralNormalizer.normalize(line);
        let value: serde_json::Value = serde_json::from_str(&normalized).unwrap();
        assert_eq!(value["done"], true);
        assert_eq!(value["skipped"], false);
        assert!(value["extra"].is_null());
        assert_eq!(value["label"], "None");
    }

    #[test]
    fn test_python_literal_leaves_numbers_alone() {
        let line = "{'loss': 1.5e-3, 'grad_norm': -2}";
        let normalized = PythonLiteralNormalizer.normalize(line);
        assert_eq!(normalized, "{\"loss\": 1.5e-3, \"grad_norm\": -2}");
    }
}
