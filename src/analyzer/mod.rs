//! Analyzer module: training log parsing and rolling statistics.
//!
//! Provides functionality for:
//! - Normalizing Python-style metric lines into JSON (`normalizer`)
//! - Parsing a whole log into ordered records (`log_parser`)
//! - Run-level summary statistics (`stats`)
//! - Trailing moving averages (`rolling`)
//! - Composing the above into one immutable result (`pipeline`)
//!
//! The analyzer task owns ingestion runs and talks to the UI through the same
//! channel pair the UI module defines.

pub mod log_loader;
pub mod log_parser;
pub mod normalizer;
pub mod pipeline;
pub mod rolling;
pub mod stats;
pub mod task;
pub mod types;

pub use normalizer::QuoteNormalization;
pub use pipeline::{AnalysisConfig, AnalysisResult};
pub use task::analyzer_task;
pub use types::EnrichedRecord;
