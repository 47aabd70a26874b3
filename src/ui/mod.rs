// UI module for the Training Log Visualizer
//
// This module organizes the UI into separate components:
// - `top_panel`: File selection, summary statistics and smoothing controls
// - `chart`: Central loss / gradient-norm chart
// - `right_panel`: Record table and skipped-line inspector
// - `app_state`: Application state management and main update loop

pub mod app_state;
pub mod chart;
pub mod right_panel;
pub mod top_panel;

use std::path::PathBuf;
use std::sync::Arc;

use crate::analyzer::{AnalysisConfig, AnalysisResult};

pub use app_state::AppState;

/// Messages from the analyzer task to the UI.
#[derive(Debug)]
pub enum UIRefreshState {
    /// A pipeline run finished.
    AnalysisReady { run_id: u64, result: Arc<AnalysisResult> },
    /// The selected file could not be read.
    LoadFailed { run_id: u64, message: String },
}

/// Commands from the UI to the analyzer task.
#[derive(Debug)]
pub enum UICommand {
    /// Read and analyze a log file.
    LoadFile { run_id: u64, path: PathBuf, config: AnalysisConfig },
    /// Re-run the pipeline on the last loaded text with a new configuration.
    Reanalyze { run_id: u64, config: AnalysisConfig },
}
