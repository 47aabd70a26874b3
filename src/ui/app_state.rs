//! # Application State Management
//!
//! This module implements the central `AppState` struct which manages all UI state
//! and coordinates the rendering of all UI components. It implements the `eframe::App`
//! trait to integrate with the egui application framework.
//!
//! ## Responsibilities
//!
//! - Holds the latest `AnalysisResult` received from the analyzer task
//! - Sends load / re-analysis commands via `ui_command_tx`
//! - Drops results of runs that were superseded by a newer request
//! - Coordinates rendering of all UI panels (top, right, chart)
//! - Persists user settings (last directory, visible series) across sessions
//!
//! ## State Management
//!
//! The analyzer never mutates UI state. Each finished run hands over a complete,
//! immutable result behind an `Arc`; the UI only swaps which result it points to.

use chrono::{DateTime, Local};
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::{UICommand, UIRefreshState, chart, right_panel, top_panel};
use crate::analyzer::{AnalysisConfig, AnalysisResult};

/// Currently selected tab in the right panel inspector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InspectorTab {
    #[default]
    Records,
    SkippedLines,
}

/// Which chart series are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesVisibility {
    pub raw_loss: bool,
    pub moving_avg_loss: bool,
    pub moving_avg_grad_norm: bool,
    pub global_min: bool,
}

impl Default for SeriesVisibility {
    fn default() -> Self {
        Self {
            raw_loss: true,
            moving_avg_loss: true,
            moving_avg_grad_norm: true,
            global_min: true,
        }
    }
}

/// Central application state for the viewer.
pub struct AppState {
    /// Optional alert message to display in a modal dialog.
    pub alert: Option<String>,
    /// Receiver for results from the analyzer task.
    pub ui_refresh_rx: crate::UIRefreshQueueReceiver,
    /// Sender for commands to the analyzer task.
    pub ui_command_tx: crate::UICommandQueueSender,

    /// Configuration used for the next load or re-analysis.
    pub analysis_config: AnalysisConfig,
    /// Id of the newest run requested; older results are discarded.
    pub latest_run_id: u64,
    /// Run id we are still waiting for, if any.
    pub pending_run: Option<u64>,
    /// Result of the newest completed run.
    pub result: Option<Arc<AnalysisResult>>,
    /// Local time the current result arrived.
    pub loaded_at: Option<DateTime<Local>>,

    /// Last directory used for the log file picker.
    pub last_open_dir: Option<String>,
    pub inspector_tab: InspectorTab,
    pub series: SeriesVisibility,
    /// Width of the right inspector panel in pixels.
    pub right_panel_width: f32,
}

/// Settings persisted across application sessions.
#[derive(Default, Serialize, Deserialize)]
struct PersistedSettings {
    last_open_dir: Option<String>,
    series: Option<SeriesVisibility>,
    right_panel_width: Option<f32>,
}

impl AppState {
    /// Create a new AppState, loading persisted settings if available.
    ///
    /// # Parameters
    ///
    /// * `rx` - Receiver for analyzer results
    /// * `tx` - Sender for commands to the analyzer
    /// * `storage` - Optional persistent storage for loading saved settings
    /// * `analysis_config` - Initial window size and quote normalization
    pub fn new(
        rx: crate::UIRefreshQueueReceiver,
        tx: crate::UICommandQueueSender,
        storage: Option<&dyn eframe::Storage>,
        analysis_config: AnalysisConfig,
    ) -> Self {
        let persisted: PersistedSettings = storage.and_then(|s| eframe::get_value(s, "app_settings")).unwrap_or_default();

        Self {
            alert: None,
            ui_refresh_rx: rx,
            ui_command_tx: tx,
            analysis_config,
            latest_run_id: 0,
            pending_run: None,
            result: None,
            loaded_at: None,
            last_open_dir: persisted.last_open_dir,
            inspector_tab: InspectorTab::default(),
            series: persisted.series.unwrap_or_default(),
            right_panel_width: persisted.right_panel_width.unwrap_or(420.0),
        }
    }

    /// Open a native file picker and request analysis of the chosen log.
    ///
    /// Starts in the last used directory if available. Cancelling the picker
    /// leaves the current result untouched.
    pub fn open_file_picker(&mut self) {
        let mut dialog = rfd::FileDialog::new()
            .add_filter("Log files", &["log", "txt", "jsonl"])
            .add_filter("All files", &["*"]);
        if let Some(dir) = &self.last_open_dir {
            dialog = dialog.set_directory(dir);
        }
        let Some(file) = dialog.pick_file() else {
            return;
        };
        if let Some(parent) = file.parent() {
            self.last_open_dir = Some(parent.to_string_lossy().to_string());
        }
        self.request_load(file);
    }

    /// Ask the analyzer to load and analyze `path` as a new run.
    pub fn request_load(&mut self, path: PathBuf) {
        let run_id = self.next_run_id();
        let command = UICommand::LoadFile {
            run_id,
            path,
            config: self.analysis_config,
        };
        self.send_command(run_id, command);
    }

    /// Re-run the pipeline on the current log with `analysis_config`.
    ///
    /// Does nothing until a log has been loaded.
    pub fn request_reanalyze(&mut self) {
        if self.result.is_none() {
            return;
        }
        let run_id = self.next_run_id();
        let command = UICommand::Reanalyze {
            run_id,
            config: self.analysis_config,
        };
        self.send_command(run_id, command);
    }

    fn next_run_id(&mut self) -> u64 {
        self.latest_run_id += 1;
        self.latest_run_id
    }

    fn send_command(&mut self, run_id: u64, command: UICommand) {
        if self.ui_command_tx.try_send(command).is_ok() {
            self.pending_run = Some(run_id);
        } else {
            log::warn!("Analyzer command queue full, dropping run {}", run_id);
            self.alert = Some("The analyzer is busy, please try again.".to_string());
        }
    }

    /// Apply one message from the analyzer (last writer wins).
    pub fn apply_refresh(&mut self, msg: UIRefreshState) {
        match msg {
            UIRefreshState::AnalysisReady { run_id, result } => {
                if run_id < self.latest_run_id {
                    log::debug!("Discarding result of superseded run {} (latest {})", run_id, self.latest_run_id);
                    return;
                }
                if !result.has_data() {
                    log::warn!("{}: no valid records", result.source);
                }
                self.result = Some(result);
                self.loaded_at = Some(Local::now());
                self.pending_run = None;
            }
            UIRefreshState::LoadFailed { run_id, message } => {
                if run_id < self.latest_run_id {
                    log::debug!("Discarding failure of superseded run {}", run_id);
                    return;
                }
                self.alert = Some(message);
                self.pending_run = None;
            }
        }
    }
}

impl eframe::App for AppState {
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedSettings {
            last_open_dir: self.last_open_dir.clone(),
            series: Some(self.series),
            right_panel_width: Some(self.right_panel_width),
        };
        eframe::set_value(storage, "app_settings", &settings);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Repaint periodically so analyzer results show up without input
        ctx.request_repaint_after(Duration::from_millis(50));

        while let Ok(msg) = self.ui_refresh_rx.try_receive() {
            self.apply_refresh(msg);
        }

        if let Some(alert_msg) = self.alert.clone() {
            egui::Window::new("Alert")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(20.0);
                        ui.label(alert_msg);
                        ui.add_space(20.0);

                        if ui.button("OK").clicked() {
                            self.alert = None;
                        }
                        ui.add_space(10.0);
                    });
                });
        }

        // Panels first, the chart fills the remaining space
        top_panel::render(ctx, self);
        right_panel::render(ctx, self);
        chart::render(ctx, self);
    }
}
