//! # Top Panel - Run Summary and Controls
//!
//! This module renders the fixed-height top panel displaying:
//! - Column 1: Log file selection and run information
//! - Column 2: Summary statistics (recent mean/min, global min, total steps)
//! - Column 3: Smoothing controls (window size, quote normalization, visible series)
//!
//! Changing a smoothing control re-runs the pipeline on the already loaded
//! text; the chart updates when the new result arrives.

use eframe::egui;
use std::num::NonZeroUsize;

use crate::analyzer::QuoteNormalization;
use crate::analyzer::pipeline::MAX_WINDOW_SIZE;
use crate::ui::AppState;

/// Render the top panel with run info, statistics and controls.
///
/// # Parameters
///
/// * `ctx` - egui context
/// * `state` - Mutable application state for reading results and updating controls
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    egui::TopBottomPanel::top("top_metrics").exact_height(150.0).show(ctx, |ui| {
        ui.columns(3, |cols| {
            cols[0].vertical(|ui| {
                render_run_info(ui, state);
            });

            cols[1].vertical(|ui| {
                render_statistics(ui, state);
            });

            cols[2].vertical(|ui| {
                render_controls(ui, state);
            });
        });
    });
}

/// Render the file selection column.
fn render_run_info(ui: &mut egui::Ui, state: &mut AppState) {
    ui.heading("Training Log");
    ui.separator();

    ui.horizontal(|ui| {
        if ui.button("Open log…").clicked() {
            state.open_file_picker();
        }
        if state.pending_run.is_some() {
            ui.spinner();
        }
    });

    let source = state.result.as_ref().map(|r| r.source.clone()).unwrap_or_else(|| "-".into());
    ui.horizontal(|ui| {
        ui.label("File:");
        ui.label(egui::RichText::new(source).strong());
    });

    let loaded_at = state
        .loaded_at
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());
    ui.horizontal(|ui| {
        ui.label("Loaded at:");
        ui.label(egui::RichText::new(loaded_at).monospace().strong());
    });

    if let Some(result) = &state.result {
        ui.horizontal(|ui| {
            ui.label("Lines:");
            ui.label(egui::RichText::new(result.non_blank_lines.to_string()).strong());
            ui.label("  Skipped:");
            let skipped = result.diagnostics.len();
            let color = if skipped > 0 { egui::Color32::YELLOW } else { ui.visuals().text_color() };
            ui.label(egui::RichText::new(skipped.to_string()).strong().color(color));
        });
    }
}

/// Render the statistics column.
///
/// Shows the zero sentinel before the first load and for logs without data.
fn render_statistics(ui: &mut egui::Ui, state: &AppState) {
    let stats = state.result.as_ref().map(|r| r.stats).unwrap_or_default();
    let window = state.result.as_ref().map(|r| r.window_size.get()).unwrap_or(state.analysis_config.window_size.get());

    ui.heading("Statistics");
    ui.separator();
    egui::Grid::new("summary_stats").num_columns(2).spacing([12.0, 4.0]).show(ui, |ui| {
        ui.label(format!("Recent Average Loss (last {}):", window));
        ui.label(egui::RichText::new(format!("{:.4}", stats.recent_mean)).monospace().strong());
        ui.end_row();

        ui.label("Recent Best Loss:");
        ui.label(egui::RichText::new(format!("{:.4}", stats.recent_min)).monospace().strong());
        ui.end_row();

        ui.label("Global Best Loss:");
        ui.label(egui::RichText::new(format!("{:.4}", stats.global_min)).monospace().strong());
        ui.end_row();

        ui.label("Total Steps:");
        ui.label(egui::RichText::new(stats.total_steps.to_string()).monospace().strong());
        ui.end_row();
    });
}

/// Render the smoothing controls column.
fn render_controls(ui: &mut egui::Ui, state: &mut AppState) {
    ui.heading("Smoothing");
    ui.separator();

    let mut changed = false;

    let mut window = state.analysis_config.window_size.get();
    ui.horizontal(|ui| {
        ui.label("Window size:");
        let response = ui.add(egui::DragValue::new(&mut window).range(1..=MAX_WINDOW_SIZE).speed(0.25));
        if response.changed() {
            if let Some(size) = NonZeroUsize::new(window) {
                state.analysis_config.window_size = size;
                changed = true;
            }
        }
    });

    let mut normalization = state.analysis_config.quote_normalization;
    egui::ComboBox::from_label("Quotes")
        .selected_text(normalization.label())
        .show_ui(ui, |ui| {
            for option in [QuoteNormalization::Blanket, QuoteNormalization::PythonLiteral] {
                ui.selectable_value(&mut normalization, option, option.label());
            }
        });
    if normalization != state.analysis_config.quote_normalization {
        state.analysis_config.quote_normalization = normalization;
        changed = true;
    }

    ui.horizontal_wrapped(|ui| {
        ui.checkbox(&mut state.series.raw_loss, "Loss");
        ui.checkbox(&mut state.series.moving_avg_loss, "Avg loss");
        ui.checkbox(&mut state.series.moving_avg_grad_norm, "Avg grad norm");
        ui.checkbox(&mut state.series.global_min, "Best");
    });

    if changed {
        state.request_reanalyze();
    }
}
