//! # Right Panel - Record and Skipped Line Inspector
//!
//! This module renders the resizable right panel with two tabs:
//! - Records: every parsed record with its moving averages, in sequence order
//! - Skipped lines: every dropped line with its 1-based line number and reason
//!
//! Both tables use `egui_extras::TableBuilder`, which only lays out visible rows,
//! so logs with hundreds of thousands of steps scroll smoothly.

use crate::analyzer::AnalysisResult;
use crate::ui::AppState;
use crate::ui::app_state::InspectorTab;
use eframe::egui;
use egui::Color32;

/// Render the right inspector panel.
///
/// # Parameters
///
/// * `ctx` - egui context
/// * `state` - Mutable application state
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    let panel = egui::SidePanel::right("inspector_right")
        .resizable(true)
        .default_width(state.right_panel_width)
        .width_range(280.0..=900.0)
        .show(ctx, |ui| {
            ui.heading("Inspector");
            ui.separator();

            let Some(result) = state.result.clone() else {
                ui.centered_and_justified(|ui| {
                    ui.label("No log loaded.");
                });
                return;
            };

            let skipped = result.diagnostics.len();
            ui.horizontal(|ui| {
                ui.selectable_value(&mut state.inspector_tab, InspectorTab::Records, format!("Records ({})", result.records.len()));
                let skipped_label = egui::RichText::new(format!("Skipped lines ({})", skipped));
                let skipped_label = if skipped > 0 { skipped_label.color(Color32::YELLOW) } else { skipped_label };
                ui.selectable_value(&mut state.inspector_tab, InspectorTab::SkippedLines, skipped_label);
            });
            ui.add_space(4.0);

            match state.inspector_tab {
                InspectorTab::Records => render_records_table(ui, &result),
                InspectorTab::SkippedLines => render_skipped_table(ui, &result),
            }
        });

    state.right_panel_width = panel.response.rect.width();
}

fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{}", v),
        None => "-".to_string(),
    }
}

/// Records table: step, epoch, loss, grad norm and both moving averages.
///
/// The last column lists pass-through fields as `key=value` pairs.
fn render_records_table(ui: &mut egui::Ui, result: &AnalysisResult) {
    use egui_extras::{Column, TableBuilder};

    if result.records.is_empty() {
        ui.centered_and_justified(|ui| {
            ui.label("No valid records.");
        });
        return;
    }

    let row_height = ui.text_style_height(&egui::TextStyle::Body) * 1.3;
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .vscroll(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::initial(50.0).at_least(40.0)) // Step
        .column(Column::initial(60.0).at_least(40.0)) // Epoch
        .column(Column::initial(70.0).at_least(50.0)) // Loss
        .column(Column::initial(70.0).at_least(50.0)) // Grad norm
        .column(Column::initial(70.0).at_least(50.0)) // Avg loss
        .column(Column::initial(70.0).at_least(50.0)) // Avg grad norm
        .column(Column::remainder()) // Extra fields
        .header(row_height, |mut header| {
            header.col(|ui| {
                ui.strong("Step");
            });
            header.col(|ui| {
                ui.strong("Epoch");
            });
            header.col(|ui| {
                ui.strong("Loss");
            });
            header.col(|ui| {
                ui.strong("Grad");
            });
            header.col(|ui| {
                ui.strong("Avg loss");
            });
            header.col(|ui| {
                ui.strong("Avg grad");
            });
            header.col(|ui| {
                ui.strong("Other");
            });
        })
        .body(|body| {
            body.rows(row_height, result.records.len(), |mut row| {
                let index = row.index();
                let enriched = &result.records[index];
                let record = &enriched.record;
                let best = record.loss == result.stats.global_min;
                let loss_color = if best { Color32::from_rgb(0xdc, 0x26, 0x26) } else { Color32::GRAY };

                row.col(|ui| {
                    ui.label(format!("{}", index + 1));
                });
                row.col(|ui| {
                    ui.label(format_optional(record.epoch));
                });
                row.col(|ui| {
                    ui.colored_label(loss_color, format!("{:.4}", record.loss));
                });
                row.col(|ui| {
                    ui.label(format!("{:.4}", record.grad_norm));
                });
                row.col(|ui| {
                    ui.colored_label(Color32::from_rgb(0x25, 0x63, 0xeb), format!("{:.4}", enriched.moving_avg_loss));
                });
                row.col(|ui| {
                    ui.colored_label(Color32::from_rgb(0x16, 0xa3, 0x4a), format!("{:.4}", enriched.moving_avg_grad_norm));
                });
                row.col(|ui| {
                    let extra = record.extra.iter().map(|(k, v)| format!("{}={}", k, v)).collect::<Vec<_>>().join(" ");
                    ui.label(egui::RichText::new(extra).monospace().small());
                });
            });
        });
}

/// Skipped line table: line number, reason and the raw line.
fn render_skipped_table(ui: &mut egui::Ui, result: &AnalysisResult) {
    use egui_extras::{Column, TableBuilder};

    if result.diagnostics.is_empty() {
        ui.centered_and_justified(|ui| {
            ui.label("Every non-blank line parsed.");
        });
        return;
    }

    let row_height = ui.text_style_height(&egui::TextStyle::Body) * 1.3;
    TableBuilder::new(ui)
        .striped(true)
        .resizable(true)
        .vscroll(true)
        .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
        .column(Column::initial(50.0).at_least(40.0)) // Line
        .column(Column::initial(160.0).at_least(80.0)) // Reason
        .column(Column::remainder()) // Content
        .header(row_height, |mut header| {
            header.col(|ui| {
                ui.strong("Line");
            });
            header.col(|ui| {
                ui.strong("Reason");
            });
            header.col(|ui| {
                ui.strong("Content");
            });
        })
        .body(|body| {
            body.rows(row_height, result.diagnostics.len(), |mut row| {
                let diagnostic = &result.diagnostics[row.index()];
                row.col(|ui| {
                    ui.label(format!("{}", diagnostic.line_number));
                });
                row.col(|ui| {
                    ui.colored_label(Color32::YELLOW, &diagnostic.reason).on_hover_text(&diagnostic.reason);
                });
                row.col(|ui| {
                    ui.label(egui::RichText::new(&diagnostic.line).monospace());
                });
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_optional() {
        assert_eq!(format_optional(Some(1.5)), "1.5");
        assert_eq!(format_optional(Some(3.0)), "3");
        assert_eq!(format_optional(None), "-");
    }
}
