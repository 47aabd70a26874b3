//! # Central Chart
//!
//! This module renders the loss / gradient-norm chart for the current result:
//! - Raw loss (faint) and moving-average loss on the left axis
//! - Moving-average gradient norm on the right axis
//! - A dashed reference line at the global best loss
//! - A tooltip with every field of the record nearest to the pointer
//!
//! ## Coordinate Mapping
//!
//! The x coordinate is the record's epoch. If any record lacks an epoch, the
//! whole chart falls back to the 1-based step index so points are never
//! mixed between the two scales. Each axis is scaled independently to the
//! finite values of the series it carries.

use eframe::egui;
use egui::Color32;

use crate::analyzer::{AnalysisResult, EnrichedRecord};
use crate::ui::AppState;
use crate::ui::app_state::SeriesVisibility;

// Premultiplied: #94a3b8 at 30% and #16a34a at 80%
const RAW_LOSS_COLOR: Color32 = Color32::from_rgba_premultiplied(45, 49, 56, 77);
const AVG_LOSS_COLOR: Color32 = Color32::from_rgb(0x25, 0x63, 0xeb);
const AVG_GRAD_NORM_COLOR: Color32 = Color32::from_rgba_premultiplied(18, 130, 59, 204);
const GLOBAL_MIN_COLOR: Color32 = Color32::from_rgb(0xdc, 0x26, 0x26);

const LEFT_MARGIN: f32 = 70.0;
const RIGHT_MARGIN: f32 = 70.0;
const TOP_MARGIN: f32 = 24.0;
const BOTTOM_MARGIN: f32 = 40.0;
const TICK_COUNT: usize = 5;

/// Closed value interval mapped onto one chart axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    /// Smallest range covering every finite value, or `None` if there is none.
    ///
    /// A single distinct value is widened so the line sits mid-axis.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let mut finite = values.into_iter().filter(|v| v.is_finite());
        let first = finite.next()?;
        let (min, max) = finite.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));

        if max > min {
            Some(Self { min, max })
        } else {
            let pad = if min == 0.0 { 0.5 } else { min.abs() * 0.05 };
            Some(Self {
                min: min - pad,
                max: max + pad,
            })
        }
    }

    /// Grow the range by `fraction` of its span on both ends.
    pub fn padded(self, fraction: f64) -> Self {
        let pad = (self.max - self.min) * fraction;
        Self {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    /// Position of `value` inside the range, 0.0 at `min` and 1.0 at `max`.
    pub fn fraction(&self, value: f64) -> f64 {
        (value - self.min) / (self.max - self.min)
    }

    pub fn value_at(&self, fraction: f64) -> f64 {
        self.min + fraction * (self.max - self.min)
    }
}

/// Which quantity the horizontal axis shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XAxis {
    Epoch,
    Step,
}

impl XAxis {
    pub fn for_records(records: &[EnrichedRecord]) -> Self {
        if !records.is_empty() && records.iter().all(|r| r.record.epoch.is_some()) {
            XAxis::Epoch
        } else {
            XAxis::Step
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            XAxis::Epoch => "Epoch",
            XAxis::Step => "Step",
        }
    }

    /// X coordinate of every record, in sequence order.
    pub fn values(self, records: &[EnrichedRecord]) -> Vec<f64> {
        records
            .iter()
            .enumerate()
            .map(|(i, r)| match self {
                XAxis::Epoch => r.record.epoch.unwrap_or(i as f64),
                XAxis::Step => (i + 1) as f64,
            })
            .collect()
    }
}

/// Index of the x value closest to `target`; the first one wins on ties.
pub fn nearest_index(xs: &[f64], target: f64) -> Option<usize> {
    xs.iter()
        .enumerate()
        .filter(|(_, x)| x.is_finite())
        .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))
        .map(|(i, _)| i)
}

/// Compact tick label: fixed point for ordinary magnitudes, scientific otherwise.
pub fn format_tick(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(0.01..10_000.0).contains(&magnitude) {
        format!("{:.2e}", value)
    } else {
        format!("{:.3}", value)
    }
}

/// Scales for one frame of the chart.
struct ChartLayout {
    x_axis: XAxis,
    xs: Vec<f64>,
    x_range: AxisRange,
    loss_range: AxisRange,
    grad_range: AxisRange,
}

impl ChartLayout {
    fn new(result: &AnalysisResult, series: SeriesVisibility) -> Option<Self> {
        let records = &result.records;
        let x_axis = XAxis::for_records(records);
        let xs = x_axis.values(records);
        let x_range = AxisRange::from_values(xs.iter().copied())?;

        let mut loss_values: Vec<f64> = Vec::with_capacity(records.len() * 2 + 1);
        if series.raw_loss {
            loss_values.extend(records.iter().map(|r| r.record.loss));
        }
        if series.moving_avg_loss || loss_values.is_empty() {
            loss_values.extend(records.iter().map(|r| r.moving_avg_loss));
        }
        if series.global_min {
            loss_values.push(result.stats.global_min);
        }
        let loss_range = AxisRange::from_values(loss_values)?.padded(0.05);
        let grad_range = AxisRange::from_values(records.iter().map(|r| r.moving_avg_grad_norm))?.padded(0.05);

        Some(Self {
            x_axis,
            xs,
            x_range,
            loss_range,
            grad_range,
        })
    }

    fn to_screen(&self, plot: egui::Rect, x: f64, y: f64, y_range: &AxisRange) -> egui::Pos2 {
        let fx = self.x_range.fraction(x) as f32;
        let fy = y_range.fraction(y) as f32;
        egui::pos2(plot.left() + fx * plot.width(), plot.bottom() - fy * plot.height())
    }
}

/// Render the central chart panel.
///
/// # Parameters
///
/// * `ctx` - egui context for rendering
/// * `state` - Application state holding the current result
pub fn render(ctx: &egui::Context, state: &mut AppState) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.heading("Loss & Gradient Norm");
        ui.separator();

        let Some(result) = state.result.clone() else {
            ui.centered_and_justified(|ui| {
                ui.label("Open a training log to begin.");
            });
            return;
        };

        if !result.has_data() {
            ui.centered_and_justified(|ui| {
                ui.label(egui::RichText::new(format!("No data: {} contains no valid records.", result.source)).color(Color32::YELLOW));
            });
            return;
        }

        let Some(layout) = ChartLayout::new(&result, state.series) else {
            return;
        };

        let rect = ui.available_rect_before_wrap();
        let plot = egui::Rect::from_min_max(
            egui::pos2(rect.left() + LEFT_MARGIN, rect.top() + TOP_MARGIN),
            egui::pos2(rect.right() - RIGHT_MARGIN, rect.bottom() - BOTTOM_MARGIN),
        );
        if plot.width() <= 0.0 || plot.height() <= 0.0 {
            return;
        }

        let response = ui.interact(rect, egui::Id::new("chart_canvas"), egui::Sense::hover());
        let painter = ui.painter_at(rect);

        painter.rect_filled(rect, 4.0, ui.visuals().extreme_bg_color);
        draw_grid(&painter, plot, &layout, ui.visuals().weak_text_color());
        draw_series(&painter, plot, &layout, &result, state.series);

        // Tooltip for the record nearest to the pointer
        let Some(pointer) = response.hover_pos() else {
            return;
        };
        if !plot.contains(pointer) {
            return;
        }
        let target = layout.x_range.value_at(((pointer.x - plot.left()) / plot.width()) as f64);
        let Some(index) = nearest_index(&layout.xs, target) else {
            return;
        };

        let enriched = &result.records[index];
        let x = layout.xs[index];
        let top = layout.to_screen(plot, x, layout.loss_range.max, &layout.loss_range);
        let bottom = layout.to_screen(plot, x, layout.loss_range.min, &layout.loss_range);
        painter.line_segment([top, bottom], egui::Stroke::new(1.0, ui.visuals().weak_text_color()));
        if state.series.moving_avg_loss {
            painter.circle_filled(layout.to_screen(plot, x, enriched.moving_avg_loss, &layout.loss_range), 3.5, AVG_LOSS_COLOR);
        }
        if state.series.moving_avg_grad_norm {
            painter.circle_filled(layout.to_screen(plot, x, enriched.moving_avg_grad_norm, &layout.grad_range), 3.5, AVG_GRAD_NORM_COLOR);
        }

        response.on_hover_ui_at_pointer(|ui| {
            render_tooltip(ui, index, enriched);
        });
    });
}

/// Draw horizontal/vertical grid lines with tick labels on all three axes.
fn draw_grid(painter: &egui::Painter, plot: egui::Rect, layout: &ChartLayout, text_color: Color32) {
    let grid_stroke = egui::Stroke::new(1.0, Color32::from_gray(60));
    let font = egui::FontId::monospace(11.0);

    for i in 0..=TICK_COUNT {
        let t = i as f32 / TICK_COUNT as f32;

        // Horizontal line plus loss (left) and grad norm (right) labels
        let y = plot.bottom() - t * plot.height();
        painter.line_segment([egui::pos2(plot.left(), y), egui::pos2(plot.right(), y)], grid_stroke);
        painter.text(
            egui::pos2(plot.left() - 6.0, y),
            egui::Align2::RIGHT_CENTER,
            format_tick(layout.loss_range.value_at(t as f64)),
            font.clone(),
            AVG_LOSS_COLOR,
        );
        painter.text(
            egui::pos2(plot.right() + 6.0, y),
            egui::Align2::LEFT_CENTER,
            format_tick(layout.grad_range.value_at(t as f64)),
            font.clone(),
            AVG_GRAD_NORM_COLOR,
        );

        // Vertical line plus x label
        let x = plot.left() + t * plot.width();
        painter.line_segment([egui::pos2(x, plot.top()), egui::pos2(x, plot.bottom())], grid_stroke);
        painter.text(
            egui::pos2(x, plot.bottom() + 4.0),
            egui::Align2::CENTER_TOP,
            format_tick(layout.x_range.value_at(t as f64)),
            font.clone(),
            text_color,
        );
    }

    painter.text(egui::pos2(plot.left(), plot.top() - 6.0), egui::Align2::RIGHT_BOTTOM, "Loss", font.clone(), AVG_LOSS_COLOR);
    painter.text(
        egui::pos2(plot.right(), plot.top() - 6.0),
        egui::Align2::LEFT_BOTTOM,
        "Gradient Norm",
        font.clone(),
        AVG_GRAD_NORM_COLOR,
    );
    painter.text(
        egui::pos2(plot.center().x, plot.bottom() + 22.0),
        egui::Align2::CENTER_TOP,
        layout.x_axis.label(),
        font,
        text_color,
    );
}

/// Draw the enabled series; back to front: raw loss, best-loss line, averages.
fn draw_series(painter: &egui::Painter, plot: egui::Rect, layout: &ChartLayout, result: &AnalysisResult, series: SeriesVisibility) {
    let records = &result.records;

    if series.raw_loss {
        let points = series_points(plot, layout, records, |r| r.record.loss, &layout.loss_range);
        draw_polyline(painter, points, egui::Stroke::new(1.0, RAW_LOSS_COLOR));
    }

    if series.global_min {
        let y = plot.bottom() - layout.loss_range.fraction(result.stats.global_min) as f32 * plot.height();
        painter.extend(egui::Shape::dashed_line(
            &[egui::pos2(plot.left(), y), egui::pos2(plot.right(), y)],
            egui::Stroke::new(1.0, GLOBAL_MIN_COLOR),
            6.0,
            4.0,
        ));
    }

    if series.moving_avg_loss {
        let points = series_points(plot, layout, records, |r| r.moving_avg_loss, &layout.loss_range);
        draw_polyline(painter, points, egui::Stroke::new(2.0, AVG_LOSS_COLOR));
    }

    if series.moving_avg_grad_norm {
        let points = series_points(plot, layout, records, |r| r.moving_avg_grad_norm, &layout.grad_range);
        draw_polyline(painter, points, egui::Stroke::new(1.5, AVG_GRAD_NORM_COLOR));
    }
}

fn series_points(
    plot: egui::Rect,
    layout: &ChartLayout,
    records: &[EnrichedRecord],
    value: impl Fn(&EnrichedRecord) -> f64,
    y_range: &AxisRange,
) -> Vec<egui::Pos2> {
    records
        .iter()
        .zip(&layout.xs)
        .map(|(r, x)| (*x, value(r)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| layout.to_screen(plot, x, y, y_range))
        .collect()
}

fn draw_polyline(painter: &egui::Painter, points: Vec<egui::Pos2>, stroke: egui::Stroke) {
    match points.len() {
        0 => {}
        1 => {
            painter.circle_filled(points[0], 2.5, stroke.color);
        }
        _ => {
            painter.add(egui::Shape::line(points, stroke));
        }
    }
}

fn render_tooltip(ui: &mut egui::Ui, index: usize, enriched: &EnrichedRecord) {
    let record = &enriched.record;
    egui::Grid::new("chart_tooltip").num_columns(2).show(ui, |ui| {
        ui.label("Step");
        ui.label(egui::RichText::new((index + 1).to_string()).strong());
        ui.end_row();

        if let Some(epoch) = record.epoch {
            ui.label("Epoch");
            ui.label(egui::RichText::new(format!("{}", epoch)).strong());
            ui.end_row();
        }

        ui.label("Loss");
        ui.label(egui::RichText::new(format!("{:.4}", record.loss)).strong());
        ui.end_row();

        ui.label("Grad norm");
        ui.label(egui::RichText::new(format!("{:.4}", record.grad_norm)).strong());
        ui.end_row();

        ui.label(egui::RichText::new("Avg loss").color(AVG_LOSS_COLOR));
        ui.label(egui::RichText::new(format!("{:.4}", enriched.moving_avg_loss)).strong());
        ui.end_row();

        ui.label(egui::RichText::new("Avg grad norm").color(AVG_GRAD_NORM_COLOR));
        ui.label(egui::RichText::new(format!("{:.4}", enriched.moving_avg_grad_norm)).strong());
        ui.end_row();

        for (key, value) in &record.extra {
            ui.label(key);
            ui.label(value.to_string());
            ui.end_row();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::types::Record;
    use serde_json::Map;

    fn enriched(epoch: Option<f64>, loss: f64) -> EnrichedRecord {
        EnrichedRecord {
            record: Record {
                epoch,
                loss,
                grad_norm: 1.0,
                extra: Map::new(),
            },
            moving_avg_loss: loss,
            moving_avg_grad_norm: 1.0,
        }
    }

    #[test]
    fn test_axis_range_spans_values() {
        let range = AxisRange::from_values([3.0, -1.0, 2.0]).unwrap();
        assert_eq!(range, AxisRange { min: -1.0, max: 3.0 });
        assert_eq!(range.fraction(1.0), 0.5);
        assert_eq!(range.value_at(0.25), 0.0);
    }

    #[test]
    fn test_axis_range_ignores_non_finite() {
        let range = AxisRange::from_values([f64::NAN, 1.0, f64::INFINITY, 2.0]).unwrap();
        assert_eq!(range, AxisRange { min: 1.0, max: 2.0 });
        assert_eq!(AxisRange::from_values([f64::NAN]), None);
        assert_eq!(AxisRange::from_values(Vec::<f64>::new()), None);
    }

    #[test]
    fn test_axis_range_widens_single_value() {
        let range = AxisRange::from_values([2.0]).unwrap();
        assert!(range.min < 2.0 && range.max > 2.0);
        assert!((range.fraction(2.0) - 0.5).abs() < 1e-12);

        let zero = AxisRange::from_values([0.0, 0.0]).unwrap();
        assert_eq!(zero, AxisRange { min: -0.5, max: 0.5 });
    }

    #[test]
    fn test_padded() {
        let range = AxisRange { min: 0.0, max: 10.0 }.padded(0.1);
        assert_eq!(range, AxisRange { min: -1.0, max: 11.0 });
    }

    #[test]
    fn test_x_axis_uses_epoch_when_complete() {
        let records = vec![enriched(Some(0.5), 1.0), enriched(Some(1.0), 0.9)];
        let axis = XAxis::for_records(&records);
        assert_eq!(axis, XAxis::Epoch);
        assert_eq!(axis.values(&records), vec![0.5, 1.0]);
    }

    #[test]
    fn test_x_axis_falls_back_to_step() {
        let records = vec![enriched(Some(0.5), 1.0), enriched(None, 0.9), enriched(Some(2.0), 0.8)];
        let axis = XAxis::for_records(&records);
        assert_eq!(axis, XAxis::Step);
        assert_eq!(axis.values(&records), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_nearest_index() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(nearest_index(&xs, 1.4), Some(1));
        assert_eq!(nearest_index(&xs, 1.6), Some(2));
        assert_eq!(nearest_index(&xs, -5.0), Some(0));
        assert_eq!(nearest_index(&xs, 0.5), Some(0));
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn test_nearest_index_unsorted_epochs() {
        let xs = [2.0, 0.0, 1.0];
        assert_eq!(nearest_index(&xs, 0.1), Some(1));
    }

    #[test]
    fn test_format_tick() {
        assert_eq!(format_tick(0.0), "0.000");
        assert_eq!(format_tick(1.23456), "1.235");
        assert_eq!(format_tick(0.0001), "1.00e-4");
        assert_eq!(format_tick(25000.0), "2.50e4");
    }
}
