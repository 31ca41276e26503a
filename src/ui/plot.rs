use std::ops::RangeInclusive;

use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart as PlotBars, GridMark, Legend, Line, Plot, PlotPoints, Points};

use crate::color::ColorMap;
use crate::view::chart::{BarChart, LineChart, ScatterChart};

use super::value_range;

const PLOT_HEIGHT: f32 = 340.0;

/// Axis labels for categorical x positions `0, 1, 2, …`.
fn category_axis(labels: Vec<String>) -> impl Fn(GridMark, &RangeInclusive<f64>) -> String {
    move |mark, _range| {
        let v = mark.value;
        if v < 0.0 || v.fract() != 0.0 {
            return String::new();
        }
        labels.get(v as usize).cloned().unwrap_or_default()
    }
}

/// Whole numbers only, for year and count axes.
fn integer_axis(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
    if mark.value.fract() == 0.0 {
        format!("{}", mark.value as i64)
    } else {
        String::new()
    }
}

// ---------------------------------------------------------------------------
// Bar chart
// ---------------------------------------------------------------------------

pub fn bar_chart(ui: &mut Ui, chart: &BarChart) {
    let (min, max) = value_range(chart.bars.iter().map(|d| d.value));
    let bars: Vec<Bar> = chart
        .bars
        .iter()
        .enumerate()
        .map(|(i, d)| {
            Bar::new(i as f64, d.value)
                .name(&d.label)
                .width(0.8)
                .fill(chart.scale.for_value(d.value, min, max))
        })
        .collect();
    let labels = chart.bars.iter().map(|d| d.label.clone()).collect();

    Plot::new(("bar", &chart.title))
        .height(PLOT_HEIGHT)
        .x_axis_label(&chart.x_label)
        .y_axis_label(&chart.y_label)
        .x_axis_formatter(category_axis(labels))
        .include_y(0.0)
        .allow_scroll(false)
        .allow_boxed_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(
                PlotBars::new(bars)
                    .element_formatter(Box::new(|bar, _chart| format!("{}\n{}", bar.name, bar.value))),
            );
        });
}

// ---------------------------------------------------------------------------
// Line chart
// ---------------------------------------------------------------------------

pub fn line_chart(ui: &mut Ui, chart: &LineChart) {
    let points = PlotPoints::from(chart.points.clone());
    let markers = PlotPoints::from(chart.points.clone());

    Plot::new(("line", &chart.title))
        .height(PLOT_HEIGHT)
        .x_axis_label(&chart.x_label)
        .y_axis_label(&chart.y_label)
        .x_axis_formatter(integer_axis)
        .include_y(0.0)
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(points).name(&chart.y_label).width(2.0));
            plot_ui.points(Points::new(markers).radius(4.0).filled(true));
        });
}

// ---------------------------------------------------------------------------
// Bubble / scatter chart
// ---------------------------------------------------------------------------

const MIN_RADIUS: f32 = 3.0;
const MAX_RADIUS: f32 = 22.0;

pub fn scatter_chart(ui: &mut Ui, chart: &ScatterChart) {
    let colors = ColorMap::new(chart.bubbles.iter().map(|b| b.label.as_str()));
    let (_, max_size) = value_range(chart.bubbles.iter().map(|b| b.size.max(0.0)));

    Plot::new(("scatter", &chart.title))
        .height(PLOT_HEIGHT)
        .x_axis_label(&chart.x_label)
        .y_axis_label(&chart.y_label)
        .legend(Legend::default())
        .allow_scroll(false)
        .allow_boxed_zoom(true)
        .show(ui, |plot_ui| {
            for bubble in &chart.bubbles {
                // Area proportional to size.
                let t = if max_size > 0.0 {
                    (bubble.size.max(0.0) / max_size).sqrt() as f32
                } else {
                    0.0
                };
                let radius = MIN_RADIUS + t * (MAX_RADIUS - MIN_RADIUS);
                let color: Color32 = colors.color_for(&bubble.label).gamma_multiply(0.75);
                plot_ui.points(
                    Points::new(vec![[bubble.x, bubble.y]])
                        .name(&bubble.label)
                        .radius(radius)
                        .color(color)
                        .filled(true),
                );
            }
        });
}
