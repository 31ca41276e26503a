//! Charts egui_plot has no primitive for, drawn straight onto a painter.

use std::f32::consts::{FRAC_PI_2, TAU};

use eframe::egui::epaint::TextShape;
use eframe::egui::{
    pos2, vec2, Align2, Color32, FontId, Painter, Pos2, Rect, RichText, ScrollArea, Sense, Shape,
    Stroke, Ui,
};

use crate::color::{ColorMap, ColorScale};
use crate::view::chart::{Heatmap, PieChart, Sunburst, WordCloud};

use super::value_range;

const CHART_SIZE: f32 = 340.0;
/// Largest angle covered by one polygon of a ring segment.
const ARC_STEP: f32 = 0.04;

/// Fill the ring segment between radii `r0..r1` and angles `a0..a1`.
///
/// Split into thin quads so every polygon stays convex.
fn ring_segment(painter: &Painter, center: Pos2, r0: f32, r1: f32, a0: f32, a1: f32, fill: Color32) {
    let steps = ((a1 - a0) / ARC_STEP).ceil().max(1.0) as usize;
    let at = |r: f32, a: f32| center + vec2(a.cos(), a.sin()) * r;
    for i in 0..steps {
        let s = a0 + (a1 - a0) * i as f32 / steps as f32;
        let e = a0 + (a1 - a0) * (i + 1) as f32 / steps as f32;
        painter.add(Shape::convex_polygon(
            vec![at(r0, s), at(r1, s), at(r1, e), at(r0, e)],
            fill,
            Stroke::NONE,
        ));
    }
    // Slice borders.
    let border = Stroke::new(1.0, Color32::WHITE);
    painter.line_segment([at(r0, a0), at(r1, a0)], border);
    painter.line_segment([at(r0, a1), at(r1, a1)], border);
}

/// Pointer position in polar form around `center`, angle measured
/// clockwise from twelve o'clock like the slices.
fn polar(center: Pos2, pointer: Pos2) -> (f32, f32) {
    let d = pointer - center;
    let angle = (d.y.atan2(d.x) + FRAC_PI_2).rem_euclid(TAU);
    (d.length(), angle)
}

fn swatch(ui: &mut Ui, color: Color32) {
    let (rect, _) = ui.allocate_exact_size(vec2(12.0, 12.0), Sense::hover());
    ui.painter().rect_filled(rect, 2.0, color);
}

// ---------------------------------------------------------------------------
// Pie / donut
// ---------------------------------------------------------------------------

pub fn pie_chart(ui: &mut Ui, chart: &PieChart) {
    let total: f64 = chart.slices.iter().map(|d| d.value).sum();
    if total <= 0.0 {
        ui.label("Nothing to show.");
        return;
    }
    let colors = chart.scale.discrete(chart.slices.len());

    ui.horizontal_top(|ui| {
        let size = CHART_SIZE.min(ui.available_width());
        let (response, painter) = ui.allocate_painter(vec2(size, size), Sense::hover());
        let center = response.rect.center();
        let outer = size / 2.0 - 6.0;
        let inner = outer * chart.hole.clamp(0.0, 0.95);

        let mut hovered = None;
        let pointer = response.hover_pos().map(|p| polar(center, p));
        let mut start = 0.0_f32;
        for (i, (slice, color)) in chart.slices.iter().zip(&colors).enumerate() {
            let sweep = (slice.value / total) as f32 * TAU;
            ring_segment(&painter, center, inner, outer, start - FRAC_PI_2, start + sweep - FRAC_PI_2, *color);
            if let Some((r, a)) = pointer {
                if (inner..=outer).contains(&r) && (start..start + sweep).contains(&a) {
                    hovered = Some(i);
                }
            }
            start += sweep;
        }

        if let Some(slice) = hovered.and_then(|i| chart.slices.get(i)) {
            response.on_hover_text(format!(
                "{}\n{} ({:.1}%)",
                slice.label,
                slice.value,
                slice.value / total * 100.0
            ));
        }

        ScrollArea::vertical()
            .id_salt(("pie legend", &chart.title))
            .max_height(size)
            .show(ui, |ui| {
                for (slice, color) in chart.slices.iter().zip(&colors) {
                    ui.horizontal(|ui| {
                        swatch(ui, *color);
                        ui.label(format!(
                            "{}  {} ({:.1}%)",
                            slice.label,
                            slice.value,
                            slice.value / total * 100.0
                        ));
                    });
                }
            });
    });
}

// ---------------------------------------------------------------------------
// Sunburst
// ---------------------------------------------------------------------------

pub fn sunburst(ui: &mut Ui, chart: &Sunburst) {
    let total: f64 = chart.rings.iter().map(|r| r.total()).sum();
    if total <= 0.0 {
        ui.label("Nothing to show.");
        return;
    }

    let size = CHART_SIZE.min(ui.available_width());
    let (response, painter) = ui.allocate_painter(vec2(size, size), Sense::hover());
    let center = response.rect.center();
    let outer = size / 2.0 - 6.0;
    let middle = outer * 0.6;
    let hole = outer * 0.2;

    let (lo, hi) = value_range(
        chart
            .rings
            .iter()
            .flat_map(|r| r.children.iter().map(|d| d.value)),
    );
    let (ring_lo, ring_hi) = value_range(chart.rings.iter().map(|r| r.total()));

    let pointer = response.hover_pos().map(|p| polar(center, p));
    let mut hovered = None;
    let mut start = 0.0_f32;
    for ring in &chart.rings {
        let ring_total = ring.total();
        let sweep = (ring_total / total) as f32 * TAU;
        let fill = chart.scale.for_value(ring_total, ring_lo, ring_hi);
        ring_segment(&painter, center, hole, middle, start - FRAC_PI_2, start + sweep - FRAC_PI_2, fill);

        let label_angle = start + sweep / 2.0 - FRAC_PI_2;
        if sweep > 0.25 {
            let at = center + vec2(label_angle.cos(), label_angle.sin()) * (hole + middle) / 2.0;
            painter.text(at, Align2::CENTER_CENTER, &ring.label, FontId::proportional(11.0), Color32::BLACK);
        }

        let mut child_start = start;
        for child in &ring.children {
            let child_sweep = (child.value / total) as f32 * TAU;
            let fill = chart.scale.for_value(child.value, lo, hi);
            ring_segment(
                &painter,
                center,
                middle,
                outer,
                child_start - FRAC_PI_2,
                child_start + child_sweep - FRAC_PI_2,
                fill,
            );
            if let Some((r, a)) = pointer {
                if (middle..=outer).contains(&r) && (child_start..child_start + child_sweep).contains(&a) {
                    hovered = Some(format!("{} / {}: {}", ring.label, child.label, child.value));
                }
            }
            child_start += child_sweep;
        }

        if let Some((r, a)) = pointer {
            if (hole..middle).contains(&r) && (start..start + sweep).contains(&a) {
                hovered = Some(format!("{}: {}", ring.label, ring_total));
            }
        }
        start += sweep;
    }

    if let Some(text) = hovered {
        response.on_hover_text(text);
    }
}

// ---------------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------------

const ROW_LABEL_WIDTH: f32 = 160.0;
const COLUMN_LABEL_HEIGHT: f32 = 110.0;
const MAX_CELL: f32 = 48.0;
const MIN_CELL: f32 = 16.0;

/// Black or white, whichever reads better on `fill`.
fn text_color_on(fill: Color32) -> Color32 {
    let luma = 0.299 * fill.r() as f32 + 0.587 * fill.g() as f32 + 0.114 * fill.b() as f32;
    if luma > 140.0 {
        Color32::BLACK
    } else {
        Color32::WHITE
    }
}

pub fn heatmap(ui: &mut Ui, chart: &Heatmap) {
    if chart.rows.is_empty() || chart.columns.is_empty() {
        ui.label("Nothing to show.");
        return;
    }

    let available = (ui.available_width() - ROW_LABEL_WIDTH).max(MIN_CELL);
    let cell_w = (available / chart.columns.len() as f32).clamp(MIN_CELL, MAX_CELL * 3.0);
    let cell_h = MAX_CELL.min(28.0);
    let (lo, hi) = value_range(chart.values.iter().flatten().copied());

    ScrollArea::horizontal()
        .id_salt(("heatmap", &chart.title))
        .show(ui, |ui| {
            let size = vec2(
                ROW_LABEL_WIDTH + cell_w * chart.columns.len() as f32,
                COLUMN_LABEL_HEIGHT + cell_h * chart.rows.len() as f32,
            );
            let (response, painter) = ui.allocate_painter(size, Sense::hover());
            let origin = response.rect.min + vec2(ROW_LABEL_WIDTH, COLUMN_LABEL_HEIGHT);
            let text = ui.visuals().text_color();

            for (c, column) in chart.columns.iter().enumerate() {
                let galley = painter.layout_no_wrap(column.clone(), FontId::proportional(11.0), text);
                let at = pos2(origin.x + cell_w * (c as f32 + 0.5) - galley.size().y / 2.0, origin.y - 4.0);
                painter.add(TextShape::new(at, galley, text).with_angle(-FRAC_PI_2));
            }

            let mut hovered = None;
            for (r, row) in chart.rows.iter().enumerate() {
                let y = origin.y + cell_h * r as f32;
                painter.text(
                    pos2(origin.x - 6.0, y + cell_h / 2.0),
                    Align2::RIGHT_CENTER,
                    row,
                    FontId::proportional(12.0),
                    text,
                );
                for (c, column) in chart.columns.iter().enumerate() {
                    let value = chart.values.get(r).and_then(|v| v.get(c)).copied().unwrap_or(0.0);
                    let cell = Rect::from_min_size(pos2(origin.x + cell_w * c as f32, y), vec2(cell_w, cell_h));
                    let fill = chart.scale.for_value(value, lo, hi);
                    painter.rect_filled(cell.shrink(0.5), 0.0, fill);
                    if chart.annotate && cell_w >= 18.0 {
                        painter.text(
                            cell.center(),
                            Align2::CENTER_CENTER,
                            format!("{value}"),
                            FontId::proportional(11.0),
                            text_color_on(fill),
                        );
                    }
                    if response.hover_pos().is_some_and(|p| cell.contains(p)) {
                        hovered = Some(format!("{} = {row}\n{} = {column}\n{value}", chart.y_label, chart.x_label));
                    }
                }
            }
            if let Some(text) = hovered {
                response.on_hover_text(text);
            }
        });
}

// ---------------------------------------------------------------------------
// Word cloud
// ---------------------------------------------------------------------------

const MIN_FONT: f32 = 12.0;
const MAX_FONT: f32 = 44.0;

pub fn word_cloud(ui: &mut Ui, chart: &WordCloud) {
    let (lo, hi) = value_range(chart.words.iter().map(|d| d.value));
    let colors = ColorMap::along(chart.words.iter().map(|d| d.label.as_str()), ColorScale::Viridis);

    ui.horizontal_wrapped(|ui| {
        for word in &chart.words {
            let t = if hi > lo { ((word.value - lo) / (hi - lo)) as f32 } else { 1.0 };
            let size = MIN_FONT + t * (MAX_FONT - MIN_FONT);
            ui.label(
                RichText::new(&word.label)
                    .size(size)
                    .color(colors.color_for(&word.label)),
            )
            .on_hover_text(format!("{:.3}", word.value));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polar_angle_starts_at_twelve_o_clock() {
        let center = pos2(0.0, 0.0);
        let (r, a) = polar(center, pos2(0.0, -10.0));
        assert_eq!(r, 10.0);
        assert!(a.abs() < 1e-5);

        let (_, quarter) = polar(center, pos2(10.0, 0.0));
        assert!((quarter - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn annotation_contrasts_with_fill() {
        assert_eq!(text_color_on(Color32::from_rgb(0, 0, 0)), Color32::WHITE);
        assert_eq!(text_color_on(Color32::from_rgb(253, 231, 37)), Color32::BLACK);
    }
}
