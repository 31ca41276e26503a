use eframe::egui::{self, Align, Color32, Layout, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::error::Notice;
use crate::view::chart::Chart;
use crate::view::{Control, PickTarget, Preview, Section, Selections};

use super::{plot, shapes};

// ---------------------------------------------------------------------------
// Section interpreter (central panel)
// ---------------------------------------------------------------------------

/// Draw `sections` top to bottom, writing widget changes into `selections`.
pub fn show_sections(ui: &mut Ui, sections: &[Section], selections: &mut Selections) {
    for (i, section) in sections.iter().enumerate() {
        ui.push_id(i, |ui| show_section(ui, section, selections));
    }
}

fn show_section(ui: &mut Ui, section: &Section, selections: &mut Selections) {
    match section {
        Section::Heading(text) => {
            ui.add_space(8.0);
            ui.heading(text);
        }
        Section::Text(text) => {
            ui.label(text);
        }
        Section::Notice(notice) => show_notice(ui, notice),
        Section::Control(control) => show_control(ui, control, selections),
        Section::Chart(chart) => {
            show_chart(ui, chart);
            ui.add_space(12.0);
        }
        Section::Preview(preview) => show_preview(ui, preview),
        Section::Columns(columns) => {
            ui.columns(columns.len().max(1), |uis| {
                for (ui, column) in uis.iter_mut().zip(columns) {
                    show_sections(ui, column, selections);
                }
            });
        }
        Section::Group { title, sections } => {
            egui::CollapsingHeader::new(RichText::new(title).strong())
                .id_salt(title)
                .default_open(true)
                .show(ui, |ui| show_sections(ui, sections, selections));
        }
    }
}

fn show_notice(ui: &mut Ui, notice: &Notice) {
    let (color, prefix) = match notice {
        Notice::Info(_) => (Color32::LIGHT_BLUE, "ℹ"),
        Notice::Warning(_) => (Color32::GOLD, "⚠"),
        Notice::Error(_) => (Color32::RED, "✖"),
    };
    ui.label(RichText::new(format!("{prefix} {}", notice.message())).color(color));
}

pub fn show_chart(ui: &mut Ui, chart: &Chart) {
    ui.strong(chart.title());
    match chart {
        Chart::Bar(c) => plot::bar_chart(ui, c),
        Chart::Line(c) => plot::line_chart(ui, c),
        Chart::Scatter(c) => plot::scatter_chart(ui, c),
        Chart::Pie(c) => shapes::pie_chart(ui, c),
        Chart::Sunburst(c) => shapes::sunburst(ui, c),
        Chart::Heatmap(c) => shapes::heatmap(ui, c),
        Chart::WordCloud(c) => shapes::word_cloud(ui, c),
    }
}

// ---------------------------------------------------------------------------
// Widgets
// ---------------------------------------------------------------------------

fn show_control(ui: &mut Ui, control: &Control, selections: &mut Selections) {
    match control {
        Control::MinCount { target, label, max } => {
            let value = selections.slider_mut(*target);
            *value = (*value).min(*max);
            ui.add(egui::Slider::new(value, 0..=*max).text(label));
        }
        Control::MultiPick {
            target,
            label,
            options,
            max,
        } => {
            let picked = selections.picked(*target).to_vec();
            let summary = if picked.is_empty() {
                "Choose…".to_string()
            } else {
                picked.join(", ")
            };
            ui.horizontal(|ui| {
                ui.label(label);
                egui::ComboBox::from_id_salt(label)
                    .selected_text(summary)
                    .width(280.0)
                    .show_ui(ui, |ui| {
                        for option in options {
                            let is_picked = picked.contains(option);
                            let enabled = is_picked || picked.len() < *max;
                            if ui
                                .add_enabled(enabled, egui::SelectableLabel::new(is_picked, option))
                                .clicked()
                            {
                                selections.toggle_pick(*target, option, *max);
                            }
                        }
                    });
            });
        }
        Control::Pick {
            target,
            label,
            options,
        } => {
            // Target type falls back to the first option, groups start unset.
            let current = selections.single(*target).map(str::to_string).or_else(|| {
                (*target == PickTarget::TargetType)
                    .then(|| options.first().cloned())
                    .flatten()
            });
            ui.horizontal(|ui| {
                ui.label(label);
                egui::ComboBox::from_id_salt(label)
                    .selected_text(current.as_deref().unwrap_or("Choose…"))
                    .width(220.0)
                    .show_ui(ui, |ui| {
                        for option in options {
                            let is_current = current.as_deref() == Some(option.as_str());
                            if ui.selectable_label(is_current, option).clicked() {
                                selections.set_single(*target, option.clone());
                            }
                        }
                    });
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Table preview
// ---------------------------------------------------------------------------

const ROW_HEIGHT: f32 = 20.0;
const PREVIEW_HEIGHT: f32 = 300.0;

fn show_preview(ui: &mut Ui, preview: &Preview) {
    let table = &preview.table;
    ui.strong(&preview.title);
    if table.len() < preview.total_rows {
        ui.weak(format!("Showing the first {} of {} rows", table.len(), preview.total_rows));
    }
    if table.columns.is_empty() {
        ui.label("No columns.");
        return;
    }

    ui.push_id(("preview", &preview.title), |ui| {
        egui::ScrollArea::horizontal().show(ui, |ui| {
            TableBuilder::new(ui)
                .striped(true)
                .resizable(true)
                .cell_layout(Layout::left_to_right(Align::Center))
                .columns(Column::auto().at_least(60.0).clip(true), table.columns.len())
                .max_scroll_height(PREVIEW_HEIGHT)
                .header(ROW_HEIGHT, |mut header| {
                    for column in &table.columns {
                        header.col(|ui| {
                            ui.strong(column);
                        });
                    }
                })
                .body(|body| {
                    body.rows(ROW_HEIGHT, table.len(), |mut row| {
                        let i = row.index();
                        for (c, cell) in table.cells(i).iter().enumerate() {
                            let text = cell.as_text().unwrap_or_default();
                            let highlighted = preview.highlight == Some((i, c));
                            row.col(|ui| {
                                if highlighted {
                                    ui.label(
                                        RichText::new(&*text)
                                            .background_color(Color32::YELLOW)
                                            .color(Color32::BLACK),
                                    );
                                } else {
                                    ui.label(&*text);
                                }
                            });
                        }
                    });
                });
        });
    });
}
