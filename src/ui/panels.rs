use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::data::filter::{offered_filters, FieldKind, FilterField};
use crate::state::{AppState, View};
use crate::view::trends::Page;

// ---------------------------------------------------------------------------
// Left side panel – sheet, filters, navigation
// ---------------------------------------------------------------------------

/// Render the left panel for the current view.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("ATT&CK Lens");
    ui.separator();

    match state.view {
        View::Explorer => explorer_controls(ui, state),
        View::Trends => trends_navigation(ui, state),
    }
}

fn trends_navigation(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Trends");
    let current = state.session.page();
    for page in Page::ALL {
        let button = egui::Button::new(page.label()).selected(page == current);
        if ui.add_sized([ui.available_width(), 24.0], button).clicked() {
            state.navigate(page);
        }
    }
}

fn explorer_controls(ui: &mut Ui, state: &mut AppState) {
    let Some(workbook) = state.session.workbook() else {
        ui.label("No workbook loaded.");
        return;
    };

    // Clone what we need so we can mutate state below.
    let sheet_names = workbook.sheet_names();
    let current = state.current_sheet().map(str::to_string).unwrap_or_default();
    let fields: Vec<FilterField> = workbook
        .sheet(&current)
        .map(offered_filters)
        .unwrap_or_default();

    ui.strong("Sheet");
    egui::ComboBox::from_id_salt("sheet")
        .selected_text(&current)
        .show_ui(ui, |ui: &mut Ui| {
            for name in &sheet_names {
                if ui.selectable_label(current == *name, name).clicked() {
                    state.select_sheet(name);
                }
            }
        });
    ui.separator();

    ui.heading("Filters");
    if fields.is_empty() {
        ui.label("This sheet has no filterable columns.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for field in &fields {
                match field.kind {
                    FieldKind::Text => text_filter(ui, state, field),
                    FieldKind::Categorical | FieldKind::Tags => choice_filter(ui, state, field),
                }
            }
        });
}

fn text_filter(ui: &mut Ui, state: &mut AppState, field: &FilterField) {
    ui.strong(field.label);
    let needle = state.filters.text.entry(field.column.to_string()).or_default();
    ui.add(egui::TextEdit::singleline(needle).hint_text("substring, case-insensitive"));
    ui.add_space(4.0);
}

fn choice_filter(ui: &mut Ui, state: &mut AppState, field: &FilterField) {
    let n_selected = state
        .filters
        .selections
        .get(field.column)
        .map_or(0, |s| s.len());
    // Show count of selected / total in the header
    let header_text = format!("{}  ({n_selected}/{})", field.label, field.options.len());

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(field.column)
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            if ui.small_button("Clear").clicked() {
                state.filters.selections.remove(field.column);
            }
            for option in &field.options {
                let mut checked = state
                    .filters
                    .selections
                    .get(field.column)
                    .is_some_and(|s| s.contains(option));
                if ui.checkbox(&mut checked, option).changed() {
                    state.filters.toggle(field.column, option);
                }
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.session.is_loaded(), egui::Button::new("Remove file"))
                .clicked()
            {
                state.remove_file();
                ui.close_menu();
            }
        });

        ui.separator();

        if ui
            .selectable_label(state.view == View::Explorer, "Explorer")
            .clicked()
        {
            state.view = View::Explorer;
        }
        if ui
            .selectable_label(state.view == View::Trends, "Trends")
            .clicked()
        {
            state.view = View::Trends;
        }

        ui.separator();

        if let Some(handle) = state.session.upload() {
            let sheets = state.session.workbook().map_or(0, |w| w.sheets().len());
            ui.label(format!("{} ({sheets} sheets)", handle.file_name()));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open ATT&CK workbook")
        .add_filter(
            "Supported files",
            &["xlsx", "xlsm", "xlsb", "xls", "ods", "json", "csv", "parquet", "pq"],
        )
        .add_filter("Excel", &["xlsx", "xlsm", "xlsb", "xls"])
        .add_filter("OpenDocument", &["ods"])
        .add_filter("JSON", &["json"])
        .add_filter("CSV", &["csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        state.open(&path);
    }
}
