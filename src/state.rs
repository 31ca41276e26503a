use std::path::Path;
use std::rc::Rc;

use crate::config::DashboardConfig;
use crate::data::filter::FilterInputs;
use crate::session::{SessionContext, UploadHandle, UploadOutcome};
use crate::view::trends::Page;
use crate::view::{explorer, trends, Section, Selections};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Which half of the dashboard the central panel shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Sheet preview, filters and exploratory charts.
    #[default]
    Explorer,
    /// The five Trends pages.
    Trends,
}

/// Everything the central panel's sections depend on.
#[derive(Debug, Clone, PartialEq)]
struct RenderKey {
    view: View,
    page: Page,
    upload: Option<UploadHandle>,
    sheet: Option<String>,
    filters: FilterInputs,
    selections: Selections,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// Opened workbook and everything derived from it.
    pub session: SessionContext,

    pub view: View,

    /// Sheet shown on the Explorer; `None` means the first sheet.
    pub selected_sheet: Option<String>,

    /// Sidebar filter widgets for the selected sheet.
    pub filters: FilterInputs,

    /// Sliders and pickers placed by the page builders.
    pub selections: Selections,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Sections built for the last frame and the inputs they came from.
    rendered: Option<(RenderKey, Rc<Vec<Section>>)>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            selections: Selections::from_config(&config),
            config,
            session: SessionContext::default(),
            view: View::default(),
            selected_sheet: None,
            filters: FilterInputs::default(),
            status_message: None,
            rendered: None,
        }
    }

    /// Open `path` as the session workbook.
    pub fn open(&mut self, path: &Path) {
        match self.session.open(path) {
            Ok(UploadOutcome::Reused) => {
                self.status_message = None;
            }
            Ok(UploadOutcome::Loaded) => {
                self.reset_view_state();
                self.status_message = None;
            }
            Err(e) => {
                log::error!("Failed to load {}: {e}", path.display());
                self.reset_view_state();
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    /// Forget the opened workbook.
    pub fn remove_file(&mut self) {
        self.session.clear();
        self.reset_view_state();
        self.status_message = None;
    }

    fn reset_view_state(&mut self) {
        self.selected_sheet = None;
        self.filters = FilterInputs::default();
        self.selections.reset_picks();
    }

    /// Switch the Explorer to another sheet; filters belong to one sheet.
    pub fn select_sheet(&mut self, name: &str) {
        if self.selected_sheet.as_deref() != Some(name) {
            self.selected_sheet = Some(name.to_string());
            self.filters = FilterInputs::default();
        }
    }

    /// Name of the sheet the Explorer shows.
    pub fn current_sheet(&self) -> Option<&str> {
        let workbook = self.session.workbook()?;
        self.selected_sheet
            .as_deref()
            .filter(|name| workbook.sheet(name).is_some())
            .or_else(|| workbook.sheets().first().map(|t| t.name.as_str()))
    }

    pub fn navigate(&mut self, page: Page) {
        self.view = View::Trends;
        self.session.navigate(page);
    }

    /// Sections for the central panel, rebuilt only when an input changed.
    pub fn sections(&mut self) -> Rc<Vec<Section>> {
        let key = RenderKey {
            view: self.view,
            page: self.session.page(),
            upload: self.session.upload().cloned(),
            sheet: self.current_sheet().map(str::to_string),
            filters: self.filters.clone(),
            selections: self.selections.clone(),
        };
        if let Some((cached_key, sections)) = &self.rendered {
            if *cached_key == key {
                return Rc::clone(sections);
            }
        }
        let sections = Rc::new(self.build_sections());
        self.rendered = Some((key, Rc::clone(&sections)));
        sections
    }

    fn build_sections(&self) -> Vec<Section> {
        match self.view {
            View::Explorer => explorer::explore(
                &self.session,
                self.current_sheet(),
                &self.filters,
                &self.selections,
                &self.config,
            ),
            View::Trends => trends::render_page(&self.session, &self.selections, &self.config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_file(contents: &str) -> tempfile::TempPath {
        let file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        std::fs::write(file.path(), contents).unwrap();
        file.into_temp_path()
    }

    #[test]
    fn changing_sheet_resets_filters() {
        let mut state = AppState::new(DashboardConfig::default());
        state.filters.toggle("domain", "enterprise-attack");
        state.select_sheet("software");
        assert_eq!(state.filters, FilterInputs::default());
    }

    #[test]
    fn failed_open_reports_and_clears() {
        let good = csv_file("name,domain\nPhishing,enterprise-attack\n");
        let mut state = AppState::new(DashboardConfig::default());
        state.open(&good);
        assert!(state.session.is_loaded());
        assert!(state.current_sheet().is_some());

        let dir = tempfile::tempdir().unwrap();
        state.open(&dir.path().join("absent.xlsx"));
        assert!(!state.session.is_loaded());
        assert!(state.status_message.as_deref().is_some_and(|m| m.starts_with("Error")));
    }

    #[test]
    fn navigating_switches_to_trends() {
        let mut state = AppState::new(DashboardConfig::default());
        state.navigate(Page::Mitigation);
        assert_eq!(state.view, View::Trends);
        assert_eq!(state.session.page(), Page::Mitigation);
        assert!(matches!(state.sections().as_slice(), [Section::Notice(_)]));
    }

    #[test]
    fn sections_are_rebuilt_only_when_inputs_change() {
        let mut state = AppState::new(DashboardConfig::default());
        let first = state.sections();
        assert!(Rc::ptr_eq(&first, &state.sections()));

        state.navigate(Page::Software);
        assert!(!Rc::ptr_eq(&first, &state.sections()));
    }
}
