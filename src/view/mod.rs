/// Page layouts as data.
///
/// The page builders (`explorer`, `trends`) are pure functions from the
/// session and the user's selections to a list of [`Section`]s; `ui::page`
/// walks that list and draws it. Widgets appear as [`Control`]s so the
/// builders decide *where* a slider or picker goes while the UI owns the
/// values.
pub mod chart;
pub mod explorer;
pub mod trends;

use crate::config::DashboardConfig;
use crate::data::model::Table;
use crate::error::Notice;
use chart::Chart;

#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    Heading(String),
    Text(String),
    Notice(Notice),
    Control(Control),
    Chart(Chart),
    Preview(Preview),
    /// Side-by-side columns.
    Columns(Vec<Vec<Section>>),
    /// Collapsible group, open by default.
    Group { title: String, sections: Vec<Section> },
}

impl Section {
    pub fn info(message: impl Into<String>) -> Self {
        Section::Notice(Notice::Info(message.into()))
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Section::Notice(Notice::Warning(message.into()))
    }

    pub fn heading(text: impl Into<String>) -> Self {
        Section::Heading(text.into())
    }

    /// Every notice in `sections`, depth first.
    #[cfg(test)]
    pub fn notices(sections: &[Section]) -> Vec<&Notice> {
        let mut out = Vec::new();
        for s in sections {
            match s {
                Section::Notice(n) => out.push(n),
                Section::Columns(cols) => cols.iter().for_each(|c| out.extend(Section::notices(c))),
                Section::Group { sections, .. } => out.extend(Section::notices(sections)),
                _ => {}
            }
        }
        out
    }

    /// Every chart in `sections`, depth first.
    #[cfg(test)]
    pub fn charts(sections: &[Section]) -> Vec<&Chart> {
        let mut out = Vec::new();
        for s in sections {
            match s {
                Section::Chart(c) => out.push(c),
                Section::Columns(cols) => cols.iter().for_each(|c| out.extend(Section::charts(c))),
                Section::Group { sections, .. } => out.extend(Section::charts(sections)),
                _ => {}
            }
        }
        out
    }
}

/// A table shown in a scrollable grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub title: String,
    /// At most `DashboardConfig::preview_rows` rows.
    pub table: Table,
    /// Row count before truncation.
    pub total_rows: usize,
    /// `(row, column)` of a cell to emphasise.
    pub highlight: Option<(usize, usize)>,
}

impl Preview {
    pub fn new(title: impl Into<String>, table: &Table, config: &DashboardConfig) -> Self {
        let shown: Vec<usize> = (0..table.len().min(config.preview_rows)).collect();
        Self {
            title: title.into(),
            table: table.select(&shown),
            total_rows: table.len(),
            highlight: None,
        }
    }
}

/// Which slider value a [`Control::MinCount`] edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliderTarget {
    TechniqueUsage,
    SoftwareUsage,
}

/// Which selection a picker edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickTarget {
    TechniqueCampaigns,
    TacticCampaigns,
    FirstGroup,
    SecondGroup,
    TargetType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Integer slider from 0 to `max`.
    MinCount {
        target: SliderTarget,
        label: String,
        max: usize,
    },
    /// Choose up to `max` of `options`.
    MultiPick {
        target: PickTarget,
        label: String,
        options: Vec<String>,
        max: usize,
    },
    /// Choose exactly one of `options`.
    Pick {
        target: PickTarget,
        label: String,
        options: Vec<String>,
    },
}

/// Widget values the page builders read. Owned by the UI state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selections {
    pub technique_min: usize,
    pub software_min: usize,
    pub technique_campaigns: Vec<String>,
    pub tactic_campaigns: Vec<String>,
    pub first_group: Option<String>,
    pub second_group: Option<String>,
    pub target_type: Option<String>,
}

impl Selections {
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self {
            technique_min: config.technique_usage.default,
            software_min: config.software_usage.default,
            technique_campaigns: Vec::new(),
            tactic_campaigns: Vec::new(),
            first_group: None,
            second_group: None,
            target_type: None,
        }
    }

    pub fn slider_mut(&mut self, target: SliderTarget) -> &mut usize {
        match target {
            SliderTarget::TechniqueUsage => &mut self.technique_min,
            SliderTarget::SoftwareUsage => &mut self.software_min,
        }
    }

    /// Current multi-pick values.
    pub fn picked(&self, target: PickTarget) -> &[String] {
        match target {
            PickTarget::TechniqueCampaigns => &self.technique_campaigns,
            PickTarget::TacticCampaigns => &self.tactic_campaigns,
            _ => &[],
        }
    }

    /// Current single-pick value.
    pub fn single(&self, target: PickTarget) -> Option<&str> {
        match target {
            PickTarget::FirstGroup => self.first_group.as_deref(),
            PickTarget::SecondGroup => self.second_group.as_deref(),
            PickTarget::TargetType => self.target_type.as_deref(),
            _ => None,
        }
    }

    pub fn set_single(&mut self, target: PickTarget, value: String) {
        match target {
            PickTarget::FirstGroup => self.first_group = Some(value),
            PickTarget::SecondGroup => self.second_group = Some(value),
            PickTarget::TargetType => self.target_type = Some(value),
            _ => {}
        }
    }

    /// Add or remove `value` from a multi-pick, refusing to grow past `max`.
    pub fn toggle_pick(&mut self, target: PickTarget, value: &str, max: usize) {
        let picked = match target {
            PickTarget::TechniqueCampaigns => &mut self.technique_campaigns,
            PickTarget::TacticCampaigns => &mut self.tactic_campaigns,
            _ => return,
        };
        if let Some(pos) = picked.iter().position(|v| v == value) {
            picked.remove(pos);
        } else if picked.len() < max {
            picked.push(value.to_string());
        }
    }

    /// Forget choices that refer to the previous workbook.
    pub fn reset_picks(&mut self) {
        self.technique_campaigns.clear();
        self.tactic_campaigns.clear();
        self.first_group = None;
        self.second_group = None;
        self.target_type = None;
    }
}
