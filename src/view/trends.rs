use crate::color::ColorScale;
use crate::config::DashboardConfig;
use crate::data::analysis::{
    campaign_durations, campaign_tactic_counts, campaign_technique_counts, campaigns_by_year,
    campaigns_per_year, campaigns_using_techniques, group_campaign_counts, platform_usage,
    source_coverage, usage_counts, usage_counts_above, Counts,
};
use crate::data::model::{CellValue, Table};
use crate::data::relationships::RelationshipSlices;
use crate::data::schema::{SheetKind, FIRST_SEEN, ID, LAST_SEEN, NAME, PLATFORMS, TACTICS, TARGET_ID};
use crate::error::Notice;
use crate::session::SessionContext;

use super::chart::{BarChart, Bubble, Chart, Datum, LineChart, PieChart, ScatterChart};
use super::{Control, PickTarget, Preview, Section, Selections, SliderTarget};

/// Campaigns compared side by side on the techniques and tactics charts.
const MAX_CAMPAIGNS: usize = 2;

/// The five Trends pages. Any page can be reached from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Page {
    #[default]
    Techniques,
    Software,
    Detection,
    Mitigation,
    Attribute,
}

impl Page {
    pub const ALL: [Page; 5] = [
        Page::Techniques,
        Page::Software,
        Page::Detection,
        Page::Mitigation,
        Page::Attribute,
    ];

    /// Text of the navigation button.
    pub fn label(self) -> &'static str {
        match self {
            Page::Techniques => "Most Used Techniques",
            Page::Software => "Most Used Software",
            Page::Detection => "Detection",
            Page::Mitigation => "Mitigation Method",
            Page::Attribute => "Campaign",
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Page::Techniques => "Techniques Analysis",
            Page::Software => "Software Analysis",
            Page::Detection => "Detection Analysis",
            Page::Mitigation => "Mitigation Analysis",
            Page::Attribute => "Attribution Analysis",
        }
    }
}

/// Build the sections of the session's current Trends page.
pub fn render_page(
    session: &SessionContext,
    selections: &Selections,
    config: &DashboardConfig,
) -> Vec<Section> {
    let page = session.page();
    if !session.is_loaded() {
        return vec![Section::info(
            "Open a workbook from the Explorer to see trend visualizations.",
        )];
    }

    let mut sections = vec![Section::heading(page.heading())];
    let Some(slices) = session.slices() else {
        sections.push(Section::Notice(
            missing(session, SheetKind::Relationships, SheetKind::Relationships.schema().required)
                .unwrap_or_else(|| Notice::missing_sheet(SheetKind::Relationships.sheet_name())),
        ));
        return sections;
    };

    sections.extend(match page {
        Page::Techniques => techniques_page(slices, selections, config),
        Page::Software => software_page(session, slices, selections, config),
        Page::Detection => coverage_page(&slices.detection, &DETECTION, config),
        Page::Mitigation => coverage_page(&slices.mitigation, &MITIGATION, config),
        Page::Attribute => attribute_page(session, slices, selections, config),
    });
    sections
}

/// Notice for the first of `columns` that sheet `kind` cannot provide.
fn missing(session: &SessionContext, kind: SheetKind, columns: &[&str]) -> Option<Notice> {
    if session.tables().get(kind).is_none() {
        return Some(Notice::missing_sheet(kind.sheet_name()));
    }
    session
        .capabilities()
        .first_missing(kind, columns)
        .map(|column| Notice::missing_column(kind.sheet_name(), column))
}

fn bar(title: String, x_label: &str, y_label: &str, counts: &Counts, scale: ColorScale) -> Section {
    Section::Chart(Chart::Bar(BarChart {
        title,
        x_label: x_label.to_string(),
        y_label: y_label.to_string(),
        bars: Datum::from_counts(counts),
        scale,
    }))
}

fn pie(title: String, counts: &Counts, scale: ColorScale) -> Section {
    Section::Chart(Chart::Pie(PieChart {
        title,
        slices: Datum::from_counts(counts),
        scale,
        hole: 0.0,
    }))
}

/// Side-by-side pies for up to two picked campaigns, or a warning when
/// none is picked.
fn campaign_pies<F>(picked: &[String], prompt: &str, empty: &str, title: &str, counts: F) -> Section
where
    F: Fn(&str) -> Counts,
{
    if picked.is_empty() {
        return Section::warning(prompt);
    }
    let columns = picked
        .iter()
        .take(MAX_CAMPAIGNS)
        .map(|campaign| {
            let data = counts(campaign);
            let body = if data.is_empty() {
                Section::warning(format!("{empty} {campaign}"))
            } else {
                pie(format!("{title} {campaign}"), &data, ColorScale::Viridis)
            };
            vec![Section::heading(campaign.clone()), body]
        })
        .collect();
    Section::Columns(columns)
}

// ---------------------------------------------------------------------------
// Techniques
// ---------------------------------------------------------------------------

fn techniques_page(slices: &RelationshipSlices, selections: &Selections, config: &DashboardConfig) -> Vec<Section> {
    let slice = &slices.techniques;
    let min = selections.technique_min;
    let mut sections = vec![
        Section::Preview(Preview::new("Data Preview", slice, config)),
        Section::Control(Control::MinCount {
            target: SliderTarget::TechniqueUsage,
            label: "Minimum Usage Count".to_string(),
            max: config.technique_usage.max,
        }),
    ];

    let counts = usage_counts(slice, min);
    sections.push(if counts.is_empty() {
        Section::warning(format!("No techniques are used at least {min} times."))
    } else {
        bar(
            format!("Most Used Techniques in MITRE ATT&CK ({min}+ Uses)"),
            "Techniques",
            "Number of Uses",
            &counts,
            ColorScale::Viridis,
        )
    });

    sections.push(Section::heading("Technique Usage by Campaign"));
    sections.push(Section::Control(Control::MultiPick {
        target: PickTarget::TechniqueCampaigns,
        label: "Select up to 2 Campaigns".to_string(),
        options: campaigns_using_techniques(slice),
        max: MAX_CAMPAIGNS,
    }));
    sections.push(campaign_pies(
        selections.picked(PickTarget::TechniqueCampaigns),
        "Please select one or two campaigns to display data.",
        "No techniques found for the campaign:",
        "Techniques used by",
        |campaign| campaign_technique_counts(slice, campaign),
    ));
    sections
}

// ---------------------------------------------------------------------------
// Software
// ---------------------------------------------------------------------------

fn software_page(
    session: &SessionContext,
    slices: &RelationshipSlices,
    selections: &Selections,
    config: &DashboardConfig,
) -> Vec<Section> {
    let slice = &slices.software;
    let min = selections.software_min;
    let mut sections = vec![
        Section::Preview(Preview::new("Data Preview", slice, config)),
        Section::Control(Control::MinCount {
            target: SliderTarget::SoftwareUsage,
            label: "Minimum Usage Count".to_string(),
            max: config.software_usage.max,
        }),
    ];

    let counts = usage_counts_above(slice, min);
    if counts.is_empty() {
        sections.push(Section::warning(format!(
            "No software is used more than {min} times."
        )));
        return sections;
    }
    sections.push(pie(
        format!("Most Used Software in MITRE ATT&CK (over {min} Uses)"),
        &counts,
        ColorScale::Viridis,
    ));

    sections.push(Section::heading("Software Usage per Platform"));
    if let Some(notice) = missing(session, SheetKind::Software, &[NAME, PLATFORMS]) {
        sections.push(Section::Notice(notice));
        return sections;
    }
    let software = session.tables().software.as_ref();
    let platforms = software.map(|s| platform_usage(&counts, s)).unwrap_or_default();
    sections.push(if platforms.is_empty() {
        Section::warning("None of the listed software has platform information.")
    } else {
        bar(
            "Total Software Usage per Platform".to_string(),
            "Platform",
            "Total Usage Count",
            &platforms,
            ColorScale::Viridis,
        )
    });
    sections
}

// ---------------------------------------------------------------------------
// Detection / Mitigation
// ---------------------------------------------------------------------------

/// Wording that differs between the detection and mitigation pages.
struct CoverageText {
    source: &'static str,
    verb: &'static str,
    measure: &'static str,
}

const DETECTION: CoverageText = CoverageText {
    source: "Data Components",
    verb: "Detect",
    measure: "Detection Count",
};

const MITIGATION: CoverageText = CoverageText {
    source: "Mitigation Methods",
    verb: "Mitigate",
    measure: "Mitigation Count",
};

fn coverage_page(slice: &Table, text: &CoverageText, config: &DashboardConfig) -> Vec<Section> {
    let threshold = config.coverage_threshold;
    let mut sections = vec![Section::Preview(Preview::new("Data Preview", slice, config))];

    let coverage = source_coverage(slice, threshold);
    if coverage.is_empty() {
        sections.push(Section::warning(format!(
            "No {} appear in more than {threshold} relationships.",
            text.source
        )));
        return sections;
    }

    let counts: Counts = coverage.iter().map(|c| (c.source.clone(), c.count)).collect();
    sections.push(bar(
        format!("Most Used {} to {} Techniques (over {threshold} Uses)", text.source, text.verb),
        text.source,
        text.measure,
        &counts,
        ColorScale::Plasma,
    ));
    sections.push(Section::Chart(Chart::Scatter(ScatterChart {
        title: format!("{} by Techniques Covered", text.source),
        x_label: text.measure.to_string(),
        y_label: "Number of Associated Techniques".to_string(),
        bubbles: coverage
            .into_iter()
            .map(|c| Bubble {
                x: c.count as f64,
                y: c.techniques as f64,
                size: c.count as f64,
                label: c.source,
            })
            .collect(),
    })));
    sections
}

// ---------------------------------------------------------------------------
// Attribution
// ---------------------------------------------------------------------------

fn attribute_page(
    session: &SessionContext,
    slices: &RelationshipSlices,
    selections: &Selections,
    config: &DashboardConfig,
) -> Vec<Section> {
    let mut sections = vec![Section::heading("Most Active Groups by Campaigns")];
    let groups = group_campaign_counts(&slices.attribution);
    sections.push(if groups.is_empty() {
        Section::warning("No campaigns are attributed to any group.")
    } else {
        bar(
            "Most Active Groups in MITRE ATT&CK by Campaigns".to_string(),
            "Groups",
            "Number of Campaigns",
            &groups,
            ColorScale::Plasma,
        )
    });

    sections.push(Section::heading("Campaigns Over Time"));
    match (missing(session, SheetKind::Campaigns, &[NAME, FIRST_SEEN]), &session.tables().campaigns) {
        (None, Some(campaigns)) => {
            sections.extend(timeline_sections(campaigns, config));

            sections.push(Section::heading("Campaign Duration vs. Techniques"));
            sections.push(match missing(session, SheetKind::Campaigns, &[LAST_SEEN]) {
                Some(notice) => Section::Notice(notice),
                None => duration_scatter(campaigns, &slices.techniques),
            });
        }
        (notice, _) => sections.push(Section::Notice(
            notice.unwrap_or_else(|| Notice::missing_sheet(SheetKind::Campaigns.sheet_name())),
        )),
    }

    sections.push(Section::heading("Tactics Used by Campaign"));
    let techniques = session.tables().techniques.as_ref();
    let blocker = missing(session, SheetKind::Techniques, &[ID, TACTICS])
        .or_else(|| missing(session, SheetKind::Relationships, &[TARGET_ID]));
    match (blocker, techniques) {
        (None, Some(techniques)) => {
            sections.push(Section::Control(Control::MultiPick {
                target: PickTarget::TacticCampaigns,
                label: "Select up to 2 Campaigns".to_string(),
                options: campaigns_using_techniques(&slices.techniques),
                max: MAX_CAMPAIGNS,
            }));
            sections.push(campaign_pies(
                selections.picked(PickTarget::TacticCampaigns),
                "Please select one or two campaigns to display their tactics.",
                "No tactics found for the campaign:",
                "Tactics used by",
                |campaign| campaign_tactic_counts(&slices.techniques, techniques, campaign),
            ));
        }
        (notice, _) => sections.push(Section::Notice(
            notice.unwrap_or_else(|| Notice::missing_sheet(SheetKind::Techniques.sheet_name())),
        )),
    }
    sections
}

/// Line of campaigns per year followed by the by-year table.
fn timeline_sections(campaigns: &Table, config: &DashboardConfig) -> Vec<Section> {
    let per_year = campaigns_per_year(campaigns);
    if per_year.is_empty() {
        return vec![Section::warning(
            "No campaign has a recognisable first seen date.",
        )];
    }

    let line = Section::Chart(Chart::Line(LineChart {
        title: "Number of Campaigns Detected Over Time".to_string(),
        x_label: "Year".to_string(),
        y_label: "Number of Campaigns".to_string(),
        points: per_year
            .iter()
            .map(|(year, n)| [f64::from(*year), *n as f64])
            .collect(),
    }));

    let buckets = campaigns_by_year(campaigns);
    let mut table = Table::new(
        "campaigns by year",
        vec!["Year".to_string(), "Campaigns".to_string(), "Count".to_string()],
    );
    for bucket in &buckets {
        table.push_row(vec![
            CellValue::Integer(i64::from(bucket.year)),
            CellValue::String(bucket.campaigns.join(", ")),
            CellValue::Integer(bucket.count() as i64),
        ]);
    }
    // First row with the highest count.
    let busiest = buckets
        .iter()
        .enumerate()
        .max_by(|(ia, a), (ib, b)| a.count().cmp(&b.count()).then(ib.cmp(ia)))
        .map(|(i, _)| (i, 2));
    let mut preview = Preview::new("Campaigns by Year", &table, config);
    preview.highlight = busiest;

    vec![line, Section::Preview(preview)]
}

fn duration_scatter(campaigns: &Table, technique_slice: &Table) -> Section {
    let bubbles: Vec<Bubble> = campaign_durations(campaigns, technique_slice)
        .into_iter()
        .filter_map(|span| {
            let days = span.duration_days?;
            Some(Bubble {
                label: span.name,
                x: span.techniques as f64,
                y: days as f64,
                size: days.max(0) as f64,
            })
        })
        .collect();
    if bubbles.is_empty() {
        return Section::warning("No campaign has both a first seen and a last seen date.");
    }
    Section::Chart(Chart::Scatter(ScatterChart {
        title: "Campaign Duration vs. Techniques Count".to_string(),
        x_label: "Number of Techniques".to_string(),
        y_label: "Duration (days)".to_string(),
        bubbles,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Workbook;
    use crate::data::schema::{MAPPING_TYPE, SOURCE_NAME, SOURCE_TYPE, TARGET_NAME, TARGET_TYPE};
    use crate::session::UploadHandle;
    use std::path::PathBuf;

    fn handle() -> UploadHandle {
        UploadHandle {
            path: PathBuf::from("attack.xlsx"),
            len: 0,
            modified: None,
        }
    }

    fn relationships() -> Table {
        Table::from_rows(
            "relationships",
            &[SOURCE_NAME, SOURCE_TYPE, TARGET_NAME, TARGET_TYPE, MAPPING_TYPE, TARGET_ID],
            vec![
                vec!["G1", "group", "T1", "technique", "uses", "T0001"],
                vec!["G2", "group", "T1", "technique", "uses", "T0001"],
                vec!["C1", "campaign", "T1", "technique", "uses", "T0001"],
                vec!["C1", "campaign", "T2", "technique", "uses", "T0002"],
                vec!["G1", "group", "S1", "software", "uses", ""],
                vec!["C1", "campaign", "G1", "group", "attributed-to", ""],
            ],
        )
    }

    fn session_with(sheets: Vec<Table>) -> SessionContext {
        let mut session = SessionContext::default();
        session.install(handle(), Workbook::new(sheets));
        session
    }

    fn selections() -> Selections {
        let mut s = Selections::from_config(&DashboardConfig::default());
        s.technique_min = 0;
        s.software_min = 0;
        s
    }

    fn bar_of(sections: &[Section]) -> Option<&BarChart> {
        Section::charts(sections).into_iter().find_map(|c| match c {
            Chart::Bar(b) => Some(b),
            _ => None,
        })
    }

    #[test]
    fn nothing_loaded_shows_a_single_info() {
        let sections = render_page(&SessionContext::default(), &selections(), &DashboardConfig::default());
        assert!(matches!(sections.as_slice(), [Section::Notice(Notice::Info(_))]));
    }

    #[test]
    fn missing_relationships_sheet_is_reported_on_every_page() {
        let mut session = session_with(vec![Table::from_rows("campaigns", &["name"], vec![vec!["C1"]])]);
        for page in Page::ALL {
            session.navigate(page);
            let sections = render_page(&session, &selections(), &DashboardConfig::default());
            assert_eq!(
                Section::notices(&sections),
                vec![&Notice::missing_sheet("relationships")]
            );
        }
    }

    #[test]
    fn techniques_page_counts_uses_and_asks_for_campaigns() {
        let session = session_with(vec![relationships()]);
        let sections = render_page(&session, &selections(), &DashboardConfig::default());

        let bars = bar_of(&sections).expect("usage bar");
        assert_eq!(bars.bars[0], Datum::new("T1", 3.0));
        assert!(Section::notices(&sections).contains(&&Notice::Warning(
            "Please select one or two campaigns to display data.".to_string()
        )));
    }

    #[test]
    fn picked_campaign_gets_a_pie() {
        let session = session_with(vec![relationships()]);
        let mut selections = selections();
        selections.toggle_pick(PickTarget::TechniqueCampaigns, "C1", MAX_CAMPAIGNS);

        let sections = render_page(&session, &selections, &DashboardConfig::default());
        let pie = Section::charts(&sections)
            .into_iter()
            .find_map(|c| match c {
                Chart::Pie(p) => Some(p),
                _ => None,
            })
            .expect("campaign pie");
        assert_eq!(pie.slices.len(), 2);
        assert!(Section::notices(&sections).is_empty());
    }

    #[test]
    fn high_threshold_warns_instead_of_charting() {
        let session = session_with(vec![relationships()]);
        let mut selections = selections();
        selections.technique_min = 200;
        let sections = render_page(&session, &selections, &DashboardConfig::default());
        assert!(bar_of(&sections).is_none());
    }

    #[test]
    fn software_page_without_software_sheet_still_draws_the_pie() {
        let mut session = session_with(vec![relationships()]);
        session.navigate(Page::Software);
        let sections = render_page(&session, &selections(), &DashboardConfig::default());

        assert_eq!(Section::charts(&sections).len(), 1);
        assert_eq!(
            Section::notices(&sections),
            vec![&Notice::missing_sheet("software")]
        );
    }

    #[test]
    fn detection_threshold_excludes_the_boundary() {
        let mut rel = relationships();
        for _ in 0..3 {
            rel.push_row(
                ["DC1", "data-component", "T1", "technique", "detects", "T0001"]
                    .into_iter()
                    .map(CellValue::from)
                    .collect(),
            );
        }
        let mut session = session_with(vec![rel]);
        session.navigate(Page::Detection);
        let with_threshold = |threshold| DashboardConfig {
            coverage_threshold: threshold,
            ..DashboardConfig::default()
        };

        let default = render_page(&session, &selections(), &DashboardConfig::default());
        assert!(Section::charts(&default).is_empty());

        let at_boundary = render_page(&session, &selections(), &with_threshold(3));
        assert!(Section::charts(&at_boundary).is_empty());
        assert_eq!(
            Section::notices(&at_boundary),
            vec![&Notice::Warning("No Data Components appear in more than 3 relationships.".to_string())]
        );

        let below = render_page(&session, &selections(), &with_threshold(2));
        let charts = Section::charts(&below);
        assert_eq!(charts.len(), 2);
        match charts[1] {
            Chart::Scatter(s) => {
                assert_eq!((s.bubbles[0].x, s.bubbles[0].y), (3.0, 1.0));
            }
            other => panic!("expected bubble chart, got {other:?}"),
        }
    }

    #[test]
    fn software_slider_excludes_the_boundary() {
        let mut session = session_with(vec![relationships()]);
        session.navigate(Page::Software);
        let mut selections = selections();

        selections.software_min = 1;
        let at_boundary = render_page(&session, &selections, &DashboardConfig::default());
        assert!(Section::charts(&at_boundary).is_empty());
        assert_eq!(
            Section::notices(&at_boundary),
            vec![&Notice::Warning("No software is used more than 1 times.".to_string())]
        );

        selections.software_min = 0;
        let below = render_page(&session, &selections, &DashboardConfig::default());
        assert_eq!(Section::charts(&below).len(), 1);
    }

    #[test]
    fn technique_slider_keeps_the_boundary() {
        let session = session_with(vec![relationships()]);
        let mut selections = selections();
        selections.technique_min = 3;
        let sections = render_page(&session, &selections, &DashboardConfig::default());
        let bars = bar_of(&sections).expect("usage bar");
        assert_eq!(bars.bars, vec![Datum::new("T1", 3.0)]);
    }

    #[test]
    fn attribute_page_highlights_busiest_year() {
        let campaigns = Table::from_rows(
            "campaigns",
            &[NAME, FIRST_SEEN, LAST_SEEN],
            vec![
                vec!["C1", "2015-01-01", "2015-01-31"],
                vec!["C2", "2017-03-01", "2017-03-02"],
                vec!["C3", "2017-05-01", ""],
            ],
        );
        let mut session = session_with(vec![relationships(), campaigns]);
        session.navigate(Page::Attribute);
        let sections = render_page(&session, &selections(), &DashboardConfig::default());

        let table = sections
            .iter()
            .find_map(|s| match s {
                Section::Preview(p) if p.title == "Campaigns by Year" => Some(p),
                _ => None,
            })
            .expect("by-year table");
        assert_eq!(table.table.cells(0)[0], CellValue::Integer(2017));
        assert_eq!(table.highlight, Some((0, 2)));

        // Techniques sheet is absent, so only the tactics section is disabled.
        assert_eq!(
            Section::notices(&sections),
            vec![
                &Notice::missing_sheet("techniques"),
            ]
        );
        assert!(Section::charts(&sections)
            .iter()
            .any(|c| c.title() == "Campaign Duration vs. Techniques Count"));
    }
}
