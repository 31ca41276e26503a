use crate::color::ColorScale;
use crate::config::DashboardConfig;
use crate::data::analysis::{
    comparison_groups, group_technique_matrix, tactic_occurrences, tactic_platform_counts,
    target_frequency, target_types,
};
use crate::data::filter::{filter_table, offered_filters, FilterInputs};
use crate::data::model::Table;
use crate::data::schema::{SheetKind, NAME, PLATFORMS, TACTICS, TARGET_NAME, TARGET_TYPE};
use crate::data::text::{remove_stopwords, tfidf_weights};
use crate::error::Notice;
use crate::session::SessionContext;

use super::chart::{Chart, Datum, Heatmap, PieChart, Ring, Sunburst, WordCloud};
use super::{Control, PickTarget, Preview, Section, Selections};

/// Build the Explorer page for `sheet` (the first sheet when `None` or
/// unknown) with the sidebar filters applied.
pub fn explore(
    session: &SessionContext,
    sheet: Option<&str>,
    filters: &FilterInputs,
    selections: &Selections,
    config: &DashboardConfig,
) -> Vec<Section> {
    let Some(workbook) = session.workbook() else {
        return vec![Section::info("Open a workbook to begin.")];
    };
    let Some(table) = sheet
        .and_then(|name| workbook.sheet(name))
        .or_else(|| workbook.sheets().first())
    else {
        return vec![Section::info("The workbook has no sheets.")];
    };

    let fields = offered_filters(table);
    let filtered = filter_table(table, &filters.to_filter_set(&fields));
    log::debug!(
        "Explorer: {} of {} rows of '{}' pass the filters",
        filtered.len(),
        table.len(),
        table.name
    );

    let preview = if filtered.is_empty() {
        Section::warning("No rows match the selected filters.")
    } else {
        Section::Preview(Preview::new(table.name.clone(), &filtered, config))
    };

    vec![
        Section::Group {
            title: "Raw Data Preview".to_string(),
            sections: vec![
                Section::Text(format!("{} of {} rows", filtered.len(), table.len())),
                preview,
            ],
        },
        Section::Group {
            title: "Interactive Visualizations".to_string(),
            sections: tactic_sections(&filtered),
        },
        Section::Group {
            title: "TF-IDF Preview".to_string(),
            sections: vec![word_cloud(&filtered, config)],
        },
        Section::Group {
            title: "Group Techniques Comparison".to_string(),
            sections: group_comparison(session, selections),
        },
        Section::Group {
            title: "Attack Frequency".to_string(),
            sections: attack_frequency(session, selections, config),
        },
    ]
}

fn tactic_sections(table: &Table) -> Vec<Section> {
    if !table.has_column(TACTICS) {
        return vec![Section::Notice(Notice::missing_column(&table.name, TACTICS))];
    }

    let mut sections = Vec::new();
    if table.has_column(PLATFORMS) {
        let rings: Vec<Ring> = tactic_platform_counts(table)
            .into_iter()
            .map(|(platform, tactics)| Ring {
                label: platform,
                children: Datum::from_counts(&tactics),
            })
            .collect();
        sections.push(Section::Chart(Chart::Sunburst(Sunburst {
            title: "Tactics Distribution by Platform".to_string(),
            rings,
            scale: ColorScale::RdBu,
        })));
    } else {
        sections.push(Section::Notice(Notice::missing_column(&table.name, PLATFORMS)));
    }

    sections.push(Section::heading("Tactic Heatmap"));
    if !table.has_column(NAME) {
        sections.push(Section::Notice(Notice::missing_column(&table.name, NAME)));
        return sections;
    }
    let occurrences = tactic_occurrences(table);
    if occurrences.is_empty() {
        sections.push(Section::warning("No rows carry any tactic."));
        return sections;
    }
    sections.push(Section::Chart(Chart::Heatmap(Heatmap {
        title: "Tactic Occurrence Heatmap".to_string(),
        x_label: "Names".to_string(),
        y_label: "Tactics".to_string(),
        rows: occurrences.iter().map(|(t, _)| t.clone()).collect(),
        columns: vec![NAME.to_string()],
        values: occurrences.iter().map(|(_, n)| vec![*n as f64]).collect(),
        scale: ColorScale::Viridis,
        annotate: true,
    })));
    sections
}

fn word_cloud(table: &Table, config: &DashboardConfig) -> Section {
    if !table.has_column(NAME) {
        return Section::Notice(Notice::missing_column(&table.name, NAME));
    }
    // Every row is a document, even when nothing survives stop-word removal.
    let documents: Vec<String> = table
        .rows()
        .map(|r| r.text(NAME).map(|t| remove_stopwords(&t)).unwrap_or_default())
        .collect();
    let weights = tfidf_weights(&documents, config.word_cloud_terms);
    if weights.is_empty() {
        return Section::info("No text left in the 'name' column after removing stop-words.");
    }
    Section::Chart(Chart::WordCloud(WordCloud {
        title: "TF-IDF Word Cloud".to_string(),
        words: weights
            .into_iter()
            .map(|(word, weight)| Datum::new(word, weight))
            .collect(),
    }))
}

/// Notice when the relationships sheet lacks the given columns.
fn relationships_blocker(session: &SessionContext, columns: &[&str]) -> Option<Section> {
    let kind = SheetKind::Relationships;
    if session.tables().get(kind).is_none() {
        return Some(Section::Notice(Notice::missing_sheet(kind.sheet_name())));
    }
    session
        .capabilities()
        .first_missing(kind, columns)
        .map(|c| Section::Notice(Notice::missing_column(kind.sheet_name(), c)))
}

fn group_comparison(session: &SessionContext, selections: &Selections) -> Vec<Section> {
    if let Some(blocker) = relationships_blocker(session, SheetKind::Relationships.schema().required) {
        return vec![blocker];
    }
    let Some(relationships) = session.tables().relationships.as_ref() else {
        return Vec::new();
    };

    let groups = comparison_groups(relationships);
    if groups.is_empty() {
        return vec![Section::warning("No relationships link a group to a technique.")];
    }
    let picker = |target, label: &str| {
        Section::Control(Control::Pick {
            target,
            label: label.to_string(),
            options: groups.clone(),
        })
    };
    let mut sections = vec![Section::Columns(vec![
        vec![picker(PickTarget::FirstGroup, "Select Group 1")],
        vec![picker(PickTarget::SecondGroup, "Select Group 2")],
    ])];

    match (
        selections.single(PickTarget::FirstGroup),
        selections.single(PickTarget::SecondGroup),
    ) {
        (Some(first), Some(second)) => {
            let matrix = group_technique_matrix(relationships, first, second);
            sections.push(Section::Chart(Chart::Heatmap(Heatmap {
                title: format!("Techniques Used by {first} and {second}"),
                x_label: "Techniques".to_string(),
                y_label: "Groups".to_string(),
                rows: matrix.rows,
                columns: matrix.columns,
                values: matrix.values,
                scale: ColorScale::BlackBlue,
                annotate: true,
            })));
        }
        _ => sections.push(Section::Notice(Notice::Error(
            "Please select both Group 1 and Group 2 to compare their techniques.".to_string(),
        ))),
    }
    sections
}

fn attack_frequency(session: &SessionContext, selections: &Selections, config: &DashboardConfig) -> Vec<Section> {
    if let Some(blocker) = relationships_blocker(session, &[TARGET_NAME, TARGET_TYPE]) {
        return vec![blocker];
    }
    let Some(relationships) = session.tables().relationships.as_ref() else {
        return Vec::new();
    };

    let types = target_types(relationships);
    let Some(default_type) = types.first() else {
        return vec![Section::warning("No relationship has a target type.")];
    };
    let target_type = selections
        .single(PickTarget::TargetType)
        .filter(|t| types.iter().any(|known| known == t))
        .unwrap_or(default_type)
        .to_string();

    let mut sections = vec![Section::Control(Control::Pick {
        target: PickTarget::TargetType,
        label: "Select Target Type".to_string(),
        options: types.clone(),
    })];

    let counts = target_frequency(relationships, &target_type);
    let Some((top_name, top_count)) = counts.first() else {
        sections.push(Section::warning(format!(
            "No targets of type {target_type} were found."
        )));
        return sections;
    };

    sections.push(Section::Chart(Chart::Pie(PieChart {
        title: format!("Frequency of Target Names in Attacks ({target_type})"),
        slices: Datum::from_counts(&counts),
        scale: ColorScale::Blues,
        hole: 0.3,
    })));
    sections.push(Section::heading("Top Targeted Entities"));
    sections.push(Section::Text(format!(
        "The most frequent attack target of type {target_type} is {top_name} with {top_count} occurrences."
    )));
    let top: Vec<String> = counts
        .iter()
        .take(config.top_targets)
        .enumerate()
        .map(|(i, (name, n))| format!("{}. {name}: {n}", i + 1))
        .collect();
    sections.push(Section::Text(top.join("\n")));
    sections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Workbook;
    use crate::data::schema::{DOMAIN, MAPPING_TYPE, SOURCE_NAME, SOURCE_TYPE};
    use crate::session::UploadHandle;
    use std::path::PathBuf;

    fn session_with(sheets: Vec<Table>) -> SessionContext {
        let mut session = SessionContext::default();
        session.install(
            UploadHandle {
                path: PathBuf::from("attack.json"),
                len: 0,
                modified: None,
            },
            Workbook::new(sheets),
        );
        session
    }

    fn techniques() -> Table {
        Table::from_rows(
            "techniques",
            &["ID", NAME, DOMAIN, PLATFORMS, TACTICS],
            vec![
                vec!["T0001", "Command and Scripting Interpreter", "enterprise-attack", "Windows, Linux", "execution"],
                vec!["T0002", "Phishing for Information", "enterprise-attack", "Windows", "reconnaissance, initial-access"],
                vec!["T0003", "Data from Cloud Storage", "mobile-attack", "", "collection"],
            ],
        )
    }

    fn relationships() -> Table {
        Table::from_rows(
            "relationships",
            &[SOURCE_NAME, SOURCE_TYPE, TARGET_NAME, TARGET_TYPE, MAPPING_TYPE],
            vec![
                vec!["G1", "group", "T1", "technique", "uses"],
                vec!["G2", "group", "T2", "technique", "uses"],
                vec!["G1", "group", "S1", "software", "uses"],
                vec!["C1", "campaign", "T1", "technique", "uses"],
            ],
        )
    }

    fn group<'a>(sections: &'a [Section], title: &str) -> &'a [Section] {
        sections
            .iter()
            .find_map(|s| match s {
                Section::Group { title: t, sections } if t == title => Some(sections.as_slice()),
                _ => None,
            })
            .expect("group present")
    }

    fn defaults() -> (FilterInputs, Selections, DashboardConfig) {
        let config = DashboardConfig::default();
        (FilterInputs::default(), Selections::from_config(&config), config)
    }

    #[test]
    fn nothing_loaded_asks_for_a_workbook() {
        let (filters, selections, config) = defaults();
        let sections = explore(&SessionContext::default(), None, &filters, &selections, &config);
        assert_eq!(sections, vec![Section::info("Open a workbook to begin.")]);
    }

    #[test]
    fn filters_narrow_the_preview() {
        let session = session_with(vec![techniques()]);
        let (mut filters, selections, config) = defaults();
        filters.toggle(PLATFORMS, "Windows");
        filters.text.insert(NAME.to_string(), "phishing".to_string());

        let sections = explore(&session, Some("techniques"), &filters, &selections, &config);
        let preview = group(&sections, "Raw Data Preview");
        assert_eq!(preview[0], Section::Text("1 of 3 rows".to_string()));
    }

    #[test]
    fn filters_matching_nothing_warn_instead_of_previewing() {
        let session = session_with(vec![techniques()]);
        let (mut filters, selections, config) = defaults();
        filters.text.insert(NAME.to_string(), "no such technique".to_string());

        let sections = explore(&session, Some("techniques"), &filters, &selections, &config);
        assert_eq!(
            group(&sections, "Raw Data Preview"),
            &[
                Section::Text("0 of 3 rows".to_string()),
                Section::warning("No rows match the selected filters."),
            ]
        );
    }

    #[test]
    fn tactics_drive_sunburst_and_heatmap() {
        let session = session_with(vec![techniques()]);
        let (filters, selections, config) = defaults();
        let sections = explore(&session, None, &filters, &selections, &config);
        let charts = Section::charts(group(&sections, "Interactive Visualizations"));

        let Chart::Sunburst(sunburst) = charts[0] else {
            panic!("expected sunburst");
        };
        let windows = sunburst.rings.iter().find(|r| r.label == "Windows").unwrap();
        assert_eq!(windows.total(), 3.0);

        let Chart::Heatmap(heatmap) = charts[1] else {
            panic!("expected heatmap");
        };
        assert_eq!(heatmap.title, "Tactic Occurrence Heatmap");
        assert_eq!(heatmap.x_label, "Names");
        assert_eq!(heatmap.rows.len(), 4);
    }

    #[test]
    fn sheet_without_tactics_gets_an_info() {
        let session = session_with(vec![relationships()]);
        let (filters, selections, config) = defaults();
        let sections = explore(&session, Some("relationships"), &filters, &selections, &config);
        assert_eq!(
            Section::notices(group(&sections, "Interactive Visualizations")),
            vec![&Notice::missing_column("relationships", TACTICS)]
        );
    }

    #[test]
    fn word_cloud_drops_stopwords() {
        let session = session_with(vec![techniques()]);
        let (filters, selections, config) = defaults();
        let sections = explore(&session, None, &filters, &selections, &config);
        let Some(Chart::WordCloud(cloud)) = Section::charts(group(&sections, "TF-IDF Preview")).first().copied() else {
            panic!("expected word cloud");
        };
        assert!(cloud.words.iter().all(|w| w.label != "and" && w.label != "from"));
        assert!(cloud.words.iter().any(|w| w.label == "phishing"));
    }

    #[test]
    fn stopword_only_names_still_count_as_documents() {
        let table = Table::from_rows(
            "techniques",
            &[NAME],
            vec![vec!["of the"], vec!["alpha beta"], vec!["alpha gamma"]],
        );
        let session = session_with(vec![table]);
        let (filters, selections, config) = defaults();
        let sections = explore(&session, None, &filters, &selections, &config);
        let Some(Chart::WordCloud(cloud)) = Section::charts(group(&sections, "TF-IDF Preview")).first().copied() else {
            panic!("expected word cloud");
        };
        let weight = |word: &str| cloud.words.iter().find(|w| w.label == word).map(|w| w.value).unwrap();
        assert!((weight("alpha") - 1.2108).abs() < 1e-3);
        assert!((weight("beta") - 0.7959).abs() < 1e-3);
    }

    #[test]
    fn comparison_needs_both_groups() {
        let session = session_with(vec![techniques(), relationships()]);
        let (filters, mut selections, config) = defaults();
        selections.set_single(PickTarget::FirstGroup, "G1".to_string());

        let sections = explore(&session, None, &filters, &selections, &config);
        let comparison = group(&sections, "Group Techniques Comparison");
        assert!(matches!(Section::notices(comparison).as_slice(), [Notice::Error(_)]));

        selections.set_single(PickTarget::SecondGroup, "G2".to_string());
        let sections = explore(&session, None, &filters, &selections, &config);
        let Some(Chart::Heatmap(matrix)) = Section::charts(group(&sections, "Group Techniques Comparison")).first().copied() else {
            panic!("expected comparison heatmap");
        };
        assert_eq!(matrix.columns, vec!["T1", "T2"]);
        assert_eq!(matrix.values, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn attack_frequency_defaults_to_first_target_type() {
        let session = session_with(vec![relationships()]);
        let (filters, selections, config) = defaults();
        let sections = explore(&session, None, &filters, &selections, &config);
        let frequency = group(&sections, "Attack Frequency");

        let Some(Chart::Pie(pie)) = Section::charts(frequency).first().copied() else {
            panic!("expected donut");
        };
        assert_eq!(pie.hole, 0.3);
        assert_eq!(pie.slices[0], Datum::new("T1", 2.0));
        assert!(frequency.contains(&Section::Text(
            "The most frequent attack target of type technique is T1 with 2 occurrences.".to_string()
        )));
    }

    #[test]
    fn missing_relationships_disables_only_relationship_sections() {
        let session = session_with(vec![techniques()]);
        let (filters, selections, config) = defaults();
        let sections = explore(&session, None, &filters, &selections, &config);
        assert_eq!(
            Section::notices(&sections),
            vec![
                &Notice::missing_sheet("relationships"),
                &Notice::missing_sheet("relationships"),
            ]
        );
    }
}
