use std::collections::{BTreeMap, BTreeSet};

use super::model::{Row, Table};
use super::schema::{DOMAIN, NAME, PLATFORMS, TACTICS};

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// One column-level test applied to every row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Case-insensitive substring match on a free-text column.
    Contains { column: String, needle: String },
    /// Membership in a user-selected set. With `tags` the cell is split on
    /// `,` first and the row passes when any tag is selected.
    OneOf {
        column: String,
        selected: BTreeSet<String>,
        tags: bool,
    },
}

impl Predicate {
    /// An empty needle or an empty selection constrains nothing.
    pub fn is_active(&self) -> bool {
        match self {
            Predicate::Contains { needle, .. } => !needle.trim().is_empty(),
            Predicate::OneOf { selected, .. } => !selected.is_empty(),
        }
    }

    fn matches(&self, row: &Row<'_>) -> bool {
        match self {
            Predicate::Contains { column, needle } => row
                .text(column)
                .is_some_and(|t| t.to_lowercase().contains(&needle.trim().to_lowercase())),
            Predicate::OneOf {
                column,
                selected,
                tags,
            } => match row.text(column) {
                Some(text) if *tags => explode_tags(&text).any(|tag| selected.contains(tag)),
                Some(text) => selected.contains(&*text),
                None => false,
            },
        }
    }
}

/// A conjunction of predicates. The empty set keeps every row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    predicates: Vec<Predicate>,
}

impl FilterSet {
    #[cfg(test)]
    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn active(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter().filter(|p| p.is_active())
    }

    pub fn is_identity(&self) -> bool {
        self.active().next().is_none()
    }
}

/// Split a multi-valued cell (`"Windows, macOS"`) into trimmed tags.
pub fn explode_tags(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|t| !t.is_empty())
}

/// Apply `filters` and return the surviving rows as a new table.
///
/// Predicates naming a column the table lacks reject every row; the UI
/// never builds such predicates because [`offered_filters`] skips absent
/// columns.
pub fn filter_table(table: &Table, filters: &FilterSet) -> Table {
    if filters.is_identity() {
        return table.clone();
    }
    table.filter_rows(|row| filters.active().all(|p| p.matches(row)))
}

// ---------------------------------------------------------------------------
// Filter widgets offered for a sheet
// ---------------------------------------------------------------------------

/// How a filterable column is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Free-text box, substring match.
    Text,
    /// Multi-select over whole cell values.
    Categorical,
    /// Multi-select over comma-separated tags.
    Tags,
}

/// A filter widget the side panel should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterField {
    pub column: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    /// Sorted options for multi-selects; empty for text fields.
    pub options: Vec<String>,
}

const FIELDS: [(&str, &str, FieldKind); 4] = [
    (NAME, "Name contains", FieldKind::Text),
    (DOMAIN, "Domain", FieldKind::Categorical),
    (PLATFORMS, "Platforms", FieldKind::Tags),
    (TACTICS, "Tactics", FieldKind::Tags),
];

/// The filter widgets available for `table`: only columns that exist.
pub fn offered_filters(table: &Table) -> Vec<FilterField> {
    FIELDS
        .iter()
        .filter(|(column, _, _)| table.has_column(column))
        .map(|&(column, label, kind)| FilterField {
            column,
            label,
            kind,
            options: field_options(table, column, kind),
        })
        .collect()
}

fn field_options(table: &Table, column: &str, kind: FieldKind) -> Vec<String> {
    let mut options = BTreeSet::new();
    match kind {
        FieldKind::Text => {}
        FieldKind::Categorical => {
            options.extend(table.rows().filter_map(|r| r.text(column).map(|t| t.into_owned())));
        }
        FieldKind::Tags => {
            for row in table.rows() {
                if let Some(text) = row.text(column) {
                    options.extend(explode_tags(&text).map(str::to_string));
                }
            }
        }
    }
    options.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Widget inputs → predicates
// ---------------------------------------------------------------------------

/// Raw widget state for the selected sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterInputs {
    pub text: BTreeMap<String, String>,
    pub selections: BTreeMap<String, BTreeSet<String>>,
}

impl FilterInputs {
    /// Toggle a single option of a multi-select.
    pub fn toggle(&mut self, column: &str, value: &str) {
        let selected = self.selections.entry(column.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.to_string());
        }
    }

    /// Build the predicate set for the offered fields.
    pub fn to_filter_set(&self, fields: &[FilterField]) -> FilterSet {
        let mut set = FilterSet::default();
        for field in fields {
            match field.kind {
                FieldKind::Text => {
                    if let Some(needle) = self.text.get(field.column) {
                        set.push(Predicate::Contains {
                            column: field.column.to_string(),
                            needle: needle.clone(),
                        });
                    }
                }
                FieldKind::Categorical | FieldKind::Tags => {
                    if let Some(selected) = self.selections.get(field.column) {
                        set.push(Predicate::OneOf {
                            column: field.column.to_string(),
                            selected: selected.clone(),
                            tags: field.kind == FieldKind::Tags,
                        });
                    }
                }
            }
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn techniques() -> Table {
        Table::from_rows(
            "techniques",
            &["ID", "name", "domain", "platforms", "tactics"],
            vec![
                vec!["T1003", "OS Credential Dumping", "enterprise-attack", "Windows, Linux, macOS", "credential-access"],
                vec!["T1059", "Command and Scripting Interpreter", "enterprise-attack", "Windows", "execution"],
                vec!["T0807", "Command-Line Interface", "ics-attack", "None", "execution"],
            ],
        )
    }

    fn ids(table: &Table) -> Vec<String> {
        table
            .rows()
            .filter_map(|r| r.text("ID").map(|t| t.into_owned()))
            .collect()
    }

    #[test]
    fn empty_filter_set_is_identity() {
        let table = techniques();
        assert_eq!(filter_table(&table, &FilterSet::default()), table);

        let inactive = FilterSet::new(vec![Predicate::Contains {
            column: NAME.into(),
            needle: "  ".into(),
        }]);
        assert_eq!(filter_table(&table, &inactive), table);
    }

    #[test]
    fn substring_match_ignores_case() {
        let filters = FilterSet::new(vec![Predicate::Contains {
            column: NAME.into(),
            needle: "COMMAND".into(),
        }]);
        assert_eq!(ids(&filter_table(&techniques(), &filters)), ["T1059", "T0807"]);
    }

    #[test]
    fn tag_membership_explodes_comma_separated_cells() {
        let filters = FilterSet::new(vec![Predicate::OneOf {
            column: PLATFORMS.into(),
            selected: BTreeSet::from(["Linux".to_string()]),
            tags: true,
        }]);
        assert_eq!(ids(&filter_table(&techniques(), &filters)), ["T1003"]);
    }

    #[test]
    fn predicates_are_conjunctive_and_never_add_rows() {
        let table = techniques();
        let filters = FilterSet::new(vec![
            Predicate::OneOf {
                column: DOMAIN.into(),
                selected: BTreeSet::from(["enterprise-attack".to_string()]),
                tags: false,
            },
            Predicate::OneOf {
                column: TACTICS.into(),
                selected: BTreeSet::from(["execution".to_string()]),
                tags: true,
            },
        ]);
        let filtered = filter_table(&table, &filters);
        assert_eq!(filtered.columns, table.columns);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.rows().all(|r| table.rows().any(|t| t.cells() == r.cells())));
    }

    #[test]
    fn only_present_columns_are_offered() {
        let table = Table::from_rows("software", &["name", "platforms"], vec![vec!["Mimikatz", "Windows, Linux"]]);
        let fields = offered_filters(&table);
        let columns: Vec<_> = fields.iter().map(|f| f.column).collect();
        assert_eq!(columns, vec![NAME, PLATFORMS]);
        assert_eq!(fields[1].options, vec!["Linux".to_string(), "Windows".to_string()]);
    }

    #[test]
    fn inputs_become_predicates_for_offered_fields() {
        let table = techniques();
        let fields = offered_filters(&table);
        let mut inputs = FilterInputs::default();
        inputs.toggle(TACTICS, "execution");
        inputs.toggle(TACTICS, "credential-access");
        inputs.toggle(TACTICS, "credential-access");

        let set = inputs.to_filter_set(&fields);
        assert_eq!(ids(&filter_table(&table, &set)), ["T1059", "T0807"]);
    }
}
