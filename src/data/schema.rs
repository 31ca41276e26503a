//! Column vocabulary of an ATT&CK export and the capabilities derived from it.
//!
//! Every sheet the dashboard knows about has one [`SheetSchema`]; the
//! schema is checked once when a workbook is loaded and the outcome is kept
//! in a [`Capabilities`] record, so page builders ask "is this column
//! there?" without poking at tables.

use std::collections::{BTreeMap, BTreeSet};

use super::model::{Table, Workbook};

pub const NAME: &str = "name";
pub const ID: &str = "ID";
pub const DOMAIN: &str = "domain";
pub const PLATFORMS: &str = "platforms";
pub const TACTICS: &str = "tactics";
pub const SOURCE_NAME: &str = "source name";
pub const SOURCE_TYPE: &str = "source type";
pub const TARGET_NAME: &str = "target name";
pub const TARGET_TYPE: &str = "target type";
pub const TARGET_ID: &str = "target ID";
pub const MAPPING_TYPE: &str = "mapping type";
pub const FIRST_SEEN: &str = "first seen";
pub const LAST_SEEN: &str = "last seen";

/// The four sheets the session keeps as derived tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SheetKind {
    Techniques,
    Software,
    Relationships,
    Campaigns,
}

impl SheetKind {
    pub const ALL: [SheetKind; 4] = [
        SheetKind::Techniques,
        SheetKind::Software,
        SheetKind::Relationships,
        SheetKind::Campaigns,
    ];

    /// Exact sheet name expected in the workbook.
    pub fn sheet_name(self) -> &'static str {
        self.schema().name
    }

    pub fn schema(self) -> &'static SheetSchema {
        match self {
            SheetKind::Techniques => &TECHNIQUES,
            SheetKind::Software => &SOFTWARE,
            SheetKind::Relationships => &RELATIONSHIPS,
            SheetKind::Campaigns => &CAMPAIGNS,
        }
    }
}

/// Required and optional columns of one sheet.
#[derive(Debug)]
pub struct SheetSchema {
    pub name: &'static str,
    /// Without these the sheet's dependent views are disabled.
    pub required: &'static [&'static str],
    /// These only gate individual sections.
    pub optional: &'static [&'static str],
}

static TECHNIQUES: SheetSchema = SheetSchema {
    name: "techniques",
    required: &[ID, NAME],
    optional: &[DOMAIN, PLATFORMS, TACTICS],
};

static SOFTWARE: SheetSchema = SheetSchema {
    name: "software",
    required: &[NAME],
    optional: &[ID, DOMAIN, PLATFORMS],
};

static RELATIONSHIPS: SheetSchema = SheetSchema {
    name: "relationships",
    required: &[SOURCE_NAME, SOURCE_TYPE, TARGET_NAME, TARGET_TYPE, MAPPING_TYPE],
    optional: &[TARGET_ID],
};

static CAMPAIGNS: SheetSchema = SheetSchema {
    name: "campaigns",
    required: &[NAME],
    optional: &[ID, FIRST_SEEN, LAST_SEEN],
};

/// What one sheet of the loaded workbook offers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetCapabilities {
    pub columns: BTreeSet<String>,
    pub missing_required: Vec<&'static str>,
    pub missing_optional: Vec<&'static str>,
}

impl SheetCapabilities {
    fn check(schema: &SheetSchema, table: &Table) -> Self {
        let columns: BTreeSet<String> = table.columns.iter().cloned().collect();
        let absent = |wanted: &[&'static str]| -> Vec<&'static str> {
            wanted.iter().copied().filter(|c| !columns.contains(*c)).collect()
        };
        let missing_required = absent(schema.required);
        let missing_optional = absent(schema.optional);
        Self {
            columns,
            missing_required,
            missing_optional,
        }
    }

    /// All required columns are present.
    pub fn is_complete(&self) -> bool {
        self.missing_required.is_empty()
    }
}

/// Per-sheet outcome of the schema check, computed once per upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    sheets: BTreeMap<SheetKind, SheetCapabilities>,
}

impl Capabilities {
    pub fn from_workbook(workbook: &Workbook) -> Self {
        let sheets = SheetKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let schema = kind.schema();
                workbook
                    .sheet(schema.name)
                    .map(|table| (kind, SheetCapabilities::check(schema, table)))
            })
            .collect();
        Self { sheets }
    }

    pub fn sheet(&self, kind: SheetKind) -> Option<&SheetCapabilities> {
        self.sheets.get(&kind)
    }

    /// The sheet exists and carries every required column.
    pub fn ready(&self, kind: SheetKind) -> bool {
        self.sheet(kind).is_some_and(SheetCapabilities::is_complete)
    }

    pub fn has_column(&self, kind: SheetKind, column: &str) -> bool {
        self.sheet(kind).is_some_and(|s| s.columns.contains(column))
    }

    /// First column of `columns` the sheet lacks, if any.
    pub fn first_missing<'c>(&self, kind: SheetKind, columns: &[&'c str]) -> Option<&'c str> {
        columns
            .iter()
            .copied()
            .find(|c| !self.has_column(kind, c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_report_missing_sheets_and_columns() {
        let workbook = Workbook::new(vec![
            Table::from_rows::<&str>("techniques", &["ID", "name", "tactics"], vec![]),
            Table::from_rows::<&str>("relationships", &["source name", "target name"], vec![]),
        ]);
        let caps = Capabilities::from_workbook(&workbook);

        assert!(caps.ready(SheetKind::Techniques));
        assert_eq!(
            caps.sheet(SheetKind::Techniques).map(|s| s.missing_optional.clone()),
            Some(vec![DOMAIN, PLATFORMS])
        );
        assert!(caps.has_column(SheetKind::Techniques, TACTICS));
        assert!(!caps.has_column(SheetKind::Techniques, PLATFORMS));

        assert!(caps.sheet(SheetKind::Relationships).is_some());
        assert!(!caps.ready(SheetKind::Relationships));
        assert_eq!(
            caps.first_missing(SheetKind::Relationships, &[SOURCE_NAME, MAPPING_TYPE]),
            Some(MAPPING_TYPE)
        );

        assert!(caps.sheet(SheetKind::Campaigns).is_none());
        assert!(!caps.ready(SheetKind::Software));
    }
}
