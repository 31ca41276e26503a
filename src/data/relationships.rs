use std::fmt;

use super::model::{Row, Table};
use super::schema::{MAPPING_TYPE, SOURCE_NAME, SOURCE_TYPE, TARGET_NAME, TARGET_TYPE};

// ---------------------------------------------------------------------------
// Vocabulary
// ---------------------------------------------------------------------------

/// Relation kind between two catalog entries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MappingType {
    Uses,
    Detects,
    Mitigates,
    AttributedTo,
    Other(String),
}

impl MappingType {
    pub fn parse(tag: &str) -> Self {
        match tag.trim() {
            "uses" => MappingType::Uses,
            "detects" => MappingType::Detects,
            "mitigates" => MappingType::Mitigates,
            "attributed-to" => MappingType::AttributedTo,
            other => MappingType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            MappingType::Uses => "uses",
            MappingType::Detects => "detects",
            MappingType::Mitigates => "mitigates",
            MappingType::AttributedTo => "attributed-to",
            MappingType::Other(s) => s,
        }
    }
}

/// Kind of catalog entry on either end of a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityType {
    Technique,
    Software,
    Group,
    Campaign,
    DataComponent,
    Mitigation,
    Other(String),
}

impl EntityType {
    pub fn parse(tag: &str) -> Self {
        match tag.trim() {
            "technique" => EntityType::Technique,
            "software" => EntityType::Software,
            "group" => EntityType::Group,
            "campaign" => EntityType::Campaign,
            "data-component" | "datacomponent" => EntityType::DataComponent,
            "mitigation" => EntityType::Mitigation,
            other => EntityType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Technique => "technique",
            EntityType::Software => "software",
            EntityType::Group => "group",
            EntityType::Campaign => "campaign",
            EntityType::DataComponent => "data-component",
            EntityType::Mitigation => "mitigation",
            EntityType::Other(s) => s,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One typed row of the relationships sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub source_name: String,
    pub source_type: EntityType,
    pub target_name: String,
    pub target_type: EntityType,
    pub mapping_type: MappingType,
}

impl Relationship {
    /// `None` when any of the five columns is absent or blank.
    pub fn from_row(row: &Row<'_>) -> Option<Self> {
        Some(Self {
            source_name: row.text(SOURCE_NAME)?.into_owned(),
            source_type: EntityType::parse(&row.text(SOURCE_TYPE)?),
            target_name: row.text(TARGET_NAME)?.into_owned(),
            target_type: EntityType::parse(&row.text(TARGET_TYPE)?),
            mapping_type: MappingType::parse(&row.text(MAPPING_TYPE)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Slicing
// ---------------------------------------------------------------------------

/// Which fixed subset a relationship row falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SliceKind {
    TechniqueUse,
    SoftwareUse,
    Detection,
    Mitigation,
    Attribution,
}

impl SliceKind {
    pub const ALL: [SliceKind; 5] = [
        SliceKind::TechniqueUse,
        SliceKind::SoftwareUse,
        SliceKind::Detection,
        SliceKind::Mitigation,
        SliceKind::Attribution,
    ];

    /// Exact `(mapping type, target type)` pair selecting this slice.
    pub fn key(self) -> (MappingType, EntityType) {
        match self {
            SliceKind::TechniqueUse => (MappingType::Uses, EntityType::Technique),
            SliceKind::SoftwareUse => (MappingType::Uses, EntityType::Software),
            SliceKind::Detection => (MappingType::Detects, EntityType::Technique),
            SliceKind::Mitigation => (MappingType::Mitigates, EntityType::Technique),
            SliceKind::Attribution => (MappingType::AttributedTo, EntityType::Group),
        }
    }

    /// Slice of a relationship row; `None` when it matches no pair.
    pub fn classify(row: &Row<'_>) -> Option<SliceKind> {
        let mapping = MappingType::parse(&row.text(MAPPING_TYPE)?);
        let target = EntityType::parse(&row.text(TARGET_TYPE)?);
        SliceKind::ALL
            .into_iter()
            .find(|kind| kind.key() == (mapping.clone(), target.clone()))
    }
}

/// The five relationship subsets every chart reads from.
///
/// Rows keep their order from the source table and no row lands in more
/// than one subset.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipSlices {
    pub techniques: Table,
    pub software: Table,
    pub detection: Table,
    pub mitigation: Table,
    pub attribution: Table,
}

impl RelationshipSlices {
    pub fn get(&self, kind: SliceKind) -> &Table {
        match kind {
            SliceKind::TechniqueUse => &self.techniques,
            SliceKind::SoftwareUse => &self.software,
            SliceKind::Detection => &self.detection,
            SliceKind::Mitigation => &self.mitigation,
            SliceKind::Attribution => &self.attribution,
        }
    }
}

/// Partition a relationships table into its five fixed subsets.
pub fn slice_relationships(table: &Table) -> RelationshipSlices {
    let mut buckets: [Vec<usize>; 5] = Default::default();
    for (i, row) in table.rows().enumerate() {
        if let Some(kind) = SliceKind::classify(&row) {
            buckets[kind as usize].push(i);
        }
    }
    let [techniques, software, detection, mitigation, attribution] =
        buckets.map(|indices| table.select(&indices));
    let slices = RelationshipSlices {
        techniques,
        software,
        detection,
        mitigation,
        attribution,
    };
    log::debug!("Sliced {} relationships", table.len());
    for kind in SliceKind::ALL {
        let (mapping, target) = kind.key();
        log::debug!("  {} {target}: {} rows", mapping.as_str(), slices.get(kind).len());
    }
    slices
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: [&str; 5] = [SOURCE_NAME, SOURCE_TYPE, TARGET_NAME, TARGET_TYPE, MAPPING_TYPE];

    fn relationships() -> Table {
        Table::from_rows(
            "relationships",
            &COLUMNS,
            vec![
                vec!["APT28", "group", "T1059", "technique", "uses"],
                vec!["APT28", "group", "Mimikatz", "software", "uses"],
                vec!["Process Creation", "data-component", "T1059", "technique", "detects"],
                vec!["Execution Prevention", "mitigation", "T1059", "technique", "mitigates"],
                vec!["C0010", "campaign", "APT28", "group", "attributed-to"],
                vec!["Mimikatz", "software", "T1003", "technique", "uses"],
                vec!["T1059", "technique", "T1059.001", "technique", "subtechnique-of"],
            ],
        )
    }

    #[test]
    fn every_row_lands_in_at_most_one_slice() {
        let table = relationships();
        let slices = slice_relationships(&table);

        assert_eq!(slices.techniques.len(), 2);
        assert_eq!(slices.software.len(), 1);
        assert_eq!(slices.detection.len(), 1);
        assert_eq!(slices.mitigation.len(), 1);
        assert_eq!(slices.attribution.len(), 1);

        let total: usize = SliceKind::ALL.iter().map(|k| slices.get(*k).len()).sum();
        assert!(total <= table.len());
    }

    #[test]
    fn slicing_is_idempotent() {
        let table = relationships();
        assert_eq!(slice_relationships(&table), slice_relationships(&table));

        let slices = slice_relationships(&table);
        let again = slice_relationships(&slices.techniques);
        assert_eq!(again.techniques, slices.techniques);
        assert!(again.software.is_empty());
    }

    #[test]
    fn unknown_tags_are_kept_as_other() {
        let table = relationships();
        let row = table.row(6).expect("row");
        let rel = Relationship::from_row(&row).expect("relationship");
        assert_eq!(rel.mapping_type, MappingType::Other("subtechnique-of".into()));
        assert_eq!(SliceKind::classify(&row), None);
    }
}
