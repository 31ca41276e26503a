//! Derived tables behind every chart.
//!
//! All functions are pure: they take the sheets or relationship slices they
//! need as arguments and return fresh values.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use super::filter::explode_tags;
use super::model::{CellValue, Table};
use super::relationships::{EntityType, Relationship};
use super::schema::{
    FIRST_SEEN, ID, LAST_SEEN, NAME, PLATFORMS, SOURCE_NAME, SOURCE_TYPE, TACTICS, TARGET_ID,
    TARGET_NAME, TARGET_TYPE,
};

/// `(label, count)` pairs.
pub type Counts = Vec<(String, usize)>;

// ---------------------------------------------------------------------------
// Counting helpers
// ---------------------------------------------------------------------------

/// Tally labels, ordered by count descending; ties keep first appearance.
fn tally<I, S>(labels: I) -> Counts
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in labels {
        let label = label.into();
        match counts.get_mut(&label) {
            Some(n) => *n += 1,
            None => {
                counts.insert(label.clone(), 1);
                order.push(label);
            }
        }
    }
    let mut out: Counts = order
        .into_iter()
        .map(|label| {
            let n = counts.get(&label).copied().unwrap_or_default();
            (label, n)
        })
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

/// Tally labels, ordered by label.
fn tally_sorted<I, S>(labels: I) -> Counts
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label.into()).or_default() += 1;
    }
    counts.into_iter().collect()
}

/// Occurrences of each non-null value of `column`.
pub fn value_counts(table: &Table, column: &str) -> Counts {
    tally(table.rows().filter_map(|r| r.text(column).map(|t| t.into_owned())))
}

/// Target-name counts of a relationship slice, keeping those used at least
/// `min_count` times.
pub fn usage_counts(slice: &Table, min_count: usize) -> Counts {
    target_counts_where(slice, |n| n >= min_count)
}

/// Target-name counts of a relationship slice, keeping those used more than
/// `threshold` times.
pub fn usage_counts_above(slice: &Table, threshold: usize) -> Counts {
    target_counts_where(slice, |n| n > threshold)
}

fn target_counts_where(slice: &Table, keep: impl Fn(usize) -> bool) -> Counts {
    value_counts(slice, TARGET_NAME)
        .into_iter()
        .filter(|(_, n)| keep(*n))
        .collect()
}

/// Distinct values of `column` over rows where `filter_column == expected`,
/// in first-appearance order.
fn distinct_where(table: &Table, column: &str, filter_column: &str, expected: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();
    table
        .rows()
        .filter(|r| r.is(filter_column, expected))
        .filter_map(|r| r.text(column).map(|t| t.into_owned()))
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Software
// ---------------------------------------------------------------------------

/// Sum software usage per platform, joining the usage counts with the
/// software sheet's comma-separated `platforms`. Ordered by platform.
///
/// Software without a sheet entry, or with no platforms, contributes nothing.
pub fn platform_usage(software_counts: &Counts, software_sheet: &Table) -> Counts {
    let mut platforms_by_name: HashMap<String, Vec<String>> = HashMap::new();
    for row in software_sheet.rows() {
        let (Some(name), Some(platforms)) = (row.text(NAME), row.text(PLATFORMS)) else {
            continue;
        };
        platforms_by_name
            .entry(name.into_owned())
            .or_default()
            .extend(explode_tags(&platforms).map(str::to_string));
    }

    let mut totals: BTreeMap<String, usize> = BTreeMap::new();
    for (software, count) in software_counts {
        for platform in platforms_by_name.get(software).into_iter().flatten() {
            *totals.entry(platform.clone()).or_default() += count;
        }
    }
    totals.into_iter().collect()
}

// ---------------------------------------------------------------------------
// Detection / mitigation
// ---------------------------------------------------------------------------

/// How much one detecting or mitigating entry covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coverage {
    pub source: String,
    /// Relationship rows naming this source.
    pub count: usize,
    /// Distinct techniques those rows target.
    pub techniques: usize,
}

/// Sources of a detection or mitigation slice appearing in more than
/// `threshold` rows, most frequent first.
pub fn source_coverage(slice: &Table, threshold: usize) -> Vec<Coverage> {
    let mut techniques: HashMap<String, BTreeSet<String>> = HashMap::new();
    for row in slice.rows() {
        if let (Some(source), Some(target)) = (row.text(SOURCE_NAME), row.text(TARGET_NAME)) {
            techniques
                .entry(source.into_owned())
                .or_default()
                .insert(target.into_owned());
        }
    }

    value_counts(slice, SOURCE_NAME)
        .into_iter()
        .filter(|(_, n)| *n > threshold)
        .map(|(source, count)| Coverage {
            techniques: techniques.get(&source).map_or(0, BTreeSet::len),
            source,
            count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Campaigns
// ---------------------------------------------------------------------------

/// Campaigns appearing as a source in a technique-use slice.
pub fn campaigns_using_techniques(slice: &Table) -> Vec<String> {
    distinct_where(slice, SOURCE_NAME, SOURCE_TYPE, EntityType::Campaign.as_str())
}

/// Technique counts for one campaign.
pub fn campaign_technique_counts(slice: &Table, campaign: &str) -> Counts {
    tally(
        slice
            .rows()
            .filter(|r| r.is(SOURCE_NAME, campaign))
            .filter_map(|r| r.text(TARGET_NAME).map(|t| t.into_owned())),
    )
}

/// Campaigns attributed to each group, most active first.
pub fn group_campaign_counts(attribution: &Table) -> Counts {
    let mut counts = tally_sorted(
        attribution
            .rows()
            .filter(|r| r.text(SOURCE_NAME).is_some())
            .filter_map(|r| r.text(TARGET_NAME).map(|t| t.into_owned())),
    );
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Lenient date parsing for `first seen` / `last seen` cells.
///
/// Unparseable values yield `None` and are left out of every aggregation.
pub fn parse_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Integer(year) if (1900..=2200).contains(year) => {
            NaiveDate::from_ymd_opt(*year as i32, 1, 1)
        }
        CellValue::String(s) | CellValue::Date(s) => parse_date_text(s.trim()),
        _ => None,
    }
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%d %B %Y"];
    const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|ts| ts.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|ts| ts.date_naive()))
        // "September 2015"
        .or_else(|| NaiveDate::parse_from_str(&format!("1 {s}"), "%d %B %Y").ok())
}

/// Number of campaigns first seen in each year.
pub fn campaigns_per_year(campaigns: &Table) -> BTreeMap<i32, usize> {
    let mut counts = BTreeMap::new();
    for row in campaigns.rows() {
        if let Some(date) = row.get(FIRST_SEEN).and_then(parse_date) {
            *counts.entry(date.year()).or_default() += 1;
        }
    }
    counts
}

/// Campaign names first seen in one year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearBucket {
    pub year: i32,
    pub campaigns: Vec<String>,
}

impl YearBucket {
    pub fn count(&self) -> usize {
        self.campaigns.len()
    }
}

/// Campaigns grouped by first-seen year, most recent year first.
pub fn campaigns_by_year(campaigns: &Table) -> Vec<YearBucket> {
    let mut buckets: BTreeMap<i32, Vec<String>> = BTreeMap::new();
    for row in campaigns.rows() {
        let Some(date) = row.get(FIRST_SEEN).and_then(parse_date) else {
            continue;
        };
        if let Some(name) = row.text(NAME) {
            buckets.entry(date.year()).or_default().push(name.into_owned());
        }
    }
    buckets
        .into_iter()
        .rev()
        .map(|(year, campaigns)| YearBucket { year, campaigns })
        .collect()
}

/// Duration and technique breadth of one campaign.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CampaignSpan {
    pub name: String,
    /// `last seen - first seen` in days; `None` when either date is missing.
    pub duration_days: Option<i64>,
    /// Distinct techniques the campaign uses (0 when it uses none).
    pub techniques: usize,
}

/// Campaign durations joined with their distinct technique counts.
pub fn campaign_durations(campaigns: &Table, technique_slice: &Table) -> Vec<CampaignSpan> {
    let mut techniques: HashMap<String, BTreeSet<String>> = HashMap::new();
    for row in technique_slice.rows() {
        if let (Some(source), Some(target)) = (row.text(SOURCE_NAME), row.text(TARGET_NAME)) {
            techniques
                .entry(source.into_owned())
                .or_default()
                .insert(target.into_owned());
        }
    }

    campaigns
        .rows()
        .filter_map(|row| {
            let name = row.text(NAME)?.into_owned();
            let first = row.get(FIRST_SEEN).and_then(parse_date);
            let last = row.get(LAST_SEEN).and_then(parse_date);
            let duration_days = first.zip(last).map(|(f, l)| (l - f).num_days());
            Some(CampaignSpan {
                techniques: techniques.get(&name).map_or(0, BTreeSet::len),
                name,
                duration_days,
            })
        })
        .collect()
}

/// Tactics behind one campaign's techniques, joining the slice's
/// `target ID` with the techniques sheet `ID`. Ordered by tactic.
pub fn campaign_tactic_counts(slice: &Table, techniques_sheet: &Table, campaign: &str) -> Counts {
    let tactics_by_id: HashMap<String, String> = techniques_sheet
        .rows()
        .filter_map(|r| Some((r.text(ID)?.into_owned(), r.text(TACTICS)?.into_owned())))
        .collect();

    let mut tactics = Vec::new();
    for row in slice.rows().filter(|r| r.is(SOURCE_NAME, campaign)) {
        let Some(id) = row.text(TARGET_ID) else {
            continue;
        };
        if let Some(list) = tactics_by_id.get(&*id) {
            tactics.extend(explode_tags(list).map(str::to_string));
        }
    }
    tally_sorted(tactics)
}

// ---------------------------------------------------------------------------
// Techniques sheet
// ---------------------------------------------------------------------------

/// Rows per (platform, tactic) pair with both columns exploded, for the
/// platform → tactic sunburst. Ordered by platform, then tactic.
pub fn tactic_platform_counts(table: &Table) -> Vec<(String, Counts)> {
    let mut nested: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
    for row in table.rows() {
        let (Some(tactics), Some(platforms)) = (row.text(TACTICS), row.text(PLATFORMS)) else {
            continue;
        };
        for platform in explode_tags(&platforms) {
            let inner = nested.entry(platform.to_string()).or_default();
            for tactic in explode_tags(&tactics) {
                *inner.entry(tactic.to_string()).or_default() += 1;
            }
        }
    }
    nested
        .into_iter()
        .map(|(platform, tactics)| (platform, tactics.into_iter().collect()))
        .collect()
}

/// Named rows per tactic (exploded), ordered by tactic.
pub fn tactic_occurrences(table: &Table) -> Counts {
    let mut tactics = Vec::new();
    for row in table.rows().filter(|r| r.text(NAME).is_some()) {
        if let Some(list) = row.text(TACTICS) {
            tactics.extend(explode_tags(&list).map(str::to_string));
        }
    }
    tally_sorted(tactics)
}

// ---------------------------------------------------------------------------
// Relationships sheet
// ---------------------------------------------------------------------------

/// (group, technique) pairs from any relationship linking the two kinds in
/// either direction.
fn group_technique_pairs(relationships: &Table) -> Vec<(String, String)> {
    relationships
        .rows()
        .filter_map(|row| Relationship::from_row(&row))
        .filter_map(|rel| match (&rel.source_type, &rel.target_type) {
            (EntityType::Group, EntityType::Technique) => Some((rel.source_name, rel.target_name)),
            (EntityType::Technique, EntityType::Group) => Some((rel.target_name, rel.source_name)),
            _ => None,
        })
        .collect()
}

/// Groups that can be compared, in first-appearance order.
pub fn comparison_groups(relationships: &Table) -> Vec<String> {
    let mut seen = BTreeSet::new();
    group_technique_pairs(relationships)
        .into_iter()
        .map(|(group, _)| group)
        .filter(|g| seen.insert(g.clone()))
        .collect()
}

/// A 0/1 matrix with labelled rows and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryMatrix {
    pub rows: Vec<String>,
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

/// Which techniques each of two groups uses: one row per group, one column
/// per technique used by either.
pub fn group_technique_matrix(relationships: &Table, first: &str, second: &str) -> BinaryMatrix {
    let pairs = group_technique_pairs(relationships);
    let used = |group: &str| -> BTreeSet<String> {
        pairs
            .iter()
            .filter(|(g, _)| g == group)
            .map(|(_, t)| t.clone())
            .collect()
    };
    let first_used = used(first);
    let second_used = used(second);
    let columns: Vec<String> = first_used.union(&second_used).cloned().collect();

    let row = |set: &BTreeSet<String>| -> Vec<f64> {
        columns
            .iter()
            .map(|t| if set.contains(t) { 1.0 } else { 0.0 })
            .collect()
    };
    let values = vec![row(&first_used), row(&second_used)];

    BinaryMatrix {
        rows: vec![first.to_string(), second.to_string()],
        columns,
        values,
    }
}

/// Distinct target types, in first-appearance order.
pub fn target_types(relationships: &Table) -> Vec<String> {
    let mut seen = BTreeSet::new();
    relationships
        .rows()
        .filter_map(|r| r.text(TARGET_TYPE).map(|t| t.into_owned()))
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Target-name counts among relationships of one target type.
pub fn target_frequency(relationships: &Table, target_type: &str) -> Counts {
    tally(
        relationships
            .rows()
            .filter(|r| r.is(TARGET_TYPE, target_type))
            .filter_map(|r| r.text(TARGET_NAME).map(|t| t.into_owned())),
    )
}
