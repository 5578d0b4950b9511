use crate::analysis::format::{format_number, format_percentage};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum::{Display, EnumString};

/// Declared types that count as numeric indicator columns.
pub const NUMERIC_TYPES: &[&str] = &[
    "integer",
    "smallinteger",
    "mediumint",
    "double",
    "real",
    "float",
];

/// Per-column sums across the selected entities.
pub type ColumnSums = BTreeMap<String, f64>;

/// Column identifier to human label (or detail text).
pub type ColumnText = BTreeMap<String, String>;

/// Final, ordered collection of group specifications keyed by title.
pub type GroupSpecMap = IndexMap<String, GroupSpec>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub declared_type: String,
    pub label: Option<String>,
    pub detail: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            label: None,
            detail: None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        let declared = self.declared_type.trim().to_ascii_lowercase();
        NUMERIC_TYPES.contains(&declared.as_str())
    }

    /// Numeric column whose identifier carries the indicator prefix.
    pub fn is_indicator(&self, prefix: &str) -> bool {
        self.name.starts_with(prefix) && self.is_numeric()
    }
}

/// `(tema, subtema)` pair that keys a base group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TopicKey {
    pub topic: String,
    pub subtopic: String,
}

impl TopicKey {
    pub fn new(topic: impl Into<String>, subtopic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            subtopic: subtopic.into(),
        }
    }
}

impl fmt::Display for TopicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.topic, self.subtopic)
    }
}

/// One row of the curated variable dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub topic: String,
    pub subtopic: String,
    pub column: String,
    pub label: String,
    pub detail: String,
}

impl DictionaryEntry {
    pub fn topic_key(&self) -> TopicKey {
        TopicKey::new(self.topic.clone(), self.subtopic.clone())
    }
}

/// One field of a layer dictionary sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerField {
    pub field: String,
    pub dtype: String,
    pub description: String,
    pub display: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Unit {
    Personas,
    Hogares,
    Viviendas,
}

/// What a group's percentages are computed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "column", rename_all = "kebab-case")]
pub enum DenominatorPolicy {
    /// Divide by the raw sum of this column.
    Column(String),
    SumOfMembers,
    PerCategory,
    /// No denominator; percentages stay empty and no total row is emitted.
    NoTotal,
}

impl DenominatorPolicy {
    pub fn column(&self) -> Option<&str> {
        match self {
            DenominatorPolicy::Column(column) => Some(column.as_str()),
            _ => None,
        }
    }

    pub fn is_per_category(&self) -> bool {
        matches!(self, DenominatorPolicy::PerCategory)
    }
}

impl fmt::Display for DenominatorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenominatorPolicy::Column(column) => write!(f, "{column}"),
            DenominatorPolicy::SumOfMembers => write!(f, "sum-of-members"),
            DenominatorPolicy::PerCategory => write!(f, "per-category"),
            DenominatorPolicy::NoTotal => write!(f, "no-total"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub title: String,
    pub variables: Vec<String>,
    pub denominator: DenominatorPolicy,
    /// Label of the synthesized total/subtotal rows; `None` suppresses them
    /// for single-denominator policies.
    pub total_label: Option<String>,
    pub category_column: Option<String>,
    pub category_map: IndexMap<String, String>,
    pub labels: BTreeMap<String, String>,
    pub unit: Option<Unit>,
    /// Dictionary topics the group was derived from.
    pub sources: Vec<TopicKey>,
}

impl GroupSpec {
    pub fn new(
        title: impl Into<String>,
        variables: Vec<String>,
        denominator: DenominatorPolicy,
    ) -> Self {
        Self {
            title: title.into(),
            variables,
            denominator,
            total_label: None,
            category_column: None,
            category_map: IndexMap::new(),
            labels: BTreeMap::new(),
            unit: None,
            sources: Vec::new(),
        }
    }

    pub fn with_total(mut self, label: impl Into<String>) -> Self {
        self.total_label = Some(label.into());
        self
    }

    pub fn with_unit(mut self, unit: Option<Unit>) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_categories(
        mut self,
        category_column: impl Into<String>,
        category_map: IndexMap<String, String>,
    ) -> Self {
        self.category_column = Some(category_column.into());
        self.category_map = category_map;
        self
    }

    pub fn with_label(mut self, column: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(column.into(), label.into());
        self
    }

    pub fn with_sources(mut self, sources: Vec<TopicKey>) -> Self {
        self.sources = sources;
        self
    }

    pub fn category_of(&self, column: &str) -> Option<&str> {
        self.category_map.get(column).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub label: String,
    /// Source column; `None` for synthesized total and subtotal rows.
    pub column: Option<String>,
    pub raw_value: f64,
    /// `raw_value` after the display rounding policy.
    pub value: f64,
    pub percentage: Option<f64>,
    pub is_total: bool,
    pub is_subtotal: bool,
    pub category: Option<String>,
}

impl AggregatedRow {
    pub fn is_member(&self) -> bool {
        !self.is_total && !self.is_subtotal
    }

    pub fn display_value(&self) -> String {
        format_number(self.value)
    }

    pub fn display_percentage(&self) -> String {
        self.percentage.map(format_percentage).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeParagraph {
    pub heading: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub unit: Option<Unit>,
    pub rows: Vec<AggregatedRow>,
    pub category_column: Option<String>,
    pub denominator: DenominatorPolicy,
    pub narratives: Vec<NarrativeParagraph>,
}

impl Report {
    pub fn member_rows(&self) -> impl Iterator<Item = &AggregatedRow> {
        self.rows.iter().filter(|row| row.is_member())
    }

    pub fn total_row(&self) -> Option<&AggregatedRow> {
        self.rows.iter().find(|row| row.is_total && !row.is_subtotal)
    }

    /// Distinct category tags in first-seen order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for category in self.rows.iter().filter_map(|row| row.category.as_deref()) {
            if !seen.contains(&category) {
                seen.push(category);
            }
        }
        seen
    }

    pub fn rows_in_category<'a>(&'a self, category: &'a str) -> Vec<&'a AggregatedRow> {
        self.rows
            .iter()
            .filter(|row| row.category.as_deref() == Some(category))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedRow {
    pub group: String,
    pub unit: Option<Unit>,
    #[serde(flatten)]
    pub row: AggregatedRow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ReportBundle {
    pub reports: Vec<Report>,
    pub combined_rows: Vec<ConsolidatedRow>,
}

impl ReportBundle {
    pub fn new(reports: Vec<Report>) -> Self {
        let combined_rows = reports
            .iter()
            .flat_map(|report| {
                report.rows.iter().map(|row| ConsolidatedRow {
                    group: report.title.clone(),
                    unit: report.unit,
                    row: row.clone(),
                })
            })
            .collect();
        Self {
            reports,
            combined_rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}
