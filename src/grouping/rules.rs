//! Domain overrides that reshape dictionary base groups into publication
//! tables.
//!
//! Each rule reads base groups by exact `(tema, subtema)` key, synthesizes its
//! own specifications and reports which keys it consumed. Rules run in the
//! order returned by [`default_rules`]; a later rule never sees a key consumed
//! by an earlier one.

use crate::grouping::tables::{
    CategoryRule, OTHER_CATEGORY, SERVICE_CATEGORIES, dispatch_category, strip_label_prefix,
};
use crate::model::{ColumnText, DenominatorPolicy, GroupSpec, TopicKey, Unit};
use indexmap::IndexMap;
use std::collections::BTreeSet;

pub const POPULATION_TOPIC: &str = "2. Variables de Población (Personas)";
pub const HOUSING_TOPIC: &str = "4. Viviendas y Hogares";

const TOTAL_POPULATION: &str = "Población total";
const TOTAL_HOUSEHOLDS: &str = "Total hogares";
const SUBTOTAL: &str = "Subtotal";

/// Dictionary columns partitioned by topic key, restricted to available ones.
pub type BaseGroups = IndexMap<TopicKey, Vec<String>>;

pub struct RuleContext<'a> {
    pub available: &'a BTreeSet<String>,
    pub labels: &'a ColumnText,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RuleOutcome {
    pub specs: Vec<GroupSpec>,
    pub consumed: Vec<TopicKey>,
}

pub trait OverrideRule: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the rule has anything to do. A rule that does not apply is
    /// skipped and consumes nothing.
    fn applies(&self, base: &BaseGroups, ctx: &RuleContext<'_>) -> bool;

    fn apply(&self, base: &BaseGroups, ctx: &RuleContext<'_>) -> RuleOutcome;
}

fn members<'a>(base: &'a BaseGroups, key: &TopicKey) -> &'a [String] {
    base.get(key).map(Vec::as_slice).unwrap_or(&[])
}

fn present(base: &BaseGroups, key: &TopicKey) -> bool {
    !members(base, key).is_empty()
}

/// Sex breakdown divided by the total population column. The total column is
/// listed as a member so no synthesized total row is needed.
pub struct SexRule {
    sources: Vec<TopicKey>,
    columns: Vec<&'static str>,
    denominator: &'static str,
    title: &'static str,
}

impl Default for SexRule {
    fn default() -> Self {
        Self {
            sources: vec![
                TopicKey::new(POPULATION_TOPIC, "Sexo"),
                TopicKey::new(POPULATION_TOPIC, "General"),
            ],
            columns: vec!["n_hombres", "n_mujeres", "n_per"],
            denominator: "n_per",
            title: "Población según sexo",
        }
    }
}

impl SexRule {
    fn selected(&self, base: &BaseGroups, ctx: &RuleContext<'_>) -> Vec<String> {
        self.columns
            .iter()
            .filter(|column| {
                ctx.available.contains(**column)
                    || self
                        .sources
                        .iter()
                        .any(|key| members(base, key).iter().any(|m| m.as_str() == **column))
            })
            .map(|column| column.to_string())
            .collect()
    }
}

impl OverrideRule for SexRule {
    fn name(&self) -> &str {
        "sex"
    }

    /// Applies whenever a source group exists, so `Sexo` and `General` are
    /// consumed even when none of the sex columns is available.
    fn applies(&self, base: &BaseGroups, ctx: &RuleContext<'_>) -> bool {
        self.sources.iter().any(|key| base.contains_key(key))
            || !self.selected(base, ctx).is_empty()
    }

    fn apply(&self, base: &BaseGroups, ctx: &RuleContext<'_>) -> RuleOutcome {
        let sources: Vec<TopicKey> = self
            .sources
            .iter()
            .filter(|key| base.contains_key(*key))
            .cloned()
            .collect();
        let selected = self.selected(base, ctx);
        let specs = if selected.is_empty() {
            Vec::new()
        } else {
            vec![
                GroupSpec::new(
                    self.title,
                    selected,
                    DenominatorPolicy::Column(self.denominator.to_string()),
                )
                .with_unit(Some(Unit::Personas))
                .with_sources(sources),
            ]
        };
        RuleOutcome {
            specs,
            consumed: self.sources.clone(),
        }
    }
}

/// Renames one base group and gives it a fixed denominator policy.
pub struct SingleGroupRule {
    pub name: &'static str,
    pub key: TopicKey,
    pub title: &'static str,
    pub denominator: DenominatorPolicy,
    pub total_label: &'static str,
    pub unit: Unit,
}

impl OverrideRule for SingleGroupRule {
    fn name(&self) -> &str {
        self.name
    }

    fn applies(&self, base: &BaseGroups, _ctx: &RuleContext<'_>) -> bool {
        present(base, &self.key)
    }

    fn apply(&self, base: &BaseGroups, _ctx: &RuleContext<'_>) -> RuleOutcome {
        let spec = GroupSpec::new(
            self.title,
            members(base, &self.key).to_vec(),
            self.denominator.clone(),
        )
        .with_total(self.total_label)
        .with_unit(Some(self.unit))
        .with_sources(vec![self.key.clone()]);
        RuleOutcome {
            specs: vec![spec],
            consumed: vec![self.key.clone()],
        }
    }
}

/// Splits a base group into single-column groups, one per known column.
/// Columns of the group without a split entry are dropped with the group.
pub struct SplitRule {
    pub name: &'static str,
    pub key: TopicKey,
    pub splits: Vec<(&'static str, &'static str)>,
    pub denominator: &'static str,
    pub total_label: &'static str,
    pub unit: Unit,
}

impl OverrideRule for SplitRule {
    fn name(&self) -> &str {
        self.name
    }

    fn applies(&self, base: &BaseGroups, _ctx: &RuleContext<'_>) -> bool {
        present(base, &self.key)
    }

    fn apply(&self, base: &BaseGroups, _ctx: &RuleContext<'_>) -> RuleOutcome {
        let group = members(base, &self.key);
        let specs = self
            .splits
            .iter()
            .filter(|(column, _)| group.iter().any(|member| member.as_str() == *column))
            .map(|(column, title)| {
                GroupSpec::new(
                    *title,
                    vec![column.to_string()],
                    DenominatorPolicy::Column(self.denominator.to_string()),
                )
                .with_total(self.total_label)
                .with_unit(Some(self.unit))
                .with_sources(vec![self.key.clone()])
            })
            .collect();
        RuleOutcome {
            specs,
            consumed: vec![self.key.clone()],
        }
    }
}

/// Merges several base groups into one per-category table, each source group
/// becoming one category.
pub struct CategoryMergeRule {
    pub name: &'static str,
    pub parts: Vec<(TopicKey, &'static str)>,
    pub title: &'static str,
    pub category_column: &'static str,
    pub unit: Unit,
}

impl OverrideRule for CategoryMergeRule {
    fn name(&self) -> &str {
        self.name
    }

    fn applies(&self, base: &BaseGroups, _ctx: &RuleContext<'_>) -> bool {
        self.parts.iter().any(|(key, _)| present(base, key))
    }

    fn apply(&self, base: &BaseGroups, _ctx: &RuleContext<'_>) -> RuleOutcome {
        let mut variables = Vec::new();
        let mut category_map = IndexMap::new();
        let mut sources = Vec::new();
        for (key, category) in &self.parts {
            let group = members(base, key);
            if group.is_empty() {
                continue;
            }
            sources.push(key.clone());
            for column in group {
                category_map.insert(column.clone(), category.to_string());
                variables.push(column.clone());
            }
        }
        let spec = GroupSpec::new(self.title, variables, DenominatorPolicy::PerCategory)
            .with_total(SUBTOTAL)
            .with_categories(self.category_column, category_map)
            .with_unit(Some(self.unit))
            .with_sources(sources);
        RuleOutcome {
            specs: vec![spec],
            consumed: self.parts.iter().map(|(key, _)| key.clone()).collect(),
        }
    }
}

/// Turns one base group into a per-category table, assigning categories by
/// column prefix and compacting member labels.
pub struct CategoryDispatchRule {
    pub name: &'static str,
    pub key: TopicKey,
    pub table: &'static [CategoryRule],
    pub title: &'static str,
    pub category_column: &'static str,
    pub unit: Unit,
}

impl OverrideRule for CategoryDispatchRule {
    fn name(&self) -> &str {
        self.name
    }

    fn applies(&self, base: &BaseGroups, _ctx: &RuleContext<'_>) -> bool {
        present(base, &self.key)
    }

    fn apply(&self, base: &BaseGroups, ctx: &RuleContext<'_>) -> RuleOutcome {
        let variables = members(base, &self.key).to_vec();
        let mut category_map = IndexMap::new();
        let mut labels = Vec::new();
        for column in &variables {
            let rule = dispatch_category(self.table, column);
            let category = rule.map(|r| r.category).unwrap_or(OTHER_CATEGORY);
            category_map.insert(column.clone(), category.to_string());

            let label_prefix = rule.and_then(|r| r.label_prefix);
            if let (Some(prefix), Some(label)) = (label_prefix, ctx.labels.get(column)) {
                let compact = strip_label_prefix(label, prefix);
                if &compact != label {
                    labels.push((column.clone(), compact));
                }
            }
        }

        let mut spec = GroupSpec::new(self.title, variables, DenominatorPolicy::PerCategory)
            .with_total(SUBTOTAL)
            .with_categories(self.category_column, category_map)
            .with_unit(Some(self.unit))
            .with_sources(vec![self.key.clone()]);
        for (column, label) in labels {
            spec = spec.with_label(column, label);
        }
        RuleOutcome {
            specs: vec![spec],
            consumed: vec![self.key.clone()],
        }
    }
}

/// The fixed override sequence.
pub fn default_rules() -> Vec<Box<dyn OverrideRule>> {
    let pob = |subtopic: &str| TopicKey::new(POPULATION_TOPIC, subtopic);
    let viv = |subtopic: &str| TopicKey::new(HOUSING_TOPIC, subtopic);
    let per_population = || DenominatorPolicy::Column("n_per".to_string());
    let per_household = || DenominatorPolicy::Column("n_hog".to_string());

    vec![
        Box::new(SexRule::default()),
        Box::new(SingleGroupRule {
            name: "age",
            key: pob("Edad"),
            title: "Población según tramos de edad",
            denominator: DenominatorPolicy::SumOfMembers,
            total_label: "Total",
            unit: Unit::Personas,
        }),
        Box::new(SingleGroupRule {
            name: "disability",
            key: pob("Discapacidad"),
            title: "Discapacidad",
            denominator: per_population(),
            total_label: TOTAL_POPULATION,
            unit: Unit::Personas,
        }),
        Box::new(SplitRule {
            name: "ethnicity",
            key: pob("Etnicidad"),
            splits: vec![
                ("n_pueblos_orig", "Población pueblos originarios"),
                ("n_afrodescendencia", "Población afrodescendiente"),
                ("n_lengua_indigena", "Hablantes de lengua indígena"),
            ],
            denominator: "n_per",
            total_label: TOTAL_POPULATION,
            unit: Unit::Personas,
        }),
        Box::new(SingleGroupRule {
            name: "religion",
            key: pob("Religión"),
            title: "Población con religión",
            denominator: per_population(),
            total_label: TOTAL_POPULATION,
            unit: Unit::Personas,
        }),
        Box::new(SingleGroupRule {
            name: "ict",
            key: viv("TICs"),
            title: "TICs (Hogares)",
            denominator: per_household(),
            total_label: TOTAL_HOUSEHOLDS,
            unit: Unit::Hogares,
        }),
        Box::new(SingleGroupRule {
            name: "tenure",
            key: viv("Tenencia"),
            title: "Tenencia de vivienda (Hogares)",
            denominator: per_household(),
            total_label: TOTAL_HOUSEHOLDS,
            unit: Unit::Hogares,
        }),
        Box::new(CategoryMergeRule {
            name: "materials",
            parts: vec![
                (viv("Materialidad Paredes"), "Pared"),
                (viv("Materialidad Piso"), "Piso"),
                (viv("Materialidad Techo"), "Techo"),
            ],
            title: "Materialidad de la vivienda (Viviendas)",
            category_column: "Elemento",
            unit: Unit::Viviendas,
        }),
        Box::new(CategoryDispatchRule {
            name: "basic-services",
            key: viv("Servicios Básicos"),
            table: SERVICE_CATEGORIES,
            title: "Servicios básicos (Viviendas)",
            category_column: "Tipo",
            unit: Unit::Viviendas,
        }),
    ]
}
