use crate::grouping::rules::{BaseGroups, OverrideRule, RuleContext, default_rules};
use crate::grouping::tables::{UNCLASSIFIED_TITLE, infer_unit, is_geographic_topic, topical_rank};
use crate::grouping::{fallback_specs, insert_unique};
use crate::model::{
    ColumnText, DenominatorPolicy, DictionaryEntry, GroupSpec, GroupSpecMap, LayerField, TopicKey,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Output of a build: ordered specifications plus the column metadata maps
/// used by listings and exporters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltGroups {
    pub specs: GroupSpecMap,
    pub labels: ColumnText,
    pub details: ColumnText,
    /// Available columns no group claimed.
    pub unclassified: Vec<String>,
}

impl BuiltGroups {
    pub fn titles(&self) -> Vec<&str> {
        self.specs.keys().map(String::as_str).collect()
    }
}

pub struct GroupSpecBuilder {
    rules: Vec<Box<dyn OverrideRule>>,
    include_unclassified: bool,
}

impl Default for GroupSpecBuilder {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            include_unclassified: true,
        }
    }
}

impl GroupSpecBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(mut self, rules: Vec<Box<dyn OverrideRule>>) -> Self {
        self.rules = rules;
        self
    }

    pub fn include_unclassified(mut self, include: bool) -> Self {
        self.include_unclassified = include;
        self
    }

    /// Dictionary-driven build. Never fails: columns without a home end up in
    /// the diagnostic group or in the log.
    pub fn build(&self, dictionary: &[DictionaryEntry], available: &[String]) -> BuiltGroups {
        let available_set: BTreeSet<String> = available.iter().cloned().collect();

        let mut labels = ColumnText::new();
        let mut details = ColumnText::new();
        let mut geographic = BTreeSet::new();
        let mut grouped: BTreeMap<TopicKey, Vec<String>> = BTreeMap::new();
        let mut seen = BTreeSet::new();

        for entry in dictionary {
            if !available_set.contains(&entry.column) {
                continue;
            }
            if !seen.insert(entry.column.clone()) {
                debug!(column = %entry.column, "duplicate dictionary entry ignored");
                continue;
            }
            labels.insert(entry.column.clone(), entry.label.clone());
            details.insert(entry.column.clone(), entry.detail.clone());
            if is_geographic_topic(&entry.topic) {
                geographic.insert(entry.column.clone());
            }
            grouped
                .entry(entry.topic_key())
                .or_default()
                .push(entry.column.clone());
        }
        let mut base: BaseGroups = grouped.into_iter().collect();

        let ctx = RuleContext {
            available: &available_set,
            labels: &labels,
        };

        let mut specs = GroupSpecMap::new();
        for rule in &self.rules {
            if !rule.applies(&base, &ctx) {
                debug!(rule = rule.name(), "override skipped");
                continue;
            }
            let outcome = rule.apply(&base, &ctx);
            debug!(
                rule = rule.name(),
                specs = outcome.specs.len(),
                consumed = outcome.consumed.len(),
                "override applied"
            );
            for spec in outcome.specs {
                if !spec.variables.is_empty() {
                    insert_unique(&mut specs, spec);
                }
            }
            for key in &outcome.consumed {
                base.shift_remove(key);
            }
        }

        for (key, columns) in base {
            if columns.is_empty() || is_geographic_topic(&key.topic) {
                continue;
            }
            let unit = infer_unit(&columns);
            let title = match unit {
                Some(unit) => format!("{} ({unit})", key.subtopic),
                None => key.subtopic.clone(),
            };
            let spec = GroupSpec::new(title, columns, DenominatorPolicy::SumOfMembers)
                .with_total("Total")
                .with_unit(unit)
                .with_sources(vec![key]);
            insert_unique(&mut specs, spec);
        }

        let unclassified = unclassified_columns(&specs, available, &geographic);
        if !unclassified.is_empty() {
            warn!(
                count = unclassified.len(),
                columns = %unclassified.join(","),
                "available columns matched no group"
            );
            if self.include_unclassified {
                let spec = GroupSpec::new(
                    UNCLASSIFIED_TITLE,
                    unclassified.clone(),
                    DenominatorPolicy::NoTotal,
                )
                .with_unit(infer_unit(&unclassified));
                insert_unique(&mut specs, spec);
            }
        }

        let specs = sort_specs(specs);
        info!(groups = specs.len(), "built group specifications");
        BuiltGroups {
            specs,
            labels,
            details,
            unclassified,
        }
    }

    /// Tokenizer-driven build for datasets without a curated dictionary.
    /// Labels and details come from the layer dictionary when one is given.
    pub fn build_fallback(&self, available: &[String], layer: &[LayerField]) -> BuiltGroups {
        let specs = fallback_specs(available);
        let mut labels = ColumnText::new();
        let mut details = ColumnText::new();
        for field in layer {
            if !available.contains(&field.field) {
                continue;
            }
            if !field.description.is_empty() {
                labels.insert(field.field.clone(), field.description.clone());
            }
            if !field.display.is_empty() {
                details.insert(field.field.clone(), field.display.clone());
            }
        }
        info!(groups = specs.len(), "built fallback group specifications");
        BuiltGroups {
            specs,
            labels,
            details,
            unclassified: Vec::new(),
        }
    }
}

fn unclassified_columns(
    specs: &GroupSpecMap,
    available: &[String],
    geographic: &BTreeSet<String>,
) -> Vec<String> {
    let mut claimed: BTreeSet<&str> = BTreeSet::new();
    for spec in specs.values() {
        claimed.extend(spec.variables.iter().map(String::as_str));
        if let Some(column) = spec.denominator.column() {
            claimed.insert(column);
        }
    }
    let mut seen = BTreeSet::new();
    available
        .iter()
        .filter(|column| !claimed.contains(column.as_str()) && !geographic.contains(*column))
        .filter(|column| seen.insert(column.as_str()))
        .cloned()
        .collect()
}

fn sort_specs(specs: GroupSpecMap) -> GroupSpecMap {
    let mut ordered: Vec<GroupSpec> = specs.into_values().collect();
    ordered.sort_by(|a, b| {
        topical_rank(a)
            .cmp(&topical_rank(b))
            .then_with(|| a.title.cmp(&b.title))
    });
    ordered
        .into_iter()
        .map(|spec| (spec.title.clone(), spec))
        .collect()
}
