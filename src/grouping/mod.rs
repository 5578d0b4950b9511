//! Turning indicator columns into titled, ordered group specifications.

pub mod builder;
pub mod rules;
pub mod tables;
pub mod tokenize;

pub use builder::{BuiltGroups, GroupSpecBuilder};
pub use rules::{BaseGroups, OverrideRule, RuleContext, RuleOutcome, default_rules};
pub use tokenize::{fallback_specs, group_columns, humanize_group, tokenize};

use crate::model::{GroupSpec, GroupSpecMap};
use tracing::warn;

/// Inserts `spec` under its title, renaming it `"{title} (n)"` when the title
/// is already taken. Returns the title actually used.
pub fn insert_unique(specs: &mut GroupSpecMap, mut spec: GroupSpec) -> String {
    if specs.contains_key(&spec.title) {
        let original = spec.title.clone();
        let mut suffix = 2usize;
        let mut candidate = format!("{original} ({suffix})");
        while specs.contains_key(&candidate) {
            suffix += 1;
            candidate = format!("{original} ({suffix})");
        }
        warn!(title = %original, renamed = %candidate, "group title collision");
        spec.title = candidate;
    }
    let title = spec.title.clone();
    specs.insert(title.clone(), spec);
    title
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DenominatorPolicy;

    #[test]
    fn colliding_titles_get_numeric_suffixes() {
        let mut specs = GroupSpecMap::new();
        for _ in 0..3 {
            insert_unique(
                &mut specs,
                GroupSpec::new("Edad", vec!["n_a".into()], DenominatorPolicy::SumOfMembers),
            );
        }
        let titles: Vec<&str> = specs.keys().map(String::as_str).collect();
        assert_eq!(titles, vec!["Edad", "Edad (2)", "Edad (3)"]);
        assert_eq!(specs["Edad (3)"].title, "Edad (3)");
    }
}
