//! Prefix-based grouping for datasets without a curated dictionary.

use crate::grouping::{insert_unique, tables::infer_unit};
use crate::model::{DenominatorPolicy, GroupSpec, GroupSpecMap};
use indexmap::IndexMap;
use std::collections::HashMap;

const MIN_GROUPABLE_TOKENS: usize = 3;
const MIN_PREFIX_TOKENS: usize = 2;

pub fn tokenize(name: &str) -> Vec<&str> {
    name.split('_').filter(|token| !token.is_empty()).collect()
}

fn prefixes<'a>(tokens: &'a [&'a str]) -> impl Iterator<Item = String> + 'a {
    (MIN_PREFIX_TOKENS..tokens.len()).map(move |len| tokens[..len].join("_"))
}

/// Partitions columns by their longest prefix shared with at least one other
/// column. Columns with fewer than three tokens, or with no shared prefix,
/// form singleton groups keyed by their own identifier. Groups keep the order
/// in which their first member was seen.
pub fn group_columns<S: AsRef<str>>(columns: &[S]) -> IndexMap<String, Vec<String>> {
    let mut tokenized: IndexMap<&str, Vec<&str>> = IndexMap::new();
    for column in columns {
        let name = column.as_ref();
        tokenized.entry(name).or_insert_with(|| tokenize(name));
    }

    let mut prefix_counts: HashMap<String, usize> = HashMap::new();
    for tokens in tokenized.values() {
        if tokens.len() < MIN_GROUPABLE_TOKENS {
            continue;
        }
        for prefix in prefixes(tokens) {
            *prefix_counts.entry(prefix).or_default() += 1;
        }
    }

    let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
    for (name, tokens) in &tokenized {
        let mut best = None;
        if tokens.len() >= MIN_GROUPABLE_TOKENS {
            for prefix in prefixes(tokens) {
                if prefix_counts.get(&prefix).copied().unwrap_or(0) >= 2 {
                    best = Some(prefix);
                }
            }
        }
        let key = best.unwrap_or_else(|| (*name).to_string());
        groups.entry(key).or_default().push((*name).to_string());
    }
    groups
}

/// `n_tipo_viv` -> `Tipo Viv`
pub fn humanize_group(key: &str) -> String {
    let trimmed = key.strip_prefix("n_").unwrap_or(key);
    trimmed
        .replace('_', " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Turns fallback groups into sum-of-members specifications, keeping the
/// grouper's insertion order.
pub fn fallback_specs<S: AsRef<str>>(columns: &[S]) -> GroupSpecMap {
    let mut specs = GroupSpecMap::new();
    for (key, members) in group_columns(columns) {
        let title = humanize_group(&key);
        let title = if title.is_empty() { key.clone() } else { title };
        let unit = infer_unit(&members);
        let spec = GroupSpec::new(title, members, DenominatorPolicy::SumOfMembers)
            .with_total("Total")
            .with_unit(unit);
        insert_unique(&mut specs, spec);
    }
    specs
}
