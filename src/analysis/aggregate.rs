//! Sums to report rows.
//!
//! Percentages are always computed from raw sums; only the displayed `value`
//! goes through [`display_round`].

use crate::analysis::format::{display_round, percentage};
use crate::grouping::tables::OTHER_CATEGORY;
use crate::model::{AggregatedRow, ColumnSums, ColumnText, DenominatorPolicy, GroupSpec, Report};
use indexmap::IndexMap;
use tracing::{debug, warn};

const DEFAULT_SUBTOTAL_LABEL: &str = "Subtotal";

fn raw_sum(sums: &ColumnSums, column: &str) -> f64 {
    match sums.get(column) {
        Some(value) if value.is_finite() => *value,
        Some(_) | None => {
            debug!(column, "column missing from sums, treated as zero");
            0.0
        }
    }
}

fn label_for(spec: &GroupSpec, labels: &ColumnText, column: &str) -> String {
    spec.labels
        .get(column)
        .or_else(|| labels.get(column))
        .filter(|label| !label.trim().is_empty())
        .cloned()
        .unwrap_or_else(|| column.to_string())
}

fn member_row(
    spec: &GroupSpec,
    labels: &ColumnText,
    column: &str,
    raw: f64,
    denominator: Option<f64>,
    category: Option<String>,
) -> AggregatedRow {
    AggregatedRow {
        label: label_for(spec, labels, column),
        column: Some(column.to_string()),
        raw_value: raw,
        value: display_round(raw),
        percentage: denominator.and_then(|denom| percentage(raw, denom)),
        is_total: false,
        is_subtotal: false,
        category,
    }
}

fn total_row(label: String, raw: f64, category: Option<String>, is_subtotal: bool) -> AggregatedRow {
    AggregatedRow {
        label,
        column: None,
        raw_value: raw,
        value: display_round(raw),
        percentage: percentage(raw, raw),
        is_total: true,
        is_subtotal,
        category,
    }
}

/// Builds the report rows for one group. Missing columns and a missing
/// denominator count as zero; the affected percentages stay empty.
pub fn aggregate(spec: &GroupSpec, sums: &ColumnSums, labels: &ColumnText) -> Report {
    let rows = match &spec.denominator {
        DenominatorPolicy::PerCategory => per_category_rows(spec, sums, labels),
        policy => single_denominator_rows(spec, policy, sums, labels),
    };
    debug!(group = %spec.title, rows = rows.len(), policy = %spec.denominator, "aggregated group");

    Report {
        title: spec.title.clone(),
        unit: spec.unit,
        rows,
        category_column: spec.category_column.clone(),
        denominator: spec.denominator.clone(),
        narratives: Vec::new(),
    }
}

fn single_denominator_rows(
    spec: &GroupSpec,
    policy: &DenominatorPolicy,
    sums: &ColumnSums,
    labels: &ColumnText,
) -> Vec<AggregatedRow> {
    let raws: Vec<(&str, f64)> = spec
        .variables
        .iter()
        .map(|column| (column.as_str(), raw_sum(sums, column)))
        .collect();

    let denominator = match policy {
        DenominatorPolicy::Column(column) => {
            if !sums.contains_key(column) {
                warn!(group = %spec.title, column = %column, "denominator column missing, treated as zero");
            }
            Some(raw_sum(sums, column))
        }
        DenominatorPolicy::SumOfMembers => Some(raws.iter().map(|(_, raw)| raw).sum::<f64>()),
        DenominatorPolicy::NoTotal | DenominatorPolicy::PerCategory => None,
    };

    let mut rows: Vec<AggregatedRow> = raws
        .iter()
        .map(|(column, raw)| {
            let category = spec.category_of(column).map(str::to_string);
            member_row(spec, labels, column, *raw, denominator, category)
        })
        .collect();

    if let (Some(label), Some(denom)) = (&spec.total_label, denominator) {
        rows.push(total_row(label.clone(), denom, None, false));
    }
    rows
}

fn per_category_rows(spec: &GroupSpec, sums: &ColumnSums, labels: &ColumnText) -> Vec<AggregatedRow> {
    let mut by_category: IndexMap<String, Vec<(&str, f64)>> = IndexMap::new();
    for column in &spec.variables {
        let category = spec.category_of(column).unwrap_or(OTHER_CATEGORY);
        by_category
            .entry(category.to_string())
            .or_default()
            .push((column.as_str(), raw_sum(sums, column)));
    }

    let subtotal_label = spec
        .total_label
        .as_deref()
        .unwrap_or(DEFAULT_SUBTOTAL_LABEL);
    let mut rows = Vec::new();
    let mut subtotals = Vec::new();
    for (category, members) in by_category {
        let denominator: f64 = members.iter().map(|(_, raw)| raw).sum();
        for (column, raw) in members {
            rows.push(member_row(
                spec,
                labels,
                column,
                raw,
                Some(denominator),
                Some(category.clone()),
            ));
        }
        subtotals.push(total_row(
            format!("{subtotal_label} {category}"),
            denominator,
            Some(category),
            true,
        ));
    }
    rows.extend(subtotals);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sums(pairs: &[(&str, f64)]) -> ColumnSums {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn sum_of_members_appends_total() {
        let spec = GroupSpec::new(
            "Edad",
            vec!["n_a".into(), "n_b".into()],
            DenominatorPolicy::SumOfMembers,
        )
        .with_total("Total");
        let report = aggregate(&spec, &sums(&[("n_a", 1.0), ("n_b", 3.0)]), &ColumnText::new());
        assert_eq!(report.rows.len(), 3);
        assert_eq!(report.rows[0].percentage, Some(25.0));
        let total = report.rows.last().expect("total");
        assert!(total.is_total && !total.is_subtotal);
        assert_eq!(total.raw_value, 4.0);
        assert_eq!(total.label, "Total");
    }

    #[test]
    fn missing_denominator_leaves_percentages_empty() {
        let spec = GroupSpec::new(
            "TICs",
            vec!["n_internet".into()],
            DenominatorPolicy::Column("n_hog".into()),
        )
        .with_total("Total hogares");
        let report = aggregate(&spec, &sums(&[("n_internet", 12.0)]), &ColumnText::new());
        assert_eq!(report.rows[0].percentage, None);
        assert_eq!(report.rows[0].value, 12.0);
        assert_eq!(report.total_row().map(|r| r.raw_value), Some(0.0));
        assert_eq!(report.total_row().and_then(|r| r.percentage), None);
    }

    #[test]
    fn no_total_policy_has_no_percentages() {
        let spec = GroupSpec::new("Otros", vec!["n_x".into()], DenominatorPolicy::NoTotal)
            .with_total("Total");
        let report = aggregate(&spec, &sums(&[("n_x", 5.0)]), &ColumnText::new());
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].percentage, None);
    }

    #[test]
    fn labels_prefer_spec_overrides() {
        let spec = GroupSpec::new("G", vec!["n_a".into(), "n_b".into()], DenominatorPolicy::NoTotal)
            .with_label("n_a", "Compacto");
        let mut labels = ColumnText::new();
        labels.insert("n_a".into(), "Largo".into());
        labels.insert("n_b".into(), "Otro".into());
        let report = aggregate(&spec, &ColumnSums::new(), &labels);
        assert_eq!(report.rows[0].label, "Compacto");
        assert_eq!(report.rows[1].label, "Otro");
    }

    #[test]
    fn display_value_rounds_but_percentage_uses_raw() {
        let spec = GroupSpec::new(
            "G",
            vec!["n_a".into(), "n_b".into()],
            DenominatorPolicy::SumOfMembers,
        );
        let report = aggregate(&spec, &sums(&[("n_a", 0.04), ("n_b", 0.06)]), &ColumnText::new());
        assert_eq!(report.rows[0].value, 0.0);
        assert_eq!(report.rows[0].percentage, Some(40.0));
    }
}
