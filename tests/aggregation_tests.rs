mod support;

use census_report::analysis::aggregate;
use census_report::model::{ColumnText, DenominatorPolicy, GroupSpec};
use indexmap::IndexMap;
use support::*;

#[test]
fn sex_breakdown_divides_by_population_without_total_row() {
    let spec = GroupSpec::new(
        "Población según sexo",
        strings(&["n_hombres", "n_mujeres", "n_per"]),
        DenominatorPolicy::Column("n_per".into()),
    );
    let report = aggregate(
        &spec,
        &sums(&[("n_hombres", 40.0), ("n_mujeres", 60.0), ("n_per", 100.0)]),
        &ColumnText::new(),
    );

    let pcts: Vec<Option<f64>> = report.rows.iter().map(|row| row.percentage).collect();
    assert_eq!(pcts, vec![Some(40.0), Some(60.0), Some(100.0)]);
    assert!(report.total_row().is_none());
    assert_eq!(report.rows.len(), 3);
}

#[test]
fn per_category_rows_get_category_subtotals() {
    let mut categories = IndexMap::new();
    categories.insert("n_a".to_string(), "Agua".to_string());
    categories.insert("n_b".to_string(), "Agua".to_string());
    categories.insert("n_c".to_string(), "WC".to_string());
    let spec = GroupSpec::new(
        "Servicios básicos (Viviendas)",
        strings(&["n_a", "n_b", "n_c"]),
        DenominatorPolicy::PerCategory,
    )
    .with_total("Subtotal")
    .with_categories("Tipo", categories);

    let report = aggregate(
        &spec,
        &sums(&[("n_a", 10.0), ("n_b", 30.0), ("n_c", 5.0)]),
        &ColumnText::new(),
    );

    let agua = report.rows_in_category("Agua");
    let members: Vec<Option<f64>> = agua
        .iter()
        .filter(|row| row.is_member())
        .map(|row| row.percentage)
        .collect();
    assert_eq!(members, vec![Some(25.0), Some(75.0)]);

    let subtotal = agua
        .iter()
        .find(|row| row.is_subtotal)
        .expect("agua subtotal");
    assert_eq!(subtotal.label, "Subtotal Agua");
    assert_eq!(subtotal.raw_value, 40.0);
    assert_eq!(subtotal.percentage, Some(100.0));

    let wc = report.rows_in_category("WC");
    assert_eq!(wc[0].percentage, Some(100.0));
    assert_eq!(report.categories(), vec!["Agua", "WC"]);
    assert!(report.total_row().is_none());
}

#[test]
fn labels_prefer_spec_then_dictionary_then_column() {
    let spec = GroupSpec::new(
        "G",
        strings(&["n_a", "n_b", "n_c"]),
        DenominatorPolicy::SumOfMembers,
    )
    .with_total("Total")
    .with_label("n_a", "Compacta");
    let mut labels = ColumnText::new();
    labels.insert("n_a".into(), "Larga".into());
    labels.insert("n_b".into(), "Desde diccionario".into());

    let report = aggregate(&spec, &sums(&[("n_a", 1.0), ("n_b", 1.0)]), &labels);
    let names: Vec<&str> = report.rows.iter().map(|row| row.label.as_str()).collect();
    assert_eq!(names, vec!["Compacta", "Desde diccionario", "n_c", "Total"]);
    assert_eq!(report.rows[2].raw_value, 0.0);
}

#[test]
fn zero_sum_group_has_no_percentages() {
    let spec = GroupSpec::new("G", strings(&["n_a", "n_b"]), DenominatorPolicy::SumOfMembers)
        .with_total("Total");
    let report = aggregate(&spec, &sums(&[("n_a", 0.0), ("n_b", 0.0)]), &ColumnText::new());
    assert!(report.rows.iter().all(|row| row.percentage.is_none()));
}

#[test]
fn no_total_policy_keeps_values_only() {
    let spec = GroupSpec::new("Variables sin clasificar", strings(&["n_x"]), DenominatorPolicy::NoTotal);
    let report = aggregate(&spec, &sums(&[("n_x", 12.34)]), &ColumnText::new());
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].value, 12.3);
    assert_eq!(report.rows[0].raw_value, 12.34);
    assert_eq!(report.rows[0].percentage, None);
}
