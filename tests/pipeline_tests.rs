mod support;

use assert_matches::assert_matches;
use census_report::export::ExportFormat;
use census_report::{
    InputArgs, ReportError, build_report_bundle, load_config, prepare_groups,
    render_group_listing, run_groups, run_report,
};
use support::*;

fn inputs(workspace: &Workspace) -> InputArgs {
    InputArgs {
        dataset: Some(workspace.write("datos.csv", DATASET_CSV)),
        dictionary: Some(workspace.write("diccionario.csv", DICTIONARY_CSV)),
        output_dir: Some(workspace.path("Resultados")),
        formats: Some(vec![ExportFormat::Csv, ExportFormat::Html]),
        seed: Some(42),
        ..Default::default()
    }
}

#[test]
fn groups_listing_reflects_dictionary() {
    let workspace = Workspace::new();
    let config = load_config(&inputs(&workspace), None).expect("config");
    let summaries = run_groups(&config).expect("groups");
    let titles: Vec<&str> = summaries.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles[0], "Población según sexo");
    assert_eq!(titles.last().copied(), Some("Variables sin clasificar"));

    let listing = render_group_listing(&summaries, false).expect("listing");
    assert!(listing.contains("  1. Población según sexo [Personas; n_per; 3 variables]"), "{listing}");
    let json = render_group_listing(&summaries, true).expect("json");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(parsed[0]["denominator"], "n_per");
}

#[test]
fn report_bundle_matches_scenarios() {
    let workspace = Workspace::new();
    let config = load_config(&inputs(&workspace), None).expect("config");
    let prepared = prepare_groups(&config).expect("prepare");
    let bundle = build_report_bundle(&config, &prepared).expect("bundle");

    let sex = &bundle.reports[0];
    let pcts: Vec<Option<f64>> = sex.rows.iter().map(|row| row.percentage).collect();
    assert_eq!(pcts, vec![Some(40.0), Some(60.0), Some(100.0)]);
    assert!(sex.total_row().is_none());

    let services = bundle
        .reports
        .iter()
        .find(|report| report.title == "Servicios básicos (Viviendas)")
        .expect("services report");
    let agua: Vec<(&str, Option<f64>)> = services
        .rows_in_category("Agua")
        .into_iter()
        .map(|row| (row.label.as_str(), row.percentage))
        .collect();
    assert_eq!(
        agua,
        vec![
            ("Red pública", Some(25.0)),
            ("Pozo", Some(75.0)),
            ("Subtotal Agua", Some(100.0)),
        ]
    );
    assert_eq!(services.narratives.len(), 2);
}

#[test]
fn seeded_runs_are_reproducible() {
    let workspace = Workspace::new();
    let config = load_config(&inputs(&workspace), None).expect("config");
    let prepared = prepare_groups(&config).expect("prepare");
    let first = build_report_bundle(&config, &prepared).expect("bundle");
    let second = build_report_bundle(&config, &prepared).expect("bundle");
    assert_eq!(first, second);
}

#[test]
fn run_report_writes_requested_formats() {
    let workspace = Workspace::new();
    let config = load_config(&inputs(&workspace), Some(strings(&["Religión"])));
    assert!(config.is_ok());
    let err = run_report(&config.expect("config")).expect_err("unknown group");
    assert_matches!(err, ReportError::UnknownGroup { ref title, .. } if title == "Religión");

    let config = load_config(&inputs(&workspace), Some(strings(&["Población según sexo"])))
        .expect("config");
    let manifest = run_report(&config).expect("report");
    assert_eq!(manifest.failures().count(), 0);
    let written = manifest.written_paths();
    assert_eq!(written.len(), 3, "{written:?}");
    assert!(written.iter().any(|p| p.ends_with("Poblacion_segun_sexo.html")));
}

#[test]
fn invalid_inputs_map_to_invalid_config() {
    let workspace = Workspace::new();
    let args = InputArgs {
        dataset: Some(workspace.path("no-existe.csv")),
        ..Default::default()
    };
    let err = load_config(&args, None).expect_err("missing dataset");
    assert_matches!(err, ReportError::InvalidConfig { .. });
    assert_eq!(err.code().code(), 14);
}
