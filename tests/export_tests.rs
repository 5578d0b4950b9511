mod support;

use anyhow::anyhow;
use census_report::export::{
    ArtifactOutcome, ExportFormat, ExportTarget, Exporter, export_bundle, export_with,
};
use census_report::model::ReportBundle;
use chrono::{Local, TimeZone};
use std::io::Read;
use std::path::PathBuf;
use support::*;

fn bundle() -> ReportBundle {
    ReportBundle::new(vec![
        simple_report(
            "Población según sexo",
            vec![
                member("Hombres", 40.0, Some(40.0)),
                member("Mujeres", 60.0, Some(60.0)),
            ],
        ),
        simple_report("Religión", vec![member("Católica", 1500.0, Some(75.0))]),
    ])
}

fn target(workspace: &Workspace) -> ExportTarget {
    let at = Local
        .with_ymd_and_hms(2024, 5, 6, 7, 8, 9)
        .single()
        .expect("valid timestamp");
    ExportTarget::new(workspace.path("Resultados"), &at)
}

struct FailingExporter;

impl Exporter for FailingExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Docx
    }

    fn export(&self, _bundle: &ReportBundle, _target: &ExportTarget) -> anyhow::Result<Vec<PathBuf>> {
        Err(anyhow!("disk full"))
    }
}

#[test]
fn all_formats_write_named_files() {
    let workspace = Workspace::new();
    let manifest = export_bundle(&bundle(), &ExportFormat::ALL, &target(&workspace)).expect("export");

    assert_eq!(manifest.failures().count(), 0);
    assert_eq!(manifest.timestamp, "20240506_070809");
    let written = manifest.written_paths();
    assert_eq!(written.len(), 6, "{written:?}");
    for path in &written {
        assert!(std::path::Path::new(path).exists(), "{path}");
        assert!(path.contains("reporte_20240506_070809_"), "{path}");
    }
    assert!(written.iter().any(|p| p.ends_with("Poblacion_segun_sexo.csv")));
    assert!(written.iter().any(|p| p.ends_with("consolidado.csv")));
    assert!(written.iter().any(|p| p.ends_with("consolidado.xlsx")));
    assert!(written.iter().any(|p| p.ends_with("consolidado.html")));
    assert!(written.iter().any(|p| p.ends_with("consolidado.docx")));
}

#[test]
fn consolidated_csv_carries_every_row() {
    let workspace = Workspace::new();
    let target = target(&workspace);
    export_bundle(&bundle(), &[ExportFormat::Csv], &target).expect("export");

    let path = target.path_for("consolidado", ExportFormat::Csv);
    let mut reader = csv::Reader::from_path(&path).expect("open csv");
    let headers = reader.headers().expect("headers").clone();
    assert_eq!(&headers[0], "grupo");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("row")).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[2][0], "Religión");
    let text_idx = headers.iter().position(|h| h == "valor_texto").expect("column");
    assert_eq!(&rows[2][text_idx], "1.500");
}

#[test]
fn failing_exporter_leaves_placeholder_and_others_run() {
    let workspace = Workspace::new();
    let exporters: Vec<Box<dyn Exporter>> = vec![
        Box::new(FailingExporter),
        census_report::export::exporter_for(ExportFormat::Html),
    ];
    let manifest = export_with(&bundle(), &exporters, &target(&workspace)).expect("export");

    let failed = manifest.artifact(ExportFormat::Docx).expect("docx entry");
    assert_eq!(
        failed.outcome,
        ArtifactOutcome::Failed {
            placeholder: "ERROR: disk full".into()
        }
    );
    let html = manifest.artifact(ExportFormat::Html).expect("html entry");
    assert!(matches!(html.outcome, ArtifactOutcome::Written { ref paths } if paths.len() == 1));
    assert!(census_report::ensure_any_written(&manifest).is_ok());
}

#[test]
fn every_format_failing_is_an_error() {
    let workspace = Workspace::new();
    let exporters: Vec<Box<dyn Exporter>> = vec![Box::new(FailingExporter)];
    let manifest = export_with(&bundle(), &exporters, &target(&workspace)).expect("export");
    let err = census_report::ensure_any_written(&manifest).expect_err("all failed");
    assert_eq!(err.code(), census_report::ErrorCode::ExportError);
}

#[test]
fn docx_is_a_zip_with_document_part() {
    let workspace = Workspace::new();
    let target = target(&workspace);
    export_bundle(&bundle(), &[ExportFormat::Docx], &target).expect("export");

    let file = std::fs::File::open(target.path_for("consolidado", ExportFormat::Docx)).expect("open");
    let mut archive = zip::ZipArchive::new(file).expect("zip");
    let mut document = String::new();
    archive
        .by_name("word/document.xml")
        .expect("document part")
        .read_to_string(&mut document)
        .expect("read");
    assert!(document.contains("Tabla 1. Población según sexo"));
    assert!(document.contains("Tabla 2. Religión"));
    assert!(archive.by_name("[Content_Types].xml").is_ok());
}

#[test]
fn xlsx_round_trips_through_reader() {
    let workspace = Workspace::new();
    let target = target(&workspace);
    export_bundle(&bundle(), &[ExportFormat::Xlsx], &target).expect("export");

    let book = umya_spreadsheet::reader::xlsx::read(target.path_for("consolidado", ExportFormat::Xlsx))
        .expect("read workbook");
    let names: Vec<String> = book
        .get_sheet_collection()
        .iter()
        .map(|sheet| sheet.get_name().to_string())
        .collect();
    assert_eq!(names, vec!["Población según sexo", "Religión"]);
    let sheet = book.get_sheet_by_name("Religión").expect("sheet");
    assert_eq!(sheet.get_value("A1"), "Religión");
    assert_eq!(sheet.get_value("A4"), "Católica");
}
