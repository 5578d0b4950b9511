use super::{CONSOLIDATED_STEM, ExportFormat, ExportTarget, Exporter, ensure_parent};
use crate::model::{AggregatedRow, ReportBundle};
use anyhow::Context;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One CSV per report plus a consolidated file with every row.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExporter;

#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    grupo: &'a str,
    unidad: String,
    categoria: &'a str,
    etiqueta: &'a str,
    variable: &'a str,
    valor: f64,
    porcentaje: Option<f64>,
    valor_texto: String,
    porcentaje_texto: String,
    es_total: bool,
    es_subtotal: bool,
}

impl<'a> CsvRecord<'a> {
    fn new(group: &'a str, unit: String, row: &'a AggregatedRow) -> Self {
        Self {
            grupo: group,
            unidad: unit,
            categoria: row.category.as_deref().unwrap_or(""),
            etiqueta: &row.label,
            variable: row.column.as_deref().unwrap_or(""),
            valor: row.value,
            porcentaje: row.percentage,
            valor_texto: row.display_value(),
            porcentaje_texto: row.display_percentage(),
            es_total: row.is_total,
            es_subtotal: row.is_subtotal,
        }
    }
}

fn write_records<'a>(
    path: &Path,
    records: impl IntoIterator<Item = CsvRecord<'a>>,
) -> anyhow::Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

impl Exporter for CsvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn export(&self, bundle: &ReportBundle, target: &ExportTarget) -> anyhow::Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(bundle.reports.len() + 1);
        for report in &bundle.reports {
            let path = target.path_for(&report.title, ExportFormat::Csv);
            let unit = report.unit.map(|u| u.to_string()).unwrap_or_default();
            write_records(
                &path,
                report
                    .rows
                    .iter()
                    .map(|row| CsvRecord::new(&report.title, unit.clone(), row)),
            )?;
            paths.push(path);
        }

        let consolidated = target.path_for(CONSOLIDATED_STEM, ExportFormat::Csv);
        write_records(
            &consolidated,
            bundle.combined_rows.iter().map(|row| {
                CsvRecord::new(
                    &row.group,
                    row.unit.map(|u| u.to_string()).unwrap_or_default(),
                    &row.row,
                )
            }),
        )?;
        paths.push(consolidated);
        Ok(paths)
    }
}
