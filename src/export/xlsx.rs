use super::{ExportFormat, ExportTarget, Exporter, bundle_stem, ensure_parent};
use crate::model::{Report, ReportBundle};
use crate::utils::{cell_address, unique_sheet_name};
use anyhow::{Context, anyhow};
use std::collections::HashSet;
use std::path::PathBuf;
use umya_spreadsheet::{Spreadsheet, Worksheet};

/// One workbook, one sheet per report: the table first, narratives below.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxExporter;

impl Exporter for XlsxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Xlsx
    }

    fn export(&self, bundle: &ReportBundle, target: &ExportTarget) -> anyhow::Result<Vec<PathBuf>> {
        let book = build_workbook(bundle)?;
        let path = target.path_for(bundle_stem(bundle), ExportFormat::Xlsx);
        ensure_parent(&path)?;
        umya_spreadsheet::writer::xlsx::write(&book, &path)
            .map_err(|e| anyhow!("failed to write {}: {e}", path.display()))?;
        Ok(vec![path])
    }
}

pub fn build_workbook(bundle: &ReportBundle) -> anyhow::Result<Spreadsheet> {
    let mut book = umya_spreadsheet::new_file();
    let mut used = HashSet::new();

    for (idx, report) in bundle.reports.iter().enumerate() {
        let name = unique_sheet_name(&report.title, &mut used);
        let sheet = if idx == 0 {
            let sheet = book
                .get_sheet_mut(&0)
                .context("new workbook has no default sheet")?;
            sheet.set_name(name);
            sheet
        } else {
            book.new_sheet(name)
                .map_err(|e| anyhow!("Failed to create sheet: {}", e))?
        };
        write_report(sheet, report);
    }
    Ok(book)
}

fn set_bold(sheet: &mut Worksheet, addr: &str) {
    sheet
        .get_cell_mut(addr)
        .get_style_mut()
        .get_font_mut()
        .set_bold(true);
}

fn write_report(sheet: &mut Worksheet, report: &Report) {
    let has_category = report.category_column.is_some();
    let mut headers: Vec<String> = Vec::with_capacity(4);
    if let Some(column) = &report.category_column {
        headers.push(column.clone());
    }
    headers.extend(["Descripción", "Valor", "Porcentaje"].map(String::from));

    sheet.get_cell_mut("A1").set_value(report.title.clone());
    set_bold(sheet, "A1");

    let header_row = 3u32;
    for (idx, header) in headers.iter().enumerate() {
        let addr = cell_address(idx as u32 + 1, header_row);
        sheet.get_cell_mut(addr.as_str()).set_value(header.clone());
        set_bold(sheet, &addr);
    }

    let mut row_idx = header_row;
    for row in &report.rows {
        row_idx += 1;
        let mut col = 1u32;
        if has_category {
            let addr = cell_address(col, row_idx);
            sheet
                .get_cell_mut(addr.as_str())
                .set_value(row.category.clone().unwrap_or_default());
            col += 1;
        }
        let label_addr = cell_address(col, row_idx);
        sheet
            .get_cell_mut(label_addr.as_str())
            .set_value(row.label.clone());
        let value_addr = cell_address(col + 1, row_idx);
        sheet
            .get_cell_mut(value_addr.as_str())
            .set_value_number(row.value);
        if let Some(pct) = row.percentage {
            let pct_addr = cell_address(col + 2, row_idx);
            sheet.get_cell_mut(pct_addr.as_str()).set_value_number(pct);
        }
        if row.is_total || row.is_subtotal {
            for c in 1..=col + 2 {
                set_bold(sheet, &cell_address(c, row_idx));
            }
        }
    }

    row_idx += 1;
    for paragraph in &report.narratives {
        row_idx += 1;
        if let Some(heading) = &paragraph.heading {
            let addr = cell_address(1, row_idx);
            sheet.get_cell_mut(addr.as_str()).set_value(heading.clone());
            set_bold(sheet, &addr);
            row_idx += 1;
        }
        let addr = cell_address(1, row_idx);
        sheet
            .get_cell_mut(addr.as_str())
            .set_value(paragraph.text.clone());
    }
}
