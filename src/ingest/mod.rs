//! Readers for the files around the core: curated dictionary, layer
//! dictionary, entity filter and the dataset itself.

pub mod dataset;
pub mod dictionary;
pub mod filter;
pub mod layer_dictionary;

pub use dataset::{DatasetSummary, load_dataset, summarize_dataset};
pub use dictionary::{REQUIRED_COLUMNS, parse_dictionary, read_dictionary};
pub use filter::{EntityFilter, EntityName, RowSelector, normalize_id, read_filter};
pub use layer_dictionary::{list_layers, read_layer_dictionary};

use crate::error::{ReportError, ReportResult};
use crate::utils::cell_address;
use std::path::Path;
use umya_spreadsheet::Worksheet;

/// Reads a worksheet into trimmed string rows; the first row is the header.
pub(crate) fn sheet_rows(sheet: &Worksheet) -> Vec<Vec<String>> {
    let (max_col, max_row) = sheet.get_highest_column_and_row();
    (1..=max_row)
        .map(|row| {
            (1..=max_col)
                .map(|col| {
                    sheet
                        .get_cell(cell_address(col, row).as_str())
                        .map(|cell| cell.get_value().trim().to_string())
                        .unwrap_or_default()
                })
                .collect()
        })
        .collect()
}

pub(crate) fn read_workbook(path: &Path) -> ReportResult<umya_spreadsheet::Spreadsheet> {
    umya_spreadsheet::reader::xlsx::read(path)
        .map_err(|err| ReportError::xlsx(format!("{}: {err}", path.display())))
}

pub(crate) fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "xlsx" | "xlsm"))
        .unwrap_or(false)
}
