use crate::error::{ReportError, ReportResult};
use crate::ingest::{read_workbook, sheet_rows};
use crate::model::LayerField;
use std::path::Path;
use tracing::debug;

const FIELD: &str = "Nombre de campo";
const TYPE: &str = "Tipo";
const DESCRIPTION: &str = "Descripción";
const DISPLAY: &str = "Visualización";

/// Sheet names of a layer dictionary workbook, one per layer.
pub fn list_layers(path: &Path) -> ReportResult<Vec<String>> {
    let book = read_workbook(path)?;
    Ok(book
        .get_sheet_collection()
        .iter()
        .map(|sheet| sheet.get_name().to_string())
        .collect())
}

pub fn read_layer_dictionary(path: &Path, layer: &str) -> ReportResult<Vec<LayerField>> {
    let book = read_workbook(path)?;
    let sheet = book
        .get_sheet_by_name(layer)
        .ok_or_else(|| ReportError::MissingLayer {
            layer: layer.to_string(),
        })?;
    let fields = fields_from_rows(sheet_rows(sheet));
    debug!(layer, fields = fields.len(), "read layer dictionary");
    Ok(fields)
}

pub(crate) fn fields_from_rows(rows: Vec<Vec<String>>) -> Vec<LayerField> {
    let mut rows = rows.into_iter();
    let Some(header) = rows.next() else {
        return Vec::new();
    };
    let position = |name: &str| {
        header
            .iter()
            .position(|cell| cell.trim().eq_ignore_ascii_case(name))
    };
    let Some(field_idx) = position(FIELD) else {
        return Vec::new();
    };
    let type_idx = position(TYPE);
    let description_idx = position(DESCRIPTION);
    let display_idx = position(DISPLAY);

    let cell = |row: &[String], idx: Option<usize>| {
        idx.and_then(|i| row.get(i))
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };

    rows.filter_map(|row| {
        let field = cell(&row, Some(field_idx));
        if field.is_empty() {
            return None;
        }
        Some(LayerField {
            field,
            dtype: cell(&row, type_idx),
            description: cell(&row, description_idx),
            display: cell(&row, display_idx),
        })
    })
    .collect()
}
