use crate::error::{ReportError, ReportResult};
use crate::model::DictionaryEntry;
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Headers the curated dictionary must carry, matched case-insensitively.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "Tema",
    "Subtema",
    "Variable_Codigo",
    "Descripcion_Etiqueta",
    "Valores_Codigos_y_Detalle",
];

pub fn read_dictionary(path: &Path) -> ReportResult<Vec<DictionaryEntry>> {
    let file = File::open(path)?;
    let entries = parse_dictionary(file)?;
    debug!(path = %path.display(), entries = entries.len(), "read dictionary");
    Ok(entries)
}

pub fn parse_dictionary<R: Read>(reader: R) -> ReportResult<Vec<DictionaryEntry>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut indices = [0usize; 5];
    let mut missing = Vec::new();
    for (slot, expected) in indices.iter_mut().zip(REQUIRED_COLUMNS) {
        match headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(expected))
        {
            Some(idx) => *slot = idx,
            None => missing.push(expected.to_string()),
        }
    }
    if !missing.is_empty() {
        return Err(ReportError::MissingDictionaryColumns { missing });
    }

    let [topic, subtopic, column, label, detail] = indices;
    let mut entries = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();
        let entry = DictionaryEntry {
            topic: field(topic),
            subtopic: field(subtopic),
            column: field(column),
            label: field(label),
            detail: field(detail),
        };
        if entry.column.is_empty() {
            continue;
        }
        entries.push(entry);
    }
    Ok(entries)
}
