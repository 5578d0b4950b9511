//! Entity filters: which dataset rows take part in the sums.
//!
//! Precedence is entity IDs, then MANZENT codes, then name triples. An empty
//! filter selects every row.

use crate::error::ReportResult;
use crate::ingest::{is_spreadsheet, read_workbook, sheet_rows};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

pub const ID_COLUMN: &str = "ID_ENTIDAD";
pub const MANZENT_COLUMN: &str = "MANZENT";
pub const ENTITY_COLUMN: &str = "ENTIDAD";
pub const LOCALITY_COLUMN: &str = "LOCALIDAD";
pub const COMMUNE_COLUMN: &str = "COMUNA";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct EntityName {
    pub entidad: String,
    pub localidad: String,
    pub comuna: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EntityFilter {
    pub ids: Vec<i64>,
    pub manzent: Vec<i64>,
    pub names: Vec<EntityName>,
    /// Data rows in the filter file.
    pub rows: usize,
    /// Upper-cased headers of the filter file.
    pub columns: Vec<String>,
}

impl EntityFilter {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.manzent.is_empty() && self.names.is_empty()
    }

    pub fn from_rows(header: &[String], rows: &[Vec<String>]) -> Self {
        let columns: Vec<String> = header
            .iter()
            .map(|name| name.trim().to_uppercase())
            .collect();
        let index = |name: &str| columns.iter().position(|column| column == name);
        let id_idx = index(ID_COLUMN);
        let manzent_idx = index(MANZENT_COLUMN);
        let entity_idx = index(ENTITY_COLUMN);
        let locality_idx = index(LOCALITY_COLUMN);
        let commune_idx = index(COMMUNE_COLUMN);

        let cell = |row: &Vec<String>, idx: Option<usize>| -> String {
            idx.and_then(|i| row.get(i))
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };

        let mut ids = Vec::new();
        let mut manzent = Vec::new();
        let mut names = Vec::new();
        for row in rows {
            if let Some(id) = id_idx.and_then(|_| normalize_id(&cell(row, id_idx))) {
                ids.push(id);
            }
            if let Some(code) = manzent_idx.and_then(|_| normalize_id(&cell(row, manzent_idx))) {
                manzent.push(code);
            }
            if entity_idx.is_some() {
                let entidad = cell(row, entity_idx);
                if !entidad.is_empty() {
                    names.push(EntityName {
                        entidad,
                        localidad: cell(row, locality_idx),
                        comuna: cell(row, commune_idx),
                    });
                }
            }
        }

        Self {
            ids: dedupe(ids),
            manzent: dedupe(manzent),
            names,
            rows: rows.len(),
            columns,
        }
    }
}

fn dedupe(values: Vec<i64>) -> Vec<i64> {
    let mut seen = HashSet::new();
    values.into_iter().filter(|value| seen.insert(*value)).collect()
}

/// Parses `"123"` and `"123.0"` style identifiers; anything else is `None`.
pub fn normalize_id(value: &str) -> Option<i64> {
    let text = value.trim();
    if text.is_empty() {
        return None;
    }
    if text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse().ok();
    }
    let (int_part, frac_part) = text.split_once('.')?;
    let digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (int_part.is_empty() && frac_part.is_empty()) || !digits(int_part) || !digits(frac_part) {
        return None;
    }
    text.parse::<f64>().ok().map(|value| value.trunc() as i64)
}

/// Reads an XLSX (first sheet) or CSV filter file.
pub fn read_filter(path: &Path) -> ReportResult<EntityFilter> {
    let (header, rows) = if is_spreadsheet(path) {
        let book = read_workbook(path)?;
        let mut rows = book
            .get_sheet_collection()
            .first()
            .map(sheet_rows)
            .unwrap_or_default();
        if rows.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            let header = rows.remove(0);
            (header, rows)
        }
    } else {
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(File::open(path)?);
        let header: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            rows.push(record?.iter().map(str::to_string).collect());
        }
        (header, rows)
    };
    let filter = EntityFilter::from_rows(&header, &rows);
    debug!(
        path = %path.display(),
        ids = filter.ids.len(),
        manzent = filter.manzent.len(),
        names = filter.names.len(),
        "read entity filter"
    );
    Ok(filter)
}

/// Row predicate resolved against a dataset's headers.
#[derive(Debug, Clone)]
pub enum RowSelector {
    All,
    Ids {
        column: Option<usize>,
        ids: HashSet<i64>,
    },
    Manzent {
        column: Option<usize>,
        codes: HashSet<i64>,
    },
    Names {
        entidad: Option<usize>,
        localidad: Option<usize>,
        comuna: Option<usize>,
        names: HashSet<(String, String, String)>,
    },
}

impl RowSelector {
    pub fn new(filter: &EntityFilter, headers: &StringRecord) -> Self {
        let index = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name))
        };

        if !filter.ids.is_empty() {
            let column = index(ID_COLUMN);
            if column.is_none() {
                warn!("dataset has no {ID_COLUMN} column; id filter selects nothing");
            }
            return RowSelector::Ids {
                column,
                ids: filter.ids.iter().copied().collect(),
            };
        }
        if !filter.manzent.is_empty() {
            let column = index(MANZENT_COLUMN);
            if column.is_none() {
                warn!("dataset has no {MANZENT_COLUMN} column; manzent filter selects nothing");
            }
            return RowSelector::Manzent {
                column,
                codes: filter.manzent.iter().copied().collect(),
            };
        }
        if !filter.names.is_empty() {
            let entidad = index(ENTITY_COLUMN);
            let localidad = index(LOCALITY_COLUMN);
            let comuna = index(COMMUNE_COLUMN);
            if entidad.is_none() {
                warn!("dataset has no {ENTITY_COLUMN} column; name filter selects nothing");
            }
            let names = filter
                .names
                .iter()
                .map(|name| {
                    (
                        normalize_name(&name.entidad),
                        localidad.map(|_| normalize_name(&name.localidad)).unwrap_or_default(),
                        comuna.map(|_| normalize_name(&name.comuna)).unwrap_or_default(),
                    )
                })
                .collect();
            return RowSelector::Names {
                entidad,
                localidad,
                comuna,
                names,
            };
        }
        RowSelector::All
    }

    pub fn matches(&self, record: &StringRecord) -> bool {
        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");
        match self {
            RowSelector::All => true,
            RowSelector::Ids { column, ids } => {
                column.is_some() && normalize_id(cell(*column)).is_some_and(|id| ids.contains(&id))
            }
            RowSelector::Manzent { column, codes } => {
                column.is_some()
                    && normalize_id(cell(*column)).is_some_and(|code| codes.contains(&code))
            }
            RowSelector::Names {
                entidad,
                localidad,
                comuna,
                names,
            } => {
                if entidad.is_none() {
                    return false;
                }
                let key = (
                    normalize_name(cell(*entidad)),
                    localidad.map(|_| normalize_name(cell(*localidad))).unwrap_or_default(),
                    comuna.map(|_| normalize_name(cell(*comuna))).unwrap_or_default(),
                );
                names.contains(&key)
            }
        }
    }
}

fn normalize_name(value: &str) -> String {
    value.trim().to_uppercase()
}
