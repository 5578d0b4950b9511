use crate::error::ReportResult;
use crate::ingest::filter::{EntityFilter, RowSelector};
use crate::model::{Column, ColumnSums};
use csv::{ReaderBuilder, Trim};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Declared types and filtered per-column sums of one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub columns: Vec<Column>,
    /// Sums over the selected rows, numeric columns only.
    pub sums: ColumnSums,
    pub rows_total: usize,
    pub rows_selected: usize,
}

impl DatasetSummary {
    /// Numeric columns carrying the indicator prefix, in dataset order.
    pub fn candidate_columns(&self, prefix: &str) -> Vec<String> {
        self.columns
            .iter()
            .filter(|column| column.is_indicator(prefix))
            .map(|column| column.name.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct TypeTracker {
    numeric: bool,
    integral: bool,
}

impl Default for TypeTracker {
    fn default() -> Self {
        Self {
            numeric: true,
            integral: true,
        }
    }
}

impl TypeTracker {
    fn observe(&mut self, cell: &str) {
        if cell.is_empty() || !self.numeric {
            return;
        }
        match parse_number(cell) {
            Some(value) => self.integral &= value.fract() == 0.0,
            None => self.numeric = false,
        }
    }

    fn declared_type(&self) -> &'static str {
        match (self.numeric, self.integral) {
            (true, true) => "integer",
            (true, false) => "real",
            (false, _) => "text",
        }
    }
}

fn parse_number(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn load_dataset(path: &Path, filter: &EntityFilter) -> ReportResult<DatasetSummary> {
    let summary = summarize_dataset(File::open(path)?, filter)?;
    info!(
        path = %path.display(),
        rows = summary.rows_total,
        selected = summary.rows_selected,
        columns = summary.columns.len(),
        "loaded dataset"
    );
    Ok(summary)
}

/// Single pass over a CSV dataset: infers column types from every row and sums
/// the rows the filter selects. Cells that do not parse add zero.
pub fn summarize_dataset<R: Read>(reader: R, filter: &EntityFilter) -> ReportResult<DatasetSummary> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let selector = RowSelector::new(filter, &headers);

    let mut trackers = vec![TypeTracker::default(); headers.len()];
    let mut totals = vec![0.0f64; headers.len()];
    let mut rows_total = 0usize;
    let mut rows_selected = 0usize;

    for record in rdr.records() {
        let record = record?;
        rows_total += 1;
        let selected = selector.matches(&record);
        if selected {
            rows_selected += 1;
        }
        for (idx, cell) in record.iter().enumerate().take(headers.len()) {
            trackers[idx].observe(cell);
            if selected {
                totals[idx] += parse_number(cell).unwrap_or(0.0);
            }
        }
    }

    let mut columns = Vec::with_capacity(headers.len());
    let mut sums = ColumnSums::new();
    for (idx, name) in headers.iter().enumerate() {
        let column = Column::new(name, trackers[idx].declared_type());
        if column.is_numeric() {
            sums.insert(column.name.clone(), totals[idx]);
        }
        columns.push(column);
    }
    debug!(rows_total, rows_selected, "summarized dataset");

    Ok(DatasetSummary {
        columns,
        sums,
        rows_total,
        rows_selected,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::filter::EntityName;

    const DATA: &str = "ID_ENTIDAD,ENTIDAD,n_per,n_hombres,n_tasa,COMUNA\n\
                        1,Centro,10,4,0.5,Talca\n\
                        2,Norte,20,x,1.5,Talca\n\
                        3,Sur,30,,2,Curicó\n";

    #[test]
    fn infers_types_and_sums_everything_without_filter() {
        let summary = summarize_dataset(DATA.as_bytes(), &EntityFilter::default()).expect("load");
        let types: Vec<&str> = summary
            .columns
            .iter()
            .map(|c| c.declared_type.as_str())
            .collect();
        assert_eq!(types, vec!["integer", "text", "integer", "text", "real", "text"]);
        assert_eq!(summary.sums["n_per"], 60.0);
        assert_eq!(summary.sums["n_tasa"], 4.0);
        assert!(!summary.sums.contains_key("n_hombres"));
        assert_eq!(summary.candidate_columns("n_"), vec!["n_per", "n_tasa"]);
    }

    #[test]
    fn filter_restricts_sums() {
        let filter = EntityFilter {
            names: vec![EntityName {
                entidad: "centro".into(),
                localidad: String::new(),
                comuna: "TALCA".into(),
            }],
            ..Default::default()
        };
        let summary = summarize_dataset(DATA.as_bytes(), &filter).expect("load");
        assert_eq!(summary.rows_total, 3);
        assert_eq!(summary.rows_selected, 1);
        assert_eq!(summary.sums["n_per"], 10.0);
    }
}
