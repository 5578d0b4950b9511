//! Serializing a [`ReportBundle`] into documents.
//!
//! Every exporter runs independently: a failing format is recorded in the
//! manifest with an `ERROR: ...` placeholder and the remaining formats still
//! run.

pub mod csv;
pub mod docx;
pub mod html;
pub mod xlsx;

use crate::error::ReportResult;
use crate::logging::export_span;
use crate::model::ReportBundle;
use crate::utils::{path_to_forward_slashes, sanitize_file_stem, timestamp_prefix};
use chrono::{DateTime, Local};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strum::{Display, EnumString};
use tracing::{error, info};

pub const FILE_PREFIX: &str = "reporte";
pub const CONSOLIDATED_STEM: &str = "consolidado";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Html,
    Docx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Csv,
        ExportFormat::Xlsx,
        ExportFormat::Html,
        ExportFormat::Docx,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Html => "html",
            ExportFormat::Docx => "docx",
        }
    }
}

/// Output directory plus the timestamp shared by every file of one run.
#[derive(Debug, Clone)]
pub struct ExportTarget {
    pub output_dir: PathBuf,
    pub timestamp: String,
}

impl ExportTarget {
    pub fn new(output_dir: impl Into<PathBuf>, at: &DateTime<Local>) -> Self {
        Self {
            output_dir: output_dir.into(),
            timestamp: timestamp_prefix(at),
        }
    }

    pub fn now(output_dir: impl Into<PathBuf>) -> Self {
        Self::new(output_dir, &Local::now())
    }

    /// `reporte_{timestamp}_{sanitized title}.{ext}`
    pub fn path_for(&self, title: &str, format: ExportFormat) -> PathBuf {
        self.output_dir.join(format!(
            "{FILE_PREFIX}_{}_{}.{}",
            self.timestamp,
            sanitize_file_stem(title),
            format.extension()
        ))
    }
}

/// Title used for single-file formats: the report's own title when the bundle
/// holds exactly one report.
pub fn bundle_stem(bundle: &ReportBundle) -> &str {
    match bundle.reports.as_slice() {
        [only] => only.title.as_str(),
        _ => CONSOLIDATED_STEM,
    }
}

pub trait Exporter {
    fn format(&self) -> ExportFormat;

    /// Writes the artifact(s) and returns their paths.
    fn export(&self, bundle: &ReportBundle, target: &ExportTarget) -> anyhow::Result<Vec<PathBuf>>;
}

pub fn exporter_for(format: ExportFormat) -> Box<dyn Exporter> {
    match format {
        ExportFormat::Csv => Box::new(self::csv::CsvExporter),
        ExportFormat::Xlsx => Box::new(self::xlsx::XlsxExporter),
        ExportFormat::Html => Box::new(html::HtmlExporter::default()),
        ExportFormat::Docx => Box::new(docx::DocxExporter),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactOutcome {
    Written { paths: Vec<String> },
    Failed { placeholder: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    #[serde(flatten)]
    pub outcome: ArtifactOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ExportManifest {
    pub output_dir: String,
    pub timestamp: String,
    pub artifacts: Vec<ExportArtifact>,
}

impl ExportManifest {
    pub fn artifact(&self, format: ExportFormat) -> Option<&ExportArtifact> {
        self.artifacts.iter().find(|artifact| artifact.format == format)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ExportArtifact> {
        self.artifacts
            .iter()
            .filter(|artifact| matches!(artifact.outcome, ArtifactOutcome::Failed { .. }))
    }

    pub fn written_paths(&self) -> Vec<&str> {
        self.artifacts
            .iter()
            .filter_map(|artifact| match &artifact.outcome {
                ArtifactOutcome::Written { paths } => Some(paths),
                ArtifactOutcome::Failed { .. } => None,
            })
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

/// Runs the built-in exporter for every requested format.
pub fn export_bundle(
    bundle: &ReportBundle,
    formats: &[ExportFormat],
    target: &ExportTarget,
) -> ReportResult<ExportManifest> {
    let exporters: Vec<Box<dyn Exporter>> = formats.iter().copied().map(exporter_for).collect();
    export_with(bundle, &exporters, target)
}

/// Runs each exporter, turning failures into placeholders. Only the output
/// directory itself failing to materialize is fatal.
pub fn export_with(
    bundle: &ReportBundle,
    exporters: &[Box<dyn Exporter>],
    target: &ExportTarget,
) -> ReportResult<ExportManifest> {
    std::fs::create_dir_all(&target.output_dir)?;

    let mut manifest = ExportManifest {
        output_dir: path_to_forward_slashes(&target.output_dir),
        timestamp: target.timestamp.clone(),
        artifacts: Vec::with_capacity(exporters.len()),
    };
    for exporter in exporters {
        let format = exporter.format();
        let span = export_span(format.extension());
        let _enter = span.enter();
        let outcome = match exporter.export(bundle, target) {
            Ok(paths) => {
                info!(files = paths.len(), "export written");
                ArtifactOutcome::Written {
                    paths: paths.iter().map(|p| path_to_forward_slashes(p)).collect(),
                }
            }
            Err(err) => {
                error!(error = %format!("{err:#}"), "export failed");
                ArtifactOutcome::Failed {
                    placeholder: format!("ERROR: {err:#}"),
                }
            }
        };
        manifest.artifacts.push(ExportArtifact { format, outcome });
    }
    Ok(manifest)
}

pub(crate) fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
