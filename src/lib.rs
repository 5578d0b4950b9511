pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod grouping;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod report;
pub mod utils;

pub use config::{CliArgs, Command, InputArgs, ReportConfig};
pub use error::{ErrorCode, ReportError, ReportResult};
pub use export::{ExportFormat, ExportManifest, ExportTarget, Exporter, export_bundle};
pub use grouping::{BuiltGroups, GroupSpecBuilder};
pub use logging::{LoggingConfig, init_logging};
pub use report::{ReportService, Selection};

use analysis::narrative::RandomChooser;
use ingest::{DatasetSummary, EntityFilter};
use model::{ReportBundle, Unit};
use serde::Serialize;
use std::fmt::Write as _;
use tracing::{info, warn};

/// Resolves and validates the configuration; failures map to `InvalidConfig`.
pub fn load_config(inputs: &InputArgs, groups: Option<Vec<String>>) -> ReportResult<ReportConfig> {
    let config = ReportConfig::from_args(inputs, groups)
        .and_then(|config| config.validate().map(|_| config))
        .map_err(|err| ReportError::InvalidConfig {
            message: format!("{err:#}"),
        })?;
    Ok(config)
}

/// Dataset sums plus the group specifications built over its columns.
#[derive(Debug, Clone)]
pub struct PreparedGroups {
    pub dataset: DatasetSummary,
    pub groups: BuiltGroups,
}

pub fn prepare_groups(config: &ReportConfig) -> ReportResult<PreparedGroups> {
    let filter = match config.filter.as_ref() {
        Some(path) => {
            let filter = ingest::read_filter(path)?;
            if filter.is_empty() {
                warn!(
                    path = %path.display(),
                    columns = ?filter.columns,
                    "filter file names no entities; every row is selected"
                );
            }
            filter
        }
        None => EntityFilter::default(),
    };

    let dataset = ingest::load_dataset(&config.dataset, &filter)?;
    let candidates = dataset.candidate_columns(&config.column_prefix);
    info!(
        prefix = %config.column_prefix,
        candidates = candidates.len(),
        "discovered indicator columns"
    );

    let builder = GroupSpecBuilder::new().include_unclassified(config.include_unclassified);
    let groups = if let Some(path) = config.dictionary.as_ref() {
        let entries = ingest::read_dictionary(path)?;
        builder.build(&entries, &candidates)
    } else {
        let fields = match config.layer_dictionary.as_ref() {
            Some(path) => {
                let layer = match config.layer.clone() {
                    Some(layer) => layer,
                    None => {
                        let first = ingest::list_layers(path)?.into_iter().next().ok_or_else(
                            || ReportError::MissingLayer {
                                layer: "<first sheet>".to_string(),
                            },
                        )?;
                        warn!(layer = %first, "no layer given; using the first sheet");
                        first
                    }
                };
                ingest::read_layer_dictionary(path, &layer)?
            }
            None => Vec::new(),
        };
        builder.build_fallback(&candidates, &fields)
    };

    Ok(PreparedGroups { dataset, groups })
}

/// One line of the `groups` listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub title: String,
    pub unit: Option<Unit>,
    pub denominator: String,
    pub total_label: Option<String>,
    pub variables: Vec<String>,
}

pub fn summarize_groups(groups: &BuiltGroups) -> Vec<GroupSummary> {
    groups
        .specs
        .values()
        .map(|spec| GroupSummary {
            title: spec.title.clone(),
            unit: spec.unit,
            denominator: spec.denominator.to_string(),
            total_label: spec.total_label.clone(),
            variables: spec.variables.clone(),
        })
        .collect()
}

pub fn render_group_listing(summaries: &[GroupSummary], json: bool) -> serde_json::Result<String> {
    if json {
        return serde_json::to_string_pretty(summaries);
    }
    let mut out = String::new();
    for (idx, summary) in summaries.iter().enumerate() {
        let unit = summary
            .unit
            .map(|unit| unit.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:>3}. {} [{}; {}; {} variables]",
            idx + 1,
            summary.title,
            unit,
            summary.denominator,
            summary.variables.len()
        );
    }
    Ok(out)
}

pub fn run_groups(config: &ReportConfig) -> ReportResult<Vec<GroupSummary>> {
    let span = logging::operation_span("groups");
    let _enter = span.enter();
    let prepared = prepare_groups(config)?;
    Ok(summarize_groups(&prepared.groups))
}

/// Builds the bundle for the configured selection. A fixed seed gives
/// reproducible narrative phrasing.
pub fn build_report_bundle(
    config: &ReportConfig,
    prepared: &PreparedGroups,
) -> ReportResult<ReportBundle> {
    let selection = Selection::from_titles(config.groups.clone());
    match config.seed {
        Some(seed) => ReportService::new(RandomChooser::seeded(seed)).build_bundle(
            &prepared.groups,
            &prepared.dataset.sums,
            &selection,
        ),
        None => ReportService::new(RandomChooser::thread_local()).build_bundle(
            &prepared.groups,
            &prepared.dataset.sums,
            &selection,
        ),
    }
}

pub fn run_report(config: &ReportConfig) -> ReportResult<ExportManifest> {
    let span = logging::operation_span("report");
    let _enter = span.enter();

    let prepared = prepare_groups(config)?;
    let bundle = build_report_bundle(config, &prepared)?;
    let target = ExportTarget::now(&config.output_dir);
    let manifest = export_bundle(&bundle, &config.formats, &target)?;

    for failure in manifest.failures() {
        warn!(format = %failure.format, "export produced a placeholder");
    }
    ensure_any_written(&manifest)?;
    info!(
        files = manifest.written_paths().len(),
        output_dir = %manifest.output_dir,
        "report complete"
    );
    Ok(manifest)
}

/// Partial export failures are tolerated; a run where every format failed is
/// an error.
pub fn ensure_any_written(manifest: &ExportManifest) -> ReportResult<()> {
    if manifest.artifacts.is_empty() || manifest.failures().count() < manifest.artifacts.len() {
        return Ok(());
    }
    let message = manifest
        .failures()
        .filter_map(|artifact| match &artifact.outcome {
            export::ArtifactOutcome::Failed { placeholder } => Some(placeholder.as_str()),
            export::ArtifactOutcome::Written { .. } => None,
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(ReportError::Export {
        format: manifest
            .artifacts
            .iter()
            .map(|artifact| artifact.format.to_string())
            .collect::<Vec<_>>()
            .join(","),
        message,
    })
}
