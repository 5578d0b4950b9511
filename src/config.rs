use crate::export::ExportFormat;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_OUTPUT_DIR: &str = "Resultados";
const DEFAULT_COLUMN_PREFIX: &str = "n_";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    pub dataset: PathBuf,
    pub dictionary: Option<PathBuf>,
    pub layer_dictionary: Option<PathBuf>,
    pub layer: Option<String>,
    pub filter: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub formats: Vec<ExportFormat>,
    pub column_prefix: String,
    pub include_unclassified: bool,
    /// Fixed seed for narrative phrasing; `None` uses the thread RNG.
    pub seed: Option<u64>,
    /// Requested group titles; empty selects every group.
    pub groups: Vec<String>,
}

impl ReportConfig {
    /// Merges CLI values over config-file values over defaults.
    pub fn from_args(args: &InputArgs, groups: Option<Vec<String>>) -> Result<Self> {
        let file_config = if let Some(path) = args.config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            dataset: file_dataset,
            dictionary: file_dictionary,
            layer_dictionary: file_layer_dictionary,
            layer: file_layer,
            filter: file_filter,
            output_dir: file_output_dir,
            formats: file_formats,
            column_prefix: file_column_prefix,
            include_unclassified: file_include_unclassified,
            seed: file_seed,
            groups: file_groups,
        } = file_config;

        let dataset = args
            .dataset
            .clone()
            .or(file_dataset)
            .context("no dataset configured (use --dataset or `dataset:` in the config file)")?;

        let mut formats: Vec<ExportFormat> = Vec::new();
        for format in args
            .formats
            .clone()
            .or(file_formats)
            .unwrap_or_else(|| ExportFormat::ALL.to_vec())
        {
            if !formats.contains(&format) {
                formats.push(format);
            }
        }

        let column_prefix = args
            .column_prefix
            .clone()
            .or(file_column_prefix)
            .map(|prefix| prefix.trim().to_string())
            .unwrap_or_else(|| DEFAULT_COLUMN_PREFIX.to_string());

        let include_unclassified = if args.no_unclassified {
            false
        } else {
            file_include_unclassified.unwrap_or(true)
        };

        let groups = groups
            .or(file_groups)
            .unwrap_or_default()
            .into_iter()
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .collect();

        Ok(Self {
            dataset,
            dictionary: args.dictionary.clone().or(file_dictionary),
            layer_dictionary: args.layer_dictionary.clone().or(file_layer_dictionary),
            layer: args
                .layer
                .clone()
                .or(file_layer)
                .map(|layer| layer.trim().to_string())
                .filter(|layer| !layer.is_empty()),
            filter: args.filter.clone().or(file_filter),
            output_dir: args
                .output_dir
                .clone()
                .or(file_output_dir)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            formats,
            column_prefix,
            include_unclassified,
            seed: args.seed.or(file_seed),
            groups,
        })
    }

    pub fn validate(&self) -> Result<()> {
        ensure_file(&self.dataset, "dataset")?;
        if let Some(path) = self.dictionary.as_ref() {
            ensure_file(path, "dictionary")?;
        }
        if let Some(path) = self.layer_dictionary.as_ref() {
            ensure_file(path, "layer dictionary")?;
        }
        if let Some(path) = self.filter.as_ref() {
            ensure_file(path, "filter")?;
        }
        anyhow::ensure!(
            !self.column_prefix.is_empty(),
            "column prefix must not be empty"
        );
        anyhow::ensure!(
            !self.formats.is_empty(),
            "at least one export format must be provided"
        );
        anyhow::ensure!(
            self.layer.is_none() || self.layer_dictionary.is_some(),
            "--layer requires --layer-dictionary"
        );
        Ok(())
    }
}

fn ensure_file(path: &Path, what: &str) -> Result<()> {
    anyhow::ensure!(path.exists(), "configured {what} {:?} does not exist", path);
    anyhow::ensure!(path.is_file(), "configured {what} {:?} is not a file", path);
    Ok(())
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "census-report",
    about = "Grouped census indicator reports with narrative summaries",
    version
)]
pub struct CliArgs {
    #[command(flatten)]
    pub inputs: InputArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Print the group specifications built from the inputs.
    Groups {
        #[arg(long, help = "Emit JSON instead of a plain listing")]
        json: bool,
    },
    /// Build the selected reports and export them.
    Report {
        #[arg(
            long,
            env = "CENSUS_REPORT_GROUPS",
            value_name = "TITLE",
            value_delimiter = ',',
            help = "Comma-separated group titles to report (default: all)"
        )]
        groups: Option<Vec<String>>,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub struct InputArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "CENSUS_REPORT_DATASET",
        value_name = "FILE",
        help = "Entity dataset CSV, one row per entity",
        global = true
    )]
    pub dataset: Option<PathBuf>,

    #[arg(
        long,
        env = "CENSUS_REPORT_DICTIONARY",
        value_name = "FILE",
        help = "Curated variable dictionary CSV",
        global = true
    )]
    pub dictionary: Option<PathBuf>,

    #[arg(
        long,
        env = "CENSUS_REPORT_LAYER_DICTIONARY",
        value_name = "FILE",
        help = "Layer dictionary workbook used when no curated dictionary is given",
        global = true
    )]
    pub layer_dictionary: Option<PathBuf>,

    #[arg(
        long,
        env = "CENSUS_REPORT_LAYER",
        value_name = "NAME",
        help = "Sheet of the layer dictionary to read",
        global = true
    )]
    pub layer: Option<String>,

    #[arg(
        long,
        env = "CENSUS_REPORT_FILTER",
        value_name = "FILE",
        help = "XLSX or CSV listing the entities to include",
        global = true
    )]
    pub filter: Option<PathBuf>,

    #[arg(
        long,
        env = "CENSUS_REPORT_OUTPUT_DIR",
        value_name = "DIR",
        help = "Directory receiving exported files",
        global = true
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(
        long,
        env = "CENSUS_REPORT_FORMATS",
        value_enum,
        value_name = "FORMAT",
        value_delimiter = ',',
        help = "Comma-separated export formats (csv, xlsx, html, docx)",
        global = true
    )]
    pub formats: Option<Vec<ExportFormat>>,

    #[arg(
        long,
        env = "CENSUS_REPORT_COLUMN_PREFIX",
        value_name = "PREFIX",
        help = "Prefix identifying indicator columns",
        global = true
    )]
    pub column_prefix: Option<String>,

    #[arg(
        long,
        env = "CENSUS_REPORT_NO_UNCLASSIFIED",
        help = "Do not emit the unclassified-variables group",
        global = true
    )]
    pub no_unclassified: bool,

    #[arg(
        long,
        env = "CENSUS_REPORT_SEED",
        value_name = "N",
        help = "Seed for deterministic narrative phrasing",
        value_parser = clap::value_parser!(u64),
        global = true
    )]
    pub seed: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct PartialConfig {
    dataset: Option<PathBuf>,
    dictionary: Option<PathBuf>,
    layer_dictionary: Option<PathBuf>,
    layer: Option<String>,
    filter: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    formats: Option<Vec<ExportFormat>>,
    column_prefix: Option<String>,
    include_unclassified: Option<bool>,
    seed: Option<u64>,
    groups: Option<Vec<String>>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
