//! Group selection and bundle assembly.

use crate::analysis::aggregate::aggregate;
use crate::analysis::narrative::{NarrativeGenerator, PhraseChooser};
use crate::error::{ReportError, ReportResult};
use crate::grouping::BuiltGroups;
use crate::logging::report_span;
use crate::model::{ColumnSums, GroupSpec, ReportBundle};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Titles(Vec<String>),
}

impl Selection {
    pub fn from_titles(titles: Vec<String>) -> Self {
        let titles: Vec<String> = titles
            .into_iter()
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .collect();
        if titles.is_empty() {
            Selection::All
        } else {
            Selection::Titles(titles)
        }
    }
}

/// Resolves the requested titles against the built map, keeping the map's
/// order. Unknown titles are a caller error.
pub fn select_groups<'a>(
    groups: &'a BuiltGroups,
    selection: &Selection,
) -> ReportResult<Vec<&'a GroupSpec>> {
    let selected: Vec<&GroupSpec> = match selection {
        Selection::All => groups.specs.values().collect(),
        Selection::Titles(titles) => {
            if let Some(unknown) = titles.iter().find(|title| !groups.specs.contains_key(*title)) {
                return Err(ReportError::UnknownGroup {
                    title: unknown.clone(),
                    available: groups.specs.keys().cloned().collect(),
                });
            }
            groups
                .specs
                .values()
                .filter(|spec| titles.contains(&spec.title))
                .collect()
        }
    };
    if selected.is_empty() {
        return Err(ReportError::NoGroupsSelected);
    }
    Ok(selected)
}

pub struct ReportService<C> {
    narrator: NarrativeGenerator<C>,
}

impl<C: PhraseChooser> ReportService<C> {
    pub fn new(chooser: C) -> Self {
        Self {
            narrator: NarrativeGenerator::new(chooser),
        }
    }

    /// Aggregates and narrates every selected group.
    pub fn build_bundle(
        &mut self,
        groups: &BuiltGroups,
        sums: &ColumnSums,
        selection: &Selection,
    ) -> ReportResult<ReportBundle> {
        let selected = select_groups(groups, selection)?;
        let mut reports = Vec::with_capacity(selected.len());
        for spec in selected {
            let span = report_span(&spec.title);
            let _enter = span.enter();
            let mut report = aggregate(spec, sums, &groups.labels);
            report.narratives = self.narrator.describe_report(&report);
            debug!(
                rows = report.rows.len(),
                paragraphs = report.narratives.len(),
                "report ready"
            );
            reports.push(report);
        }
        let bundle = ReportBundle::new(reports);
        info!(
            reports = bundle.reports.len(),
            rows = bundle.combined_rows.len(),
            "built report bundle"
        );
        Ok(bundle)
    }
}
