use super::{ExportFormat, ExportTarget, Exporter, bundle_stem, ensure_parent};
use crate::model::{Report, ReportBundle};
use anyhow::Context as _;
use serde::Serialize;
use std::path::PathBuf;
use tera::{Context, Tera};

const TEMPLATE_NAME: &str = "report.html";

/// Built-in page. Tera autoescapes `.html` templates, so titles and labels
/// from the dictionary are emitted as text.
pub const DEFAULT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<title>{{ title }}</title>
<style>
body { font-family: sans-serif; margin: 2rem; color: #222; }
table { border-collapse: collapse; margin-bottom: 1rem; }
th, td { border: 1px solid #bbb; padding: 0.3rem 0.6rem; }
td.num { text-align: right; }
tr.total td { font-weight: bold; background: #f2f2f2; }
caption { font-weight: bold; text-align: left; padding-bottom: 0.4rem; }
</style>
</head>
<body>
<h1>{{ title }}</h1>
<p>Generado: {{ generated_at }}</p>
{% for report in reports %}
<section>
<table>
<caption>Tabla {{ loop.index }}. {{ report.title }}</caption>
<thead><tr>{% if report.category_column %}<th>{{ report.category_column }}</th>{% endif %}<th>Descripción</th><th>Valor</th><th>Porcentaje</th></tr></thead>
<tbody>
{% for row in report.rows %}<tr{% if row.emphasis %} class="total"{% endif %}>{% if report.category_column %}<td>{{ row.category }}</td>{% endif %}<td>{{ row.label }}</td><td class="num">{{ row.value }}</td><td class="num">{{ row.percentage }}</td></tr>
{% endfor %}
</tbody>
</table>
{% for paragraph in report.narratives %}{% if paragraph.heading %}<h3>{{ paragraph.heading }}</h3>{% endif %}
<p>{{ paragraph.text }}</p>
{% endfor %}
</section>
{% endfor %}
</body>
</html>
"#;

#[derive(Debug, Clone)]
pub struct HtmlExporter {
    template: String,
}

impl Default for HtmlExporter {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct PageView<'a> {
    title: &'a str,
    generated_at: &'a str,
    reports: Vec<ReportView<'a>>,
}

#[derive(Debug, Serialize)]
struct ReportView<'a> {
    title: &'a str,
    unit: Option<String>,
    category_column: Option<&'a str>,
    rows: Vec<RowView<'a>>,
    narratives: &'a [crate::model::NarrativeParagraph],
}

#[derive(Debug, Serialize)]
struct RowView<'a> {
    category: &'a str,
    label: &'a str,
    value: String,
    percentage: String,
    emphasis: bool,
}

impl<'a> ReportView<'a> {
    fn new(report: &'a Report) -> Self {
        Self {
            title: &report.title,
            unit: report.unit.map(|u| u.to_string()),
            category_column: report.category_column.as_deref(),
            rows: report
                .rows
                .iter()
                .map(|row| RowView {
                    category: row.category.as_deref().unwrap_or(""),
                    label: &row.label,
                    value: row.display_value(),
                    percentage: row.display_percentage(),
                    emphasis: row.is_total || row.is_subtotal,
                })
                .collect(),
            narratives: &report.narratives,
        }
    }
}

impl HtmlExporter {
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn render(&self, bundle: &ReportBundle, generated_at: &str) -> crate::error::ReportResult<String> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, &self.template)?;
        let view = PageView {
            title: bundle_stem(bundle),
            generated_at,
            reports: bundle.reports.iter().map(ReportView::new).collect(),
        };
        let context = Context::from_serialize(&view)?;
        Ok(tera.render(TEMPLATE_NAME, &context)?)
    }
}

impl Exporter for HtmlExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Html
    }

    fn export(&self, bundle: &ReportBundle, target: &ExportTarget) -> anyhow::Result<Vec<PathBuf>> {
        let html = self.render(bundle, &target.timestamp)?;
        let path = target.path_for(bundle_stem(bundle), ExportFormat::Html);
        ensure_parent(&path)?;
        std::fs::write(&path, html).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(vec![path])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AggregatedRow, DenominatorPolicy};

    #[test]
    fn labels_are_escaped() {
        let report = Report {
            title: "Ingresos <hogar>".into(),
            unit: None,
            rows: vec![AggregatedRow {
                label: "A & B".into(),
                column: Some("n_ab".into()),
                raw_value: 1500.0,
                value: 1500.0,
                percentage: Some(100.0),
                is_total: false,
                is_subtotal: false,
                category: None,
            }],
            category_column: None,
            denominator: DenominatorPolicy::SumOfMembers,
            narratives: Vec::new(),
        };
        let html = HtmlExporter::default()
            .render(&ReportBundle::new(vec![report]), "20240101_000000")
            .expect("render");
        assert!(html.contains("Ingresos &lt;hogar&gt;"));
        assert!(html.contains("A &amp; B"));
        assert!(html.contains("1.500"));
        assert!(html.contains("100,0%"));
    }

    #[test]
    fn broken_template_is_an_error() {
        let exporter = HtmlExporter::with_template("{% for x in %}");
        assert!(exporter.render(&ReportBundle::default(), "now").is_err());
    }
}
