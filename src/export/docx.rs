//! Minimal WordprocessingML writer: numbered table captions, one table per
//! report and the narrative paragraphs after it.

use super::{ExportFormat, ExportTarget, Exporter, bundle_stem, ensure_parent};
use crate::model::{Report, ReportBundle};
use anyhow::Context;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use zip::CompressionMethod;
use zip::write::FileOptions;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

#[derive(Debug, Clone, Copy, Default)]
pub struct DocxExporter;

impl Exporter for DocxExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Docx
    }

    fn export(&self, bundle: &ReportBundle, target: &ExportTarget) -> anyhow::Result<Vec<PathBuf>> {
        let document = document_xml(bundle)?;
        let path = target.path_for(bundle_stem(bundle), ExportFormat::Docx);
        ensure_parent(&path)?;
        let file =
            File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;

        let mut zip = zip::ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, bytes) in [
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", ROOT_RELS.as_bytes()),
            ("word/document.xml", document.as_slice()),
        ] {
            zip.start_file(name, options)?;
            zip.write_all(bytes)?;
        }
        zip.finish()?;
        Ok(vec![path])
    }
}

struct DocumentWriter {
    xml: Writer<Vec<u8>>,
}

impl DocumentWriter {
    fn new() -> Self {
        Self {
            xml: Writer::new(Vec::new()),
        }
    }

    fn start(&mut self, tag: &str) -> anyhow::Result<()> {
        self.xml.write_event(Event::Start(BytesStart::new(tag)))?;
        Ok(())
    }

    fn end(&mut self, tag: &str) -> anyhow::Result<()> {
        self.xml.write_event(Event::End(BytesEnd::new(tag)))?;
        Ok(())
    }

    fn empty(&mut self, tag: &str, attrs: &[(&str, &str)]) -> anyhow::Result<()> {
        let mut elem = BytesStart::new(tag);
        for attr in attrs {
            elem.push_attribute(*attr);
        }
        self.xml.write_event(Event::Empty(elem))?;
        Ok(())
    }

    fn run(&mut self, text: &str, bold: bool) -> anyhow::Result<()> {
        self.start("w:r")?;
        if bold {
            self.start("w:rPr")?;
            self.empty("w:b", &[])?;
            self.end("w:rPr")?;
        }
        let mut t = BytesStart::new("w:t");
        t.push_attribute(("xml:space", "preserve"));
        self.xml.write_event(Event::Start(t))?;
        self.xml.write_event(Event::Text(BytesText::new(text)))?;
        self.end("w:t")?;
        self.end("w:r")
    }

    fn paragraph(&mut self, text: &str, bold: bool, align_right: bool) -> anyhow::Result<()> {
        self.start("w:p")?;
        if align_right {
            self.start("w:pPr")?;
            self.empty("w:jc", &[("w:val", "right")])?;
            self.end("w:pPr")?;
        }
        self.run(text, bold)?;
        self.end("w:p")
    }

    fn cell(&mut self, text: &str, bold: bool, align_right: bool) -> anyhow::Result<()> {
        self.start("w:tc")?;
        self.paragraph(text, bold, align_right)?;
        self.end("w:tc")
    }

    fn table(&mut self, report: &Report) -> anyhow::Result<()> {
        self.start("w:tbl")?;
        self.start("w:tblPr")?;
        self.empty("w:tblW", &[("w:w", "0"), ("w:type", "auto")])?;
        self.start("w:tblBorders")?;
        for edge in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
            self.empty(edge, &[("w:val", "single"), ("w:sz", "4"), ("w:color", "999999")])?;
        }
        self.end("w:tblBorders")?;
        self.end("w:tblPr")?;

        let has_category = report.category_column.is_some();
        self.start("w:tr")?;
        if let Some(column) = &report.category_column {
            self.cell(column, true, false)?;
        }
        self.cell("Descripción", true, false)?;
        self.cell("Valor", true, true)?;
        self.cell("Porcentaje", true, true)?;
        self.end("w:tr")?;

        for row in &report.rows {
            let bold = row.is_total || row.is_subtotal;
            self.start("w:tr")?;
            if has_category {
                self.cell(row.category.as_deref().unwrap_or(""), bold, false)?;
            }
            self.cell(&row.label, bold, false)?;
            self.cell(&row.display_value(), bold, true)?;
            self.cell(&row.display_percentage(), bold, true)?;
            self.end("w:tr")?;
        }
        self.end("w:tbl")
    }

    fn into_inner(self) -> Vec<u8> {
        self.xml.into_inner()
    }
}

/// Serializes the `word/document.xml` part.
pub fn document_xml(bundle: &ReportBundle) -> anyhow::Result<Vec<u8>> {
    let mut doc = DocumentWriter::new();
    doc.xml
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    let mut root = BytesStart::new("w:document");
    root.push_attribute(("xmlns:w", WORD_NS));
    doc.xml.write_event(Event::Start(root))?;
    doc.start("w:body")?;

    for (idx, report) in bundle.reports.iter().enumerate() {
        doc.paragraph(&format!("Tabla {}. {}", idx + 1, report.title), true, false)?;
        doc.table(report)?;
        for paragraph in &report.narratives {
            if let Some(heading) = &paragraph.heading {
                doc.paragraph(heading, true, false)?;
            }
            doc.paragraph(&paragraph.text, false, false)?;
        }
    }

    doc.start("w:sectPr")?;
    doc.empty("w:pgSz", &[("w:w", "12240"), ("w:h", "15840")])?;
    doc.end("w:sectPr")?;
    doc.end("w:body")?;
    doc.end("w:document")?;
    Ok(doc.into_inner())
}
