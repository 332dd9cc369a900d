//! Minimal WordprocessingML writer for offline export.
//!
//! Produces a three-part package (content types, package rels, document body).
//! Every section heading becomes a bold paragraph and every body line a plain
//! paragraph, so Word and LibreOffice both open it without a styles part.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::sections::{document_title, footer_lines, material_sections};
use super::timestamp;
use crate::material::Material;
use crate::textutil::sanitize_filename;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const WORD_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

#[derive(Clone, Copy)]
enum RunStyle {
    Plain,
    Heading,
    Title,
}

struct BodyWriter {
    w: quick_xml::Writer<Vec<u8>>,
}

impl BodyWriter {
    fn new() -> anyhow::Result<Self> {
        let mut w = quick_xml::Writer::new(Vec::new());
        w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .context("write decl")?;
        let mut doc = BytesStart::new("w:document");
        doc.push_attribute(("xmlns:w", WORD_NS));
        w.write_event(Event::Start(doc)).context("write document start")?;
        w.write_event(Event::Start(BytesStart::new("w:body")))
            .context("write body start")?;
        Ok(Self { w })
    }

    fn paragraph(&mut self, text: &str, style: RunStyle) -> anyhow::Result<()> {
        let w = &mut self.w;
        w.write_event(Event::Start(BytesStart::new("w:p"))).context("write p")?;
        w.write_event(Event::Start(BytesStart::new("w:r"))).context("write r")?;
        let size = match style {
            RunStyle::Plain => None,
            RunStyle::Heading => Some("28"),
            RunStyle::Title => Some("36"),
        };
        if let Some(size) = size {
            w.write_event(Event::Start(BytesStart::new("w:rPr"))).context("write rPr")?;
            w.write_event(Event::Empty(BytesStart::new("w:b"))).context("write b")?;
            let mut sz = BytesStart::new("w:sz");
            sz.push_attribute(("w:val", size));
            w.write_event(Event::Empty(sz)).context("write sz")?;
            w.write_event(Event::End(BytesEnd::new("w:rPr"))).context("write rPr end")?;
        }
        let mut t = BytesStart::new("w:t");
        t.push_attribute(("xml:space", "preserve"));
        w.write_event(Event::Start(t)).context("write t")?;
        w.write_event(Event::Text(BytesText::new(text))).context("write text")?;
        w.write_event(Event::End(BytesEnd::new("w:t"))).context("write t end")?;
        w.write_event(Event::End(BytesEnd::new("w:r"))).context("write r end")?;
        w.write_event(Event::End(BytesEnd::new("w:p"))).context("write p end")?;
        Ok(())
    }

    fn finish(mut self) -> anyhow::Result<Vec<u8>> {
        self.w
            .write_event(Event::End(BytesEnd::new("w:body")))
            .context("write body end")?;
        self.w
            .write_event(Event::End(BytesEnd::new("w:document")))
            .context("write document end")?;
        Ok(self.w.into_inner())
    }
}

/// `word/document.xml` for one material.
pub fn document_xml(material: &Material, author: &str) -> anyhow::Result<Vec<u8>> {
    let mut body = BodyWriter::new()?;
    body.paragraph(&document_title(material), RunStyle::Title)?;
    body.paragraph(&format!("トピック: {}", material.topic), RunStyle::Plain)?;
    for section in material_sections(material) {
        body.paragraph("", RunStyle::Plain)?;
        body.paragraph(section.heading, RunStyle::Heading)?;
        for line in section.body_lines() {
            body.paragraph(&line, RunStyle::Plain)?;
        }
    }
    body.paragraph("---", RunStyle::Plain)?;
    for line in footer_lines(author, Local::now()) {
        body.paragraph(&line, RunStyle::Plain)?;
    }
    body.finish()
}

pub fn write_docx(path: &Path, material: &Material, author: &str) -> anyhow::Result<()> {
    let document = document_xml(material, author)?;
    let f = File::create(path).with_context(|| format!("create docx: {}", path.display()))?;
    let mut zout = ZipWriter::new(f);
    let parts: [(&str, &[u8]); 3] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ("word/document.xml", &document),
    ];
    for (name, data) in parts {
        let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zout.start_file(name, opts)
            .with_context(|| format!("start zip file: {name}"))?;
        zout.write_all(data)
            .with_context(|| format!("write zip file: {name}"))?;
    }
    zout.finish().context("finish zip")?;
    Ok(())
}

/// One `.docx` per material: `教材_<ts>_<n>_<topic>.docx`.
pub fn export_docx(dir: &Path, materials: &[Material], author: &str) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;
    let ts = timestamp();
    let mut written = Vec::with_capacity(materials.len());
    for (i, m) in materials.iter().enumerate() {
        let name = format!("教材_{ts}_{}_{}.docx", i + 1, sanitize_filename(&m.topic));
        let path = dir.join(name);
        write_docx(&path, m, author)?;
        log::debug!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}
