use anyhow::{anyhow, Context};

use crate::export::{docx, json, text, timestamp, DocumentExporter, ExportFormat, GoogleDocsClient, VaultExporter};
use crate::export::gdocs::document_title;
use crate::material::Material;

use super::config::StudioConfig;
use super::session::Session;

/// Parse a 1-based selection such as `1,3,5` into zero-based indexes.
pub fn parse_selection(raw: &str, len: usize) -> anyhow::Result<Vec<usize>> {
    let mut out = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let n: usize = part
            .parse()
            .with_context(|| format!("invalid material number: {part}"))?;
        if n == 0 || n > len {
            return Err(anyhow!("material number out of range: {n} (1..={len})"));
        }
        if !out.contains(&(n - 1)) {
            out.push(n - 1);
        }
    }
    if out.is_empty() {
        return Err(anyhow!("empty selection"));
    }
    Ok(out)
}

/// Write the session's materials (or a selection) and return one line per
/// produced artifact.
pub fn export_materials(
    cfg: &StudioConfig,
    session: &Session,
    format: ExportFormat,
    selection: Option<&str>,
    client_name: Option<&str>,
) -> anyhow::Result<Vec<String>> {
    if session.materials.is_empty() {
        return Err(anyhow!("no materials to export (run: material-studio generate)"));
    }
    let (materials, selected): (Vec<Material>, bool) = match selection {
        Some(raw) => (
            session
                .materials
                .select(&parse_selection(raw, session.materials.len())?),
            true,
        ),
        None => (session.materials.materials().to_vec(), false),
    };
    let dir = &cfg.output_dir;

    let lines = match format {
        ExportFormat::Json => {
            vec![json::write_materials_json(dir, &materials, selected)?.display().to_string()]
        }
        ExportFormat::Text => {
            vec![text::write_materials_text(dir, &materials, selected)?.display().to_string()]
        }
        ExportFormat::Docx => docx::export_docx(dir, &materials, &cfg.author)?
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        ExportFormat::Markdown => {
            let client = client_name.unwrap_or("client");
            let result = VaultExporter::new(&cfg.vault_dir).export(&materials, client, &session.topics)?;
            vec![result.folder.display().to_string()]
        }
        ExportFormat::GoogleDocs => {
            let mut exporter = GoogleDocsClient::from_credentials(cfg.google_credentials.as_deref(), cfg.timeout)
                .with_author(cfg.author.clone());
            export_remote(&mut exporter, &materials)?
        }
    };
    Ok(lines)
}

/// One document per material. A failed document is reported and the rest
/// continue; an unavailable exporter yields its setup guidance as the error.
pub fn export_remote(exporter: &mut dyn DocumentExporter, materials: &[Material]) -> anyhow::Result<Vec<String>> {
    if !exporter.is_available() {
        return Err(anyhow!(
            "Google Docs export is not configured.\n{}",
            exporter.setup_instructions()
        ));
    }
    let ts = timestamp();
    let mut lines = Vec::with_capacity(materials.len());
    for (i, m) in materials.iter().enumerate() {
        let title = document_title(m, &ts, i + 1);
        match exporter.create_and_write_material(&title, m) {
            Ok(Some(url)) => lines.push(format!("{title}: {url}")),
            Ok(None) => lines.push(format!("{title}: skipped (exporter unavailable)")),
            Err(err) => {
                log::warn!("document export failed for '{}': {err:#}", m.topic);
                lines.push(format!("{title}: failed ({err})"));
            }
        }
    }
    Ok(lines)
}
