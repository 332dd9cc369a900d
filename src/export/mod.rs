pub mod docx;
pub mod gdocs;
pub mod json;
pub mod sections;
pub mod text;
pub mod vault;

use chrono::Local;

pub use gdocs::{DocumentExporter, GoogleDocsClient};
pub use vault::{parse_markdown_context, ImportedContext, VaultExporter};

/// `YYYYMMDD_HHMMSS`, the suffix of every exported file name.
pub fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Text,
    Markdown,
    Docx,
    GoogleDocs,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "text" | "txt" => Some(Self::Text),
            "markdown" | "md" | "obsidian" | "vault" => Some(Self::Markdown),
            "docx" | "word" => Some(Self::Docx),
            "gdocs" | "google" | "google-docs" => Some(Self::GoogleDocs),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names() {
        assert_eq!(ExportFormat::parse("JSON"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("md"), Some(ExportFormat::Markdown));
        assert_eq!(ExportFormat::parse("google-docs"), Some(ExportFormat::GoogleDocs));
        assert_eq!(ExportFormat::parse("pdf"), None);
        assert_eq!(timestamp().len(), 15);
    }
}
