//! Markdown vault export (Obsidian folder layout) and counseling-note import.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Local;

use super::timestamp;
use crate::material::{Material, MaterialBody};
use crate::textutil::sanitize_filename;

pub const VAULT_FOLDERS: [&str; 6] = [
    "01_カウンセリング",
    "02_システムプロンプト",
    "03_テンプレート",
    "04_トピックリスト",
    "05_生成教材",
    "06_設定",
];

#[derive(Debug)]
pub struct VaultExport {
    pub folder: PathBuf,
    pub files: Vec<PathBuf>,
}

pub struct VaultExporter {
    base: PathBuf,
}

impl VaultExporter {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn setup_folders(&self) -> anyhow::Result<()> {
        for folder in VAULT_FOLDERS {
            let dir = self.base.join(folder);
            std::fs::create_dir_all(&dir).with_context(|| format!("create vault dir: {}", dir.display()))?;
        }
        Ok(())
    }

    /// Write every material as `.md` + `.json` into
    /// `05_生成教材/<client>_<ts>/`, plus a README and the topic list.
    pub fn export(&self, materials: &[Material], client: &str, topics: &[String]) -> anyhow::Result<VaultExport> {
        self.setup_folders()?;
        let client = sanitize_filename(client);
        let folder = self
            .base
            .join(VAULT_FOLDERS[4])
            .join(format!("{client}_{}", timestamp()));
        std::fs::create_dir_all(&folder).with_context(|| format!("create dir: {}", folder.display()))?;

        let mut files = Vec::new();
        for (i, m) in materials.iter().enumerate() {
            let stem = format!("教材{:02}_{}", i + 1, sanitize_filename(&m.topic));
            let md = folder.join(format!("{stem}.md"));
            write(&md, &material_markdown(m, i + 1, &client))?;
            files.push(md);

            let json = folder.join(format!("{stem}.json"));
            let text = serde_json::to_string_pretty(m).context("serialize material")?;
            write(&json, &text)?;
            files.push(json);
        }

        let readme = folder.join("README.md");
        write(&readme, &readme_markdown(materials, &client))?;
        files.push(readme);

        if !topics.is_empty() {
            let list = folder.join("トピックリスト.md");
            write(&list, &topics_markdown(topics))?;
            files.push(list);
        }
        log::info!("vault export: {} files in {}", files.len(), folder.display());
        Ok(VaultExport { folder, files })
    }
}

fn write(path: &Path, text: &str) -> anyhow::Result<()> {
    std::fs::write(path, text).with_context(|| format!("write: {}", path.display()))
}

fn push_list(out: &mut String, heading: &str, items: &[String], numbered: bool) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("## {heading}\n\n"));
    for (i, item) in items.iter().enumerate() {
        if numbered {
            out.push_str(&format!("{}. {item}\n", i + 1));
        } else {
            out.push_str(&format!("- {item}\n"));
        }
    }
    out.push('\n');
}

fn push_text(out: &mut String, heading: &str, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    out.push_str(&format!("## {heading}\n\n{}\n\n", text.trim()));
}

pub fn material_markdown(m: &Material, number: usize, client: &str) -> String {
    let mut out = format!("# 教材{number:02}: {}\n\n", m.topic);
    out.push_str("## 📋 基本情報\n\n");
    out.push_str(&format!("- **タイプ**: {}\n", m.kind().label_ja()));
    out.push_str(&format!("- **クライアント**: {client}\n"));
    out.push_str(&format!("- **生成日時**: {}\n", m.created_at.format("%Y-%m-%d %H:%M")));
    if m.fallback {
        out.push_str("- **注記**: 既定の内容 (生成失敗)\n");
    }
    out.push('\n');

    match &m.body {
        MaterialBody::RolePlay(b) => {
            if !b.model_dialogue.trim().is_empty() {
                out.push_str(&format!(
                    "## 🎭 モデルダイアログ\n\n```dialogue\n{}\n```\n\n",
                    b.model_dialogue.trim()
                ));
            }
            push_list(&mut out, "💡 有用表現・語彙", &m.useful_expressions, false);
            push_list(&mut out, "❓ 追加質問", &b.additional_questions, true);
            push_text(&mut out, "🎤 音声スクリプト", b.audio_script.as_deref().unwrap_or(""));
        }
        MaterialBody::Discussion(b) => {
            push_text(&mut out, "💬 ディスカッショントピック", &b.discussion_topic);
            push_text(&mut out, "📚 背景情報", &b.background_info);
            push_list(&mut out, "🎯 議論ポイント", &b.key_points, false);
            push_list(&mut out, "💡 有用表現・語彙", &m.useful_expressions, false);
            push_list(&mut out, "🤔 討議質問", &b.discussion_questions, true);
        }
        MaterialBody::ExpressionPractice(b) => {
            push_text(&mut out, "📊 図表説明", &b.chart_description);
            push_list(&mut out, "📖 重要語彙", &b.useful_vocabulary, false);
            push_list(&mut out, "✏️ 練習問題", &b.practice_questions, true);
        }
    }

    out.push_str("---\n\n");
    out.push_str(&format!(
        "#教材/{} #クライアント/{} #生成日/{}\n",
        m.kind().label_ja(),
        client.replace(' ', "_"),
        m.created_at.format("%Y-%m-%d")
    ));
    out
}

fn readme_markdown(materials: &[Material], client: &str) -> String {
    let mut out = format!("# {client} 教材セット\n\n## 概要\n\n");
    out.push_str(&format!("- **作成日時**: {}\n", Local::now().format("%Y-%m-%d %H:%M")));
    out.push_str(&format!("- **教材数**: {}\n", materials.len()));
    let total: usize = materials.iter().map(|m| m.useful_expressions.len()).sum();
    out.push_str(&format!("- **有用表現 合計**: {total}\n\n## ファイル一覧\n\n"));
    for (i, m) in materials.iter().enumerate() {
        out.push_str(&format!(
            "- [[教材{:02}_{}]] ({})\n",
            i + 1,
            sanitize_filename(&m.topic),
            m.kind().label_ja()
        ));
    }
    out
}

fn topics_markdown(topics: &[String]) -> String {
    let mut out = String::from("# トピックリスト\n\n");
    for (i, t) in topics.iter().enumerate() {
        out.push_str(&format!("{}. {t}\n", i + 1));
    }
    out
}

/// Counseling context pulled out of a Markdown note.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImportedContext {
    pub counseling_memo: String,
    pub teaching_policy: String,
    pub business_scenes: String,
    pub topics: Vec<String>,
}

/// Split on `##` headings and pick sections by keyword. Content lines are the
/// non-empty lines not starting with `#`; topics are `- ` / `* ` list items.
pub fn parse_markdown_context(content: &str) -> ImportedContext {
    let mut out = ImportedContext::default();
    for section in content.split("\n##").map(|s| s.trim_start_matches('#')) {
        let mut lines = section.lines();
        let heading = lines.next().unwrap_or("").trim();
        let body: Vec<&str> = lines
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        let text = body.join("\n");
        if heading.contains("カウンセリング内容") {
            out.counseling_memo = text;
        } else if heading.contains("学習方針") {
            out.teaching_policy = text;
        } else if heading.contains("ビジネスシーン") {
            out.business_scenes = text;
        } else if heading.contains("トピック") {
            out.topics = body
                .iter()
                .filter_map(|l| l.strip_prefix("- ").or_else(|| l.strip_prefix("* ")))
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{discussion, role_play};

    #[test]
    fn export_writes_folder_tree_and_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let exporter = VaultExporter::new(tmp.path());
        let materials = vec![role_play("商談", &["a: b"]), discussion("会議", &["c: d", "e: f"])];
        let result = exporter
            .export(&materials, "Acme Bank", &["商談".to_string(), "会議".to_string()])
            .expect("export");

        for folder in VAULT_FOLDERS {
            assert!(tmp.path().join(folder).is_dir(), "{folder}");
        }
        assert_eq!(result.files.len(), 6);
        let md = std::fs::read_to_string(result.folder.join("教材01_商談.md")).expect("md");
        assert!(md.starts_with("# 教材01: 商談\n\n## 📋 基本情報"));
        assert!(md.contains("```dialogue\nA: Let's talk about 商談."));
        assert!(md.contains("#教材/ロールプレイ #クライアント/Acme_Bank"));
        let readme = std::fs::read_to_string(result.folder.join("README.md")).expect("readme");
        assert!(readme.contains("- **有用表現 合計**: 3"));
        let topics = std::fs::read_to_string(result.folder.join("トピックリスト.md")).expect("topics");
        assert!(topics.contains("2. 会議"));
    }

    #[test]
    fn markdown_context_import_picks_sections() {
        let note = "# 田中様\n\n## カウンセリング内容\n融資審査の英語対応\n\n海外顧客が増加\n\n\
                    ## 学習方針\n実践重視\n\n## ビジネスシーン\n電話会議\n\n\
                    ## トピック\n- 融資の提案\n* 審査結果の説明\nメモ\n";
        let ctx = parse_markdown_context(note);
        assert_eq!(ctx.counseling_memo, "融資審査の英語対応\n海外顧客が増加");
        assert_eq!(ctx.teaching_policy, "実践重視");
        assert_eq!(ctx.business_scenes, "電話会議");
        assert_eq!(ctx.topics, vec!["融資の提案", "審査結果の説明"]);
    }
}
