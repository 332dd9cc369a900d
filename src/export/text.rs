use std::path::{Path, PathBuf};

use anyhow::Context;

use super::timestamp;
use crate::material::{Material, MaterialBody};

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("【{heading}】\n"));
    for item in items {
        out.push_str(&format!("• {item}\n"));
    }
    out.push('\n');
}

fn push_text(out: &mut String, heading: &str, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    out.push_str(&format!("【{heading}】\n{}\n\n", text.trim()));
}

/// Plain-text rendering of a batch, one block per material.
pub fn render_materials_text(materials: &[Material]) -> String {
    let mut out = String::new();
    for (i, m) in materials.iter().enumerate() {
        out.push_str(&format!("=== 教材 {}: {} ===\n\n", i + 1, m.topic));
        out.push_str(&format!("タイプ: {}\n", m.kind().label_ja()));
        out.push_str(&format!("生成日時: {}\n", m.created_at.format("%Y-%m-%d %H:%M:%S")));
        if m.fallback {
            out.push_str("注記: 生成に失敗したため既定の内容です\n");
        }
        out.push('\n');

        match &m.body {
            MaterialBody::RolePlay(b) => {
                push_text(&mut out, "対話文", &b.model_dialogue);
                push_list(&mut out, "有用表現", &m.useful_expressions);
                push_list(&mut out, "追加質問", &b.additional_questions);
                push_text(&mut out, "音声スクリプト", b.audio_script.as_deref().unwrap_or(""));
            }
            MaterialBody::Discussion(b) => {
                push_text(&mut out, "ディスカッショントピック", &b.discussion_topic);
                push_text(&mut out, "背景情報", &b.background_info);
                push_list(&mut out, "議論ポイント", &b.key_points);
                push_list(&mut out, "有用表現", &m.useful_expressions);
                push_list(&mut out, "討議質問", &b.discussion_questions);
            }
            MaterialBody::ExpressionPractice(b) => {
                push_text(&mut out, "図表説明", &b.chart_description);
                push_list(&mut out, "重要語彙", &b.useful_vocabulary);
                push_list(&mut out, "練習問題", &b.practice_questions);
            }
        }
        out.push('\n');
        out.push_str(&"=".repeat(50));
        out.push_str("\n\n");
    }
    out
}

pub fn write_materials_text(dir: &Path, materials: &[Material], selected: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;
    let prefix = if selected { "selected_materials" } else { "materials" };
    let path = dir.join(format!("{prefix}_{}.txt", timestamp()));
    std::fs::write(&path, render_materials_text(materials))
        .with_context(|| format!("write text export: {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{discussion, role_play};

    #[test]
    fn text_export_uses_section_headings() {
        let text = render_materials_text(&[
            role_play("商談", &["Let's begin: 始めましょう"]),
            discussion("在宅勤務", &[]),
        ]);
        assert!(text.starts_with("=== 教材 1: 商談 ===\n\nタイプ: ロールプレイ\n"));
        assert!(text.contains("【対話文】\nA: Let's talk about 商談."));
        assert!(text.contains("【有用表現】\n• Let's begin: 始めましょう\n"));
        assert!(text.contains("=== 教材 2: 在宅勤務 ==="));
        assert!(text.contains("【議論ポイント】\n• cost\n"));
        assert!(!text.contains("【図表説明】"));
        assert!(text.ends_with(&format!("{}\n\n", "=".repeat(50))));
    }
}
