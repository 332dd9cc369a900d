//! Format-neutral layout of one material, shared by the text, Markdown,
//! DOCX and Google Docs writers.

use chrono::{DateTime, Local};

use crate::material::{Material, MaterialBody};

#[derive(Clone, Debug, PartialEq)]
pub enum SectionBody {
    Text(String),
    Bullets(Vec<String>),
    Numbered(Vec<String>),
    Preformatted(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DocSection {
    pub heading: &'static str,
    pub body: SectionBody,
}

impl DocSection {
    fn text(heading: &'static str, text: &str) -> Option<Self> {
        let t = text.trim();
        (!t.is_empty()).then(|| Self {
            heading,
            body: SectionBody::Text(t.to_string()),
        })
    }

    fn bullets(heading: &'static str, items: &[String]) -> Option<Self> {
        (!items.is_empty()).then(|| Self {
            heading,
            body: SectionBody::Bullets(items.to_vec()),
        })
    }

    fn numbered(heading: &'static str, items: &[String]) -> Option<Self> {
        (!items.is_empty()).then(|| Self {
            heading,
            body: SectionBody::Numbered(items.to_vec()),
        })
    }

    fn pre(heading: &'static str, text: &str) -> Option<Self> {
        let t = text.trim();
        (!t.is_empty()).then(|| Self {
            heading,
            body: SectionBody::Preformatted(t.to_string()),
        })
    }

    /// Plain-text lines of the body (bullets as `• `, numbers as `1. `).
    pub fn body_lines(&self) -> Vec<String> {
        match &self.body {
            SectionBody::Text(t) | SectionBody::Preformatted(t) => {
                t.lines().map(|l| l.to_string()).collect()
            }
            SectionBody::Bullets(items) => items.iter().map(|i| format!("• {i}")).collect(),
            SectionBody::Numbered(items) => items
                .iter()
                .enumerate()
                .map(|(n, i)| format!("{}. {i}", n + 1))
                .collect(),
        }
    }
}

/// Content sections in reading order; empty fields are left out.
pub fn material_sections(material: &Material) -> Vec<DocSection> {
    let mut out: Vec<Option<DocSection>> = Vec::new();
    match &material.body {
        MaterialBody::RolePlay(b) => {
            out.push(DocSection::pre("対話文", &b.model_dialogue));
            out.push(DocSection::numbered("有用表現", &material.useful_expressions));
            out.push(DocSection::bullets("追加質問", &b.additional_questions));
            out.push(DocSection::text("音声練習ポイント", b.audio_notes.as_deref().unwrap_or("")));
            out.push(DocSection::pre("音声スクリプト", b.audio_script.as_deref().unwrap_or("")));
        }
        MaterialBody::Discussion(b) => {
            out.push(DocSection::text("ディスカッショントピック", &b.discussion_topic));
            out.push(DocSection::text("背景情報", &b.background_info));
            out.push(DocSection::bullets("議論ポイント", &b.key_points));
            out.push(DocSection::numbered("有用表現", &material.useful_expressions));
            out.push(DocSection::bullets("討議質問", &b.discussion_questions));
            out.push(DocSection::text(
                "参考資料",
                b.supporting_materials.as_deref().unwrap_or(""),
            ));
        }
        MaterialBody::ExpressionPractice(b) => {
            out.push(DocSection::text("図表説明", &b.chart_description));
            let data: Vec<String> = b
                .chart_data
                .labels
                .iter()
                .zip(&b.chart_data.values)
                .map(|(l, v)| format!("{l}: {v}"))
                .collect();
            out.push(DocSection::bullets("図表データ", &data));
            out.push(DocSection::numbered("重要語彙", &b.useful_vocabulary));
            out.push(DocSection::numbered("有用表現", &material.useful_expressions));
            out.push(DocSection::bullets("練習問題", &b.practice_questions));
            out.push(DocSection::text(
                "説明ポイント",
                b.explanation_points.as_deref().unwrap_or(""),
            ));
            out.push(DocSection::pre(
                "図表生成プロンプト",
                b.chart_generation_prompt.as_deref().unwrap_or(""),
            ));
        }
    }
    out.into_iter().flatten().collect()
}

pub fn document_title(material: &Material) -> String {
    format!("語学教材: {} / {}", material.kind().label_ja(), material.topic)
}

pub fn footer_lines(author: &str, now: DateTime<Local>) -> Vec<String> {
    vec![
        format!("作成日時: {}", now.format("%Y年%m月%d日 %H:%M")),
        format!("作成者: {author}"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{discussion, role_play};

    #[test]
    fn role_play_sections_skip_empty_fields() {
        let m = role_play("商談", &["Let's begin: 始めましょう"]);
        let headings: Vec<&str> = material_sections(&m).iter().map(|s| s.heading).collect();
        assert_eq!(headings, vec!["対話文", "有用表現", "追加質問"]);
    }

    #[test]
    fn numbered_lines_start_at_one() {
        let m = discussion("在宅勤務", &["a: b", "c: d"]);
        let sec = material_sections(&m)
            .into_iter()
            .find(|s| s.heading == "有用表現")
            .expect("expressions");
        assert_eq!(sec.body_lines(), vec!["1. a: b", "2. c: d"]);
    }
}
