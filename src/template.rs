//! Per-kind generation templates.
//!
//! Templates are plain serde structs; `set_field` edits them through their JSON
//! form so the CLI can address any field by name (`parts.greeting`, `chart_types`).

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::material::MaterialKind;

pub const COMPLEXITY_LEVELS: [&str; 3] = ["単純", "中程度", "複雑"];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueParts {
    pub greeting: bool,
    pub needs_assessment: bool,
    pub proposal: bool,
    pub qa_session: bool,
    pub next_action: bool,
}

impl Default for DialogueParts {
    fn default() -> Self {
        Self {
            greeting: true,
            needs_assessment: true,
            proposal: true,
            qa_session: true,
            next_action: true,
        }
    }
}

impl DialogueParts {
    /// Japanese labels of the enabled parts, in dialogue order.
    pub fn enabled_labels(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.greeting {
            out.push("挨拶・導入");
        }
        if self.needs_assessment {
            out.push("ニーズ確認");
        }
        if self.proposal {
            out.push("提案・説明");
        }
        if self.qa_session {
            out.push("質疑応答");
        }
        if self.next_action {
            out.push("次回アクション");
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolePlayTemplate {
    pub dialogue_length: String,
    pub participants: u32,
    pub useful_expressions_count: u32,
    pub additional_questions_count: u32,
    pub include_audio: bool,
    pub parts: DialogueParts,
    pub custom_instructions: String,
    pub sample_dialogue: String,
    pub sample_expressions: String,
    pub sample_questions: String,
}

impl Default for RolePlayTemplate {
    fn default() -> Self {
        Self {
            dialogue_length: "180-220語".to_string(),
            participants: 2,
            useful_expressions_count: 10,
            additional_questions_count: 4,
            include_audio: true,
            parts: DialogueParts::default(),
            custom_instructions: String::new(),
            sample_dialogue: "A: Good morning, Mr. Johnson. Thank you for taking the time to meet with us today.\n\
B: Good morning. I'm looking forward to hearing about your financing options.\n\
A: Based on our initial assessment, I'd like to propose a structured loan package that would suit your expansion needs..."
                .to_string(),
            sample_expressions: "• \"I'd like to propose...\" - 提案したいのですが\n\
• \"Based on our analysis...\" - 分析に基づいて\n\
• \"This would allow you to...\" - これにより〜が可能になります"
                .to_string(),
            sample_questions: "1. How would you present this proposal to a more conservative client?\n\
2. What additional information might you need before finalizing this deal?\n\
3. Role-play the client's potential objections."
                .to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscussionTemplate {
    pub topic_complexity: String,
    pub discussion_time: String,
    pub viewpoints_count: u32,
    pub supporting_materials: bool,
    pub conclusion_required: bool,
    pub custom_instructions: String,
    pub sample_topic: String,
    pub sample_viewpoints: String,
    pub sample_materials: String,
}

impl Default for DiscussionTemplate {
    fn default() -> Self {
        Self {
            topic_complexity: "中程度".to_string(),
            discussion_time: "20分".to_string(),
            viewpoints_count: 3,
            supporting_materials: true,
            conclusion_required: true,
            custom_instructions: String::new(),
            sample_topic: "Should companies prioritize digital transformation or employee training in the post-pandemic era?"
                .to_string(),
            sample_viewpoints: "1. Digital-first approach: Focus on technology infrastructure\n\
2. Human-centered approach: Invest in employee development\n\
3. Hybrid approach: Balance both strategies"
                .to_string(),
            sample_materials: "参考資料: 業界統計、専門家意見、ケーススタディ".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionPracticeTemplate {
    pub chart_types: Vec<String>,
    pub explanation_length: String,
    pub vocabulary_count: u32,
    pub practice_questions: u32,
    pub include_numbers: bool,
    pub custom_instructions: String,
    pub sample_chart_description: String,
    pub sample_vocabulary: String,
    pub chart_generation_prompt: String,
}

impl Default for ExpressionPracticeTemplate {
    fn default() -> Self {
        Self {
            chart_types: vec!["棒グラフ".to_string(), "線グラフ".to_string()],
            explanation_length: "100-150語".to_string(),
            vocabulary_count: 8,
            practice_questions: 3,
            include_numbers: true,
            custom_instructions: String::new(),
            sample_chart_description: "This bar chart shows our quarterly sales performance. Q1 reached 2.3 million, followed by a significant increase to 3.1 million in Q2..."
                .to_string(),
            sample_vocabulary: "• substantial increase - 大幅な増加\n\
• steady decline - 安定した減少\n\
• fluctuation - 変動"
                .to_string(),
            chart_generation_prompt: "Create a bar chart showing quarterly sales data with the following values: Q1: 2.3M, Q2: 3.1M, Q3: 2.8M, Q4: 3.5M"
                .to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateSet {
    #[serde(alias = "ロールプレイ")]
    pub role_play: RolePlayTemplate,
    #[serde(alias = "ディスカッション")]
    pub discussion: DiscussionTemplate,
    #[serde(alias = "表現練習")]
    pub expression_practice: ExpressionPracticeTemplate,
}

impl TemplateSet {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Set one field from its textual form. The existing value decides how the
    /// text is parsed; lists are comma separated and nested fields use dots.
    pub fn set_field(&mut self, kind: MaterialKind, key: &str, raw: &str) -> anyhow::Result<()> {
        let mut doc = self.kind_value(kind)?;
        let slot = lookup_mut(&mut doc, key)
            .ok_or_else(|| anyhow!("unknown {} template field: {key}", kind.id()))?;
        *slot = parse_like(slot, raw).with_context(|| format!("invalid value for {key}: {raw}"))?;

        match kind {
            MaterialKind::RolePlay => {
                self.role_play = serde_json::from_value(doc).context("apply role-play template")?;
            }
            MaterialKind::Discussion => {
                let t: DiscussionTemplate =
                    serde_json::from_value(doc).context("apply discussion template")?;
                if !COMPLEXITY_LEVELS.contains(&t.topic_complexity.as_str()) {
                    return Err(anyhow!(
                        "topic_complexity must be one of {}",
                        COMPLEXITY_LEVELS.join(" / ")
                    ));
                }
                self.discussion = t;
            }
            MaterialKind::ExpressionPractice => {
                self.expression_practice =
                    serde_json::from_value(doc).context("apply expression-practice template")?;
            }
        }
        Ok(())
    }

    /// Short human summary of one template.
    pub fn describe(&self, kind: MaterialKind) -> String {
        match kind {
            MaterialKind::RolePlay => {
                let t = &self.role_play;
                format!(
                    "[{}]\n長さ: {}\n参加者: {}名\n表現数: {}個\n質問数: {}個\n音声スクリプト: {}\n構成: {}\n追加指示: {}",
                    kind.label_ja(),
                    t.dialogue_length,
                    t.participants,
                    t.useful_expressions_count,
                    t.additional_questions_count,
                    yes_no(t.include_audio),
                    t.parts.enabled_labels().join(", "),
                    none_if_empty(&t.custom_instructions),
                )
            }
            MaterialKind::Discussion => {
                let t = &self.discussion;
                format!(
                    "[{}]\n複雑度: {}\n時間: {}\n観点数: {}個\n参考資料: {}\n結論必須: {}\n追加指示: {}",
                    kind.label_ja(),
                    t.topic_complexity,
                    t.discussion_time,
                    t.viewpoints_count,
                    yes_no(t.supporting_materials),
                    yes_no(t.conclusion_required),
                    none_if_empty(&t.custom_instructions),
                )
            }
            MaterialKind::ExpressionPractice => {
                let t = &self.expression_practice;
                format!(
                    "[{}]\n図表: {} ({}種類)\n長さ: {}\n語彙数: {}個\n練習問題: {}問\n数値データ: {}\n追加指示: {}",
                    kind.label_ja(),
                    t.chart_types.join(", "),
                    t.chart_types.len(),
                    t.explanation_length,
                    t.vocabulary_count,
                    t.practice_questions,
                    yes_no(t.include_numbers),
                    none_if_empty(&t.custom_instructions),
                )
            }
        }
    }

    /// Write `templates_<YYYYMMDD_HHMMSS>.json` into `dir`.
    pub fn save_timestamped(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        std::fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;
        let name = format!("templates_{}.json", Local::now().format("%Y%m%d_%H%M%S"));
        let path = dir.join(name);
        let text = serde_json::to_string_pretty(self).context("serialize templates")?;
        std::fs::write(&path, text).with_context(|| format!("write templates: {}", path.display()))?;
        Ok(path)
    }

    /// Merge a saved template file over the current set. Kinds missing from the
    /// file are left alone; fields missing inside a kind take their defaults.
    pub fn merge_from_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read templates: {}", path.display()))?;
        let value: Value = serde_json::from_str(&text).context("parse templates json")?;
        let obj = value
            .as_object()
            .ok_or_else(|| anyhow!("templates file must hold a JSON object"))?;
        for (key, body) in obj {
            let Some(kind) = MaterialKind::parse(key) else {
                log::warn!("ignoring unknown template kind in {}: {key}", path.display());
                continue;
            };
            match kind {
                MaterialKind::RolePlay => {
                    self.role_play = serde_json::from_value(body.clone())
                        .with_context(|| format!("parse {key} template"))?;
                }
                MaterialKind::Discussion => {
                    self.discussion = serde_json::from_value(body.clone())
                        .with_context(|| format!("parse {key} template"))?;
                }
                MaterialKind::ExpressionPractice => {
                    self.expression_practice = serde_json::from_value(body.clone())
                        .with_context(|| format!("parse {key} template"))?;
                }
            }
        }
        Ok(())
    }

    fn kind_value(&self, kind: MaterialKind) -> anyhow::Result<Value> {
        let v = match kind {
            MaterialKind::RolePlay => serde_json::to_value(&self.role_play),
            MaterialKind::Discussion => serde_json::to_value(&self.discussion),
            MaterialKind::ExpressionPractice => serde_json::to_value(&self.expression_practice),
        };
        v.context("serialize template")
    }
}

fn lookup_mut<'a>(doc: &'a mut Value, dotted: &str) -> Option<&'a mut Value> {
    let mut cur = doc;
    for part in dotted.split('.') {
        cur = cur.as_object_mut()?.get_mut(part.trim())?;
    }
    Some(cur)
}

fn parse_like(current: &Value, raw: &str) -> anyhow::Result<Value> {
    let t = raw.trim();
    Ok(match current {
        Value::Bool(_) => match t.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Value::Bool(true),
            "false" | "no" | "off" | "0" => Value::Bool(false),
            _ => return Err(anyhow!("expected a boolean")),
        },
        Value::Number(_) => {
            let n: u64 = t.parse().map_err(|_| anyhow!("expected a non-negative integer"))?;
            Value::from(n)
        }
        Value::Array(_) => Value::Array(
            t.split([',', '、'])
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
        Value::Object(_) => return Err(anyhow!("address a nested field with a dotted key")),
        _ => Value::String(raw.replace("\\n", "\n")),
    })
}

fn yes_no(v: bool) -> &'static str {
    if v {
        "あり"
    } else {
        "なし"
    }
}

fn none_if_empty(s: &str) -> &str {
    if s.trim().is_empty() {
        "なし"
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_house_settings() {
        let t = TemplateSet::default();
        assert_eq!(t.role_play.dialogue_length, "180-220語");
        assert_eq!(t.role_play.useful_expressions_count, 10);
        assert_eq!(t.discussion.topic_complexity, "中程度");
        assert_eq!(t.expression_practice.chart_types, vec!["棒グラフ", "線グラフ"]);
        assert_eq!(t.role_play.parts.enabled_labels().len(), 5);
    }

    #[test]
    fn set_field_parses_by_existing_type() {
        let mut t = TemplateSet::default();
        t.set_field(MaterialKind::RolePlay, "participants", "3").expect("number");
        t.set_field(MaterialKind::RolePlay, "include_audio", "no").expect("bool");
        t.set_field(MaterialKind::RolePlay, "parts.qa_session", "false").expect("nested");
        t.set_field(MaterialKind::ExpressionPractice, "chart_types", "円グラフ, 棒グラフ")
            .expect("list");
        assert_eq!(t.role_play.participants, 3);
        assert!(!t.role_play.include_audio);
        assert!(!t.role_play.parts.qa_session);
        assert_eq!(t.expression_practice.chart_types, vec!["円グラフ", "棒グラフ"]);
    }

    #[test]
    fn set_field_rejects_bad_input() {
        let mut t = TemplateSet::default();
        assert!(t.set_field(MaterialKind::RolePlay, "nope", "1").is_err());
        assert!(t.set_field(MaterialKind::RolePlay, "participants", "two").is_err());
        assert!(t.set_field(MaterialKind::Discussion, "topic_complexity", "難解").is_err());
        assert_eq!(t, TemplateSet::default());
    }

    #[test]
    fn merge_accepts_japanese_kind_keys() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("t.json");
        std::fs::write(&path, r#"{"ディスカッション": {"discussion_time": "30分"}}"#).expect("write");
        let mut t = TemplateSet::default();
        t.role_play.participants = 4;
        t.merge_from_file(&path).expect("merge");
        assert_eq!(t.discussion.discussion_time, "30分");
        assert_eq!(t.discussion.viewpoints_count, 3);
        assert_eq!(t.role_play.participants, 4);
    }

    #[test]
    fn save_then_merge_restores_edits() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut t = TemplateSet::default();
        t.expression_practice.vocabulary_count = 12;
        let path = t.save_timestamped(tmp.path()).expect("save");
        assert!(path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("templates_") && n.ends_with(".json")));
        let mut fresh = TemplateSet::default();
        fresh.merge_from_file(&path).expect("merge");
        assert_eq!(fresh, t);
    }
}
