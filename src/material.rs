//! Generated learning materials.
//!
//! Every material carries an ordered list of useful expressions (the only part
//! the duplicate detector reads) plus a kind-specific body.

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

use crate::textutil::log_preview;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    RolePlay,
    Discussion,
    ExpressionPractice,
}

impl MaterialKind {
    pub const ALL: [MaterialKind; 3] = [
        MaterialKind::RolePlay,
        MaterialKind::Discussion,
        MaterialKind::ExpressionPractice,
    ];

    /// Accepts the snake_case id, a few spelling variants and the Japanese labels.
    pub fn parse(s: &str) -> Option<Self> {
        let norm = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match norm.as_str() {
            "role_play" | "roleplay" | "ロールプレイ" => Some(Self::RolePlay),
            "discussion" | "ディスカッション" => Some(Self::Discussion),
            "expression_practice" | "expression" | "chart" | "表現練習" => {
                Some(Self::ExpressionPractice)
            }
            _ => None,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            Self::RolePlay => "role_play",
            Self::Discussion => "discussion",
            Self::ExpressionPractice => "expression_practice",
        }
    }

    pub fn label_ja(self) -> &'static str {
        match self {
            Self::RolePlay => "ロールプレイ",
            Self::Discussion => "ディスカッション",
            Self::ExpressionPractice => "表現練習",
        }
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub topic: String,
    pub created_at: DateTime<Local>,
    #[serde(default)]
    pub useful_expressions: Vec<String>,
    /// Set when canned content replaced a failed generation.
    #[serde(default)]
    pub fallback: bool,
    pub body: MaterialBody,
}

impl Material {
    pub fn new(topic: impl Into<String>, useful_expressions: Vec<String>, body: MaterialBody) -> Self {
        Self {
            topic: topic.into(),
            created_at: Local::now(),
            useful_expressions,
            fallback: false,
            body,
        }
    }

    #[must_use]
    pub fn kind(&self) -> MaterialKind {
        self.body.kind()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterialBody {
    RolePlay(RolePlayBody),
    Discussion(DiscussionBody),
    ExpressionPractice(ExpressionPracticeBody),
}

impl MaterialBody {
    #[must_use]
    pub fn kind(&self) -> MaterialKind {
        match self {
            Self::RolePlay(_) => MaterialKind::RolePlay,
            Self::Discussion(_) => MaterialKind::Discussion,
            Self::ExpressionPractice(_) => MaterialKind::ExpressionPractice,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RolePlayBody {
    #[serde(default)]
    pub model_dialogue: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub additional_questions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub audio_notes: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub audio_script: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscussionBody {
    #[serde(default)]
    pub discussion_topic: String,
    #[serde(default)]
    pub background_info: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub key_points: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub discussion_questions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub supporting_materials: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionPracticeBody {
    #[serde(default)]
    pub chart_description: String,
    #[serde(default)]
    pub chart_data: ChartData,
    #[serde(default, deserialize_with = "lenient_list")]
    pub useful_vocabulary: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub practice_questions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub explanation_points: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub chart_generation_prompt: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub values: Vec<f64>,
}

const PHRASE_KEYS: [&str; 4] = ["phrase", "expression", "english", "en"];
const MEANING_KEYS: [&str; 5] = ["meaning", "translation", "japanese", "ja", "note"];

/// String lists where the model sometimes emits objects or stray values.
/// Strings and numbers are kept, `{"phrase": .., "meaning": ..}` objects become
/// `"phrase: meaning"`, anything else is dropped and logged.
pub(crate) fn lenient_list<'de, D>(de: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_json::Value;

    let items = match Value::deserialize(de)? {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        Value::String(s) => return Ok(vec![s]),
        other => {
            log::warn!("expected a list, dropped {}", log_preview(&other.to_string(), 80));
            return Ok(Vec::new());
        }
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => out.push(s),
            Value::Number(n) => out.push(n.to_string()),
            Value::Object(map) => {
                let pick = |keys: &[&str]| {
                    keys.iter()
                        .find_map(|k| map.get(*k).and_then(Value::as_str))
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                };
                match (pick(&PHRASE_KEYS), pick(&MEANING_KEYS)) {
                    (Some(p), Some(m)) => out.push(format!("{p}: {m}")),
                    (Some(one), None) | (None, Some(one)) => out.push(one.to_string()),
                    (None, None) => log::warn!(
                        "dropped list entry without text: {}",
                        log_preview(&Value::Object(map.clone()).to_string(), 80)
                    ),
                }
            }
            other => log::warn!("dropped list entry: {other}"),
        }
    }
    Ok(out)
}

/// Free-text fields sometimes come back as a list or an object; keep them as text.
fn lenient_text<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = serde_json::Value::deserialize(de)?;
    Ok(match v {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(items) => Some(
            items
                .into_iter()
                .map(|it| match it {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        other => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parse_accepts_labels_and_ids() {
        assert_eq!(MaterialKind::parse("roleplay"), Some(MaterialKind::RolePlay));
        assert_eq!(MaterialKind::parse("Role-Play"), Some(MaterialKind::RolePlay));
        assert_eq!(MaterialKind::parse("ディスカッション"), Some(MaterialKind::Discussion));
        assert_eq!(
            MaterialKind::parse("expression_practice"),
            Some(MaterialKind::ExpressionPractice)
        );
        assert_eq!(MaterialKind::parse("quiz"), None);
    }

    #[test]
    fn material_json_keeps_body_tag() {
        let m = Material::new(
            "商品デモ",
            vec!["Let's begin: 始めましょう".to_string()],
            MaterialBody::RolePlay(RolePlayBody {
                model_dialogue: "A: Hi\nB: Hello".to_string(),
                ..Default::default()
            }),
        );
        let json = serde_json::to_value(&m).expect("serialize");
        assert_eq!(json["body"]["kind"], "role_play");
        let back: Material = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, m);
    }

    #[test]
    fn lenient_text_joins_lists() {
        let body: DiscussionBody = serde_json::from_str(
            r#"{"discussion_topic":"t","supporting_materials":["統計","事例"]}"#,
        )
        .expect("parse");
        assert_eq!(body.supporting_materials.as_deref(), Some("統計\n事例"));
        assert!(body.key_points.is_empty());
    }

    #[test]
    fn lenient_list_keeps_usable_entries() {
        let body: DiscussionBody = serde_json::from_str(
            r#"{"discussion_topic":"t",
                "key_points":["cost", 3, {"phrase":"Kick off","meaning":"開始"}, {"note":"要確認"}, {}, null, ["x"]],
                "discussion_questions":"Why?"}"#,
        )
        .expect("parse");
        assert_eq!(body.key_points, vec!["cost", "3", "Kick off: 開始", "要確認"]);
        assert_eq!(body.discussion_questions, vec!["Why?"]);
    }
}
