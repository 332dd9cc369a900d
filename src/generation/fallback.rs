use std::collections::HashSet;

use crate::material::{
    ChartData, DiscussionBody, ExpressionPracticeBody, Material, MaterialBody, MaterialKind,
    RolePlayBody,
};
use crate::quality::key::comparison_key;

pub const PENDING_AUDIO_SCRIPT: &str = "※音声ファイル作成用スクリプト（開発予定）";

/// Source of canned content used whenever generation fails.
pub trait FallbackProvider {
    fn topics(&self) -> Vec<String>;

    fn situations(&self, topic: &str) -> Vec<String>;

    fn material(&self, kind: MaterialKind, topic: &str) -> Material;

    /// Exactly `count` alternatives for `key`.
    fn alternatives(&self, key: &str, count: usize) -> Vec<String> {
        templated_alternatives(key, count)
    }
}

/// Deterministic alternatives: the three base phrasings, then numbered variants.
/// Always returns exactly `count` strings whose comparison keys differ from
/// `key` and from each other.
pub fn templated_alternatives(key: &str, count: usize) -> Vec<String> {
    let base = [
        format!("alternative to {key}"),
        format!("another way to say {key}"),
        format!("different expression for {key}"),
    ];
    let mut taken: HashSet<String> = HashSet::from([key.to_string()]);
    (0..count)
        .map(|i| {
            let candidate = match base.get(i) {
                Some(s) => s.clone(),
                None => format!("alternative {} to {key}", i + 1),
            };
            let text = distinct_key_variant(candidate, &taken);
            taken.insert(comparison_key(&text));
            text
        })
        .collect()
}

/// A key containing `:` or `-` makes the phrasings share a key; number them
/// at the end (colon keys) or the front (dash keys) until the key is new.
fn distinct_key_variant(candidate: String, taken: &HashSet<String>) -> String {
    if !taken.contains(&comparison_key(&candidate)) {
        return candidate;
    }
    let mut n = 2usize;
    loop {
        for text in [format!("{candidate} ({n})"), format!("({n}) {candidate}")] {
            if !taken.contains(&comparison_key(&text)) {
                return text;
            }
        }
        n += 1;
    }
}

/// Built-in canned content.
#[derive(Clone, Debug, Default)]
pub struct CannedFallbacks;

impl FallbackProvider for CannedFallbacks {
    fn topics(&self) -> Vec<String> {
        to_strings(&[
            "クライアントとの初回面談",
            "商品デモンストレーション",
            "チーム会議での進捗報告",
            "顧客からの苦情対応",
            "新商品の企画提案",
            "年次売上報告",
            "海外支社との電話会議",
            "契約条件の交渉",
        ])
    }

    fn situations(&self, _topic: &str) -> Vec<String> {
        to_strings(&["新規顧客への製品説明", "既存顧客からの苦情対応", "社内チームとの進捗確認"])
    }

    fn material(&self, kind: MaterialKind, topic: &str) -> Material {
        let mut m = match kind {
            MaterialKind::RolePlay => Material::new(
                topic,
                to_strings(&[
                    "Perfect timing! - タイミングがぴったりです",
                    "I'm excited to... - ～するのを楽しみにしています",
                    "I'm impressed with... - ～に感銘を受けました",
                ]),
                MaterialBody::RolePlay(RolePlayBody {
                    model_dialogue: "A: Good morning! I'm here for our 10 o'clock meeting.\n\
B: Perfect timing! Please come in and have a seat.\n\
A: Thank you. I'm excited to discuss our new project proposal.\n\
B: Excellent. I've reviewed your initial documents and I'm impressed with the concept."
                        .to_string(),
                    additional_questions: to_strings(&[
                        "初対面の相手にどのように自己紹介しますか？",
                        "会議の目的を明確にするために何と言いますか？",
                    ]),
                    audio_notes: None,
                    audio_script: Some(PENDING_AUDIO_SCRIPT.to_string()),
                }),
            ),
            MaterialKind::Discussion => Material::new(
                topic,
                to_strings(&[
                    "From my perspective... - 私の観点では",
                    "On the other hand... - 一方で",
                    "I would argue that... - ～だと主張します",
                ]),
                MaterialBody::Discussion(DiscussionBody {
                    discussion_topic: "リモートワークの効果と課題について".to_string(),
                    background_info:
                        "コロナ禍を経てリモートワークが普及しましたが、その効果と課題について議論します。"
                            .to_string(),
                    key_points: to_strings(&[
                        "生産性の向上",
                        "コミュニケーションの課題",
                        "ワークライフバランス",
                    ]),
                    discussion_questions: to_strings(&[
                        "リモートワークの最大のメリットは何だと思いますか？",
                        "対面でのコミュニケーションは本当に必要でしょうか？",
                    ]),
                    supporting_materials: None,
                }),
            ),
            MaterialKind::ExpressionPractice => Material::new(
                topic,
                Vec::new(),
                MaterialBody::ExpressionPractice(ExpressionPracticeBody {
                    chart_description:
                        "この棒グラフは四半期ごとの売上実績を示しています。Q1が230万円、Q2が310万円と大幅に増加しました。"
                            .to_string(),
                    chart_data: ChartData {
                        labels: to_strings(&["Q1", "Q2", "Q3", "Q4"]),
                        values: vec![230.0, 310.0, 280.0, 350.0],
                    },
                    useful_vocabulary: to_strings(&[
                        "substantial increase - 大幅な増加",
                        "steady decline - 安定した減少",
                        "fluctuation - 変動",
                    ]),
                    practice_questions: to_strings(&[
                        "グラフの最も印象的な傾向は何ですか？",
                        "Q3の結果についてどう説明しますか？",
                    ]),
                    explanation_points: Some(
                        "数値の変化に注目し、原因や背景も合わせて説明すること".to_string(),
                    ),
                    chart_generation_prompt: None,
                }),
            ),
        };
        m.fallback = true;
        m
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
