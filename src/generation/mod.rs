//! Material generation on top of a [`TextGenerator`].
//!
//! Every call sends one prompt, extracts the JSON payload from the reply and
//! validates it. Any failure is logged with its reason and replaced by the
//! fallback provider's content; nothing here returns an error to the caller.

pub mod fallback;
pub mod prompts;

use serde::Deserialize;
use thiserror::Error;

use crate::context::LearnerContext;
use crate::llm::extract::{extract_json, extract_string_list, ExtractError, PayloadShape};
use crate::llm::TextGenerator;
use crate::material::{
    lenient_list, DiscussionBody, ExpressionPracticeBody, Material, MaterialBody, MaterialKind,
    RolePlayBody,
};
use crate::quality::repair::AlternativeSource;
use crate::template::{DiscussionTemplate, ExpressionPracticeTemplate, RolePlayTemplate, TemplateSet};
use crate::textutil::log_preview;
use crate::trace::TraceWriter;

use fallback::{CannedFallbacks, FallbackProvider};
use prompts::{audio_script_prompt, chart_prompt, discussion_framework_prompt, render_template, PromptSet};

pub const MEMO_EXCERPT_CHARS: usize = 200;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GenerationFailure {
    #[error("request failed: {0}")]
    Transport(String),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("payload rejected: {0}")]
    Schema(String),
}

/// A value plus the reason it came from the fallback provider, if it did.
#[derive(Clone, Debug)]
pub struct Generated<T> {
    pub value: T,
    pub fallback: Option<GenerationFailure>,
}

impl<T> Generated<T> {
    fn fresh(value: T) -> Self {
        Self {
            value,
            fallback: None,
        }
    }

    fn fallback(value: T, reason: GenerationFailure) -> Self {
        Self {
            value,
            fallback: Some(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaxTokens {
    pub topics: u32,
    pub situations: u32,
    pub role_play: u32,
    pub discussion: u32,
    pub expression_practice: u32,
    pub alternatives: u32,
}

impl Default for MaxTokens {
    fn default() -> Self {
        Self {
            topics: 1000,
            situations: 800,
            role_play: 2500,
            discussion: 2000,
            expression_practice: 2000,
            alternatives: 800,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GenerationSettings {
    pub topic_count: usize,
    pub situation_count: usize,
    pub max_tokens: MaxTokens,
    pub log_max_chars: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            topic_count: 8,
            situation_count: 3,
            max_tokens: MaxTokens::default(),
            log_max_chars: 160,
        }
    }
}

pub struct GenerationClient<G: TextGenerator> {
    generator: G,
    fallbacks: Box<dyn FallbackProvider>,
    prompts: PromptSet,
    settings: GenerationSettings,
    trace: TraceWriter,
}

#[derive(Debug, Deserialize)]
struct RolePlayPayload {
    #[serde(default, deserialize_with = "lenient_list")]
    useful_expressions: Vec<String>,
    #[serde(flatten)]
    body: RolePlayBody,
}

#[derive(Debug, Deserialize)]
struct DiscussionPayload {
    #[serde(default, deserialize_with = "lenient_list")]
    useful_expressions: Vec<String>,
    #[serde(flatten)]
    body: DiscussionBody,
}

impl<G: TextGenerator> GenerationClient<G> {
    pub fn new(generator: G, prompts: PromptSet, settings: GenerationSettings) -> Self {
        Self {
            generator,
            fallbacks: Box::new(CannedFallbacks),
            prompts,
            settings,
            trace: TraceWriter::disabled(),
        }
    }

    pub fn with_fallbacks(mut self, fallbacks: Box<dyn FallbackProvider>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    pub fn with_trace(mut self, trace: TraceWriter) -> Self {
        self.trace = trace;
        self
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    pub fn generate_primary_topics(&mut self, ctx: &LearnerContext) -> Generated<Vec<String>> {
        let count = self.settings.topic_count.to_string();
        let memo = ctx.memo_excerpt(MEMO_EXCERPT_CHARS);
        let prompt = render_template(
            &self.prompts.topics,
            &[
                ("count", count.as_str()),
                ("industry", ctx.industry_or_default()),
                ("job_role", ctx.job_role_or_default()),
                ("english_level", ctx.level_or_default()),
                ("learning_goal", ctx.goal_or_default()),
                ("counseling_memo", memo.as_str()),
                ("teaching_policy", ctx.teaching_policy.trim()),
                ("business_scenes", ctx.business_scenes.trim()),
            ],
        );
        let max_tokens = self.settings.max_tokens.topics;
        match self.call("topics", &prompt, max_tokens).and_then(|t| non_empty_list(&t)) {
            Ok(topics) => Generated::fresh(topics),
            Err(reason) => {
                log::warn!("topic generation fell back to canned topics: {reason}");
                Generated::fallback(self.fallbacks.topics(), reason)
            }
        }
    }

    pub fn generate_detailed_situations(
        &mut self,
        ctx: &LearnerContext,
        topic: &str,
    ) -> Generated<Vec<String>> {
        let count = self.settings.situation_count.to_string();
        let prompt = render_template(
            &self.prompts.situations,
            &[
                ("count", count.as_str()),
                ("topic", topic),
                ("industry", ctx.industry_or_default()),
                ("job_role", ctx.job_role_or_default()),
                ("english_level", ctx.level_or_default()),
            ],
        );
        let max_tokens = self.settings.max_tokens.situations;
        match self.call("situations", &prompt, max_tokens).and_then(|t| non_empty_list(&t)) {
            Ok(situations) => Generated::fresh(situations),
            Err(reason) => {
                log::warn!("situation generation for '{topic}' fell back: {reason}");
                Generated::fallback(self.fallbacks.situations(topic), reason)
            }
        }
    }

    /// `include_audio` is the effective audio flag (template setting and batch option).
    pub fn generate_roleplay_material(
        &mut self,
        ctx: &LearnerContext,
        topic: &str,
        template: &RolePlayTemplate,
        include_audio: bool,
    ) -> Generated<Material> {
        let participants = template.participants.to_string();
        let expr_count = template.useful_expressions_count.to_string();
        let q_count = template.additional_questions_count.to_string();
        let parts = template.parts.enabled_labels();
        let parts_instruction = if parts.is_empty() {
            String::new()
        } else {
            format!("対話には以下の要素を含めてください: {}", parts.join(", "))
        };
        let samples = sample_section(&[
            ("対話例", &template.sample_dialogue),
            ("表現例", &template.sample_expressions),
            ("質問例", &template.sample_questions),
        ]);
        let prompt = render_template(
            &self.prompts.role_play,
            &[
                ("industry", ctx.industry_or_default()),
                ("job_role", ctx.job_role_or_default()),
                ("english_level", ctx.level_or_default()),
                ("learning_goal", ctx.goal_or_default()),
                ("topic", topic),
                ("dialogue_length", template.dialogue_length.as_str()),
                ("participants", participants.as_str()),
                ("useful_expressions_count", expr_count.as_str()),
                ("additional_questions_count", q_count.as_str()),
                ("audio_label", if include_audio { "含む" } else { "含まない" }),
                ("parts_instruction", parts_instruction.as_str()),
                ("sample_section", samples.as_str()),
                ("custom_instructions", template.custom_instructions.as_str()),
                (
                    "audio_requirement",
                    if include_audio { "- audio_notes: 音声練習のポイント" } else { "" },
                ),
                (
                    "audio_output",
                    if include_audio { ",\n  \"audio_notes\": \"音声練習での注意点\"" } else { "" },
                ),
            ],
        );

        let max_tokens = self.settings.max_tokens.role_play;
        let parsed = self
            .call("role_play", &prompt, max_tokens)
            .and_then(|text| {
                extract_json::<RolePlayPayload>(&text, PayloadShape::Object).map_err(GenerationFailure::from)
            })
            .and_then(|p| {
                if p.body.model_dialogue.trim().is_empty() {
                    Err(GenerationFailure::Schema("model_dialogue is empty".to_string()))
                } else {
                    Ok(p)
                }
            });

        let mut generated = match parsed {
            Ok(p) => Generated::fresh(Material::new(
                topic,
                p.useful_expressions,
                MaterialBody::RolePlay(p.body),
            )),
            Err(reason) => {
                log::warn!("role-play generation for '{topic}' fell back: {reason}");
                Generated::fallback(self.fallbacks.material(MaterialKind::RolePlay, topic), reason)
            }
        };
        if let MaterialBody::RolePlay(body) = &mut generated.value.body {
            if include_audio {
                if body.audio_script.is_none() && !body.model_dialogue.is_empty() {
                    body.audio_script = Some(audio_script_prompt(&body.model_dialogue));
                }
            } else {
                body.audio_notes = None;
                body.audio_script = None;
            }
        }
        generated
    }

    pub fn generate_discussion_material(
        &mut self,
        ctx: &LearnerContext,
        topic: &str,
        template: &DiscussionTemplate,
    ) -> Generated<Material> {
        let viewpoints = template.viewpoints_count.to_string();
        let samples = sample_section(&[
            ("トピック例", &template.sample_topic),
            ("観点例", &template.sample_viewpoints),
            ("参考資料例", &template.sample_materials),
        ]);
        let with_materials = template.supporting_materials;
        let prompt = render_template(
            &self.prompts.discussion,
            &[
                ("industry", ctx.industry_or_default()),
                ("job_role", ctx.job_role_or_default()),
                ("english_level", ctx.level_or_default()),
                ("learning_goal", ctx.goal_or_default()),
                ("topic", topic),
                ("topic_complexity", template.topic_complexity.as_str()),
                ("discussion_time", template.discussion_time.as_str()),
                ("viewpoints_count", viewpoints.as_str()),
                ("materials_label", if with_materials { "含む" } else { "含まない" }),
                (
                    "conclusion_label",
                    if template.conclusion_required { "必要" } else { "不要" },
                ),
                ("sample_section", samples.as_str()),
                ("custom_instructions", template.custom_instructions.as_str()),
                (
                    "materials_requirement",
                    if with_materials { "- supporting_materials: 参考資料情報" } else { "" },
                ),
                (
                    "materials_output",
                    if with_materials { ",\n  \"supporting_materials\": \"参考資料の情報\"" } else { "" },
                ),
            ],
        );

        let max_tokens = self.settings.max_tokens.discussion;
        let parsed = self
            .call("discussion", &prompt, max_tokens)
            .and_then(|text| {
                extract_json::<DiscussionPayload>(&text, PayloadShape::Object).map_err(GenerationFailure::from)
            })
            .and_then(|p| {
                if p.body.discussion_topic.trim().is_empty() {
                    Err(GenerationFailure::Schema("discussion_topic is empty".to_string()))
                } else {
                    Ok(p)
                }
            });

        match parsed {
            Ok(mut p) => {
                if !with_materials {
                    p.body.supporting_materials = None;
                }
                Generated::fresh(Material::new(
                    topic,
                    p.useful_expressions,
                    MaterialBody::Discussion(p.body),
                ))
            }
            Err(reason) => {
                log::warn!("discussion generation for '{topic}' fell back: {reason}");
                Generated::fallback(self.fallbacks.material(MaterialKind::Discussion, topic), reason)
            }
        }
    }

    pub fn generate_expression_practice_material(
        &mut self,
        ctx: &LearnerContext,
        topic: &str,
        template: &ExpressionPracticeTemplate,
    ) -> Generated<Material> {
        let chart_type = template
            .chart_types
            .first()
            .map(|s| s.as_str())
            .unwrap_or("棒グラフ");
        let vocab = template.vocabulary_count.to_string();
        let practice = template.practice_questions.to_string();
        let samples = sample_section(&[
            ("図表説明例", &template.sample_chart_description),
            ("語彙例", &template.sample_vocabulary),
            ("図表生成指示", &template.chart_generation_prompt),
        ]);
        let wants_chart_prompt = !template.chart_generation_prompt.trim().is_empty();
        let prompt = render_template(
            &self.prompts.expression_practice,
            &[
                ("industry", ctx.industry_or_default()),
                ("job_role", ctx.job_role_or_default()),
                ("english_level", ctx.level_or_default()),
                ("learning_goal", ctx.goal_or_default()),
                ("topic", topic),
                ("chart_type", chart_type),
                ("explanation_length", template.explanation_length.as_str()),
                ("vocabulary_count", vocab.as_str()),
                ("practice_questions", practice.as_str()),
                ("numbers_label", if template.include_numbers { "はい" } else { "いいえ" }),
                ("sample_section", samples.as_str()),
                ("custom_instructions", template.custom_instructions.as_str()),
                (
                    "chart_prompt_requirement",
                    if wants_chart_prompt {
                        "- chart_generation_prompt: AIによる図表生成用プロンプト"
                    } else {
                        ""
                    },
                ),
                (
                    "chart_prompt_output",
                    if wants_chart_prompt {
                        ",\n  \"chart_generation_prompt\": \"図表生成用の詳細プロンプト\""
                    } else {
                        ""
                    },
                ),
            ],
        );

        let max_tokens = self.settings.max_tokens.expression_practice;
        let parsed = self
            .call("expression_practice", &prompt, max_tokens)
            .and_then(|text| {
                extract_json::<ExpressionPracticeBody>(&text, PayloadShape::Object)
                    .map_err(GenerationFailure::from)
            })
            .and_then(|b| {
                if b.chart_description.trim().is_empty() {
                    Err(GenerationFailure::Schema("chart_description is empty".to_string()))
                } else {
                    Ok(b)
                }
            });

        let mut generated = match parsed {
            Ok(body) => Generated::fresh(Material::new(
                topic,
                Vec::new(),
                MaterialBody::ExpressionPractice(body),
            )),
            Err(reason) => {
                log::warn!("expression-practice generation for '{topic}' fell back: {reason}");
                Generated::fallback(
                    self.fallbacks.material(MaterialKind::ExpressionPractice, topic),
                    reason,
                )
            }
        };
        if let MaterialBody::ExpressionPractice(body) = &mut generated.value.body {
            if wants_chart_prompt && body.chart_generation_prompt.is_none() {
                body.chart_generation_prompt =
                    Some(chart_prompt(&template.chart_types, &body.chart_description));
            }
        }
        generated
    }

    /// Dispatch on kind using the matching template.
    pub fn generate_material(
        &mut self,
        kind: MaterialKind,
        ctx: &LearnerContext,
        topic: &str,
        templates: &TemplateSet,
        include_audio: bool,
    ) -> Generated<Material> {
        match kind {
            MaterialKind::RolePlay => {
                self.generate_roleplay_material(ctx, topic, &templates.role_play, include_audio)
            }
            MaterialKind::Discussion => {
                self.generate_discussion_material(ctx, topic, &templates.discussion)
            }
            MaterialKind::ExpressionPractice => {
                self.generate_expression_practice_material(ctx, topic, &templates.expression_practice)
            }
        }
    }

    /// Up to `count` alternatives from the model (extra entries are dropped,
    /// short lists are kept short). On failure exactly `count` templated ones.
    pub fn generate_alternative_expressions(&mut self, key: &str, count: usize) -> Generated<Vec<String>> {
        if count == 0 {
            return Generated::fresh(Vec::new());
        }
        let n = count.to_string();
        let prompt = render_template(
            &self.prompts.alternatives,
            &[("count", n.as_str()), ("expression", key)],
        );
        let max_tokens = self.settings.max_tokens.alternatives;
        let parsed = self
            .call("alternatives", &prompt, max_tokens)
            .and_then(|t| non_empty_list(&t));
        match parsed {
            Ok(mut alts) => {
                alts.truncate(count);
                Generated::fresh(alts)
            }
            Err(reason) => {
                log::warn!("alternatives for '{key}' fell back to templates: {reason}");
                Generated::fallback(self.fallbacks.alternatives(key, count), reason)
            }
        }
    }

    fn call(&mut self, call: &str, prompt: &str, max_tokens: u32) -> Result<String, GenerationFailure> {
        let seq = self.trace.next_seq();
        if let Err(err) = self.trace.write_call_text(seq, call, "prompt", prompt) {
            log::debug!("trace write failed: {err:#}");
        }
        log::debug!(
            "{call}: sending prompt ({} chars) to {}",
            prompt.chars().count(),
            self.generator.name()
        );
        match self.generator.generate(prompt, max_tokens) {
            Ok(text) => {
                if let Err(err) = self.trace.write_call_text(seq, call, "response", &text) {
                    log::debug!("trace write failed: {err:#}");
                }
                log::debug!(
                    "{call}: response {}",
                    log_preview(&text, self.settings.log_max_chars)
                );
                Ok(text)
            }
            Err(err) => {
                let message = format!("{err:#}");
                if let Err(err) = self.trace.write_call_text(seq, call, "error", &message) {
                    log::debug!("trace write failed: {err:#}");
                }
                Err(GenerationFailure::Transport(message))
            }
        }
    }
}

impl<G: TextGenerator> AlternativeSource for GenerationClient<G> {
    fn alternatives(&mut self, key: &str, count: usize) -> Vec<String> {
        self.generate_alternative_expressions(key, count).value
    }
}

/// Companion prompt for handing a material to a downstream tool (TTS script,
/// discussion framework or chart generator).
pub fn helper_prompt(material: &Material, templates: &TemplateSet) -> Option<String> {
    match &material.body {
        MaterialBody::RolePlay(b) if !b.model_dialogue.trim().is_empty() => {
            Some(audio_script_prompt(&b.model_dialogue))
        }
        MaterialBody::Discussion(b) => {
            let topic = if b.discussion_topic.trim().is_empty() {
                material.topic.as_str()
            } else {
                b.discussion_topic.as_str()
            };
            Some(discussion_framework_prompt(topic, &b.key_points))
        }
        MaterialBody::ExpressionPractice(b) => Some(
            b.chart_generation_prompt
                .clone()
                .unwrap_or_else(|| chart_prompt(&templates.expression_practice.chart_types, &b.chart_description)),
        ),
        _ => None,
    }
}

fn non_empty_list(text: &str) -> Result<Vec<String>, GenerationFailure> {
    let list = extract_string_list(text)?;
    if list.is_empty() {
        return Err(GenerationFailure::Schema("empty list".to_string()));
    }
    Ok(list)
}

fn sample_section(samples: &[(&str, &String)]) -> String {
    let present: Vec<String> = samples
        .iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(label, text)| format!("- {label}: {text}"))
        .collect();
    if present.is_empty() {
        return String::new();
    }
    format!("\n【参考サンプル】\n{}", present.join("\n"))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;

    use anyhow::anyhow;

    use crate::llm::TextGenerator;

    /// Replays canned replies in order; `None` simulates a transport error.
    #[derive(Default)]
    pub struct ScriptedGenerator {
        pub replies: VecDeque<Option<String>>,
        pub prompts: Vec<(String, u32)>,
    }

    impl ScriptedGenerator {
        pub fn new<I, S>(replies: I) -> Self
        where
            I: IntoIterator<Item = Option<S>>,
            S: Into<String>,
        {
            Self {
                replies: replies.into_iter().map(|r| r.map(Into::into)).collect(),
                prompts: Vec::new(),
            }
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn generate(&mut self, prompt: &str, max_tokens: u32) -> anyhow::Result<String> {
            self.prompts.push((prompt.to_string(), max_tokens));
            match self.replies.pop_front() {
                Some(Some(text)) => Ok(text),
                Some(None) => Err(anyhow!("connection reset")),
                None => Err(anyhow!("script exhausted")),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ScriptedGenerator;
    use super::*;

    fn client(replies: Vec<Option<&str>>) -> GenerationClient<ScriptedGenerator> {
        GenerationClient::new(
            ScriptedGenerator::new(replies),
            PromptSet::default(),
            GenerationSettings::default(),
        )
    }

    fn ctx() -> LearnerContext {
        LearnerContext {
            industry: "金融".to_string(),
            counseling_memo: "融資営業 顧客対応".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn topics_parse_from_wrapped_json() {
        let mut c = client(vec![Some("はい:\n[\"融資提案\", \"審査結果の説明\"]\n以上")]);
        let got = c.generate_primary_topics(&ctx());
        assert!(!got.is_fallback());
        assert_eq!(got.value, vec!["融資提案", "審査結果の説明"]);
        let (prompt, max_tokens) = &c.generator.prompts[0];
        assert_eq!(*max_tokens, 1000);
        assert!(prompt.contains("業界: 金融"));
        assert!(prompt.contains("職種: ビジネスパーソン"));
    }

    #[test]
    fn transport_error_yields_canned_topics() {
        let mut c = client(vec![None]);
        let got = c.generate_primary_topics(&ctx());
        assert!(matches!(got.fallback, Some(GenerationFailure::Transport(_))));
        assert_eq!(got.value.len(), 8);
    }

    #[test]
    fn role_play_payload_becomes_material() {
        let reply = r#"```json
{"model_dialogue": "A: Hello\nB: Hi", "useful_expressions": ["Let's begin: 始めましょう"],
 "additional_questions": ["Q1"], "audio_notes": "slow down"}
```"#;
        let mut c = client(vec![Some(reply)]);
        let got = c.generate_roleplay_material(&ctx(), "商談", &RolePlayTemplate::default(), true);
        assert!(!got.is_fallback());
        let m = got.value;
        assert_eq!(m.useful_expressions, vec!["Let's begin: 始めましょう"]);
        let MaterialBody::RolePlay(body) = &m.body else {
            panic!("expected role-play body");
        };
        assert_eq!(body.audio_notes.as_deref(), Some("slow down"));
        assert!(body.audio_script.as_deref().is_some_and(|s| s.contains("A: Hello")));
        assert_eq!(c.generator.prompts[0].1, 2500);
    }

    #[test]
    fn object_entries_in_lists_do_not_discard_the_material() {
        let reply = r#"{"model_dialogue": "A: Hello\nB: Hi",
            "useful_expressions": ["Let's begin: 始めましょう", {"phrase": "Kick off", "meaning": "開始"}, true],
            "additional_questions": [{"question": "?"}, "Q2"]}"#;
        let mut c = client(vec![Some(reply)]);
        let got = c.generate_roleplay_material(&ctx(), "商談", &RolePlayTemplate::default(), false);
        assert!(got.fallback.is_none(), "{:?}", got.fallback);
        assert_eq!(
            got.value.useful_expressions,
            vec!["Let's begin: 始めましょう", "Kick off: 開始"]
        );
        let MaterialBody::RolePlay(body) = &got.value.body else {
            panic!("expected role-play body");
        };
        assert_eq!(body.model_dialogue, "A: Hello\nB: Hi");
        assert_eq!(body.additional_questions, vec!["Q2"]);
    }

    #[test]
    fn transport_error_is_traced_and_falls_back() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let trace = TraceWriter::new(tmp.path().join("trace"), true).expect("trace");
        let mut c = client(vec![None]).with_trace(trace);
        let got = c.generate_detailed_situations(&ctx(), "商談");
        assert_eq!(got.fallback, Some(GenerationFailure::Transport("connection reset".to_string())));
        let error = std::fs::read_to_string(tmp.path().join("trace/0001.situations.error.txt")).expect("error file");
        assert_eq!(error, "connection reset");
    }

    #[test]
    fn unwritable_trace_does_not_block_generation() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = tmp.path().join("trace");
        let trace = TraceWriter::new(dir.clone(), true).expect("trace");
        std::fs::remove_dir_all(&dir).expect("remove");
        let mut c = client(vec![None]).with_trace(trace);
        let got = c.generate_primary_topics(&ctx());
        assert!(matches!(got.fallback, Some(GenerationFailure::Transport(_))));
        assert_eq!(got.value.len(), 8);
    }

    #[test]
    fn audio_off_strips_audio_fields() {
        let reply = r#"{"model_dialogue": "A: x", "audio_notes": "n"}"#;
        let mut c = client(vec![Some(reply)]);
        let got = c.generate_roleplay_material(&ctx(), "t", &RolePlayTemplate::default(), false);
        let MaterialBody::RolePlay(body) = &got.value.body else {
            panic!("expected role-play body");
        };
        assert!(body.audio_notes.is_none());
        assert!(body.audio_script.is_none());
        assert!(c.generator.prompts[0].0.contains("音声練習: 含まない"));
    }

    #[test]
    fn unparseable_discussion_falls_back_with_reason() {
        let mut c = client(vec![Some("Sorry, I cannot help with that.")]);
        let got = c.generate_discussion_material(&ctx(), "在宅勤務", &DiscussionTemplate::default());
        assert_eq!(
            got.fallback,
            Some(GenerationFailure::Extract(ExtractError::NoStart('{')))
        );
        assert!(got.value.fallback);
        assert_eq!(got.value.kind(), MaterialKind::Discussion);
        assert_eq!(got.value.topic, "在宅勤務");
    }

    #[test]
    fn empty_dialogue_is_rejected() {
        let mut c = client(vec![Some(r#"{"useful_expressions": ["a: b"]}"#)]);
        let got = c.generate_roleplay_material(&ctx(), "t", &RolePlayTemplate::default(), true);
        assert!(matches!(got.fallback, Some(GenerationFailure::Schema(_))));
    }

    #[test]
    fn expression_practice_keeps_expressions_empty() {
        let reply = r#"{"chart_description": "Sales rose.", "chart_data": {"labels": ["Q1"], "values": [1.5]},
            "useful_vocabulary": ["rise - 上昇"], "practice_questions": ["Why?"], "explanation_points": ["trend", "cause"]}"#;
        let mut c = client(vec![Some(reply)]);
        let got = c.generate_expression_practice_material(
            &ctx(),
            "売上報告",
            &ExpressionPracticeTemplate::default(),
        );
        assert!(!got.is_fallback());
        assert!(got.value.useful_expressions.is_empty());
        let MaterialBody::ExpressionPractice(body) = &got.value.body else {
            panic!("expected expression-practice body");
        };
        assert_eq!(body.chart_data.values, vec![1.5]);
        assert_eq!(body.explanation_points.as_deref(), Some("trend\ncause"));
        assert!(body.chart_generation_prompt.is_some());
    }

    #[test]
    fn alternatives_truncate_model_output() {
        let mut c = client(vec![Some(r#"["Let's start", "Shall we begin", "Let's kick off"]"#)]);
        let got = c.generate_alternative_expressions("始めましょう", 2);
        assert_eq!(got.value, vec!["Let's start", "Shall we begin"]);
        assert!(c.generator.prompts[0].0.contains("代替案を2個"));
    }

    #[test]
    fn alternatives_fall_back_to_exact_count() {
        let mut c = client(vec![Some("no list")]);
        let got = c.generate_alternative_expressions("good point", 4);
        assert!(got.is_fallback());
        assert_eq!(got.value.len(), 4);
        assert_eq!(got.value[1], "another way to say good point");
    }

    #[test]
    fn zero_alternatives_skip_the_call() {
        let mut c = client(vec![]);
        assert!(c.generate_alternative_expressions("x", 0).value.is_empty());
        assert!(c.generator.prompts.is_empty());
    }
}
