use anyhow::anyhow;

use crate::generation::GenerationClient;
use crate::llm::TextGenerator;
use crate::progress::ConsoleProgress;
use crate::quality::{run_quality_check, QualityOptions, QualityReport};

use super::session::Session;

#[derive(Clone, Debug, Default)]
pub struct BatchOptions {
    /// Topics to generate; empty means the whole topic list.
    pub topics: Vec<String>,
    pub no_audio: bool,
    /// `None` skips the quality report after the batch.
    pub quality: Option<QualityOptions>,
}

#[derive(Clone, Debug, Default)]
pub struct BatchReport {
    pub generated: usize,
    /// Topic and reason for every material that came from fallback content.
    pub fallbacks: Vec<(String, String)>,
    pub quality: Option<QualityReport>,
}

impl BatchReport {
    #[must_use]
    pub fn render_block(&self) -> String {
        let mut out = format!(
            "BATCH: {} generated, {} from fallback content\n",
            self.generated,
            self.fallbacks.len()
        );
        for (topic, reason) in &self.fallbacks {
            out.push_str(&format!("  fallback '{topic}': {reason}\n"));
        }
        if let Some(q) = &self.quality {
            out.push_str(&q.render_block());
        }
        out.trim_end().to_string()
    }
}

fn selected_topics(session: &Session, requested: &[String]) -> Vec<String> {
    if requested.is_empty() {
        return session.topics.clone();
    }
    for t in requested {
        if !session.topics.iter().any(|x| x == t) {
            log::warn!("topic not in the topic list, generating anyway: {t}");
        }
    }
    requested.to_vec()
}

/// Generate one material per selected topic, in order, appending each to the
/// session store. A failed topic gets fallback content and the batch goes on.
pub fn run_batch<G: TextGenerator>(
    client: &mut GenerationClient<G>,
    session: &mut Session,
    opts: &BatchOptions,
    progress: &ConsoleProgress,
) -> anyhow::Result<BatchReport> {
    let readiness = session.context.readiness(&session.topics);
    if !readiness.is_ready() {
        return Err(anyhow!(
            "not ready for batch generation:\n{}\n{}",
            readiness.render_block(),
            readiness.missing_hints().join("\n")
        ));
    }

    let topics = selected_topics(session, &opts.topics);
    let kind = session.kind;
    let include_audio = session.templates.role_play.include_audio && !opts.no_audio;
    progress.info(format!(
        "Generating {} {} material(s) with {}",
        topics.len(),
        kind.label_ja(),
        client.generator_name()
    ));

    let mut report = BatchReport::default();
    for (i, topic) in topics.iter().enumerate() {
        let generated = client.generate_material(kind, &session.context, topic, &session.templates, include_audio);
        if let Some(reason) = &generated.fallback {
            report.fallbacks.push((topic.clone(), reason.to_string()));
        }
        session.materials.append(generated.value);
        report.generated += 1;
        progress.progress("Generating", i + 1, topics.len(), topic);
    }

    if let Some(q) = &opts.quality {
        report.quality = Some(run_quality_check(&session.materials, &session.context, q));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::prompts::PromptSet;
    use crate::generation::test_support::ScriptedGenerator;
    use crate::generation::GenerationSettings;
    use crate::material::MaterialBody;

    fn ready_session() -> Session {
        let mut s = Session::default();
        s.context.counseling_memo = "融資 提案".to_string();
        s.context.teaching_policy = "実践重視".to_string();
        s.add_topic("融資の提案");
        s.add_topic("審査結果の説明");
        s
    }

    fn client(replies: Vec<Option<&str>>) -> GenerationClient<ScriptedGenerator> {
        GenerationClient::new(
            ScriptedGenerator::new(replies),
            PromptSet::default(),
            GenerationSettings::default(),
        )
    }

    #[test]
    fn batch_refuses_without_context() {
        let mut s = Session::default();
        s.add_topic("x");
        let err = run_batch(&mut client(vec![]), &mut s, &BatchOptions::default(), &ConsoleProgress::new(false))
            .expect_err("not ready");
        assert!(format!("{err}").contains("counseling memo"));
        assert!(s.materials.is_empty());
    }

    #[test]
    fn failed_topic_falls_back_and_batch_continues() {
        let mut s = ready_session();
        let reply = r#"{"model_dialogue":"A: Hi\nB: Hello","useful_expressions":["Let's begin: 始めましょう"],"additional_questions":["Q?"]}"#;
        let mut c = client(vec![Some(reply), None]);
        let opts = BatchOptions {
            no_audio: true,
            quality: Some(QualityOptions::default()),
            ..Default::default()
        };
        let report = run_batch(&mut c, &mut s, &opts, &ConsoleProgress::new(false)).expect("batch");

        assert_eq!(report.generated, 2);
        assert_eq!(report.fallbacks.len(), 1);
        assert_eq!(report.fallbacks[0].0, "審査結果の説明");
        assert_eq!(s.materials.len(), 2);
        assert!(!s.materials.materials()[0].fallback);
        assert!(s.materials.materials()[1].fallback);
        match &s.materials.materials()[0].body {
            MaterialBody::RolePlay(b) => assert!(b.audio_script.is_none()),
            other => panic!("unexpected body: {other:?}"),
        }
        assert!(report.quality.is_some());
        assert!(report.render_block().contains("1 from fallback content"));
    }

    #[test]
    fn explicit_topic_selection_limits_the_batch() {
        let mut s = ready_session();
        let mut c = client(vec![None]);
        let opts = BatchOptions {
            topics: vec!["審査結果の説明".to_string()],
            ..Default::default()
        };
        let report = run_batch(&mut c, &mut s, &opts, &ConsoleProgress::new(false)).expect("batch");
        assert_eq!(report.generated, 1);
        assert_eq!(s.materials.materials()[0].topic, "審査結果の説明");
        assert!(report.quality.is_none());
    }
}
