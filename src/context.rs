use serde::{Deserialize, Serialize};

use crate::textutil::clip_chars;

/// What the consultant knows about the learners.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerContext {
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub job_role: String,
    #[serde(default)]
    pub english_level: String,
    #[serde(default)]
    pub learning_goal: String,
    #[serde(default)]
    pub counseling_memo: String,
    #[serde(default)]
    pub teaching_policy: String,
    #[serde(default)]
    pub business_scenes: String,
}

impl LearnerContext {
    pub fn industry_or_default(&self) -> &str {
        non_empty_or(&self.industry, "一般企業")
    }

    pub fn job_role_or_default(&self) -> &str {
        non_empty_or(&self.job_role, "ビジネスパーソン")
    }

    pub fn level_or_default(&self) -> &str {
        non_empty_or(&self.english_level, "中級")
    }

    pub fn goal_or_default(&self) -> &str {
        non_empty_or(&self.learning_goal, "ビジネス英語向上")
    }

    pub fn memo_excerpt(&self, max_chars: usize) -> String {
        clip_chars(self.counseling_memo.trim(), max_chars)
    }

    /// Lower-cased whitespace tokens of the counseling memo.
    pub fn memo_keywords(&self) -> Vec<String> {
        self.counseling_memo
            .to_lowercase()
            .split_whitespace()
            .map(|s| s.to_string())
            .collect()
    }

    #[must_use]
    pub fn readiness(&self, topics: &[String]) -> Readiness {
        Readiness {
            memo_chars: self.counseling_memo.chars().count(),
            policy_chars: self.teaching_policy.chars().count(),
            topic_count: topics.len(),
        }
    }
}

fn non_empty_or<'a>(v: &'a str, default: &'a str) -> &'a str {
    let t = v.trim();
    if t.is_empty() {
        default
    } else {
        t
    }
}

/// Pre-flight check before a batch run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Readiness {
    pub memo_chars: usize,
    pub policy_chars: usize,
    pub topic_count: usize,
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        self.memo_chars > 0 && self.policy_chars > 0 && self.topic_count > 0
    }

    pub fn render_block(&self) -> String {
        let mark = |ok: bool| if ok { "[x]" } else { "[ ]" };
        let mut out = String::new();
        out.push_str(&format!(
            "{} counseling memo ({} chars)\n",
            mark(self.memo_chars > 0),
            self.memo_chars
        ));
        out.push_str(&format!(
            "{} teaching policy ({} chars)\n",
            mark(self.policy_chars > 0),
            self.policy_chars
        ));
        out.push_str(&format!(
            "{} topic list ({} topics)",
            mark(self.topic_count > 0),
            self.topic_count
        ));
        out
    }

    /// Setup hints for whatever is missing.
    pub fn missing_hints(&self) -> Vec<&'static str> {
        let mut hints = Vec::new();
        if self.memo_chars == 0 || self.policy_chars == 0 {
            hints.push("set the counseling memo and teaching policy: material-studio context set --memo-file .. --policy-file ..");
        }
        if self.topic_count == 0 {
            hints.push("add topics: material-studio topics add <topic> (or: topics generate)");
        }
        hints
    }
}
