use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::context::LearnerContext;
use crate::material::MaterialKind;
use crate::store::MaterialStore;
use crate::template::TemplateSet;

/// Working state kept between CLI invocations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub context: LearnerContext,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub templates: TemplateSet,
    #[serde(default = "default_kind")]
    pub kind: MaterialKind,
    #[serde(default)]
    pub materials: MaterialStore,
}

fn default_kind() -> MaterialKind {
    MaterialKind::RolePlay
}

impl Default for Session {
    fn default() -> Self {
        Self {
            context: LearnerContext::default(),
            topics: Vec::new(),
            templates: TemplateSet::default(),
            kind: default_kind(),
            materials: MaterialStore::new(),
        }
    }
}

impl Session {
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            log::debug!("no session file yet: {}", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read session: {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parse session: {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;
        }
        let text = serde_json::to_string_pretty(self).context("serialize session")?;
        std::fs::write(path, text).with_context(|| format!("write session: {}", path.display()))
    }

    /// Add a topic unless it is blank or already listed.
    pub fn add_topic(&mut self, topic: &str) -> bool {
        let t = topic.trim();
        if t.is_empty() || self.topics.iter().any(|x| x == t) {
            return false;
        }
        self.topics.push(t.to_string());
        true
    }

    /// Remove by 1-based position.
    pub fn remove_topic(&mut self, number: usize) -> Option<String> {
        if number == 0 || number > self.topics.len() {
            return None;
        }
        Some(self.topics.remove(number - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::role_play;

    #[test]
    fn session_survives_save_and_load() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("nested").join("session.json");
        assert_eq!(Session::load_or_default(&path).expect("default"), Session::default());

        let mut s = Session::default();
        s.context.counseling_memo = "融資".to_string();
        s.kind = MaterialKind::Discussion;
        s.materials.append(role_play("A", &["x: y"]));
        assert!(s.add_topic(" 会議 "));
        assert!(!s.add_topic("会議"));
        s.save(&path).expect("save");
        assert_eq!(Session::load_or_default(&path).expect("load"), s);
    }

    #[test]
    fn remove_topic_is_one_based() {
        let mut s = Session::default();
        s.add_topic("a");
        s.add_topic("b");
        assert_eq!(s.remove_topic(0), None);
        assert_eq!(s.remove_topic(2).as_deref(), Some("b"));
        assert_eq!(s.topics, vec!["a"]);
    }
}
