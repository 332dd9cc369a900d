use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILENAME: &str = "material-studio.toml";
pub const CONFIG_ENV: &str = "MATERIAL_STUDIO_CONFIG";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub generation: GenerationSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub quality: QualitySection,
    #[serde(default)]
    pub export: ExportSection,
    #[serde(default)]
    pub prompts: PromptsSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GenerationSection {
    /// Base URL of the Messages API, without the `/v1/messages` suffix.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Name of the environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub anthropic_version: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub topic_count: Option<usize>,
    #[serde(default)]
    pub situation_count: Option<usize>,

    #[serde(default)]
    pub max_tokens_topics: Option<u32>,
    #[serde(default)]
    pub max_tokens_situations: Option<u32>,
    #[serde(default)]
    pub max_tokens_role_play: Option<u32>,
    #[serde(default)]
    pub max_tokens_discussion: Option<u32>,
    #[serde(default)]
    pub max_tokens_expression_practice: Option<u32>,
    #[serde(default)]
    pub max_tokens_alternatives: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PipelineSection {
    #[serde(default)]
    pub trace_dir: Option<String>,
    #[serde(default)]
    pub trace_prompts: Option<bool>,
    #[serde(default)]
    pub log_max_chars: Option<usize>,

    /// JSON file holding the working session between invocations.
    #[serde(default)]
    pub session: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct QualitySection {
    /// Drop expressions whose comparison key is empty instead of grouping them.
    #[serde(default)]
    pub skip_empty_keys: Option<bool>,

    #[serde(default)]
    pub check_context: Option<bool>,
    #[serde(default)]
    pub check_level: Option<bool>,
    #[serde(default)]
    pub check_duplicates: Option<bool>,

    #[serde(default)]
    pub min_context_keywords: Option<usize>,
    #[serde(default)]
    pub long_expression_words: Option<usize>,
    #[serde(default)]
    pub long_expression_ratio: Option<f64>,

    /// Run the quality report automatically after batch generation.
    #[serde(default)]
    pub after_generate: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ExportSection {
    #[serde(default)]
    pub output_dir: Option<String>,
    #[serde(default)]
    pub vault_dir: Option<String>,
    /// Path to a Google OAuth token JSON. Falls back to `GOOGLE_APPLICATION_CREDENTIALS`.
    #[serde(default)]
    pub google_credentials: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PromptsSection {
    #[serde(default)]
    pub topics: Option<String>,
    #[serde(default)]
    pub situations: Option<String>,
    #[serde(default)]
    pub role_play: Option<String>,
    #[serde(default)]
    pub discussion: Option<String>,
    #[serde(default)]
    pub expression_practice: Option<String>,
    #[serde(default)]
    pub alternatives: Option<String>,
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    if let Some(p) = find_file_upwards(workdir, filename, 8) {
        return Some(p);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 10) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).context("parse config toml")?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_leaves_other_sections_default() {
        let cfg: AppConfig = toml::from_str(
            r#"
[generation]
model = "claude-3-5-sonnet-20241022"
timeout_secs = 30

[quality]
skip_empty_keys = true
"#,
        )
        .expect("parse");
        assert_eq!(cfg.generation.timeout_secs, Some(30));
        assert_eq!(cfg.quality.skip_empty_keys, Some(true));
        assert!(cfg.export.output_dir.is_none());
        assert!(cfg.prompts.role_play.is_none());
    }

    #[test]
    fn upward_search_finds_parent_config() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(tmp.path().join(DEFAULT_CONFIG_FILENAME), "").expect("write");
        let found = find_file_upwards(&nested, DEFAULT_CONFIG_FILENAME, 4).expect("found");
        assert_eq!(found, tmp.path().join(DEFAULT_CONFIG_FILENAME));
        assert!(find_file_upwards(&nested, "missing.toml", 2).is_none());
    }
}
