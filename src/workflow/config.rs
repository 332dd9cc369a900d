use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use crate::config::{find_default_config, load_config, AppConfig, CONFIG_ENV, DEFAULT_CONFIG_FILENAME};
use crate::generation::prompts::{default_prompt_files, PromptSet, DEFAULT_PROMPTS_DIR};
use crate::generation::{GenerationSettings, MaxTokens};
use crate::llm::anthropic::{
    AnthropicClient, AnthropicSettings, DEFAULT_API_KEY_ENV, DEFAULT_API_VERSION, DEFAULT_ENDPOINT,
    DEFAULT_MODEL,
};
use crate::llm::{OfflineGenerator, TextGenerator};
use crate::quality::{DetectOptions, QualityOptions};

#[derive(Clone, Debug)]
pub struct StudioConfig {
    pub workdir: PathBuf,
    pub config_path: PathBuf,

    pub endpoint: String,
    pub model: String,
    pub api_key_env: String,
    pub api_version: String,
    pub timeout: Duration,
    pub generation: GenerationSettings,

    pub trace_dir: PathBuf,
    pub trace_prompts: bool,
    pub session_path: PathBuf,

    pub quality: QualityOptions,
    pub quality_after_generate: bool,

    pub output_dir: PathBuf,
    pub vault_dir: PathBuf,
    pub google_credentials: Option<PathBuf>,
    pub author: String,

    pub prompts: PromptSet,
}

impl StudioConfig {
    /// Config file from `--config`, then `MATERIAL_STUDIO_CONFIG`, then an
    /// upward search. A missing file means built-in defaults.
    pub fn resolve(config_path: Option<PathBuf>, workdir: &Path) -> anyhow::Result<Self> {
        let workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
        let cfg_file = config_path
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(|| find_default_config(&workdir, DEFAULT_CONFIG_FILENAME));

        let mut file_cfg = AppConfig::default();
        if let Some(p) = cfg_file.as_ref() {
            if p.exists() {
                file_cfg = load_config(p)?;
            } else {
                log::warn!("config not found, using defaults: {}", p.display());
            }
        }
        let cfg_path = cfg_file.unwrap_or_else(|| workdir.join(DEFAULT_CONFIG_FILENAME));
        let base = cfg_path.parent().unwrap_or(&workdir).to_path_buf();
        let rel = |s: Option<&String>, default: &str| {
            let p = PathBuf::from(s.map(String::as_str).unwrap_or(default));
            if p.is_absolute() {
                p
            } else {
                base.join(p)
            }
        };

        let g = &file_cfg.generation;
        let defaults = GenerationSettings::default();
        let max = MaxTokens::default();
        let generation = GenerationSettings {
            topic_count: g.topic_count.unwrap_or(defaults.topic_count).max(1),
            situation_count: g.situation_count.unwrap_or(defaults.situation_count).max(1),
            max_tokens: MaxTokens {
                topics: g.max_tokens_topics.unwrap_or(max.topics),
                situations: g.max_tokens_situations.unwrap_or(max.situations),
                role_play: g.max_tokens_role_play.unwrap_or(max.role_play),
                discussion: g.max_tokens_discussion.unwrap_or(max.discussion),
                expression_practice: g
                    .max_tokens_expression_practice
                    .unwrap_or(max.expression_practice),
                alternatives: g.max_tokens_alternatives.unwrap_or(max.alternatives),
            },
            log_max_chars: file_cfg.pipeline.log_max_chars.unwrap_or(defaults.log_max_chars),
        };

        let q = &file_cfg.quality;
        let qd = QualityOptions::default();
        let quality = QualityOptions {
            check_context: q.check_context.unwrap_or(qd.check_context),
            check_level: q.check_level.unwrap_or(qd.check_level),
            check_duplicates: q.check_duplicates.unwrap_or(qd.check_duplicates),
            min_context_keywords: q.min_context_keywords.unwrap_or(qd.min_context_keywords),
            long_expression_words: q.long_expression_words.unwrap_or(qd.long_expression_words),
            long_expression_ratio: q.long_expression_ratio.unwrap_or(qd.long_expression_ratio),
            detect: DetectOptions {
                skip_empty_keys: q.skip_empty_keys.unwrap_or(false),
            },
        };

        let e = &file_cfg.export;
        let prompts = PromptSet::load(&cfg_path, &file_cfg).context("load prompts")?;

        Ok(Self {
            endpoint: g.endpoint.clone().unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: g.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key_env: g
                .api_key_env
                .clone()
                .unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string()),
            api_version: g
                .anthropic_version
                .clone()
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeout: Duration::from_secs(g.timeout_secs.unwrap_or(120).max(1)),
            generation,
            trace_dir: rel(file_cfg.pipeline.trace_dir.as_ref(), "_trace"),
            trace_prompts: file_cfg.pipeline.trace_prompts.unwrap_or(false),
            session_path: rel(file_cfg.pipeline.session.as_ref(), "material-session.json"),
            quality,
            quality_after_generate: q.after_generate.unwrap_or(true),
            output_dir: rel(e.output_dir.as_ref(), "output"),
            vault_dir: rel(e.vault_dir.as_ref(), "vault"),
            google_credentials: e.google_credentials.as_ref().map(|s| rel(Some(s), "")),
            author: e
                .author
                .clone()
                .unwrap_or_else(|| crate::export::gdocs::DEFAULT_AUTHOR.to_string()),
            prompts,
            workdir,
            config_path: cfg_path,
        })
    }

    pub fn anthropic_settings(&self) -> Option<AnthropicSettings> {
        let api_key = std::env::var(&self.api_key_env).ok().filter(|k| !k.trim().is_empty())?;
        Some(AnthropicSettings {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            api_version: self.api_version.clone(),
            api_key,
            timeout: self.timeout,
        })
    }

    /// The Messages API client when the key is set, otherwise a generator that
    /// fails every call so the fallback content is used.
    pub fn build_generator(&self) -> anyhow::Result<Box<dyn TextGenerator>> {
        match self.anthropic_settings() {
            Some(settings) => Ok(Box::new(AnthropicClient::new(settings)?)),
            None => {
                log::warn!(
                    "{} is not set; generation will use fallback content",
                    self.api_key_env
                );
                Ok(Box::new(OfflineGenerator::new(format!(
                    "API key missing: set the {} environment variable",
                    self.api_key_env
                ))))
            }
        }
    }
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(DEFAULT_CONFIG_FILENAME);

    let prompts_dir = dir.join(DEFAULT_PROMPTS_DIR);
    std::fs::create_dir_all(&prompts_dir)
        .with_context(|| format!("create prompts dir: {}", prompts_dir.display()))?;
    for (fname, body) in default_prompt_files() {
        let p = prompts_dir.join(fname);
        if p.exists() && !force {
            continue;
        }
        std::fs::write(&p, body).with_context(|| format!("write prompt: {}", p.display()))?;
    }

    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

const DEFAULT_CONFIG_TOML: &str = r#"[generation]
endpoint = "https://api.anthropic.com"
model = "claude-3-5-sonnet-20241022"
api_key_env = "ANTHROPIC_API_KEY"
anthropic_version = "2023-06-01"
timeout_secs = 120
topic_count = 8
situation_count = 3
max_tokens_topics = 1000
max_tokens_situations = 800
max_tokens_role_play = 2500
max_tokens_discussion = 2000
max_tokens_expression_practice = 2000
max_tokens_alternatives = 800

[pipeline]
trace_dir = "_trace"
trace_prompts = false
log_max_chars = 160
session = "material-session.json"

[quality]
# true: expressions with an empty comparison key are not grouped
skip_empty_keys = false
check_context = true
check_level = true
check_duplicates = true
min_context_keywords = 3
long_expression_words = 3
long_expression_ratio = 0.7
after_generate = true

[export]
output_dir = "output"
vault_dir = "vault"
# OAuth token JSON ({"access_token": "..."}); falls back to GOOGLE_APPLICATION_CREDENTIALS
# google_credentials = "google-token.json"
author = "語学教材作成支援ツール"

[prompts]
topics = "prompts/topics.txt"
situations = "prompts/situations.txt"
role_play = "prompts/role_play.json.txt"
discussion = "prompts/discussion.json.txt"
expression_practice = "prompts/expression_practice.json.txt"
alternatives = "prompts/alternatives.txt"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_then_resolve_reads_written_config() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = init_default_config(tmp.path(), false).expect("init");
        assert!(tmp.path().join("prompts").join("role_play.json.txt").exists());

        let cfg = StudioConfig::resolve(Some(path.clone()), tmp.path()).expect("resolve");
        assert_eq!(cfg.generation.topic_count, 8);
        assert_eq!(cfg.generation.max_tokens.role_play, 2500);
        assert_eq!(cfg.timeout, Duration::from_secs(120));
        assert!(!cfg.quality.detect.skip_empty_keys);
        assert_eq!(cfg.session_path, path.parent().expect("dir").join("material-session.json"));
        assert!(cfg.google_credentials.is_none());
    }

    #[test]
    fn init_keeps_edited_files_without_force() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = init_default_config(tmp.path(), false).expect("init");
        std::fs::write(&path, "[generation]\ntopic_count = 4\n").expect("edit");
        init_default_config(tmp.path(), false).expect("re-init");
        let cfg = StudioConfig::resolve(Some(path.clone()), tmp.path()).expect("resolve");
        assert_eq!(cfg.generation.topic_count, 4);

        init_default_config(tmp.path(), true).expect("force");
        let cfg = StudioConfig::resolve(Some(path), tmp.path()).expect("resolve");
        assert_eq!(cfg.generation.topic_count, 8);
    }
}
