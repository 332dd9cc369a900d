pub mod anthropic;
pub mod extract;

use anyhow::anyhow;

/// A text-completion backend. One prompt in, free text out.
pub trait TextGenerator {
    fn generate(&mut self, prompt: &str, max_tokens: u32) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}

/// Stand-in used when no API key is configured. Every call fails, so callers
/// take their fallback path.
#[derive(Clone, Debug)]
pub struct OfflineGenerator {
    reason: String,
}

impl OfflineGenerator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl TextGenerator for OfflineGenerator {
    fn generate(&mut self, _prompt: &str, _max_tokens: u32) -> anyhow::Result<String> {
        Err(anyhow!("generation backend unavailable: {}", self.reason))
    }

    fn name(&self) -> &str {
        "offline"
    }
}

impl<G: TextGenerator + ?Sized> TextGenerator for Box<G> {
    fn generate(&mut self, prompt: &str, max_tokens: u32) -> anyhow::Result<String> {
        (**self).generate(prompt, max_tokens)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
