use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::Context;

use crate::textutil::sanitize_filename;

/// Optional on-disk record of every prompt and raw model response.
pub struct TraceWriter {
    dir: PathBuf,
    enabled: bool,
    seq: AtomicUsize,
}

impl TraceWriter {
    pub fn new(dir: PathBuf, enabled: bool) -> anyhow::Result<Self> {
        if enabled {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("create trace dir: {}", dir.display()))?;
        }
        Ok(Self {
            dir,
            enabled,
            seq: AtomicUsize::new(0),
        })
    }

    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
            seq: AtomicUsize::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn write_named_text(&self, name: &str, text: &str) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let path = self.dir.join(sanitize_filename(name));
        std::fs::write(&path, text).with_context(|| format!("write trace: {}", path.display()))?;
        Ok(())
    }

    /// Writes `<seq>.<call>.<kind>.txt`; `seq` is shared by a prompt and its response.
    pub fn write_call_text(&self, seq: usize, call: &str, kind: &str, text: &str) -> anyhow::Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.write_named_text(&format!("{seq:04}.{call}.{kind}.txt"), text)
    }

    pub fn next_seq(&self) -> usize {
        self.seq.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::TraceWriter;

    #[test]
    fn disabled_writer_touches_nothing() {
        let tw = TraceWriter::disabled();
        tw.write_call_text(1, "topics", "prompt", "x").expect("noop");
        assert!(!tw.is_enabled());
    }

    #[test]
    fn enabled_writer_names_files_by_sequence() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let tw = TraceWriter::new(tmp.path().join("trace"), true).expect("trace");
        let seq = tw.next_seq();
        tw.write_call_text(seq, "role_play", "prompt", "hello").expect("write");
        let p = tmp.path().join("trace").join("0001.role_play.prompt.txt");
        assert_eq!(std::fs::read_to_string(p).expect("read"), "hello");
    }
}
