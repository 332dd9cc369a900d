use std::io::{BufRead, Write};

use anyhow::Context;

use super::repair::{AlternativeSource, RepairEngine};
use crate::store::MaterialStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionOutcome {
    pub applied: usize,
    pub skipped: usize,
    pub slots_written: usize,
    /// Groups found by the re-check at the end of the session.
    pub remaining_groups: usize,
}

enum Choice {
    Manual,
    Auto,
    Skip,
}

/// Walk every pending group on a line-oriented terminal.
///
/// Each group offers manual, auto or skip (empty input skips). Manual edits
/// show the original text as the default for each occurrence. End of input
/// skips everything still open. The session ends with a full re-check.
pub fn run_repair_session<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    engine: &mut RepairEngine,
    store: &mut MaterialStore,
    source: &mut dyn AlternativeSource,
) -> anyhow::Result<SessionOutcome> {
    let mut outcome = SessionOutcome::default();
    let total = engine.groups().len();
    if total == 0 {
        writeln!(out, "No duplicate expressions found.").context("write prompt")?;
        return Ok(outcome);
    }

    let mut eof = false;
    for gi in 0..total {
        if eof {
            engine.skip(gi)?;
            outcome.skipped += 1;
            continue;
        }

        let group = engine.group(gi)?.group.clone();
        writeln!(out, "\n[{}/{total}] {}", gi + 1, group.issue_line()).context("write prompt")?;
        for (oi, occ) in group.occurrences.iter().enumerate() {
            writeln!(
                out,
                "  {}) Material{} #{}: {}",
                oi + 1,
                occ.material_index + 1,
                occ.expression_index + 1,
                occ.original
            )
            .context("write prompt")?;
        }

        let choice = loop {
            write!(out, "Choose [m]anual / [a]uto / [s]kip (default: skip): ").context("write prompt")?;
            out.flush().context("flush prompt")?;
            let Some(line) = read_line(input)? else {
                eof = true;
                break Choice::Skip;
            };
            match line.trim().to_ascii_lowercase().as_str() {
                "m" | "manual" => break Choice::Manual,
                "a" | "auto" => break Choice::Auto,
                "" | "s" | "skip" => break Choice::Skip,
                other => writeln!(out, "Unknown choice: {other}").context("write prompt")?,
            }
        };

        match choice {
            Choice::Skip => {
                engine.skip(gi)?;
                outcome.skipped += 1;
                continue;
            }
            Choice::Manual => {
                let originals = engine.begin_manual(gi)?.to_vec();
                for (oi, original) in originals.iter().enumerate() {
                    write!(out, "  replacement {} [{original}]: ", oi + 1).context("write prompt")?;
                    out.flush().context("flush prompt")?;
                    let Some(line) = read_line(input)? else {
                        eof = true;
                        break;
                    };
                    let text = line.trim();
                    if !text.is_empty() {
                        engine.set_manual_replacement(gi, oi, text)?;
                    }
                }
            }
            Choice::Auto => {
                let alts = engine.begin_auto(gi, source)?.to_vec();
                if alts.is_empty() {
                    writeln!(out, "  (no alternatives available)").context("write prompt")?;
                }
                for (oi, alt) in alts.iter().enumerate() {
                    writeln!(out, "  {} -> {alt}", oi + 1).context("write prompt")?;
                }
            }
        }

        if eof {
            engine.skip(gi)?;
            outcome.skipped += 1;
            continue;
        }
        write!(out, "Apply? [Y/n]: ").context("write prompt")?;
        out.flush().context("flush prompt")?;
        let confirmed = match read_line(input)? {
            Some(line) => !matches!(line.trim().to_ascii_lowercase().as_str(), "n" | "no"),
            None => {
                eof = true;
                false
            }
        };
        if confirmed {
            outcome.slots_written += engine.apply(gi, store)?;
            outcome.applied += 1;
        } else {
            engine.skip(gi)?;
            outcome.skipped += 1;
        }
    }

    outcome.remaining_groups = engine.recheck(store);
    writeln!(
        out,
        "\nApplied {} group(s), skipped {}. Re-check: {} duplicate group(s) remain.",
        outcome.applied, outcome.skipped, outcome.remaining_groups
    )
    .context("write summary")?;
    Ok(outcome)
}

fn read_line<R: BufRead>(input: &mut R) -> anyhow::Result<Option<String>> {
    let mut line = String::new();
    let n = input.read_line(&mut line).context("read input")?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::quality::detect::DetectOptions;
    use crate::quality::repair::TemplatedAlternatives;
    use crate::store::test_support::{role_play, store_of};

    fn scenario() -> MaterialStore {
        store_of(vec![
            role_play("A", &["Let's begin: 始めましょう", "Next step: 次のステップ"]),
            role_play("B", &["Kick off: 始めましょう", "Moving on: 次のステップ"]),
        ])
    }

    fn run(script: &str, store: &mut MaterialStore) -> (SessionOutcome, String) {
        let mut engine = RepairEngine::detect(store, DetectOptions::default());
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut out = Vec::new();
        let outcome = run_repair_session(&mut input, &mut out, &mut engine, store, &mut TemplatedAlternatives)
            .expect("session");
        (outcome, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn manual_then_auto_resolves_everything() {
        let mut store = scenario();
        let script = "m\n\nGet going: 始めよう\ny\na\n\n";
        let (outcome, transcript) = run(script, &mut store);
        assert_eq!(outcome.applied, 2);
        assert_eq!(outcome.slots_written, 4);
        assert_eq!(outcome.remaining_groups, 0);
        assert_eq!(store.expression(0, 0), Some("Let's begin: 始めましょう"));
        assert_eq!(store.expression(1, 0), Some("Get going: 始めよう"));
        assert_eq!(store.expression(0, 1), Some("alternative to 次のステップ"));
        assert!(transcript.contains("[1/2] Duplicate expression: '始めましょう'"));
        assert!(transcript.contains("0 duplicate group(s) remain"));
    }

    #[test]
    fn declining_apply_leaves_store_alone() {
        let mut store = scenario();
        let before = store.fingerprint();
        let (outcome, _) = run("a\nn\ns\n", &mut store);
        assert_eq!(outcome.applied, 0);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.remaining_groups, 2);
        assert_eq!(store.fingerprint(), before);
    }

    #[test]
    fn end_of_input_skips_remaining_groups() {
        let mut store = scenario();
        let before = store.fingerprint();
        let (outcome, _) = run("", &mut store);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(store.fingerprint(), before);
    }

    #[test]
    fn unknown_choice_is_asked_again() {
        let mut store = scenario();
        let (outcome, transcript) = run("x\ns\ns\n", &mut store);
        assert!(transcript.contains("Unknown choice: x"));
        assert_eq!(outcome.skipped, 2);
    }
}
