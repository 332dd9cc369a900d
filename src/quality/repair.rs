//! Duplicate repair.
//!
//! Each group runs its own small state machine:
//!
//! ```text
//! Pending -> ManualEditing  -> Applied
//! Pending -> AutoGenerating -> Applied
//! Pending -> Skipped
//! ```
//!
//! Editing states may switch between manual and automatic or be skipped before
//! anything is applied. `Applied` and `Skipped` accept no new decision; applying
//! an `Applied` group again rewrites the same text.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::detect::{detect_duplicates, DetectOptions, DuplicateGroup};
use crate::generation::fallback::templated_alternatives;
use crate::store::MaterialStore;

/// Produces alternative wordings for a duplicated expression.
pub trait AlternativeSource {
    /// At most `count` alternatives for `key`. Never fails; sources degrade on their own.
    fn alternatives(&mut self, key: &str, count: usize) -> Vec<String>;
}

/// Offline source: the deterministic templated phrasings.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplatedAlternatives;

impl AlternativeSource for TemplatedAlternatives {
    fn alternatives(&mut self, key: &str, count: usize) -> Vec<String> {
        templated_alternatives(key, count)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RepairState {
    Pending,
    ManualEditing,
    AutoGenerating,
    Applied,
    Skipped,
}

impl fmt::Display for RepairState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::ManualEditing => "manual-editing",
            Self::AutoGenerating => "auto-generating",
            Self::Applied => "applied",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RepairMethod {
    Manual,
    AutoGenerated,
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepairError {
    #[error("no duplicate group #{0}")]
    UnknownGroup(usize),
    #[error("group #{group} is {from}; cannot {action}")]
    InvalidTransition {
        group: usize,
        from: RepairState,
        action: &'static str,
    },
    #[error("expected {expected} replacements, got {got}")]
    CountMismatch { expected: usize, got: usize },
    #[error("group #{group} has no occurrence #{index}")]
    OccurrenceOutOfRange { group: usize, index: usize },
}

#[derive(Clone, Debug, Serialize)]
pub struct GroupRepair {
    pub group: DuplicateGroup,
    state: RepairState,
    method: Option<RepairMethod>,
    replacements: Vec<String>,
}

impl GroupRepair {
    fn new(group: DuplicateGroup) -> Self {
        Self {
            group,
            state: RepairState::Pending,
            method: None,
            replacements: Vec::new(),
        }
    }

    pub fn state(&self) -> RepairState {
        self.state
    }

    pub fn method(&self) -> Option<RepairMethod> {
        self.method
    }

    /// Pending replacement text; may be shorter than the occurrence list after
    /// an automatic decision.
    pub fn replacements(&self) -> &[String] {
        &self.replacements
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RepairSummary {
    pub pending: usize,
    pub editing: usize,
    pub applied: usize,
    pub skipped: usize,
}

impl RepairSummary {
    pub fn total(&self) -> usize {
        self.pending + self.editing + self.applied + self.skipped
    }
}

pub struct RepairEngine {
    opts: DetectOptions,
    groups: Vec<GroupRepair>,
}

impl RepairEngine {
    pub fn detect(store: &MaterialStore, opts: DetectOptions) -> Self {
        Self::from_groups(detect_duplicates(store, opts), opts)
    }

    pub fn from_groups(groups: Vec<DuplicateGroup>, opts: DetectOptions) -> Self {
        Self {
            opts,
            groups: groups.into_iter().map(GroupRepair::new).collect(),
        }
    }

    pub fn groups(&self) -> &[GroupRepair] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group(&self, gi: usize) -> Result<&GroupRepair, RepairError> {
        self.groups.get(gi).ok_or(RepairError::UnknownGroup(gi))
    }

    /// Start (or restart) a manual edit; replacements start as the original texts.
    pub fn begin_manual(&mut self, gi: usize) -> Result<&[String], RepairError> {
        let g = self.deciding(gi, "edit manually")?;
        g.replacements = g.group.occurrences.iter().map(|o| o.original.clone()).collect();
        g.method = Some(RepairMethod::Manual);
        g.state = RepairState::ManualEditing;
        Ok(g.replacements.as_slice())
    }

    pub fn set_manual_replacement(&mut self, gi: usize, index: usize, text: &str) -> Result<(), RepairError> {
        let g = self.editing_manual(gi)?;
        let slot = g
            .replacements
            .get_mut(index)
            .ok_or(RepairError::OccurrenceOutOfRange { group: gi, index })?;
        *slot = text.to_string();
        Ok(())
    }

    /// Replace all manual texts at once; one per occurrence.
    pub fn set_manual_replacements(&mut self, gi: usize, texts: Vec<String>) -> Result<(), RepairError> {
        let g = self.editing_manual(gi)?;
        let expected = g.group.occurrences.len();
        if texts.len() != expected {
            return Err(RepairError::CountMismatch {
                expected,
                got: texts.len(),
            });
        }
        g.replacements = texts;
        Ok(())
    }

    /// Ask `source` for one alternative per occurrence. Extra alternatives are
    /// dropped; occurrences without one keep their text when applied.
    pub fn begin_auto(
        &mut self,
        gi: usize,
        source: &mut dyn AlternativeSource,
    ) -> Result<&[String], RepairError> {
        let g = self.deciding(gi, "generate alternatives")?;
        let count = g.group.occurrences.len();
        let mut alts = source.alternatives(&g.group.key, count);
        alts.truncate(count);
        log::debug!(
            "group '{}': {} of {count} alternatives received",
            g.group.key,
            alts.len()
        );
        g.replacements = alts;
        g.method = Some(RepairMethod::AutoGenerated);
        g.state = RepairState::AutoGenerating;
        Ok(g.replacements.as_slice())
    }

    pub fn skip(&mut self, gi: usize) -> Result<(), RepairError> {
        let g = self
            .groups
            .get_mut(gi)
            .ok_or(RepairError::UnknownGroup(gi))?;
        match g.state {
            RepairState::Applied => Err(RepairError::InvalidTransition {
                group: gi,
                from: g.state,
                action: "skip",
            }),
            _ => {
                g.replacements.clear();
                g.method = Some(RepairMethod::Skip);
                g.state = RepairState::Skipped;
                Ok(())
            }
        }
    }

    /// Write the group's replacements into the store. Returns the number of
    /// slots written.
    pub fn apply(&mut self, gi: usize, store: &mut MaterialStore) -> Result<usize, RepairError> {
        let g = self
            .groups
            .get_mut(gi)
            .ok_or(RepairError::UnknownGroup(gi))?;
        match g.state {
            RepairState::ManualEditing | RepairState::AutoGenerating | RepairState::Applied => {}
            RepairState::Pending | RepairState::Skipped => {
                return Err(RepairError::InvalidTransition {
                    group: gi,
                    from: g.state,
                    action: "apply",
                })
            }
        }
        let mut written = 0;
        for (occ, text) in g.group.occurrences.iter().zip(&g.replacements) {
            if store.set_expression(occ.material_index, occ.expression_index, text) {
                written += 1;
            } else {
                log::warn!(
                    "occurrence ({}, {}) of '{}' no longer exists; left alone",
                    occ.material_index,
                    occ.expression_index,
                    g.group.key
                );
            }
        }
        g.state = RepairState::Applied;
        Ok(written)
    }

    /// Drop every group and detect again against the current store.
    pub fn recheck(&mut self, store: &MaterialStore) -> usize {
        self.groups = detect_duplicates(store, self.opts)
            .into_iter()
            .map(GroupRepair::new)
            .collect();
        self.groups.len()
    }

    pub fn summary(&self) -> RepairSummary {
        let mut s = RepairSummary::default();
        for g in &self.groups {
            match g.state {
                RepairState::Pending => s.pending += 1,
                RepairState::ManualEditing | RepairState::AutoGenerating => s.editing += 1,
                RepairState::Applied => s.applied += 1,
                RepairState::Skipped => s.skipped += 1,
            }
        }
        s
    }

    fn deciding(&mut self, gi: usize, action: &'static str) -> Result<&mut GroupRepair, RepairError> {
        let g = self
            .groups
            .get_mut(gi)
            .ok_or(RepairError::UnknownGroup(gi))?;
        match g.state {
            RepairState::Applied | RepairState::Skipped => Err(RepairError::InvalidTransition {
                group: gi,
                from: g.state,
                action,
            }),
            _ => Ok(g),
        }
    }

    fn editing_manual(&mut self, gi: usize) -> Result<&mut GroupRepair, RepairError> {
        let g = self
            .groups
            .get_mut(gi)
            .ok_or(RepairError::UnknownGroup(gi))?;
        if g.state != RepairState::ManualEditing {
            return Err(RepairError::InvalidTransition {
                group: gi,
                from: g.state,
                action: "set manual text",
            });
        }
        Ok(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{role_play, store_of};

    fn scenario() -> MaterialStore {
        store_of(vec![
            role_play("A", &["Let's begin: 始めましょう", "Good point - 良い指摘"]),
            role_play("B", &["Kick off: 始めましょう", "Next step: 次のステップ"]),
            role_play("C", &["Moving on: 次のステップ"]),
        ])
    }

    struct FixedSource(Vec<String>);

    impl AlternativeSource for FixedSource {
        fn alternatives(&mut self, _key: &str, _count: usize) -> Vec<String> {
            self.0.clone()
        }
    }

    #[test]
    fn manual_repair_touches_only_group_slots() {
        let mut store = scenario();
        let mut engine = RepairEngine::detect(&store, DetectOptions::default());
        assert_eq!(engine.groups().len(), 2);

        let prefilled = engine.begin_manual(0).expect("manual").to_vec();
        assert_eq!(prefilled, vec!["Let's begin: 始めましょう", "Kick off: 始めましょう"]);
        engine
            .set_manual_replacements(0, vec!["A".to_string(), "B".to_string()])
            .expect("set");
        let written = engine.apply(0, &mut store).expect("apply");
        assert_eq!(written, 2);

        assert_eq!(store.expression(0, 0), Some("A"));
        assert_eq!(store.expression(1, 0), Some("B"));
        assert_eq!(store.expression(0, 1), Some("Good point - 良い指摘"));
        assert_eq!(store.expression(1, 1), Some("Next step: 次のステップ"));
        assert_eq!(store.expression(2, 0), Some("Moving on: 次のステップ"));
        assert_eq!(engine.group(0).expect("g").state(), RepairState::Applied);
        assert_eq!(engine.group(1).expect("g").state(), RepairState::Pending);
    }

    #[test]
    fn manual_count_must_match() {
        let store = scenario();
        let mut engine = RepairEngine::detect(&store, DetectOptions::default());
        engine.begin_manual(0).expect("manual");
        assert_eq!(
            engine.set_manual_replacements(0, vec!["only one".to_string()]),
            Err(RepairError::CountMismatch {
                expected: 2,
                got: 1
            })
        );
        assert_eq!(
            engine.set_manual_replacement(0, 5, "x"),
            Err(RepairError::OccurrenceOutOfRange { group: 0, index: 5 })
        );
    }

    #[test]
    fn skip_leaves_store_untouched() {
        let store = scenario();
        let before = store.fingerprint();
        let mut engine = RepairEngine::detect(&store, DetectOptions::default());
        engine.skip(0).expect("skip");
        engine.skip(1).expect("skip");
        assert_eq!(store.fingerprint(), before);
        assert_eq!(
            engine.summary(),
            RepairSummary {
                skipped: 2,
                ..Default::default()
            }
        );
    }

    #[test]
    fn apply_twice_is_idempotent() {
        let mut store = scenario();
        let mut engine = RepairEngine::detect(&store, DetectOptions::default());
        engine.begin_auto(1, &mut TemplatedAlternatives).expect("auto");
        engine.apply(1, &mut store).expect("first");
        let once = store.fingerprint();
        engine.apply(1, &mut store).expect("second");
        assert_eq!(store.fingerprint(), once);
        assert_eq!(store.expression(1, 1), Some("alternative to 次のステップ"));
        assert_eq!(store.expression(2, 0), Some("another way to say 次のステップ"));
    }

    #[test]
    fn short_alternative_list_keeps_remaining_originals() {
        let mut store = scenario();
        let mut engine = RepairEngine::detect(&store, DetectOptions::default());
        let mut src = FixedSource(vec!["Let's get started: 始めましょう".to_string()]);
        let alts = engine.begin_auto(0, &mut src).expect("auto").to_vec();
        assert_eq!(alts.len(), 1);
        assert_eq!(engine.apply(0, &mut store).expect("apply"), 1);
        assert_eq!(store.expression(0, 0), Some("Let's get started: 始めましょう"));
        assert_eq!(store.expression(1, 0), Some("Kick off: 始めましょう"));
    }

    #[test]
    fn long_alternative_list_is_capped() {
        let store = scenario();
        let mut engine = RepairEngine::detect(&store, DetectOptions::default());
        let mut src = FixedSource((0..5).map(|i| format!("alt {i}")).collect());
        assert_eq!(engine.begin_auto(0, &mut src).expect("auto").len(), 2);
    }

    #[test]
    fn out_of_order_actions_are_rejected() {
        let mut store = scenario();
        let mut engine = RepairEngine::detect(&store, DetectOptions::default());
        assert!(matches!(
            engine.apply(0, &mut store),
            Err(RepairError::InvalidTransition { from: RepairState::Pending, .. })
        ));
        assert!(matches!(
            engine.set_manual_replacement(0, 0, "x"),
            Err(RepairError::InvalidTransition { .. })
        ));

        engine.begin_manual(0).expect("manual");
        engine.apply(0, &mut store).expect("apply");
        assert!(engine.begin_manual(0).is_err());
        assert!(engine.begin_auto(0, &mut TemplatedAlternatives).is_err());
        assert!(engine.skip(0).is_err());

        engine.skip(1).expect("skip");
        assert!(engine.apply(1, &mut store).is_err());
        assert_eq!(engine.group(9).err(), Some(RepairError::UnknownGroup(9)));
    }

    #[test]
    fn method_can_change_before_apply() {
        let mut store = scenario();
        let mut engine = RepairEngine::detect(&store, DetectOptions::default());
        engine.begin_auto(0, &mut TemplatedAlternatives).expect("auto");
        engine.begin_manual(0).expect("switch");
        assert_eq!(engine.group(0).expect("g").method(), Some(RepairMethod::Manual));
        engine.set_manual_replacement(0, 1, "Kick things off: 始めよう").expect("edit");
        engine.apply(0, &mut store).expect("apply");
        assert_eq!(store.expression(0, 0), Some("Let's begin: 始めましょう"));
        assert_eq!(store.expression(1, 0), Some("Kick things off: 始めよう"));
    }

    #[test]
    fn recheck_after_repairs_finds_nothing() {
        let mut store = scenario();
        let mut engine = RepairEngine::detect(&store, DetectOptions::default());
        for gi in 0..engine.groups().len() {
            engine.begin_auto(gi, &mut TemplatedAlternatives).expect("auto");
            engine.apply(gi, &mut store).expect("apply");
        }
        assert_eq!(engine.recheck(&store), 0);
        assert!(engine.is_empty());
    }

    #[test]
    fn templated_repair_of_colon_key_leaves_no_duplicates() {
        let mut store = store_of(vec![
            role_play("A", &["Time: 10:00 sharp"]),
            role_play("B", &["Slot: 10:00 sharp"]),
        ]);
        let mut engine = RepairEngine::detect(&store, DetectOptions::default());
        assert_eq!(engine.groups().len(), 1);
        assert_eq!(engine.group(0).expect("g").group.key, "10:00 sharp");
        engine.begin_auto(0, &mut TemplatedAlternatives).expect("auto");
        engine.apply(0, &mut store).expect("apply");
        assert_eq!(engine.recheck(&store), 0);
    }

    #[test]
    fn state_labels_read_as_in_progress() {
        assert_eq!(RepairState::AutoGenerating.to_string(), "auto-generating");
        assert_eq!(RepairState::ManualEditing.to_string(), "manual-editing");
    }

    #[test]
    fn recheck_discards_state_and_keeps_unresolved() {
        let store = scenario();
        let mut engine = RepairEngine::detect(&store, DetectOptions::default());
        engine.skip(0).expect("skip");
        assert_eq!(engine.recheck(&store), 2);
        assert_eq!(engine.summary().pending, 2);
    }
}
