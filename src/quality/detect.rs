use std::collections::HashMap;

use serde::Serialize;

use super::key::comparison_key;
use crate::store::MaterialStore;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Occurrence {
    pub material_index: usize,
    pub expression_index: usize,
    pub original: String,
}

/// Two or more occurrences sharing one comparison key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    pub key: String,
    pub occurrences: Vec<Occurrence>,
}

impl DuplicateGroup {
    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    /// `Duplicate expression: '<key>' found in Material1, Material2`
    pub fn issue_line(&self) -> String {
        let places = self
            .occurrences
            .iter()
            .map(|o| format!("Material{}", o.material_index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        format!("Duplicate expression: '{}' found in {places}", self.key)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DetectOptions {
    /// Leave expressions with an empty key out of every group.
    pub skip_empty_keys: bool,
}

/// Group expressions by comparison key, in first-seen key order. Only keys
/// seen at least twice produce a group.
pub fn detect_duplicates(store: &MaterialStore, opts: DetectOptions) -> Vec<DuplicateGroup> {
    let mut order: Vec<String> = Vec::new();
    let mut by_key: HashMap<String, Vec<Occurrence>> = HashMap::new();

    for (mi, material) in store.iter().enumerate() {
        for (ei, expr) in material.useful_expressions.iter().enumerate() {
            let key = comparison_key(expr);
            if opts.skip_empty_keys && key.is_empty() {
                continue;
            }
            let occ = Occurrence {
                material_index: mi,
                expression_index: ei,
                original: expr.clone(),
            };
            match by_key.get_mut(&key) {
                Some(list) => list.push(occ),
                None => {
                    order.push(key.clone());
                    by_key.insert(key, vec![occ]);
                }
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| {
            let occurrences = by_key.remove(&key)?;
            (occurrences.len() >= 2).then_some(DuplicateGroup { key, occurrences })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::store::test_support::{discussion, role_play, store_of};

    #[test]
    fn shared_translation_forms_one_group() {
        let store = store_of(vec![
            role_play("A", &["Let's begin: 始めましょう", "Good point - 良い指摘"]),
            role_play("B", &["Kick off: 始めましょう"]),
        ]);
        let groups = detect_duplicates(&store, DetectOptions::default());
        assert_eq!(groups.len(), 1);
        let g = &groups[0];
        assert_eq!(g.key, "始めましょう");
        let coords: Vec<(usize, usize)> = g
            .occurrences
            .iter()
            .map(|o| (o.material_index, o.expression_index))
            .collect();
        assert_eq!(coords, vec![(0, 0), (1, 0)]);
        assert_eq!(g.occurrences[1].original, "Kick off: 始めましょう");
        assert_eq!(
            g.issue_line(),
            "Duplicate expression: '始めましょう' found in Material1, Material2"
        );
    }

    #[test]
    fn groups_follow_first_seen_order_and_partition() {
        let store = store_of(vec![
            role_play("A", &["x: beta", "y: alpha", "solo"]),
            discussion("B", &["z: alpha", "w: beta", "q: beta"]),
            role_play("C", &[]),
        ]);
        let groups = detect_duplicates(&store, DetectOptions::default());
        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["beta", "alpha"]);
        assert_eq!(groups[0].len(), 3);

        let mut seen = HashSet::new();
        for g in &groups {
            for o in &g.occurrences {
                assert!(seen.insert((o.material_index, o.expression_index)));
                assert_eq!(comparison_key(&o.original), g.key);
            }
        }
    }

    #[test]
    fn empty_keys_follow_policy() {
        let store = store_of(vec![role_play("A", &["Note:", "  "]), role_play("B", &["Tip:"])]);
        let grouped = detect_duplicates(&store, DetectOptions::default());
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].key, "");
        assert_eq!(grouped[0].len(), 3);

        let skipped = detect_duplicates(&store, DetectOptions { skip_empty_keys: true });
        assert!(skipped.is_empty());
    }

    #[test]
    fn no_expressions_no_groups() {
        let store = store_of(vec![role_play("A", &[]), role_play("B", &[])]);
        assert!(detect_duplicates(&store, DetectOptions::default()).is_empty());
        assert!(detect_duplicates(&MaterialStore::new(), DetectOptions::default()).is_empty());
    }
}
