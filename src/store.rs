use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::material::Material;

/// Ordered collection of generated materials.
///
/// Batch generation only appends; the repair engine only rewrites single
/// expression slots through [`MaterialStore::set_expression`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialStore {
    materials: Vec<Material>,
}

impl MaterialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_materials(materials: Vec<Material>) -> Self {
        Self { materials }
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Material> {
        self.materials.iter()
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn get(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    pub fn append(&mut self, material: Material) {
        self.materials.push(material);
    }

    pub fn extend(&mut self, materials: impl IntoIterator<Item = Material>) {
        self.materials.extend(materials);
    }

    pub fn clear(&mut self) {
        self.materials.clear();
    }

    pub fn expression(&self, material_index: usize, expression_index: usize) -> Option<&str> {
        self.materials
            .get(material_index)?
            .useful_expressions
            .get(expression_index)
            .map(|s| s.as_str())
    }

    /// Overwrite one expression slot. Out-of-range coordinates are ignored and
    /// reported as `false`.
    pub fn set_expression(&mut self, material_index: usize, expression_index: usize, text: &str) -> bool {
        let Some(slot) = self
            .materials
            .get_mut(material_index)
            .and_then(|m| m.useful_expressions.get_mut(expression_index))
        else {
            return false;
        };
        *slot = text.to_string();
        true
    }

    /// Copies of the materials at the given zero-based indexes, in the given order.
    /// Unknown indexes are skipped.
    pub fn select(&self, indexes: &[usize]) -> Vec<Material> {
        indexes
            .iter()
            .filter_map(|&i| self.materials.get(i).cloned())
            .collect()
    }

    /// SHA-256 of the canonical JSON form; equal fingerprints mean byte-identical stores.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        match serde_json::to_vec(&self.materials) {
            Ok(bytes) => hasher.update(&bytes),
            Err(err) => hasher.update(err.to_string().as_bytes()),
        }
        hex::encode(hasher.finalize())
    }
}

impl<'a> IntoIterator for &'a MaterialStore {
    type Item = &'a Material;
    type IntoIter = std::slice::Iter<'a, Material>;

    fn into_iter(self) -> Self::IntoIter {
        self.materials.iter()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::material::{DiscussionBody, Material, MaterialBody, RolePlayBody};

    use super::MaterialStore;

    pub fn role_play(topic: &str, expressions: &[&str]) -> Material {
        Material::new(
            topic,
            expressions.iter().map(|s| s.to_string()).collect(),
            MaterialBody::RolePlay(RolePlayBody {
                model_dialogue: format!("A: Let's talk about {topic}.\nB: Sure."),
                additional_questions: vec!["What would you do next?".to_string()],
                ..Default::default()
            }),
        )
    }

    pub fn discussion(topic: &str, expressions: &[&str]) -> Material {
        Material::new(
            topic,
            expressions.iter().map(|s| s.to_string()).collect(),
            MaterialBody::Discussion(DiscussionBody {
                discussion_topic: topic.to_string(),
                background_info: "Background".to_string(),
                key_points: vec!["cost".to_string()],
                discussion_questions: vec!["Why?".to_string()],
                supporting_materials: None,
            }),
        )
    }

    pub fn store_of(materials: Vec<Material>) -> MaterialStore {
        MaterialStore::from_materials(materials)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{role_play, store_of};
    use super::*;

    #[test]
    fn set_expression_ignores_out_of_range() {
        let mut store = store_of(vec![role_play("t", &["a: x"])]);
        let before = store.fingerprint();
        assert!(!store.set_expression(0, 5, "z"));
        assert!(!store.set_expression(3, 0, "z"));
        assert_eq!(store.fingerprint(), before);
        assert!(store.set_expression(0, 0, "b: y"));
        assert_eq!(store.expression(0, 0), Some("b: y"));
        assert_ne!(store.fingerprint(), before);
    }

    #[test]
    fn select_keeps_requested_order() {
        let store = store_of(vec![role_play("one", &[]), role_play("two", &[]), role_play("three", &[])]);
        let picked: Vec<String> = store.select(&[2, 0, 9]).into_iter().map(|m| m.topic).collect();
        assert_eq!(picked, vec!["three", "one"]);
    }

    #[test]
    fn store_serializes_as_plain_array() {
        let store = store_of(vec![role_play("t", &["a"])]);
        let json = serde_json::to_value(&store).expect("json");
        assert!(json.is_array());
        let back: MaterialStore = serde_json::from_value(json).expect("back");
        assert_eq!(back, store);
    }
}
