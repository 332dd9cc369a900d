use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde_json::Value;

use super::timestamp;
use crate::material::Material;

/// Write `materials_<ts>.json` (or `selected_materials_<ts>.json`).
pub fn write_materials_json(dir: &Path, materials: &[Material], selected: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;
    let prefix = if selected { "selected_materials" } else { "materials" };
    let path = dir.join(format!("{prefix}_{}.json", timestamp()));
    let text = serde_json::to_string_pretty(materials).context("serialize materials")?;
    std::fs::write(&path, text).with_context(|| format!("write materials: {}", path.display()))?;
    Ok(path)
}

pub fn load_materials_json(path: &Path) -> anyhow::Result<Vec<Material>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read materials: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse materials: {}", path.display()))
}

pub fn write_topic_list(dir: &Path, topics: &[String]) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("create dir: {}", dir.display()))?;
    let path = dir.join(format!("topic_list_{}.json", timestamp()));
    let text = serde_json::to_string_pretty(topics).context("serialize topics")?;
    std::fs::write(&path, text).with_context(|| format!("write topics: {}", path.display()))?;
    Ok(path)
}

/// Accepts a bare JSON array of strings or an object with a `topics` array.
pub fn load_topic_list(path: &Path) -> anyhow::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read topics: {}", path.display()))?;
    let value: Value = serde_json::from_str(&text).context("parse topics json")?;
    let items = match &value {
        Value::Array(items) => items,
        Value::Object(obj) => obj
            .get("topics")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("topics file has no `topics` array"))?,
        _ => return Err(anyhow!("topics file must hold a JSON array")),
    };
    Ok(items
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}
