use crate::context::LearnerContext;
use crate::store::MaterialStore;
use crate::textutil::word_count;

/// Materials whose serialized form mentions fewer than `min_hits` counseling-memo
/// keywords. A memo without keywords checks nothing.
pub fn context_compliance(store: &MaterialStore, ctx: &LearnerContext, min_hits: usize) -> Vec<String> {
    let keywords = ctx.memo_keywords();
    if keywords.is_empty() {
        log::debug!("context check skipped: counseling memo has no keywords");
        return Vec::new();
    }
    let mut issues = Vec::new();
    for (i, material) in store.iter().enumerate() {
        let content = match serde_json::to_string(material) {
            Ok(s) => s.to_lowercase(),
            Err(err) => {
                log::warn!("context check could not serialize material {}: {err}", i + 1);
                continue;
            }
        };
        let hits = keywords.iter().filter(|k| content.contains(k.as_str())).count();
        if hits < min_hits {
            issues.push(format!(
                "Material{} '{}': low relevance to the counseling context ({hits} keyword hits)",
                i + 1,
                material.topic
            ));
        }
    }
    issues
}

/// Materials where more than `ratio` of the useful expressions exceed
/// `max_words` words.
pub fn level_consistency(store: &MaterialStore, max_words: usize, ratio: f64) -> Vec<String> {
    let mut issues = Vec::new();
    for (i, material) in store.iter().enumerate() {
        let exprs = &material.useful_expressions;
        let long = exprs.iter().filter(|e| word_count(e) > max_words).count();
        if exprs.is_empty() || (long as f64) <= exprs.len() as f64 * ratio {
            continue;
        }
        issues.push(format!(
            "Material{}: vocabulary may be above the target level ({long}/{} long expressions)",
            i + 1,
            exprs.len()
        ));
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_support::{role_play, store_of};

    #[test]
    fn context_check_counts_memo_keywords() {
        let ctx = LearnerContext {
            counseling_memo: "loan proposal client budget".to_string(),
            ..Default::default()
        };
        let store = store_of(vec![
            role_play("loan proposal for a client", &["budget: 予算"]),
            role_play("weather", &["sunny: 晴れ"]),
        ]);
        let issues = context_compliance(&store, &ctx, 3);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("Material2 'weather'"));
    }

    #[test]
    fn empty_memo_skips_context_check() {
        let store = store_of(vec![role_play("x", &[])]);
        assert!(context_compliance(&store, &LearnerContext::default(), 3).is_empty());
    }

    #[test]
    fn level_check_flags_mostly_long_expressions() {
        let store = store_of(vec![
            role_play(
                "hard",
                &[
                    "I would like to propose a structured package: 提案",
                    "Could we possibly revisit the terms: 再検討",
                    "ok: はい",
                ],
            ),
            role_play("easy", &["Thanks: ありがとう", "Sure: もちろん"]),
            role_play("none", &[]),
        ]);
        let issues = level_consistency(&store, 3, 0.7);
        assert!(issues.is_empty(), "2/3 is not above 70%: {issues:?}");

        let store = store_of(vec![role_play(
            "hard",
            &[
                "I would like to propose a structured package: 提案",
                "Could we possibly revisit the terms: 再検討",
            ],
        )]);
        assert_eq!(level_consistency(&store, 3, 0.7).len(), 1);
    }
}
