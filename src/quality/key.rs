/// Normalized comparison key of a useful-expression entry.
///
/// Entries look like `"<phrase>: <translation>"` or `"<phrase> - <translation>"`.
/// The text is lower-cased and trimmed, then:
/// - with a `:` the key is everything after the first `:`;
/// - otherwise, with a `-` the key is everything before the first `-`;
/// - otherwise the whole text.
///
/// The result is trimmed again. `:` takes precedence when both are present.
pub fn comparison_key(expression: &str) -> String {
    let lowered = expression.trim().to_lowercase();
    let picked = if let Some((_, after)) = lowered.split_once(':') {
        after
    } else if let Some((before, _)) = lowered.split_once('-') {
        before
    } else {
        lowered.as_str()
    };
    picked.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::comparison_key;

    #[test]
    fn colon_takes_the_translation_side() {
        assert_eq!(comparison_key("Let's begin: 始めましょう"), "始めましょう");
        assert_eq!(comparison_key("X: Shared Text "), "shared text");
        assert_eq!(comparison_key("a: b: c"), "b: c");
    }

    #[test]
    fn dash_takes_the_phrase_side() {
        assert_eq!(comparison_key("Good Point - 良い指摘"), "good point");
        assert_eq!(comparison_key("follow-up call"), "follow");
    }

    #[test]
    fn colon_wins_over_dash() {
        assert_eq!(comparison_key("Kick-off: 始めましょう"), "始めましょう");
        assert_eq!(comparison_key("Note - see: appendix"), "appendix");
    }

    #[test]
    fn plain_text_is_normalized_whole() {
        assert_eq!(comparison_key("  Thank You  "), "thank you");
        assert_eq!(comparison_key(""), "");
        assert_eq!(comparison_key("Label:"), "");
    }
}
