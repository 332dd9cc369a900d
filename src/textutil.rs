use once_cell::sync::Lazy;
use regex::Regex;

static WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Drop control characters except `\n`, `\r` and `\t`.
pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| (c as u32) >= 32 || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// First `max_chars` characters, with a `...` marker when something was cut.
pub fn clip_chars(text: &str, max_chars: usize) -> String {
    let mut it = text.char_indices();
    match it.nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Single-line preview for log output.
pub fn log_preview(text: &str, max_chars: usize) -> String {
    let flat = WS_RE.replace_all(text.trim(), " ");
    clip_chars(&flat, max_chars)
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn sanitize_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => out.push('_'),
            c if c.is_control() => out.push('_'),
            _ => out.push(ch),
        }
    }
    let trimmed = out.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Decode a text file that may not be UTF-8 (Shift_JIS exports are common for
/// counseling notes). A BOM wins; otherwise UTF-8 is tried before Shift_JIS.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some((enc, bom_len)) = encoding_rs::Encoding::for_bom(bytes) {
        let (text, _) = enc.decode_without_bom_handling(&bytes[bom_len..]);
        return text.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::SHIFT_JIS.decode(bytes);
            text.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_control_keeps_layout_whitespace() {
        let s = "a\u{0}b\u{1b}c\n\td\r";
        assert_eq!(strip_control_chars(s), "abc\n\td\r");
    }

    #[test]
    fn clip_counts_chars_not_bytes() {
        assert_eq!(clip_chars("始めましょう", 3), "始めま...");
        assert_eq!(clip_chars("short", 10), "short");
    }

    #[test]
    fn sanitize_replaces_path_separators() {
        assert_eq!(sanitize_filename("a/b:c?"), "a_b_c_");
        assert_eq!(sanitize_filename("  "), "untitled");
    }

    #[test]
    fn decode_handles_bom_and_shift_jis() {
        let mut with_bom = vec![0xEF, 0xBB, 0xBF];
        with_bom.extend_from_slice("メモ".as_bytes());
        assert_eq!(decode_text(&with_bom), "メモ");

        let (sjis, _, _) = encoding_rs::SHIFT_JIS.encode("業界");
        assert_eq!(decode_text(&sjis), "業界");
    }
}
