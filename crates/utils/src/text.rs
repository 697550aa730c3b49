//! Plain-text helpers shared by the document model and the scoring engine.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TAG_RE: Regex = Regex::new(r"(?s)<[^>]*>").expect("valid tag regex");
    static ref SPACE_RE: Regex = Regex::new(r"\s+").expect("valid whitespace regex");
}

/// Escape text so it can be embedded in markup.
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverse of [`escape_markup`] for the entities it produces, plus `&nbsp;`.
pub fn unescape_markup(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Drop every tag, keeping the text between them.
pub fn strip_tags(markup: &str) -> String {
    TAG_RE.replace_all(markup, " ").into_owned()
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    SPACE_RE.replace_all(text.trim(), " ").into_owned()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Length in Unicode scalar values, which is what platform limits count.
pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Cut `text` down to at most `max` characters without splitting a char.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Trim, lowercase and collapse inner whitespace. Empty input yields `None`.
pub fn normalize_keyword(raw: &str) -> Option<String> {
    let normalized = collapse_whitespace(raw).to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

fn words_lower(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Case-insensitive phrase match on word boundaries.
///
/// `"ai"` matches "AI tools" but not "maintain"; multi-word phrases must
/// appear as consecutive words.
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    let needle = words_lower(phrase);
    if needle.is_empty() {
        return false;
    }
    let words = words_lower(haystack);
    words.windows(needle.len()).any(|window| window == needle.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_round_trip() {
        let raw = r#"Tom & Jerry <say> "hi" it's"#;
        assert_eq!(unescape_markup(&escape_markup(raw)), raw);
    }

    #[test]
    fn test_strip_tags() {
        let text = strip_tags("<p>Hello <strong>world</strong></p>");
        assert_eq!(collapse_whitespace(&text), "Hello world");
    }

    #[test]
    fn test_contains_phrase_respects_word_boundaries() {
        assert!(contains_phrase("Why AI matters", "ai"));
        assert!(!contains_phrase("We maintain the show", "ai"));
        assert!(contains_phrase("great Content Creation tips", "content creation"));
        assert!(!contains_phrase("content and creation", "content creation"));
        assert!(!contains_phrase("anything", "   "));
    }

    #[test]
    fn test_truncate_chars_handles_multibyte() {
        assert_eq!(truncate_chars("🎙️ live", 2), "🎙️");
        assert_eq!(truncate_chars("short", 10), "short");
    }

    #[test]
    fn test_normalize_keyword() {
        assert_eq!(normalize_keyword("  Audio   Content "), Some("audio content".into()));
        assert_eq!(normalize_keyword("   "), None);
    }
}
