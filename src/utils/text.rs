//! Text helpers

use scraper::ElementRef;

/// Collapse runs of whitespace into single spaces.
pub fn compact_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of an element, whitespace-compacted.
pub fn element_text(elem: ElementRef<'_>) -> String {
    compact_ws(&elem.text().collect::<Vec<_>>().join(" "))
}

/// Number of whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Truncate to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Contains `needle` as a whole word (ASCII word boundaries), case-insensitive.
pub fn contains_word(haystack_lower: &str, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return false;
    }
    let bytes = haystack_lower.as_bytes();
    let mut start = 0;
    while let Some(pos) = haystack_lower[start..].find(needle_lower) {
        let begin = start + pos;
        let end = begin + needle_lower.len();
        let before_ok = begin == 0 || !bytes[begin - 1].is_ascii_alphanumeric();
        let after_ok = end == bytes.len() || !bytes[end].is_ascii_alphanumeric();
        if before_ok && after_ok {
            return true;
        }
        start = begin + needle_lower.len().max(1);
        if start >= haystack_lower.len() {
            break;
        }
    }
    false
}
