//! Sentence boundary detection shared by chunking, extractive ranking and
//! bullet formatting.
//!
//! A boundary is a `.`, `!` or `?` followed by whitespace. A handful of common
//! English abbreviations are not treated as boundaries. This is a heuristic:
//! abbreviation-heavy text (initials, unusual titles, decimal-free citations)
//! may still be under- or over-split.

const ABBREVIATIONS: &[&str] = &[
    "mr.", "mrs.", "ms.", "dr.", "prof.", "st.", "vs.", "etc.", "e.g.", "i.e.",
];

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// True when the whitespace-delimited word ending at `end` (exclusive) is a
/// known abbreviation.
fn ends_with_abbreviation(text: &str, end: usize) -> bool {
    let head = &text[..end];
    let word_start = head
        .rfind(char::is_whitespace)
        .map(|i| i + head[i..].chars().next().map(char::len_utf8).unwrap_or(1))
        .unwrap_or(0);
    let word = head[word_start..].trim_start_matches(|c: char| c == '(' || c == '"');
    let lowered = word.to_lowercase();
    ABBREVIATIONS.contains(&lowered.as_str())
}

/// Split `text` into trimmed, non-empty sentences in source order.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        let end = idx + c.len_utf8();
        let followed_by_space = chars
            .peek()
            .map(|(_, next)| next.is_whitespace())
            .unwrap_or(false);
        if !followed_by_space || ends_with_abbreviation(text, end) {
            continue;
        }

        let sentence = text[start..end].trim();
        if !sentence.is_empty() {
            sentences.push(sentence.to_string());
        }
        start = end;
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    sentences
}
