//! Paragraph scoring, chunk typing, and sentence splitting.

use crate::types::ChunkType;
use regex::Regex;
use std::sync::LazyLock;

static NAV_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(home|menu|search|login|sign in|sign up|subscribe|newsletter|cookie|privacy|terms)\b",
    )
    .expect("NAV_PREFIX regex")
});
static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)copyright|all rights reserved|powered by").expect("BOILERPLATE regex")
});
static CODE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`|\b(const|function|import)\b").expect("CODE_MARKER regex")
});
static INSTRUCTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)how to|step|guide|tutorial|example|note:|warning:|important:")
        .expect("INSTRUCTIONAL regex")
});
static CALLOUT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(note|warning|tip|important|caution|info)[:\s]").expect("CALLOUT regex")
});

/// Occurrences of `http(s)://` per word. 0 when the text has no words.
pub fn link_density(text: &str) -> f64 {
    let words = text.split_whitespace().count();
    if words == 0 {
        return 0.0;
    }
    let urls = text.matches("http://").count() + text.matches("https://").count();
    urls as f64 / words as f64
}

/// Heuristic content score for one paragraph.
pub fn score_paragraph(text: &str, link_density: f64, under_heading: bool) -> i32 {
    let mut score = 0;
    let len = text.len();

    if (50..=500).contains(&len) {
        score += 2;
    } else if (501..=2000).contains(&len) {
        score += 1;
    } else if len < 20 {
        score -= 2;
    }

    if text.chars().any(|c| c.is_ascii_digit()) {
        score += 1;
    }
    if CODE_MARKER.is_match(text) {
        score += 2;
    }
    if NAV_PREFIX.is_match(text) {
        score -= 3;
    }
    if BOILERPLATE.is_match(text) {
        score -= 2;
    }
    if link_density > 0.7 {
        score -= 2;
    }
    if under_heading {
        score += 1;
    }
    if INSTRUCTIONAL.is_match(text) {
        score += 2;
    }

    score
}

/// Classify a text fragment. `tag` is the source element name when the
/// fragment came from a tagged context; paragraphs split out of flowing
/// text pass `None`.
pub fn detect_type(text: &str, tag: Option<&str>) -> ChunkType {
    let trimmed = text.trim_start();

    if tag == Some("code")
        || tag == Some("pre")
        || trimmed.starts_with("```")
        || trimmed.starts_with("~~~")
        || trimmed.starts_with("$ ")
        || trimmed.starts_with("> ")
    {
        return ChunkType::Code;
    }
    if let Some(tag) = tag {
        if tag.len() == 2 && tag.starts_with('h') && tag[1..].chars().all(|c| c.is_ascii_digit()) {
            return ChunkType::Heading;
        }
    }
    if tag == Some("li")
        || trimmed.starts_with('•')
        || trimmed.starts_with('-')
        || trimmed.starts_with('*')
    {
        return ChunkType::ListItem;
    }
    if CALLOUT_PREFIX.is_match(trimmed) {
        return ChunkType::Callout;
    }
    if tag == Some("td") || tag == Some("th") {
        return ChunkType::TableCell;
    }
    if tag.is_none() && text.len() < 50 {
        return ChunkType::Label;
    }
    if (text.contains("http://") || text.contains("https://"))
        && text.split_whitespace().count() < 5
    {
        return ChunkType::Link;
    }
    ChunkType::Paragraph
}

/// Split text on sentence boundaries: `.`, `!`, or `?` followed by
/// whitespace and an uppercase letter. Sentences shorter than 10 chars are
/// dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0;

    let mut i = 0;
    while i < chars.len() {
        if matches!(chars[i], '.' | '!' | '?') {
            // Scan past the whitespace run; a following uppercase letter
            // marks a boundary.
            let mut j = i + 1;
            let mut saw_space = false;
            while j < chars.len() && chars[j].is_whitespace() {
                saw_space = true;
                j += 1;
            }
            if saw_space && j < chars.len() && chars[j].is_uppercase() {
                let sentence: String = chars[start..=i].iter().collect();
                let sentence = sentence.trim().to_string();
                if sentence.len() >= 10 {
                    sentences.push(sentence);
                }
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }

    let tail: String = chars[start..].iter().collect();
    let tail = tail.trim().to_string();
    if tail.len() >= 10 {
        sentences.push(tail);
    }
    sentences
}

/// Greedily group consecutive sentences so each group stays under `max`.
/// A single oversized sentence still forms its own group.
pub fn group_sentences(sentences: &[String], max: usize) -> Vec<String> {
    let mut groups = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        if !current.is_empty() && current.len() + 1 + sentence.len() > max {
            groups.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}
