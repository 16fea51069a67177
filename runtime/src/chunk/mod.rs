//! Semantic chunking: decompose a `PageRecord` into scored, typed chunks.
//!
//! Chunks are what actually enters a model prompt, so generation is biased
//! toward content an agent can act on: a summary first, the heading outline,
//! scored body paragraphs, forms, and notable links.

pub mod score;

use crate::types::{Chunk, ChunkType, FormField, PageRecord};
use regex::Regex;
use score::{detect_type, group_sentences, link_density, score_paragraph, split_sentences};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Options for chunk generation.
#[derive(Debug, Clone)]
pub struct ChunkOptions {
    /// Paragraphs longer than this split on sentence boundaries.
    pub max_chunk_size: usize,
    /// Chunks scoring below this are dropped.
    pub min_score: i32,
    /// Keep link-dense navigation paragraphs.
    pub include_nav: bool,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            max_chunk_size: 800,
            min_score: -1,
            include_nav: false,
        }
    }
}

const SUMMARY_SCORE: i32 = 10;
const TOC_SCORE: i32 = 5;
const FORM_SCORE: i32 = 7;
const LINKS_SCORE: i32 = 3;
const MAX_NOTABLE_LINKS: usize = 20;

static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n").expect("PARAGRAPH_BREAK regex"));
static SKIP_LINK_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(home|menu|back|next|prev|more|see all)").expect("SKIP_LINK_PREFIX regex")
});

/// Decompose a page into chunks, sorted by score descending.
pub fn chunk_page(page: &PageRecord, opts: &ChunkOptions) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut next_id = 0u32;
    let mut push = |chunks: &mut Vec<Chunk>,
                    chunk_type: ChunkType,
                    section: Option<String>,
                    text: String,
                    score: i32,
                    meta: BTreeMap<String, serde_json::Value>| {
        chunks.push(Chunk {
            id: next_id,
            chunk_type,
            section,
            text,
            score,
            relevance: None,
            meta,
        });
        next_id += 1;
    };

    push(
        &mut chunks,
        ChunkType::Summary,
        None,
        summary_text(page),
        SUMMARY_SCORE,
        BTreeMap::new(),
    );

    if !page.headings.is_empty() {
        push(
            &mut chunks,
            ChunkType::Toc,
            None,
            toc_text(page),
            TOC_SCORE,
            BTreeMap::new(),
        );
    }

    let mut current_section: Option<String> = None;
    for paragraph in PARAGRAPH_BREAK.split(&page.text_content) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        // A paragraph that echoes a heading becomes the running section
        // marker; the TOC chunk already carries its text.
        if let Some(heading) = page
            .headings
            .iter()
            .find(|h| h.text == paragraph || h.text.starts_with(paragraph))
        {
            current_section = Some(heading.text.clone());
            continue;
        }

        let density = link_density(paragraph);
        if !opts.include_nav && density > 0.5 {
            continue;
        }

        let score = score_paragraph(paragraph, density, current_section.is_some());
        if score < opts.min_score {
            continue;
        }
        let chunk_type = detect_type(paragraph, None);

        if paragraph.len() > opts.max_chunk_size {
            let sentences = split_sentences(paragraph);
            let groups = group_sentences(&sentences, opts.max_chunk_size);
            for (part, group) in groups.into_iter().enumerate() {
                let mut meta = BTreeMap::new();
                meta.insert("partial".to_string(), serde_json::Value::Bool(true));
                meta.insert("part".to_string(), serde_json::json!(part + 1));
                push(
                    &mut chunks,
                    chunk_type,
                    current_section.clone(),
                    group,
                    score,
                    meta,
                );
            }
        } else {
            push(
                &mut chunks,
                chunk_type,
                current_section.clone(),
                paragraph.to_string(),
                score,
                BTreeMap::new(),
            );
        }
    }

    for form in &page.forms {
        push(
            &mut chunks,
            ChunkType::Form,
            None,
            form_text(form),
            FORM_SCORE,
            BTreeMap::new(),
        );
    }

    let notable = notable_links(page);
    if !notable.is_empty() {
        push(
            &mut chunks,
            ChunkType::Links,
            None,
            notable.join("\n"),
            LINKS_SCORE,
            BTreeMap::new(),
        );
    }

    chunks.sort_by(|a, b| b.score.cmp(&a.score));
    chunks
}

/// Rank chunks against a free-text query.
///
/// Relevance is the chunk score plus twice the total count of query-token
/// occurrences in its text (case-insensitive); the top `limit` chunks are
/// returned in relevance order.
pub fn find_relevant(chunks: &[Chunk], query: &str, limit: usize) -> Vec<Chunk> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .filter(|t| t.len() > 2)
        .map(|t| t.to_lowercase())
        .collect();

    let mut ranked: Vec<Chunk> = chunks
        .iter()
        .cloned()
        .map(|mut chunk| {
            let haystack = chunk.text.to_lowercase();
            let occurrences: usize = tokens
                .iter()
                .map(|t| haystack.matches(t.as_str()).count())
                .sum();
            chunk.relevance = Some(chunk.score + 2 * occurrences as i32);
            chunk
        })
        .collect();

    ranked.sort_by(|a, b| b.relevance.cmp(&a.relevance));
    ranked.truncate(limit);
    ranked
}

/// Render chunks in the canonical textual form used for prompt summaries:
/// a header line per chunk, then its text, separated by `---` lines.
pub fn render_chunks(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| {
            let header = match &c.section {
                Some(section) => format!(
                    "[chunk:{}] type={} section=\"{}\" score={}",
                    c.id,
                    c.chunk_type.as_str(),
                    section,
                    c.score
                ),
                None => format!(
                    "[chunk:{}] type={} score={}",
                    c.id,
                    c.chunk_type.as_str(),
                    c.score
                ),
            };
            format!("{header}\n{}", c.text)
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

fn summary_text(page: &PageRecord) -> String {
    let mut lines = Vec::new();
    if !page.title.is_empty() {
        lines.push(format!("Title: {}", page.title));
    }
    if let Some(description) = page
        .meta
        .get("description")
        .or_else(|| page.meta.get("og:description"))
    {
        lines.push(format!("Description: {description}"));
    }
    lines.push(format!("URL: {}", page.url));
    let s = &page.stats;
    lines.push(format!(
        "Page: {} headings, {} links, {} forms, {} images, {} tables, {} chars of text",
        s.heading_count, s.link_count, s.form_count, s.image_count, s.table_count, s.text_length
    ));
    lines.join("\n")
}

fn toc_text(page: &PageRecord) -> String {
    page.headings
        .iter()
        .map(|h| {
            let indent = "  ".repeat((h.level.saturating_sub(1)) as usize);
            format!("{indent}{}", h.text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn form_text(form: &crate::types::Form) -> String {
    let mut lines = vec![format!("Form: {} {}", form.method, form.action)];
    for field in &form.fields {
        match field {
            FormField::Input {
                input_type,
                name,
                placeholder,
                required,
            } => {
                let mut line = format!("- input[{input_type}] {name}");
                if !placeholder.is_empty() {
                    line.push_str(&format!(" ({placeholder})"));
                }
                if *required {
                    line.push_str(" required");
                }
                lines.push(line);
            }
            FormField::Textarea {
                name,
                placeholder,
                required,
            } => {
                let mut line = format!("- textarea {name}");
                if !placeholder.is_empty() {
                    line.push_str(&format!(" ({placeholder})"));
                }
                if *required {
                    line.push_str(" required");
                }
                lines.push(line);
            }
            FormField::Select { name, options } => {
                lines.push(format!("- select {name}: {}", options.join(", ")));
            }
        }
    }
    lines.join("\n")
}

/// Links worth surfacing: body-length text that is not pager chrome.
fn notable_links(page: &PageRecord) -> Vec<String> {
    page.links
        .iter()
        .filter(|l| {
            let len = l.text.chars().count();
            (4..=79).contains(&len) && !SKIP_LINK_PREFIX.is_match(&l.text)
        })
        .take(MAX_NOTABLE_LINKS)
        .map(|l| format!("- {}: {}", l.text, l.href))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Backend, Form, Heading, Link, PageStats};
    use std::collections::BTreeMap;

    fn page(text: &str) -> PageRecord {
        let mut record = PageRecord {
            url: "https://example.com/docs".into(),
            title: "Docs".into(),
            meta: BTreeMap::from([("description".to_string(), "API guide".to_string())]),
            headings: vec![
                Heading {
                    level: 1,
                    text: "Getting started".into(),
                },
                Heading {
                    level: 2,
                    text: "Install".into(),
                },
            ],
            links: Vec::new(),
            forms: Vec::new(),
            images: Vec::new(),
            tables: Vec::new(),
            text_content: text.to_string(),
            stats: PageStats::default(),
            http_status: 200,
            content_type: "text/html".into(),
            backend: Backend::Lite,
        };
        record.refresh_stats();
        record
    }

    #[test]
    fn test_summary_chunk_first_and_highest() {
        let chunks = chunk_page(&page("Some body text that goes on for a while here."), &ChunkOptions::default());
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].chunk_type, ChunkType::Summary);
        assert_eq!(chunks[0].score, 10);
        for c in &chunks {
            assert!(c.score <= chunks[0].score);
        }
        assert!(chunks[0].text.contains("Title: Docs"));
        assert!(chunks[0].text.contains("Description: API guide"));
    }

    #[test]
    fn test_toc_present_iff_headings() {
        let with = chunk_page(&page("text"), &ChunkOptions::default());
        assert!(with.iter().any(|c| c.chunk_type == ChunkType::Toc));

        let mut no_headings = page("text");
        no_headings.headings.clear();
        no_headings.refresh_stats();
        let without = chunk_page(&no_headings, &ChunkOptions::default());
        assert!(!without.iter().any(|c| c.chunk_type == ChunkType::Toc));
    }

    #[test]
    fn test_toc_indents_by_level() {
        let chunks = chunk_page(&page("text"), &ChunkOptions::default());
        let toc = chunks.iter().find(|c| c.chunk_type == ChunkType::Toc).unwrap();
        assert!(toc.text.contains("Getting started"));
        assert!(toc.text.contains("\n  Install"));
    }

    #[test]
    fn test_heading_paragraph_sets_section() {
        let text = "Getting started\n\nClone the repository and run the setup script to begin working.";
        let chunks = chunk_page(&page(text), &ChunkOptions::default());
        // The heading echo itself is skipped, not emitted as a paragraph.
        assert!(!chunks
            .iter()
            .any(|c| c.chunk_type == ChunkType::Paragraph && c.text == "Getting started"));
        let para = chunks
            .iter()
            .find(|c| c.text.starts_with("Clone the repository"))
            .unwrap();
        assert_eq!(para.section.as_deref(), Some("Getting started"));
    }

    #[test]
    fn test_nav_paragraph_dropped_unless_included() {
        let nav = "https://a.com https://b.com https://c.com links";
        let kept_out = chunk_page(&page(nav), &ChunkOptions::default());
        assert!(!kept_out.iter().any(|c| c.text == nav));

        let kept_in = chunk_page(
            &page(nav),
            &ChunkOptions {
                include_nav: true,
                min_score: i32::MIN,
                ..Default::default()
            },
        );
        assert!(kept_in.iter().any(|c| c.text == nav));
    }

    #[test]
    fn test_long_paragraph_splits_with_part_meta() {
        let sentences: String = (0..40)
            .map(|i| format!("Sentence number {i} has a bit of length to it. "))
            .collect();
        let chunks = chunk_page(&page(&sentences), &ChunkOptions::default());
        let parts: Vec<_> = chunks
            .iter()
            .filter(|c| c.meta.get("partial") == Some(&serde_json::Value::Bool(true)))
            .collect();
        assert!(parts.len() > 1);
        for part in &parts {
            assert!(part.text.len() <= 800);
            assert!(part.meta.contains_key("part"));
        }
    }

    #[test]
    fn test_form_chunks_describe_fields() {
        let mut record = page("text");
        record.forms.push(Form {
            action: "/search".into(),
            method: "POST".into(),
            fields: vec![crate::types::FormField::Input {
                input_type: "text".into(),
                name: "q".into(),
                placeholder: "Query".into(),
                required: true,
            }],
        });
        record.refresh_stats();
        let chunks = chunk_page(&record, &ChunkOptions::default());
        let form = chunks.iter().find(|c| c.chunk_type == ChunkType::Form).unwrap();
        assert_eq!(form.score, 7);
        assert!(form.text.contains("Form: POST /search"));
        assert!(form.text.contains("- input[text] q (Query) required"));
    }

    #[test]
    fn test_links_chunk_filters_chrome() {
        let mut record = page("text");
        record.links = vec![
            Link {
                text: "Home".into(),
                href: "https://example.com/".into(),
            },
            Link {
                text: "API reference manual".into(),
                href: "https://example.com/api".into(),
            },
            Link {
                text: "a".into(),
                href: "https://example.com/a".into(),
            },
        ];
        record.refresh_stats();
        let chunks = chunk_page(&record, &ChunkOptions::default());
        let links = chunks.iter().find(|c| c.chunk_type == ChunkType::Links).unwrap();
        assert!(links.text.contains("API reference manual"));
        assert!(!links.text.contains("- Home:"));
        assert!(!links.text.contains("- a:"));
    }

    #[test]
    fn test_ids_unique_and_in_emission_order() {
        let chunks = chunk_page(
            &page("First paragraph with enough words to score well and stay.\n\nSecond paragraph, also long enough to be kept around here."),
            &ChunkOptions::default(),
        );
        let mut ids: Vec<_> = chunks.iter().map(|c| c.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), chunks.len());
        // Summary was emitted first.
        assert_eq!(chunks.iter().find(|c| c.id == 0).unwrap().chunk_type, ChunkType::Summary);
    }

    #[test]
    fn test_find_relevant_prefers_token_matches() {
        let chunks = chunk_page(
            &page("The rust compiler toolchain is fast and safe to use daily.\n\nCooking pasta requires water, salt, and a big enough pot."),
            &ChunkOptions::default(),
        );
        let ranked = find_relevant(&chunks, "rust compiler", 10);
        for pair in ranked.windows(2) {
            assert!(pair[0].relevance.unwrap() >= pair[1].relevance.unwrap());
        }
        // With equal base scores, the rust paragraph outranks the pasta one.
        let rust_pos = ranked
            .iter()
            .position(|c| c.text.contains("rust compiler"))
            .unwrap();
        let pasta_pos = ranked
            .iter()
            .position(|c| c.text.contains("Cooking pasta"))
            .unwrap();
        assert!(rust_pos < pasta_pos);
    }

    #[test]
    fn test_find_relevant_ignores_short_tokens() {
        let chunks = chunk_page(&page("An ox is an ox of course of course."), &ChunkOptions::default());
        let ranked = find_relevant(&chunks, "an ox", 5);
        // Both tokens are <=2 chars; relevance equals base score.
        for c in &ranked {
            assert_eq!(c.relevance, Some(c.score));
        }
    }

    #[test]
    fn test_render_chunks_wire_format() {
        let chunks = vec![
            Chunk {
                id: 0,
                chunk_type: ChunkType::Summary,
                section: None,
                text: "Title: T".into(),
                score: 10,
                relevance: None,
                meta: BTreeMap::new(),
            },
            Chunk {
                id: 3,
                chunk_type: ChunkType::Paragraph,
                section: Some("Install".into()),
                text: "Run the installer.".into(),
                score: 2,
                relevance: None,
                meta: BTreeMap::new(),
            },
        ];
        let out = render_chunks(&chunks);
        assert!(out.starts_with("[chunk:0] type=summary score=10\nTitle: T"));
        assert!(out.contains("\n\n---\n\n"));
        assert!(out.contains("[chunk:3] type=paragraph section=\"Install\" score=2\nRun the installer."));
    }
}
