//! SPA detection: score raw HTML for client-side rendering signals.
//!
//! Decides, from the server-sent HTML alone, whether a page needs a browser
//! to produce meaningful content. Framework markers, text-to-markup ratios,
//! and content-structure heuristics each contribute a weight; the sum drives
//! the verdict.

use crate::types::{Confidence, DetectionReport};
use regex::Regex;
use std::sync::LazyLock;

/// Score at or above which a page is treated as a SPA.
pub const SPA_THRESHOLD: i32 = 4;
/// Score at or above which the verdict is high confidence.
pub const HIGH_CONFIDENCE: i32 = 8;

static EMPTY_ROOT_DIV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div[^>]*id=["']root["'][^>]*>\s*</div>"#).expect("EMPTY_ROOT_DIV regex")
});
static EMPTY_APP_DIV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div[^>]*id=["']app["'][^>]*>\s*</div>"#).expect("EMPTY_APP_DIV regex")
});
static NEXT_DIV: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)<div[^>]*id=["']__next["']"#).expect("NEXT_DIV regex"));
static APP_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<app-root").expect("APP_ROOT regex"));
static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("SCRIPT regex"));
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style>").expect("STYLE regex"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("ANY_TAG regex"));
static LOADING_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)class=["'][^"']*(?:loading|skeleton|spinner)|aria-label=["']loading"#)
        .expect("LOADING_MARKER regex")
});
static HEADING_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h[1-6][\s>]").expect("HEADING_TAG regex"));
static PARAGRAPH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p>").expect("PARAGRAPH regex"));
static GENERATOR_META: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta[^>]*name=["']generator["'][^>]*content=["'][^"']*(?:React|Next\.js)"#)
        .expect("GENERATOR_META regex")
});

/// Score raw HTML and report whether JavaScript execution is required.
pub fn detect_spa(html: &str) -> DetectionReport {
    let mut signals: Vec<(i32, &str)> = Vec::new();
    let html_len = html.len();

    if EMPTY_ROOT_DIV.is_match(html) {
        signals.push((4, "React root div (empty)"));
    }
    if EMPTY_APP_DIV.is_match(html) {
        signals.push((4, "App mount div (empty)"));
    }
    if NEXT_DIV.is_match(html) {
        signals.push((3, "Next.js root div"));
    }
    if APP_ROOT.is_match(html) {
        signals.push((4, "Angular app-root"));
    }
    if html.contains("data-reactroot") {
        signals.push((3, "React hydration attribute"));
    }
    if html.contains("data-vue-app") {
        signals.push((4, "Vue app attribute"));
    }
    if html.contains("ng-version=") {
        signals.push((3, "Angular version attribute"));
    }
    if html.contains("__nuxt") {
        signals.push((2, "Nuxt marker"));
    }
    if html.contains("window.__NEXT_DATA__") {
        signals.push((3, "Next.js data payload"));
    }
    if html.contains("window.__INITIAL_STATE__") {
        signals.push((2, "Serialized initial state"));
    }
    if html.contains("svelte-") {
        signals.push((2, "Svelte class prefix"));
    }
    if html.contains("ember-application") {
        signals.push((3, "Ember application class"));
    }

    let ratio = text_ratio(html);
    if ratio < 0.05 && html_len > 5 * 1024 {
        signals.push((4, "Very low text-to-HTML ratio"));
    } else if ratio < 0.10 && html_len > 10 * 1024 {
        signals.push((2, "Low text-to-HTML ratio"));
    }

    if html_len > 0 && script_bytes(html) as f64 / html_len as f64 > 0.50 {
        signals.push((2, "Script-heavy page"));
    }

    if LOADING_MARKER.find_iter(html).count() >= 2 {
        signals.push((2, "Loading placeholders present"));
    }

    if !HEADING_TAG.is_match(html)
        && substantial_paragraphs(html) < 3
        && html_len > 20 * 1024
    {
        signals.push((3, "No server-rendered content structure"));
    }

    if GENERATOR_META.is_match(html) {
        signals.push((2, "Generator meta mentions React/Next.js"));
    }

    if html.contains("application/ld+json") && ratio > 0.15 {
        signals.push((-2, "Structured data with real text content"));
    }

    let score: i32 = signals.iter().map(|(w, _)| w).sum();
    let reasons = signals.iter().map(|(_, r)| r.to_string()).collect();

    let confidence = if score >= HIGH_CONFIDENCE {
        Confidence::High
    } else if score >= SPA_THRESHOLD {
        Confidence::Medium
    } else {
        Confidence::Low
    };

    DetectionReport {
        is_spa: score >= SPA_THRESHOLD,
        score,
        confidence,
        reasons,
    }
}

/// Visible-text bytes over total bytes, with scripts, styles, and tags
/// removed from the numerator.
fn text_ratio(html: &str) -> f64 {
    if html.is_empty() {
        return 0.0;
    }
    let without_scripts = SCRIPT_BLOCK.replace_all(html, "");
    let without_styles = STYLE_BLOCK.replace_all(&without_scripts, "");
    let text = ANY_TAG.replace_all(&without_styles, "");
    let visible = text.split_whitespace().collect::<Vec<_>>().join(" ");
    visible.len() as f64 / html.len() as f64
}

fn script_bytes(html: &str) -> usize {
    SCRIPT_BLOCK.find_iter(html).map(|m| m.len()).sum()
}

/// `<p>` elements whose inner text is at least 20 non-tag characters.
fn substantial_paragraphs(html: &str) -> usize {
    PARAGRAPH
        .captures_iter(html)
        .filter(|caps| {
            let inner = ANY_TAG.replace_all(&caps[1], "");
            inner.trim().len() >= 20
        })
        .count()
}
