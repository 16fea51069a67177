//! Per-field regex extractors for the scriptless parse.
//!
//! Each extractor scans the raw HTML independently and tolerates malformed
//! markup by under-extracting. Nesting is never validated; a `<div>` block
//! ends at the first closing tag. Pages that lose content this way are the
//! browser path's job.

use crate::html::{decode_entities, parse_attributes, strip_tags};
use crate::types::{Form, FormField, Heading, Image, Link};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;
use url::Url;

/// Character cap for lite-path main text.
pub const LITE_TEXT_CAP: usize = 5_000;

const HEADING_TEXT_CAP: usize = 200;
const LINK_TEXT_CAP: usize = 120;
const MAX_IMAGES: usize = 50;
const MAX_TABLES: usize = 10;
const MAX_SELECT_OPTIONS: usize = 20;

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("TITLE regex"));
static META: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b([^>]*?)/?>").expect("META regex"));
static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<h([1-6])\b[^>]*>(.*?)</h[1-6]\s*>").expect("HEADING regex")
});
static ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a>").expect("ANCHOR regex"));
static FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<form\b([^>]*)>(.*?)</form>").expect("FORM regex"));
static FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<input\b([^>]*?)/?>|<textarea\b([^>]*?)>|<select\b([^>]*?)>(.*?)</select>",
    )
    .expect("FIELD regex")
});
static OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<option[^>]*>(.*?)</option>").expect("OPTION regex"));
static IMG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<img\b([^>]*?)/?>").expect("IMG regex"));
static TABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<table\b[^>]*>(.*?)</table>").expect("TABLE regex"));
static ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").expect("ROW regex"));
static CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<t[dh]\b[^>]*>(.*?)</t[dh]\s*>").expect("CELL regex"));
static MAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<main\b[^>]*>(.*?)</main>").expect("MAIN regex"));
static ARTICLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<article\b[^>]*>(.*?)</article>").expect("ARTICLE regex"));
static CONTENT_DIV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<div\b[^>]*(?:class|id)\s*=\s*["'][^"']*(?:content|main|article)[^"']*["'][^>]*>(.*?)</div>"#,
    )
    .expect("CONTENT_DIV regex")
});
static BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body>").expect("BODY regex"));
static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("SCRIPT regex"));
static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style>").expect("STYLE regex"));
static NAV_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<nav\b[^>]*>.*?</nav>").expect("NAV regex"));
static FOOTER_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<footer\b[^>]*>.*?</footer>").expect("FOOTER regex"));
static HEADER_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<header\b[^>]*>.*?</header>").expect("HEADER regex"));
static REQUIRED_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\brequired\b").expect("REQUIRED regex"));

/// Truncate to at most `max` characters, respecting char boundaries.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

fn clean_text(fragment: &str) -> String {
    decode_entities(&strip_tags(fragment))
}

/// Inner text of the first `<title>`.
pub fn extract_title(html: &str) -> String {
    TITLE
        .captures(html)
        .map(|c| clean_text(&c[1]))
        .unwrap_or_default()
}

/// Every `<meta>` carrying (`name` or `property`) plus `content`.
///
/// `name` keys are lowercased; `property` keys keep their case.
pub fn extract_meta(html: &str) -> BTreeMap<String, String> {
    let mut meta = BTreeMap::new();
    for caps in META.captures_iter(html) {
        let attrs = parse_attributes(&caps[1]);
        let Some(content) = attrs.get("content") else {
            continue;
        };
        let value = decode_entities(content);
        if let Some(name) = attrs.get("name") {
            meta.insert(name.to_ascii_lowercase(), value);
        } else if let Some(property) = attrs.get("property") {
            // parse_attributes lowercases keys, so recover the original
            // property casing from the raw attribute string.
            let key = original_property_case(&caps[1]).unwrap_or_else(|| property.clone());
            meta.insert(key, value);
        }
    }
    meta
}

static PROPERTY_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)property\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("PROPERTY regex")
});

fn original_property_case(attrs: &str) -> Option<String> {
    PROPERTY_VALUE
        .captures(attrs)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
}

/// Paired `<hN>…</hN>` headings in document order; empties dropped.
pub fn extract_headings(html: &str) -> Vec<Heading> {
    HEADING
        .captures_iter(html)
        .filter_map(|caps| {
            let level: u8 = caps[1].parse().ok()?;
            let text = clean_text(&caps[2]);
            if text.is_empty() {
                return None;
            }
            Some(Heading {
                level,
                text: truncate_chars(&text, HEADING_TEXT_CAP),
            })
        })
        .collect()
}

/// Anchor links, absolutized against the final URL and deduplicated.
///
/// `javascript:` targets, bare fragments, and empty-text anchors are dropped.
pub fn extract_links(html: &str, base_url: &str) -> Vec<Link> {
    let base = Url::parse(base_url).ok();
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for caps in ANCHOR.captures_iter(html) {
        let attrs = parse_attributes(&caps[1]);
        let Some(href) = attrs.get("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
            continue;
        }
        let text = clean_text(&caps[2]);
        if text.is_empty() {
            continue;
        }
        let Some(absolute) = absolutize(base.as_ref(), href) else {
            continue;
        };
        if !seen.insert(absolute.clone()) {
            continue;
        }
        links.push(Link {
            text: truncate_chars(&text, LINK_TEXT_CAP),
            href: absolute,
        });
    }
    links
}

fn absolutize(base: Option<&Url>, href: &str) -> Option<String> {
    match base {
        Some(base) => base.join(href).ok().map(|u| u.to_string()),
        None => Url::parse(href).ok().map(|u| u.to_string()),
    }
}

/// Forms with their input/textarea/select fields in document order.
pub fn extract_forms(html: &str) -> Vec<Form> {
    FORM.captures_iter(html)
        .map(|caps| {
            let attrs = parse_attributes(&caps[1]);
            let action = attrs.get("action").cloned().unwrap_or_default();
            let method = attrs
                .get("method")
                .map(|m| m.to_ascii_uppercase())
                .unwrap_or_else(|| "GET".to_string());
            Form {
                action,
                method,
                fields: extract_fields(&caps[2]),
            }
        })
        .collect()
}

fn extract_fields(form_body: &str) -> Vec<FormField> {
    let mut fields = Vec::new();
    for caps in FIELD.captures_iter(form_body) {
        if let Some(attrs_match) = caps.get(1) {
            // <input>
            let raw = attrs_match.as_str();
            let attrs = parse_attributes(raw);
            let input_type = attrs
                .get("type")
                .map(|t| t.to_ascii_lowercase())
                .unwrap_or_else(|| "text".to_string());
            if input_type == "hidden" {
                continue;
            }
            fields.push(FormField::Input {
                input_type,
                name: attrs.get("name").cloned().unwrap_or_default(),
                placeholder: attrs
                    .get("placeholder")
                    .map(|p| decode_entities(p))
                    .unwrap_or_default(),
                required: REQUIRED_ATTR.is_match(raw),
            });
        } else if let Some(attrs_match) = caps.get(2) {
            // <textarea>
            let raw = attrs_match.as_str();
            let attrs = parse_attributes(raw);
            fields.push(FormField::Textarea {
                name: attrs.get("name").cloned().unwrap_or_default(),
                placeholder: attrs
                    .get("placeholder")
                    .map(|p| decode_entities(p))
                    .unwrap_or_default(),
                required: REQUIRED_ATTR.is_match(raw),
            });
        } else if let Some(attrs_match) = caps.get(3) {
            // <select> with its option list
            let attrs = parse_attributes(attrs_match.as_str());
            let body = caps.get(4).map(|m| m.as_str()).unwrap_or("");
            let options = OPTION
                .captures_iter(body)
                .take(MAX_SELECT_OPTIONS)
                .map(|opt| clean_text(&opt[1]))
                .collect();
            fields.push(FormField::Select {
                name: attrs.get("name").cloned().unwrap_or_default(),
                options,
            });
        }
    }
    fields
}

/// Images with absolutized sources, capped at 50.
pub fn extract_images(html: &str, base_url: &str) -> Vec<Image> {
    let base = Url::parse(base_url).ok();
    IMG.captures_iter(html)
        .filter_map(|caps| {
            let attrs = parse_attributes(&caps[1]);
            let src = attrs.get("src")?;
            let absolute = absolutize(base.as_ref(), src)?;
            Some(Image {
                src: absolute,
                alt: attrs.get("alt").map(|a| decode_entities(a)).unwrap_or_default(),
                width: attrs.get("width").cloned(),
                height: attrs.get("height").cloned(),
            })
        })
        .take(MAX_IMAGES)
        .collect()
}

/// Tables as rows of cell texts, capped at 10 tables.
pub fn extract_tables(html: &str) -> Vec<Vec<Vec<String>>> {
    TABLE
        .captures_iter(html)
        .take(MAX_TABLES)
        .map(|table| {
            ROW.captures_iter(&table[1])
                .map(|row| CELL.captures_iter(&row[1]).map(|c| clean_text(&c[1])).collect())
                .collect()
        })
        .collect()
}

/// Main-content text, selected by the first match of:
/// `<main>`, `<article>`, a content-classed `<div>`, then the stripped body.
pub fn extract_text(html: &str, cap: usize) -> String {
    let fragment = MAIN
        .captures(html)
        .or_else(|| ARTICLE.captures(html))
        .or_else(|| CONTENT_DIV.captures(html))
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| stripped_body(html));

    let text = decode_entities(&strip_tags(&SCRIPT_BLOCK.replace_all(
        &STYLE_BLOCK.replace_all(&fragment, " "),
        " ",
    )));
    truncate_chars(&text, cap)
}

/// Body content with chrome elements removed.
fn stripped_body(html: &str) -> String {
    let body = BODY
        .captures(html)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| html.to_string());
    let body = SCRIPT_BLOCK.replace_all(&body, " ");
    let body = STYLE_BLOCK.replace_all(&body, " ");
    let body = NAV_BLOCK.replace_all(&body, " ");
    let body = FOOTER_BLOCK.replace_all(&body, " ");
    HEADER_BLOCK.replace_all(&body, " ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title() {
        let html = "<html><head><title>My &amp; Page</title></head></html>";
        assert_eq!(extract_title(html), "My & Page");
        assert_eq!(extract_title("<html></html>"), "");
    }

    #[test]
    fn test_extract_meta_name_and_property() {
        let html = r#"
            <meta name="Description" content="A page">
            <meta property="og:Title" content="OG">
            <meta charset="utf-8">
        "#;
        let meta = extract_meta(html);
        assert_eq!(meta.get("description").map(String::as_str), Some("A page"));
        assert_eq!(meta.get("og:Title").map(String::as_str), Some("OG"));
        assert_eq!(meta.len(), 2);
    }

    #[test]
    fn test_extract_headings_ordered() {
        let html = "<h2>Second level</h2><h1>Top</h1><h3></h3>";
        let headings = extract_headings(html);
        assert_eq!(headings.len(), 2);
        assert_eq!(headings[0].level, 2);
        assert_eq!(headings[0].text, "Second level");
        assert_eq!(headings[1].level, 1);
    }

    #[test]
    fn test_heading_text_truncated() {
        let long = "x".repeat(400);
        let html = format!("<h1>{long}</h1>");
        let headings = extract_headings(&html);
        assert_eq!(headings[0].text.chars().count(), 200);
    }

    #[test]
    fn test_extract_links_absolutize_and_dedupe() {
        let html = r##"
            <a href="/a">One</a>
            <a href="https://example.com/a">One again</a>
            <a href="#section">Frag</a>
            <a href="javascript:void(0)">JS</a>
            <a href="/b"></a>
            <a href="b/c">Rel</a>
        "##;
        let links = extract_links(html, "https://example.com/page");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].href, "https://example.com/a");
        assert_eq!(links[1].href, "https://example.com/b/c");
    }

    #[test]
    fn test_extract_forms_fields_in_order() {
        let html = r#"
            <form action="/search" method="post">
                <input type="text" name="q" placeholder="Query" required>
                <input type="hidden" name="csrf" value="tok">
                <select name="lang"><option>en</option><option>de</option></select>
                <textarea name="notes" placeholder="Notes"></textarea>
            </form>
        "#;
        let forms = extract_forms(html);
        assert_eq!(forms.len(), 1);
        let form = &forms[0];
        assert_eq!(form.action, "/search");
        assert_eq!(form.method, "POST");
        assert_eq!(form.fields.len(), 3); // hidden excluded

        match &form.fields[0] {
            FormField::Input {
                input_type,
                name,
                required,
                ..
            } => {
                assert_eq!(input_type, "text");
                assert_eq!(name, "q");
                assert!(required);
            }
            other => panic!("expected input, got {other:?}"),
        }
        match &form.fields[1] {
            FormField::Select { name, options } => {
                assert_eq!(name, "lang");
                assert_eq!(options, &vec!["en".to_string(), "de".to_string()]);
            }
            other => panic!("expected select, got {other:?}"),
        }
        match &form.fields[2] {
            FormField::Textarea { name, required, .. } => {
                assert_eq!(name, "notes");
                assert!(!required);
            }
            other => panic!("expected textarea, got {other:?}"),
        }
    }

    #[test]
    fn test_form_method_defaults_to_get() {
        let forms = extract_forms(r#"<form action="/go"><input name="x"></form>"#);
        assert_eq!(forms[0].method, "GET");
    }

    #[test]
    fn test_select_options_capped_at_20() {
        let options: String = (0..30).map(|i| format!("<option>{i}</option>")).collect();
        let html = format!(r#"<form><select name="n">{options}</select></form>"#);
        let forms = extract_forms(&html);
        match &forms[0].fields[0] {
            FormField::Select { options, .. } => assert_eq!(options.len(), 20),
            other => panic!("expected select, got {other:?}"),
        }
    }

    #[test]
    fn test_extract_images_capped() {
        let imgs: String = (0..60)
            .map(|i| format!(r#"<img src="/i{i}.png" alt="pic {i}">"#))
            .collect();
        let images = extract_images(&imgs, "https://example.com/");
        assert_eq!(images.len(), 50);
        assert_eq!(images[0].src, "https://example.com/i0.png");
        assert_eq!(images[0].alt, "pic 0");
    }

    #[test]
    fn test_extract_tables() {
        let html = r#"
            <table><tr><th>K</th><th>V</th></tr><tr><td>a</td><td>1</td></tr></table>
        "#;
        let tables = extract_tables(html);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0][0], vec!["K", "V"]);
        assert_eq!(tables[0][1], vec!["a", "1"]);
    }

    #[test]
    fn test_text_prefers_main_over_body() {
        let html = r#"
            <body>
            <nav>Menu Menu</nav>
            <main><p>Real content here.</p></main>
            <footer>Footer stuff</footer>
            </body>
        "#;
        let text = extract_text(html, LITE_TEXT_CAP);
        assert_eq!(text, "Real content here.");
    }

    #[test]
    fn test_text_falls_back_to_content_div() {
        let html = r#"<body><div class="site-content"><p>Div text</p></div></body>"#;
        assert_eq!(extract_text(html, LITE_TEXT_CAP), "Div text");
    }

    #[test]
    fn test_text_body_fallback_strips_chrome() {
        let html = r#"
            <body>
            <header>Site header</header>
            <nav>Nav links</nav>
            <p>Body paragraph.</p>
            <script>var x = 1;</script>
            <footer>(c) footer</footer>
            </body>
        "#;
        let text = extract_text(html, LITE_TEXT_CAP);
        assert_eq!(text, "Body paragraph.");
    }

    #[test]
    fn test_text_cap_applies() {
        let body = format!("<body><main>{}</main></body>", "word ".repeat(3_000));
        let text = extract_text(&body, LITE_TEXT_CAP);
        assert_eq!(text.chars().count(), LITE_TEXT_CAP);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab", 5), "ab");
    }
}
