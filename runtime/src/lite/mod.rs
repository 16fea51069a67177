//! Scriptless renderer: one HTTP fetch plus regex field extraction.
//!
//! Fast path for server-rendered pages. The orchestrator hands in a
//! pre-fetched document when it already pulled the HTML for SPA detection,
//! so a lite render never fetches twice.

pub mod extract;

use crate::acquisition::{FetchedPage, HttpClient};
use crate::error::Result;
use crate::types::{Backend, PageRecord, PageStats};
use tracing::debug;

/// Default deadline for the lite-path fetch.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

/// Options for a lite render.
pub struct LiteOptions {
    pub timeout_ms: u64,
    /// Already-fetched document; suppresses the network request.
    pub pre_fetched: Option<FetchedPage>,
}

impl Default for LiteOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            pre_fetched: None,
        }
    }
}

/// Fetch (unless pre-fetched) and parse a page into a `PageRecord`.
pub async fn render_lite(client: &HttpClient, url: &str, opts: LiteOptions) -> Result<PageRecord> {
    let fetched = match opts.pre_fetched {
        Some(page) => page,
        None => client.fetch(url, opts.timeout_ms).await?,
    };
    Ok(parse_page(&fetched, Backend::Lite))
}

/// Parse an already-fetched document. Infallible: extractors under-extract
/// on malformed markup instead of erroring.
pub fn parse_page(fetched: &FetchedPage, backend: Backend) -> PageRecord {
    let html = &fetched.body;
    let base = &fetched.url;

    let headings = extract::extract_headings(html);
    let links = extract::extract_links(html, base);
    let forms = extract::extract_forms(html);
    let images = extract::extract_images(html, base);
    let tables = extract::extract_tables(html);
    let text_content = extract::extract_text(html, extract::LITE_TEXT_CAP);

    debug!(
        "lite parse of {base}: {} headings, {} links, {} forms",
        headings.len(),
        links.len(),
        forms.len()
    );

    let mut record = PageRecord {
        url: base.clone(),
        title: extract::extract_title(html),
        meta: extract::extract_meta(html),
        headings,
        links,
        forms,
        images,
        tables,
        text_content,
        stats: PageStats::default(),
        http_status: fetched.status,
        content_type: fetched.content_type.clone(),
        backend,
    };
    record.refresh_stats();
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetched(body: &str) -> FetchedPage {
        FetchedPage {
            url: "https://example.com/page".to_string(),
            status: 200,
            content_type: "text/html; charset=utf-8".to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_parse_page_stats_match_lengths() {
        let html = r#"
            <html><head><title>T</title></head><body>
            <h1>Heading</h1>
            <a href="/x">X</a><a href="/y">Y</a>
            <form action="/f"><input name="a"></form>
            <img src="/i.png" alt="">
            <table><tr><td>c</td></tr></table>
            <main>Body text</main>
            </body></html>
        "#;
        let record = parse_page(&fetched(html), Backend::Lite);
        assert_eq!(record.stats.heading_count, record.headings.len());
        assert_eq!(record.stats.link_count, record.links.len());
        assert_eq!(record.stats.form_count, record.forms.len());
        assert_eq!(record.stats.image_count, record.images.len());
        assert_eq!(record.stats.table_count, record.tables.len());
        assert_eq!(record.stats.text_length, record.text_content.len());
        assert_eq!(record.stats.link_count, 2);
    }

    #[test]
    fn test_parse_page_no_duplicate_hrefs() {
        let html = r#"
            <a href="/same">A</a><a href="/same">B</a><a href="/same#x">C</a>
        "#;
        let record = parse_page(&fetched(html), Backend::Lite);
        let mut hrefs: Vec<_> = record.links.iter().map(|l| l.href.clone()).collect();
        let before = hrefs.len();
        hrefs.dedup();
        assert_eq!(hrefs.len(), before);
    }

    #[test]
    fn test_parse_page_records_backend_and_status() {
        let record = parse_page(&fetched("<html></html>"), Backend::LiteFallback);
        assert_eq!(record.backend, Backend::LiteFallback);
        assert_eq!(record.http_status, 200);
        assert_eq!(record.url, "https://example.com/page");
    }

    #[tokio::test]
    async fn test_render_lite_uses_prefetched_html() {
        let client = HttpClient::new().unwrap();
        let opts = LiteOptions {
            pre_fetched: Some(fetched("<title>Cached</title>")),
            ..Default::default()
        };
        // URL is never fetched; the pre-fetched body wins.
        let record = render_lite(&client, "https://unreachable.invalid/", opts)
            .await
            .unwrap();
        assert_eq!(record.title, "Cached");
    }
}
