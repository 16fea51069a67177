//! Browser-path rendering: navigate a context and extract in-page.
//!
//! Produces the same `PageRecord` shape as the lite path, with the live-DOM
//! rule differences: links keep document order without dedup (capped at
//! 100), text runs to 50,000 chars, and meta keys keep their original case.

use crate::error::{RenderError, Result};
use crate::lite::extract::truncate_chars;
use crate::renderer::{ContextOptions, RenderContext, Renderer};
use crate::types::{Backend, Form, Heading, Image, Link, PageRecord, PageStats};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Character cap for browser-path main text.
pub const BROWSER_TEXT_CAP: usize = 50_000;

/// Default deadline for browser navigation.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

const TEXT_WAIT_MS: u64 = 5_000;
const TEXT_POLL_MS: u64 = 250;
const MIN_VISIBLE_TEXT: u64 = 200;

/// Options for a browser render.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub timeout_ms: u64,
    pub wait_until: String,
    pub block_media: bool,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            wait_until: "networkidle".to_string(),
            block_media: true,
        }
    }
}

/// Shape returned by the in-page extraction script.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractedPage {
    title: String,
    meta: BTreeMap<String, String>,
    headings: Vec<Heading>,
    links: Vec<Link>,
    forms: Vec<Form>,
    images: Vec<Image>,
    tables: Vec<Vec<Vec<String>>>,
    text: String,
    content_type: String,
}

/// Render a page in a browser context and map it to a `PageRecord`.
///
/// The context is closed on every exit path.
pub async fn render_browser(
    renderer: &dyn Renderer,
    url: &str,
    opts: &BrowserOptions,
) -> Result<PageRecord> {
    let ctx_opts = ContextOptions {
        block_media: opts.block_media,
        wait_until: opts.wait_until.clone(),
    };
    let mut context = renderer
        .new_context(&ctx_opts)
        .await
        .map_err(|e| RenderError::BrowserUnavailable(e.to_string()))?;

    let outcome = drive(context.as_mut(), url, opts).await;

    if let Err(e) = context.close().await {
        warn!("browser context close failed: {e}");
    }
    outcome
}

async fn drive(
    context: &mut dyn RenderContext,
    url: &str,
    opts: &BrowserOptions,
) -> Result<PageRecord> {
    let nav = tokio::time::timeout(
        Duration::from_millis(opts.timeout_ms),
        context.navigate(url, opts.timeout_ms),
    )
    .await
    .map_err(|_| RenderError::Timeout(opts.timeout_ms))?
    .map_err(|e| {
        let msg = e.to_string();
        if msg.contains("timed out") {
            RenderError::Timeout(opts.timeout_ms)
        } else {
            RenderError::BrowserNavigation(msg)
        }
    })?;

    debug!(
        "navigated to {} (status {}, {}ms)",
        nav.final_url, nav.status, nav.load_time_ms
    );

    wait_for_text(context).await;

    let value = context
        .execute_js(EXTRACT_SCRIPT)
        .await
        .map_err(|e| RenderError::BrowserNavigation(e.to_string()))?;
    let extracted: ExtractedPage = serde_json::from_value(value)
        .map_err(|e| RenderError::BrowserNavigation(format!("extraction result: {e}")))?;

    let mut record = PageRecord {
        url: nav.final_url,
        title: extracted.title,
        meta: extracted.meta,
        headings: extracted.headings,
        links: extracted.links,
        forms: extracted.forms,
        images: extracted.images,
        tables: extracted.tables,
        text_content: truncate_chars(&extracted.text, BROWSER_TEXT_CAP),
        stats: PageStats::default(),
        http_status: nav.status,
        content_type: extracted.content_type,
        backend: Backend::Playwright,
    };
    record.refresh_stats();
    Ok(record)
}

/// Wait up to 5 s for the live document to show more than 200 characters of
/// visible text. Timing out here is benign; hydration may simply be slow.
async fn wait_for_text(context: &dyn RenderContext) {
    let deadline = Instant::now() + Duration::from_millis(TEXT_WAIT_MS);
    while Instant::now() < deadline {
        let length = context
            .execute_js("document.body ? document.body.innerText.length : 0")
            .await
            .ok()
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        if length > MIN_VISIBLE_TEXT {
            return;
        }
        tokio::time::sleep(Duration::from_millis(TEXT_POLL_MS)).await;
    }
    debug!("visible-text wait expired");
}

/// One-shot extraction script. Runs in the page, returns the record shape
/// `ExtractedPage` deserializes.
const EXTRACT_SCRIPT: &str = r#"
(() => {
  const clip = (s, n) => {
    s = s || '';
    return s.length > n ? s.slice(0, n) : s;
  };
  const rec = {
    title: document.title || '',
    meta: {},
    headings: [],
    links: [],
    forms: [],
    images: [],
    tables: [],
    text: '',
    contentType: document.contentType || ''
  };

  for (const m of document.querySelectorAll('meta')) {
    const content = m.getAttribute('content');
    if (content === null) continue;
    const name = m.getAttribute('name');
    const prop = m.getAttribute('property');
    if (name) rec.meta[name] = content;
    else if (prop) rec.meta[prop] = content;
  }

  for (const h of document.querySelectorAll('h1,h2,h3,h4,h5,h6')) {
    const text = (h.innerText || '').trim();
    if (!text) continue;
    rec.headings.push({ level: parseInt(h.tagName[1], 10), text: clip(text, 200) });
  }

  for (const a of document.querySelectorAll('a[href]')) {
    if (rec.links.length >= 100) break;
    const raw = a.getAttribute('href') || '';
    if (!raw || raw.startsWith('#')) continue;
    const href = a.href || '';
    if (!href || href.startsWith('javascript:')) continue;
    const text = (a.innerText || '').trim();
    if (!text) continue;
    rec.links.push({ text: clip(text, 120), href });
  }

  for (const f of document.querySelectorAll('form')) {
    const fields = [];
    for (const el of f.querySelectorAll('input, textarea, select')) {
      const tag = el.tagName.toLowerCase();
      if (tag === 'input') {
        const type = (el.getAttribute('type') || 'text').toLowerCase();
        if (type === 'hidden') continue;
        fields.push({
          kind: 'input',
          type,
          name: el.name || '',
          placeholder: el.getAttribute('placeholder') || '',
          required: el.required === true
        });
      } else if (tag === 'textarea') {
        fields.push({
          kind: 'textarea',
          name: el.name || '',
          placeholder: el.getAttribute('placeholder') || '',
          required: el.required === true
        });
      } else {
        const options = [];
        for (const o of el.querySelectorAll('option')) {
          if (options.length >= 20) break;
          options.push((o.innerText || '').trim());
        }
        fields.push({ kind: 'select', name: el.name || '', options });
      }
    }
    rec.forms.push({
      action: f.getAttribute('action') || '',
      method: (f.getAttribute('method') || 'GET').toUpperCase(),
      fields
    });
  }

  for (const img of document.querySelectorAll('img[src]')) {
    if (rec.images.length >= 50) break;
    rec.images.push({
      src: img.src || '',
      alt: img.getAttribute('alt') || '',
      width: img.getAttribute('width'),
      height: img.getAttribute('height')
    });
  }

  for (const t of document.querySelectorAll('table')) {
    if (rec.tables.length >= 10) break;
    const rows = [];
    for (const tr of t.querySelectorAll('tr')) {
      const cells = [];
      for (const c of tr.querySelectorAll('td, th')) cells.push((c.innerText || '').trim());
      rows.push(cells);
    }
    rec.tables.push(rows);
  }

  const root =
    document.querySelector('main') ||
    document.querySelector('article') ||
    document.querySelector(
      'div[class*=content], div[id*=content], div[class*=main], div[id*=main], div[class*=article], div[id*=article]'
    );
  if (root) {
    rec.text = root.innerText || '';
  } else if (document.body) {
    const clone = document.body.cloneNode(true);
    for (const el of clone.querySelectorAll('script, style, nav, footer, header')) el.remove();
    rec.text = clone.innerText || clone.textContent || '';
  }
  rec.text = clip(rec.text, 50000);

  return rec;
})()
"#;
