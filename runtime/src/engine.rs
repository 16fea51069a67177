//! Render orchestration: cache lookup, fetch, detection, backend dispatch,
//! chunking, and cache store behind one entry point.
//!
//! One raw fetch feeds both the SPA detector and the lite parse. The browser
//! path drives its own navigation; when it fails, the already-fetched HTML
//! goes through the lite parser instead and the result is tagged
//! `lite-fallback`.

use crate::acquisition::{FetchedPage, HttpClient};
use crate::browser::{render_browser, BrowserOptions};
use crate::cache::{CacheConfig, CacheStats, RenderCache};
use crate::chunk::{chunk_page, find_relevant, render_chunks, ChunkOptions};
use crate::detect::detect_spa;
use crate::error::{RenderError, Result};
use crate::lite;
use crate::renderer::{NoopRenderer, Renderer};
use crate::types::{Backend, RenderResult};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Default number of chunks returned per render.
pub const DEFAULT_CHUNK_LIMIT: usize = 8;
/// Default per-call deadline.
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

const BROWSER_TTL_MS: u64 = 5 * 60 * 1_000;
const LITE_TTL_MS: u64 = 10 * 60 * 1_000;
const DEGRADED_SUMMARY_CAP: usize = 2_000;

/// Options for one render call.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Override detection: `Backend::Lite` or `Backend::Playwright`.
    pub force: Option<Backend>,
    /// Free-text query used to cache-partition and re-rank chunks.
    pub query: Option<String>,
    pub chunk_limit: usize,
    pub timeout_ms: u64,
    pub verbose: bool,
    pub no_cache: bool,
    /// Per-call TTL override for the cached result.
    pub cache_ttl_ms: Option<u64>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            force: None,
            query: None,
            chunk_limit: DEFAULT_CHUNK_LIMIT,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            verbose: false,
            no_cache: false,
            cache_ttl_ms: None,
        }
    }
}

enum CacheState {
    Unopened,
    Open(RenderCache),
    Unavailable,
}

/// The render pipeline: one shared HTTP client, one browser engine, one
/// process-wide cache opened lazily on first use.
pub struct RenderEngine {
    http: HttpClient,
    renderer: Arc<dyn Renderer>,
    cache_config: CacheConfig,
    cache: Mutex<CacheState>,
}

impl RenderEngine {
    /// Engine without a browser: SPA pages degrade to the lite fallback.
    pub fn new(cache_config: CacheConfig) -> Result<Self> {
        Self::with_renderer(Arc::new(NoopRenderer), cache_config)
    }

    /// Engine backed by the given browser renderer.
    pub fn with_renderer(renderer: Arc<dyn Renderer>, cache_config: CacheConfig) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new()?,
            renderer,
            cache_config,
            cache: Mutex::new(CacheState::Unopened),
        })
    }

    /// Render a URL into chunks and a summary.
    ///
    /// Fetch and parse failures come back as `backend = "error"` results
    /// rather than `Err`; cache trouble only downgrades the call to
    /// uncached.
    pub async fn render(&self, url: &str, opts: RenderOptions) -> RenderResult {
        let started = Instant::now();

        if let Some(hit) = self.cached_result(url, &opts, started).await {
            return hit;
        }

        let fetched = match self.http.fetch(url, opts.timeout_ms).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!("fetch of {url} failed: {e}");
                return RenderResult::failed(url, &e, elapsed_ms(started));
            }
        };

        self.render_fetched(url, fetched, &opts, started).await
    }

    /// Current cache statistics.
    pub async fn cache_stats(&self) -> Result<CacheStats> {
        self.cache_op(|cache| cache.stats()).await
    }

    /// Drop every cached entry for a URL. Returns how many were removed.
    pub async fn invalidate_cache(&self, url: &str) -> Result<usize> {
        self.cache_op(|cache| cache.invalidate(url)).await
    }

    /// Drop every expired entry. Returns how many were removed.
    pub async fn purge_expired(&self) -> Result<usize> {
        self.cache_op(|cache| cache.purge_expired()).await
    }

    /// Close the cache. Later calls run uncached.
    pub async fn close(&self) {
        let mut state = self.cache.lock().await;
        if let CacheState::Open(cache) = &mut *state {
            cache.close();
        }
        *state = CacheState::Unavailable;
    }

    async fn cached_result(
        &self,
        url: &str,
        opts: &RenderOptions,
        started: Instant,
    ) -> Option<RenderResult> {
        if opts.no_cache || opts.force.is_some() {
            return None;
        }
        let key = opts.query.as_deref().unwrap_or("");
        match self.cache_op(|cache| cache.get(url, key)).await {
            Ok(Some(mut hit)) => {
                if opts.verbose {
                    info!("cache hit for {url}");
                }
                hit.cached = true;
                hit.ms = elapsed_ms(started);
                Some(hit)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("cache read failed, continuing uncached: {e}");
                None
            }
        }
    }

    async fn render_fetched(
        &self,
        url: &str,
        fetched: FetchedPage,
        opts: &RenderOptions,
        started: Instant,
    ) -> RenderResult {
        let detection = detect_spa(&fetched.body);
        let backend = opts.force.unwrap_or(if detection.is_spa {
            Backend::Playwright
        } else {
            Backend::Lite
        });
        debug!(
            "rendering {url} via {backend} (spa score {}, {})",
            detection.score,
            if opts.force.is_some() {
                "forced"
            } else {
                "detected"
            }
        );

        let record = match backend {
            Backend::Playwright => {
                let browser_opts = BrowserOptions {
                    timeout_ms: opts.timeout_ms,
                    ..Default::default()
                };
                match render_browser(self.renderer.as_ref(), url, &browser_opts).await {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("browser render of {url} failed ({e}), falling back to lite");
                        lite::parse_page(&fetched, Backend::LiteFallback)
                    }
                }
            }
            _ => lite::parse_page(&fetched, Backend::Lite),
        };

        let all_chunks = chunk_page(&record, &ChunkOptions::default());
        let chunks = match opts.query.as_deref() {
            Some(query) if !query.is_empty() => {
                find_relevant(&all_chunks, query, opts.chunk_limit)
            }
            _ => all_chunks.into_iter().take(opts.chunk_limit).collect(),
        };
        let summary = if chunks.is_empty() {
            crate::lite::extract::truncate_chars(&record.text_content, DEGRADED_SUMMARY_CAP)
        } else {
            render_chunks(&chunks)
        };

        let final_backend = record.backend;
        let result = RenderResult {
            url: url.to_string(),
            backend: final_backend,
            detection: Some(detection),
            data: Some(record),
            chunks,
            summary,
            ms: elapsed_ms(started),
            cached: false,
            error: None,
            error_kind: None,
        };

        if !opts.no_cache {
            let ttl = opts.cache_ttl_ms.unwrap_or(match final_backend {
                Backend::Playwright => BROWSER_TTL_MS,
                _ => LITE_TTL_MS,
            });
            let key = opts.query.as_deref().unwrap_or("");
            if let Err(e) = self
                .cache_op(|cache| cache.set(url, key, &result, Some(ttl)))
                .await
            {
                warn!("cache write failed, result returned uncached: {e}");
            }
        }

        result
    }

    /// Run one operation against the lazily-opened cache.
    async fn cache_op<T>(&self, op: impl FnOnce(&RenderCache) -> Result<T>) -> Result<T> {
        let mut state = self.cache.lock().await;
        if matches!(*state, CacheState::Unopened) {
            *state = match RenderCache::open(self.cache_config.clone()) {
                Ok(cache) => CacheState::Open(cache),
                Err(e) => {
                    warn!("cache unavailable: {e}");
                    CacheState::Unavailable
                }
            };
        }
        match &*state {
            CacheState::Open(cache) => op(cache),
            _ => Err(RenderError::CacheIo("cache unavailable".to_string())),
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
