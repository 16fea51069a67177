//! Chromium implementation of the renderer traits via chromiumoxide (CDP).

use super::{
    ContextOptions, NavigationResult, RenderContext, Renderer, BROWSER_USER_AGENT,
    VIEWPORT_HEIGHT, VIEWPORT_WIDTH,
};
use anyhow::{anyhow, Context as _, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::SetBlockedUrLsParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// URL patterns aborted when media blocking is on.
const MEDIA_PATTERNS: &[&str] = &[
    "*.png", "*.jpg", "*.jpeg", "*.gif", "*.webp", "*.svg", "*.ico", "*.bmp", "*.mp4", "*.webm",
    "*.avi", "*.mov", "*.mp3", "*.wav", "*.ogg", "*.woff", "*.woff2", "*.ttf", "*.otf", "*.eot",
];

/// Chromium browser engine. One process, one context per render.
pub struct ChromiumRenderer {
    browser: Mutex<Browser>,
    active: Arc<AtomicUsize>,
    handler_task: tokio::task::JoinHandle<()>,
}

impl ChromiumRenderer {
    /// Launch a headless Chromium with the pipeline's viewport and flags.
    pub async fn launch() -> Result<Self> {
        let config = BrowserConfig::builder()
            .no_sandbox()
            .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .build()
            .map_err(|e| anyhow!("browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("launching headless Chromium")?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("browser handler: {e}");
                }
            }
        });

        Ok(Self {
            browser: Mutex::new(browser),
            active: Arc::new(AtomicUsize::new(0)),
            handler_task,
        })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self, opts: &ContextOptions) -> Result<Box<dyn RenderContext>> {
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .context("opening browser tab")?
        };

        page.set_user_agent(BROWSER_USER_AGENT)
            .await
            .context("setting user agent")?;

        if opts.block_media {
            let patterns = MEDIA_PATTERNS.iter().map(|p| p.to_string()).collect();
            if let Err(e) = page.execute(SetBlockedUrLsParams::new(patterns)).await {
                warn!("media blocking unavailable: {e}");
            }
        }

        self.active.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ChromiumContext {
            page,
            active: Arc::clone(&self.active),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.context("closing browser")?;
        self.handler_task.abort();
        Ok(())
    }

    fn active_contexts(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

/// One Chromium tab.
pub struct ChromiumContext {
    page: Page,
    active: Arc<AtomicUsize>,
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let started = Instant::now();

        let goto = self.page.goto(url);
        tokio::time::timeout(Duration::from_millis(timeout_ms), goto)
            .await
            .map_err(|_| anyhow!("navigation timed out after {timeout_ms}ms"))?
            .context("navigating")?;

        let status = self
            .page
            .wait_for_navigation_response()
            .await
            .ok()
            .flatten()
            .and_then(|req| req.response.as_ref().map(|r| r.status as u16))
            .unwrap_or(200);

        let final_url = self
            .page
            .url()
            .await
            .context("reading page url")?
            .unwrap_or_else(|| url.to_string());

        Ok(NavigationResult {
            final_url,
            status,
            load_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self.page.evaluate(script).await.context("evaluating script")?;
        Ok(result
            .into_value()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.page.close().await.context("closing tab")?;
        Ok(())
    }
}
