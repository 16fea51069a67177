//! Renderer abstraction for browser-based page rendering.
//!
//! `Renderer` and `RenderContext` keep the browser engine opaque to the rest
//! of the pipeline (currently Chromium over CDP). The engine only ever asks
//! for a context, navigates it, evaluates one extraction script, and closes
//! it.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// User agent sent by browser contexts.
pub const BROWSER_USER_AGENT: &str = "AgentWeb/0.2 (ai-agent-browser)";

/// Viewport applied to every context.
pub const VIEWPORT_WIDTH: u32 = 1280;
pub const VIEWPORT_HEIGHT: u32 = 900;

/// Options applied when a context is created.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    /// Abort requests for image, media, and font resources.
    pub block_media: bool,
    /// Navigation wait condition, e.g. "networkidle" or "load".
    pub wait_until: String,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            block_media: true,
            wait_until: "networkidle".to_string(),
        }
    }
}

/// Result of navigating a context to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// HTTP status of the main document response.
    pub status: u16,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A browser engine that can create rendering contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Create a new browser context (tab).
    async fn new_context(&self, opts: &ContextOptions) -> Result<Box<dyn RenderContext>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
    /// Number of currently active contexts.
    fn active_contexts(&self) -> usize;
}

/// A single browser context (tab) for rendering pages.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Navigate to a URL. `timeout_ms` bounds the driver's own wait.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Execute JavaScript in the page and return the result as JSON.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Close this context.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A renderer used when no browser is available.
///
/// Context creation always fails, which sends every browser-path render
/// down the lite fallback.
pub struct NoopRenderer;

#[async_trait]
impl Renderer for NoopRenderer {
    async fn new_context(&self, _opts: &ContextOptions) -> Result<Box<dyn RenderContext>> {
        Err(anyhow::anyhow!("browser not available"))
    }
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
    fn active_contexts(&self) -> usize {
        0
    }
}
