//! AgentWeb runtime: compact, structured web page representations for
//! agents.
//!
//! Raw HTML is too noisy for a model prompt, and a headless browser is too
//! slow to use on every page. This crate routes each request down the
//! cheapest path that works: a scriptless HTTP fetch with regex extraction
//! for server-rendered pages, and a Chromium render only when SPA detection
//! says the markup is an empty shell. Either way the page becomes a
//! normalized [`types::PageRecord`], scored semantic chunks, and a prompt
//! summary, cached on disk with per-entry TTLs.
//!
//! ```no_run
//! use agentweb::{CacheConfig, RenderEngine, RenderOptions};
//!
//! # async fn demo() -> agentweb::Result<()> {
//! let engine = RenderEngine::new(CacheConfig::default())?;
//! let result = engine
//!     .render("https://example.com/docs", RenderOptions {
//!         query: Some("install".to_string()),
//!         ..Default::default()
//!     })
//!     .await;
//! println!("{}", result.summary);
//! # Ok(())
//! # }
//! ```

pub mod acquisition;
pub mod browser;
pub mod cache;
pub mod chunk;
pub mod detect;
pub mod engine;
pub mod error;
pub mod html;
pub mod lite;
pub mod renderer;
pub mod types;

pub use cache::{CacheConfig, CacheStats};
pub use chunk::{chunk_page, find_relevant, ChunkOptions};
pub use detect::detect_spa;
pub use engine::{RenderEngine, RenderOptions};
pub use error::{RenderError, Result};
pub use renderer::{NoopRenderer, Renderer};
pub use types::{Backend, Chunk, ChunkType, DetectionReport, PageRecord, RenderResult};
