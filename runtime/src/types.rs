//! Core record types shared across the render pipeline.
//!
//! Serialized field names keep the camelCase wire format so cache entries
//! written by earlier deployments deserialize unchanged.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which rendering path produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Backend {
    /// Scriptless HTTP fetch + regex parse.
    #[serde(rename = "lite")]
    Lite,
    /// Headless browser render. Tag kept as "playwright" on the wire.
    #[serde(rename = "playwright")]
    Playwright,
    /// Browser path failed; lite parse of the already-fetched HTML.
    #[serde(rename = "lite-fallback")]
    LiteFallback,
    /// The render call itself failed.
    #[serde(rename = "error")]
    Error,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Lite => "lite",
            Backend::Playwright => "playwright",
            Backend::LiteFallback => "lite-fallback",
            Backend::Error => "error",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One document heading, levels 1 through 6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// One hyperlink with its visible text and absolutized target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub text: String,
    pub href: String,
}

/// One form field. The `kind` discriminant mirrors the source tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FormField {
    Input {
        #[serde(rename = "type")]
        input_type: String,
        name: String,
        placeholder: String,
        required: bool,
    },
    Textarea {
        name: String,
        placeholder: String,
        required: bool,
    },
    Select {
        name: String,
        /// First 20 option texts at most.
        options: Vec<String>,
    },
}

/// One form with its fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Form {
    pub action: String,
    /// Uppercased; "GET" when the attribute is absent.
    pub method: String,
    pub fields: Vec<FormField>,
}

/// One image reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub src: String,
    pub alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
}

/// Element counts for a page. Each count equals the length of the
/// corresponding `PageRecord` vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageStats {
    pub heading_count: usize,
    pub link_count: usize,
    pub form_count: usize,
    pub image_count: usize,
    pub table_count: usize,
    pub text_length: usize,
}

/// Normalized representation of one rendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRecord {
    /// Final URL after redirects.
    pub url: String,
    pub title: String,
    /// Meta tags; `name=` keys lowercased, `property=` keys preserved.
    pub meta: BTreeMap<String, String>,
    pub headings: Vec<Heading>,
    pub links: Vec<Link>,
    pub forms: Vec<Form>,
    pub images: Vec<Image>,
    /// Rows of cell strings, one entry per table. At most 10 tables.
    pub tables: Vec<Vec<Vec<String>>>,
    pub text_content: String,
    pub stats: PageStats,
    pub http_status: u16,
    pub content_type: String,
    #[serde(rename = "backendTag")]
    pub backend: Backend,
}

impl PageRecord {
    /// Recompute `stats` from the current vector lengths.
    pub fn refresh_stats(&mut self) {
        self.stats = PageStats {
            heading_count: self.headings.len(),
            link_count: self.links.len(),
            form_count: self.forms.len(),
            image_count: self.images.len(),
            table_count: self.tables.len(),
            text_length: self.text_content.len(),
        };
    }
}

/// How confident the SPA detector is in its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Verdict from scoring raw HTML for client-side rendering signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionReport {
    pub is_spa: bool,
    pub score: i32,
    pub confidence: Confidence,
    /// Human-readable description of each signal that fired, in scan order.
    pub reasons: Vec<String>,
}

/// Category of a semantic chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkType {
    Summary,
    Toc,
    Paragraph,
    Heading,
    ListItem,
    Callout,
    TableCell,
    Label,
    Link,
    Code,
    Form,
    Links,
}

impl ChunkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkType::Summary => "summary",
            ChunkType::Toc => "toc",
            ChunkType::Paragraph => "paragraph",
            ChunkType::Heading => "heading",
            ChunkType::ListItem => "list-item",
            ChunkType::Callout => "callout",
            ChunkType::TableCell => "table-cell",
            ChunkType::Label => "label",
            ChunkType::Link => "link",
            ChunkType::Code => "code",
            ChunkType::Form => "form",
            ChunkType::Links => "links",
        }
    }
}

/// One scored, typed fragment derived from a `PageRecord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique within a page; assigned in emission order.
    pub id: u32,
    #[serde(rename = "type")]
    pub chunk_type: ChunkType,
    /// Heading the chunk sits under, when known.
    pub section: Option<String>,
    pub text: String,
    pub score: i32,
    /// Added by query ranking; absent otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<i32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, serde_json::Value>,
}

/// Final product of one render call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderResult {
    pub url: String,
    pub backend: Backend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection: Option<DetectionReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PageRecord>,
    pub chunks: Vec<Chunk>,
    pub summary: String,
    /// Elapsed wall-clock milliseconds for this call.
    pub ms: u64,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl RenderResult {
    /// Build an error-backend result for a failed call.
    pub fn failed(url: &str, err: &crate::error::RenderError, ms: u64) -> Self {
        Self {
            url: url.to_string(),
            backend: Backend::Error,
            detection: None,
            data: None,
            chunks: Vec::new(),
            summary: String::new(),
            ms,
            cached: false,
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
        }
    }
}
