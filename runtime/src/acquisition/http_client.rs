//! HTTP client for fetching raw page HTML.

use crate::error::{RenderError, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::time::Duration;
use tracing::debug;

/// User agent sent on lite-path fetches.
pub const LITE_USER_AGENT: &str = "AgentWeb/0.2 (AI Agent Renderer)";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml";
const ACCEPT_LANG: &str = "en-US,en;q=0.9";

/// A fetched document with its response metadata.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

/// Thin wrapper around `reqwest::Client` with the render-pipeline headers.
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build a client that follows redirects and sends the standard headers.
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(LITE_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANG));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| RenderError::Fetch(e.to_string()))?;

        Ok(Self { client })
    }

    /// GET a URL and return its body with response metadata.
    ///
    /// The whole request, redirects and body read included, must finish
    /// within `timeout_ms`; the in-flight request is aborted otherwise.
    /// Non-2xx responses fail with `FetchStatus`.
    pub async fn fetch(&self, url: &str, timeout_ms: u64) -> Result<FetchedPage> {
        debug!("fetching {url} (timeout {timeout_ms}ms)");

        let request = async {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(map_transport_error)?;

            let status = response.status().as_u16();
            let final_url = response.url().to_string();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string();

            if !response.status().is_success() {
                return Err(RenderError::FetchStatus { status });
            }

            let body = response.text().await.map_err(map_transport_error)?;

            Ok(FetchedPage {
                url: final_url,
                status,
                content_type,
                body,
            })
        };

        match tokio::time::timeout(Duration::from_millis(timeout_ms), request).await {
            Ok(result) => result,
            Err(_) => Err(RenderError::Timeout(timeout_ms)),
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> RenderError {
    if e.is_timeout() {
        RenderError::Timeout(0)
    } else {
        RenderError::Fetch(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds() {
        assert!(HttpClient::new().is_ok());
    }

    #[test]
    fn test_user_agent_string() {
        assert_eq!(LITE_USER_AGENT, "AgentWeb/0.2 (AI Agent Renderer)");
    }

    #[tokio::test]
    async fn test_fetch_rejects_unresolvable_host() {
        let client = HttpClient::new().unwrap();
        let err = client
            .fetch("http://nonexistent.invalid/", 2_000)
            .await
            .unwrap_err();
        // DNS failure or timeout depending on the resolver, never a panic.
        assert!(matches!(
            err,
            RenderError::Fetch(_) | RenderError::Timeout(_)
        ));
    }
}
