// src/page.rs
//! The live page the in-page side works against.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// A control located on the page: its position among the elements matching
/// the control selector, in document order, plus its label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRef {
    pub index: usize,
    pub label: String,
}

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Address of the page, used as the source URL in exports.
    fn url(&self) -> &str;

    /// The current rendered markup.
    async fn snapshot(&self) -> Result<String>;

    async fn click(&self, control: &ControlRef) -> Result<()>;
}

/// Markup that cannot change: an HTML string, a saved file or a fetched URL.
/// Clicks are recorded so callers can see what would have been activated.
pub struct StaticPage {
    url: String,
    html: String,
    clicks: Mutex<Vec<ControlRef>>,
}

impl StaticPage {
    pub fn from_html(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            clicks: Mutex::new(Vec::new()),
        }
    }

    pub async fn from_file(path: &Path, url: Option<String>) -> Result<Self> {
        let html = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read page: {}", path.display()))?;
        let url = url.unwrap_or_else(|| format!("file://{}", path.display()));
        Ok(Self::from_html(url, html))
    }

    pub async fn fetch(url: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        info!("Fetching profile page: {}", url);

        let response = client
            .get(url)
            .send()
            .await
            .context("Failed to fetch profile page")?;

        if !response.status().is_success() {
            anyhow::bail!("HTTP error: {}", response.status());
        }

        let html = response
            .text()
            .await
            .context("Failed to read response body")?;
        Ok(Self::from_html(url, html))
    }

    pub fn clicks(&self) -> Vec<ControlRef> {
        self.clicks
            .lock()
            .map(|clicks| clicks.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PageDriver for StaticPage {
    fn url(&self) -> &str {
        &self.url
    }

    async fn snapshot(&self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn click(&self, control: &ControlRef) -> Result<()> {
        self.clicks
            .lock()
            .map_err(|_| anyhow::anyhow!("click log poisoned"))?
            .push(control.clone());
        Ok(())
    }
}
