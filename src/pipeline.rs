// src/pipeline.rs
//! The popup's cycle: extract from the page, then score through the
//! background, one cycle at a time.

use crate::profile::ProfileRecord;
use crate::relay::{self, BackgroundWorker, PageAgent, RelayClient, RelayError, RelayRequest};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("A scoring cycle is already running")]
    Busy,
    #[error("{action} failed: {source}")]
    Channel {
        action: &'static str,
        #[source]
        source: RelayError,
    },
    #[error("{action} rejected: {message}")]
    Rejected {
        action: &'static str,
        message: String,
    },
    #[error("{action} succeeded without returning data")]
    MissingData { action: &'static str },
}

pub struct Pipeline {
    url: String,
    page: RelayClient,
    background: RelayClient,
    busy: AtomicBool,
}

/// Clears the busy flag when the cycle ends, however it ends.
struct CycleGuard<'a>(&'a AtomicBool);

impl<'a> CycleGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| CycleGuard(flag))
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Pipeline {
    pub fn new(url: impl Into<String>, page: RelayClient, background: RelayClient) -> Self {
        Self {
            url: url.into(),
            page,
            background,
            busy: AtomicBool::new(false),
        }
    }

    /// Spawn both relay endpoints and wire them together.
    pub fn start(page_agent: PageAgent, background: BackgroundWorker) -> Self {
        let url = page_agent.url().to_string();
        Self::new(
            url,
            relay::spawn("page", page_agent),
            relay::spawn("background", background),
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn background(&self) -> &RelayClient {
        &self.background
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Extraction only, no scoring.
    pub async fn extract(&self) -> Result<ProfileRecord, PipelineError> {
        let _guard = CycleGuard::acquire(&self.busy).ok_or(PipelineError::Busy)?;
        self.request_extraction().await
    }

    /// Extract, then score. Returns the record with `ai_response` filled in.
    /// A second call while one is in flight fails with [`PipelineError::Busy`].
    pub async fn run(&self) -> Result<ProfileRecord, PipelineError> {
        let _guard = CycleGuard::acquire(&self.busy).ok_or(PipelineError::Busy)?;

        let mut record = self.request_extraction().await?;
        info!("Extracted profile for '{}'", record.name);

        let request = RelayRequest::ProcessWithApi {
            data: record.clone(),
        };
        let action = request.action();
        let response = self
            .background
            .send(request)
            .await
            .map_err(|source| PipelineError::Channel { action, source })?;

        if let Some(message) = response.error_message() {
            error!("Scoring failed: {}", message);
            return Err(PipelineError::Rejected { action, message });
        }

        record.ai_response = response
            .ai_response
            .ok_or(PipelineError::MissingData { action })?;
        Ok(record)
    }

    async fn request_extraction(&self) -> Result<ProfileRecord, PipelineError> {
        let request = RelayRequest::ExtractAll;
        let action = request.action();
        let response = self
            .page
            .send(request)
            .await
            .map_err(|source| PipelineError::Channel { action, source })?;

        if let Some(message) = response.error_message() {
            error!("Extraction failed: {}", message);
            return Err(PipelineError::Rejected { action, message });
        }
        response.data.ok_or(PipelineError::MissingData { action })
    }
}
