// src/relay/mod.rs
//! One-shot request/response messaging between the in-page side and the
//! privileged background side.
//!
//! Each request carries its own reply slot, so a request gets exactly one
//! response or a channel error; it can never get two.

use crate::profile::ProfileRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub mod background;
pub mod http;
pub mod page_agent;

pub use background::BackgroundWorker;
pub use page_agent::PageAgent;

const QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum RelayRequest {
    #[serde(rename = "extractAll")]
    ExtractAll,
    #[serde(rename = "processWithAPI")]
    ProcessWithApi { data: ProfileRecord },
}

impl RelayRequest {
    pub fn action(&self) -> &'static str {
        match self {
            RelayRequest::ExtractAll => "extractAll",
            RelayRequest::ProcessWithApi { .. } => "processWithAPI",
        }
    }
}

/// `{success: true, data | aiResponse}` or `{success: false, error}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ProfileRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayResponse {
    pub fn extracted(record: ProfileRecord) -> Self {
        Self {
            success: true,
            data: Some(record),
            ai_response: None,
            error: None,
        }
    }

    pub fn scored(ai_response: String) -> Self {
        Self {
            success: true,
            data: None,
            ai_response: Some(ai_response),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            ai_response: None,
            error: Some(error.into()),
        }
    }

    pub fn unsupported(request: &RelayRequest) -> Self {
        Self::failure(format!("Unsupported action: {}", request.action()))
    }

    /// The application-level error, if the handler reported one.
    pub fn error_message(&self) -> Option<String> {
        if self.success {
            None
        } else {
            Some(
                self.error
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            )
        }
    }
}

/// Failures of the channel itself, as opposed to a `success: false` answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error("Could not establish connection. Receiving end does not exist.")]
    Disconnected,
    #[error("The message channel closed before a response was received.")]
    NoResponse,
}

#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    async fn handle(&self, request: RelayRequest) -> RelayResponse;
}

struct Envelope {
    id: Uuid,
    request: RelayRequest,
    reply: oneshot::Sender<RelayResponse>,
}

/// Sending half of a relay. Cheap to clone.
#[derive(Clone)]
pub struct RelayClient {
    name: &'static str,
    tx: mpsc::Sender<Envelope>,
}

impl RelayClient {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn send(&self, request: RelayRequest) -> Result<RelayResponse, RelayError> {
        let id = Uuid::new_v4();
        let (reply, response) = oneshot::channel();
        debug!("[{}] sending {} ({})", self.name, request.action(), id);

        self.tx
            .send(Envelope { id, request, reply })
            .await
            .map_err(|_| RelayError::Disconnected)?;

        response.await.map_err(|_| RelayError::NoResponse)
    }
}

/// Start a task that owns `handler` and answers requests one at a time.
/// The task ends once every [`RelayClient`] clone is dropped.
pub fn spawn<H: MessageHandler>(name: &'static str, handler: H) -> RelayClient {
    let (tx, mut rx) = mpsc::channel::<Envelope>(QUEUE_DEPTH);

    tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            let action = envelope.request.action();
            info!("[{}] received {} ({})", name, action, envelope.id);
            let response = handler.handle(envelope.request).await;
            if envelope.reply.send(response).is_err() {
                warn!("[{}] requester went away before {} ({}) completed", name, action, envelope.id);
            }
        }
        debug!("[{}] relay closed", name);
    });

    RelayClient { name, tx }
}
