// src/relay/background.rs
use super::{MessageHandler, RelayRequest, RelayResponse};
use crate::profile::ProfileRecord;
use crate::scoring::{ScoringClient, ScoringError};
use crate::settings::SettingsStore;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

pub type DeltaSink = Arc<dyn Fn(&str) + Send + Sync>;

/// The privileged side: owns the stored credential and network egress.
pub struct BackgroundWorker {
    settings: SettingsStore,
    client: ScoringClient,
    delta_sink: Option<DeltaSink>,
}

impl BackgroundWorker {
    pub fn new(settings: SettingsStore, client: ScoringClient) -> Self {
        Self {
            settings,
            client,
            delta_sink: None,
        }
    }

    /// Observe streamed text as it arrives (only used in streaming mode).
    pub fn with_delta_sink(mut self, sink: DeltaSink) -> Self {
        self.delta_sink = Some(sink);
        self
    }

    async fn process(&self, data: &ProfileRecord) -> Result<String, ScoringError> {
        let api_key = match self.settings.api_key().await {
            Ok(Some(key)) => key,
            Ok(None) => {
                info!("No API key found");
                return Err(ScoringError::MissingApiKey);
            }
            Err(e) => {
                error!("Failed to read settings: {:#}", e);
                return Err(ScoringError::Settings(format!("{:#}", e)));
            }
        };

        let payload = data.combined_payload();
        info!("Calling API with combined data length: {}", payload.len());

        match (&self.delta_sink, self.client.streams()) {
            (Some(sink), true) => {
                let sink = Arc::clone(sink);
                self.client
                    .score_streaming(&api_key, &payload, move |delta| sink(delta))
                    .await
            }
            _ => self.client.score(&api_key, &payload).await,
        }
    }
}

#[async_trait]
impl MessageHandler for BackgroundWorker {
    async fn handle(&self, request: RelayRequest) -> RelayResponse {
        match request {
            RelayRequest::ProcessWithApi { data } => match self.process(&data).await {
                Ok(ai_response) => {
                    info!("API call successful, sending response");
                    RelayResponse::scored(ai_response)
                }
                Err(e) => {
                    error!("API call failed: {}", e);
                    RelayResponse::failure(e.to_string())
                }
            },
            other => RelayResponse::unsupported(&other),
        }
    }
}
