// src/scoring/client.rs
use super::error::ScoringError;
use super::prompts::Prompts;
use super::stream::StreamAccumulator;
use super::types::{Message, MessagesRequest, MessagesResponse};
use crate::config::ApiConfig;
use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::{Client, Response};
use tracing::{error, info, warn};

/// Calls the remote messages endpoint. One request per call, no retries.
pub struct ScoringClient {
    client: Client,
    api: ApiConfig,
    prompts: Prompts,
}

impl ScoringClient {
    pub fn new(api: ApiConfig, prompts: Prompts) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(seconds) = api.timeout_seconds {
            builder = builder.timeout(std::time::Duration::from_secs(seconds));
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api,
            prompts,
        })
    }

    pub fn streams(&self) -> bool {
        self.api.stream
    }

    pub fn build_request(&self, payload: &str, stream: bool) -> MessagesRequest {
        MessagesRequest {
            model: self.api.model.clone(),
            max_tokens: self.api.max_tokens,
            temperature: self.api.temperature,
            system: self.prompts.system.clone(),
            messages: vec![Message::user_text(self.prompts.user_message(payload))],
            stream: stream.then_some(true),
        }
    }

    /// Score `payload`, streaming or not according to configuration.
    pub async fn score(&self, api_key: &str, payload: &str) -> Result<String, ScoringError> {
        if self.api.stream {
            self.score_streaming(api_key, payload, |_| {}).await
        } else {
            self.score_once(api_key, payload).await
        }
    }

    /// Single JSON response; returns the text of the first content block.
    pub async fn score_once(&self, api_key: &str, payload: &str) -> Result<String, ScoringError> {
        let request = self.build_request(payload, false);
        let response = self.send(api_key, &request).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        let parsed = match serde_json::from_str::<MessagesResponse>(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Unexpected response format: {}", e);
                return Err(ScoringError::MalformedResponse { status, body });
            }
        };

        let Some(text) = parsed
            .content
            .into_iter()
            .next()
            .and_then(|block| block.text)
        else {
            warn!("Response carries no text in its first content block");
            return Err(ScoringError::MalformedResponse { status, body });
        };

        if let Some(usage) = parsed.usage {
            info!(
                "Usage: {} input tokens, {} output tokens",
                usage.input_tokens, usage.output_tokens
            );
        }
        info!("Response length: {}", text.len());
        Ok(text)
    }

    /// Streamed response; `on_delta` sees each text fragment as it arrives.
    pub async fn score_streaming<F>(
        &self,
        api_key: &str,
        payload: &str,
        mut on_delta: F,
    ) -> Result<String, ScoringError>
    where
        F: FnMut(&str) + Send,
    {
        let request = self.build_request(payload, true);
        let response = self.send(api_key, &request).await?;

        let mut accumulator = StreamAccumulator::new();
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            for delta in accumulator.push_chunk(&chunk)? {
                on_delta(&delta);
            }
            if accumulator.is_done() {
                break;
            }
        }

        let text = accumulator.finish()?;
        info!("Streamed response length: {}", text.len());
        Ok(text)
    }

    async fn send(&self, api_key: &str, request: &MessagesRequest) -> Result<Response, ScoringError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ScoringError::MissingApiKey);
        }

        info!(
            "Calling scoring API {} (model {}, payload {} chars)",
            self.api.url,
            request.model,
            request.messages.first().map_or(0, |m| {
                m.content.iter().filter_map(|c| c.text.as_ref()).map(String::len).sum::<usize>()
            })
        );

        let response = self
            .client
            .post(&self.api.url)
            .header("content-type", "application/json")
            .header("x-api-key", api_key)
            .header("anthropic-version", &self.api.version)
            .header("anthropic-dangerous-direct-browser-access", "true")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Scoring API error {}: {}", status, body);
            return Err(ScoringError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}
