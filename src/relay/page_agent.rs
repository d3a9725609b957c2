// src/relay/page_agent.rs
use super::{MessageHandler, RelayRequest, RelayResponse};
use crate::page::PageDriver;
use crate::profile::{ExpansionTrigger, FieldExtractor, ProfileRecord};
use anyhow::Result;
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use tracing::{error, info, warn};

/// The in-page side: expands truncated sections and reads the fields.
pub struct PageAgent {
    page: Arc<dyn PageDriver>,
    extractor: FieldExtractor,
    expansion: ExpansionTrigger,
}

impl PageAgent {
    pub fn new(page: Arc<dyn PageDriver>, extractor: FieldExtractor, expansion: ExpansionTrigger) -> Self {
        Self {
            page,
            extractor,
            expansion,
        }
    }

    pub fn url(&self) -> &str {
        self.page.url()
    }

    /// Click every "Show more", wait for the page to settle, then extract.
    /// Always returns a fresh record; nothing carries over between calls.
    pub async fn extract(&self) -> Result<ProfileRecord> {
        match self.expansion.trigger(Arc::clone(&self.page)).await {
            Ok(expansion) => {
                let waited = self.expansion.settle(self.page.as_ref(), &expansion).await;
                info!(
                    "Expanded {} sections, settled after {}ms",
                    expansion.count,
                    waited.as_millis()
                );
            }
            Err(e) => warn!("Could not expand truncated sections: {:#}", e),
        }

        let html = self.page.snapshot().await?;
        let document = Html::parse_document(&html);
        Ok(self.extractor.extract_all(&document))
    }
}

#[async_trait]
impl MessageHandler for PageAgent {
    async fn handle(&self, request: RelayRequest) -> RelayResponse {
        match request {
            RelayRequest::ExtractAll => match self.extract().await {
                Ok(record) => RelayResponse::extracted(record),
                Err(e) => {
                    error!("Extraction failed: {:#}", e);
                    RelayResponse::failure(e.to_string())
                }
            },
            other => RelayResponse::unsupported(&other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExpansionConfig, SelectorConfig};
    use crate::page::StaticPage;
    use crate::relay;

    const PAGE: &str = r#"<html><body>
        <h1 data-anonymize="person-name">Grace Hopper</h1>
        <h1 data-anonymize="headline">Rear Admiral</h1>
        <div data-anonymize="person-blurb"><span class="visually-hidden">old</span><span>Compiler pioneer</span></div>
        <button><span class="button-text">Show more</span></button>
        <ul><li class="_experience-entry_1irc72">
            <h2 data-anonymize="job-title">Director</h2>
            <p data-anonymize="company-name">US Navy</p>
        </li></ul>
    </body></html>"#;

    fn agent(page: Arc<StaticPage>) -> PageAgent {
        let selectors = SelectorConfig::default();
        PageAgent::new(
            page,
            FieldExtractor::new(&selectors).unwrap(),
            ExpansionTrigger::new(&selectors, &ExpansionConfig::default()).unwrap(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_extract_all_over_the_relay() {
        let page = Arc::new(StaticPage::from_html("https://example.test/in/grace", PAGE));
        let client = relay::spawn("page", agent(page.clone()));

        let response = client.send(RelayRequest::ExtractAll).await.unwrap();
        assert!(response.success);
        let record = response.data.unwrap();
        assert_eq!(record.name, "Grace Hopper");
        assert_eq!(record.headline, "Rear Admiral");
        assert_eq!(record.about, "Compiler pioneer");
        assert_eq!(
            record.experience,
            "Title\tCompany\tFrom\tTo\tTotal\tExperience\nDirector\tUS Navy\t\t\t\t"
        );
        assert_eq!(page.clicks().len(), 1);
    }

    #[tokio::test]
    async fn test_process_with_api_is_not_handled_here() {
        let page = Arc::new(StaticPage::from_html("https://example.test", "<p></p>"));
        let response = agent(page)
            .handle(RelayRequest::ProcessWithApi {
                data: ProfileRecord::default(),
            })
            .await;
        assert_eq!(response.error.as_deref(), Some("Unsupported action: processWithAPI"));
    }
}
