// src/profile/expansion.rs
//! Unfolds truncated sections before extraction.
//!
//! Clicks are staggered on the tokio timer so their DOM updates do not race.
//! Completion is not observable, so callers wait a settle period afterwards.

use crate::config::{ExpansionConfig, SelectorConfig, SettleStrategy};
use crate::page::{ControlRef, PageDriver};
use anyhow::Result;
use scraper::{Html, Selector};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

pub struct ExpansionTrigger {
    control: Selector,
    label: Selector,
    config: ExpansionConfig,
}

/// Clicks that have been scheduled but may not have fired yet.
pub struct ScheduledExpansion {
    pub count: usize,
    started: Instant,
    handles: Vec<JoinHandle<()>>,
}

impl ScheduledExpansion {
    /// Wait for every scheduled click to have run.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("Show more click task failed: {}", e);
            }
        }
    }
}

impl ExpansionTrigger {
    pub fn new(selectors: &SelectorConfig, config: &ExpansionConfig) -> Result<Self> {
        let control = Selector::parse(&selectors.show_more_control).map_err(|e| {
            anyhow::anyhow!("Invalid show_more_control selector '{}': {}", selectors.show_more_control, e)
        })?;
        let label = Selector::parse(&selectors.show_more_label).map_err(|e| {
            anyhow::anyhow!("Invalid show_more_label selector '{}': {}", selectors.show_more_label, e)
        })?;
        Ok(Self {
            control,
            label,
            config: config.clone(),
        })
    }

    /// Controls whose label text is exactly the configured "Show more".
    pub fn find_controls(&self, document: &Html) -> Vec<ControlRef> {
        document
            .select(&self.control)
            .enumerate()
            .filter_map(|(index, control)| {
                let label = control.select(&self.label).next()?;
                let text = label.text().collect::<String>();
                let text = text.trim();
                (text == self.config.label_text).then(|| ControlRef {
                    index,
                    label: text.to_string(),
                })
            })
            .collect()
    }

    /// Find the "Show more" controls on the current page and schedule a click
    /// for each, the i-th one after `i * interval`. Returns immediately.
    pub async fn trigger(&self, page: Arc<dyn PageDriver>) -> Result<ScheduledExpansion> {
        let html = page.snapshot().await?;
        let controls = {
            let document = Html::parse_document(&html);
            self.find_controls(&document)
        };
        info!("Found and clicking {} Show more buttons", controls.len());
        Ok(self.schedule(page, controls))
    }

    pub fn schedule(&self, page: Arc<dyn PageDriver>, controls: Vec<ControlRef>) -> ScheduledExpansion {
        let interval = self.config.interval();
        let handles = controls
            .into_iter()
            .enumerate()
            .map(|(position, control)| {
                let page = Arc::clone(&page);
                let delay = click_offset(interval, position);
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    match page.click(&control).await {
                        Ok(()) => info!("Clicked Show more button {}", position + 1),
                        Err(e) => warn!("Error clicking Show more button {}: {}", position + 1, e),
                    }
                })
            })
            .collect::<Vec<_>>();

        ScheduledExpansion {
            count: handles.len(),
            started: Instant::now(),
            handles,
        }
    }

    /// Wait for expanded content to settle. Returns the time spent waiting.
    pub async fn settle(&self, page: &dyn PageDriver, expansion: &ScheduledExpansion) -> Duration {
        match &self.config.settle {
            SettleStrategy::Fixed => {
                let delay = self.config.settle_delay(expansion.count);
                info!("Waiting {}s for content to load", delay.as_secs_f32().ceil());
                tokio::time::sleep(delay).await;
            }
            SettleStrategy::PollUntilStable {
                poll_ms,
                timeout_ms,
            } => {
                let offset = click_offset(self.config.interval(), expansion.count);
                match expansion.started.checked_add(offset) {
                    Some(schedule_end) => tokio::time::sleep_until(schedule_end).await,
                    None => tokio::time::sleep(offset).await,
                }
                self.poll_until_stable(
                    page,
                    Duration::from_millis(*poll_ms),
                    Duration::from_millis(*timeout_ms),
                )
                .await;
            }
        }
        expansion.started.elapsed()
    }

    async fn poll_until_stable(&self, page: &dyn PageDriver, poll: Duration, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let mut previous = match page.snapshot().await {
            Ok(html) => html,
            Err(e) => {
                warn!("Snapshot failed while settling: {}", e);
                return;
            }
        };

        loop {
            tokio::time::sleep(poll).await;
            let current = match page.snapshot().await {
                Ok(html) => html,
                Err(e) => {
                    warn!("Snapshot failed while settling: {}", e);
                    return;
                }
            };
            if current == previous {
                return;
            }
            if Instant::now() >= deadline {
                warn!("Page still changing after {:?}, extracting anyway", timeout);
                return;
            }
            previous = current;
        }
    }
}

/// `interval * position`, saturating at `Duration::MAX`.
fn click_offset(interval: Duration, position: usize) -> Duration {
    u32::try_from(position)
        .ok()
        .and_then(|position| interval.checked_mul(position))
        .unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const PAGE: &str = r#"
<html><body>
  <button><span class="button-text">Show more</span></button>
  <button><span class="button-text">Show less</span></button>
  <button><span class="button-text"> Show more </span></button>
  <button>Show more</button>
  <button><span class="button-text">Show more</span></button>
  <button><span class="button-text">Show more skills</span></button>
</body></html>
"#;

    struct RecordingPage {
        html: String,
        clicks: Mutex<Vec<(usize, Instant)>>,
    }

    #[async_trait]
    impl PageDriver for RecordingPage {
        fn url(&self) -> &str {
            "https://example.test/in/ada"
        }

        async fn snapshot(&self) -> Result<String> {
            Ok(self.html.clone())
        }

        async fn click(&self, control: &ControlRef) -> Result<()> {
            self.clicks.lock().unwrap().push((control.index, Instant::now()));
            Ok(())
        }
    }

    /// Markup grows for the first few snapshots, then stops changing.
    struct GrowingPage {
        snapshots: AtomicUsize,
        stable_after: usize,
    }

    #[async_trait]
    impl PageDriver for GrowingPage {
        fn url(&self) -> &str {
            "https://example.test/in/grace"
        }

        async fn snapshot(&self) -> Result<String> {
            let n = self.snapshots.fetch_add(1, Ordering::SeqCst);
            Ok(format!("<p>{}</p>", n.min(self.stable_after)))
        }

        async fn click(&self, _control: &ControlRef) -> Result<()> {
            Ok(())
        }
    }

    fn trigger_with(settle: SettleStrategy) -> ExpansionTrigger {
        let config = ExpansionConfig {
            settle,
            ..ExpansionConfig::default()
        };
        ExpansionTrigger::new(&SelectorConfig::default(), &config).unwrap()
    }

    #[test]
    fn test_find_controls_matches_exact_label() {
        let document = Html::parse_document(PAGE);
        let controls = trigger_with(SettleStrategy::Fixed).find_controls(&document);
        let indexes: Vec<usize> = controls.iter().map(|c| c.index).collect();
        assert_eq!(indexes, vec![0, 2, 4]);
        assert!(controls.iter().all(|c| c.label == "Show more"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clicks_are_staggered_by_interval() {
        let page = Arc::new(RecordingPage {
            html: PAGE.to_string(),
            clicks: Mutex::new(Vec::new()),
        });
        let trigger = trigger_with(SettleStrategy::Fixed);
        let start = Instant::now();

        let expansion = trigger.trigger(page.clone()).await.unwrap();
        assert_eq!(expansion.count, 3);
        expansion.join().await;

        let clicks = page.clicks.lock().unwrap().clone();
        assert_eq!(clicks.len(), 3);
        let mut offsets: Vec<(usize, u128)> = clicks
            .iter()
            .map(|(index, at)| (*index, at.duration_since(start).as_millis()))
            .collect();
        offsets.sort_by_key(|(_, ms)| *ms);
        assert_eq!(offsets, vec![(0, 0), (2, 500), (4, 1000)]);
    }

    #[test]
    fn test_click_offset_saturates() {
        let interval = Duration::from_millis(500);
        assert_eq!(click_offset(interval, 0), Duration::ZERO);
        assert_eq!(click_offset(interval, 3), Duration::from_millis(1500));
        assert_eq!(click_offset(Duration::MAX, 2), Duration::MAX);
        assert_eq!(click_offset(interval, usize::MAX), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_does_not_panic() {
        let page = Arc::new(RecordingPage {
            html: PAGE.to_string(),
            clicks: Mutex::new(Vec::new()),
        });
        let config = ExpansionConfig {
            interval_ms: u64::MAX,
            ..ExpansionConfig::default()
        };
        let trigger = ExpansionTrigger::new(&SelectorConfig::default(), &config).unwrap();
        let expansion = trigger.trigger(page.clone()).await.unwrap();
        assert_eq!(expansion.count, 3);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(page.clicks.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_without_controls_schedules_nothing() {
        let page = Arc::new(RecordingPage {
            html: "<p>no buttons</p>".to_string(),
            clicks: Mutex::new(Vec::new()),
        });
        let trigger = trigger_with(SettleStrategy::Fixed);
        let expansion = trigger.trigger(page.clone()).await.unwrap();
        assert_eq!(expansion.count, 0);

        let waited = trigger.settle(page.as_ref(), &expansion).await;
        assert_eq!(waited, Duration::from_millis(3000));
        assert!(page.clicks.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_settle_scales_with_count() {
        let page = Arc::new(RecordingPage {
            html: PAGE.to_string(),
            clicks: Mutex::new(Vec::new()),
        });
        let config = ExpansionConfig {
            floor_ms: 0,
            ..ExpansionConfig::default()
        };
        let trigger = ExpansionTrigger::new(&SelectorConfig::default(), &config).unwrap();
        let expansion = trigger.trigger(page.clone()).await.unwrap();
        let waited = trigger.settle(page.as_ref(), &expansion).await;
        assert_eq!(waited, Duration::from_millis(3 * 500 + 2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_stable_stops_when_markup_stops_changing() {
        let page = Arc::new(GrowingPage {
            snapshots: AtomicUsize::new(0),
            stable_after: 3,
        });
        let trigger = trigger_with(SettleStrategy::PollUntilStable {
            poll_ms: 100,
            timeout_ms: 10_000,
        });
        let expansion = trigger.schedule(page.clone(), Vec::new());
        let waited = trigger.settle(page.as_ref(), &expansion).await;
        // snapshots 0,1,2,3,3: four polls
        assert_eq!(waited, Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_stable_gives_up_at_timeout() {
        let page = Arc::new(GrowingPage {
            snapshots: AtomicUsize::new(0),
            stable_after: usize::MAX,
        });
        let trigger = trigger_with(SettleStrategy::PollUntilStable {
            poll_ms: 100,
            timeout_ms: 1000,
        });
        let expansion = trigger.schedule(page.clone(), Vec::new());
        let waited = trigger.settle(page.as_ref(), &expansion).await;
        assert_eq!(waited, Duration::from_millis(1000));
    }
}
