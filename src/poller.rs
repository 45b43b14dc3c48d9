use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::analyst::Analyst;
use crate::db::NewsSubmission;
use crate::extract::{extract_article_text, resolve_story_url};

#[derive(Debug, Error)]
pub enum PollError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned {status}")]
    Status { url: String, status: StatusCode },
    #[error("analysis failed: {0}")]
    Analysis(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FeedItem {
    pub title: String,
    #[serde(rename = "storyPath")]
    pub story_path: String,
    /// Seconds since the epoch
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub published: i64,
}

/// Accepts integer or fractional seconds; fractions are truncated.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(secs) = number.as_i64() {
        return Ok(secs);
    }
    match number.as_f64() {
        Some(secs) if secs.is_finite() => Ok(secs.trunc() as i64),
        _ => Err(serde::de::Error::custom(format!(
            "invalid timestamp: {}",
            number
        ))),
    }
}

// Entries are converted one at a time by `Poller::parse_items`.
#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

/// Feed items that parsed, plus how many did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedBatch {
    pub items: Vec<FeedItem>,
    pub malformed: usize,
}

/// Where the poller reads from and forwards to.
#[derive(Debug, Clone)]
pub struct PollerSettings {
    pub feed_url: String,
    pub feed_base_url: String,
    pub api_endpoint: String,
    pub api_key: String,
    pub window: Duration,
    pub request_timeout: Duration,
}

/// Counts for a single cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub eligible: usize,
    pub malformed: usize,
    pub forwarded: usize,
    pub no_article: usize,
    pub failed: usize,
}

enum ItemOutcome {
    Forwarded,
    NoArticle,
}

pub struct Poller {
    client: Client,
    settings: PollerSettings,
    analyst: Arc<dyn Analyst>,
    last_processed_timestamp: i64,
}

impl Poller {
    pub fn new(settings: PollerSettings, analyst: Arc<dyn Analyst>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent("NewsSignals/1.0 (Feed Poller)")
            .build()?;

        Ok(Self {
            client,
            settings,
            analyst,
            last_processed_timestamp: 0,
        })
    }

    /// Timestamp of the most recently processed feed item.
    pub fn watermark(&self) -> i64 {
        self.last_processed_timestamp
    }

    /// Items newer than both the trailing window and the watermark, oldest first.
    pub fn select_fresh(
        items: &[FeedItem],
        now: DateTime<Utc>,
        window: Duration,
        watermark: i64,
    ) -> Vec<FeedItem> {
        let window_secs = i64::try_from(window.as_secs()).unwrap_or(i64::MAX);
        let window_start = now.timestamp().saturating_sub(window_secs);

        let mut fresh: Vec<FeedItem> = items
            .iter()
            .filter(|item| item.published > window_start && item.published > watermark)
            .cloned()
            .collect();
        fresh.sort_by_key(|item| item.published);
        fresh
    }

    /// `published` as sent to the ingestion endpoint.
    pub fn format_published(published: i64) -> String {
        DateTime::<Utc>::from_timestamp(published, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| published.to_string())
    }

    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::default();

        info!("Fetching news feed");
        let FeedBatch { items, malformed } = match self.fetch_feed().await {
            Ok(batch) => batch,
            Err(e) => {
                error!("Error fetching news: {}", e);
                return report;
            }
        };
        report.fetched = items.len() + malformed;
        report.malformed = malformed;

        let fresh = Self::select_fresh(
            &items,
            now,
            self.settings.window,
            self.last_processed_timestamp,
        );
        report.eligible = fresh.len();

        for item in fresh {
            match self.process_item(&item).await {
                Ok(ItemOutcome::Forwarded) => report.forwarded += 1,
                Ok(ItemOutcome::NoArticle) => {
                    info!("No article body found for '{}', skipping", item.title);
                    report.no_article += 1;
                }
                Err(e) => {
                    error!("Failed to process '{}': {}", item.title, e);
                    report.failed += 1;
                }
            }

            // Advance even on failure so a broken item is not retried forever.
            self.last_processed_timestamp = self.last_processed_timestamp.max(item.published);
        }

        info!(
            "Cycle complete: {} fetched, {} malformed, {} eligible, {} forwarded, {} without article, {} failed",
            report.fetched,
            report.malformed,
            report.eligible,
            report.forwarded,
            report.no_article,
            report.failed
        );
        report
    }

    async fn process_item(&self, item: &FeedItem) -> Result<ItemOutcome, PollError> {
        let article = match self.fetch_article(&item.story_path).await? {
            Some(article) => article,
            None => return Ok(ItemOutcome::NoArticle),
        };

        info!("Analyzing article: {}", item.title);
        let trading_decision = self.analyst.decide(&article).await?;

        let submission = NewsSubmission {
            title: item.title.clone(),
            published: Self::format_published(item.published),
            trading_decision,
        };
        info!(
            title = %submission.title,
            published = %submission.published,
            decision = %submission.trading_decision,
            "Trading decision ready"
        );

        self.forward(&submission).await?;
        info!("API request sent successfully for article: {}", item.title);
        Ok(ItemOutcome::Forwarded)
    }

    /// Convert raw feed entries one by one, skipping the ones that do not parse.
    pub fn parse_items(raw: Vec<serde_json::Value>) -> FeedBatch {
        let mut batch = FeedBatch::default();
        for value in raw {
            match serde_json::from_value::<FeedItem>(value) {
                Ok(item) => batch.items.push(item),
                Err(e) => {
                    warn!("Skipping malformed feed item: {}", e);
                    batch.malformed += 1;
                }
            }
        }
        batch
    }

    pub async fn fetch_feed(&self) -> Result<FeedBatch, PollError> {
        let url = &self.settings.feed_url;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status {
                url: url.clone(),
                status,
            });
        }

        let feed: FeedResponse = response.json().await?;
        Ok(Self::parse_items(feed.items))
    }

    /// Article text for a story path; `Ok(None)` when the page has no article body.
    pub async fn fetch_article(&self, story_path: &str) -> Result<Option<String>, PollError> {
        let url = resolve_story_url(&self.settings.feed_base_url, story_path);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Status { url, status });
        }

        let html = response.text().await?;
        Ok(extract_article_text(&html))
    }

    pub async fn forward(&self, submission: &NewsSubmission) -> Result<(), PollError> {
        let url = &self.settings.api_endpoint;
        let response = self
            .client
            .post(url)
            .header("X-API-Key", &self.settings.api_key)
            .json(submission)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Ingestion endpoint rejected '{}': {}", submission.title, status);
            return Err(PollError::Status {
                url: url.clone(),
                status,
            });
        }
        Ok(())
    }
}

pub async fn run_forever(mut poller: Poller, interval: Duration) {
    info!("Starting stock trading signal poller");
    loop {
        poller.run_cycle(Utc::now()).await;
        tokio::time::sleep(interval).await;
    }
}
