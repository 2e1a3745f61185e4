//! RSS/Atom connector (§4.1 "RSS/Atom").

use super::{missing_fields, Connector, ConnectorError, FetchedItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;

pub struct RssConnector {
    source_id: String,
    config: Value,
    credentials: Value,
    client: reqwest::Client,
}

impl RssConnector {
    pub fn new(source_id: String, config: Value, credentials: Value) -> Self {
        Self { source_id, config, credentials, client: reqwest::Client::new() }
    }

    fn feed_url(&self) -> Result<String, ConnectorError> {
        self.config
            .get("feed_url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ConnectorError::Validation {
                source_id: self.source_id.clone(),
                missing: vec!["feed_url".to_string()],
            })
    }
}

#[async_trait]
impl Connector for RssConnector {
    fn kind(&self) -> &str {
        "rss"
    }

    fn config(&self) -> &Value {
        &self.config
    }

    fn required_credentials(&self) -> HashSet<&'static str> {
        HashSet::new()
    }

    fn required_config(&self) -> HashSet<&'static str> {
        let mut set = HashSet::new();
        set.insert("feed_url");
        set
    }

    async fn validate(&mut self) -> Result<(), ConnectorError> {
        let missing = missing_fields(&self.required_config(), &self.config);
        if !missing.is_empty() {
            return Err(ConnectorError::Validation { source_id: self.source_id.clone(), missing });
        }
        let url = self.feed_url()?;
        let body = self.client.get(&url).send().await?.bytes().await?;
        feed_rs::parser::parse(&body[..])
            .map_err(|e| ConnectorError::Fetch(format!("could not parse feed head: {e}")))?;
        Ok(())
    }

    async fn fetch(&self, since: Option<&str>) -> Result<Vec<FetchedItem>, ConnectorError> {
        let url = self.feed_url()?;
        let body = self.client.get(&url).send().await?.bytes().await?;
        let feed = feed_rs::parser::parse(&body[..])
            .map_err(|e| ConnectorError::Fetch(format!("could not parse feed: {e}")))?;

        let since_dt = since.and_then(|s| s.parse::<DateTime<Utc>>().ok());
        let mut items = Vec::new();

        for entry in feed.entries {
            let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
                continue;
            };

            let published_at = entry
                .published
                .or(entry.updated)
                .map(|dt| dt.to_rfc3339());

            if let (Some(since_dt), Some(published_at)) = (since_dt, &published_at) {
                if let Ok(published) = published_at.parse::<DateTime<Utc>>() {
                    if published <= since_dt {
                        continue;
                    }
                }
            }

            let title = entry.title.map(|t| t.content).unwrap_or_default();
            let content = entry
                .content
                .and_then(|c| c.body)
                .or_else(|| entry.summary.map(|s| s.content))
                .unwrap_or_default();
            let author = entry.authors.first().map(|a| a.name.clone());
            let tags: Vec<String> = entry.categories.iter().map(|c| c.term.clone()).collect();

            items.push(FetchedItem {
                title,
                content,
                url: link,
                published_at,
                metadata: serde_json::json!({ "author": author, "tags": tags }),
                content_type: "rss_entry".to_string(),
            });
        }

        Ok(items)
    }
}
