//! Reddit connector (§4.1 "Reddit").

use super::{Connector, ConnectorError, FetchedItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

const API_BASE: &str = "https://www.reddit.com";

pub struct RedditConnector {
    source_id: String,
    config: Value,
    credentials: Value,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Deserialize)]
struct ListingData {
    children: Vec<ListingChild>,
}

#[derive(Deserialize)]
struct ListingChild {
    data: PostData,
}

#[derive(Deserialize)]
struct PostData {
    title: String,
    selftext: String,
    permalink: String,
    created_utc: f64,
    score: i64,
    num_comments: i64,
}

impl RedditConnector {
    pub fn new(source_id: String, config: Value, credentials: Value) -> Self {
        let _ = &credentials;
        Self { source_id, config, credentials, client: reqwest::Client::new() }
    }

    fn subreddit(&self) -> Result<String, ConnectorError> {
        self.config
            .get("subreddit")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ConnectorError::Validation {
                source_id: self.source_id.clone(),
                missing: vec!["subreddit".to_string()],
            })
    }

    fn fetch_type(&self) -> String {
        self.config.get("fetch_type").and_then(Value::as_str).unwrap_or("hot").to_string()
    }

    fn max_results(&self) -> i64 {
        self.config.get("max_results").and_then(Value::as_i64).unwrap_or(25)
    }
}

#[async_trait]
impl Connector for RedditConnector {
    fn kind(&self) -> &str {
        "reddit"
    }

    fn config(&self) -> &Value {
        &self.config
    }

    fn required_credentials(&self) -> HashSet<&'static str> {
        HashSet::new()
    }

    fn required_config(&self) -> HashSet<&'static str> {
        let mut set = HashSet::new();
        set.insert("subreddit");
        set
    }

    async fn validate(&mut self) -> Result<(), ConnectorError> {
        let subreddit = self.subreddit()?;
        self.client
            .get(format!("{API_BASE}/r/{subreddit}/about.json"))
            .header("User-Agent", "creatorpulse/1.0")
            .send()
            .await?
            .error_for_status()
            .map_err(ConnectorError::Network)?;
        Ok(())
    }

    async fn fetch(&self, since: Option<&str>) -> Result<Vec<FetchedItem>, ConnectorError> {
        let subreddit = self.subreddit()?;
        let fetch_type = self.fetch_type();
        let limit = self.max_results().to_string();

        let url = format!("{API_BASE}/r/{subreddit}/{fetch_type}.json");
        let mut query = vec![("limit", limit.as_str())];
        let time_filter = self.config.get("time_filter").and_then(Value::as_str);
        if fetch_type == "top" {
            if let Some(time_filter) = time_filter {
                query.push(("t", time_filter));
            }
        }

        let listing: Listing = self
            .client
            .get(&url)
            .query(&query)
            .header("User-Agent", "creatorpulse/1.0")
            .send()
            .await?
            .error_for_status()
            .map_err(ConnectorError::Network)?
            .json()
            .await?;

        let since_dt = since.and_then(|s| s.parse::<DateTime<Utc>>().ok());
        let mut items = Vec::new();
        for child in listing.data.children {
            let post = child.data;
            let published_at = DateTime::from_timestamp(post.created_utc as i64, 0)
                .unwrap_or_else(Utc::now)
                .to_rfc3339();

            if let Some(since_dt) = since_dt {
                if let Ok(published) = published_at.parse::<DateTime<Utc>>() {
                    if published <= since_dt {
                        continue;
                    }
                }
            }

            items.push(FetchedItem {
                title: post.title.clone(),
                content: format!("{}\n\n{}", post.title, post.selftext),
                url: format!("https://reddit.com{}", post.permalink),
                published_at: Some(published_at),
                metadata: serde_json::json!({ "score": post.score, "num_comments": post.num_comments }),
                content_type: "reddit_post".to_string(),
            });
        }
        Ok(items)
    }
}
