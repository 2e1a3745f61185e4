//! YouTube connector (§4.1 "YouTube").

use super::{missing_fields, Connector, ConnectorError, FetchedItem};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

pub struct YouTubeConnector {
    source_id: String,
    config: Value,
    credentials: Value,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChannelListResponse {
    items: Vec<ChannelItem>,
}

#[derive(Deserialize)]
struct ChannelItem {
    id: String,
}

#[derive(Deserialize)]
struct SearchListResponse {
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: SearchSnippet,
}

#[derive(Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Deserialize)]
struct SearchSnippet {
    title: String,
    description: String,
    #[serde(rename = "publishedAt")]
    published_at: String,
}

impl YouTubeConnector {
    pub fn new(source_id: String, config: Value, credentials: Value) -> Self {
        Self { source_id, config, credentials, client: reqwest::Client::new() }
    }

    fn api_key(&self) -> Result<String, ConnectorError> {
        self.credentials
            .get("api_key")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ConnectorError::Validation {
                source_id: self.source_id.clone(),
                missing: vec!["api_key".to_string()],
            })
    }

    fn max_results(&self) -> i64 {
        self.config.get("max_results").and_then(Value::as_i64).unwrap_or(25)
    }

    fn fetch_type(&self) -> String {
        self.config
            .get("fetch_type")
            .and_then(Value::as_str)
            .unwrap_or("uploads")
            .to_string()
    }
}

#[async_trait]
impl Connector for YouTubeConnector {
    fn kind(&self) -> &str {
        "youtube"
    }

    fn config(&self) -> &Value {
        &self.config
    }

    fn required_credentials(&self) -> HashSet<&'static str> {
        let mut set = HashSet::new();
        set.insert("api_key");
        set
    }

    fn required_config(&self) -> HashSet<&'static str> {
        HashSet::new()
    }

    /// Resolve `@handle` or `channel_id` via the provider, normalizing
    /// `config.channel_id` in place.
    async fn validate(&mut self) -> Result<(), ConnectorError> {
        let missing = missing_fields(&self.required_credentials(), &self.credentials);
        if !missing.is_empty() {
            return Err(ConnectorError::Validation { source_id: self.source_id.clone(), missing });
        }

        let api_key = self.api_key()?;
        let handle = self.config.get("handle").and_then(Value::as_str);
        let channel_id = self.config.get("channel_id").and_then(Value::as_str);

        if channel_id.is_some() {
            return Ok(());
        }
        let Some(handle) = handle else {
            return Err(ConnectorError::Validation {
                source_id: self.source_id.clone(),
                missing: vec!["handle or channel_id".to_string()],
            });
        };

        let response: ChannelListResponse = self
            .client
            .get(format!("{API_BASE}/channels"))
            .query(&[("part", "id"), ("forHandle", handle), ("key", &api_key)])
            .send()
            .await?
            .error_for_status()
            .map_err(ConnectorError::Network)?
            .json()
            .await?;

        let resolved = response
            .items
            .first()
            .ok_or_else(|| ConnectorError::Fetch(format!("no channel found for handle {handle}")))?;
        let channel_id = resolved.id.clone();
        if let Some(obj) = self.config.as_object_mut() {
            obj.insert("channel_id".to_string(), Value::String(channel_id));
        }
        Ok(())
    }

    async fn fetch(&self, since: Option<&str>) -> Result<Vec<FetchedItem>, ConnectorError> {
        let api_key = self.api_key()?;
        let channel_id = self
            .config
            .get("channel_id")
            .and_then(Value::as_str)
            .ok_or_else(|| ConnectorError::Validation {
                source_id: self.source_id.clone(),
                missing: vec!["channel_id".to_string()],
            })?;

        let order = match self.fetch_type().as_str() {
            "liked" | "subscriptions" | "playlist" => "date",
            _ => "date",
        };

        let max_results = self.max_results().to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("channelId", channel_id),
            ("order", order),
            ("maxResults", max_results.as_str()),
            ("type", "video"),
            ("key", api_key.as_str()),
        ];
        if let Some(since) = since {
            query.push(("publishedAfter", since));
        }

        let response: SearchListResponse = self
            .client
            .get(format!("{API_BASE}/search"))
            .query(&query)
            .send()
            .await?
            .error_for_status()
            .map_err(ConnectorError::Network)?
            .json()
            .await?;

        let items = response
            .items
            .into_iter()
            .filter_map(|item| {
                let video_id = item.id.video_id?;
                Some(FetchedItem {
                    title: item.snippet.title.clone(),
                    content: format!("{}\n\n{}", item.snippet.title, item.snippet.description),
                    url: format!("https://www.youtube.com/watch?v={video_id}"),
                    published_at: Some(item.snippet.published_at),
                    metadata: serde_json::json!({ "video_id": video_id }),
                    content_type: "youtube_video".to_string(),
                })
            })
            .collect();

        Ok(items)
    }
}
