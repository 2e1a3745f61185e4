//! Source Connector Registry (C1): pluggable per-kind adapters that
//! validate credentials/config against a provider and fetch normalized
//! content items.

pub mod github;
pub mod reddit;
pub mod rss;
pub mod twitter;
pub mod youtube;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;

/// One item fetched from a source, ready to be deduplicated and stored
/// as a `content_items` row (§3 `ContentItem`).
#[derive(Debug, Clone)]
pub struct FetchedItem {
    pub title: String,
    pub content: String,
    pub url: String,
    pub published_at: Option<String>,
    pub metadata: Value,
    pub content_type: String,
}

/// Errors raised by a connector's `validate`/`fetch` calls (§4.1, §7).
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("unknown source kind: {0}")]
    UnknownKind(String),

    #[error("validation failed for source {source_id}: missing {missing:?}")]
    Validation { source_id: String, missing: Vec<String> },

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("rate limit exceeded for source {source_id}, retry after {retry_after_secs}s")]
    RateLimited { source_id: String, retry_after_secs: u64 },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// A connector for one source kind, bound to one source's config and
/// credentials (§4.1).
#[async_trait]
pub trait Connector: Send + Sync {
    /// The source kind this connector handles (e.g. `"rss"`, `"youtube"`).
    fn kind(&self) -> &str;

    /// The connector's current config, read back after `validate()` so the
    /// orchestrator can persist any in-place normalization (§4.2 step 2).
    fn config(&self) -> &Value;

    /// Credential keys this connector needs present in `credentials`.
    fn required_credentials(&self) -> HashSet<&'static str>;

    /// Config keys this connector needs present in `config`.
    fn required_config(&self) -> HashSet<&'static str>;

    /// Verify credentials and config against the provider. May normalize
    /// `config` in place (e.g. resolving a handle to a channel id).
    async fn validate(&mut self) -> Result<(), ConnectorError>;

    /// Fetch items with timestamps strictly after `since`, or all items
    /// when `since` is `None`.
    async fn fetch(&self, since: Option<&str>) -> Result<Vec<FetchedItem>, ConnectorError>;
}

/// Check that every key in `required` is present and non-empty in `present`.
pub fn missing_fields(required: &HashSet<&'static str>, present: &Value) -> Vec<String> {
    required
        .iter()
        .filter(|key| {
            present
                .get(key)
                .and_then(Value::as_str)
                .map(str::is_empty)
                .unwrap_or(true)
        })
        .map(|key| key.to_string())
        .collect()
}

/// Build a connector for `kind`, bound to `config`/`credentials`. The
/// registry itself is this function: a `match` keyed on `kind`, per §4.1's
/// "process-wide registry maps kind -> factory".
pub fn build_connector(
    kind: &str,
    source_id: &str,
    config: Value,
    credentials: Value,
) -> Result<Box<dyn Connector>, ConnectorError> {
    match kind {
        "rss" | "atom" => Ok(Box::new(rss::RssConnector::new(source_id.to_string(), config, credentials))),
        "youtube" => Ok(Box::new(youtube::YouTubeConnector::new(source_id.to_string(), config, credentials))),
        "reddit" => Ok(Box::new(reddit::RedditConnector::new(source_id.to_string(), config, credentials))),
        "github" => Ok(Box::new(github::GitHubConnector::new(source_id.to_string(), config, credentials))),
        "twitter" | "x" => Ok(Box::new(twitter::TwitterConnector::new(source_id.to_string(), config, credentials))),
        other => Err(ConnectorError::UnknownKind(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_connector_rejects_unknown_kind() {
        let result = build_connector("carrier_pigeon", "s1", serde_json::json!({}), serde_json::json!({}));
        assert!(matches!(result, Err(ConnectorError::UnknownKind(_))));
    }

    #[test]
    fn missing_fields_reports_absent_and_empty_keys() {
        let mut required = HashSet::new();
        required.insert("api_key");
        required.insert("handle");
        let present = serde_json::json!({"api_key": "", "handle": "someone"});
        let missing = missing_fields(&required, &present);
        assert_eq!(missing, vec!["api_key".to_string()]);
    }
}
