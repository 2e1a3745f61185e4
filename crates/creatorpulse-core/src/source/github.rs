//! GitHub connector (§4.1 "GitHub").

use super::{missing_fields, Connector, ConnectorError, FetchedItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

const API_BASE: &str = "https://api.github.com";

pub struct GitHubConnector {
    source_id: String,
    config: Value,
    credentials: Value,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ReleaseItem {
    name: Option<String>,
    tag_name: String,
    body: Option<String>,
    html_url: String,
    published_at: Option<String>,
}

#[derive(Deserialize)]
struct CommitItem {
    sha: String,
    html_url: String,
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    message: String,
    author: Option<CommitAuthor>,
}

#[derive(Deserialize)]
struct CommitAuthor {
    date: String,
}

#[derive(Deserialize)]
struct IssueItem {
    title: String,
    body: Option<String>,
    html_url: String,
    created_at: String,
    number: i64,
    pull_request: Option<Value>,
}

impl GitHubConnector {
    pub fn new(source_id: String, config: Value, credentials: Value) -> Self {
        Self { source_id, config, credentials, client: reqwest::Client::new() }
    }

    fn repo(&self) -> Result<String, ConnectorError> {
        self.config
            .get("repo")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ConnectorError::Validation {
                source_id: self.source_id.clone(),
                missing: vec!["repo".to_string()],
            })
    }

    fn fetch_type(&self) -> String {
        self.config.get("fetch_type").and_then(Value::as_str).unwrap_or("releases").to_string()
    }

    fn request(&self, url: String) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url).header("User-Agent", "creatorpulse/1.0");
        if let Some(token) = self.credentials.get("token").and_then(Value::as_str) {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder
    }
}

#[async_trait]
impl Connector for GitHubConnector {
    fn kind(&self) -> &str {
        "github"
    }

    fn config(&self) -> &Value {
        &self.config
    }

    fn required_credentials(&self) -> HashSet<&'static str> {
        HashSet::new()
    }

    fn required_config(&self) -> HashSet<&'static str> {
        let mut set = HashSet::new();
        set.insert("repo");
        set
    }

    async fn validate(&mut self) -> Result<(), ConnectorError> {
        let missing = missing_fields(&self.required_config(), &self.config);
        if !missing.is_empty() {
            return Err(ConnectorError::Validation { source_id: self.source_id.clone(), missing });
        }
        let repo = self.repo()?;
        self.request(format!("{API_BASE}/repos/{repo}"))
            .send()
            .await?
            .error_for_status()
            .map_err(ConnectorError::Network)?;
        Ok(())
    }

    async fn fetch(&self, since: Option<&str>) -> Result<Vec<FetchedItem>, ConnectorError> {
        let repo = self.repo()?;
        let since_dt = since.and_then(|s| s.parse::<DateTime<Utc>>().ok());

        let items = match self.fetch_type().as_str() {
            "commits" => {
                let mut url = format!("{API_BASE}/repos/{repo}/commits");
                if let Some(since) = since {
                    url = format!("{url}?since={since}");
                }
                let commits: Vec<CommitItem> = self
                    .request(url)
                    .send()
                    .await?
                    .error_for_status()
                    .map_err(ConnectorError::Network)?
                    .json()
                    .await?;
                commits
                    .into_iter()
                    .map(|c| FetchedItem {
                        title: c.commit.message.lines().next().unwrap_or_default().to_string(),
                        content: c.commit.message,
                        url: c.html_url,
                        published_at: c.commit.author.map(|a| a.date),
                        metadata: serde_json::json!({ "sha": c.sha }),
                        content_type: "github_commit".to_string(),
                    })
                    .collect()
            }
            "issues" => {
                let url = format!("{API_BASE}/repos/{repo}/issues?state=all");
                let issues: Vec<IssueItem> = self
                    .request(url)
                    .send()
                    .await?
                    .error_for_status()
                    .map_err(ConnectorError::Network)?
                    .json()
                    .await?;
                issues
                    .into_iter()
                    .filter(|i| {
                        since_dt
                            .map(|since_dt| {
                                i.created_at.parse::<DateTime<Utc>>().map(|d| d > since_dt).unwrap_or(true)
                            })
                            .unwrap_or(true)
                    })
                    .map(|i| FetchedItem {
                        title: i.title.clone(),
                        content: format!("{}\n\n{}", i.title, i.body.unwrap_or_default()),
                        url: i.html_url,
                        published_at: Some(i.created_at),
                        metadata: serde_json::json!({ "number": i.number, "is_pull_request": i.pull_request.is_some() }),
                        content_type: "github_issue".to_string(),
                    })
                    .collect()
            }
            "pull_requests" => {
                let url = format!("{API_BASE}/repos/{repo}/pulls?state=all");
                let pulls: Vec<IssueItem> = self
                    .request(url)
                    .send()
                    .await?
                    .error_for_status()
                    .map_err(ConnectorError::Network)?
                    .json()
                    .await?;
                pulls
                    .into_iter()
                    .map(|p| FetchedItem {
                        title: p.title.clone(),
                        content: format!("{}\n\n{}", p.title, p.body.unwrap_or_default()),
                        url: p.html_url,
                        published_at: Some(p.created_at),
                        metadata: serde_json::json!({ "number": p.number }),
                        content_type: "github_pull_request".to_string(),
                    })
                    .collect()
            }
            _ => {
                let url = format!("{API_BASE}/repos/{repo}/releases");
                let releases: Vec<ReleaseItem> = self
                    .request(url)
                    .send()
                    .await?
                    .error_for_status()
                    .map_err(ConnectorError::Network)?
                    .json()
                    .await?;
                releases
                    .into_iter()
                    .filter(|r| {
                        since_dt
                            .map(|since_dt| {
                                r.published_at
                                    .as_deref()
                                    .and_then(|d| d.parse::<DateTime<Utc>>().ok())
                                    .map(|d| d > since_dt)
                                    .unwrap_or(true)
                            })
                            .unwrap_or(true)
                    })
                    .map(|r| FetchedItem {
                        title: r.name.clone().unwrap_or_else(|| r.tag_name.clone()),
                        content: r.body.unwrap_or_default(),
                        url: r.html_url,
                        published_at: r.published_at,
                        metadata: serde_json::json!({ "tag_name": r.tag_name }),
                        content_type: "github_release".to_string(),
                    })
                    .collect()
            }
        };

        Ok(items)
    }
}
