use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::core::activity::Activity;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered HTTP {status}: {message}")]
    Status {
        url: String,
        status: StatusCode,
        message: String,
    },
    #[error("{url} reported failure: {message}")]
    Unsuccessful { url: String, message: String },
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryUsage {
    #[serde(default)]
    pub rss: Option<f64>,
    #[serde(default, rename = "virtual")]
    pub virtual_size: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub uptime: Option<f64>,
    #[serde(default)]
    pub memory: Option<MemoryUsage>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusReport {
    pub status: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub activities: Option<StatusCountsReport>,
}

/// Counters as reported over the wire; any of them may be missing when talking
/// to an older or foreign tracker.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StatusCountsReport {
    pub total: Option<f64>,
    pub running: Option<f64>,
    pub completed: Option<f64>,
    pub failed: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityList {
    pub count: usize,
    pub activities: Vec<Activity>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    pub task_id: String,
    pub task: Value,
    pub processed: bool,
    pub timestamp: String,
}

#[derive(Deserialize)]
struct ActivityEnvelope {
    activity: Activity,
}

#[derive(Deserialize)]
struct ProcessEnvelope {
    result: ProcessResult,
}

/// Thin REST wrapper over the tracker's HTTP surface.
#[derive(Clone)]
pub struct TrackerClient {
    client: Client,
    base_url: String,
    auth: Option<(String, String)>,
}

impl TrackerClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                url: base_url.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
            auth: None,
        })
    }

    pub fn with_basic_auth(mut self, user: &str, password: &str) -> Self {
        self.auth = Some((user.to_string(), password.to_string()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<HealthReport, ClientError> {
        let url = self.url("/health");
        self.send(&url, self.request(Method::GET, &url)).await
    }

    pub async fn status(&self) -> Result<StatusReport, ClientError> {
        let url = self.url("/status");
        self.send(&url, self.request(Method::GET, &url)).await
    }

    pub async fn list_activities(
        &self,
        limit: Option<usize>,
        status: Option<&str>,
    ) -> Result<ActivityList, ClientError> {
        let url = self.url("/api/activities");
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        let req = self.request(Method::GET, &url).query(&query);
        self.send_checked(&url, req).await
    }

    pub async fn get_activity(&self, id: &str) -> Result<Activity, ClientError> {
        let url = self.url(&format!("/api/activities/{}", id));
        let envelope: ActivityEnvelope = self
            .send_checked(&url, self.request(Method::GET, &url))
            .await?;
        Ok(envelope.activity)
    }

    pub async fn create_activity(
        &self,
        kind: &str,
        description: &str,
        metadata: Value,
    ) -> Result<Activity, ClientError> {
        let url = self.url("/api/activities");
        let body = serde_json::json!({
            "type": kind,
            "description": description,
            "metadata": metadata,
        });
        let envelope: ActivityEnvelope = self
            .send_checked(&url, self.request(Method::POST, &url).json(&body))
            .await?;
        Ok(envelope.activity)
    }

    pub async fn update_activity(
        &self,
        id: &str,
        status: &str,
        result: Value,
    ) -> Result<Activity, ClientError> {
        let url = self.url(&format!("/api/activities/{}", id));
        let body = serde_json::json!({ "status": status, "result": result });
        let envelope: ActivityEnvelope = self
            .send_checked(&url, self.request(Method::PATCH, &url).json(&body))
            .await?;
        Ok(envelope.activity)
    }

    pub async fn clear_activities(&self) -> Result<(), ClientError> {
        let url = self.url("/api/activities");
        let _: Value = self
            .send_checked(&url, self.request(Method::DELETE, &url))
            .await?;
        Ok(())
    }

    pub async fn process_task(&self, task: &str, data: Value) -> Result<ProcessResult, ClientError> {
        let url = self.url("/api/process");
        let body = serde_json::json!({ "task": task, "data": data });
        let envelope: ProcessEnvelope = self
            .send_checked(&url, self.request(Method::POST, &url).json(&body))
            .await?;
        Ok(envelope.result)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self.client.request(method, url);
        match &self.auth {
            Some((user, password)) => req.basic_auth(user, Some(password)),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        url: &str,
        req: RequestBuilder,
    ) -> Result<T, ClientError> {
        let transport = |source| ClientError::Transport {
            url: url.to_string(),
            source,
        };

        let resp = req.send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                url: url.to_string(),
                status,
                message: error_message(&body),
            });
        }
        resp.json::<T>().await.map_err(transport)
    }

    /// Like `send`, but also requires the `success: true` envelope flag.
    async fn send_checked<T: DeserializeOwned>(
        &self,
        url: &str,
        req: RequestBuilder,
    ) -> Result<T, ClientError> {
        let body: Value = self.send(url, req).await?;
        if body.get("success").and_then(Value::as_bool) != Some(true) {
            return Err(ClientError::Unsuccessful {
                url: url.to_string(),
                message: error_message(&body.to_string()),
            });
        }
        serde_json::from_value(body).map_err(|e| ClientError::Unsuccessful {
            url: url.to_string(),
            message: format!("unexpected response shape: {}", e),
        })
    }
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}
