//! Remote cost plugins spoken to over HTTP/JSON.
//!
//! Each plugin exposes three endpoints under its base URL:
//!
//! | Endpoint | Request body |
//! |---|---|
//! | `POST /v1/projected-cost` | `{ "resource": ResourceDescriptor }` |
//! | `POST /v1/actual-cost` | `{ "resource": ..., "from": RFC3339, "to": RFC3339 }` |
//! | `POST /v1/recommendations` | `{ "resource": ... }` |
//!
//! and answers with `{ "supported": bool, "result": CostResult?, "recommendations": [...] }`.
//! HTTP 404/501 or `supported: false` mean the plugin does not handle the resource.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::models::{CostResult, DEFAULT_CURRENCY, Recommendation, ResourceDescriptor};
use super::source::{CostSource, SourceKind};
use crate::error::{CostError, Result};

/// Default timeout for plugin requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(format!("cloudcost/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| CostError::Network(e.to_string()))
}

#[derive(Serialize)]
struct CostRequest<'a> {
    resource: &'a ResourceDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    to: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PluginResponse {
    supported: bool,
    result: Option<CostResult>,
    recommendations: Vec<Recommendation>,
}

impl Default for PluginResponse {
    fn default() -> Self {
        Self {
            supported: true,
            result: None,
            recommendations: Vec::new(),
        }
    }
}

/// POST a JSON body and decode the JSON answer.
///
/// Returns `Ok(None)` for 404/501, which plugins use to decline a resource.
///
/// # Errors
///
/// Returns error on network failure, other non-2xx status, or a body that is
/// not valid JSON for `T`.
pub async fn post_json<B, T>(
    client: &Client,
    url: &str,
    body: &B,
    timeout: Duration,
) -> Result<Option<T>>
where
    B: Serialize + Sync,
    T: DeserializeOwned,
{
    let response = client.post(url).json(body).send().await.map_err(|e| {
        if e.is_timeout() {
            CostError::Timeout(timeout.as_secs())
        } else {
            CostError::Network(e.to_string())
        }
    })?;

    let status = response.status();
    if matches!(status, StatusCode::NOT_FOUND | StatusCode::NOT_IMPLEMENTED) {
        return Ok(None);
    }
    if !status.is_success() {
        return Err(CostError::Network(format!("HTTP {status} from {url}")));
    }

    response
        .json()
        .await
        .map(Some)
        .map_err(|e| CostError::ParseResponse(e.to_string()))
}

/// A cost plugin reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPluginSource {
    name: String,
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl HttpPluginSource {
    /// Create a plugin source.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(name: impl Into<String>, base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            client: build_client(timeout)?,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{path}", self.base_url)
    }

    async fn call(&self, path: &str, body: &CostRequest<'_>) -> Result<Option<PluginResponse>> {
        let url = self.endpoint(path);
        tracing::debug!(plugin = %self.name, url = %url, "Calling plugin");
        let response: Option<PluginResponse> =
            post_json(&self.client, &url, body, self.timeout).await?;
        Ok(response.filter(|r| r.supported))
    }

    /// Stamp plugin identity onto a decoded row.
    fn adopt(&self, resource: &ResourceDescriptor, mut row: CostResult) -> CostResult {
        row.adapter.clone_from(&self.name);
        if row.resource_id.is_empty() {
            row.resource_id.clone_from(&resource.id);
        }
        if row.resource_type.is_empty() {
            row.resource_type.clone_from(&resource.resource_type);
        }
        if row.currency.is_empty() {
            row.currency = DEFAULT_CURRENCY.to_string();
        }
        row
    }
}

#[async_trait]
impl CostSource for HttpPluginSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Remote
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.timeout)
    }

    async fn projected_cost(&self, resource: &ResourceDescriptor) -> Result<Option<CostResult>> {
        let body = CostRequest {
            resource,
            from: None,
            to: None,
        };
        let response = self.call("projected-cost", &body).await?;
        Ok(response
            .and_then(|r| r.result)
            .map(|row| self.adopt(resource, row)))
    }

    async fn actual_cost(
        &self,
        resource: &ResourceDescriptor,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<CostResult>> {
        let body = CostRequest {
            resource,
            from: Some(from),
            to: Some(to),
        };
        let response = self.call("actual-cost", &body).await?;
        Ok(response
            .and_then(|r| r.result)
            .map(|row| self.adopt(resource, row)))
    }

    async fn recommendations(&self, resource: &ResourceDescriptor) -> Result<Vec<Recommendation>> {
        let body = CostRequest {
            resource,
            from: None,
            to: None,
        };
        let response = self.call("recommendations", &body).await?;
        Ok(response
            .map(|r| r.recommendations)
            .unwrap_or_default()
            .into_iter()
            .map(|mut rec| {
                rec.adapter.clone_from(&self.name);
                if rec.resource_id.is_empty() {
                    rec.resource_id.clone_from(&resource.id);
                }
                rec
            })
            .collect())
    }
}
