//! HTTP client for the portal backend's BI dashboard endpoints.

use std::time::Duration;

use riskboard_core::{
    DashboardPayload, DashboardQuery, ExportRequest, ExportResponse, parse_dashboard,
};
use serde::Deserialize;
use tracing::info;

use crate::FetchError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:58001/api/v1";

/// Connection settings for [`DashboardClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Like `http://localhost:58001/api/v1`; a trailing slash is trimmed.
    pub base_url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    /// Per-request timeout; expiry surfaces as [`FetchError::Http`].
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

/// FastAPI-style error body.
#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Client for `bi-tools/dashboard` and `bi-tools/export`.
pub struct DashboardClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl DashboardClient {
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch and validate one dashboard payload.
    ///
    /// Transport errors, non-2xx statuses, malformed JSON and schema
    /// violations all come back as [`FetchError`].
    pub async fn fetch_dashboard(
        &self,
        query: &DashboardQuery,
    ) -> Result<DashboardPayload, FetchError> {
        let url = format!("{}/bi-tools/dashboard", self.base_url);

        info!(url = %url, time_range = %query.time_range, "fetching dashboard data");
        let req = self.client.get(&url).query(&query.query_pairs());
        let resp = self.authorize(req).send().await?;
        let body = success_body(resp).await?;

        let payload = parse_dashboard(&body)?;
        info!(
            records = payload.heatmap_data.len(),
            trend_points = payload.risk_trends.len(),
            "fetched dashboard data"
        );
        Ok(payload)
    }

    /// Ask the backend to generate an export file.
    pub async fn export(&self, request: &ExportRequest) -> Result<ExportResponse, FetchError> {
        let url = format!("{}/bi-tools/export", self.base_url);

        info!(url = %url, data_type = ?request.data_type, format = ?request.format, "requesting export");
        let req = self.client.post(&url).json(request);
        let resp = self.authorize(req).send().await?;
        let body = success_body(resp).await?;

        let result: ExportResponse = serde_json::from_str(&body)?;
        info!(filename = %result.filename, "export ready");
        Ok(result)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

/// Return the body of a 2xx response, or a [`FetchError::Server`].
async fn success_body(resp: reqwest::Response) -> Result<String, FetchError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(FetchError::Server {
            status: status.as_u16(),
            body: error_detail(body),
        });
    }
    Ok(resp.text().await?)
}

/// Prefer the `detail` field of a JSON error body over the raw text.
fn error_detail(body: String) -> String {
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) => err.detail,
        Err(_) => body,
    }
}
