//! HTTP client for the inventory/sensor REST backend.
//!
//! All endpoints are plain `GET`s returning JSON. Status codes are mapped to
//! [`ClientError`] classifications so callers can tell a removed resource
//! (404) or an expired session (401/403) apart from other failures.

use std::time::Duration;

use ontap_core::{
    BeverageMetadata, Location, LocationIdentifier, RefreshSettings, SensorIdentity, Tap, TapId,
};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use crate::client::{BoxFuture, ResourceClient};
use crate::error::{ClientError, ClientResult};

/// Default timeout for API requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`HttpResourceClient`].
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Backend base URL (e.g., "https://api.example.com/v1").
    pub base_url: String,
    /// Bearer token attached to every request, if any.
    pub token: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HttpClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// reqwest-backed [`ResourceClient`].
pub struct HttpResourceClient {
    /// HTTP client.
    client: Client,
    /// Backend base URL.
    base_url: Url,
    /// Optional bearer token.
    token: Option<String>,
}

impl HttpResourceClient {
    /// Create a new client.
    pub fn new(config: HttpClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::HttpClient(format!("Invalid base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::HttpClient(format!(
                "Base URL cannot carry a path: {}",
                config.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            token: config.token.filter(|t| !t.is_empty()),
        })
    }

    /// Build `{base}/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> ClientResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::HttpClient("Base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issue a GET and return the JSON body, mapping non-2xx statuses.
    async fn get_value(&self, segments: &[&str]) -> ClientResult<Value> {
        let url = self.endpoint(segments)?;
        trace!(url = %url, "GET");

        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Transport(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(url = %url, %status, "Backend returned error status");
            return Err(classify_status(status, &body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(format!("Failed to read response: {e}")))?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ClientError::Decode(format!("Failed to parse response from {url}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> ClientResult<T> {
        let value = self.get_value(segments).await?;
        serde_json::from_value(value).map_err(|e| {
            ClientError::Decode(format!("Unexpected shape for /{}: {e}", segments.join("/")))
        })
    }
}

/// Map an error status and its body to a classified error.
fn classify_status(status: StatusCode, body: &str) -> ClientError {
    let message = backend_message(body).unwrap_or_else(|| {
        if body.trim().is_empty() {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        } else {
            body.trim().to_string()
        }
    });

    match status {
        StatusCode::NOT_FOUND => ClientError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ClientError::Unauthorized(message),
        _ => ClientError::Status {
            status: status.as_u16(),
            message,
        },
    }
}

/// Extract `message` (or `error`) from a JSON error body.
fn backend_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

/// Interpret a metric endpoint body.
///
/// Accepts a bare number, a numeric string, `{"value": n}` or `null`.
/// Missing values count as 0.
fn parse_metric(value: &Value) -> ClientResult<f64> {
    match value {
        Value::Null => Ok(0.0),
        Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| ClientError::Decode(format!("Metric is not numeric: {e}"))),
        Value::Object(map) => match map.get("value") {
            Some(inner) => parse_metric(inner),
            None => Ok(0.0),
        },
        other => Err(ClientError::Decode(format!(
            "Unexpected metric payload: {other}"
        ))),
    }
}

/// Interpret the unit endpoint body: a string, `{"unit": ..}` or `{"value": ..}`.
fn parse_unit(value: &Value) -> ClientResult<String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Object(map) => map
            .get("unit")
            .or_else(|| map.get("value"))
            .map_or(Ok(String::new()), parse_unit),
        other => Err(ClientError::Decode(format!(
            "Unexpected unit payload: {other}"
        ))),
    }
}

impl ResourceClient for HttpResourceClient {
    fn get_refresh_settings(&self) -> BoxFuture<'_, ClientResult<RefreshSettings>> {
        Box::pin(async move {
            let settings: RefreshSettings = self.get_json(&["settings", "refresh"]).await?;
            settings
                .validate()
                .map_err(|e| ClientError::Decode(e.to_string()))?;
            Ok(settings)
        })
    }

    fn get_location<'a>(
        &'a self,
        identifier: &'a LocationIdentifier,
    ) -> BoxFuture<'a, ClientResult<Location>> {
        Box::pin(async move { self.get_json(&["locations", identifier.as_str()]).await })
    }

    fn get_taps<'a>(&'a self, location_id: &'a str) -> BoxFuture<'a, ClientResult<Vec<Tap>>> {
        Box::pin(async move {
            let value = self.get_value(&["locations", location_id, "taps"]).await?;
            if value.is_null() {
                return Ok(Vec::new());
            }
            Ok(serde_json::from_value(value)?)
        })
    }

    fn get_tap<'a>(&'a self, tap_id: &'a TapId) -> BoxFuture<'a, ClientResult<Tap>> {
        Box::pin(async move { self.get_json(&["taps", tap_id.as_str()]).await })
    }

    fn get_beverage_metadata<'a>(
        &'a self,
        id: &'a str,
    ) -> BoxFuture<'a, ClientResult<BeverageMetadata>> {
        Box::pin(async move { self.get_json(&["beverages", id]).await })
    }

    fn get_sensor<'a>(&'a self, sensor_id: &'a str) -> BoxFuture<'a, ClientResult<SensorIdentity>> {
        Box::pin(async move { self.get_json(&["sensors", sensor_id]).await })
    }

    fn get_sensor_percent_remaining<'a>(
        &'a self,
        sensor_id: &'a str,
    ) -> BoxFuture<'a, ClientResult<f64>> {
        Box::pin(async move {
            let value = self
                .get_value(&["sensors", sensor_id, "percent-remaining"])
                .await?;
            parse_metric(&value)
        })
    }

    fn get_sensor_total_remaining<'a>(
        &'a self,
        sensor_id: &'a str,
    ) -> BoxFuture<'a, ClientResult<f64>> {
        Box::pin(async move {
            let value = self
                .get_value(&["sensors", sensor_id, "total-remaining"])
                .await?;
            parse_metric(&value)
        })
    }

    fn get_sensor_unit<'a>(&'a self, sensor_id: &'a str) -> BoxFuture<'a, ClientResult<String>> {
        Box::pin(async move {
            let value = self.get_value(&["sensors", sensor_id, "unit"]).await?;
            parse_unit(&value)
        })
    }
}
