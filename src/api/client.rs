//! Platform API client
//!
//! Builds the request pipeline once and exposes typed calls that return
//! classified errors.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::base::PlatformTransport;
use super::classify::{classify, NetworkStatus};
use super::codes::PlatformErrorCode;
use super::error::{ApiError, ServiceError};
use super::fetch::AuthenticatedFetcher;
use super::middleware::{
    RateLimitStage, SlowResponseNotifier, ThrottleStage, TimeoutStage, TraceStage,
    DEFAULT_TIMEOUT,
};
use super::pipeline::{ApiRequest, Pipeline};
use super::transport::{Fetcher, ReqwestFetcher};
use crate::auth::TokenAcquirer;

pub const DEFAULT_API_BASE: &str = "https://www.bungie.net";

/// Envelope every platform endpoint wraps its payload in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerResponse<T> {
    #[serde(rename = "Response")]
    pub response: T,
    #[serde(rename = "ErrorCode")]
    pub error_code: PlatformErrorCode,
    #[serde(rename = "ErrorStatus", default)]
    pub error_status: Option<String>,
    #[serde(rename = "Message", default)]
    pub message: Option<String>,
}

/// Client for one flavor of access (authenticated or not).
#[derive(Clone)]
pub struct ApiClient {
    pipeline: Arc<Pipeline>,
    base_url: String,
    network: NetworkStatus,
}

impl ApiClient {
    /// Calls carry the user's bearer token and retry once after a refresh.
    pub fn authenticated(
        api_key: &str,
        base_url: &str,
        tokens: Arc<TokenAcquirer>,
        network: NetworkStatus,
    ) -> Self {
        let fetcher = AuthenticatedFetcher::new(ReqwestFetcher::new(), tokens);
        Self::with_fetcher(Arc::new(fetcher), api_key, base_url, network)
    }

    /// Calls carry only the API key (manifest, public data).
    pub fn unauthenticated(api_key: &str, base_url: &str, network: NetworkStatus) -> Self {
        Self::with_fetcher(Arc::new(ReqwestFetcher::new()), api_key, base_url, network)
    }

    /// Build the standard pipeline over any transport.
    pub fn with_fetcher(
        fetcher: Arc<dyn Fetcher>,
        api_key: &str,
        base_url: &str,
        network: NetworkStatus,
    ) -> Self {
        let pipeline = platform_pipeline(fetcher, api_key, &network, DEFAULT_TIMEOUT);
        Self {
            pipeline: Arc::new(pipeline),
            base_url: base_url.trim_end_matches('/').to_string(),
            network,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn network(&self) -> &NetworkStatus {
        &self.network
    }

    /// Absolute URL for a path such as `/Platform/User/...`.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send a request and classify any failure.
    pub async fn send(&self, request: ApiRequest) -> Result<Value, ServiceError> {
        self.pipeline
            .send(request)
            .await
            .map_err(|e| self.service_error(e))
    }

    /// Send a request and decode the envelope's `Response`.
    pub async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ServiceError> {
        let url = request.url.clone();
        let body = self.send(request).await?;
        let envelope: ServerResponse<T> = serde_json::from_value(body).map_err(|e| {
            tracing::debug!(url = %url, "Unexpected response shape: {}", e);
            self.service_error(ApiError::Parse(format!("{}: {}", url, e)))
        })?;
        Ok(envelope.response)
    }

    /// GET `path` with query parameters.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let mut request = ApiRequest::get(self.url(path));
        for (key, value) in params {
            request = request.param(key, value.clone());
        }
        self.call(request).await
    }

    /// POST a JSON body to `path`.
    pub async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T, ServiceError> {
        self.call(ApiRequest::post(self.url(path), body)).await
    }

    fn service_error(&self, source: ApiError) -> ServiceError {
        let category = classify(&source, self.network.connectivity());
        ServiceError { category, source }
    }
}

/// Stage order, outermost first. The timeout covers time spent waiting
/// on the rate limiter.
fn platform_pipeline(
    fetcher: Arc<dyn Fetcher>,
    api_key: &str,
    network: &NetworkStatus,
    timeout: Duration,
) -> Pipeline {
    let notifier = Arc::new(SlowResponseNotifier::new(network.clone()));
    Pipeline::new(Arc::new(PlatformTransport::new(fetcher, api_key)))
        .with_stage(TraceStage)
        .with_stage(ThrottleStage::new())
        .with_stage(TimeoutStage::new(timeout, notifier))
        .with_stage(RateLimitStage::platform_defaults())
}
