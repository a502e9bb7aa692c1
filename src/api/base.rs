//! Terminal pipeline stage: the platform HTTP call itself

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::error::{ApiError, ErrorPayload};
use super::pipeline::{ApiRequest, Endpoint};
use super::transport::{Fetcher, HttpRequest, RawResponse};

/// Serializes the request, adds the API key, and decodes the reply.
pub struct PlatformTransport {
    fetcher: Arc<dyn Fetcher>,
    api_key: String,
}

impl PlatformTransport {
    pub fn new(fetcher: Arc<dyn Fetcher>, api_key: impl Into<String>) -> Self {
        Self {
            fetcher,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl Endpoint for PlatformTransport {
    async fn call(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let url = request.full_url();
        let mut http = HttpRequest::get(url.clone());
        http.method = request.method.clone();
        http.set_header("X-API-Key", self.api_key.as_str());
        if let Some(body) = &request.body {
            let encoded = serde_json::to_string(body)
                .map_err(|e| ApiError::Internal(format!("failed to encode request body: {}", e)))?;
            http.body = Some(encoded);
            http.set_header("Content-Type", "application/json");
        }

        let response = self.fetcher.fetch(http).await?;
        promote_response(&response, &url)
    }
}

/// Decide what a response means, in fixed priority order:
/// platform error payload, then HTTP status, then JSON parse failure.
pub fn promote_response(response: &RawResponse, endpoint: &str) -> Result<Value, ApiError> {
    let parsed = response.json();

    if let Ok(body) = &parsed {
        if let Some(payload) = ErrorPayload::detect(body) {
            return Err(ApiError::Platform(payload.into_error(endpoint)));
        }
    }

    if !(200..400).contains(&response.status) {
        return Err(ApiError::HttpStatus {
            status: i32::from(response.status),
            status_text: response.status_text.clone(),
        });
    }

    parsed.map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::codes::PlatformErrorCode;
    use crate::api::transport::test_support::ScriptedFetcher;

    #[test]
    fn test_platform_error_beats_http_status() {
        let resp = RawResponse::new(503, json!({"ErrorCode": 5, "ErrorStatus": "SystemDisabled", "Message": "down"}).to_string());
        match promote_response(&resp, "https://x/Platform/A/") {
            Err(ApiError::Platform(e)) => {
                assert_eq!(e.code, PlatformErrorCode::SYSTEM_DISABLED);
                assert_eq!(e.endpoint, "https://x/Platform/A/");
            }
            other => panic!("expected platform error, got {:?}", other),
        }
    }

    #[test]
    fn test_platform_error_on_success_status() {
        let resp = RawResponse::new(200, json!({"ErrorCode": 1627, "Message": "no vendor"}).to_string());
        let err = promote_response(&resp, "u").unwrap_err();
        assert_eq!(err.platform_code(), Some(PlatformErrorCode::DESTINY_VENDOR_NOT_FOUND));
    }

    #[test]
    fn test_http_status_beats_parse_error() {
        let resp = RawResponse::new(502, "<html>Bad Gateway</html>");
        assert!(matches!(
            promote_response(&resp, "u"),
            Err(ApiError::HttpStatus { status: 502, .. })
        ));
    }

    #[test]
    fn test_http_status_with_plain_json_body() {
        let resp = RawResponse::new(404, json!({"detail": "missing"}).to_string());
        assert!(matches!(
            promote_response(&resp, "u"),
            Err(ApiError::HttpStatus { status: 404, .. })
        ));
    }

    #[test]
    fn test_parse_error_on_ok_status() {
        let resp = RawResponse::new(200, "not json");
        assert!(matches!(promote_response(&resp, "u"), Err(ApiError::Parse(_))));
    }

    #[test]
    fn test_redirect_range_counts_as_ok() {
        let resp = RawResponse::new(304, json!({"ErrorCode": 1, "Response": 1}).to_string());
        assert!(promote_response(&resp, "u").is_ok());
    }

    #[test]
    fn test_success_returns_body() {
        let body = json!({"ErrorCode": 1, "ErrorStatus": "Success", "Response": {"a": 1}});
        let resp = RawResponse::new(200, body.to_string());
        assert_eq!(promote_response(&resp, "u").unwrap(), body);
    }

    #[tokio::test]
    async fn test_transport_sets_key_and_json_body() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push_json(200, json!({"ErrorCode": 1, "Response": true}));
        let transport = PlatformTransport::new(fetcher.clone(), "my-key");

        let request = ApiRequest::post("https://x/Platform/Act/", json!({"a": 1})).param("p", "2");
        transport.call(request).await.unwrap();

        let sent = fetcher.request(0);
        assert_eq!(sent.url, "https://x/Platform/Act/?p=2");
        assert_eq!(sent.method, reqwest::Method::POST);
        assert_eq!(sent.header("X-API-Key"), Some("my-key"));
        assert_eq!(sent.header("Content-Type"), Some("application/json"));
        assert_eq!(sent.body.as_deref(), Some("{\"a\":1}"));
    }

    #[tokio::test]
    async fn test_get_has_no_content_type() {
        let fetcher = Arc::new(ScriptedFetcher::new());
        fetcher.push_json(200, json!({"ErrorCode": 1, "Response": true}));
        let transport = PlatformTransport::new(fetcher.clone(), "k");

        transport.call(ApiRequest::get("https://x/")).await.unwrap();
        let sent = fetcher.request(0);
        assert_eq!(sent.header("Content-Type"), None);
        assert!(sent.body.is_none());
    }
}
