//! Raw HTTP transport
//!
//! A [`Fetcher`] sends one fully-formed request and hands back the buffered
//! response. Buffering means a response can be inspected more than once and
//! a request can be sent again unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;

use super::error::ApiError;

/// A request ready to go on the wire. Cloning is cheap enough to resend.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Buffered HTTP response.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            status_text,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: HttpRequest) -> Result<RawResponse, ApiError>;
}

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn fetch(&self, request: HttpRequest) -> Result<RawResponse, ApiError> {
        (**self).fetch(request).await
    }
}

/// Plain transport over reqwest.
#[derive(Clone, Default)]
pub struct ReqwestFetcher {
    http: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: HttpRequest) -> Result<RawResponse, ApiError> {
        let mut builder = self.http.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| ApiError::Network(format!("{} {}: {}", request.method, request.url, e)))?;
        let status = resp.status();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Network(format!("reading body of {}: {}", request.url, e)))?;

        Ok(RawResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: body.to_vec(),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut req = HttpRequest::get("http://x");
        req.set_header("Authorization", "Bearer a");
        req.set_header("authorization", "Bearer b");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("AUTHORIZATION"), Some("Bearer b"));
    }

    #[test]
    fn test_raw_response_status_text() {
        let resp = RawResponse::new(404, "nope");
        assert_eq!(resp.status_text, "Not Found");
        assert!(!resp.is_ok());
        assert!(resp.json().is_err());
    }

    #[tokio::test]
    async fn test_reqwest_fetcher_sends_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Platform/Echo/"))
            .and(header("X-API-Key", "key"))
            .and(body_string("{\"a\":1}"))
            .respond_with(ResponseTemplate::new(201).set_body_string("{\"ok\":true}"))
            .expect(1)
            .mount(&server)
            .await;

        let mut req = HttpRequest::get(format!("{}/Platform/Echo/", server.uri()));
        req.method = Method::POST;
        req.set_header("X-API-Key", "key");
        req.body = Some("{\"a\":1}".to_string());

        let resp = ReqwestFetcher::new().fetch(req).await.unwrap();
        assert_eq!(resp.status, 201);
        assert_eq!(resp.json().unwrap()["ok"], true);
    }

    #[tokio::test]
    async fn test_reqwest_fetcher_connection_refused_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = ReqwestFetcher::new()
            .fetch(HttpRequest::get(format!("http://{}/", addr)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
    }
}
