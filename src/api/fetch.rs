//! Authenticated fetch
//!
//! Attaches the bearer token to every request. When the platform says the
//! token is no longer good, the access token is dropped and the request is
//! sent once more with a fresh one. A second rejection is fatal.

use std::sync::Arc;

use async_trait::async_trait;

use super::codes::PlatformErrorCode;
use super::error::ApiError;
use super::transport::{Fetcher, HttpRequest, RawResponse};
use crate::auth::{TokenAcquirer, TokenError};

/// Outcome of one authenticated attempt.
enum Attempt {
    Accepted(RawResponse),
    TokenRejected,
}

pub struct AuthenticatedFetcher<F> {
    inner: F,
    tokens: Arc<TokenAcquirer>,
}

impl<F: Fetcher> AuthenticatedFetcher<F> {
    pub fn new(inner: F, tokens: Arc<TokenAcquirer>) -> Self {
        Self { inner, tokens }
    }

    /// Drop every stored credential. Failures are logged, never raised.
    fn clear_tokens(&self) {
        if let Err(e) = self.tokens.store().remove_token() {
            tracing::warn!("Failed to clear stored tokens: {}", e);
        }
    }

    async fn attempt(&self, request: &HttpRequest) -> Result<Attempt, ApiError> {
        let token = match self.tokens.access_token().await {
            Ok(token) => token,
            Err(e) if e.is_fatal() => {
                tracing::warn!(
                    "Unable to get auth token, clearing stored tokens. Run 'guardian-cli login'. {}",
                    e
                );
                self.clear_tokens();
                return Err(ApiError::FatalToken(e.to_string()));
            }
            Err(e) => return Err(token_error_to_api(e)),
        };

        let mut request = request.clone();
        request.set_header("Authorization", format!("Bearer {}", token.value));

        let response = self.inner.fetch(request).await?;
        if response_indicates_bad_token(&response) {
            Ok(Attempt::TokenRejected)
        } else {
            Ok(Attempt::Accepted(response))
        }
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for AuthenticatedFetcher<F> {
    async fn fetch(&self, request: HttpRequest) -> Result<RawResponse, ApiError> {
        if let Attempt::Accepted(response) = self.attempt(&request).await? {
            return Ok(response);
        }

        tracing::info!("Access token rejected, removing access token and trying again");
        if let Err(e) = self.tokens.store().remove_access_token() {
            tracing::warn!("Failed to remove access token: {}", e);
        }

        match self.attempt(&request).await? {
            Attempt::Accepted(response) => Ok(response),
            Attempt::TokenRejected => {
                self.clear_tokens();
                Err(ApiError::FatalToken(
                    "access token rejected again after refresh".to_string(),
                ))
            }
        }
    }
}

fn token_error_to_api(error: TokenError) -> ApiError {
    match error {
        TokenError::Network(msg) => ApiError::Network(msg),
        TokenError::MalformedResponse(msg) => ApiError::Parse(msg),
        other => ApiError::Internal(other.to_string()),
    }
}

/// A 401, or a JSON body whose `ErrorCode` says the token is no good.
pub fn response_indicates_bad_token(response: &RawResponse) -> bool {
    if response.status == 401 {
        return true;
    }
    response
        .json()
        .ok()
        .and_then(|body| body.get("ErrorCode").cloned())
        .and_then(|code| serde_json::from_value::<PlatformErrorCode>(code).ok())
        .map_or(false, PlatformErrorCode::indicates_bad_token)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::transport::test_support::ScriptedFetcher;
    use crate::auth::oauth::test_support::{response, ScriptedExchange};
    use crate::auth::tokens::test_support::{token_set, FixedClock};
    use crate::auth::{MemoryTokenStore, TokenStore};

    const NOW: i64 = 1_700_000_000_000;

    struct Harness {
        store: Arc<MemoryTokenStore>,
        exchange: Arc<ScriptedExchange>,
        fetcher: AuthenticatedFetcher<Arc<ScriptedFetcher>>,
        scripted: Arc<ScriptedFetcher>,
    }

    fn harness(tokens: Option<crate::auth::TokenSet>) -> Harness {
        let store = Arc::new(match tokens {
            Some(t) => MemoryTokenStore::with_tokens(t),
            None => MemoryTokenStore::new(),
        });
        let exchange = Arc::new(ScriptedExchange::new());
        let acquirer = Arc::new(TokenAcquirer::with_clock(
            store.clone(),
            exchange.clone(),
            Arc::new(FixedClock(NOW)),
        ));
        let scripted = Arc::new(ScriptedFetcher::new());
        Harness {
            store,
            exchange,
            fetcher: AuthenticatedFetcher::new(scripted.clone(), acquirer),
            scripted,
        }
    }

    fn expired_body() -> serde_json::Value {
        json!({"ErrorCode": 2111, "ErrorStatus": "AccessTokenHasExpired", "Message": "expired"})
    }

    #[test]
    fn test_bad_token_detection() {
        assert!(response_indicates_bad_token(&RawResponse::new(401, "")));
        assert!(response_indicates_bad_token(&RawResponse::new(200, expired_body().to_string())));
        assert!(response_indicates_bad_token(&RawResponse::new(
            200,
            json!({"ErrorCode": 99}).to_string()
        )));
        assert!(!response_indicates_bad_token(&RawResponse::new(
            200,
            json!({"ErrorCode": 1, "Response": {}}).to_string()
        )));
        assert!(!response_indicates_bad_token(&RawResponse::new(500, "oops")));
        assert!(!response_indicates_bad_token(&RawResponse::new(403, "")));
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let h = harness(Some(token_set(false, false, NOW)));
        h.scripted.push_json(200, json!({"ErrorCode": 1, "Response": 5}));

        let resp = h.fetcher.fetch(HttpRequest::get("https://x/Platform/A/")).await.unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(h.scripted.count(), 1);
        assert_eq!(h.scripted.request(0).header("Authorization"), Some("Bearer access-1"));
        assert_eq!(h.exchange.call_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_code_retries_once_with_fresh_token() {
        let h = harness(Some(token_set(false, false, NOW)));
        h.exchange.push(Ok(response("second")));
        h.scripted.push_json(200, expired_body());
        h.scripted.push_json(200, json!({"ErrorCode": 1, "Response": 5}));

        let mut request = HttpRequest::get("https://x/Platform/A/");
        request.method = reqwest::Method::POST;
        request.body = Some("{\"itemId\":\"1\"}".into());
        let resp = h.fetcher.fetch(request).await.unwrap();

        assert_eq!(resp.json().unwrap()["Response"], 5);
        assert_eq!(h.scripted.count(), 2);
        assert_eq!(h.exchange.call_count(), 1);
        let retry = h.scripted.request(1);
        assert_eq!(retry.header("Authorization"), Some("Bearer second"));
        // The body goes out again on the retry
        assert_eq!(retry.body.as_deref(), Some("{\"itemId\":\"1\"}"));
        assert_eq!(h.store.get_token().unwrap().access_token.unwrap().value, "second");
    }

    #[tokio::test]
    async fn test_second_rejection_is_fatal_and_clears_store() {
        let h = harness(Some(token_set(false, false, NOW)));
        h.scripted.push_json(200, expired_body());
        h.scripted.push(Ok(RawResponse::new(401, "")));

        let err = h.fetcher.fetch(HttpRequest::get("https://x/")).await.unwrap_err();
        assert!(matches!(err, ApiError::FatalToken(_)));
        assert_eq!(h.scripted.count(), 2);
        assert!(h.store.get_token().is_none());
    }

    #[tokio::test]
    async fn test_401_clears_only_access_token_before_retry() {
        let h = harness(Some(token_set(false, false, NOW)));
        h.scripted.push(Ok(RawResponse::new(401, "")));
        // Refresh fails transiently, so the refresh token must still be there
        h.exchange.push(Err(TokenError::Network("reset".into())));

        let err = h.fetcher.fetch(HttpRequest::get("https://x/")).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)));
        let stored = h.store.get_token().unwrap();
        assert!(stored.access_token.is_none());
        assert_eq!(stored.refresh_token.unwrap().value, "refresh-1");
        assert_eq!(h.scripted.count(), 1);
    }

    #[tokio::test]
    async fn test_no_credentials_is_fatal_without_request() {
        let h = harness(None);
        let err = h.fetcher.fetch(HttpRequest::get("https://x/")).await.unwrap_err();
        assert!(matches!(err, ApiError::FatalToken(_)));
        assert_eq!(h.scripted.count(), 0);
        assert_eq!(h.exchange.call_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_refresh_clears_everything() {
        let h = harness(Some(token_set(true, false, NOW)));
        h.exchange.push(Err(TokenError::Rejected {
            error: "Bungie Error".into(),
            detail: None,
        }));

        let err = h.fetcher.fetch(HttpRequest::get("https://x/")).await.unwrap_err();
        assert!(matches!(err, ApiError::FatalToken(_)));
        assert!(h.store.get_token().is_none());
        assert_eq!(h.scripted.count(), 0);
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let h = harness(Some(token_set(false, false, NOW)));
        h.scripted.push(Err(ApiError::Network("dns".into())));

        let err = h.fetcher.fetch(HttpRequest::get("https://x/")).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(ref m) if m == "dns"));
        assert!(h.store.get_token().unwrap().access_token.is_some());
    }
}
