//! Token exchange
//!
//! Authorization codes and refresh tokens are traded for a token pair by a
//! small companion service that holds the OAuth client secret. This module
//! speaks that service's contract: `GET /api/access-token?code=` and
//! `GET /api/refresh-token?refreshToken=`, both answering with the
//! provider's token response or `400 {error, bungieError?}`.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::error::TokenError;

/// One grant to trade for tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeGrant<'a> {
    Code(&'a str),
    RefreshToken(&'a str),
}

/// Token pair as returned by the exchange service.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub membership_id: String,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub refresh_expires_in: i64,
}

#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self, grant: ExchangeGrant<'_>) -> Result<TokenResponse, TokenError>;
}

/// Exchange client over HTTP.
pub struct HttpTokenExchange {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpTokenExchange {
    pub fn new(base_url: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn endpoint(&self, grant: ExchangeGrant<'_>) -> Result<Url, TokenError> {
        let (path, key, value) = match grant {
            ExchangeGrant::Code(code) => ("api/access-token", "code", code),
            ExchangeGrant::RefreshToken(token) => ("api/refresh-token", "refreshToken", token),
        };
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| TokenError::Network(format!("invalid exchange URL: {}", e)))?;
        url.query_pairs_mut().append_pair(key, value);
        Ok(url)
    }
}

#[async_trait]
impl TokenExchange for HttpTokenExchange {
    async fn exchange(&self, grant: ExchangeGrant<'_>) -> Result<TokenResponse, TokenError> {
        let url = self.endpoint(grant)?;
        let kind = match grant {
            ExchangeGrant::Code(_) => "code",
            ExchangeGrant::RefreshToken(_) => "refresh token",
        };
        tracing::debug!("Exchanging {} for access token at {}", kind, url.path());

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| TokenError::Network(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| TokenError::Network(e.to_string()))?;

        decode_exchange_body(status.as_u16(), &body)
    }
}

/// Turn an exchange service body into a token response or a typed failure.
pub fn decode_exchange_body(status: u16, body: &str) -> Result<TokenResponse, TokenError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|e| {
        TokenError::MalformedResponse(format!("HTTP {} with non-JSON body: {}", status, e))
    })?;

    if let Some(error) = value.get("error") {
        let error = error
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| error.to_string());
        return Err(TokenError::Rejected {
            error,
            detail: value.get("bungieError").cloned(),
        });
    }

    let response: TokenResponse = serde_json::from_value(value)
        .map_err(|e| TokenError::MalformedResponse(e.to_string()))?;
    if response.access_token.as_deref().map_or(true, str::is_empty) {
        return Err(TokenError::MalformedResponse(body.to_string()));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_body() -> serde_json::Value {
        serde_json::json!({
            "access_token": "CKe",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "CPj",
            "refresh_expires_in": 7776000,
            "membership_id": "12345"
        })
    }

    #[test]
    fn test_decode_success() {
        let resp = decode_exchange_body(200, &token_body().to_string()).unwrap();
        assert_eq!(resp.access_token.as_deref(), Some("CKe"));
        assert_eq!(resp.expires_in, 3600);
        assert_eq!(resp.refresh_expires_in, 7776000);
        assert_eq!(resp.membership_id, "12345");
    }

    #[test]
    fn test_decode_error_body() {
        let body = r#"{"error":"Bungie Error","bungieError":{"error":"invalid_grant"}}"#;
        match decode_exchange_body(400, body) {
            Err(TokenError::Rejected { error, detail }) => {
                assert_eq!(error, "Bungie Error");
                assert_eq!(detail.unwrap()["error"], "invalid_grant");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_missing_access_token() {
        let body = r#"{"expires_in":3600,"membership_id":"1"}"#;
        assert!(matches!(
            decode_exchange_body(200, body),
            Err(TokenError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_decode_non_json() {
        assert!(matches!(
            decode_exchange_body(502, "<html>bad gateway</html>"),
            Err(TokenError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_code_grant_hits_access_token_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/access-token"))
            .and(query_param("code", "abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body()))
            .expect(1)
            .mount(&server)
            .await;

        let exchange = HttpTokenExchange::new(Url::parse(&server.uri()).unwrap());
        let resp = exchange.exchange(ExchangeGrant::Code("abc123")).await.unwrap();
        assert_eq!(resp.refresh_token.as_deref(), Some("CPj"));
    }

    #[tokio::test]
    async fn test_refresh_grant_hits_refresh_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/refresh-token"))
            .and(query_param("refreshToken", "CPj"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({"error": "No refreshToken"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let exchange = HttpTokenExchange::new(Url::parse(&server.uri()).unwrap());
        let err = exchange
            .exchange(ExchangeGrant::RefreshToken("CPj"))
            .await
            .unwrap_err();
        assert!(err.is_fatal());
    }
}
