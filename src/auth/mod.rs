//! Authentication module for the Bungie.net platform
//!
//! Keeps the OAuth token pair on disk, trades codes and refresh tokens
//! through the token exchange service, and builds the browser login URL.

pub mod error;
pub mod exchange;
pub mod oauth;
pub mod store;
pub mod tokens;

use anyhow::Result;
use oauth2::{basic::BasicClient, AuthUrl, ClientId, CsrfToken, TokenUrl};
use url::Url;

pub use error::TokenError;
pub use exchange::{HttpTokenExchange, TokenExchange};
pub use oauth::{Grant, TokenAcquirer};
pub use store::FileTokenStore;
pub use tokens::{has_token_expired, MemoryTokenStore, Token, TokenSet, TokenStore};

/// OAuth endpoints of the platform
pub struct AuthConfig {
    /// Public OAuth client ID
    pub client_id: String,
    /// Browser authorization page
    pub authorize_url: &'static str,
    /// Provider token endpoint (only the exchange service talks to it)
    pub token_url: &'static str,
}

impl AuthConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            authorize_url: "https://www.bungie.net/en/OAuth/Authorize",
            token_url: "https://www.bungie.net/platform/app/oauth/token/",
        }
    }
}

/// Build the URL a user opens to grant access, plus the CSRF state to
/// compare on return.
pub fn authorize_url(auth_config: &AuthConfig) -> Result<(Url, CsrfToken)> {
    let client = BasicClient::new(
        ClientId::new(auth_config.client_id.clone()),
        None,
        AuthUrl::new(auth_config.authorize_url.to_string())?,
        Some(TokenUrl::new(auth_config.token_url.to_string())?),
    );
    Ok(client.authorize_url(CsrfToken::new_random).url())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url_carries_client_and_code_flow() {
        let (url, state) = authorize_url(&AuthConfig::new("12345")).unwrap();
        assert_eq!(url.host_str(), Some("www.bungie.net"));
        assert_eq!(url.path(), "/en/OAuth/Authorize");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".to_string(), "12345".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("state".to_string(), state.secret().clone())));
    }
}
