//! Access token acquisition
//!
//! Three ways in: ambient (reuse what is stored, refreshing when the
//! access token has lapsed), an explicit authorization code, or an
//! explicit refresh token. Every successful exchange replaces the stored
//! record wholesale. No retries happen here.

use std::sync::Arc;

use super::error::TokenError;
use super::exchange::{ExchangeGrant, TokenExchange, TokenResponse};
use super::tokens::{Clock, SystemClock, Token, TokenKind, TokenSet, TokenStore};

/// How the caller wants a token obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// Use stored credentials only.
    Ambient,
    /// Trade an authorization code, ignoring anything stored.
    Code(String),
    /// Trade a specific refresh token.
    RefreshToken(String),
}

impl Grant {
    /// Build an explicit grant from optional caller inputs.
    ///
    /// Exactly one of the two must be present.
    pub fn from_parts(code: Option<String>, refresh_token: Option<String>) -> Result<Self, TokenError> {
        match (code, refresh_token) {
            (Some(_), Some(_)) => Err(TokenError::ConflictingGrant),
            (Some(code), None) if !code.is_empty() => Ok(Grant::Code(code)),
            (None, Some(token)) if !token.is_empty() => Ok(Grant::RefreshToken(token)),
            _ => Err(TokenError::MissingGrant),
        }
    }
}

/// Build the stored record from an exchange response.
///
/// Both tokens share one inception instant.
pub fn tokens_from_response(resp: TokenResponse, inception: i64) -> Result<TokenSet, TokenError> {
    let access = resp
        .access_token
        .ok_or_else(|| TokenError::MalformedResponse("no access_token".to_string()))?;

    let refresh_token = resp
        .refresh_token
        .map(|value| Token::new(value, resp.refresh_expires_in, TokenKind::Refresh, inception));

    Ok(TokenSet {
        bungie_membership_id: resp.membership_id,
        access_token: Some(Token::new(access, resp.expires_in, TokenKind::Access, inception)),
        refresh_token,
    })
}

/// Obtains valid bearer credentials against an injected store.
pub struct TokenAcquirer {
    store: Arc<dyn TokenStore>,
    exchange: Arc<dyn TokenExchange>,
    clock: Arc<dyn Clock>,
    // Concurrent ambient callers share one refresh.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl TokenAcquirer {
    pub fn new(store: Arc<dyn TokenStore>, exchange: Arc<dyn TokenExchange>) -> Self {
        Self::with_clock(store, exchange, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn TokenStore>,
        exchange: Arc<dyn TokenExchange>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            exchange,
            clock,
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub async fn acquire(&self, grant: Grant) -> Result<TokenSet, TokenError> {
        match grant {
            Grant::Ambient => self.acquire_ambient().await,
            Grant::Code(code) => self.exchange_and_store(ExchangeGrant::Code(&code)).await,
            Grant::RefreshToken(token) => {
                self.exchange_and_store(ExchangeGrant::RefreshToken(&token))
                    .await
            }
        }
    }

    /// Ambient acquisition, returning the access token to send.
    pub async fn access_token(&self) -> Result<Token, TokenError> {
        self.acquire_ambient()
            .await?
            .access_token
            .ok_or_else(|| TokenError::MalformedResponse("no access token after acquisition".into()))
    }

    fn valid_stored(&self) -> Option<TokenSet> {
        let tokens = self.store.get_token()?;
        let now = self.clock.now_millis();
        match &tokens.access_token {
            Some(access) if !access.has_expired_at(now) => Some(tokens),
            _ => None,
        }
    }

    async fn acquire_ambient(&self) -> Result<TokenSet, TokenError> {
        if let Some(tokens) = self.valid_stored() {
            tracing::debug!("Stored access token is valid");
            return Ok(tokens);
        }

        let _guard = self.refresh_lock.lock().await;
        // Someone else may have refreshed while we waited
        if let Some(tokens) = self.valid_stored() {
            tracing::debug!("Access token refreshed by a concurrent caller");
            return Ok(tokens);
        }

        let refresh = self
            .store
            .get_token()
            .and_then(|t| t.refresh_token)
            .ok_or(TokenError::NoRefreshToken)?;
        if refresh.has_expired_at(self.clock.now_millis()) {
            return Err(TokenError::RefreshTokenExpired);
        }

        tracing::info!("Access token missing or expired, refreshing...");
        self.exchange_and_store(ExchangeGrant::RefreshToken(&refresh.value))
            .await
    }

    async fn exchange_and_store(&self, grant: ExchangeGrant<'_>) -> Result<TokenSet, TokenError> {
        let resp = self.exchange.exchange(grant).await?;
        let tokens = tokens_from_response(resp, self.clock.now_millis())?;
        self.store.set_token(tokens.clone())?;
        tracing::info!(
            membership_id = %tokens.bungie_membership_id,
            "Stored new access token"
        );
        Ok(tokens)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Exchange that replays scripted outcomes and records every grant.
    #[derive(Default)]
    pub struct ScriptedExchange {
        pub calls: Mutex<Vec<String>>,
        outcomes: Mutex<VecDeque<Result<TokenResponse, TokenError>>>,
        delay: Option<std::time::Duration>,
    }

    impl ScriptedExchange {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_delay(delay: std::time::Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::default()
            }
        }

        pub fn push(&self, outcome: Result<TokenResponse, TokenError>) {
            self.outcomes.lock().unwrap().push_back(outcome);
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    pub fn response(access: &str) -> TokenResponse {
        TokenResponse {
            access_token: Some(access.to_string()),
            expires_in: 3600,
            membership_id: "4611686018".to_string(),
            refresh_token: Some(format!("{}-refresh", access)),
            refresh_expires_in: 7_776_000,
        }
    }

    #[async_trait]
    impl TokenExchange for ScriptedExchange {
        async fn exchange(&self, grant: ExchangeGrant<'_>) -> Result<TokenResponse, TokenError> {
            let label = match grant {
                ExchangeGrant::Code(c) => format!("code:{}", c),
                ExchangeGrant::RefreshToken(r) => format!("refresh:{}", r),
            };
            self.calls.lock().unwrap().push(label);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let next = self.outcomes.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(response("fresh")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{response, ScriptedExchange};
    use super::*;
    use crate::auth::tokens::test_support::{token_set, FixedClock};
    use crate::auth::tokens::MemoryTokenStore;
    use tokio_test::{assert_err, assert_ok};

    const NOW: i64 = 1_700_000_000_000;

    fn acquirer(
        store: Arc<MemoryTokenStore>,
        exchange: Arc<ScriptedExchange>,
    ) -> TokenAcquirer {
        TokenAcquirer::with_clock(store, exchange, Arc::new(FixedClock(NOW)))
    }

    #[test]
    fn test_grant_from_parts() {
        assert_eq!(
            Grant::from_parts(Some("c".into()), None).unwrap(),
            Grant::Code("c".into())
        );
        assert_eq!(
            Grant::from_parts(None, Some("r".into())).unwrap(),
            Grant::RefreshToken("r".into())
        );
        assert!(matches!(
            Grant::from_parts(Some("c".into()), Some("r".into())),
            Err(TokenError::ConflictingGrant)
        ));
        assert!(matches!(Grant::from_parts(None, None), Err(TokenError::MissingGrant)));
        assert!(matches!(
            Grant::from_parts(Some(String::new()), None),
            Err(TokenError::MissingGrant)
        ));
    }

    #[tokio::test]
    async fn test_conflicting_grant_makes_no_network_call() {
        let exchange = Arc::new(ScriptedExchange::new());
        let store = Arc::new(MemoryTokenStore::new());
        let acq = acquirer(store.clone(), exchange.clone());

        let result = match Grant::from_parts(Some("c".into()), Some("r".into())) {
            Ok(grant) => acq.acquire(grant).await.map(|_| ()),
            Err(e) => Err(e),
        };
        assert!(matches!(result, Err(TokenError::ConflictingGrant)));
        assert_eq!(exchange.call_count(), 0);
        assert!(store.get_token().is_none());
    }

    #[tokio::test]
    async fn test_valid_cached_token_makes_no_network_call() {
        let exchange = Arc::new(ScriptedExchange::new());
        let store = Arc::new(MemoryTokenStore::with_tokens(token_set(false, false, NOW)));
        let acq = acquirer(store, exchange.clone());

        let token = assert_ok!(acq.access_token().await);
        assert_eq!(token.value, "access-1");
        assert_eq!(exchange.call_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_access_refreshes_once_and_updates_store() {
        let exchange = Arc::new(ScriptedExchange::new());
        exchange.push(Ok(response("second")));
        let store = Arc::new(MemoryTokenStore::with_tokens(token_set(true, false, NOW)));
        let acq = acquirer(store.clone(), exchange.clone());

        let token = assert_ok!(acq.access_token().await);
        assert_eq!(token.value, "second");
        assert_eq!(token.inception, NOW);
        assert_eq!(*exchange.calls.lock().unwrap(), vec!["refresh:refresh-1".to_string()]);

        let stored = store.get_token().unwrap();
        assert_eq!(stored.access_token.unwrap().value, "second");
        assert_eq!(stored.refresh_token.unwrap().value, "second-refresh");
    }

    #[tokio::test]
    async fn test_missing_access_token_uses_refresh() {
        let exchange = Arc::new(ScriptedExchange::new());
        let store = Arc::new(MemoryTokenStore::with_tokens(token_set(false, false, NOW)));
        store.remove_access_token().unwrap();
        let acq = acquirer(store, exchange.clone());

        assert_ok!(acq.acquire(Grant::Ambient).await);
        assert_eq!(exchange.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_stored_tokens_is_fatal() {
        let exchange = Arc::new(ScriptedExchange::new());
        let acq = acquirer(Arc::new(MemoryTokenStore::new()), exchange.clone());

        let err = assert_err!(acq.acquire(Grant::Ambient).await);
        assert!(matches!(err, TokenError::NoRefreshToken));
        assert!(err.is_fatal());
        assert_eq!(exchange.call_count(), 0);
    }

    #[tokio::test]
    async fn test_expired_refresh_token_is_fatal() {
        let exchange = Arc::new(ScriptedExchange::new());
        let store = Arc::new(MemoryTokenStore::with_tokens(token_set(true, true, NOW)));
        let acq = acquirer(store, exchange.clone());

        let err = assert_err!(acq.acquire(Grant::Ambient).await);
        assert!(matches!(err, TokenError::RefreshTokenExpired));
        assert_eq!(exchange.call_count(), 0);
    }

    #[tokio::test]
    async fn test_code_grant_ignores_cached_state() {
        let exchange = Arc::new(ScriptedExchange::new());
        exchange.push(Ok(TokenResponse {
            refresh_token: None,
            ..response("by-code")
        }));
        let store = Arc::new(MemoryTokenStore::with_tokens(token_set(false, false, NOW)));
        let acq = acquirer(store.clone(), exchange.clone());

        let tokens = assert_ok!(acq.acquire(Grant::Code("xyz".into())).await);
        assert_eq!(*exchange.calls.lock().unwrap(), vec!["code:xyz".to_string()]);
        // Full replacement: the old refresh token does not survive
        assert!(tokens.refresh_token.is_none());
        assert_eq!(store.get_token().unwrap(), tokens);
    }

    #[tokio::test]
    async fn test_exchange_failure_propagates_unchanged() {
        let exchange = Arc::new(ScriptedExchange::new());
        exchange.push(Err(TokenError::Network("connection reset".into())));
        let store = Arc::new(MemoryTokenStore::with_tokens(token_set(true, false, NOW)));
        let acq = acquirer(store.clone(), exchange.clone());

        let err = assert_err!(acq.acquire(Grant::Ambient).await);
        assert!(matches!(err, TokenError::Network(ref m) if m == "connection reset"));
        // Store untouched on failure
        assert_eq!(store.get_token().unwrap().access_token.unwrap().value, "access-1");
        assert_eq!(exchange.call_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_ambient_callers_share_refresh() {
        let exchange = Arc::new(ScriptedExchange::with_delay(std::time::Duration::from_millis(20)));
        let store = Arc::new(MemoryTokenStore::with_tokens(token_set(true, false, NOW)));
        let acq = Arc::new(acquirer(store, exchange.clone()));

        let (a, b) = tokio::join!(acq.access_token(), acq.access_token());
        assert_eq!(a.unwrap().value, "fresh");
        assert_eq!(b.unwrap().value, "fresh");
        assert_eq!(exchange.call_count(), 1);
    }

    #[test]
    fn test_tokens_from_response_shares_inception() {
        let tokens = tokens_from_response(response("a"), 99).unwrap();
        let access = tokens.access_token.unwrap();
        let refresh = tokens.refresh_token.unwrap();
        assert_eq!(access.inception, 99);
        assert_eq!(refresh.inception, 99);
        assert_eq!(access.name, TokenKind::Access);
        assert_eq!(refresh.name, TokenKind::Refresh);
        assert_eq!(refresh.expires, 7_776_000);
    }
}
