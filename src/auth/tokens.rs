//! Token model and storage abstraction

use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

/// Which grant a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// A single credential with its expiry bookkeeping.
///
/// `expires` is counted in seconds from `inception` (epoch millis).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    pub expires: i64,
    pub name: TokenKind,
    pub inception: i64,
}

impl Token {
    pub fn new(value: String, expires: i64, name: TokenKind, inception: i64) -> Self {
        Self {
            value,
            expires,
            name,
            inception,
        }
    }

    /// Instant (epoch millis) from which the token is no longer usable.
    pub fn expires_at(&self) -> i64 {
        self.inception.saturating_add(self.expires.saturating_mul(1000))
    }

    /// True iff `now_millis` is at or past the expiry instant. No skew grace.
    pub fn has_expired_at(&self, now_millis: i64) -> bool {
        now_millis >= self.expires_at()
    }
}

/// The credential record kept in storage.
///
/// `access_token` is `None` after the access token alone was invalidated;
/// the refresh token survives so the next acquisition can mint a new one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub bungie_membership_id: String,
    pub access_token: Option<Token>,
    pub refresh_token: Option<Token>,
}

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Check a token against the wall clock.
pub fn has_token_expired(token: &Token) -> bool {
    token.has_expired_at(SystemClock.now_millis())
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to access token storage: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode stored tokens: {0}")]
    Decode(#[from] toml::de::Error),
    #[error("failed to encode tokens: {0}")]
    Encode(#[from] toml::ser::Error),
}

/// Token store trait for different storage backends
///
/// Implementations are shared behind `Arc` and use interior mutability.
/// There is no locking across calls; the last writer wins.
pub trait TokenStore: Send + Sync {
    fn get_token(&self) -> Option<TokenSet>;
    /// Replace the stored record wholesale.
    fn set_token(&self, tokens: TokenSet) -> Result<(), StoreError>;
    fn remove_token(&self) -> Result<(), StoreError>;
    /// Drop only the access token, keeping the refresh token.
    fn remove_access_token(&self) -> Result<(), StoreError>;
}

/// Process-local store, used in tests and for one-shot sessions.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: Mutex<Option<TokenSet>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenSet) -> Self {
        Self {
            inner: Mutex::new(Some(tokens)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<TokenSet>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn get_token(&self) -> Option<TokenSet> {
        self.lock().clone()
    }

    fn set_token(&self, tokens: TokenSet) -> Result<(), StoreError> {
        *self.lock() = Some(tokens);
        Ok(())
    }

    fn remove_token(&self) -> Result<(), StoreError> {
        *self.lock() = None;
        Ok(())
    }

    fn remove_access_token(&self) -> Result<(), StoreError> {
        if let Some(tokens) = self.lock().as_mut() {
            tokens.access_token = None;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires: i64, inception: i64) -> Token {
        Token::new("abc".to_string(), expires, TokenKind::Access, inception)
    }

    #[test]
    fn test_expiry_exact_boundary() {
        let t = token(3600, 1_000_000);
        assert_eq!(t.expires_at(), 1_000_000 + 3_600_000);
        assert!(!t.has_expired_at(1_000_000 + 3_600_000 - 1));
        assert!(t.has_expired_at(1_000_000 + 3_600_000));
        assert!(t.has_expired_at(1_000_000 + 3_600_000 + 1));
    }

    #[test]
    fn test_zero_lifetime_expires_at_inception() {
        let t = token(0, 42);
        assert!(!t.has_expired_at(41));
        assert!(t.has_expired_at(42));
    }

    #[test]
    fn test_wall_clock_expiry() {
        let now = SystemClock.now_millis();
        assert!(has_token_expired(&token(10, now - 10_000)));
        assert!(!has_token_expired(&token(3600, now)));
    }

    #[test]
    fn test_memory_store_remove_access_keeps_refresh() {
        let store = MemoryTokenStore::with_tokens(test_support::token_set(false, false, 10_000_000));
        store.remove_access_token().unwrap();

        let tokens = store.get_token().unwrap();
        assert!(tokens.access_token.is_none());
        assert_eq!(tokens.refresh_token.unwrap().value, "refresh-1");
        assert_eq!(tokens.bungie_membership_id, "4611686018");
    }

    #[test]
    fn test_memory_store_set_replaces_wholesale() {
        let store = MemoryTokenStore::with_tokens(test_support::token_set(false, false, 10_000_000));
        store
            .set_token(TokenSet {
                bungie_membership_id: "2".to_string(),
                access_token: Some(token(60, 5)),
                refresh_token: None,
            })
            .unwrap();

        let tokens = store.get_token().unwrap();
        assert_eq!(tokens.bungie_membership_id, "2");
        assert!(tokens.refresh_token.is_none());

        store.remove_token().unwrap();
        assert!(store.get_token().is_none());
    }

    #[test]
    fn test_token_kind_serializes_lowercase() {
        let json = serde_json::to_value(token(1, 2)).unwrap();
        assert_eq!(json["name"], "access");
    }
}
