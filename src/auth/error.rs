use super::tokens::StoreError;

/// Failures while obtaining a usable bearer token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Caller passed both an authorization code and a refresh token.
    #[error("code and refresh token are mutually exclusive")]
    ConflictingGrant,

    #[error("no code or refresh token supplied")]
    MissingGrant,

    #[error("no refresh token found in storage")]
    NoRefreshToken,

    #[error("refresh token has expired")]
    RefreshTokenExpired,

    /// The exchange endpoint answered with an `error` body.
    #[error("token exchange rejected: {error}")]
    Rejected {
        error: String,
        detail: Option<serde_json::Value>,
    },

    #[error("token exchange response is missing an access token: {0}")]
    MalformedResponse(String),

    #[error("token exchange request failed: {0}")]
    Network(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl TokenError {
    /// Fatal errors mean the stored credentials cannot produce a token and
    /// the user has to authenticate again. Transport and storage trouble is
    /// not fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TokenError::NoRefreshToken
                | TokenError::RefreshTokenExpired
                | TokenError::Rejected { .. }
        )
    }
}
