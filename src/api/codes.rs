//! Platform error codes
//!
//! The subset of the platform's `ErrorCode` enumeration this client reacts to.

use serde::{Deserialize, Serialize};

/// Numeric `ErrorCode` carried in every platform response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlatformErrorCode(pub i64);

impl PlatformErrorCode {
    pub const NONE: Self = Self(0);
    pub const SUCCESS: Self = Self(1);
    pub const SYSTEM_DISABLED: Self = Self(5);
    pub const WEB_AUTH_MODULE_ASYNC_FAILED: Self = Self(22);
    pub const THROTTLE_LIMIT_EXCEEDED_MINUTES: Self = Self(35);
    pub const THROTTLE_LIMIT_EXCEEDED_MOMENTARILY: Self = Self(36);
    pub const THROTTLE_LIMIT_EXCEEDED_SECONDS: Self = Self(37);
    pub const PER_APPLICATION_THROTTLE_EXCEEDED: Self = Self(52);
    pub const PER_APPLICATION_ANONYMOUS_THROTTLE_EXCEEDED: Self = Self(53);
    pub const PER_APPLICATION_AUTHENTICATED_THROTTLE_EXCEEDED: Self = Self(54);
    pub const PER_USER_THROTTLE_EXCEEDED: Self = Self(55);
    pub const WEB_AUTH_REQUIRED: Self = Self(99);
    pub const DESTINY_ACCOUNT_NOT_FOUND: Self = Self(1601);
    pub const DESTINY_UNEXPECTED_ERROR: Self = Self(1618);
    pub const DESTINY_VENDOR_NOT_FOUND: Self = Self(1627);
    pub const DESTINY_CANNOT_PERFORM_ACTION_AT_THIS_LOCATION: Self = Self(1634);
    pub const DESTINY_ITEM_UNEQUIPPABLE: Self = Self(1641);
    pub const DESTINY_LEGACY_PLATFORM_INACCESSIBLE: Self = Self(1670);
    pub const DESTINY_THROTTLED_BY_GAME_SERVER: Self = Self(1672);
    pub const API_INVALID_OR_EXPIRED_KEY: Self = Self(2101);
    pub const API_KEY_MISSING_FROM_REQUEST: Self = Self(2102);
    pub const ORIGIN_HEADER_DOES_NOT_MATCH_KEY: Self = Self(2103);
    pub const AUTHORIZATION_CODE_INVALID: Self = Self(2106);
    pub const ACCESS_NOT_PERMITTED_BY_APPLICATION_SCOPE: Self = Self(2107);
    pub const ACCESS_TOKEN_HAS_EXPIRED: Self = Self(2111);
    pub const AUTHORIZATION_RECORD_REVOKED: Self = Self(2121);
    pub const AUTHORIZATION_CODE_STALE: Self = Self(2124);
    pub const AUTHORIZATION_RECORD_EXPIRED: Self = Self(2125);

    /// Codes meaning the bearer token is no longer accepted.
    pub fn indicates_bad_token(self) -> bool {
        matches!(
            self,
            Self::ACCESS_TOKEN_HAS_EXPIRED
                | Self::WEB_AUTH_REQUIRED
                | Self::WEB_AUTH_MODULE_ASYNC_FAILED
                | Self::AUTHORIZATION_RECORD_REVOKED
                | Self::AUTHORIZATION_RECORD_EXPIRED
                | Self::AUTHORIZATION_CODE_STALE
                | Self::AUTHORIZATION_CODE_INVALID
        )
    }

    /// Codes meaning the caller must slow down.
    pub fn is_throttle(self) -> bool {
        matches!(
            self,
            Self::THROTTLE_LIMIT_EXCEEDED_MINUTES
                | Self::THROTTLE_LIMIT_EXCEEDED_MOMENTARILY
                | Self::THROTTLE_LIMIT_EXCEEDED_SECONDS
                | Self::DESTINY_THROTTLED_BY_GAME_SERVER
                | Self::PER_APPLICATION_THROTTLE_EXCEEDED
                | Self::PER_APPLICATION_ANONYMOUS_THROTTLE_EXCEEDED
                | Self::PER_APPLICATION_AUTHENTICATED_THROTTLE_EXCEEDED
                | Self::PER_USER_THROTTLE_EXCEEDED
        )
    }
}

impl std::fmt::Display for PlatformErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
