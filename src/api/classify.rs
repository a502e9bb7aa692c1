//! Error classification
//!
//! Maps any pipeline failure onto a small fixed set of user-meaningful
//! categories. Pure: no I/O, and the same input always gives the same
//! category.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::codes::PlatformErrorCode;
use super::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotConnected,
    SlowResponse,
    NotConnectedOrBlocked,
    ServiceDifficulties,
    NotLoggedIn,
    NetworkError,
    Throttled,
    VendorNotFound,
    AppNotPermitted,
    Maintenance,
    NoAccount,
    NoAccountForPlatform,
    DestinyLegacyPlatform,
    CannotPerformActionAtThisLocation,
    ItemUnequippable,
    UnknownError,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::NotConnected => "not-connected",
            ErrorCategory::SlowResponse => "slow-response",
            ErrorCategory::NotConnectedOrBlocked => "not-connected-or-blocked",
            ErrorCategory::ServiceDifficulties => "service-difficulties",
            ErrorCategory::NotLoggedIn => "not-logged-in",
            ErrorCategory::NetworkError => "network-error",
            ErrorCategory::Throttled => "throttled",
            ErrorCategory::VendorNotFound => "vendor-not-found",
            ErrorCategory::AppNotPermitted => "app-not-permitted",
            ErrorCategory::Maintenance => "maintenance",
            ErrorCategory::NoAccount => "no-account",
            ErrorCategory::NoAccountForPlatform => "no-account-for-platform",
            ErrorCategory::DestinyLegacyPlatform => "legacy-platform",
            ErrorCategory::CannotPerformActionAtThisLocation => {
                "cannot-perform-action-at-location"
            }
            ErrorCategory::ItemUnequippable => "item-unequippable",
            ErrorCategory::UnknownError => "unknown-error",
        }
    }

    /// Short explanation suitable for a terminal.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCategory::NotConnected => "You appear to be offline.",
            ErrorCategory::SlowResponse => "Bungie.net took too long to respond.",
            ErrorCategory::NotConnectedOrBlocked => {
                "Could not reach Bungie.net. A firewall or content blocker may be interfering."
            }
            ErrorCategory::ServiceDifficulties => "Bungie.net is having difficulties.",
            ErrorCategory::NotLoggedIn => "Not logged in. Run 'guardian-cli login'.",
            ErrorCategory::NetworkError => "Network error talking to Bungie.net.",
            ErrorCategory::Throttled => "Too many requests. Slow down and try again.",
            ErrorCategory::VendorNotFound => "That vendor is not available right now.",
            ErrorCategory::AppNotPermitted => "This application is not permitted to do that.",
            ErrorCategory::Maintenance => "The Bungie API is down for maintenance.",
            ErrorCategory::NoAccount => "No Destiny account was found.",
            ErrorCategory::NoAccountForPlatform => "No Destiny account exists for this platform.",
            ErrorCategory::DestinyLegacyPlatform => {
                "This account is on a legacy platform that is no longer accessible."
            }
            ErrorCategory::CannotPerformActionAtThisLocation => {
                "That action cannot be performed at your current location in game."
            }
            ErrorCategory::ItemUnequippable => "That item cannot be equipped right now.",
            ErrorCategory::UnknownError => "An unknown error occurred.",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

/// Shared online/offline flag consulted when classifying failures.
///
/// Defaults to online; whoever embeds the client flips it.
#[derive(Debug, Clone)]
pub struct NetworkStatus(Arc<AtomicBool>);

impl NetworkStatus {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn set_online(&self, online: bool) {
        self.0.store(online, Ordering::Relaxed);
    }

    pub fn connectivity(&self) -> Connectivity {
        if self.0.load(Ordering::Relaxed) {
            Connectivity::Online
        } else {
            Connectivity::Offline
        }
    }
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::new()
    }
}

fn offline_or(connectivity: Connectivity, online: ErrorCategory) -> ErrorCategory {
    match connectivity {
        Connectivity::Online => online,
        Connectivity::Offline => ErrorCategory::NotConnected,
    }
}

/// Classify a pipeline failure.
pub fn classify(error: &ApiError, connectivity: Connectivity) -> ErrorCategory {
    match error {
        ApiError::Timeout { .. } => offline_or(connectivity, ErrorCategory::SlowResponse),
        ApiError::Parse(_) => ErrorCategory::ServiceDifficulties,
        ApiError::Network(_) => offline_or(connectivity, ErrorCategory::NotConnectedOrBlocked),
        ApiError::HttpStatus { status, .. } => match *status {
            -1 => offline_or(connectivity, ErrorCategory::NotConnectedOrBlocked),
            401 | 403 => ErrorCategory::NotLoggedIn,
            // 526 is Cloudflare; plain 500s are left alone because the API
            // returns them for legitimate game conditions
            502..=526 => ErrorCategory::ServiceDifficulties,
            _ => ErrorCategory::NetworkError,
        },
        ApiError::Platform(e) => classify_platform_code(e.code, &e.endpoint),
        ApiError::FatalToken(_) => ErrorCategory::NotLoggedIn,
        ApiError::Internal(_) => ErrorCategory::ServiceDifficulties,
    }
}

fn classify_platform_code(code: PlatformErrorCode, endpoint: &str) -> ErrorCategory {
    use PlatformErrorCode as C;

    if code.is_throttle() {
        return ErrorCategory::Throttled;
    }

    match code {
        C::DESTINY_VENDOR_NOT_FOUND => ErrorCategory::VendorNotFound,
        C::AUTHORIZATION_CODE_INVALID | C::ACCESS_NOT_PERMITTED_BY_APPLICATION_SCOPE => {
            ErrorCategory::AppNotPermitted
        }
        C::SYSTEM_DISABLED => ErrorCategory::Maintenance,
        C::ACCESS_TOKEN_HAS_EXPIRED | C::WEB_AUTH_REQUIRED | C::WEB_AUTH_MODULE_ASYNC_FAILED => {
            ErrorCategory::NotLoggedIn
        }
        C::DESTINY_ACCOUNT_NOT_FOUND => {
            if endpoint.contains("/Account/") && !endpoint.contains("/Character/") {
                ErrorCategory::NoAccount
            } else {
                ErrorCategory::ServiceDifficulties
            }
        }
        C::DESTINY_LEGACY_PLATFORM_INACCESSIBLE => ErrorCategory::DestinyLegacyPlatform,
        C::DESTINY_CANNOT_PERFORM_ACTION_AT_THIS_LOCATION => {
            ErrorCategory::CannotPerformActionAtThisLocation
        }
        C::DESTINY_ITEM_UNEQUIPPABLE => ErrorCategory::ItemUnequippable,
        C::API_INVALID_OR_EXPIRED_KEY
        | C::API_KEY_MISSING_FROM_REQUEST
        | C::ORIGIN_HEADER_DOES_NOT_MATCH_KEY
        | C::DESTINY_UNEXPECTED_ERROR => ErrorCategory::ServiceDifficulties,
        _ => ErrorCategory::UnknownError,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api::error::PlatformError;
    use Connectivity::{Offline, Online};

    fn http(status: i32) -> ApiError {
        ApiError::HttpStatus {
            status,
            status_text: String::new(),
        }
    }

    fn platform(code: PlatformErrorCode, endpoint: &str) -> ApiError {
        ApiError::Platform(PlatformError {
            code,
            status: String::new(),
            message: String::new(),
            endpoint: endpoint.to_string(),
        })
    }

    #[test]
    fn test_transport_failures_depend_on_connectivity() {
        let timeout = ApiError::Timeout {
            url: "u".into(),
            timeout: Duration::from_secs(15),
        };
        let cases = [
            (timeout.clone(), Online, ErrorCategory::SlowResponse),
            (timeout, Offline, ErrorCategory::NotConnected),
            (ApiError::Network("x".into()), Online, ErrorCategory::NotConnectedOrBlocked),
            (ApiError::Network("x".into()), Offline, ErrorCategory::NotConnected),
            (http(-1), Online, ErrorCategory::NotConnectedOrBlocked),
            (http(-1), Offline, ErrorCategory::NotConnected),
        ];
        for (error, connectivity, expected) in cases {
            assert_eq!(classify(&error, connectivity), expected, "{:?}", error);
        }
    }

    #[test]
    fn test_http_status_table() {
        let cases = [
            (401, ErrorCategory::NotLoggedIn),
            (403, ErrorCategory::NotLoggedIn),
            (500, ErrorCategory::NetworkError),
            (501, ErrorCategory::NetworkError),
            (502, ErrorCategory::ServiceDifficulties),
            (503, ErrorCategory::ServiceDifficulties),
            (526, ErrorCategory::ServiceDifficulties),
            (527, ErrorCategory::NetworkError),
            (404, ErrorCategory::NetworkError),
            (400, ErrorCategory::NetworkError),
        ];
        for (status, expected) in cases {
            // Connectivity never matters for real statuses
            assert_eq!(classify(&http(status), Online), expected, "status {}", status);
            assert_eq!(classify(&http(status), Offline), expected, "status {}", status);
        }
    }

    #[test]
    fn test_platform_code_table() {
        use PlatformErrorCode as C;
        let ep = "https://www.bungie.net/Platform/Destiny2/3/Profile/1/";
        let cases = [
            (C::DESTINY_VENDOR_NOT_FOUND, ErrorCategory::VendorNotFound),
            (C::AUTHORIZATION_CODE_INVALID, ErrorCategory::AppNotPermitted),
            (C::ACCESS_NOT_PERMITTED_BY_APPLICATION_SCOPE, ErrorCategory::AppNotPermitted),
            (C::SYSTEM_DISABLED, ErrorCategory::Maintenance),
            (C::THROTTLE_LIMIT_EXCEEDED_MINUTES, ErrorCategory::Throttled),
            (C::THROTTLE_LIMIT_EXCEEDED_MOMENTARILY, ErrorCategory::Throttled),
            (C::THROTTLE_LIMIT_EXCEEDED_SECONDS, ErrorCategory::Throttled),
            (C::DESTINY_THROTTLED_BY_GAME_SERVER, ErrorCategory::Throttled),
            (C::PER_APPLICATION_THROTTLE_EXCEEDED, ErrorCategory::Throttled),
            (C::PER_APPLICATION_ANONYMOUS_THROTTLE_EXCEEDED, ErrorCategory::Throttled),
            (C::PER_APPLICATION_AUTHENTICATED_THROTTLE_EXCEEDED, ErrorCategory::Throttled),
            (C::PER_USER_THROTTLE_EXCEEDED, ErrorCategory::Throttled),
            (C::ACCESS_TOKEN_HAS_EXPIRED, ErrorCategory::NotLoggedIn),
            (C::WEB_AUTH_REQUIRED, ErrorCategory::NotLoggedIn),
            (C::WEB_AUTH_MODULE_ASYNC_FAILED, ErrorCategory::NotLoggedIn),
            (C::DESTINY_LEGACY_PLATFORM_INACCESSIBLE, ErrorCategory::DestinyLegacyPlatform),
            (
                C::DESTINY_CANNOT_PERFORM_ACTION_AT_THIS_LOCATION,
                ErrorCategory::CannotPerformActionAtThisLocation,
            ),
            (C::DESTINY_ITEM_UNEQUIPPABLE, ErrorCategory::ItemUnequippable),
            (C::API_INVALID_OR_EXPIRED_KEY, ErrorCategory::ServiceDifficulties),
            (C::API_KEY_MISSING_FROM_REQUEST, ErrorCategory::ServiceDifficulties),
            (C::ORIGIN_HEADER_DOES_NOT_MATCH_KEY, ErrorCategory::ServiceDifficulties),
            (C::DESTINY_UNEXPECTED_ERROR, ErrorCategory::ServiceDifficulties),
            (C::AUTHORIZATION_RECORD_REVOKED, ErrorCategory::UnknownError),
            (PlatformErrorCode(987_654), ErrorCategory::UnknownError),
        ];
        for (code, expected) in cases {
            assert_eq!(classify(&platform(code, ep), Online), expected, "code {}", code);
            assert_eq!(classify(&platform(code, ep), Offline), expected, "code {}", code);
        }
    }

    #[test]
    fn test_account_not_found_depends_on_endpoint() {
        let code = PlatformErrorCode::DESTINY_ACCOUNT_NOT_FOUND;
        assert_eq!(
            classify(&platform(code, "/Platform/Destiny2/1/Account/2/Stats/"), Online),
            ErrorCategory::NoAccount
        );
        assert_eq!(
            classify(&platform(code, "/Platform/Destiny2/1/Account/2/Character/3/"), Online),
            ErrorCategory::ServiceDifficulties
        );
        assert_eq!(
            classify(&platform(code, "/Platform/Destiny2/1/Profile/2/"), Online),
            ErrorCategory::ServiceDifficulties
        );
    }

    #[test]
    fn test_remaining_shapes() {
        assert_eq!(
            classify(&ApiError::Parse("eof".into()), Online),
            ErrorCategory::ServiceDifficulties
        );
        assert_eq!(
            classify(&ApiError::FatalToken("gone".into()), Online),
            ErrorCategory::NotLoggedIn
        );
        assert_eq!(
            classify(&ApiError::Internal("disk".into()), Offline),
            ErrorCategory::ServiceDifficulties
        );
    }

    #[test]
    fn test_classification_is_stable() {
        let error = platform(PlatformErrorCode::SYSTEM_DISABLED, "u");
        let first = classify(&error, Online);
        for _ in 0..10 {
            assert_eq!(classify(&error.clone(), Online), first);
        }
    }

    #[test]
    fn test_network_status_flag() {
        let status = NetworkStatus::default();
        assert_eq!(status.connectivity(), Online);
        let shared = status.clone();
        shared.set_online(false);
        assert_eq!(status.connectivity(), Offline);
    }

    #[test]
    fn test_category_names() {
        assert_eq!(ErrorCategory::NotConnectedOrBlocked.to_string(), "not-connected-or-blocked");
        assert_eq!(ErrorCategory::UnknownError.as_str(), "unknown-error");
    }
}
