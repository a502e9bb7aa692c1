//! Account and membership models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::codes::PlatformErrorCode;

/// Platform a membership lives on, as the API numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BungieMembershipType(pub i32);

impl BungieMembershipType {
    pub const ALL: Self = Self(-1);
    pub const NONE: Self = Self(0);
    pub const XBOX: Self = Self(1);
    pub const PSN: Self = Self(2);
    pub const STEAM: Self = Self(3);
    pub const BLIZZARD: Self = Self(4);
    pub const STADIA: Self = Self(5);
    pub const EGS: Self = Self(6);
    pub const DEMON: Self = Self(10);
    pub const BUNGIE_NEXT: Self = Self(254);

    /// Human readable platform name.
    pub fn label(self) -> &'static str {
        match self {
            Self::XBOX => "Xbox",
            Self::PSN => "PlayStation",
            Self::STEAM => "Steam",
            Self::BLIZZARD => "Blizzard",
            Self::STADIA => "Stadia",
            Self::EGS => "Epic",
            Self::DEMON => "Demon",
            Self::BUNGIE_NEXT => "Bungie.net",
            Self::NONE => "None",
            Self::ALL => "All",
            _ => "Unknown",
        }
    }
}

impl fmt::Display for BungieMembershipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A platform membership as returned by user endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfoCard {
    pub membership_type: BungieMembershipType,
    pub membership_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bungie_global_display_name: Option<String>,
    #[serde(default)]
    pub bungie_global_display_name_code: Option<u16>,
    #[serde(default)]
    pub cross_save_override: BungieMembershipType,
    #[serde(default)]
    pub applicable_membership_types: Vec<BungieMembershipType>,
    #[serde(default)]
    pub icon_path: Option<String>,
}

/// A linked Destiny profile, with when it was last played
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinyProfileUserInfoCard {
    pub membership_type: BungieMembershipType,
    pub membership_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub bungie_global_display_name: Option<String>,
    #[serde(default)]
    pub bungie_global_display_name_code: Option<u16>,
    #[serde(default)]
    pub cross_save_override: BungieMembershipType,
    #[serde(default)]
    pub applicable_membership_types: Vec<BungieMembershipType>,
    #[serde(default)]
    pub date_last_played: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_overridden: bool,
    #[serde(default)]
    pub is_cross_save_primary: bool,
}

impl Default for BungieMembershipType {
    fn default() -> Self {
        Self::NONE
    }
}

/// The Bungie.net account behind the memberships
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralUser {
    pub membership_id: String,
    #[serde(default)]
    pub unique_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Response of `User/GetMembershipsForCurrentUser`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMembershipData {
    #[serde(default)]
    pub destiny_memberships: Vec<UserInfoCard>,
    #[serde(default)]
    pub primary_membership_id: Option<String>,
    pub bungie_net_user: GeneralUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinyErrorProfile {
    pub error_code: PlatformErrorCode,
    pub info_card: UserInfoCard,
}

/// Response of `Destiny2/{type}/Profile/{id}/LinkedProfiles`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinyLinkedProfilesResponse {
    #[serde(default)]
    pub profiles: Vec<DestinyProfileUserInfoCard>,
    pub bnet_membership: UserInfoCard,
    #[serde(default)]
    pub profiles_with_errors: Vec<DestinyErrorProfile>,
}

/// One Destiny account (one per platform), rebuilt on every query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DestinyAccount {
    /// Bungie name, e.g. `Guardian#0042`
    pub display_name: String,
    /// Platform the account started on; API calls use it
    pub original_platform_type: BungieMembershipType,
    pub platform_label: &'static str,
    pub membership_id: String,
    /// Every platform this account plays on after cross save
    pub platforms: Vec<BungieMembershipType>,
    pub last_played: Option<DateTime<Utc>>,
    pub versions_owned: Option<i64>,
}

/// Something carrying a Bungie global name.
pub trait BungieName {
    fn global_name(&self) -> Option<&str>;
    fn global_name_code(&self) -> Option<u16>;
}

impl BungieName for UserInfoCard {
    fn global_name(&self) -> Option<&str> {
        self.bungie_global_display_name.as_deref()
    }

    fn global_name_code(&self) -> Option<u16> {
        self.bungie_global_display_name_code
    }
}

impl BungieName for DestinyProfileUserInfoCard {
    fn global_name(&self) -> Option<&str> {
        self.bungie_global_display_name.as_deref()
    }

    fn global_name_code(&self) -> Option<u16> {
        self.bungie_global_display_name_code
    }
}

/// `Name#0042`. A missing or zero code leaves the suffix off.
pub fn format_bungie_name(card: &impl BungieName) -> String {
    let name = card.global_name().unwrap_or_default();
    match card.global_name_code() {
        Some(code) if code != 0 => format!("{}#{:04}", name, code),
        _ => name.to_string(),
    }
}
