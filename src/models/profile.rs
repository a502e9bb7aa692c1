//! Profile component models

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::account::{BungieMembershipType, UserInfoCard};

/// `components=` values for the profile endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum DestinyComponentType {
    Profiles = 100,
    ProfileInventories = 102,
    ProfileCurrencies = 103,
    Characters = 200,
    CharacterInventories = 201,
    CharacterEquipment = 205,
    CharacterLoadouts = 206,
    ItemInstances = 300,
    ItemPerks = 302,
    ItemStats = 304,
    ItemSockets = 305,
    ItemPlugStates = 308,
    Collectibles = 800,
}

impl DestinyComponentType {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Comma separated list for the query string.
    pub fn join(components: &[DestinyComponentType]) -> String {
        components
            .iter()
            .map(|c| c.code().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleComponentResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub privacy: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DictionaryComponentResponse<T> {
    pub data: Option<BTreeMap<String, T>>,
    #[serde(default)]
    pub privacy: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinyProfileComponent {
    pub user_info: UserInfoCard,
    #[serde(default)]
    pub date_last_played: Option<DateTime<Utc>>,
    #[serde(default)]
    pub versions_owned: Option<i64>,
    #[serde(default)]
    pub character_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinyCharacterComponent {
    pub character_id: String,
    pub membership_id: String,
    pub membership_type: BungieMembershipType,
    #[serde(default)]
    pub date_last_played: Option<DateTime<Utc>>,
    #[serde(default)]
    pub light: i32,
    #[serde(default)]
    pub class_hash: u32,
    #[serde(default)]
    pub race_hash: u32,
    #[serde(default)]
    pub gender_hash: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinyItemComponent {
    pub item_hash: u32,
    #[serde(default)]
    pub item_instance_id: Option<String>,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub bucket_hash: u32,
    #[serde(default)]
    pub location: i32,
    #[serde(default)]
    pub state: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DestinyInventoryComponent {
    #[serde(default)]
    pub items: Vec<DestinyItemComponent>,
}

/// Response of `Destiny2/{type}/Profile/{id}/`
///
/// Only the components this client reads are typed; the rest are kept
/// as raw JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DestinyProfileResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<SingleComponentResponse<DestinyProfileComponent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_inventory: Option<SingleComponentResponse<DestinyInventoryComponent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub characters: Option<DictionaryComponentResponse<DestinyCharacterComponent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_inventories: Option<DictionaryComponentResponse<DestinyInventoryComponent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_equipment: Option<DictionaryComponentResponse<DestinyInventoryComponent>>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl DestinyProfileResponse {
    /// The platform returns `{}` for a platform with no Destiny account.
    pub fn is_empty(&self) -> bool {
        self.profile.is_none()
            && self.profile_inventory.is_none()
            && self.characters.is_none()
            && self.character_inventories.is_none()
            && self.character_equipment.is_none()
            && self.other.is_empty()
    }

    /// When the profile component reports it was last played.
    pub fn date_last_played(&self) -> Option<DateTime<Utc>> {
        self.profile
            .as_ref()
            .and_then(|p| p.data.as_ref())
            .and_then(|d| d.date_last_played)
    }

    /// Every item in every character's inventory, character by character.
    pub fn character_inventory_items(&self) -> Option<Vec<DestinyItemComponent>> {
        let characters = self.characters.as_ref()?.data.as_ref()?;
        let inventories = self
            .character_inventories
            .as_ref()
            .and_then(|c| c.data.as_ref());

        let items = characters
            .keys()
            .flat_map(|id| {
                inventories
                    .and_then(|inv| inv.get(id))
                    .map(|inv| inv.items.clone())
                    .unwrap_or_default()
            })
            .collect();
        Some(items)
    }
}
