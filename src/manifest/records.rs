//! Definition record types
//!
//! Only the fields this client reads are typed. Everything else a record
//! carries is kept as raw JSON in `rest`.

use std::sync::Arc;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Anything stored in a definition table.
pub trait Definition {
    fn hash(&self) -> u32;
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayProperties {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub has_icon: bool,
}

/// Record for tables without a dedicated type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenericDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquippingBlock {
    #[serde(default)]
    pub equipment_slot_type_hash: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_strings: Arc<Vec<Value>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub derived_item_categories: Arc<Vec<Value>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketEntry {
    #[serde(default)]
    pub socket_type_hash: u32,
    #[serde(default)]
    pub single_initial_item_hash: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reusable_plug_set_hash: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reusable_plug_items: Arc<Vec<Value>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketsBlock {
    #[serde(default, deserialize_with = "null_as_default")]
    pub socket_entries: Vec<SocketEntry>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub intrinsic_sockets: Arc<Vec<Value>>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinyInventoryItemDefinition`
///
/// The blocks the trimmer empties are held behind `Arc` so every trimmed
/// record can point at the same empty value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItemDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default, deserialize_with = "null_as_default")]
    pub item_type_display_name: String,
    #[serde(default)]
    pub item_type: i32,
    #[serde(default)]
    pub item_sub_type: i32,
    #[serde(default)]
    pub class_type: i32,
    #[serde(default)]
    pub equippable: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub item_category_hashes: Vec<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Arc<Map<String, Value>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Arc<Map<String, Value>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_block: Option<Arc<Map<String, Value>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub talent_grid: Option<Arc<Map<String, Value>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipping_block: Option<EquippingBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<PreviewBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sockets: Option<SocketsBlock>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinyStatDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub aggregation_type: i32,
    #[serde(default)]
    pub has_computed_block: bool,
    #[serde(default)]
    pub stat_category: i32,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinyInventoryBucketDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryBucketDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub scope: i32,
    #[serde(default)]
    pub category: i32,
    #[serde(default)]
    pub bucket_order: i32,
    #[serde(default)]
    pub item_count: i32,
    #[serde(default)]
    pub location: i32,
    #[serde(default)]
    pub enabled: bool,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinyDamageTypeDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageTypeDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transparent_icon_path: Option<String>,
    #[serde(default)]
    pub show_icon: bool,
    #[serde(default)]
    pub enum_value: i32,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinyActivityDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pgcr_image: Option<String>,
    #[serde(default)]
    pub activity_light_level: i32,
    #[serde(default)]
    pub destination_hash: u32,
    #[serde(default)]
    pub place_hash: u32,
    #[serde(default)]
    pub activity_type_hash: u32,
    #[serde(default)]
    pub tier: i32,
    #[serde(default)]
    pub is_playlist: bool,
    #[serde(default, rename = "isPvP")]
    pub is_pvp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_activity_mode_hash: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub activity_mode_hashes: Vec<u32>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorItem {
    #[serde(default)]
    pub vendor_item_index: i32,
    #[serde(default)]
    pub item_hash: u32,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub display_category_index: i32,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinyVendorDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default, deserialize_with = "null_as_default")]
    pub vendor_identifier: String,
    #[serde(default)]
    pub faction_hash: u32,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub visible: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<VendorItem>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlugWhitelistEntry {
    #[serde(default)]
    pub category_hash: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub category_identifier: String,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinySocketTypeDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketTypeDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub socket_category_hash: u32,
    #[serde(default)]
    pub visibility: i32,
    #[serde(default)]
    pub always_randomize_sockets: bool,
    #[serde(default)]
    pub is_preview_enabled: bool,
    #[serde(default)]
    pub hide_duplicate_reusable_plugs: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub plug_whitelist: Vec<PlugWhitelistEntry>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinySocketCategoryDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketCategoryDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub ui_category_style: u32,
    #[serde(default)]
    pub category_style: i32,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlugSetEntry {
    #[serde(default)]
    pub plug_item_hash: u32,
    #[serde(default)]
    pub currently_can_roll: bool,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinyPlugSetDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlugSetDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub is_fake_plug_set: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reusable_plug_items: Vec<PlugSetEntry>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinyObjectiveDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress_description: String,
    #[serde(default)]
    pub completion_value: i32,
    #[serde(default)]
    pub scope: i32,
    #[serde(default)]
    pub location_hash: u32,
    #[serde(default)]
    pub allow_negative_value: bool,
    #[serde(default)]
    pub is_counting_downward: bool,
    #[serde(default)]
    pub value_style: i32,
    #[serde(default)]
    pub show_value_on_complete: bool,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinyCollectibleDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectibleDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub scope: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub source_string: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_hash: Option<u32>,
    #[serde(default)]
    pub item_hash: u32,
    #[serde(default)]
    pub presentation_node_type: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parent_node_hashes: Vec<u32>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationNodeChild {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation_node_hash: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collectible_hash: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_hash: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_hash: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationNodeChildren {
    #[serde(default, deserialize_with = "null_as_default")]
    pub presentation_nodes: Vec<PresentationNodeChild>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub collectibles: Vec<PresentationNodeChild>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub records: Vec<PresentationNodeChild>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub metrics: Vec<PresentationNodeChild>,
}

/// `DestinyPresentationNodeDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationNodeDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub node_type: i32,
    #[serde(default)]
    pub scope: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective_hash: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_record_hash: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: PresentationNodeChildren,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parent_node_hashes: Vec<u32>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTitleInfo {
    #[serde(default)]
    pub has_title: bool,
    /// Keyed by gender name (`Male`, `Female`).
    #[serde(default, deserialize_with = "null_as_default")]
    pub titles_by_gender: BTreeMap<String, String>,
}

/// `DestinyRecordDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub scope: i32,
    #[serde(default)]
    pub presentation_node_type: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub objective_hashes: Vec<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title_info: RecordTitleInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub parent_node_hashes: Vec<u32>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinyClassDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub class_type: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub gendered_class_names: BTreeMap<String, String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinyRaceDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub race_type: i32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub gendered_race_names: BTreeMap<String, String>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// `DestinyFactionDefinition`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FactionDefinition {
    pub hash: u32,
    #[serde(default)]
    pub index: i64,
    #[serde(default)]
    pub redacted: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_properties: DisplayProperties,
    #[serde(default)]
    pub progression_hash: u32,
    #[serde(default)]
    pub reward_item_hash: u32,
    #[serde(default)]
    pub reward_vendor_hash: u32,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

macro_rules! impl_definition {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Definition for $ty {
                fn hash(&self) -> u32 {
                    self.hash
                }

                fn name(&self) -> &str {
                    &self.display_properties.name
                }
            }
        )*
    };
}

impl_definition!(
    GenericDefinition,
    InventoryItemDefinition,
    StatDefinition,
    InventoryBucketDefinition,
    DamageTypeDefinition,
    ActivityDefinition,
    VendorDefinition,
    SocketTypeDefinition,
    SocketCategoryDefinition,
    PlugSetDefinition,
    ObjectiveDefinition,
    CollectibleDefinition,
    PresentationNodeDefinition,
    RecordDefinition,
    ClassDefinition,
    RaceDefinition,
    FactionDefinition,
);
