//! Table trimming
//!
//! Large blocks that the client never reads are swapped for shared empty
//! values instead of being removed, so every trimmed record points at the
//! same allocation.

use std::sync::{Arc, OnceLock};

use serde_json::{Map, Value};

use super::records::InventoryItemDefinition;

static EMPTY_OBJECT: OnceLock<Arc<Map<String, Value>>> = OnceLock::new();
static EMPTY_ARRAY: OnceLock<Arc<Vec<Value>>> = OnceLock::new();

/// The process-wide empty object.
pub fn empty_object() -> Arc<Map<String, Value>> {
    EMPTY_OBJECT.get_or_init(|| Arc::new(Map::new())).clone()
}

/// The process-wide empty array.
pub fn empty_array() -> Arc<Vec<Value>> {
    EMPTY_ARRAY.get_or_init(|| Arc::new(Vec::new())).clone()
}

pub fn trim_inventory_item(def: &mut InventoryItemDefinition) {
    def.action = Some(empty_object());
    def.background_color = Some(empty_object());
    def.translation_block = Some(empty_object());
    def.talent_grid = Some(empty_object());

    if let Some(equipping) = def.equipping_block.as_mut() {
        if !equipping.display_strings.is_empty() {
            equipping.display_strings = empty_array();
        }
    }
    if let Some(preview) = def.preview.as_mut() {
        if !preview.derived_item_categories.is_empty() {
            preview.derived_item_categories = empty_array();
        }
    }
    if let Some(sockets) = def.sockets.as_mut() {
        sockets.intrinsic_sockets = empty_array();
        for entry in &mut sockets.socket_entries {
            let has_plug_set = entry.reusable_plug_set_hash.map_or(false, |h| h != 0);
            if has_plug_set && !entry.reusable_plug_items.is_empty() {
                entry.reusable_plug_items = empty_array();
            }
        }
    }
}

/// Trim every record of an inventory item table in place.
pub fn trim_inventory_items<'a>(defs: impl IntoIterator<Item = &'a mut InventoryItemDefinition>) {
    for def in defs {
        trim_inventory_item(def);
    }
}
