//! Definition tables and the manifest aggregate

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::records::{
    ActivityDefinition, ClassDefinition, CollectibleDefinition, DamageTypeDefinition, Definition,
    FactionDefinition, GenericDefinition, InventoryBucketDefinition, InventoryItemDefinition,
    ObjectiveDefinition, PlugSetDefinition, PresentationNodeDefinition, RaceDefinition,
    RecordDefinition, SocketCategoryDefinition, SocketTypeDefinition, StatDefinition,
    VendorDefinition,
};
use super::trim::trim_inventory_items;

macro_rules! table_names {
    ($($name:ident),* $(,)?) => {
        /// A manifest table this client knows how to load.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum TableName {
            $($name),*
        }

        impl TableName {
            pub const ALL: &'static [TableName] = &[$(TableName::$name),*];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(TableName::$name => stringify!($name)),*
                }
            }
        }
    };
}

table_names!(
    InventoryItem,
    Objective,
    SandboxPerk,
    Stat,
    StatGroup,
    DamageType,
    Progression,
    ItemCategory,
    Activity,
    ActivityModifier,
    Vendor,
    SocketCategory,
    SocketType,
    MaterialRequirementSet,
    Season,
    SeasonPass,
    Milestone,
    Destination,
    Place,
    VendorGroup,
    PlugSet,
    Collectible,
    PresentationNode,
    Record,
    Metric,
    Trait,
    PowerCap,
    BreakerType,
    EventCard,
    LoadoutName,
    LoadoutIcon,
    LoadoutColor,
    InventoryBucket,
    Class,
    Gender,
    Race,
    Faction,
    ItemTierType,
    ActivityMode,
    LoadoutConstants,
);

impl TableName {
    /// Tables loaded when the caller does not pick any.
    pub fn defaults() -> Vec<TableName> {
        Self::ALL
            .iter()
            .copied()
            .filter(|t| !matches!(t, TableName::Trait | TableName::Class))
            .collect()
    }

    /// Key of this table in the manifest index, e.g. `DestinyStatDefinition`.
    pub fn component_key(self) -> String {
        format!("Destiny{}Definition", self.as_str())
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown manifest table '{0}'")]
pub struct UnknownTable(pub String);

impl FromStr for TableName {
    type Err = UnknownTable;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let short = s
            .strip_prefix("Destiny")
            .and_then(|rest| rest.strip_suffix("Definition"))
            .unwrap_or(s);
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(short))
            .ok_or_else(|| UnknownTable(s.to_string()))
    }
}

/// Who asked for a hash that turned out to be missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requestor {
    Hash(u32),
    Label(String),
}

impl fmt::Display for Requestor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Requestor::Hash(hash) => write!(f, "{}", hash),
            Requestor::Label(label) => f.write_str(label),
        }
    }
}

impl From<u32> for Requestor {
    fn from(hash: u32) -> Self {
        Requestor::Hash(hash)
    }
}

impl From<&str> for Requestor {
    fn from(label: &str) -> Self {
        Requestor::Label(label.to_string())
    }
}

impl From<String> for Requestor {
    fn from(label: String) -> Self {
        Requestor::Label(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("hashLookupFailure: {table}[{id}]")]
pub struct HashLookupFailure {
    pub table: TableName,
    pub id: u32,
    pub requestor: Option<Requestor>,
}

/// Hash to record mapping for one table.
#[derive(Debug, Clone)]
pub struct DefinitionTable<T> {
    name: TableName,
    entries: HashMap<u32, T>,
}

impl<T> DefinitionTable<T> {
    pub fn new(name: TableName, entries: HashMap<u32, T>) -> Self {
        Self { name, entries }
    }

    pub fn name(&self) -> TableName {
        self.name
    }

    pub fn get(&self, hash: u32) -> Result<&T, HashLookupFailure> {
        self.entries.get(&hash).ok_or(HashLookupFailure {
            table: self.name,
            id: hash,
            requestor: None,
        })
    }

    /// Like [`get`](Self::get), but a miss records and logs who asked.
    pub fn get_for(&self, hash: u32, requestor: impl Into<Requestor>) -> Result<&T, HashLookupFailure> {
        self.entries.get(&hash).ok_or_else(|| {
            let requestor = requestor.into();
            tracing::warn!(
                table = %self.name,
                id = hash,
                requestor = %requestor,
                "Definition lookup failed"
            );
            HashLookupFailure {
                table: self.name,
                id: hash,
                requestor: Some(requestor),
            }
        })
    }

    pub fn get_all(&self) -> &HashMap<u32, T> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: DeserializeOwned> DefinitionTable<T> {
    /// Decode a downloaded table blob (`{"<hash>": record, ...}`).
    pub fn from_blob(name: TableName, blob: Value) -> Result<Self, serde_json::Error> {
        Ok(Self::new(name, serde_json::from_value(blob)?))
    }
}

fn render<T: Serialize>(table: &DefinitionTable<T>, hash: u32) -> Result<Value, HashLookupFailure> {
    let record = table.get(hash)?;
    Ok(serde_json::to_value(record).unwrap_or(Value::Null))
}

fn name_of<T: Definition>(table: &DefinitionTable<T>, hash: u32) -> Option<String> {
    table.get(hash).ok().map(|d| d.name().to_string())
}

macro_rules! typed_tables {
    ($($variant:ident => $field:ident: $record:ty),* $(,)?) => {
        /// All loaded tables, built once per session.
        ///
        /// Tables with a dedicated record type get their own slot; every
        /// other table holds [`GenericDefinition`]s.
        #[derive(Debug, Default)]
        pub struct ManifestDefinitions {
            $($field: Option<DefinitionTable<$record>>,)*
            other: HashMap<TableName, DefinitionTable<GenericDefinition>>,
        }

        impl ManifestDefinitions {
            $(
                pub fn $field(&self) -> Option<&DefinitionTable<$record>> {
                    self.$field.as_ref()
                }
            )*

            fn store_blob(&mut self, name: TableName, blob: Value) -> Result<(), serde_json::Error> {
                match name {
                    $(TableName::$variant => self.$field = Some(DefinitionTable::from_blob(name, blob)?),)*
                    other => {
                        self.other.insert(other, DefinitionTable::from_blob(name, blob)?);
                    }
                }
                Ok(())
            }

            pub fn contains(&self, name: TableName) -> bool {
                match name {
                    $(TableName::$variant => self.$field.is_some(),)*
                    other => self.other.contains_key(&other),
                }
            }

            /// Look up any record as JSON. `None` means the table is not loaded.
            pub fn lookup_json(
                &self,
                name: TableName,
                hash: u32,
            ) -> Option<Result<Value, HashLookupFailure>> {
                match name {
                    $(TableName::$variant => self.$field.as_ref().map(|t| render(t, hash)),)*
                    other => self.other.get(&other).map(|t| render(t, hash)),
                }
            }

            /// Display name of a record, if the table is loaded and has it.
            pub fn display_name(&self, name: TableName, hash: u32) -> Option<String> {
                match name {
                    $(TableName::$variant => self.$field.as_ref().and_then(|t| name_of(t, hash)),)*
                    other => self.other.get(&other).and_then(|t| name_of(t, hash)),
                }
            }
        }
    };
}

typed_tables!(
    InventoryItem => inventory_item: InventoryItemDefinition,
    Stat => stat: StatDefinition,
    InventoryBucket => inventory_bucket: InventoryBucketDefinition,
    DamageType => damage_type: DamageTypeDefinition,
    Activity => activity: ActivityDefinition,
    Vendor => vendor: VendorDefinition,
    SocketType => socket_type: SocketTypeDefinition,
    SocketCategory => socket_category: SocketCategoryDefinition,
    PlugSet => plug_set: PlugSetDefinition,
    Objective => objective: ObjectiveDefinition,
    Collectible => collectible: CollectibleDefinition,
    PresentationNode => presentation_node: PresentationNodeDefinition,
    Record => record: RecordDefinition,
    Class => class: ClassDefinition,
    Race => race: RaceDefinition,
    Faction => faction: FactionDefinition,
);

impl ManifestDefinitions {
    /// Decode, trim where applicable, and store a table blob.
    pub fn insert_blob(&mut self, name: TableName, blob: Value) -> Result<(), serde_json::Error> {
        if name == TableName::InventoryItem {
            let mut table = DefinitionTable::<InventoryItemDefinition>::from_blob(name, blob)?;
            trim_inventory_items(table.entries.values_mut());
            self.inventory_item = Some(table);
            return Ok(());
        }
        self.store_blob(name, blob)
    }

    /// A table without a dedicated record type.
    pub fn table(&self, name: TableName) -> Option<&DefinitionTable<GenericDefinition>> {
        self.other.get(&name)
    }
}
