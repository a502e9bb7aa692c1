//! Manifest definitions
//!
//! The manifest is the platform's hash-keyed reference data. Tables are
//! downloaded once per session, trimmed, and held as typed lookups.

pub mod definitions;
pub mod records;
pub mod service;
pub mod trim;

pub use definitions::{
    DefinitionTable, HashLookupFailure, ManifestDefinitions, Requestor, TableName,
};
pub use records::{Definition, GenericDefinition, InventoryItemDefinition};
pub use service::{ManifestError, ManifestService};
