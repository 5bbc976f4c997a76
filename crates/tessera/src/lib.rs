//! Tessera -- an archetype-based entity/component store with a
//! self-describing component registry.
//!
//! Entities are plain integer ids. Every distinct, name-sorted set of
//! components gets its own table, stored column-wise. Components are
//! themselves entities: their definitions live in the reserved
//! `id,name,schema` table, populated at construction with the three
//! descriptors that describe it.
//!
//! # Quick Start
//!
//! ```
//! use tessera::prelude::*;
//! use serde_json::json;
//!
//! let mut store = Store::new();
//! let position = store.create_component("position", Schema::new(json!({ "type": "number" }))).unwrap();
//! let label = store.create_component("label", Schema::new(json!({ "type": "string" }))).unwrap();
//!
//! let entity = store.create_entity();
//! store.set_value(entity, &position, Some(Value::from(1.5))).unwrap();
//! store.set_value(entity, &label, Some(Value::from("scout"))).unwrap();
//!
//! let shape = store.archetype(vec![label, position.clone()]).unwrap();
//! let values = store.read_entity_as(&shape, entity).unwrap().unwrap();
//! assert_eq!(values["position"], Value::Number(1.5));
//! assert_eq!(store.get_value(entity, &position).unwrap(), Some(Value::Number(1.5)));
//! ```

#![deny(unsafe_code)]

pub mod archetype;
pub mod component;
pub mod entity;
pub mod graph;
pub mod snapshot;
pub mod storage;
pub mod store;

use entity::Entity;
use storage::ColumnKind;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by store operations.
///
/// Every error is raised before any directory record or table row changes.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Archetype components are not strictly sorted by name.
    #[error("archetype components must be strictly sorted by name: '{previous}' is not before '{next}'")]
    Structural { previous: String, next: String },

    /// A component with this name already exists.
    #[error("component '{name}' is already defined")]
    DuplicateDefinition { name: String },

    /// The entity was never created or has been deleted.
    #[error("entity {entity} has no location (never created or already deleted)")]
    UnknownLocation { entity: Entity },

    /// A component that was not defined by this store.
    #[error("component '{name}' is not defined in this store. Defined components: [{registered}]")]
    UnknownComponent { name: String, registered: String },

    /// A value was supplied for a component outside the target archetype.
    #[error("component '{component}' is not part of archetype '{archetype}'")]
    NotInArchetype { component: String, archetype: String },

    /// A component of the target archetype was given no value.
    #[error("no value supplied for component '{component}'")]
    MissingValue { component: String },

    /// The value cannot be held by the component's column.
    #[error("component '{component}' stores {expected} values, got {found}")]
    ShapeMismatch {
        component: String,
        expected: ColumnKind,
        found: &'static str,
    },

    /// Component definitions cannot be deleted or reshaped, and ordinary
    /// entities cannot migrate into the definition table.
    #[error("entity {entity} is a component definition or would become one")]
    ProtectedEntity { entity: Entity },

    /// A [`StoreConfig`](store::StoreConfig) value is out of range.
    #[error("invalid store configuration: {details}")]
    InvalidConfig { details: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::archetype::{Archetype, ArchetypeId, Rows, RowsMut};
    pub use crate::component::{Component, Schema};
    pub use crate::entity::{Entity, EntityLocation};
    pub use crate::snapshot::StoreSnapshot;
    pub use crate::storage::{Column, ColumnKind, JsonSchemaProvider, StorageProvider, Value, Values};
    pub use crate::store::{Store, StoreConfig};
    pub use crate::StoreError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
