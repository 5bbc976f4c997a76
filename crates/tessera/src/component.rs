//! Component definitions and the component registry.
//!
//! A [`Component`] is itself an entity: its definition lives as one row of
//! the reserved `id,name,schema` archetype. The [`ComponentRegistry`] only
//! keeps the name index used to enforce uniqueness and to resolve a name
//! back to the entity holding its definition.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::archetype::{Archetype, ArchetypeId};
use crate::entity::Entity;
use crate::storage::{Value, Values};

/// Name of the reserved component holding an entity's own id.
pub const ID: &str = "id";
/// Name of the reserved component holding a component's name.
pub const NAME: &str = "name";
/// Name of the reserved component holding a component's value shape.
pub const SCHEMA: &str = "schema";

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Opaque value-shape descriptor for a component.
///
/// The store only passes it through to the [`StorageProvider`](crate::storage::StorageProvider)
/// and into the registry's `schema` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(serde_json::Value);

impl Schema {
    /// Wrap a JSON-schema-like document.
    pub fn new(document: serde_json::Value) -> Self {
        Self(document)
    }

    /// The `"type"` keyword, if the document is an object carrying one.
    pub fn type_keyword(&self) -> Option<&str> {
        self.0.get("type").and_then(serde_json::Value::as_str)
    }

    /// Borrow the underlying document.
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }

    /// Unwrap into the underlying document.
    pub fn into_json(self) -> serde_json::Value {
        self.0
    }
}

impl From<serde_json::Value> for Schema {
    fn from(document: serde_json::Value) -> Self {
        Self(document)
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A named, typed attribute slot. The `id` is also the entity id of the
/// component's own definition row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: Entity,
    pub name: String,
    pub schema: Schema,
}

impl Component {
    /// Rebuild a definition from a row of the registry archetype.
    pub fn from_values(values: &Values) -> Option<Self> {
        let id = values.get(ID)?.as_integer()?;
        let name = values.get(NAME)?.as_text()?.to_owned();
        let schema = match values.get(SCHEMA)? {
            Value::Json(document) => Schema::new(document.clone()),
            _ => return None,
        };
        Some(Self {
            id: Entity(u32::try_from(id).ok()?),
            name,
            schema,
        })
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// The three self-describing definitions every store starts with, in
/// bootstrap order (ids 0, 1, 2).
pub fn core_components() -> [Component; 3] {
    [
        Component {
            id: Entity(0),
            name: ID.to_owned(),
            schema: Schema::new(serde_json::json!({ "type": "integer", "minimum": 0 })),
        },
        Component {
            id: Entity(1),
            name: NAME.to_owned(),
            schema: Schema::new(serde_json::json!({ "type": "string" })),
        },
        Component {
            id: Entity(2),
            name: SCHEMA.to_owned(),
            schema: Schema::new(serde_json::json!({ "type": "object" })),
        },
    ]
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Name index over the component definitions stored in the reserved
/// archetype table.
#[derive(Debug)]
pub struct ComponentRegistry {
    archetype: Archetype,
    table: ArchetypeId,
    by_name: HashMap<String, Component>,
}

impl ComponentRegistry {
    /// Create an empty index over the reserved archetype stored in `table`.
    pub fn new(archetype: Archetype, table: ArchetypeId) -> Self {
        Self {
            archetype,
            table,
            by_name: HashMap::new(),
        }
    }

    /// The reserved `id,name,schema` archetype.
    #[inline]
    pub fn archetype(&self) -> &Archetype {
        &self.archetype
    }

    /// The table holding every component definition.
    #[inline]
    pub fn table(&self) -> ArchetypeId {
        self.table
    }

    /// Whether `archetype` is the reserved registry shape.
    pub fn is_registry(&self, archetype: &Archetype) -> bool {
        archetype.key() == self.archetype.key()
    }

    /// Whether a name has already been defined. Exact, case-sensitive match.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The entity holding the definition named `name`.
    pub fn lookup(&self, name: &str) -> Option<Entity> {
        self.by_name.get(name).map(|c| c.id)
    }

    /// The definition named `name`.
    pub fn get(&self, name: &str) -> Option<&Component> {
        self.by_name.get(name)
    }

    /// Whether `component` is, field for field, a definition of this
    /// registry. Id, name and schema must all match.
    pub fn is_registered(&self, component: &Component) -> bool {
        self.by_name.get(&component.name) == Some(component)
    }

    /// Record a freshly written definition row.
    pub(crate) fn insert(&mut self, component: Component) {
        self.by_name.insert(component.name.clone(), component);
    }

    /// Number of defined components.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Whether no component has been defined yet.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Names of all defined components, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
