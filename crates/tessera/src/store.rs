//! The [`Store`] is the top-level container. It owns the archetype graph,
//! the entity directory, and the component registry, and provides the
//! public API for entity lifecycle and component access.

use serde::{Deserialize, Serialize};

use crate::archetype::{Archetype, ArchetypeId, EdgeDirection, Rows, RowsMut};
use crate::component::{core_components, Component, ComponentRegistry, Schema, ID, NAME, SCHEMA};
use crate::entity::{Entity, EntityDirectory, EntityLocation};
use crate::graph::ArchetypeGraph;
use crate::storage::{JsonSchemaProvider, StorageProvider, Value, Values};
use crate::StoreError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Initial sizes for the store's growable arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Rows allocated for each new archetype table before the first
    /// doubling. Default: 4.
    pub initial_table_capacity: usize,

    /// Entity records allocated before the directory first doubles.
    /// Default: 1024.
    pub initial_directory_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_table_capacity: 4,
            initial_directory_capacity: 1024,
        }
    }
}

impl StoreConfig {
    fn validate(&self) -> Result<(), StoreError> {
        if self.initial_table_capacity == 0 {
            return Err(StoreError::InvalidConfig {
                details: "initial_table_capacity must be at least 1".to_owned(),
            });
        }
        if self.initial_directory_capacity == 0 {
            return Err(StoreError::InvalidConfig {
                details: "initial_directory_capacity must be at least 1".to_owned(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// An archetype-based entity/component store.
///
/// Single-writer: no operation may run while a
/// [`for_each_entity`](Self::for_each_entity) pass over the same tables is in
/// progress, which the borrow checker enforces.
pub struct Store {
    config: StoreConfig,
    pub(crate) graph: ArchetypeGraph,
    pub(crate) directory: EntityDirectory,
    /// Indexed by entity id. Ids are never reused, so a `false` stays false.
    alive: Vec<bool>,
    live_count: usize,
    registry: ComponentRegistry,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("entity_count", &self.live_count)
            .field("archetype_count", &self.graph.len())
            .field("component_count", &self.registry.len())
            .finish()
    }
}

impl Store {
    /// Create a store with the default configuration and storage provider.
    ///
    /// The reserved `id,name,schema` archetype is built and populated with
    /// the three core component definitions before this returns.
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
            .expect("default configuration is valid and bootstrap cannot fail on an empty store")
    }

    /// Create a store with an explicit configuration.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidConfig`] if a capacity is zero.
    pub fn with_config(config: StoreConfig) -> Result<Self, StoreError> {
        Self::with_provider(config, Box::new(JsonSchemaProvider))
    }

    /// Create a store whose columns are allocated by `provider`.
    pub fn with_provider(
        config: StoreConfig,
        provider: Box<dyn StorageProvider>,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        let mut graph = ArchetypeGraph::new(provider, config.initial_table_capacity);

        // The registry table is built structurally first, then filled with
        // its own descriptors through the normal creation path.
        let reserved = Archetype::new(core_components().to_vec())?;
        let table = graph.get_or_create(&reserved);

        let mut store = Self {
            directory: EntityDirectory::with_capacity(config.initial_directory_capacity),
            config,
            graph,
            alive: Vec::new(),
            live_count: 0,
            registry: ComponentRegistry::new(reserved, table),
        };
        for core in core_components() {
            let created = store.create_component(&core.name, core.schema.clone())?;
            debug_assert_eq!(created.id, core.id, "core component id drifted");
        }
        Ok(store)
    }

    /// The configuration this store was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // -- components ---------------------------------------------------------

    /// Define a new component.
    ///
    /// The definition is written as an entity of the registry archetype and
    /// read back, so the returned id is the id of that entity.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateDefinition`] if `name` is already defined.
    pub fn create_component(&mut self, name: &str, schema: Schema) -> Result<Component, StoreError> {
        let mut values = Values::new();
        values.insert(NAME.to_owned(), Value::from(name));
        values.insert(SCHEMA.to_owned(), Value::Json(schema.into_json()));
        let archetype = self.registry.archetype().clone();
        let entity = self.create_entity_with(&archetype, values)?;
        self.read_component(entity)
            .ok_or(StoreError::UnknownLocation { entity })
    }

    /// Look up a component definition by exact name.
    pub fn component(&self, name: &str) -> Option<Component> {
        self.read_component(self.registry.lookup(name)?)
    }

    /// All component definitions, in id order.
    pub fn components(&self) -> Vec<Component> {
        let table = self.graph.table(self.registry.table());
        let mut components: Vec<Component> = (0..table.len())
            .filter_map(|row| Component::from_values(&table.row_values(row)))
            .collect();
        components.sort_by_key(|c| c.id);
        components
    }

    /// Number of defined components, including the three core ones.
    pub fn component_count(&self) -> usize {
        self.registry.len()
    }

    /// The reserved archetype holding component definitions.
    pub fn registry_archetype(&self) -> &Archetype {
        self.registry.archetype()
    }

    fn read_component(&self, entity: Entity) -> Option<Component> {
        let values = self.read_entity_as(self.registry.archetype(), entity).ok()??;
        Component::from_values(&values)
    }

    fn ensure_registered(&self, component: &Component) -> Result<(), StoreError> {
        if self.registry.is_registered(component) {
            Ok(())
        } else {
            Err(StoreError::UnknownComponent {
                name: component.name.clone(),
                registered: self.registry.registered_names().join(", "),
            })
        }
    }

    fn ensure_known(&self, archetype: &Archetype) -> Result<(), StoreError> {
        if !self.registry.is_registry(archetype) {
            for component in archetype.components() {
                self.ensure_registered(component)?;
            }
        }
        Ok(())
    }

    /// Make sure `archetype` only uses components of this store and that its
    /// table exists.
    fn resolve(&mut self, archetype: &Archetype) -> Result<ArchetypeId, StoreError> {
        self.ensure_known(archetype)?;
        Ok(self.graph.get_or_create(archetype))
    }

    /// Check `values` against the columns `archetype` would have, without
    /// creating its table.
    fn validate_values(&self, archetype: &Archetype, values: &Values) -> Result<(), StoreError> {
        for (name, value) in values {
            let component = archetype
                .position(name)
                .map(|i| &archetype.components()[i])
                .ok_or_else(|| StoreError::NotInArchetype {
                    component: name.clone(),
                    archetype: archetype.key().to_owned(),
                })?;
            let expected = self.graph.column_kind(&component.schema);
            if !expected.accepts(value) {
                return Err(StoreError::ShapeMismatch {
                    component: name.clone(),
                    expected,
                    found: value.kind_name(),
                });
            }
        }
        Ok(())
    }

    // -- archetypes ---------------------------------------------------------

    /// Validate a sorted component list and make sure its table exists.
    ///
    /// # Errors
    ///
    /// [`StoreError::Structural`] if `components` is not strictly sorted by
    /// name, [`StoreError::UnknownComponent`] if one was not defined here.
    pub fn archetype(&mut self, components: Vec<Component>) -> Result<Archetype, StoreError> {
        let archetype = Archetype::new(components)?;
        self.resolve(&archetype)?;
        Ok(archetype)
    }

    /// Number of archetype tables, including the root and registry tables.
    pub fn archetype_count(&self) -> usize {
        self.graph.len()
    }

    /// The graph of archetype tables, read-only.
    pub fn graph(&self) -> &ArchetypeGraph {
        &self.graph
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Create an entity with no components.
    pub fn create_entity(&mut self) -> Entity {
        let entity = self.directory.create();
        let row = self
            .graph
            .create_row(ArchetypeId::ROOT, entity, Values::new())
            .expect("the root archetype accepts an empty row");
        self.commit(entity, ArchetypeId::ROOT, row);
        entity
    }

    /// Create an entity in `archetype` with `values`.
    ///
    /// Every component except `id` needs a value; `id`, when part of the
    /// archetype, is filled with the new entity's id. Creating an entity in
    /// the registry archetype defines a component.
    ///
    /// # Errors
    ///
    /// Fails without side effects on unknown components, values for
    /// components outside the archetype, missing values, values of the wrong
    /// kind, and duplicate component names.
    pub fn create_entity_with(
        &mut self,
        archetype: &Archetype,
        mut values: Values,
    ) -> Result<Entity, StoreError> {
        self.ensure_known(archetype)?;
        let defines_component = self.registry.is_registry(archetype);

        values.remove(ID);
        for component in archetype.components() {
            if component.name != ID && !values.contains_key(&component.name) {
                return Err(StoreError::MissingValue {
                    component: component.name.clone(),
                });
            }
        }
        self.validate_values(archetype, &values)?;

        let definition = if defines_component {
            let name = values
                .get(NAME)
                .and_then(Value::as_text)
                .unwrap_or_default()
                .to_owned();
            if self.registry.contains(&name) {
                return Err(StoreError::DuplicateDefinition { name });
            }
            let schema = match values.get(SCHEMA) {
                Some(Value::Json(document)) => Schema::new(document.clone()),
                _ => Schema::new(serde_json::Value::Null),
            };
            Some((name, schema))
        } else {
            None
        };

        let table = self.graph.get_or_create(archetype);
        let entity = self.directory.create();
        if archetype.contains(ID) {
            values.insert(ID.to_owned(), Value::from(entity.to_raw()));
        }
        let row = self.graph.create_row(table, entity, values)?;
        self.commit(entity, table, row);

        if let Some((name, schema)) = definition {
            tracing::debug!(component_id = %entity, name = %name, "component defined");
            self.registry.insert(Component {
                id: entity,
                name,
                schema,
            });
        }
        Ok(entity)
    }

    fn commit(&mut self, entity: Entity, table: ArchetypeId, row: usize) {
        self.directory.relocate(entity, table, row);
        debug_assert_eq!(self.alive.len(), entity.index());
        self.alive.push(true);
        self.live_count += 1;
    }

    /// Delete an entity, compacting its table.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownLocation`] if the entity is not alive,
    /// [`StoreError::ProtectedEntity`] for component definitions.
    pub fn delete_entity(&mut self, entity: Entity) -> Result<(), StoreError> {
        let loc = self.locate(entity)?;
        self.ensure_unprotected(entity, loc)?;
        self.remove_row(loc);
        self.alive[entity.index()] = false;
        self.live_count -= 1;
        Ok(())
    }

    /// Swap-remove a row and patch the record of whichever entity moved.
    fn remove_row(&mut self, loc: EntityLocation) {
        if let Some(moved) = self.graph.delete_row(loc.archetype_id, loc.row) {
            self.directory.set_row(moved, loc.row);
        }
    }

    /// Whether `entity` was created and not yet deleted.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.alive.get(entity.index()).copied().unwrap_or(false)
    }

    /// Number of live entities, component definitions included.
    pub fn entity_count(&self) -> usize {
        self.live_count
    }

    /// Current table and row of a live entity.
    pub fn location(&self, entity: Entity) -> Option<EntityLocation> {
        if self.is_alive(entity) {
            self.directory.locate(entity)
        } else {
            None
        }
    }

    fn locate(&self, entity: Entity) -> Result<EntityLocation, StoreError> {
        match self.location(entity) {
            Some(loc) => Ok(loc),
            None => {
                tracing::warn!(entity = %entity, "operation on an entity that is not alive");
                Err(StoreError::UnknownLocation { entity })
            }
        }
    }

    fn ensure_unprotected(&self, entity: Entity, loc: EntityLocation) -> Result<(), StoreError> {
        if loc.archetype_id == self.registry.table() {
            Err(StoreError::ProtectedEntity { entity })
        } else {
            Ok(())
        }
    }

    // -- component access ---------------------------------------------------

    /// Read one component value, or `None` if the entity lacks it.
    pub fn get_value(&self, entity: Entity, component: &Component) -> Result<Option<Value>, StoreError> {
        let loc = self.locate(entity)?;
        self.ensure_registered(component)?;
        Ok(self.graph.table(loc.archetype_id).get(loc.row, &component.name))
    }

    /// Set (`Some`) or remove (`None`) a component value.
    ///
    /// Overwrites in place when the entity already has the component.
    /// Otherwise the entity migrates along the add or remove edge to the
    /// table of its new shape, carrying every other value by name.
    pub fn set_value(
        &mut self,
        entity: Entity,
        component: &Component,
        value: Option<Value>,
    ) -> Result<(), StoreError> {
        let loc = self.locate(entity)?;
        self.ensure_registered(component)?;
        self.ensure_unprotected(entity, loc)?;

        let has = self
            .graph
            .table(loc.archetype_id)
            .archetype()
            .contains(&component.name);
        match (value, has) {
            // `id` always holds the entity's own id.
            (Some(_), true) if component.name == ID => Ok(()),
            (Some(value), true) => self
                .graph
                .table_mut(loc.archetype_id)
                .set(loc.row, &component.name, value),
            (Some(value), false) => self.migrate(entity, loc, component, Some(value)),
            (None, true) => self.migrate(entity, loc, component, None),
            (None, false) => Ok(()),
        }
    }

    /// Move `entity` to the table one component larger (`added` is `Some`)
    /// or smaller (`added` is `None`).
    fn migrate(
        &mut self,
        entity: Entity,
        from: EntityLocation,
        component: &Component,
        added: Option<Value>,
    ) -> Result<(), StoreError> {
        let direction = match &added {
            Some(value) => {
                let expected = self.graph.column_kind(&component.schema);
                if !expected.accepts(value) {
                    return Err(StoreError::ShapeMismatch {
                        component: component.name.clone(),
                        expected,
                        found: value.kind_name(),
                    });
                }
                let target = self.graph.table(from.archetype_id).archetype().with(component)?;
                if self.registry.is_registry(&target) {
                    return Err(StoreError::ProtectedEntity { entity });
                }
                EdgeDirection::Add
            }
            None => EdgeDirection::Remove,
        };
        let to = self.graph.edge(from.archetype_id, component, direction)?;

        let mut values = self.graph.table(from.archetype_id).row_values(from.row);
        match added {
            Some(value) => {
                values.insert(component.name.clone(), value);
            }
            None => {
                values.remove(&component.name);
            }
        }
        if component.name == ID {
            if let Some(slot) = values.get_mut(ID) {
                *slot = Value::from(entity.to_raw());
            }
        }

        let row = self.graph.create_row(to, entity, values)?;
        self.remove_row(from);
        self.directory.relocate(entity, to, row);
        tracing::debug!(
            entity = %entity,
            from = %from.archetype_id,
            to = %to,
            component = %component.name,
            "entity migrated"
        );
        Ok(())
    }

    /// Project an entity onto `archetype`: `None` if its table lacks any of
    /// the requested components, otherwise their values at its row.
    pub fn read_entity_as(&self, archetype: &Archetype, entity: Entity) -> Result<Option<Values>, StoreError> {
        let loc = self.locate(entity)?;
        let table = self.graph.table(loc.archetype_id);
        let mut values = Values::new();
        for component in archetype.components() {
            match table.get(loc.row, &component.name) {
                Some(value) => {
                    values.insert(component.name.clone(), value);
                }
                None => return Ok(None),
            }
        }
        Ok(Some(values))
    }

    // -- iteration ----------------------------------------------------------

    /// Visit every non-empty table whose shape includes `archetype`:
    /// `callback(size, rows, table_archetype)` once per table.
    pub fn for_each_entity<F>(&mut self, archetype: &Archetype, callback: F) -> Result<(), StoreError>
    where
        F: FnMut(usize, Rows<'_>, &Archetype),
    {
        let start = self.resolve(archetype)?;
        self.graph.for_each_row(start, true, callback);
        Ok(())
    }

    /// Like [`for_each_entity`](Self::for_each_entity) with writable columns.
    ///
    /// Component definitions are never visited and the `id` column is not
    /// writable, see [`RowsMut::column_mut`].
    pub fn for_each_entity_mut<F>(&mut self, archetype: &Archetype, callback: F) -> Result<(), StoreError>
    where
        F: FnMut(usize, RowsMut<'_>, &Archetype),
    {
        let start = self.resolve(archetype)?;
        let definitions = self.registry.table();
        self.graph
            .for_each_row_mut(start, true, Some(definitions), callback);
        Ok(())
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Column;
    use serde_json::json;

    fn number() -> Schema {
        Schema::new(json!({ "type": "number" }))
    }

    #[test]
    fn bootstrap_registers_core_components() {
        let store = Store::new();
        let names: Vec<_> = store
            .components()
            .into_iter()
            .map(|c| (c.id.to_raw(), c.name))
            .collect();
        assert_eq!(
            names,
            vec![(0, "id".to_owned()), (1, "name".to_owned()), (2, "schema".to_owned())]
        );
        assert_eq!(store.entity_count(), 3);
        assert_eq!(store.archetype_count(), 2);
        assert_eq!(store.graph().table(store.registry.table()).len(), 3);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = StoreConfig {
            initial_table_capacity: 0,
            ..StoreConfig::default()
        };
        assert!(matches!(
            Store::with_config(config),
            Err(StoreError::InvalidConfig { .. })
        ));
        let config = StoreConfig {
            initial_directory_capacity: 0,
            ..StoreConfig::default()
        };
        assert!(Store::with_config(config).is_err());
    }

    #[test]
    fn small_capacities_still_bootstrap() {
        let store = Store::with_config(StoreConfig {
            initial_table_capacity: 1,
            initial_directory_capacity: 1,
        })
        .unwrap();
        assert_eq!(store.component("schema").unwrap().id, Entity(2));
    }

    #[test]
    fn create_component_reads_back_definition() {
        let mut store = Store::new();
        let mass = store.create_component("mass", number()).unwrap();
        assert_eq!(mass.id, Entity(3));
        assert_eq!(mass.name, "mass");
        assert_eq!(mass.schema, number());
        assert_eq!(store.component("mass"), Some(mass));
        assert_eq!(store.component("Mass"), None);
    }

    #[test]
    fn root_entities_have_no_values() {
        let mut store = Store::new();
        let mass = store.create_component("mass", number()).unwrap();
        let e = store.create_entity();
        assert_eq!(store.location(e).unwrap().archetype_id, ArchetypeId::ROOT);
        assert_eq!(store.get_value(e, &mass).unwrap(), None);
    }

    #[test]
    fn missing_and_unknown_values_fail_without_allocating() {
        let mut store = Store::new();
        let mass = store.create_component("mass", number()).unwrap();
        let archetype = store.archetype(vec![mass]).unwrap();
        let before = store.entity_count();

        let err = store.create_entity_with(&archetype, Values::new()).unwrap_err();
        assert!(matches!(err, StoreError::MissingValue { .. }));

        let mut values = Values::new();
        values.insert("mass".to_owned(), Value::from(1.0));
        values.insert("speed".to_owned(), Value::from(1.0));
        let err = store.create_entity_with(&archetype, values).unwrap_err();
        assert!(matches!(err, StoreError::NotInArchetype { .. }));

        let mut values = Values::new();
        values.insert("mass".to_owned(), Value::from("heavy"));
        let err = store.create_entity_with(&archetype, values).unwrap_err();
        assert!(matches!(err, StoreError::ShapeMismatch { .. }));

        assert_eq!(store.entity_count(), before);
        let next = store.create_entity();
        assert_eq!(next.to_raw() as usize, before);
    }

    #[test]
    fn forged_component_is_unknown() {
        let mut store = Store::new();
        let forged = Component {
            id: Entity(77),
            name: "ghost".to_owned(),
            schema: number(),
        };
        assert!(matches!(
            store.archetype(vec![forged.clone()]),
            Err(StoreError::UnknownComponent { .. })
        ));
        let e = store.create_entity();
        assert!(matches!(
            store.set_value(e, &forged, Some(Value::from(1.0))),
            Err(StoreError::UnknownComponent { .. })
        ));
    }

    #[test]
    fn component_entities_are_protected() {
        let mut store = Store::new();
        let mass = store.create_component("mass", number()).unwrap();
        let name = store.component("name").unwrap();
        assert!(matches!(
            store.delete_entity(mass.id),
            Err(StoreError::ProtectedEntity { .. })
        ));
        assert!(matches!(
            store.set_value(mass.id, &name, Some(Value::from("renamed"))),
            Err(StoreError::ProtectedEntity { .. })
        ));
        assert_eq!(store.component("mass"), Some(mass));
    }

    #[test]
    fn cannot_migrate_into_registry_table() {
        let mut store = Store::new();
        let name = store.component("name").unwrap();
        let schema = store.component("schema").unwrap();
        let id = store.component("id").unwrap();
        let archetype = store.archetype(vec![name, schema]).unwrap();
        let mut values = Values::new();
        values.insert("name".to_owned(), Value::from("fake"));
        values.insert("schema".to_owned(), Value::Json(json!({})));
        let e = store.create_entity_with(&archetype, values).unwrap();
        assert!(matches!(
            store.set_value(e, &id, Some(Value::from(0))),
            Err(StoreError::ProtectedEntity { .. })
        ));
        assert!(store.component("fake").is_none());
    }

    #[test]
    fn id_component_is_auto_populated() {
        let mut store = Store::new();
        let id = store.component("id").unwrap();
        let mass = store.create_component("mass", number()).unwrap();
        let archetype = store.archetype(vec![id.clone(), mass.clone()]).unwrap();
        let mut values = Values::new();
        values.insert("mass".to_owned(), Value::from(2.0));
        values.insert("id".to_owned(), Value::from(999));
        let e = store.create_entity_with(&archetype, values).unwrap();
        assert_eq!(store.get_value(e, &id).unwrap(), Some(Value::from(e.to_raw())));

        // Gaining `id` later records the entity's own id as well.
        let other = store.create_entity();
        store.set_value(other, &id, Some(Value::from(12345))).unwrap();
        assert_eq!(
            store.get_value(other, &id).unwrap(),
            Some(Value::from(other.to_raw()))
        );
    }

    #[test]
    fn dead_entities_fail_fast() {
        let mut store = Store::new();
        let mass = store.create_component("mass", number()).unwrap();
        let e = store.create_entity();
        store.delete_entity(e).unwrap();
        assert!(!store.is_alive(e));
        assert!(matches!(store.delete_entity(e), Err(StoreError::UnknownLocation { .. })));
        assert!(store.get_value(e, &mass).is_err());
        assert!(store.set_value(e, &mass, Some(Value::from(1.0))).is_err());
        assert!(store
            .read_entity_as(&Archetype::empty(), e)
            .is_err());
        assert!(store.get_value(Entity::from_raw(10_000), &mass).is_err());
    }

    #[test]
    fn set_none_on_missing_component_is_noop() {
        let mut store = Store::new();
        let mass = store.create_component("mass", number()).unwrap();
        let e = store.create_entity();
        store.set_value(e, &mass, None).unwrap();
        assert_eq!(store.location(e).unwrap().archetype_id, ArchetypeId::ROOT);
    }

    #[test]
    fn in_place_update_does_not_migrate() {
        let mut store = Store::new();
        let mass = store.create_component("mass", number()).unwrap();
        let e = store.create_entity();
        store.set_value(e, &mass, Some(Value::from(1.0))).unwrap();
        let loc = store.location(e).unwrap();
        store.set_value(e, &mass, Some(Value::from(5.0))).unwrap();
        assert_eq!(store.location(e), Some(loc));
        assert_eq!(store.get_value(e, &mass).unwrap(), Some(Value::Number(5.0)));
        assert!(matches!(
            store.set_value(e, &mass, Some(Value::from(false))),
            Err(StoreError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn failed_migration_leaves_entity_in_place() {
        let mut store = Store::new();
        let mass = store.create_component("mass", number()).unwrap();
        let e = store.create_entity();
        let loc = store.location(e).unwrap();
        let tables = store.archetype_count();
        assert!(matches!(
            store.set_value(e, &mass, Some(Value::from("x"))),
            Err(StoreError::ShapeMismatch { .. })
        ));
        assert_eq!(store.location(e), Some(loc));
        assert_eq!(store.graph().table(ArchetypeId::ROOT).entities(), &[e]);
        assert_eq!(store.archetype_count(), tables);
        assert!(store.graph().find("mass").is_none());
    }

    #[test]
    fn failed_creation_builds_no_table() {
        let mut store = Store::new();
        let mass = store.create_component("mass", number()).unwrap();
        let archetype = Archetype::new(vec![mass]).unwrap();
        let tables = store.archetype_count();
        let mut values = Values::new();
        values.insert("mass".to_owned(), Value::from(true));
        assert!(store.create_entity_with(&archetype, values).is_err());
        assert_eq!(store.archetype_count(), tables);
    }

    #[test]
    fn reshaped_component_is_unknown() {
        let mut store = Store::new();
        let mass = store.create_component("mass", number()).unwrap();
        let mut as_text = mass.clone();
        as_text.schema = Schema::new(json!({ "type": "string" }));
        let tables = store.archetype_count();

        assert!(matches!(
            store.archetype(vec![as_text.clone()]),
            Err(StoreError::UnknownComponent { .. })
        ));
        let e = store.create_entity();
        assert!(matches!(
            store.set_value(e, &as_text, Some(Value::from("heavy"))),
            Err(StoreError::UnknownComponent { .. })
        ));
        assert_eq!(store.archetype_count(), tables);

        store.set_value(e, &mass, Some(Value::from(2.0))).unwrap();
        assert!(store.get_value(e, &as_text).is_err());
        assert_eq!(store.get_value(e, &mass).unwrap(), Some(Value::Number(2.0)));
    }

    #[test]
    fn id_is_not_overwritten_in_place() {
        let mut store = Store::new();
        let id = store.component("id").unwrap();
        let e = store.create_entity();
        store.set_value(e, &id, Some(Value::from(e.to_raw()))).unwrap();
        let loc = store.location(e).unwrap();

        store.set_value(e, &id, Some(Value::from(999))).unwrap();
        assert_eq!(store.location(e), Some(loc));
        assert_eq!(store.get_value(e, &id).unwrap(), Some(Value::from(e.to_raw())));
    }

    #[test]
    fn writable_pass_cannot_touch_definitions() {
        let mut store = Store::new();
        store.create_component("alpha", number()).unwrap();
        let id = store.component("id").unwrap();
        let name = store.component("name").unwrap();
        let e = store.create_entity();
        store.set_value(e, &name, Some(Value::from("plain"))).unwrap();

        let only_name = store.archetype(vec![name.clone()]).unwrap();
        let mut visited = Vec::new();
        store
            .for_each_entity_mut(&only_name, |size, mut rows, archetype| {
                visited.push(archetype.key().to_owned());
                if let Some(names) = rows.column_mut("name").and_then(Column::as_texts_mut) {
                    for n in &mut names[..size] {
                        *n = "beta".to_owned();
                    }
                }
            })
            .unwrap();
        assert_eq!(visited, vec!["name"]);
        assert_eq!(store.get_value(e, &name).unwrap(), Some(Value::from("beta")));
        assert_eq!(store.component("alpha").unwrap().name, "alpha");
        assert!(store.component("beta").is_none());

        let only_id = store.archetype(vec![id.clone()]).unwrap();
        let other = store.create_entity();
        store.set_value(other, &id, Some(Value::from(0))).unwrap();
        store
            .for_each_entity_mut(&only_id, |_, mut rows, _| {
                assert!(rows.column_mut("id").is_none());
            })
            .unwrap();
        assert_eq!(store.component("id").unwrap().id, Entity(0));
        assert_eq!(store.get_value(other, &id).unwrap(), Some(Value::from(other.to_raw())));
    }
}
