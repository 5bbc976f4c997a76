//! Archetypes and archetype tables.
//!
//! An [`Archetype`] is a set of components kept strictly sorted by name; its
//! comma-joined name list is the canonical key identifying one storage table.
//! An [`ArchetypeTable`] stores every entity of one archetype in a
//! Structure-of-Arrays layout: one [`Column`] per component plus a parallel
//! `Vec<Entity>` mapping each row back to the entity occupying it.
//!
//! Rows are not stable: [`ArchetypeTable::delete_row`] moves the last row
//! into the vacated slot and reports which entity moved, so the caller can
//! patch that entity's directory record.

use std::collections::HashMap;
use std::fmt;

use crate::component::{Component, ID};
use crate::entity::Entity;
use crate::storage::{Column, StorageProvider, Value, Values};
use crate::StoreError;

// ---------------------------------------------------------------------------
// ArchetypeId
// ---------------------------------------------------------------------------

/// Identifies an archetype table within the graph. Indices into the graph's
/// table vector, assigned sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchetypeId(pub(crate) u32);

impl ArchetypeId {
    /// The empty archetype every store starts with.
    pub const ROOT: ArchetypeId = ArchetypeId(0);

    /// Raw `u32` representation.
    #[inline]
    pub fn to_raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ArchetypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Archetype
// ---------------------------------------------------------------------------

/// Canonical lookup key of a sorted component list.
pub fn canonical_key(components: &[Component]) -> String {
    components
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

/// A set of components, strictly increasing by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archetype {
    components: Vec<Component>,
    key: String,
}

impl Archetype {
    /// Validate and wrap an already sorted component list.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Structural`] if any name is not strictly greater
    /// than its predecessor (unsorted or duplicated).
    pub fn new(components: Vec<Component>) -> Result<Self, StoreError> {
        for pair in components.windows(2) {
            if pair[0].name >= pair[1].name {
                return Err(StoreError::Structural {
                    previous: pair[0].name.clone(),
                    next: pair[1].name.clone(),
                });
            }
        }
        let key = canonical_key(&components);
        Ok(Self { components, key })
    }

    /// Sort `components` by name, then validate. Duplicates still fail.
    pub fn from_unsorted(mut components: Vec<Component>) -> Result<Self, StoreError> {
        components.sort_by(|a, b| a.name.cmp(&b.name));
        Self::new(components)
    }

    /// The archetype with no components.
    pub fn empty() -> Self {
        Self {
            components: Vec::new(),
            key: String::new(),
        }
    }

    /// The sorted components.
    #[inline]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Comma-joined sorted names.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Position of the component named `name`.
    #[inline]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.components
            .binary_search_by(|c| c.name.as_str().cmp(name))
            .ok()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// This set plus `component`, inserted at its sorted position.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Structural`] if a component of that name is
    /// already present.
    pub fn with(&self, component: &Component) -> Result<Self, StoreError> {
        match self
            .components
            .binary_search_by(|c| c.name.as_str().cmp(&component.name))
        {
            Ok(_) => Err(StoreError::Structural {
                previous: component.name.clone(),
                next: component.name.clone(),
            }),
            Err(at) => {
                let mut components = self.components.clone();
                components.insert(at, component.clone());
                Ok(Self {
                    key: canonical_key(&components),
                    components,
                })
            }
        }
    }

    /// This set without the component named `name`.
    pub fn without(&self, name: &str) -> Self {
        let components: Vec<Component> = self
            .components
            .iter()
            .filter(|c| c.name != name)
            .cloned()
            .collect();
        Self {
            key: canonical_key(&components),
            components,
        }
    }

    /// Whether every component of `self` is also in `other`.
    pub fn is_subset_of(&self, other: &Archetype) -> bool {
        self.components.len() <= other.components.len()
            && self.components.iter().all(|c| other.contains(&c.name))
    }
}

// ---------------------------------------------------------------------------
// Row views
// ---------------------------------------------------------------------------

/// Read-only view over the live rows of one table.
#[derive(Debug, Clone, Copy)]
pub struct Rows<'a> {
    archetype: &'a Archetype,
    columns: &'a [Column],
    entities: &'a [Entity],
}

impl<'a> Rows<'a> {
    /// Number of live rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The entity occupying each row.
    #[inline]
    pub fn entities(&self) -> &'a [Entity] {
        self.entities
    }

    /// The column for `name`. Only the first [`len`](Self::len) slots are live.
    pub fn column(&self, name: &str) -> Option<&'a Column> {
        self.archetype.position(name).map(|i| &self.columns[i])
    }

    /// Copy out one value.
    pub fn get(&self, row: usize, name: &str) -> Option<Value> {
        if row >= self.len() {
            return None;
        }
        self.column(name)?.get(row)
    }
}

/// Writable view over the live rows of one table. Shape cannot change
/// through it.
#[derive(Debug)]
pub struct RowsMut<'a> {
    archetype: &'a Archetype,
    columns: &'a mut [Column],
    entities: &'a [Entity],
}

impl<'a> RowsMut<'a> {
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    #[inline]
    pub fn entities(&self) -> &[Entity] {
        self.entities
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.archetype.position(name).map(|i| &self.columns[i])
    }

    /// Mutable column for `name`. Only the first [`len`](Self::len) slots
    /// are live.
    ///
    /// Always `None` for the reserved `id` column, which must keep holding
    /// each row's own entity id.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        if name == ID {
            return None;
        }
        self.archetype.position(name).map(|i| &mut self.columns[i])
    }
}

// ---------------------------------------------------------------------------
// ArchetypeTable
// ---------------------------------------------------------------------------

/// Which way a graph edge points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeDirection {
    Add,
    Remove,
}

impl EdgeDirection {
    /// The edge walked back from the destination.
    pub fn inverse(self) -> Self {
        match self {
            EdgeDirection::Add => EdgeDirection::Remove,
            EdgeDirection::Remove => EdgeDirection::Add,
        }
    }
}

/// Columnar storage for every entity of one archetype.
///
/// All columns share `capacity`; `size` of their slots are live.
#[derive(Debug)]
pub struct ArchetypeTable {
    id: ArchetypeId,
    archetype: Archetype,
    size: usize,
    capacity: usize,
    /// One column per component, same order as `archetype.components()`.
    columns: Vec<Column>,
    /// Row -> occupying entity. Always `size` long.
    entities: Vec<Entity>,
    /// Component id -> table reached by adding it.
    add_edges: HashMap<Entity, ArchetypeId>,
    /// Component id -> table reached by removing it.
    remove_edges: HashMap<Entity, ArchetypeId>,
    /// Every other table whose shape is a strict superset of this one.
    supersets: Vec<ArchetypeId>,
}

impl ArchetypeTable {
    /// Create an empty table with one column per component.
    pub fn new(
        id: ArchetypeId,
        archetype: Archetype,
        capacity: usize,
        provider: &dyn StorageProvider,
    ) -> Self {
        let columns = archetype
            .components()
            .iter()
            .map(|c| provider.create(&c.schema, capacity))
            .collect();
        Self {
            id,
            archetype,
            size: 0,
            capacity,
            columns,
            entities: Vec::with_capacity(capacity),
            add_edges: HashMap::new(),
            remove_edges: HashMap::new(),
            supersets: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> ArchetypeId {
        self.id
    }

    #[inline]
    pub fn archetype(&self) -> &Archetype {
        &self.archetype
    }

    /// Number of live rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The entity occupying each live row.
    #[inline]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.archetype.position(name).map(|i| &self.columns[i])
    }

    pub fn rows(&self) -> Rows<'_> {
        Rows {
            archetype: &self.archetype,
            columns: &self.columns,
            entities: &self.entities,
        }
    }

    pub fn rows_mut(&mut self) -> RowsMut<'_> {
        RowsMut {
            archetype: &self.archetype,
            columns: &mut self.columns,
            entities: &self.entities,
        }
    }

    /// Copy out the value of `name` at a live `row`.
    pub fn get(&self, row: usize, name: &str) -> Option<Value> {
        self.rows().get(row, name)
    }

    /// Copy out every component value at a live `row`, keyed by name.
    pub fn row_values(&self, row: usize) -> Values {
        if row >= self.size {
            return Values::new();
        }
        self.archetype
            .components()
            .iter()
            .zip(&self.columns)
            .filter_map(|(c, column)| column.get(row).map(|v| (c.name.clone(), v)))
            .collect()
    }

    /// Check that every entry of `values` names a column of this table and
    /// fits that column.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotInArchetype`] or [`StoreError::ShapeMismatch`].
    pub fn validate_values(&self, values: &Values) -> Result<(), StoreError> {
        for (name, value) in values {
            let index = self
                .archetype
                .position(name)
                .ok_or_else(|| StoreError::NotInArchetype {
                    component: name.clone(),
                    archetype: self.archetype.key().to_owned(),
                })?;
            let kind = self.columns[index].kind();
            if !kind.accepts(value) {
                return Err(StoreError::ShapeMismatch {
                    component: name.clone(),
                    expected: kind,
                    found: value.kind_name(),
                });
            }
        }
        Ok(())
    }

    /// Overwrite one value at a live `row`.
    pub fn set(&mut self, row: usize, name: &str, value: Value) -> Result<(), StoreError> {
        debug_assert!(row < self.size);
        let index = self
            .archetype
            .position(name)
            .ok_or_else(|| StoreError::NotInArchetype {
                component: name.to_owned(),
                archetype: self.archetype.key().to_owned(),
            })?;
        self.columns[index]
            .set(row, value)
            .map_err(|e| StoreError::ShapeMismatch {
                component: name.to_owned(),
                expected: e.expected,
                found: e.found,
            })
    }

    /// Append a row for `entity`, doubling capacity first if full, and write
    /// `values` into it. Components absent from `values` keep whatever the
    /// provider left in the slot.
    ///
    /// Returns the new row index. Nothing changes on error.
    pub fn create_row(
        &mut self,
        provider: &dyn StorageProvider,
        entity: Entity,
        values: Values,
    ) -> Result<usize, StoreError> {
        self.validate_values(&values)?;

        if self.size == self.capacity {
            let old = self.capacity;
            self.capacity = (self.capacity * 2).max(1);
            for (component, column) in self.archetype.components().iter().zip(&mut self.columns) {
                provider.resize(&component.schema, column, self.capacity);
            }
            tracing::trace!(
                archetype = %self.archetype.key(),
                old_capacity = old,
                new_capacity = self.capacity,
                "archetype table grown"
            );
        }

        let row = self.size;
        for (name, value) in values {
            self.set_unchecked(row, &name, value);
        }
        self.entities.push(entity);
        self.size += 1;
        Ok(row)
    }

    fn set_unchecked(&mut self, row: usize, name: &str, value: Value) {
        if let Some(index) = self.archetype.position(name) {
            // Already validated against this column's kind.
            let _ = self.columns[index].set(row, value);
        }
    }

    /// Remove `row` by moving the last row into it.
    ///
    /// Returns the entity that now occupies `row`, if one was moved. Its
    /// directory record must be updated by the caller.
    ///
    /// # Panics
    ///
    /// Panics if `row` is not live.
    pub fn delete_row(&mut self, row: usize) -> Option<Entity> {
        assert!(row < self.size, "delete_row({row}) out of {} live rows", self.size);
        self.size -= 1;
        if row != self.size {
            for column in &mut self.columns {
                column.swap(row, self.size);
            }
        }
        self.entities.swap_remove(row);
        if row < self.size {
            Some(self.entities[row])
        } else {
            None
        }
    }

    // -- edges --------------------------------------------------------------

    /// Memoized destination for adding/removing the component `component_id`.
    pub fn edge(&self, direction: EdgeDirection, component_id: Entity) -> Option<ArchetypeId> {
        match direction {
            EdgeDirection::Add => self.add_edges.get(&component_id).copied(),
            EdgeDirection::Remove => self.remove_edges.get(&component_id).copied(),
        }
    }

    pub(crate) fn set_edge(&mut self, direction: EdgeDirection, component_id: Entity, to: ArchetypeId) {
        match direction {
            EdgeDirection::Add => self.add_edges.insert(component_id, to),
            EdgeDirection::Remove => self.remove_edges.insert(component_id, to),
        };
    }

    pub(crate) fn add_superset(&mut self, id: ArchetypeId) {
        if !self.supersets.contains(&id) {
            self.supersets.push(id);
        }
    }

    /// Tables reachable in one step towards larger shapes: add-edges plus
    /// known strict supersets.
    pub(crate) fn descendants(&self) -> impl Iterator<Item = ArchetypeId> + '_ {
        self.add_edges.values().copied().chain(self.supersets.iter().copied())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
