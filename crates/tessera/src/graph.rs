//! The archetype graph.
//!
//! [`ArchetypeGraph`] owns every [`ArchetypeTable`] and is the single
//! authority mapping a component set to its table. Tables are created on
//! demand and looked up by canonical key. Transitions ("add component C",
//! "remove component C") are memoized as edges on the tables involved, in
//! both directions at once.

use std::collections::HashMap;

use crate::archetype::{Archetype, ArchetypeId, ArchetypeTable, EdgeDirection, Rows, RowsMut};
use crate::component::{Component, Schema};
use crate::entity::Entity;
use crate::storage::{ColumnKind, StorageProvider, Values};
use crate::StoreError;

/// All archetype tables plus the canonical-key index and transition edges.
#[derive(Debug)]
pub struct ArchetypeGraph {
    /// Indexed by `ArchetypeId.0`.
    tables: Vec<ArchetypeTable>,
    /// Canonical key -> table.
    lookup: HashMap<String, ArchetypeId>,
    provider: Box<dyn StorageProvider>,
    initial_capacity: usize,
}

impl ArchetypeGraph {
    /// Create a graph holding only the empty root table.
    pub fn new(provider: Box<dyn StorageProvider>, initial_capacity: usize) -> Self {
        let mut graph = Self {
            tables: Vec::new(),
            lookup: HashMap::new(),
            provider,
            initial_capacity,
        };
        let root = graph.get_or_create(&Archetype::empty());
        debug_assert_eq!(root, ArchetypeId::ROOT);
        graph
    }

    /// Find the table for `archetype`, creating it if needed. Idempotent by
    /// canonical key.
    pub fn get_or_create(&mut self, archetype: &Archetype) -> ArchetypeId {
        if let Some(&id) = self.lookup.get(archetype.key()) {
            return id;
        }
        let id = ArchetypeId(self.tables.len() as u32);
        let mut table = ArchetypeTable::new(
            id,
            archetype.clone(),
            self.initial_capacity,
            self.provider.as_ref(),
        );

        for existing in &mut self.tables {
            if existing.archetype().len() < archetype.len()
                && existing.archetype().is_subset_of(archetype)
            {
                existing.add_superset(id);
            } else if archetype.len() < existing.archetype().len()
                && archetype.is_subset_of(existing.archetype())
            {
                table.add_superset(existing.id());
            }
        }

        tracing::debug!(archetype_id = %id, key = %archetype.key(), "archetype table created");
        self.tables.push(table);
        self.lookup.insert(archetype.key().to_owned(), id);
        id
    }

    /// Find the table for a canonical key without creating it.
    pub fn find(&self, key: &str) -> Option<ArchetypeId> {
        self.lookup.get(key).copied()
    }

    /// Destination of adding or removing `component` from table `from`.
    ///
    /// On first use the destination is resolved through
    /// [`get_or_create`](Self::get_or_create) and the edge is stored on both
    /// tables (forward on `from`, inverse on the destination). Adding a
    /// component already present, or removing an absent one, stays put.
    pub fn edge(
        &mut self,
        from: ArchetypeId,
        component: &Component,
        direction: EdgeDirection,
    ) -> Result<ArchetypeId, StoreError> {
        let source = &self.tables[from.index()];
        if let Some(to) = source.edge(direction, component.id) {
            return Ok(to);
        }
        let present = source.archetype().contains(&component.name);
        let target = match direction {
            EdgeDirection::Add if present => return Ok(from),
            EdgeDirection::Remove if !present => return Ok(from),
            EdgeDirection::Add => source.archetype().with(component)?,
            EdgeDirection::Remove => source.archetype().without(&component.name),
        };
        let to = self.get_or_create(&target);
        self.tables[from.index()].set_edge(direction, component.id, to);
        self.tables[to.index()].set_edge(direction.inverse(), component.id, from);
        Ok(to)
    }

    #[inline]
    pub fn table(&self, id: ArchetypeId) -> &ArchetypeTable {
        &self.tables[id.index()]
    }

    #[inline]
    pub fn table_mut(&mut self, id: ArchetypeId) -> &mut ArchetypeTable {
        &mut self.tables[id.index()]
    }

    /// All tables in id order.
    pub fn tables(&self) -> impl Iterator<Item = &ArchetypeTable> {
        self.tables.iter()
    }

    /// Number of tables, including the root.
    #[inline]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// The column kind this graph's provider uses for `schema`.
    pub fn column_kind(&self, schema: &Schema) -> ColumnKind {
        self.provider.kind(schema)
    }

    /// Append a row to table `id` using this graph's storage provider.
    pub fn create_row(
        &mut self,
        id: ArchetypeId,
        entity: Entity,
        values: Values,
    ) -> Result<usize, StoreError> {
        self.tables[id.index()].create_row(self.provider.as_ref(), entity, values)
    }

    /// Swap-remove a row of table `id`; see [`ArchetypeTable::delete_row`].
    pub fn delete_row(&mut self, id: ArchetypeId, row: usize) -> Option<Entity> {
        self.tables[id.index()].delete_row(row)
    }

    /// `start` followed, if `include_descendants`, by every table reachable
    /// towards larger shapes. Each table appears once.
    fn visit_order(&self, start: ArchetypeId, include_descendants: bool) -> Vec<ArchetypeId> {
        if !include_descendants {
            return vec![start];
        }
        let mut visited = vec![false; self.tables.len()];
        let mut order = Vec::new();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut visited[id.index()], true) {
                continue;
            }
            order.push(id);
            stack.extend(
                self.tables[id.index()]
                    .descendants()
                    .filter(|next| !visited[next.index()]),
            );
        }
        order
    }

    /// Call `callback(size, rows, archetype)` for every non-empty table in
    /// the visit order of `start`. No order is guaranteed between sibling
    /// tables.
    pub fn for_each_row<F>(&self, start: ArchetypeId, include_descendants: bool, mut callback: F)
    where
        F: FnMut(usize, Rows<'_>, &Archetype),
    {
        for id in self.visit_order(start, include_descendants) {
            let table = &self.tables[id.index()];
            if !table.is_empty() {
                callback(table.len(), table.rows(), table.archetype());
            }
        }
    }

    /// Like [`for_each_row`](Self::for_each_row) with writable columns.
    /// The `read_only` table, if any, is left out of the pass.
    pub fn for_each_row_mut<F>(
        &mut self,
        start: ArchetypeId,
        include_descendants: bool,
        read_only: Option<ArchetypeId>,
        mut callback: F,
    ) where
        F: FnMut(usize, RowsMut<'_>, &Archetype),
    {
        for id in self.visit_order(start, include_descendants) {
            if Some(id) == read_only {
                continue;
            }
            let table = &mut self.tables[id.index()];
            if !table.is_empty() {
                let size = table.len();
                let archetype = table.archetype().clone();
                callback(size, table.rows_mut(), &archetype);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
