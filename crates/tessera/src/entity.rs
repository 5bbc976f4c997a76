//! Entity identifiers and the entity directory.
//!
//! An [`Entity`] is a plain 32-bit id handed out sequentially and never
//! recycled. The [`EntityDirectory`] maps each id to the archetype table and
//! row currently holding its data. It is a flat array of `(archetype, row)`
//! pairs grown by doubling, indexed directly by entity id.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::archetype::ArchetypeId;

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// An opaque entity identifier.
///
/// Ids are allocated in increasing order starting at zero. Component
/// definitions are entities too, so the first ids of every store belong to
/// the core components.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(pub(crate) u32);

impl Entity {
    /// Construct an `Entity` from its raw id.
    #[inline]
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw `u32` representation.
    #[inline]
    pub fn to_raw(self) -> u32 {
        self.0
    }

    /// The id as a directory offset.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityLocation
// ---------------------------------------------------------------------------

/// Where an entity lives: which archetype table and which row within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLocation {
    pub archetype_id: ArchetypeId,
    pub row: usize,
}

// ---------------------------------------------------------------------------
// EntityDirectory
// ---------------------------------------------------------------------------

const ELEMENTS_PER_RECORD: usize = 2;

/// Flat `entity -> (archetype, row)` record array.
///
/// Records are stored as consecutive `u32` pairs at offset `2 * id`. The
/// directory does not track liveness; the store rejects deleted ids before
/// they reach it.
#[derive(Debug)]
pub struct EntityDirectory {
    records: Vec<u32>,
    count: usize,
    capacity: usize,
}

impl EntityDirectory {
    /// Create a directory with room for `capacity` records before growing.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: vec![0; capacity * ELEMENTS_PER_RECORD],
            count: 0,
            capacity,
        }
    }

    /// Allocate the next sequential id with a placeholder record.
    ///
    /// The caller must [`relocate`](Self::relocate) the id once its row has
    /// been written.
    pub fn create(&mut self) -> Entity {
        if self.count == self.capacity {
            let old = self.capacity;
            self.capacity *= 2;
            self.records.resize(self.capacity * ELEMENTS_PER_RECORD, 0);
            tracing::trace!(old_capacity = old, new_capacity = self.capacity, "entity directory grown");
        }
        let entity = Entity(self.count as u32);
        let offset = self.count * ELEMENTS_PER_RECORD;
        self.records[offset] = 0;
        self.records[offset + 1] = 0;
        self.count += 1;
        entity
    }

    /// Read the record for `entity`, or `None` if the id was never allocated.
    #[inline]
    pub fn locate(&self, entity: Entity) -> Option<EntityLocation> {
        if entity.index() >= self.count {
            return None;
        }
        let offset = entity.index() * ELEMENTS_PER_RECORD;
        Some(EntityLocation {
            archetype_id: ArchetypeId(self.records[offset]),
            row: self.records[offset + 1] as usize,
        })
    }

    /// Overwrite the record for `entity`.
    ///
    /// # Panics
    ///
    /// Panics if `entity` was never allocated by this directory.
    #[inline]
    pub fn relocate(&mut self, entity: Entity, archetype_id: ArchetypeId, row: usize) {
        assert!(
            entity.index() < self.count,
            "relocate on unallocated entity {entity}"
        );
        let offset = entity.index() * ELEMENTS_PER_RECORD;
        self.records[offset] = archetype_id.0;
        self.records[offset + 1] = row as u32;
    }

    /// Update only the row of an existing record (swap-remove fix-up).
    #[inline]
    pub fn set_row(&mut self, entity: Entity, row: usize) {
        if let Some(loc) = self.locate(entity) {
            self.relocate(entity, loc.archetype_id, row);
        }
    }

    /// Number of ids ever allocated.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether no id has been allocated yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Current record capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// All allocated records, flattened as alternating `(archetype, row)`.
    pub fn records(&self) -> &[u32] {
        &self.records[..self.count * ELEMENTS_PER_RECORD]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
