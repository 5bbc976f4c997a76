//! Store snapshot and fingerprint support.
//!
//! [`StoreSnapshot`] is a serializable view of the store's physical state:
//! the entity directory flattened into `(archetype_id, row)` pairs and the
//! live portion of every non-empty table, keyed by canonical key. All maps
//! are `BTreeMap`s so the JSON form, and therefore the hash, is stable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::storage::Value;
use crate::store::Store;

// ---------------------------------------------------------------------------
// Snapshot types
// ---------------------------------------------------------------------------

/// Column values of one table, keyed by component name.
pub type TableSnapshot = BTreeMap<String, Vec<Value>>;

/// A complete, serializable picture of a [`Store`].
///
/// Column values are written as plain JSON, so deserializing recovers the
/// JSON form but not always the [`Value`] variant: a scalar held in a JSON
/// column (`Value::Json(7)`) comes back as `Value::Integer(7)`. Compare
/// deserialized snapshots by [`hash`](Self::hash) or by their JSON form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSnapshot {
    /// Directory records for every id ever allocated, as alternating
    /// archetype id and row. Deleted ids keep their last record.
    pub entities: Vec<u32>,
    /// Non-empty tables by canonical key, each column cut to its live rows.
    pub archetypes: BTreeMap<String, TableSnapshot>,
}

impl StoreSnapshot {
    /// BLAKE3 hex digest of the snapshot's JSON bytes.
    ///
    /// Two stores driven through the same operations hash identically.
    pub fn hash(&self) -> String {
        let json_bytes =
            serde_json::to_vec(self).expect("StoreSnapshot should always be JSON-serializable");
        blake3::hash(&json_bytes).to_hex().to_string()
    }

    /// Rows of the table with canonical key `key`, or zero if it is empty or
    /// missing.
    pub fn table_len(&self, key: &str) -> usize {
        self.archetypes
            .get(key)
            .and_then(|table| table.values().next())
            .map_or(0, Vec::len)
    }
}

// ---------------------------------------------------------------------------
// Store snapshot impl
// ---------------------------------------------------------------------------

impl Store {
    /// Capture the current directory and table contents.
    pub fn snapshot(&self) -> StoreSnapshot {
        let archetypes = self
            .graph
            .tables()
            .filter(|table| !table.is_empty())
            .map(|table| {
                let columns = table
                    .archetype()
                    .components()
                    .iter()
                    .filter_map(|c| {
                        let column = table.column(&c.name)?;
                        Some((c.name.clone(), column.slice(table.len())))
                    })
                    .collect();
                (table.archetype().key().to_owned(), columns)
            })
            .collect();

        StoreSnapshot {
            entities: self.directory.records().to_vec(),
            archetypes,
        }
    }

    /// The snapshot as a JSON document.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).expect("StoreSnapshot should always be JSON-serializable")
    }

    /// Shorthand for `snapshot().hash()`.
    pub fn state_hash(&self) -> String {
        self.snapshot().hash()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
