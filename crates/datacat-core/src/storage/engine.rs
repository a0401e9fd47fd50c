//! Catalog store implementation.

use std::collections::{BTreeMap, HashSet};

use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};
use sled::{Db, Transactional, Tree};

use super::key::{EdgeKey, SlotKey, TypeIndexKey};
use super::StorageConfig;
use crate::error::Error;
use crate::model::{CatalogRecord, LoadedRecord, SimpleRelationType};

/// Tree name for record attributes.
const RECORDS_TREE: &str = "records";

/// Tree name for the ordered record type index.
const TYPE_INDEX_TREE: &str = "index:record_type";

/// Tree name for outgoing edges.
const EDGES_TREE: &str = "edges";

/// Tree name for the derived incoming edges.
const INVERSE_TREE: &str = "edges:inverse";

/// Tree name for the per-slot target manifests.
const SLOTS_TREE: &str = "edges:slots";

const EMPTY: &[u8] = &[];

/// The graph store wrapping sled.
///
/// Every outgoing edge has a mirrored entry in the inverse tree and is listed in
/// its slot's manifest. All three are only ever written together inside one
/// sled transaction that first reads the manifest, so the incoming view never
/// drifts from the outgoing one and concurrent replaces of one slot serialize.
pub struct CatalogStore {
    /// The underlying sled database.
    db: Db,

    /// Record id -> rkyv encoded record.
    records: Tree,

    /// (kind, created_at, id) -> empty.
    type_index: Tree,

    /// (from, relation, to) -> empty.
    edges: Tree,

    /// (to, relation, from) -> empty.
    inverse: Tree,

    /// (from, relation) -> target ids.
    slots: Tree,
}

impl CatalogStore {
    /// Open or create a store with the given configuration.
    pub fn open(config: StorageConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let records = db.open_tree(RECORDS_TREE)?;
        let type_index = db.open_tree(TYPE_INDEX_TREE)?;
        let edges = db.open_tree(EDGES_TREE)?;
        let inverse = db.open_tree(INVERSE_TREE)?;
        let slots = db.open_tree(SLOTS_TREE)?;

        Ok(Self {
            db,
            records,
            type_index,
            edges,
            inverse,
            slots,
        })
    }

    /// Check if the database was recovered from a previous crash.
    pub fn was_recovered(&self) -> bool {
        self.db.was_recovered()
    }

    // ========== Records ==========

    /// Insert a new record. Fails if the id is already taken.
    pub fn insert_record(&self, record: &CatalogRecord) -> Result<(), Error> {
        CatalogRecord::validate_id(&record.id)?;
        let value = record.to_bytes()?;
        let index_key =
            TypeIndexKey::new(record.kind.label(), record.created_at, record.id.as_str()).encode();
        let id = record.id.as_bytes();

        (&self.records, &self.type_index)
            .transaction(|(records, index)| {
                if records.get(id)?.is_some() {
                    return Err(ConflictableTransactionError::Abort(Error::DuplicateId(
                        record.id.clone(),
                    )));
                }
                records.insert(id, value.clone())?;
                index.insert(index_key.clone(), EMPTY)?;
                Ok(())
            })
            .map_err(map_tx_error)
    }

    /// Overwrite the attributes of an existing record.
    ///
    /// Id, kind and creation time are immutable; the stored values win if the
    /// caller passes different ones.
    pub fn update_record(&self, record: &CatalogRecord) -> Result<CatalogRecord, Error> {
        let existing = self
            .get_record(&record.id)?
            .ok_or_else(|| Error::not_found("catalog", record.id.as_str()))?;

        let mut updated = record.clone();
        updated.kind = existing.kind;
        updated.created_at = existing.created_at;

        self.records
            .insert(updated.id.as_bytes(), updated.to_bytes()?)?;
        Ok(updated)
    }

    /// Get a record by id.
    pub fn get_record(&self, id: &str) -> Result<Option<CatalogRecord>, Error> {
        match self.records.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(CatalogRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Check if a record exists.
    pub fn contains(&self, id: &str) -> Result<bool, Error> {
        Ok(self.records.contains_key(id.as_bytes())?)
    }

    /// Best-effort bulk lookup.
    ///
    /// Ids that do not resolve are dropped, duplicates are collapsed, and the
    /// request order is preserved.
    pub fn get_records<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<CatalogRecord>, Error> {
        let mut seen = HashSet::new();
        let mut found = Vec::with_capacity(ids.len());
        for id in ids {
            let id = id.as_ref();
            if !seen.insert(id) {
                continue;
            }
            if let Some(record) = self.get_record(id)? {
                found.push(record);
            }
        }
        Ok(found)
    }

    /// Load a record with its one-hop relationships.
    pub fn load(&self, id: &str) -> Result<Option<LoadedRecord>, Error> {
        let record = match self.get_record(id)? {
            Some(record) => record,
            None => return Ok(None),
        };
        Ok(Some(LoadedRecord {
            outgoing: self.collect_edges(&self.edges, id, false)?,
            incoming: self.collect_edges(&self.inverse, id, true)?,
            record,
        }))
    }

    /// Delete a record together with every edge touching it.
    pub fn delete_record(&self, id: &str) -> Result<Option<CatalogRecord>, Error> {
        let record = match self.get_record(id)? {
            Some(record) => record,
            None => return Ok(None),
        };

        let mut referencing = Vec::new();
        for entry in self.inverse.scan_prefix(EdgeKey::record_prefix(id)) {
            let (key, _) = entry?;
            let edge = EdgeKey::decode_inverse(&key).ok_or(Error::InvalidKey)?;
            referencing.push(SlotKey::new(edge.from, edge.relation));
        }

        let index_key = TypeIndexKey::new(record.kind.label(), record.created_at, id).encode();

        (
            &self.records,
            &self.type_index,
            &self.slots,
            &self.edges,
            &self.inverse,
        )
            .transaction(|(records, index, slots, edges, inverse)| {
                records.remove(id.as_bytes())?;
                index.remove(index_key.clone())?;

                for relation in SimpleRelationType::ALL {
                    let slot = SlotKey::new(id, relation.label());
                    for to in read_slot(slots, &slot)? {
                        remove_edge(edges, inverse, &slot.edge(to))?;
                    }
                    slots.remove(slot.encode())?;
                }

                for slot in &referencing {
                    let mut targets = read_slot(slots, slot)?;
                    targets.retain(|to| to != id);
                    write_slot(slots, slot, &targets)?;
                    remove_edge(edges, inverse, &slot.edge(id))?;
                }
                Ok(())
            })
            .map_err(map_tx_error)?;

        Ok(Some(record))
    }

    // ========== Edges ==========

    /// Target ids of the outgoing edges of one relation, in key order.
    pub fn outgoing(&self, id: &str, relation: SimpleRelationType) -> Result<Vec<String>, Error> {
        let prefix = EdgeKey::prefix(id, relation.label());
        self.edges
            .scan_prefix(&prefix)
            .map(|entry| {
                let (key, _) = entry?;
                EdgeKey::decode(&key)
                    .map(|edge| edge.to)
                    .ok_or(Error::InvalidKey)
            })
            .collect()
    }

    /// Source ids of the incoming edges of one relation, in key order.
    pub fn incoming(&self, id: &str, relation: SimpleRelationType) -> Result<Vec<String>, Error> {
        let prefix = EdgeKey::prefix(id, relation.label());
        self.inverse
            .scan_prefix(&prefix)
            .map(|entry| {
                let (key, _) = entry?;
                EdgeKey::decode_inverse(&key)
                    .map(|edge| edge.from)
                    .ok_or(Error::InvalidKey)
            })
            .collect()
    }

    /// Check whether a record has any outgoing edge of one relation.
    pub fn has_outgoing(&self, id: &str, relation: SimpleRelationType) -> Result<bool, Error> {
        let prefix = EdgeKey::prefix(id, relation.label());
        Ok(self.edges.scan_prefix(&prefix).next().transpose()?.is_some())
    }

    /// Replace every outgoing edge of one relation with edges to `targets`.
    ///
    /// The current targets are read from the slot manifest, removed, and the
    /// new ones written in a single transaction.
    pub fn replace_edges<S: AsRef<str>>(
        &self,
        id: &str,
        relation: SimpleRelationType,
        targets: &[S],
    ) -> Result<(), Error> {
        let slot = SlotKey::new(id, relation.label());
        let mut seen = HashSet::new();
        let new: Vec<String> = targets
            .iter()
            .map(|to| to.as_ref())
            .filter(|to| seen.insert(*to))
            .map(str::to_string)
            .collect();

        self.edge_transaction(|slots, edges, inverse| {
            for to in read_slot(slots, &slot)? {
                remove_edge(edges, inverse, &slot.edge(to))?;
            }
            for to in &new {
                insert_edge(edges, inverse, &slot.edge(to.as_str()))?;
            }
            write_slot(slots, &slot, &new)?;
            Ok(())
        })
    }

    /// Add a single edge, keeping existing ones.
    pub fn add_edge(&self, id: &str, relation: SimpleRelationType, to: &str) -> Result<(), Error> {
        let slot = SlotKey::new(id, relation.label());

        self.edge_transaction(|slots, edges, inverse| {
            let mut targets = read_slot(slots, &slot)?;
            if !targets.iter().any(|t| t == to) {
                targets.push(to.to_string());
                insert_edge(edges, inverse, &slot.edge(to))?;
                write_slot(slots, &slot, &targets)?;
            }
            Ok(())
        })
    }

    /// Remove every outgoing edge of one relation. Returns how many were removed.
    pub fn clear_edges(&self, id: &str, relation: SimpleRelationType) -> Result<usize, Error> {
        let slot = SlotKey::new(id, relation.label());

        self.edge_transaction(|slots, edges, inverse| {
            let old = read_slot(slots, &slot)?;
            for to in &old {
                remove_edge(edges, inverse, &slot.edge(to.as_str()))?;
            }
            slots.remove(slot.encode())?;
            Ok(old.len())
        })
    }

    fn edge_transaction<T>(
        &self,
        f: impl Fn(
            &TransactionalTree,
            &TransactionalTree,
            &TransactionalTree,
        ) -> ConflictableTransactionResult<T, Error>,
    ) -> Result<T, Error> {
        (&self.slots, &self.edges, &self.inverse)
            .transaction(|(slots, edges, inverse)| f(slots, edges, inverse))
            .map_err(map_tx_error)
    }

    fn collect_edges(
        &self,
        tree: &Tree,
        id: &str,
        inverse: bool,
    ) -> Result<BTreeMap<SimpleRelationType, Vec<String>>, Error> {
        let mut grouped: BTreeMap<SimpleRelationType, Vec<String>> = BTreeMap::new();
        for entry in tree.scan_prefix(EdgeKey::record_prefix(id)) {
            let (key, _) = entry?;
            let edge = if inverse {
                EdgeKey::decode_inverse(&key)
            } else {
                EdgeKey::decode(&key)
            }
            .ok_or(Error::InvalidKey)?;

            // Labels written by other tooling are not part of the typed model.
            let Some(relation) = SimpleRelationType::from_label(&edge.relation) else {
                continue;
            };
            let other = if inverse { edge.from } else { edge.to };
            grouped.entry(relation).or_default().push(other);
        }
        Ok(grouped)
    }

    // ========== Type index ==========

    /// Scan every record's index key in the total order (kind, creation time, id).
    pub fn scan_ordered(&self) -> impl Iterator<Item = Result<TypeIndexKey, Error>> + '_ {
        self.type_index.iter().map(|entry| {
            let (key, _) = entry?;
            TypeIndexKey::decode(&key).ok_or(Error::InvalidKey)
        })
    }

    /// Scan the index keys of one kind (descendants excluded), ordered by
    /// creation time then id.
    pub fn scan_kind(
        &self,
        kind: crate::model::RecordKind,
    ) -> impl Iterator<Item = Result<TypeIndexKey, Error>> + '_ {
        self.type_index
            .scan_prefix(TypeIndexKey::kind_prefix(kind.label()))
            .map(|entry| {
                let (key, _) = entry?;
                TypeIndexKey::decode(&key).ok_or(Error::InvalidKey)
            })
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.db.flush()?;
        Ok(())
    }

}

/// Current targets of a slot, read inside a transaction.
fn read_slot(
    slots: &TransactionalTree,
    slot: &SlotKey,
) -> ConflictableTransactionResult<Vec<String>, Error> {
    match slots.get(slot.encode())? {
        Some(bytes) => SlotKey::decode_targets(&bytes)
            .ok_or(ConflictableTransactionError::Abort(Error::InvalidKey)),
        None => Ok(Vec::new()),
    }
}

fn write_slot(
    slots: &TransactionalTree,
    slot: &SlotKey,
    targets: &[String],
) -> ConflictableTransactionResult<(), Error> {
    if targets.is_empty() {
        slots.remove(slot.encode())?;
    } else {
        slots.insert(slot.encode(), SlotKey::encode_targets(targets))?;
    }
    Ok(())
}

fn insert_edge(
    edges: &TransactionalTree,
    inverse: &TransactionalTree,
    edge: &EdgeKey,
) -> ConflictableTransactionResult<(), Error> {
    edges.insert(edge.encode(), EMPTY)?;
    inverse.insert(edge.encode_inverse(), EMPTY)?;
    Ok(())
}

fn remove_edge(
    edges: &TransactionalTree,
    inverse: &TransactionalTree,
    edge: &EdgeKey,
) -> ConflictableTransactionResult<(), Error> {
    edges.remove(edge.encode())?;
    inverse.remove(edge.encode_inverse())?;
    Ok(())
}

fn map_tx_error(e: TransactionError<Error>) -> Error {
    match e {
        TransactionError::Abort(e) => e,
        TransactionError::Storage(e) => Error::Storage(e),
    }
}
