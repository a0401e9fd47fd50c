//! Applying relationship mutations to stored records.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::rules::{ResolvedRule, RuleRegistry};
use crate::error::Error;
use crate::model::{Cardinality, LoadedRecord, SimpleRelationType};
use crate::storage::CatalogStore;

/// Result of a relationship mutation.
///
/// `Ignored` means no rule on the record's kind or any ancestor covers the
/// relation. Nothing was written; the record is returned as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "record", rename_all = "snake_case")]
pub enum MutationOutcome {
    Applied(LoadedRecord),
    Ignored(LoadedRecord),
}

impl MutationOutcome {
    /// Check whether the slot was written.
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied(_))
    }

    /// The record after the call.
    pub fn record(&self) -> &LoadedRecord {
        match self {
            MutationOutcome::Applied(record) | MutationOutcome::Ignored(record) => record,
        }
    }

    /// Consume into the record after the call.
    pub fn into_record(self) -> LoadedRecord {
        match self {
            MutationOutcome::Applied(record) | MutationOutcome::Ignored(record) => record,
        }
    }
}

/// Validates and applies typed relationship edits.
///
/// Checks run against the stored state before the write; the edge rewrite
/// itself is one store transaction, so a failed call leaves the slot as it
/// was.
pub struct RelationshipMutator<'a> {
    store: &'a CatalogStore,
    rules: &'a RuleRegistry,
}

impl<'a> RelationshipMutator<'a> {
    /// Create a mutator over a store and rule registry.
    pub fn new(store: &'a CatalogStore, rules: &'a RuleRegistry) -> Self {
        Self { store, rules }
    }

    /// Set the targets of one relationship slot of a record.
    ///
    /// Singleton slots take exactly one resolvable id and may not already be
    /// set. Multi slots take a non-empty list; ids that do not resolve to a
    /// record of the target kind are dropped and the slot is replaced with
    /// the rest.
    pub fn set_related_records<S: AsRef<str>>(
        &self,
        record_id: &str,
        related_ids: &[S],
        relation: SimpleRelationType,
    ) -> Result<MutationOutcome, Error> {
        let record = self
            .store
            .get_record(record_id)?
            .ok_or_else(|| Error::not_found("catalog", record_id))?;

        let Some(resolved) = self.rules.resolve(record.kind, relation) else {
            return self.ignore(record_id, record.kind.label(), relation);
        };

        let targets = match resolved.rule.cardinality {
            Cardinality::Singleton => self.singleton_target(record_id, related_ids, &resolved)?,
            Cardinality::Multi => self.multi_targets(related_ids, &resolved)?,
        };

        self.store.replace_edges(record_id, relation, &targets)?;
        info!(
            record_id,
            relation = %relation,
            targets = targets.len(),
            declared_on = %resolved.declared_on,
            "Relationship updated"
        );

        self.reload(record_id).map(MutationOutcome::Applied)
    }

    /// Remove every target of one relationship slot.
    ///
    /// This is the only way to empty a singleton slot.
    pub fn clear_relation(
        &self,
        record_id: &str,
        relation: SimpleRelationType,
    ) -> Result<MutationOutcome, Error> {
        let record = self
            .store
            .get_record(record_id)?
            .ok_or_else(|| Error::not_found("catalog", record_id))?;

        if self.rules.resolve(record.kind, relation).is_none() {
            return self.ignore(record_id, record.kind.label(), relation);
        }

        let removed = self.store.clear_edges(record_id, relation)?;
        info!(record_id, relation = %relation, removed, "Relationship cleared");

        self.reload(record_id).map(MutationOutcome::Applied)
    }

    fn singleton_target<S: AsRef<str>>(
        &self,
        record_id: &str,
        related_ids: &[S],
        resolved: &ResolvedRule,
    ) -> Result<Vec<String>, Error> {
        let relation = resolved.rule.relation;
        if self.store.has_outgoing(record_id, relation)? {
            return Err(Error::AlreadySet {
                record_id: record_id.to_string(),
                relation,
            });
        }

        let [target_id] = related_ids else {
            return Err(Error::CardinalityViolation {
                relation,
                expected: "exactly one",
                actual: related_ids.len(),
            });
        };
        let target_id = target_id.as_ref();

        match self.store.get_record(target_id)? {
            Some(target) if target.kind.is_a(resolved.rule.target) => Ok(vec![target.id]),
            _ => Err(Error::not_found(resolved.rule.target.label(), target_id)),
        }
    }

    fn multi_targets<S: AsRef<str>>(
        &self,
        related_ids: &[S],
        resolved: &ResolvedRule,
    ) -> Result<Vec<String>, Error> {
        if related_ids.is_empty() {
            return Err(Error::CardinalityViolation {
                relation: resolved.rule.relation,
                expected: "at least one",
                actual: 0,
            });
        }

        let targets: Vec<String> = self
            .store
            .get_records(related_ids)?
            .into_iter()
            .filter(|target| target.kind.is_a(resolved.rule.target))
            .map(|target| target.id)
            .collect();

        if targets.len() < related_ids.len() {
            debug!(
                relation = %resolved.rule.relation,
                requested = related_ids.len(),
                resolved = targets.len(),
                "Dropped unresolved targets"
            );
        }
        Ok(targets)
    }

    fn ignore(
        &self,
        record_id: &str,
        kind: &str,
        relation: SimpleRelationType,
    ) -> Result<MutationOutcome, Error> {
        warn!(record_id, kind, relation = %relation, "Unsupported relation type");
        self.reload(record_id).map(MutationOutcome::Ignored)
    }

    fn reload(&self, record_id: &str) -> Result<LoadedRecord, Error> {
        self.store
            .load(record_id)?
            .ok_or_else(|| Error::not_found("catalog", record_id))
    }
}
