//! Specification execution against the catalog store.

use tracing::{debug, warn};

use super::specification::{CatalogRecordSpecification, Page, Pagination};
use crate::error::Error;
use crate::model::{CatalogRecord, LoadedRecord, RecordKind, SimpleRelationType};
use crate::storage::{CatalogStore, TypeIndexKey};

/// How candidate records are enumerated for a specification.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanPlan {
    /// Point lookups for an explicit id list.
    Ids(Vec<String>),
    /// Prefix scans of the type index, one per concrete kind.
    Kinds(Vec<RecordKind>),
    /// Full scan of the type index.
    Full,
}

impl ScanPlan {
    /// Pick the narrowest scan that still yields every possible match.
    pub fn for_spec(spec: &CatalogRecordSpecification) -> Self {
        if !spec.id_in.is_empty() {
            return ScanPlan::Ids(spec.id_in.clone());
        }
        if spec.kind_in.is_empty() {
            return ScanPlan::Full;
        }

        // Index keys sort by kind label first, so scanning kinds in label
        // order keeps the overall result in index order.
        let mut kinds: Vec<RecordKind> = RecordKind::ALL
            .iter()
            .copied()
            .filter(|kind| spec.matches_kind(*kind))
            .collect();
        kinds.sort_by_key(|kind| kind.label());
        ScanPlan::Kinds(kinds)
    }
}

/// Executes specifications and relation lookups.
///
/// Results are always in the stable order (kind label, creation time, id) of
/// the type index, which makes offset pagination deterministic.
pub struct QueryExecutor<'a> {
    store: &'a CatalogStore,
}

impl<'a> QueryExecutor<'a> {
    /// Create an executor over a store.
    pub fn new(store: &'a CatalogStore) -> Self {
        Self { store }
    }

    /// One page of the records matching a specification.
    pub fn find_all(&self, spec: &CatalogRecordSpecification) -> Result<Page<CatalogRecord>, Error> {
        self.execute(spec, |_| Ok(true))
    }

    /// Number of records matching a specification, ignoring pagination.
    pub fn count(&self, spec: &CatalogRecordSpecification) -> Result<usize, Error> {
        spec.validate()?;
        let mut total = 0;
        self.for_each_match(spec, |_| {
            total += 1;
            Ok(true)
        })?;
        Ok(total)
    }

    /// Every record matching a specification's filters, pagination ignored.
    pub fn find_all_unpaged(
        &self,
        spec: &CatalogRecordSpecification,
    ) -> Result<Vec<CatalogRecord>, Error> {
        spec.validate()?;
        let mut records = Vec::new();
        self.for_each_match(spec, |record| {
            records.push(record);
            Ok(true)
        })?;
        Ok(records)
    }

    /// Get a record by id.
    pub fn find_by_id(&self, id: &str) -> Result<Option<CatalogRecord>, Error> {
        self.store.get_record(id)
    }

    /// Get a record with its one-hop relationships.
    pub fn load(&self, id: &str) -> Result<Option<LoadedRecord>, Error> {
        self.store.load(id)
    }

    /// Bulk lookup in request order. Unknown ids are dropped.
    pub fn find_all_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<CatalogRecord>, Error> {
        self.store.get_records(ids)
    }

    /// Targets of a record's outgoing relation, in id order.
    pub fn related(
        &self,
        id: &str,
        relation: SimpleRelationType,
    ) -> Result<Vec<CatalogRecord>, Error> {
        let ids = self.store.outgoing(id, relation)?;
        self.store.get_records(&ids)
    }

    /// The single target of a relation.
    ///
    /// If storage holds more than one edge, the lowest target id is returned
    /// and a warning logged.
    pub fn related_one(
        &self,
        id: &str,
        relation: SimpleRelationType,
    ) -> Result<Option<CatalogRecord>, Error> {
        let ids = self.store.outgoing(id, relation)?;
        if ids.len() > 1 {
            warn!(
                record_id = id,
                relation = %relation,
                edges = ids.len(),
                "Single-valued relation has several targets"
            );
        }
        match ids.first() {
            Some(target) => self.store.get_record(target),
            None => Ok(None),
        }
    }

    /// Sources of the incoming edges of a relation, in id order.
    pub fn incoming(
        &self,
        id: &str,
        relation: SimpleRelationType,
    ) -> Result<Vec<CatalogRecord>, Error> {
        let ids = self.store.incoming(id, relation)?;
        self.store.get_records(&ids)
    }

    /// Matching records that have no outgoing edge for `relation`.
    pub fn find_missing_relation(
        &self,
        spec: &CatalogRecordSpecification,
        relation: SimpleRelationType,
    ) -> Result<Page<CatalogRecord>, Error> {
        self.execute(spec, |record| {
            Ok(!self.store.has_outgoing(&record.id, relation)?)
        })
    }

    /// Matching concepts without any description.
    pub fn find_missing_descriptions(
        &self,
        spec: &CatalogRecordSpecification,
    ) -> Result<Page<CatalogRecord>, Error> {
        self.execute(spec, |record| {
            Ok(record.kind.is_a(RecordKind::Concept)
                && !self
                    .store
                    .has_outgoing(&record.id, SimpleRelationType::Descriptions)?)
        })
    }

    /// Run a specification with an extra record predicate and cut one page.
    fn execute<F>(
        &self,
        spec: &CatalogRecordSpecification,
        mut extra: F,
    ) -> Result<Page<CatalogRecord>, Error>
    where
        F: FnMut(&CatalogRecord) -> Result<bool, Error>,
    {
        spec.validate()?;

        let Pagination { page_size, .. } = spec.pagination;
        let offset = spec.pagination.offset();
        let mut total = 0;
        let mut content = Vec::with_capacity(page_size.min(64));

        self.for_each_match(spec, |record| {
            if !extra(&record)? {
                return Ok(true);
            }
            if total >= offset && content.len() < page_size {
                content.push(record);
            }
            total += 1;
            Ok(true)
        })?;

        debug!(
            page = spec.pagination.page_number,
            page_size,
            total,
            returned = content.len(),
            "Specification executed"
        );
        Ok(Page::new(content, spec.pagination, total))
    }

    /// Visit matching records in index order until `visit` returns false.
    fn for_each_match<F>(&self, spec: &CatalogRecordSpecification, mut visit: F) -> Result<(), Error>
    where
        F: FnMut(CatalogRecord) -> Result<bool, Error>,
    {
        let plan = ScanPlan::for_spec(spec);
        debug!(?plan, "Scanning catalog");

        match plan {
            ScanPlan::Ids(ids) => {
                let mut records = self.store.get_records(&ids)?;
                records.sort_by(|a, b| {
                    (a.kind.label(), a.created_at, &a.id).cmp(&(b.kind.label(), b.created_at, &b.id))
                });
                for record in records {
                    if spec.matches(&record) && !visit(record)? {
                        break;
                    }
                }
            }
            ScanPlan::Kinds(kinds) => {
                for kind in kinds {
                    if !self.visit_keys(spec, self.store.scan_kind(kind), &mut visit)? {
                        break;
                    }
                }
            }
            ScanPlan::Full => {
                self.visit_keys(spec, self.store.scan_ordered(), &mut visit)?;
            }
        }
        Ok(())
    }

    /// Returns false once the visitor asked to stop.
    fn visit_keys<I, F>(
        &self,
        spec: &CatalogRecordSpecification,
        keys: I,
        visit: &mut F,
    ) -> Result<bool, Error>
    where
        I: Iterator<Item = Result<TypeIndexKey, Error>>,
        F: FnMut(CatalogRecord) -> Result<bool, Error>,
    {
        for key in keys {
            let key = key?;
            // Cheap rejections straight from the key.
            if !spec.matches_id(&key.id) {
                continue;
            }
            if let Some(kind) = RecordKind::from_label(&key.kind) {
                if !spec.matches_kind(kind) {
                    continue;
                }
            }

            let Some(record) = self.store.get_record(&key.id)? else {
                continue;
            };
            if spec.matches(&record) && !visit(record)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
