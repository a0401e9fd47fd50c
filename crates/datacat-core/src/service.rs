//! The catalog service facade.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use crate::error::Error;
use crate::localization::{
    default_priority_list, LanguageRange, LocalizationResolver, LocalizedText, TextSource,
};
use crate::model::{CatalogRecord, LoadedRecord, Payload, RecordKind, SimpleRelationType};
use crate::mutation::{MutationOutcome, RelationshipMutator, RuleRegistry};
use crate::query::{
    CatalogRecordSpecification, HierarchyBuilder, HierarchyQuery, HierarchyTree, Page,
    QueryExecutor,
};
use crate::storage::{CatalogStore, StorageConfig};

/// Entry point tying the store, rule tables and resolver together.
///
/// Each call runs to completion against the store; the service holds no
/// locks of its own.
pub struct CatalogService {
    store: Arc<CatalogStore>,
    rules: RuleRegistry,
    priority: Vec<LanguageRange>,
}

impl CatalogService {
    /// Wrap an open store with the standard rule tables.
    pub fn new(store: Arc<CatalogStore>) -> Self {
        Self {
            store,
            rules: RuleRegistry::standard(),
            priority: default_priority_list(),
        }
    }

    /// Open the store described by `config`.
    pub fn open(config: StorageConfig) -> Result<Self, Error> {
        let store = CatalogStore::open(config)?;
        if store.was_recovered() {
            info!(records = store.len(), "Opened existing catalog");
        }
        Ok(Self::new(Arc::new(store)))
    }

    /// Replace the rule tables.
    pub fn with_rules(mut self, rules: RuleRegistry) -> Self {
        self.rules = rules;
        self
    }

    /// Set the priority list used when callers pass none.
    pub fn with_priority_list(mut self, priority: Vec<LanguageRange>) -> Self {
        self.priority = priority;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &CatalogStore {
        &self.store
    }

    /// The rule tables in use.
    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// The default priority list.
    pub fn priority_list(&self) -> &[LanguageRange] {
        &self.priority
    }

    // ========== Records ==========

    /// Persist a new record with every relationship slot unset.
    pub fn create_record(&self, record: CatalogRecord) -> Result<CatalogRecord, Error> {
        self.store.insert_record(&record)?;
        info!(id = %record.id, kind = %record.kind, "Record created");
        Ok(record)
    }

    /// Add a tag to a record.
    pub fn add_tag(&self, record_id: &str, tag: &str) -> Result<CatalogRecord, Error> {
        let record = self.require(record_id)?.with_tag(tag);
        self.store.update_record(&record)
    }

    /// Remove a tag from a record. Missing tags are ignored.
    pub fn remove_tag(&self, record_id: &str, tag: &str) -> Result<CatalogRecord, Error> {
        let mut record = self.require(record_id)?;
        record.tags.retain(|t| t != tag);
        self.store.update_record(&record)
    }

    /// Replace the search labels of a record.
    pub fn set_labels(
        &self,
        record_id: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<CatalogRecord, Error> {
        let mut record = self.require(record_id)?;
        record.labels = labels;
        self.store.update_record(&record)
    }

    // ========== Mutation ==========

    /// Set the targets of a relationship slot.
    pub fn set_related_records<S: AsRef<str>>(
        &self,
        record_id: &str,
        related_ids: &[S],
        relation: SimpleRelationType,
    ) -> Result<MutationOutcome, Error> {
        self.mutator()
            .set_related_records(record_id, related_ids, relation)
    }

    /// Empty a relationship slot.
    pub fn clear_relation(
        &self,
        record_id: &str,
        relation: SimpleRelationType,
    ) -> Result<MutationOutcome, Error> {
        self.mutator().clear_relation(record_id, relation)
    }

    fn mutator(&self) -> RelationshipMutator<'_> {
        RelationshipMutator::new(&self.store, &self.rules)
    }

    // ========== Queries ==========

    pub fn find_all(&self, spec: &CatalogRecordSpecification) -> Result<Page<CatalogRecord>, Error> {
        self.executor().find_all(spec)
    }

    pub fn count(&self, spec: &CatalogRecordSpecification) -> Result<usize, Error> {
        self.executor().count(spec)
    }

    pub fn find_by_id(&self, id: &str) -> Result<Option<CatalogRecord>, Error> {
        self.executor().find_by_id(id)
    }

    /// Load a record with its one-hop relationships.
    pub fn load(&self, id: &str) -> Result<Option<LoadedRecord>, Error> {
        self.executor().load(id)
    }

    pub fn find_all_by_ids<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<CatalogRecord>, Error> {
        self.executor().find_all_by_ids(ids)
    }

    pub fn related(
        &self,
        id: &str,
        relation: SimpleRelationType,
    ) -> Result<Vec<CatalogRecord>, Error> {
        self.executor().related(id, relation)
    }

    pub fn related_one(
        &self,
        id: &str,
        relation: SimpleRelationType,
    ) -> Result<Option<CatalogRecord>, Error> {
        self.executor().related_one(id, relation)
    }

    pub fn incoming(
        &self,
        id: &str,
        relation: SimpleRelationType,
    ) -> Result<Vec<CatalogRecord>, Error> {
        self.executor().incoming(id, relation)
    }

    pub fn find_missing_relation(
        &self,
        spec: &CatalogRecordSpecification,
        relation: SimpleRelationType,
    ) -> Result<Page<CatalogRecord>, Error> {
        self.executor().find_missing_relation(spec, relation)
    }

    pub fn find_missing_descriptions(
        &self,
        spec: &CatalogRecordSpecification,
    ) -> Result<Page<CatalogRecord>, Error> {
        self.executor().find_missing_descriptions(spec)
    }

    /// Expand the records matching a specification along composition
    /// relations.
    pub fn get_hierarchy(&self, query: &HierarchyQuery) -> Result<HierarchyTree, Error> {
        HierarchyBuilder::new(&self.store).build(query)
    }

    fn executor(&self) -> QueryExecutor<'_> {
        QueryExecutor::new(&self.store)
    }

    // ========== Localization ==========

    /// A resolver reading texts from this catalog.
    pub fn resolver(&self) -> LocalizationResolver<'_> {
        LocalizationResolver::new(self.store.as_ref())
    }

    /// Best translation of a bundle. `None` uses the service's priority list.
    pub fn resolve(
        &self,
        priority: Option<&[LanguageRange]>,
        bundle_id: &str,
    ) -> Result<Option<LocalizedText>, Error> {
        self.resolver()
            .resolve(priority.unwrap_or(self.priority.as_slice()), bundle_id)
    }

    /// Display name of a record.
    pub fn name(
        &self,
        record_id: &str,
        priority: Option<&[LanguageRange]>,
    ) -> Result<Option<LocalizedText>, Error> {
        let relations = [SimpleRelationType::Names, SimpleRelationType::Name];
        match self.first_bundle(record_id, &relations)? {
            Some(bundle) => self.resolve(priority, &bundle),
            None => Ok(None),
        }
    }

    /// Comment of a record.
    pub fn comment(
        &self,
        record_id: &str,
        priority: Option<&[LanguageRange]>,
    ) -> Result<Option<LocalizedText>, Error> {
        match self.first_bundle(record_id, &[SimpleRelationType::Comments])? {
            Some(bundle) => self.resolve(priority, &bundle),
            None => Ok(None),
        }
    }

    fn first_bundle(
        &self,
        record_id: &str,
        relations: &[SimpleRelationType],
    ) -> Result<Option<String>, Error> {
        for relation in relations {
            if let Some(bundle) = self.store.outgoing(record_id, *relation)?.into_iter().next() {
                return Ok(Some(bundle));
            }
        }
        Ok(None)
    }

    // ========== Texts ==========

    /// Add a translation to a text slot of a record.
    ///
    /// The slot's bundle is created on first use. The language is looked up
    /// by code. A bundle holds at most one text per language. Every check runs
    /// before the first write, and the slot is only linked once the new
    /// bundle holds its text.
    pub fn add_translation(
        &self,
        record_id: &str,
        relation: SimpleRelationType,
        text_id: &str,
        language_code: &str,
        value: &str,
    ) -> Result<LocalizedText, Error> {
        let record = self.require(record_id)?;
        let rule = self
            .rules
            .resolve(record.kind, relation)
            .map(|resolved| resolved.rule)
            .filter(|rule| rule.target == RecordKind::MultiLanguageText)
            .ok_or_else(|| {
                Error::InvalidData(format!(
                    "{} of {} does not hold translations",
                    relation, record.kind
                ))
            })?;

        let value = value.trim();
        if value.is_empty() {
            return Err(Error::InvalidData("translation must not be blank".into()));
        }
        CatalogRecord::validate_id(text_id)?;
        if self.store.contains(text_id)? {
            return Err(Error::DuplicateId(text_id.to_string()));
        }
        let language = self.find_language(language_code)?;
        let locale = language.language_code().unwrap_or(language_code).to_string();

        let linked = self.store.outgoing(record_id, rule.relation)?.into_iter().next();
        if let Some(bundle) = &linked {
            let taken = self
                .store
                .texts(bundle)?
                .into_iter()
                .any(|text| text.locale.eq_ignore_ascii_case(&locale));
            if taken {
                return Err(Error::InvalidData(format!(
                    "{} of {} already has a {} text",
                    relation, record_id, locale
                )));
            }
        }

        self.store.insert_record(&CatalogRecord::text(text_id, value))?;
        self.store
            .add_edge(text_id, SimpleRelationType::Language, &language.id)?;

        match linked {
            Some(bundle) => {
                self.store
                    .add_edge(&bundle, SimpleRelationType::Texts, text_id)?;
            }
            None => {
                let bundle = self.free_bundle_id(record_id, relation)?;
                self.store
                    .insert_record(&CatalogRecord::multi_language_text(bundle.as_str()))?;
                self.store
                    .add_edge(&bundle, SimpleRelationType::Texts, text_id)?;
                let linking = self
                    .mutator()
                    .set_related_records(record_id, &[bundle.as_str()], relation);
                if let Err(e) = linking {
                    self.store.delete_record(&bundle)?;
                    self.store.delete_record(text_id)?;
                    return Err(e);
                }
            }
        }

        info!(record_id, relation = %relation, text_id, locale = %locale, "Translation added");
        Ok(LocalizedText::new(text_id, locale, value))
    }

    /// First unused bundle id for a slot: `record.relation`, then
    /// `record.relation.2` and so on. Bundles detached by a clear keep
    /// their id and their texts.
    fn free_bundle_id(
        &self,
        record_id: &str,
        relation: SimpleRelationType,
    ) -> Result<String, Error> {
        let base = format!("{}.{}", record_id, relation.label().to_lowercase());
        if !self.store.contains(&base)? {
            return Ok(base);
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}.{}", base, n);
            if !self.store.contains(&candidate)? {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Replace the content of a text. Surrounding whitespace is removed.
    pub fn update_text(&self, text_id: &str, value: &str) -> Result<CatalogRecord, Error> {
        let record = self.require_text(text_id)?.with_payload(Payload::Text {
            value: value.trim().to_string(),
        });
        let updated = self.store.update_record(&record)?;
        info!(text_id, "Text updated");
        Ok(updated)
    }

    /// Delete a text and unlink it from its bundle and language.
    pub fn delete_text(&self, text_id: &str) -> Result<CatalogRecord, Error> {
        self.require_text(text_id)?;
        let deleted = self
            .store
            .delete_record(text_id)?
            .ok_or_else(|| Error::not_found(RecordKind::Text.label(), text_id))?;
        info!(text_id, "Text deleted");
        Ok(deleted)
    }

    fn find_language(&self, code: &str) -> Result<CatalogRecord, Error> {
        for key in self.store.scan_kind(RecordKind::Language) {
            let key = key?;
            if let Some(language) = self.store.get_record(&key.id)? {
                if language
                    .language_code()
                    .is_some_and(|c| c.eq_ignore_ascii_case(code))
                {
                    return Ok(language);
                }
            }
        }
        Err(Error::not_found(RecordKind::Language.label(), code))
    }

    fn require(&self, id: &str) -> Result<CatalogRecord, Error> {
        self.store
            .get_record(id)?
            .ok_or_else(|| Error::not_found("catalog", id))
    }

    fn require_text(&self, id: &str) -> Result<CatalogRecord, Error> {
        match self.store.get_record(id)? {
            Some(record) if record.kind == RecordKind::Text => Ok(record),
            _ => Err(Error::not_found(RecordKind::Text.label(), id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestContext {
        service: CatalogService,
        _dir: tempfile::TempDir,
    }

    impl std::ops::Deref for TestContext {
        type Target = CatalogService;
        fn deref(&self) -> &Self::Target {
            &self.service
        }
    }

    fn context() -> TestContext {
        let dir = tempfile::tempdir().unwrap();
        let service = CatalogService::open(StorageConfig::new(dir.path())).unwrap();
        service
            .create_record(CatalogRecord::language("lang-de", "de"))
            .unwrap();
        service
            .create_record(CatalogRecord::language("lang-en", "en"))
            .unwrap();
        TestContext {
            service,
            _dir: dir,
        }
    }

    #[test]
    fn test_add_translation_creates_bundle() {
        let ctx = context();
        ctx.create_record(CatalogRecord::new("wall", RecordKind::Subject))
            .unwrap();

        ctx.add_translation("wall", SimpleRelationType::Names, "wall-en", "en", " Wall ")
            .unwrap();
        ctx.add_translation("wall", SimpleRelationType::Names, "wall-de", "DE", "Wand")
            .unwrap();

        let bundles = ctx.store().outgoing("wall", SimpleRelationType::Names).unwrap();
        assert_eq!(bundles.len(), 1);

        let name = ctx.name("wall", None).unwrap().unwrap();
        assert_eq!(name.value, "Wand");

        let en = LanguageRange::parse_list("en").unwrap();
        let name = ctx.name("wall", Some(en.as_slice())).unwrap().unwrap();
        assert_eq!(name.value, "Wall");
    }

    #[test]
    fn test_add_translation_rejects_duplicate_locale() {
        let ctx = context();
        ctx.create_record(CatalogRecord::new("wall", RecordKind::Subject))
            .unwrap();
        ctx.add_translation("wall", SimpleRelationType::Comments, "c-1", "en", "first")
            .unwrap();
        let err = ctx
            .add_translation("wall", SimpleRelationType::Comments, "c-2", "en", "second")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
        assert!(ctx.find_by_id("c-2").unwrap().is_none());
    }

    #[test]
    fn test_add_translation_validation() {
        let ctx = context();
        ctx.create_record(CatalogRecord::new("wall", RecordKind::Subject))
            .unwrap();

        let err = ctx
            .add_translation("wall", SimpleRelationType::Properties, "t", "en", "x")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));

        let err = ctx
            .add_translation("wall", SimpleRelationType::Names, "t", "xx", "x")
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { kind: "XtdLanguage", .. }));

        let err = ctx
            .add_translation("wall", SimpleRelationType::Names, "t", "en", "   ")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_singleton_text_slot() {
        let ctx = context();
        ctx.create_record(CatalogRecord::new("c", RecordKind::Concept))
            .unwrap();
        ctx.add_translation("c", SimpleRelationType::Definition, "def-en", "en", "A thing")
            .unwrap();
        ctx.add_translation("c", SimpleRelationType::Definition, "def-de", "de", "Ein Ding")
            .unwrap();

        let bundle = ctx
            .related_one("c", SimpleRelationType::Definition)
            .unwrap()
            .unwrap();
        assert_eq!(
            ctx.store().outgoing(&bundle.id, SimpleRelationType::Texts).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_add_translation_after_clear() {
        let ctx = context();
        ctx.create_record(CatalogRecord::new("wall", RecordKind::Subject))
            .unwrap();
        ctx.add_translation("wall", SimpleRelationType::Names, "t1", "en", "Wall")
            .unwrap();
        ctx.clear_relation("wall", SimpleRelationType::Names).unwrap();

        ctx.add_translation("wall", SimpleRelationType::Names, "t2", "en", "Partition")
            .unwrap();

        assert_eq!(
            ctx.store().outgoing("wall", SimpleRelationType::Names).unwrap(),
            vec!["wall.names.2".to_string()]
        );
        assert_eq!(ctx.name("wall", None).unwrap().unwrap().value, "Partition");
        // The detached bundle keeps its text.
        assert_eq!(
            ctx.store().outgoing("wall.names", SimpleRelationType::Texts).unwrap(),
            vec!["t1".to_string()]
        );
    }

    #[test]
    fn test_failed_translation_writes_nothing() {
        let ctx = context();
        ctx.create_record(CatalogRecord::new("c", RecordKind::Concept))
            .unwrap();
        let before = ctx.store().len();

        for (text_id, code) in [("bad\0id", "en"), ("", "en"), ("ok", "xx")] {
            assert!(ctx
                .add_translation("c", SimpleRelationType::Definition, text_id, code, "x")
                .is_err());
        }
        assert!(!ctx
            .store()
            .has_outgoing("c", SimpleRelationType::Definition)
            .unwrap());
        assert_eq!(ctx.store().len(), before);

        ctx.add_translation("c", SimpleRelationType::Definition, "def-en", "en", "A thing")
            .unwrap();
        assert_eq!(
            ctx.related_one("c", SimpleRelationType::Definition)
                .unwrap()
                .unwrap()
                .id,
            "c.definition"
        );
    }

    #[test]
    fn test_update_and_delete_text() {
        let ctx = context();
        ctx.create_record(CatalogRecord::new("wall", RecordKind::Subject))
            .unwrap();
        ctx.add_translation("wall", SimpleRelationType::Comments, "c-en", "en", "old")
            .unwrap();

        let updated = ctx.update_text("c-en", "  new  ").unwrap();
        assert_eq!(updated.text_value(), Some("new"));
        assert_eq!(ctx.comment("wall", None).unwrap().unwrap().value, "new");

        ctx.delete_text("c-en").unwrap();
        assert!(ctx.comment("wall", None).unwrap().is_none());
        assert!(matches!(
            ctx.delete_text("wall"),
            Err(Error::NotFound { kind: "XtdText", .. })
        ));
    }

    #[test]
    fn test_tags_and_labels() {
        let ctx = context();
        ctx.create_record(CatalogRecord::new("wall", RecordKind::Subject))
            .unwrap();

        ctx.add_tag("wall", "ifc").unwrap();
        ctx.add_tag("wall", "ifc").unwrap();
        let record = ctx.add_tag("wall", "core").unwrap();
        assert_eq!(record.tags, vec!["ifc".to_string(), "core".into()]);

        let record = ctx.remove_tag("wall", "ifc").unwrap();
        assert_eq!(record.tags, vec!["core".to_string()]);

        let labels = BTreeMap::from([("en".to_string(), "outer wall".to_string())]);
        let record = ctx.set_labels("wall", labels).unwrap();
        assert_eq!(record.labels.len(), 1);

        let found = ctx
            .find_all(&CatalogRecordSpecification::new().with_query("outer"))
            .unwrap();
        assert_eq!(found.total_elements, 1);
    }
}
