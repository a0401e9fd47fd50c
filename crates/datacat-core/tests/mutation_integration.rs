//! Integration tests for relationship mutation through the catalog service.

use datacat_core::{
    CatalogRecord, CatalogService, Error, MutationOutcome, RecordKind, SimpleRelationType,
    StorageConfig,
};

struct TestContext {
    service: CatalogService,
    _dir: tempfile::TempDir,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let service = CatalogService::open(StorageConfig::new(dir.path())).unwrap();
        Self { service, _dir: dir }
    }

    fn create(&self, id: &str, kind: RecordKind) {
        self.service
            .create_record(CatalogRecord::new(id, kind))
            .unwrap();
    }

    fn targets(&self, id: &str, relation: SimpleRelationType) -> Vec<String> {
        self.service.store().outgoing(id, relation).unwrap()
    }
}

// ============== Singleton slots ==============

#[test]
fn test_definition_scenario() {
    let ctx = TestContext::new();
    ctx.create("X", RecordKind::Concept);
    ctx.create("D1", RecordKind::MultiLanguageText);

    let outcome = ctx
        .service
        .set_related_records("X", &["D1"], SimpleRelationType::Definition)
        .unwrap();
    assert!(outcome.is_applied());
    assert_eq!(ctx.targets("X", SimpleRelationType::Definition), vec!["D1"]);

    let err = ctx
        .service
        .set_related_records("X", &["D1"], SimpleRelationType::Definition)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::AlreadySet { ref record_id, relation: SimpleRelationType::Definition } if record_id == "X"
    ));
}

#[test]
fn test_already_set_leaves_state_unchanged() {
    let ctx = TestContext::new();
    ctx.create("X", RecordKind::Concept);
    ctx.create("de", RecordKind::Language);
    ctx.create("en", RecordKind::Language);

    ctx.service
        .set_related_records("X", &["de"], SimpleRelationType::LanguageOfCreator)
        .unwrap();
    let before = ctx.service.load("X").unwrap().unwrap();

    for ids in [vec!["en"], vec!["en", "de"], vec![]] {
        let err = ctx
            .service
            .set_related_records("X", &ids, SimpleRelationType::LanguageOfCreator)
            .unwrap_err();
        assert!(matches!(err, Error::AlreadySet { .. }));
    }

    assert_eq!(ctx.service.load("X").unwrap().unwrap(), before);
    assert_eq!(
        ctx.service.store().incoming("en", SimpleRelationType::LanguageOfCreator).unwrap(),
        Vec::<String>::new()
    );
}

#[test]
fn test_singleton_cardinality_enforced() {
    let ctx = TestContext::new();
    ctx.create("u", RecordKind::Unit);
    ctx.create("r1", RecordKind::Rational);
    ctx.create("r2", RecordKind::Rational);

    let none: Vec<&str> = Vec::new();
    let err = ctx
        .service
        .set_related_records("u", &none, SimpleRelationType::Coefficient)
        .unwrap_err();
    assert!(matches!(err, Error::CardinalityViolation { actual: 0, .. }));

    let err = ctx
        .service
        .set_related_records("u", &["r1", "r2"], SimpleRelationType::Coefficient)
        .unwrap_err();
    assert!(matches!(err, Error::CardinalityViolation { actual: 2, .. }));
    assert!(ctx.targets("u", SimpleRelationType::Coefficient).is_empty());

    ctx.service
        .set_related_records("u", &["r2"], SimpleRelationType::Coefficient)
        .unwrap();
    assert_eq!(ctx.targets("u", SimpleRelationType::Coefficient), vec!["r2"]);
}

#[test]
fn test_singleton_unresolvable_target() {
    let ctx = TestContext::new();
    ctx.create("X", RecordKind::Concept);

    let err = ctx
        .service
        .set_related_records("X", &["nowhere"], SimpleRelationType::CountryOfOrigin)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { ref id, .. } if id == "nowhere"));
    assert!(err.is_input_error());
    assert!(ctx.targets("X", SimpleRelationType::CountryOfOrigin).is_empty());
}

#[test]
fn test_clear_allows_new_singleton() {
    let ctx = TestContext::new();
    ctx.create("X", RecordKind::Concept);
    ctx.create("D1", RecordKind::MultiLanguageText);
    ctx.create("D2", RecordKind::MultiLanguageText);

    ctx.service
        .set_related_records("X", &["D1"], SimpleRelationType::Definition)
        .unwrap();
    ctx.service
        .clear_relation("X", SimpleRelationType::Definition)
        .unwrap();
    ctx.service
        .set_related_records("X", &["D2"], SimpleRelationType::Definition)
        .unwrap();

    assert_eq!(ctx.targets("X", SimpleRelationType::Definition), vec!["D2"]);
    assert!(ctx
        .service
        .store()
        .incoming("D1", SimpleRelationType::Definition)
        .unwrap()
        .is_empty());
}

// ============== Multi slots ==============

#[test]
fn test_examples_scenario() {
    let ctx = TestContext::new();
    ctx.create("X", RecordKind::Concept);
    for id in ["E1", "E2", "E3"] {
        ctx.create(id, RecordKind::MultiLanguageText);
    }

    ctx.service
        .set_related_records("X", &["E1", "E2"], SimpleRelationType::Examples)
        .unwrap();
    ctx.service
        .set_related_records("X", &["E3"], SimpleRelationType::Examples)
        .unwrap();

    assert_eq!(ctx.targets("X", SimpleRelationType::Examples), vec!["E3"]);
}

#[test]
fn test_multi_replace_is_total() {
    let ctx = TestContext::new();
    ctx.create("s", RecordKind::Subject);
    for id in ["a", "b", "c", "d"] {
        ctx.create(id, RecordKind::Property);
    }

    ctx.service
        .set_related_records("s", &["a", "b", "c"], SimpleRelationType::Properties)
        .unwrap();
    let outcome = ctx
        .service
        .set_related_records("s", &["d"], SimpleRelationType::Properties)
        .unwrap();

    assert_eq!(
        outcome.record().related(SimpleRelationType::Properties),
        &["d".to_string()]
    );
    for old in ["a", "b", "c"] {
        assert!(ctx
            .service
            .incoming(old, SimpleRelationType::Properties)
            .unwrap()
            .is_empty());
    }
}

#[test]
fn test_multi_best_effort_resolution() {
    let ctx = TestContext::new();
    ctx.create("old", RecordKind::Subject);
    ctx.create("new", RecordKind::Property);
    ctx.create("text", RecordKind::Text);

    ctx.service
        .set_related_records(
            "new",
            &["old", "missing", "text"],
            SimpleRelationType::ReplacedObjects,
        )
        .unwrap();

    assert_eq!(ctx.targets("new", SimpleRelationType::ReplacedObjects), vec!["old"]);
    let replacing = ctx
        .service
        .incoming("old", SimpleRelationType::ReplacedObjects)
        .unwrap();
    assert_eq!(replacing[0].id, "new");
}

#[test]
fn test_concurrent_replaces_never_merge() {
    const WRITERS: usize = 4;
    const PER_WRITER: usize = 10;

    let ctx = TestContext::new();
    ctx.create("x", RecordKind::Concept);
    let groups: Vec<Vec<String>> = (0..WRITERS)
        .map(|w| (0..PER_WRITER).map(|i| format!("e-{}-{:02}", w, i)).collect())
        .collect();
    for id in groups.iter().flatten() {
        ctx.create(id, RecordKind::MultiLanguageText);
    }

    for round in 0..25 {
        std::thread::scope(|scope| {
            for group in &groups {
                let service = &ctx.service;
                scope.spawn(move || {
                    service
                        .set_related_records("x", group.as_slice(), SimpleRelationType::Examples)
                        .unwrap();
                });
            }
        });

        let slot = ctx.targets("x", SimpleRelationType::Examples);
        assert_eq!(slot.len(), PER_WRITER, "round {}", round);
        assert!(groups.contains(&slot), "round {}: mixed targets {:?}", round, slot);

        let referencing: usize = groups
            .iter()
            .flatten()
            .map(|id| {
                ctx.service
                    .store()
                    .incoming(id, SimpleRelationType::Examples)
                    .unwrap()
                    .len()
            })
            .sum();
        assert_eq!(referencing, PER_WRITER, "round {}", round);
    }
}

// ============== Rule lookup ==============

#[test]
fn test_ancestor_delegation_keeps_cardinality() {
    let ctx = TestContext::new();
    ctx.create("dim", RecordKind::Dimension);
    ctx.create("d1", RecordKind::MultiLanguageText);
    ctx.create("d2", RecordKind::MultiLanguageText);

    // Dimension -> Concept
    ctx.service
        .set_related_records("dim", &["d1"], SimpleRelationType::Definition)
        .unwrap();
    let err = ctx
        .service
        .set_related_records("dim", &["d2"], SimpleRelationType::Definition)
        .unwrap_err();
    assert!(matches!(err, Error::AlreadySet { .. }));

    // Dimension -> Concept -> Object
    ctx.service
        .set_related_records("dim", &["d1", "d2"], SimpleRelationType::Names)
        .unwrap();
    assert_eq!(ctx.targets("dim", SimpleRelationType::Names), vec!["d1", "d2"]);
}

#[test]
fn test_unsupported_relation_is_distinguishable() {
    let ctx = TestContext::new();
    ctx.create("rat", RecordKind::Rational);
    ctx.create("p", RecordKind::Property);

    let outcome = ctx
        .service
        .set_related_records("rat", &["p"], SimpleRelationType::Properties)
        .unwrap();

    let MutationOutcome::Ignored(record) = outcome else {
        panic!("expected the mutation to be ignored");
    };
    assert_eq!(record.id(), "rat");
    assert!(record.outgoing.is_empty());
}

#[test]
fn test_unknown_record() {
    let ctx = TestContext::new();
    let err = ctx
        .service
        .clear_relation("ghost", SimpleRelationType::Names)
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}
