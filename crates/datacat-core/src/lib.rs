//! datacat core - catalog graph store, relationship rules, queries and
//! localization.
//!
//! Records live in an embedded sled store as nodes with typed, directed
//! edges. [`CatalogService`] is the entry point: it mutates relationship
//! slots according to per-kind rule tables, answers specification queries
//! with stable pagination, expands composition hierarchies, and resolves
//! multi-language texts for a language priority list.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod error;
pub mod import;
pub mod localization;
pub mod model;
pub mod mutation;
pub mod query;
pub mod service;
pub mod storage;

pub use error::Error;
pub use import::{ImportSummary, RelationSeed, SeedDocument, TranslationSeed};
pub use localization::{
    default_priority_list, priority_list, LanguageRange, LocalizationResolver, LocalizedText,
    TextSource, DEFAULT_PRIORITY_LIST,
};
pub use model::{
    Cardinality, CatalogRecord, LoadedRecord, Payload, RecordKind, SimpleRelationType, Status,
};
pub use mutation::{MutationOutcome, RelationshipMutator, RuleDescriptor, RuleRegistry};
pub use query::{
    CatalogRecordSpecification, HierarchyQuery, HierarchyTree, Page, Pagination, QueryExecutor,
    DEFAULT_HIERARCHY_DEPTH,
};
pub use service::CatalogService;
pub use storage::{CatalogStore, StorageConfig};
