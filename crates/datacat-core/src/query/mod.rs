//! Specification-driven catalog queries.
//!
//! A [`CatalogRecordSpecification`] describes which records to return; the
//! [`QueryExecutor`] plans a scan of the type index for it and cuts one
//! page. [`HierarchyBuilder`] expands matching roots along composition
//! relations.

mod executor;
mod hierarchy;
mod specification;

pub use executor::{QueryExecutor, ScanPlan};
pub use hierarchy::{
    HierarchyBuilder, HierarchyEdge, HierarchyNode, HierarchyQuery, HierarchyTree,
    DEFAULT_COMPOSITION_RELATIONS, DEFAULT_HIERARCHY_DEPTH,
};
pub use specification::{
    CatalogRecordSpecification, Page, Pagination, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
