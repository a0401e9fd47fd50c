//! Catalog record model.
//!
//! Records are typed nodes; relationship slots are typed, directional edges
//! whose cardinality is fixed by the owning variant's rule table.

mod kind;
mod record;
mod relation;

pub use kind::{Lineage, RecordKind, Status};
pub use record::{CatalogRecord, LoadedRecord, Payload};
pub use relation::{Cardinality, SimpleRelationType};
