//! Typed relationship mutation.
//!
//! Every record kind has a rule table describing which relationship slots it
//! owns, their cardinality, and the kind of record they point to. Kinds
//! inherit the rules of their ancestors.

mod engine;
mod rules;

pub use engine::{MutationOutcome, RelationshipMutator};
pub use rules::{ResolvedRule, RuleDescriptor, RuleRegistry};
