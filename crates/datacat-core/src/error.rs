//! Core error types.

use thiserror::Error;

use crate::model::SimpleRelationType;

/// Core catalog errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Key decoding error.
    #[error("invalid key format")]
    InvalidKey,

    /// Invalid data format.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A record with this id already exists.
    #[error("record id already in use: {0}")]
    DuplicateId(String),

    /// A referenced record or relation target does not resolve.
    #[error("no {kind} record with id {id} found")]
    NotFound {
        /// Expected kind of the record.
        kind: &'static str,
        /// Requested id.
        id: String,
    },

    /// Wrong number of target ids for a relationship slot.
    #[error("{relation} expects {expected} related record(s), got {actual}")]
    CardinalityViolation {
        /// Relation the call targeted.
        relation: SimpleRelationType,
        /// Human readable expectation.
        expected: &'static str,
        /// Number of ids supplied.
        actual: usize,
    },

    /// Attempt to overwrite a non-empty singleton slot.
    #[error("record {record_id} already has {relation} assigned")]
    AlreadySet {
        /// Record being mutated.
        record_id: String,
        /// Singleton relation already set.
        relation: SimpleRelationType,
    },

    /// Malformed query specification.
    #[error("invalid specification: {0}")]
    InvalidSpecification(String),

    /// Malformed language priority list.
    #[error("invalid language range: {0}")]
    InvalidLanguageRange(String),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`] error.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Whether this error was caused by caller input rather than storage.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound { .. }
                | Error::CardinalityViolation { .. }
                | Error::AlreadySet { .. }
                | Error::InvalidSpecification(_)
                | Error::InvalidLanguageRange(_)
                | Error::InvalidData(_)
                | Error::DuplicateId(_)
        )
    }
}
