//! Catalog records as stored in the graph.

use std::collections::BTreeMap;

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use super::kind::{RecordKind, Status};
use super::relation::SimpleRelationType;
use crate::error::Error;
use crate::storage::key::current_timestamp;

/// Variant specific attributes.
#[derive(
    Debug, Clone, Default, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
pub enum Payload {
    /// Variant carries no attributes of its own.
    #[default]
    None,
    /// Literal text content of a `Text` record.
    Text { value: String },
    /// Locale code of a `Language` record (e.g. `en-US`).
    Language { code: String },
    /// ISO code of a `Country` record.
    Country { code: String },
    /// Exact fraction of a `Rational` record.
    Rational { numerator: i64, denominator: i64 },
    /// Bound inclusion flags of an `Interval` record.
    Interval {
        minimum_included: bool,
        maximum_included: bool,
    },
    /// Location of an `ExternalDocument` record.
    Document { uri: String },
}

/// A node in the catalog graph.
///
/// Relationship slots are not part of the stored record; they live as edges in
/// the store and are loaded on demand (see [`LoadedRecord`]).
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct CatalogRecord {
    /// Globally unique id, immutable once persisted.
    pub id: String,
    /// Record variant.
    pub kind: RecordKind,
    pub major_version: u32,
    pub minor_version: u32,
    /// Free-form search labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Tag names the record is filed under.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub date_of_creation: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    /// Creation timestamp in microseconds since Unix epoch.
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub payload: Payload,
}

impl CatalogRecord {
    /// Create an empty record of the given kind.
    pub fn new(id: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            id: id.into(),
            kind,
            major_version: 1,
            minor_version: 1,
            labels: BTreeMap::new(),
            tags: Vec::new(),
            status: Status::Active,
            date_of_creation: None,
            uri: None,
            created_at: current_timestamp(),
            payload: Payload::None,
        }
    }

    /// Create a `Text` record holding a literal value.
    pub fn text(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(id, RecordKind::Text).with_payload(Payload::Text {
            value: value.into(),
        })
    }

    /// Create a `Language` record for a locale code.
    pub fn language(id: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(id, RecordKind::Language).with_payload(Payload::Language { code: code.into() })
    }

    /// Create an empty `MultiLanguageText` bundle.
    pub fn multi_language_text(id: impl Into<String>) -> Self {
        Self::new(id, RecordKind::MultiLanguageText)
    }

    /// Create a `Rational` record.
    pub fn rational(id: impl Into<String>, numerator: i64, denominator: i64) -> Self {
        Self::new(id, RecordKind::Rational).with_payload(Payload::Rational {
            numerator,
            denominator,
        })
    }

    /// Set the payload.
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Add a search label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Add a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Set the lifecycle status.
    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }

    /// Set the creation timestamp (microseconds).
    pub fn with_created_at(mut self, created_at: u64) -> Self {
        self.created_at = created_at;
        self
    }

    /// Literal value of a `Text` record.
    pub fn text_value(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text { value } => Some(value),
            _ => None,
        }
    }

    /// Locale code of a `Language` record.
    pub fn language_code(&self) -> Option<&str> {
        match &self.payload {
            Payload::Language { code } => Some(code),
            _ => None,
        }
    }

    /// Check the record id is usable as a storage key.
    pub fn validate_id(id: &str) -> Result<(), Error> {
        if id.is_empty() {
            return Err(Error::InvalidData("record id must not be empty".into()));
        }
        if id.as_bytes().contains(&0) {
            return Err(Error::InvalidData(format!(
                "record id {:?} contains a NUL byte",
                id
            )));
        }
        Ok(())
    }

    /// Serialize the record to bytes using rkyv.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes using rkyv.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// A record together with its one-hop relationships.
#[derive(Debug, Clone, PartialEq, SerdeSerialize)]
pub struct LoadedRecord {
    pub record: CatalogRecord,
    /// Outgoing edges by relation, target ids in key order.
    pub outgoing: BTreeMap<SimpleRelationType, Vec<String>>,
    /// Incoming edges by relation (the derived inverse views).
    pub incoming: BTreeMap<SimpleRelationType, Vec<String>>,
}

impl LoadedRecord {
    /// Target ids of an outgoing slot, empty if unset.
    pub fn related(&self, relation: SimpleRelationType) -> &[String] {
        self.outgoing
            .get(&relation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Source ids of an incoming view, empty if none.
    pub fn referenced_by(&self, relation: SimpleRelationType) -> &[String] {
        self.incoming
            .get(&relation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The single target of a slot, if set.
    pub fn related_one(&self, relation: SimpleRelationType) -> Option<&str> {
        self.related(relation).first().map(String::as_str)
    }

    /// Record id.
    pub fn id(&self) -> &str {
        &self.record.id
    }
}
