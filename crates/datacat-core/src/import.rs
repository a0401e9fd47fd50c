//! JSON seed documents.
//!
//! A seed lists records to create, translations to attach and relations to
//! set, applied in that order:
//!
//! ```json
//! {
//!   "records": [{ "id": "wall", "kind": "Subject", "major_version": 1, "minor_version": 1 }],
//!   "translations": [{ "record": "wall", "relation": "NAMES", "text_id": "wall-en",
//!                      "language": "en", "value": "Wall" }],
//!   "relations": [{ "record": "wall", "relation": "PROPERTIES", "targets": ["height"] }]
//! }
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Error;
use crate::model::{CatalogRecord, SimpleRelationType};
use crate::service::CatalogService;
use crate::storage::key::current_timestamp;

/// A translation to attach to a record's text slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationSeed {
    pub record: String,
    /// Relation label or name, e.g. `NAMES` or `Names`.
    pub relation: String,
    pub text_id: String,
    /// Language code of an existing `Language` record.
    pub language: String,
    pub value: String,
}

/// A relationship slot assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationSeed {
    pub record: String,
    pub relation: String,
    pub targets: Vec<String>,
}

/// A complete seed document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedDocument {
    pub records: Vec<CatalogRecord>,
    pub translations: Vec<TranslationSeed>,
    pub relations: Vec<RelationSeed>,
}

impl SeedDocument {
    /// Parse a seed from JSON text.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// What an import did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub records: usize,
    pub translations: usize,
    pub relations_applied: usize,
    pub relations_ignored: usize,
}

impl CatalogService {
    /// Apply a seed document. Stops at the first failing entry.
    ///
    /// Records without a creation time get one assigned in document order.
    pub fn import(&self, seed: SeedDocument) -> Result<ImportSummary, Error> {
        let mut summary = ImportSummary::default();

        let base = current_timestamp();
        for (offset, mut record) in seed.records.into_iter().enumerate() {
            if record.created_at == 0 {
                record.created_at = base + offset as u64;
            }
            self.create_record(record)?;
            summary.records += 1;
        }

        for translation in seed.translations {
            let relation: SimpleRelationType = translation.relation.parse()?;
            self.add_translation(
                &translation.record,
                relation,
                &translation.text_id,
                &translation.language,
                &translation.value,
            )?;
            summary.translations += 1;
        }

        for entry in seed.relations {
            let relation: SimpleRelationType = entry.relation.parse()?;
            if self
                .set_related_records(&entry.record, entry.targets.as_slice(), relation)?
                .is_applied()
            {
                summary.relations_applied += 1;
            } else {
                summary.relations_ignored += 1;
            }
        }

        info!(
            records = summary.records,
            translations = summary.translations,
            relations = summary.relations_applied,
            ignored = summary.relations_ignored,
            "Seed imported"
        );
        Ok(summary)
    }

    /// Parse and apply a JSON seed.
    pub fn import_json(&self, json: &str) -> Result<ImportSummary, Error> {
        self.import(SeedDocument::from_json(json)?)
    }
}
