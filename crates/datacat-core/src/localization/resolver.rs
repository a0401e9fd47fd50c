//! Translation selection for multi-language text bundles.

use serde::Serialize;
use tracing::{debug, warn};

use super::range::{default_priority_list, filter, lookup, LanguageRange, DEFAULT_LOCALE};
use crate::error::Error;
use crate::model::SimpleRelationType;
use crate::storage::CatalogStore;

/// One translation of a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalizedText {
    /// Id of the `Text` record.
    pub text_id: String,
    /// Locale code of the text's language.
    pub locale: String,
    /// Literal content.
    pub value: String,
}

impl LocalizedText {
    pub fn new(
        text_id: impl Into<String>,
        locale: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            text_id: text_id.into(),
            locale: locale.into(),
            value: value.into(),
        }
    }
}

/// Supplies the translations of a bundle.
pub trait TextSource {
    /// All texts under a `MultiLanguageText` id. Empty if the bundle is
    /// unknown or has no texts.
    fn texts(&self, bundle_id: &str) -> Result<Vec<LocalizedText>, Error>;
}

impl TextSource for CatalogStore {
    fn texts(&self, bundle_id: &str) -> Result<Vec<LocalizedText>, Error> {
        let text_ids = self.outgoing(bundle_id, SimpleRelationType::Texts)?;
        let mut texts = Vec::with_capacity(text_ids.len());

        for text in self.get_records(&text_ids)? {
            let Some(value) = text.text_value() else {
                continue;
            };
            let Some(language_id) = self
                .outgoing(&text.id, SimpleRelationType::Language)?
                .into_iter()
                .next()
            else {
                debug!(text_id = %text.id, "Text without language skipped");
                continue;
            };
            let Some(code) = self
                .get_record(&language_id)?
                .and_then(|language| language.language_code().map(str::to_string))
            else {
                continue;
            };
            texts.push(LocalizedText::new(text.id.as_str(), code, value));
        }
        Ok(texts)
    }
}

/// Picks the best translation of a bundle for a language priority list.
///
/// Tried in order: RFC 4647 filtering, RFC 4647 lookup, then the default
/// locale.
pub struct LocalizationResolver<'a> {
    source: &'a dyn TextSource,
    default_locale: String,
}

impl<'a> LocalizationResolver<'a> {
    /// Create a resolver reading from `source`.
    pub fn new(source: &'a dyn TextSource) -> Self {
        Self {
            source,
            default_locale: DEFAULT_LOCALE.to_string(),
        }
    }

    /// Override the last-resort locale.
    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    /// Resolve with the default priority list.
    pub fn resolve_default(&self, bundle_id: &str) -> Result<Option<LocalizedText>, Error> {
        self.resolve(&default_priority_list(), bundle_id)
    }

    /// Resolve a bundle. An empty `priority` falls back to the default list.
    pub fn resolve(
        &self,
        priority: &[LanguageRange],
        bundle_id: &str,
    ) -> Result<Option<LocalizedText>, Error> {
        let texts = self.unique_by_locale(bundle_id)?;
        if texts.is_empty() {
            return Ok(None);
        }

        let default_list;
        let priority = if priority.is_empty() {
            default_list = default_priority_list();
            &default_list
        } else {
            priority
        };

        let tags: Vec<&str> = texts.iter().map(|t| t.locale.as_str()).collect();
        let chosen = filter(priority, &tags)
            .first()
            .copied()
            .or_else(|| lookup(priority, &tags))
            .or_else(|| {
                tags.iter()
                    .copied()
                    .find(|tag| tag.eq_ignore_ascii_case(&self.default_locale))
            });

        Ok(chosen.and_then(|locale| texts.iter().find(|t| t.locale == locale).cloned()))
    }

    /// Texts of a bundle with at most one per locale, lowest text id first.
    fn unique_by_locale(&self, bundle_id: &str) -> Result<Vec<LocalizedText>, Error> {
        let mut texts = self.source.texts(bundle_id)?;
        texts.sort_by(|a, b| a.text_id.cmp(&b.text_id));

        let mut unique: Vec<LocalizedText> = Vec::with_capacity(texts.len());
        for text in texts {
            if let Some(kept) = unique
                .iter()
                .find(|u| u.locale.eq_ignore_ascii_case(&text.locale))
            {
                warn!(
                    bundle_id,
                    locale = %text.locale,
                    kept = %kept.text_id,
                    dropped = %text.text_id,
                    "Bundle has more than one text for a locale"
                );
                continue;
            }
            unique.push(text);
        }
        Ok(unique)
    }
}
