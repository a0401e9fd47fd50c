//! Declarative record filters and pagination.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{CatalogRecord, RecordKind};

/// Default number of records per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: usize = 10_000;

/// Zero-based offset pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page_number: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page_number: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Create pagination for one page.
    pub fn new(page_number: usize, page_size: usize) -> Self {
        Self {
            page_number,
            page_size,
        }
    }

    /// Index of the first record on the page.
    pub fn offset(&self) -> usize {
        self.page_number.saturating_mul(self.page_size)
    }

    /// Check the page size is within bounds.
    pub fn validate(&self) -> Result<(), Error> {
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidSpecification(format!(
                "page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.page_size
            )));
        }
        Ok(())
    }
}

/// A filter over catalog records plus the page to return.
///
/// All filters are conjunctive. Empty lists and a blank query do not
/// restrict the result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogRecordSpecification {
    /// Case-insensitive substring matched against id, label values and URI.
    pub query: Option<String>,
    /// Record must be one of these kinds or descend from one.
    pub kind_in: Vec<RecordKind>,
    /// Record must not be, or descend from, any of these kinds.
    pub kind_not_in: Vec<RecordKind>,
    pub id_in: Vec<String>,
    pub id_not_in: Vec<String>,
    /// Record must carry every listed tag.
    pub tagged: Vec<String>,
    pub pagination: Pagination,
}

impl CatalogRecordSpecification {
    /// Create a specification matching every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text query.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Restrict to kinds (and their descendants).
    pub fn with_kind_in(mut self, kinds: impl IntoIterator<Item = RecordKind>) -> Self {
        self.kind_in.extend(kinds);
        self
    }

    /// Exclude kinds (and their descendants).
    pub fn with_kind_not_in(mut self, kinds: impl IntoIterator<Item = RecordKind>) -> Self {
        self.kind_not_in.extend(kinds);
        self
    }

    /// Restrict to ids.
    pub fn with_id_in<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.id_in.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Exclude ids.
    pub fn with_id_not_in<S: Into<String>>(mut self, ids: impl IntoIterator<Item = S>) -> Self {
        self.id_not_in.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Require tags.
    pub fn with_tagged<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.tagged.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Select a page.
    pub fn with_pagination(mut self, page_number: usize, page_size: usize) -> Self {
        self.pagination = Pagination::new(page_number, page_size);
        self
    }

    /// Parse kind names such as `Subject` or `XtdSubject`.
    pub fn parse_kinds<S: AsRef<str>>(names: &[S]) -> Result<Vec<RecordKind>, Error> {
        names.iter().map(|name| name.as_ref().parse()).collect()
    }

    /// Reject specifications that cannot be executed.
    pub fn validate(&self) -> Result<(), Error> {
        self.pagination.validate()?;
        if let Some(id) = self.id_in.iter().find(|id| id.is_empty()) {
            return Err(Error::InvalidSpecification(format!(
                "empty id in id filter: {:?}",
                id
            )));
        }
        Ok(())
    }

    /// The query with surrounding whitespace removed, if any is left.
    pub fn normalized_query(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    /// Check the id filters alone.
    pub fn matches_id(&self, id: &str) -> bool {
        (self.id_in.is_empty() || self.id_in.iter().any(|i| i == id))
            && !self.id_not_in.iter().any(|i| i == id)
    }

    /// Check the kind filters alone.
    pub fn matches_kind(&self, kind: RecordKind) -> bool {
        (self.kind_in.is_empty() || self.kind_in.iter().any(|k| kind.is_a(*k)))
            && !self.kind_not_in.iter().any(|k| kind.is_a(*k))
    }

    /// Check every filter against a record.
    pub fn matches(&self, record: &CatalogRecord) -> bool {
        self.matches_id(&record.id)
            && self.matches_kind(record.kind)
            && self.tagged.iter().all(|tag| record.tags.contains(tag))
            && self
                .normalized_query()
                .map_or(true, |query| matches_text(record, &query))
    }
}

/// Case-insensitive substring search over id, label values and URI.
///
/// `query` must already be lower-cased.
pub(crate) fn matches_text(record: &CatalogRecord, query: &str) -> bool {
    record.id.to_lowercase().contains(query)
        || record
            .labels
            .values()
            .any(|label| label.to_lowercase().contains(query))
        || record
            .uri
            .as_deref()
            .is_some_and(|uri| uri.to_lowercase().contains(query))
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_number: usize,
    pub page_size: usize,
    /// Number of matches before pagination.
    pub total_elements: usize,
}

impl<T> Page<T> {
    /// Create a page.
    pub fn new(content: Vec<T>, pagination: Pagination, total_elements: usize) -> Self {
        Self {
            content,
            page_number: pagination.page_number,
            page_size: pagination.page_size,
            total_elements,
        }
    }

    /// Number of pages needed for all matches.
    pub fn total_pages(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.total_elements.div_ceil(self.page_size)
    }

    /// Check whether a later page has content.
    pub fn has_next(&self) -> bool {
        self.page_number + 1 < self.total_pages()
    }

    /// Check whether this is not the first page.
    pub fn has_previous(&self) -> bool {
        self.page_number > 0
    }

    /// Number of items on this page.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Check if this page has no items.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Transform the items, keeping the paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_elements: self.total_elements,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_page_size() {
        assert!(CatalogRecordSpecification::new().validate().is_ok());
        assert!(CatalogRecordSpecification::new()
            .with_pagination(0, 0)
            .validate()
            .is_err());
        assert!(CatalogRecordSpecification::new()
            .with_pagination(0, MAX_PAGE_SIZE + 1)
            .validate()
            .is_err());
    }

    #[test]
    fn test_kind_filter_uses_hierarchy() {
        let spec = CatalogRecordSpecification::new()
            .with_kind_in([RecordKind::Concept])
            .with_kind_not_in([RecordKind::Unit]);
        assert!(spec.matches_kind(RecordKind::Subject));
        assert!(spec.matches_kind(RecordKind::Concept));
        assert!(!spec.matches_kind(RecordKind::Unit));
        assert!(!spec.matches_kind(RecordKind::Text));
    }

    #[test]
    fn test_matches_all_filters() {
        let record = CatalogRecord::new("Wall-01", RecordKind::Subject)
            .with_label("de", "Außenwand")
            .with_tag("ifc");

        let spec = CatalogRecordSpecification::new().with_query("  WAND ");
        assert!(spec.matches(&record));

        let spec = CatalogRecordSpecification::new().with_query("wall");
        assert!(spec.matches(&record));

        let spec = CatalogRecordSpecification::new().with_tagged(["ifc", "other"]);
        assert!(!spec.matches(&record));

        let spec = CatalogRecordSpecification::new().with_id_not_in(["Wall-01"]);
        assert!(!spec.matches(&record));

        let spec = CatalogRecordSpecification::new().with_query("   ");
        assert!(spec.matches(&record));
    }

    #[test]
    fn test_parse_kinds() {
        let kinds = CatalogRecordSpecification::parse_kinds(&["subject", "XtdUnit"]).unwrap();
        assert_eq!(kinds, vec![RecordKind::Subject, RecordKind::Unit]);
        let err = CatalogRecordSpecification::parse_kinds(&["Widget"]).unwrap_err();
        assert!(matches!(err, Error::InvalidSpecification(_)));
    }

    #[test]
    fn test_page_metadata() {
        let page = Page::new(vec![1, 2, 3], Pagination::new(1, 3), 7);
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(page.has_previous());

        let last = Page::new(vec![7], Pagination::new(2, 3), 7);
        assert!(!last.has_next());

        let empty: Page<u8> = Page::new(vec![], Pagination::default(), 0);
        assert_eq!(empty.total_pages(), 0);
        assert!(!empty.has_next());
    }
}
