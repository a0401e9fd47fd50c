//! Record variants and their inheritance chain.

use std::fmt;
use std::str::FromStr;

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::error::Error;

/// The typed variant of a catalog record.
///
/// Variants form a shallow tree rooted at [`RecordKind::Root`]. Rule tables and
/// type filters follow this tree: a record of kind `Dimension` is also a
/// `Concept`, an `Object` and a `Root`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub enum RecordKind {
    Root,
    Object,
    Concept,
    Subject,
    Property,
    Dimension,
    Unit,
    Country,
    Subdivision,
    ExternalDocument,
    Value,
    ValueList,
    Dictionary,
    Interval,
    Symbol,
    Language,
    Rational,
    MultiLanguageText,
    Text,
}

impl RecordKind {
    /// Every record kind.
    pub const ALL: [RecordKind; 19] = [
        RecordKind::Root,
        RecordKind::Object,
        RecordKind::Concept,
        RecordKind::Subject,
        RecordKind::Property,
        RecordKind::Dimension,
        RecordKind::Unit,
        RecordKind::Country,
        RecordKind::Subdivision,
        RecordKind::ExternalDocument,
        RecordKind::Value,
        RecordKind::ValueList,
        RecordKind::Dictionary,
        RecordKind::Interval,
        RecordKind::Symbol,
        RecordKind::Language,
        RecordKind::Rational,
        RecordKind::MultiLanguageText,
        RecordKind::Text,
    ];

    /// Immediate ancestor, `None` for the root.
    pub fn parent(&self) -> Option<RecordKind> {
        match self {
            RecordKind::Root => None,
            RecordKind::Object
            | RecordKind::Rational
            | RecordKind::MultiLanguageText
            | RecordKind::Text => Some(RecordKind::Root),
            RecordKind::Concept
            | RecordKind::Dictionary
            | RecordKind::Language
            | RecordKind::Interval
            | RecordKind::Symbol => Some(RecordKind::Object),
            RecordKind::Subject
            | RecordKind::Property
            | RecordKind::Dimension
            | RecordKind::Unit
            | RecordKind::Country
            | RecordKind::Subdivision
            | RecordKind::ExternalDocument
            | RecordKind::Value
            | RecordKind::ValueList => Some(RecordKind::Concept),
        }
    }

    /// This kind followed by all of its ancestors, nearest first.
    pub fn lineage(&self) -> Lineage {
        Lineage { next: Some(*self) }
    }

    /// Check whether this kind is `other` or descends from it.
    pub fn is_a(&self, other: RecordKind) -> bool {
        self.lineage().any(|k| k == other)
    }

    /// Storage label, also the sort key for the type index.
    pub fn label(&self) -> &'static str {
        match self {
            RecordKind::Root => "XtdRoot",
            RecordKind::Object => "XtdObject",
            RecordKind::Concept => "XtdConcept",
            RecordKind::Subject => "XtdSubject",
            RecordKind::Property => "XtdProperty",
            RecordKind::Dimension => "XtdDimension",
            RecordKind::Unit => "XtdUnit",
            RecordKind::Country => "XtdCountry",
            RecordKind::Subdivision => "XtdSubdivision",
            RecordKind::ExternalDocument => "XtdExternalDocument",
            RecordKind::Value => "XtdValue",
            RecordKind::ValueList => "XtdValueList",
            RecordKind::Dictionary => "XtdDictionary",
            RecordKind::Interval => "XtdInterval",
            RecordKind::Symbol => "XtdSymbol",
            RecordKind::Language => "XtdLanguage",
            RecordKind::Rational => "XtdRational",
            RecordKind::MultiLanguageText => "XtdMultiLanguageText",
            RecordKind::Text => "XtdText",
        }
    }

    /// Look up a kind by its storage label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.label() == label)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RecordKind {
    type Err = Error;

    /// Accepts `Subject`, `subject` or `XtdSubject`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix("Xtd").unwrap_or(s);
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.label()[3..].eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::InvalidSpecification(format!("unknown record type: {}", s)))
    }
}

/// Iterator over a kind and its ancestors.
#[derive(Debug, Clone)]
pub struct Lineage {
    next: Option<RecordKind>,
}

impl Iterator for Lineage {
    type Item = RecordKind;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

/// Lifecycle status of a record.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Archive,
    Serialize,
    Deserialize,
    SerdeSerialize,
    SerdeDeserialize,
)]
pub enum Status {
    #[default]
    Active,
    Inactive,
    Deprecated,
    Draft,
}
