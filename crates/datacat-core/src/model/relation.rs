//! Relation type tags and slot cardinality.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Cardinality of a relationship slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    /// At most one target. Never overwritten through the generic mutation path.
    Singleton,
    /// A replaceable set of targets.
    Multi,
}

impl Cardinality {
    /// Check if this is a singleton slot.
    pub fn is_singleton(&self) -> bool {
        *self == Cardinality::Singleton
    }
}

/// Names the relationship slot a mutation or relation query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SimpleRelationType {
    AmountOfSubstanceExponent,
    BoundaryValues,
    Coefficient,
    Comments,
    CountryOfOrigin,
    Definition,
    DeprecationExplanation,
    Descriptions,
    Dictionary,
    Dimension,
    ElectricCurrentExponent,
    Examples,
    Language,
    LanguageOfCreator,
    LengthExponent,
    LuminousIntensityExponent,
    MassExponent,
    Maximum,
    Minimum,
    Name,
    Names,
    Offset,
    PossibleValues,
    Properties,
    ReferenceDocuments,
    ReplacedObjects,
    SimilarTo,
    Subdivisions,
    Subject,
    Symbol,
    Symbols,
    Texts,
    ThermodynamicTemperatureExponent,
    TimeExponent,
    Unit,
    Units,
    Values,
}

impl SimpleRelationType {
    /// Every relation type, in declaration order.
    pub const ALL: [SimpleRelationType; 37] = [
        SimpleRelationType::AmountOfSubstanceExponent,
        SimpleRelationType::BoundaryValues,
        SimpleRelationType::Coefficient,
        SimpleRelationType::Comments,
        SimpleRelationType::CountryOfOrigin,
        SimpleRelationType::Definition,
        SimpleRelationType::DeprecationExplanation,
        SimpleRelationType::Descriptions,
        SimpleRelationType::Dictionary,
        SimpleRelationType::Dimension,
        SimpleRelationType::ElectricCurrentExponent,
        SimpleRelationType::Examples,
        SimpleRelationType::Language,
        SimpleRelationType::LanguageOfCreator,
        SimpleRelationType::LengthExponent,
        SimpleRelationType::LuminousIntensityExponent,
        SimpleRelationType::MassExponent,
        SimpleRelationType::Maximum,
        SimpleRelationType::Minimum,
        SimpleRelationType::Name,
        SimpleRelationType::Names,
        SimpleRelationType::Offset,
        SimpleRelationType::PossibleValues,
        SimpleRelationType::Properties,
        SimpleRelationType::ReferenceDocuments,
        SimpleRelationType::ReplacedObjects,
        SimpleRelationType::SimilarTo,
        SimpleRelationType::Subdivisions,
        SimpleRelationType::Subject,
        SimpleRelationType::Symbol,
        SimpleRelationType::Symbols,
        SimpleRelationType::Texts,
        SimpleRelationType::ThermodynamicTemperatureExponent,
        SimpleRelationType::TimeExponent,
        SimpleRelationType::Unit,
        SimpleRelationType::Units,
        SimpleRelationType::Values,
    ];

    /// Edge label used in storage.
    pub fn label(&self) -> &'static str {
        match self {
            SimpleRelationType::AmountOfSubstanceExponent => "AMOUNT_OF_SUBSTANCE_EXPONENT",
            SimpleRelationType::BoundaryValues => "BOUNDARY_VALUES",
            SimpleRelationType::Coefficient => "COEFFICIENT",
            SimpleRelationType::Comments => "COMMENTS",
            SimpleRelationType::CountryOfOrigin => "COUNTRY_OF_ORIGIN",
            SimpleRelationType::Definition => "DEFINITION",
            SimpleRelationType::DeprecationExplanation => "DEPRECATION_EXPLANATION",
            SimpleRelationType::Descriptions => "DESCRIPTIONS",
            SimpleRelationType::Dictionary => "DICTIONARY",
            SimpleRelationType::Dimension => "DIMENSION",
            SimpleRelationType::ElectricCurrentExponent => "ELECTRIC_CURRENT_EXPONENT",
            SimpleRelationType::Examples => "EXAMPLES",
            SimpleRelationType::Language => "LANGUAGE",
            SimpleRelationType::LanguageOfCreator => "LANGUAGE_OF_CREATOR",
            SimpleRelationType::LengthExponent => "LENGTH_EXPONENT",
            SimpleRelationType::LuminousIntensityExponent => "LUMINOUS_INTENSITY_EXPONENT",
            SimpleRelationType::MassExponent => "MASS_EXPONENT",
            SimpleRelationType::Maximum => "MAXIMUM",
            SimpleRelationType::Minimum => "MINIMUM",
            SimpleRelationType::Name => "NAME",
            SimpleRelationType::Names => "NAMES",
            SimpleRelationType::Offset => "OFFSET",
            SimpleRelationType::PossibleValues => "POSSIBLE_VALUES",
            SimpleRelationType::Properties => "PROPERTIES",
            SimpleRelationType::ReferenceDocuments => "REFERENCE_DOCUMENTS",
            SimpleRelationType::ReplacedObjects => "REPLACED_OBJECTS",
            SimpleRelationType::SimilarTo => "SIMILAR_TO",
            SimpleRelationType::Subdivisions => "SUBDIVISIONS",
            SimpleRelationType::Subject => "SUBJECT",
            SimpleRelationType::Symbol => "SYMBOL",
            SimpleRelationType::Symbols => "SYMBOLS",
            SimpleRelationType::Texts => "TEXTS",
            SimpleRelationType::ThermodynamicTemperatureExponent => {
                "THERMODYNAMIC_TEMPERATURE_EXPONENT"
            }
            SimpleRelationType::TimeExponent => "TIME_EXPONENT",
            SimpleRelationType::Unit => "UNIT",
            SimpleRelationType::Units => "UNITS",
            SimpleRelationType::Values => "VALUES",
        }
    }

    /// Look up a relation type by its storage label.
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.label() == label)
    }
}

impl fmt::Display for SimpleRelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SimpleRelationType {
    type Err = Error;

    /// Accepts either the variant name (`ReferenceDocuments`) or the storage
    /// label (`REFERENCE_DOCUMENTS`), ignoring case and separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .iter()
            .copied()
            .find(|r| normalize(r.label()) == wanted)
            .ok_or_else(|| Error::InvalidData(format!("unknown relation type: {}", s)))
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_unique() {
        let mut labels: Vec<_> = SimpleRelationType::ALL.iter().map(|r| r.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), SimpleRelationType::ALL.len());
    }

    #[test]
    fn test_parse_both_spellings() {
        assert_eq!(
            "ReferenceDocuments".parse::<SimpleRelationType>().unwrap(),
            SimpleRelationType::ReferenceDocuments
        );
        assert_eq!(
            "REFERENCE_DOCUMENTS".parse::<SimpleRelationType>().unwrap(),
            SimpleRelationType::ReferenceDocuments
        );
        assert!("Parts".parse::<SimpleRelationType>().is_err());
    }

    #[test]
    fn test_from_label() {
        assert_eq!(
            SimpleRelationType::from_label("DEFINITION"),
            Some(SimpleRelationType::Definition)
        );
        assert_eq!(SimpleRelationType::from_label("Definition"), None);
    }
}
