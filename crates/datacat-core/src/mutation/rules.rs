//! Relationship rule tables per record kind.

use std::collections::HashMap;

use crate::model::{Cardinality, RecordKind, SimpleRelationType};

/// How one relationship slot of a record kind may be mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleDescriptor {
    /// Slot the rule governs.
    pub relation: SimpleRelationType,
    /// Singleton or multi.
    pub cardinality: Cardinality,
    /// Kind every target must be (or descend from).
    pub target: RecordKind,
}

impl RuleDescriptor {
    /// A single-target slot.
    pub const fn singleton(relation: SimpleRelationType, target: RecordKind) -> Self {
        Self {
            relation,
            cardinality: Cardinality::Singleton,
            target,
        }
    }

    /// A replaceable set of targets.
    pub const fn multi(relation: SimpleRelationType, target: RecordKind) -> Self {
        Self {
            relation,
            cardinality: Cardinality::Multi,
            target,
        }
    }
}

/// A rule found for a record, with the kind whose table declared it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRule {
    pub rule: RuleDescriptor,
    /// The record's own kind or the ancestor that handled the relation.
    pub declared_on: RecordKind,
}

/// Rule tables keyed by (kind, relation).
///
/// Lookup walks the kind's ancestor chain, so a relation declared on
/// `Concept` applies to every concept descendant unless overridden.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    rules: HashMap<(RecordKind, SimpleRelationType), RuleDescriptor>,
}

impl RuleRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog's rule tables.
    pub fn standard() -> Self {
        use RecordKind as K;
        use SimpleRelationType as R;

        let mut registry = Self::new();

        registry
            .register(K::Object, RuleDescriptor::singleton(R::Dictionary, K::Dictionary))
            .register(
                K::Object,
                RuleDescriptor::singleton(R::DeprecationExplanation, K::MultiLanguageText),
            )
            .register(K::Object, RuleDescriptor::multi(R::ReplacedObjects, K::Object))
            .register(K::Object, RuleDescriptor::multi(R::Names, K::MultiLanguageText))
            .register(K::Object, RuleDescriptor::multi(R::Comments, K::MultiLanguageText));

        registry
            .register(K::Concept, RuleDescriptor::singleton(R::Definition, K::MultiLanguageText))
            .register(K::Concept, RuleDescriptor::multi(R::Examples, K::MultiLanguageText))
            .register(K::Concept, RuleDescriptor::singleton(R::LanguageOfCreator, K::Language))
            .register(
                K::Concept,
                RuleDescriptor::multi(R::ReferenceDocuments, K::ExternalDocument),
            )
            .register(K::Concept, RuleDescriptor::multi(R::Descriptions, K::MultiLanguageText))
            .register(K::Concept, RuleDescriptor::multi(R::SimilarTo, K::Concept))
            .register(K::Concept, RuleDescriptor::singleton(R::CountryOfOrigin, K::Country));

        registry.register(K::Subject, RuleDescriptor::multi(R::Properties, K::Property));

        registry
            .register(K::Property, RuleDescriptor::singleton(R::Dimension, K::Dimension))
            .register(K::Property, RuleDescriptor::multi(R::Symbols, K::Symbol))
            .register(K::Property, RuleDescriptor::multi(R::Units, K::Unit))
            .register(K::Property, RuleDescriptor::multi(R::PossibleValues, K::ValueList))
            .register(K::Property, RuleDescriptor::multi(R::BoundaryValues, K::Interval));

        for exponent in [
            R::LengthExponent,
            R::MassExponent,
            R::TimeExponent,
            R::ElectricCurrentExponent,
            R::ThermodynamicTemperatureExponent,
            R::AmountOfSubstanceExponent,
            R::LuminousIntensityExponent,
        ] {
            registry.register(K::Dimension, RuleDescriptor::singleton(exponent, K::Rational));
        }

        registry
            .register(K::Unit, RuleDescriptor::singleton(R::Symbol, K::Text))
            .register(K::Unit, RuleDescriptor::singleton(R::Coefficient, K::Rational))
            .register(K::Unit, RuleDescriptor::singleton(R::Offset, K::Rational))
            .register(K::Unit, RuleDescriptor::singleton(R::Dimension, K::Dimension));

        registry.register(K::Country, RuleDescriptor::multi(R::Subdivisions, K::Subdivision));

        registry
            .register(K::ValueList, RuleDescriptor::multi(R::Values, K::Value))
            .register(K::ValueList, RuleDescriptor::singleton(R::Unit, K::Unit))
            .register(K::ValueList, RuleDescriptor::singleton(R::Language, K::Language));

        registry.register(K::Dictionary, RuleDescriptor::singleton(R::Name, K::MultiLanguageText));

        registry
            .register(K::Interval, RuleDescriptor::singleton(R::Minimum, K::ValueList))
            .register(K::Interval, RuleDescriptor::singleton(R::Maximum, K::ValueList));

        registry
            .register(K::Symbol, RuleDescriptor::singleton(R::Subject, K::Subject))
            .register(K::Symbol, RuleDescriptor::singleton(R::Symbol, K::Text));

        registry.register(K::Text, RuleDescriptor::singleton(R::Language, K::Language));

        registry.register(K::MultiLanguageText, RuleDescriptor::multi(R::Texts, K::Text));

        registry
    }

    /// Declare a rule on a kind, replacing any previous one for the relation.
    pub fn register(&mut self, kind: RecordKind, rule: RuleDescriptor) -> &mut Self {
        self.rules.insert((kind, rule.relation), rule);
        self
    }

    /// The rule declared directly on `kind`, without ancestor fallback.
    pub fn own_rule(&self, kind: RecordKind, relation: SimpleRelationType) -> Option<RuleDescriptor> {
        self.rules.get(&(kind, relation)).copied()
    }

    /// Find the rule for a relation, trying `kind` first and then each
    /// ancestor in turn.
    pub fn resolve(&self, kind: RecordKind, relation: SimpleRelationType) -> Option<ResolvedRule> {
        kind.lineage().find_map(|candidate| {
            self.own_rule(candidate, relation).map(|rule| ResolvedRule {
                rule,
                declared_on: candidate,
            })
        })
    }

    /// All relations a kind can mutate, including inherited ones.
    pub fn relations_for(&self, kind: RecordKind) -> Vec<RuleDescriptor> {
        let mut found: Vec<RuleDescriptor> = SimpleRelationType::ALL
            .iter()
            .filter_map(|relation| self.resolve(kind, *relation).map(|r| r.rule))
            .collect();
        found.sort_by_key(|rule| rule.relation);
        found
    }

    /// Number of declared rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Check if no rule is declared.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
