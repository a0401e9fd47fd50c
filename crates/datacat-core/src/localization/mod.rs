//! Locale-aware text resolution.
//!
//! Names, comments and descriptions are stored as bundles of per-language
//! texts. This module reduces a bundle to the single text that best matches a
//! weighted language priority list.

mod range;
mod resolver;

pub use range::{
    default_priority_list, filter, lookup, priority_list, LanguageRange, DEFAULT_LOCALE,
    DEFAULT_PRIORITY_LIST,
};
pub use resolver::{LocalizationResolver, LocalizedText, TextSource};
