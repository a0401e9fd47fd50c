//! Weighted language ranges and RFC 4647 matching.

use std::collections::HashSet;
use std::fmt;

use crate::error::Error;

/// Priority list used when the caller supplies no preferences.
pub const DEFAULT_PRIORITY_LIST: &str = "de,en-US;q=0.7,en;q=0.3";

/// Locale returned by the last-resort fallback.
pub const DEFAULT_LOCALE: &str = "en";

/// A language range with its preference weight.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageRange {
    /// Lower-cased range, e.g. `en-us` or `*`.
    range: String,
    /// Weight in `[0.0, 1.0]`.
    weight: f64,
}

impl LanguageRange {
    /// Create a range. The range is lower-cased.
    pub fn new(range: impl AsRef<str>, weight: f64) -> Result<Self, Error> {
        let range = range.as_ref().trim().to_ascii_lowercase();
        if range.is_empty() || range.split('-').any(str::is_empty) {
            return Err(Error::InvalidLanguageRange(format!(
                "malformed range {:?}",
                range
            )));
        }
        if !(0.0..=1.0).contains(&weight) {
            return Err(Error::InvalidLanguageRange(format!(
                "weight {} of {} outside [0, 1]",
                weight, range
            )));
        }
        Ok(Self { range, weight })
    }

    /// Parse an `Accept-Language` style list such as `de,en-US;q=0.7,en;q=0.3`.
    ///
    /// The result is stable-sorted by descending weight.
    pub fn parse_list(input: &str) -> Result<Vec<LanguageRange>, Error> {
        let mut ranges = Vec::new();
        for item in input.split(',') {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }

            let (range, weight) = match item.split_once(';') {
                Some((range, params)) => {
                    let q = params
                        .trim()
                        .strip_prefix("q=")
                        .ok_or_else(|| {
                            Error::InvalidLanguageRange(format!("bad parameter in {:?}", item))
                        })?;
                    let weight = q.trim().parse::<f64>().map_err(|_| {
                        Error::InvalidLanguageRange(format!("bad weight in {:?}", item))
                    })?;
                    (range, weight)
                }
                None => (item, 1.0),
            };
            ranges.push(LanguageRange::new(range, weight)?);
        }

        if ranges.is_empty() {
            return Err(Error::InvalidLanguageRange("empty priority list".into()));
        }
        sort_by_weight(&mut ranges);
        Ok(ranges)
    }

    /// Range text, lower-cased.
    pub fn range(&self) -> &str {
        &self.range
    }

    /// Preference weight.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Check if this is the `*` range.
    pub fn is_wildcard(&self) -> bool {
        self.range == "*"
    }
}

impl fmt::Display for LanguageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weight >= 1.0 {
            f.write_str(&self.range)
        } else {
            write!(f, "{};q={}", self.range, self.weight)
        }
    }
}

/// The fixed default priority list (`de, en-US;q=0.7, en;q=0.3`).
pub fn default_priority_list() -> Vec<LanguageRange> {
    vec![
        LanguageRange {
            range: "de".into(),
            weight: 1.0,
        },
        LanguageRange {
            range: "en-us".into(),
            weight: 0.7,
        },
        LanguageRange {
            range: "en".into(),
            weight: 0.3,
        },
    ]
}

/// Build a priority list from locales in preference order.
///
/// The first locale gets weight 1.0, each following one 0.1 less, floored at 0.
pub fn priority_list<S: AsRef<str>>(locales: &[S]) -> Result<Vec<LanguageRange>, Error> {
    let mut weight: f64 = 1.0;
    let mut ranges = Vec::with_capacity(locales.len());
    for locale in locales {
        ranges.push(LanguageRange::new(locale, weight)?);
        // Round to one decimal so repeated subtraction does not drift.
        weight = ((weight - 0.1).max(0.0) * 10.0).round() / 10.0;
    }
    Ok(ranges)
}

fn sort_by_weight(ranges: &mut [LanguageRange]) {
    ranges.sort_by(|a, b| b.weight.total_cmp(&a.weight));
}

/// RFC 4647 extended filtering.
///
/// Returns the tags matched by the ranges, highest-weight range first. Tags
/// matched by one range keep the order of `tags`. Zero-weight ranges exclude
/// the tags they match.
pub fn filter<'t>(priority: &[LanguageRange], tags: &[&'t str]) -> Vec<&'t str> {
    let mut ordered = priority.to_vec();
    sort_by_weight(&mut ordered);

    let excluded: HashSet<&str> = ordered
        .iter()
        .filter(|r| r.weight == 0.0)
        .flat_map(|r| {
            tags.iter()
                .copied()
                .filter(move |tag| extended_match(&r.range, tag))
        })
        .collect();

    let mut seen = HashSet::new();
    let mut matched = Vec::new();
    for range in ordered.iter().filter(|r| r.weight > 0.0) {
        for tag in tags {
            if excluded.contains(tag) || seen.contains(tag) {
                continue;
            }
            if extended_match(&range.range, tag) {
                seen.insert(*tag);
                matched.push(*tag);
            }
        }
    }
    matched
}

/// RFC 4647 lookup.
///
/// Each range, highest weight first, is progressively truncated from the
/// right until it equals one of `tags`. The wildcard range is skipped.
pub fn lookup<'t>(priority: &[LanguageRange], tags: &[&'t str]) -> Option<&'t str> {
    let mut ordered = priority.to_vec();
    sort_by_weight(&mut ordered);

    for range in ordered.iter().filter(|r| r.weight > 0.0 && !r.is_wildcard()) {
        // Subtags after a wildcard cannot be looked up literally.
        let mut subtags: Vec<&str> = range
            .range
            .split('-')
            .take_while(|s| *s != "*")
            .collect();

        while !subtags.is_empty() {
            let candidate = subtags.join("-");
            if let Some(tag) = tags.iter().find(|t| t.eq_ignore_ascii_case(&candidate)) {
                return Some(*tag);
            }
            subtags.pop();
            // Never end on a singleton such as the `x` of a private use tag.
            if subtags.last().is_some_and(|s| s.len() == 1) {
                subtags.pop();
            }
        }
    }
    None
}

/// Match a single range against a tag following RFC 4647 §3.3.2.
fn extended_match(range: &str, tag: &str) -> bool {
    if range == "*" {
        return true;
    }

    let tag = tag.to_ascii_lowercase();
    let range_subtags: Vec<&str> = range.split('-').collect();
    let tag_subtags: Vec<&str> = tag.split('-').collect();

    let (first_range, first_tag) = (range_subtags[0], tag_subtags[0]);
    if first_range != "*" && first_range != first_tag {
        return false;
    }

    let mut r = 1;
    let mut t = 1;
    while r < range_subtags.len() {
        if range_subtags[r] == "*" {
            r += 1;
        } else if t >= tag_subtags.len() {
            return false;
        } else if range_subtags[r] == tag_subtags[t] {
            r += 1;
            t += 1;
        } else if tag_subtags[t].len() == 1 {
            return false;
        } else {
            t += 1;
        }
    }
    true
}
