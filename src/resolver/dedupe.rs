// Variant deduplication keyed on (quality, format)

use std::collections::HashSet;

use super::models::Variant;

/// Drop variants whose `(quality, format)` was already seen.
///
/// First occurrence wins and the relative order of survivors is kept.
pub fn dedupe(variants: Vec<Variant>) -> Vec<Variant> {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(variants.len());
    variants
        .into_iter()
        .filter(|v| seen.insert((v.quality.clone(), v.format.clone())))
        .collect()
}
