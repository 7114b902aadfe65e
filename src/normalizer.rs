/*!
 * Column label normalization.
 *
 * Raw CSV headers ("Energy (kcal)", "B12 (Cobalamin) (µg)") are mapped to
 * identifiers that are valid unquoted names in common SQL dialects.
 */

use log::warn;
use std::collections::HashSet;

/// Maximum identifier length produced by the normalizer
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Normalize a single raw label into a canonical field identifier.
///
/// Lower-cases, turns spaces into underscores, drops everything outside
/// `[a-z0-9_]`, prefixes `_` when the result does not start with a letter or
/// underscore, and truncates to [`MAX_IDENTIFIER_LEN`].
pub fn normalize(raw: &str) -> String {
    let mut name: String = raw
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect();

    let starts_ok = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    if !starts_ok {
        name.insert(0, '_');
    }

    // Only ASCII survives the filter, so byte truncation is char-safe
    name.truncate(MAX_IDENTIFIER_LEN);
    name
}

/// Normalize a whole header row, keeping the resulting names unique.
///
/// A label whose normalized form was already taken gets a `_2`, `_3`, ...
/// suffix.
pub fn normalize_columns<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(labels.len());
    let mut result = Vec::with_capacity(labels.len());

    for label in labels {
        let base = normalize(label.as_ref());
        let mut candidate = base.clone();
        let mut counter = 2;
        while seen.contains(&candidate) {
            let suffix = format!("_{}", counter);
            let keep = MAX_IDENTIFIER_LEN.saturating_sub(suffix.len()).min(base.len());
            candidate = format!("{}{}", &base[..keep], suffix);
            counter += 1;
        }
        if candidate != base {
            warn!(
                "Column '{}' normalizes to duplicate '{}', renamed to '{}'",
                label.as_ref(),
                base,
                candidate
            );
        }
        seen.insert(candidate.clone());
        result.push(candidate);
    }

    result
}

/// Whether `name` is already a normalized identifier
pub fn is_normalized(name: &str) -> bool {
    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    first_ok
        && name.len() <= MAX_IDENTIFIER_LEN
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
