//! Case- and separator-insensitive key matching for structured documents.
//!
//! Keys are compared after lowercasing, with `_` and ` ` treated as the same
//! separator, so `"Key Metrics"`, `"key_metrics"` and `"KEY_METRICS"` all
//! address one field.

/// Canonical form of a key: lowercased, spaces folded to underscores.
pub fn canonical(key: &str) -> String {
    key.to_lowercase().replace(' ', "_")
}

/// Whether two keys address the same field.
///
/// Equal if the lowercased literal, underscored or spaced renditions agree.
pub fn keys_match(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a == b || a.replace(' ', "_") == b.replace(' ', "_") || a.replace('_', " ") == b.replace('_', " ")
}

/// Result of looking a key up among existing keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMatch<'a> {
    /// No existing key matches.
    Missing,
    /// Exactly one existing key matches (possibly under a different spelling).
    Found(&'a str),
    /// Several existing keys match; the caller must not guess.
    Ambiguous(Vec<&'a str>),
}

/// Find the existing key that `target` addresses.
///
/// A literal hit wins outright, so a document that already carries two
/// colliding spellings can still address each of them by its exact name.
pub fn resolve<'a, I>(target: &str, candidates: I) -> KeyMatch<'a>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut matches = Vec::new();
    for candidate in candidates {
        if candidate == target {
            return KeyMatch::Found(candidate);
        }
        if keys_match(target, candidate) {
            matches.push(candidate);
        }
    }
    match matches.len() {
        0 => KeyMatch::Missing,
        1 => KeyMatch::Found(matches[0]),
        _ => KeyMatch::Ambiguous(matches),
    }
}

/// First pair of keys that normalize to the same form, if any.
pub fn find_collision<'a, I>(keys: I) -> Option<(&'a str, &'a str)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: std::collections::HashMap<String, &'a str> = std::collections::HashMap::new();
    for key in keys {
        if let Some(previous) = seen.insert(canonical(key), key) {
            return Some((previous, key));
        }
    }
    None
}
