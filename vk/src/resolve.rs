//! Variable value lookup

use tracing::trace;

use crate::key::{Language, language_suffix, normalize_var_key};
use crate::map::VariableMap;

/// Resolve the value stored for `name`
///
/// First match wins:
/// 1. exact key
/// 2. case-insensitive key
/// 3. canonical match, preferring the same suffix then the base key when
///    `name` is suffixed, or the base key then the `preferred` suffix when
///    it is not
///
/// Returns an empty string when nothing matches.
pub fn resolve_variable_value(map: &VariableMap, name: &str, preferred: Language) -> String {
    if let Some(value) = map.get(name) {
        return value.clone();
    }

    let lowered = name.to_lowercase();
    if let Some((_, value)) = map.iter().find(|(key, _)| key.to_lowercase() == lowered) {
        return value.clone();
    }

    let canonical = normalize_var_key(name);
    if canonical.is_empty() {
        return String::new();
    }

    let candidates: Vec<(&String, &String)> = map
        .iter()
        .filter(|(key, _)| normalize_var_key(key) == canonical)
        .collect();
    if candidates.is_empty() {
        trace!(name, "resolve_variable_value: no candidates");
        return String::new();
    }

    let with_suffix = |wanted: Option<Language>| {
        candidates
            .iter()
            .find(|(key, _)| language_suffix(key.trim()) == wanted)
            .map(|(_, value)| (*value).clone())
    };

    let picked = match language_suffix(name.trim()) {
        Some(lang) => with_suffix(Some(lang)).or_else(|| with_suffix(None)),
        None => with_suffix(None).or_else(|| with_suffix(Some(preferred))),
    };

    picked.unwrap_or_else(|| candidates[0].1.clone())
}
