//! Expanding an edit into every key that stores the variable
//!
//! A value typed for `client_name_FR` is also written to `client_name`, and a
//! value typed for `client_name` is also written to the suffixed key of the
//! active language, so the resolver finds it whichever form a template uses.

use crate::key::{Language, keys_match, language_suffix, strip_language_suffix};
use crate::map::VariableMap;

/// Keys (and value) that an edit of `var_name` should write
///
/// With no `preferred` language a base name writes both suffixed keys.
pub fn expand_assignment(var_name: &str, value: &str, preferred: Option<Language>) -> Vec<(String, String)> {
    if var_name.is_empty() {
        return Vec::new();
    }

    let mut assignments = vec![(var_name.to_string(), value.to_string())];
    if language_suffix(var_name).is_some() {
        let base = strip_language_suffix(var_name);
        if !base.is_empty() {
            assignments.push((base.to_string(), value.to_string()));
        }
        return assignments;
    }

    let languages = match preferred {
        Some(lang) => vec![lang],
        None => vec![Language::Fr, Language::En],
    };
    for lang in languages {
        assignments.push((format!("{var_name}_{}", lang.suffix()), value.to_string()));
    }
    assignments
}

/// Keys an in-place edit of `var_name` should write
///
/// The exact name plus every key of `prev` naming the same variable, so no
/// stale twin survives the edit. Unlike [`expand_assignment`] no new key is
/// invented.
pub fn assign_existing_twins(prev: &VariableMap, var_name: &str, value: &str) -> Vec<(String, String)> {
    if var_name.is_empty() {
        return Vec::new();
    }

    let mut assignments = vec![(var_name.to_string(), value.to_string())];
    for key in prev.keys() {
        if key != var_name && keys_match(key, var_name) {
            assignments.push((key.clone(), value.to_string()));
        }
    }
    assignments
}

/// Apply `assignments` on top of `prev`
///
/// Returns `None` when every assigned key already holds its value (a
/// missing key counts as empty).
pub fn apply_assignments(prev: &VariableMap, assignments: &[(String, String)]) -> Option<VariableMap> {
    let mut next: Option<VariableMap> = None;
    for (key, value) in assignments {
        let current = next
            .as_ref()
            .unwrap_or(prev)
            .get(key)
            .map(String::as_str)
            .unwrap_or_default();
        if current != value {
            next.get_or_insert_with(|| prev.clone())
                .insert(key.clone(), value.clone());
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(assignments: &[(String, String)]) -> Vec<&str> {
        assignments.iter().map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn test_expand_suffixed_name_writes_base() {
        let a = expand_assignment("client_name_FR", "Amal", Some(Language::En));
        assert_eq!(keys(&a), vec!["client_name_FR", "client_name"]);
        assert!(a.iter().all(|(_, v)| v == "Amal"));
    }

    #[test]
    fn test_expand_base_name_writes_preferred_suffix() {
        let a = expand_assignment("client_name", "Amal", Some(Language::En));
        assert_eq!(keys(&a), vec!["client_name", "client_name_EN"]);
    }

    #[test]
    fn test_expand_base_name_without_preference_writes_both() {
        let a = expand_assignment("client_name", "Amal", None);
        assert_eq!(keys(&a), vec!["client_name", "client_name_FR", "client_name_EN"]);
    }

    #[test]
    fn test_expand_empty_name() {
        assert!(expand_assignment("", "x", None).is_empty());
        assert_eq!(keys(&expand_assignment("_FR", "x", None)), vec!["_FR"]);
    }

    #[test]
    fn test_existing_twins_follow_the_edit() {
        let mut prev = VariableMap::new();
        prev.insert("client_name_FR".to_string(), "Old".to_string());
        prev.insert("Client-Name".to_string(), "Older".to_string());
        prev.insert("event_date".to_string(), "June 10".to_string());

        let a = assign_existing_twins(&prev, "client_name", "New");
        assert_eq!(keys(&a), vec!["client_name", "Client-Name", "client_name_FR"]);

        let next = apply_assignments(&prev, &a).unwrap();
        assert_eq!(next.get("client_name").unwrap(), "New");
        assert_eq!(next.get("client_name_FR").unwrap(), "New");
        assert_eq!(next.get("Client-Name").unwrap(), "New");
        assert_eq!(next.get("event_date").unwrap(), "June 10");
    }

    #[test]
    fn test_existing_twins_invent_no_keys() {
        let a = assign_existing_twins(&VariableMap::new(), "event_date", "June 10");
        assert_eq!(a, vec![("event_date".to_string(), "June 10".to_string())]);
        assert!(assign_existing_twins(&VariableMap::new(), "", "x").is_empty());
    }

    #[test]
    fn test_apply_assignments_detects_no_change() {
        let mut prev = VariableMap::new();
        prev.insert("client_name".to_string(), "Amal".to_string());
        prev.insert("client_name_FR".to_string(), "Amal".to_string());

        let same = expand_assignment("client_name", "Amal", Some(Language::Fr));
        assert!(apply_assignments(&prev, &same).is_none());

        let cleared = expand_assignment("event_date", "", Some(Language::Fr));
        assert!(apply_assignments(&prev, &cleared).is_none());
    }

    #[test]
    fn test_apply_assignments_returns_new_snapshot() {
        let prev = VariableMap::new();
        let next = apply_assignments(&prev, &expand_assignment("event_date", "June 10", Some(Language::En))).unwrap();
        assert_eq!(next.get("event_date").unwrap(), "June 10");
        assert_eq!(next.get("event_date_EN").unwrap(), "June 10");
        assert!(prev.is_empty());
    }
}
