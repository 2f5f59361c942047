//! Canonical variable names
//!
//! A variable name may end in a two-letter language suffix (`_FR`, `_en`).
//! The canonical form drops the suffix, lowercases, and keeps only ASCII
//! letters and digits, so `Client Name_FR`, `client_name` and
//! `CLIENT-NAME-EN` all describe the same variable.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Template language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Fr,
    En,
}

impl Language {
    /// Lowercase language code (`fr`, `en`)
    pub fn code(self) -> &'static str {
        match self {
            Language::Fr => "fr",
            Language::En => "en",
        }
    }

    /// Uppercase suffix used in variable names (`FR`, `EN`)
    pub fn suffix(self) -> &'static str {
        match self {
            Language::Fr => "FR",
            Language::En => "EN",
        }
    }

    /// The other supported language
    pub fn other(self) -> Language {
        match self {
            Language::Fr => Language::En,
            Language::En => Language::Fr,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Error for language codes other than `fr` / `en`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown language '{0}', expected 'fr' or 'en'")]
pub struct UnknownLanguage(pub String);

impl FromStr for Language {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fr" => Ok(Language::Fr),
            "en" => Ok(Language::En),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}

/// Language suffix carried by `name`, if any (`_fr` / `_en`, any case)
pub fn language_suffix(name: &str) -> Option<Language> {
    let split = name.len().checked_sub(3)?;
    let tail = name.get(split..)?;
    let code = tail.strip_prefix('_')?;
    code.parse().ok()
}

/// `name` without its trailing language suffix
pub fn strip_language_suffix(name: &str) -> &str {
    match language_suffix(name) {
        Some(_) => &name[..name.len() - 3],
        None => name,
    }
}

/// Canonical form of a variable name
///
/// Total and idempotent: any input yields a (possibly empty) string made of
/// `[a-z0-9]` only.
pub fn normalize_var_key(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    let lowered = trimmed.to_lowercase();
    strip_language_suffix(&lowered)
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Whether two names refer to the same variable
pub fn keys_match(a: &str, b: &str) -> bool {
    normalize_var_key(a) == normalize_var_key(b)
}
