//! Variable library: per-variable descriptions, examples and formats
//!
//! The library is reference data shipped with the template catalog. It is
//! never mutated here, only read for labels, placeholders and seed values.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::trace;

use crate::key::{Language, language_suffix, normalize_var_key, strip_language_suffix};

/// Text available in up to two languages
///
/// Deserializes from either `{"fr": .., "en": ..}` or a bare string, which
/// then applies to both languages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocalizedText {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
}

impl LocalizedText {
    /// Same text for both languages
    pub fn both(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            fr: Some(text.clone()),
            en: Some(text),
        }
    }

    pub fn new(fr: impl Into<String>, en: impl Into<String>) -> Self {
        Self {
            fr: Some(fr.into()),
            en: Some(en.into()),
        }
    }

    /// Non-empty text for `lang`
    pub fn get(&self, lang: Language) -> Option<&str> {
        let text = match lang {
            Language::Fr => self.fr.as_deref(),
            Language::En => self.en.as_deref(),
        };
        text.filter(|t| !t.trim().is_empty())
    }

    /// Text for `lang`, falling back to the other language
    pub fn get_or_other(&self, lang: Language) -> Option<&str> {
        self.get(lang).or_else(|| self.get(lang.other()))
    }

    pub fn is_empty(&self) -> bool {
        self.get(Language::Fr).is_none() && self.get(Language::En).is_none()
    }
}

impl<'de> Deserialize<'de> for LocalizedText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Plain(String),
            Split {
                #[serde(default)]
                fr: Option<String>,
                #[serde(default)]
                en: Option<String>,
            },
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            None => LocalizedText::default(),
            Some(Raw::Plain(text)) => LocalizedText::both(text),
            Some(Raw::Split { fr, en }) => LocalizedText { fr, en },
        })
    }
}

/// Value format of a variable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableFormat {
    #[default]
    Text,
    Date,
    Time,
    Number,
    Currency,
    Url,
}

impl VariableFormat {
    /// Parse a format name; anything unrecognised is plain text
    pub fn parse_lenient(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "date" => Self::Date,
            "time" => Self::Time,
            "number" => Self::Number,
            "currency" => Self::Currency,
            "url" => Self::Url,
            _ => Self::Text,
        }
    }

    /// Seed value used when a variable has no example
    pub fn default_sample(self, today: NaiveDate) -> String {
        match self {
            Self::Date => today.format("%Y-%m-%d").to_string(),
            Self::Time => "09:00".to_string(),
            Self::Number | Self::Currency => "0".to_string(),
            Self::Text | Self::Url => "…".to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for VariableFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Self::parse_lenient).unwrap_or_default())
    }
}

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^https?://").expect("valid url regex"));
static ISO_DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid iso date regex"));
static SLASH_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}[/-]\d{1,2}[/-]\d{2,4}").expect("valid slashed date regex"));
static WORD_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}\s+[A-Za-zÀ-ÿ]+\s+\d{4}").expect("valid spelled date regex"));
static TIME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,2}[:h]\d{2}$").expect("valid time regex"));
static MONEY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[$€£]?\d+(\.\d+)?%?$").expect("valid money regex"));
static DECIMAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?$").expect("valid decimal regex"));
static NUMBER_NOISE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s,._]").expect("valid separator regex"));
static CURRENCY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[€$£]").expect("valid currency regex"));

static NAME_DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"date|jour|day").expect("valid name regex"));
static NAME_TIME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"heure|time").expect("valid name regex"));
static NAME_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"montant|total|nombre|count|amount|num|quant").expect("valid name regex"));

/// Infer a variable format from the shape of an example value
pub fn infer_format(example: &str) -> VariableFormat {
    let value = example.trim();
    if value.is_empty() {
        return VariableFormat::Text;
    }
    if URL_RE.is_match(value) {
        return VariableFormat::Url;
    }
    if ISO_DATE_RE.is_match(value) || SLASH_DATE_RE.is_match(value) || WORD_DATE_RE.is_match(value) {
        return VariableFormat::Date;
    }
    if TIME_RE.is_match(value) {
        return VariableFormat::Time;
    }
    let digits = NUMBER_NOISE_RE.replace_all(value, "");
    if MONEY_RE.is_match(value) || DECIMAL_RE.is_match(&digits) {
        if CURRENCY_RE.is_match(value) {
            return VariableFormat::Currency;
        }
        return VariableFormat::Number;
    }
    VariableFormat::Text
}

/// Guess a format from the variable name alone
pub fn guess_format_from_name(name: &str) -> VariableFormat {
    let lowered = name.to_lowercase();
    if NAME_DATE_RE.is_match(&lowered) {
        VariableFormat::Date
    } else if NAME_TIME_RE.is_match(&lowered) {
        VariableFormat::Time
    } else if NAME_NUMBER_RE.is_match(&lowered) {
        VariableFormat::Number
    } else {
        VariableFormat::Text
    }
}

/// Library entry for one variable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableInfo {
    #[serde(default)]
    pub description: LocalizedText,

    #[serde(default, alias = "examples")]
    pub example: LocalizedText,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<VariableFormat>,
}

impl VariableInfo {
    /// Declared format, else inferred from the examples
    pub fn effective_format(&self) -> VariableFormat {
        match self.format {
            Some(format) if format != VariableFormat::Text => format,
            _ => self
                .example
                .get_or_other(Language::En)
                .map(infer_format)
                .unwrap_or_default(),
        }
    }
}

/// Canonical variable name -> library entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableLibrary {
    entries: BTreeMap<String, VariableInfo>,
}

impl VariableLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, info: VariableInfo) {
        self.entries.insert(name.into(), info);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VariableInfo)> {
        self.entries.iter()
    }

    /// Entry for `name`: exact, then without language suffix, then canonical
    pub fn lookup(&self, name: &str) -> Option<&VariableInfo> {
        if name.trim().is_empty() {
            return None;
        }
        if let Some(info) = self.entries.get(name) {
            return Some(info);
        }
        if let Some(info) = self.entries.get(strip_language_suffix(name)) {
            return Some(info);
        }
        let canonical = normalize_var_key(name);
        if canonical.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|(key, _)| normalize_var_key(key) == canonical)
            .map(|(_, info)| info)
    }

    /// Human label for `name`, falling back to the raw name
    pub fn description_for(&self, name: &str, lang: Language) -> String {
        self.lookup(name)
            .and_then(|info| info.description.get_or_other(lang))
            .map(str::to_string)
            .unwrap_or_else(|| name.to_string())
    }

    /// Example text to show in an empty field, if the library has one
    pub fn placeholder_example(&self, name: &str, lang: Language) -> Option<String> {
        let lang = language_suffix(name).unwrap_or(lang);
        self.lookup(name)
            .and_then(|info| info.example.get_or_other(lang))
            .map(str::to_string)
    }

    /// Format of `name`, guessed from the name when the library has no entry
    pub fn format_for(&self, name: &str) -> VariableFormat {
        match self.lookup(name) {
            Some(info) if info.format.is_some() || !info.example.is_empty() => info.effective_format(),
            _ => guess_format_from_name(name),
        }
    }

    /// Seed value used when a variable is reinitialized
    ///
    /// A language suffix on `name` overrides `lang`. Falls back to the
    /// example in the other language, then to the format default.
    pub fn sample_value(&self, name: &str, lang: Language, today: NaiveDate) -> String {
        if let Some(example) = self.placeholder_example(name, lang) {
            return example;
        }
        let format = self.format_for(name);
        trace!(name, ?format, "sample_value: no example, using format default");
        format.default_sample(today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn library() -> VariableLibrary {
        serde_json::from_str(
            r#"{
                "client_name": {
                    "description": {"fr": "Nom du client", "en": "Client name"},
                    "example": {"fr": "Amélie", "en": "Amal"},
                    "format": "text"
                },
                "amount": {
                    "description": {"en": "Amount"},
                    "example": "€1250"
                },
                "site": {
                    "examples": {"en": "https://example.org"},
                    "format": "hyperlink"
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_infer_format() {
        assert_eq!(infer_format(""), VariableFormat::Text);
        assert_eq!(infer_format("https://example.org"), VariableFormat::Url);
        assert_eq!(infer_format("2024-06-10"), VariableFormat::Date);
        assert_eq!(infer_format("10/06/2024"), VariableFormat::Date);
        assert_eq!(infer_format("10 juin 2024"), VariableFormat::Date);
        assert_eq!(infer_format("09:30"), VariableFormat::Time);
        assert_eq!(infer_format("14h00"), VariableFormat::Time);
        assert_eq!(infer_format("42"), VariableFormat::Number);
        assert_eq!(infer_format("1,250.50"), VariableFormat::Number);
        assert_eq!(infer_format("$120"), VariableFormat::Currency);
        assert_eq!(infer_format("Amal"), VariableFormat::Text);
    }

    #[test]
    fn test_guess_format_from_name() {
        assert_eq!(guess_format_from_name("event_date"), VariableFormat::Date);
        assert_eq!(guess_format_from_name("heure_rdv"), VariableFormat::Time);
        assert_eq!(guess_format_from_name("montant_total"), VariableFormat::Number);
        assert_eq!(guess_format_from_name("client_name"), VariableFormat::Text);
    }

    #[test]
    fn test_localized_text_accepts_plain_string() {
        let lib = library();
        let amount = lib.lookup("amount").unwrap();
        assert_eq!(amount.example.get(Language::Fr), Some("€1250"));
        assert_eq!(amount.example.get(Language::En), Some("€1250"));
        assert_eq!(amount.effective_format(), VariableFormat::Currency);
    }

    #[test]
    fn test_unknown_format_is_text() {
        let lib = library();
        let site = lib.lookup("site").unwrap();
        assert_eq!(site.format, Some(VariableFormat::Text));
        assert_eq!(site.effective_format(), VariableFormat::Url);
    }

    #[test]
    fn test_lookup_fallbacks() {
        let lib = library();
        assert!(lib.lookup("client_name").is_some());
        assert!(lib.lookup("client_name_FR").is_some());
        assert!(lib.lookup("Client Name").is_some());
        assert!(lib.lookup("event_date").is_none());
        assert!(lib.lookup("").is_none());
    }

    #[test]
    fn test_description_for_falls_back_to_name() {
        let lib = library();
        assert_eq!(lib.description_for("client_name", Language::Fr), "Nom du client");
        assert_eq!(lib.description_for("amount", Language::Fr), "Amount");
        assert_eq!(lib.description_for("event_date", Language::Fr), "event_date");
    }

    #[test]
    fn test_sample_value_prefers_suffix_language() {
        let lib = library();
        assert_eq!(lib.sample_value("client_name_EN", Language::Fr, today()), "Amal");
        assert_eq!(lib.sample_value("client_name", Language::Fr, today()), "Amélie");
        assert_eq!(lib.sample_value("site_FR", Language::Fr, today()), "https://example.org");
    }

    #[test]
    fn test_sample_value_format_defaults() {
        let lib = VariableLibrary::new();
        assert_eq!(lib.sample_value("event_date", Language::Fr, today()), "2024-06-10");
        assert_eq!(lib.sample_value("meeting_time", Language::Fr, today()), "09:00");
        assert_eq!(lib.sample_value("total_count", Language::Fr, today()), "0");
        assert_eq!(lib.sample_value("client_name", Language::Fr, today()), "…");
    }
}
