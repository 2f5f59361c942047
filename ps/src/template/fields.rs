//! Field order and consumer-side substitution

use varkit::{Language, VariableMap, keys_match, normalize_var_key, resolve_variable_value, strip_language_suffix};

use super::tokenizer::{Segment, placeholder_names, tokenize};

/// Distinct variables of a template in first-occurrence order
///
/// Names are stored without their language suffix. Used for Tab / Enter
/// navigation, wrapping at both ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOrder {
    names: Vec<String>,
}

impl FieldOrder {
    /// Field order over several texts, scanned in the given order
    pub fn from_texts<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut order = Self::default();
        for text in texts {
            for name in placeholder_names(text) {
                order.push(name);
            }
        }
        order
    }

    /// Append declared variables missing from the text
    pub fn with_declared<S: AsRef<str>>(mut self, declared: &[S]) -> Self {
        for name in declared {
            self.push(name.as_ref());
        }
        self
    }

    fn push(&mut self, name: &str) {
        if normalize_var_key(name).is_empty() || self.position(name).is_some() {
            return;
        }
        self.names.push(strip_language_suffix(name.trim()).to_string());
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of the field matching `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        if normalize_var_key(name).is_empty() {
            return None;
        }
        self.names.iter().position(|field| keys_match(field, name))
    }

    /// Field after `name`, wrapping; the first field when `name` is unknown
    pub fn next(&self, name: &str) -> Option<&str> {
        if self.names.is_empty() {
            return None;
        }
        let index = match self.position(name) {
            Some(i) => (i + 1) % self.names.len(),
            None => 0,
        };
        Some(&self.names[index])
    }

    /// Field before `name`, wrapping; the last field when `name` is unknown
    pub fn previous(&self, name: &str) -> Option<&str> {
        if self.names.is_empty() {
            return None;
        }
        let len = self.names.len();
        let index = match self.position(name) {
            Some(i) => (i + len - 1) % len,
            None => len - 1,
        };
        Some(&self.names[index])
    }
}

/// Substitute live values into `text`
///
/// Tokens whose value is blank are kept as-is.
pub fn fill_placeholders(text: &str, values: &VariableMap, lang: Language) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in tokenize(text) {
        match segment {
            Segment::Text(run) => out.push_str(run),
            Segment::Placeholder { name } => {
                let value = resolve_variable_value(values, name, lang);
                if value.trim().is_empty() {
                    out.push_str("<<");
                    out.push_str(name);
                    out.push_str(">>");
                } else {
                    out.push_str(&value);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_first_occurrence() {
        let order = FieldOrder::from_texts(["Re: <<event_date>>", "<<event_date>>: <<client_name>> <<Client_Name_FR>>"]);
        assert_eq!(order.names(), &["event_date", "client_name"]);
    }

    #[test]
    fn test_field_order_strips_suffix_and_skips_blank() {
        let order = FieldOrder::from_texts(["<<client_name_EN>> <<__>> <<event_date>>"]);
        assert_eq!(order.names(), &["client_name", "event_date"]);
    }

    #[test]
    fn test_field_order_with_declared() {
        let order = FieldOrder::from_texts(["<<event_date>>"]).with_declared(&["client_name", "event_date"]);
        assert_eq!(order.names(), &["event_date", "client_name"]);
    }

    #[test]
    fn test_next_previous_wrap() {
        let order = FieldOrder::from_texts(["<<a>> <<b>> <<c>>"]);
        assert_eq!(order.next("a"), Some("b"));
        assert_eq!(order.next("c"), Some("a"));
        assert_eq!(order.previous("a"), Some("c"));
        assert_eq!(order.previous("b_FR"), Some("a"));
        assert_eq!(order.next("unknown"), Some("a"));
        assert_eq!(order.previous("unknown"), Some("c"));
        assert_eq!(FieldOrder::default().next("a"), None);
    }

    #[test]
    fn test_single_field_wraps_to_itself() {
        let order = FieldOrder::from_texts(["<<only>>"]);
        assert_eq!(order.next("only"), Some("only"));
        assert_eq!(order.previous("only"), Some("only"));
    }

    #[test]
    fn test_fill_placeholders() {
        let mut values = VariableMap::new();
        values.insert("client_name_EN".to_string(), "Amal".to_string());
        values.insert("event_date".to_string(), "  ".to_string());

        let filled = fill_placeholders("Hi <<client_name>>, on <<event_date>>", &values, Language::En);
        assert_eq!(filled, "Hi Amal, on <<event_date>>");
    }
}
