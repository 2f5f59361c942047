//! Placeholder tokenizer

use std::sync::LazyLock;

use regex::Regex;

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<<([^>]+)>>").expect("valid placeholder regex"));

/// A run of template text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Plain text, verbatim
    Text(&'a str),
    /// A `<<name>>` token
    Placeholder { name: &'a str },
}

/// The stored token for `name`
pub fn placeholder(name: &str) -> String {
    format!("<<{name}>>")
}

/// Split `text` into plain runs and placeholder tokens
pub fn tokenize(text: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::Text(&text[last..whole.start()]));
        }
        segments.push(Segment::Placeholder { name: name.as_str() });
        last = whole.end();
    }
    if last < text.len() {
        segments.push(Segment::Text(&text[last..]));
    }
    segments
}

/// Variable names in order of appearance, duplicates included
pub fn placeholder_names(text: &str) -> impl Iterator<Item = &str> {
    PLACEHOLDER_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_mixed() {
        let segments = tokenize("Hi <<client_name>>, see you <<event_date>>!");
        assert_eq!(
            segments,
            vec![
                Segment::Text("Hi "),
                Segment::Placeholder { name: "client_name" },
                Segment::Text(", see you "),
                Segment::Placeholder { name: "event_date" },
                Segment::Text("!"),
            ]
        );
    }

    #[test]
    fn test_tokenize_adjacent_and_edges() {
        assert_eq!(
            tokenize("<<a>><<b>>"),
            vec![Segment::Placeholder { name: "a" }, Segment::Placeholder { name: "b" }]
        );
        assert!(tokenize("").is_empty());
        assert_eq!(tokenize("no tokens"), vec![Segment::Text("no tokens")]);
    }

    #[test]
    fn test_tokenize_malformed_tokens_are_text() {
        assert_eq!(tokenize("<<>> and <<open"), vec![Segment::Text("<<>> and <<open")]);
        assert_eq!(
            tokenize("a > b <<x>>"),
            vec![Segment::Text("a > b "), Segment::Placeholder { name: "x" }]
        );
    }

    #[test]
    fn test_placeholder_names() {
        let names: Vec<&str> = placeholder_names("<<a>> <<b>> <<a>>").collect();
        assert_eq!(names, vec!["a", "b", "a"]);
        assert_eq!(placeholder("client_name"), "<<client_name>>");
    }
}
