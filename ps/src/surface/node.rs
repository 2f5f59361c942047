//! Document model: text runs, line breaks, pills and blocks

use std::sync::LazyLock;

use html_escape::{encode_double_quoted_attribute, encode_text};
use regex::Regex;

use crate::template::placeholder;

static LINE_BREAKS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n]+").expect("valid line break regex"));

/// Identifier of a pill, unique within one surface
pub type PillId = usize;

/// Display state of a pill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PillState {
    /// Shows the placeholder token
    Empty,
    /// Shows the resolved value
    Filled,
}

impl PillState {
    pub fn class(self) -> &'static str {
        match self {
            PillState::Empty => "empty",
            PillState::Filled => "filled",
        }
    }
}

/// An editable unit bound to one placeholder token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pill {
    id: PillId,
    var_name: String,
    text: String,
    display: String,
    state: PillState,
    focused: bool,
    hovered: bool,
}

impl Pill {
    /// A pill showing `value`, or its placeholder when `value` is blank
    pub fn new(id: PillId, var_name: impl Into<String>, value: &str) -> Self {
        let mut pill = Self {
            id,
            var_name: var_name.into(),
            text: String::new(),
            display: String::new(),
            state: PillState::Empty,
            focused: false,
            hovered: false,
        };
        pill.show(value);
        pill
    }

    pub fn id(&self) -> PillId {
        self.id
    }

    pub fn var_name(&self) -> &str {
        &self.var_name
    }

    /// The token this pill stands for in extracted text
    pub fn stored(&self) -> String {
        placeholder(&self.var_name)
    }

    /// Current raw text content
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Value shown when filled, empty otherwise
    pub fn display(&self) -> &str {
        &self.display
    }

    pub fn state(&self) -> PillState {
        self.state
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    /// Replace the raw text as the user types
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub(crate) fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    pub(crate) fn set_hovered(&mut self, hovered: bool) {
        self.hovered = hovered;
    }

    /// Show `value` (text, display and state); blank shows the placeholder
    pub(crate) fn show(&mut self, value: &str) {
        if value.trim().is_empty() {
            self.text = self.stored();
            self.display.clear();
            self.state = PillState::Empty;
        } else {
            self.text = value.to_string();
            self.display = value.to_string();
            self.state = PillState::Filled;
        }
    }

    /// Mark as holding `value` without touching the text being typed
    pub(crate) fn mark(&mut self, value: &str) {
        if value.is_empty() {
            self.show(value);
        } else {
            self.display = value.to_string();
            self.state = PillState::Filled;
        }
    }

    /// Value the raw text stands for
    ///
    /// Untouched placeholder text and blank text mean "no value"; otherwise
    /// the trimmed text with line breaks collapsed to spaces.
    pub fn edited_value(&self) -> String {
        let normalized = self.text.replace('\u{a0}', " ");
        let normalized = LINE_BREAKS_RE.replace_all(&normalized, " ");
        let trimmed = normalized.trim();
        if trimmed.is_empty() || trimmed == self.stored() {
            String::new()
        } else {
            trimmed.to_string()
        }
    }

    fn html(&self, out: &mut String) {
        let mut class = format!("var-pill {}", self.state.class());
        if self.focused {
            class.push_str(" focused");
        }
        if self.hovered {
            class.push_str(" hovered");
        }
        out.push_str(&format!(
            r#"<span class="{}" data-var="{}" data-value="{}" data-display="{}" contenteditable="true" spellcheck="false">"#,
            class,
            encode_double_quoted_attribute(&self.var_name),
            encode_double_quoted_attribute(&self.stored()),
            encode_double_quoted_attribute(&self.display),
        ));
        text_html(&self.text, out);
        out.push_str("</span>");
    }
}

/// Node of the editing surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Plain text, kept verbatim
    Text(String),
    /// Explicit line break
    LineBreak,
    Pill(Pill),
    /// Block-level container (paragraph, div, list item ...)
    Block { tag: String, children: Vec<Node> },
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(text.into())
    }

    pub fn block(tag: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Block {
            tag: tag.into(),
            children,
        }
    }
}

/// Push `text` as text nodes, turning line breaks into [`Node::LineBreak`]
pub(crate) fn push_text(text: &str, nodes: &mut Vec<Node>) {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    for (i, line) in normalized.split('\n').enumerate() {
        if i > 0 {
            nodes.push(Node::LineBreak);
        }
        if !line.is_empty() {
            nodes.push(Node::Text(line.to_string()));
        }
    }
}

fn text_html(text: &str, out: &mut String) {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    for (i, line) in normalized.split('\n').enumerate() {
        if i > 0 {
            out.push_str(r#"<br data-line-break="true">"#);
        }
        out.push_str(&encode_text(line));
    }
}

/// Markup for `nodes`
pub(crate) fn nodes_html(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => text_html(text, out),
            Node::LineBreak => out.push_str(r#"<br data-line-break="true">"#),
            Node::Pill(pill) => pill.html(out),
            Node::Block { tag, children } => {
                let tag = if tag.chars().all(|c| c.is_ascii_alphanumeric()) && !tag.is_empty() {
                    tag.to_ascii_lowercase()
                } else {
                    "div".to_string()
                };
                out.push_str(&format!("<{tag}>"));
                nodes_html(children, out);
                out.push_str(&format!("</{tag}>"));
            }
        }
    }
}

fn extract_into(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::LineBreak => out.push('\n'),
            Node::Pill(pill) => out.push_str(&pill.stored()),
            Node::Block { children, .. } => {
                if !out.is_empty() && !out.ends_with('\n') {
                    out.push('\n');
                }
                extract_into(children, out);
                if !out.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
    }
}

/// Plain text of `nodes`, with pills contributing their stored token
///
/// Non-breaking spaces become spaces and a single trailing newline left by
/// the last block or line break is dropped.
pub(crate) fn extract_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    extract_into(nodes, &mut out);
    let mut normalized = out.replace('\u{a0}', " ");
    if normalized.ends_with('\n') && !normalized.ends_with("\n\n") {
        normalized.pop();
    }
    normalized
}

pub(crate) fn collect_pills<'a>(nodes: &'a [Node], out: &mut Vec<&'a Pill>) {
    for node in nodes {
        match node {
            Node::Pill(pill) => out.push(pill),
            Node::Block { children, .. } => collect_pills(children, out),
            Node::Text(_) | Node::LineBreak => {}
        }
    }
}

pub(crate) fn collect_pills_mut<'a>(nodes: &'a mut [Node], out: &mut Vec<&'a mut Pill>) {
    for node in nodes.iter_mut() {
        match node {
            Node::Pill(pill) => out.push(pill),
            Node::Block { children, .. } => collect_pills_mut(children, out),
            Node::Text(_) | Node::LineBreak => {}
        }
    }
}
