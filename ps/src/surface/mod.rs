//! Placeholder editing surface
//!
//! Template text is rendered as a small document where every `<<name>>`
//! token becomes a [`Pill`] showing either the resolved value or the token
//! itself. The host feeds user events in (typing, caret moves, clicks, key
//! presses) with explicit timestamps and gets back text and variable
//! updates. Extraction always yields token-shaped text: a pill contributes
//! its stored `<<name>>`, never its displayed value.

mod node;
mod selection;

use std::time::Instant;

use tracing::{debug, trace};
use varkit::{Language, VariableMap, normalize_var_key, resolve_variable_value};

use crate::template::{FieldOrder, Segment, tokenize};

pub use node::{Node, Pill, PillId, PillState};
pub use selection::{EditOutcome, EditorKey, KeyOutcome, Navigation, Selection, SelectionTiming};

use node::{collect_pills, collect_pills_mut, extract_text, nodes_html, push_text};

/// One editable template text (a subject or a body)
#[derive(Debug, Clone)]
pub struct Surface {
    nodes: Vec<Node>,
    language: Language,
    timing: SelectionTiming,
    selection: Selection,
    has_focus: bool,
    last_auto_select: Option<(PillId, Instant)>,
    suppressed_until: Option<Instant>,
    pending_click: Option<(PillId, Instant)>,
    focused_var: Option<String>,
    hovered_var: Option<String>,
    last_text: String,
}

impl Surface {
    /// Render `text` against `values`
    pub fn new(text: &str, values: &VariableMap, language: Language, timing: SelectionTiming) -> Self {
        let mut nodes = Vec::new();
        let mut next_id: PillId = 0;
        for segment in tokenize(text) {
            match segment {
                Segment::Text(run) => push_text(run, &mut nodes),
                Segment::Placeholder { name } => {
                    let value = resolve_variable_value(values, name, language);
                    nodes.push(Node::Pill(Pill::new(next_id, name, &value)));
                    next_id += 1;
                }
            }
        }
        debug!(pills = next_id, %language, "Surface::new: rendered");
        let last_text = extract_text(&nodes);
        Self {
            nodes,
            language,
            timing,
            selection: Selection::None,
            has_focus: false,
            last_auto_select: None,
            suppressed_until: None,
            pending_click: None,
            focused_var: None,
            hovered_var: None,
            last_text,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Raw document access for edits outside pills; call [`Surface::commit`] afterwards
    pub fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.nodes
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    /// Variable highlighted as focused, as last applied
    pub fn focused_variable(&self) -> Option<&str> {
        self.focused_var.as_deref()
    }

    /// Variable highlighted as hovered, as last applied
    pub fn hovered_variable(&self) -> Option<&str> {
        self.hovered_var.as_deref()
    }

    /// Pill holding the caret while the surface has focus
    pub fn active_pill(&self) -> Option<PillId> {
        if self.has_focus { self.selection.pill() } else { None }
    }

    /// Pills in document order
    pub fn pills(&self) -> Vec<&Pill> {
        let mut pills = Vec::new();
        collect_pills(&self.nodes, &mut pills);
        pills
    }

    pub fn pill(&self, id: PillId) -> Option<&Pill> {
        self.pills().into_iter().find(|p| p.id() == id)
    }

    fn pill_mut(&mut self, id: PillId) -> Option<&mut Pill> {
        let mut pills = Vec::new();
        collect_pills_mut(&mut self.nodes, &mut pills);
        pills.into_iter().find(|p| p.id() == id)
    }

    fn var_of(&self, id: PillId) -> Option<String> {
        self.pill(id).map(|p| p.var_name().to_string())
    }

    /// First pill bound to `name` (canonical match)
    pub fn find_pill(&self, name: &str) -> Option<PillId> {
        let key = normalize_var_key(name);
        if key.is_empty() {
            return None;
        }
        self.pills()
            .into_iter()
            .find(|p| normalize_var_key(p.var_name()) == key)
            .map(|p| p.id())
    }

    /// Markup for the whole surface
    pub fn html(&self) -> String {
        let mut out = String::new();
        nodes_html(&self.nodes, &mut out);
        out
    }

    /// Extracted text, placeholder tokens intact
    pub fn plain_text(&self) -> String {
        extract_text(&self.nodes)
    }

    /// The user typed into a pill: replace its text and commit
    pub fn input_pill(&mut self, id: PillId, text: &str, values: &VariableMap) -> EditOutcome {
        match self.pill_mut(id) {
            Some(pill) => pill.set_text(text),
            None => {
                debug!(id, "input_pill: unknown pill");
                return self.commit(values);
            }
        }
        self.has_focus = true;
        self.selection = Selection::Caret {
            pill: Some(id),
            offset: text.chars().count(),
        };
        self.last_auto_select = None;
        self.commit(values)
    }

    /// Reconcile pills with their text after a content change
    ///
    /// Blank or untouched pills clear their variable and show the
    /// placeholder again; others take their trimmed text. Pills sharing a
    /// canonical variable are made consistent: the pill holding the caret
    /// wins, else the first pill that changed, and every other pill in the
    /// group is redrawn with the winning value.
    pub fn commit(&mut self, values: &VariableMap) -> EditOutcome {
        let active = self.active_pill();
        let language = self.language;
        let mut pills = Vec::new();
        collect_pills_mut(&mut self.nodes, &mut pills);

        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for (index, pill) in pills.iter().enumerate() {
            let mut key = normalize_var_key(pill.var_name());
            if key.is_empty() {
                key = pill.var_name().to_string();
            }
            match groups.iter_mut().find(|(k, _)| *k == key) {
                Some((_, members)) => members.push(index),
                None => groups.push((key, vec![index])),
            }
        }

        let mut updates = VariableMap::new();
        for (_, members) in &groups {
            let edited: Vec<String> = members.iter().map(|&i| pills[i].edited_value()).collect();
            let current: Vec<String> = members
                .iter()
                .map(|&i| resolve_variable_value(values, pills[i].var_name(), language))
                .collect();

            let winner = members
                .iter()
                .position(|&i| Some(pills[i].id()) == active)
                .or_else(|| (0..members.len()).find(|&k| edited[k] != current[k]))
                .unwrap_or(0);
            let value = edited[winner].clone();
            let winner_index = members[winner];

            if value != current[winner] {
                updates.insert(pills[winner_index].var_name().to_string(), value.clone());
            }
            for &i in members {
                if i == winner_index && Some(pills[i].id()) == active {
                    pills[i].mark(&value);
                } else {
                    pills[i].show(&value);
                }
            }
        }
        drop(pills);

        let text = extract_text(&self.nodes);
        let text_changed = text != self.last_text;
        self.last_text = text.clone();
        if !updates.is_empty() {
            debug!(updates = updates.len(), "commit: variable updates");
        }
        EditOutcome {
            text,
            updates,
            text_changed,
        }
    }

    /// Redraw every pill from `values`, except the one being typed into
    pub fn sync_values(&mut self, values: &VariableMap) {
        let active = self.active_pill();
        let language = self.language;
        let mut pills = Vec::new();
        collect_pills_mut(&mut self.nodes, &mut pills);
        for pill in pills {
            if Some(pill.id()) == active {
                continue;
            }
            let value = resolve_variable_value(values, pill.var_name(), language);
            pill.show(&value);
        }
        self.last_text = extract_text(&self.nodes);
    }

    /// Highlight pills matching `name`; `None` clears the highlight
    pub fn apply_focused(&mut self, name: Option<&str>) {
        let target = name.map(normalize_var_key).filter(|k| !k.is_empty());
        self.focused_var = name.map(str::to_string);
        let mut pills = Vec::new();
        collect_pills_mut(&mut self.nodes, &mut pills);
        for pill in pills {
            let matches = target.as_deref().is_some_and(|k| normalize_var_key(pill.var_name()) == k);
            pill.set_focused(matches);
        }
    }

    /// Hover-highlight pills matching `name`; `None` clears the highlight
    pub fn apply_hovered(&mut self, name: Option<&str>) {
        let target = name.map(normalize_var_key).filter(|k| !k.is_empty());
        self.hovered_var = name.map(str::to_string);
        let mut pills = Vec::new();
        collect_pills_mut(&mut self.nodes, &mut pills);
        for pill in pills {
            let matches = target.as_deref().is_some_and(|k| normalize_var_key(pill.var_name()) == k);
            pill.set_hovered(matches);
        }
    }

    fn select_whole_pill(&mut self, id: PillId) -> bool {
        let Some(len) = self.pill(id).map(|p| p.text().chars().count()) else {
            return false;
        };
        self.selection = Selection::Range {
            pill: Some(id),
            start: 0,
            end: len,
        };
        true
    }

    /// Select an empty pill entirely unless a guard applies
    fn maybe_auto_select(&mut self, id: PillId, now: Instant) -> bool {
        let Some(state) = self.pill(id).map(|p| p.state()) else {
            return false;
        };
        if state != PillState::Empty {
            return false;
        }
        if self.suppressed_until.is_some_and(|until| now < until) {
            trace!(id, "maybe_auto_select: suppressed");
            return false;
        }
        if let Some((last, at)) = self.last_auto_select
            && last == id
            && now.duration_since(at) < self.timing.auto_select_guard
        {
            trace!(id, "maybe_auto_select: guarded");
            return false;
        }
        self.last_auto_select = Some((id, now));
        self.select_whole_pill(id)
    }

    /// Caret moved; returns whether the pill was auto-selected
    pub fn place_caret(&mut self, pill: Option<PillId>, offset: usize, now: Instant) -> bool {
        self.has_focus = true;
        self.selection = Selection::Caret { pill, offset };
        match pill.and_then(|id| self.var_of(id).map(|var| (id, var))) {
            Some((id, var)) => {
                self.apply_focused(Some(&var));
                self.maybe_auto_select(id, now)
            }
            None => {
                self.last_auto_select = None;
                false
            }
        }
    }

    /// Selection changed to a range; a collapsed range is a caret
    ///
    /// A non-empty range is kept as the user made it and never triggers
    /// auto-select.
    pub fn select_range(&mut self, pill: Option<PillId>, start: usize, end: usize, now: Instant) -> bool {
        if start == end {
            return self.place_caret(pill, start, now);
        }
        self.has_focus = true;
        self.selection = Selection::Range {
            pill,
            start: start.min(end),
            end: start.max(end),
        };
        if let Some(var) = pill.and_then(|id| self.var_of(id)) {
            self.apply_focused(Some(&var));
        }
        false
    }

    /// Move focus to a pill and select all of its text
    pub fn focus_pill(&mut self, id: PillId, now: Instant) -> bool {
        let Some(var) = self.var_of(id) else {
            return false;
        };
        self.has_focus = true;
        self.pending_click = None;
        self.last_auto_select = Some((id, now));
        self.apply_focused(Some(&var));
        self.select_whole_pill(id)
    }

    /// Mouse button pressed on a pill
    ///
    /// A single click schedules a whole-pill selection; a second click
    /// cancels it and suppresses auto-select so the caret can be placed.
    pub fn mouse_down(&mut self, pill: Option<PillId>, click_count: u32, now: Instant) {
        let Some(id) = pill.filter(|id| self.pill(*id).is_some()) else {
            return;
        };
        if click_count == 1 {
            self.pending_click = Some((id, now + self.timing.click_select_delay));
        } else if click_count >= 2 {
            self.pending_click = None;
            self.suppressed_until = Some(now + self.timing.auto_select_suppress);
        }
    }

    /// Double click inside a pill: caret at `offset`, auto-select suppressed
    pub fn double_click(&mut self, pill: Option<PillId>, offset: usize, now: Instant) {
        let Some((id, len)) = pill.and_then(|id| self.pill(id).map(|p| (id, p.text().chars().count()))) else {
            return;
        };
        self.pending_click = None;
        self.suppressed_until = Some(now + self.timing.auto_select_suppress);
        self.has_focus = true;
        self.selection = Selection::Caret {
            pill: Some(id),
            offset: offset.min(len),
        };
    }

    /// Fire due timers; returns whether the selection changed
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.pending_click {
            Some((id, due)) if now >= due => {
                self.pending_click = None;
                let Some(var) = self.var_of(id) else {
                    return false;
                };
                self.has_focus = true;
                self.apply_focused(Some(&var));
                self.select_whole_pill(id)
            }
            _ => false,
        }
    }

    /// Whether a click selection is still waiting
    pub fn has_pending_click(&self) -> bool {
        self.pending_click.is_some()
    }

    /// Focus left the surface: commit and clear the focus highlight
    pub fn blur(&mut self, values: &VariableMap) -> EditOutcome {
        let outcome = self.commit(values);
        self.has_focus = false;
        self.selection = Selection::None;
        self.last_auto_select = None;
        self.pending_click = None;
        self.apply_focused(None);
        outcome
    }

    /// Key pressed with the caret somewhere in the surface
    ///
    /// Inside a pill, Enter never inserts a line break; Tab and plain Enter
    /// move to the next field, Shift+Tab to the previous one.
    pub fn key_down(&mut self, key: EditorKey, shift: bool, fields: &FieldOrder, now: Instant) -> KeyOutcome {
        let Some(var) = self.selection.pill().and_then(|id| self.var_of(id)) else {
            return KeyOutcome::default();
        };
        let target = match (key, shift) {
            (EditorKey::Tab, false) | (EditorKey::Enter, false) => fields.next(&var),
            (EditorKey::Tab, true) => fields.previous(&var),
            (EditorKey::Enter, true) => {
                return KeyOutcome {
                    prevent_default: true,
                    navigate: None,
                };
            }
            (EditorKey::Other, _) => return KeyOutcome::default(),
        };
        let Some(target) = target.map(str::to_string) else {
            return KeyOutcome {
                prevent_default: true,
                navigate: None,
            };
        };

        let navigate = match self.find_pill(&target) {
            Some(id) => {
                self.focus_pill(id, now);
                Navigation::Pill(id)
            }
            None => Navigation::External(target),
        };
        debug!(from = %var, to = ?navigate, "key_down: navigate");
        KeyOutcome {
            prevent_default: true,
            navigate: Some(navigate),
        }
    }
}
