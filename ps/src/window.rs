//! Editor windows: session state, surfaces and sync wired together
//!
//! The main window edits subject and body surfaces; a popout shows one
//! card per field. Both hold their own copy of the variable map and
//! reconcile by replacing it wholesale with snapshots from peers.

use std::mem;
use std::time::Instant;

use chrono::Local;
use tracing::{debug, info, warn};
use varkit::{
    Language, Template, VariableFormat, VariableLibrary, VariableMap, apply_assignments, assign_existing_twins,
    expand_assignment, language_suffix, normalize_var_key, resolve_variable_value,
};

use crate::config::Config;
use crate::surface::{EditOutcome, EditorKey, KeyOutcome, Navigation, PillId, Surface};
use crate::sync::{
    Origin, PinAction, PinController, PinTrigger, SyncClient, SyncHandler, SyncPayload, WindowFocusState, dispatch,
};
use crate::template::{FieldOrder, fill_placeholders};

/// Which kind of window this is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowRole {
    Main,
    Popout,
}

/// The two editable texts of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Subject,
    Body,
}

impl SurfaceKind {
    fn other(self) -> SurfaceKind {
        match self {
            SurfaceKind::Subject => SurfaceKind::Body,
            SurfaceKind::Body => SurfaceKind::Subject,
        }
    }
}

/// Per-window session state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditorSession {
    pub focused_variable: Option<String>,
    pub hovered_variable: Option<String>,
    pub pinned: bool,
    pub sender_id: String,
}

/// Side effects the host performs after an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEffect {
    /// Bring the variable's pill or card into view
    ScrollIntoView { var_name: String },
    /// Pinned popout asks to regain focus
    Refocus,
}

/// One field in the popout list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableCard {
    pub name: String,
    pub label: String,
    pub value: String,
    pub placeholder: String,
    pub format: VariableFormat,
    pub focused: bool,
    pub hovered: bool,
    pub filled: bool,
}

/// Everything except the client, so handlers can borrow it on their own
struct WindowState {
    role: WindowRole,
    template: Template,
    library: VariableLibrary,
    language: Language,
    variables: VariableMap,
    subject: Surface,
    body: Surface,
    fields: FieldOrder,
    session: EditorSession,
    pin: Option<PinController>,
    last_scrolled: Option<String>,
    effects: Vec<WindowEffect>,
}

impl WindowState {
    fn surface(&self, kind: SurfaceKind) -> &Surface {
        match kind {
            SurfaceKind::Subject => &self.subject,
            SurfaceKind::Body => &self.body,
        }
    }

    fn surface_mut(&mut self, kind: SurfaceKind) -> &mut Surface {
        match kind {
            SurfaceKind::Subject => &mut self.subject,
            SurfaceKind::Body => &mut self.body,
        }
    }

    fn replace_variables(&mut self, snapshot: &VariableMap) {
        if self.variables == *snapshot {
            debug!("replace_variables: snapshot unchanged");
            return;
        }
        debug!(count = snapshot.len(), "replace_variables: applying snapshot");
        self.variables = snapshot.clone();
        self.subject.sync_values(&self.variables);
        self.body.sync_values(&self.variables);
    }

    fn highlight_focus(&mut self, name: Option<&str>) {
        self.session.focused_variable = name.map(str::to_string);
        self.subject.apply_focused(name);
        self.body.apply_focused(name);
    }

    fn highlight_hover(&mut self, name: Option<&str>) {
        self.session.hovered_variable = name.map(str::to_string);
        self.subject.apply_hovered(name);
        self.body.apply_hovered(name);
    }
}

impl SyncHandler for WindowState {
    fn on_focused_var(&mut self, var_name: Option<&str>, normalized_var: Option<&str>) {
        let normalized = normalized_var
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| var_name.map(normalize_var_key).unwrap_or_default());
        if normalized.is_empty() {
            self.highlight_focus(None);
            self.last_scrolled = None;
            return;
        }

        self.highlight_focus(Some(var_name.unwrap_or(&normalized)));
        if self.last_scrolled.as_deref() != Some(normalized.as_str()) {
            self.effects.push(WindowEffect::ScrollIntoView {
                var_name: var_name.unwrap_or(&normalized).to_string(),
            });
            self.last_scrolled = Some(normalized);
        }
    }

    fn on_variable_hovered(&mut self, var_name: Option<&str>) {
        self.highlight_hover(var_name);
    }

    fn on_variable_changed(&mut self, _var_name: &str, _value: &str, all_variables: &VariableMap) {
        self.replace_variables(all_variables);
    }

    fn on_variable_removed(&mut self, _var_name: &str, all_variables: &VariableMap) {
        self.replace_variables(all_variables);
    }

    fn on_variable_reinitialized(&mut self, var_name: &str, value: &str, all_variables: Option<&VariableMap>) {
        match all_variables {
            Some(snapshot) => self.replace_variables(snapshot),
            None => {
                let assignments = expand_assignment(var_name, value, Some(self.language));
                if let Some(snapshot) = apply_assignments(&self.variables, &assignments) {
                    self.replace_variables(&snapshot);
                }
            }
        }
    }

    fn on_variables_updated(&mut self, variables: &VariableMap) {
        self.replace_variables(variables);
    }
}

/// One open editor window
pub struct EditorWindow {
    client: SyncClient,
    state: WindowState,
    closed: bool,
}

impl EditorWindow {
    /// Open a window on `template`
    ///
    /// The main window starts from `values`; a popout starts empty and
    /// waits for the main window to push a snapshot. The last focus event
    /// persisted by another window is applied, and a popout without one
    /// focuses its first empty field.
    pub fn open(
        role: WindowRole,
        origin: &Origin,
        template: &Template,
        library: &VariableLibrary,
        values: VariableMap,
        config: &Config,
    ) -> Self {
        let client = SyncClient::connect(origin, Some(&template.id), config.sync.options());
        let language = config.language;
        let variables = match role {
            WindowRole::Main => values,
            WindowRole::Popout => VariableMap::new(),
        };
        let timing = config.editor.timing();
        let subject_text = template.subject(language);
        let body_text = template.body(language);
        let fields = FieldOrder::from_texts([subject_text, body_text]).with_declared(&template.variables);

        let pinned = role == WindowRole::Popout && client.load_pinned();
        let mut pin = (role == WindowRole::Popout).then(|| PinController::new(config.pin.timing(), pinned));
        let mut effects = Vec::new();
        if let Some(pin) = pin.as_mut()
            && pin.refocus_now(Instant::now()).is_some()
        {
            effects.push(WindowEffect::Refocus);
        }

        info!(?role, template = %template.id, %language, fields = fields.len(), "EditorWindow::open");
        let mut window = Self {
            state: WindowState {
                role,
                template: template.clone(),
                library: library.clone(),
                language,
                subject: Surface::new(subject_text, &variables, language, timing),
                body: Surface::new(body_text, &variables, language, timing),
                variables,
                fields,
                session: EditorSession {
                    pinned,
                    sender_id: client.sender_id().to_string(),
                    ..EditorSession::default()
                },
                pin,
                last_scrolled: None,
                effects,
            },
            client,
            closed: false,
        };

        let fallback = window
            .client
            .last_focus()
            .filter(|snapshot| snapshot.sender != window.client.sender_id());
        match fallback {
            Some(snapshot) => {
                debug!(focused = ?snapshot.focused_var, "EditorWindow::open: applying persisted focus");
                window
                    .state
                    .on_focused_var(snapshot.focused_var.as_deref(), snapshot.normalized_var.as_deref());
            }
            None if role == WindowRole::Popout => {
                let first = window
                    .state
                    .fields
                    .names()
                    .iter()
                    .find(|name| window.value_of(name).trim().is_empty())
                    .or_else(|| window.state.fields.names().first())
                    .cloned();
                if let Some(name) = first {
                    window.focus_variable(Some(&name));
                }
            }
            None => {}
        }
        window
    }

    pub fn role(&self) -> WindowRole {
        self.state.role
    }

    pub fn template(&self) -> &Template {
        &self.state.template
    }

    pub fn language(&self) -> Language {
        self.state.language
    }

    pub fn session(&self) -> &EditorSession {
        &self.state.session
    }

    pub fn variables(&self) -> &VariableMap {
        &self.state.variables
    }

    pub fn fields(&self) -> &FieldOrder {
        &self.state.fields
    }

    pub fn surface(&self, kind: SurfaceKind) -> &Surface {
        self.state.surface(kind)
    }

    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Resolved value of `name` in this window's map
    pub fn value_of(&self, name: &str) -> String {
        resolve_variable_value(&self.state.variables, name, self.state.language)
    }

    fn send(&mut self, payload: SyncPayload) -> bool {
        if self.closed {
            debug!(kind = payload.kind(), "EditorWindow::send: window closed");
            return false;
        }
        self.client.send(payload)
    }

    /// Apply assignments for an edit of `var_name`; the new snapshot if anything changed
    fn assign(&mut self, var_name: &str, value: &str) -> Option<VariableMap> {
        let assignments = expand_assignment(var_name, value, Some(self.state.language));
        let snapshot = apply_assignments(&self.state.variables, &assignments)?;
        self.state.replace_variables(&snapshot);
        Some(snapshot)
    }

    /// Set a variable from a field edit and broadcast the snapshot
    pub fn update_variable(&mut self, var_name: &str, value: &str) -> bool {
        let Some(snapshot) = self.assign(var_name, value) else {
            return false;
        };
        self.send(SyncPayload::VariableChanged {
            var_name: var_name.to_string(),
            value: value.to_string(),
            all_variables: snapshot,
        });
        true
    }

    /// Clear a variable everywhere it is stored
    pub fn remove_variable(&mut self, var_name: &str) -> bool {
        let Some(snapshot) = self.assign(var_name, "") else {
            return false;
        };
        self.send(SyncPayload::VariableRemoved {
            var_name: var_name.to_string(),
            all_variables: snapshot,
        });
        true
    }

    /// Reset a variable to its library sample for the active language
    pub fn reinitialize_variable(&mut self, var_name: &str) -> bool {
        let language = self.state.language;
        let target = match language_suffix(var_name) {
            Some(_) => var_name.to_string(),
            None => format!("{var_name}_{}", language.suffix()),
        };
        let value = self
            .state
            .library
            .sample_value(&target, language, Local::now().date_naive());
        debug!(%var_name, %target, %value, "reinitialize_variable");
        let Some(snapshot) = self.assign(var_name, &value) else {
            return false;
        };
        self.send(SyncPayload::VariableReinitialized {
            var_name: var_name.to_string(),
            value,
            all_variables: Some(snapshot),
        });
        true
    }

    /// Store and broadcast variable updates produced by a surface commit
    ///
    /// Each update also overwrites the keys already naming the same
    /// variable, so `client_name` and `client_name_FR` pills stay equal.
    fn apply_outcome(&mut self, kind: SurfaceKind, outcome: &EditOutcome) {
        let mut snapshot: Option<VariableMap> = None;
        for (name, value) in &outcome.updates {
            let prev = snapshot.as_ref().unwrap_or(&self.state.variables);
            let assignments = assign_existing_twins(prev, name, value);
            if let Some(next) = apply_assignments(prev, &assignments) {
                snapshot = Some(next);
            }
        }
        let Some(variables) = snapshot else {
            return;
        };
        debug!(?kind, count = outcome.updates.len(), "apply_outcome");
        self.state.replace_variables(&variables);
        for (name, value) in &outcome.updates {
            self.send(SyncPayload::VariableChanged {
                var_name: name.clone(),
                value: value.clone(),
                all_variables: variables.clone(),
            });
        }
    }

    /// The user typed into a pill
    pub fn input_pill(&mut self, kind: SurfaceKind, id: PillId, text: &str) -> EditOutcome {
        self.leave_other_surface(kind);
        let variables = self.state.variables.clone();
        let outcome = self.state.surface_mut(kind).input_pill(id, text, &variables);
        self.apply_outcome(kind, &outcome);
        outcome
    }

    /// Caret moved on a surface; focus follows the pill under it
    pub fn place_caret(&mut self, kind: SurfaceKind, pill: Option<PillId>, offset: usize, now: Instant) -> bool {
        self.leave_other_surface(kind);
        let selected = self.state.surface_mut(kind).place_caret(pill, offset, now);
        if let Some(name) = pill.and_then(|id| self.surface(kind).pill(id)).map(|p| p.var_name().to_string()) {
            self.focus_variable(Some(&name));
        }
        selected
    }

    /// Focus left a surface: commit and clear the focus
    pub fn blur(&mut self, kind: SurfaceKind) -> EditOutcome {
        let variables = self.state.variables.clone();
        let outcome = self.state.surface_mut(kind).blur(&variables);
        self.apply_outcome(kind, &outcome);
        self.focus_variable(None);
        outcome
    }

    /// Key press on a surface, following navigation across surfaces
    pub fn key_down(&mut self, kind: SurfaceKind, key: EditorKey, shift: bool, now: Instant) -> KeyOutcome {
        self.leave_other_surface(kind);
        let fields = self.state.fields.clone();
        let outcome = self.state.surface_mut(kind).key_down(key, shift, &fields, now);
        let target = match &outcome.navigate {
            Some(Navigation::Pill(id)) => self.surface(kind).pill(*id).map(|p| p.var_name().to_string()),
            Some(Navigation::External(name)) => {
                let other = kind.other();
                match self.surface(other).find_pill(name) {
                    Some(id) => {
                        let outcome = self.blur_quietly(kind);
                        self.apply_outcome(kind, &outcome);
                        self.state.surface_mut(other).focus_pill(id, now);
                        self.surface(other).pill(id).map(|p| p.var_name().to_string())
                    }
                    None => Some(name.clone()),
                }
            }
            None => None,
        };
        if let Some(name) = target {
            self.focus_variable(Some(&name));
        }
        outcome
    }

    fn blur_quietly(&mut self, kind: SurfaceKind) -> EditOutcome {
        let variables = self.state.variables.clone();
        self.state.surface_mut(kind).blur(&variables)
    }

    /// Focus moved to `kind`: commit and release the other surface
    fn leave_other_surface(&mut self, kind: SurfaceKind) {
        let other = kind.other();
        if !self.surface(other).has_focus() {
            return;
        }
        debug!(?other, "leave_other_surface");
        let outcome = self.blur_quietly(other);
        self.apply_outcome(other, &outcome);
    }

    /// Focus a variable locally, tell peers and persist it for late joiners
    pub fn focus_variable(&mut self, var_name: Option<&str>) -> bool {
        let normalized = var_name.map(normalize_var_key).filter(|k| !k.is_empty());
        let unchanged = self.state.session.focused_variable.as_deref() == var_name
            && self.state.last_scrolled == normalized;
        self.state.highlight_focus(var_name);
        if unchanged {
            return false;
        }
        self.state.last_scrolled = normalized.clone();
        self.send(SyncPayload::FocusedVar {
            var_name: var_name.map(str::to_string),
            normalized_var: normalized,
        });
        if !self.closed {
            self.client.persist_focus(var_name);
        }
        true
    }

    /// Pointer entered (`Some`) or left (`None`) a variable
    pub fn hover_variable(&mut self, var_name: Option<&str>) -> bool {
        if self.state.session.hovered_variable.as_deref() == var_name {
            return false;
        }
        self.state.highlight_hover(var_name);
        self.send(SyncPayload::VariableHovered {
            var_name: var_name.map(str::to_string),
        })
    }

    /// Push the full map to peers, as the main window does when a popout attaches
    pub fn push_snapshot(&mut self, complete: bool) -> bool {
        let variables = self.state.variables.clone();
        let payload = if complete {
            SyncPayload::SyncComplete { variables }
        } else {
            SyncPayload::VariablesUpdated { variables }
        };
        self.send(payload)
    }

    /// Apply every message delivered so far; returns how many were applied
    pub fn pump(&mut self) -> usize {
        if self.closed {
            return 0;
        }
        let messages = self.client.poll();
        for message in &messages {
            dispatch(&mut self.state, message);
        }
        messages.len()
    }

    /// Pin or unpin a popout; the flag is persisted
    pub fn set_pinned(&mut self, pinned: bool, now: Instant) -> bool {
        let Some(pin) = self.state.pin.as_mut() else {
            warn!("EditorWindow::set_pinned: only popouts can be pinned");
            return false;
        };
        let action = pin.set_pinned(pinned, now);
        self.state.session.pinned = pinned;
        if action == Some(PinAction::Refocus) {
            self.state.effects.push(WindowEffect::Refocus);
        }
        if !self.closed {
            self.client.persist_pinned(pinned);
        }
        true
    }

    /// A focus-loss signal from the host
    pub fn pin_trigger(&mut self, reason: PinTrigger, now: Instant) {
        if let Some(pin) = self.state.pin.as_mut() {
            pin.trigger(reason, now);
        }
    }

    /// Advance pin timers with the window's current focus state
    pub fn pin_tick(&mut self, now: Instant, focus: WindowFocusState) {
        let action = self.state.pin.as_mut().and_then(|pin| pin.tick(now, focus));
        if action == Some(PinAction::Refocus) {
            self.state.effects.push(WindowEffect::Refocus);
        }
    }

    /// Field list shown by the popout, in field order
    pub fn cards(&self) -> Vec<VariableCard> {
        let state = &self.state;
        let focused = state.session.focused_variable.as_deref().map(normalize_var_key);
        let hovered = state.session.hovered_variable.as_deref().map(normalize_var_key);
        state
            .fields
            .names()
            .iter()
            .map(|name| {
                let key = normalize_var_key(name);
                let value = self.value_of(name);
                VariableCard {
                    name: name.clone(),
                    label: state.library.description_for(name, state.language),
                    placeholder: state.library.placeholder_example(name, state.language).unwrap_or_default(),
                    format: state.library.format_for(name),
                    focused: focused.as_deref() == Some(key.as_str()),
                    hovered: hovered.as_deref() == Some(key.as_str()),
                    filled: !value.trim().is_empty(),
                    value,
                }
            })
            .collect()
    }

    /// Extracted text of a surface, placeholder tokens intact
    pub fn plain_text(&self, kind: SurfaceKind) -> String {
        self.surface(kind).plain_text()
    }

    /// Text of a surface with live values substituted
    pub fn filled_text(&self, kind: SurfaceKind) -> String {
        fill_placeholders(&self.plain_text(kind), &self.state.variables, self.state.language)
    }

    /// Effects queued since the last call
    pub fn take_effects(&mut self) -> Vec<WindowEffect> {
        mem::take(&mut self.state.effects)
    }

    /// Tear down the subscription and pin timers
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        info!(sender_id = %self.client.sender_id(), "EditorWindow::close");
        self.client.close();
        self.state.pin = None;
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use varkit::TemplateCatalog;

    fn catalog() -> TemplateCatalog {
        TemplateCatalog::from_json(
            r#"{
                "templates": [{
                    "id": "confirm",
                    "subject": {"fr": "Rendez-vous <<event_date>>", "en": "Appointment <<event_date>>"},
                    "body": {"fr": "<<event_date>>: <<client_name>>", "en": "<<event_date>>: <<client_name>>"},
                    "variables": ["event_date", "client_name", "case_number"]
                }, {
                    "id": "reply",
                    "subject": {"fr": "Re <<client_name>>", "en": "Re <<client_name>>"},
                    "body": {"fr": "Bonjour <<client_name_FR>>", "en": "Hello <<client_name_EN>>"},
                    "variables": ["client_name"]
                }],
                "variables": {
                    "client_name": {
                        "description": {"fr": "Nom du client", "en": "Client name"},
                        "example": {"fr": "Amélie", "en": "Amal"}
                    },
                    "event_date": {
                        "description": {"fr": "Date", "en": "Date"},
                        "example": {"fr": "2024-06-10", "en": "2024-06-10"},
                        "format": "date"
                    }
                }
            }"#,
        )
        .unwrap()
    }

    fn open(role: WindowRole, origin: &Origin, values: VariableMap) -> EditorWindow {
        open_template(role, origin, "confirm", values)
    }

    fn open_template(role: WindowRole, origin: &Origin, id: &str, values: VariableMap) -> EditorWindow {
        let catalog = catalog();
        let template = catalog.get(id).unwrap();
        EditorWindow::open(role, origin, template, &catalog.variables, values, &Config::default())
    }

    fn pill_display(window: &EditorWindow, kind: SurfaceKind, name: &str) -> String {
        let surface = window.surface(kind);
        let id = surface.find_pill(name).unwrap();
        surface.pill(id).unwrap().display().to_string()
    }

    fn vars(pairs: &[(&str, &str)]) -> VariableMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_open_main_renders_values() {
        let origin = Origin::in_memory("t");
        let window = open(WindowRole::Main, &origin, vars(&[("client_name", "Amal")]));

        assert_eq!(window.fields().names(), &["event_date", "client_name", "case_number"]);
        assert_eq!(window.plain_text(SurfaceKind::Body), "<<event_date>>: <<client_name>>");
        assert_eq!(window.filled_text(SurfaceKind::Body), "<<event_date>>: Amal");
        assert_eq!(window.session().focused_variable, None);
        assert!(!window.session().pinned);
        assert_eq!(window.session().sender_id, window.client().sender_id());
    }

    #[test]
    fn test_popout_starts_empty_and_focuses_first_empty_field() {
        let origin = Origin::in_memory("t");
        let popout = open(WindowRole::Popout, &origin, vars(&[("client_name", "Amal")]));

        assert!(popout.variables().is_empty());
        assert_eq!(popout.session().focused_variable.as_deref(), Some("event_date"));
        assert!(popout.cards().iter().all(|card| !card.filled));
    }

    #[test]
    fn test_update_variable_expands_and_broadcasts() {
        let origin = Origin::in_memory("t");
        let mut main = open(WindowRole::Main, &origin, VariableMap::new());
        let mut peer = SyncClient::connect(&origin, Some("confirm"), Default::default());

        assert!(main.update_variable("client_name", "Amal"));
        assert_eq!(main.variables(), &vars(&[("client_name", "Amal"), ("client_name_FR", "Amal")]));
        assert_eq!(main.filled_text(SurfaceKind::Body), "<<event_date>>: Amal");
        assert!(!main.update_variable("client_name", "Amal"));

        let received = peer.poll();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].payload.kind(), "variableChanged");
        assert_eq!(received[0].payload.snapshot(), Some(main.variables()));
    }

    #[test]
    fn test_remove_variable_sends_single_message() {
        let origin = Origin::in_memory("t");
        let mut main = open(WindowRole::Main, &origin, vars(&[("client_name", "Amal"), ("client_name_FR", "Amal")]));
        let mut peer = SyncClient::connect(&origin, Some("confirm"), Default::default());

        assert!(main.remove_variable("client_name"));
        assert_eq!(main.value_of("client_name"), "");
        assert!(!main.remove_variable("client_name"));

        let kinds: Vec<&str> = peer.poll().iter().map(|m| m.payload.kind()).collect();
        assert_eq!(kinds, vec!["variableRemoved"]);
    }

    #[test]
    fn test_reinitialize_uses_language_sample() {
        let origin = Origin::in_memory("t");
        let mut main = open(WindowRole::Main, &origin, VariableMap::new());

        assert!(main.reinitialize_variable("client_name"));
        assert_eq!(main.value_of("client_name"), "Amélie");
        assert_eq!(main.variables().get("client_name_FR").map(String::as_str), Some("Amélie"));

        assert!(main.reinitialize_variable("client_name_EN"));
        assert_eq!(main.variables().get("client_name_EN").map(String::as_str), Some("Amal"));
    }

    #[test]
    fn test_reinitialize_without_library_entry_uses_format_default() {
        let origin = Origin::in_memory("t");
        let mut main = open(WindowRole::Main, &origin, VariableMap::new());
        assert!(main.reinitialize_variable("case_number"));
        assert_eq!(main.value_of("case_number"), "0");
    }

    #[test]
    fn test_input_pill_updates_map_and_other_surface() {
        let origin = Origin::in_memory("t");
        let mut main = open(WindowRole::Main, &origin, VariableMap::new());
        let now = Instant::now();
        let id = main.surface(SurfaceKind::Body).find_pill("event_date").unwrap();

        main.place_caret(SurfaceKind::Body, Some(id), 0, now);
        let outcome = main.input_pill(SurfaceKind::Body, id, "June 10");
        assert_eq!(outcome.updates, vars(&[("event_date", "June 10")]));
        assert_eq!(main.variables(), &vars(&[("event_date", "June 10")]));
        assert_eq!(main.filled_text(SurfaceKind::Subject), "Rendez-vous June 10");
        assert_eq!(main.plain_text(SurfaceKind::Subject), "Rendez-vous <<event_date>>");
    }

    #[test]
    fn test_input_pill_overwrites_suffixed_twin() {
        let origin = Origin::in_memory("t");
        let mut main = open_template(WindowRole::Main, &origin, "reply", vars(&[("client_name_FR", "Old")]));
        let mut peer = SyncClient::connect(&origin, Some("reply"), Default::default());
        assert_eq!(pill_display(&main, SurfaceKind::Subject, "client_name"), "Old");
        assert_eq!(pill_display(&main, SurfaceKind::Body, "client_name_FR"), "Old");

        let id = main.surface(SurfaceKind::Subject).find_pill("client_name").unwrap();
        let outcome = main.input_pill(SurfaceKind::Subject, id, "New");
        assert_eq!(outcome.updates, vars(&[("client_name", "New")]));
        assert_eq!(main.variables(), &vars(&[("client_name", "New"), ("client_name_FR", "New")]));
        assert_eq!(pill_display(&main, SurfaceKind::Subject, "client_name"), "New");
        assert_eq!(pill_display(&main, SurfaceKind::Body, "client_name_FR"), "New");
        assert_eq!(main.filled_text(SurfaceKind::Body), "Bonjour New");

        let received = peer.poll();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].payload.snapshot(), Some(main.variables()));
    }

    #[test]
    fn test_caret_moving_to_other_surface_releases_stale_pill() {
        let origin = Origin::in_memory("t");
        let mut main = open(WindowRole::Main, &origin, VariableMap::new());
        let now = Instant::now();
        let subject = main.surface(SurfaceKind::Subject).find_pill("event_date").unwrap();
        let body = main.surface(SurfaceKind::Body).find_pill("event_date").unwrap();

        main.place_caret(SurfaceKind::Subject, Some(subject), 0, now);
        main.input_pill(SurfaceKind::Subject, subject, "June 10");

        main.place_caret(SurfaceKind::Body, Some(body), 0, now);
        assert!(!main.surface(SurfaceKind::Subject).has_focus());
        assert_eq!(main.surface(SurfaceKind::Subject).active_pill(), None);

        main.input_pill(SurfaceKind::Body, body, "June 11");
        assert_eq!(main.variables(), &vars(&[("event_date", "June 11")]));
        assert_eq!(pill_display(&main, SurfaceKind::Subject, "event_date"), "June 11");
        assert_eq!(main.surface(SurfaceKind::Subject).pill(subject).unwrap().text(), "June 11");

        let outcome = main.blur(SurfaceKind::Subject);
        assert!(outcome.updates.is_empty());
        assert_eq!(main.variables(), &vars(&[("event_date", "June 11")]));
    }

    #[test]
    fn test_typing_on_other_surface_commits_previous_edit() {
        let origin = Origin::in_memory("t");
        let mut main = open(WindowRole::Main, &origin, VariableMap::new());
        let now = Instant::now();
        let subject = main.surface(SurfaceKind::Subject).find_pill("event_date").unwrap();
        let name = main.surface(SurfaceKind::Body).find_pill("client_name").unwrap();

        main.place_caret(SurfaceKind::Subject, Some(subject), 0, now);
        main.input_pill(SurfaceKind::Subject, subject, "June 10");
        main.input_pill(SurfaceKind::Body, name, "Amal");

        assert!(!main.surface(SurfaceKind::Subject).has_focus());
        assert_eq!(main.variables(), &vars(&[("client_name", "Amal"), ("event_date", "June 10")]));
        assert_eq!(main.filled_text(SurfaceKind::Body), "June 10: Amal");
    }

    #[test]
    fn test_tab_crosses_surfaces() {
        let origin = Origin::in_memory("t");
        let mut main = open(WindowRole::Main, &origin, VariableMap::new());
        let now = Instant::now();
        let subject_pill = main.surface(SurfaceKind::Subject).find_pill("event_date").unwrap();

        main.place_caret(SurfaceKind::Subject, Some(subject_pill), 0, now);
        let outcome = main.key_down(SurfaceKind::Subject, EditorKey::Tab, false, now);

        assert_eq!(outcome.navigate, Some(Navigation::External("client_name".to_string())));
        assert_eq!(main.session().focused_variable.as_deref(), Some("client_name"));
        let body = main.surface(SurfaceKind::Body);
        let target = body.find_pill("client_name").unwrap();
        assert_eq!(body.active_pill(), Some(target));
        assert!(!main.surface(SurfaceKind::Subject).has_focus());
    }

    #[test]
    fn test_tab_to_declared_field_without_pill() {
        let origin = Origin::in_memory("t");
        let mut main = open(WindowRole::Main, &origin, VariableMap::new());
        let now = Instant::now();
        let id = main.surface(SurfaceKind::Body).find_pill("client_name").unwrap();

        main.place_caret(SurfaceKind::Body, Some(id), 0, now);
        let outcome = main.key_down(SurfaceKind::Body, EditorKey::Tab, false, now);
        assert_eq!(outcome.navigate, Some(Navigation::External("case_number".to_string())));
        assert_eq!(main.session().focused_variable.as_deref(), Some("case_number"));
    }

    #[test]
    fn test_focus_variable_broadcasts_only_changes() {
        let origin = Origin::in_memory("t");
        let mut main = open(WindowRole::Main, &origin, VariableMap::new());

        assert!(main.focus_variable(Some("client_name")));
        assert!(!main.focus_variable(Some("client_name")));
        assert!(main.focus_variable(None));
        assert!(main.surface(SurfaceKind::Body).pills().iter().all(|p| !p.is_focused()));
    }

    #[test]
    fn test_hover_variable_highlights() {
        let origin = Origin::in_memory("t");
        let mut main = open(WindowRole::Main, &origin, VariableMap::new());
        assert!(main.hover_variable(Some("event_date")));
        assert!(!main.hover_variable(Some("event_date")));

        let hovered: Vec<bool> = main.surface(SurfaceKind::Body).pills().iter().map(|p| p.is_hovered()).collect();
        assert_eq!(hovered, vec![true, false]);
        assert!(main.surface(SurfaceKind::Subject).pills()[0].is_hovered());
    }

    #[test]
    fn test_cards_use_library() {
        let origin = Origin::in_memory("t");
        let mut main = open(WindowRole::Main, &origin, vars(&[("client_name", "Amal")]));
        main.focus_variable(Some("client_name_FR"));

        let cards = main.cards();
        assert_eq!(cards.len(), 3);
        assert_eq!(cards[0].format, VariableFormat::Date);
        assert_eq!(cards[1].label, "Nom du client");
        assert_eq!(cards[1].placeholder, "Amélie");
        assert_eq!(cards[1].value, "Amal");
        assert!(cards[1].filled);
        assert!(cards[1].focused);
        assert_eq!(cards[2].label, "case_number");
        assert_eq!(cards[2].placeholder, "");
        assert_eq!(cards[2].format, VariableFormat::Number);
    }

    #[test]
    fn test_pin_only_for_popout() {
        let origin = Origin::in_memory("t");
        let now = Instant::now();
        let mut main = open(WindowRole::Main, &origin, VariableMap::new());
        assert!(!main.set_pinned(true, now));

        let mut popout = open(WindowRole::Popout, &origin, VariableMap::new());
        assert!(popout.set_pinned(true, now));
        assert_eq!(popout.take_effects(), vec![WindowEffect::Refocus]);
        assert!(popout.session().pinned);
        assert!(popout.client().load_pinned());

        popout.pin_trigger(PinTrigger::Blur, now + std::time::Duration::from_millis(200));
        popout.pin_tick(
            now + std::time::Duration::from_millis(260),
            WindowFocusState {
                visible: true,
                focused: false,
            },
        );
        assert_eq!(popout.take_effects(), vec![WindowEffect::Refocus]);
        assert!(popout.take_effects().is_empty());
    }

    #[test]
    fn test_close_stops_sync() {
        let origin = Origin::in_memory("t");
        let mut main = open(WindowRole::Main, &origin, VariableMap::new());
        let mut peer = SyncClient::connect(&origin, Some("confirm"), Default::default());

        main.close();
        assert!(main.is_closed());
        assert!(main.update_variable("client_name", "Amal"));
        assert_eq!(main.value_of("client_name"), "Amal");
        assert!(peer.poll().is_empty());
        assert_eq!(main.pump(), 0);
    }
}
