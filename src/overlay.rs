use findbar_search::{
    Direction, Document, Highlighter, MatchCursor, NodeId, Pattern, SKIP_ATTRIBUTE,
    inject_highlight_styles,
};
use log::debug;

use crate::shortcuts::KeyEvent;

/// Well-known id of the overlay root; at most one exists per document.
pub const OVERLAY_ID: &str = "findbar-overlay";

const INPUT_PLACEHOLDER: &str = "Enter regex…";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Closed,
    Open,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayControl {
    Previous,
    Next,
    Close,
}

#[derive(Debug, Clone, Copy)]
struct OverlayElements {
    root: NodeId,
    input: NodeId,
    counter: NodeId,
    error: NodeId,
    prev_button: NodeId,
    next_button: NodeId,
    close_button: NodeId,
    shortcut_label: NodeId,
}

/// The find bar: owns its UI subtree, the query and the match cursor, and is
/// the only caller of the [`Highlighter`].
pub struct SearchOverlay {
    elements: OverlayElements,
    highlighter: Highlighter,
    state: OverlayState,
    cursor: MatchCursor,
    error: Option<String>,
    focus_pending: bool,
    on_close: Box<dyn FnMut()>,
}

impl SearchOverlay {
    /// Builds the overlay into `doc`, first removing any overlay a previous
    /// activation left behind.
    pub fn mount(doc: &mut Document, on_close: impl FnMut() + 'static) -> Self {
        if let Some(stale) = doc.element_by_id(OVERLAY_ID) {
            debug!("Removing stale search overlay");
            doc.remove(stale);
        }

        let elements = build_overlay(doc);
        doc.append_child(doc.body(), elements.root);
        inject_highlight_styles(doc);

        let overlay = Self {
            elements,
            highlighter: Highlighter::new(elements.root),
            state: OverlayState::Closed,
            cursor: MatchCursor::new(),
            error: None,
            focus_pending: false,
            on_close: Box::new(on_close),
        };
        overlay.render_visibility(doc);
        overlay.render_result(doc);
        overlay
    }

    pub fn root(&self) -> NodeId {
        self.elements.root
    }

    pub fn input(&self) -> NodeId {
        self.elements.input
    }

    pub fn control(&self, control: OverlayControl) -> NodeId {
        match control {
            OverlayControl::Previous => self.elements.prev_button,
            OverlayControl::Next => self.elements.next_button,
            OverlayControl::Close => self.elements.close_button,
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == OverlayState::Open
    }

    pub fn cursor(&self) -> MatchCursor {
        self.cursor
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn highlighter(&self) -> &Highlighter {
        &self.highlighter
    }

    pub fn query(&self, doc: &Document) -> String {
        doc.attribute(self.elements.input, "value")
            .unwrap_or_default()
            .to_string()
    }

    pub fn status_text(&self) -> String {
        self.cursor.status_text()
    }

    pub fn open(&mut self, doc: &mut Document) {
        if self.is_open() {
            self.focus_input();
            return;
        }
        self.state = OverlayState::Open;
        self.render_visibility(doc);
        self.focus_input();
        let query = self.query(doc);
        self.apply_search(doc, &query);
    }

    pub fn close(&mut self, doc: &mut Document) {
        if !self.is_open() {
            return;
        }
        self.state = OverlayState::Closed;
        self.focus_pending = false;
        self.render_visibility(doc);
        self.highlighter.clear(doc);
        self.cursor.reset();
        self.render_result(doc);
        (self.on_close)();
    }

    pub fn toggle(&mut self, doc: &mut Document) {
        if self.is_open() {
            self.close(doc);
        } else {
            self.open(doc);
        }
    }

    /// Replaces the query text and searches for it.
    pub fn set_query(&mut self, doc: &mut Document, value: &str) {
        doc.set_attribute(self.elements.input, "value", value);
        self.apply_search(doc, value);
    }

    pub fn set_shortcut_label(&mut self, doc: &mut Document, label: &str) {
        doc.set_text_content(self.elements.shortcut_label, label);
    }

    /// The user edited the query input.
    pub fn handle_input(&mut self, doc: &mut Document, value: &str) {
        self.set_query(doc, value);
    }

    /// Key pressed inside the query input. Returns whether it was consumed.
    pub fn handle_input_key(&mut self, doc: &mut Document, event: &KeyEvent) -> bool {
        match event.key.as_str() {
            "Escape" => {
                self.close(doc);
                true
            }
            "Enter" => {
                let direction = if event.shift_key {
                    Direction::Backward
                } else {
                    Direction::Forward
                };
                self.navigate(doc, direction);
                true
            }
            _ => false,
        }
    }

    /// Key pressed anywhere in the page while the overlay exists.
    pub fn handle_document_key(&mut self, doc: &mut Document, event: &KeyEvent) -> bool {
        if !self.is_open() || event.key != "Escape" {
            return false;
        }
        self.close(doc);
        true
    }

    /// Pointer pressed on `target`; anything outside the overlay closes it.
    pub fn handle_pointer_down(&mut self, doc: &mut Document, target: Option<NodeId>) {
        if !self.is_open() {
            return;
        }
        if target.is_some_and(|target| doc.contains(self.elements.root, target)) {
            return;
        }
        self.close(doc);
    }

    pub fn click(&mut self, doc: &mut Document, control: OverlayControl) {
        match control {
            OverlayControl::Previous => self.navigate(doc, Direction::Backward),
            OverlayControl::Next => self.navigate(doc, Direction::Forward),
            OverlayControl::Close => self.close(doc),
        }
    }

    /// Runs work deferred until the overlay has been laid out.
    pub fn run_animation_frame(&mut self, doc: &mut Document) {
        if !std::mem::take(&mut self.focus_pending) {
            return;
        }
        doc.select(self.elements.input);
        doc.focus(self.elements.input);
    }

    pub fn navigate(&mut self, doc: &mut Document, direction: Direction) {
        let Some(index) = self.cursor.navigate(direction) else {
            return;
        };
        self.highlighter.set_active(doc, index);
        self.render_result(doc);
    }

    fn focus_input(&mut self) {
        self.focus_pending = true;
    }

    fn apply_search(&mut self, doc: &mut Document, raw_query: &str) {
        let trimmed = raw_query.trim();
        if trimmed.is_empty() {
            self.highlighter.clear(doc);
            self.cursor.reset();
            self.render_result(doc);
            self.hide_error(doc);
            return;
        }

        let Some(pattern) = self.compile_pattern(doc, trimmed) else {
            self.highlighter.clear(doc);
            self.cursor.reset();
            self.render_result(doc);
            return;
        };

        let count = self.highlighter.search(doc, &pattern);
        self.cursor = MatchCursor::from_count(count);
        if count > 0 {
            self.highlighter.set_active(doc, 0);
        }
        self.render_result(doc);
    }

    fn compile_pattern(&mut self, doc: &mut Document, value: &str) -> Option<Pattern> {
        match Pattern::compile(value) {
            Ok(pattern) => {
                self.hide_error(doc);
                Some(pattern)
            }
            Err(error) => {
                debug!("Rejected search pattern: {}", error);
                self.show_error(doc, &error.to_string());
                None
            }
        }
    }

    fn render_visibility(&self, doc: &mut Document) {
        let root = self.elements.root;
        let open = self.is_open();
        doc.toggle_attribute(root, "hidden", !open);
        doc.set_attribute(root, "data-state", if open { "open" } else { "closed" });
    }

    fn render_result(&self, doc: &mut Document) {
        doc.set_text_content(self.elements.counter, &self.cursor.status_text());
        let disabled = self.cursor.is_empty();
        doc.toggle_attribute(self.elements.prev_button, "disabled", disabled);
        doc.toggle_attribute(self.elements.next_button, "disabled", disabled);
    }

    fn show_error(&mut self, doc: &mut Document, message: &str) {
        doc.toggle_attribute(self.elements.error, "hidden", false);
        doc.set_text_content(self.elements.error, message);
        self.error = Some(message.to_string());
    }

    fn hide_error(&mut self, doc: &mut Document) {
        doc.toggle_attribute(self.elements.error, "hidden", true);
        doc.set_text_content(self.elements.error, "");
        self.error = None;
    }
}

fn build_overlay(doc: &mut Document) -> OverlayElements {
    let element = |doc: &mut Document, parent: NodeId, tag: &str, marker: &str, text: &str| {
        let node = doc.create_element(tag);
        doc.set_attribute(node, marker, "");
        if !text.is_empty() {
            doc.set_text_content(node, text);
        }
        doc.append_child(parent, node);
        node
    };

    let root = doc.create_element("section");
    doc.set_attribute(root, "id", OVERLAY_ID);
    doc.set_attribute(root, SKIP_ATTRIBUTE, "true");
    doc.set_attribute(root, "role", "region");
    doc.set_attribute(root, "aria-label", "Findbar");

    let panel = element(doc, root, "div", "data-panel", "");
    let input = element(doc, panel, "input", "data-input", "");
    doc.set_attribute(input, "type", "text");
    doc.set_attribute(input, "placeholder", INPUT_PLACEHOLDER);
    doc.set_attribute(input, "aria-label", "Findbar regex input");
    doc.set_attribute(input, "autocomplete", "off");
    doc.set_attribute(input, "spellcheck", "false");
    doc.set_attribute(input, "value", "");

    let meta = element(doc, panel, "div", "data-meta", "");
    let counter = element(doc, meta, "span", "data-counter", "No matches");
    let shortcut_label = element(doc, meta, "span", "data-shortcut", "");

    let error = element(doc, panel, "p", "data-error", "");
    doc.toggle_attribute(error, "hidden", true);

    let controls = element(doc, panel, "div", "data-controls", "");
    let buttons = doc.create_element("div");
    doc.append_child(controls, buttons);
    let prev_button = element(doc, buttons, "button", "data-prev", "◀ Previous");
    let next_button = element(doc, buttons, "button", "data-next", "Next ▶");
    let close_button = element(doc, controls, "button", "data-close", "×");
    doc.set_attribute(close_button, "aria-label", "Close search overlay");
    for button in [prev_button, next_button, close_button] {
        doc.set_attribute(button, "type", "button");
    }

    OverlayElements {
        root,
        input,
        counter,
        error,
        prev_button,
        next_button,
        close_button,
        shortcut_label,
    }
}
