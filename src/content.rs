use findbar_search::Document;
use log::{debug, warn};
use serde::Deserialize;

use crate::overlay::SearchOverlay;
use crate::settings::{Settings, SettingsStore, SettingsSubscription};
use crate::shortcuts::KeyEvent;

const EDITABLE_TAGS: &[&str] = &["input", "textarea", "select"];

/// Commands an external trigger can send to the page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ActivationCommand {
    ToggleSearch,
    OpenSearch {
        #[serde(default)]
        query: Option<String>,
    },
}

impl ActivationCommand {
    /// Parses an inbound message; anything unrecognised yields `None`.
    pub fn from_message(message: &str) -> Option<Self> {
        match serde_json::from_str(message) {
            Ok(command) => Some(command),
            Err(error) => {
                debug!("Ignoring unrecognised message: {}", error);
                None
            }
        }
    }
}

/// Wires the overlay to the page: the global shortcut, inbound commands and
/// settings changes.
pub struct ContentScript<S: SettingsStore> {
    store: S,
    settings: Settings,
    overlay: SearchOverlay,
    subscription: SettingsSubscription,
}

impl<S: SettingsStore> ContentScript<S> {
    pub fn bootstrap(doc: &mut Document, store: S) -> Self {
        let settings = store.load().unwrap_or_else(|error| {
            debug!("Falling back to default settings: {}", error);
            store.load_default()
        });
        let settings = if settings.shortcut.is_valid() {
            settings
        } else {
            warn!(
                "Stored shortcut `{}` is not usable; using the default",
                settings.shortcut.display_label()
            );
            store.load_default()
        };

        let overlay = SearchOverlay::mount(doc, || debug!("Search overlay closed"));
        let subscription = store.subscribe();
        let mut script = Self {
            store,
            settings,
            overlay,
            subscription,
        };
        script.update_shortcut_label(doc);
        script
    }

    pub fn overlay(&self) -> &SearchOverlay {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut SearchOverlay {
        &mut self.overlay
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Page-level key press. Returns whether the press toggled the overlay.
    pub fn handle_keydown(&mut self, doc: &mut Document, event: &KeyEvent) -> bool {
        if self.overlay.handle_document_key(doc, event) {
            return true;
        }
        if is_editable_target(doc, event) {
            return false;
        }
        if !self.settings.shortcut.matches(event) {
            return false;
        }
        self.overlay.toggle(doc);
        true
    }

    pub fn dispatch(&mut self, doc: &mut Document, command: ActivationCommand) {
        match command {
            ActivationCommand::ToggleSearch => self.overlay.toggle(doc),
            ActivationCommand::OpenSearch { query } => {
                self.overlay.open(doc);
                if let Some(query) = query.filter(|query| !query.is_empty()) {
                    self.overlay.set_query(doc, &query);
                }
            }
        }
    }

    pub fn handle_message(&mut self, doc: &mut Document, message: &str) {
        if let Some(command) = ActivationCommand::from_message(message) {
            self.dispatch(doc, command);
        }
    }

    /// Applies settings saved since the last poll. Returns whether anything
    /// changed.
    pub fn poll_settings(&mut self, doc: &mut Document) -> bool {
        let Some(updated) = self.subscription.latest() else {
            return false;
        };
        self.apply_settings(doc, updated)
    }

    /// Switches to `settings` if its shortcut is usable.
    pub fn apply_settings(&mut self, doc: &mut Document, mut settings: Settings) -> bool {
        settings.shortcut = settings.shortcut.normalized();
        if !settings.shortcut.is_valid() {
            warn!(
                "Ignoring unusable shortcut `{}`",
                settings.shortcut.display_label()
            );
            return false;
        }
        self.settings = settings;
        self.update_shortcut_label(doc);
        true
    }

    fn update_shortcut_label(&mut self, doc: &mut Document) {
        let label = self.settings.shortcut.display_label();
        self.overlay.set_shortcut_label(doc, &label);
    }
}

fn is_editable_target(doc: &Document, event: &KeyEvent) -> bool {
    let Some(target) = event.target else {
        return false;
    };
    if doc
        .tag_name(target)
        .is_some_and(|tag| EDITABLE_TAGS.contains(&tag))
    {
        return true;
    }
    doc.closest(target, |doc, node| {
        doc.attribute(node, "contenteditable")
            .is_some_and(|value| value.is_empty() || value.eq_ignore_ascii_case("true"))
    })
    .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::FileSettingsStore;
    use crate::shortcuts::Shortcut;

    fn page() -> Document {
        let mut doc = Document::new();
        let p = doc.create_element("p");
        let t = doc.create_text("Foo fighters find foo faster than FOO bar.");
        doc.append_child(p, t);
        doc.append_child(doc.body(), p);
        doc
    }

    fn shortcut_event() -> KeyEvent {
        KeyEvent::from(&Shortcut::default())
    }

    fn script(doc: &mut Document) -> ContentScript<FileSettingsStore> {
        ContentScript::bootstrap(doc, FileSettingsStore::unavailable())
    }

    #[test]
    fn parses_activation_messages() {
        assert_eq!(
            ActivationCommand::from_message(r#"{"type":"toggle-search"}"#),
            Some(ActivationCommand::ToggleSearch)
        );
        assert_eq!(
            ActivationCommand::from_message(r#"{"type":"open-search","query":"foo"}"#),
            Some(ActivationCommand::OpenSearch {
                query: Some("foo".to_string())
            })
        );
        assert_eq!(
            ActivationCommand::from_message(r#"{"type":"open-search"}"#),
            Some(ActivationCommand::OpenSearch { query: None })
        );
        assert_eq!(ActivationCommand::from_message(r#"{"type":"reload"}"#), None);
        assert_eq!(ActivationCommand::from_message("not json"), None);
    }

    #[test]
    fn unavailable_storage_falls_back_to_defaults() {
        let mut doc = page();
        let script = script(&mut doc);
        assert_eq!(script.settings(), &Settings::default());
        let label = doc
            .find_by_attribute(script.overlay().root(), "data-shortcut")
            .map(|node| doc.text_content(node));
        assert_eq!(label, Some(Shortcut::default().display_label()));
    }

    #[test]
    fn shortcut_toggles_overlay() {
        let mut doc = page();
        let mut script = script(&mut doc);

        assert!(script.handle_keydown(&mut doc, &shortcut_event()));
        assert!(script.overlay().is_open());
        assert!(script.handle_keydown(&mut doc, &shortcut_event()));
        assert!(!script.overlay().is_open());
        assert!(!script.handle_keydown(&mut doc, &KeyEvent::new("f")));
    }

    #[test]
    fn shortcut_is_ignored_in_editable_targets() {
        let mut doc = page();
        let textarea = doc.create_element("textarea");
        doc.append_child(doc.body(), textarea);
        let editor = doc.create_element("div");
        doc.set_attribute(editor, "contenteditable", "true");
        let inner = doc.create_element("span");
        doc.append_child(editor, inner);
        doc.append_child(doc.body(), editor);
        let mut script = script(&mut doc);

        for target in [textarea, inner] {
            let event = shortcut_event().with_target(target);
            assert!(!script.handle_keydown(&mut doc, &event));
            assert!(!script.overlay().is_open());
        }
    }

    #[test]
    fn open_message_with_query_searches() {
        let mut doc = page();
        let mut script = script(&mut doc);
        script.handle_message(&mut doc, r#"{"type":"open-search","query":"foo"}"#);

        assert!(script.overlay().is_open());
        assert_eq!(script.overlay().cursor().count(), 3);
        assert_eq!(script.overlay().status_text(), "1 of 3");
    }

    #[test]
    fn escape_reaches_the_overlay_first() {
        let mut doc = page();
        let mut script = script(&mut doc);
        script.dispatch(&mut doc, ActivationCommand::ToggleSearch);
        assert!(script.handle_keydown(&mut doc, &KeyEvent::new("Escape")));
        assert!(!script.overlay().is_open());
    }

    #[test]
    fn saved_settings_update_the_shortcut() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSettingsStore::new(dir.path().join("settings.json"));
        let mut doc = page();
        let mut script = ContentScript::bootstrap(&mut doc, store.clone());
        assert!(!script.poll_settings(&mut doc));

        let custom = Shortcut::parse_trigger("alt-k").expect("valid trigger");
        store
            .save(&Settings {
                shortcut: custom.clone(),
            })
            .expect("save");

        assert!(script.poll_settings(&mut doc));
        assert_eq!(script.settings().shortcut, custom);
        assert!(script.handle_keydown(&mut doc, &KeyEvent::from(&custom)));
        assert!(script.overlay().is_open());
    }

    #[test]
    fn saved_lowercase_shortcut_still_fires() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSettingsStore::new(dir.path().join("settings.json"));
        let mut doc = page();
        let mut script = ContentScript::bootstrap(&mut doc, store.clone());

        let lowercase = Shortcut {
            key: "k".to_string(),
            alt_key: true,
            ctrl_key: false,
            meta_key: false,
            shift_key: false,
        };
        store.save(&Settings { shortcut: lowercase }).expect("save");

        assert!(script.poll_settings(&mut doc));
        assert_eq!(script.settings().shortcut.key, "K");
        let mut event = KeyEvent::new("k");
        event.alt_key = true;
        assert!(script.handle_keydown(&mut doc, &event));
        assert!(script.overlay().is_open());
    }

    #[test]
    fn applied_settings_are_normalized() {
        let mut doc = page();
        let mut script = script(&mut doc);
        let mut shortcut = Shortcut::default();
        shortcut.key = "j".to_string();

        assert!(script.apply_settings(&mut doc, Settings { shortcut }));
        assert_eq!(script.settings().shortcut.key, "J");
    }

    #[test]
    fn unusable_saved_shortcut_is_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSettingsStore::new(dir.path().join("settings.json"));
        let mut doc = page();
        let mut script = ContentScript::bootstrap(&mut doc, store.clone());

        let unusable = Shortcut {
            key: "K".to_string(),
            alt_key: false,
            ctrl_key: false,
            meta_key: false,
            shift_key: false,
        };
        store.save(&Settings { shortcut: unusable }).expect("save");

        assert!(!script.poll_settings(&mut doc));
        assert_eq!(script.settings(), &Settings::default());
    }
}
