use findbar_search::NodeId;
use serde::{Deserialize, Serialize};

/// Key value browsers report when they cannot identify the key.
pub const UNIDENTIFIED_KEY: &str = "Unidentified";

pub const MISSING_KEY_MESSAGE: &str = "Press a key to use for the shortcut.";
pub const MISSING_MODIFIER_MESSAGE: &str =
    "Include at least one modifier key (Ctrl, Command, Alt, or Shift).";

/// A key combination that toggles the search overlay.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shortcut {
    pub key: String,
    #[serde(default)]
    pub alt_key: bool,
    #[serde(default)]
    pub ctrl_key: bool,
    #[serde(default)]
    pub meta_key: bool,
    #[serde(default)]
    pub shift_key: bool,
}

/// A key press as delivered by the host page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyEvent {
    pub key: String,
    pub alt_key: bool,
    pub ctrl_key: bool,
    pub meta_key: bool,
    pub shift_key: bool,
    /// Element that had focus when the key was pressed.
    pub target: Option<NodeId>,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn shifted(mut self) -> Self {
        self.shift_key = true;
        self
    }

    pub fn with_target(mut self, target: NodeId) -> Self {
        self.target = Some(target);
        self
    }
}

impl From<&Shortcut> for KeyEvent {
    fn from(shortcut: &Shortcut) -> Self {
        Self {
            key: shortcut.key.clone(),
            alt_key: shortcut.alt_key,
            ctrl_key: shortcut.ctrl_key,
            meta_key: shortcut.meta_key,
            shift_key: shortcut.shift_key,
            target: None,
        }
    }
}

/// Upper-cases single-character keys; named keys (`Enter`, `F5`) are kept.
pub fn normalize_key(key: &str) -> String {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(_), None) => key.to_uppercase(),
        _ => key.to_string(),
    }
}

pub fn is_mac_platform() -> bool {
    cfg!(target_os = "macos")
}

impl Default for Shortcut {
    fn default() -> Self {
        Self {
            key: "F".to_string(),
            alt_key: false,
            ctrl_key: !is_mac_platform(),
            meta_key: is_mac_platform(),
            shift_key: true,
        }
    }
}

impl Shortcut {
    pub fn normalized(mut self) -> Self {
        self.key = normalize_key(&self.key);
        self
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            key: normalize_key(&event.key),
            alt_key: event.alt_key,
            ctrl_key: event.ctrl_key,
            meta_key: event.meta_key,
            shift_key: event.shift_key,
        }
    }

    /// Needs a real key plus at least one modifier.
    pub fn is_valid(&self) -> bool {
        if self.key.is_empty() || self.key == UNIDENTIFIED_KEY {
            return false;
        }
        self.alt_key || self.ctrl_key || self.meta_key || self.shift_key
    }

    /// Like [`Shortcut::is_valid`], with the message to show the user.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.key.is_empty() || self.key == UNIDENTIFIED_KEY {
            return Err(MISSING_KEY_MESSAGE);
        }
        if !self.is_valid() {
            return Err(MISSING_MODIFIER_MESSAGE);
        }
        Ok(())
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        normalize_key(&event.key) == self.key
            && event.alt_key == self.alt_key
            && event.ctrl_key == self.ctrl_key
            && event.meta_key == self.meta_key
            && event.shift_key == self.shift_key
    }

    /// Human readable label, e.g. `Ctrl + Shift + F`.
    pub fn display_label(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl_key {
            parts.push("Ctrl".to_string());
        }
        if self.meta_key {
            parts.push(if is_mac_platform() { "Command" } else { "Meta" }.to_string());
        }
        if self.alt_key {
            parts.push(if is_mac_platform() { "Option" } else { "Alt" }.to_string());
        }
        if self.shift_key {
            parts.push("Shift".to_string());
        }
        parts.push(normalize_key(&self.key));
        parts.join(" + ")
    }

    /// Parses a trigger such as `ctrl-shift-f`, `secondary-shift-f` or
    /// `alt-enter`. `secondary` is Command on macOS and Ctrl elsewhere.
    pub fn parse_trigger(trigger: &str) -> Result<Self, String> {
        let trigger = trigger.trim();
        if trigger.is_empty() {
            return Err("empty shortcut trigger".to_string());
        }

        // A trailing `-` after a separator is the minus key itself: `ctrl--`.
        let (modifiers, key) = match trigger.strip_suffix("--") {
            Some(rest) => (rest, "-"),
            None => match trigger.rsplit_once('-') {
                Some((rest, key)) => (rest, key),
                None => ("", trigger),
            },
        };

        let mut shortcut = Self {
            key: parse_key_name(key)?,
            alt_key: false,
            ctrl_key: false,
            meta_key: false,
            shift_key: false,
        };

        for modifier in modifiers.split('-').filter(|part| !part.is_empty()) {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => shortcut.ctrl_key = true,
                "alt" | "option" => shortcut.alt_key = true,
                "cmd" | "command" | "meta" | "super" => shortcut.meta_key = true,
                "shift" => shortcut.shift_key = true,
                "secondary" => {
                    if is_mac_platform() {
                        shortcut.meta_key = true;
                    } else {
                        shortcut.ctrl_key = true;
                    }
                }
                other => return Err(format!("unknown modifier `{}` in `{}`", other, trigger)),
            }
        }

        Ok(shortcut)
    }
}

fn parse_key_name(name: &str) -> Result<String, String> {
    let lowered = name.to_ascii_lowercase();
    let named = match lowered.as_str() {
        "" => return Err("shortcut trigger is missing a key".to_string()),
        "enter" | "return" => "Enter",
        "escape" | "esc" => "Escape",
        "tab" => "Tab",
        "space" => " ",
        "backspace" => "Backspace",
        "delete" => "Delete",
        "up" => "ArrowUp",
        "down" => "ArrowDown",
        "left" => "ArrowLeft",
        "right" => "ArrowRight",
        _ => {
            if name.chars().count() == 1 {
                return Ok(normalize_key(name));
            }
            if let Some(number) = lowered.strip_prefix('f')
                && let Ok(number) = number.parse::<u8>()
                && (1..=24).contains(&number)
            {
                return Ok(format!("F{}", number));
            }
            return Err(format!("unknown key `{}`", name));
        }
    };
    Ok(named.to_string())
}
