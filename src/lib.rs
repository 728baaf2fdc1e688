//! Regex find bar for web pages: the overlay controller, its activation
//! shortcut and persisted settings.

pub mod content;
pub mod overlay;
pub mod page;
pub mod settings;
pub mod shortcuts;

pub use content::{ActivationCommand, ContentScript};
pub use overlay::{OVERLAY_ID, OverlayControl, OverlayState, SearchOverlay};
pub use settings::{FileSettingsStore, SETTINGS_KEY, Settings, SettingsError, SettingsStore};
pub use shortcuts::{KeyEvent, Shortcut};
