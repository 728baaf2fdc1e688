use std::{
    env, fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Weak},
};

use flume::{Receiver, Sender};
use log::{debug, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::shortcuts::Shortcut;

/// Key of the single record the settings file holds.
pub const SETTINGS_KEY: &str = "findbarSettings";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub shortcut: Shortcut,
}

impl Settings {
    fn normalized(mut self) -> Self {
        self.shortcut = self.shortcut.normalized();
        self
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings storage is unavailable")]
    StorageUnavailable,

    #[error("failed to access settings file: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Where the overlay's persisted settings come from.
pub trait SettingsStore {
    fn load_default(&self) -> Settings {
        Settings::default()
    }

    fn load(&self) -> Result<Settings, SettingsError>;

    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;

    /// Receives every settings value saved after this call.
    fn subscribe(&self) -> SettingsSubscription;
}

type Subscribers = Mutex<Vec<(u64, Sender<Settings>)>>;

#[derive(Default)]
struct Registry {
    subscribers: Subscribers,
    next_id: Mutex<u64>,
}

impl Registry {
    fn subscribe(self: &Arc<Self>) -> SettingsSubscription {
        let (sender, receiver) = flume::unbounded();
        let id = {
            let mut next_id = self.next_id.lock();
            *next_id += 1;
            *next_id
        };
        self.subscribers.lock().push((id, sender));
        SettingsSubscription {
            id,
            receiver,
            registry: Arc::downgrade(self),
        }
    }

    fn notify(&self, settings: &Settings) {
        let settings = settings.clone().normalized();
        self.subscribers
            .lock()
            .retain(|(_, sender)| sender.send(settings.clone()).is_ok());
    }

    fn remove(&self, id: u64) {
        self.subscribers.lock().retain(|(existing, _)| *existing != id);
    }
}

/// Change feed handed out by [`SettingsStore::subscribe`]. Dropping it
/// unsubscribes.
pub struct SettingsSubscription {
    id: u64,
    receiver: Receiver<Settings>,
    registry: Weak<Registry>,
}

impl SettingsSubscription {
    /// Latest settings saved since the previous call, if any.
    pub fn latest(&self) -> Option<Settings> {
        self.receiver.try_iter().last()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for SettingsSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

/// Settings persisted as JSON under the user's config directory.
#[derive(Clone)]
pub struct FileSettingsStore {
    path: Option<PathBuf>,
    registry: Arc<Registry>,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            registry: Arc::default(),
        }
    }

    /// Store at the platform config location, or an unavailable store when
    /// no location can be determined.
    pub fn from_default_location() -> Self {
        match settings_path() {
            Some(path) => Self::new(path),
            None => {
                warn!("Could not determine a settings location; using defaults");
                Self::unavailable()
            }
        }
    }

    pub fn unavailable() -> Self {
        Self {
            path: None,
            registry: Arc::default(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn read_record(path: &Path) -> Result<Map<String, Value>, SettingsError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(error) => return Err(error.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        let path = self.path.as_deref().ok_or(SettingsError::StorageUnavailable)?;
        let record = Self::read_record(path)?;

        let Some(stored) = record.get(SETTINGS_KEY) else {
            debug!("No stored settings in {}; using defaults", path.display());
            return Ok(self.load_default());
        };
        if stored.get("shortcut").is_none_or(Value::is_null) {
            return Ok(self.load_default());
        }

        let settings: Settings = serde_json::from_value(stored.clone())?;
        Ok(settings.normalized())
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let path = self.path.as_deref().ok_or(SettingsError::StorageUnavailable)?;

        // Keep unrelated keys other tools may have written next to ours.
        let mut record = Self::read_record(path).unwrap_or_else(|error| {
            warn!(
                "Overwriting unreadable settings at {}: {}",
                path.display(),
                error
            );
            Map::new()
        });
        record.insert(SETTINGS_KEY.to_string(), serde_json::to_value(settings)?);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&Value::Object(record))?)?;

        self.registry.notify(settings);
        Ok(())
    }

    fn subscribe(&self) -> SettingsSubscription {
        self.registry.subscribe()
    }
}

fn settings_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        if let Ok(app_data) = env::var("APPDATA")
            && !app_data.trim().is_empty()
        {
            return Some(Path::new(&app_data).join("findbar").join("settings.json"));
        }
    }

    if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME")
        && !xdg_config_home.trim().is_empty()
    {
        return Some(Path::new(&xdg_config_home).join("findbar/settings.json"));
    }

    if let Ok(home) = env::var("HOME")
        && !home.trim().is_empty()
    {
        return Some(Path::new(&home).join(".config/findbar/settings.json"));
    }

    dirs::config_dir().map(|dir| dir.join("findbar").join("settings.json"))
}
