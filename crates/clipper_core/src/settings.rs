use crate::catalog::is_plain_channel_id;
use crate::error::{CoreError, Result};
use crate::types::Seconds;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Key the per-channel settings map is stored under.
pub const SETTINGS_KEY: &str = "settings";

/// Used for channels with no stored settings.
pub const DEFAULT_DURATION: Seconds = Seconds(120);

/// Persistent string key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Stores each key as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if !is_plain_channel_id(key) {
            return Err(CoreError::InvalidSetting(format!("invalid store key: {}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)?) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key)?, value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)?) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSettings {
    pub default_duration: Seconds,
}

/// Uncommitted edits for one channel, applied by [`SettingsStore::close`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsDraft {
    channel_id: String,
    pub default_duration: Seconds,
}

impl SettingsDraft {
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

/// Per-channel settings backed by a [`KeyValueStore`].
#[derive(Debug)]
pub struct SettingsStore<S: KeyValueStore> {
    store: S,
    channels: BTreeMap<String, ChannelSettings>,
    fallback: Seconds,
}

impl<S: KeyValueStore> SettingsStore<S> {
    /// Read stored settings. Unparsable or non-UTF-8 data is dropped from the store and
    /// every channel starts from `fallback`.
    pub fn load(mut store: S, fallback: Seconds) -> Result<Self> {
        let parsed = match store.get(SETTINGS_KEY) {
            Ok(None) => Ok(BTreeMap::new()),
            Ok(Some(data)) => serde_json::from_str(&data).map_err(CoreError::from),
            Err(CoreError::Io(e)) if e.kind() == std::io::ErrorKind::InvalidData => {
                Err(CoreError::Io(e))
            }
            Err(e) => return Err(e),
        };
        let channels = match parsed {
            Ok(channels) => channels,
            Err(e) => {
                tracing::warn!("Discarding unreadable settings: {}", e);
                store.remove(SETTINGS_KEY)?;
                BTreeMap::new()
            }
        };
        Ok(Self {
            store,
            channels,
            fallback: fallback.clamp(Seconds(1), Seconds::MAX_OFFSET),
        })
    }

    /// Settings for `channel_id`, created from the fallback on first access.
    pub fn channel(&mut self, channel_id: &str) -> ChannelSettings {
        let fallback = self.fallback;
        *self
            .channels
            .entry(channel_id.to_string())
            .or_insert(ChannelSettings {
                default_duration: fallback,
            })
    }

    pub fn default_duration(&mut self, channel_id: &str) -> Seconds {
        self.channel(channel_id).default_duration
    }

    pub fn open(&mut self, channel_id: &str) -> SettingsDraft {
        SettingsDraft {
            channel_id: channel_id.to_string(),
            default_duration: self.default_duration(channel_id),
        }
    }

    /// Apply a draft and write every channel's settings back to the store.
    pub fn close(&mut self, draft: SettingsDraft) -> Result<ChannelSettings> {
        if draft.default_duration.is_zero() {
            return Err(CoreError::InvalidSetting(
                "default duration must be at least one second".into(),
            ));
        }
        if draft.default_duration > Seconds::MAX_OFFSET {
            return Err(CoreError::InvalidSetting(format!(
                "default duration must be at most {} seconds",
                Seconds::MAX_OFFSET.0
            )));
        }
        let settings = ChannelSettings {
            default_duration: draft.default_duration,
        };
        self.channels.insert(draft.channel_id, settings);
        let json = serde_json::to_string(&self.channels)?;
        self.store.set(SETTINGS_KEY, &json)?;
        Ok(settings)
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}
