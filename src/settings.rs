//! Persistent user settings, stored as JSON in the platform config directory.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

const APP_DIR: &str = "iscc-eval";
const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown setting `{0}`")]
    UnknownKey(String),
    #[error("no config directory available on this platform")]
    NoConfigDir,
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> SettingsError + '_ {
    move |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory for evaluation data, including the ground-truth cache.
    #[serde(default = "Settings::default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: Self::default_data_dir(),
        }
    }
}

impl Settings {
    pub const KEYS: [&'static str; 1] = ["data_dir"];

    /// `<platform data dir>/iscc-eval`, or `./iscc-eval-data` without one.
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("iscc-eval-data"))
    }

    /// `key = value` pairs for display.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        vec![("data_dir", self.data_dir.display().to_string())]
    }
}

/// The settings file on disk.
#[derive(Debug, Clone)]
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<platform config dir>/iscc-eval/settings.json`.
    pub fn default_location() -> Result<Self, SettingsError> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(dir.join(APP_DIR).join(SETTINGS_FILE)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the settings; a missing file yields the defaults.
    pub fn load(&self) -> Result<Settings, SettingsError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(io_err(&self.path)(e)),
        }
    }

    /// Like [`Self::load`], but a broken file is logged and replaced by the defaults.
    pub fn load_or_default(&self) -> Settings {
        self.load().unwrap_or_else(|err| {
            error!(
                path = %self.path.display(),
                error = %err,
                "failed to load settings, using defaults"
            );
            Settings::default()
        })
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }
        let payload = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, payload).map_err(io_err(&self.path))
    }

    /// Update one setting and persist the result.
    ///
    /// Setting `data_dir` creates the directory when it does not exist yet.
    pub fn set(&self, key: &str, value: &str) -> Result<Settings, SettingsError> {
        let mut settings = self.load()?;
        match key {
            "data_dir" => {
                let path = PathBuf::from(value);
                if !path.exists() {
                    debug!(path = %path.display(), "creating data_dir");
                    fs::create_dir_all(&path).map_err(io_err(&path))?;
                }
                settings.data_dir = path;
            }
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        self.save(&settings)?;
        Ok(settings)
    }

    /// Delete the settings file. Returns whether a file was removed.
    pub fn reset(&self) -> Result<bool, SettingsError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_err(&self.path)(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("settings.json"));
        assert_eq!(file.load().unwrap(), Settings::default());
    }

    #[test]
    fn set_persists_and_creates_data_dir() {
        let dir = tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("cfg").join("settings.json"));
        let data = dir.path().join("data");

        let updated = file.set("data_dir", data.to_str().unwrap()).unwrap();
        assert_eq!(updated.data_dir, data);
        assert!(data.is_dir());
        assert_eq!(file.load().unwrap().data_dir, data);
        assert_eq!(updated.entries()[0].0, "data_dir");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("settings.json"));
        assert!(matches!(
            file.set("colour", "blue"),
            Err(SettingsError::UnknownKey(_))
        ));
        assert!(!file.path().exists());
    }

    #[test]
    fn reset_removes_the_file() {
        let dir = tempdir().unwrap();
        let file = SettingsFile::new(dir.path().join("settings.json"));
        file.save(&Settings::default()).unwrap();
        assert!(file.reset().unwrap());
        assert!(!file.reset().unwrap());
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        let file = SettingsFile::new(path);
        assert!(matches!(file.load(), Err(SettingsError::Json(_))));
        assert_eq!(file.load_or_default(), Settings::default());
    }
}
