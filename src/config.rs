use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::to_string_pretty;
use thiserror::Error;

use crate::storage::DocumentLocator;

pub const DEFAULT_DOCUMENT_PATH: &str = "data/projects.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load settings from '{path}': {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings from '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save settings to '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize settings to JSON: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },
}

fn default_document_path() -> String {
    DEFAULT_DOCUMENT_PATH.to_string()
}

/// Where the project document lives and how to reach it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub owner: String,
    pub repo: String,
    /// Static credential for the remote store
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_document_path")]
    pub path: String,
    /// Keep the document in this directory instead of the remote store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            token: String::new(),
            path: default_document_path(),
            local_dir: None,
        }
    }
}

impl Settings {
    pub fn locator(&self) -> DocumentLocator {
        let path = match self.path.trim() {
            "" => DEFAULT_DOCUMENT_PATH,
            path => path,
        };
        DocumentLocator::new(self.owner.trim(), self.repo.trim(), path)
    }

    /// Remote sync needs a credential; a local directory does not
    pub fn can_sync(&self) -> bool {
        self.local_dir.is_some() || !self.token.trim().is_empty()
    }
}

/// Settings persisted as a JSON file on the local machine
pub struct SettingsFile {
    path: PathBuf,
}

impl SettingsFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `{config_dir}/pm-tracker/settings.json`
    pub fn default_location() -> Self {
        let path = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pm-tracker")
            .join("settings.json");
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when nothing has been configured yet
    pub fn load(&self) -> Result<Option<Settings>, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => serde_json::from_str(&content).map(Some).map_err(|e| {
                ConfigError::ParseFailed {
                    path: self.path.clone(),
                    source: e,
                }
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::LoadFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        let json =
            to_string_pretty(settings).map_err(|e| ConfigError::SerializeFailed { source: e })?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::SaveFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(&self.path, json).map_err(|e| ConfigError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })
    }
}
