/// Local key-value store for viewer preferences (JSON file)
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;
use crate::i18n::Language;

const LANGUAGE_KEY: &str = "lang";

#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl PreferenceStore {
    /// Read once at startup. A missing, unreadable or corrupt file starts empty.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Ignoring corrupt preferences file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No preferences at {} - starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                warn!("Cannot read preferences file {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };
        PreferenceStore { path, values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Stored language; unsupported codes are ignored
    pub fn language(&self) -> Option<Language> {
        self.get(LANGUAGE_KEY).and_then(Language::from_code)
    }

    /// Explicit change: updates the store and writes it to disk.
    /// Returns false without touching the file when `language` is already stored.
    pub fn set_language(&mut self, language: Language) -> Result<bool> {
        if self.get(LANGUAGE_KEY) == Some(language.code()) {
            return Ok(false);
        }
        self.values
            .insert(LANGUAGE_KEY.to_string(), language.code().to_string());
        self.save()?;
        Ok(true)
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.values)?;
        std::fs::write(&self.path, json)?;
        debug!("Preferences written to {}", self.path.display());
        Ok(())
    }
}
