/// Label catalog (Spanish / English) with language fallback
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};
use crate::presentation::LabelResolver;

const EMBEDDED_LABELS: &str = include_str!("../../config/labels.toml");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Es,
    En,
}

impl Language {
    pub const SUPPORTED: [Language; 2] = [Language::Es, Language::En];

    pub fn code(&self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_lowercase();
        Self::SUPPORTED.into_iter().find(|lang| lang.code() == code)
    }

    /// Language of a POSIX locale string such as `en_US.UTF-8`
    pub fn from_locale(locale: &str) -> Option<Self> {
        locale.get(..2).and_then(Self::from_code)
    }

    /// Stored preference, then system locale, then the default
    pub fn detect(stored: Option<Language>, locale: Option<&str>) -> Language {
        stored
            .or_else(|| locale.and_then(Self::from_locale))
            .unwrap_or_default()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_code(s).ok_or_else(|| SessionError::UnknownLanguage(s.to_string()))
    }
}

/// Nested label tables per language, looked up by dotted key
#[derive(Debug, Clone)]
pub struct Catalog {
    tables: HashMap<Language, toml::Table>,
}

impl Catalog {
    pub fn embedded() -> Result<Self> {
        Self::parse(EMBEDDED_LABELS)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let root: toml::Table = toml::from_str(content)?;
        let tables = Language::SUPPORTED
            .into_iter()
            .filter_map(|lang| {
                root.get(lang.code())
                    .and_then(|v| v.as_table())
                    .map(|table| (lang, table.clone()))
            })
            .collect();
        Ok(Catalog { tables })
    }

    fn lookup(&self, language: Language, key: &str) -> Option<&str> {
        let mut value = self.tables.get(&language)?.get(key.split('.').next()?)?;
        for part in key.split('.').skip(1) {
            value = value.as_table()?.get(part)?;
        }
        value.as_str().filter(|s| !s.is_empty())
    }
}

impl LabelResolver for Catalog {
    /// Requested language, then the default language, then the raw key
    fn resolve(&self, language: Language, key: &str, params: &[String]) -> String {
        let template = self
            .lookup(language, key)
            .or_else(|| self.lookup(Language::default(), key))
            .unwrap_or(key);

        params
            .iter()
            .enumerate()
            .fold(template.to_string(), |text, (idx, param)| {
                text.replace(&format!("{{{}}}", idx), param)
            })
    }
}
