//! Translation service
//!
//! - Nested string tables for English (`en`) and Marathi (`mr`)
//! - Dotted-key lookup falling back to English, then to the key itself
//! - The chosen language is persisted under `selectedLanguage` in a
//!   preference store and broadcast to subscribers

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Preference key holding the selected language code
pub const LANGUAGE_KEY: &str = "selectedLanguage";

const EN_TABLE: &str = include_str!("../locales/en.json");
const MR_TABLE: &str = include_str!("../locales/mr.json");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Mr,
}

impl Language {
    pub const ALL: &'static [Language] = &[Language::En, Language::Mr];

    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Mr => "mr",
        }
    }

    /// Name of the language in the language itself
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Mr => "मराठी",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unsupported language: {0}")]
pub struct UnsupportedLanguage(pub String);

impl FromStr for Language {
    type Err = UnsupportedLanguage;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "en" => Ok(Language::En),
            "mr" => Ok(Language::Mr),
            other => Err(UnsupportedLanguage(other.to_string())),
        }
    }
}

#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("Preference file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Preference file is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// Key/value storage for user preferences
#[cfg_attr(test, mockall::automock)]
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError>;
    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// Preferences kept as a flat JSON object in a file
pub struct JsonPreferenceFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonPreferenceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, PreferenceError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(Map::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl PreferenceStore for JsonPreferenceFile {
    fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let values = self.read_all()?;
        Ok(values.get(key).and_then(Value::as_str).map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut values = self.read_all()?;
        values.insert(key.to_string(), Value::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&values)?)?;
        Ok(())
    }
}

fn parse_table(language: Language, raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(%language, "translation table unreadable: {}", e);
        Value::Object(Map::new())
    })
}

/// Built-in translation tables
pub fn builtin_tables() -> HashMap<Language, Value> {
    HashMap::from([
        (Language::En, parse_table(Language::En, EN_TABLE)),
        (Language::Mr, parse_table(Language::Mr, MR_TABLE)),
    ])
}

fn lookup<'a>(table: &'a Value, key: &str) -> Option<&'a str> {
    key.split('.')
        .try_fold(table, |node, part| node.get(part))
        .and_then(Value::as_str)
}

pub struct Translator {
    tables: HashMap<Language, Value>,
    language: watch::Sender<Language>,
    store: Option<Box<dyn PreferenceStore>>,
}

impl Translator {
    /// Translator restoring the saved language from `store`.
    ///
    /// An unreadable store or an unknown saved value leaves English selected.
    pub fn new(store: Box<dyn PreferenceStore>) -> Self {
        let saved = match store.get(LANGUAGE_KEY) {
            Ok(saved) => saved,
            Err(e) => {
                warn!("could not read the saved language: {}", e);
                None
            }
        };
        let language = saved
            .as_deref()
            .and_then(|code| code.parse::<Language>().ok())
            .unwrap_or_default();
        debug!(%language, "translator ready");

        let (sender, _) = watch::channel(language);
        Self {
            tables: builtin_tables(),
            language: sender,
            store: Some(store),
        }
    }

    /// Translator that does not persist the selection
    pub fn in_memory(language: Language) -> Self {
        let (sender, _) = watch::channel(language);
        Self {
            tables: builtin_tables(),
            language: sender,
            store: None,
        }
    }

    pub fn with_tables(mut self, tables: HashMap<Language, Value>) -> Self {
        self.tables = tables;
        self
    }

    pub fn current(&self) -> Language {
        *self.language.borrow()
    }

    /// Switches language, notifies subscribers, then persists the choice.
    ///
    /// The switch takes effect even when persisting fails.
    pub fn set_language(&self, language: Language) -> Result<(), PreferenceError> {
        self.language.send_replace(language);
        match &self.store {
            Some(store) => store.set(LANGUAGE_KEY, language.code()),
            None => Ok(()),
        }
    }

    /// Receiver that observes every language change
    pub fn subscribe(&self) -> watch::Receiver<Language> {
        self.language.subscribe()
    }

    pub fn translate(&self, key: &str) -> String {
        self.translate_in(self.current(), key)
    }

    /// Looks `key` up in `language`, then in English, else returns the key
    pub fn translate_in(&self, language: Language, key: &str) -> String {
        let found = self
            .tables
            .get(&language)
            .and_then(|table| lookup(table, key))
            .or_else(|| {
                self.tables
                    .get(&Language::En)
                    .and_then(|table| lookup(table, key))
            });
        match found {
            Some(text) => text.to_string(),
            None => key.to_string(),
        }
    }

    /// Raw table of a language
    pub fn table(&self, language: Language) -> Option<&Value> {
        self.tables.get(&language)
    }
}
