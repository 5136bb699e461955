/// User preferences stored alongside the boards.
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::storage::StorageError;
use crate::store::PersistentStore;
use crate::types::LANGUAGE_KEY;

/// UI language, persisted as its two-letter code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Tr,
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Tr => "tr",
            Language::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "tr" => Some(Language::Tr),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

pub fn language(store: &PersistentStore) -> Language {
    store.get(LANGUAGE_KEY, Language::default())
}

pub fn set_language(store: &PersistentStore, language: Language) -> Result<(), StorageError> {
    store.set(LANGUAGE_KEY, &language)
}
