use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Locale every program is required to provide text for.
pub const DEFAULT_LOCALE: &str = "en-US";

/// Operator-entered text in one or more locales.
///
/// Lookups fall back to the default locale, which is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedStrings {
    translations: BTreeMap<String, String>,
}

impl LocalizedStrings {
    /// Build a set of strings with only the default-locale text.
    pub fn of(text: impl Into<String>) -> Self {
        let mut translations = BTreeMap::new();
        translations.insert(DEFAULT_LOCALE.to_string(), text.into());
        Self { translations }
    }

    pub fn with(mut self, locale: &str, text: impl Into<String>) -> Self {
        self.translations.insert(locale.to_string(), text.into());
        self
    }

    /// The text for `locale`, falling back to the default locale.
    pub fn get(&self, locale: &str) -> &str {
        self.translations
            .get(locale)
            .unwrap_or_else(|| &self.translations[DEFAULT_LOCALE])
    }

    pub fn default_text(&self) -> &str {
        &self.translations[DEFAULT_LOCALE]
    }

    pub fn supports(&self, locale: &str) -> bool {
        self.translations.contains_key(locale)
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.translations.keys().map(String::as_str)
    }
}
