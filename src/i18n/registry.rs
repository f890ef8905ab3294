//! Language registry: the fixed catalogue of locales the platform ships
//! translations for.
//!
//! Requested locale codes are validated against this catalogue before any
//! language is enabled. It uses a singleton pattern with `OnceLock` to ensure
//! thread-safe initialization and access.

use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

/// A supported locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LanguageConfig {
    /// Locale code as used in translation file names (e.g., "en", "pt_BR")
    pub code: &'static str,

    /// English name of the language (e.g., "Portuguese (Brazil)")
    pub name: &'static str,

    /// Native name of the language (e.g., "Português (Brasil)")
    #[serde(skip)]
    pub native_name: &'static str,
}

impl LanguageConfig {
    pub const fn new(code: &'static str, name: &'static str, native_name: &'static str) -> Self {
        Self {
            code,
            name,
            native_name,
        }
    }
}

/// The supported-locale catalogue.
///
/// The process-wide instance is immutable; tests may build their own with
/// [`LanguageRegistry::with_languages`].
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
}

/// Global registry instance (initialized lazily)
static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global language registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            languages: SUPPORTED.to_vec(),
        })
    }

    /// A registry restricted to the given languages.
    pub fn with_languages(languages: Vec<LanguageConfig>) -> Self {
        Self { languages }
    }

    /// Get a language configuration by its code.
    pub fn get_by_code(&self, code: &str) -> Option<&LanguageConfig> {
        self.languages.iter().find(|lang| lang.code == code)
    }

    pub fn is_supported(&self, code: &str) -> bool {
        self.get_by_code(code).is_some()
    }

    /// Get all languages, in catalogue order.
    pub fn list_all(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().collect()
    }

    pub fn codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.languages.iter().map(|lang| lang.code)
    }

    /// The `languages_supported` list exposed to clients:
    /// `[{"code": "en", "name": "English"}, ...]`.
    pub fn languages_supported(&self) -> Value {
        serde_json::to_value(&self.languages).unwrap_or(Value::Array(Vec::new()))
    }
}

const SUPPORTED: &[LanguageConfig] = &[
    LanguageConfig::new("ar", "Arabic", "العربية"),
    LanguageConfig::new("bs", "Bosnian", "Bosanski"),
    LanguageConfig::new("ca", "Catalan", "Català"),
    LanguageConfig::new("cs", "Czech", "Čeština"),
    LanguageConfig::new("da", "Danish", "Dansk"),
    LanguageConfig::new("de", "German", "Deutsch"),
    LanguageConfig::new("el", "Greek", "Ελληνικά"),
    LanguageConfig::new("en", "English", "English"),
    LanguageConfig::new("es", "Spanish", "Español"),
    LanguageConfig::new("fa", "Persian", "فارسی"),
    LanguageConfig::new("fr", "French", "Français"),
    LanguageConfig::new("he", "Hebrew", "עברית"),
    LanguageConfig::new("hr", "Croatian", "Hrvatski"),
    LanguageConfig::new("hu", "Hungarian", "Magyar"),
    LanguageConfig::new("it", "Italian", "Italiano"),
    LanguageConfig::new("ja", "Japanese", "日本語"),
    LanguageConfig::new("ka", "Georgian", "ქართული"),
    LanguageConfig::new("ko", "Korean", "한국어"),
    LanguageConfig::new("nb_NO", "Norwegian Bokmål", "Norsk bokmål"),
    LanguageConfig::new("nl", "Dutch", "Nederlands"),
    LanguageConfig::new("pl", "Polish", "Polski"),
    LanguageConfig::new("pt_BR", "Portuguese (Brazil)", "Português (Brasil)"),
    LanguageConfig::new("pt_PT", "Portuguese (Portugal)", "Português (Portugal)"),
    LanguageConfig::new("ro", "Romanian", "Română"),
    LanguageConfig::new("ru", "Russian", "Русский"),
    LanguageConfig::new("sk", "Slovak", "Slovenčina"),
    LanguageConfig::new("sl", "Slovenian", "Slovenščina"),
    LanguageConfig::new("sq", "Albanian", "Shqip"),
    LanguageConfig::new("sv", "Swedish", "Svenska"),
    LanguageConfig::new("ta", "Tamil", "தமிழ்"),
    LanguageConfig::new("th", "Thai", "ไทย"),
    LanguageConfig::new("tr", "Turkish", "Türkçe"),
    LanguageConfig::new("uk", "Ukrainian", "Українська"),
    LanguageConfig::new("ur", "Urdu", "اردو"),
    LanguageConfig::new("vi", "Vietnamese", "Tiếng Việt"),
    LanguageConfig::new("zh_CN", "Chinese (China)", "中文(简体)"),
    LanguageConfig::new("zh_TW", "Chinese (Taiwan)", "中文(繁體)"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_get_returns_singleton() {
        let registry1 = LanguageRegistry::get();
        let registry2 = LanguageRegistry::get();

        // Should return the same instance (same memory address)
        assert!(std::ptr::eq(registry1, registry2));
    }

    #[test]
    fn test_get_by_code_english() {
        let config = LanguageRegistry::get().get_by_code("en").unwrap();
        assert_eq!(config.code, "en");
        assert_eq!(config.name, "English");
    }

    #[test]
    fn test_get_by_code_regional_variant() {
        let config = LanguageRegistry::get().get_by_code("pt_BR").unwrap();
        assert_eq!(config.native_name, "Português (Brasil)");
    }

    #[test]
    fn test_unknown_codes_are_unsupported() {
        let registry = LanguageRegistry::get();
        assert!(!registry.is_supported("xx"));
        assert!(!registry.is_supported(""));
        assert!(!registry.is_supported("../en"));
        assert!(!registry.is_supported("EN"));
    }

    #[test]
    fn test_codes_are_unique() {
        let registry = LanguageRegistry::get();
        let codes: HashSet<_> = registry.codes().collect();
        assert_eq!(codes.len(), registry.list_all().len());
    }

    #[test]
    fn test_languages_supported_shape() {
        let list = LanguageRegistry::get().languages_supported();
        let first = &list.as_array().unwrap()[0];
        assert_eq!(first["code"], "ar");
        assert_eq!(first["name"], "Arabic");
        assert!(first.get("native_name").is_none());
    }

    #[test]
    fn test_restricted_registry() {
        let registry = LanguageRegistry::with_languages(vec![
            LanguageConfig::new("en", "English", "English"),
            LanguageConfig::new("it", "Italian", "Italiano"),
        ]);
        assert!(registry.is_supported("it"));
        assert!(!registry.is_supported("fr"));
        assert_eq!(registry.codes().collect::<Vec<_>>(), vec!["en", "it"]);
    }
}
