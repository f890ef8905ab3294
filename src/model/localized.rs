use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Text keyed by locale code.
///
/// A missing locale reads as the empty string; there is no fallback to
/// another locale's text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalizedText(BTreeMap<String, String>);

impl LocalizedText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }

    /// Text for `locale`, or `""` when no translation was supplied.
    pub fn get_or_empty(&self, locale: &str) -> &str {
        self.get(locale).unwrap_or("")
    }

    pub fn set(&mut self, locale: impl Into<String>, text: impl Into<String>) {
        self.0.insert(locale.into(), text.into());
    }

    /// Merge `other` into `self`: new locales are added, existing ones overwritten.
    pub fn merge(&mut self, other: LocalizedText) {
        self.0.extend(other.0);
    }

    /// Drop the given locales. Returns whether any text was removed.
    pub fn remove_locales<'a>(&mut self, locales: impl IntoIterator<Item = &'a str>) -> bool {
        let mut removed = false;
        for locale in locales {
            removed |= self.0.remove(locale).is_some();
        }
        removed
    }

    pub fn locales(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// The `{locale: text}` JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(locale, text)| (locale.clone(), Value::String(text.clone())))
                .collect::<Map<String, Value>>(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LocalizedText {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_empty_falls_back_to_empty_string() {
        let text: LocalizedText = [("en", "Hello")].into_iter().collect();
        assert_eq!(text.get_or_empty("en"), "Hello");
        assert_eq!(text.get_or_empty("fr"), "");
    }

    #[test]
    fn test_merge_keeps_other_locales() {
        let mut text: LocalizedText = [("en", "A"), ("fr", "B")].into_iter().collect();
        text.merge([("fr", "C"), ("de", "D")].into_iter().collect());
        assert_eq!(text.get("en"), Some("A"));
        assert_eq!(text.get("fr"), Some("C"));
        assert_eq!(text.get("de"), Some("D"));
        assert_eq!(text.len(), 3);
    }

    #[test]
    fn test_remove_locales() {
        let mut text: LocalizedText = [("en", "A"), ("it", "B")].into_iter().collect();
        assert!(text.remove_locales(["it", "ru"]));
        assert_eq!(text.locales().collect::<Vec<_>>(), vec!["en"]);
        assert!(!text.remove_locales(["it"]));
    }

    #[test]
    fn test_to_json_matches_serde_form() {
        let text: LocalizedText = [("en", "A"), ("it", "B")].into_iter().collect();
        assert_eq!(text.to_json(), serde_json::json!({"en": "A", "it": "B"}));
        assert_eq!(text.to_json(), serde_json::to_value(&text).unwrap());
    }

    #[test]
    fn test_serializes_as_plain_object() {
        let text: LocalizedText = [("en", "A")].into_iter().collect();
        assert_eq!(serde_json::to_string(&text).unwrap(), r#"{"en":"A"}"#);
    }
}
