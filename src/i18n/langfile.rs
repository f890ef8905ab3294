//! Translation files and operator overrides of their strings.

use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::db::{Filter, Tx};
use crate::error::{Error, Result};
use crate::i18n::registry::LanguageRegistry;
use crate::model::models::CUSTOM_TEXTS;
use crate::model::Entity;
use crate::security::directory_traversal_check;

/// Path of the shipped translation file for `lang`.
///
/// Only locales of the catalogue resolve, which also keeps the path inside
/// `l10n_dir`.
pub fn langfile_path(registry: &LanguageRegistry, l10n_dir: &Path, lang: &str) -> Result<PathBuf> {
    if !registry.is_supported(lang) {
        return Err(Error::not_found("l10n", lang));
    }

    let path = l10n_dir.join(format!("{}.json", lang));
    if !directory_traversal_check(l10n_dir, &path) {
        return Err(Error::InvalidInput(format!("Invalid lang code: {}", lang)));
    }
    Ok(path)
}

/// Shipped translation strings for `lang`, overlaid with the operator's custom texts.
pub fn get_l10n(
    tx: &Tx<'_>,
    registry: &LanguageRegistry,
    l10n_dir: &Path,
    lang: &str,
) -> Result<Map<String, Value>> {
    let path = langfile_path(registry, l10n_dir, lang)?;

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::not_found("l10n", lang)),
        Err(e) => return Err(e.into()),
    };

    let mut texts = match serde_json::from_str::<Value>(&content)? {
        Value::Object(map) => map,
        _ => {
            return Err(Error::InvalidData(format!(
                "{} is not a JSON object",
                path.display()
            )))
        }
    };

    let custom = get_custom_texts(tx, lang)?;
    debug!("Serving {} with {} custom texts", lang, custom.len());
    texts.extend(custom);

    Ok(texts)
}

/// The operator's overrides for `lang`; empty when there are none.
pub fn get_custom_texts(tx: &Tx<'_>, lang: &str) -> Result<Map<String, Value>> {
    let record = tx.find_one(&CUSTOM_TEXTS, &Filter::id(lang))?;
    Ok(record
        .and_then(|r| r.json("texts").and_then(Value::as_object).cloned())
        .unwrap_or_default())
}

/// Merge `texts` into the overrides for `lang`, creating the record if needed.
pub fn update_custom_texts(
    tx: &Tx<'_>,
    registry: &LanguageRegistry,
    lang: &str,
    texts: Map<String, Value>,
) -> Result<Map<String, Value>> {
    if !registry.is_supported(lang) {
        return Err(Error::InvalidInput(format!("Invalid lang code: {}", lang)));
    }
    if let Some((key, _)) = texts.iter().find(|(_, v)| !v.is_string()) {
        return Err(Error::validation("texts", format!("'{}' is not a string", key)));
    }

    let mut merged = get_custom_texts(tx, lang)?;
    merged.extend(texts);

    let mut record = Entity::with_id(&CUSTOM_TEXTS, lang);
    let mut input = Map::new();
    input.insert("texts".to_string(), Value::Object(merged.clone()));
    record.update(&input)?;
    tx.save(&record)?;

    Ok(merged)
}

/// Drop every override for `lang`.
pub fn delete_custom_texts(tx: &Tx<'_>, lang: &str) -> Result<()> {
    match tx.delete(&CUSTOM_TEXTS, &Filter::id(lang))? {
        0 => Err(Error::not_found(CUSTOM_TEXTS.entity_type, lang)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    // ==================== Helper Functions ====================

    fn create_l10n_dir() -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::write(
            dir.path().join("en.json"),
            r#"{"submit": "Submit", "cancel": "Cancel"}"#,
        )
        .unwrap();
        fs::write(dir.path().join("it.json"), r#"["not", "an", "object"]"#).unwrap();
        dir
    }

    fn texts(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    // ==================== Translation File Tests ====================

    #[test]
    fn test_get_l10n_without_overrides() {
        let dir = create_l10n_dir();
        let db = Database::open_in_memory().unwrap();
        let texts = db
            .transact(|tx| get_l10n(tx, LanguageRegistry::get(), dir.path(), "en"))
            .unwrap();
        assert_eq!(texts["submit"], "Submit");
        assert_eq!(texts.len(), 2);
    }

    #[test]
    fn test_get_l10n_overlays_custom_texts() {
        let dir = create_l10n_dir();
        let db = Database::open_in_memory().unwrap();
        let registry = LanguageRegistry::get();

        let result = db
            .transact(|tx| {
                update_custom_texts(tx, registry, "en", texts(json!({"submit": "Send", "extra": "New"})))?;
                get_l10n(tx, registry, dir.path(), "en")
            })
            .unwrap();

        assert_eq!(result["submit"], "Send");
        assert_eq!(result["cancel"], "Cancel");
        assert_eq!(result["extra"], "New");
    }

    #[test]
    fn test_get_l10n_unsupported_or_missing() {
        let dir = create_l10n_dir();
        let db = Database::open_in_memory().unwrap();
        let registry = LanguageRegistry::get();

        for lang in ["../en", "xx", "fr"] {
            let err = db
                .transact(|tx| get_l10n(tx, registry, dir.path(), lang))
                .unwrap_err();
            assert!(matches!(err, Error::NotFound { .. }), "{}: {:?}", lang, err);
        }
    }

    #[test]
    fn test_get_l10n_rejects_non_object_file() {
        let dir = create_l10n_dir();
        let db = Database::open_in_memory().unwrap();
        let err = db
            .transact(|tx| get_l10n(tx, LanguageRegistry::get(), dir.path(), "it"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    // ==================== Custom Texts Tests ====================

    #[test]
    fn test_custom_texts_empty_by_default() {
        let db = Database::open_in_memory().unwrap();
        let texts = db.transact(|tx| get_custom_texts(tx, "en")).unwrap();
        assert!(texts.is_empty());
    }

    #[test]
    fn test_update_custom_texts_merges() {
        let db = Database::open_in_memory().unwrap();
        let registry = LanguageRegistry::get();

        db.transact(|tx| update_custom_texts(tx, registry, "en", texts(json!({"a": "1", "b": "2"}))))
            .unwrap();
        let merged = db
            .transact(|tx| update_custom_texts(tx, registry, "en", texts(json!({"b": "3"}))))
            .unwrap();

        assert_eq!(Value::Object(merged), json!({"a": "1", "b": "3"}));
    }

    #[test]
    fn test_update_custom_texts_validation() {
        let db = Database::open_in_memory().unwrap();
        let registry = LanguageRegistry::get();

        let err = db
            .transact(|tx| update_custom_texts(tx, registry, "xx", texts(json!({"a": "1"}))))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = db
            .transact(|tx| update_custom_texts(tx, registry, "en", texts(json!({"a": 1}))))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_delete_custom_texts() {
        let db = Database::open_in_memory().unwrap();
        let registry = LanguageRegistry::get();
        db.transact(|tx| update_custom_texts(tx, registry, "en", texts(json!({"a": "1"}))))
            .unwrap();

        db.transact(|tx| delete_custom_texts(tx, "en")).unwrap();
        assert!(db.transact(|tx| get_custom_texts(tx, "en")).unwrap().is_empty());

        let err = db.transact(|tx| delete_custom_texts(tx, "en")).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "custom_texts", .. }));
    }
}
