//! The set of locales enabled on this node.
//!
//! One `enabled_language` marker record per locale; the default locale lives
//! on the `node` singleton. Every mutation keeps `default ∈ enabled` and
//! `|enabled| ≥ 1`.

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::db::{Filter, Tx};
use crate::error::{Error, Result};
use crate::i18n::appdata::BootstrapSource;
use crate::model::models::{
    ALL, CUSTOM_TEXTS, ENABLED_LANGUAGE, LOCALIZED_CONFIG, NODE, SINGLETON_ID,
};
use crate::model::{AttributeSchema, Entity, Input};

/// View of the enabled locales inside one transaction.
pub struct EnabledLanguageSet<'t, 'c> {
    tx: &'t Tx<'c>,
}

impl<'t, 'c> EnabledLanguageSet<'t, 'c> {
    pub fn new(tx: &'t Tx<'c>) -> Self {
        Self { tx }
    }

    /// Enabled locale codes, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut codes: Vec<String> = self
            .tx
            .find(&ENABLED_LANGUAGE, &Filter::All)?
            .into_iter()
            .map(|marker| marker.id().to_string())
            .collect();
        codes.sort();
        Ok(codes)
    }

    pub fn contains(&self, code: &str) -> Result<bool> {
        self.tx.exists(&ENABLED_LANGUAGE, code)
    }

    pub fn default_language(&self) -> Result<String> {
        let node = self.tx.get(&NODE, SINGLETON_ID)?;
        Ok(node.text("default_language").unwrap_or_default().to_string())
    }

    /// Make `code` the default locale. It must already be enabled.
    pub fn set_default(&self, code: &str) -> Result<()> {
        if !self.contains(code)? {
            return Err(Error::InvalidInput(format!(
                "default language '{}' is not enabled",
                code
            )));
        }

        let mut node = singleton(self.tx, &NODE)?;
        node.update(&object(json!({ "default_language": code })))?;
        self.tx.save(&node)
    }

    /// Enable `code`, seeding its localized configuration from `bootstrap`.
    ///
    /// Returns `false` without touching anything when `code` is already enabled.
    pub fn add_language(&self, code: &str, bootstrap: &dyn BootstrapSource) -> Result<bool> {
        if self.contains(code)? {
            debug!("Language {} already enabled", code);
            return Ok(false);
        }

        self.tx.insert(&Entity::with_id(&ENABLED_LANGUAGE, code))?;

        for &schema in LOCALIZED_CONFIG {
            let mut entity = singleton(self.tx, schema)?;
            entity.update(&bootstrap.localized_defaults(schema, code))?;
            self.tx.save(&entity)?;
        }

        info!("Enabled language {}", code);
        Ok(true)
    }

    /// Disable `codes`: drop their markers, their custom text overrides and
    /// their text in every localized field of every record.
    ///
    /// Users are not reassigned here; callers must move them off the removed
    /// locales first. Refuses to remove the default locale or to leave the
    /// set empty.
    pub fn remove_languages(&self, codes: &[String]) -> Result<usize> {
        if codes.is_empty() {
            return Ok(0);
        }

        let default_language = self.default_language()?;
        if codes.iter().any(|code| *code == default_language) {
            return Err(Error::InvalidInput(format!(
                "cannot disable the default language '{}'",
                default_language
            )));
        }

        let remaining = self
            .list()?
            .into_iter()
            .filter(|code| !codes.contains(code))
            .count();
        if remaining == 0 {
            return Err(Error::InvalidInput("No languages enabled!".to_string()));
        }

        let removed = self.tx.delete(&ENABLED_LANGUAGE, &Filter::ids(codes.iter().cloned()))?;
        let overrides = self.tx.delete(&CUSTOM_TEXTS, &Filter::ids(codes.iter().cloned()))?;

        let locales: Vec<&str> = codes.iter().map(String::as_str).collect();
        let mut pruned = 0;
        for &schema in ALL {
            if schema.localized_fields().next().is_none() {
                continue;
            }
            for mut entity in self.tx.find(schema, &Filter::All)? {
                if entity.remove_locales(&locales) {
                    self.tx.save(&entity)?;
                    pruned += 1;
                }
            }
        }

        info!(
            "Disabled languages {:?} ({} custom text records dropped, {} records pruned)",
            codes, overrides, pruned
        );
        Ok(removed)
    }
}

/// The singleton record of `schema`, or a fresh one at its defaults.
pub(crate) fn singleton(tx: &Tx<'_>, schema: &'static AttributeSchema) -> Result<Entity> {
    Ok(tx
        .find_one(schema, &Filter::id(SINGLETON_ID))?
        .unwrap_or_else(|| Entity::with_id(schema, SINGLETON_ID)))
}

pub(crate) fn object(value: Value) -> Input {
    match value {
        Value::Object(map) => map,
        _ => Input::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::i18n::appdata::AppData;
    use crate::model::models::{CONTEXT, NODE_L10N, NOTIFICATION_L10N, USER};

    // ==================== Helper Functions ====================

    fn appdata() -> AppData {
        AppData::from_json(
            r#"{
                "node": {"presentation": {"en": "Welcome", "it": "Benvenuto"}},
                "templates": {"tip_mail_title": {"en": "New tip", "it": "Nuova segnalazione"}}
            }"#,
        )
        .unwrap()
    }

    /// A node with `en` enabled and set as default.
    fn create_test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.transact(|tx| {
            tx.save(&Entity::with_id(&NODE, SINGLETON_ID))?;
            let set = EnabledLanguageSet::new(tx);
            set.add_language("en", &appdata())?;
            set.set_default("en")
        })
        .unwrap();
        db
    }

    // ==================== Add Tests ====================

    #[test]
    fn test_add_language_seeds_localized_config() {
        let db = create_test_db();
        let added = db
            .transact(|tx| EnabledLanguageSet::new(tx).add_language("it", &appdata()))
            .unwrap();
        assert!(added);

        let (node_l10n, templates) = db
            .transact(|tx| Ok((tx.get(&NODE_L10N, SINGLETON_ID)?, tx.get(&NOTIFICATION_L10N, SINGLETON_ID)?)))
            .unwrap();
        let presentation = node_l10n.localized("presentation").unwrap();
        assert_eq!(presentation.get("en"), Some("Welcome"));
        assert_eq!(presentation.get("it"), Some("Benvenuto"));
        assert_eq!(
            templates.localized("tip_mail_title").unwrap().get("it"),
            Some("Nuova segnalazione")
        );
    }

    #[test]
    fn test_add_existing_language_is_noop() {
        let db = create_test_db();
        db.transact(|tx| {
            let mut l10n = tx.get(&NODE_L10N, SINGLETON_ID)?;
            l10n.update(&object(json!({"presentation": {"en": "Edited"}})))?;
            tx.save(&l10n)
        })
        .unwrap();

        let added = db
            .transact(|tx| EnabledLanguageSet::new(tx).add_language("en", &appdata()))
            .unwrap();
        assert!(!added);

        let l10n = db.transact(|tx| tx.get(&NODE_L10N, SINGLETON_ID)).unwrap();
        assert_eq!(l10n.localized("presentation").unwrap().get("en"), Some("Edited"));
    }

    #[test]
    fn test_list_and_contains() {
        let db = create_test_db();
        db.transact(|tx| EnabledLanguageSet::new(tx).add_language("de", &AppData::default()))
            .unwrap();

        db.transact(|tx| {
            let set = EnabledLanguageSet::new(tx);
            assert_eq!(set.list()?, vec!["de", "en"]);
            assert!(set.contains("de")?);
            assert!(!set.contains("fr")?);
            Ok(())
        })
        .unwrap();
    }

    // ==================== Default Tests ====================

    #[test]
    fn test_set_default_requires_enabled_language() {
        let db = create_test_db();
        let err = db
            .transact(|tx| EnabledLanguageSet::new(tx).set_default("fr"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(
            db.transact(|tx| EnabledLanguageSet::new(tx).default_language()).unwrap(),
            "en"
        );
    }

    // ==================== Remove Tests ====================

    #[test]
    fn test_remove_drops_markers_overrides_and_locales() {
        let db = create_test_db();
        db.transact(|tx| {
            EnabledLanguageSet::new(tx).add_language("it", &appdata())?;
            let mut texts = Entity::with_id(&CUSTOM_TEXTS, "it");
            texts.update(&object(json!({"texts": {"submit": "Invia"}})))?;
            tx.save(&texts)
        })
        .unwrap();

        let removed = db
            .transact(|tx| EnabledLanguageSet::new(tx).remove_languages(&["it".to_string()]))
            .unwrap();
        assert_eq!(removed, 1);

        db.transact(|tx| {
            assert_eq!(EnabledLanguageSet::new(tx).list()?, vec!["en"]);
            assert!(!tx.exists(&CUSTOM_TEXTS, "it")?);
            let l10n = tx.get(&NODE_L10N, SINGLETON_ID)?;
            let presentation = l10n.localized("presentation").unwrap();
            assert_eq!(presentation.get("it"), None);
            assert_eq!(presentation.get("en"), Some("Welcome"));
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_remove_prunes_every_localized_record() {
        let db = create_test_db();
        db.transact(|tx| {
            EnabledLanguageSet::new(tx).add_language("it", &appdata())?;
            let context = Entity::from_input(
                &CONTEXT,
                &object(json!({"id": "ctx1", "name": {"en": "A", "it": "B"}})),
            )?;
            tx.insert(&context)?;
            let user = Entity::from_input(
                &USER,
                &object(json!({"id": "u1", "language": "en", "description": {"it": "Ciao"}})),
            )?;
            tx.insert(&user)
        })
        .unwrap();

        db.transact(|tx| EnabledLanguageSet::new(tx).remove_languages(&["it".to_string()]))
            .unwrap();

        let (context, user) = db
            .transact(|tx| Ok((tx.get(&CONTEXT, "ctx1")?, tx.get(&USER, "u1")?)))
            .unwrap();
        let name = context.localized("name").unwrap();
        assert_eq!(name.locales().collect::<Vec<_>>(), vec!["en"]);
        assert_eq!(name.get("en"), Some("A"));
        assert!(user.localized("description").unwrap().is_empty());
    }

    #[test]
    fn test_reenabled_language_does_not_revive_old_text() {
        let db = create_test_db();
        db.transact(|tx| {
            EnabledLanguageSet::new(tx).add_language("it", &AppData::default())?;
            tx.insert(&Entity::from_input(
                &CONTEXT,
                &object(json!({"id": "ctx1", "name": {"en": "A", "it": "B"}})),
            )?)
        })
        .unwrap();

        db.transact(|tx| {
            let set = EnabledLanguageSet::new(tx);
            set.remove_languages(&["it".to_string()])?;
            set.add_language("it", &AppData::default())
        })
        .unwrap();

        let context = db.transact(|tx| tx.get(&CONTEXT, "ctx1")).unwrap();
        assert_eq!(context.localized("name").unwrap().get("it"), None);
        assert_eq!(context.serialize("it")["name"], json!(""));
    }

    #[test]
    fn test_remove_default_is_refused() {
        let db = create_test_db();
        db.transact(|tx| EnabledLanguageSet::new(tx).add_language("it", &appdata()))
            .unwrap();

        let err = db
            .transact(|tx| EnabledLanguageSet::new(tx).remove_languages(&["en".to_string()]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(
            db.transact(|tx| EnabledLanguageSet::new(tx).list()).unwrap(),
            vec!["en", "it"]
        );
    }

    #[test]
    fn test_remove_nothing() {
        let db = create_test_db();
        let removed = db
            .transact(|tx| EnabledLanguageSet::new(tx).remove_languages(&[]))
            .unwrap();
        assert_eq!(removed, 0);
    }
}
