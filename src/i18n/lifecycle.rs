//! Applying a requested set of enabled locales.

use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::db::{Filter, Tx};
use crate::error::{Error, Result};
use crate::i18n::appdata::{BootstrapLoader, BootstrapSource};
use crate::i18n::enabled::EnabledLanguageSet;
use crate::i18n::registry::LanguageRegistry;
use crate::model::models::USER;
use crate::model::Input;

/// Requested language configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageChange {
    /// Requested locales, duplicates removed, in request order.
    pub languages_enabled: Vec<String>,
    pub default_language: String,
}

impl LanguageChange {
    pub fn new<I, S>(languages_enabled: I, default_language: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = BTreeSet::new();
        let languages_enabled = languages_enabled
            .into_iter()
            .map(|code| -> String { code.into() })
            .filter(|code| seen.insert(code.clone()))
            .collect();

        Self {
            languages_enabled,
            default_language: default_language.into(),
        }
    }

    /// Read `languages_enabled` and `default_language` from a request body.
    pub fn from_request(request: &Input) -> Result<Self> {
        let languages = match request.get("languages_enabled") {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        Error::validation("languages_enabled", "expected a list of locale codes")
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            _ => {
                return Err(Error::validation(
                    "languages_enabled",
                    "expected a list of locale codes",
                ))
            }
        };

        let default_language = request
            .get("default_language")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::validation("default_language", "expected a locale code"))?;

        Ok(Self::new(languages, default_language))
    }

    /// Whether applying this change on top of `enabled` would enable a
    /// supported locale that is not enabled yet.
    pub fn adds_languages(&self, registry: &LanguageRegistry, enabled: &[String]) -> bool {
        self.languages_enabled
            .iter()
            .any(|code| registry.is_supported(code) && !enabled.contains(code))
    }
}

/// What a language change did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageChangeReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub reassigned_users: usize,
}

/// Moves the node from its current enabled locales to a requested set.
///
/// Steps run in a fixed order inside the caller's transaction: validate the
/// whole request, enable new locales, set the default, reassign users off
/// the removed locales, and only then remove them.
pub struct LanguageLifecycleManager<'a> {
    registry: &'a LanguageRegistry,
    bootstrap: &'a dyn BootstrapLoader,
}

impl<'a> LanguageLifecycleManager<'a> {
    pub fn new(registry: &'a LanguageRegistry, bootstrap: &'a dyn BootstrapLoader) -> Self {
        Self {
            registry,
            bootstrap,
        }
    }

    pub fn apply(&self, tx: &Tx<'_>, change: &LanguageChange) -> Result<LanguageChangeReport> {
        self.validate(change)?;

        let set = EnabledLanguageSet::new(tx);
        let current = set.list()?;
        let mut report = LanguageChangeReport::default();

        let to_add: Vec<&String> = change
            .languages_enabled
            .iter()
            .filter(|code| !current.contains(code))
            .collect();

        if !to_add.is_empty() {
            // loaded once, and only when something is actually being added
            let bootstrap: &dyn BootstrapSource = self.bootstrap.load()?;
            for code in to_add {
                debug!("Adding a new lang {}", code);
                if set.add_language(code, bootstrap)? {
                    report.added.push(code.clone());
                }
            }
        }

        set.set_default(&change.default_language)?;

        let to_remove: Vec<String> = current
            .into_iter()
            .filter(|code| !change.languages_enabled.contains(code))
            .collect();

        if !to_remove.is_empty() {
            report.reassigned_users = tx.bulk_set(
                &USER,
                &Filter::In(
                    "language",
                    to_remove.iter().cloned().map(Value::String).collect(),
                ),
                "language",
                &Value::String(change.default_language.clone()),
            )?;
            set.remove_languages(&to_remove)?;
            report.removed = to_remove;
        }

        info!(
            "Language change applied: added {:?}, removed {:?}, {} users reassigned to {}",
            report.added, report.removed, report.reassigned_users, change.default_language
        );
        Ok(report)
    }

    /// Every check that can reject the request, run before any mutation.
    fn validate(&self, change: &LanguageChange) -> Result<()> {
        if change.languages_enabled.is_empty() {
            return Err(Error::InvalidInput("No languages enabled!".to_string()));
        }

        if !change.languages_enabled.contains(&change.default_language) {
            return Err(Error::InvalidInput(format!(
                "Invalid lang code for chosen default_language: {}",
                change.default_language
            )));
        }

        if let Some(code) = change
            .languages_enabled
            .iter()
            .find(|code| !self.registry.is_supported(code))
        {
            return Err(Error::InvalidInput(format!("Invalid lang code: {}", code)));
        }

        Ok(())
    }
}
