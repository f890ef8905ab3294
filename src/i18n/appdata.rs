//! Shipped application data: default localized texts used to seed a newly
//! enabled language.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::info;

use crate::error::Result;
use crate::model::models::{NODE_L10N, NOTIFICATION_L10N};
use crate::model::{AttributeSchema, Input};

/// Field name -> locale -> text.
pub type LocalizedDefaults = BTreeMap<String, BTreeMap<String, String>>;

/// Read-only provider of default localized text.
pub trait BootstrapSource {
    /// Partial update input seeding `locale` on `schema`: every field the
    /// source knows about, as `{field: {locale: text}}`.
    fn localized_defaults(&self, schema: &AttributeSchema, locale: &str) -> Input;
}

/// Loads the bootstrap source on demand.
pub trait BootstrapLoader: Send + Sync {
    fn load(&self) -> Result<&dyn BootstrapSource>;
}

/// Contents of `appdata.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppData {
    /// Defaults for `node_l10n`.
    #[serde(default)]
    pub node: LocalizedDefaults,

    /// Defaults for `notification_l10n`.
    #[serde(default)]
    pub templates: LocalizedDefaults,
}

impl AppData {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    fn section(&self, schema: &AttributeSchema) -> Option<&LocalizedDefaults> {
        if schema.entity_type == NODE_L10N.entity_type {
            Some(&self.node)
        } else if schema.entity_type == NOTIFICATION_L10N.entity_type {
            Some(&self.templates)
        } else {
            None
        }
    }
}

impl BootstrapSource for AppData {
    fn localized_defaults(&self, schema: &AttributeSchema, locale: &str) -> Input {
        let mut input = Map::new();
        let Some(section) = self.section(schema) else {
            return input;
        };

        for name in schema.localized_fields() {
            if let Some(text) = section.get(name).and_then(|by_locale| by_locale.get(locale)) {
                let mut value = Map::new();
                value.insert(locale.to_string(), Value::String(text.clone()));
                input.insert(name.to_string(), Value::Object(value));
            }
        }
        input
    }
}

impl BootstrapLoader for AppData {
    fn load(&self) -> Result<&dyn BootstrapSource> {
        Ok(self)
    }
}

/// `appdata.json` on disk, read at most once per process.
pub struct AppDataFile {
    path: PathBuf,
    cache: OnceLock<AppData>,
}

impl AppDataFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceLock::new(),
        }
    }
}

impl BootstrapLoader for AppDataFile {
    fn load(&self) -> Result<&dyn BootstrapSource> {
        if let Some(data) = self.cache.get() {
            return Ok(data);
        }

        let data = AppData::from_json(&std::fs::read_to_string(&self.path)?)?;
        info!("Loaded application data from {}", self.path.display());
        Ok(self.cache.get_or_init(|| data))
    }
}
