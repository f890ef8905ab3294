//! Node configuration: bootstrap, the admin view and its update.

use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::info;

use crate::db::{Filter, Tx};
use crate::error::{Error, Result};
use crate::i18n::{
    object, singleton, BootstrapLoader, EnabledLanguageSet, LanguageChange,
    LanguageLifecycleManager, LanguageRegistry,
};
use crate::model::models::{
    NODE, NODE_L10N, NOTIFICATION_L10N, PRIVATE, RECEIVER_CONTEXT, SINGLETON_ID,
};
use crate::model::{AttributeSchema, Entity, Input};

/// Software version recorded on first start.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// File whose presence replaces the default landing page.
pub const CUSTOM_HOMEPAGE: &str = "custom_homepage.html";

/// Create the configuration singletons and enable `default_language` on a
/// fresh database. Returns `false` when the node already exists.
pub fn initialize(
    tx: &Tx<'_>,
    registry: &LanguageRegistry,
    bootstrap: &dyn BootstrapLoader,
    default_language: &str,
) -> Result<bool> {
    if tx.exists(&NODE, SINGLETON_ID)? {
        return Ok(false);
    }
    if !registry.is_supported(default_language) {
        return Err(Error::InvalidInput(format!(
            "Invalid lang code: {}",
            default_language
        )));
    }

    for schema in [&NODE, &NODE_L10N, &NOTIFICATION_L10N] {
        tx.insert(&Entity::with_id(schema, SINGLETON_ID))?;
    }

    let mut private = Entity::with_id(&PRIVATE, SINGLETON_ID);
    private.update(&object(serde_json::json!({ "version": VERSION })))?;
    tx.insert(&private)?;

    let languages = EnabledLanguageSet::new(tx);
    languages.add_language(default_language, bootstrap.load()?)?;
    languages.set_default(default_language)?;

    info!("Initialized node with default language {}", default_language);
    Ok(true)
}

/// Builds the flat admin view of the node.
///
/// Three sources are merged: the `node` settings, derived metadata and the
/// `node_l10n` texts for the requested locale. Their key sets are disjoint.
pub struct ConfigAggregator<'a> {
    registry: &'a LanguageRegistry,
    static_path: PathBuf,
    latest_version: String,
}

impl<'a> ConfigAggregator<'a> {
    pub fn new(
        registry: &'a LanguageRegistry,
        static_path: impl Into<PathBuf>,
        latest_version: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            static_path: static_path.into(),
            latest_version: latest_version.into(),
        }
    }

    pub fn snapshot(&self, tx: &Tx<'_>, locale: &str) -> Result<Map<String, Value>> {
        let node = tx.get(&NODE, SINGLETON_ID)?;
        let l10n = singleton(tx, &NODE_L10N)?;

        let mut out = node.serialize(locale);
        out.extend(self.misc(tx)?);
        out.extend(l10n.serialize(locale));
        Ok(out)
    }

    fn misc(&self, tx: &Tx<'_>) -> Result<Map<String, Value>> {
        let private = singleton(tx, &PRIVATE)?;
        let languages_enabled = EnabledLanguageSet::new(tx).list()?;
        let configured = tx.count(&RECEIVER_CONTEXT, &Filter::All)? > 0;
        let custom_homepage = self.static_path.join(CUSTOM_HOMEPAGE).is_file();

        let mut misc = Map::new();
        misc.insert(
            "version".to_string(),
            Value::String(private.text("version").unwrap_or_default().to_string()),
        );
        misc.insert(
            "latest_version".to_string(),
            Value::String(self.latest_version.clone()),
        );
        misc.insert(
            "languages_supported".to_string(),
            self.registry.languages_supported(),
        );
        misc.insert(
            "languages_enabled".to_string(),
            Value::Array(languages_enabled.into_iter().map(Value::String).collect()),
        );
        misc.insert("configured".to_string(), Value::Bool(configured));
        misc.insert("custom_homepage".to_string(), Value::Bool(custom_homepage));
        Ok(misc)
    }
}

/// Apply an admin update of the node and return the new admin view for
/// `language`.
///
/// The language change runs first; flat localized values in the request are
/// then stored for `language` (when it stays enabled) and the remaining
/// settings go to `node`. Basic auth stays on only with both credentials.
pub fn update_node(
    tx: &Tx<'_>,
    lifecycle: &LanguageLifecycleManager<'_>,
    aggregator: &ConfigAggregator<'_>,
    request: &Input,
    language: &str,
) -> Result<Map<String, Value>> {
    let change = LanguageChange::from_request(request)?;
    lifecycle.apply(tx, &change)?;

    if change.languages_enabled.iter().any(|code| code == language) {
        let mut l10n = singleton(tx, &NODE_L10N)?;
        l10n.update(&localize(&NODE_L10N, request, language))?;
        tx.save(&l10n)?;
    }

    let mut node = tx.get(&NODE, SINGLETON_ID)?;
    node.update(request)?;

    let basic_auth = ["basic_auth", "basic_auth_username", "basic_auth_password"]
        .iter()
        .all(|key| is_truthy(request.get(*key)));
    if !basic_auth {
        node.update(&object(serde_json::json!({ "basic_auth": false })))?;
    }
    tx.save(&node)?;

    aggregator.snapshot(tx, language)
}

/// Wrap the flat localized values of `request` as `{field: {language: value}}`.
fn localize(schema: &AttributeSchema, request: &Input, language: &str) -> Input {
    schema
        .localized_fields()
        .filter_map(|name| {
            let value = request.get(name).filter(|v| !v.is_null())?;
            let mut by_locale = Map::new();
            by_locale.insert(language.to_string(), value.clone());
            Some((name.to_string(), Value::Object(by_locale)))
        })
        .collect()
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// Process-side copy of the node settings consulted on every request.
///
/// Rebuilt from the database after each node update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMemory {
    pub hostname: String,
    pub allow_indexing: bool,
    pub languages_enabled: Vec<String>,
    pub default_language: String,
    pub latest_version: String,
}

impl NodeMemory {
    pub fn load(tx: &Tx<'_>, latest_version: &str) -> Result<Self> {
        let node = tx.get(&NODE, SINGLETON_ID)?;
        let languages = EnabledLanguageSet::new(tx);

        Ok(Self {
            hostname: node.text("hostname").unwrap_or_default().to_string(),
            allow_indexing: node.boolean("allow_indexing").unwrap_or(false),
            languages_enabled: languages.list()?,
            default_language: languages.default_language()?,
            latest_version: latest_version.to_string(),
        })
    }
}
