//! Internationalization: which locales a node offers and how they change.
//!
//! # Architecture
//!
//! - `registry`: the fixed catalogue of supported locales
//! - `appdata`: shipped default texts used to seed a newly enabled locale
//! - `enabled`: the persisted set of enabled locales and the default one
//! - `lifecycle`: applying a requested locale set, cascading to users
//! - `langfile`: translation files and operator custom texts
//!
//! # Example
//!
//! ```rust,ignore
//! use whistle_node::i18n::{LanguageChange, LanguageLifecycleManager, LanguageRegistry};
//!
//! let manager = LanguageLifecycleManager::new(LanguageRegistry::get(), &appdata);
//! db.transact(|tx| manager.apply(tx, &LanguageChange::new(["en", "it"], "it")))?;
//! ```

mod appdata;
mod enabled;
mod langfile;
mod lifecycle;
mod registry;

pub use appdata::{AppData, AppDataFile, BootstrapLoader, BootstrapSource, LocalizedDefaults};
pub use enabled::EnabledLanguageSet;
pub(crate) use enabled::{object, singleton};
pub use langfile::{delete_custom_texts, get_custom_texts, get_l10n, langfile_path, update_custom_texts};
pub use lifecycle::{LanguageChange, LanguageChangeReport, LanguageLifecycleManager};
pub use registry::{LanguageConfig, LanguageRegistry};
