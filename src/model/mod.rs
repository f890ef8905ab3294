//! Declarative entity marshalling.
//!
//! - `schema`: static per-type field declarations ([`AttributeSchema`], [`FieldCategory`])
//! - `validators`: per-field constraints (length, url shape, integer range)
//! - `entity`: [`Entity`] with partial `update` and language-aware `serialize`
//! - `localized`: [`LocalizedText`], locale-keyed text with empty-string fallback
//! - `models`: the concrete entity catalogue

mod entity;
mod localized;
pub mod models;
mod schema;
mod validators;

pub use entity::{format_timestamp, null_datetime, Entity, FieldValue, Input, TIMESTAMP_FORMAT};
pub use localized::LocalizedText;
pub use schema::{AttributeSchema, FieldCategory, FieldDefault, FieldSpec, Identity, LocalizedMerge};
pub use validators::{Validator, MAXIMUM_NAMESIZE, MAXIMUM_TEXTSIZE};
