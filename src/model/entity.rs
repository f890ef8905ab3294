//! Schema-driven entity: untrusted input in, stored record and
//! language-aware output out.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::localized::LocalizedText;
use crate::model::schema::{
    AttributeSchema, FieldCategory, FieldDefault, FieldSpec, Identity, LocalizedMerge,
};

/// Output format of timestamp fields.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// A partial, untrusted input mapping.
pub type Input = Map<String, Value>;

/// The current value of a declared field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Json(Value),
    Localized(LocalizedText),
    Reference(Option<String>),
}

impl FieldValue {
    /// Type default for a field, `None` for derived lists which are never stored.
    fn default_for(spec: &FieldSpec) -> Option<FieldValue> {
        let value = match (spec.category, spec.default) {
            (FieldCategory::Text, FieldDefault::Text(s)) => FieldValue::Text(s.to_string()),
            (FieldCategory::Text, _) => FieldValue::Text(String::new()),
            (FieldCategory::Integer, FieldDefault::Integer(i)) => FieldValue::Integer(i),
            (FieldCategory::Integer, _) => FieldValue::Integer(0),
            (FieldCategory::Boolean, FieldDefault::Boolean(b)) => FieldValue::Boolean(b),
            (FieldCategory::Boolean, _) => FieldValue::Boolean(false),
            (FieldCategory::DateTime, FieldDefault::Now) => FieldValue::DateTime(Utc::now()),
            (FieldCategory::DateTime, _) => FieldValue::DateTime(null_datetime()),
            (FieldCategory::Json, _) => FieldValue::Json(Value::Object(Map::new())),
            (FieldCategory::Localized(_), _) => FieldValue::Localized(LocalizedText::new()),
            (FieldCategory::OptionalReference, _) => FieldValue::Reference(None),
            (FieldCategory::DerivedList, _) => return None,
        };
        Some(value)
    }
}

/// The "never happened" timestamp used as the neutral datetime.
pub fn null_datetime() -> DateTime<Utc> {
    DateTime::<Utc>::default()
}

pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// An in-memory record governed by an [`AttributeSchema`].
///
/// Relations to other entities are foreign identity strings, never embedded
/// objects.
#[derive(Debug, Clone)]
pub struct Entity {
    schema: &'static AttributeSchema,
    id: String,
    values: BTreeMap<&'static str, FieldValue>,
}

impl Entity {
    /// A new entity with a freshly generated id and all fields at their defaults.
    pub fn new(schema: &'static AttributeSchema) -> Self {
        Self::with_id(schema, Uuid::new_v4().to_string())
    }

    /// A new entity with the given id and all fields at their defaults.
    pub fn with_id(schema: &'static AttributeSchema, id: impl Into<String>) -> Self {
        let values = schema
            .fields
            .iter()
            .filter_map(|spec| FieldValue::default_for(spec).map(|v| (spec.name, v)))
            .collect();

        Self {
            schema,
            id: id.into(),
            values,
        }
    }

    /// Build an entity from a partial input. A non-empty string `id` in the
    /// input is used as identity, otherwise one is generated.
    pub fn from_input(schema: &'static AttributeSchema, input: &Input) -> Result<Self> {
        let mut entity = match input.get("id") {
            Some(Value::String(id)) if !id.is_empty() => Self::with_id(schema, id.clone()),
            _ => Self::new(schema),
        };
        entity.update(input)?;
        Ok(entity)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn schema(&self) -> &'static AttributeSchema {
        self.schema
    }

    pub fn entity_type(&self) -> &'static str {
        self.schema.entity_type
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn integer(&self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(FieldValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        match self.get(name) {
            Some(FieldValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn datetime(&self, name: &str) -> Option<DateTime<Utc>> {
        match self.get(name) {
            Some(FieldValue::DateTime(at)) => Some(*at),
            _ => None,
        }
    }

    pub fn json(&self, name: &str) -> Option<&Value> {
        match self.get(name) {
            Some(FieldValue::Json(v)) => Some(v),
            _ => None,
        }
    }

    pub fn localized(&self, name: &str) -> Option<&LocalizedText> {
        match self.get(name) {
            Some(FieldValue::Localized(t)) => Some(t),
            _ => None,
        }
    }

    pub fn reference(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FieldValue::Reference(r)) => r.as_deref(),
            _ => None,
        }
    }

    /// Partial update from untrusted input.
    ///
    /// Only declared fields present in `input` are touched; `null` counts as
    /// absent, and `id` is never changed. Every present value is coerced and
    /// validated before the first one is applied, so a rejected update leaves
    /// the entity unchanged.
    pub fn update(&mut self, input: &Input) -> Result<()> {
        let mut staged = Vec::new();
        for spec in self.schema.fields {
            let Some(raw) = input.get(spec.name) else {
                continue;
            };
            if let Some(value) = coerce(spec, raw)? {
                staged.push((spec, value));
            }
        }

        for (spec, value) in staged {
            self.apply(spec, value);
        }
        Ok(())
    }

    fn apply(&mut self, spec: &'static FieldSpec, value: FieldValue) {
        match (spec.category, value) {
            (FieldCategory::Localized(LocalizedMerge::ByLocale), FieldValue::Localized(incoming)) => {
                match self.values.get_mut(spec.name) {
                    Some(FieldValue::Localized(existing)) if !existing.is_empty() => {
                        existing.merge(incoming)
                    }
                    _ => {
                        self.values.insert(spec.name, FieldValue::Localized(incoming));
                    }
                }
            }
            (_, value) => {
                self.values.insert(spec.name, value);
            }
        }
    }

    /// Set an already-typed timestamp.
    pub fn set_datetime(&mut self, name: &str, at: DateTime<Utc>) -> Result<()> {
        let spec = self
            .schema
            .field(name)
            .filter(|spec| spec.category == FieldCategory::DateTime)
            .ok_or_else(|| Error::validation(name, "not a datetime field"))?;
        self.values.insert(spec.name, FieldValue::DateTime(at));
        Ok(())
    }

    /// Drop the given locales from every localized field. Returns whether
    /// anything changed.
    pub fn remove_locales(&mut self, locales: &[&str]) -> bool {
        let mut changed = false;
        for value in self.values.values_mut() {
            if let FieldValue::Localized(text) = value {
                changed |= text.remove_locales(locales.iter().copied());
            }
        }
        changed
    }

    /// Project every declared field for `locale`.
    ///
    /// Never fails: localized gaps become `""`, derived lists are empty.
    pub fn serialize(&self, locale: &str) -> Map<String, Value> {
        let mut out = Map::new();
        if self.schema.identity == Identity::Exposed {
            out.insert("id".to_string(), Value::String(self.id.clone()));
        }

        for spec in self.schema.fields {
            let value = match (spec.category, self.values.get(spec.name)) {
                (FieldCategory::DerivedList, _) => Value::Array(Vec::new()),
                (FieldCategory::Localized(_), Some(FieldValue::Localized(text))) => {
                    Value::String(text.get_or_empty(locale).to_string())
                }
                (FieldCategory::Localized(_), _) => Value::String(String::new()),
                (_, Some(FieldValue::DateTime(at))) => Value::String(format_timestamp(at)),
                (_, Some(value)) => plain_value(value),
                (_, None) => Value::Null,
            };
            out.insert(spec.name.to_string(), value);
        }
        out
    }

    /// Stored representation (everything except the id and derived lists).
    pub fn to_record(&self) -> Value {
        let data = self
            .values
            .iter()
            .map(|(name, value)| {
                let stored = match value {
                    FieldValue::DateTime(at) => Value::String(at.to_rfc3339()),
                    FieldValue::Localized(text) => text.to_json(),
                    other => plain_value(other),
                };
                (name.to_string(), stored)
            })
            .collect();
        Value::Object(data)
    }

    /// Rebuild an entity from its stored representation. Fields missing from
    /// the record keep their declared defaults.
    pub fn from_record(schema: &'static AttributeSchema, id: &str, data: &Value) -> Result<Self> {
        let obj = data.as_object().ok_or_else(|| {
            Error::InvalidData(format!("{} {}: record is not an object", schema.entity_type, id))
        })?;

        let mut entity = Self::with_id(schema, id);
        for spec in schema.fields {
            let Some(raw) = obj.get(spec.name) else {
                continue;
            };
            let corrupt = || {
                Error::InvalidData(format!(
                    "{} {}: field '{}' does not match its category",
                    schema.entity_type, id, spec.name
                ))
            };
            let value = match spec.category {
                FieldCategory::Text => FieldValue::Text(raw.as_str().ok_or_else(corrupt)?.to_string()),
                FieldCategory::Integer => FieldValue::Integer(raw.as_i64().ok_or_else(corrupt)?),
                FieldCategory::Boolean => FieldValue::Boolean(raw.as_bool().ok_or_else(corrupt)?),
                FieldCategory::DateTime => {
                    let text = raw.as_str().ok_or_else(corrupt)?;
                    let at = DateTime::parse_from_rfc3339(text).map_err(|_| corrupt())?;
                    FieldValue::DateTime(at.with_timezone(&Utc))
                }
                FieldCategory::Json => FieldValue::Json(raw.clone()),
                FieldCategory::Localized(_) => FieldValue::Localized(
                    serde_json::from_value(raw.clone()).map_err(|_| corrupt())?,
                ),
                FieldCategory::OptionalReference => match raw {
                    Value::Null => FieldValue::Reference(None),
                    Value::String(s) => FieldValue::Reference(Some(s.clone())),
                    _ => return Err(corrupt()),
                },
                FieldCategory::DerivedList => continue,
            };
            entity.values.insert(spec.name, value);
        }
        Ok(entity)
    }
}

fn plain_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Text(s) => Value::String(s.clone()),
        FieldValue::Integer(i) => Value::from(*i),
        FieldValue::Boolean(b) => Value::Bool(*b),
        FieldValue::DateTime(at) => Value::String(format_timestamp(at)),
        FieldValue::Json(v) => v.clone(),
        FieldValue::Localized(text) => text.to_json(),
        FieldValue::Reference(r) => r.clone().map(Value::String).unwrap_or(Value::Null),
    }
}

/// Coerce a raw input value to its field's category.
///
/// `Ok(None)` means "leave the field untouched".
fn coerce(spec: &FieldSpec, raw: &Value) -> Result<Option<FieldValue>> {
    if raw.is_null() {
        return Ok(None);
    }

    let value = match spec.category {
        FieldCategory::Text => {
            let text = match raw {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return Err(Error::validation(spec.name, "expected text")),
            };
            check_text(spec, &text)?;
            FieldValue::Text(text)
        }
        FieldCategory::Integer => {
            let number = coerce_integer(spec.name, raw)?;
            if let Some(validator) = spec.validator {
                validator
                    .check_integer(number)
                    .map_err(|reason| Error::validation(spec.name, reason))?;
            }
            FieldValue::Integer(number)
        }
        FieldCategory::Boolean => FieldValue::Boolean(coerce_boolean(spec.name, raw)?),
        FieldCategory::DateTime => {
            let at = raw
                .as_i64()
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
                .ok_or_else(|| {
                    Error::validation(spec.name, "expected a timestamp in seconds since the epoch")
                })?;
            FieldValue::DateTime(at)
        }
        FieldCategory::Json => FieldValue::Json(raw.clone()),
        FieldCategory::Localized(_) => {
            let obj = raw
                .as_object()
                .ok_or_else(|| Error::validation(spec.name, "expected an object keyed by locale"))?;
            let mut text = LocalizedText::new();
            for (locale, value) in obj {
                let value = value.as_str().ok_or_else(|| {
                    Error::validation(spec.name, format!("text for '{}' is not a string", locale))
                })?;
                check_text(spec, value)?;
                text.set(locale.as_str(), value);
            }
            FieldValue::Localized(text)
        }
        FieldCategory::OptionalReference => match raw {
            Value::String(s) if !s.is_empty() => FieldValue::Reference(Some(s.clone())),
            _ if is_falsy(raw) => return Ok(None),
            _ => return Err(Error::validation(spec.name, "expected an identifier")),
        },
        FieldCategory::DerivedList => return Ok(None),
    };
    Ok(Some(value))
}

fn check_text(spec: &FieldSpec, text: &str) -> Result<()> {
    match spec.validator {
        Some(validator) => validator
            .check_text(text)
            .map_err(|reason| Error::validation(spec.name, reason)),
        None => Ok(()),
    }
}

fn coerce_integer(field: &str, raw: &Value) -> Result<i64> {
    match raw {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                    Ok(f.trunc() as i64)
                }
                _ => Err(Error::validation(field, format!("{} is out of range", n))),
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::validation(field, format!("'{}' is not an integer", s))),
        Value::Bool(b) => Ok(i64::from(*b)),
        _ => Err(Error::validation(field, "expected an integer")),
    }
}

fn coerce_boolean(field: &str, raw: &Value) -> Result<bool> {
    match raw {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().map(|f| f != 0.0).unwrap_or(true)),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" | "" => Ok(false),
            _ => Err(Error::validation(field, format!("'{}' is not a boolean", s))),
        },
        _ => Err(Error::validation(field, "expected a boolean")),
    }
}

fn is_falsy(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}
