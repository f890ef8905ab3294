//! Attribute schemas: the static, per-entity-type declaration of which field
//! belongs to which coercion/merge category.

use std::collections::HashSet;

use crate::model::validators::Validator;

/// How a field's incoming value is coerced, merged and serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCategory {
    Text,
    Integer,
    Boolean,
    DateTime,
    Json,
    Localized(LocalizedMerge),
    OptionalReference,
    DerivedList,
}

/// Merge policy applied when a localized map is updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalizedMerge {
    /// Incoming locales are merged key-by-key into the existing map.
    ByLocale,
    /// The incoming map replaces the existing one outright.
    Replace,
}

/// Value a field takes when it is absent from the construction input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    /// The neutral value of the category ("", 0, false, {}, none, null date).
    Neutral,
    Text(&'static str),
    Integer(i64),
    Boolean(bool),
    /// Current time at construction.
    Now,
}

/// A single declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub category: FieldCategory,
    pub default: FieldDefault,
    pub validator: Option<Validator>,
}

impl FieldSpec {
    const fn simple(name: &'static str, category: FieldCategory) -> Self {
        Self {
            name,
            category,
            default: FieldDefault::Neutral,
            validator: None,
        }
    }

    /// Shorthand for a text field.
    pub const fn text(name: &'static str) -> Self {
        Self::simple(name, FieldCategory::Text)
    }

    /// Shorthand for an integer field.
    pub const fn integer(name: &'static str) -> Self {
        Self::simple(name, FieldCategory::Integer)
    }

    /// Shorthand for a boolean field.
    pub const fn boolean(name: &'static str) -> Self {
        Self::simple(name, FieldCategory::Boolean)
    }

    /// Shorthand for a timestamp field.
    pub const fn datetime(name: &'static str) -> Self {
        Self::simple(name, FieldCategory::DateTime)
    }

    /// Shorthand for a structured JSON blob stored verbatim.
    pub const fn json(name: &'static str) -> Self {
        Self::simple(name, FieldCategory::Json)
    }

    /// Shorthand for a localized field merged locale-by-locale.
    pub const fn localized(name: &'static str) -> Self {
        Self::simple(name, FieldCategory::Localized(LocalizedMerge::ByLocale))
    }

    /// Shorthand for a localized field whose updates replace the whole map.
    pub const fn localized_replace(name: &'static str) -> Self {
        Self::simple(name, FieldCategory::Localized(LocalizedMerge::Replace))
    }

    /// Shorthand for a foreign identity that is only ever set, never cleared.
    pub const fn reference(name: &'static str) -> Self {
        Self::simple(name, FieldCategory::OptionalReference)
    }

    /// Shorthand for a relation list filled in by a higher layer.
    pub const fn list(name: &'static str) -> Self {
        Self::simple(name, FieldCategory::DerivedList)
    }

    pub const fn with_default(self, default: FieldDefault) -> Self {
        Self { default, ..self }
    }

    pub const fn validated(self, validator: Validator) -> Self {
        Self {
            validator: Some(validator),
            ..self
        }
    }

    pub fn is_localized(&self) -> bool {
        matches!(self.category, FieldCategory::Localized(_))
    }
}

/// Whether an entity's identity is part of its serialized form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// `id` is emitted by `serialize`.
    Exposed,
    /// `id` is a storage key only (singleton and natural-key records).
    Hidden,
}

/// Static declaration of an entity type.
#[derive(Debug)]
pub struct AttributeSchema {
    pub entity_type: &'static str,
    pub identity: Identity,
    pub fields: &'static [FieldSpec],
}

impl AttributeSchema {
    /// Look up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of all localized fields, in declaration order.
    pub fn localized_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().filter(|f| f.is_localized()).map(|f| f.name)
    }

    /// Names emitted by `Entity::serialize`, in declaration order.
    pub fn output_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::with_capacity(self.fields.len() + 1);
        if self.identity == Identity::Exposed {
            keys.push("id");
        }
        keys.extend(self.fields.iter().map(|f| f.name));
        keys
    }

    /// Verify that every field name is declared once and `id` is not redeclared.
    pub fn check(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for field in self.fields {
            if field.name == "id" {
                return Err(format!("{}: 'id' is reserved", self.entity_type));
            }
            if !seen.insert(field.name) {
                return Err(format!(
                    "{}: field '{}' declared more than once",
                    self.entity_type, field.name
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== FieldSpec Constructor Tests ====================

    #[test]
    fn test_text_field_defaults() {
        let f = FieldSpec::text("username");
        assert_eq!(f.name, "username");
        assert_eq!(f.category, FieldCategory::Text);
        assert_eq!(f.default, FieldDefault::Neutral);
        assert!(f.validator.is_none());
    }

    #[test]
    fn test_localized_defaults_to_merge_by_locale() {
        let f = FieldSpec::localized("description");
        assert_eq!(f.category, FieldCategory::Localized(LocalizedMerge::ByLocale));
        assert!(f.is_localized());
    }

    #[test]
    fn test_localized_replace_policy() {
        let f = FieldSpec::localized_replace("label");
        assert_eq!(f.category, FieldCategory::Localized(LocalizedMerge::Replace));
    }

    #[test]
    fn test_builder_chain() {
        const F: FieldSpec = FieldSpec::integer("tip_timetolive")
            .with_default(FieldDefault::Integer(15))
            .validated(Validator::Range(-1, 1825));
        assert_eq!(F.default, FieldDefault::Integer(15));
        assert_eq!(F.validator, Some(Validator::Range(-1, 1825)));
    }

    // ==================== AttributeSchema Tests ====================

    static SAMPLE: AttributeSchema = AttributeSchema {
        entity_type: "sample",
        identity: Identity::Exposed,
        fields: &[
            FieldSpec::text("name"),
            FieldSpec::localized("description"),
            FieldSpec::list("children"),
        ],
    };

    #[test]
    fn test_field_lookup() {
        assert!(SAMPLE.field("name").is_some());
        assert!(SAMPLE.field("missing").is_none());
    }

    #[test]
    fn test_localized_fields() {
        let names: Vec<_> = SAMPLE.localized_fields().collect();
        assert_eq!(names, vec!["description"]);
    }

    #[test]
    fn test_output_keys_include_exposed_id() {
        assert_eq!(
            SAMPLE.output_keys(),
            vec!["id", "name", "description", "children"]
        );
    }

    #[test]
    fn test_check_accepts_disjoint_schema() {
        assert!(SAMPLE.check().is_ok());
    }

    #[test]
    fn test_check_rejects_duplicate_name() {
        static DUP: AttributeSchema = AttributeSchema {
            entity_type: "dup",
            identity: Identity::Hidden,
            fields: &[FieldSpec::text("name"), FieldSpec::localized("name")],
        };
        let err = DUP.check().unwrap_err();
        assert!(err.contains("more than once"));
    }

    #[test]
    fn test_check_rejects_reserved_id() {
        static BAD: AttributeSchema = AttributeSchema {
            entity_type: "bad",
            identity: Identity::Hidden,
            fields: &[FieldSpec::text("id")],
        };
        assert!(BAD.check().is_err());
    }
}
