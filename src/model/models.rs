//! Entity type declarations.

use crate::model::schema::{AttributeSchema, FieldDefault, FieldSpec, Identity};
use crate::model::validators::Validator;

/// Id of the singleton configuration records (`node`, `node_l10n`, ...).
pub const SINGLETON_ID: &str = "singleton";

pub static USER: AttributeSchema = AttributeSchema {
    entity_type: "user",
    identity: Identity::Exposed,
    fields: &[
        FieldSpec::datetime("creation_date").with_default(FieldDefault::Now),
        FieldSpec::text("username").validated(Validator::ShortText),
        FieldSpec::boolean("deletable").with_default(FieldDefault::Boolean(true)),
        FieldSpec::text("name").validated(Validator::ShortText),
        FieldSpec::localized("description").validated(Validator::LongLocal),
        FieldSpec::text("public_name").validated(Validator::ShortText),
        // admin, receiver, custodian
        FieldSpec::text("role").with_default(FieldDefault::Text("receiver")),
        FieldSpec::text("state").with_default(FieldDefault::Text("enabled")),
        FieldSpec::datetime("last_login"),
        FieldSpec::text("mail_address"),
        FieldSpec::text("language"),
        FieldSpec::boolean("password_change_needed").with_default(FieldDefault::Boolean(true)),
        FieldSpec::datetime("password_change_date"),
        FieldSpec::text("pgp_key_fingerprint"),
        FieldSpec::text("pgp_key_public"),
        FieldSpec::datetime("pgp_key_expiration"),
        FieldSpec::reference("img_id"),
    ],
};

pub static CONTEXT: AttributeSchema = AttributeSchema {
    entity_type: "context",
    identity: Identity::Exposed,
    fields: &[
        FieldSpec::boolean("show_small_receiver_cards"),
        FieldSpec::boolean("show_context").with_default(FieldDefault::Boolean(true)),
        FieldSpec::boolean("show_recipients_details"),
        FieldSpec::boolean("allow_recipients_selection"),
        FieldSpec::integer("maximum_selectable_receivers"),
        FieldSpec::boolean("select_all_receivers").with_default(FieldDefault::Boolean(true)),
        FieldSpec::boolean("enable_comments").with_default(FieldDefault::Boolean(true)),
        FieldSpec::boolean("enable_messages"),
        FieldSpec::boolean("enable_two_way_comments").with_default(FieldDefault::Boolean(true)),
        FieldSpec::boolean("enable_two_way_messages").with_default(FieldDefault::Boolean(true)),
        FieldSpec::boolean("enable_attachments").with_default(FieldDefault::Boolean(true)),
        FieldSpec::boolean("enable_rc_to_wb_files"),
        // days, -1 means no expiration
        FieldSpec::integer("tip_timetolive")
            .with_default(FieldDefault::Integer(15))
            .validated(Validator::Range(-1, 5 * 365)),
        FieldSpec::localized("name").validated(Validator::ShortLocal),
        FieldSpec::localized("description").validated(Validator::LongLocal),
        FieldSpec::localized("recipients_clarification").validated(Validator::LongLocal),
        FieldSpec::localized("status_page_message").validated(Validator::LongLocal),
        FieldSpec::boolean("show_receivers_in_alphabetical_order"),
        FieldSpec::integer("presentation_order"),
        FieldSpec::text("questionnaire_id"),
        FieldSpec::reference("img_id"),
        FieldSpec::list("receivers"),
    ],
};

pub static RECEIVER: AttributeSchema = AttributeSchema {
    entity_type: "receiver",
    identity: Identity::Exposed,
    fields: &[
        // default, forcefully_selected, unselectable
        FieldSpec::text("configuration").with_default(FieldDefault::Text("default")),
        FieldSpec::boolean("can_delete_submission"),
        FieldSpec::boolean("can_postpone_expiration"),
        FieldSpec::boolean("can_grant_permissions"),
        FieldSpec::boolean("tip_notification").with_default(FieldDefault::Boolean(true)),
        FieldSpec::integer("presentation_order"),
        FieldSpec::list("contexts"),
    ],
};

/// Many-to-many link between receivers and contexts.
pub static RECEIVER_CONTEXT: AttributeSchema = AttributeSchema {
    entity_type: "receiver_context",
    identity: Identity::Hidden,
    fields: &[FieldSpec::text("context_id"), FieldSpec::text("receiver_id")],
};

pub static QUESTIONNAIRE: AttributeSchema = AttributeSchema {
    entity_type: "questionnaire",
    identity: Identity::Exposed,
    fields: &[
        FieldSpec::text("name"),
        FieldSpec::boolean("show_steps_navigation_bar"),
        FieldSpec::boolean("steps_navigation_requires_completion"),
        FieldSpec::boolean("enable_whistleblower_identity"),
        FieldSpec::boolean("editable").with_default(FieldDefault::Boolean(true)),
        FieldSpec::list("steps"),
    ],
};

pub static STEP: AttributeSchema = AttributeSchema {
    entity_type: "step",
    identity: Identity::Exposed,
    fields: &[
        FieldSpec::text("questionnaire_id"),
        FieldSpec::localized("label"),
        FieldSpec::localized("description"),
        FieldSpec::integer("presentation_order"),
        FieldSpec::integer("triggered_by_score"),
        FieldSpec::list("children"),
    ],
};

pub static FIELD: AttributeSchema = AttributeSchema {
    entity_type: "field",
    identity: Identity::Exposed,
    fields: &[
        FieldSpec::integer("x"),
        FieldSpec::integer("y"),
        FieldSpec::integer("width"),
        FieldSpec::localized("label").validated(Validator::LongLocal),
        FieldSpec::localized("description").validated(Validator::LongLocal),
        FieldSpec::localized("hint").validated(Validator::LongLocal),
        FieldSpec::boolean("required"),
        FieldSpec::boolean("preview"),
        FieldSpec::boolean("multi_entry"),
        FieldSpec::localized("multi_entry_hint").validated(Validator::ShortLocal),
        FieldSpec::boolean("stats_enabled"),
        FieldSpec::integer("triggered_by_score"),
        FieldSpec::reference("fieldgroup_id"),
        FieldSpec::reference("step_id"),
        FieldSpec::reference("template_id"),
        FieldSpec::text("type").with_default(FieldDefault::Text("inputbox")),
        FieldSpec::text("instance").with_default(FieldDefault::Text("instance")),
        FieldSpec::text("key"),
        FieldSpec::boolean("editable").with_default(FieldDefault::Boolean(true)),
        FieldSpec::list("options"),
        FieldSpec::list("children"),
    ],
};

pub static FIELD_OPTION: AttributeSchema = AttributeSchema {
    entity_type: "field_option",
    identity: Identity::Exposed,
    fields: &[
        FieldSpec::text("field_id"),
        FieldSpec::integer("presentation_order"),
        FieldSpec::localized("label"),
        FieldSpec::integer("score_points"),
        FieldSpec::reference("trigger_field"),
        FieldSpec::reference("trigger_step"),
    ],
};

pub static SHORTURL: AttributeSchema = AttributeSchema {
    entity_type: "shorturl",
    identity: Identity::Exposed,
    fields: &[
        FieldSpec::text("shorturl").validated(Validator::ShortUrl),
        FieldSpec::text("longurl").validated(Validator::LongUrl),
    ],
};

/// Operator overrides of the shipped translation strings, keyed by locale.
pub static CUSTOM_TEXTS: AttributeSchema = AttributeSchema {
    entity_type: "custom_texts",
    identity: Identity::Hidden,
    fields: &[FieldSpec::json("texts")],
};

/// Marker record per enabled locale, keyed by locale code.
pub static ENABLED_LANGUAGE: AttributeSchema = AttributeSchema {
    entity_type: "enabled_language",
    identity: Identity::Hidden,
    fields: &[],
};

/// Non-localized operator settings.
pub static NODE: AttributeSchema = AttributeSchema {
    entity_type: "node",
    identity: Identity::Hidden,
    fields: &[
        FieldSpec::text("name").validated(Validator::ShortText),
        FieldSpec::text("hostname").validated(Validator::ShortText),
        FieldSpec::text("onionservice").validated(Validator::ShortText),
        FieldSpec::text("default_language").with_default(FieldDefault::Text("en")),
        FieldSpec::integer("maximum_namesize").with_default(FieldDefault::Integer(128)),
        FieldSpec::integer("maximum_textsize").with_default(FieldDefault::Integer(4096)),
        FieldSpec::integer("maximum_filesize")
            .with_default(FieldDefault::Integer(30))
            .validated(Validator::Range(0, 1_000_000)),
        FieldSpec::boolean("allow_indexing"),
        FieldSpec::boolean("allow_iframes_inclusion"),
        FieldSpec::boolean("disable_submissions"),
        FieldSpec::boolean("simplified_login"),
        FieldSpec::boolean("enable_custom_privacy_badge"),
        FieldSpec::boolean("tor2web_admin").with_default(FieldDefault::Boolean(true)),
        FieldSpec::boolean("tor2web_custodian"),
        FieldSpec::boolean("tor2web_whistleblower"),
        FieldSpec::boolean("tor2web_receiver"),
        FieldSpec::integer("wbtip_timetolive")
            .with_default(FieldDefault::Integer(90))
            .validated(Validator::Range(5, 365 * 2)),
        FieldSpec::integer("threshold_free_disk_megabytes_high").with_default(FieldDefault::Integer(200)),
        FieldSpec::integer("threshold_free_disk_percentage_high").with_default(FieldDefault::Integer(3)),
        FieldSpec::text("context_selector_type").with_default(FieldDefault::Text("list")),
        FieldSpec::boolean("basic_auth"),
        FieldSpec::text("basic_auth_username"),
        FieldSpec::text("basic_auth_password"),
    ],
};

/// Localized node texts.
pub static NODE_L10N: AttributeSchema = AttributeSchema {
    entity_type: "node_l10n",
    identity: Identity::Hidden,
    fields: &[
        FieldSpec::localized("description").validated(Validator::LongLocal),
        FieldSpec::localized("presentation").validated(Validator::LongLocal),
        FieldSpec::localized("footer").validated(Validator::LongLocal),
        FieldSpec::localized("security_awareness_title").validated(Validator::ShortLocal),
        FieldSpec::localized("security_awareness_text").validated(Validator::LongLocal),
        FieldSpec::localized("whistleblowing_question").validated(Validator::ShortLocal),
        FieldSpec::localized("whistleblowing_button").validated(Validator::ShortLocal),
        FieldSpec::localized("whistleblowing_receipt_prompt").validated(Validator::ShortLocal),
        FieldSpec::localized("custom_privacy_badge_text").validated(Validator::LongLocal),
        FieldSpec::localized("header_title_homepage").validated(Validator::ShortLocal),
        FieldSpec::localized("header_title_submissionpage").validated(Validator::ShortLocal),
        FieldSpec::localized("header_title_receiptpage").validated(Validator::ShortLocal),
        FieldSpec::localized("widget_comments_title").validated(Validator::ShortLocal),
        FieldSpec::localized("widget_messages_title").validated(Validator::ShortLocal),
        FieldSpec::localized("widget_files_title").validated(Validator::ShortLocal),
    ],
};

/// Localized notification mail templates.
pub static NOTIFICATION_L10N: AttributeSchema = AttributeSchema {
    entity_type: "notification_l10n",
    identity: Identity::Hidden,
    fields: &[
        FieldSpec::localized("tip_mail_template"),
        FieldSpec::localized("tip_mail_title"),
        FieldSpec::localized("file_mail_template"),
        FieldSpec::localized("file_mail_title"),
        FieldSpec::localized("comment_mail_template"),
        FieldSpec::localized("comment_mail_title"),
        FieldSpec::localized("message_mail_template"),
        FieldSpec::localized("message_mail_title"),
        FieldSpec::localized("tip_expiration_mail_template"),
        FieldSpec::localized("tip_expiration_mail_title"),
        FieldSpec::localized("admin_anomaly_mail_template"),
        FieldSpec::localized("admin_anomaly_mail_title"),
    ],
};

/// Values never exposed as-is to the admin interface.
pub static PRIVATE: AttributeSchema = AttributeSchema {
    entity_type: "private",
    identity: Identity::Hidden,
    fields: &[FieldSpec::text("version"), FieldSpec::datetime("created").with_default(FieldDefault::Now)],
};

/// Every declared entity type.
pub static ALL: &[&AttributeSchema] = &[
    &USER,
    &CONTEXT,
    &RECEIVER,
    &RECEIVER_CONTEXT,
    &QUESTIONNAIRE,
    &STEP,
    &FIELD,
    &FIELD_OPTION,
    &SHORTURL,
    &CUSTOM_TEXTS,
    &ENABLED_LANGUAGE,
    &NODE,
    &NODE_L10N,
    &NOTIFICATION_L10N,
    &PRIVATE,
];

/// Localized configuration records that hold one entry per enabled locale.
pub static LOCALIZED_CONFIG: &[&AttributeSchema] = &[&NODE_L10N, &NOTIFICATION_L10N];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_schema_is_well_formed() {
        for schema in ALL {
            assert!(schema.check().is_ok(), "{:?}", schema.check());
        }
    }

    #[test]
    fn test_entity_types_are_unique() {
        let names: HashSet<_> = ALL.iter().map(|s| s.entity_type).collect();
        assert_eq!(names.len(), ALL.len());
    }

    #[test]
    fn test_node_and_node_l10n_keys_are_disjoint() {
        let node: HashSet<_> = NODE.output_keys().into_iter().collect();
        let l10n: HashSet<_> = NODE_L10N.output_keys().into_iter().collect();
        assert!(node.is_disjoint(&l10n));
    }

    #[test]
    fn test_localized_config_schemas_only_hold_localized_fields() {
        for schema in LOCALIZED_CONFIG {
            assert!(schema.fields.iter().all(|f| f.is_localized()));
        }
    }
}
