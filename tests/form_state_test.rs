//! Integration tests for the form state controller lifecycle.

use schema_form::{
    parse_path, ErrorTree, ErrorTreeBuilder, FormOptions, FormStateController, LiveTrigger,
    SubmitOutcome,
};
use serde_json::{json, Value};

// === Change Notification Tests ===

mod change_notification {
    use super::*;

    #[test]
    fn identical_external_data_is_suppressed() {
        let schema = json!({ "type": "string", "default": "foobar" });
        let mut controller =
            FormStateController::new(schema, Some(json!("some value")), FormOptions::default())
                .unwrap();
        assert!(controller.take_change_notice().is_none());

        controller
            .update_form_data(Some(json!("some value")))
            .unwrap();
        assert!(controller.take_change_notice().is_none());
        assert_eq!(controller.snapshot().form_data, Some(json!("some value")));
    }

    #[test]
    fn removing_a_value_notifies_with_field_id() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "note": { "type": "string" }
            }
        });
        let mut controller = FormStateController::new(
            schema,
            Some(json!({ "name": "a", "note": "b" })),
            FormOptions::default(),
        )
        .unwrap();

        controller.apply_change(&parse_path("note"), None).unwrap();
        let notice = controller.take_change_notice().unwrap();
        assert_eq!(notice.form_data, Some(json!({ "name": "a" })));
        assert_eq!(notice.field_id.as_deref(), Some("root_note"));
    }
}

// === Live Validation Tests ===

mod live_validation {
    use super::*;

    fn age_schema() -> Value {
        json!({
            "type": "object",
            "properties": { "age": { "type": "integer" } },
            "required": ["age"]
        })
    }

    #[test]
    fn on_change_validation_tracks_edits() {
        let options = FormOptions::default().live_validate(LiveTrigger::OnChange);
        let mut controller =
            FormStateController::new(age_schema(), Some(json!({})), options).unwrap();
        // External data was supplied, so the initial pass validates.
        assert!(!controller.snapshot().errors.is_empty());

        controller
            .apply_change(&parse_path("age"), Some(json!(30)))
            .unwrap();
        assert!(controller.snapshot().errors.is_empty());
    }

    #[test]
    fn on_blur_validation_waits_for_blur() {
        let options = FormOptions::default().live_validate(LiveTrigger::OnBlur);
        let mut controller =
            FormStateController::new(age_schema(), Some(json!({})), options).unwrap();
        assert!(controller.snapshot().errors.is_empty());

        controller.apply_blur(&parse_path("age")).unwrap();
        assert!(!controller.snapshot().errors.is_empty());
    }
}

// === Submission Tests ===

mod submission {
    use super::*;

    fn name_schema() -> Value {
        json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        })
    }

    #[test]
    fn submit_accepts_valid_data() {
        let mut controller = FormStateController::new(
            name_schema(),
            Some(json!({ "name": "ok" })),
            FormOptions::default(),
        )
        .unwrap();

        let outcome = controller.submit().unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Submitted {
                form_data: Some(json!({ "name": "ok" }))
            }
        );
    }

    #[test]
    fn submit_rejects_invalid_data_with_errors() {
        let mut controller =
            FormStateController::new(name_schema(), Some(json!({})), FormOptions::default())
                .unwrap();

        let outcome = controller.submit().unwrap();
        let SubmitOutcome::Rejected { errors, error_tree } = outcome else {
            panic!("expected rejection");
        };
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, "required");
        assert!(!error_tree.is_empty());
        // The snapshot carries the same errors for rendering.
        assert_eq!(controller.snapshot().errors.len(), 1);
    }

    #[test]
    fn no_validate_submits_anything() {
        let mut options = FormOptions::default();
        options.no_validate = true;
        let mut controller =
            FormStateController::new(name_schema(), Some(json!({})), options).unwrap();

        let outcome = controller.submit().unwrap();
        assert!(matches!(outcome, SubmitOutcome::Submitted { .. }));
        assert!(controller.snapshot().errors.is_empty());
    }
}

// === Extra Data Tests ===

mod extra_data {
    use super::*;

    fn foo_schema() -> Value {
        json!({
            "type": "object",
            "properties": { "foo": { "type": "string" } }
        })
    }

    #[test]
    fn submit_drops_keys_outside_the_schema() {
        let options = FormOptions::default().omit_extra_data(true);
        let mut controller = FormStateController::new(
            foo_schema(),
            Some(json!({ "foo": "foo", "baz": "baz" })),
            options,
        )
        .unwrap();

        controller
            .apply_change(&parse_path("foo"), Some(json!("new")))
            .unwrap();
        let notice = controller.take_change_notice().unwrap();
        // Trimming is off outside submit, so the change keeps the extra key.
        assert_eq!(notice.form_data, Some(json!({ "foo": "new", "baz": "baz" })));

        let outcome = controller.submit().unwrap();
        assert_eq!(
            outcome,
            SubmitOutcome::Submitted {
                form_data: Some(json!({ "foo": "new" }))
            }
        );
    }

    #[test]
    fn live_omit_trims_on_every_change() {
        let options = FormOptions::default()
            .omit_extra_data(true)
            .live_omit(LiveTrigger::OnChange);
        let mut controller = FormStateController::new(
            foo_schema(),
            Some(json!({ "foo": "foo", "baz": "baz" })),
            options,
        )
        .unwrap();

        controller
            .apply_change(&parse_path("foo"), Some(json!("new")))
            .unwrap();
        let notice = controller.take_change_notice().unwrap();
        assert_eq!(notice.form_data, Some(json!({ "foo": "new" })));
    }

    #[test]
    fn blur_omit_trims_on_blur() {
        let options = FormOptions::default()
            .omit_extra_data(true)
            .live_omit(LiveTrigger::OnBlur);
        let mut controller = FormStateController::new(
            foo_schema(),
            Some(json!({ "foo": "foo", "baz": "baz" })),
            options,
        )
        .unwrap();

        controller
            .apply_change(&parse_path("foo"), Some(json!("new")))
            .unwrap();
        let notice = controller.take_change_notice().unwrap();
        assert_eq!(notice.form_data, Some(json!({ "foo": "new", "baz": "baz" })));

        controller.apply_blur(&parse_path("foo")).unwrap();
        let notice = controller.take_change_notice().unwrap();
        assert_eq!(notice.form_data, Some(json!({ "foo": "new" })));
        assert_eq!(notice.field_id.as_deref(), Some("root_foo"));
    }
}

// === Map Key Tests ===

mod map_keys {
    use super::*;

    #[test]
    fn nested_map_key_rename_preserves_value() {
        let schema = json!({
            "type": "object",
            "properties": {
                "nested": {
                    "type": "object",
                    "additionalProperties": { "type": "string" }
                }
            }
        });
        let mut controller = FormStateController::new(
            schema,
            Some(json!({ "nested": { "key1": "value" } })),
            FormOptions::default(),
        )
        .unwrap();

        let used = controller
            .rename_map_key(&parse_path("nested"), "key1", "key1new")
            .unwrap();
        assert_eq!(used.as_deref(), Some("key1new"));
        assert_eq!(
            controller.snapshot().form_data,
            Some(json!({ "nested": { "key1new": "value" } }))
        );
        assert!(controller.take_change_notice().is_some());
    }
}

// === Validation Hook Tests ===

mod validation_hooks {
    use super::*;

    #[test]
    fn custom_validation_merges_with_schema_errors() {
        let schema = json!({
            "type": "object",
            "properties": {
                "password": { "type": "string" },
                "confirm": { "type": "string" }
            }
        });
        let mut controller = FormStateController::new(
            schema,
            Some(json!({ "password": "a", "confirm": "b" })),
            FormOptions::default(),
        )
        .unwrap();
        controller.set_custom_validate(Some(Box::new(
            |data: Option<&Value>, builder: &mut ErrorTreeBuilder| {
                let matching = data
                    .map(|d| d["password"] == d["confirm"])
                    .unwrap_or(false);
                if !matching {
                    builder.add_error("confirm", "passwords do not match");
                }
            },
        )));

        assert!(!controller.validate_now());
        let errors = &controller.snapshot().errors;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "confirm");
        assert_eq!(errors[0].kind, "custom");

        controller
            .apply_change(&parse_path("confirm"), Some(json!("a")))
            .unwrap();
        assert!(controller.validate_now());
    }

    #[test]
    fn extra_errors_merge_without_duplicates() {
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        });
        let mut controller =
            FormStateController::new(schema, Some(json!({})), FormOptions::default()).unwrap();
        controller.validate_now();
        let schema_error_count = controller.snapshot().errors.len();
        assert_eq!(schema_error_count, 1);

        let mut extra = ErrorTree::default();
        extra.insert(&parse_path("name"), "flagged by moderation");
        controller.set_extra_errors(Some(extra.clone()));
        assert_eq!(controller.snapshot().errors.len(), schema_error_count + 1);

        // Re-installing the same extras does not duplicate them.
        controller.set_extra_errors(Some(extra));
        assert_eq!(controller.snapshot().errors.len(), schema_error_count + 1);

        controller.set_extra_errors(None);
        assert_eq!(controller.snapshot().errors.len(), schema_error_count);
    }
}

// === Lifecycle Tests ===

mod lifecycle {
    use super::*;

    #[test]
    fn reset_discards_edits() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string", "default": "start" } }
        });
        let mut controller =
            FormStateController::new(schema, None, FormOptions::default()).unwrap();
        assert_eq!(
            controller.snapshot().form_data,
            Some(json!({ "name": "start" }))
        );

        controller
            .apply_change(&parse_path("name"), Some(json!("edited")))
            .unwrap();
        assert_eq!(
            controller.snapshot().form_data,
            Some(json!({ "name": "edited" }))
        );
        controller.take_change_notice();

        controller.reset().unwrap();
        let notice = controller.take_change_notice().unwrap();
        assert_eq!(notice.form_data, Some(json!({ "name": "start" })));
        assert_eq!(
            controller.snapshot().form_data,
            Some(json!({ "name": "start" }))
        );
    }

    #[test]
    fn option_updates_rebuild_identifiers() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } }
        });
        let mut controller =
            FormStateController::new(schema, None, FormOptions::default()).unwrap();
        assert_eq!(controller.snapshot().identity.children[0].id, "root_name");

        let mut options = FormOptions::default();
        options.id_prefix = "form".to_string();
        options.id_separator = ":".to_string();
        controller.update_options(options).unwrap();
        assert_eq!(controller.snapshot().identity.children[0].id, "form:name");
        assert_eq!(controller.field_id(&parse_path("name")), "form:name");
    }
}
