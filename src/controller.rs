//! Form state lifecycle: one controller owns the authoritative snapshot of
//! schema, data, identity, and errors, and reconciles it against external
//! updates and user edits.

use std::mem;

use serde_json::{Map, Value};

use crate::defaults::compute_defaults;
use crate::error::ResolveError;
use crate::identity::{build_identity, extract_paths, used_form_data, IdentityNode};
use crate::resolver::{resolve, resolve_node};
use crate::types::{
    get_at, get_at_mut, remove_at, set_at, FormOptions, LiveTrigger, PathSegment,
};
use crate::validation::{
    run_validation, ErrorEntry, ErrorTree, ErrorTreeBuilder, FormValidator, JsonSchemaValidator,
    ValidationOutcome,
};

/// Externally supplied validation hook, invoked after schema validation.
pub type CustomValidate = Box<dyn Fn(Option<&Value>, &mut ErrorTreeBuilder)>;

/// The controller's externally visible state after a reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormStateSnapshot {
    /// The raw schema the form was built from.
    pub schema: Value,
    /// Root schema with references, dependencies, and conditionals applied
    /// for the current data.
    pub resolved_schema: Value,
    pub form_data: Option<Value>,
    pub identity: IdentityNode,
    pub errors: Vec<ErrorEntry>,
    pub error_tree: ErrorTree,
    /// Errors from the last validation pass alone, without merged extras.
    pub schema_errors: Vec<ErrorEntry>,
    /// Whether the form was seeded with externally supplied data.
    pub edit_mode: bool,
}

/// Queued when reconciliation produced data different from what the caller
/// already holds. Polled via [`FormStateController::take_change_notice`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeNotice {
    /// The reconciled data, never the raw input.
    pub form_data: Option<Value>,
    /// Identifier of the field that triggered the change, when one did.
    pub field_id: Option<String>,
}

/// Result of a submit request. Validation failures are data, not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Submitted {
        form_data: Option<Value>,
    },
    Rejected {
        errors: Vec<ErrorEntry>,
        error_tree: ErrorTree,
    },
}

/// Reconciles schema, form data, and validation state.
///
/// Every state transition runs the full pipeline (defaults, resolution,
/// identity, optional validation) to completion before the new snapshot is
/// visible. External updates notify only when reconciliation changed the
/// data; user edits always notify.
pub struct FormStateController {
    schema: Value,
    options: FormOptions,
    validator: Box<dyn FormValidator>,
    custom_validate: Option<CustomValidate>,
    extra_errors: Option<ErrorTree>,
    /// Data as last supplied from outside, before reconciliation.
    supplied_form_data: Option<Value>,
    last_validation: Option<ValidationOutcome>,
    snapshot: FormStateSnapshot,
    pending_notice: Option<ChangeNotice>,
}

impl FormStateController {
    /// Build a controller and run the initial reconciliation pass.
    ///
    /// Construction never queues a change notice. With live validation on
    /// change and externally supplied data, the initial pass validates.
    ///
    /// # Errors
    ///
    /// Returns an error when the schema cannot be resolved.
    pub fn new(
        schema: Value,
        form_data: Option<Value>,
        options: FormOptions,
    ) -> Result<Self, ResolveError> {
        let edit_mode = form_data.is_some();
        let mut controller = FormStateController {
            schema,
            options,
            validator: Box::new(JsonSchemaValidator),
            custom_validate: None,
            extra_errors: None,
            supplied_form_data: form_data.clone(),
            last_validation: None,
            snapshot: FormStateSnapshot::default(),
            pending_notice: None,
        };
        let validate =
            edit_mode && controller.options.live_validate == LiveTrigger::OnChange;
        controller.apply_state(form_data, edit_mode, validate)?;
        controller.pending_notice = None;
        Ok(controller)
    }

    /// The current state snapshot.
    pub fn snapshot(&self) -> &FormStateSnapshot {
        &self.snapshot
    }

    /// The options currently in effect.
    pub fn options(&self) -> &FormOptions {
        &self.options
    }

    /// The pending change notice, if the last transition queued one.
    pub fn take_change_notice(&mut self) -> Option<ChangeNotice> {
        self.pending_notice.take()
    }

    /// Identifier of the field at `path` under the current id options.
    pub fn field_id(&self, path: &[PathSegment]) -> String {
        let mut id = self.options.id_prefix.clone();
        for segment in path {
            id.push_str(&self.options.id_separator);
            id.push_str(&segment.to_string());
        }
        id
    }

    /// Replace the form data from outside, as when a host application owns
    /// the data. A change notice is queued only when reconciliation produced
    /// data different from what was supplied.
    ///
    /// # Errors
    ///
    /// Returns an error when the schema cannot be resolved; the previous
    /// snapshot stays in place.
    pub fn update_form_data(&mut self, form_data: Option<Value>) -> Result<(), ResolveError> {
        let edit_mode = form_data.is_some();
        let validate = edit_mode && self.options.live_validate == LiveTrigger::OnChange;
        self.apply_state(form_data.clone(), edit_mode, validate)?;
        if self.snapshot.form_data != form_data {
            self.pending_notice = Some(ChangeNotice {
                form_data: self.snapshot.form_data.clone(),
                field_id: None,
            });
        }
        self.supplied_form_data = form_data;
        Ok(())
    }

    /// Swap in a new schema and recompute. Validation results from the old
    /// schema are discarded rather than shown against the new shape.
    ///
    /// # Errors
    ///
    /// Returns an error when the new schema cannot be resolved; the
    /// controller keeps the previous schema and snapshot in that case.
    pub fn update_schema(&mut self, schema: Value) -> Result<(), ResolveError> {
        if schema == self.schema {
            return Ok(());
        }
        let previous_schema = mem::replace(&mut self.schema, schema);
        let previous_validation = self.last_validation.take();

        let data = self.snapshot.form_data.clone();
        let before = data.clone();
        let edit_mode = self.snapshot.edit_mode;
        let validate = edit_mode && self.options.live_validate == LiveTrigger::OnChange;
        if let Err(error) = self.apply_state(data, edit_mode, validate) {
            self.schema = previous_schema;
            self.last_validation = previous_validation;
            return Err(error);
        }
        if self.snapshot.form_data != before {
            self.pending_notice = Some(ChangeNotice {
                form_data: self.snapshot.form_data.clone(),
                field_id: None,
            });
        }
        Ok(())
    }

    /// Swap in new options and recompute identifiers, defaults, and
    /// validation state under them.
    ///
    /// # Errors
    ///
    /// Returns an error when re-resolution fails; the previous options stay
    /// in effect.
    pub fn update_options(&mut self, options: FormOptions) -> Result<(), ResolveError> {
        let previous = mem::replace(&mut self.options, options);
        let data = self.snapshot.form_data.clone();
        let before = data.clone();
        let edit_mode = self.snapshot.edit_mode;
        let validate = edit_mode && self.options.live_validate == LiveTrigger::OnChange;
        if let Err(error) = self.apply_state(data, edit_mode, validate) {
            self.options = previous;
            return Err(error);
        }
        if self.snapshot.form_data != before {
            self.pending_notice = Some(ChangeNotice {
                form_data: self.snapshot.form_data.clone(),
                field_id: None,
            });
        }
        Ok(())
    }

    /// Apply a user edit at `path`. `None` removes the value there. A
    /// change notice carrying the field identifier is always queued, even
    /// when the edit wrote the value already present.
    ///
    /// # Errors
    ///
    /// Returns an error when re-resolution fails.
    pub fn apply_change(
        &mut self,
        path: &[PathSegment],
        value: Option<Value>,
    ) -> Result<(), ResolveError> {
        let mut data = self.snapshot.form_data.clone().unwrap_or(Value::Null);
        match value {
            Some(value) => set_at(&mut data, path, value),
            None => {
                remove_at(&mut data, path);
            }
        }
        let field_id = self.field_id(path);
        self.commit_user_edit(Some(data), Some(field_id))
    }

    /// Signal that the field at `path` lost focus, running the `OnBlur`
    /// variants of extra-data trimming and live validation.
    ///
    /// # Errors
    ///
    /// Returns an error when the trimming recompute fails.
    pub fn apply_blur(&mut self, path: &[PathSegment]) -> Result<(), ResolveError> {
        if self.options.omit_extra_data && self.options.live_omit == LiveTrigger::OnBlur {
            let before = self.snapshot.form_data.clone();
            let trimmed = self.trim_unused(before.clone())?;
            if trimmed != before {
                let validate = self.options.live_validate == LiveTrigger::OnChange;
                let edit_mode = self.snapshot.edit_mode;
                self.apply_state(trimmed, edit_mode, validate)?;
                self.pending_notice = Some(ChangeNotice {
                    form_data: self.snapshot.form_data.clone(),
                    field_id: Some(self.field_id(path)),
                });
            }
        }
        if self.options.live_validate == LiveTrigger::OnBlur {
            self.validate_now();
        }
        Ok(())
    }

    /// Rename a key inside an additionalProperties map, keeping its value
    /// and its position among siblings. A colliding target name gets a
    /// numeric suffix.
    ///
    /// Returns the key actually used, or `None` when `old_key` is absent or
    /// `map_path` does not address an object.
    ///
    /// # Errors
    ///
    /// Returns an error when the follow-up recompute fails.
    pub fn rename_map_key(
        &mut self,
        map_path: &[PathSegment],
        old_key: &str,
        new_key: &str,
    ) -> Result<Option<String>, ResolveError> {
        if old_key == new_key {
            return Ok(Some(new_key.to_string()));
        }
        let mut data = self.snapshot.form_data.clone().unwrap_or(Value::Null);
        let Some(Value::Object(map)) = get_at_mut(&mut data, map_path) else {
            return Ok(None);
        };
        if !map.contains_key(old_key) {
            return Ok(None);
        }
        let resolved_key = available_key(map, new_key);
        let mut renamed = Map::new();
        for (key, value) in map.iter() {
            if key == old_key {
                renamed.insert(resolved_key.clone(), value.clone());
            } else {
                renamed.insert(key.clone(), value.clone());
            }
        }
        *map = renamed;

        let field_id = self.field_id(map_path);
        self.commit_user_edit(Some(data), Some(field_id))?;
        Ok(Some(resolved_key))
    }

    /// Add a fresh uniquified key (`newKey`, `newKey-1`, ...) to an
    /// additionalProperties map, seeded with the value schema's computed
    /// default or its empty value.
    ///
    /// Returns the key used, or `None` when the resolved schema declares no
    /// additionalProperties at `map_path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the value schema or the follow-up recompute
    /// fails to resolve.
    pub fn add_map_key(
        &mut self,
        map_path: &[PathSegment],
    ) -> Result<Option<String>, ResolveError> {
        let Some(value_schema) = self.additional_value_schema(map_path) else {
            return Ok(None);
        };
        let value_schema = resolve_node(&self.schema, &value_schema, None)?;
        let seed = compute_defaults(&self.schema, &value_schema, None, &self.options.defaults)
            .unwrap_or_else(|| empty_value_for(&value_schema));

        let mut data = self.snapshot.form_data.clone().unwrap_or(Value::Null);
        let new_key = match get_at(&data, map_path) {
            Some(Value::Object(map)) => available_key(map, "newKey"),
            _ => "newKey".to_string(),
        };
        let mut child_path = map_path.to_vec();
        child_path.push(PathSegment::Key(new_key.clone()));
        set_at(&mut data, &child_path, seed);

        let field_id = self.field_id(&child_path);
        self.commit_user_edit(Some(data), Some(field_id))?;
        Ok(Some(new_key))
    }

    /// Submit the form: optional extra-data trimming, then full validation
    /// unless `no_validate` is set. Rejection is reported in the outcome,
    /// never as an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the trimming recompute fails.
    pub fn submit(&mut self) -> Result<SubmitOutcome, ResolveError> {
        if self.options.omit_extra_data {
            let before = self.snapshot.form_data.clone();
            let trimmed = self.trim_unused(before.clone())?;
            if trimmed != before {
                let edit_mode = self.snapshot.edit_mode;
                self.apply_state(trimmed, edit_mode, false)?;
            }
        }
        if self.options.no_validate {
            return Ok(SubmitOutcome::Submitted {
                form_data: self.snapshot.form_data.clone(),
            });
        }
        if self.validate_now() {
            Ok(SubmitOutcome::Submitted {
                form_data: self.snapshot.form_data.clone(),
            })
        } else {
            Ok(SubmitOutcome::Rejected {
                errors: self.snapshot.errors.clone(),
                error_tree: self.snapshot.error_tree.clone(),
            })
        }
    }

    /// Run validation immediately and refresh the snapshot's errors,
    /// regardless of the `no_validate` option.
    ///
    /// Returns whether the form is currently valid.
    pub fn validate_now(&mut self) -> bool {
        self.last_validation = Some(run_validation(
            self.validator.as_ref(),
            &self.schema,
            self.snapshot.form_data.as_ref(),
            self.custom_validate.as_deref(),
        ));
        self.refresh_snapshot_errors();
        self.snapshot.errors.is_empty()
    }

    /// Discard edits and recompute from the originally supplied data.
    /// Validation results are discarded with them.
    ///
    /// # Errors
    ///
    /// Returns an error when the recompute fails.
    pub fn reset(&mut self) -> Result<(), ResolveError> {
        let data = self.supplied_form_data.clone();
        let edit_mode = data.is_some();
        self.last_validation = None;
        self.apply_state(data.clone(), edit_mode, false)?;
        if self.snapshot.form_data != data {
            self.pending_notice = Some(ChangeNotice {
                form_data: self.snapshot.form_data.clone(),
                field_id: None,
            });
        }
        Ok(())
    }

    /// Swap the validation backend. Takes effect at the next validation
    /// pass.
    pub fn set_validator(&mut self, validator: Box<dyn FormValidator>) {
        self.validator = validator;
    }

    /// Install or clear the custom validation hook. Takes effect at the
    /// next validation pass.
    pub fn set_custom_validate(&mut self, custom_validate: Option<CustomValidate>) {
        self.custom_validate = custom_validate;
    }

    /// Install externally supplied errors, merged into the snapshot until
    /// cleared. Duplicate `(path, message)` pairs are suppressed.
    pub fn set_extra_errors(&mut self, extra_errors: Option<ErrorTree>) {
        self.extra_errors = extra_errors;
        self.refresh_snapshot_errors();
    }
}

// --- Internal implementation ---

impl FormStateController {
    /// Defaults, root resolution, and identity for `data`.
    fn pipeline(
        &self,
        data: Option<&Value>,
    ) -> Result<(Value, Option<Value>, IdentityNode), ResolveError> {
        let defaulted = compute_defaults(&self.schema, &self.schema, data, &self.options.defaults);
        let resolved_schema = resolve(&self.schema, &self.schema, defaulted.as_ref())?;
        let identity = build_identity(
            &self.schema,
            &self.schema,
            None,
            defaulted.as_ref(),
            &self.options.id_prefix,
            &self.options.id_separator,
        )?;
        Ok((resolved_schema, defaulted, identity))
    }

    /// Run the pipeline over `data` and install the result as the current
    /// snapshot. On failure the previous snapshot stays in place.
    fn apply_state(
        &mut self,
        data: Option<Value>,
        edit_mode: bool,
        validate: bool,
    ) -> Result<(), ResolveError> {
        let (resolved_schema, form_data, identity) = self.pipeline(data.as_ref())?;

        if validate && !self.options.no_validate {
            self.last_validation = Some(run_validation(
                self.validator.as_ref(),
                &self.schema,
                form_data.as_ref(),
                self.custom_validate.as_deref(),
            ));
        }

        let outcome = self.derived_errors();
        self.snapshot = FormStateSnapshot {
            schema: self.schema.clone(),
            resolved_schema,
            form_data,
            identity,
            errors: outcome.errors,
            error_tree: outcome.error_tree,
            schema_errors: outcome.schema_errors,
            edit_mode,
        };
        Ok(())
    }

    /// Reconcile after a user edit and queue the always-fired notice.
    fn commit_user_edit(
        &mut self,
        data: Option<Value>,
        field_id: Option<String>,
    ) -> Result<(), ResolveError> {
        let mut next = data;
        if self.options.omit_extra_data && self.options.live_omit == LiveTrigger::OnChange {
            next = self.trim_unused(next)?;
        }
        let validate = self.options.live_validate == LiveTrigger::OnChange;
        let edit_mode = self.snapshot.edit_mode;
        self.apply_state(next, edit_mode, validate)?;
        self.pending_notice = Some(ChangeNotice {
            form_data: self.snapshot.form_data.clone(),
            field_id,
        });
        Ok(())
    }

    /// Drop data keys outside the currently addressable field set.
    fn trim_unused(&self, data: Option<Value>) -> Result<Option<Value>, ResolveError> {
        let identity = build_identity(
            &self.schema,
            &self.schema,
            None,
            data.as_ref(),
            &self.options.id_prefix,
            &self.options.id_separator,
        )?;
        let paths = extract_paths(&identity, data.as_ref());
        Ok(used_form_data(data.as_ref(), &paths))
    }

    /// Last validation outcome with extra errors merged in.
    fn derived_errors(&self) -> ValidationOutcome {
        let mut outcome = self.last_validation.clone().unwrap_or_default();
        if let Some(extra) = &self.extra_errors {
            outcome.merge_extra(extra);
        }
        outcome
    }

    fn refresh_snapshot_errors(&mut self) {
        let outcome = self.derived_errors();
        self.snapshot.errors = outcome.errors;
        self.snapshot.error_tree = outcome.error_tree;
        self.snapshot.schema_errors = outcome.schema_errors;
    }

    /// Schema of the additionalProperties values at `map_path`, if the
    /// resolved schema declares one there.
    fn additional_value_schema(&self, map_path: &[PathSegment]) -> Option<Value> {
        let node = schema_at(&self.snapshot.resolved_schema, map_path)?;
        match node.get("additionalProperties") {
            Some(schema @ Value::Object(_)) => Some(schema.clone()),
            Some(Value::Bool(true)) => Some(Value::Object(Map::new())),
            _ => None,
        }
    }
}

// Walk the resolved schema along a data path.
fn schema_at<'a>(schema: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    let mut current = schema;
    for segment in path {
        current = match segment {
            PathSegment::Key(key) => {
                let declared = current
                    .get("properties")
                    .and_then(Value::as_object)
                    .and_then(|map| map.get(key.as_str()));
                match declared {
                    Some(child) => child,
                    None => match current.get("additionalProperties") {
                        Some(child @ Value::Object(_)) => child,
                        _ => return None,
                    },
                }
            }
            PathSegment::Index(idx) => match current.get("items") {
                Some(Value::Array(tuple)) => match tuple.get(*idx) {
                    Some(child) => child,
                    None => match current.get("additionalItems") {
                        Some(child @ Value::Object(_)) => child,
                        _ => return None,
                    },
                },
                Some(child @ Value::Object(_)) => child,
                _ => return None,
            },
        };
    }
    Some(current)
}

// First free name: the preferred key itself, then `key-1`, `key-2`, ...
fn available_key(map: &Map<String, Value>, preferred: &str) -> String {
    if !map.contains_key(preferred) {
        return preferred.to_string();
    }
    let mut index = 1;
    loop {
        let candidate = format!("{}-{}", preferred, index);
        if !map.contains_key(&candidate) {
            return candidate;
        }
        index += 1;
    }
}

// Seed for a fresh map entry when the value schema computes no default.
fn empty_value_for(schema: &Value) -> Value {
    match schema.get("type").and_then(Value::as_str) {
        Some("array") => Value::Array(Vec::new()),
        Some("boolean") => Value::Bool(false),
        Some("null") => Value::Null,
        Some("number") | Some("integer") => Value::from(0),
        Some("object") => Value::Object(Map::new()),
        _ => Value::String(String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_path;
    use serde_json::json;

    fn controller_with(schema: Value, data: Option<Value>) -> FormStateController {
        FormStateController::new(schema, data, FormOptions::default()).unwrap()
    }

    // === Lifecycle Tests ===

    #[test]
    fn construction_queues_no_notice() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string", "default": "untitled" } }
        });
        let mut controller = controller_with(schema, None);

        assert_eq!(
            controller.snapshot().form_data,
            Some(json!({ "name": "untitled" }))
        );
        assert!(!controller.snapshot().edit_mode);
        assert!(controller.take_change_notice().is_none());
    }

    #[test]
    fn external_update_notices_only_on_difference() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "kind": { "type": "string", "default": "basic" }
            }
        });
        let mut controller = controller_with(schema, None);

        controller
            .update_form_data(Some(json!({ "name": "x" })))
            .unwrap();
        let notice = controller.take_change_notice().unwrap();
        assert_eq!(
            notice.form_data,
            Some(json!({ "name": "x", "kind": "basic" }))
        );
        assert_eq!(notice.field_id, None);

        // Supplying the reconciled data back is a no-op.
        controller
            .update_form_data(Some(json!({ "name": "x", "kind": "basic" })))
            .unwrap();
        assert!(controller.take_change_notice().is_none());
    }

    #[test]
    fn user_edit_always_notices_with_field_id() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } }
        });
        let mut controller = controller_with(schema, Some(json!({ "name": "a" })));
        controller.take_change_notice();

        controller
            .apply_change(&parse_path("name"), Some(json!("a")))
            .unwrap();
        let notice = controller.take_change_notice().unwrap();
        assert_eq!(notice.field_id.as_deref(), Some("root_name"));
        assert_eq!(notice.form_data, Some(json!({ "name": "a" })));
    }

    #[test]
    fn failed_schema_update_keeps_previous_snapshot() {
        let schema = json!({ "type": "string", "default": "ok" });
        let mut controller = controller_with(schema.clone(), None);

        let broken = json!({ "$ref": "#/definitions/missing" });
        let error = controller.update_schema(broken).unwrap_err();
        assert!(matches!(error, ResolveError::UnresolvedReference { .. }));
        assert_eq!(controller.snapshot().schema, schema);
        assert_eq!(controller.snapshot().form_data, Some(json!("ok")));
    }

    #[test]
    fn schema_update_discards_stale_errors() {
        let schema = json!({
            "type": "object",
            "properties": { "age": { "type": "integer" } },
            "required": ["age"]
        });
        let mut controller = controller_with(schema, Some(json!({})));
        assert!(!controller.validate_now());
        assert!(!controller.snapshot().errors.is_empty());

        controller
            .update_schema(json!({ "type": "object" }))
            .unwrap();
        assert!(controller.snapshot().errors.is_empty());
    }

    // === Field Identifier Tests ===

    #[test]
    fn field_id_joins_segments_with_separator() {
        let controller = controller_with(json!({ "type": "object" }), None);
        assert_eq!(controller.field_id(&[]), "root");
        assert_eq!(controller.field_id(&parse_path("a.0.b")), "root_a_0_b");
    }

    // === Map Key Tests ===

    #[test]
    fn rename_keeps_position_among_siblings() {
        let schema = json!({
            "type": "object",
            "additionalProperties": { "type": "number" }
        });
        let mut controller = controller_with(
            schema,
            Some(json!({ "first": 1, "second": 2, "third": 3 })),
        );

        let used = controller
            .rename_map_key(&[], "second", "renamed")
            .unwrap();
        assert_eq!(used.as_deref(), Some("renamed"));

        let data = controller.snapshot().form_data.clone().unwrap();
        let keys: Vec<&String> = data.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["first", "renamed", "third"]);
        assert_eq!(data["renamed"], json!(2));
    }

    #[test]
    fn rename_collision_gets_suffix() {
        let schema = json!({
            "type": "object",
            "additionalProperties": { "type": "number" }
        });
        let mut controller =
            controller_with(schema, Some(json!({ "first": 1, "third": 3 })));

        let used = controller.rename_map_key(&[], "first", "third").unwrap();
        assert_eq!(used.as_deref(), Some("third-1"));
    }

    #[test]
    fn rename_missing_key_is_rejected() {
        let schema = json!({
            "type": "object",
            "additionalProperties": { "type": "number" }
        });
        let mut controller = controller_with(schema, Some(json!({ "first": 1 })));

        assert_eq!(controller.rename_map_key(&[], "absent", "x").unwrap(), None);
        assert!(controller.take_change_notice().is_none());
    }

    #[test]
    fn add_map_key_uses_value_schema_default() {
        let schema = json!({
            "type": "object",
            "additionalProperties": { "type": "string", "default": "fresh" }
        });
        let mut controller = controller_with(schema, None);

        let first = controller.add_map_key(&[]).unwrap();
        assert_eq!(first.as_deref(), Some("newKey"));
        let second = controller.add_map_key(&[]).unwrap();
        assert_eq!(second.as_deref(), Some("newKey-1"));

        assert_eq!(
            controller.snapshot().form_data,
            Some(json!({ "newKey": "fresh", "newKey-1": "fresh" }))
        );
    }

    #[test]
    fn add_map_key_without_additional_schema_is_rejected() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } }
        });
        let mut controller = controller_with(schema, None);
        assert_eq!(controller.add_map_key(&[]).unwrap(), None);
    }
}
