//! Validation orchestration - flat error lists, the nested error tree, and
//! the schema validation backend.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{parse_path, PathSegment};

/// One validation failure tied to a data path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEntry {
    /// Dotted data path, empty for form-level errors.
    pub path: String,
    pub message: String,
    /// The keyword or source that produced the error.
    pub kind: String,
    /// Backend-specific detail, `null` when there is none.
    pub params: Value,
    /// Display line, `path: message` or just the message at the root.
    pub stack: String,
}

impl ErrorEntry {
    pub fn new(path: &str, message: &str) -> Self {
        let stack = if path.is_empty() {
            message.to_string()
        } else {
            format!("{}: {}", path, message)
        };
        ErrorEntry {
            path: path.to_string(),
            message: message.to_string(),
            kind: String::new(),
            params: Value::Null,
            stack,
        }
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stack)
    }
}

/// Errors arranged along the data structure they belong to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorTree {
    /// Errors attached directly to this node.
    pub errors: Vec<String>,
    pub children: BTreeMap<String, ErrorTree>,
}

impl ErrorTree {
    /// Attach a message at `path`, creating intermediate nodes.
    pub fn insert(&mut self, path: &[PathSegment], message: &str) {
        match path.split_first() {
            None => self.errors.push(message.to_string()),
            Some((segment, rest)) => {
                self.children
                    .entry(segment.to_string())
                    .or_default()
                    .insert(rest, message);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.children.values().all(|child| child.is_empty())
    }

    /// Flatten into `(dotted path, message)` pairs, parents before children.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        self.flatten_into("", &mut out);
        out
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        for message in &self.errors {
            out.push((prefix.to_string(), message.clone()));
        }
        for (key, child) in &self.children {
            let child_prefix = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            child.flatten_into(&child_prefix, out);
        }
    }

    /// Render as the nested `__errors` JSON shape. Empty subtrees are
    /// omitted.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        if !self.errors.is_empty() {
            map.insert(
                "__errors".to_string(),
                Value::Array(self.errors.iter().cloned().map(Value::String).collect()),
            );
        }
        for (key, child) in &self.children {
            if !child.is_empty() {
                map.insert(key.clone(), child.to_value());
            }
        }
        Value::Object(map)
    }
}

/// Collects custom validation errors addressed by dotted paths.
#[derive(Debug, Default)]
pub struct ErrorTreeBuilder {
    tree: ErrorTree,
}

impl ErrorTreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an error at a dotted path; the empty path addresses the form
    /// itself.
    pub fn add_error(&mut self, path: &str, message: &str) {
        let segments = parse_path(path);
        self.tree.insert(&segments, message);
    }

    pub fn build(self) -> ErrorTree {
        self.tree
    }
}

/// Schema validation backend.
///
/// The engine never talks to a validation library directly; swapping the
/// backend (or stubbing it in tests) is a matter of implementing this trait.
pub trait FormValidator {
    /// All violations of `schema` by `data`, with paths in dotted form.
    fn validate(&self, schema: &Value, data: &Value) -> Vec<ErrorEntry>;

    /// Boolean check used for branch matching. `root` supplies shared
    /// definitions for sub-schemas validated on their own.
    fn is_valid(&self, schema: &Value, data: &Value, root: &Value) -> bool;
}

/// [`FormValidator`] backed by the jsonschema crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl FormValidator for JsonSchemaValidator {
    fn validate(&self, schema: &Value, data: &Value) -> Vec<ErrorEntry> {
        let validator = match jsonschema::validator_for(schema) {
            Ok(validator) => validator,
            Err(error) => {
                let mut entry = ErrorEntry::new("", &format!("invalid schema: {}", error));
                entry.kind = "schema".to_string();
                return vec![entry];
            }
        };

        validator
            .iter_errors(data)
            .map(|error| {
                let path = pointer_to_dotted(&error.instance_path.to_string());
                let mut entry = ErrorEntry::new(&path, &error.to_string());
                entry.kind = keyword_of(&error.schema_path.to_string());
                entry
            })
            .collect()
    }

    fn is_valid(&self, schema: &Value, data: &Value, root: &Value) -> bool {
        let grafted = graft_definitions(schema, root);
        jsonschema::is_valid(&grafted, data)
    }
}

/// Everything one validation pass produced.
#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    /// Flat error list, including merged extra errors.
    pub errors: Vec<ErrorEntry>,
    /// The same errors keyed by data path.
    pub error_tree: ErrorTree,
    /// Errors from the validation pass alone, without merged extras.
    pub schema_errors: Vec<ErrorEntry>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Merge externally supplied errors, skipping any already reported at
    /// the same path with the same message.
    pub fn merge_extra(&mut self, extra: &ErrorTree) {
        for (path, message) in extra.flatten() {
            let duplicate = self
                .errors
                .iter()
                .any(|entry| entry.path == path && entry.message == message);
            if duplicate {
                continue;
            }
            let mut entry = ErrorEntry::new(&path, &message);
            entry.kind = "extra".to_string();
            self.error_tree.insert(&parse_path(&path), &message);
            self.errors.push(entry);
        }
    }
}

/// Run schema validation and optional custom validation over `data`.
///
/// Missing data validates as JSON `null`. Custom validation errors land in
/// the same flat list and tree as schema errors.
pub fn run_validation(
    validator: &dyn FormValidator,
    schema: &Value,
    data: Option<&Value>,
    custom_validate: Option<&dyn Fn(Option<&Value>, &mut ErrorTreeBuilder)>,
) -> ValidationOutcome {
    let null = Value::Null;
    let subject = data.unwrap_or(&null);

    let mut outcome = ValidationOutcome::default();
    for entry in validator.validate(schema, subject) {
        outcome
            .error_tree
            .insert(&parse_path(&entry.path), &entry.message);
        outcome.errors.push(entry.clone());
        outcome.schema_errors.push(entry);
    }

    if let Some(custom) = custom_validate {
        let mut builder = ErrorTreeBuilder::new();
        custom(data, &mut builder);
        for (path, message) in builder.build().flatten() {
            let mut entry = ErrorEntry::new(&path, &message);
            entry.kind = "custom".to_string();
            outcome.error_tree.insert(&parse_path(&path), &message);
            outcome.errors.push(entry.clone());
            outcome.schema_errors.push(entry);
        }
    }
    outcome
}

// --- Internal implementation ---

fn pointer_to_dotted(pointer: &str) -> String {
    pointer
        .split('/')
        .filter(|part| !part.is_empty())
        // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
        .map(|part| part.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

fn keyword_of(schema_path: &str) -> String {
    schema_path
        .rsplit('/')
        .find(|part| !part.is_empty() && part.parse::<usize>().is_err())
        .unwrap_or("unknown")
        .to_string()
}

// Sub-schemas validated on their own lose sight of the root's definitions;
// graft them in so local references keep resolving.
fn graft_definitions(schema: &Value, root: &Value) -> Value {
    let (Some(schema_map), Some(root_map)) = (schema.as_object(), root.as_object()) else {
        return schema.clone();
    };
    let mut grafted = schema_map.clone();
    for key in ["definitions", "$defs"] {
        if let Some(defs) = root_map.get(key) {
            grafted.entry(key.to_string()).or_insert_with(|| defs.clone());
        }
    }
    Value::Object(grafted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === Error Tree Tests ===

    #[test]
    fn tree_insert_and_flatten() {
        let mut tree = ErrorTree::default();
        tree.insert(&parse_path("a.b"), "first");
        tree.insert(&parse_path("a.b"), "second");
        tree.insert(&[], "form-level");

        let flat = tree.flatten();
        assert_eq!(
            flat,
            vec![
                ("".to_string(), "form-level".to_string()),
                ("a.b".to_string(), "first".to_string()),
                ("a.b".to_string(), "second".to_string()),
            ]
        );
    }

    #[test]
    fn tree_to_value_uses_errors_marker() {
        let mut tree = ErrorTree::default();
        tree.insert(&parse_path("name"), "is required");
        tree.insert(&[], "top");

        assert_eq!(
            tree.to_value(),
            json!({
                "__errors": ["top"],
                "name": { "__errors": ["is required"] }
            })
        );
    }

    #[test]
    fn builder_splits_dotted_paths() {
        let mut builder = ErrorTreeBuilder::new();
        builder.add_error("pets.0.name", "too short");
        let tree = builder.build();

        assert_eq!(
            tree.children["pets"].children["0"].children["name"].errors,
            vec!["too short"]
        );
    }

    #[test]
    fn empty_tree_reports_empty() {
        let mut tree = ErrorTree::default();
        assert!(tree.is_empty());

        // A child chain with no messages still counts as empty.
        tree.children.entry("a".to_string()).or_default();
        assert!(tree.is_empty());

        tree.insert(&parse_path("a"), "oops");
        assert!(!tree.is_empty());
    }

    // === Validator Tests ===

    #[test]
    fn required_violation_lands_at_parent_path() {
        let schema = json!({
            "type": "object",
            "properties": { "name": { "type": "string" } },
            "required": ["name"]
        });
        let errors = JsonSchemaValidator.validate(&schema, &json!({}));

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "");
        assert_eq!(errors[0].kind, "required");
    }

    #[test]
    fn type_violation_maps_to_dotted_path() {
        let schema = json!({
            "type": "object",
            "properties": { "age": { "type": "integer" } }
        });
        let errors = JsonSchemaValidator.validate(&schema, &json!({ "age": "x" }));

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path, "age");
        assert_eq!(errors[0].kind, "type");
        assert!(errors[0].stack.starts_with("age: "));
    }

    #[test]
    fn uncompilable_schema_reports_single_error() {
        let schema = json!({ "type": 12 });
        let errors = JsonSchemaValidator.validate(&schema, &json!({}));

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, "schema");
    }

    #[test]
    fn is_valid_grafts_root_definitions() {
        let root = json!({
            "definitions": { "name": { "type": "string" } },
            "type": "object"
        });
        let sub = json!({ "$ref": "#/definitions/name" });

        assert!(JsonSchemaValidator.is_valid(&sub, &json!("ok"), &root));
        assert!(!JsonSchemaValidator.is_valid(&sub, &json!(5), &root));
    }

    // === Orchestration Tests ===

    #[test]
    fn missing_data_validates_as_null() {
        let schema = json!({ "type": "object" });
        let outcome = run_validation(&JsonSchemaValidator, &schema, None, None);

        assert!(!outcome.is_valid());
        assert_eq!(outcome.errors[0].path, "");
    }

    #[test]
    fn custom_errors_join_schema_errors() {
        let schema = json!({ "type": "object" });
        let custom = |data: Option<&Value>, builder: &mut ErrorTreeBuilder| {
            if data.and_then(|d| d.get("pass")).is_none() {
                builder.add_error("pass", "required by policy");
            }
        };
        let data = json!({});
        let outcome = run_validation(&JsonSchemaValidator, &schema, Some(&data), Some(&custom));

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, "custom");
        assert_eq!(outcome.errors[0].path, "pass");
        assert_eq!(
            outcome.error_tree.children["pass"].errors,
            vec!["required by policy"]
        );
    }

    #[test]
    fn merge_extra_skips_duplicates() {
        let schema = json!({ "type": "object", "required": ["a"] });
        let data = json!({});
        let mut outcome = run_validation(&JsonSchemaValidator, &schema, Some(&data), None);
        let schema_count = outcome.errors.len();
        assert_eq!(schema_count, 1);

        let mut extra = ErrorTree::default();
        extra.insert(&parse_path("b"), "extra problem");
        extra.insert(&parse_path("b"), "extra problem");
        outcome.merge_extra(&extra);

        assert_eq!(outcome.errors.len(), schema_count + 1);
        assert_eq!(outcome.schema_errors.len(), schema_count);
        assert_eq!(outcome.errors[schema_count].kind, "extra");
    }
}
