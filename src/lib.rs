//! Schema Form Core
//!
//! Headless form state resolution over JSON Schema.
//!
//! This library turns a JSON Schema and (possibly partial) form data into a
//! resolved per-field schema tree, computed default values, stable field
//! identifiers, and structured validation errors, with a controller that
//! keeps all of them consistent across external updates and user edits.
//!
//! # Example
//!
//! ```
//! use schema_form::{compute_defaults, resolve, DefaultsPolicy};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "definitions": {
//!         "kind": { "type": "string", "enum": ["basic"] }
//!     },
//!     "type": "object",
//!     "properties": {
//!         "name": { "type": "string", "default": "untitled" },
//!         "kind": { "$ref": "#/definitions/kind" }
//!     }
//! });
//!
//! // References disappear from the resolved schema.
//! let resolved = resolve(&schema, &schema, None).unwrap();
//! assert!(resolved["properties"]["kind"].get("$ref").is_none());
//!
//! // Defaults come from `default` keywords and single-value enums.
//! let defaults = compute_defaults(&schema, &schema, None, &DefaultsPolicy::default());
//! assert_eq!(defaults, Some(json!({ "name": "untitled", "kind": "basic" })));
//! ```
//!
//! # Population Policies
//!
//! Default computation is steered by three policies:
//!
//! | Policy | Values | Controls |
//! |--------|--------|----------|
//! | `array_min_items` | `all`, `required-only`, `never` | Synthetic array entries up to `minItems` |
//! | `empty_object_fields` | `populate-all`, `populate-required`, `skip-defaults`, `skip-empty` | Which object properties receive defaults |
//! | `const_as_defaults` | `always`, `skip-one-of`, `never` | Whether `const` values seed defaults |
//!
//! # Pipeline
//!
//! [`FormStateController`] runs resolution, defaults, identity, and
//! validation as one synchronous pass per state transition; observers only
//! ever see a complete snapshot.

mod controller;
mod defaults;
mod error;
mod identity;
mod loader;
mod resolver;
mod types;
mod validation;

pub use controller::{
    ChangeNotice, CustomValidate, FormStateController, FormStateSnapshot, SubmitOutcome,
};
pub use defaults::compute_defaults;
pub use error::ResolveError;
pub use identity::{build_identity, extract_paths, used_form_data, FieldKind, IdentityNode};
pub use loader::{load_document, load_document_str};
pub use resolver::{find_definition, merge_schemas, resolve, resolve_node};
pub use types::{
    format_path, get_at, get_at_mut, json_type_name, parse_path, remove_at, set_at, ArrayMinItems,
    ConstAsDefaults, DataPath, DefaultsPolicy, EmptyObjectFields, FormOptions, LiveTrigger,
    PathSegment,
};
pub use validation::{
    run_validation, ErrorEntry, ErrorTree, ErrorTreeBuilder, FormValidator, JsonSchemaValidator,
    ValidationOutcome,
};
