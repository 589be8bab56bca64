//! Core types for form state resolution: data paths, population policies,
//! and controller options.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Returns the JSON type name for error messages and field classification.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One step into a JSON document: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => f.write_str(key),
            PathSegment::Index(idx) => write!(f, "{}", idx),
        }
    }
}

/// Ordered segments addressing one value inside form data.
pub type DataPath = Vec<PathSegment>;

/// Parse a dotted path into segments.
///
/// Accepts both `a.b.0` and `a.b[0]` spellings. Purely numeric segments
/// become array indices.
pub fn parse_path(text: &str) -> DataPath {
    let normalized = text.replace('[', ".").replace(']', "");
    normalized
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<usize>() {
            Ok(idx) => PathSegment::Index(idx),
            Err(_) => PathSegment::Key(part.to_string()),
        })
        .collect()
}

/// Render a path in dotted form (`a.0.b`). The root path renders empty.
pub fn format_path(path: &[PathSegment]) -> String {
    path.iter()
        .map(|segment| segment.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// Read the value at `path`, if present.
pub fn get_at<'a>(value: &'a Value, path: &[PathSegment]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = match segment {
            PathSegment::Key(key) => current.get(key.as_str())?,
            PathSegment::Index(idx) => current.get(*idx)?,
        };
    }
    Some(current)
}

/// Mutable variant of [`get_at`].
pub fn get_at_mut<'a>(value: &'a mut Value, path: &[PathSegment]) -> Option<&'a mut Value> {
    let mut current = value;
    for segment in path {
        current = match segment {
            PathSegment::Key(key) => current.get_mut(key.as_str())?,
            PathSegment::Index(idx) => current.get_mut(*idx)?,
        };
    }
    Some(current)
}

/// Write `new_value` at `path`, creating intermediate objects and arrays.
///
/// A key segment through a non-object replaces it with an object; an index
/// segment through a non-array replaces it with an array padded with nulls.
pub fn set_at(target: &mut Value, path: &[PathSegment], new_value: Value) {
    match path.split_first() {
        None => *target = new_value,
        Some((PathSegment::Key(key), rest)) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(map) = target {
                let slot = map.entry(key.clone()).or_insert(Value::Null);
                set_at(slot, rest, new_value);
            }
        }
        Some((PathSegment::Index(idx), rest)) => {
            if !target.is_array() {
                *target = Value::Array(Vec::new());
            }
            if let Value::Array(items) = target {
                while items.len() <= *idx {
                    items.push(Value::Null);
                }
                set_at(&mut items[*idx], rest, new_value);
            }
        }
    }
}

/// Remove and return the value at `path`. Sibling order is preserved.
///
/// Returns `None` when the path does not exist or addresses the root.
pub fn remove_at(target: &mut Value, path: &[PathSegment]) -> Option<Value> {
    let (last, parents) = path.split_last()?;
    let mut current = target;
    for segment in parents {
        current = match segment {
            PathSegment::Key(key) => current.get_mut(key.as_str())?,
            PathSegment::Index(idx) => current.get_mut(*idx)?,
        };
    }
    match (last, current) {
        (PathSegment::Key(key), Value::Object(map)) => map.shift_remove(key),
        (PathSegment::Index(idx), Value::Array(items)) => {
            if *idx < items.len() {
                Some(items.remove(*idx))
            } else {
                None
            }
        }
        _ => None,
    }
}

/// When live validation or live trimming runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LiveTrigger {
    /// Only on explicit submit or validate calls.
    #[default]
    Off,
    /// After every data change.
    OnChange,
    /// When a field loses focus.
    OnBlur,
}

impl LiveTrigger {
    /// Parse a trigger value from a string.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "off" => Some(LiveTrigger::Off),
            "on-change" => Some(LiveTrigger::OnChange),
            "on-blur" => Some(LiveTrigger::OnBlur),
            _ => None,
        }
    }
}

/// How `minItems` drives synthetic array entries in computed defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArrayMinItems {
    /// Pad every array up to its `minItems`.
    #[default]
    All,
    /// Pad only arrays that are required in their parent object.
    RequiredOnly,
    /// Never synthesize entries; existing data passes through untouched.
    Never,
}

impl ArrayMinItems {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(ArrayMinItems::All),
            "required-only" => Some(ArrayMinItems::RequiredOnly),
            "never" => Some(ArrayMinItems::Never),
            _ => None,
        }
    }
}

/// How object properties without data receive computed defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmptyObjectFields {
    /// Populate every declared default; object and array properties
    /// materialize as empty containers when nothing deeper applies.
    #[default]
    PopulateAll,
    /// Populate required members, plus any carrying an actual default or
    /// const.
    PopulateRequired,
    /// Populate nothing; existing data passes through untouched.
    SkipDefaults,
    /// Populate defaults but drop empty containers they would produce.
    SkipEmpty,
}

impl EmptyObjectFields {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "populate-all" => Some(EmptyObjectFields::PopulateAll),
            "populate-required" => Some(EmptyObjectFields::PopulateRequired),
            "skip-defaults" => Some(EmptyObjectFields::SkipDefaults),
            "skip-empty" => Some(EmptyObjectFields::SkipEmpty),
            _ => None,
        }
    }
}

/// Whether `const` (and single-value `enum`) seeds computed defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstAsDefaults {
    /// `const` always wins over `default`.
    #[default]
    Always,
    /// `const` is ignored inside a selected `oneOf` branch and below.
    SkipOneOf,
    /// `const` never seeds defaults.
    Never,
}

impl ConstAsDefaults {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "always" => Some(ConstAsDefaults::Always),
            "skip-one-of" => Some(ConstAsDefaults::SkipOneOf),
            "never" => Some(ConstAsDefaults::Never),
            _ => None,
        }
    }
}

/// Population policies for default computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DefaultsPolicy {
    pub array_min_items: ArrayMinItems,
    pub empty_object_fields: EmptyObjectFields,
    pub const_as_defaults: ConstAsDefaults,
}

/// Options for the form state controller.
#[derive(Debug, Clone)]
pub struct FormOptions {
    /// Identifier given to the root field; children append below it.
    pub id_prefix: String,
    /// Separator between identifier segments.
    pub id_separator: String,
    /// When validation runs without an explicit submit.
    pub live_validate: LiveTrigger,
    /// Skip validation entirely, including on submit.
    pub no_validate: bool,
    /// Drop data keys that no resolved field addresses.
    pub omit_extra_data: bool,
    /// When extra-data trimming runs before submit.
    pub live_omit: LiveTrigger,
    /// Population policies for computed defaults.
    pub defaults: DefaultsPolicy,
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            id_prefix: "root".to_string(),
            id_separator: "_".to_string(),
            live_validate: LiveTrigger::Off,
            no_validate: false,
            omit_extra_data: false,
            live_omit: LiveTrigger::Off,
            defaults: DefaultsPolicy::default(),
        }
    }
}

impl FormOptions {
    /// Set when live validation runs.
    pub fn live_validate(mut self, trigger: LiveTrigger) -> Self {
        self.live_validate = trigger;
        self
    }

    /// Enable dropping of data keys outside the resolved field set.
    pub fn omit_extra_data(mut self, omit: bool) -> Self {
        self.omit_extra_data = omit;
        self
    }

    /// Set when extra-data trimming runs.
    pub fn live_omit(mut self, trigger: LiveTrigger) -> Self {
        self.live_omit = trigger;
        self
    }

    /// Set the population policies for computed defaults.
    pub fn defaults(mut self, policy: DefaultsPolicy) -> Self {
        self.defaults = policy;
        self
    }
}
