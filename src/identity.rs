//! Field identity - stable ids and data paths for every field the
//! resolved schema describes, and the extra-data trimming built on them.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ResolveError;
use crate::resolver::expand_node_full;
use crate::types::{get_at, json_type_name, set_at, DataPath, PathSegment};

/// What widget family a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
    /// Fields constrained to an enumerated set of values.
    Select,
    /// Nothing known about the field, including unexpanded recursion points.
    #[default]
    Unknown,
}

/// One field in the identity tree.
///
/// `id` is the DOM-style identifier assembled from the prefix and separator;
/// `path` addresses the field's value inside the form data. Fields admitted
/// by `additionalProperties` for a dynamic data key carry `additional`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct IdentityNode {
    pub id: String,
    pub path: DataPath,
    pub kind: FieldKind,
    pub additional: bool,
    pub children: Vec<IdentityNode>,
}

/// Build the identity tree for a schema against the current form data.
///
/// Object children follow the declared properties plus one node per dynamic
/// data key when `additionalProperties` admits it; array children follow the
/// data elements. `root_id` overrides `id_prefix` for the root field only.
///
/// # Errors
///
/// Returns `ResolveError::UnresolvedReference` if a `$ref` points nowhere.
pub fn build_identity(
    root: &Value,
    schema: &Value,
    root_id: Option<&str>,
    data: Option<&Value>,
    id_prefix: &str,
    id_separator: &str,
) -> Result<IdentityNode, ResolveError> {
    let base_id = root_id.unwrap_or(id_prefix).to_string();
    let mut visited = Vec::new();
    identity_node(
        root,
        schema,
        data,
        base_id,
        Vec::new(),
        id_separator,
        &mut visited,
    )
}

/// Collect the data paths the identity tree addresses.
///
/// A path is recorded where the walk bottoms out: at dynamic
/// `additionalProperties` fields (whose subtree is kept wholesale), and at
/// fields whose data is scalar, absent, an empty container or an array of
/// scalars. The root itself is never recorded.
pub fn extract_paths(identity: &IdentityNode, data: Option<&Value>) -> Vec<DataPath> {
    let mut paths = Vec::new();
    collect_paths(identity, data, &mut paths);
    paths
}

/// Keep only the parts of `data` that `paths` address.
///
/// With no paths, scalar data passes through and containers collapse to
/// their empty form. Paths that address nothing are skipped.
pub fn used_form_data(data: Option<&Value>, paths: &[DataPath]) -> Option<Value> {
    let value = data?;
    if paths.is_empty() {
        if !value.is_object() && !value.is_array() {
            return Some(value.clone());
        }
        return Some(match value {
            Value::Array(_) => Value::Array(Vec::new()),
            _ => Value::Object(Map::new()),
        });
    }

    let mut out = match value {
        Value::Array(_) => Value::Array(Vec::new()),
        _ => Value::Object(Map::new()),
    };
    for path in paths {
        if let Some(found) = get_at(value, path) {
            set_at(&mut out, path, found.clone());
        }
    }
    Some(out)
}

// --- Internal implementation ---

fn identity_node(
    root: &Value,
    schema: &Value,
    data: Option<&Value>,
    id: String,
    path: DataPath,
    separator: &str,
    visited: &mut Vec<String>,
) -> Result<IdentityNode, ResolveError> {
    let depth = visited.len();
    let expanded = expand_node_full(root, schema, data, visited, depth)?;

    let Some(map) = expanded.as_object() else {
        visited.truncate(depth);
        return Ok(IdentityNode {
            id,
            path,
            kind: FieldKind::Unknown,
            additional: false,
            children: Vec::new(),
        });
    };

    let kind = classify(map, data);
    let mut children = Vec::new();

    // An unexpanded recursion point keeps its $ref and gets no children.
    if kind != FieldKind::Unknown {
        let declared = map.get("properties").and_then(|v| v.as_object());
        if let Some(properties) = declared {
            for (key, child_schema) in properties {
                let child_id = format!("{}{}{}", id, separator, key);
                let mut child_path = path.clone();
                child_path.push(PathSegment::Key(key.clone()));
                let child_data = data.and_then(|d| d.get(key.as_str()));
                children.push(identity_node(
                    root,
                    child_schema,
                    child_data,
                    child_id,
                    child_path,
                    separator,
                    visited,
                )?);
            }
        }

        let additional = map.get("additionalProperties");
        let admits_dynamic = matches!(additional, Some(Value::Object(_)) | Some(Value::Bool(true)));
        if admits_dynamic {
            if let Some(fields) = data.and_then(|d| d.as_object()) {
                for (key, value) in fields {
                    let known = declared.map(|p| p.contains_key(key)).unwrap_or(false);
                    if known {
                        continue;
                    }
                    let child_schema = match additional {
                        Some(ap @ Value::Object(_)) => ap.clone(),
                        _ => Value::Object(Map::new()),
                    };
                    let child_id = format!("{}{}{}", id, separator, key);
                    let mut child_path = path.clone();
                    child_path.push(PathSegment::Key(key.clone()));
                    let mut child = identity_node(
                        root,
                        &child_schema,
                        Some(value),
                        child_id,
                        child_path,
                        separator,
                        visited,
                    )?;
                    child.additional = true;
                    children.push(child);
                }
            }
        }

        if map.contains_key("items") {
            if let Some(elements) = data.and_then(|d| d.as_array()) {
                for (index, element) in elements.iter().enumerate() {
                    let child_schema = element_schema(map, index);
                    let child_id = format!("{}{}{}", id, separator, index);
                    let mut child_path = path.clone();
                    child_path.push(PathSegment::Index(index));
                    children.push(identity_node(
                        root,
                        &child_schema,
                        Some(element),
                        child_id,
                        child_path,
                        separator,
                        visited,
                    )?);
                }
            }
        }
    }

    visited.truncate(depth);
    Ok(IdentityNode {
        id,
        path,
        kind,
        additional: false,
        children,
    })
}

fn classify(map: &Map<String, Value>, data: Option<&Value>) -> FieldKind {
    if map.contains_key("$ref") {
        return FieldKind::Unknown;
    }
    if map.contains_key("enum") {
        return FieldKind::Select;
    }
    let declared = match map.get("type") {
        Some(Value::String(name)) => Some(name.as_str()),
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(|n| n.as_str())
            .find(|name| *name != "null"),
        _ => None,
    };
    if let Some(name) = declared {
        return kind_from_type_name(name);
    }
    if map.contains_key("properties") || map.contains_key("additionalProperties") {
        return FieldKind::Object;
    }
    if map.contains_key("items") {
        return FieldKind::Array;
    }
    if let Some(value) = data {
        return kind_from_type_name(json_type_name(value));
    }
    FieldKind::Unknown
}

fn kind_from_type_name(name: &str) -> FieldKind {
    match name {
        "object" => FieldKind::Object,
        "array" => FieldKind::Array,
        "string" => FieldKind::String,
        "number" => FieldKind::Number,
        "integer" => FieldKind::Integer,
        "boolean" => FieldKind::Boolean,
        "null" => FieldKind::Null,
        _ => FieldKind::Unknown,
    }
}

fn element_schema(map: &Map<String, Value>, index: usize) -> Value {
    match map.get("items") {
        Some(Value::Array(positions)) => {
            if let Some(position @ Value::Object(_)) = positions.get(index) {
                return position.clone();
            }
            if let Some(additional @ Value::Object(_)) = map.get("additionalItems") {
                return additional.clone();
            }
        }
        Some(items @ Value::Object(_)) => return items.clone(),
        _ => {}
    }
    Value::Object(Map::new())
}

fn collect_paths(node: &IdentityNode, root_data: Option<&Value>, paths: &mut Vec<DataPath>) {
    if !node.path.is_empty() {
        if node.additional {
            paths.push(node.path.clone());
            return;
        }
        let value = root_data.and_then(|d| get_at(d, &node.path));
        if bottoms_out(value) {
            paths.push(node.path.clone());
            return;
        }
    }
    for child in &node.children {
        collect_paths(child, root_data, paths);
    }
}

// Scalars, absent values, empty containers and arrays of scalars are kept
// whole rather than walked further.
fn bottoms_out(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::Object(map)) => map.is_empty(),
        Some(Value::Array(items)) => {
            items.is_empty() || items.iter().all(|item| !item.is_object() && !item.is_array())
        }
        Some(_) => true,
    }
}
