//! Default value computation under configurable population policies.

use serde_json::{Map, Value};

use crate::resolver::{expand_node, merge_schemas, split_variant};
use crate::types::{ArrayMinItems, ConstAsDefaults, DefaultsPolicy, EmptyObjectFields};

/// Compute the effective form data for `schema`, layering `data` over the
/// schema's defaults under `policy`.
///
/// Present data always wins over defaults; `null` data takes the default.
/// `const` values and single-entry enums count as defaults when the policy
/// allows them. Returns `None` when neither data nor defaults produce a
/// value. Schemas that fail to expand yield the data unchanged, so this
/// never errors.
pub fn compute_defaults(
    root: &Value,
    schema: &Value,
    data: Option<&Value>,
    policy: &DefaultsPolicy,
) -> Option<Value> {
    let mut visited = Vec::new();
    compute_node(root, schema, data, policy, &mut visited, false, false)
}

// --- Internal implementation ---

fn compute_node(
    root: &Value,
    schema: &Value,
    data: Option<&Value>,
    policy: &DefaultsPolicy,
    visited: &mut Vec<String>,
    in_oneof: bool,
    required: bool,
) -> Option<Value> {
    let depth = visited.len();
    let result = compute_node_inner(root, schema, data, policy, visited, depth, in_oneof, required);
    visited.truncate(depth);
    result
}

fn compute_node_inner(
    root: &Value,
    schema: &Value,
    data: Option<&Value>,
    policy: &DefaultsPolicy,
    visited: &mut Vec<String>,
    floor: usize,
    mut in_oneof: bool,
    required: bool,
) -> Option<Value> {
    let Ok(mut node) = expand_node(root, schema, data, visited, floor) else {
        return data.cloned();
    };
    while let Some((base, branch, keyword)) = split_variant(root, &node, data) {
        if keyword == "oneOf" {
            in_oneof = true;
        }
        let Ok(branch) = expand_node(root, &branch, data, visited, floor) else {
            return data.cloned();
        };
        let Ok(next) = expand_node(root, &merge_schemas(&base, &branch), data, visited, floor)
        else {
            return data.cloned();
        };
        if next == node {
            break;
        }
        node = next;
    }

    let Some(map) = node.as_object() else {
        return data.cloned();
    };

    let const_allowed = match policy.const_as_defaults {
        ConstAsDefaults::Always => true,
        ConstAsDefaults::SkipOneOf => !in_oneof,
        ConstAsDefaults::Never => false,
    };
    let constant = if const_allowed { constant_value(map) } else { None };
    let seed = constant.or_else(|| map.get("default"));

    match schema_kind(map) {
        SchemaKind::Object => {
            compute_object(root, map, data, policy, visited, in_oneof, required, seed)
        }
        SchemaKind::Array => {
            compute_array(root, map, data, policy, visited, in_oneof, required, seed)
        }
        SchemaKind::Other => match data {
            Some(Value::Null) => Some(seed.cloned().unwrap_or(Value::Null)),
            Some(value) => Some(value.clone()),
            None => seed.cloned(),
        },
    }
}

#[allow(clippy::too_many_arguments)]
fn compute_object(
    root: &Value,
    map: &Map<String, Value>,
    data: Option<&Value>,
    policy: &DefaultsPolicy,
    visited: &mut Vec<String>,
    in_oneof: bool,
    required: bool,
    seed: Option<&Value>,
) -> Option<Value> {
    // Mismatched scalar data passes through untouched.
    if let Some(value) = data {
        if !value.is_null() && !value.is_object() {
            return Some(value.clone());
        }
    }
    let fields = data.and_then(|d| d.as_object());
    let required_keys: Vec<&str> = map
        .get("required")
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
        .unwrap_or_default();

    let mut out = Map::new();
    let properties = map.get("properties").and_then(|v| v.as_object());
    if let Some(properties) = properties {
        for (key, child_schema) in properties {
            let child_required = required_keys.contains(&key.as_str());
            let child_data = fields.and_then(|f| f.get(key));
            if let Some(value) = child_data {
                let computed = compute_node(
                    root,
                    child_schema,
                    Some(value),
                    policy,
                    visited,
                    in_oneof,
                    child_required,
                )
                .unwrap_or_else(|| value.clone());
                out.insert(key.clone(), computed);
            } else {
                let computed = compute_node(
                    root,
                    child_schema,
                    None,
                    policy,
                    visited,
                    in_oneof,
                    child_required,
                );
                let declares_default = child_schema
                    .as_object()
                    .map(|m| m.contains_key("default") || constant_value(m).is_some())
                    .unwrap_or(false);
                maybe_add_child(
                    &mut out,
                    key,
                    computed,
                    child_required,
                    required,
                    declares_default,
                    policy,
                );
            }
        }
    }

    // Data keys beyond the declared properties: compute through the
    // additionalProperties schema when there is one, else keep verbatim.
    let additional = map.get("additionalProperties");
    if let Some(fields) = fields {
        for (key, value) in fields {
            let declared = properties.map(|p| p.contains_key(key)).unwrap_or(false);
            if declared {
                continue;
            }
            match additional {
                Some(ap @ Value::Object(_)) => {
                    let computed =
                        compute_node(root, ap, Some(value), policy, visited, in_oneof, true)
                            .unwrap_or_else(|| value.clone());
                    out.insert(key.clone(), computed);
                }
                _ => {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
    }

    let mut result = Value::Object(out);
    if let Some(seed @ Value::Object(_)) = seed {
        result = merge_under(seed, &result);
    }
    Some(result)
}

// Mirrors the rules for attaching a computed child default to its parent:
// empty objects only stay when required (never under skip-empty), scalars
// stay per policy, and a declared default or const keeps its property even
// under populate-required.
fn maybe_add_child(
    out: &mut Map<String, Value>,
    key: &str,
    computed: Option<Value>,
    is_required: bool,
    parent_required: bool,
    has_default: bool,
    policy: &DefaultsPolicy,
) {
    if policy.empty_object_fields == EmptyObjectFields::SkipDefaults {
        return;
    }
    match computed {
        Some(Value::Object(map)) => {
            let keep = if policy.empty_object_fields == EmptyObjectFields::SkipEmpty {
                !map.is_empty()
            } else {
                (!map.is_empty() || is_required || has_default)
                    && (parent_required
                        || policy.empty_object_fields != EmptyObjectFields::PopulateRequired)
            };
            if keep {
                out.insert(key.to_string(), Value::Object(map));
            }
        }
        Some(other) => {
            let keep = matches!(
                policy.empty_object_fields,
                EmptyObjectFields::PopulateAll | EmptyObjectFields::SkipEmpty
            ) || is_required
                || has_default;
            if keep {
                out.insert(key.to_string(), other);
            }
        }
        None => {}
    }
}

#[allow(clippy::too_many_arguments)]
fn compute_array(
    root: &Value,
    map: &Map<String, Value>,
    data: Option<&Value>,
    policy: &DefaultsPolicy,
    visited: &mut Vec<String>,
    in_oneof: bool,
    required: bool,
    seed: Option<&Value>,
) -> Option<Value> {
    if let Some(value) = data {
        if !value.is_null() && !value.is_array() {
            return Some(value.clone());
        }
    }

    // Seed entries from the declared default, injecting item defaults.
    let mut defaults: Option<Vec<Value>> = match seed {
        Some(Value::Array(entries)) => Some(
            entries
                .iter()
                .enumerate()
                .map(|(idx, entry)| {
                    let item_schema = item_schema_at(map, Some(idx), true);
                    compute_node(
                        root,
                        &item_schema,
                        Some(entry),
                        policy,
                        visited,
                        in_oneof,
                        required,
                    )
                    .unwrap_or_else(|| entry.clone())
                })
                .collect(),
        ),
        _ => None,
    };

    // Tuple positions contribute positional defaults when nothing else does.
    if defaults.is_none() {
        if let Some(Value::Array(positions)) = map.get("items") {
            let computed: Vec<Option<Value>> = positions
                .iter()
                .map(|position| {
                    compute_node(root, position, None, policy, visited, in_oneof, required)
                })
                .collect();
            if computed.iter().any(|entry| entry.is_some()) {
                defaults = Some(
                    computed
                        .into_iter()
                        .map(|entry| entry.unwrap_or(Value::Null))
                        .collect(),
                );
            }
        }
    }

    if let Some(elements) = data.and_then(|d| d.as_array()) {
        if policy.array_min_items == ArrayMinItems::Never {
            defaults = Some(elements.clone());
        } else {
            let folded = elements
                .iter()
                .enumerate()
                .map(|(idx, element)| {
                    let item_schema = item_schema_at(map, Some(idx), true);
                    let computed = compute_node(
                        root,
                        &item_schema,
                        Some(element),
                        policy,
                        visited,
                        in_oneof,
                        required,
                    )
                    .unwrap_or_else(|| element.clone());
                    match defaults.as_ref().and_then(|d| d.get(idx)) {
                        Some(seeded) => merge_under(seeded, &computed),
                        None => computed,
                    }
                })
                .collect();
            defaults = Some(folded);
        }
    }

    if policy.array_min_items == ArrayMinItems::Never {
        return match defaults {
            Some(entries) => Some(Value::Array(entries)),
            None => empty_array_default(policy),
        };
    }
    if policy.array_min_items == ArrayMinItems::RequiredOnly && !required {
        return defaults.map(Value::Array);
    }

    let min_items = map.get("minItems").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
    let current_len = defaults.as_ref().map(|d| d.len()).unwrap_or(0);
    if min_items == 0 || is_multiselect(map) || min_items <= current_len {
        return match defaults {
            Some(entries) => Some(Value::Array(entries)),
            None => empty_array_default(policy),
        };
    }

    let mut entries = defaults.unwrap_or_default();
    let filler_schema = item_schema_at(map, Some(entries.len()), true);
    let filler = compute_node(root, &filler_schema, None, policy, visited, in_oneof, required)
        .unwrap_or(Value::Null);
    let missing = min_items - entries.len();
    entries.extend(std::iter::repeat(filler).take(missing));
    Some(Value::Array(entries))
}

fn empty_array_default(policy: &DefaultsPolicy) -> Option<Value> {
    if policy.empty_object_fields == EmptyObjectFields::SkipEmpty {
        None
    } else {
        Some(Value::Array(Vec::new()))
    }
}

/// Schema for the array item at `idx`: the tuple position when in range,
/// the single item schema otherwise, then `additionalItems` when allowed.
fn item_schema_at(map: &Map<String, Value>, idx: Option<usize>, use_additional: bool) -> Value {
    match map.get("items") {
        Some(Value::Array(positions)) => {
            if let Some(idx) = idx {
                if let Some(position @ Value::Object(_)) = positions.get(idx) {
                    return position.clone();
                }
            }
        }
        Some(items @ Value::Object(_)) => return items.clone(),
        _ => {}
    }
    if use_additional {
        if let Some(additional @ Value::Object(_)) = map.get("additionalItems") {
            return additional.clone();
        }
    }
    Value::Object(Map::new())
}

// Multi-select arrays (unique items over an enum) are never pre-filled.
fn is_multiselect(map: &Map<String, Value>) -> bool {
    let unique = map
        .get("uniqueItems")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !unique {
        return false;
    }
    map.get("items")
        .and_then(|v| v.as_object())
        .map(|items| items.contains_key("enum"))
        .unwrap_or(false)
}

// const, or a single-entry enum acting as one
fn constant_value(map: &Map<String, Value>) -> Option<&Value> {
    map.get("const").or_else(|| {
        map.get("enum")
            .and_then(|v| v.as_array())
            .and_then(|options| if options.len() == 1 { options.first() } else { None })
    })
}

enum SchemaKind {
    Object,
    Array,
    Other,
}

fn schema_kind(map: &Map<String, Value>) -> SchemaKind {
    let declared = match map.get("type") {
        Some(Value::String(name)) => Some(name.as_str()),
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(|n| n.as_str())
            .find(|name| *name != "null"),
        _ => None,
    };
    match declared {
        Some("object") => SchemaKind::Object,
        Some("array") => SchemaKind::Array,
        Some(_) => SchemaKind::Other,
        None => {
            if map.contains_key("properties") || map.contains_key("additionalProperties") {
                SchemaKind::Object
            } else if map.contains_key("items") {
                SchemaKind::Array
            } else {
                SchemaKind::Other
            }
        }
    }
}

/// Deep merge where `overlay` wins; `base` supplies missing object keys and
/// fills array entries position by position.
fn merge_under(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut out = base_map.clone();
            for (key, value) in overlay_map {
                match base_map.get(key) {
                    Some(existing) => {
                        out.insert(key.clone(), merge_under(existing, value));
                    }
                    None => {
                        out.insert(key.clone(), value.clone());
                    }
                }
            }
            Value::Object(out)
        }
        (Value::Array(base_items), Value::Array(overlay_items)) => {
            let merged = overlay_items
                .iter()
                .enumerate()
                .map(|(idx, item)| match base_items.get(idx) {
                    Some(base_item) => merge_under(base_item, item),
                    None => item.clone(),
                })
                .collect();
            Value::Array(merged)
        }
        _ => overlay.clone(),
    }
}
