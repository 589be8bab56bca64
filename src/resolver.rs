//! Effective schema resolution - expands references, dependencies,
//! conditionals and composition keywords against the current form data.

use serde_json::{Map, Value};

use crate::error::ResolveError;

/// Resolve a schema and all of its sub-schemas against form data.
///
/// Expands `$ref` pointers, applies `dependencies`, selects `oneOf`/`anyOf`
/// branches by best match, merges `allOf` members and evaluates
/// `if`/`then`/`else`, then descends into `properties` and `items` with the
/// matching slice of `data`. Recursive references expand one level per
/// present data level and otherwise stay in place as `$ref` markers.
///
/// `root` is the schema that `$ref` pointers are resolved against, usually
/// the same document as `schema`.
///
/// # Errors
///
/// Returns `ResolveError::UnresolvedReference` if a `$ref` points nowhere.
pub fn resolve(root: &Value, schema: &Value, data: Option<&Value>) -> Result<Value, ResolveError> {
    let mut visited = Vec::new();
    resolve_inner(root, schema, data, &mut visited)
}

/// Resolve a single schema node without descending into its children.
///
/// Useful when only the node's own keywords matter, such as classifying a
/// field or computing its defaults.
///
/// # Errors
///
/// Returns `ResolveError::UnresolvedReference` if a `$ref` points nowhere.
pub fn resolve_node(
    root: &Value,
    schema: &Value,
    data: Option<&Value>,
) -> Result<Value, ResolveError> {
    let mut visited = Vec::new();
    expand_node_full(root, schema, data, &mut visited, 0)
}

/// Merge two schema objects, with `overlay` taking precedence.
///
/// Nested objects merge recursively, `required` arrays merge as an
/// ordered union, and any other conflicting value is taken from `overlay`.
/// Non-object inputs return `overlay` unchanged.
pub fn merge_schemas(base: &Value, overlay: &Value) -> Value {
    let (Value::Object(base_map), Value::Object(overlay_map)) = (base, overlay) else {
        return overlay.clone();
    };

    let mut result = base_map.clone();
    for (key, overlay_value) in overlay_map {
        match (result.get(key), overlay_value) {
            (Some(Value::Array(base_items)), Value::Array(overlay_items))
                if key == "required" =>
            {
                let mut merged = base_items.clone();
                for item in overlay_items {
                    if !merged.contains(item) {
                        merged.push(item.clone());
                    }
                }
                result.insert(key.clone(), Value::Array(merged));
            }
            (Some(base_value @ Value::Object(_)), Value::Object(_)) => {
                let merged = merge_schemas(base_value, overlay_value);
                result.insert(key.clone(), merged);
            }
            _ => {
                result.insert(key.clone(), overlay_value.clone());
            }
        }
    }
    Value::Object(result)
}

/// Look up a local `$ref` pointer inside the root schema.
///
/// Accepts `#`, `#/definitions/name`, `#/$defs/name` and deeper pointers.
///
/// # Errors
///
/// Returns `ResolveError::UnresolvedReference` if the pointer does not lead
/// to a value in `root`.
pub fn find_definition<'a>(root: &'a Value, pointer: &str) -> Result<&'a Value, ResolveError> {
    let path = pointer.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Ok(root);
    }

    let mut current = root;
    for part in path.split('/') {
        // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
        let key = part.replace("~1", "/").replace("~0", "~");
        current = match current {
            Value::Object(map) => map.get(&key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|idx| items.get(idx)),
            _ => None,
        }
        .ok_or_else(|| ResolveError::UnresolvedReference {
            pointer: pointer.to_string(),
        })?;
    }
    Ok(current)
}

// --- Internal implementation ---

fn resolve_inner(
    root: &Value,
    schema: &Value,
    data: Option<&Value>,
    visited: &mut Vec<String>,
) -> Result<Value, ResolveError> {
    let depth = visited.len();
    let expanded = expand_node_full(root, schema, data, visited, depth)?;
    let resolved = resolve_children(root, expanded, data, visited)?;
    visited.truncate(depth);
    Ok(resolved)
}

fn resolve_children(
    root: &Value,
    node: Value,
    data: Option<&Value>,
    visited: &mut Vec<String>,
) -> Result<Value, ResolveError> {
    let mut map = match node {
        Value::Object(map) => map,
        other => return Ok(other),
    };

    // Tuple length before `items` is replaced, for additionalItems data.
    let tuple_len = map
        .get("items")
        .and_then(|v| v.as_array())
        .map(|items| items.len())
        .unwrap_or(0);

    if let Some(Value::Object(children)) = map.get("properties").cloned() {
        let mut resolved_children = Map::new();
        for (key, child) in children {
            let child_data = data.and_then(|d| d.get(key.as_str()));
            let resolved = resolve_inner(root, &child, child_data, visited)?;
            resolved_children.insert(key, resolved);
        }
        map.insert("properties".to_string(), Value::Object(resolved_children));
    }

    if let Some(items) = map.get("items").cloned() {
        match items {
            Value::Object(_) => {
                // One schema for every element; the first element stands in
                // for the data slice.
                let sample = data.and_then(|d| d.as_array()).and_then(|a| a.first());
                let resolved = resolve_inner(root, &items, sample, visited)?;
                map.insert("items".to_string(), resolved);
            }
            Value::Array(positions) => {
                let mut resolved_positions = Vec::with_capacity(positions.len());
                for (index, position) in positions.iter().enumerate() {
                    let element = data.and_then(|d| d.as_array()).and_then(|a| a.get(index));
                    resolved_positions.push(resolve_inner(root, position, element, visited)?);
                }
                map.insert("items".to_string(), Value::Array(resolved_positions));
            }
            _ => {}
        }
    }

    if let Some(additional) = map.get("additionalItems").cloned() {
        if additional.is_object() {
            let element = data.and_then(|d| d.as_array()).and_then(|a| a.get(tuple_len));
            let resolved = resolve_inner(root, &additional, element, visited)?;
            map.insert("additionalItems".to_string(), resolved);
        }
    }

    Ok(Value::Object(map))
}

/// Expand a node's keywords and select any `oneOf`/`anyOf` branch.
pub(crate) fn expand_node_full(
    root: &Value,
    schema: &Value,
    data: Option<&Value>,
    visited: &mut Vec<String>,
    floor: usize,
) -> Result<Value, ResolveError> {
    let mut current = expand_node(root, schema, data, visited, floor)?;
    while let Some((base, branch, _)) = split_variant(root, &current, data) {
        let branch = expand_node(root, &branch, data, visited, floor)?;
        let next = expand_node(root, &merge_schemas(&base, &branch), data, visited, floor)?;
        if next == current {
            break;
        }
        current = next;
    }
    Ok(current)
}

/// Expand `$ref`, `dependencies`, `if`/`then`/`else` and `allOf` on a single
/// node until no such keyword remains or expansion stops making progress.
///
/// `visited` carries the reference pointers already expanded on the path to
/// this node. Entries below `floor` belong to enclosing nodes and only block
/// re-expansion when no data is present at this level; entries at or above
/// `floor` were expanded at this node itself and always block.
pub(crate) fn expand_node(
    root: &Value,
    schema: &Value,
    data: Option<&Value>,
    visited: &mut Vec<String>,
    floor: usize,
) -> Result<Value, ResolveError> {
    let mut current = schema.clone();
    loop {
        let Some(map) = current.as_object() else {
            return Ok(current);
        };

        let next = if let Some(pointer) = map.get("$ref").and_then(|v| v.as_str()) {
            expand_reference(root, map, pointer, data, visited, floor)?
        } else if map.contains_key("dependencies") {
            apply_dependencies(root, map, data, visited, floor)?
        } else if map.contains_key("if") {
            apply_condition(root, map, data, visited, floor)?
        } else if map.contains_key("allOf") {
            merge_all_of(root, map, data, visited, floor)?
        } else {
            return Ok(current);
        };

        if next == current {
            return Ok(current);
        }
        current = next;
    }
}

/// Split off the selected `oneOf`/`anyOf` branch, if the node has one.
///
/// Returns the node without the keyword, the best-matching branch and the
/// keyword name. `oneOf` wins when both are present.
pub(crate) fn split_variant(
    root: &Value,
    node: &Value,
    data: Option<&Value>,
) -> Option<(Value, Value, &'static str)> {
    let map = node.as_object()?;
    let keyword = if map.contains_key("oneOf") {
        "oneOf"
    } else if map.contains_key("anyOf") {
        "anyOf"
    } else {
        return None;
    };

    let mut base = map.clone();
    let branches = match base.shift_remove(keyword) {
        Some(Value::Array(branches)) => branches,
        _ => Vec::new(),
    };
    let index = best_matching_branch(root, &branches, data);
    let branch = branches
        .into_iter()
        .nth(index)
        .unwrap_or_else(|| Value::Object(Map::new()));
    Some((Value::Object(base), branch, keyword))
}

fn best_matching_branch(root: &Value, branches: &[Value], data: Option<&Value>) -> usize {
    let mut best_index = 0;
    let mut best_score = 0;
    for (index, branch) in branches.iter().enumerate() {
        let score = branch_score(root, branch, data);
        if score > best_score {
            best_score = score;
            best_index = index;
        }
    }
    best_index
}

// Score a branch against the data: one point per property whose
// const/enum/type agrees, one per required key present in the data.
fn branch_score(root: &Value, branch: &Value, data: Option<&Value>) -> usize {
    let mut seen = Vec::new();
    let Some(view) = scoring_view(root, branch, &mut seen) else {
        return 0;
    };
    let Some(map) = view.as_object() else {
        return 0;
    };

    let mut score = 0;
    if let Some(properties) = map.get("properties").and_then(|v| v.as_object()) {
        for (key, property) in properties {
            let field = data.and_then(|d| d.get(key.as_str()));
            let mut seen = Vec::new();
            let Some(property) = scoring_view(root, property, &mut seen) else {
                continue;
            };
            let Some(property) = property.as_object() else {
                continue;
            };
            if let Some(expected) = property.get("const") {
                if field.map(|v| v == expected).unwrap_or(false) {
                    score += 1;
                }
            } else if let Some(options) = property.get("enum").and_then(|v| v.as_array()) {
                if field.map(|v| options.contains(v)).unwrap_or(false) {
                    score += 1;
                }
            } else if let (Some(declared), Some(field)) = (property.get("type"), field) {
                if type_matches(declared, field) {
                    score += 1;
                }
            }
        }
    } else if let (Some(declared), Some(value)) = (map.get("type"), data) {
        if type_matches(declared, value) {
            score += 1;
        }
    }

    if let Some(required) = map.get("required").and_then(|v| v.as_array()) {
        for entry in required {
            let present = entry
                .as_str()
                .and_then(|key| data.and_then(|d| d.get(key)))
                .is_some();
            if present {
                score += 1;
            }
        }
    }
    score
}

// Follow a $ref chain far enough to score it, without merging siblings.
fn scoring_view<'a>(
    root: &'a Value,
    schema: &'a Value,
    seen: &mut Vec<String>,
) -> Option<&'a Value> {
    let map = schema.as_object()?;
    let Some(pointer) = map.get("$ref").and_then(|v| v.as_str()) else {
        return Some(schema);
    };
    if seen.iter().any(|s| s == pointer) {
        return None;
    }
    seen.push(pointer.to_string());
    let target = find_definition(root, pointer).ok()?;
    scoring_view(root, target, seen)
}

fn type_matches(declared: &Value, value: &Value) -> bool {
    match declared {
        Value::String(name) => single_type_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(|n| n.as_str())
            .any(|name| single_type_matches(name, value)),
        _ => false,
    }
}

fn single_type_matches(name: &str, value: &Value) -> bool {
    match name {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "string" => value.is_string(),
        "array" => value.is_array(),
        "object" => value.is_object(),
        "number" => value.is_number(),
        "integer" => {
            value.as_i64().is_some()
                || value.as_u64().is_some()
                || value.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
        }
        _ => true,
    }
}

fn expand_reference(
    root: &Value,
    node: &Map<String, Value>,
    pointer: &str,
    data: Option<&Value>,
    visited: &mut Vec<String>,
    floor: usize,
) -> Result<Value, ResolveError> {
    let has_data = data.map(|d| !d.is_null()).unwrap_or(false);
    let ancestor_hit = visited[..floor].iter().any(|seen| seen == pointer);
    let local_hit = visited[floor..].iter().any(|seen| seen == pointer);

    // A pointer already expanded at this node always stops; one expanded at
    // an enclosing node stops unless data is present at this level.
    if local_hit || (ancestor_hit && !has_data) {
        return Ok(Value::Object(node.clone()));
    }

    let target = find_definition(root, pointer)?.clone();
    visited.push(pointer.to_string());

    // Keywords alongside $ref override the referenced schema.
    let mut local = node.clone();
    local.shift_remove("$ref");
    if local.is_empty() {
        return Ok(target);
    }
    Ok(merge_schemas(&target, &Value::Object(local)))
}

fn apply_dependencies(
    root: &Value,
    node: &Map<String, Value>,
    data: Option<&Value>,
    visited: &mut Vec<String>,
    floor: usize,
) -> Result<Value, ResolveError> {
    let mut resolved = node.clone();
    let Some(dependencies) = resolved.shift_remove("dependencies") else {
        return Ok(Value::Object(resolved));
    };
    let Value::Object(dependencies) = dependencies else {
        return Ok(Value::Object(resolved));
    };

    let mut resolved = Value::Object(resolved);
    let mut remaining = dependencies;
    loop {
        let Some(trigger) = next_firing_dependency(&resolved, &remaining, data) else {
            return Ok(resolved);
        };
        let Some(dependency_value) = remaining.shift_remove(&trigger) else {
            return Ok(resolved);
        };
        resolved = match dependency_value {
            Value::Array(required) => with_dependent_required(resolved, &required),
            other => with_dependent_schema(root, resolved, &trigger, &other, data, visited, floor)?,
        };
    }
}

// A dependency fires when its trigger key is present in the data and, if the
// node declares properties, the trigger is one of them.
fn next_firing_dependency(
    resolved: &Value,
    dependencies: &Map<String, Value>,
    data: Option<&Value>,
) -> Option<String> {
    let declared = resolved.get("properties").and_then(|v| v.as_object());
    dependencies
        .keys()
        .find(|trigger| {
            let present = data.and_then(|d| d.get(trigger.as_str())).is_some();
            let known = declared
                .map(|props| props.contains_key(trigger.as_str()))
                .unwrap_or(true);
            present && known
        })
        .cloned()
}

fn with_dependent_required(resolved: Value, additionally_required: &[Value]) -> Value {
    match resolved {
        Value::Object(mut map) => {
            let mut required = map
                .get("required")
                .and_then(|v| v.as_array())
                .cloned()
                .unwrap_or_default();
            for entry in additionally_required {
                if !required.contains(entry) {
                    required.push(entry.clone());
                }
            }
            map.insert("required".to_string(), Value::Array(required));
            Value::Object(map)
        }
        other => other,
    }
}

fn with_dependent_schema(
    root: &Value,
    resolved: Value,
    trigger: &str,
    dependency_value: &Value,
    data: Option<&Value>,
    visited: &mut Vec<String>,
    floor: usize,
) -> Result<Value, ResolveError> {
    let expanded = expand_node(root, dependency_value, data, visited, floor)?;
    let Value::Object(mut dependent) = expanded else {
        return Ok(resolved);
    };
    let one_of = dependent.shift_remove("oneOf");
    let merged = merge_schemas(&resolved, &Value::Object(dependent));
    let Some(Value::Array(branches)) = one_of else {
        return Ok(merged);
    };

    // Discriminated choice: take the first branch whose schema for the
    // trigger property accepts its current value, minus that property.
    let trigger_value = data.and_then(|d| d.get(trigger));
    for branch in &branches {
        let branch = expand_node(root, branch, data, visited, floor)?;
        let Some(condition) = branch.get("properties").and_then(|p| p.get(trigger)) else {
            continue;
        };
        if !conforms(trigger_value, condition, root) {
            continue;
        }
        let Value::Object(mut branch_map) = branch else {
            continue;
        };
        if let Some(Value::Object(properties)) = branch_map.get_mut("properties") {
            properties.shift_remove(trigger);
        }
        return Ok(merge_schemas(&merged, &Value::Object(branch_map)));
    }
    Ok(merged)
}

fn apply_condition(
    root: &Value,
    node: &Map<String, Value>,
    data: Option<&Value>,
    visited: &mut Vec<String>,
    floor: usize,
) -> Result<Value, ResolveError> {
    let mut base = node.clone();
    let Some(expression) = base.shift_remove("if") else {
        return Ok(Value::Object(base));
    };
    let then_branch = base.shift_remove("then");
    let else_branch = base.shift_remove("else");

    let empty = Value::Object(Map::new());
    let subject = data.unwrap_or(&empty);
    let branch = if conforms(Some(subject), &expression, root) {
        then_branch
    } else {
        else_branch
    };
    match branch {
        Some(branch) if branch.is_object() => {
            let expanded = expand_node(root, &branch, data, visited, floor)?;
            Ok(merge_schemas(&Value::Object(base), &expanded))
        }
        _ => Ok(Value::Object(base)),
    }
}

fn merge_all_of(
    root: &Value,
    node: &Map<String, Value>,
    data: Option<&Value>,
    visited: &mut Vec<String>,
    floor: usize,
) -> Result<Value, ResolveError> {
    let mut base = node.clone();
    let Some(all_of) = base.shift_remove("allOf") else {
        return Ok(Value::Object(base));
    };
    let Value::Array(members) = all_of else {
        return Ok(Value::Object(base));
    };

    let mut merged = Value::Object(base);
    for member in &members {
        let expanded = expand_node(root, member, data, visited, floor)?;
        merged = merge_schemas(&merged, &expanded);
    }
    Ok(merged)
}

/// Check whether `data` structurally satisfies `schema`.
///
/// A lightweight check covering the keywords that drive conditional
/// resolution: `type`, `const`, `enum`, `required`, `properties`, `$ref` and
/// the composition keywords. Unknown keywords are ignored rather than
/// enforced.
pub(crate) fn conforms(data: Option<&Value>, schema: &Value, root: &Value) -> bool {
    let mut seen = Vec::new();
    conforms_inner(data, schema, root, &mut seen)
}

fn conforms_inner(
    data: Option<&Value>,
    schema: &Value,
    root: &Value,
    seen: &mut Vec<String>,
) -> bool {
    let map = match schema {
        Value::Bool(allowed) => return *allowed,
        Value::Object(map) => map,
        _ => return true,
    };

    if let Some(pointer) = map.get("$ref").and_then(|v| v.as_str()) {
        if !seen.iter().any(|s| s == pointer) {
            seen.push(pointer.to_string());
            match find_definition(root, pointer) {
                Ok(target) => {
                    if !conforms_inner(data, target, root, seen) {
                        return false;
                    }
                }
                Err(_) => return false,
            }
        }
    }

    if let Some(declared) = map.get("type") {
        let matches = data.map(|value| type_matches(declared, value)).unwrap_or(false);
        if !matches {
            return false;
        }
    }
    if let Some(expected) = map.get("const") {
        let matches = data.map(|value| value == expected).unwrap_or(false);
        if !matches {
            return false;
        }
    }
    if let Some(options) = map.get("enum").and_then(|v| v.as_array()) {
        let matches = data.map(|value| options.contains(value)).unwrap_or(false);
        if !matches {
            return false;
        }
    }
    if let Some(required) = map.get("required").and_then(|v| v.as_array()) {
        match data {
            Some(Value::Object(fields)) => {
                for entry in required {
                    let Some(key) = entry.as_str() else {
                        continue;
                    };
                    if !fields.contains_key(key) {
                        return false;
                    }
                }
            }
            // required only constrains object data
            Some(_) => {}
            None => {
                if !required.is_empty() {
                    return false;
                }
            }
        }
    }
    if let Some(properties) = map.get("properties").and_then(|v| v.as_object()) {
        for (key, property) in properties {
            if let Some(field) = data.and_then(|d| d.get(key.as_str())) {
                if !conforms_inner(Some(field), property, root, seen) {
                    return false;
                }
            }
        }
    }
    if let Some(members) = map.get("allOf").and_then(|v| v.as_array()) {
        for member in members {
            if !conforms_inner(data, member, root, seen) {
                return false;
            }
        }
    }
    if let Some(branches) = map.get("anyOf").and_then(|v| v.as_array()) {
        if !branches.iter().any(|b| conforms_inner(data, b, root, seen)) {
            return false;
        }
    }
    if let Some(branches) = map.get("oneOf").and_then(|v| v.as_array()) {
        if !branches.iter().any(|b| conforms_inner(data, b, root, seen)) {
            return false;
        }
    }
    true
}
