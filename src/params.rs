//! Project an object schema onto path or query parameters.
//!
//! Each top-level property becomes one parameter. A property that is itself
//! an object cannot be expressed as a single parameter value and is a
//! definition error; arrays are fine in a query (`?tag=a&tag=b`) but not in
//! a path.
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ParameterError;
use crate::schema::{self, Found, SchemaPair, Thunk};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
}

/// OpenAPI parameter object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParamLocation,
    pub schema: Value,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
}

pub fn parameters(pair: &SchemaPair, location: ParamLocation) -> Result<Vec<Parameter>, ParameterError> {
    let found = reachable(&pair.found);
    let root = flatten(resolve(&pair.schema, &found), &found);
    if !is_object(&root) {
        return Err(ParameterError::NotAnObject);
    }
    let required: Vec<&str> = root
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    let empty = Map::new();
    let properties = root.get("properties").and_then(Value::as_object).unwrap_or(&empty);

    let mut out = Vec::with_capacity(properties.len());
    for (name, property) in properties {
        let shape = flatten(resolve(property, &found), &found);
        let too_complicated = || match location {
            ParamLocation::Path => ParameterError::Path(name.clone()),
            ParamLocation::Query => ParameterError::Query(name.clone()),
        };
        if is_object(&shape) {
            return Err(too_complicated());
        }
        let (style, explode) = match (is_array(&shape), location) {
            (false, _) => (None, None),
            (true, ParamLocation::Query) => (Some("form".to_string()), Some(true)),
            (true, ParamLocation::Path) => return Err(too_complicated()),
        };
        out.push(Parameter {
            name: name.clone(),
            location,
            schema: property.clone(),
            // path parameters are always required
            required: location == ParamLocation::Path || required.contains(&name.as_str()),
            style,
            explode,
        });
    }
    Ok(out)
}

/// Every thunk reachable from `found`. A parent's `$ref` only shows up in the
/// found map of the child component that mentions it.
fn reachable(found: &Found) -> Found {
    let mut pending: Vec<(String, Thunk)> = found.iter().map(|(name, thunk)| (name.clone(), thunk.clone())).collect();
    let mut all = Found::new();
    while let Some((name, thunk)) = pending.pop() {
        if all.contains_key(&name) {
            continue;
        }
        for (next, next_thunk) in &thunk.force().found {
            if !all.contains_key(next) {
                pending.push((next.clone(), next_thunk.clone()));
            }
        }
        all.insert(name, thunk);
    }
    all
}

/// Follow `$ref`s through the found map until a concrete fragment appears.
fn resolve(schema: &Value, found: &Found) -> Value {
    let mut current = schema.clone();
    let mut seen = Vec::new();
    while let Some(name) = schema::referenced_name(&current).map(str::to_string) {
        if seen.contains(&name) {
            break;
        }
        let Some(thunk) = found.get(&name) else {
            tracing::warn!(component = %name, "cannot resolve parameter schema reference");
            break;
        };
        current = thunk.force().schema.clone();
        seen.push(name);
    }
    current
}

/// Merge an `allOf` chain into one fragment: properties unioned (later
/// members win), `required` lists concatenated.
fn flatten(schema: Value, found: &Found) -> Value {
    let Some(members) = schema.get("allOf").and_then(Value::as_array) else {
        return schema;
    };
    let mut merged = Map::new();
    let mut properties = Map::new();
    let mut required = Vec::<Value>::new();
    for member in members {
        let member = flatten(resolve(member, found), found);
        let Value::Object(map) = member else { continue };
        for (key, value) in map {
            match (key.as_str(), value) {
                ("properties", Value::Object(more)) => properties.extend(more),
                ("required", Value::Array(names)) => {
                    for name in names {
                        if !required.contains(&name) {
                            required.push(name);
                        }
                    }
                }
                (_, value) => {
                    merged.insert(key, value);
                }
            }
        }
    }
    if let Value::Object(outer) = &schema {
        for (key, value) in outer {
            if key != "allOf" {
                merged.insert(key.clone(), value.clone());
            }
        }
    }
    if !properties.is_empty() {
        merged.insert("properties".into(), Value::Object(properties));
        merged.insert("type".into(), Value::from("object"));
    }
    if !required.is_empty() {
        merged.insert("required".into(), Value::Array(required));
    }
    Value::Object(merged)
}

fn is_object(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("object") || schema.get("properties").is_some()
}

fn is_array(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("array")
}

// ------------------------------- Tests ------------------------------------ //
