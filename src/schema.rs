//! OpenAPI schema fragments shared by the Input and Output interpreters.
//!
//! Every node answers `schema()` with a [`SchemaPair`]: its own fragment and
//! a lazy map of the named components it references. Thunks are forced at
//! most once, so a definition cycle only ever costs one resolution per name.
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use serde_json::{Map, Value, json};

pub const COMPONENTS_PREFIX: &str = "#/components/schemas/";

// ————————————————————————————————————————————————————————————————————————————
// THUNKS
// ————————————————————————————————————————————————————————————————————————————

/// Memoized schema producer for one named component.
///
/// Forcing a thunk from inside its own producer is a definition bug
/// (a cycle with no `$ref` in between) and is not handled.
#[derive(Clone)]
pub struct Thunk(Arc<ThunkInner>);

struct ThunkInner {
    cell: OnceCell<SchemaPair>,
    produce: Box<dyn Fn() -> SchemaPair + Send + Sync>,
}

impl Thunk {
    pub fn new(produce: impl Fn() -> SchemaPair + Send + Sync + 'static) -> Self {
        Thunk(Arc::new(ThunkInner { cell: OnceCell::new(), produce: Box::new(produce) }))
    }

    pub fn force(&self) -> &SchemaPair {
        self.0.cell.get_or_init(|| (self.0.produce)())
    }

    pub fn is_forced(&self) -> bool {
        self.0.cell.get().is_some()
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thunk").field("forced", &self.is_forced()).finish()
    }
}

pub type Found = IndexMap<String, Thunk>;

/// `[schema, foundTypes]`.
#[derive(Debug, Clone)]
pub struct SchemaPair {
    pub schema: Value,
    pub found: Found,
}

impl SchemaPair {
    pub fn new(schema: Value) -> Self {
        Self { schema, found: Found::new() }
    }

    pub fn with_found(mut self, found: Found) -> Self {
        absorb(&mut self.found, found);
        self
    }

    pub fn map_schema(self, f: impl FnOnce(Value) -> Value) -> Self {
        SchemaPair { schema: f(self.schema), found: self.found }
    }

    /// Combine several pairs: `f` builds one fragment from all the fragments,
    /// found maps are unioned (first entry for a name wins).
    pub fn combine(pairs: impl IntoIterator<Item = SchemaPair>, f: impl FnOnce(Vec<Value>) -> Value) -> Self {
        let mut schemas = Vec::new();
        let mut found = Found::new();
        for pair in pairs {
            schemas.push(pair.schema);
            absorb(&mut found, pair.found);
        }
        SchemaPair { schema: f(schemas), found }
    }
}

fn absorb(into: &mut Found, more: Found) {
    for (name, thunk) in more {
        into.entry(name).or_insert(thunk);
    }
}

// ————————————————————————————————————————————————————————————————————————————
// FRAGMENT HELPERS
// ————————————————————————————————————————————————————————————————————————————

pub fn reference(name: &str) -> Value {
    json!({ "$ref": format!("{COMPONENTS_PREFIX}{name}") })
}

/// Component name of a `#/components/schemas/...` reference.
pub fn referenced_name(schema: &Value) -> Option<&str> {
    schema.get("$ref")?.as_str()?.strip_prefix(COMPONENTS_PREFIX)
}

pub fn is_reference(schema: &Value) -> bool {
    schema.get("$ref").is_some()
}

/// Add keywords to a fragment. A `$ref` cannot carry siblings, so it is
/// wrapped in `allOf` first.
pub fn merge(schema: Value, extra: Map<String, Value>) -> Value {
    if extra.is_empty() {
        return schema;
    }
    let mut base = match schema {
        Value::Object(map) if !map.contains_key("$ref") => map,
        other => {
            let mut map = Map::new();
            map.insert("allOf".into(), Value::Array(vec![other]));
            map
        }
    };
    base.extend(extra);
    Value::Object(base)
}

pub fn merge_one(schema: Value, key: &str, value: Value) -> Value {
    let mut extra = Map::new();
    extra.insert(key.to_string(), value);
    merge(schema, extra)
}

pub fn described(schema: Value, description: &str) -> Value {
    merge_one(schema, "description", Value::from(description))
}

pub fn nullable(schema: Value) -> Value {
    merge_one(schema, "nullable", Value::Bool(true))
}

/// `{ "oneOf": [...] }` with nested bare `oneOf`s spliced in and duplicates
/// dropped. A single surviving member is returned as is.
pub fn one_of(members: Vec<Value>) -> Value {
    let mut flat = Vec::<Value>::new();
    for member in members {
        for item in splice(member, "oneOf") {
            if !flat.contains(&item) {
                flat.push(item);
            }
        }
    }
    match flat.len() {
        1 => flat.remove(0),
        _ => json!({ "oneOf": flat }),
    }
}

/// `{ "allOf": [...] }` flattened the same way, so inheritance chains stay
/// one level deep.
pub fn all_of(members: Vec<Value>) -> Value {
    let flat: Vec<Value> = members.into_iter().flat_map(|m| splice(m, "allOf")).collect();
    json!({ "allOf": flat })
}

/// Members of a fragment that consists of nothing but `keyword: [...]`.
fn splice(schema: Value, keyword: &str) -> Vec<Value> {
    match schema {
        Value::Object(mut map) if map.len() == 1 && map.get(keyword).is_some_and(Value::is_array) => {
            match map.remove(keyword) {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            }
        }
        other => vec![other],
    }
}

pub fn object(properties: Map<String, Value>, required: Vec<String>) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), Value::from("object"));
    map.insert("properties".into(), Value::Object(properties));
    if !required.is_empty() {
        map.insert("required".into(), Value::Array(required.into_iter().map(Value::from).collect()));
    }
    Value::Object(map)
}

// ————————————————————————————————————————————————————————————————————————————
// COMPONENTS
// ————————————————————————————————————————————————————————————————————————————

/// Force every thunk reachable from `roots` and return the components map,
/// sorted by name. The finished map doubles as the visited set, which is
/// what makes cyclic references terminate.
pub fn collect_components(roots: impl IntoIterator<Item = SchemaPair>) -> IndexMap<String, Value> {
    let mut pending = Found::new();
    for root in roots {
        absorb(&mut pending, root.found);
    }
    let mut finished = IndexMap::<String, Value>::new();
    while let Some((name, thunk)) = pending.pop() {
        if finished.contains_key(&name) {
            continue;
        }
        tracing::trace!(component = %name, "forcing schema thunk");
        let pair = thunk.force().clone();
        for (next, next_thunk) in pair.found {
            if !finished.contains_key(&next) && next != name {
                pending.entry(next).or_insert(next_thunk);
            }
        }
        finished.insert(name, pair.schema);
    }
    finished.sort_keys();
    finished
}

/// `{ "components": { "schemas": ... } }`
pub fn components_document(schemas: IndexMap<String, Value>) -> Value {
    json!({ "components": { "schemas": schemas } })
}

// ------------------------------- Tests ------------------------------------ //
