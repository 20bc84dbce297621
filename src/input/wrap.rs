//! Wrappers that change how a node is combined or documented without
//! looking at the value themselves.
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value;

use super::{Input, InputRef};
use crate::report::Report;
use crate::schema::{self, Found, SchemaPair, Thunk};

/// Left-biased union: `right` is only tried when `left` fails.
#[derive(Clone)]
pub struct Either {
    left: InputRef,
    right: InputRef,
}

impl Either {
    pub fn new(left: InputRef, right: InputRef) -> Self {
        Self { left, right }
    }
}

impl Input for Either {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        match self.left.call(value) {
            Ok(parsed) => Ok(parsed),
            Err(left) => self.right.call(value).map_err(|right| Report::either(left, right)),
        }
    }

    fn schema(&self) -> SchemaPair {
        SchemaPair::combine([self.left.schema(), self.right.schema()], schema::one_of)
    }
}

#[derive(Clone)]
pub struct Optional {
    inner: InputRef,
}

impl Optional {
    pub fn new(inner: InputRef) -> Self {
        Self { inner }
    }
}

impl Input for Optional {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        match value {
            Value::Null => Ok(Value::Null),
            _ => self.inner.call(value),
        }
    }

    fn schema(&self) -> SchemaPair {
        self.inner.schema().map_schema(schema::nullable)
    }
}

/// Post-processes a successfully validated value.
#[derive(Clone)]
pub struct Mapped {
    inner: InputRef,
    f: Arc<dyn Fn(Value) -> Value + Send + Sync>,
}

impl Mapped {
    pub fn new(inner: InputRef, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        Self { inner, f: Arc::new(f) }
    }
}

impl Input for Mapped {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        self.inner.call(value).map(|parsed| (self.f)(parsed))
    }

    fn schema(&self) -> SchemaPair {
        self.inner.schema()
    }
}

#[derive(Clone)]
pub struct Described {
    inner: InputRef,
    text: String,
}

impl Described {
    pub fn new(inner: InputRef, text: impl Into<String>) -> Self {
        Self { inner, text: text.into() }
    }
}

impl Input for Described {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        self.inner.call(value)
    }

    fn schema(&self) -> SchemaPair {
        self.inner.schema().map_schema(|s| schema::described(s, &self.text))
    }
}

/// Documents the inner node as a named component. The component body is
/// only produced when somebody collects the components.
#[derive(Clone)]
pub struct Referenced {
    inner: InputRef,
    name: String,
}

impl Referenced {
    pub fn new(inner: InputRef, name: impl Into<String>) -> Self {
        Self { inner, name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Input for Referenced {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        self.inner.call(value)
    }

    fn schema(&self) -> SchemaPair {
        let inner = self.inner.clone();
        let mut found = Found::new();
        found.insert(self.name.clone(), Thunk::new(move || inner.schema()));
        SchemaPair::new(schema::reference(&self.name)).with_found(found)
    }
}

/// Late-bound node for recursive definitions. `resolve` runs on first use.
pub struct Defer {
    cell: OnceCell<InputRef>,
    resolve: Box<dyn Fn() -> InputRef + Send + Sync>,
}

impl Defer {
    pub fn new(resolve: impl Fn() -> InputRef + Send + Sync + 'static) -> Self {
        Self { cell: OnceCell::new(), resolve: Box::new(resolve) }
    }

    fn target(&self) -> &InputRef {
        self.cell.get_or_init(|| {
            tracing::trace!("resolving deferred input");
            (self.resolve)()
        })
    }
}

impl fmt::Debug for Defer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defer").field("resolved", &self.cell.get().is_some()).finish()
    }
}

impl Input for Defer {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        self.target().call(value)
    }

    fn schema(&self) -> SchemaPair {
        self.target().schema()
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{defer, integer, object, text};
    use crate::schema::collect_components;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn either_is_left_biased() {
        let id = integer().or(text());
        assert_eq!(id.call(&json!(3)), Ok(json!(3)));
        assert_eq!(id.call(&json!("a")), Ok(json!("a")));
        let report = id.call(&json!(true)).unwrap_err();
        assert_eq!(
            report.path_hash()["."],
            vec!["must be an integer".to_string(), "must be a string".to_string()]
        );
        assert_eq!(
            id.schema().schema,
            json!({ "oneOf": [{ "type": "integer" }, { "type": "string" }] })
        );
    }

    #[test]
    fn optional_accepts_null() {
        let maybe = text().optional();
        assert_eq!(maybe.call(&json!(null)), Ok(json!(null)));
        assert!(maybe.call(&json!(1)).is_err());
        assert_eq!(maybe.schema().schema, json!({ "type": "string", "nullable": true }));
    }

    #[test]
    fn mapped_runs_after_validation() {
        let upper = text().mapped(|v| Value::from(v.as_str().unwrap_or_default().to_uppercase()));
        assert_eq!(upper.call(&json!("ab")), Ok(json!("AB")));
        assert!(upper.call(&json!(1)).is_err());
    }

    #[test]
    fn referenced_schemas_are_lazy() {
        let person = object().field("name", text()).referenced("Api.Person");
        let pair = person.schema();
        assert_eq!(pair.schema, json!({ "$ref": "#/components/schemas/Api.Person" }));
        assert!(!pair.found["Api.Person"].is_forced());
        let components = collect_components([pair]);
        assert_eq!(components["Api.Person"]["properties"]["name"], json!({ "type": "string" }));
    }

    #[test]
    fn defer_supports_recursion() {
        let slot: Arc<OnceCell<InputRef>> = Arc::new(OnceCell::new());
        let back = slot.clone();
        let tree = object()
            .field("value", integer())
            .optional_field(
                "children",
                defer(move || back.get().cloned().unwrap()).list(),
            )
            .referenced("Tree");
        slot.set(tree.clone()).ok().unwrap();

        let ok = json!({ "value": 1, "children": [{ "value": 2, "children": [] }] });
        assert_eq!(tree.call(&ok), Ok(ok.clone()));
        let bad = json!({ "value": 1, "children": [{ "value": "x" }] });
        let hash = tree.call(&bad).unwrap_err().path_hash();
        assert_eq!(hash.keys().collect::<Vec<_>>(), vec![".children[0].value"]);

        let components = collect_components([tree.schema()]);
        assert_eq!(components.keys().collect::<Vec<_>>(), vec!["Tree"]);
        assert_eq!(
            components["Tree"]["properties"]["children"]["items"],
            json!({ "$ref": "#/components/schemas/Tree" })
        );
    }
}
