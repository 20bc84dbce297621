//! Output wrappers that reshape the incoming value or the documentation.
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value;

use super::{CallOptions, Output, OutputRef};
use crate::report::Report;
use crate::schema::{self, Found, SchemaPair, Thunk};

/// Reads the part of a domain value one node serializes.
pub type Extractor = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Accessor for one member of an object value, `null` when absent.
pub fn key_extractor(key: impl Into<String>) -> Extractor {
    let key = key.into();
    Arc::new(move |value: &Value| value.get(&key).cloned().unwrap_or(Value::Null))
}

#[derive(Clone)]
pub struct ViaMap {
    inner: OutputRef,
    f: Extractor,
}

impl ViaMap {
    pub fn new(inner: OutputRef, f: Extractor) -> Self {
        Self { inner, f }
    }
}

impl Output for ViaMap {
    fn call_with(&self, value: &Value, options: &CallOptions) -> Value {
        self.inner.call_with(&(self.f)(value), options)
    }

    fn serialize_report_with(&self, value: &Value, options: &CallOptions) -> Result<Value, Report> {
        self.inner.serialize_report_with(&(self.f)(value), options)
    }

    fn schema(&self) -> SchemaPair {
        self.inner.schema()
    }

    fn views(&self) -> BTreeSet<String> {
        self.inner.views()
    }

    fn view_of(&self, name: &str) -> Option<OutputRef> {
        let inner = self.inner.view_of(name)?;
        Some(Arc::new(ViaMap::new(inner, self.f.clone())))
    }
}

#[derive(Clone)]
pub struct Optional {
    inner: OutputRef,
}

impl Optional {
    pub fn new(inner: OutputRef) -> Self {
        Self { inner }
    }
}

impl Output for Optional {
    fn call_with(&self, value: &Value, options: &CallOptions) -> Value {
        match value {
            Value::Null => Value::Null,
            _ => self.inner.call_with(value, options),
        }
    }

    fn serialize_report_with(&self, value: &Value, options: &CallOptions) -> Result<Value, Report> {
        match value {
            Value::Null => Ok(Value::Null),
            _ => self.inner.serialize_report_with(value, options),
        }
    }

    fn schema(&self) -> SchemaPair {
        self.inner.schema().map_schema(schema::nullable)
    }

    fn views(&self) -> BTreeSet<String> {
        self.inner.views()
    }

    fn view_of(&self, name: &str) -> Option<OutputRef> {
        let inner = self.inner.view_of(name)?;
        Some(Arc::new(Optional::new(inner)))
    }
}

#[derive(Clone)]
pub struct Described {
    inner: OutputRef,
    text: String,
}

impl Described {
    pub fn new(inner: OutputRef, text: impl Into<String>) -> Self {
        Self { inner, text: text.into() }
    }
}

impl Output for Described {
    fn call_with(&self, value: &Value, options: &CallOptions) -> Value {
        self.inner.call_with(value, options)
    }

    fn serialize_report_with(&self, value: &Value, options: &CallOptions) -> Result<Value, Report> {
        self.inner.serialize_report_with(value, options)
    }

    fn schema(&self) -> SchemaPair {
        self.inner.schema().map_schema(|s| schema::described(s, &self.text))
    }

    fn views(&self) -> BTreeSet<String> {
        self.inner.views()
    }

    fn view_of(&self, name: &str) -> Option<OutputRef> {
        self.inner.view_of(name)
    }
}

/// Documents the inner node as a named component, lazily.
#[derive(Clone)]
pub struct Referenced {
    inner: OutputRef,
    name: String,
}

impl Referenced {
    pub fn new(inner: OutputRef, name: impl Into<String>) -> Self {
        Self { inner, name: name.into() }
    }
}

impl Output for Referenced {
    fn call_with(&self, value: &Value, options: &CallOptions) -> Value {
        self.inner.call_with(value, options)
    }

    fn serialize_report_with(&self, value: &Value, options: &CallOptions) -> Result<Value, Report> {
        self.inner.serialize_report_with(value, options)
    }

    fn schema(&self) -> SchemaPair {
        let inner = self.inner.clone();
        let mut found = Found::new();
        found.insert(self.name.clone(), Thunk::new(move || inner.schema()));
        SchemaPair::new(schema::reference(&self.name)).with_found(found)
    }

    fn views(&self) -> BTreeSet<String> {
        self.inner.views()
    }

    fn view_of(&self, name: &str) -> Option<OutputRef> {
        self.inner.view_of(name)
    }
}

/// Late-bound output for definitions that refer to each other.
pub struct Defer {
    cell: OnceCell<OutputRef>,
    resolve: Box<dyn Fn() -> OutputRef + Send + Sync>,
}

impl Defer {
    pub fn new(resolve: impl Fn() -> OutputRef + Send + Sync + 'static) -> Self {
        Self { cell: OnceCell::new(), resolve: Box::new(resolve) }
    }

    fn target(&self) -> &OutputRef {
        self.cell.get_or_init(|| {
            tracing::trace!("resolving deferred output");
            (self.resolve)()
        })
    }
}

impl fmt::Debug for Defer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defer").field("resolved", &self.cell.get().is_some()).finish()
    }
}

impl Output for Defer {
    fn call_with(&self, value: &Value, options: &CallOptions) -> Value {
        self.target().call_with(value, options)
    }

    fn serialize_report_with(&self, value: &Value, options: &CallOptions) -> Result<Value, Report> {
        self.target().serialize_report_with(value, options)
    }

    fn schema(&self) -> SchemaPair {
        self.target().schema()
    }

    fn views(&self) -> BTreeSet<String> {
        self.target().views()
    }

    fn view_of(&self, name: &str) -> Option<OutputRef> {
        self.target().view_of(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{defer, integer, object, text};
    use crate::schema::collect_components;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn via_map_feeds_the_extracted_value() {
        let full_name = text().via_map(|v| {
            let first = v["first"].as_str().unwrap_or_default();
            let last = v["last"].as_str().unwrap_or_default();
            Value::from(format!("{first} {last}"))
        });
        assert_eq!(full_name.call(&json!({ "first": "Bob", "last": "Smith" })), json!("Bob Smith"));
    }

    #[test]
    fn optional_outputs_allow_null() {
        let maybe = integer().optional();
        assert_eq!(maybe.serialize_report(&json!(null)), Ok(json!(null)));
        assert!(maybe.serialize_report(&json!("x")).is_err());
        assert_eq!(maybe.schema().schema, json!({ "type": "integer", "nullable": true }));
    }

    #[test]
    fn described_references_keep_the_ref() {
        let owner = object().field("id", integer()).referenced("Api.Person").described("the owner");
        assert_eq!(
            owner.schema().schema,
            json!({ "allOf": [{ "$ref": "#/components/schemas/Api.Person" }], "description": "the owner" })
        );
    }

    #[test]
    fn deferred_outputs_resolve_recursive_shapes() {
        let slot: Arc<OnceCell<OutputRef>> = Arc::new(OnceCell::new());
        let back = slot.clone();
        let node = object()
            .field("label", text())
            .optional_field("next", defer(move || back.get().cloned().unwrap()))
            .referenced("Chain");
        slot.set(node.clone()).ok().unwrap();

        let chain = json!({ "label": "a", "next": { "label": "b", "hidden": 1 } });
        assert_eq!(node.call(&chain), json!({ "label": "a", "next": { "label": "b" } }));
        let components = collect_components([node.schema()]);
        assert_eq!(components.keys().collect::<Vec<_>>(), vec!["Chain"]);
    }
}
