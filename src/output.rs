//! Output interpreter: serialize domain values into JSON.
//!
//! The dual of [`crate::input`]. Domain values are `serde_json::Value`s (use
//! [`Output::call_serialize`] for anything `Serialize`). Every node has an
//! unchecked fast path ([`Output::call`]) and a checked one
//! ([`Output::serialize_report`]) that reports a malformed response the same
//! way inputs report malformed requests.
//!
//! Views are named projections. A node lists the views it supports in
//! [`Output::views`]; [`Output::view`] selects one, and `base` always
//! resolves, falling back to the node itself.
pub mod list;
pub mod object;
pub mod scalar;
pub mod structs;
pub mod viewed;
pub mod wrap;

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::error::DefinitionError;
use crate::report::Report;
use crate::schema::SchemaPair;

pub use list::List;
pub use object::{Object, Property};
pub use scalar::{Bool, Null, Number, Text};
pub use structs::{Field, OutputStruct, StructOutput, ViewBuilder};
pub use viewed::{Conditional, MergeObjects, Viewed};
pub use wrap::{Defer, Described, Optional, Referenced, ViaMap};

pub type OutputRef = Arc<dyn Output>;

/// Name of the implicit default view.
pub const BASE_VIEW: &str = "base";

/// Runtime options of one serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub view: Option<String>,
}

impl CallOptions {
    pub fn view(name: impl Into<String>) -> Self {
        Self { view: Some(name.into()) }
    }

    /// Requested view, `base` when none was asked for.
    pub fn view_name(&self) -> &str {
        self.view.as_deref().unwrap_or(BASE_VIEW)
    }
}

pub trait Output: Send + Sync {
    fn call_with(&self, value: &Value, options: &CallOptions) -> Value;

    fn serialize_report_with(&self, value: &Value, options: &CallOptions) -> Result<Value, Report>;

    fn schema(&self) -> SchemaPair;

    fn views(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// The node for one of [`Output::views`], if this node has it.
    fn view_of(&self, _name: &str) -> Option<OutputRef> {
        None
    }

    fn call(&self, value: &Value) -> Value {
        self.call_with(value, &CallOptions::default())
    }

    fn serialize_report(&self, value: &Value) -> Result<Value, Report> {
        self.serialize_report_with(value, &CallOptions::default())
    }

    /// Serialize any `Serialize` domain value through this node.
    fn call_serialize<T: Serialize>(&self, value: &T, options: &CallOptions) -> Result<Value, serde_json::Error>
    where
        Self: Sized,
    {
        let raw = serde_json::to_value(value)?;
        Ok(self.call_with(&raw, options))
    }

    fn into_ref(self) -> OutputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(self)
    }

    /// Select a view. `base` resolves to the node itself unless the node
    /// defines a `base` entry of its own.
    fn view(self, name: &str) -> Result<OutputRef, DefinitionError>
    where
        Self: Sized + 'static,
    {
        if let Some(selected) = self.view_of(name) {
            return Ok(selected);
        }
        if name == BASE_VIEW {
            return Ok(self.into_ref());
        }
        Err(DefinitionError::UnknownView(name.to_string()))
    }

    fn list(self) -> OutputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(List::new(self.into_ref()))
    }

    /// Pass `null` through untouched.
    fn optional(self) -> OutputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(Optional::new(self.into_ref()))
    }

    fn described(self, text: impl Into<String>) -> OutputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(Described::new(self.into_ref(), text))
    }

    fn referenced(self, name: impl Into<String>) -> OutputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(Referenced::new(self.into_ref(), name))
    }

    /// Transform the domain value before serializing it.
    fn via_map(self, f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> OutputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(ViaMap::new(self.into_ref(), Arc::new(f)))
    }
}

impl Output for OutputRef {
    fn call_with(&self, value: &Value, options: &CallOptions) -> Value {
        (**self).call_with(value, options)
    }

    fn serialize_report_with(&self, value: &Value, options: &CallOptions) -> Result<Value, Report> {
        (**self).serialize_report_with(value, options)
    }

    fn schema(&self) -> SchemaPair {
        (**self).schema()
    }

    fn views(&self) -> BTreeSet<String> {
        (**self).views()
    }

    fn view_of(&self, name: &str) -> Option<OutputRef> {
        (**self).view_of(name)
    }

    fn into_ref(self) -> OutputRef {
        self
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONSTRUCTORS
// ————————————————————————————————————————————————————————————————————————————

pub fn text() -> Text {
    Text::default()
}

pub fn number() -> Number {
    Number::float()
}

pub fn integer() -> Number {
    Number::integer()
}

pub fn boolean() -> Bool {
    Bool
}

pub fn null() -> Null {
    Null
}

pub fn object() -> Object {
    Object::new()
}

pub fn defer(resolve: impl Fn() -> OutputRef + Send + Sync + 'static) -> Defer {
    Defer::new(resolve)
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[derive(Serialize)]
    struct Point {
        x: i64,
        y: i64,
        secret: &'static str,
    }

    #[test]
    fn serialize_values_through_serde() {
        let point = object().field("x", integer()).field("y", integer());
        let out = point.call_serialize(&Point { x: 1, y: 2, secret: "s" }, &CallOptions::default()).unwrap();
        assert_eq!(out, json!({ "x": 1, "y": 2 }));
    }

    #[test]
    fn base_view_falls_back_to_self() {
        let plain = text().into_ref();
        assert!(plain.clone().view(BASE_VIEW).is_ok());
        assert!(matches!(plain.view("detail"), Err(DefinitionError::UnknownView(ref v)) if v == "detail"));
    }

    #[test]
    fn options_default_to_base() {
        assert_eq!(CallOptions::default().view_name(), "base");
        assert_eq!(CallOptions::view("detail").view_name(), "detail");
    }
}
