//! Input interpreter: validate and transform raw JSON.
//!
//! Every node is a pure function `&Value → Result<Value, Report>` that also
//! documents itself through [`Input::schema`]. Bad data never panics and
//! never short-circuits inside an object or list: all problems end up in one
//! [`Report`].
//!
//! Combinators (`or`, `optional`, `list`, `enum_`, `pattern`, `in_range`,
//! `multiple_of`, `mapped`, `described`, `referenced`) are provided once on
//! the trait and wrap any node, including an [`InputRef`].
pub mod list;
pub mod object;
pub mod refine;
pub mod registry;
pub mod scalar;
pub mod structs;
pub mod wrap;

use std::ops::RangeBounds;
use std::sync::Arc;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Invalid, ParseIntoError};
use crate::report::Report;
use crate::schema::SchemaPair;

pub use list::List;
pub use object::{MergeObjects, Object, Property};
pub use refine::{Enum, InRange, MultipleOf, Pattern};
pub use registry::RegistryInputs;
pub use scalar::{Any, Bool, Null, Number, Text};
pub use structs::{InputStruct, StructInput};
pub use wrap::{Defer, Described, Either, Mapped, Optional, Referenced};

pub type InputRef = Arc<dyn Input>;

pub trait Input: Send + Sync {
    fn call(&self, value: &Value) -> Result<Value, Report>;

    fn schema(&self) -> SchemaPair;

    /// `call`, but with the report carried in an error type for `?`.
    fn call_strict(&self, value: &Value) -> Result<Value, Invalid> {
        self.call(value).map_err(Invalid::from)
    }

    /// Validate, then deserialize the result into `T`.
    fn parse_into<T: DeserializeOwned>(&self, value: &Value) -> Result<T, ParseIntoError>
    where
        Self: Sized,
    {
        let parsed = self.call_strict(value)?;
        crate::path_de::from_value_with_path(parsed)
            .map_err(|(path, source)| ParseIntoError::Deserialize { path, source })
    }

    fn into_ref(self) -> InputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(self)
    }

    /// Left-biased union.
    fn or(self, other: impl Input + 'static) -> InputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(Either::new(self.into_ref(), other.into_ref()))
    }

    /// Also accept `null`.
    fn optional(self) -> InputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(Optional::new(self.into_ref()))
    }

    fn list(self) -> InputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(List::new(self.into_ref()))
    }

    fn enum_(self, values: impl IntoIterator<Item = Value>) -> InputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(Enum::new(self.into_ref(), values.into_iter().collect()))
    }

    fn pattern(self, regex: Regex) -> InputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(Pattern::new(self.into_ref(), regex))
    }

    fn in_range(self, range: impl RangeBounds<f64>) -> InputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(InRange::new(self.into_ref(), range))
    }

    fn multiple_of(self, factor: f64) -> InputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(MultipleOf::new(self.into_ref(), factor))
    }

    fn mapped(self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> InputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(Mapped::new(self.into_ref(), f))
    }

    fn described(self, text: impl Into<String>) -> InputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(Described::new(self.into_ref(), text))
    }

    /// Document as `$ref` to a named component instead of inlining.
    fn referenced(self, name: impl Into<String>) -> InputRef
    where
        Self: Sized + 'static,
    {
        Arc::new(Referenced::new(self.into_ref(), name))
    }
}

impl Input for InputRef {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        (**self).call(value)
    }

    fn schema(&self) -> SchemaPair {
        (**self).schema()
    }

    fn into_ref(self) -> InputRef {
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

pub fn any() -> Any {
    Any
}

pub fn object() -> Object {
    Object::new()
}

pub fn defer(resolve: impl Fn() -> InputRef + Send + Sync + 'static) -> Defer {
    Defer::new(resolve)
}

// ------------------------------- Tests ------------------------------------ //
