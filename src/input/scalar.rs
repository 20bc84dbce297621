use serde_json::{Value, json};

use super::Input;
use crate::report::Report;
use crate::schema::SchemaPair;

#[derive(Debug, Clone, Default)]
pub struct Text {
    format: Option<String>,
}

impl Text {
    /// OpenAPI `format` hint (`date`, `email`, ...). Documentation only.
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

impl Input for Text {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        match value {
            Value::String(_) => Ok(value.clone()),
            _ => Err(Report::message("must be a string")),
        }
    }

    fn schema(&self) -> SchemaPair {
        let mut schema = json!({ "type": "string" });
        if let Some(format) = &self.format {
            schema["format"] = Value::from(format.clone());
        }
        SchemaPair::new(schema)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Number {
    integer: bool,
}

impl Number {
    pub fn float() -> Self {
        Self { integer: false }
    }

    pub fn integer() -> Self {
        Self { integer: true }
    }
}

/// Whole numbers, including floats with no fractional part (`2.0`).
pub(crate) fn is_integral(n: &serde_json::Number) -> bool {
    n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
}

impl Input for Number {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        match value {
            Value::Number(n) if !self.integer || is_integral(n) => Ok(value.clone()),
            Value::Number(_) => Err(Report::message("must be an integer")),
            _ if self.integer => Err(Report::message("must be an integer")),
            _ => Err(Report::message("must be a number")),
        }
    }

    fn schema(&self) -> SchemaPair {
        SchemaPair::new(json!({ "type": if self.integer { "integer" } else { "number" } }))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Bool;

impl Input for Bool {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        match value {
            Value::Bool(_) => Ok(value.clone()),
            _ => Err(Report::message("must be a boolean")),
        }
    }

    fn schema(&self) -> SchemaPair {
        SchemaPair::new(json!({ "type": "boolean" }))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Null;

impl Input for Null {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        match value {
            Value::Null => Ok(Value::Null),
            _ => Err(Report::message("must be null")),
        }
    }

    fn schema(&self) -> SchemaPair {
        // OpenAPI 3.0 has no null type
        SchemaPair::new(json!({ "nullable": true, "enum": [null] }))
    }
}

/// Accepts every value unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Any;

impl Input for Any {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        Ok(value.clone())
    }

    fn schema(&self) -> SchemaPair {
        SchemaPair::new(json!({}))
    }
}
