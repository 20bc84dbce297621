use serde_json::{Value, json};

use super::{CallOptions, Output};
use crate::input::scalar::is_integral;
use crate::report::Report;
use crate::schema::SchemaPair;

// Scalars emit the value they are given; only the checked path looks at it.

#[derive(Debug, Clone, Default)]
pub struct Text {
    format: Option<String>,
}

impl Text {
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

impl Output for Text {
    fn call_with(&self, value: &Value, _: &CallOptions) -> Value {
        value.clone()
    }

    fn serialize_report_with(&self, value: &Value, _: &CallOptions) -> Result<Value, Report> {
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

impl Output for Number {
    fn call_with(&self, value: &Value, _: &CallOptions) -> Value {
        value.clone()
    }

    fn serialize_report_with(&self, value: &Value, _: &CallOptions) -> Result<Value, Report> {
        match value {
            Value::Number(n) if !self.integer || is_integral(n) => Ok(value.clone()),
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

impl Output for Bool {
    fn call_with(&self, value: &Value, _: &CallOptions) -> Value {
        value.clone()
    }

    fn serialize_report_with(&self, value: &Value, _: &CallOptions) -> Result<Value, Report> {
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

impl Output for Null {
    fn call_with(&self, _: &Value, _: &CallOptions) -> Value {
        Value::Null
    }

    fn serialize_report_with(&self, value: &Value, _: &CallOptions) -> Result<Value, Report> {
        match value {
            Value::Null => Ok(Value::Null),
            _ => Err(Report::message("must be null")),
        }
    }

    fn schema(&self) -> SchemaPair {
        SchemaPair::new(json!({ "nullable": true, "enum": [null] }))
    }
}

#[cfg(test)]
mod tests {
    use crate::output::{Output, boolean, integer, null, number, text};
    use crate::report::Report;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn unchecked_path_passes_values_through() {
        assert_eq!(text().call(&json!(5)), json!(5));
        assert_eq!(null().call(&json!(5)), json!(null));
    }

    #[test]
    fn checked_path_rejects_wrong_kinds() {
        assert_eq!(text().serialize_report(&json!(5)), Err(Report::message("must be a string")));
        assert_eq!(integer().serialize_report(&json!(1.5)), Err(Report::message("must be an integer")));
        assert_eq!(number().serialize_report(&json!(1.5)), Ok(json!(1.5)));
        assert_eq!(boolean().serialize_report(&json!("true")), Err(Report::message("must be a boolean")));
    }

    #[test]
    fn schemas_match_the_input_side() {
        assert_eq!(text().format("date-time").schema().schema, json!({ "type": "string", "format": "date-time" }));
        assert_eq!(
            integer().schema().schema,
            crate::input::Input::schema(&crate::input::integer()).schema
        );
    }
}
