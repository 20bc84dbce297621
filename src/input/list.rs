use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::{Input, InputRef};
use crate::report::Report;
use crate::schema::SchemaPair;

/// Homogeneous array. Every element is checked; failures are keyed by index.
#[derive(Clone)]
pub struct List {
    member: InputRef,
}

impl List {
    pub fn new(member: InputRef) -> Self {
        Self { member }
    }
}

impl Input for List {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        let Value::Array(items) = value else {
            return Err(Report::message("must be an array"));
        };
        let mut out = Vec::with_capacity(items.len());
        let mut problems = BTreeMap::new();
        for (index, item) in items.iter().enumerate() {
            match self.member.call(item) {
                Ok(parsed) => out.push(parsed),
                Err(report) => {
                    problems.insert(index, report);
                }
            }
        }
        if problems.is_empty() { Ok(Value::Array(out)) } else { Err(Report::List(problems)) }
    }

    fn schema(&self) -> SchemaPair {
        self.member.schema().map_schema(|items| json!({ "type": "array", "items": items }))
    }
}
