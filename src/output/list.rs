use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::{Value, json};

use super::{CallOptions, Output, OutputRef};
use crate::report::Report;
use crate::schema::SchemaPair;

/// Homogeneous array. View selection commutes with list-ness: a list of a
/// viewable element is viewable with the same names.
#[derive(Clone)]
pub struct List {
    member: OutputRef,
}

impl List {
    pub fn new(member: OutputRef) -> Self {
        Self { member }
    }
}

impl Output for List {
    fn call_with(&self, value: &Value, options: &CallOptions) -> Value {
        match value {
            Value::Array(items) => Value::Array(items.iter().map(|item| self.member.call_with(item, options)).collect()),
            other => other.clone(),
        }
    }

    fn serialize_report_with(&self, value: &Value, options: &CallOptions) -> Result<Value, Report> {
        let Value::Array(items) = value else {
            return Err(Report::message("must be an array"));
        };
        let mut out = Vec::with_capacity(items.len());
        let mut problems = BTreeMap::new();
        for (index, item) in items.iter().enumerate() {
            match self.member.serialize_report_with(item, options) {
                Ok(serialized) => out.push(serialized),
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

    fn views(&self) -> BTreeSet<String> {
        self.member.views()
    }

    fn view_of(&self, name: &str) -> Option<OutputRef> {
        let member = self.member.view_of(name)?;
        Some(Arc::new(List::new(member)))
    }
}

#[cfg(test)]
mod tests {
    use crate::output::{Output, integer, text};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn checked_lists_key_failures_by_index() {
        let report = integer().list().serialize_report(&json!([1, "x", 3])).unwrap_err();
        assert_eq!(report.path_hash().keys().collect::<Vec<_>>(), vec!["[1]"]);
        assert_eq!(text().list().call(&json!(["a"])), json!(["a"]));
    }

    #[test]
    fn plain_members_have_no_views() {
        let names = text().list().views();
        assert!(names.is_empty());
        assert!(text().list().view_of("detail").is_none());
    }
}
