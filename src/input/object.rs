use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{Input, InputRef};
use crate::report::Report;
use crate::schema::{self, SchemaPair};

/// One declared member of an object input.
#[derive(Clone)]
pub struct Property {
    pub value: InputRef,
    pub required: bool,
    pub description: Option<String>,
}

impl Property {
    pub fn new(value: impl Input + 'static) -> Self {
        Self { value: value.into_ref(), required: true, description: None }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }
}

/// Record validator. Undeclared keys are dropped from the result.
#[derive(Clone, Default)]
pub struct Object {
    properties: IndexMap<String, Property>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare (or redeclare) a member.
    pub fn property(mut self, key: impl Into<String>, property: Property) -> Self {
        self.properties.insert(key.into(), property);
        self
    }

    pub fn field(self, key: impl Into<String>, value: impl Input + 'static) -> Self {
        self.property(key, Property::new(value))
    }

    pub fn optional_field(self, key: impl Into<String>, value: impl Input + 'static) -> Self {
        self.property(key, Property::new(value).optional())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }
}

impl Input for Object {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        let Value::Object(map) = value else {
            return Err(Report::message("must be an object"));
        };
        let mut out = Map::new();
        let mut problems = IndexMap::new();
        for (key, property) in &self.properties {
            match map.get(key) {
                Some(raw) => match property.value.call(raw) {
                    Ok(parsed) => {
                        out.insert(key.clone(), parsed);
                    }
                    Err(report) => {
                        problems.insert(key.clone(), report);
                    }
                },
                None if property.required => {
                    problems.insert(key.clone(), Report::required());
                }
                None => {}
            }
        }
        if problems.is_empty() { Ok(Value::Object(out)) } else { Err(Report::Object(problems)) }
    }

    fn schema(&self) -> SchemaPair {
        let keys: Vec<&String> = self.properties.keys().collect();
        let pairs = self.properties.values().map(|property| {
            let pair = property.value.schema();
            match &property.description {
                Some(text) => pair.map_schema(|s| schema::described(s, text)),
                None => pair,
            }
        });
        SchemaPair::combine(pairs, |schemas| {
            let required = self
                .properties
                .iter()
                .filter(|(_, property)| property.required)
                .map(|(key, _)| key.clone())
                .collect();
            let properties = keys.into_iter().cloned().zip(schemas).collect::<Map<String, Value>>();
            schema::object(properties, required)
        })
    }
}

/// Single inheritance: both sides validate the same value independently,
/// results merge with the child winning on key collisions.
#[derive(Clone)]
pub struct MergeObjects {
    parent: InputRef,
    child: InputRef,
}

impl MergeObjects {
    pub(crate) fn new(parent: InputRef, child: InputRef) -> Self {
        Self { parent, child }
    }
}

impl Input for MergeObjects {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        match (self.parent.call(value), self.child.call(value)) {
            (Ok(Value::Object(mut parent)), Ok(Value::Object(child))) => {
                parent.extend(child);
                Ok(Value::Object(parent))
            }
            (Ok(_), Ok(child)) => Ok(child),
            (Err(parent), Ok(_)) => Err(parent),
            (Ok(_), Err(child)) => Err(child),
            (Err(parent), Err(child)) => Err(Report::merged(parent, child)),
        }
    }

    fn schema(&self) -> SchemaPair {
        SchemaPair::combine([self.parent.schema(), self.child.schema()], schema::all_of)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{integer, object, text};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn person() -> Object {
        object()
            .field("name", text())
            .property("age", Property::new(integer()).optional().description("in years"))
    }

    #[test]
    fn validates_declared_members_only() {
        let out = person().call(&json!({ "name": "Ann", "age": 3, "extra": true }));
        assert_eq!(out, Ok(json!({ "name": "Ann", "age": 3 })));
        assert_eq!(person().call(&json!({ "name": "Ann" })), Ok(json!({ "name": "Ann" })));
    }

    #[test]
    fn every_bad_field_is_reported() {
        let report = person().call(&json!({ "age": "old" })).unwrap_err();
        let hash = report.path_hash();
        assert_eq!(hash.len(), 2);
        assert_eq!(hash[".name"], vec!["is required".to_string()]);
        assert_eq!(hash[".age"], vec!["must be an integer".to_string()]);
    }

    #[test]
    fn non_objects_are_rejected() {
        assert_eq!(person().call(&json!([])), Err(Report::message("must be an object")));
    }

    #[test]
    fn schema_lists_required_members() {
        let schema = person().schema().schema;
        assert_eq!(
            schema,
            json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "age": { "type": "integer", "description": "in years" }
                },
                "required": ["name"]
            })
        );
    }

    #[test]
    fn merge_prefers_the_child() {
        let parent = object().field("id", integer()).field("kind", text());
        let child = object().field("kind", text()).field("salary", integer());
        let merged = MergeObjects::new(parent.into_ref(), child.into_ref());
        let out = merged.call(&json!({ "id": 1, "kind": "staff", "salary": 10 })).unwrap();
        assert_eq!(out, json!({ "id": 1, "kind": "staff", "salary": 10 }));

        let report = merged.call(&json!({ "kind": "staff" })).unwrap_err();
        assert!(matches!(report, Report::MergedObject(..)));
        assert_eq!(report.path_hash().keys().collect::<Vec<_>>(), vec![".id", ".salary"]);
    }
}
