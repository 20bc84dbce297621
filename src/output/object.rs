use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::wrap::{Extractor, key_extractor};
use super::{CallOptions, Output, OutputRef};
use crate::report::Report;
use crate::schema::{self, SchemaPair};

#[derive(Clone)]
pub struct Property {
    pub value: OutputRef,
    /// Reads the member from the domain value. Without one, `value` sees the
    /// whole domain value.
    pub extractor: Option<Extractor>,
    pub required: bool,
    pub description: Option<String>,
}

impl Property {
    pub fn new(value: impl Output + 'static) -> Self {
        Self { value: value.into_ref(), extractor: None, required: true, description: None }
    }

    /// Member read from `key` of the domain value.
    pub fn keyed(key: impl Into<String>, value: impl Output + 'static) -> Self {
        Self::new(value).extract(key_extractor(key))
    }

    pub fn extract(mut self, extractor: Extractor) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    fn member(&self, value: &Value) -> Value {
        match &self.extractor {
            Some(extract) => extract(value),
            None => value.clone(),
        }
    }
}

/// Record serializer. Optional members that are `null` are omitted.
/// Views requested by the caller do not cascade into members.
#[derive(Clone, Default)]
pub struct Object {
    properties: IndexMap<String, Property>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, key: impl Into<String>, property: Property) -> Self {
        self.properties.insert(key.into(), property);
        self
    }

    pub fn field(self, key: impl Into<String>, value: impl Output + 'static) -> Self {
        let key = key.into();
        let property = Property::keyed(key.clone(), value);
        self.property(key, property)
    }

    pub fn optional_field(self, key: impl Into<String>, value: impl Output + 'static) -> Self {
        let key = key.into();
        let property = Property::keyed(key.clone(), value).optional();
        self.property(key, property)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }
}

impl Output for Object {
    fn call_with(&self, value: &Value, _: &CallOptions) -> Value {
        let inner = CallOptions::default();
        let mut out = Map::new();
        for (key, property) in &self.properties {
            let member = property.member(value);
            if member.is_null() && !property.required {
                continue;
            }
            out.insert(key.clone(), property.value.call_with(&member, &inner));
        }
        Value::Object(out)
    }

    fn serialize_report_with(&self, value: &Value, _: &CallOptions) -> Result<Value, Report> {
        let inner = CallOptions::default();
        let mut out = Map::new();
        let mut problems = IndexMap::new();
        for (key, property) in &self.properties {
            let member = property.member(value);
            if member.is_null() {
                if property.required {
                    problems.insert(key.clone(), Report::required());
                }
                continue;
            }
            match property.value.serialize_report_with(&member, &inner) {
                Ok(serialized) => {
                    out.insert(key.clone(), serialized);
                }
                Err(report) => {
                    problems.insert(key.clone(), report);
                }
            }
        }
        if problems.is_empty() { Ok(Value::Object(out)) } else { Err(Report::Object(problems)) }
    }

    fn schema(&self) -> SchemaPair {
        let keys: Vec<String> = self.properties.keys().cloned().collect();
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
            schema::object(keys.into_iter().zip(schemas).collect(), required)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{integer, object, text};
    use std::sync::Arc;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn person() -> Object {
        object()
            .field("id", integer())
            .optional_field("nickname", text())
            .property("initials", Property::new(text()).extract(Arc::new(|v: &Value| Value::from(initials(v)))))
    }

    fn initials(v: &Value) -> String {
        v["name"].as_str().unwrap_or_default().split_whitespace().filter_map(|w| w.chars().next()).collect()
    }

    #[test]
    fn serializes_declared_members() {
        let out = person().call(&json!({ "id": 1, "name": "Bob Smith", "password": "x" }));
        assert_eq!(out, json!({ "id": 1, "initials": "BS" }));
    }

    #[test]
    fn checked_path_requires_required_members() {
        let report = person().serialize_report(&json!({ "nickname": 3 })).unwrap_err();
        let hash = report.path_hash();
        assert_eq!(hash[".id"], vec!["is required".to_string()]);
        assert_eq!(hash[".nickname"], vec!["must be a string".to_string()]);
        assert_eq!(hash.len(), 2);
    }

    #[test]
    fn schema_collects_required() {
        assert_eq!(person().schema().schema["required"], json!(["id", "initials"]));
    }
}
