//! Named record inputs with single inheritance.
//!
//! ```
//! use json_schematic::input::{Input, InputStruct, integer, text};
//! let person = InputStruct::new("Api.Person").field("name", text()).build().unwrap();
//! let staff = InputStruct::new("Api.Staff").extends(&person).field("salary", integer()).build().unwrap();
//! assert!(staff.call(&serde_json::json!({ "name": "Ann", "salary": 1 })).is_ok());
//! ```
use serde_json::Value;

use super::{Input, InputRef, MergeObjects, Object, Property};
use crate::error::DefinitionError;
use crate::report::Report;
use crate::schema::SchemaPair;

pub struct InputStruct {
    name: String,
    parent: Option<StructInput>,
    object: Object,
    duplicate: Option<String>,
}

impl InputStruct {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), parent: None, object: Object::new(), duplicate: None }
    }

    pub fn extends(mut self, parent: &StructInput) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn property(mut self, key: impl Into<String>, property: Property) -> Self {
        let key = key.into();
        if self.object.contains(&key) && self.duplicate.is_none() {
            self.duplicate = Some(key.clone());
        }
        self.object = self.object.property(key, property);
        self
    }

    pub fn field(self, key: impl Into<String>, value: impl Input + 'static) -> Self {
        self.property(key, Property::new(value))
    }

    pub fn optional_field(self, key: impl Into<String>, value: impl Input + 'static) -> Self {
        self.property(key, Property::new(value).optional())
    }

    /// Freeze the definition. Redeclaring a key inside one struct is a
    /// definition error; overriding a parent's key is not.
    pub fn build(self) -> Result<StructInput, DefinitionError> {
        if let Some(key) = self.duplicate {
            return Err(DefinitionError::DuplicateField(key));
        }
        let own = self.object.into_ref();
        let inherited: InputRef = match &self.parent {
            Some(parent) => MergeObjects::new(parent.input.clone(), own.clone()).into_ref(),
            None => own.clone(),
        };
        let input = inherited.clone().referenced(self.name.clone());
        tracing::debug!(name = %self.name, parent = ?self.parent.as_ref().map(|p| &p.name), "built input struct");
        Ok(StructInput { name: self.name, own, inherited, input })
    }
}

/// A built struct. Validates like its inherited object and documents itself
/// as `$ref` to its own name.
#[derive(Clone)]
pub struct StructInput {
    name: String,
    own: InputRef,
    inherited: InputRef,
    input: InputRef,
}

impl StructInput {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Only the fields declared on this struct.
    pub fn own(&self) -> &InputRef {
        &self.own
    }

    /// Own fields merged over the parent's, not referenced.
    pub fn inherited(&self) -> &InputRef {
        &self.inherited
    }
}

impl Input for StructInput {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        self.input.call(value)
    }

    fn schema(&self) -> SchemaPair {
        self.input.schema()
    }

    fn into_ref(self) -> InputRef {
        self.input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{integer, text};
    use crate::schema::collect_components;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn person() -> StructInput {
        InputStruct::new("Api.Person")
            .field("id", integer())
            .optional_field("name", text())
            .build()
            .unwrap()
    }

    #[test]
    fn children_validate_parent_fields_too() {
        let staff = InputStruct::new("Api.Staff")
            .extends(&person())
            .field("name", text())
            .field("salary", integer())
            .build()
            .unwrap();
        let ok = staff.call(&json!({ "id": 1, "name": "Ann", "salary": 2 }));
        assert_eq!(ok, Ok(json!({ "id": 1, "name": "Ann", "salary": 2 })));

        let report = staff.call(&json!({ "name": 1 })).unwrap_err();
        assert!(matches!(report, Report::MergedObject(..)));
        let hash = report.path_hash();
        assert_eq!(hash.keys().collect::<Vec<_>>(), vec![".id", ".name", ".salary"]);
    }

    #[test]
    fn inheritance_renders_as_flat_all_of() {
        let staff = InputStruct::new("Api.Staff").extends(&person()).field("salary", integer()).build().unwrap();
        let pair = staff.schema();
        assert_eq!(pair.schema, json!({ "$ref": "#/components/schemas/Api.Staff" }));
        let components = collect_components([pair]);
        assert_eq!(components.keys().collect::<Vec<_>>(), vec!["Api.Person", "Api.Staff"]);
        let parts = components["Api.Staff"]["allOf"].as_array().unwrap();
        assert_eq!(parts[0], json!({ "$ref": "#/components/schemas/Api.Person" }));
        assert_eq!(parts[1]["required"], json!(["salary"]));
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let built = InputStruct::new("X").field("a", text()).field("a", integer()).build();
        assert!(matches!(built, Err(DefinitionError::DuplicateField(ref k)) if k == "a"));
    }
}
