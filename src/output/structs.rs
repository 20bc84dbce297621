//! Named record outputs: fields, views and single inheritance.
//!
//! A struct serializes as its base shape unless the caller requests one of
//! its views. Each view is the base shape plus the view's own fields (which
//! may override base fields) and documents itself as `Name.view`. Views
//! cannot have views of their own: [`ViewBuilder`] has no way to declare one.
//!
//! ```
//! use json_schematic::output::{CallOptions, Field, Output, OutputStruct, integer, text};
//! use serde_json::json;
//!
//! let user = OutputStruct::new("Api.User")
//!     .field(Field::new("id", integer()))
//!     .view("detail", |view| view.field(Field::new("email", text())))
//!     .build()
//!     .unwrap();
//! let value = json!({ "id": 1, "email": "a@b.c" });
//! assert_eq!(user.call(&value), json!({ "id": 1 }));
//! assert_eq!(user.call_with(&value, &CallOptions::view("detail")), value);
//! ```
use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use super::wrap::{Extractor, key_extractor};
use super::{
    BASE_VIEW, CallOptions, Defer, MergeObjects, Object, Output, OutputRef, Property, Referenced, Viewed,
};
use crate::error::DefinitionError;
use crate::report::Report;
use crate::schema::SchemaPair;

// ————————————————————————————————————————————————————————————————————————————
// FIELDS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone)]
enum Source {
    Ready(OutputRef),
    /// Resolved on first use, for fields whose type is defined later.
    Lazy(Arc<dyn Fn() -> OutputRef + Send + Sync>),
}

/// One serialized member: a name, the output for its value and how to read
/// that value from the domain object (by default, the member of the same
/// name).
#[derive(Clone)]
pub struct Field {
    name: String,
    source: Source,
    extractor: Option<Extractor>,
    description: Option<String>,
    required: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, output: impl Output + 'static) -> Self {
        Self::from_source(name.into(), Source::Ready(output.into_ref()))
    }

    pub fn lazy(name: impl Into<String>, resolve: impl Fn() -> OutputRef + Send + Sync + 'static) -> Self {
        Self::from_source(name.into(), Source::Lazy(Arc::new(resolve)))
    }

    fn from_source(name: String, source: Source) -> Self {
        Self { name, source, extractor: None, description: None, required: true }
    }

    /// Compute the value instead of reading the member.
    pub fn extract(mut self, f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        self.extractor = Some(Arc::new(f));
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Omitted from the output when `null`.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The base view of the field's output, read through the extractor.
    pub(crate) fn property(&self) -> Property {
        let value = match &self.source {
            Source::Ready(output) => base_of(output),
            Source::Lazy(resolve) => {
                let resolve = resolve.clone();
                Defer::new(move || base_of(&resolve())).into_ref()
            }
        };
        let extractor = self.extractor.clone().unwrap_or_else(|| key_extractor(self.name.clone()));
        let mut property = Property::new(value).extract(extractor);
        property.required = self.required;
        property.description = self.description.clone();
        property
    }
}

fn base_of(output: &OutputRef) -> OutputRef {
    output.view_of(BASE_VIEW).unwrap_or_else(|| output.clone())
}

pub(crate) fn object_of(fields: &[Field]) -> Object {
    fields.iter().fold(Object::new(), |object, field| object.property(field.name.clone(), field.property()))
}

pub(crate) fn check_fields(fields: &[Field]) -> Result<(), DefinitionError> {
    let mut seen = IndexSet::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) {
            return Err(DefinitionError::DuplicateField(field.name.clone()));
        }
    }
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDER
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone, Default)]
pub struct ViewBuilder {
    fields: Vec<Field>,
}

impl ViewBuilder {
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}

pub struct OutputStruct {
    name: String,
    parent: Option<StructOutput>,
    fields: Vec<Field>,
    views: Vec<(String, Vec<Field>)>,
}

impl OutputStruct {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), parent: None, fields: Vec::new(), views: Vec::new() }
    }

    /// Inherit the parent's base fields. The parent's views are not inherited.
    pub fn extends(mut self, parent: &StructOutput) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn view(mut self, name: impl Into<String>, define: impl FnOnce(ViewBuilder) -> ViewBuilder) -> Self {
        let view = define(ViewBuilder::default());
        self.views.push((name.into(), view.fields));
        self
    }

    pub fn build(self) -> Result<StructOutput, DefinitionError> {
        check_fields(&self.fields)?;
        let own = object_of(&self.fields).into_ref();
        let inherited = match &self.parent {
            Some(parent) => MergeObjects::new(parent.base.clone(), own.clone()).into_ref(),
            None => own.clone(),
        };
        let base = Referenced::new(inherited.clone(), self.name.clone()).into_ref();

        let mut views = IndexMap::new();
        views.insert(BASE_VIEW.to_string(), base.clone());
        for (view, fields) in &self.views {
            if view == BASE_VIEW {
                return Err(DefinitionError::ReservedView);
            }
            if views.contains_key(view) {
                return Err(DefinitionError::DuplicateView(view.clone()));
            }
            check_fields(fields)?;
            let extended = MergeObjects::new(base.clone(), object_of(fields).into_ref());
            let named = Referenced::new(extended.into_ref(), format!("{}.{view}", self.name));
            views.insert(view.clone(), named.into_ref());
        }

        let output = match views.len() {
            1 => base.clone(),
            _ => Viewed::new(views)?.into_ref(),
        };
        tracing::debug!(name = %self.name, views = self.views.len(), "built output struct");
        Ok(StructOutput { name: self.name, own, inherited, base, output })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUILT STRUCT
// ————————————————————————————————————————————————————————————————————————————

#[derive(Clone)]
pub struct StructOutput {
    name: String,
    own: OutputRef,
    inherited: OutputRef,
    base: OutputRef,
    output: OutputRef,
}

impl StructOutput {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields declared on this struct only.
    pub fn own(&self) -> &OutputRef {
        &self.own
    }

    /// Own fields merged over the parent's base, unreferenced.
    pub fn inherited(&self) -> &OutputRef {
        &self.inherited
    }
}

impl Output for StructOutput {
    fn call_with(&self, value: &Value, options: &CallOptions) -> Value {
        self.output.call_with(value, options)
    }

    fn serialize_report_with(&self, value: &Value, options: &CallOptions) -> Result<Value, Report> {
        self.output.serialize_report_with(value, options)
    }

    fn schema(&self) -> SchemaPair {
        self.output.schema()
    }

    fn views(&self) -> BTreeSet<String> {
        self.output.views()
    }

    fn view_of(&self, name: &str) -> Option<OutputRef> {
        match name {
            BASE_VIEW => Some(self.base.clone()),
            _ => self.output.view_of(name),
        }
    }

    fn into_ref(self) -> OutputRef {
        self.output
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{integer, text};
    use crate::schema::collect_components;
    use once_cell::sync::OnceCell;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn initials(value: &Value) -> Value {
        let name = value["name"].as_str().unwrap_or_default();
        Value::from(name.split_whitespace().filter_map(|w| w.chars().next()).collect::<String>())
    }

    fn user() -> StructOutput {
        OutputStruct::new("Api.User")
            .field(Field::new("id", integer()))
            .field(Field::new("name", text()))
            .view("detail", |view| view.field(Field::new("initials", text()).extract(initials)))
            .build()
            .unwrap()
    }

    #[test]
    fn views_add_fields_on_request() {
        let bob = json!({ "id": 1, "name": "Bob Smith" });
        assert_eq!(user().call(&bob), bob);
        assert_eq!(
            user().call_with(&bob, &CallOptions::view("detail")),
            json!({ "id": 1, "name": "Bob Smith", "initials": "BS" })
        );
        assert_eq!(user().views().into_iter().collect::<Vec<_>>(), vec!["base", "detail"]);
    }

    #[test]
    fn views_document_as_separate_components() {
        let pair = user().schema();
        assert_eq!(
            pair.schema,
            json!({ "oneOf": [
                { "$ref": "#/components/schemas/Api.User" },
                { "$ref": "#/components/schemas/Api.User.detail" }
            ] })
        );
        let components = collect_components([pair]);
        assert_eq!(components.keys().collect::<Vec<_>>(), vec!["Api.User", "Api.User.detail"]);
        assert_eq!(components["Api.User"]["required"], json!(["id", "name"]));
    }

    #[test]
    fn nested_structs_serialize_their_base() {
        let post = OutputStruct::new("Api.Post")
            .field(Field::new("title", text()))
            .field(Field::new("author", user()))
            .build()
            .unwrap();
        let value = json!({ "title": "t", "author": { "id": 2, "name": "Al Bo", "secret": 1 } });
        // the caller's view applies to the post, not to its author
        assert_eq!(
            post.call_with(&value, &CallOptions::view("detail")),
            json!({ "title": "t", "author": { "id": 2, "name": "Al Bo" } })
        );
    }

    #[test]
    fn children_merge_over_the_parent_base() {
        let staff = OutputStruct::new("Api.Staff")
            .extends(&user())
            .field(Field::new("name", text()).extract(|v| {
                Value::from(format!("Dr. {}", v["name"].as_str().unwrap_or_default()))
            }))
            .field(Field::new("salary", integer()).optional())
            .build()
            .unwrap();
        let value = json!({ "id": 3, "name": "Who" });
        assert_eq!(staff.call(&value), json!({ "id": 3, "name": "Dr. Who" }));
        // parent views are not inherited
        assert!(staff.views().is_empty());

        let components = collect_components([staff.schema()]);
        let parts = components["Api.Staff"]["allOf"].as_array().unwrap();
        assert_eq!(parts[0], json!({ "$ref": "#/components/schemas/Api.User" }));
    }

    #[test]
    fn view_definitions_are_checked() {
        let reserved = OutputStruct::new("A").view("base", |v| v).build();
        assert!(matches!(reserved, Err(DefinitionError::ReservedView)));
        let twice = OutputStruct::new("A").view("x", |v| v).view("x", |v| v).build();
        assert!(matches!(twice, Err(DefinitionError::DuplicateView(ref v)) if v == "x"));
        let fields = OutputStruct::new("A").field(Field::new("a", text())).field(Field::new("a", text())).build();
        assert!(matches!(fields, Err(DefinitionError::DuplicateField(_))));
    }

    #[test]
    fn lazy_fields_allow_self_reference() {
        static NODE: OnceCell<StructOutput> = OnceCell::new();
        let node = NODE.get_or_init(|| {
            OutputStruct::new("Api.Node")
                .field(Field::new("id", integer()))
                .field(Field::lazy("parent", || NODE.get().cloned().unwrap().into_ref()).optional())
                .build()
                .unwrap()
        });
        let value = json!({ "id": 2, "parent": { "id": 1, "parent": null } });
        assert_eq!(node.call(&value), json!({ "id": 2, "parent": { "id": 1 } }));
        let components = collect_components([node.schema()]);
        assert_eq!(components.keys().collect::<Vec<_>>(), vec!["Api.Node"]);
    }
}
