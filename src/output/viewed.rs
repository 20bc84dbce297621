//! View dispatch and inheritance for outputs.
use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::{BASE_VIEW, CallOptions, Output, OutputRef};
use crate::error::DefinitionError;
use crate::report::Report;
use crate::schema::{self, SchemaPair};

// ————————————————————————————————————————————————————————————————————————————
// VIEWED
// ————————————————————————————————————————————————————————————————————————————

/// Picks one serializer per call from `options.view`. Unknown names fall
/// back to `base`.
#[derive(Clone)]
pub struct Viewed {
    views: IndexMap<String, OutputRef>,
}

impl Viewed {
    pub fn new(views: IndexMap<String, OutputRef>) -> Result<Self, DefinitionError> {
        if !views.contains_key(BASE_VIEW) {
            return Err(DefinitionError::MissingBase);
        }
        Ok(Self { views })
    }

    fn select(&self, options: &CallOptions) -> &OutputRef {
        match self.views.get(options.view_name()) {
            Some(selected) => selected,
            // `new` guarantees the base entry
            None => &self.views[BASE_VIEW],
        }
    }
}

impl Output for Viewed {
    fn call_with(&self, value: &Value, options: &CallOptions) -> Value {
        self.select(options).call_with(value, options)
    }

    fn serialize_report_with(&self, value: &Value, options: &CallOptions) -> Result<Value, Report> {
        self.select(options).serialize_report_with(value, options)
    }

    /// Every shape the resource can take.
    fn schema(&self) -> SchemaPair {
        SchemaPair::combine(self.views.values().map(|view| view.schema()), schema::one_of)
    }

    fn views(&self) -> BTreeSet<String> {
        self.views.keys().cloned().collect()
    }

    fn view_of(&self, name: &str) -> Option<OutputRef> {
        self.views.get(name).cloned()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INHERITANCE
// ————————————————————————————————————————————————————————————————————————————

/// Parent fields merged under the child's. Views belong to the child.
#[derive(Clone)]
pub struct MergeObjects {
    parent: OutputRef,
    child: OutputRef,
}

impl MergeObjects {
    pub fn new(parent: OutputRef, child: OutputRef) -> Self {
        Self { parent, child }
    }
}

fn merge(parent: Value, child: Value) -> Value {
    match (parent, child) {
        (Value::Object(mut parent), Value::Object(child)) => {
            parent.extend(child);
            Value::Object(parent)
        }
        (_, child) => child,
    }
}

impl Output for MergeObjects {
    fn call_with(&self, value: &Value, options: &CallOptions) -> Value {
        merge(self.parent.call_with(value, options), self.child.call_with(value, options))
    }

    fn serialize_report_with(&self, value: &Value, options: &CallOptions) -> Result<Value, Report> {
        match (
            self.parent.serialize_report_with(value, options),
            self.child.serialize_report_with(value, options),
        ) {
            (Ok(parent), Ok(child)) => Ok(merge(parent, child)),
            (Err(parent), Ok(_)) => Err(parent),
            (Ok(_), Err(child)) => Err(child),
            (Err(parent), Err(child)) => Err(Report::merged(parent, child)),
        }
    }

    fn schema(&self) -> SchemaPair {
        SchemaPair::combine([self.parent.schema(), self.child.schema()], schema::all_of)
    }

    fn views(&self) -> BTreeSet<String> {
        self.child.views()
    }

    fn view_of(&self, name: &str) -> Option<OutputRef> {
        self.child.view_of(name)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// CONDITIONAL
// ————————————————————————————————————————————————————————————————————————————

pub type Predicate = Arc<dyn Fn(&Value, &CallOptions) -> bool + Send + Sync>;

/// `then` when the predicate holds for `(value, options)`, else `otherwise`.
#[derive(Clone)]
pub struct Conditional {
    predicate: Predicate,
    then: OutputRef,
    otherwise: OutputRef,
}

impl Conditional {
    pub fn new(predicate: Predicate, then: OutputRef, otherwise: OutputRef) -> Self {
        Self { predicate, then, otherwise }
    }

    /// Holds when the caller asked for view `name`.
    pub fn on_view(name: impl Into<String>, then: OutputRef, otherwise: OutputRef) -> Self {
        let name = name.into();
        let predicate: Predicate =
            Arc::new(move |_: &Value, options: &CallOptions| options.view.as_deref() == Some(name.as_str()));
        Self::new(predicate, then, otherwise)
    }

    fn branch(&self, value: &Value, options: &CallOptions) -> &OutputRef {
        if (self.predicate)(value, options) { &self.then } else { &self.otherwise }
    }
}

impl Output for Conditional {
    fn call_with(&self, value: &Value, options: &CallOptions) -> Value {
        self.branch(value, options).call_with(value, options)
    }

    fn serialize_report_with(&self, value: &Value, options: &CallOptions) -> Result<Value, Report> {
        self.branch(value, options).serialize_report_with(value, options)
    }

    fn schema(&self) -> SchemaPair {
        SchemaPair::combine([self.then.schema(), self.otherwise.schema()], schema::one_of)
    }

    fn views(&self) -> BTreeSet<String> {
        let mut names = self.then.views();
        names.extend(self.otherwise.views());
        names
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{integer, object, text};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn summary_and_detail() -> Viewed {
        let base = object().field("id", integer()).referenced("Item");
        let detail = object().field("id", integer()).field("name", text()).referenced("Item.detail");
        let mut views = IndexMap::new();
        views.insert(BASE_VIEW.to_string(), base);
        views.insert("detail".to_string(), detail);
        Viewed::new(views).unwrap()
    }

    #[test]
    fn viewed_needs_a_base() {
        let mut views = IndexMap::new();
        views.insert("detail".to_string(), text().into_ref());
        assert!(matches!(Viewed::new(views), Err(DefinitionError::MissingBase)));
    }

    #[test]
    fn viewed_dispatches_on_the_requested_view() {
        let item = summary_and_detail();
        let value = json!({ "id": 1, "name": "pen" });
        assert_eq!(item.call(&value), json!({ "id": 1 }));
        assert_eq!(item.call_with(&value, &CallOptions::view("detail")), value);
        assert_eq!(item.call_with(&value, &CallOptions::view("nope")), json!({ "id": 1 }));
        assert_eq!(item.views().into_iter().collect::<Vec<_>>(), vec!["base", "detail"]);
    }

    #[test]
    fn viewed_schema_is_one_of_its_views() {
        assert_eq!(
            summary_and_detail().schema().schema,
            json!({ "oneOf": [
                { "$ref": "#/components/schemas/Item" },
                { "$ref": "#/components/schemas/Item.detail" }
            ] })
        );
    }

    #[test]
    fn lists_of_viewed_values_are_viewable() {
        let items = summary_and_detail().list();
        let detail = items.clone().view("detail").unwrap();
        let values = json!([{ "id": 1, "name": "a" }, { "id": 2, "name": "b" }]);
        assert_eq!(detail.call(&values), values);
        assert_eq!(items.call_with(&values, &CallOptions::view("detail")), values);
        assert_eq!(items.call(&values), json!([{ "id": 1 }, { "id": 2 }]));
    }

    #[test]
    fn merge_lets_the_child_win() {
        let parent = object().field("id", integer()).field("kind", text());
        let child = object().property(
            "kind",
            crate::output::Property::new(text().via_map(|_| Value::from("staff"))),
        );
        let merged = MergeObjects::new(parent.into_ref(), child.into_ref());
        assert_eq!(merged.call(&json!({ "id": 1, "kind": "person" })), json!({ "id": 1, "kind": "staff" }));

        let report = merged.serialize_report(&json!({ "kind": "person" })).unwrap_err();
        assert_eq!(report.path_hash().keys().collect::<Vec<_>>(), vec![".id"]);
    }

    #[test]
    fn conditional_follows_the_predicate() {
        let choose = Conditional::on_view("short", text().via_map(|_| json!("s")), text().into_ref());
        assert_eq!(choose.call_with(&json!("long"), &CallOptions::view("short")), json!("s"));
        assert_eq!(choose.call(&json!("long")), json!("long"));
    }
}
