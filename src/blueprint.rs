//! Field-list serializers with views picked by a decision chain.
//!
//! A [`Blueprint`] is the older way of declaring views. Each view starts as a
//! copy of the base field list and is edited with `add` (append, or replace
//! a field of the same name) and `except` (drop a field). At serialize time a
//! chain of [`Conditional`] nodes is walked in declaration order: the first
//! view whose name matches `options.view` wins, everything else falls
//! through to the base. That selects exactly what [`Viewed`] selects for the
//! same options.
//!
//! [`Viewed`]: crate::output::Viewed
use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::DefinitionError;
use crate::output::structs::{check_fields, object_of};
use crate::output::{BASE_VIEW, CallOptions, Conditional, Field, Output, OutputRef, Referenced};
use crate::report::Report;
use crate::schema::{self, SchemaPair};

#[derive(Clone)]
enum Edit {
    Add(Field),
    Except(String),
}

/// Edits applied to a copy of the base fields.
#[derive(Clone, Default)]
pub struct ViewDef {
    edits: Vec<Edit>,
}

impl ViewDef {
    pub fn add(mut self, field: Field) -> Self {
        self.edits.push(Edit::Add(field));
        self
    }

    pub fn except(mut self, name: impl Into<String>) -> Self {
        self.edits.push(Edit::Except(name.into()));
        self
    }

    fn apply(&self, base: &[Field]) -> Result<Vec<Field>, DefinitionError> {
        let mut fields = base.to_vec();
        for edit in &self.edits {
            match edit {
                Edit::Add(field) => match fields.iter().position(|f| f.name() == field.name()) {
                    Some(index) => fields[index] = field.clone(),
                    None => fields.push(field.clone()),
                },
                Edit::Except(name) => {
                    let before = fields.len();
                    fields.retain(|f| f.name() != name);
                    if fields.len() == before {
                        return Err(DefinitionError::UnknownField(name.clone()));
                    }
                }
            }
        }
        Ok(fields)
    }
}

pub struct BlueprintBuilder {
    name: String,
    fields: Vec<Field>,
    views: Vec<(String, ViewDef)>,
}

impl BlueprintBuilder {
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn view(mut self, name: impl Into<String>, define: impl FnOnce(ViewDef) -> ViewDef) -> Self {
        self.views.push((name.into(), define(ViewDef::default())));
        self
    }

    pub fn build(self) -> Result<Blueprint, DefinitionError> {
        check_fields(&self.fields)?;
        let base = Referenced::new(object_of(&self.fields).into_ref(), self.name.clone()).into_ref();

        let mut views = IndexMap::<String, OutputRef>::new();
        for (view, def) in &self.views {
            if view == BASE_VIEW {
                return Err(DefinitionError::ReservedView);
            }
            if views.contains_key(view) {
                return Err(DefinitionError::DuplicateView(view.clone()));
            }
            let fields = def.apply(&self.fields)?;
            check_fields(&fields)?;
            let serializer = Referenced::new(object_of(&fields).into_ref(), format!("{}.{view}", self.name));
            views.insert(view.clone(), serializer.into_ref());
        }

        // innermost condition is the last view, so the first declared view is tested first
        let dispatcher = views.iter().rev().fold(base.clone(), |otherwise, (view, serializer)| {
            Conditional::on_view(view.clone(), serializer.clone(), otherwise).into_ref()
        });
        tracing::debug!(name = %self.name, views = views.len(), "built blueprint");
        Ok(Blueprint { name: self.name, base, views, dispatcher })
    }
}

#[derive(Clone)]
pub struct Blueprint {
    name: String,
    base: OutputRef,
    views: IndexMap<String, OutputRef>,
    dispatcher: OutputRef,
}

impl Blueprint {
    pub fn define(name: impl Into<String>) -> BlueprintBuilder {
        BlueprintBuilder { name: name.into(), fields: Vec::new(), views: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Output for Blueprint {
    fn call_with(&self, value: &Value, options: &CallOptions) -> Value {
        self.dispatcher.call_with(value, options)
    }

    fn serialize_report_with(&self, value: &Value, options: &CallOptions) -> Result<Value, Report> {
        self.dispatcher.serialize_report_with(value, options)
    }

    fn schema(&self) -> SchemaPair {
        let shapes = std::iter::once(&self.base).chain(self.views.values()).map(|view| view.schema());
        SchemaPair::combine(shapes, schema::one_of)
    }

    fn views(&self) -> BTreeSet<String> {
        let mut names: BTreeSet<String> = self.views.keys().cloned().collect();
        names.insert(BASE_VIEW.to_string());
        names
    }

    fn view_of(&self, name: &str) -> Option<OutputRef> {
        match name {
            BASE_VIEW => Some(self.base.clone()),
            _ => self.views.get(name).cloned(),
        }
    }
}

// ------------------------------- Tests ------------------------------------ //
