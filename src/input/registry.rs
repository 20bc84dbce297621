//! Input trees for every entry of a [`TypeRegistry`].
//!
//! References between entries go through lookup nodes that find the
//! target in a shared table, so recursive and mutually recursive types
//! build in one pass. Every entry documents itself as a component named with
//! `.` separators (`Api::Person` → `Api.Person`).
//!
//! Lookups only hold a weak handle on the table and never cache what they
//! find, so entries do not own each other. Entries handed
//! out by [`RegistryInputs`] carry the strong one, so the table lives exactly
//! as long as someone can still reach it from outside.
use std::ops::Bound;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use once_cell::sync::OnceCell;
use regex::Regex;

use serde_json::Value;

use super::refine::Bounds;
use super::{Input, InputRef, Object, Property, any, boolean, integer, null, number, text};
use crate::error::DefinitionError;
use crate::node::Scalar;
use crate::parser::{Constraint, TypeDef, TypeRegistry};
use crate::report::Report;
use crate::schema::{Found, SchemaPair, Thunk};

type Table = Arc<OnceCell<IndexMap<String, InputRef>>>;

/// `Api::Person` → `Api.Person`
pub fn dotted_name(name: &str) -> String {
    name.replace("::", ".")
}

#[derive(Clone)]
pub struct RegistryInputs {
    table: Table,
}

impl RegistryInputs {
    pub fn build(registry: &TypeRegistry) -> Result<Self, DefinitionError> {
        let table: Table = Arc::new(OnceCell::new());
        let mut inputs = IndexMap::new();
        for name in registry.names() {
            let Some(def) = registry.get(name) else { continue };
            let input = build_input(def, registry, &table)?.referenced(dotted_name(name));
            inputs.insert(name.to_string(), input);
        }
        tracing::debug!(types = inputs.len(), "built registry inputs");
        // a fresh cell cannot already be set
        let _ = table.set(inputs);
        Ok(Self { table })
    }

    pub fn input_for(&self, name: &str) -> Option<InputRef> {
        let input = self.table.get()?.get(name)?.clone();
        Some(Arc::new(Rooted { table: self.table.clone(), input }))
    }

    pub fn require(&self, name: &str) -> Result<InputRef, DefinitionError> {
        self.input_for(name).ok_or_else(|| DefinitionError::UnknownType(name.to_string()))
    }
}

/// A table entry plus the strong handle that keeps its references resolvable.
struct Rooted {
    table: Table,
    input: InputRef,
}

impl Input for Rooted {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        self.input.call(value)
    }

    fn schema(&self) -> SchemaPair {
        let pair = self.input.schema();
        SchemaPair { schema: pair.schema, found: pin(pair.found, &self.table) }
    }
}

/// Reference to another registry entry, resolved on every use.
struct Lookup {
    table: Weak<OnceCell<IndexMap<String, InputRef>>>,
    name: String,
}

impl Lookup {
    fn resolve(&self) -> InputRef {
        let resolved = self.table.upgrade().and_then(|table| table.get()?.get(&self.name).cloned());
        resolved.unwrap_or_else(|| {
            tracing::warn!(name = %self.name, "registry input resolved without a live table");
            any().into_ref()
        })
    }
}

impl Input for Lookup {
    fn call(&self, value: &Value) -> Result<Value, Report> {
        self.resolve().call(value)
    }

    fn schema(&self) -> SchemaPair {
        self.resolve().schema()
    }
}

/// Thunks that keep the table alive until they are forced, all the way down.
fn pin(found: Found, table: &Table) -> Found {
    found
        .into_iter()
        .map(|(name, thunk)| {
            let table = table.clone();
            let pinned = Thunk::new(move || {
                let pair = thunk.force().clone();
                SchemaPair { schema: pair.schema, found: pin(pair.found, &table) }
            });
            (name, pinned)
        })
        .collect()
}

fn build_input(def: &TypeDef, registry: &TypeRegistry, table: &Table) -> Result<InputRef, DefinitionError> {
    let input = match def {
        TypeDef::Struct { keys } => {
            let mut object = Object::new();
            for key in keys {
                let mut property = Property::new(build_input(&key.ty, registry, table)?);
                if !key.required {
                    property = property.optional();
                }
                if let Some(text) = &key.description {
                    property = property.description(text.clone());
                }
                object = object.property(key.name.clone(), property);
            }
            object.into_ref()
        }
        TypeDef::Sum { left, right } => {
            build_input(left, registry, table)?.or(build_input(right, registry, table)?)
        }
        TypeDef::Constrained { base, rules } => {
            let mut input = build_input(base, registry, table)?;
            if let Some(bounds) = bounds_of(rules) {
                input = input.in_range((bounds.start, bounds.end));
            }
            for rule in rules {
                input = constrain(input, rule)?;
            }
            input
        }
        TypeDef::Array { member } => build_input(member, registry, table)?.list(),
        TypeDef::Enum { values } => any().enum_(values.iter().map(|v| v.to_json())),
        TypeDef::Scalar { scalar } => scalar_input(*scalar),
        TypeDef::Named { name } => {
            if registry.get(name).is_none() {
                return Err(DefinitionError::UnknownType(name.clone()));
            }
            Lookup { table: Arc::downgrade(table), name: name.clone() }.into_ref()
        }
    };
    Ok(input)
}

fn scalar_input(scalar: Scalar) -> InputRef {
    match scalar {
        Scalar::Null => null().into_ref(),
        Scalar::Boolean => boolean().into_ref(),
        Scalar::Integer => integer().into_ref(),
        Scalar::Number => number().into_ref(),
        Scalar::String => text().into_ref(),
        Scalar::Date => text().format("date").into_ref(),
        Scalar::DateTime => text().format("date-time").into_ref(),
        Scalar::Any => any().into_ref(),
    }
}

fn constrain(input: InputRef, rule: &Constraint) -> Result<InputRef, DefinitionError> {
    let refined = match rule {
        Constraint::Pattern(pattern) => {
            let regex = Regex::new(pattern)
                .map_err(|source| DefinitionError::InvalidPattern { pattern: pattern.clone(), source })?;
            input.pattern(regex)
        }
        Constraint::MultipleOf(m) => input.multiple_of(*m),
        // folded by `bounds_of`
        Constraint::Minimum(_)
        | Constraint::Maximum(_)
        | Constraint::ExclusiveMinimum(_)
        | Constraint::ExclusiveMaximum(_) => input,
    };
    Ok(refined)
}

/// All bound rules of one constrained type as a single interval. A later
/// rule for the same side replaces an earlier one.
fn bounds_of(rules: &[Constraint]) -> Option<Bounds> {
    let mut bounds = Bounds { start: Bound::Unbounded, end: Bound::Unbounded };
    let mut any_bound = false;
    for rule in rules {
        match rule {
            Constraint::Minimum(m) => bounds.start = Bound::Included(*m),
            Constraint::ExclusiveMinimum(m) => bounds.start = Bound::Excluded(*m),
            Constraint::Maximum(m) => bounds.end = Bound::Included(*m),
            Constraint::ExclusiveMaximum(m) => bounds.end = Bound::Excluded(*m),
            Constraint::Pattern(_) | Constraint::MultipleOf(_) => continue,
        }
        any_bound = true;
    }
    any_bound.then_some(bounds)
}

// ------------------------------- Tests ------------------------------------ //
