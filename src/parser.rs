//! Type descriptions and the parser that turns them into [`Node`] trees.
//!
//! A [`TypeDef`] is what the struct runtime tells us about a type: fields
//! with a required flag, unions, constraints, arrays, enums, scalar tags and
//! references to other named types. Parsing flattens one definition into a
//! node tree and records every named type it passes through ("found types")
//! so the compiler can queue them separately.
use std::path::Path;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::LoadError;
use crate::node::{Attribute, Literal, Node, Scalar};

// ————————————————————————————————————————————————————————————————————————————
// TYPE DESCRIPTIONS
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeDef {
    /// Record with keys.
    Struct { keys: Vec<KeyDef> },
    /// Union of two types.
    Sum { left: Box<TypeDef>, right: Box<TypeDef> },
    /// Refinement. Constraints do not survive into the node tree.
    Constrained {
        base: Box<TypeDef>,
        #[serde(default)]
        rules: Vec<Constraint>,
    },
    Array { member: Box<TypeDef> },
    Enum { values: Vec<Literal> },
    Scalar { scalar: Scalar },
    /// Any other named type in the registry.
    Named { name: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDef {
    pub name: String,
    #[serde(default = "required_by_default")]
    pub required: bool,
    #[serde(rename = "type")]
    pub ty: TypeDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn required_by_default() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Constraint {
    Pattern(String),
    Minimum(f64),
    Maximum(f64),
    ExclusiveMinimum(f64),
    ExclusiveMaximum(f64),
    MultipleOf(f64),
}

impl TypeDef {
    pub fn scalar(scalar: Scalar) -> Self {
        TypeDef::Scalar { scalar }
    }

    pub fn named(name: impl Into<String>) -> Self {
        TypeDef::Named { name: name.into() }
    }

    pub fn sum(left: TypeDef, right: TypeDef) -> Self {
        TypeDef::Sum { left: Box::new(left), right: Box::new(right) }
    }

    pub fn array(member: TypeDef) -> Self {
        TypeDef::Array { member: Box::new(member) }
    }
}

impl KeyDef {
    pub fn new(name: impl Into<String>, required: bool, ty: TypeDef) -> Self {
        Self { name: name.into(), required, ty, description: None }
    }
}

/// Named type definitions, in declaration order. Names use `::` as the
/// namespace separator (`Api::Person`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRegistry {
    types: IndexMap<String, TypeDef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(mut self, name: impl Into<String>, def: TypeDef) -> Self {
        self.types.insert(name.into(), def);
        self
    }

    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.types.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn from_json_str(source: &str) -> Result<Self, String> {
        crate::path_de::from_str_with_path(source)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io { path: path_str.clone(), source })?;
        crate::path_de::from_slice_with_path(&bytes).map_err(|message| LoadError::Json { path: path_str, message })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PARSE RESULT
// ————————————————————————————————————————————————————————————————————————————

/// Tree plus the named types found while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    pub tree: Node,
    pub found: IndexSet<String>,
}

impl ParseResult {
    pub fn pure(tree: Node) -> Self {
        Self { tree, found: IndexSet::new() }
    }

    /// Continue with the tree, unioning the found sets of both steps.
    pub fn bind(self, f: impl FnOnce(Node) -> ParseResult) -> ParseResult {
        let ParseResult { tree, found: more } = f(self.tree);
        let mut found = self.found;
        found.extend(more);
        ParseResult { tree, found }
    }

    pub fn map(self, f: impl FnOnce(Node) -> Node) -> ParseResult {
        self.bind(|tree| ParseResult::pure(f(tree)))
    }

    /// Run a parse for every item, collecting trees and unioning found sets.
    fn traverse<T>(items: impl IntoIterator<Item = T>, mut f: impl FnMut(T) -> ParseResult) -> (Vec<Node>, IndexSet<String>) {
        let mut trees = Vec::new();
        let mut found = IndexSet::new();
        for item in items {
            let ParseResult { tree, found: more } = f(item);
            trees.push(tree);
            found.extend(more);
        }
        (trees, found)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PARSER
// ————————————————————————————————————————————————————————————————————————————

/// Parse one definition. Never fails: anything not structurally understood
/// is a named type and becomes a reference placeholder.
pub fn parse(def: &TypeDef) -> ParseResult {
    match def {
        TypeDef::Struct { keys } => {
            let (values, found) = ParseResult::traverse(keys, |key| parse(&key.ty));
            let attributes = keys
                .iter()
                .zip(values)
                .map(|(key, value)| {
                    let attribute = Attribute::new(key.name.clone(), key.required, value);
                    match &key.description {
                        Some(text) => attribute.with_meta("description", text.clone()),
                        None => attribute,
                    }
                })
                .collect();
            ParseResult { tree: Node::Object(attributes), found }
        }
        TypeDef::Sum { left, right } => {
            parse(left).bind(|lhs| parse(right).map(|rhs| Node::sum(lhs, rhs)))
        }
        TypeDef::Constrained { base, .. } => parse(base),
        TypeDef::Array { member } => parse(member).map(Node::list),
        TypeDef::Enum { values } => ParseResult::pure(Node::Enum(values.clone())),
        TypeDef::Scalar { scalar } => ParseResult::pure(Node::scalar(*scalar)),
        TypeDef::Named { name } => {
            let mut found = IndexSet::new();
            found.insert(name.clone());
            ParseResult { tree: Node::reference(name.clone()), found }
        }
    }
}

/// Parse a registry entry. The root never counts as one of its own found types.
pub fn parse_root(name: &str, def: &TypeDef) -> ParseResult {
    let mut result = match def {
        // a root that is only an alias still needs its own shape
        TypeDef::Named { name: target } if target == name => ParseResult::pure(Node::scalar(Scalar::Any)),
        other => parse(other),
    };
    result.found.shift_remove(name);
    result
}

// ------------------------------- Tests ------------------------------------ //
