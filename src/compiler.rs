//! Type-tree compiler.
//!
//! Parses registry types into [`Node`] trees, normalizes them and renders
//! OpenAPI fragments, discovering and compiling every referenced type.
//!
//! Pipeline per type: `parse_root` → `flatten_sums` → `dedup_one_of` →
//! reference renaming → `render`. Each pass is one `cata` over the tree.
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value, json};

use crate::error::DefinitionError;
use crate::node::{Layer, Leaf, Node};
use crate::parser::{ParseResult, TypeRegistry, parse_root};
use crate::schema;

// ————————————————————————————————————————————————————————————————————————————
// NORMALIZATION
// ————————————————————————————————————————————————————————————————————————————

/// `Sum` → `OneOf`, splicing members that already are `OneOf`s, so any
/// nesting of `A|B|C` ends up as one flat union.
pub fn flatten_sums(node: Node) -> Node {
    match node {
        Node::Sum(lhs, rhs) => {
            let mut members = Vec::new();
            for side in [*lhs, *rhs] {
                match side {
                    Node::OneOf(inner) => members.extend(inner),
                    other => members.push(other),
                }
            }
            Node::OneOf(members)
        }
        other => other,
    }
}

/// Drop structurally equal `OneOf` members, keeping first-seen order.
/// A union left with a single member is that member.
pub fn dedup_one_of(node: Node) -> Node {
    match node {
        Node::OneOf(members) => {
            let mut unique = IndexSet::new();
            for member in members {
                match member {
                    Node::OneOf(inner) => unique.extend(inner),
                    other => {
                        unique.insert(other);
                    }
                }
            }
            let mut members: Vec<Node> = unique.into_iter().collect();
            match members.len() {
                1 => members.remove(0),
                _ => Node::OneOf(members),
            }
        }
        other => other,
    }
}

pub fn normalize(tree: Node) -> Node {
    tree.cata(&mut flatten_sums).cata(&mut dedup_one_of)
}

/// `Api::Person` → `Api_Person`
pub fn safe_name(name: &str) -> String {
    name.replace("::", "_")
}

fn rename_refs(tree: Node) -> Node {
    tree.cata(&mut |node| {
        node.map(|leaf| match leaf {
            Leaf::Ref(name) => Leaf::Ref(safe_name(&name)),
            other => other,
        })
    })
}

// ————————————————————————————————————————————————————————————————————————————
// RENDERING
// ————————————————————————————————————————————————————————————————————————————

fn null_schema() -> Value {
    json!({ "type": "null" })
}

/// Render a normalized tree. References must already carry safe names.
pub fn render(tree: Node) -> Value {
    tree.fold(&mut |layer: Layer<Value>| match layer {
        Layer::Primitive(Leaf::Scalar(scalar), meta) => {
            let mut out = Map::new();
            if let Some(ty) = scalar.type_name() {
                out.insert("type".into(), Value::from(ty));
            }
            if let Some(format) = scalar.format() {
                out.insert("format".into(), Value::from(format));
            }
            if let Some(text) = meta.get("description") {
                out.insert("description".into(), Value::from(text.clone()));
            }
            Value::Object(out)
        }
        Layer::Primitive(Leaf::Ref(name), meta) => match meta.get("description") {
            Some(text) => schema::described(schema::reference(&name), text),
            None => schema::reference(&name),
        },
        Layer::Object(attributes) => {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for attribute in attributes {
                let value = match attribute.meta.get("description") {
                    Some(text) => schema::described(attribute.value, text),
                    None => attribute.value,
                };
                if attribute.required {
                    required.push(attribute.key.clone());
                }
                properties.insert(attribute.key, value);
            }
            schema::object(properties, required)
        }
        Layer::Sum(lhs, rhs) => render_one_of(vec![lhs, rhs]),
        Layer::OneOf(members) => render_one_of(members),
        Layer::List(item) => json!({ "type": "array", "items": item }),
        Layer::Enum(values) => {
            let values: Vec<Value> = values.iter().map(|v| v.to_json()).collect();
            let mut out = Map::new();
            if let Some(ty) = enum_type(&values) {
                out.insert("type".into(), Value::from(ty));
            }
            if values.iter().any(Value::is_null) {
                out.insert("nullable".into(), Value::Bool(true));
            }
            out.insert("enum".into(), Value::Array(values));
            Value::Object(out)
        }
    })
}

/// A `null` member turns into `nullable: true` instead of a schema entry.
fn render_one_of(members: Vec<Value>) -> Value {
    let null = null_schema();
    let had_null = members.contains(&null);
    let mut others: Vec<Value> = members.into_iter().filter(|m| *m != null).collect();
    let core = match others.len() {
        0 => return null,
        1 => others.remove(0),
        _ => json!({ "oneOf": others }),
    };
    if had_null { schema::nullable(core) } else { core }
}

fn enum_type(values: &[Value]) -> Option<&'static str> {
    let mut kinds = values.iter().filter(|v| !v.is_null()).map(|v| match v {
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        _ => "string",
    });
    let first = kinds.next()?;
    kinds.all(|k| k == first).then_some(first)
}

// ————————————————————————————————————————————————————————————————————————————
// COMPILER
// ————————————————————————————————————————————————————————————————————————————

/// Work-list compiler over one registry. One instance per compilation run.
#[derive(Debug)]
pub struct Compiler<'r> {
    registry: &'r TypeRegistry,
    pending: IndexSet<String>,
    finished: IndexMap<String, Value>,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self { registry, pending: IndexSet::new(), finished: IndexMap::new() }
    }

    /// Compile `name` and everything it transitively references. Adding a
    /// type twice is a no-op. On error nothing from this call is kept.
    pub fn add_type(&mut self, name: &str) -> Result<&mut Self, DefinitionError> {
        let (pending, finished) = (self.pending.clone(), self.finished.clone());
        if !self.finished.contains_key(name) {
            self.pending.insert(name.to_string());
        }
        while let Some(next) = self.next_pending() {
            if let Err(error) = self.compile_one(&next) {
                self.pending = pending;
                self.finished = finished;
                return Err(error);
            }
        }
        Ok(self)
    }

    pub fn parse(&self, name: &str) -> Result<ParseResult, DefinitionError> {
        let def = self.registry.get(name).ok_or_else(|| DefinitionError::UnknownType(name.to_string()))?;
        Ok(parse_root(name, def))
    }

    /// Compiled fragments keyed by safe name.
    pub fn to_schemas(&self) -> IndexMap<String, Value> {
        let mut out: IndexMap<String, Value> =
            self.finished.iter().map(|(name, schema)| (safe_name(name), schema.clone())).collect();
        out.sort_keys();
        out
    }

    pub fn is_finished(&self, name: &str) -> bool {
        self.finished.contains_key(name)
    }

    fn next_pending(&mut self) -> Option<String> {
        while let Some(name) = self.pending.pop() {
            if !self.finished.contains_key(&name) {
                return Some(name);
            }
        }
        None
    }

    fn compile_one(&mut self, name: &str) -> Result<(), DefinitionError> {
        let ParseResult { tree, found } = self.parse(name)?;
        for next in found {
            if !self.finished.contains_key(&next) {
                tracing::trace!(from = %name, found = %next, "queued referenced type");
                self.pending.insert(next);
            }
        }
        let schema = render(rename_refs(normalize(tree)));
        tracing::debug!(r#type = %name, "compiled type");
        self.finished.insert(name.to_string(), schema);
        Ok(())
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Attribute, Literal, Scalar};
    use crate::parser::{KeyDef, TypeDef};
    use pretty_assertions::assert_eq;

    fn s(scalar: Scalar) -> Node {
        Node::scalar(scalar)
    }

    #[test]
    fn sum_flattening_is_associative() {
        let (a, b, c) = (s(Scalar::String), s(Scalar::Integer), Node::reference("Api::Tag"));
        let left = normalize(Node::sum(Node::sum(a.clone(), b.clone()), c.clone()));
        let right = normalize(Node::sum(a.clone(), Node::sum(b.clone(), c.clone())));
        assert_eq!(left, right);
        assert_eq!(left, Node::OneOf(vec![a, b, c]));
    }

    #[test]
    fn duplicates_are_removed_in_first_seen_order() {
        let (a, b) = (s(Scalar::String), s(Scalar::Integer));
        let tree = Node::sum(Node::sum(b.clone(), a.clone()), Node::sum(b.clone(), a.clone()));
        assert_eq!(normalize(tree), Node::OneOf(vec![b, a]));
        assert_eq!(normalize(Node::sum(s(Scalar::Null), s(Scalar::Null))), s(Scalar::Null));
    }

    #[test]
    fn normalization_is_idempotent() {
        let tree = Node::Object(vec![Attribute::new(
            "x",
            true,
            Node::list(Node::sum(s(Scalar::Null), Node::sum(s(Scalar::String), s(Scalar::Null)))),
        )]);
        let once = normalize(tree);
        assert_eq!(normalize(once.clone()), once);
    }

    #[test]
    fn null_member_becomes_nullable() {
        let out = render(normalize(Node::sum(s(Scalar::Null), s(Scalar::String))));
        assert_eq!(out, json!({ "type": "string", "nullable": true }));

        let wide = render(normalize(Node::sum(s(Scalar::Null), Node::sum(s(Scalar::String), s(Scalar::Integer)))));
        assert_eq!(
            wide,
            json!({ "oneOf": [{ "type": "string" }, { "type": "integer" }], "nullable": true })
        );
    }

    #[test]
    fn nullable_refs_wrap_in_all_of() {
        let out = render(normalize(Node::sum(Node::reference("Api_Tag"), s(Scalar::Null))));
        assert_eq!(
            out,
            json!({ "allOf": [{ "$ref": "#/components/schemas/Api_Tag" }], "nullable": true })
        );
    }

    #[test]
    fn required_lists_exactly_the_required_attributes() {
        let tree = Node::Object(vec![
            Attribute::new("a", true, s(Scalar::String)),
            Attribute::new("b", false, s(Scalar::Integer)),
            Attribute::new("c", true, Node::Enum(vec![Literal::String("x".into())])),
        ]);
        let out = render(tree);
        assert_eq!(out["required"], json!(["a", "c"]));
        assert_eq!(out["properties"]["c"], json!({ "type": "string", "enum": ["x"] }));
    }

    fn registry() -> TypeRegistry {
        TypeRegistry::new()
            .define(
                "Api::Person",
                TypeDef::Struct {
                    keys: vec![
                        KeyDef::new("name", true, TypeDef::scalar(Scalar::String)),
                        KeyDef::new("employer", false, TypeDef::named("Api::Company")),
                    ],
                },
            )
            .define(
                "Api::Company",
                TypeDef::Struct {
                    keys: vec![
                        KeyDef::new("title", true, TypeDef::scalar(Scalar::String)),
                        KeyDef::new("staff", true, TypeDef::array(TypeDef::named("Api::Person"))),
                    ],
                },
            )
    }

    #[test]
    fn reference_discovery() {
        let registry = registry();
        let compiler = Compiler::new(&registry);
        let parsed = compiler.parse("Api::Person").unwrap();
        assert_eq!(parsed.found.iter().collect::<Vec<_>>(), vec!["Api::Company"]);
    }

    #[test]
    fn cyclic_graph_reaches_a_fixpoint() {
        let registry = registry();
        let mut compiler = Compiler::new(&registry);
        compiler.add_type("Api::Person").unwrap();
        let schemas = compiler.to_schemas();
        assert_eq!(schemas.keys().collect::<Vec<_>>(), vec!["Api_Company", "Api_Person"]);
        assert_eq!(
            schemas["Api_Person"]["properties"]["employer"],
            json!({ "$ref": "#/components/schemas/Api_Company" })
        );
        assert_eq!(
            schemas["Api_Company"]["properties"]["staff"]["items"],
            json!({ "$ref": "#/components/schemas/Api_Person" })
        );
        // adding again changes nothing
        compiler.add_type("Api::Company").unwrap();
        assert_eq!(compiler.to_schemas().len(), 2);
    }

    #[test]
    fn unknown_types_are_definition_errors() {
        let registry = TypeRegistry::new().define("Api::Orphan", TypeDef::named("Api::Missing"));
        let mut compiler = Compiler::new(&registry);
        let error = compiler.add_type("Api::Orphan").unwrap_err();
        assert!(matches!(error, DefinitionError::UnknownType(name) if name == "Api::Missing"));
    }

    #[test]
    fn failed_additions_leave_no_partial_schemas() {
        let registry = TypeRegistry::new()
            .define("A", TypeDef::Struct { keys: vec![KeyDef::new("b", true, TypeDef::named("B"))] })
            .define("C", TypeDef::scalar(Scalar::String));
        let mut compiler = Compiler::new(&registry);
        compiler.add_type("C").unwrap();
        assert!(compiler.add_type("A").is_err());
        assert!(!compiler.is_finished("A"));
        assert_eq!(compiler.to_schemas().keys().collect::<Vec<_>>(), vec!["C"]);
        // the compiler is still usable afterwards
        assert!(compiler.add_type("C").is_ok());
    }
}
