//! Node algebra.
//!
//! Immutable tree describing one type's shape before it is rendered. Nodes
//! compare, hash and order structurally so union members can be
//! de-duplicated and memo keys are stable.
//!
//! - [`Node::fold`] is the catamorphism: children are folded first, the
//!   algebra sees one [`Layer`] with already-folded children.
//! - [`Node::cata`] is the Node → Node special case used by rewrite passes.
//! - [`Node::map`] rewrites a primitive payload only; it never recurses.
use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Meta = BTreeMap<String, String>;

// ————————————————————————————————————————————————————————————————————————————
// LEAVES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scalar {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Date,
    DateTime,
    /// No constraint at all; renders as `{}`.
    Any,
}

impl Scalar {
    /// OpenAPI `type` keyword, if any.
    pub fn type_name(self) -> Option<&'static str> {
        match self {
            Scalar::Null => Some("null"),
            Scalar::Boolean => Some("boolean"),
            Scalar::Integer => Some("integer"),
            Scalar::Number => Some("number"),
            Scalar::String | Scalar::Date | Scalar::DateTime => Some("string"),
            Scalar::Any => None,
        }
    }

    pub fn format(self) -> Option<&'static str> {
        match self {
            Scalar::Date => Some("date"),
            Scalar::DateTime => Some("date-time"),
            _ => None,
        }
    }
}

/// Payload of a [`Node::Primitive`]: a scalar tag or a named type placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Leaf {
    Scalar(Scalar),
    Ref(String),
}

/// Enum member. Floats go through `OrderedFloat` so nodes stay `Eq + Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Integer(i64),
    Number(OrderedFloat<f64>),
    String(String),
}

impl Literal {
    pub fn to_json(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::from(*b),
            Literal::Integer(i) => Value::from(*i),
            Literal::Number(n) => Value::from(n.0),
            Literal::String(s) => Value::from(s.clone()),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TREE
// ————————————————————————————————————————————————————————————————————————————

/// One object member. Generic over the value slot so folds can carry
/// already-folded children through [`Layer::Object`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Attribute<A = Node> {
    pub key: String,
    pub required: bool,
    pub value: A,
    pub meta: Meta,
}

impl<A> Attribute<A> {
    pub fn new(key: impl Into<String>, required: bool, value: A) -> Self {
        Self { key: key.into(), required, value, meta: Meta::new() }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn map_value<B>(self, f: impl FnOnce(A) -> B) -> Attribute<B> {
        Attribute { key: self.key, required: self.required, value: f(self.value), meta: self.meta }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Node {
    Primitive(Leaf, Meta),
    Object(Vec<Attribute>),
    /// Binary union, only present before normalization.
    Sum(Box<Node>, Box<Node>),
    /// Normalized n-ary union.
    OneOf(Vec<Node>),
    List(Box<Node>),
    Enum(Vec<Literal>),
}

/// One layer of a [`Node`] whose children have been replaced by `A`.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer<A> {
    Primitive(Leaf, Meta),
    Object(Vec<Attribute<A>>),
    Sum(A, A),
    OneOf(Vec<A>),
    List(A),
    Enum(Vec<Literal>),
}

impl From<Layer<Node>> for Node {
    fn from(layer: Layer<Node>) -> Self {
        match layer {
            Layer::Primitive(leaf, meta) => Node::Primitive(leaf, meta),
            Layer::Object(attributes) => Node::Object(attributes),
            Layer::Sum(lhs, rhs) => Node::Sum(Box::new(lhs), Box::new(rhs)),
            Layer::OneOf(members) => Node::OneOf(members),
            Layer::List(item) => Node::List(Box::new(item)),
            Layer::Enum(values) => Node::Enum(values),
        }
    }
}

impl Node {
    pub fn scalar(scalar: Scalar) -> Self {
        Node::Primitive(Leaf::Scalar(scalar), Meta::new())
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Node::Primitive(Leaf::Ref(name.into()), Meta::new())
    }

    pub fn sum(lhs: Node, rhs: Node) -> Self {
        Node::Sum(Box::new(lhs), Box::new(rhs))
    }

    pub fn list(item: Node) -> Self {
        Node::List(Box::new(item))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Primitive(Leaf::Scalar(Scalar::Null), _))
    }

    /// Bottom-up fold: every child is folded before its parent's layer.
    pub fn fold<A, F>(self, alg: &mut F) -> A
    where
        F: FnMut(Layer<A>) -> A,
    {
        let layer = match self {
            Node::Primitive(leaf, meta) => Layer::Primitive(leaf, meta),
            Node::Object(attributes) => Layer::Object(
                attributes
                    .into_iter()
                    .map(|attribute| attribute.map_value(|value| value.fold(&mut *alg)))
                    .collect(),
            ),
            Node::Sum(lhs, rhs) => {
                let lhs = lhs.fold(&mut *alg);
                let rhs = rhs.fold(&mut *alg);
                Layer::Sum(lhs, rhs)
            }
            Node::OneOf(members) => {
                Layer::OneOf(members.into_iter().map(|member| member.fold(&mut *alg)).collect())
            }
            Node::List(item) => Layer::List(item.fold(&mut *alg)),
            Node::Enum(values) => Layer::Enum(values),
        };
        alg(layer)
    }

    /// Post-order rewrite: `f` sees each node after its children were rewritten.
    pub fn cata<F>(self, f: &mut F) -> Node
    where
        F: FnMut(Node) -> Node,
    {
        self.fold(&mut |layer: Layer<Node>| f(Node::from(layer)))
    }

    /// Shallow: rewrites the payload of a primitive, leaves everything else as is.
    pub fn map(self, f: impl FnOnce(Leaf) -> Leaf) -> Node {
        match self {
            Node::Primitive(leaf, meta) => Node::Primitive(f(leaf), meta),
            other => other,
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn person() -> Node {
        Node::Object(vec![
            Attribute::new("name", true, Node::scalar(Scalar::String)),
            Attribute::new("pets", false, Node::list(Node::reference("Api::Pet"))),
        ])
    }

    fn label(node: &Node) -> String {
        match node {
            Node::Primitive(Leaf::Scalar(s), _) => format!("{s:?}"),
            Node::Primitive(Leaf::Ref(r), _) => r.clone(),
            Node::Object(_) => "object".into(),
            Node::Sum(..) => "sum".into(),
            Node::OneOf(_) => "one_of".into(),
            Node::List(_) => "list".into(),
            Node::Enum(_) => "enum".into(),
        }
    }

    #[test]
    fn cata_visits_children_before_parent() {
        let mut seen = Vec::new();
        let out = person().cata(&mut |node| {
            seen.push(label(&node));
            node
        });
        assert_eq!(seen, vec!["String", "Api::Pet", "list", "object"]);
        assert_eq!(out, person());
    }

    #[test]
    fn fold_counts_leaves() {
        let tree = Node::sum(person(), Node::Enum(vec![Literal::Integer(1)]));
        let leaves = tree.fold(&mut |layer: Layer<usize>| match layer {
            Layer::Primitive(..) | Layer::Enum(_) => 1,
            Layer::Object(attributes) => attributes.iter().map(|a| a.value).sum(),
            Layer::Sum(lhs, rhs) => lhs + rhs,
            Layer::OneOf(members) => members.iter().sum(),
            Layer::List(item) => item,
        });
        assert_eq!(leaves, 3);
    }

    #[test]
    fn map_is_shallow() {
        let rename = |leaf: Leaf| match leaf {
            Leaf::Ref(name) => Leaf::Ref(name.replace("::", "_")),
            other => other,
        };
        // a list is untouched by `map` alone
        let list = Node::list(Node::reference("Api::Pet"));
        assert_eq!(list.clone().map(rename), list);
        // combined with cata it reaches every leaf
        let deep = list.cata(&mut |node| node.map(rename));
        assert_eq!(deep, Node::list(Node::reference("Api_Pet")));
    }

    #[test]
    fn equality_and_hash_are_structural() {
        let mut set = HashSet::new();
        set.insert(person());
        set.insert(person());
        set.insert(Node::Enum(vec![Literal::Number(OrderedFloat(1.5))]));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn literals_deserialize_untagged() {
        let values: Vec<Literal> = serde_json::from_value(serde_json::json!([null, true, 3, 1.5, "x"])).unwrap();
        assert_eq!(
            values,
            vec![
                Literal::Null,
                Literal::Bool(true),
                Literal::Integer(3),
                Literal::Number(OrderedFloat(1.5)),
                Literal::String("x".into()),
            ]
        );
    }
}
