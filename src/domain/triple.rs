// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Triples, predicates and literals together with their one-line text encoding.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::graph::GraphError;
use super::node::{Node, ResourceType};

const LITERAL_SUFFIX: &str = "\"^^type:text";
const PREDICATE_SUFFIX: &str = "\"@[]";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    HasType,
    ParentOf,
    Property,
    Diff,
}

impl Predicate {
    pub const ALL: [Predicate; 4] = [Self::HasType, Self::ParentOf, Self::Property, Self::Diff];

    pub fn name(&self) -> &'static str {
        match self {
            Self::HasType => "has_type",
            Self::ParentOf => "parent_of",
            Self::Property => "property",
            Self::Diff => "diff",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"@[]", self.name())
    }
}

impl FromStr for Predicate {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix(PREDICATE_SUFFIX))
            .ok_or_else(|| GraphError::UnknownPredicate(s.to_string()))?;
        Self::from_name(name).ok_or_else(|| GraphError::UnknownPredicate(name.to_string()))
    }
}

/// Marker attached by the diff engine to a divergent node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffMarker {
    Extra,
    Missing,
}

impl DiffMarker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extra => "extra",
            Self::Missing => "missing",
        }
    }
}

/// Text literal. Structured values are carried as their JSON text, which never holds a raw tab or
/// line break.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Literal(String);

impl Literal {
    pub fn text(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn type_of(kind: ResourceType) -> Self {
        Self(format!("/{kind}"))
    }

    pub fn marker(marker: DiffMarker) -> Self {
        Self(marker.as_str().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}{}", self.0, LITERAL_SUFFIX)
    }
}

impl FromStr for Literal {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix('"')
            .and_then(|rest| rest.strip_suffix(LITERAL_SUFFIX))
            .map(Literal::text)
            .ok_or_else(|| GraphError::MalformedLiteral(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Object {
    Node(Node),
    Literal(Literal),
}

impl Object {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(node) => Some(node),
            Self::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(literal) => Some(literal),
            Self::Node(_) => None,
        }
    }
}

impl From<Node> for Object {
    fn from(node: Node) -> Self {
        Self::Node(node)
    }
}

impl From<Literal> for Object {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(node) => node.fmt(f),
            Self::Literal(literal) => literal.fmt(f),
        }
    }
}

impl FromStr for Object {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('"') {
            Ok(Self::Literal(s.parse()?))
        } else {
            Ok(Self::Node(s.parse()?))
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Triple {
    subject: Node,
    predicate: Predicate,
    object: Object,
}

impl Triple {
    pub fn new(subject: Node, predicate: Predicate, object: impl Into<Object>) -> Self {
        Self {
            subject,
            predicate,
            object: object.into(),
        }
    }

    pub fn has_type(node: &Node) -> Self {
        Self::new(node.clone(), Predicate::HasType, Literal::type_of(node.kind()))
    }

    pub fn parent_of(parent: &Node, child: &Node) -> Self {
        Self::new(parent.clone(), Predicate::ParentOf, child.clone())
    }

    pub fn diff(node: &Node, marker: DiffMarker) -> Self {
        Self::new(node.clone(), Predicate::Diff, Literal::marker(marker))
    }

    pub fn subject(&self) -> &Node {
        &self.subject
    }

    pub fn predicate(&self) -> Predicate {
        self.predicate
    }

    pub fn object(&self) -> &Object {
        &self.object
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.subject, self.predicate, self.object)
    }
}

impl FromStr for Triple {
    type Err = GraphError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut parts = line.splitn(3, '\t');
        let (Some(subject), Some(predicate), Some(object)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(GraphError::MalformedTriple(line.to_string()));
        };

        Ok(Triple::new(
            subject.parse()?,
            predicate.parse()?,
            object.parse::<Object>()?,
        ))
    }
}
