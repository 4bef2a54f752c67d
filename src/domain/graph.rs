// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// In-memory triple store with subject and object indexes plus the canonical text serialization.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use thiserror::Error;

use super::node::{Node, ResourceType};
use super::resource::Property;
use super::triple::{DiffMarker, Literal, Object, Predicate, Triple};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("unknown resource type '{0}'")]
    UnknownResourceType(String),
    #[error("malformed node '{0}'")]
    MalformedNode(String),
    #[error("unknown predicate '{0}'")]
    UnknownPredicate(String),
    #[error("malformed literal '{0}'")]
    MalformedLiteral(String),
    #[error("malformed triple '{0}'")]
    MalformedTriple(String),
    #[error("snapshot is not valid utf-8")]
    InvalidUtf8,
    #[error("node {node} declares type {declared}")]
    TypeMismatch { node: Node, declared: String },
    #[error("invalid property literal on {node}: {source}")]
    InvalidProperty {
        node: Node,
        #[source]
        source: serde_json::Error,
    },
    #[error("expect exactly one region in graph, but got {0}")]
    RegionCount(usize),
    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<GraphError>,
    },
}

/// A set of triples. `add` is the only mutator; every other operation is a pure lookup.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    triples: BTreeSet<Triple>,
    by_subject: HashMap<(Node, Predicate), BTreeSet<Object>>,
    by_object: HashMap<(Predicate, Object), BTreeSet<Node>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a triple. Returns false when the exact triple was already present.
    ///
    /// A property triple replaces any older property with the same key on the same subject.
    pub fn add(&mut self, triple: Triple) -> bool {
        if self.triples.contains(&triple) {
            return false;
        }
        if triple.predicate() == Predicate::Property {
            self.evict_property(&triple);
        }

        self.by_subject
            .entry((triple.subject().clone(), triple.predicate()))
            .or_default()
            .insert(triple.object().clone());
        self.by_object
            .entry((triple.predicate(), triple.object().clone()))
            .or_default()
            .insert(triple.subject().clone());
        self.triples.insert(triple)
    }

    pub fn add_graph(&mut self, other: &Graph) {
        self.extend(other.triples.iter().cloned());
    }

    fn evict_property(&mut self, incoming: &Triple) {
        let Some(key) = property_key(incoming.object()) else {
            return;
        };
        let stale: Vec<Triple> = self
            .triples_for_subject_predicate(incoming.subject(), Predicate::Property)
            .into_iter()
            .filter(|t| property_key(t.object()).as_deref() == Some(key.as_str()))
            .collect();
        for triple in stale {
            self.remove(&triple);
        }
    }

    fn remove(&mut self, triple: &Triple) {
        if !self.triples.remove(triple) {
            return;
        }

        let subject_key = (triple.subject().clone(), triple.predicate());
        if let Some(objects) = self.by_subject.get_mut(&subject_key) {
            objects.remove(triple.object());
            if objects.is_empty() {
                self.by_subject.remove(&subject_key);
            }
        }

        let object_key = (triple.predicate(), triple.object().clone());
        if let Some(subjects) = self.by_object.get_mut(&object_key) {
            subjects.remove(triple.subject());
            if subjects.is_empty() {
                self.by_object.remove(&object_key);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    pub fn contains(&self, triple: &Triple) -> bool {
        self.triples.contains(triple)
    }

    /// True when the node carries its `has_type` triple.
    pub fn has_node(&self, node: &Node) -> bool {
        self.by_subject
            .contains_key(&(node.clone(), Predicate::HasType))
    }

    pub fn triples(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    pub fn triples_for_subject_predicate(&self, subject: &Node, predicate: Predicate) -> Vec<Triple> {
        self.by_subject
            .get(&(subject.clone(), predicate))
            .map(|objects| {
                objects
                    .iter()
                    .map(|object| Triple::new(subject.clone(), predicate, object.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn triples_for_predicate_object(&self, predicate: Predicate, object: &Object) -> Vec<Triple> {
        self.by_object
            .get(&(predicate, object.clone()))
            .map(|subjects| {
                subjects
                    .iter()
                    .map(|subject| Triple::new(subject.clone(), predicate, object.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Unknown predicate names yield no triples.
    pub fn triples_for_predicate_name(&self, name: &str) -> Vec<Triple> {
        let Some(predicate) = Predicate::from_name(name) else {
            return Vec::new();
        };
        self.triples
            .iter()
            .filter(|t| t.predicate() == predicate)
            .cloned()
            .collect()
    }

    pub fn nodes_for_type(&self, kind: ResourceType) -> Vec<Node> {
        let type_literal = Object::Literal(Literal::type_of(kind));
        self.by_object
            .get(&(Predicate::HasType, type_literal))
            .map(|nodes| nodes.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn count_triples_for_subject_predicate(&self, subject: &Node, predicate: Predicate) -> usize {
        self.by_subject
            .get(&(subject.clone(), predicate))
            .map_or(0, BTreeSet::len)
    }

    pub fn count_triples_for_subject_predicate_with_object_type(
        &self,
        subject: &Node,
        predicate: Predicate,
        kind: ResourceType,
    ) -> usize {
        self.by_subject
            .get(&(subject.clone(), predicate))
            .map_or(0, |objects| {
                objects
                    .iter()
                    .filter_map(Object::as_node)
                    .filter(|node| node.kind() == kind)
                    .count()
            })
    }

    pub fn children_of(&self, parent: &Node) -> Vec<Node> {
        self.triples_for_subject_predicate(parent, Predicate::ParentOf)
            .iter()
            .filter_map(|t| t.object().as_node().cloned())
            .collect()
    }

    pub fn parents_of(&self, child: &Node) -> Vec<Node> {
        self.triples_for_predicate_object(Predicate::ParentOf, &Object::Node(child.clone()))
            .into_iter()
            .map(|t| t.subject().clone())
            .collect()
    }

    /// The single region node rooting the containment hierarchy.
    pub fn region_root(&self) -> Result<Node, GraphError> {
        let mut regions = self.nodes_for_type(ResourceType::Region);
        match regions.len() {
            1 => Ok(regions.remove(0)),
            count => Err(GraphError::RegionCount(count)),
        }
    }

    pub fn intersect(&self, other: &Graph) -> Graph {
        self.triples
            .intersection(&other.triples)
            .cloned()
            .collect()
    }

    pub fn subtract(&self, other: &Graph) -> Graph {
        self.triples.difference(&other.triples).cloned().collect()
    }

    /// Canonical form: one triple per line, lines sorted, no trailing newline.
    pub fn marshal(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self, GraphError> {
        let text = std::str::from_utf8(data).map_err(|_| GraphError::InvalidUtf8)?;

        let mut graph = Graph::new();
        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let triple = parse_line(line).map_err(|source| GraphError::AtLine {
                line: index + 1,
                source: Box::new(source),
            })?;
            graph.add(triple);
        }
        Ok(graph)
    }
}

fn parse_line(line: &str) -> Result<Triple, GraphError> {
    let triple: Triple = line.parse()?;
    let subject = triple.subject();

    match (triple.predicate(), triple.object()) {
        (Predicate::ParentOf, Object::Node(_)) => {}
        (Predicate::HasType, Object::Literal(literal)) => {
            if *literal != Literal::type_of(subject.kind()) {
                return Err(GraphError::TypeMismatch {
                    node: subject.clone(),
                    declared: literal.as_str().to_string(),
                });
            }
        }
        (Predicate::Property, Object::Literal(literal)) => {
            Property::from_literal(literal).map_err(|source| GraphError::InvalidProperty {
                node: subject.clone(),
                source,
            })?;
        }
        (Predicate::Diff, Object::Literal(literal)) => {
            let known = [DiffMarker::Extra, DiffMarker::Missing]
                .iter()
                .any(|marker| marker.as_str() == literal.as_str());
            if !known {
                return Err(GraphError::MalformedLiteral(literal.as_str().to_string()));
            }
        }
        _ => return Err(GraphError::MalformedTriple(line.to_string())),
    }

    Ok(triple)
}

fn property_key(object: &Object) -> Option<String> {
    object
        .as_literal()
        .and_then(|literal| Property::from_literal(literal).ok())
        .map(|property| property.key)
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines: Vec<String> = self.triples.iter().map(Triple::to_string).collect();
        lines.sort();
        f.write_str(&lines.join("\n"))
    }
}

impl PartialEq for Graph {
    fn eq(&self, other: &Self) -> bool {
        self.triples == other.triples
    }
}

impl Eq for Graph {}

impl Extend<Triple> for Graph {
    fn extend<I: IntoIterator<Item = Triple>>(&mut self, iter: I) {
        for triple in iter {
            self.add(triple);
        }
    }
}

impl FromIterator<Triple> for Graph {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let mut graph = Graph::new();
        graph.extend(iter);
        graph
    }
}
