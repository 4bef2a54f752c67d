// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Resource projection: a node with its properties, rebuilt from or written into a graph.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::graph::{Graph, GraphError};
use super::node::{Node, ResourceType};
use super::triple::{Literal, Object, Predicate, Triple};

pub type Properties = BTreeMap<String, Value>;

/// Key/value pair carried by a `property` triple, encoded as `{"Key":..,"Value":..}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: Value,
}

impl Property {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn to_literal(&self) -> Result<Literal, serde_json::Error> {
        serde_json::to_string(self).map(Literal::text)
    }

    pub fn from_literal(literal: &Literal) -> Result<Self, serde_json::Error> {
        serde_json::from_str(literal.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    kind: ResourceType,
    id: String,
    properties: Properties,
}

impl Resource {
    pub fn new(kind: ResourceType, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            properties: Properties::new(),
        }
    }

    pub fn kind(&self) -> ResourceType {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn node(&self) -> Node {
        Node::new(self.kind, self.id.clone())
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn name(&self) -> Option<&str> {
        self.property("Name").and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.set(key, value);
        self
    }

    /// The `has_type` triple followed by one `property` triple per property.
    pub fn to_triples(&self) -> Result<Vec<Triple>, GraphError> {
        let node = self.node();
        let mut triples = Vec::with_capacity(self.properties.len() + 1);
        triples.push(Triple::has_type(&node));
        for (key, value) in &self.properties {
            let literal = Property::new(key.clone(), value.clone())
                .to_literal()
                .map_err(|source| GraphError::InvalidProperty {
                    node: node.clone(),
                    source,
                })?;
            triples.push(Triple::new(node.clone(), Predicate::Property, literal));
        }
        Ok(triples)
    }

    /// Rebuilds the projection of `node`, or `None` when the graph does not hold it.
    pub fn from_graph(graph: &Graph, node: &Node) -> Result<Option<Self>, GraphError> {
        if !graph.has_node(node) {
            return Ok(None);
        }

        let mut resource = Resource::new(node.kind(), node.id());
        for triple in graph.triples_for_subject_predicate(node, Predicate::Property) {
            let Some(literal) = triple.object().as_literal() else {
                continue;
            };
            let property =
                Property::from_literal(literal).map_err(|source| GraphError::InvalidProperty {
                    node: node.clone(),
                    source,
                })?;
            resource.set(property.key, property.value);
        }
        Ok(Some(resource))
    }
}

impl Graph {
    pub fn add_resource(&mut self, resource: &Resource) -> Result<(), GraphError> {
        self.extend(resource.to_triples()?);
        Ok(())
    }

    pub fn get_resource(&self, kind: ResourceType, id: &str) -> Result<Option<Resource>, GraphError> {
        Resource::from_graph(self, &Node::new(kind, id))
    }

    pub fn resources(&self, kind: ResourceType) -> Result<Vec<Resource>, GraphError> {
        self.nodes_for_type(kind)
            .iter()
            .filter_map(|node| Resource::from_graph(self, node).transpose())
            .collect()
    }

    /// Nodes of `kind` whose property `key` equals `value`.
    pub fn find_by_property(&self, kind: ResourceType, key: &str, value: &Value) -> Vec<Node> {
        let Ok(literal) = Property::new(key, value.clone()).to_literal() else {
            return Vec::new();
        };
        self.triples_for_predicate_object(Predicate::Property, &Object::Literal(literal))
            .into_iter()
            .map(|t| t.subject().clone())
            .filter(|node| node.kind() == kind)
            .collect()
    }

    /// Resolves a human-readable name to the id of the single `kind` node carrying it.
    pub fn resolve_alias(&self, kind: ResourceType, name: &str) -> Option<String> {
        let matches = self.find_by_property(kind, "Name", &Value::String(name.to_string()));
        match matches.as_slice() {
            [node] => Some(node.id().to_string()),
            _ => None,
        }
    }
}
