// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Proptest generators for nodes, triples and graphs.

use proptest::prelude::*;
use serde_json::Value;

use super::graph::Graph;
use super::node::{Node, ResourceType};
use super::resource::Property;
use super::triple::{DiffMarker, Predicate, Triple};

pub fn resource_type() -> impl Strategy<Value = ResourceType> {
    prop::sample::select(ResourceType::ALL.to_vec())
}

/// Provider ids are opaque, so they include the characters of the line format.
pub fn node_id() -> impl Strategy<Value = String> {
    "[a-c0-9<>/\\\\\t\n\r \"._-]{1,10}"
}

pub fn node() -> impl Strategy<Value = Node> {
    (resource_type(), node_id()).prop_map(|(kind, id)| Node::new(kind, id))
}

pub fn property_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        "[ -~\t\n]{0,12}".prop_map(Value::from),
        prop::collection::vec("[a-z0-9/.]{1,6}", 0..3).prop_map(Value::from),
    ]
}

pub fn triple() -> impl Strategy<Value = Triple> {
    let key = prop::sample::select(vec!["Id", "Name", "State", "CidrBlock"]);
    let marker = prop::sample::select(vec![DiffMarker::Extra, DiffMarker::Missing]);

    prop_oneof![
        node().prop_map(|n| Triple::has_type(&n)),
        (node(), node()).prop_map(|(parent, child)| Triple::parent_of(&parent, &child)),
        (node(), key, property_value()).prop_map(|(subject, key, value)| {
            let literal = Property::new(key, value)
                .to_literal()
                .expect("json values encode");
            Triple::new(subject, Predicate::Property, literal)
        }),
        (node(), marker).prop_map(|(n, marker)| Triple::diff(&n, marker)),
    ]
}

pub fn graph() -> impl Strategy<Value = Graph> {
    prop::collection::vec(triple(), 0..24).prop_map(Graph::from_iter)
}

/// Region `"r"` plus `parent_of` edges over a small pool of vpcs, so that hierarchies overlap.
pub fn hierarchy() -> impl Strategy<Value = Graph> {
    prop::collection::vec((0usize..6, 1usize..6), 0..12).prop_map(|edges| {
        let as_node = |index: usize| match index {
            0 => Node::new(ResourceType::Region, "r"),
            n => Node::new(ResourceType::Vpc, format!("v{n}")),
        };
        let mut graph = Graph::new();
        graph.add(Triple::has_type(&as_node(0)));
        for (parent, child) in edges {
            graph.add(Triple::parent_of(&as_node(parent), &as_node(child)));
        }
        graph
    })
}
