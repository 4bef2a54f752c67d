// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Graph primitives: node identity, triples, the triple store, resource projection and diffing.

pub mod diff;
pub mod graph;
pub mod node;
pub mod resource;
pub mod triple;

#[cfg(test)]
pub(crate) mod strategies;

pub use diff::{compare, diff, Comparison, Diff};
pub use graph::{Graph, GraphError};
pub use node::{Node, ResourceType};
pub use resource::{Properties, Property, Resource};
pub use triple::{DiffMarker, Literal, Object, Predicate, Triple};
