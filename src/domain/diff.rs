// Skygraph is open-source under the Apache License 2.0; see LICENSE for usage and contributions.
// Breadth-first comparison of two graphs along the parent_of hierarchy.

use std::collections::{BTreeSet, HashSet, VecDeque};

use super::graph::Graph;
use super::node::{Node, ResourceType};
use super::triple::{DiffMarker, Predicate, Triple};

/// Edge classification produced by one walk.
#[derive(Default)]
struct Walk {
    extras: Vec<Triple>,
    missings: Vec<Triple>,
    commons: Vec<Triple>,
}

/// Walks both hierarchies from `root`, only descending through edges present on both sides.
fn walk(root: &Node, local: &Graph, remote: &Graph) -> Walk {
    let mut walk = Walk::default();
    if local.is_empty() && remote.is_empty() {
        return walk;
    }

    let mut queue = VecDeque::from([root.clone()]);
    let mut visited = HashSet::new();

    while let Some(node) = queue.pop_front() {
        if !visited.insert(node.clone()) {
            continue;
        }

        let locals: BTreeSet<Triple> = local
            .triples_for_subject_predicate(&node, Predicate::ParentOf)
            .into_iter()
            .collect();
        let remotes: BTreeSet<Triple> = remote
            .triples_for_subject_predicate(&node, Predicate::ParentOf)
            .into_iter()
            .collect();

        walk.extras.extend(locals.difference(&remotes).cloned());
        walk.missings.extend(remotes.difference(&locals).cloned());
        for common in locals.intersection(&remotes) {
            if let Some(child) = common.object().as_node() {
                queue.push_back(child.clone());
            }
            walk.commons.push(common.clone());
        }
    }

    walk
}

/// Annotated result of [`diff`].
#[derive(Clone, Debug, Default)]
pub struct Diff {
    graph: Graph,
    extras: Vec<Node>,
    missings: Vec<Node>,
}

impl Diff {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Nodes only present locally, in hierarchy order.
    pub fn extras(&self) -> &[Node] {
        &self.extras
    }

    /// Nodes only present remotely, in hierarchy order.
    pub fn missings(&self) -> &[Node] {
        &self.missings
    }

    pub fn has_diffs(&self) -> bool {
        !self.extras.is_empty() || !self.missings.is_empty()
    }
}

/// Compares `local` against `remote` below `root`.
///
/// The result holds every walked common edge, every divergent edge and a `diff` literal on the
/// object of each divergent edge. Divergent subtrees are not descended into.
pub fn diff(root: &Node, local: &Graph, remote: &Graph) -> Diff {
    let walk = walk(root, local, remote);
    let mut result = Diff::default();

    for edge in &walk.commons {
        copy_edge(&mut result.graph, edge, local);
    }
    for edge in &walk.extras {
        copy_edge(&mut result.graph, edge, local);
        if let Some(child) = edge.object().as_node() {
            result.graph.add(Triple::diff(child, DiffMarker::Extra));
            result.extras.push(child.clone());
        }
    }
    for edge in &walk.missings {
        copy_edge(&mut result.graph, edge, remote);
        if let Some(child) = edge.object().as_node() {
            result.graph.add(Triple::diff(child, DiffMarker::Missing));
            result.missings.push(child.clone());
        }
    }

    result
}

fn copy_edge(target: &mut Graph, edge: &Triple, source: &Graph) {
    target.add(edge.clone());

    let endpoints = std::iter::once(edge.subject()).chain(edge.object().as_node());
    for node in endpoints {
        let type_triple = Triple::has_type(node);
        if source.contains(&type_triple) {
            target.add(type_triple);
        }
    }
}

/// Edge sets classified by [`compare`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Comparison {
    pub extras: Graph,
    pub missings: Graph,
    pub commons: Graph,
}

impl Comparison {
    pub fn has_diffs(&self) -> bool {
        !self.extras.is_empty() || !self.missings.is_empty()
    }
}

/// Classifies `parent_of` edges below the region `root_id`.
pub fn compare(root_id: &str, local: &Graph, remote: &Graph) -> Comparison {
    let root = Node::new(ResourceType::Region, root_id);
    let walk = walk(&root, local, remote);

    Comparison {
        extras: walk.extras.into_iter().collect(),
        missings: walk.missings.into_iter().collect(),
        commons: walk.commons.into_iter().collect(),
    }
}
