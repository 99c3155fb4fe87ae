// Copyright (c) The diem-devtools Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Component A: the test entity graph (spec.md §4.1).
//!
//! Nodes live in a flat arena (`TestGraph`) and refer to each other by
//! [`NodeId`] index rather than by pointer or `Rc`. This gives the tree the
//! invariants spec.md asks for "by construction": parent links only ever
//! point to indices that were already allocated (so a cycle would require
//! an index from the future, which can't happen), and there is exactly one
//! writer (`TestGraph::add_child`/`add_root`), matching "the tree is frozen
//! by the time the scheduler runs".

use crate::definition::TestDefinition;

/// Opaque handle to a node within a particular [`TestGraph`].
///
/// `NodeId`s from different `TestGraph`s must never be mixed; nothing
/// prevents it at the type level (this mirrors the original's raw
/// `const TestObject*`, which had the same property), but in practice only
/// `Registry` ever hands these out and it owns a single graph.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// A node in the test entity graph.
///
/// A node with children may also carry a `definition` -- it doubles as a
/// group and a runnable leaf -- but the common leaf case has `children`
/// empty and `definition` present (spec.md §3).
pub struct TestNode {
    id: String,
    name: String,
    file: &'static str,
    line: u32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    definition: Option<TestDefinition>,
}

impl TestNode {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn definition(&self) -> Option<&TestDefinition> {
        self.definition.as_ref()
    }

    pub fn is_leaf(&self) -> bool {
        self.definition.is_some()
    }
}

/// The arena backing a process-wide (or test-local) registry.
#[derive(Default)]
pub struct TestGraph {
    nodes: Vec<TestNode>,
}

impl TestGraph {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Creates a node with no parent -- a root category.
    pub fn add_root(&mut self, id: String, name: String, file: &'static str, line: u32) -> NodeId {
        let node_id = NodeId(self.nodes.len());
        self.nodes.push(TestNode {
            id,
            name,
            file,
            line,
            parent: None,
            children: Vec::new(),
            definition: None,
        });
        node_id
    }

    /// Appends a new child node to `parent`'s ordered child list and sets
    /// the child's parent back-reference. Insertion order is display order
    /// (spec.md §4.1). `AddChild` cannot attach an ancestor: `parent` must
    /// already exist in this arena, and the new node is always allocated at
    /// the end, so its index can never equal or precede `parent`'s.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        id: String,
        name: String,
        file: &'static str,
        line: u32,
    ) -> NodeId {
        let node_id = NodeId(self.nodes.len());
        self.nodes.push(TestNode {
            id,
            name,
            file,
            line,
            parent: Some(parent),
            children: Vec::new(),
            definition: None,
        });
        self.nodes[parent.0].children.push(node_id);
        node_id
    }

    /// Attaches a leaf definition to an already-allocated node.
    pub fn set_definition(&mut self, node: NodeId, definition: TestDefinition) {
        self.nodes[node.0].definition = Some(definition);
    }

    pub fn node(&self, id: NodeId) -> &TestNode {
        &self.nodes[id.0]
    }

    pub fn definition(&self, id: NodeId) -> Option<&TestDefinition> {
        self.nodes[id.0].definition.as_ref()
    }

    /// Walks parent links to the topmost node (spec.md §4.1 `Root()`).
    pub fn root_of(&self, mut id: NodeId) -> NodeId {
        while let Some(parent) = self.nodes[id.0].parent {
            id = parent;
        }
        id
    }

    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(idx, _)| NodeId(idx))
    }

    /// Depth-first traversal yielding every leaf `TestDefinition` in the
    /// subtree rooted at `id`, including `id`'s own definition if present
    /// (spec.md §4.1 `VisitAllLeafDefinitions`).
    pub fn visit_all_leaf_definitions(&self, id: NodeId, mut visitor: impl FnMut(NodeId)) {
        self.visit_all_leaf_definitions_impl(id, &mut visitor);
    }

    fn visit_all_leaf_definitions_impl(&self, id: NodeId, visitor: &mut dyn FnMut(NodeId)) {
        let node = &self.nodes[id.0];
        for &child in &node.children {
            self.visit_all_leaf_definitions_impl(child, visitor);
        }
        if node.definition.is_some() {
            visitor(id);
        }
    }

    /// Collects every leaf definition's [`NodeId`] under `id` in
    /// registration order.
    pub fn leaf_ids(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.visit_all_leaf_definitions(id, |leaf| out.push(leaf));
        out
    }

    pub fn find_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child.0].name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(graph: &mut TestGraph, parent: NodeId, name: &str) -> NodeId {
        let id = graph.add_child(parent, name.to_string(), name.to_string(), file!(), line!());
        let def = TestDefinition::new(std::sync::Arc::new(|| {}), id);
        graph.set_definition(id, def);
        id
    }

    #[test]
    fn add_child_sets_parent_and_order() {
        let mut graph = TestGraph::new();
        let root = graph.add_root("root".into(), "root".into(), file!(), line!());
        let a = leaf(&mut graph, root, "a");
        let b = leaf(&mut graph, root, "b");

        assert_eq!(graph.node(root).children(), &[a, b]);
        assert_eq!(graph.node(a).parent(), Some(root));
        assert_eq!(graph.root_of(a), root);
        assert_eq!(graph.root_of(b), root);
    }

    #[test]
    fn visit_all_leaf_definitions_includes_own_and_descendants() {
        let mut graph = TestGraph::new();
        let root = graph.add_root("root".into(), "root".into(), file!(), line!());
        let child_cat = graph.add_child(root, "root::cat".into(), "cat".into(), file!(), line!());
        let a = leaf(&mut graph, child_cat, "a");
        let b = leaf(&mut graph, root, "b");

        let leaves = graph.leaf_ids(root);
        assert_eq!(leaves.len(), 2);
        assert!(leaves.contains(&a));
        assert!(leaves.contains(&b));
    }

    #[test]
    fn node_with_children_can_also_be_a_leaf() {
        let mut graph = TestGraph::new();
        let root = graph.add_root("root".into(), "root".into(), file!(), line!());
        let def = TestDefinition::new(std::sync::Arc::new(|| {}), root);
        graph.set_definition(root, def);
        let _child = leaf(&mut graph, root, "child");

        assert!(graph.node(root).is_leaf());
        assert_eq!(graph.leaf_ids(root).len(), 2);
    }
}
