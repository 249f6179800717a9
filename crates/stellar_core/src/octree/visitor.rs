//! Visitor protocol for octree traversal.

use super::node::{OctreeLeaf, OctreeNode};

/// Pre-order octree visitor.
///
/// `enter_node` decides whether the subtree is worth visiting. When it
/// returns false neither the node's leaves nor its descendants are seen.
pub trait OctreeVisitor {
  fn enter_node(&mut self, node: &OctreeNode) -> bool;

  fn traverse_node(&mut self, node: &OctreeNode, leaves: &[OctreeLeaf]);
}

/// Counters gathered during a traversal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraversalStats {
  /// Nodes whose leaves were examined.
  pub nodes_visited: usize,
  /// Nodes rejected by `enter_node`.
  pub nodes_pruned: usize,
  /// Leaves handed to `traverse_node`.
  pub leaves_tested: usize,
}

impl TraversalStats {
  pub fn merge(&mut self, other: &TraversalStats) {
    self.nodes_visited += other.nodes_visited;
    self.nodes_pruned += other.nodes_pruned;
    self.leaves_tested += other.leaves_tested;
  }
}
