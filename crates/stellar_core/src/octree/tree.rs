//! LuminosityOctree - spatial index partitioned by intrinsic luminosity.
//!
//! Bright leaves sit near the root, faint leaves sink into descendants, so a
//! traversal can prune every subtree whose brightest possible leaf would
//! still be too faint from the observer's position.
//!
//! ```text
//!            root  (threshold T)
//!           /  |  \
//!       child ... child    (threshold T * 0.25, width / 2)
//!         |
//!       grandchild         (threshold T * 0.0625, width / 4)
//! ```
//!
//! Nodes live in a flat arena; a locator maps every anchor to the single
//! node that stores it. Traversal uses an explicit stack.

use std::collections::HashMap;

use glam::DVec3;
use rayon::prelude::*;

use super::config::OctreeConfig;
use super::node::{NodeIndex, OctreeLeaf, OctreeNode};
use super::visitor::{OctreeVisitor, TraversalStats};
use crate::anchor::{AnchorId, AnchorKind};

/// Luminosity octree over anchor leaves.
#[derive(Clone, Debug)]
pub struct LuminosityOctree {
  config: OctreeConfig,
  nodes: Vec<OctreeNode>,
  locator: HashMap<AnchorId, NodeIndex>,
}

impl LuminosityOctree {
  /// Empty octree: a single root centred on the world origin.
  pub fn new(config: OctreeConfig) -> Self {
    let root = OctreeNode::new(
      0,
      DVec3::ZERO,
      config.get_width(0),
      config.get_threshold(0),
      None,
    );
    Self {
      config,
      nodes: vec![root],
      locator: HashMap::new(),
    }
  }

  /// Build an octree from a batch of leaves.
  ///
  /// Leaves are inserted brightest first so they settle without being
  /// pushed down by later splits.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "octree::build"))]
  pub fn build(config: OctreeConfig, leaves: impl IntoIterator<Item = OctreeLeaf>) -> Self {
    let mut leaves: Vec<OctreeLeaf> = leaves.into_iter().collect();
    leaves.par_sort_unstable_by(|a, b| b.luminosity.total_cmp(&a.luminosity));

    let mut tree = Self::new(config);
    for leaf in leaves {
      tree.add(leaf);
    }
    tracing::debug!(
      leaves = tree.len(),
      nodes = tree.node_count(),
      "built luminosity octree"
    );
    tree
  }

  #[inline]
  pub fn config(&self) -> &OctreeConfig {
    &self.config
  }

  #[inline]
  pub fn root(&self) -> &OctreeNode {
    &self.nodes[NodeIndex::ROOT.index()]
  }

  #[inline]
  pub fn node(&self, index: NodeIndex) -> Option<&OctreeNode> {
    self.nodes.get(index.index())
  }

  /// Number of leaves stored.
  #[inline]
  pub fn len(&self) -> usize {
    self.locator.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.locator.is_empty()
  }

  #[inline]
  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  /// Node currently storing `anchor`.
  #[inline]
  pub fn node_of(&self, anchor: AnchorId) -> Option<NodeIndex> {
    self.locator.get(&anchor).copied()
  }

  #[inline]
  pub fn contains(&self, anchor: AnchorId) -> bool {
    self.locator.contains_key(&anchor)
  }

  /// Leaf stored for `anchor`.
  pub fn leaf(&self, anchor: AnchorId) -> Option<&OctreeLeaf> {
    let node = self.node(self.node_of(anchor)?)?;
    node.leaves.iter().find(|l| l.anchor == anchor)
  }

  /// All nodes in arena order.
  pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &OctreeNode)> {
    self
      .nodes
      .iter()
      .enumerate()
      .map(|(i, n)| (NodeIndex(i as u32), n))
  }

  /// Drop every leaf and node except an empty root.
  pub fn clear(&mut self) {
    *self = Self::new(self.config.clone());
  }

  /// Insert a leaf. An anchor already present is relocated.
  pub fn add(&mut self, leaf: OctreeLeaf) {
    if self.locator.contains_key(&leaf.anchor) {
      self.remove(leaf.anchor);
    }
    self.insert_from(NodeIndex::ROOT, leaf);
  }

  /// Remove the leaf for `anchor`, tightening `max_luminosity` and
  /// `content` on the path to the root. Empty nodes are kept.
  pub fn remove(&mut self, anchor: AnchorId) -> Option<OctreeLeaf> {
    let index = self.locator.remove(&anchor)?;
    let node = &mut self.nodes[index.index()];
    let pos = node.leaves.iter().position(|l| l.anchor == anchor)?;
    let leaf = node.leaves.swap_remove(pos);
    self.refresh_upwards(index);
    Some(leaf)
  }

  /// Pre-order traversal with subtree skipping.
  pub fn traverse<V: OctreeVisitor>(&self, visitor: &mut V) -> TraversalStats {
    let mut stats = TraversalStats::default();
    let mut stack = vec![NodeIndex::ROOT];

    while let Some(index) = stack.pop() {
      let node = &self.nodes[index.index()];
      if !visitor.enter_node(node) {
        stats.nodes_pruned += 1;
        continue;
      }
      stats.nodes_visited += 1;
      stats.leaves_tested += node.leaves.len();
      visitor.traverse_node(node, &node.leaves);

      // Reverse push keeps octant 0 first out of the stack.
      for child in node.children.iter().rev().flatten() {
        stack.push(*child);
      }
    }
    stats
  }

  // =========================================================================
  // Insertion
  // =========================================================================

  fn insert_from(&mut self, start: NodeIndex, leaf: OctreeLeaf) {
    let mut index = start;
    loop {
      let node = &mut self.nodes[index.index()];
      node.max_luminosity = node.max_luminosity.max(leaf.luminosity);
      node.content |= leaf.kind;

      if !node.has_children || node.keeps(&leaf) {
        node.leaves.push(leaf);
        self.locator.insert(leaf.anchor, index);
        let (level, count, has_children) = (node.level, node.leaves.len(), node.has_children);
        if !has_children && self.config.should_split(level, count) {
          self.split(index);
        }
        return;
      }

      let octant = node.octant_of(leaf.position);
      index = self.child_or_create(index, octant);
    }
  }

  /// Mark `index` as split and push down every leaf it does not keep.
  fn split(&mut self, index: NodeIndex) {
    let node = &mut self.nodes[index.index()];
    node.has_children = true;
    let leaves = std::mem::take(&mut node.leaves);
    let (stay, push): (Vec<_>, Vec<_>) = leaves.into_iter().partition(|l| node.keeps(l));
    node.leaves = stay;

    tracing::trace!(
      level = node.level,
      kept = node.leaves.len(),
      pushed = push.len(),
      "octree node split"
    );

    for leaf in push {
      let octant = self.nodes[index.index()].octant_of(leaf.position);
      let child = self.child_or_create(index, octant);
      self.insert_from(child, leaf);
    }
  }

  fn child_or_create(&mut self, parent: NodeIndex, octant: u8) -> NodeIndex {
    if let Some(child) = self.nodes[parent.index()].children[octant as usize] {
      return child;
    }
    let node = &self.nodes[parent.index()];
    let level = node.level + 1;
    let child = OctreeNode::new(
      level,
      node.child_center(octant),
      node.width * 0.5,
      node.threshold * self.config.child_factor,
      Some(parent),
    );
    let child_index = NodeIndex(self.nodes.len() as u32);
    self.nodes.push(child);
    self.nodes[parent.index()].children[octant as usize] = Some(child_index);
    child_index
  }

  /// Recompute `max_luminosity` and `content` from `index` up to the root.
  fn refresh_upwards(&mut self, index: NodeIndex) {
    let mut current = Some(index);
    while let Some(index) = current {
      let node = &self.nodes[index.index()];
      let mut max_luminosity = node.own_max_luminosity();
      let mut content = node
        .leaves
        .iter()
        .fold(AnchorKind::EMPTY, |acc, l| acc | l.kind);
      for child in node.children.iter().flatten() {
        let child = &self.nodes[child.index()];
        max_luminosity = max_luminosity.max(child.max_luminosity);
        content |= child.content;
      }
      let node = &mut self.nodes[index.index()];
      node.max_luminosity = max_luminosity;
      node.content = content;
      current = node.parent;
    }
  }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tree_test;
