//! OctreeNode / OctreeLeaf - storage cells of the luminosity octree.
//!
//! Nodes live in an arena owned by [`LuminosityOctree`](super::LuminosityOctree)
//! and refer to each other by [`NodeIndex`].
//!
//! Octant bits: X (bit 0), Y (bit 1), Z (bit 2); a set bit is the positive
//! half along that axis.

use glam::DVec3;

use super::bounds::DSphere;
use super::config::OctreeConfig;
use crate::anchor::{AnchorId, AnchorKind};

/// Index of a node in the octree arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
  pub const ROOT: NodeIndex = NodeIndex(0);

  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

/// An anchor as seen by the octree: position, brightness and extent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OctreeLeaf {
  pub anchor: AnchorId,
  /// Absolute world position (km).
  pub position: DVec3,
  /// Intrinsic luminosity (W).
  pub luminosity: f64,
  /// Bounding radius (km).
  pub radius: f64,
  pub kind: AnchorKind,
}

impl OctreeLeaf {
  #[inline]
  pub fn sphere(&self) -> DSphere {
    DSphere::new(self.position, self.radius.max(0.0))
  }
}

/// Octree node.
#[derive(Clone, Debug)]
pub struct OctreeNode {
  /// Depth below the root (root = 0).
  pub level: u32,
  pub center: DVec3,
  /// Cube edge length (km).
  pub width: f64,
  /// width * sqrt(3) / 2
  pub radius: f64,
  /// Leaves at least this luminous stay at this node.
  pub threshold: f64,
  pub leaves: Vec<OctreeLeaf>,
  pub children: [Option<NodeIndex>; 8],
  /// Set once the node has split; stays set even if children empty out.
  pub has_children: bool,
  /// Upper bound on the luminosity of any leaf in this subtree.
  pub max_luminosity: f64,
  /// Union of the kinds stored in this subtree.
  pub content: AnchorKind,
  pub parent: Option<NodeIndex>,
}

impl OctreeNode {
  pub fn new(level: u32, center: DVec3, width: f64, threshold: f64, parent: Option<NodeIndex>) -> Self {
    Self {
      level,
      center,
      width,
      radius: OctreeConfig::get_radius(width),
      threshold,
      leaves: Vec::new(),
      children: [None; 8],
      has_children: false,
      max_luminosity: 0.0,
      content: AnchorKind::EMPTY,
      parent,
    }
  }

  #[inline]
  pub fn sphere(&self) -> DSphere {
    DSphere::new(self.center, self.radius)
  }

  /// Octant of `point` relative to this node's centre.
  #[inline]
  pub fn octant_of(&self, point: DVec3) -> u8 {
    let mut octant = 0u8;
    if point.x >= self.center.x {
      octant |= 1;
    }
    if point.y >= self.center.y {
      octant |= 2;
    }
    if point.z >= self.center.z {
      octant |= 4;
    }
    octant
  }

  /// Centre of the child cube in `octant` (parent centre +/- width/4).
  #[inline]
  pub fn child_center(&self, octant: u8) -> DVec3 {
    let q = self.width * 0.25;
    let sign = |bit: u8| if octant & bit != 0 { q } else { -q };
    self.center + DVec3::new(sign(1), sign(2), sign(4))
  }

  /// True when `point` lies inside this node's cube (boundaries inclusive).
  #[inline]
  pub fn cube_contains(&self, point: DVec3) -> bool {
    let half = self.width * 0.5;
    (point - self.center).abs().max_element() <= half
  }

  /// Whether `leaf` must be stored here rather than pushed to a child.
  ///
  /// A leaf stays when it is at least as bright as the threshold, when its
  /// bounding sphere contains the node centre, or when it lies outside the
  /// cube (only possible at the root).
  #[inline]
  pub fn keeps(&self, leaf: &OctreeLeaf) -> bool {
    leaf.luminosity >= self.threshold
      || leaf.sphere().contains_point(self.center)
      || !self.cube_contains(leaf.position)
  }

  /// Highest luminosity among this node's own leaves.
  pub fn own_max_luminosity(&self) -> f64 {
    self.leaves.iter().map(|l| l.luminosity).fold(0.0, f64::max)
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
