//! Traversers - visitors over the anchor hierarchy and its octrees.
//!
//! ```text
//! universe (octree) ──enter_node──► node ──visit_leaf──► anchor
//!                                                          │ is_system
//!                                                          ▼
//!                                        visit_system ──► children
//! ```
//!
//! A container's children are reached through its octree when it has one,
//! or by scanning the child list. A child that is itself a container is
//! expanded only if `visit_leaf` accepted it and `visit_system` agrees.
//!
//! # Module Structure
//!
//! - [`AnchorVisitor`] - the visitor protocol
//! - [`traverse_anchors`] - iterative driver with an explicit stack
//! - [`VisibleObjectsTraverser`] - candidate collection for a frame
//! - [`LightSourceTraverser`] - brightest emitter illuminating a body
//! - [`UpdateAllTraverser`] - parents-before-children update order

use glam::DVec3;

use crate::anchor::{Anchor, AnchorArena, AnchorId, AnchorKind, AnchorPayload, LightSource};
use crate::frustum::Frustum;
use crate::magnitude::{abs_mag_from_luminosity, apparent_from_absolute, apparent_from_luminosity, point_radiance};
use crate::octree::{DSphere, OctreeLeaf, OctreeNode, OctreeVisitor, TraversalStats};

/// Visitor over the anchor hierarchy.
pub trait AnchorVisitor {
  /// Whether an octree node's subtree is worth visiting.
  fn enter_node(&mut self, node: &OctreeNode) -> bool;

  /// Examine one child anchor. Returning true lets a container child be
  /// expanded later.
  fn visit_leaf(&mut self, anchor: &Anchor) -> bool;

  /// Examine an anchor reached through an octree rather than a child list.
  fn visit_octree_leaf(&mut self, anchor: &Anchor) -> bool {
    self.visit_leaf(anchor)
  }

  /// Whether to expand the children of an accepted container.
  fn visit_system(&mut self, system: &Anchor) -> bool;
}

/// Adapts an [`AnchorVisitor`] to one octree walk, resolving leaves to
/// anchors.
struct OctreeAdapter<'a, V> {
  arena: &'a AnchorArena,
  visitor: &'a mut V,
  accepted: &'a mut Vec<AnchorId>,
}

impl<V: AnchorVisitor> OctreeVisitor for OctreeAdapter<'_, V> {
  fn enter_node(&mut self, node: &OctreeNode) -> bool {
    self.visitor.enter_node(node)
  }

  fn traverse_node(&mut self, _node: &OctreeNode, leaves: &[OctreeLeaf]) {
    for leaf in leaves {
      let Some(anchor) = self.arena.get(leaf.anchor) else {
        continue;
      };
      if self.visitor.visit_octree_leaf(anchor) {
        self.accepted.push(anchor.id);
      }
    }
  }
}

/// Walk the hierarchy below `root`. `root` itself is only offered to
/// `visit_system`.
pub fn traverse_anchors<V: AnchorVisitor>(
  arena: &AnchorArena,
  root: AnchorId,
  visitor: &mut V,
) -> TraversalStats {
  let mut stats = TraversalStats::default();
  let mut stack = vec![root];
  let mut accepted = Vec::new();

  while let Some(id) = stack.pop() {
    let Some(container) = arena.get(id) else {
      continue;
    };
    if !visitor.visit_system(container) {
      continue;
    }

    accepted.clear();
    match &container.payload {
      AnchorPayload::Body => {}
      AnchorPayload::Octree(data) if data.octree.is_some() => {
        if let Some(octree) = &data.octree {
          let mut adapter = OctreeAdapter {
            arena,
            visitor: &mut *visitor,
            accepted: &mut accepted,
          };
          stats.merge(&octree.traverse(&mut adapter));
        }
      }
      payload => {
        // Systems and not-yet-built octrees: linear scan.
        for child in payload.children().iter().filter_map(|c| arena.get(*c)) {
          stats.leaves_tested += 1;
          if visitor.visit_leaf(child) {
            accepted.push(child.id);
          }
        }
      }
    }

    for child in accepted.iter().rev() {
      if arena.get(*child).is_some_and(Anchor::is_system) {
        stack.push(*child);
      }
    }
  }
  stats
}

// =============================================================================
// Visible objects
// =============================================================================

/// Collects the candidate set for one frame.
///
/// Nodes are pruned by the apparent magnitude of their brightest content
/// and by the frustum. An octree leaf is kept when its intrinsic light
/// reaches the magnitude limit and its bounding sphere meets the frustum.
/// A system child may also qualify by its size on screen, so unlit planets
/// of a visible system still show up once they cover enough pixels.
#[derive(Debug)]
pub struct VisibleObjectsTraverser<'a> {
  observer_position: DVec3,
  frustum: &'a Frustum,
  lowest_app_magnitude: f64,
  pixel_size: f64,
  min_body_size: f64,
  pub candidates: Vec<AnchorId>,
}

impl<'a> VisibleObjectsTraverser<'a> {
  /// `frustum` must be in world axes with its apex at the observer.
  pub fn new(
    observer_position: DVec3,
    frustum: &'a Frustum,
    lowest_app_magnitude: f64,
    pixel_size: f64,
    min_body_size: f64,
  ) -> Self {
    Self {
      observer_position,
      frustum,
      lowest_app_magnitude,
      pixel_size,
      min_body_size,
      candidates: Vec::new(),
    }
  }

  fn bounds(&self, anchor: &Anchor) -> DSphere {
    DSphere::new(anchor.absolute_position(), anchor.bounding_radius.max(0.0))
  }

  fn accepts_octree_leaf(&self, anchor: &Anchor) -> bool {
    if anchor.visibility_override {
      return true;
    }
    let sphere = self.bounds(anchor);
    let d = sphere.surface_distance(self.observer_position);
    if d <= 0.0 {
      return true;
    }
    let app = apparent_from_absolute(abs_mag_from_luminosity(anchor.intrinsic_luminosity), d);
    if app > self.lowest_app_magnitude {
      return false;
    }
    self.frustum.sphere_in(sphere.center - self.observer_position, sphere.radius)
  }

  fn accepts_child(&self, anchor: &Anchor) -> bool {
    if anchor.kind.contains(AnchorKind::UNIVERSE) {
      return false;
    }
    if anchor.visibility_override {
      return true;
    }

    let sphere = self.bounds(anchor);
    let rel = sphere.center - self.observer_position;
    let distance = rel.length();
    if distance <= sphere.radius {
      return true;
    }

    let bright = apparent_from_luminosity(anchor.radiant_flux(), distance) <= self.lowest_app_magnitude;
    let large = self.pixel_size > 0.0 && sphere.radius / (distance * self.pixel_size) >= self.min_body_size;
    (bright || large) && self.frustum.sphere_in(rel, sphere.radius)
  }

  fn accept(&mut self, anchor: &Anchor, accepted: bool) -> bool {
    if accepted {
      self.candidates.push(anchor.id);
    }
    accepted
  }
}

impl AnchorVisitor for VisibleObjectsTraverser<'_> {
  fn enter_node(&mut self, node: &OctreeNode) -> bool {
    let d = node.sphere().surface_distance(self.observer_position);
    if d <= 0.0 {
      return true;
    }
    let app = apparent_from_absolute(abs_mag_from_luminosity(node.max_luminosity), d);
    if app > self.lowest_app_magnitude {
      return false;
    }
    self.frustum.sphere_in(node.center - self.observer_position, node.radius)
  }

  fn visit_leaf(&mut self, anchor: &Anchor) -> bool {
    let accepted = self.accepts_child(anchor);
    self.accept(anchor, accepted)
  }

  fn visit_octree_leaf(&mut self, anchor: &Anchor) -> bool {
    let accepted = self.accepts_octree_leaf(anchor);
    self.accept(anchor, accepted)
  }

  fn visit_system(&mut self, _system: &Anchor) -> bool {
    true
  }
}

// =============================================================================
// Light sources
// =============================================================================

/// Finds the emitter delivering the most irradiance at a position.
#[derive(Debug)]
pub struct LightSourceTraverser {
  target: AnchorId,
  position: DVec3,
  best: Option<LightSource>,
  best_irradiance: f64,
}

impl LightSourceTraverser {
  pub fn new(target: AnchorId, position: DVec3) -> Self {
    Self {
      target,
      position,
      best: None,
      best_irradiance: 0.0,
    }
  }

  pub fn best(&self) -> Option<&LightSource> {
    self.best.as_ref()
  }

  /// Light source for `target`, searched through its ancestor systems
  /// nearest first. Octree containers end the search: stars in a cluster
  /// do not light each other's planets.
  pub fn find(arena: &AnchorArena, target: AnchorId) -> Option<LightSource> {
    let position = arena.get(target)?.absolute_position();
    let mut traverser = Self::new(target, position);
    for ancestor in arena.ancestors(target) {
      let Some(anchor) = arena.get(ancestor) else {
        break;
      };
      if !matches!(anchor.payload, AnchorPayload::System(_)) {
        break;
      }
      traverse_anchors(arena, ancestor, &mut traverser);
      if traverser.best.is_some() {
        break;
      }
    }
    if traverser.best.is_none() {
      tracing::trace!(%target, "no light source found");
    }
    traverser.best
  }
}

impl AnchorVisitor for LightSourceTraverser {
  fn enter_node(&mut self, node: &OctreeNode) -> bool {
    node.content.contains(AnchorKind::EMISSIVE)
  }

  fn visit_leaf(&mut self, anchor: &Anchor) -> bool {
    if anchor.id != self.target && anchor.kind.contains(AnchorKind::EMISSIVE) {
      let position = anchor.absolute_position();
      let irradiance = point_radiance(anchor.intrinsic_luminosity, (position - self.position).length());
      if irradiance > self.best_irradiance {
        self.best_irradiance = irradiance;
        self.best = Some(LightSource {
          anchor: anchor.id,
          position,
          flux: anchor.intrinsic_luminosity,
        });
      }
    }
    anchor.content.contains(AnchorKind::EMISSIVE)
  }

  fn visit_system(&mut self, system: &Anchor) -> bool {
    system.content.contains(AnchorKind::EMISSIVE)
  }
}

// =============================================================================
// Update order
// =============================================================================

/// Records every reachable anchor, each after its parent.
#[derive(Debug, Default)]
pub struct UpdateAllTraverser {
  pub order: Vec<AnchorId>,
}

impl UpdateAllTraverser {
  /// `root` followed by all of its descendants.
  pub fn collect(arena: &AnchorArena, root: AnchorId) -> Vec<AnchorId> {
    let mut traverser = Self::default();
    traverser.order.push(root);
    traverse_anchors(arena, root, &mut traverser);
    traverser.order
  }
}

impl AnchorVisitor for UpdateAllTraverser {
  fn enter_node(&mut self, _node: &OctreeNode) -> bool {
    true
  }

  fn visit_leaf(&mut self, anchor: &Anchor) -> bool {
    self.order.push(anchor.id);
    true
  }

  fn visit_system(&mut self, _system: &Anchor) -> bool {
    true
  }
}

#[cfg(test)]
#[path = "traverse_test.rs"]
mod traverse_test;
