//! System rebuild - derived radius, luminosity and content of containers.
//!
//! ```text
//! radius     = max over children (position bound + child radius)
//! luminosity = primary's, or the sum over children
//! content    = own kind | content of every child
//! ```
//!
//! Rebuilds run deepest-first so a parent always sees rebuilt children.

use super::{AnchorArena, AnchorId, AnchorKind, AnchorPayload};
use crate::octree::{LuminosityOctree, OctreeLeaf};

/// Derived values for a container, computed from its children.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Aggregate {
  radius: f64,
  luminosity: f64,
  content: AnchorKind,
}

impl AnchorArena {
  /// Apply every pending rebuild. Returns the number of anchors rebuilt.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "anchor::apply_rebuilds"))]
  pub fn apply_rebuilds(&mut self) -> usize {
    let mut pending: Vec<(usize, AnchorId)> = self
      .iter()
      .filter(|a| a.rebuild_needed)
      .map(|a| (self.depth(a.id), a.id))
      .collect();
    if pending.is_empty() {
      return 0;
    }
    pending.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

    for &(_, id) in &pending {
      self.rebuild(id);
    }
    tracing::debug!(rebuilt = pending.len(), "applied anchor rebuilds");
    pending.len()
  }

  /// Recompute the derived values of `id` from its children and refresh its
  /// octree if it has one.
  pub fn rebuild(&mut self, id: AnchorId) {
    if let Some(aggregate) = self.aggregate(id) {
      if let Some(anchor) = self.get_mut(id) {
        anchor.bounding_radius = aggregate.radius;
        anchor.content = aggregate.content;
        if !anchor.kind.contains(AnchorKind::UNIVERSE) {
          anchor.intrinsic_luminosity = aggregate.luminosity;
        }
      }
    }
    self.refresh_octree(id);
    if let Some(anchor) = self.get_mut(id) {
      anchor.rebuild_needed = false;
    }
  }

  fn aggregate(&self, id: AnchorId) -> Option<Aggregate> {
    let system = self.get(id)?;
    let children = system.payload.children();
    if children.is_empty() {
      return match system.payload {
        AnchorPayload::Body => None,
        _ => Some(Aggregate {
          radius: 0.0,
          luminosity: 0.0,
          content: system.kind,
        }),
      };
    }

    let mut radius: f64 = 0.0;
    let mut sum = 0.0;
    let mut content = system.kind;
    for child in children.iter().filter_map(|c| self.get(*c)) {
      let offset = ((child.global_position - system.global_position)
        + (child.local_position - system.local_position))
        .length();
      let position_bound = child.orbit.bounding_radius().max(offset);
      radius = radius.max(position_bound + child.bounding_radius);
      sum += child.intrinsic_luminosity;
      content |= child.content;
    }

    let luminosity = match &system.payload {
      AnchorPayload::System(data) => data
        .primary
        .and_then(|p| self.get(p))
        .map(|p| p.intrinsic_luminosity)
        .unwrap_or(sum),
      _ => sum,
    };
    Some(Aggregate {
      radius,
      luminosity,
      content,
    })
  }

  /// Bring the octree of `id` in line with its children: build it the first
  /// time, afterwards drop removed children and relocate changed leaves.
  pub fn refresh_octree(&mut self, id: AnchorId) {
    let Some(anchor) = self.get(id) else {
      return;
    };
    let AnchorPayload::Octree(data) = &anchor.payload else {
      return;
    };
    let leaves: Vec<OctreeLeaf> = data
      .children
      .iter()
      .filter_map(|c| self.get(*c))
      .map(|c| c.octree_leaf())
      .collect();
    let config = self.octree_config.clone();

    let Some(AnchorPayload::Octree(data)) = self.get_mut(id).map(|a| &mut a.payload) else {
      return;
    };
    match data.octree.as_mut() {
      None => {
        data.octree = Some(LuminosityOctree::build(config, leaves));
        data.removed.clear();
      }
      Some(octree) => {
        for removed in data.removed.drain(..) {
          octree.remove(removed);
        }
        for leaf in leaves {
          if octree.leaf(leaf.anchor) != Some(&leaf) {
            octree.add(leaf);
          }
        }
      }
    }
  }

  /// Relocate octree leaves of children that moved during the last motion
  /// update.
  pub fn refresh_moved_leaves(&mut self) -> usize {
    let mut moved: Vec<(AnchorId, OctreeLeaf)> = Vec::new();
    for anchor in self.iter() {
      if !anchor.moved {
        continue;
      }
      if let Some(parent) = anchor.parent {
        if matches!(
          self.get(parent).map(|p| &p.payload),
          Some(AnchorPayload::Octree(_))
        ) {
          moved.push((parent, anchor.octree_leaf()));
        }
      }
    }

    let count = moved.len();
    for (parent, leaf) in moved {
      if let Some(AnchorPayload::Octree(data)) = self.get_mut(parent).map(|a| &mut a.payload) {
        if let Some(octree) = data.octree.as_mut() {
          octree.add(leaf);
        }
      }
    }
    count
  }
}

#[cfg(test)]
#[path = "system_test.rs"]
mod system_test;
