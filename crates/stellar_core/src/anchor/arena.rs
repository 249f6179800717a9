//! AnchorArena - owns every anchor of a world.
//!
//! Parents own their children through id lists; children point back with
//! `parent`. Ids are arena indices and stay valid for the arena's lifetime.
//! Anchor 0 is the universe.

use std::collections::HashMap;

use glam::DVec3;

use super::{Anchor, AnchorId, AnchorKind, AnchorPayload, OctreeData};
use crate::error::{SceneError, SceneResult};
use crate::frame::{BaseFrame, Frame, FramePose, FramePoses, FrameSpec};
use crate::octree::OctreeConfig;

#[derive(Debug)]
pub struct AnchorArena {
  anchors: Vec<Anchor>,
  names: HashMap<String, AnchorId>,
  universe: AnchorId,
  pub(crate) octree_config: OctreeConfig,
}

impl AnchorArena {
  /// Arena holding only the universe.
  pub fn new(octree_config: OctreeConfig) -> Self {
    let mut arena = Self {
      anchors: Vec::new(),
      names: HashMap::new(),
      universe: AnchorId(0),
      octree_config,
    };
    let mut universe = Anchor::fixed(AnchorKind::OCTREE | AnchorKind::UNIVERSE, DVec3::ZERO)
      .with_names(["Universe"])
      .with_payload(AnchorPayload::Octree(OctreeData::default()));
    universe.state.visible = true;
    universe.state.resolved = true;
    arena.universe = arena.insert(universe);
    arena
  }

  #[inline]
  pub fn universe(&self) -> AnchorId {
    self.universe
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.anchors.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.anchors.is_empty()
  }

  #[inline]
  pub fn get(&self, id: AnchorId) -> Option<&Anchor> {
    self.anchors.get(id.index())
  }

  #[inline]
  pub fn get_mut(&mut self, id: AnchorId) -> Option<&mut Anchor> {
    self.anchors.get_mut(id.index())
  }

  /// Like [`get`](Self::get) but as an error.
  pub fn try_get(&self, id: AnchorId) -> SceneResult<&Anchor> {
    self.get(id).ok_or(SceneError::UnknownAnchor(id))
  }

  pub fn try_get_mut(&mut self, id: AnchorId) -> SceneResult<&mut Anchor> {
    self.get_mut(id).ok_or(SceneError::UnknownAnchor(id))
  }

  pub fn iter(&self) -> impl Iterator<Item = &Anchor> {
    self.anchors.iter()
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Anchor> {
    self.anchors.iter_mut()
  }

  /// Add an anchor. It starts detached; link it with
  /// [`add_child`](Self::add_child).
  pub fn insert(&mut self, mut anchor: Anchor) -> AnchorId {
    let id = AnchorId(self.anchors.len() as u32);
    anchor.id = id;
    for name in &anchor.names {
      self.names.entry(name.clone()).or_insert(id);
    }
    self.anchors.push(anchor);
    id
  }

  /// First anchor registered under `name`.
  pub fn find_by_name(&self, name: &str) -> Option<AnchorId> {
    self.names.get(name).copied()
  }

  #[inline]
  pub fn children(&self, id: AnchorId) -> &[AnchorId] {
    self.get(id).map(|a| a.payload.children()).unwrap_or(&[])
  }

  /// Parent chain of `id`, nearest first.
  pub fn ancestors(&self, id: AnchorId) -> Vec<AnchorId> {
    let mut chain = Vec::new();
    let mut current = self.get(id).and_then(|a| a.parent);
    while let Some(parent) = current {
      chain.push(parent);
      current = self.get(parent).and_then(|a| a.parent);
    }
    chain
  }

  pub fn depth(&self, id: AnchorId) -> usize {
    self.ancestors(id).len()
  }

  // =========================================================================
  // Hierarchy mutation
  // =========================================================================

  /// Attach `child` under `parent`, detaching it from any previous parent.
  pub fn add_child(&mut self, parent: AnchorId, child: AnchorId) -> SceneResult<()> {
    self.try_get(child)?;
    if parent == child || self.ancestors(parent).contains(&child) {
      return Err(SceneError::catalog(format!(
        "attaching {} under {} would form a cycle",
        child, parent
      )));
    }
    let parent_anchor = self.try_get(parent)?;
    if !parent_anchor.is_system() {
      return Err(SceneError::catalog(format!(
        "anchor {} ('{}') cannot have children",
        parent,
        parent_anchor.name()
      )));
    }

    if let Some(previous) = self.get(child).and_then(|a| a.parent) {
      self.remove_child(previous, child)?;
    }

    let parent_anchor = self.try_get_mut(parent)?;
    let orbits_parent = matches!(parent_anchor.payload, AnchorPayload::System(_));
    if let Some(children) = parent_anchor.payload.children_mut() {
      children.push(child);
    }
    let anchor = self.try_get_mut(child)?;
    anchor.parent = Some(parent);
    // Octree containers index absolute catalog positions; only systems
    // carry their children's orbits.
    if orbits_parent && anchor.orbit_frame == FrameSpec::default() {
      anchor.orbit_frame = FrameSpec::Base(BaseFrame::Orbit(parent));
    }
    self.mark_rebuild(parent);
    Ok(())
  }

  /// Detach `child` from `parent`.
  pub fn remove_child(&mut self, parent: AnchorId, child: AnchorId) -> SceneResult<()> {
    let parent_anchor = self.try_get_mut(parent)?;
    let removed = match &mut parent_anchor.payload {
      AnchorPayload::Body => false,
      AnchorPayload::System(system) => {
        let before = system.children.len();
        system.children.retain(|c| *c != child);
        if system.primary == Some(child) {
          system.primary = None;
        }
        system.children.len() != before
      }
      AnchorPayload::Octree(data) => {
        let before = data.children.len();
        data.children.retain(|c| *c != child);
        let removed = data.children.len() != before;
        if removed {
          data.removed.push(child);
        }
        removed
      }
    };
    if !removed {
      return Err(SceneError::catalog(format!(
        "{} is not a child of {}",
        child, parent
      )));
    }

    let anchor = self.try_get_mut(child)?;
    anchor.parent = None;
    if anchor.orbit_frame == FrameSpec::Base(BaseFrame::Orbit(parent)) {
      anchor.orbit_frame = FrameSpec::default();
    }
    self.mark_rebuild(parent);
    Ok(())
  }

  /// Flag `id` and every ancestor for rebuild at the start of the next
  /// frame.
  pub fn mark_rebuild(&mut self, id: AnchorId) {
    let mut current = Some(id);
    while let Some(index) = current {
      let Some(anchor) = self.get_mut(index) else {
        break;
      };
      anchor.rebuild_needed = true;
      current = anchor.parent;
    }
  }

  /// Any pending rebuild.
  pub fn needs_rebuild(&self) -> bool {
    self.anchors.iter().any(|a| a.rebuild_needed)
  }

  // =========================================================================
  // Frames
  // =========================================================================

  /// Resolve a frame spec, falling back to the identity frame when the
  /// bound anchor is missing.
  pub fn resolve_frame(&self, spec: &FrameSpec) -> Frame {
    Frame::resolve(spec, self).unwrap_or_else(|err| {
      tracing::warn!(%err, ?spec, "frame resolution failed, using identity");
      Frame::IDENTITY
    })
  }

  /// Evaluate the motion of `id` at `t`.
  pub fn update_anchor(&mut self, id: AnchorId, t: f64, update_id: u64) -> bool {
    let Some(anchor) = self.get(id) else {
      return false;
    };
    if anchor.update_id == update_id {
      return false;
    }
    let orbit_frame = self.resolve_frame(&anchor.orbit_frame);
    let body_frame = self.resolve_frame(&anchor.body_frame);
    match self.get_mut(id) {
      Some(anchor) => anchor.update(t, update_id, &orbit_frame, &body_frame),
      None => false,
    }
  }
}

impl AnchorArena {
  /// Pose `id` at time `t` outside of any frame. Frozen anchors stay put.
  pub fn place_anchor(&mut self, id: AnchorId, t: f64) {
    let Some(anchor) = self.get(id) else {
      return;
    };
    if anchor.update_frozen {
      return;
    }
    let orbit_frame = self.resolve_frame(&anchor.orbit_frame);
    let body_frame = self.resolve_frame(&anchor.body_frame);
    if let Some(anchor) = self.get_mut(id) {
      anchor.place(t, &orbit_frame, &body_frame);
    }
  }
}

impl FramePoses for AnchorArena {
  fn frame_pose(&self, anchor: AnchorId) -> Option<FramePose> {
    self.get(anchor).map(Anchor::frame_pose)
  }
}

#[cfg(test)]
#[path = "arena_test.rs"]
mod arena_test;
