//! SceneAnchor - render-space mirror of a visible anchor.
//!
//! Positions leave the f64 world here. Everything stored on a scene anchor
//! is single precision and relative to the camera (or to the world origin
//! when `camera_at_origin` is off).

use std::collections::BTreeMap;

use glam::{DVec3, Mat4, Quat, Vec3};

use super::DepthScaling;
use crate::anchor::{Anchor, AnchorId};
use crate::config::SceneConfig;
use crate::observer::Observer;

/// Identifier handed to the renderer. Never reused within a world.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SceneAnchorId(pub u64);

/// How anchors are placed in render space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScenePlacement {
  pub mode: DepthScaling,
  pub midplane: f64,
  pub scene_scale: f64,
  pub camera_at_origin: bool,
  pub offset_body_center: bool,
}

impl ScenePlacement {
  pub fn from_config(config: &SceneConfig) -> Self {
    Self {
      mode: config.depth_scaling(),
      midplane: config.midplane,
      scene_scale: config.scene_scale,
      camera_at_origin: config.camera_at_origin,
      offset_body_center: config.offset_body_center,
    }
  }
}

impl Default for ScenePlacement {
  fn default() -> Self {
    Self::from_config(&SceneConfig::default())
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneAnchor {
  pub id: SceneAnchorId,
  pub anchor: AnchorId,
  pub scene_position: Vec3,
  pub scene_orientation: Quat,
  /// Render distance from the camera.
  pub scene_distance: f32,
  /// Render units per kilometre of body-local geometry.
  pub scene_scale_factor: f32,
  /// Set when the body is placed about the surface point under the
  /// observer: render offset from that point to the body centre.
  pub body_center_offset: Option<Vec3>,
  pub update_id: u64,
}

impl SceneAnchor {
  pub fn new(id: SceneAnchorId, anchor: AnchorId) -> Self {
    Self {
      id,
      anchor,
      scene_position: Vec3::ZERO,
      scene_orientation: Quat::IDENTITY,
      scene_distance: 0.0,
      scene_scale_factor: 1.0,
      body_center_offset: None,
      update_id: 0,
    }
  }

  /// Recompute the render transform from `anchor`'s observer cache.
  pub fn update(&mut self, anchor: &Anchor, observer: &Observer, placement: &ScenePlacement, update_id: u64) {
    let rel = anchor.observer.rel_position;
    let distance = anchor.observer.distance_to_obs;
    let height = anchor.observer.height_under;

    let (position, scale_factor, offset) = if placement.offset_body_center
      && anchor.state.resolved
      && !anchor.is_system()
      && height > 0.0
      && distance > height
    {
      // Depth-scale the surface point, then lay the body out linearly
      // behind it at the surface's scale.
      let to_surface = rel / distance * height;
      let surface = placement
        .mode
        .remap(to_surface, placement.midplane, placement.scene_scale);
      let offset = (rel - to_surface) * surface.scale_factor;
      (surface.position + offset, surface.scale_factor, Some(offset))
    } else {
      let remap = placement.mode.remap(rel, placement.midplane, placement.scene_scale);
      (remap.position, remap.scale_factor, None)
    };

    let world_offset = if placement.camera_at_origin {
      DVec3::ZERO
    } else {
      observer.absolute_position() / placement.scene_scale
    };

    self.scene_position = (position + world_offset).as_vec3();
    self.scene_distance = position.length() as f32;
    self.scene_scale_factor = scale_factor as f32;
    self.scene_orientation = anchor.orientation.as_quat().normalize();
    self.body_center_offset = offset.map(|o| o.as_vec3());
    self.update_id = update_id;
  }

  /// Model matrix for body-local geometry in kilometres.
  pub fn render_transform(&self) -> Mat4 {
    Mat4::from_scale_rotation_translation(
      Vec3::splat(self.scene_scale_factor),
      self.scene_orientation,
      self.scene_position,
    )
  }
}

/// Scene anchors of the currently visible set, keyed by anchor.
#[derive(Debug, Default)]
pub struct SceneAnchors {
  anchors: BTreeMap<AnchorId, SceneAnchor>,
  next_id: u64,
}

impl SceneAnchors {
  pub fn new() -> Self {
    Self::default()
  }

  /// Scene anchor for `anchor`, created with a fresh id if absent.
  pub fn materialize(&mut self, anchor: AnchorId) -> &mut SceneAnchor {
    let next_id = &mut self.next_id;
    self.anchors.entry(anchor).or_insert_with(|| {
      let id = SceneAnchorId(*next_id);
      *next_id += 1;
      SceneAnchor::new(id, anchor)
    })
  }

  pub fn teardown(&mut self, anchor: AnchorId) -> Option<SceneAnchor> {
    self.anchors.remove(&anchor)
  }

  #[inline]
  pub fn get(&self, anchor: AnchorId) -> Option<&SceneAnchor> {
    self.anchors.get(&anchor)
  }

  #[inline]
  pub fn contains(&self, anchor: AnchorId) -> bool {
    self.anchors.contains_key(&anchor)
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.anchors.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.anchors.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &SceneAnchor> {
    self.anchors.values()
  }

  pub fn clear(&mut self) {
    self.anchors.clear();
  }
}

#[cfg(test)]
#[path = "scene_anchor_test.rs"]
mod scene_anchor_test;
