//! Anchors - catalog objects with an absolute position, brightness and
//! per-observer visibility state.
//!
//! Common fields live on the flat [`Anchor`] struct; what differs between
//! bodies, systems and octree containers lives in [`AnchorPayload`].
//!
//! ```text
//!   Universe (octree, always visible)
//!     ├── Star                       (Body, EMISSIVE)
//!     ├── System                     (System, primary + children)
//!     │     ├── Star                 (Body, EMISSIVE)
//!     │     └── Planet               (Body, REFLECTIVE)
//!     └── Cluster                    (Octree, children in its own octree)
//! ```
//!
//! # Module Structure
//!
//! - [`kind`]: `AnchorId`, `AnchorKind` bitmask
//! - [`state`]: `ObserverCache`, `VisibilityState`
//! - [`arena`]: `AnchorArena` - ownership, names, parent/child links
//! - [`system`]: system rebuild (radius, luminosity, content)

pub mod arena;
pub mod kind;
pub mod state;
pub mod system;

use std::sync::Arc;

use glam::{DQuat, DVec3};
use smallvec::SmallVec;

pub use arena::AnchorArena;
pub use kind::{AnchorId, AnchorKind};
pub use state::{ObserverCache, VisibilityState};

use crate::frame::{Frame, FramePose, FrameSpec, ReferenceFrame};
use crate::magnitude::{
  abs_mag_from_luminosity, apparent_from_absolute, point_radiance, reflected_luminosity,
};
use crate::motion::{FixedOrbit, FixedRotation, Orbit, Rotation};
use crate::observer::Observer;
use crate::octree::{LuminosityOctree, OctreeLeaf};

/// Names an anchor answers to. Most have one or two.
pub type AnchorNames = SmallVec<[String; 2]>;

/// Children of a plain system.
#[derive(Clone, Debug, Default)]
pub struct SystemData {
  pub children: Vec<AnchorId>,
  /// Child whose luminosity stands for the system.
  pub primary: Option<AnchorId>,
  /// Primary named by the catalog, resolved when the catalog is finished.
  pub primary_name: Option<String>,
}

/// Children of an octree container, indexed for magnitude-limited queries.
#[derive(Clone, Debug, Default)]
pub struct OctreeData {
  pub children: Vec<AnchorId>,
  /// Built on the first rebuild or traversal.
  pub octree: Option<LuminosityOctree>,
  /// Children detached since the last rebuild.
  pub removed: Vec<AnchorId>,
}

/// Variant-specific anchor data.
#[derive(Clone, Debug, Default)]
pub enum AnchorPayload {
  #[default]
  Body,
  System(SystemData),
  Octree(OctreeData),
}

impl AnchorPayload {
  pub fn children(&self) -> &[AnchorId] {
    match self {
      AnchorPayload::Body => &[],
      AnchorPayload::System(s) => &s.children,
      AnchorPayload::Octree(o) => &o.children,
    }
  }

  pub fn children_mut(&mut self) -> Option<&mut Vec<AnchorId>> {
    match self {
      AnchorPayload::Body => None,
      AnchorPayload::System(s) => Some(&mut s.children),
      AnchorPayload::Octree(o) => Some(&mut o.children),
    }
  }

  pub fn octree(&self) -> Option<&LuminosityOctree> {
    match self {
      AnchorPayload::Octree(o) => o.octree.as_ref(),
      _ => None,
    }
  }
}

/// Illuminating source for a reflective anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightSource {
  pub anchor: AnchorId,
  /// Absolute position (km).
  pub position: DVec3,
  /// Radiant flux (W).
  pub flux: f64,
}

/// A catalog object.
#[derive(Clone, Debug)]
pub struct Anchor {
  pub id: AnchorId,
  pub kind: AnchorKind,
  pub names: AnchorNames,
  pub parent: Option<AnchorId>,

  pub orbit: Arc<dyn Orbit>,
  pub rotation: Arc<dyn Rotation>,
  pub orbit_frame: FrameSpec,
  pub body_frame: FrameSpec,

  pub global_position: DVec3,
  pub local_position: DVec3,
  pub orientation: DQuat,
  pub equatorial_orientation: DQuat,

  /// km
  pub bounding_radius: f64,
  /// W
  pub intrinsic_luminosity: f64,
  /// W
  pub reflected_luminosity: f64,
  pub albedo: f64,
  /// Union of this anchor's kind and everything below it.
  pub content: AnchorKind,

  pub observer: ObserverCache,
  pub state: VisibilityState,

  /// Id of the last motion update.
  pub update_id: u64,
  /// Absolute position changed during the last motion update.
  pub moved: bool,
  pub visibility_override: bool,
  pub update_frozen: bool,
  pub rebuild_needed: bool,

  pub payload: AnchorPayload,
}

impl Anchor {
  pub fn new(kind: AnchorKind, orbit: Arc<dyn Orbit>, rotation: Arc<dyn Rotation>) -> Self {
    Self {
      id: AnchorId::INVALID,
      kind,
      names: AnchorNames::new(),
      parent: None,
      orbit,
      rotation,
      orbit_frame: FrameSpec::default(),
      body_frame: FrameSpec::default(),
      global_position: DVec3::ZERO,
      local_position: DVec3::ZERO,
      orientation: DQuat::IDENTITY,
      equatorial_orientation: DQuat::IDENTITY,
      bounding_radius: 0.0,
      intrinsic_luminosity: 0.0,
      reflected_luminosity: 0.0,
      albedo: 0.0,
      content: kind,
      observer: ObserverCache::default(),
      state: VisibilityState::default(),
      update_id: 0,
      moved: false,
      visibility_override: false,
      update_frozen: false,
      rebuild_needed: false,
      payload: AnchorPayload::Body,
    }
  }

  /// Anchor fixed at `position` with no rotation.
  pub fn fixed(kind: AnchorKind, position: DVec3) -> Self {
    Self::new(kind, Arc::new(FixedOrbit(position)), Arc::new(FixedRotation::default()))
  }

  pub fn with_names<I, S>(mut self, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.names = names.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_luminosity(mut self, watts: f64) -> Self {
    self.intrinsic_luminosity = watts.max(0.0);
    self
  }

  pub fn with_radius(mut self, km: f64) -> Self {
    self.bounding_radius = km.max(0.0);
    self
  }

  pub fn with_albedo(mut self, albedo: f64) -> Self {
    self.albedo = albedo.clamp(0.0, 1.0);
    self
  }

  pub fn with_payload(mut self, payload: AnchorPayload) -> Self {
    self.payload = payload;
    self
  }

  #[inline]
  pub fn name(&self) -> &str {
    self.names.first().map(String::as_str).unwrap_or("")
  }

  #[inline]
  pub fn absolute_position(&self) -> DVec3 {
    self.global_position + self.local_position
  }

  #[inline]
  pub fn radiant_flux(&self) -> f64 {
    self.intrinsic_luminosity + self.reflected_luminosity
  }

  #[inline]
  pub fn absolute_magnitude(&self) -> f64 {
    abs_mag_from_luminosity(self.radiant_flux())
  }

  /// Apparent magnitude from the last observer update.
  #[inline]
  pub fn apparent_magnitude(&self) -> f64 {
    apparent_from_absolute(self.absolute_magnitude(), self.observer.distance_to_obs)
  }

  #[inline]
  pub fn is_system(&self) -> bool {
    !matches!(self.payload, AnchorPayload::Body)
  }

  pub fn frame_pose(&self) -> FramePose {
    FramePose {
      global: self.global_position,
      local: self.local_position,
      orientation: self.orientation,
      equatorial_orientation: self.equatorial_orientation,
      radius: self.bounding_radius,
    }
  }

  /// What the octree stores for this anchor.
  pub fn octree_leaf(&self) -> OctreeLeaf {
    OctreeLeaf {
      anchor: self.id,
      position: self.absolute_position(),
      luminosity: self.intrinsic_luminosity,
      radius: self.bounding_radius,
      kind: self.content,
    }
  }

  // =========================================================================
  // Per-frame updates
  // =========================================================================

  /// Evaluate orbit and rotation at `t`. Returns false when the anchor was
  /// already updated for `update_id` or is frozen.
  ///
  /// Positions in an anchor-bound orbit frame land in the local domain on
  /// top of the bound anchor's global reference; barycentric positions land
  /// in the global domain.
  pub fn update(&mut self, t: f64, update_id: u64, orbit_frame: &Frame, body_frame: &Frame) -> bool {
    if self.update_id == update_id {
      return false;
    }
    self.update_id = update_id;
    self.moved = false;
    if self.update_frozen {
      return false;
    }
    self.moved = self.place(t, orbit_frame, body_frame);
    true
  }

  /// Move to the pose of time `t` without touching `update_id`. Returns
  /// whether the absolute position changed.
  pub(crate) fn place(&mut self, t: f64, orbit_frame: &Frame, body_frame: &Frame) -> bool {
    let before = self.absolute_position();
    let position = orbit_frame.local_from_frame(self.orbit.position_at(t));
    if self.orbit_frame.anchor().is_some() {
      self.global_position = orbit_frame.absolute_reference_point();
      self.local_position = position;
    } else {
      self.global_position = orbit_frame.absolute_reference_point() + position;
      self.local_position = DVec3::ZERO;
    }

    self.orientation = body_frame
      .absolute_orientation(self.rotation.orientation_at(t))
      .normalize();
    self.equatorial_orientation = body_frame
      .absolute_orientation(self.rotation.equatorial_orientation(t))
      .normalize();
    self.absolute_position() != before
  }

  /// Refresh the per-observer cache.
  pub fn update_observer(&mut self, observer: &Observer, update_id: u64) {
    let cache = ObserverCache::compute(
      self.global_position,
      self.local_position,
      self.bounding_radius,
      observer,
      update_id,
    );
    self.set_observer_cache(cache);
  }

  /// Install a cache computed elsewhere. The surface height is owned by the
  /// surface phase and carried over.
  pub fn set_observer_cache(&mut self, cache: ObserverCache) {
    let height_under = self.observer.height_under;
    self.observer = cache;
    self.observer.height_under = height_under;
  }

  /// Refresh `visible` / `resolved`, remembering the previous values.
  /// Runs at most once per `update_id`.
  pub fn update_state(&mut self, observer: &Observer, min_body_size: f64, update_id: u64) {
    if self.state.update_id == update_id {
      return;
    }
    self.state.update_id = update_id;
    self.state.was_visible = self.state.visible;
    self.state.was_resolved = self.state.resolved;

    if self.kind.contains(AnchorKind::UNIVERSE) {
      self.state.visible = true;
      self.state.resolved = true;
      return;
    }

    let cache = &self.observer;
    if cache.distance_to_obs <= self.bounding_radius {
      self.state.visible = true;
      self.state.resolved = true;
      return;
    }

    let in_frustum = observer
      .rel_frustum
      .sphere_in(cache.rel_position, self.bounding_radius);
    self.state.visible = self.visibility_override || in_frustum;
    self.state.resolved = self.state.visible && cache.visible_size > min_body_size;
  }

  /// Force the anchor hidden, e.g. when it dropped out of the candidate set.
  pub fn hide(&mut self) {
    self.state.was_visible = self.state.visible;
    self.state.was_resolved = self.state.resolved;
    self.state.visible = false;
    self.state.resolved = false;
  }

  /// Recompute reflected light from `light` as seen from
  /// `observer_position`. Emissive anchors and anchors with no light source
  /// reflect nothing.
  pub fn update_luminosity(&mut self, light: Option<&LightSource>, observer_position: DVec3) {
    if self.kind.contains(AnchorKind::EMISSIVE) || !self.kind.contains(AnchorKind::REFLECTIVE) {
      self.reflected_luminosity = 0.0;
      return;
    }
    let Some(light) = light else {
      self.reflected_luminosity = 0.0;
      return;
    };

    let position = self.absolute_position();
    let to_light = light.position - position;
    let to_observer = observer_position - position;
    let distance = to_light.length();
    let irradiance = point_radiance(light.flux, distance);
    let cos_phase = match (to_light.try_normalize(), to_observer.try_normalize()) {
      (Some(l), Some(o)) => l.dot(o),
      _ => 1.0,
    };
    self.reflected_luminosity =
      reflected_luminosity(self.albedo, self.bounding_radius, irradiance, cos_phase);
  }
}
