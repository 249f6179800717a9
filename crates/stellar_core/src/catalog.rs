//! Catalog construction - the inbound interface used by catalog parsers.
//!
//! Parsers add anchors in file order, attach them to their parents and
//! bind frames by name, then call [`StellarWorld::finish_catalog`] once.
//!
//! ```text
//! add_stellar_anchor / add_system / add_octree_anchor
//!        │
//!        ├── set_frame (FrameRecord -> FrameSpec, names looked up)
//!        ▼
//! finish_catalog: primaries, frames, rebuilds, octree build
//! ```
//!
//! Anchors added after `finish_catalog` are picked up by the lazy rebuild
//! at the start of the next frame.

use std::sync::Arc;

use glam::DVec3;

use crate::anchor::{Anchor, AnchorId, AnchorKind, AnchorPayload, OctreeData, SystemData};
use crate::error::{SceneError, SceneResult};
use crate::frame::{Frame, FrameRecord, FrameSpec};
use crate::motion::{FixedOrbit, FixedRotation, Orbit, Rotation};
use crate::traverse::UpdateAllTraverser;
use crate::world::StellarWorld;

/// Kinds a stellar anchor may carry. Containers have their own
/// constructors.
const STELLAR_KINDS: AnchorKind = AnchorKind::EMISSIVE
  .union(AnchorKind::REFLECTIVE)
  .union(AnchorKind::CARTESIAN);

impl StellarWorld {
  /// Add a body. It starts detached; attach it with
  /// [`add_child`](Self::add_child).
  pub fn add_stellar_anchor<I, S>(
    &mut self,
    kind: AnchorKind,
    orbit: Arc<dyn Orbit>,
    rotation: Arc<dyn Rotation>,
    intrinsic_luminosity: f64,
    bounding_radius: f64,
    names: I,
  ) -> SceneResult<AnchorId>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    if kind.is_empty() || !STELLAR_KINDS.contains(kind) {
      return Err(SceneError::catalog(format!(
        "{:?} is not a stellar anchor kind",
        kind
      )));
    }
    if !(intrinsic_luminosity.is_finite() && intrinsic_luminosity >= 0.0) {
      return Err(SceneError::catalog(format!(
        "luminosity must be a non-negative wattage, got {}",
        intrinsic_luminosity
      )));
    }
    if !(bounding_radius.is_finite() && bounding_radius >= 0.0) {
      return Err(SceneError::catalog(format!(
        "bounding radius must be a non-negative distance in km, got {}",
        bounding_radius
      )));
    }

    let anchor = Anchor::new(kind, orbit, rotation)
      .with_names(names)
      .with_luminosity(intrinsic_luminosity)
      .with_radius(bounding_radius);
    let id = self.arena.insert(anchor);
    tracing::trace!(%id, ?kind, "added stellar anchor");
    Ok(id)
  }

  /// Add a system under `parent`. `primary` names the child whose
  /// luminosity stands for the system; it is resolved by
  /// [`finish_catalog`](Self::finish_catalog).
  pub fn add_system<I, S>(
    &mut self,
    parent: AnchorId,
    orbit: Arc<dyn Orbit>,
    primary: Option<&str>,
    names: I,
  ) -> SceneResult<AnchorId>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.arena.try_get(parent)?;
    let anchor = Anchor::new(AnchorKind::SYSTEM, orbit, Arc::new(FixedRotation::default()))
      .with_names(names)
      .with_payload(AnchorPayload::System(SystemData {
        primary_name: primary.map(str::to_owned),
        ..SystemData::default()
      }));
    let id = self.arena.insert(anchor);
    self.arena.add_child(parent, id)?;
    Ok(id)
  }

  /// Add a container under `parent` whose children are indexed in their
  /// own luminosity octree. Children use absolute catalog positions.
  pub fn add_octree_anchor<I, S>(&mut self, parent: AnchorId, center: DVec3, names: I) -> SceneResult<AnchorId>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.arena.try_get(parent)?;
    let anchor = Anchor::new(
      AnchorKind::OCTREE,
      Arc::new(FixedOrbit(center)),
      Arc::new(FixedRotation::default()),
    )
    .with_names(names)
    .with_payload(AnchorPayload::Octree(OctreeData::default()));
    let id = self.arena.insert(anchor);
    self.arena.add_child(parent, id)?;
    Ok(id)
  }

  /// Attach `child` under `parent`. Applied lazily at the next frame.
  pub fn add_child(&mut self, parent: AnchorId, child: AnchorId) -> SceneResult<()> {
    self.arena.add_child(parent, child)
  }

  /// Detach `child` from `parent`. Applied lazily at the next frame.
  pub fn remove_child(&mut self, parent: AnchorId, child: AnchorId) -> SceneResult<()> {
    self.arena.remove_child(parent, child)
  }

  pub fn find_by_name(&self, name: &str) -> Option<AnchorId> {
    self.arena.find_by_name(name)
  }

  pub fn set_albedo(&mut self, anchor: AnchorId, albedo: f64) -> SceneResult<()> {
    if !albedo.is_finite() {
      return Err(SceneError::catalog(format!("albedo must be finite, got {}", albedo)));
    }
    let anchor = self.arena.try_get_mut(anchor)?;
    anchor.albedo = albedo.clamp(0.0, 1.0);
    Ok(())
  }

  /// Bind both the orbit and the body frame of `anchor` to `record`.
  pub fn set_frame(&mut self, anchor: AnchorId, record: &FrameRecord) -> SceneResult<()> {
    let spec = self.frame_spec(record)?;
    let target = self.arena.try_get_mut(anchor)?;
    target.orbit_frame = spec;
    target.body_frame = spec;
    self.arena.mark_rebuild(anchor);
    Ok(())
  }

  pub fn set_orbit_frame(&mut self, anchor: AnchorId, record: &FrameRecord) -> SceneResult<()> {
    let spec = self.frame_spec(record)?;
    self.arena.try_get_mut(anchor)?.orbit_frame = spec;
    self.arena.mark_rebuild(anchor);
    Ok(())
  }

  pub fn set_body_frame(&mut self, anchor: AnchorId, record: &FrameRecord) -> SceneResult<()> {
    let spec = self.frame_spec(record)?;
    self.arena.try_get_mut(anchor)?.body_frame = spec;
    Ok(())
  }

  fn frame_spec(&self, record: &FrameRecord) -> SceneResult<FrameSpec> {
    record.to_spec(|name| self.arena.find_by_name(name))
  }

  /// Validate the catalog and build every octree.
  ///
  /// Fails with [`SceneError::InvalidCatalog`] when a system names a
  /// primary that is not one of its children, or a frame is bound to an
  /// anchor that does not exist.
  #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "catalog::finish"))]
  pub fn finish_catalog(&mut self) -> SceneResult<()> {
    self.resolve_primaries()?;
    self.validate_frames()?;

    // Octrees are built from current positions, so pose everything first.
    let t = self.time();
    let order = UpdateAllTraverser::collect(&self.arena, self.arena.universe());
    for id in order {
      self.arena.place_anchor(id, t);
    }

    for id in self.container_ids() {
      self.arena.mark_rebuild(id);
    }
    let rebuilt = self.arena.apply_rebuilds();
    tracing::info!(
      world = %self.id,
      anchors = self.arena.len(),
      containers = rebuilt,
      "catalog finished"
    );
    Ok(())
  }

  fn container_ids(&self) -> Vec<AnchorId> {
    self
      .arena
      .iter()
      .filter(|a| a.is_system())
      .map(|a| a.id)
      .collect()
  }

  fn resolve_primaries(&mut self) -> SceneResult<()> {
    let mut resolved = Vec::new();
    for anchor in self.arena.iter() {
      let AnchorPayload::System(data) = &anchor.payload else {
        continue;
      };
      let Some(name) = data.primary_name.as_deref() else {
        continue;
      };
      let primary = data
        .children
        .iter()
        .copied()
        .find(|c| self.arena.get(*c).is_some_and(|child| child.names.iter().any(|n| n == name)));
      match primary {
        Some(primary) => resolved.push((anchor.id, primary)),
        None => {
          tracing::warn!(system = anchor.name(), primary = name, "primary not found among children");
          return Err(SceneError::catalog(format!(
            "primary '{}' of system '{}' is not one of its children",
            name,
            anchor.name()
          )));
        }
      }
    }

    for (system, primary) in resolved {
      if let Some(AnchorPayload::System(data)) = self.arena.get_mut(system).map(|a| &mut a.payload) {
        data.primary = Some(primary);
      }
      self.arena.mark_rebuild(system);
    }
    Ok(())
  }

  fn validate_frames(&self) -> SceneResult<()> {
    for anchor in self.arena.iter() {
      for spec in [&anchor.orbit_frame, &anchor.body_frame] {
        if let Err(err) = Frame::resolve(spec, &self.arena) {
          return Err(SceneError::catalog(format!(
            "frame of '{}' cannot be resolved: {}",
            anchor.name(),
            err
          )));
        }
      }
    }
    Ok(())
  }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod catalog_test;
