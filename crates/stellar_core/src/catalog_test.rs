use std::sync::Arc;

use glam::DVec3;

use super::*;
use crate::config::SceneConfig;
use crate::constants::{KM_PER_AU, SOLAR_LUMINOSITY};
use crate::frame::BaseFrame;
use crate::presentation::NullPresentation;

fn world() -> StellarWorld {
  StellarWorld::new(SceneConfig::default()).unwrap()
}

fn star(world: &mut StellarWorld, parent: AnchorId, offset: DVec3, luminosity: f64, name: &str) -> AnchorId {
  let id = world
    .add_stellar_anchor(
      AnchorKind::EMISSIVE,
      Arc::new(FixedOrbit(offset)),
      Arc::new(FixedRotation::default()),
      luminosity,
      7.0e5,
      [name],
    )
    .unwrap();
  world.add_child(parent, id).unwrap();
  id
}

fn record(parent: &str) -> FrameRecord {
  FrameRecord {
    ra: 0.0,
    dec: std::f64::consts::FRAC_PI_2,
    longitude_at_node: 0.0,
    parent_frame_name: parent.to_string(),
  }
}

// =========================================================================
// Anchors
// =========================================================================

/// Containers cannot be added as stellar anchors.
#[test]
fn test_stellar_kind_rejected_for_containers() {
  let mut world = world();
  let result = world.add_stellar_anchor(
    AnchorKind::SYSTEM,
    Arc::new(FixedOrbit(DVec3::ZERO)),
    Arc::new(FixedRotation::default()),
    0.0,
    0.0,
    ["bad"],
  );
  assert!(matches!(result, Err(SceneError::InvalidCatalog(_))));
}

/// Negative or non-finite units are refused.
#[test]
fn test_inconsistent_units_rejected() {
  let mut world = world();
  let negative = world.add_stellar_anchor(
    AnchorKind::EMISSIVE,
    Arc::new(FixedOrbit(DVec3::ZERO)),
    Arc::new(FixedRotation::default()),
    -1.0,
    1.0,
    ["a"],
  );
  assert!(matches!(negative, Err(SceneError::InvalidCatalog(_))));

  let nan_radius = world.add_stellar_anchor(
    AnchorKind::REFLECTIVE,
    Arc::new(FixedOrbit(DVec3::ZERO)),
    Arc::new(FixedRotation::default()),
    0.0,
    f64::NAN,
    ["b"],
  );
  assert!(matches!(nan_radius, Err(SceneError::InvalidCatalog(_))));
  assert!(world.set_albedo(world.universe(), f64::INFINITY).is_err());
}

/// Every name an anchor carries finds it.
#[test]
fn test_find_by_any_name() {
  let mut world = world();
  let id = world
    .add_stellar_anchor(
      AnchorKind::EMISSIVE,
      Arc::new(FixedOrbit(DVec3::ZERO)),
      Arc::new(FixedRotation::default()),
      SOLAR_LUMINOSITY,
      7.0e5,
      ["Sirius", "Alpha CMa"],
    )
    .unwrap();
  assert_eq!(world.find_by_name("Sirius"), Some(id));
  assert_eq!(world.find_by_name("Alpha CMa"), Some(id));
  assert_eq!(world.find_by_name("Vega"), None);
}

// =========================================================================
// Systems
// =========================================================================

/// A binary's luminosity is its designated primary's.
#[test]
fn test_binary_system_uses_primary_luminosity() {
  let mut world = world();
  let universe = world.universe();
  let sys = world
    .add_system(universe, Arc::new(FixedOrbit(DVec3::new(1.0e14, 0.0, 0.0))), Some("P"), ["S"])
    .unwrap();
  let p = star(&mut world, sys, DVec3::new(-1.0e7, 0.0, 0.0), 2.0 * SOLAR_LUMINOSITY, "P");
  star(&mut world, sys, DVec3::new(2.0e7, 0.0, 0.0), SOLAR_LUMINOSITY, "Q");
  world.finish_catalog().unwrap();

  let system = world.anchor(sys).unwrap();
  assert_eq!(system.intrinsic_luminosity, 2.0 * SOLAR_LUMINOSITY);
  assert_eq!(system.intrinsic_luminosity, world.anchor(p).unwrap().intrinsic_luminosity);
  assert!(matches!(&system.payload, AnchorPayload::System(data) if data.primary == Some(p)));
}

/// Without a primary a system sums its children.
#[test]
fn test_system_without_primary_sums_children() {
  let mut world = world();
  let universe = world.universe();
  let sys = world
    .add_system(universe, Arc::new(FixedOrbit(DVec3::ZERO)), None, ["S"])
    .unwrap();
  star(&mut world, sys, DVec3::new(-1.0e7, 0.0, 0.0), 2.0 * SOLAR_LUMINOSITY, "P");
  star(&mut world, sys, DVec3::new(2.0e7, 0.0, 0.0), SOLAR_LUMINOSITY, "Q");
  world.finish_catalog().unwrap();
  assert_eq!(world.anchor(sys).unwrap().intrinsic_luminosity, 3.0 * SOLAR_LUMINOSITY);
}

/// A primary that is not a child fails the catalog.
#[test]
fn test_missing_primary_is_invalid_catalog() {
  let mut world = world();
  let universe = world.universe();
  let sys = world
    .add_system(universe, Arc::new(FixedOrbit(DVec3::ZERO)), Some("Ghost"), ["S"])
    .unwrap();
  star(&mut world, sys, DVec3::ZERO, SOLAR_LUMINOSITY, "P");
  // Exists, but outside the system.
  star(&mut world, universe, DVec3::ZERO, SOLAR_LUMINOSITY, "Ghost");

  let err = world.finish_catalog().unwrap_err();
  assert!(matches!(err, SceneError::InvalidCatalog(_)));
  assert!(err.to_string().contains("Ghost"));
}

/// Systems bound their children's orbits after the catalog is finished.
#[test]
fn test_system_radius_bounds_children() {
  let mut world = world();
  let universe = world.universe();
  let sys = world
    .add_system(universe, Arc::new(FixedOrbit(DVec3::ZERO)), None, ["S"])
    .unwrap();
  star(&mut world, sys, DVec3::new(KM_PER_AU, 0.0, 0.0), SOLAR_LUMINOSITY, "P");
  world.finish_catalog().unwrap();
  assert!(world.anchor(sys).unwrap().bounding_radius >= KM_PER_AU + 7.0e5);
}

/// Octree containers index their children in their own octree.
#[test]
fn test_octree_anchor_builds_octree() {
  let mut world = world();
  let universe = world.universe();
  let cluster = world
    .add_octree_anchor(universe, DVec3::new(1.0e15, 0.0, 0.0), ["Pleiades"])
    .unwrap();
  for i in 0..10 {
    star(
      &mut world,
      cluster,
      DVec3::new(1.0e15 + i as f64 * 1.0e12, 0.0, 0.0),
      SOLAR_LUMINOSITY,
      &format!("m{}", i),
    );
  }
  world.finish_catalog().unwrap();

  let anchor = world.anchor(cluster).unwrap();
  let octree = anchor.payload.octree().unwrap();
  assert_eq!(octree.len(), 10);
  assert_eq!(anchor.intrinsic_luminosity, 10.0 * SOLAR_LUMINOSITY);
}

/// Only containers accept children.
#[test]
fn test_body_cannot_have_children() {
  let mut world = world();
  let universe = world.universe();
  let a = star(&mut world, universe, DVec3::ZERO, SOLAR_LUMINOSITY, "A");
  let b = world
    .add_stellar_anchor(
      AnchorKind::REFLECTIVE,
      Arc::new(FixedOrbit(DVec3::ZERO)),
      Arc::new(FixedRotation::default()),
      0.0,
      1.0,
      ["B"],
    )
    .unwrap();
  assert!(world.add_child(a, b).is_err());
}

/// Removing a child takes effect on the next frame.
#[test]
fn test_remove_child_applied_next_frame() {
  let mut world = world();
  let universe = world.universe();
  let a = star(&mut world, universe, DVec3::new(0.0, 0.0, -1.0e14), SOLAR_LUMINOSITY, "A");
  world.finish_catalog().unwrap();
  world.update(0.0, &mut NullPresentation, None);
  assert!(world.visible().contains(&a));

  world.remove_child(universe, a).unwrap();
  let output = world.update(1.0, &mut NullPresentation, None);
  assert!(!world.visible().contains(&a));
  assert_eq!(output.transitions.newly_hidden, vec![a]);
  assert!(world.remove_child(universe, a).is_err());
}

// =========================================================================
// Frames
// =========================================================================

/// Frame records bind to anchors by name.
#[test]
fn test_set_frame_by_name() {
  let mut world = world();
  let universe = world.universe();
  let sys = world
    .add_system(universe, Arc::new(FixedOrbit(DVec3::ZERO)), None, ["Sol"])
    .unwrap();
  let p = star(&mut world, sys, DVec3::ZERO, SOLAR_LUMINOSITY, "P");

  world.set_frame(p, &record("Sol:equatorial")).unwrap();
  let anchor = world.anchor(p).unwrap();
  assert_eq!(anchor.orbit_frame, anchor.body_frame);
  assert!(matches!(
    anchor.orbit_frame,
    FrameSpec::Celestial {
      base: BaseFrame::Equatorial(id),
      ..
    } if id == sys
  ));

  world.set_body_frame(p, &record("ecliptic")).unwrap();
  let anchor = world.anchor(p).unwrap();
  assert_ne!(anchor.orbit_frame, anchor.body_frame);
  world.finish_catalog().unwrap();
}

/// An unknown frame name fails with InvalidCatalog.
#[test]
fn test_unknown_frame_name_rejected() {
  let mut world = world();
  let universe = world.universe();
  let p = star(&mut world, universe, DVec3::ZERO, SOLAR_LUMINOSITY, "P");
  let err = world.set_orbit_frame(p, &record("Nowhere")).unwrap_err();
  assert!(matches!(err, SceneError::InvalidCatalog(_)));
}

/// Octree leaves start at their catalog position, so the first frame has
/// nothing to relocate.
#[test]
fn test_finish_catalog_places_leaves() {
  let mut world = world();
  let universe = world.universe();
  let position = DVec3::new(3.0e13, -1.0e13, 2.0e12);
  let a = star(&mut world, universe, position, SOLAR_LUMINOSITY, "A");
  world.finish_catalog().unwrap();

  let octree = world.arena().get(universe).unwrap().payload.octree().unwrap();
  assert_eq!(octree.leaf(a).map(|l| l.position), Some(position));

  let output = world.update(0.0, &mut NullPresentation, None);
  assert_eq!(output.stats.moved, 0);
}
