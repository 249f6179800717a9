use std::f64::consts::FRAC_PI_2;
use std::sync::Arc;

use glam::{DQuat, DVec3};

use super::*;
use crate::constants::{KM_PER_AU, KM_PER_PARSEC, SOLAR_LUMINOSITY};
use crate::error::PresentationError;
use crate::motion::{CircularOrbit, FixedOrbit, FixedRotation};
use crate::presentation::{NullPresentation, PresentationResult, SphericalSurface};
use crate::scene::SceneAnchor;

/// Records every callback; optionally rejects the first `on_visible` of
/// one anchor.
#[derive(Default)]
struct Recorder {
    events: Vec<(TransitionEvent, AnchorId)>,
    bodies: Vec<AnchorId>,
    reject_once: Option<AnchorId>,
}

impl Recorder {
    fn take(&mut self) -> Vec<(TransitionEvent, AnchorId)> {
        std::mem::take(&mut self.events)
    }
}

impl PresentationLayer for Recorder {
    fn on_visible(&mut self, anchor: &Anchor) -> PresentationResult {
        self.events.push((TransitionEvent::Visible, anchor.id));
        if self.reject_once == Some(anchor.id) {
            self.reject_once = None;
            return Err(PresentationError::new(anchor.id, "no instance slot"));
        }
        Ok(())
    }

    fn on_resolved(&mut self, anchor: &Anchor) -> PresentationResult {
        self.events.push((TransitionEvent::Resolved, anchor.id));
        Ok(())
    }

    fn on_point(&mut self, anchor: &Anchor) -> PresentationResult {
        self.events.push((TransitionEvent::Point, anchor.id));
        Ok(())
    }

    fn on_hidden(&mut self, anchor: &Anchor) -> PresentationResult {
        self.events.push((TransitionEvent::Hidden, anchor.id));
        Ok(())
    }

    fn update_body(&mut self, anchor: &Anchor, _scene: &SceneAnchor) -> PresentationResult {
        self.bodies.push(anchor.id);
        Ok(())
    }
}

fn world() -> StellarWorld {
    StellarWorld::new(SceneConfig::default()).unwrap()
}

fn add_star(world: &mut StellarWorld, position: DVec3, luminosity: f64, name: &str) -> AnchorId {
    let id = world
        .add_stellar_anchor(
            AnchorKind::EMISSIVE,
            Arc::new(FixedOrbit(position)),
            Arc::new(FixedRotation::default()),
            luminosity,
            7.0e5,
            [name],
        )
        .unwrap();
    let universe = world.universe();
    world.add_child(universe, id).unwrap();
    id
}

fn add_planet(world: &mut StellarWorld, parent: AnchorId, position: DVec3, radius: f64, name: &str) -> AnchorId {
    let id = world
        .add_stellar_anchor(
            AnchorKind::REFLECTIVE,
            Arc::new(FixedOrbit(position)),
            Arc::new(FixedRotation::default()),
            0.0,
            radius,
            [name],
        )
        .unwrap();
    world.add_child(parent, id).unwrap();
    world.set_albedo(id, 0.3).unwrap();
    id
}

/// Dim self-lit body loose in the universe octree. Close up it is both
/// bright enough to pass the leaf test and large enough to resolve.
fn add_beacon(world: &mut StellarWorld, position: DVec3, radius: f64, name: &str) -> AnchorId {
    let id = world
        .add_stellar_anchor(
            AnchorKind::EMISSIVE,
            Arc::new(FixedOrbit(position)),
            Arc::new(FixedRotation::default()),
            1.0e20,
            radius,
            [name],
        )
        .unwrap();
    let universe = world.universe();
    world.add_child(universe, id).unwrap();
    id
}

fn place_observer(world: &mut StellarWorld, position: DVec3, orientation: DQuat) {
    let pixel_size = world.observer().pixel_size;
    world.set_observer_pose(DVec3::ZERO, position, orientation, pixel_size, Frustum::default());
}

// =========================================================================
// Boundaries
// =========================================================================

/// A universe with nothing in it produces an empty frame.
#[test]
fn test_empty_world_frame() {
    let mut world = world();
    world.finish_catalog().unwrap();
    let output = world.update(0.0, &mut NullPresentation, None);

    assert_eq!(output.update_id, 1);
    assert_eq!(output.world, world.id);
    assert!(output.renderables.is_empty());
    assert!(output.transitions.is_empty());
    assert_eq!(output.stats.candidates, 0);
    assert!(world.visible().is_empty());
}

/// A sun-like star at 10 pc shows magnitude 4.83 and stays a point.
#[test]
fn test_star_at_ten_parsecs_is_point() {
    let mut world = world();
    let star = add_star(&mut world, DVec3::ZERO, SOLAR_LUMINOSITY, "Sol");
    world.finish_catalog().unwrap();
    place_observer(&mut world, DVec3::new(0.0, 0.0, 10.0 * KM_PER_PARSEC), DQuat::IDENTITY);

    let mut recorder = Recorder::default();
    let output = world.update(0.0, &mut recorder, None);

    let anchor = world.anchor(star).unwrap();
    assert!((anchor.apparent_magnitude() - 4.83).abs() < 1e-9);
    assert!(anchor.state.visible);
    assert!(!anchor.state.resolved);
    assert_eq!(recorder.take(), vec![(TransitionEvent::Visible, star)]);
    assert_eq!(output.transitions.newly_visible, vec![star]);
    assert!(output.transitions.newly_resolved.is_empty());
    assert!(output.renderables.is_empty(), "points are not renderables");
    assert!(world.scene_anchors().contains(star));
}

/// An observer inside a body sees it visible and resolved at distance 0.
#[test]
fn test_observer_at_anchor_center() {
    let mut world = world();
    let universe = world.universe();
    let body = add_planet(&mut world, universe, DVec3::ZERO, 6371.0, "Earth");
    world.finish_catalog().unwrap();
    place_observer(&mut world, DVec3::ZERO, DQuat::IDENTITY);

    let mut recorder = Recorder::default();
    let output = world.update(0.0, &mut recorder, None);

    let anchor = world.anchor(body).unwrap();
    assert!(anchor.state.visible);
    assert!(anchor.state.resolved);
    assert_eq!(anchor.observer.distance_to_obs, 0.0);
    assert_eq!(anchor.observer.vector_to_obs, DVec3::ZERO);
    assert_eq!(recorder.take(), vec![(TransitionEvent::Resolved, body)]);
    assert_eq!(output.renderables.len(), 1);
    assert!(output.renderables[0].render_transform.is_finite());
}

// =========================================================================
// Transitions
// =========================================================================

/// A star entering the frustum fires `on_visible` exactly once.
#[test]
fn test_visibility_transitions_over_three_frames() {
    let mut world = world();
    let star = add_star(&mut world, DVec3::new(10.0 * KM_PER_PARSEC, 0.0, 0.0), SOLAR_LUMINOSITY, "A");
    world.finish_catalog().unwrap();
    // Looking along +Y; the star sits 90 degrees off axis.
    place_observer(&mut world, DVec3::ZERO, DQuat::from_rotation_x(FRAC_PI_2));

    let mut recorder = Recorder::default();
    world.update(0.0, &mut recorder, None);
    assert!(world.transitions().becoming_visible.is_empty());
    assert!(!world.visible().contains(&star));

    // Turn to face +X.
    world.yaw_observer(-FRAC_PI_2);
    assert!((world.observer().camera_vector - DVec3::X).length() < 1e-12);
    world.update(1.0, &mut recorder, None);
    assert_eq!(world.transitions().becoming_visible, vec![star]);
    assert_eq!(recorder.take(), vec![(TransitionEvent::Visible, star)]);

    world.update(2.0, &mut recorder, None);
    assert!(world.transitions().becoming_visible.is_empty());
    assert!(recorder.take().is_empty());
    assert!(world.visible().contains(&star));
}

/// Becoming and ceasing visible never overlap within a frame.
#[test]
fn test_becoming_and_no_longer_visible_are_disjoint() {
    let mut world = world();
    let ahead = add_star(&mut world, DVec3::new(0.0, 0.0, -5.0 * KM_PER_PARSEC), SOLAR_LUMINOSITY, "ahead");
    let behind = add_star(&mut world, DVec3::new(0.0, 0.0, 5.0 * KM_PER_PARSEC), SOLAR_LUMINOSITY, "behind");
    world.finish_catalog().unwrap();
    place_observer(&mut world, DVec3::ZERO, DQuat::IDENTITY);

    world.update(0.0, &mut NullPresentation, None);
    assert_eq!(world.visible().iter().copied().collect::<Vec<_>>(), vec![ahead]);

    place_observer(&mut world, DVec3::ZERO, DQuat::from_rotation_x(std::f64::consts::PI));
    world.update(1.0, &mut NullPresentation, None);

    let t = world.transitions();
    assert_eq!(t.becoming_visible, vec![behind]);
    assert_eq!(t.no_longer_visible, vec![ahead]);
    assert!(t.becoming_visible.iter().all(|a| !t.no_longer_visible.contains(a)));
}

/// `was_visible` follows the previous frame while the anchor stays out of
/// view for several frames.
#[test]
fn test_visibility_history_rolls_while_hidden() {
    let mut world = world();
    let star = add_star(&mut world, DVec3::new(0.0, 0.0, -5.0 * KM_PER_PARSEC), SOLAR_LUMINOSITY, "s");
    world.finish_catalog().unwrap();
    place_observer(&mut world, DVec3::ZERO, DQuat::IDENTITY);

    world.update(0.0, &mut NullPresentation, None);
    assert!(world.anchor(star).unwrap().state.visible);

    place_observer(&mut world, DVec3::ZERO, DQuat::from_rotation_x(std::f64::consts::PI));
    world.update(1.0, &mut NullPresentation, None);
    let state = world.anchor(star).unwrap().state;
    assert!(!state.visible);
    assert!(state.was_visible);
    assert_eq!(state.update_id, 2);

    world.update(2.0, &mut NullPresentation, None);
    let state = world.anchor(star).unwrap().state;
    assert!(!state.visible && !state.was_visible);
    assert!(!state.resolved && !state.was_resolved);
    assert_eq!(state.update_id, 3);

    world.update(3.0, &mut NullPresentation, None);
    assert!(!world.anchor(star).unwrap().state.was_visible);
}

/// A withheld anchor that then leaves view still settles its history.
#[test]
fn test_withheld_anchor_history_settles() {
    let mut world = world();
    let star = add_star(&mut world, DVec3::new(0.0, 0.0, -5.0 * KM_PER_PARSEC), SOLAR_LUMINOSITY, "flaky");
    world.finish_catalog().unwrap();
    place_observer(&mut world, DVec3::ZERO, DQuat::IDENTITY);

    let mut recorder = Recorder {
        reject_once: Some(star),
        ..Recorder::default()
    };
    world.update(0.0, &mut recorder, None);
    world.update(1.0, &mut recorder, None);
    assert!(world.anchor(star).unwrap().state.was_visible);

    place_observer(&mut world, DVec3::ZERO, DQuat::from_rotation_x(std::f64::consts::PI));
    world.update(2.0, &mut recorder, None);
    let state = world.anchor(star).unwrap().state;
    assert!(!state.visible && !state.was_visible);
}

/// Resolved bodies fall back to a point before they are hidden.
#[test]
fn test_resolved_body_leaving_view_emits_point_then_hidden() {
    let mut world = world();
    let body = add_beacon(&mut world, DVec3::new(0.0, 0.0, -1.0e5), 6371.0, "Earth");
    world.finish_catalog().unwrap();
    place_observer(&mut world, DVec3::ZERO, DQuat::IDENTITY);

    let mut recorder = Recorder::default();
    world.update(0.0, &mut recorder, None);
    assert_eq!(recorder.take(), vec![(TransitionEvent::Resolved, body)]);

    place_observer(&mut world, DVec3::ZERO, DQuat::from_rotation_x(std::f64::consts::PI));
    world.update(1.0, &mut recorder, None);
    assert_eq!(
        recorder.take(),
        vec![(TransitionEvent::Point, body), (TransitionEvent::Hidden, body)]
    );
    assert!(!world.scene_anchors().contains(body));
}

/// A failing callback hides the anchor on the next frame only.
#[test]
fn test_failed_callback_hides_anchor_next_frame() {
    let mut world = world();
    let star = add_star(&mut world, DVec3::new(0.0, 0.0, -5.0 * KM_PER_PARSEC), SOLAR_LUMINOSITY, "flaky");
    world.finish_catalog().unwrap();
    place_observer(&mut world, DVec3::ZERO, DQuat::IDENTITY);

    let mut recorder = Recorder {
        reject_once: Some(star),
        ..Recorder::default()
    };
    let output = world.update(0.0, &mut recorder, None);
    assert_eq!(output.stats.callback_failures, 1);
    assert_eq!(recorder.take(), vec![(TransitionEvent::Visible, star)]);

    world.update(1.0, &mut recorder, None);
    assert!(!world.visible().contains(&star));
    assert!(!world.anchor(star).unwrap().state.visible);
    assert_eq!(recorder.take(), vec![(TransitionEvent::Hidden, star)]);

    world.update(2.0, &mut recorder, None);
    assert!(world.visible().contains(&star));
    assert_eq!(recorder.take(), vec![(TransitionEvent::Visible, star)]);
}

// =========================================================================
// Octree-scale culling
// =========================================================================

/// 100 clustered stars are all candidates up close and all drop out
/// together once the observer backs away.
#[test]
fn test_clustered_stars_drop_out_with_distance() {
    let mut world = world();
    let center = DVec3::new(0.0, 0.0, -5.0 * KM_PER_PARSEC);
    let mut stars = Vec::new();
    for i in 0..100 {
        let offset = DVec3::new((i % 10) as f64, (i / 10) as f64, 0.0) * 1.0e11;
        stars.push(add_star(&mut world, center + offset, 1.0e26, &format!("c{}", i)));
    }
    world.finish_catalog().unwrap();
    place_observer(&mut world, DVec3::ZERO, DQuat::IDENTITY);

    let output = world.update(0.0, &mut NullPresentation, None);
    assert_eq!(output.stats.candidates, 100);
    assert_eq!(world.visible().len(), 100);

    place_observer(&mut world, DVec3::new(0.0, 0.0, 100.0 * KM_PER_PARSEC), DQuat::IDENTITY);
    let output = world.update(1.0, &mut NullPresentation, None);
    assert_eq!(output.stats.candidates, 0);
    assert!(world.visible().is_empty());
    assert_eq!(output.transitions.newly_hidden.len(), 100);
    assert!(world.scene_anchors().is_empty());
}

/// Overrides survive frames until cleared.
#[test]
fn test_visibility_override_is_sticky() {
    let mut world = world();
    let behind = add_star(&mut world, DVec3::new(0.0, 0.0, 5.0 * KM_PER_PARSEC), SOLAR_LUMINOSITY, "behind");
    world.finish_catalog().unwrap();
    place_observer(&mut world, DVec3::ZERO, DQuat::IDENTITY);

    world.set_visibility_override(behind).unwrap();
    world.update(0.0, &mut NullPresentation, None);
    world.update(1.0, &mut NullPresentation, None);
    assert!(world.visible().contains(&behind));
    assert!(world.anchor(behind).unwrap().visibility_override);

    world.clear_visibility_override(behind).unwrap();
    world.update(2.0, &mut NullPresentation, None);
    assert!(!world.visible().contains(&behind));
}

// =========================================================================
// Systems, light and motion
// =========================================================================

/// A planet lit by its system's star becomes bright enough to be seen.
#[test]
fn test_planet_reflects_its_star() {
    let mut world = world();
    let universe = world.universe();
    let sys = world
        .add_system(universe, Arc::new(FixedOrbit(DVec3::ZERO)), Some("Sun"), ["Solar System"])
        .unwrap();
    let sun = world
        .add_stellar_anchor(
            AnchorKind::EMISSIVE,
            Arc::new(FixedOrbit(DVec3::ZERO)),
            Arc::new(FixedRotation::default()),
            SOLAR_LUMINOSITY,
            6.96e5,
            ["Sun"],
        )
        .unwrap();
    world.add_child(sys, sun).unwrap();
    let jupiter = add_planet(&mut world, sys, DVec3::new(5.2 * KM_PER_AU, 0.0, 0.0), 69911.0, "Jupiter");
    world.finish_catalog().unwrap();
    // Looking down on the system from 10 AU above the ecliptic.
    place_observer(&mut world, DVec3::new(0.0, 0.0, 10.0 * KM_PER_AU), DQuat::IDENTITY);

    world.update(0.0, &mut NullPresentation, None);
    let planet = world.anchor(jupiter).unwrap();
    assert!(planet.reflected_luminosity > 0.0);
    assert!(planet.apparent_magnitude() < 6.0);
    assert!(world.visible().contains(&jupiter));
    assert!(world.visible().contains(&sys));
    assert_eq!(world.anchor(sys).unwrap().intrinsic_luminosity, SOLAR_LUMINOSITY);
}

/// Orbits advance with time unless the anchor is frozen.
#[test]
fn test_update_frozen_anchor_keeps_position() {
    let mut world = world();
    let universe = world.universe();
    let sys = world
        .add_system(universe, Arc::new(FixedOrbit(DVec3::ZERO)), None, ["sys"])
        .unwrap();
    let moving = world
        .add_stellar_anchor(
            AnchorKind::REFLECTIVE,
            Arc::new(CircularOrbit::new(KM_PER_AU, 4.0)),
            Arc::new(FixedRotation::default()),
            0.0,
            6371.0,
            ["moving"],
        )
        .unwrap();
    world.add_child(sys, moving).unwrap();
    world.finish_catalog().unwrap();

    world.update(0.0, &mut NullPresentation, None);
    let start = world.anchor(moving).unwrap().absolute_position();
    let output = world.update(1.0, &mut NullPresentation, None);
    let quarter = world.anchor(moving).unwrap().absolute_position();
    assert!((quarter - DVec3::new(0.0, KM_PER_AU, 0.0)).length() < 1e-3);
    assert!(output.stats.moved >= 1);
    assert!((start - quarter).length() > 1.0);

    world.set_update_frozen(moving, true).unwrap();
    world.update(2.0, &mut NullPresentation, None);
    assert_eq!(world.anchor(moving).unwrap().absolute_position(), quarter);
}

// =========================================================================
// Scene anchors and output
// =========================================================================

/// Resolved bodies come out farthest first with surface height applied.
#[test]
fn test_renderables_sorted_farthest_first() {
    let mut world = world();
    let near = add_beacon(&mut world, DVec3::new(0.0, 0.0, -1.0e5), 6371.0, "near");
    let far = add_beacon(&mut world, DVec3::new(0.0, 0.0, -2.0e5), 6371.0, "far");
    world.finish_catalog().unwrap();
    place_observer(&mut world, DVec3::ZERO, DQuat::IDENTITY);

    let mut recorder = Recorder::default();
    let output = world.update(0.0, &mut recorder, Some(&SphericalSurface));

    let order: Vec<AnchorId> = output.renderables.iter().map(|r| r.anchor).collect();
    assert_eq!(order, vec![far, near]);
    assert!((output.renderables[1].lod_distance - 1.0e5).abs() < 1e-6);
    assert!(output.renderables.iter().all(|r| r.scale_factor > 0.0 && r.scale_factor < 1.0));
    assert!((world.anchor(near).unwrap().observer.height_under - (1.0e5 - 6371.0)).abs() < 1e-6);
    assert_eq!(recorder.bodies.len(), 2);
}

/// Scene anchors keep their id while visible and are torn down after.
#[test]
fn test_scene_anchor_lifecycle() {
    let mut world = world();
    let star = add_star(&mut world, DVec3::new(0.0, 0.0, -5.0 * KM_PER_PARSEC), SOLAR_LUMINOSITY, "s");
    world.finish_catalog().unwrap();
    place_observer(&mut world, DVec3::ZERO, DQuat::IDENTITY);

    world.update(0.0, &mut NullPresentation, None);
    let first = world.scene_anchors().get(star).unwrap().id;
    world.update(1.0, &mut NullPresentation, None);
    assert_eq!(world.scene_anchors().get(star).unwrap().id, first);
    assert_eq!(world.scene_anchors().get(star).unwrap().update_id, 2);

    place_observer(&mut world, DVec3::ZERO, DQuat::from_rotation_x(std::f64::consts::PI));
    world.update(2.0, &mut NullPresentation, None);
    assert!(world.scene_anchors().get(star).is_none());

    place_observer(&mut world, DVec3::ZERO, DQuat::IDENTITY);
    world.update(3.0, &mut NullPresentation, None);
    assert_ne!(world.scene_anchors().get(star).unwrap().id, first);
}

/// Catalog changes after the first frame are applied lazily.
#[test]
fn test_star_added_between_frames() {
    let mut world = world();
    world.finish_catalog().unwrap();
    place_observer(&mut world, DVec3::ZERO, DQuat::IDENTITY);
    world.update(0.0, &mut NullPresentation, None);

    let star = add_star(&mut world, DVec3::new(0.0, 0.0, -5.0 * KM_PER_PARSEC), SOLAR_LUMINOSITY, "late");
    let output = world.update(1.0, &mut NullPresentation, None);
    assert!(output.stats.rebuilt >= 1);
    assert_eq!(output.transitions.newly_visible, vec![star]);
}

/// World ids are unique.
#[test]
fn test_world_ids_unique() {
    let a = world();
    let b = world();
    assert_ne!(a.id, b.id);
    assert!(b.id.raw() > a.id.raw());
    assert_ne!(a.id, WorldId::default());
    assert_eq!(format!("{}", WorldId::default()), "world#0");
}

/// Contradictory configuration is refused.
#[test]
fn test_invalid_config_rejected() {
    let config = SceneConfig {
        use_inv_scaling: Some(true),
        use_log_scaling: Some(true),
        ..SceneConfig::default()
    };
    assert!(StellarWorld::new(config).is_err());
}
