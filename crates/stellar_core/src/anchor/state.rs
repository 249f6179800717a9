//! Per-observer cache and visibility flags.

use glam::DVec3;

use crate::observer::Observer;

/// Observer-relative quantities, valid for the frame whose id is stored.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ObserverCache {
  /// Anchor minus observer (km).
  pub rel_position: DVec3,
  /// Unit vector from the anchor towards the observer; zero at distance 0.
  pub vector_to_obs: DVec3,
  pub distance_to_obs: f64,
  /// Bounding radius in pixels.
  pub visible_size: f64,
  /// Depth along the camera vector.
  pub z_distance: f64,
  /// Observer height above the surface, filled for resolved bodies.
  pub height_under: f64,
  pub update_id: u64,
}

impl ObserverCache {
  /// Pure computation of the cache; safe to run off-thread.
  pub fn compute(
    global: DVec3,
    local: DVec3,
    bounding_radius: f64,
    observer: &Observer,
    update_id: u64,
  ) -> Self {
    // Subtract within each domain first to keep precision at galactic range.
    let rel_position =
      (global - observer.global_position) + (local - observer.local_position);
    let distance = rel_position.length();

    if !(distance > 0.0) || !distance.is_finite() {
      return Self {
        rel_position,
        update_id,
        ..Self::default()
      };
    }

    let vector_to_obs = -rel_position / distance;
    let visible_size = if observer.pixel_size > 0.0 {
      bounding_radius / (distance * observer.pixel_size)
    } else {
      0.0
    };
    Self {
      rel_position,
      vector_to_obs,
      distance_to_obs: distance,
      visible_size,
      z_distance: distance * (-vector_to_obs).dot(observer.camera_vector),
      height_under: 0.0,
      update_id,
    }
  }

  /// Valid for `update_id`.
  #[inline]
  pub fn is_fresh(&self, update_id: u64) -> bool {
    self.update_id == update_id
  }
}

/// Visibility flags with a one-frame history.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VisibilityState {
  pub visible: bool,
  pub resolved: bool,
  pub was_visible: bool,
  pub was_resolved: bool,
  /// Id of the last state update.
  pub update_id: u64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_compute_basic() {
    let observer = Observer::default();
    let c = ObserverCache::compute(
      DVec3::new(0.0, 0.0, -100.0),
      DVec3::ZERO,
      10.0,
      &observer,
      3,
    );
    assert_eq!(c.distance_to_obs, 100.0);
    assert_eq!(c.vector_to_obs, DVec3::Z);
    assert!((c.z_distance - 100.0).abs() < 1e-12);
    assert!((c.visible_size - 10.0 / (100.0 * observer.pixel_size)).abs() < 1e-9);
    assert!(c.is_fresh(3));
  }

  /// Observer at the anchor centre: zero vector, zero sizes, no NaN.
  #[test]
  fn test_zero_distance_clamps() {
    let observer = Observer::default();
    let c = ObserverCache::compute(DVec3::ZERO, DVec3::ZERO, 5.0, &observer, 1);
    assert_eq!(c.distance_to_obs, 0.0);
    assert_eq!(c.vector_to_obs, DVec3::ZERO);
    assert_eq!(c.visible_size, 0.0);
    assert_eq!(c.z_distance, 0.0);
  }

  /// Global and local parts are subtracted separately.
  #[test]
  fn test_split_domains() {
    let mut observer = Observer::default();
    observer.global_position = DVec3::new(1.0e15, 0.0, 0.0);
    observer.local_position = DVec3::new(1.0, 0.0, 0.0);
    let c = ObserverCache::compute(
      DVec3::new(1.0e15, 0.0, 0.0),
      DVec3::new(3.5, 0.0, 0.0),
      0.0,
      &observer,
      1,
    );
    assert_eq!(c.rel_position, DVec3::new(2.5, 0.0, 0.0));
  }
}
