//! Infinite view frustum for observer-relative culling.
//!
//! The apex sits at the observer, the near plane passes through it and there
//! is no far plane. Planes store inward-facing unit normals:
//!
//! ```text
//!   inside  <=>  dot(n, p) + d >= -radius   for every plane
//! ```

use glam::{DQuat, DVec3};
use smallvec::SmallVec;

/// Plane with inward unit normal: `dot(normal, p) + d = 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
  pub normal: DVec3,
  pub d: f64,
}

impl Plane {
  /// Plane from a (not necessarily unit) normal and offset.
  /// A zero normal yields `None`.
  pub fn new(normal: DVec3, d: f64) -> Option<Self> {
    let len = normal.length();
    if len <= f64::EPSILON || !len.is_finite() {
      return None;
    }
    Some(Self {
      normal: normal / len,
      d: d / len,
    })
  }

  #[inline]
  pub fn signed_distance(&self, p: DVec3) -> f64 {
    self.normal.dot(p) + self.d
  }
}

/// Convex frustum bounded by up to six planes.
#[derive(Clone, Debug, PartialEq)]
pub struct Frustum {
  planes: SmallVec<[Plane; 6]>,
}

impl Frustum {
  /// Infinite perspective frustum in camera space (looking down -Z, +Y up).
  pub fn perspective(fov_y: f64, aspect: f64) -> Self {
    let tan_y = (fov_y * 0.5).tan();
    let tan_x = tan_y * aspect;
    let raw = [
      DVec3::new(0.0, 0.0, -1.0),  // near, through the apex
      DVec3::new(1.0, 0.0, -tan_x),  // left
      DVec3::new(-1.0, 0.0, -tan_x), // right
      DVec3::new(0.0, 1.0, -tan_y),  // bottom
      DVec3::new(0.0, -1.0, -tan_y), // top
    ];
    Self {
      planes: raw.iter().filter_map(|n| Plane::new(*n, 0.0)).collect(),
    }
  }

  /// Frustum from caller-supplied `(normal, d)` planes. Degenerate planes
  /// are skipped.
  pub fn from_planes(planes: impl IntoIterator<Item = (DVec3, f64)>) -> Self {
    Self {
      planes: planes
        .into_iter()
        .filter_map(|(n, d)| Plane::new(n, d))
        .collect(),
    }
  }

  #[inline]
  pub fn planes(&self) -> &[Plane] {
    &self.planes
  }

  /// Rotate every plane through the origin by `rotation`.
  pub fn rotated(&self, rotation: DQuat) -> Self {
    Self {
      planes: self
        .planes
        .iter()
        .map(|p| Plane {
          normal: rotation * p.normal,
          d: p.d,
        })
        .collect(),
    }
  }

  /// Whether the sphere (`center` relative to the apex) touches the
  /// frustum.
  #[inline]
  pub fn sphere_in(&self, center: DVec3, radius: f64) -> bool {
    self
      .planes
      .iter()
      .all(|p| p.signed_distance(center) >= -radius)
  }

  #[inline]
  pub fn point_in(&self, point: DVec3) -> bool {
    self.sphere_in(point, 0.0)
  }
}

impl Default for Frustum {
  /// 45 degree vertical field of view at 16:9.
  fn default() -> Self {
    Self::perspective(std::f64::consts::FRAC_PI_4, 16.0 / 9.0)
  }
}
