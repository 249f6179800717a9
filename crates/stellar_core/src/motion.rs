//! Orbit and rotation interfaces.
//!
//! Ephemeris and rotation models are supplied by the host; the core only
//! evaluates them. A few analytic models are provided for catalogs that do
//! not need anything more.
//!
//! Positions are in km in the anchor's orbit frame; time is in the same unit
//! as the periods given to the models.

use std::f64::consts::TAU;
use std::fmt::Debug;

use glam::{DQuat, DVec3};

/// Position of an anchor in its orbit frame as a function of time.
pub trait Orbit: Debug + Send + Sync {
  fn position_at(&self, t: f64) -> DVec3;

  /// Largest distance from the frame centre the orbit ever reaches.
  fn bounding_radius(&self) -> f64;
}

/// Orientation of an anchor in its body frame as a function of time.
pub trait Rotation: Debug + Send + Sync {
  /// Orientation of the equator, without spin about the pole.
  fn equatorial_orientation(&self, t: f64) -> DQuat;

  /// Full orientation including spin.
  fn orientation_at(&self, t: f64) -> DQuat;
}

/// Fixed position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedOrbit(pub DVec3);

impl Orbit for FixedOrbit {
  fn position_at(&self, _t: f64) -> DVec3 {
    self.0
  }

  fn bounding_radius(&self) -> f64 {
    self.0.length()
  }
}

/// Circular orbit about the frame centre.
///
/// ```text
/// theta = phase + 2*pi * t / period
/// p     = Rz(node) * Rx(inclination) * (r cos theta, r sin theta, 0)
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CircularOrbit {
  pub radius: f64,
  pub period: f64,
  pub inclination: f64,
  pub ascending_node: f64,
  pub phase: f64,
}

impl CircularOrbit {
  pub fn new(radius: f64, period: f64) -> Self {
    Self {
      radius,
      period,
      inclination: 0.0,
      ascending_node: 0.0,
      phase: 0.0,
    }
  }

  fn plane(&self) -> DQuat {
    DQuat::from_rotation_z(self.ascending_node) * DQuat::from_rotation_x(self.inclination)
  }
}

impl Orbit for CircularOrbit {
  fn position_at(&self, t: f64) -> DVec3 {
    let theta = if self.period != 0.0 {
      self.phase + TAU * t / self.period
    } else {
      self.phase
    };
    let (s, c) = theta.sin_cos();
    self.plane() * DVec3::new(self.radius * c, self.radius * s, 0.0)
  }

  fn bounding_radius(&self) -> f64 {
    self.radius.abs()
  }
}

/// Constant orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedRotation(pub DQuat);

impl Default for FixedRotation {
  fn default() -> Self {
    Self(DQuat::IDENTITY)
  }
}

impl Rotation for FixedRotation {
  fn equatorial_orientation(&self, _t: f64) -> DQuat {
    self.0
  }

  fn orientation_at(&self, _t: f64) -> DQuat {
    self.0
  }
}

/// Constant spin about the body's pole (+Z of the equator).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformRotation {
  pub equator: DQuat,
  pub period: f64,
  /// Spin angle at t = 0 (radians).
  pub offset: f64,
}

impl UniformRotation {
  pub fn new(period: f64) -> Self {
    Self {
      equator: DQuat::IDENTITY,
      period,
      offset: 0.0,
    }
  }

  pub fn spin_angle(&self, t: f64) -> f64 {
    if self.period == 0.0 {
      return self.offset;
    }
    self.offset + TAU * t / self.period
  }
}

impl Rotation for UniformRotation {
  fn equatorial_orientation(&self, _t: f64) -> DQuat {
    self.equator
  }

  fn orientation_at(&self, t: f64) -> DQuat {
    (self.equator * DQuat::from_rotation_z(self.spin_angle(t))).normalize()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::f64::consts::FRAC_PI_2;

  #[test]
  fn test_fixed_orbit() {
    let o = FixedOrbit(DVec3::new(3.0, 4.0, 0.0));
    assert_eq!(o.position_at(123.0), DVec3::new(3.0, 4.0, 0.0));
    assert_eq!(o.bounding_radius(), 5.0);
  }

  #[test]
  fn test_circular_orbit_quarter_period() {
    let o = CircularOrbit::new(10.0, 4.0);
    let p = o.position_at(1.0);
    assert!((p - DVec3::new(0.0, 10.0, 0.0)).length() < 1e-12, "p was {:?}", p);
    assert!((o.position_at(4.0) - o.position_at(0.0)).length() < 1e-12);
  }

  #[test]
  fn test_inclined_orbit_stays_within_radius() {
    let o = CircularOrbit {
      inclination: 0.3,
      ascending_node: 1.1,
      ..CircularOrbit::new(7.0, 2.0)
    };
    for i in 0..16 {
      let p = o.position_at(i as f64 * 0.13);
      assert!((p.length() - 7.0).abs() < 1e-12);
      assert!(p.length() <= o.bounding_radius() + 1e-12);
    }
  }

  #[test]
  fn test_uniform_rotation_spins_about_pole() {
    let r = UniformRotation::new(4.0);
    let q = r.orientation_at(1.0);
    let x = q * DVec3::X;
    assert!((x - DVec3::Y).length() < 1e-12);
    // Pole is unchanged by spin
    assert!((q * DVec3::Z - DVec3::Z).length() < 1e-12);
    assert_eq!(r.equatorial_orientation(1.0), DQuat::IDENTITY);
  }

  #[test]
  fn test_fixed_rotation() {
    let q = DQuat::from_rotation_x(FRAC_PI_2);
    let r = FixedRotation(q);
    assert_eq!(r.orientation_at(5.0), q);
    assert_eq!(r.equatorial_orientation(5.0), q);
  }
}
