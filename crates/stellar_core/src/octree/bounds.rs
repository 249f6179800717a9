//! Bounding sphere with double precision for galactic-scale distances.

use glam::DVec3;

/// Double-precision bounding sphere.
///
/// Octree nodes are bounded by the sphere circumscribing their cube; anchors
/// by their bounding radius.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DSphere {
	/// Centre in absolute world coordinates (km).
	pub center: DVec3,
	/// Radius in km.
	pub radius: f64,
}

impl DSphere {
	/// Create a new sphere.
	///
	/// # Panics
	/// Debug-asserts that the radius is not negative.
	pub fn new(center: DVec3, radius: f64) -> Self {
		debug_assert!(radius >= 0.0, "sphere radius must be >= 0");
		Self { center, radius }
	}

	/// Check if the point lies inside or on the sphere.
	#[inline]
	pub fn contains_point(&self, point: DVec3) -> bool {
		self.center.distance_squared(point) <= self.radius * self.radius
	}

	/// Distance from `point` to the sphere surface. Negative inside.
	#[inline]
	pub fn surface_distance(&self, point: DVec3) -> f64 {
		self.center.distance(point) - self.radius
	}
}
