//! Observer - the single viewpoint a world is rendered from.
//!
//! The pose may be bound to a frame. While bound to an anchor frame the
//! observer keeps its frame coordinates fixed, so it rides along with the
//! body as the body moves and spins.

use std::f64::consts::FRAC_PI_4;

use glam::{DQuat, DVec3};

use crate::frame::{Frame, FrameSpec, ReferenceFrame};
use crate::frustum::Frustum;

/// Default vertical resolution used to derive pixel size from the field of
/// view.
const DEFAULT_VIEWPORT_HEIGHT: f64 = 1080.0;

#[derive(Clone, Debug)]
pub struct Observer {
  pub global_position: DVec3,
  pub local_position: DVec3,
  /// Camera-to-world rotation. The camera looks down its local -Z.
  pub orientation: DQuat,
  /// `orientation * -Z`
  pub camera_vector: DVec3,
  /// Radians per rendered pixel.
  pub pixel_size: f64,
  /// Frustum in camera space.
  pub frustum: Frustum,
  /// Frustum rotated into world axes, apex at the observer.
  pub rel_frustum: Frustum,
  pub frame: FrameSpec,
  frame_position: DVec3,
  frame_orientation: DQuat,
}

impl Default for Observer {
  fn default() -> Self {
    let frustum = Frustum::default();
    let mut observer = Self {
      global_position: DVec3::ZERO,
      local_position: DVec3::ZERO,
      orientation: DQuat::IDENTITY,
      camera_vector: DVec3::NEG_Z,
      pixel_size: FRAC_PI_4 / DEFAULT_VIEWPORT_HEIGHT,
      rel_frustum: frustum.clone(),
      frustum,
      frame: FrameSpec::default(),
      frame_position: DVec3::ZERO,
      frame_orientation: DQuat::IDENTITY,
    };
    observer.refresh_derived();
    observer
  }
}

impl Observer {
  /// Absolute position (global + local).
  #[inline]
  pub fn absolute_position(&self) -> DVec3 {
    self.global_position + self.local_position
  }

  /// Whether the pose follows an anchor-bound frame.
  #[inline]
  pub fn follows_anchor(&self) -> bool {
    self.frame.anchor().is_some()
  }

  /// Set the absolute pose. `frame` is the current resolution of
  /// `self.frame`.
  pub fn set_pose(
    &mut self,
    global: DVec3,
    local: DVec3,
    orientation: DQuat,
    pixel_size: f64,
    frustum: Frustum,
    frame: &Frame,
  ) {
    self.global_position = global;
    self.local_position = local;
    self.orientation = orientation.normalize();
    self.pixel_size = pixel_size;
    self.frustum = frustum;
    self.capture_frame_coordinates(frame);
    self.refresh_derived();
  }

  /// Rebind to a new frame keeping the current absolute pose.
  pub fn set_frame(&mut self, spec: FrameSpec, frame: &Frame) {
    self.frame = spec;
    self.capture_frame_coordinates(frame);
  }

  /// Re-derive the absolute pose from frame coordinates.
  pub fn update_pose(&mut self, frame: &Frame) {
    if !self.follows_anchor() {
      return;
    }
    self.global_position = frame.absolute_reference_point();
    self.local_position = frame.local_from_frame(self.frame_position);
    self.orientation = frame.absolute_orientation(self.frame_orientation).normalize();
    self.refresh_derived();
  }

  /// Turn about the world +Z axis (ecliptic pole).
  pub fn yaw(&mut self, angle: f64, frame: &Frame) {
    self.orientation = (DQuat::from_rotation_z(angle) * self.orientation).normalize();
    self.capture_frame_coordinates(frame);
    self.refresh_derived();
  }

  /// Move along the camera vector by `distance` km.
  pub fn dolly(&mut self, distance: f64, frame: &Frame) {
    self.local_position += self.camera_vector * distance;
    self.capture_frame_coordinates(frame);
  }

  fn capture_frame_coordinates(&mut self, frame: &Frame) {
    let relative = self.local_position + (self.global_position - frame.absolute_reference_point());
    self.frame_position = frame.frame_from_local(relative);
    self.frame_orientation = frame.frame_orientation(self.orientation);
  }

  fn refresh_derived(&mut self) {
    self.camera_vector = self.orientation * DVec3::NEG_Z;
    self.rel_frustum = self.frustum.rotated(self.orientation);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::f64::consts::FRAC_PI_2;

  #[test]
  fn test_default_looks_down_neg_z() {
    let o = Observer::default();
    assert_eq!(o.camera_vector, DVec3::NEG_Z);
    assert!(o.rel_frustum.point_in(DVec3::new(0.0, 0.0, -1.0)));
    assert!(o.pixel_size > 0.0);
  }

  #[test]
  fn test_yaw_rotates_camera_vector() {
    let mut o = Observer::default();
    // Look along +X first
    o.set_pose(
      DVec3::ZERO,
      DVec3::ZERO,
      DQuat::from_rotation_y(-FRAC_PI_2),
      1e-3,
      Frustum::default(),
      &Frame::IDENTITY,
    );
    assert!((o.camera_vector - DVec3::X).length() < 1e-12);
    o.yaw(FRAC_PI_2, &Frame::IDENTITY);
    assert!((o.camera_vector - DVec3::Y).length() < 1e-12);
    assert!(o.rel_frustum.point_in(DVec3::new(0.0, 5.0, 0.0)));
  }

  #[test]
  fn test_dolly_moves_forward() {
    let mut o = Observer::default();
    o.dolly(10.0, &Frame::IDENTITY);
    assert!((o.absolute_position() - DVec3::new(0.0, 0.0, -10.0)).length() < 1e-12);
  }

  /// An observer bound to a moving frame keeps its frame coordinates.
  #[test]
  fn test_follows_bound_frame() {
    let body = crate::anchor::AnchorId(4);
    let frame_a = Frame {
      center: DVec3::new(100.0, 0.0, 0.0),
      orientation: DQuat::IDENTITY,
      reference: DVec3::new(1.0e12, 0.0, 0.0),
    };
    let mut o = Observer::default();
    o.set_frame(crate::frame::FrameSpec::Base(crate::frame::BaseFrame::Synchronous(body)), &frame_a);
    o.set_pose(
      DVec3::new(1.0e12, 0.0, 0.0),
      DVec3::new(110.0, 0.0, 0.0),
      DQuat::IDENTITY,
      1e-3,
      Frustum::default(),
      &frame_a,
    );

    // The body moves and spins a quarter turn
    let frame_b = Frame {
      center: DVec3::new(200.0, 0.0, 0.0),
      orientation: DQuat::from_rotation_z(FRAC_PI_2),
      reference: DVec3::new(1.0e12, 0.0, 0.0),
    };
    o.update_pose(&frame_b);
    assert!((o.local_position - DVec3::new(200.0, 10.0, 0.0)).length() < 1e-9);
    assert_eq!(o.global_position, DVec3::new(1.0e12, 0.0, 0.0));
  }
}
