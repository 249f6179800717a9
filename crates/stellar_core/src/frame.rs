//! Reference frames.
//!
//! A frame is a centre `c` in local space, a rotation `Q` and a global
//! reference point. Every concrete frame reduces to these three values once
//! resolved against the current anchor poses:
//!
//! ```text
//! local_from_frame(p) = c + Q * p
//! frame_from_local(p) = Q^-1 * (p - c)
//! absolute(p)         = reference + local_from_frame(p)
//! ```
//!
//! World space is the J2000 ecliptic with +Z towards the ecliptic pole. The
//! obliquity rotation appears only in [`BaseFrame::Equator`].

use std::f64::consts::FRAC_PI_2;

use glam::{DMat3, DQuat, DVec3};

use crate::anchor::AnchorId;
use crate::constants::J2000_OBLIQUITY;
use crate::error::{SceneError, SceneResult};

/// Frame primitives shared by every frame kind.
pub trait ReferenceFrame {
  fn local_from_frame(&self, p: DVec3) -> DVec3;
  fn frame_from_local(&self, p: DVec3) -> DVec3;
  fn absolute_orientation(&self, q: DQuat) -> DQuat;
  fn frame_orientation(&self, q: DQuat) -> DQuat;
  fn absolute_reference_point(&self) -> DVec3;
}

/// Frames that do not need extra angles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BaseFrame {
  /// Barycentric J2000 ecliptic (identity).
  #[default]
  Ecliptic,
  /// Barycentric J2000 equator.
  Equator,
  /// Centred on an anchor, ecliptic axes.
  Orbit(AnchorId),
  /// Centred on an anchor, aligned with its equator.
  Equatorial(AnchorId),
  /// Centred on an anchor, rotating with it.
  Synchronous(AnchorId),
}

impl BaseFrame {
  /// Anchor the frame is bound to, if any.
  pub fn anchor(&self) -> Option<AnchorId> {
    match *self {
      BaseFrame::Ecliptic | BaseFrame::Equator => None,
      BaseFrame::Orbit(a) | BaseFrame::Equatorial(a) | BaseFrame::Synchronous(a) => Some(a),
    }
  }
}

/// Description of a frame, resolved to a [`Frame`] every update.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FrameSpec {
  Base(BaseFrame),
  /// Pole at (ra, dec) in `base`, prime meridian rotated by `node`.
  Celestial {
    base: BaseFrame,
    ra: f64,
    dec: f64,
    node: f64,
  },
  /// Tangent frame on a body's surface: +X east, +Y north, +Z up.
  Surface {
    body: AnchorId,
    longitude: f64,
    latitude: f64,
  },
}

impl Default for FrameSpec {
  fn default() -> Self {
    FrameSpec::Base(BaseFrame::Ecliptic)
  }
}

impl FrameSpec {
  /// Anchors whose pose the frame depends on.
  pub fn anchor(&self) -> Option<AnchorId> {
    match self {
      FrameSpec::Base(base) | FrameSpec::Celestial { base, .. } => base.anchor(),
      FrameSpec::Surface { body, .. } => Some(*body),
    }
  }
}

/// Frame record as produced by catalog parsers. Angles in radians.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameRecord {
  pub ra: f64,
  pub dec: f64,
  pub longitude_at_node: f64,
  /// `ecliptic`, `equator`, or `<anchor>[:orbit|:equatorial|:synchronous]`.
  pub parent_frame_name: String,
}

impl FrameRecord {
  /// Resolve into a celestial frame spec, looking anchor names up with
  /// `find`.
  pub fn to_spec(&self, find: impl Fn(&str) -> Option<AnchorId>) -> SceneResult<FrameSpec> {
    let base = parse_base_frame(&self.parent_frame_name, find)?;
    Ok(FrameSpec::Celestial {
      base,
      ra: self.ra,
      dec: self.dec,
      node: self.longitude_at_node,
    })
  }
}

/// Parse a frame name into a [`BaseFrame`].
pub fn parse_base_frame(name: &str, find: impl Fn(&str) -> Option<AnchorId>) -> SceneResult<BaseFrame> {
  let trimmed = name.trim();
  match trimmed.to_ascii_lowercase().as_str() {
    "ecliptic" | "eclipticj2000" => return Ok(BaseFrame::Ecliptic),
    "equator" | "equatorj2000" => return Ok(BaseFrame::Equator),
    _ => {}
  }

  let (anchor_name, suffix) = match trimmed.rsplit_once(':') {
    Some((n, s)) => (n, s.to_ascii_lowercase()),
    None => (trimmed, String::from("orbit")),
  };
  let anchor = find(anchor_name)
    .ok_or_else(|| SceneError::catalog(format!("unknown frame name '{}'", name)))?;
  match suffix.as_str() {
    "orbit" => Ok(BaseFrame::Orbit(anchor)),
    "equatorial" => Ok(BaseFrame::Equatorial(anchor)),
    "synchronous" => Ok(BaseFrame::Synchronous(anchor)),
    other => Err(SceneError::catalog(format!(
      "unknown frame kind '{}' in '{}'",
      other, name
    ))),
  }
}

/// Current pose of an anchor, as needed to resolve frames bound to it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FramePose {
  pub global: DVec3,
  pub local: DVec3,
  pub orientation: DQuat,
  pub equatorial_orientation: DQuat,
  pub radius: f64,
}

/// Source of anchor poses for frame resolution.
pub trait FramePoses {
  fn frame_pose(&self, anchor: AnchorId) -> Option<FramePose>;
}

/// Rotation from the ecliptic to the J2000 equator.
#[inline]
pub fn equator_rotation() -> DQuat {
  DQuat::from_rotation_x(-J2000_OBLIQUITY)
}

/// Rotation placing a pole at (ra, dec) with the prime meridian at `node`.
#[inline]
pub fn celestial_rotation(ra: f64, dec: f64, node: f64) -> DQuat {
  DQuat::from_rotation_z(ra + FRAC_PI_2)
    * DQuat::from_rotation_x(FRAC_PI_2 - dec)
    * DQuat::from_rotation_z(node)
}

/// Surface tangent basis at (lon, lat) on a unit sphere, and the normal.
///
/// Columns are east, north, up.
pub fn surface_basis(longitude: f64, latitude: f64) -> (DQuat, DVec3) {
  let (slon, clon) = longitude.sin_cos();
  let (slat, clat) = latitude.sin_cos();
  let normal = DVec3::new(clat * clon, clat * slon, slat);
  let east = DVec3::new(-slon, clon, 0.0);
  let north = normal.cross(east);
  let basis = DMat3::from_cols(east, north, normal);
  (DQuat::from_mat3(&basis).normalize(), normal)
}

/// A frame resolved against the current anchor poses.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
  /// Origin in local space.
  pub center: DVec3,
  /// Frame-to-world rotation.
  pub orientation: DQuat,
  /// Global reference point the local space is relative to.
  pub reference: DVec3,
}

impl Default for Frame {
  fn default() -> Self {
    Self::IDENTITY
  }
}

impl Frame {
  pub const IDENTITY: Frame = Frame {
    center: DVec3::ZERO,
    orientation: DQuat::IDENTITY,
    reference: DVec3::ZERO,
  };

  fn centered_on(pose: &FramePose, orientation: DQuat) -> Self {
    Self {
      center: pose.local,
      orientation,
      reference: pose.global,
    }
  }

  /// Resolve a base frame. Fails only when the bound anchor is unknown.
  pub fn resolve_base(base: BaseFrame, poses: &impl FramePoses) -> SceneResult<Self> {
    let pose = |a: AnchorId| poses.frame_pose(a).ok_or(SceneError::UnknownAnchor(a));
    Ok(match base {
      BaseFrame::Ecliptic => Self::IDENTITY,
      BaseFrame::Equator => Self {
        orientation: equator_rotation(),
        ..Self::IDENTITY
      },
      BaseFrame::Orbit(a) => Self::centered_on(&pose(a)?, DQuat::IDENTITY),
      BaseFrame::Equatorial(a) => {
        let p = pose(a)?;
        Self::centered_on(&p, p.equatorial_orientation)
      }
      BaseFrame::Synchronous(a) => {
        let p = pose(a)?;
        Self::centered_on(&p, p.orientation)
      }
    })
  }

  /// Resolve any frame spec.
  pub fn resolve(spec: &FrameSpec, poses: &impl FramePoses) -> SceneResult<Self> {
    match *spec {
      FrameSpec::Base(base) => Self::resolve_base(base, poses),
      FrameSpec::Celestial { base, ra, dec, node } => {
        let frame = Self::resolve_base(base, poses)?;
        Ok(Self {
          orientation: (frame.orientation * celestial_rotation(ra, dec, node)).normalize(),
          ..frame
        })
      }
      FrameSpec::Surface {
        body,
        longitude,
        latitude,
      } => {
        let p = poses.frame_pose(body).ok_or(SceneError::UnknownAnchor(body))?;
        let (basis, normal) = surface_basis(longitude, latitude);
        Ok(Self {
          center: p.local + p.orientation * (normal * p.radius),
          orientation: (p.orientation * basis).normalize(),
          reference: p.global,
        })
      }
    }
  }
}

impl ReferenceFrame for Frame {
  #[inline]
  fn local_from_frame(&self, p: DVec3) -> DVec3 {
    self.center + self.orientation * p
  }

  #[inline]
  fn frame_from_local(&self, p: DVec3) -> DVec3 {
    self.orientation.inverse() * (p - self.center)
  }

  #[inline]
  fn absolute_orientation(&self, q: DQuat) -> DQuat {
    self.orientation * q
  }

  #[inline]
  fn frame_orientation(&self, q: DQuat) -> DQuat {
    self.orientation.inverse() * q
  }

  #[inline]
  fn absolute_reference_point(&self) -> DVec3 {
    self.reference
  }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod frame_test;
