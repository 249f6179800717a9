//! OctreeConfig - shape of the luminosity octree.
//!
//! Thresholds live in luminosity space. Each level down is `child_factor`
//! times dimmer than its parent and half as wide.

use serde::Deserialize;

use crate::constants::{
  OCTREE_CHILD_FACTOR, OCTREE_MAX_LEAVES, OCTREE_MAX_LEVEL, OCTREE_ROOT_ABS_MAGNITUDE,
  OCTREE_ROOT_WIDTH,
};
use crate::error::{SceneError, SceneResult};
use crate::magnitude::luminosity_from_abs_mag;

/// Configuration for luminosity octree subdivision.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OctreeConfig {
  /// Leaf count at which a childless node splits.
  pub max_leaves: usize,

  /// Deepest level a node may split at.
  pub max_level: u32,

  /// Threshold multiplier per level: child = parent * child_factor.
  pub child_factor: f64,

  /// Root node luminosity threshold in watts.
  pub root_threshold: f64,

  /// Root cube edge length in km, centred on the world origin.
  pub root_width: f64,
}

impl OctreeConfig {
  /// Luminosity threshold at `level`.
  /// threshold = root_threshold * child_factor^level
  #[inline]
  pub fn get_threshold(&self, level: u32) -> f64 {
    self.root_threshold * self.child_factor.powi(level as i32)
  }

  /// Cube edge length at `level`.
  /// width = root_width / 2^level
  #[inline]
  pub fn get_width(&self, level: u32) -> f64 {
    self.root_width * 0.5f64.powi(level as i32)
  }

  /// Radius of the sphere circumscribing a cube of edge `width`.
  #[inline]
  pub fn get_radius(width: f64) -> f64 {
    width * 3f64.sqrt() * 0.5
  }

  /// Whether a node at `level` holding `leaf_count` leaves should split.
  #[inline]
  pub fn should_split(&self, level: u32, leaf_count: usize) -> bool {
    leaf_count >= self.max_leaves && level < self.max_level
  }

  pub fn validate(&self) -> SceneResult<()> {
    if self.max_leaves == 0 {
      return Err(SceneError::config("octree.max_leaves must be > 0"));
    }
    if !(self.child_factor > 0.0 && self.child_factor < 1.0) {
      return Err(SceneError::config(format!(
        "octree.child_factor must be in (0, 1), got {}",
        self.child_factor
      )));
    }
    if !(self.root_threshold.is_finite() && self.root_threshold > 0.0) {
      return Err(SceneError::config(format!(
        "octree.root_threshold must be positive, got {}",
        self.root_threshold
      )));
    }
    if !(self.root_width.is_finite() && self.root_width > 0.0) {
      return Err(SceneError::config(format!(
        "octree.root_width must be positive, got {}",
        self.root_width
      )));
    }
    Ok(())
  }
}

impl Default for OctreeConfig {
  fn default() -> Self {
    Self {
      max_leaves: OCTREE_MAX_LEAVES,
      max_level: OCTREE_MAX_LEVEL,
      child_factor: OCTREE_CHILD_FACTOR,
      root_threshold: luminosity_from_abs_mag(OCTREE_ROOT_ABS_MAGNITUDE),
      root_width: OCTREE_ROOT_WIDTH,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
