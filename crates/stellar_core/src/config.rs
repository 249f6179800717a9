//! SceneConfig - options recognized by the scene core.
//!
//! Loaded from TOML (every field optional, defaults below) and validated
//! before a world is built.
//!
//! ```toml
//! camera_at_origin = true
//! use_depth_scaling = true
//! use_log_scaling = true        # exclusive with use_inv_scaling
//! midplane = 1000.0
//! min_body_size = 1.0
//! lowest_app_magnitude = 6.5
//!
//! [octree]
//! max_leaves = 75
//! max_level = 200
//! child_factor = 0.25
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::constants::{
  DEFAULT_LOOKUP_TABLE_SAMPLES, DEFAULT_LOWEST_APP_MAGNITUDE, DEFAULT_MIDPLANE,
  DEFAULT_MIN_BODY_SIZE, DEFAULT_SCENE_SCALE,
};
use crate::error::{SceneError, SceneResult};
use crate::octree::OctreeConfig;
use crate::scene::DepthScaling;

/// Options recognized by the scene core.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SceneConfig {
  /// Render positions relative to the observer (true) or to the world
  /// origin (false).
  pub camera_at_origin: bool,

  /// Master enable for the far-field depth remapping.
  pub use_depth_scaling: bool,

  /// Hyperbolic far-field remapping. Default when neither flag is set.
  pub use_inv_scaling: Option<bool>,

  /// Base-2 logarithmic far-field remapping.
  pub use_log_scaling: Option<bool>,

  /// Render-space distance where scaling switches from linear to compressed.
  pub midplane: f64,

  /// World kilometres per render unit.
  pub scene_scale: f64,

  /// Visible size (pixels) above which a body is resolved.
  pub min_body_size: f64,

  /// Faintest apparent magnitude collected as a point.
  pub lowest_app_magnitude: f64,

  /// Render large resolved bodies about the surface point under the
  /// observer instead of their centre.
  pub offset_body_center: bool,

  /// Sample count for generated depth lookup tables.
  pub lookup_table_samples: usize,

  /// Luminosity octree shape.
  pub octree: OctreeConfig,
}

impl Default for SceneConfig {
  fn default() -> Self {
    Self {
      camera_at_origin: true,
      use_depth_scaling: true,
      use_inv_scaling: None,
      use_log_scaling: None,
      midplane: DEFAULT_MIDPLANE,
      scene_scale: DEFAULT_SCENE_SCALE,
      min_body_size: DEFAULT_MIN_BODY_SIZE,
      lowest_app_magnitude: DEFAULT_LOWEST_APP_MAGNITUDE,
      offset_body_center: true,
      lookup_table_samples: DEFAULT_LOOKUP_TABLE_SAMPLES,
      octree: OctreeConfig::default(),
    }
  }
}

impl SceneConfig {
  /// Parse and validate a configuration from TOML text.
  pub fn from_toml_str(text: &str) -> SceneResult<Self> {
    let config: SceneConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
  }

  /// Load and validate a configuration file.
  pub fn load(path: &Path) -> SceneResult<Self> {
    let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
      path: path.to_path_buf(),
      source,
    })?;
    Self::from_toml_str(&text)
  }

  /// Reject contradictory or out-of-range values.
  pub fn validate(&self) -> SceneResult<()> {
    if self.use_inv_scaling == Some(true) && self.use_log_scaling == Some(true) {
      return Err(SceneError::config(
        "use_inv_scaling and use_log_scaling are mutually exclusive",
      ));
    }
    if !(self.midplane.is_finite() && self.midplane > 0.0) {
      return Err(SceneError::config(format!(
        "midplane must be positive, got {}",
        self.midplane
      )));
    }
    if !(self.scene_scale.is_finite() && self.scene_scale > 0.0) {
      return Err(SceneError::config(format!(
        "scene_scale must be positive, got {}",
        self.scene_scale
      )));
    }
    if !(self.min_body_size.is_finite() && self.min_body_size >= 0.0) {
      return Err(SceneError::config(format!(
        "min_body_size must be >= 0, got {}",
        self.min_body_size
      )));
    }
    if !self.lowest_app_magnitude.is_finite() {
      return Err(SceneError::config("lowest_app_magnitude must be finite"));
    }
    if self.lookup_table_samples < 2 {
      return Err(SceneError::config(format!(
        "lookup_table_samples must be >= 2, got {}",
        self.lookup_table_samples
      )));
    }
    self.octree.validate()
  }

  /// Depth remapping selected by the scaling flags.
  pub fn depth_scaling(&self) -> DepthScaling {
    if !self.use_depth_scaling {
      return DepthScaling::Linear;
    }
    match (self.use_inv_scaling, self.use_log_scaling) {
      (_, Some(true)) if self.use_inv_scaling != Some(true) => DepthScaling::Logarithmic,
      (Some(false), _) => DepthScaling::Linear,
      _ => DepthScaling::Inverse,
    }
  }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
