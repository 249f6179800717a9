//! Depth scaling - compresses astronomical distances into render space.
//!
//! ```text
//!   D = |r| / scene_scale
//!
//!   D <= M        linear       D
//!   D >  M        inverse      M + M (1 - M/D)
//!                 logarithmic  M + M (1 - log2(M/D + 1))
//! ```
//!
//! Both compressed curves meet the linear one at the midplane `M` and
//! approach `2M` at infinity, so the whole sky fits in a fixed far window.
//! Direction is always preserved.

use glam::DVec3;

/// Far-field remapping mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DepthScaling {
  /// Identity: render distance equals world distance over `scene_scale`.
  Linear,
  /// Hyperbolic compression beyond the midplane.
  #[default]
  Inverse,
  /// Base-2 logarithmic compression beyond the midplane.
  Logarithmic,
}

/// Result of remapping one observer-relative position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthRemap {
  /// Render-space position relative to the camera.
  pub position: DVec3,
  /// `|position|`
  pub distance: f64,
  /// Render units per kilometre at this depth.
  pub scale_factor: f64,
}

impl DepthScaling {
  pub fn name(self) -> &'static str {
    match self {
      DepthScaling::Linear => "linear",
      DepthScaling::Inverse => "inverse",
      DepthScaling::Logarithmic => "logarithmic",
    }
  }

  /// Render distance for a scaled distance `d` (already divided by
  /// `scene_scale`).
  #[inline]
  pub fn compress(self, d: f64, midplane: f64) -> f64 {
    if d <= midplane {
      return d;
    }
    match self {
      DepthScaling::Linear => d,
      DepthScaling::Inverse => midplane + midplane * (1.0 - midplane / d),
      DepthScaling::Logarithmic => midplane + midplane * (1.0 - (midplane / d + 1.0).log2()),
    }
  }

  /// Remap `rel` (km, observer-relative) into render space.
  ///
  /// A zero vector stays at the camera with the linear scale factor.
  pub fn remap(self, rel: DVec3, midplane: f64, scene_scale: f64) -> DepthRemap {
    let linear_factor = 1.0 / scene_scale;
    let d = rel.length() * linear_factor;
    if d <= midplane || self == DepthScaling::Linear || !d.is_finite() {
      return DepthRemap {
        position: rel * linear_factor,
        distance: d,
        scale_factor: linear_factor,
      };
    }

    let render = self.compress(d, midplane);
    let scale_factor = render / (d * scene_scale);
    DepthRemap {
      position: rel * scale_factor,
      distance: render,
      scale_factor,
    }
  }
}

/// Sampled depth curve for collaborators that apply the remap on the GPU.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthLookupTable {
  pub mode: DepthScaling,
  pub midplane: f64,
  /// Scaled distance of the last sample.
  pub max_distance: f64,
  /// Render distances at evenly spaced scaled distances `0..=max_distance`.
  pub values: Vec<f32>,
}

impl DepthLookupTable {
  /// Interpolated render distance for scaled distance `d`, clamped to the
  /// table range.
  pub fn sample(&self, d: f64) -> f64 {
    let Some(last) = self.values.len().checked_sub(1).filter(|l| *l > 0) else {
      return self.values.first().map(|v| *v as f64).unwrap_or(0.0);
    };
    let t = (d / self.max_distance).clamp(0.0, 1.0) * last as f64;
    let i = (t.floor() as usize).min(last - 1);
    let frac = t - i as f64;
    let a = self.values[i] as f64;
    let b = self.values[i + 1] as f64;
    a + (b - a) * frac
  }
}

/// Sample the depth curve of `mode` at `samples` evenly spaced scaled
/// distances up to `max_distance`.
pub fn lookup_table(mode: DepthScaling, midplane: f64, max_distance: f64, samples: usize) -> DepthLookupTable {
  let samples = samples.max(2);
  let step = max_distance / (samples - 1) as f64;
  let values = (0..samples)
    .map(|i| mode.compress(i as f64 * step, midplane) as f32)
    .collect();
  DepthLookupTable {
    mode,
    midplane,
    max_distance,
    values,
  }
}

#[cfg(test)]
#[path = "depth_scaling_test.rs"]
mod depth_scaling_test;
