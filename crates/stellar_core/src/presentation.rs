//! Presentation - callback interfaces for the renderer and body providers.
//!
//! These traits let the scene core notify engine-specific code about anchor
//! lifecycle events without depending on any engine. Callbacks run on the
//! frame thread inside [`StellarWorld::update`](crate::world::StellarWorld::update).

use std::collections::HashMap;

use crate::anchor::{Anchor, AnchorId};
use crate::error::PresentationError;
use crate::scene::SceneAnchor;

/// Result of a presentation callback.
pub type PresentationResult = Result<(), PresentationError>;

/// Lifecycle callbacks for the renderer.
///
/// A callback that returns an error is logged and the anchor is withheld
/// from the visible set on the next frame.
///
/// # Example
///
/// ```ignore
/// struct StarfieldPresentation { points: PointBuffer }
///
/// impl PresentationLayer for StarfieldPresentation {
///     fn on_visible(&mut self, anchor: &Anchor) -> PresentationResult {
///         self.points.insert(anchor.id, anchor.apparent_magnitude());
///         Ok(())
///     }
///     // ...
/// }
/// ```
pub trait PresentationLayer {
  /// The anchor appeared as a point.
  fn on_visible(&mut self, anchor: &Anchor) -> PresentationResult;

  /// The anchor should be drawn as a shape.
  fn on_resolved(&mut self, anchor: &Anchor) -> PresentationResult;

  /// The anchor dropped back to a point.
  fn on_point(&mut self, anchor: &Anchor) -> PresentationResult;

  /// The anchor left the visible set.
  fn on_hidden(&mut self, anchor: &Anchor) -> PresentationResult;

  /// Per-frame LOD and instance update for a resolved anchor.
  fn update_body(&mut self, _anchor: &Anchor, _scene: &SceneAnchor) -> PresentationResult {
    Ok(())
  }
}

/// No-op implementation for testing and headless operation.
#[derive(Debug, Default)]
pub struct NullPresentation;

impl PresentationLayer for NullPresentation {
  fn on_visible(&mut self, _anchor: &Anchor) -> PresentationResult {
    Ok(())
  }

  fn on_resolved(&mut self, _anchor: &Anchor) -> PresentationResult {
    Ok(())
  }

  fn on_point(&mut self, _anchor: &Anchor) -> PresentationResult {
    Ok(())
  }

  fn on_hidden(&mut self, _anchor: &Anchor) -> PresentationResult {
    Ok(())
  }
}

// =============================================================================
// Surfaces
// =============================================================================

/// Surface query used for the observer's height above resolved bodies.
pub trait SurfaceProvider {
  /// Height of `observer_distance` (from the body centre) above the
  /// surface of `anchor`, or `None` when the body has no surface.
  fn height_under(&self, anchor: &Anchor, observer_distance: f64) -> Option<f64>;
}

/// Every body is a sphere of its bounding radius.
#[derive(Clone, Copy, Debug, Default)]
pub struct SphericalSurface;

impl SurfaceProvider for SphericalSurface {
  fn height_under(&self, anchor: &Anchor, observer_distance: f64) -> Option<f64> {
    if anchor.is_system() {
      return None;
    }
    Some((observer_distance - anchor.bounding_radius).max(0.0))
  }
}

/// Per-anchor surfaces registered by body providers. Anchors without an
/// entry have no surface.
#[derive(Clone, Debug, Default)]
pub struct SurfaceRegistry {
  radii: HashMap<AnchorId, f64>,
}

impl SurfaceRegistry {
  /// Register a spherical surface of `radius` km for `anchor`.
  pub fn insert(&mut self, anchor: AnchorId, radius: f64) {
    self.radii.insert(anchor, radius.max(0.0));
  }

  pub fn remove(&mut self, anchor: AnchorId) {
    self.radii.remove(&anchor);
  }
}

impl SurfaceProvider for SurfaceRegistry {
  fn height_under(&self, anchor: &Anchor, observer_distance: f64) -> Option<f64> {
    self
      .radii
      .get(&anchor.id)
      .map(|radius| (observer_distance - radius).max(0.0))
  }
}
