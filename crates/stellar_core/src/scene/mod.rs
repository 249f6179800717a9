//! Render space - depth scaling and scene anchors.
//!
//! ```text
//!   world (f64, km)                        render (f32)
//!   anchor.observer.rel_position ──remap──► scene_position
//!                                           scene_scale_factor
//! ```
//!
//! # Module Structure
//!
//! - [`depth_scaling`] - linear, inverse and logarithmic remapping, lookup
//!   tables
//! - [`scene_anchor`] - per-anchor render transform and the visible set

pub mod depth_scaling;
pub mod scene_anchor;

pub use depth_scaling::{lookup_table, DepthLookupTable, DepthRemap, DepthScaling};
pub use scene_anchor::{SceneAnchor, SceneAnchorId, SceneAnchors, ScenePlacement};
