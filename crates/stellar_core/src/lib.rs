//! stellar_core - Engine independent astronomical scene core
//!
//! Keeps a catalog of stars, planets and systems in absolute double
//! precision coordinates, indexes them in a luminosity octree and produces
//! per frame the set of anchors worth drawing, remapped into a single
//! precision render space.
//!
//! # Features
//!
//! - **Luminosity octree**: bright objects live near the root, faint ones
//!   deep down, so whole subtrees are skipped once they are too faint to
//!   see from the observer
//! - **Reference frames**: ecliptic, equatorial, celestial, orbit-bound,
//!   body-synchronous and surface-tangent frames
//! - **Visibility state machine**: visible / resolved transitions delivered
//!   to a presentation layer exactly once
//! - **Depth scaling**: linear, inverse or logarithmic compression of the
//!   far field beyond a midplane
//!
//! # Example
//!
//! ```ignore
//! use stellar_core::{SceneConfig, StellarWorld, NullPresentation};
//!
//! let mut world = StellarWorld::new(SceneConfig::default())?;
//! let sun = world.add_stellar_anchor(kind, orbit, rotation, L_SUN, 696_000.0, ["Sun"])?;
//! world.add_child(world.universe(), sun)?;
//! world.finish_catalog()?;
//!
//! let output = world.update(t, &mut NullPresentation, None);
//! for r in &output.renderables {
//!     draw(r.render_transform, r.lod_distance);
//! }
//! ```

pub mod constants;
pub mod error;
pub mod magnitude;
pub use error::{PresentationError, SceneError, SceneResult};

// Configuration
pub mod config;
pub use config::SceneConfig;

// Frames, motion and the observer
pub mod frame;
pub mod frustum;
pub mod motion;
pub mod observer;
pub use frame::{BaseFrame, Frame, FrameRecord, FrameSpec, ReferenceFrame};
pub use frustum::Frustum;
pub use motion::{CircularOrbit, FixedOrbit, FixedRotation, Orbit, Rotation, UniformRotation};
pub use observer::Observer;

// Catalog objects
pub mod anchor;
pub use anchor::{Anchor, AnchorArena, AnchorId, AnchorKind, AnchorPayload};

// Luminosity octree
pub mod octree;
pub use octree::{LuminosityOctree, OctreeConfig, OctreeLeaf, OctreeNode};

// Traversals over anchors and octrees
pub mod traverse;
pub use traverse::{traverse_anchors, AnchorVisitor, LightSourceTraverser, VisibleObjectsTraverser};

// Render-space mirror
pub mod scene;
pub use scene::{DepthScaling, SceneAnchor, SceneAnchorId};

// Per-frame aggregation
pub mod catalog;
pub mod transition;
pub mod world;
pub use transition::{TransitionEvent, TransitionSet, TransitionSummary};
pub use world::{FrameStats, StellarWorld, WorldId};

// Collaborators
pub mod presentation;
pub use presentation::{
  NullPresentation, PresentationLayer, SphericalSurface, SurfaceProvider, SurfaceRegistry,
};

// Hand-off to render threads and background work
pub mod deferred;
pub mod handoff;
pub use deferred::DeferredTask;
pub use handoff::{FrameHandoff, FrameOutput, FrameReceiver, Renderable};

// Frame statistics
pub mod metrics;
