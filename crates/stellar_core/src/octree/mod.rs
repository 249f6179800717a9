//! Luminosity octree for magnitude-limited visibility queries.
//!
//! Unlike a plain spatial octree, placement depends on brightness: a leaf is
//! stored at the highest node whose threshold it reaches, so the brightest
//! stars of a region sit above the faint ones.
//!
//! # Threshold Convention
//!
//! Level 0 = root (brightest threshold, widest cube), higher level = dimmer
//! and smaller.
//!
//! ```text
//! threshold(level) = root_threshold * 0.25^level
//! width(level)     = root_width / 2^level
//! radius(level)    = width(level) * sqrt(3) / 2
//! ```
//!
//! # Module Structure
//!
//! - [`bounds`]: `DSphere` - double-precision bounding sphere
//! - [`config`]: `OctreeConfig` - thresholds, widths and split limits
//! - [`node`]: `OctreeNode`, `OctreeLeaf`, `NodeIndex`
//! - [`tree`]: `LuminosityOctree` - arena, insertion, removal, traversal
//! - [`visitor`]: `OctreeVisitor` - pre-order visitor protocol

pub mod bounds;
pub mod config;
pub mod node;
pub mod tree;
pub mod visitor;

// Re-exports
pub use bounds::DSphere;
pub use config::OctreeConfig;
pub use node::{NodeIndex, OctreeLeaf, OctreeNode};
pub use tree::LuminosityOctree;
pub use visitor::{OctreeVisitor, TraversalStats};
