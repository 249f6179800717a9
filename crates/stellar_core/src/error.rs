//! Error types surfaced by the scene core.
//!
//! Only catalog and configuration loading can fail. Per-frame work clamps
//! numerical degeneracies locally and never returns an error.

use std::path::PathBuf;

use thiserror::Error;

use crate::anchor::AnchorId;

/// Errors raised while loading configuration or building the catalog.
#[derive(Debug, Error)]
pub enum SceneError {
  /// The catalog is inconsistent: unknown frame name, units out of range,
  /// a designated primary that is not a child of its system, etc.
  #[error("invalid catalog: {0}")]
  InvalidCatalog(String),

  /// A configuration value is out of range or contradicts another.
  #[error("invalid configuration: {0}")]
  InvalidConfig(String),

  /// An anchor id that does not exist in the arena.
  #[error("unknown anchor {0:?}")]
  UnknownAnchor(AnchorId),

  /// Failed to read a configuration file.
  #[error("failed to read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// Configuration TOML did not parse.
  #[error("failed to parse configuration: {0}")]
  ConfigParse(#[from] toml::de::Error),
}

impl SceneError {
  /// Shorthand for an [`SceneError::InvalidCatalog`] with a formatted reason.
  pub fn catalog(reason: impl Into<String>) -> Self {
    Self::InvalidCatalog(reason.into())
  }

  /// Shorthand for an [`SceneError::InvalidConfig`] with a formatted reason.
  pub fn config(reason: impl Into<String>) -> Self {
    Self::InvalidConfig(reason.into())
  }
}

/// Result alias for scene-core operations.
pub type SceneResult<T> = Result<T, SceneError>;

/// Error returned by a presentation collaborator callback.
#[derive(Debug, Error)]
#[error("presentation callback failed for {anchor:?}: {reason}")]
pub struct PresentationError {
  /// Anchor whose transition the collaborator rejected.
  pub anchor: AnchorId,
  /// Collaborator-supplied reason.
  pub reason: String,
}

impl PresentationError {
  pub fn new(anchor: AnchorId, reason: impl Into<String>) -> Self {
    Self {
      anchor,
      reason: reason.into(),
    }
  }
}
