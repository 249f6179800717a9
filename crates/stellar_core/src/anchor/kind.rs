//! Anchor identifiers and kind bitmask.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Index of an anchor in its arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct AnchorId(pub u32);

impl AnchorId {
  /// Placeholder for anchors not yet inserted into an arena.
  pub const INVALID: AnchorId = AnchorId(u32::MAX);

  #[inline]
  pub fn index(self) -> usize {
    self.0 as usize
  }

  /// Get the raw ID value.
  #[inline]
  pub fn raw(self) -> u32 {
    self.0
  }
}

impl fmt::Display for AnchorId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Set of anchor kinds. Kinds compose with `|`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AnchorKind(u16);

impl AnchorKind {
  pub const EMPTY: AnchorKind = AnchorKind(0);
  pub const EMISSIVE: AnchorKind = AnchorKind(1 << 0);
  pub const REFLECTIVE: AnchorKind = AnchorKind(1 << 1);
  pub const SYSTEM: AnchorKind = AnchorKind(1 << 2);
  pub const OCTREE: AnchorKind = AnchorKind(1 << 3);
  pub const UNIVERSE: AnchorKind = AnchorKind(1 << 4);
  pub const CARTESIAN: AnchorKind = AnchorKind(1 << 5);
  pub const OBSERVER: AnchorKind = AnchorKind(1 << 6);
  pub const CAMERA: AnchorKind = AnchorKind(1 << 7);

  const NAMES: [(AnchorKind, &'static str); 8] = [
    (Self::EMISSIVE, "emissive"),
    (Self::REFLECTIVE, "reflective"),
    (Self::SYSTEM, "system"),
    (Self::OCTREE, "octree"),
    (Self::UNIVERSE, "universe"),
    (Self::CARTESIAN, "cartesian"),
    (Self::OBSERVER, "observer"),
    (Self::CAMERA, "camera"),
  ];

  #[inline]
  pub const fn bits(self) -> u16 {
    self.0
  }

  /// True when every bit of `other` is set.
  #[inline]
  pub const fn contains(self, other: AnchorKind) -> bool {
    self.0 & other.0 == other.0
  }

  /// True when any bit of `other` is set.
  #[inline]
  pub const fn intersects(self, other: AnchorKind) -> bool {
    self.0 & other.0 != 0
  }

  #[inline]
  pub const fn is_empty(self) -> bool {
    self.0 == 0
  }

  /// `self | other`, usable in constants.
  #[inline]
  pub const fn union(self, other: AnchorKind) -> AnchorKind {
    AnchorKind(self.0 | other.0)
  }

  /// Parse a single kind name (`emissive`, `reflective`, ...).
  pub fn from_name(name: &str) -> Option<AnchorKind> {
    let lower = name.trim().to_ascii_lowercase();
    Self::NAMES
      .iter()
      .find(|(_, n)| *n == lower)
      .map(|(k, _)| *k)
  }
}

impl BitOr for AnchorKind {
  type Output = AnchorKind;

  #[inline]
  fn bitor(self, rhs: AnchorKind) -> AnchorKind {
    AnchorKind(self.0 | rhs.0)
  }
}

impl BitOrAssign for AnchorKind {
  #[inline]
  fn bitor_assign(&mut self, rhs: AnchorKind) {
    self.0 |= rhs.0;
  }
}

impl BitAnd for AnchorKind {
  type Output = AnchorKind;

  #[inline]
  fn bitand(self, rhs: AnchorKind) -> AnchorKind {
    AnchorKind(self.0 & rhs.0)
  }
}

impl fmt::Debug for AnchorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.is_empty() {
      return f.write_str("AnchorKind(empty)");
    }
    let names: Vec<&str> = Self::NAMES
      .iter()
      .filter(|(k, _)| self.contains(*k))
      .map(|(_, n)| *n)
      .collect();
    write!(f, "AnchorKind({})", names.join("|"))
  }
}
