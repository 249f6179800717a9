//! Visibility transitions - edges between two frames' visible sets.
//!
//! ```text
//!             Visible                Resolved
//!  HIDDEN ──────────────▶ VISIBLE ──────────────▶ RESOLVED
//!     ▲        Hidden        ▲        Point          │
//!     └──────────────────    └───────────────────────┘
//! ```
//!
//! Events are derived from set differences only, so each edge fires once
//! no matter how often the frame state is inspected.

use std::collections::BTreeSet;

use crate::anchor::AnchorId;

/// Lifecycle callback to deliver for one anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TransitionEvent {
  /// Became visible as a point.
  Visible,
  /// Became resolved (from hidden or from a point).
  Resolved,
  /// Stopped being resolved.
  Point,
  /// Stopped being visible.
  Hidden,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
  pub anchor: AnchorId,
  pub event: TransitionEvent,
}

/// Visible and resolved anchors of one frame. `resolved` is a subset of
/// `visible`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VisibilitySets {
  pub visible: BTreeSet<AnchorId>,
  pub resolved: BTreeSet<AnchorId>,
}

impl VisibilitySets {
  pub fn insert(&mut self, anchor: AnchorId, resolved: bool) {
    self.visible.insert(anchor);
    if resolved {
      self.resolved.insert(anchor);
    }
  }

  pub fn remove(&mut self, anchor: AnchorId) {
    self.visible.remove(&anchor);
    self.resolved.remove(&anchor);
  }

  pub fn clear(&mut self) {
    self.visible.clear();
    self.resolved.clear();
  }
}

/// Set differences between two consecutive frames.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransitionSet {
  pub becoming_visible: Vec<AnchorId>,
  pub no_longer_visible: Vec<AnchorId>,
  pub becoming_resolved: Vec<AnchorId>,
  pub no_longer_resolved: Vec<AnchorId>,
  /// Callbacks in delivery order.
  pub events: Vec<Transition>,
}

impl TransitionSet {
  pub fn between(old: &VisibilitySets, new: &VisibilitySets) -> Self {
    let becoming_visible: Vec<AnchorId> = new.visible.difference(&old.visible).copied().collect();
    let no_longer_visible: Vec<AnchorId> = old.visible.difference(&new.visible).copied().collect();
    let becoming_resolved: Vec<AnchorId> = new.resolved.difference(&old.resolved).copied().collect();
    let no_longer_resolved: Vec<AnchorId> = old.resolved.difference(&new.resolved).copied().collect();

    let mut events = Vec::with_capacity(
      becoming_visible.len() + 2 * no_longer_visible.len() + becoming_resolved.len() + no_longer_resolved.len(),
    );
    for &anchor in &becoming_visible {
      let event = if new.resolved.contains(&anchor) {
        TransitionEvent::Resolved
      } else {
        TransitionEvent::Visible
      };
      events.push(Transition { anchor, event });
    }
    for &anchor in &no_longer_visible {
      if old.resolved.contains(&anchor) {
        events.push(Transition {
          anchor,
          event: TransitionEvent::Point,
        });
      }
      events.push(Transition {
        anchor,
        event: TransitionEvent::Hidden,
      });
    }
    // Resolution-only edges of anchors that stayed visible.
    for &anchor in &becoming_resolved {
      if old.visible.contains(&anchor) {
        events.push(Transition {
          anchor,
          event: TransitionEvent::Resolved,
        });
      }
    }
    for &anchor in &no_longer_resolved {
      if new.visible.contains(&anchor) {
        events.push(Transition {
          anchor,
          event: TransitionEvent::Point,
        });
      }
    }

    Self {
      becoming_visible,
      no_longer_visible,
      becoming_resolved,
      no_longer_resolved,
      events,
    }
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.events.is_empty()
  }

  /// Outbound view grouped by event.
  pub fn summary(&self) -> TransitionSummary {
    let mut summary = TransitionSummary::default();
    for t in &self.events {
      match t.event {
        TransitionEvent::Visible => summary.newly_visible.push(t.anchor),
        TransitionEvent::Resolved => summary.newly_resolved.push(t.anchor),
        TransitionEvent::Point => summary.newly_point.push(t.anchor),
        TransitionEvent::Hidden => summary.newly_hidden.push(t.anchor),
      }
    }
    summary
  }
}

/// Transitions of one frame as handed to the renderer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TransitionSummary {
  pub newly_visible: Vec<AnchorId>,
  pub newly_resolved: Vec<AnchorId>,
  pub newly_point: Vec<AnchorId>,
  pub newly_hidden: Vec<AnchorId>,
}

impl TransitionSummary {
  pub fn is_empty(&self) -> bool {
    self.newly_visible.is_empty()
      && self.newly_resolved.is_empty()
      && self.newly_point.is_empty()
      && self.newly_hidden.is_empty()
  }
}

#[cfg(test)]
#[path = "transition_test.rs"]
mod transition_test;
