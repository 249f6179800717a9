//! Frame handoff - publishes finished frames to a render thread.
//!
//! ```text
//! frame thread                         render thread
//! ┌──────────────────┐
//! │ StellarWorld     │
//! │ update()         │
//! └────────┬─────────┘
//!          │ publish(FrameOutput)
//!          ▼
//!   bounded channel (stale frame replaced)
//!          │
//!          ▼                            ┌──────────────────┐
//!                                       │ FrameReceiver    │
//!                                       │ latest()         │
//!                                       └──────────────────┘
//! ```
//!
//! The render thread only ever wants the newest frame, so publishing into a
//! full channel evicts the frame nobody picked up.

use std::time::Duration;

use crossbeam_channel::{self as channel, Receiver, RecvTimeoutError, Sender, TrySendError};
use glam::Mat4;

use crate::anchor::AnchorId;
use crate::scene::SceneAnchorId;
use crate::transition::TransitionSummary;
use crate::world::{FrameStats, WorldId};

/// One resolved anchor as the renderer sees it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Renderable {
  pub scene_anchor_id: SceneAnchorId,
  pub anchor: AnchorId,
  pub render_transform: Mat4,
  pub scale_factor: f32,
  /// Depth along the camera axis in km, for LOD selection.
  pub lod_distance: f64,
}

/// Everything the renderer needs from one frame.
#[derive(Clone, Debug, Default)]
pub struct FrameOutput {
  /// World that produced the frame.
  pub world: WorldId,
  pub update_id: u64,
  /// Simulation time of the frame.
  pub time: f64,
  /// Resolved anchors, farthest first.
  pub renderables: Vec<Renderable>,
  pub transitions: TransitionSummary,
  pub stats: FrameStats,
}

/// Sending half, owned by the frame thread.
#[derive(Debug, Clone)]
pub struct FrameHandoff {
  sender: Sender<FrameOutput>,
  // Used to evict the stale frame when the channel is full.
  drain: Receiver<FrameOutput>,
}

/// Receiving half, owned by the render thread.
#[derive(Debug, Clone)]
pub struct FrameReceiver {
  receiver: Receiver<FrameOutput>,
}

impl FrameHandoff {
  /// Channel holding up to `capacity` unconsumed frames (at least one).
  pub fn new(capacity: usize) -> (Self, FrameReceiver) {
    let (sender, receiver) = channel::bounded(capacity.max(1));
    (
      Self {
        sender,
        drain: receiver.clone(),
      },
      FrameReceiver { receiver },
    )
  }

  /// Publish `output`, replacing the oldest unconsumed frame if full.
  pub fn publish(&self, output: FrameOutput) {
    let mut output = output;
    loop {
      match self.sender.try_send(output) {
        Ok(()) => return,
        Err(TrySendError::Full(rejected)) => {
          if self.drain.try_recv().is_ok() {
            tracing::trace!("replaced unconsumed frame");
          }
          output = rejected;
        }
        // `drain` keeps the channel connected
        Err(TrySendError::Disconnected(_)) => return,
      }
    }
  }
}

impl FrameReceiver {
  /// Newest published frame, discarding older ones (non-blocking).
  pub fn latest(&self) -> Option<FrameOutput> {
    self.receiver.try_iter().last()
  }

  /// Wait up to `timeout` for the next frame.
  pub fn recv_timeout(&self, timeout: Duration) -> Option<FrameOutput> {
    match self.receiver.recv_timeout(timeout) {
      Ok(frame) => Some(frame),
      Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
    }
  }
}
