//! Engine-agnostic metrics collection for scene statistics.
//!
//! Feature-gated and runtime-toggled to ensure zero overhead when disabled.
//!
//! # Usage
//!
//! ```ignore
//! use stellar_core::metrics::{FrameMetrics, COLLECT_METRICS};
//!
//! // Compile with --features metrics
//! // Runtime toggle:
//! COLLECT_METRICS.store(false, Ordering::Relaxed);
//!
//! // After each frame:
//! let frame = world.metrics();
//! println!("{:.1} us/frame", frame.avg_frame_timing_us());
//! ```

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;

use web_time::Instant;

use crate::world::FrameStats;

/// Runtime toggle for metrics collection.
/// Set to false to disable metrics gathering at runtime.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
    #[cfg(feature = "metrics")]
    {
        COLLECT_METRICS.load(Ordering::Relaxed)
    }
    #[cfg(not(feature = "metrics"))]
    {
        false
    }
}

/// Microsecond stopwatch.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch(Instant);

impl Stopwatch {
    pub fn start() -> Self {
        Self(Instant::now())
    }

    pub fn elapsed_us(&self) -> u64 {
        self.0.elapsed().as_micros() as u64
    }
}

/// Rolling window for storing recent values (e.g., timing history).
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingWindow<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push a new value, evicting the oldest if at capacity.
    pub fn push(&mut self, value: T) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Iterate over values (oldest to newest).
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    /// Most recent value.
    pub fn last(&self) -> Option<&T> {
        self.buffer.back()
    }
}

impl<T: Copy + Default + std::ops::Add<Output = T>> RollingWindow<T> {
    pub fn sum(&self) -> T {
        self.buffer.iter().copied().fold(T::default(), |acc, x| acc + x)
    }
}

impl RollingWindow<u64> {
    pub fn average(&self) -> f64 {
        if self.buffer.is_empty() {
            0.0
        } else {
            self.sum() as f64 / self.buffer.len() as f64
        }
    }

    pub fn min_max(&self) -> Option<(u64, u64)> {
        let min = *self.buffer.iter().min()?;
        let max = *self.buffer.iter().max()?;
        Some((min, max))
    }
}

impl Default for RollingWindow<u64> {
    fn default() -> Self {
        Self::new(128) // ~2 seconds at 60fps
    }
}

/// Scene statistics updated every frame.
#[derive(Debug, Clone)]
pub struct FrameMetrics {
    // Timing
    /// Whole-frame update times in microseconds.
    pub frame_timings: RollingWindow<u64>,
    /// Visible-objects traversal times in microseconds.
    pub traversal_timings: RollingWindow<u64>,

    // Counts
    /// Candidates per frame.
    pub candidates: RollingWindow<u64>,
    /// Octree nodes pruned per frame.
    pub nodes_pruned: RollingWindow<u64>,

    // Last frame snapshot (for UI)
    pub last_frame_us: u64,
    pub last_visible: usize,
    pub last_resolved: usize,
    /// Total frames recorded this session.
    pub total_frames: u64,
    /// Total lifecycle callbacks that failed this session.
    pub total_callback_failures: u64,
}

impl Default for FrameMetrics {
    fn default() -> Self {
        Self {
            frame_timings: RollingWindow::default(),
            traversal_timings: RollingWindow::default(),
            candidates: RollingWindow::default(),
            nodes_pruned: RollingWindow::default(),
            last_frame_us: 0,
            last_visible: 0,
            last_resolved: 0,
            total_frames: 0,
            total_callback_failures: 0,
        }
    }
}

impl FrameMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset all metrics except the session totals.
    pub fn reset(&mut self) {
        self.frame_timings.clear();
        self.traversal_timings.clear();
        self.candidates.clear();
        self.nodes_pruned.clear();
        self.last_frame_us = 0;
        self.last_visible = 0;
        self.last_resolved = 0;
    }

    /// Record one finished frame.
    pub fn record_frame(&mut self, stats: &FrameStats, frame_us: u64, traversal_us: u64) {
        if !is_enabled() {
            return;
        }
        self.frame_timings.push(frame_us);
        self.traversal_timings.push(traversal_us);
        self.candidates.push(stats.candidates as u64);
        self.nodes_pruned.push(stats.traversal.nodes_pruned as u64);
        self.last_frame_us = frame_us;
        self.last_visible = stats.visible;
        self.last_resolved = stats.resolved;
        self.total_frames += 1;
        self.total_callback_failures += stats.callback_failures as u64;
    }

    pub fn avg_frame_timing_us(&self) -> f64 {
        self.frame_timings.average()
    }

    pub fn avg_traversal_timing_us(&self) -> f64 {
        self.traversal_timings.average()
    }
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;
    use crate::octree::TraversalStats;

    #[test]
    fn test_rolling_window() {
        let mut window = RollingWindow::new(3);
        assert!(window.is_empty());

        window.push(10u64);
        window.push(20);
        window.push(30);
        assert_eq!(window.average(), 20.0);

        // Oldest evicted
        window.push(40);
        assert_eq!(window.len(), 3);
        assert_eq!(window.sum(), 90);
        assert_eq!(window.min_max(), Some((20, 40)));
        assert_eq!(window.last(), Some(&40));
    }

    #[test]
    fn test_record_frame() {
        let mut metrics = FrameMetrics::new();
        let stats = FrameStats {
            candidates: 12,
            visible: 10,
            resolved: 2,
            callback_failures: 1,
            traversal: TraversalStats {
                nodes_visited: 5,
                nodes_pruned: 3,
                leaves_tested: 40,
            },
            ..FrameStats::default()
        };
        metrics.record_frame(&stats, 1000, 400);
        metrics.record_frame(&stats, 3000, 600);

        assert_eq!(metrics.total_frames, 2);
        assert_eq!(metrics.avg_frame_timing_us(), 2000.0);
        assert_eq!(metrics.avg_traversal_timing_us(), 500.0);
        assert_eq!(metrics.last_visible, 10);
        assert_eq!(metrics.nodes_pruned.sum(), 6);
        assert_eq!(metrics.total_callback_failures, 2);

        metrics.reset();
        assert!(metrics.frame_timings.is_empty());
        assert_eq!(metrics.total_frames, 2, "session totals survive reset");
    }
}
