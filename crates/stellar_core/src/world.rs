//! StellarWorld - the per-frame scene aggregator.
//!
//! Owns the anchor arena, the observer and the render-space mirror, and
//! drives one frame as a fixed sequence of phases:
//!
//! ```text
//!  0  apply pending catalog rebuilds
//!  1  update anchors at t (parents first, update_id += 1)
//!  2  refresh the observer pose from its frame
//!  3  reflected light of reflective bodies
//!  4  visible-objects traversal of the universe octree -> candidates
//!  5  observer caches (parallel) and visibility state per candidate
//!  6  transitions against the previous frame, lifecycle callbacks
//!  7  height of the observer above resolved bodies
//!  8  materialize / update / tear down scene anchors
//!  9  body LOD updates, renderables, handoff
//! ```
//!
//! Catalog construction lives in [`crate::catalog`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use glam::{DQuat, DVec3};
use rayon::prelude::*;

use crate::anchor::{Anchor, AnchorArena, AnchorId, AnchorKind, LightSource, ObserverCache};
use crate::config::SceneConfig;
use crate::error::SceneResult;
use crate::frame::FrameSpec;
use crate::frustum::Frustum;
use crate::handoff::{FrameOutput, Renderable};
use crate::metrics::{FrameMetrics, Stopwatch};
use crate::observer::Observer;
use crate::octree::TraversalStats;
use crate::presentation::{PresentationLayer, SurfaceProvider};
use crate::scene::{SceneAnchors, ScenePlacement};
use crate::transition::{TransitionEvent, TransitionSet, VisibilitySets};
use crate::traverse::{traverse_anchors, LightSourceTraverser, UpdateAllTraverser, VisibleObjectsTraverser};

// =============================================================================
// WorldId
// =============================================================================

static NEXT_WORLD: AtomicU64 = AtomicU64::new(1);

/// Tags the frames a world publishes, so a render thread fed by several
/// worlds can tell them apart. Live worlds never use 0; `WorldId::default()`
/// stands for "no world".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct WorldId(u64);

impl WorldId {
    fn next() -> Self {
        Self(NEXT_WORLD.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

// =============================================================================
// FrameStats
// =============================================================================

/// Counts gathered during one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub update_id: u64,
    /// Containers rebuilt at the start of the frame.
    pub rebuilt: usize,
    /// Anchors whose position changed.
    pub moved: usize,
    pub candidates: usize,
    pub visible: usize,
    pub resolved: usize,
    pub scene_anchors: usize,
    pub callback_failures: usize,
    pub traversal: TraversalStats,
}

// =============================================================================
// StellarWorld
// =============================================================================

/// One universe seen by one observer.
#[derive(Debug)]
pub struct StellarWorld {
    pub id: WorldId,
    pub(crate) config: SceneConfig,
    placement: ScenePlacement,
    pub(crate) arena: AnchorArena,
    observer: Observer,
    update_id: u64,
    time: f64,
    current: VisibilitySets,
    scene_anchors: SceneAnchors,
    /// Anchors whose callbacks failed; kept out of the visible set for one
    /// frame.
    withheld: BTreeSet<AnchorId>,
    /// Anchors with any visibility flag set after the last frame.
    tracked: BTreeSet<AnchorId>,
    transitions: TransitionSet,
    stats: FrameStats,
    metrics: FrameMetrics,
}

impl StellarWorld {
    /// Empty world holding only the universe.
    pub fn new(config: SceneConfig) -> SceneResult<Self> {
        config.validate()?;
        Ok(Self {
            id: WorldId::next(),
            placement: ScenePlacement::from_config(&config),
            arena: AnchorArena::new(config.octree.clone()),
            config,
            observer: Observer::default(),
            update_id: 0,
            time: 0.0,
            current: VisibilitySets::default(),
            scene_anchors: SceneAnchors::new(),
            withheld: BTreeSet::new(),
            tracked: BTreeSet::new(),
            transitions: TransitionSet::default(),
            stats: FrameStats::default(),
            metrics: FrameMetrics::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    #[inline]
    pub fn arena(&self) -> &AnchorArena {
        &self.arena
    }

    #[inline]
    pub fn anchor(&self, id: AnchorId) -> Option<&Anchor> {
        self.arena.get(id)
    }

    #[inline]
    pub fn universe(&self) -> AnchorId {
        self.arena.universe()
    }

    #[inline]
    pub fn observer(&self) -> &Observer {
        &self.observer
    }

    /// Id of the last completed frame (0 before the first).
    #[inline]
    pub fn update_id(&self) -> u64 {
        self.update_id
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn visible(&self) -> &BTreeSet<AnchorId> {
        &self.current.visible
    }

    pub fn resolved(&self) -> &BTreeSet<AnchorId> {
        &self.current.resolved
    }

    /// Transitions of the last frame.
    pub fn transitions(&self) -> &TransitionSet {
        &self.transitions
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn metrics(&self) -> &FrameMetrics {
        &self.metrics
    }

    pub fn scene_anchors(&self) -> &SceneAnchors {
        &self.scene_anchors
    }

    // =========================================================================
    // Observer control
    // =========================================================================

    /// Place the observer. The pose is stored relative to the observer's
    /// current frame.
    pub fn set_observer_pose(
        &mut self,
        global: DVec3,
        local: DVec3,
        orientation: DQuat,
        pixel_size: f64,
        frustum: Frustum,
    ) {
        let frame = self.arena.resolve_frame(&self.observer.frame);
        self.observer
            .set_pose(global, local, orientation, pixel_size, frustum, &frame);
    }

    /// [`set_observer_pose`](Self::set_observer_pose) with caller-supplied
    /// `(normal, d)` frustum planes in camera space.
    pub fn set_observer_pose_planes(
        &mut self,
        global: DVec3,
        local: DVec3,
        orientation: DQuat,
        pixel_size: f64,
        frustum_planes: impl IntoIterator<Item = (DVec3, f64)>,
    ) {
        self.set_observer_pose(
            global,
            local,
            orientation,
            pixel_size,
            Frustum::from_planes(frustum_planes),
        );
    }

    /// Bind the observer to `spec`, keeping its current absolute pose.
    pub fn set_observer_frame(&mut self, spec: FrameSpec) -> SceneResult<()> {
        if let Some(anchor) = spec.anchor() {
            self.arena.try_get(anchor)?;
        }
        let frame = self.arena.resolve_frame(&spec);
        self.observer.set_frame(spec, &frame);
        Ok(())
    }

    /// Turn the observer about the ecliptic pole.
    pub fn yaw_observer(&mut self, angle: f64) {
        let frame = self.arena.resolve_frame(&self.observer.frame);
        self.observer.yaw(angle, &frame);
    }

    /// Move the observer along its camera vector.
    pub fn dolly_observer(&mut self, distance: f64) {
        let frame = self.arena.resolve_frame(&self.observer.frame);
        self.observer.dolly(distance, &frame);
    }

    // =========================================================================
    // Per-anchor controls
    // =========================================================================

    /// Force `anchor` visible regardless of frustum and brightness until
    /// [`clear_visibility_override`](Self::clear_visibility_override).
    pub fn set_visibility_override(&mut self, anchor: AnchorId) -> SceneResult<()> {
        self.arena.try_get_mut(anchor)?.visibility_override = true;
        Ok(())
    }

    pub fn clear_visibility_override(&mut self, anchor: AnchorId) -> SceneResult<()> {
        self.arena.try_get_mut(anchor)?.visibility_override = false;
        Ok(())
    }

    /// Freeze or unfreeze the motion of `anchor`.
    pub fn set_update_frozen(&mut self, anchor: AnchorId, frozen: bool) -> SceneResult<()> {
        self.arena.try_get_mut(anchor)?.update_frozen = frozen;
        Ok(())
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Run one frame at simulation time `t`.
    ///
    /// Never fails: collaborator errors are logged and the affected anchor
    /// is withheld for the next frame.
    #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "world::update"))]
    pub fn update(
        &mut self,
        t: f64,
        presentation: &mut dyn PresentationLayer,
        surface: Option<&dyn SurfaceProvider>,
    ) -> FrameOutput {
        let frame_watch = Stopwatch::start();
        self.update_id += 1;
        self.time = t;
        let update_id = self.update_id;
        let mut stats = FrameStats {
            update_id,
            ..FrameStats::default()
        };

        stats.rebuilt = self.arena.apply_rebuilds();
        stats.moved = self.update_anchors(t);
        self.update_observer_pose();
        self.update_lighting();

        let traversal_watch = Stopwatch::start();
        let (candidates, traversal) = self.collect_candidates();
        let traversal_us = traversal_watch.elapsed_us();
        stats.candidates = candidates.len();
        stats.traversal = traversal;

        let next = self.update_candidates(&candidates);
        let transitions = TransitionSet::between(&self.current, &next);
        let mut failures = self.deliver_transitions(&transitions, presentation);

        self.update_heights(&next, surface);
        self.update_scene_anchors(&next, &transitions);
        let renderables = self.update_bodies(&next, presentation, &mut failures);

        stats.visible = next.visible.len();
        stats.resolved = next.resolved.len();
        stats.scene_anchors = self.scene_anchors.len();
        stats.callback_failures = failures.len();

        tracing::debug!(
            update_id,
            candidates = stats.candidates,
            visible = stats.visible,
            resolved = stats.resolved,
            events = transitions.events.len(),
            "frame updated"
        );

        self.current = next;
        self.withheld = failures;
        let summary = transitions.summary();
        self.transitions = transitions;
        self.stats = stats;
        self.metrics
            .record_frame(&stats, frame_watch.elapsed_us(), traversal_us);

        FrameOutput {
            world: self.id,
            update_id,
            time: t,
            renderables,
            transitions: summary,
            stats,
        }
    }

    /// Phase 1. Returns the number of anchors that moved.
    #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "world::update_anchors"))]
    fn update_anchors(&mut self, t: f64) -> usize {
        let order = UpdateAllTraverser::collect(&self.arena, self.arena.universe());
        for id in &order {
            self.arena.update_anchor(*id, t, self.update_id);
        }
        let moved = order
            .iter()
            .filter(|id| self.arena.get(**id).is_some_and(|a| a.moved))
            .count();
        if moved > 0 {
            self.arena.refresh_moved_leaves();
        }
        moved
    }

    /// Phase 2.
    fn update_observer_pose(&mut self) {
        if self.observer.follows_anchor() {
            let frame = self.arena.resolve_frame(&self.observer.frame);
            self.observer.update_pose(&frame);
        }
    }

    /// Phase 3. Reflective bodies take their light from the brightest star
    /// in their ancestor systems.
    #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "world::update_lighting"))]
    fn update_lighting(&mut self) {
        let reflective: Vec<AnchorId> = self
            .arena
            .iter()
            .filter(|a| a.kind.contains(AnchorKind::REFLECTIVE) && !a.kind.contains(AnchorKind::EMISSIVE))
            .map(|a| a.id)
            .collect();
        if reflective.is_empty() {
            return;
        }

        let arena = &self.arena;
        let lights: Vec<(AnchorId, Option<LightSource>)> = reflective
            .par_iter()
            .map(|id| (*id, LightSourceTraverser::find(arena, *id)))
            .collect();

        let observer_position = self.observer.absolute_position();
        for (id, light) in lights {
            if light.is_none() {
                tracing::debug!(anchor = %id, "no light source, reflected luminosity is 0");
            }
            if let Some(anchor) = self.arena.get_mut(id) {
                anchor.update_luminosity(light.as_ref(), observer_position);
            }
        }
    }

    /// Phase 4.
    #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "world::collect_candidates"))]
    fn collect_candidates(&self) -> (Vec<AnchorId>, TraversalStats) {
        let mut traverser = VisibleObjectsTraverser::new(
            self.observer.absolute_position(),
            &self.observer.rel_frustum,
            self.config.lowest_app_magnitude,
            self.observer.pixel_size,
            self.config.min_body_size,
        );
        let stats = traverse_anchors(&self.arena, self.arena.universe(), &mut traverser);
        (traverser.candidates, stats)
    }

    /// Phase 5. Observer caches are pure and computed in parallel, then
    /// written back in candidate order.
    #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "world::update_candidates"))]
    fn update_candidates(&mut self, candidates: &[AnchorId]) -> VisibilitySets {
        let update_id = self.update_id;
        let arena = &self.arena;
        let observer = &self.observer;
        let caches: Vec<(AnchorId, ObserverCache)> = candidates
            .par_iter()
            .filter_map(|id| {
                arena.get(*id).map(|a| {
                    let cache = ObserverCache::compute(
                        a.global_position,
                        a.local_position,
                        a.bounding_radius,
                        observer,
                        update_id,
                    );
                    (*id, cache)
                })
            })
            .collect();

        let mut next = VisibilitySets::default();
        for (id, cache) in caches {
            let Some(anchor) = self.arena.get_mut(id) else {
                continue;
            };
            anchor.set_observer_cache(cache);
            anchor.update_state(&self.observer, self.config.min_body_size, update_id);
            if self.withheld.contains(&id) {
                anchor.state.visible = false;
                anchor.state.resolved = false;
                continue;
            }
            if anchor.state.visible {
                next.insert(id, anchor.state.resolved);
            }
        }

        // Anchors outside the candidate set keep rolling their history until
        // every flag has settled to false.
        let previous = std::mem::take(&mut self.tracked);
        for id in candidates.iter().chain(previous.iter()) {
            let Some(anchor) = self.arena.get_mut(*id) else {
                continue;
            };
            if anchor.state.update_id != update_id {
                anchor.state.update_id = update_id;
                anchor.hide();
            }
            let state = &anchor.state;
            if state.visible || state.resolved || state.was_visible || state.was_resolved {
                self.tracked.insert(*id);
            }
        }
        next
    }

    /// Phase 6. Returns the anchors whose callback failed.
    #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "world::deliver_transitions"))]
    fn deliver_transitions(
        &self,
        transitions: &TransitionSet,
        presentation: &mut dyn PresentationLayer,
    ) -> BTreeSet<AnchorId> {
        let mut failures = BTreeSet::new();
        for transition in &transitions.events {
            let Some(anchor) = self.arena.get(transition.anchor) else {
                continue;
            };
            let result = match transition.event {
                TransitionEvent::Visible => presentation.on_visible(anchor),
                TransitionEvent::Resolved => presentation.on_resolved(anchor),
                TransitionEvent::Point => presentation.on_point(anchor),
                TransitionEvent::Hidden => presentation.on_hidden(anchor),
            };
            if let Err(err) = result {
                tracing::warn!(
                    anchor = %transition.anchor,
                    event = ?transition.event,
                    %err,
                    "presentation callback failed, hiding anchor next frame"
                );
                failures.insert(transition.anchor);
            }
        }
        failures
    }

    /// Phase 7. Height is 0 for anything without a surface.
    fn update_heights(&mut self, next: &VisibilitySets, surface: Option<&dyn SurfaceProvider>) {
        for id in &next.visible {
            let Some(anchor) = self.arena.get(*id) else {
                continue;
            };
            let height = if next.resolved.contains(id) {
                surface
                    .and_then(|s| s.height_under(anchor, anchor.observer.distance_to_obs))
                    .unwrap_or(0.0)
            } else {
                0.0
            };
            if let Some(anchor) = self.arena.get_mut(*id) {
                anchor.observer.height_under = height;
            }
        }
    }

    /// Phase 8.
    #[cfg_attr(feature = "profiling", tracing::instrument(skip_all, name = "world::update_scene_anchors"))]
    fn update_scene_anchors(&mut self, next: &VisibilitySets, transitions: &TransitionSet) {
        for id in &transitions.no_longer_visible {
            self.scene_anchors.teardown(*id);
        }
        for id in &next.visible {
            let Some(anchor) = self.arena.get(*id) else {
                continue;
            };
            self.scene_anchors.materialize(*id).update(
                anchor,
                &self.observer,
                &self.placement,
                self.update_id,
            );
        }
    }

    /// Phase 9. Renderables are sorted farthest first by true distance.
    fn update_bodies(
        &self,
        next: &VisibilitySets,
        presentation: &mut dyn PresentationLayer,
        failures: &mut BTreeSet<AnchorId>,
    ) -> Vec<Renderable> {
        let mut renderables = Vec::with_capacity(next.resolved.len());
        for id in &next.resolved {
            let (Some(anchor), Some(scene)) = (self.arena.get(*id), self.scene_anchors.get(*id)) else {
                continue;
            };
            if let Err(err) = presentation.update_body(anchor, scene) {
                tracing::warn!(anchor = %id, %err, "body update failed, hiding anchor next frame");
                failures.insert(*id);
                continue;
            }
            renderables.push((
                anchor.observer.distance_to_obs,
                Renderable {
                    scene_anchor_id: scene.id,
                    anchor: *id,
                    render_transform: scene.render_transform(),
                    scale_factor: scene.scene_scale_factor,
                    lod_distance: anchor.observer.z_distance,
                },
            ));
        }
        renderables.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.anchor.cmp(&b.1.anchor)));
        renderables.into_iter().map(|(_, r)| r).collect()
    }
}

#[cfg(test)]
#[path = "world_test.rs"]
mod world_test;
