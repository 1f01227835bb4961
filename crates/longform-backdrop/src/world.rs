#![forbid(unsafe_code)]

//! World model and frame scheduling shared by the backdrop variants.
//!
//! Entities live in *world* coordinates spanning the whole scrollable
//! document; a frame projects them into screen space by subtracting the
//! scroll offset. The world is at least three viewport heights tall so a
//! short document still gets a populated field above and below the fold.
//!
//! Entity counts scale with viewport area so density looks the same on
//! any screen: `spans * floor(area * density)`, capped per variant.

use std::time::{Duration, Instant};

use longform_core::geometry::Viewport;

use crate::palette::Palette;
use crate::surface::Surface;

/// Extra margin around the viewport, in pixels, inside which entities
/// still count as visible. Keeps entry and exit smooth.
pub const CULL_MARGIN: f32 = 100.0;

/// Inputs for one backdrop frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameCtx {
    /// Frame timestamp.
    pub now: Instant,
    /// Document scroll offset.
    pub scroll_y: f32,
    /// On-screen window dimensions.
    pub viewport: Viewport,
    /// Current document height.
    pub doc_height: f32,
    /// Pointer position in screen coordinates, if on the page.
    pub pointer: Option<(f32, f32)>,
    /// Colors for this frame.
    pub palette: Palette,
}

/// A full-page animated backdrop.
pub trait Backdrop {
    /// Stable identifier for logging and preference storage.
    fn name(&self) -> &'static str;

    /// Rebuild the entity field for new dimensions. Deterministic for a
    /// given `(viewport, doc_height, seed)` triple.
    fn regenerate(&mut self, viewport: Viewport, doc_height: f32, seed: u64);

    /// Draw one frame. Implementations self-limit to the target frame
    /// rate and regenerate themselves when the document height moves by
    /// more than a viewport.
    fn frame(&mut self, ctx: &FrameCtx, surface: &mut dyn Surface);
}

/// Height of the entity world: the document, floored at three viewport
/// heights.
pub fn world_height(viewport: Viewport, doc_height: f32) -> f32 {
    doc_height.max(viewport.height * 3.0)
}

/// Number of entities for a given world: one viewport's worth of
/// entities (`floor(area * density)`) per covered viewport span, capped
/// at `max`.
pub fn entity_count(viewport: Viewport, doc_height: f32, density: f64, max: usize) -> usize {
    let spans = viewport.spans(world_height(viewport, doc_height)) as usize;
    let per_span = (f64::from(viewport.area()) * density).floor() as usize;
    (spans * per_span).min(max)
}

// ---------------------------------------------------------------------------
// Frame scheduling
// ---------------------------------------------------------------------------

/// Admits frames at most once per interval.
#[derive(Debug, Clone)]
pub struct FramePacer {
    interval: Duration,
    last: Option<Instant>,
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new()
    }
}

impl FramePacer {
    /// Target frame rate.
    pub const TARGET_FPS: u32 = 60;

    /// Pacer at the target frame rate.
    #[must_use]
    pub fn new() -> Self {
        Self::with_interval(Duration::from_secs(1) / Self::TARGET_FPS)
    }

    /// Pacer with an explicit minimum interval.
    #[must_use]
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Whether a frame at `now` may run. Admitting a frame consumes the
    /// slot.
    pub fn admit(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.interval {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

/// Polls the document height and reports when the field needs
/// regenerating.
///
/// A poll fires at most every [`HeightWatcher::POLL_INTERVAL`]; it
/// reports a change only when the height moved by more than one viewport
/// height since the last regeneration.
#[derive(Debug, Clone)]
pub struct HeightWatcher {
    interval: Duration,
    last_checked: Option<Instant>,
    last_height: f32,
}

impl Default for HeightWatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HeightWatcher {
    /// How often the document height is re-checked.
    pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

    /// Watcher with the default poll interval.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interval: Self::POLL_INTERVAL,
            last_checked: None,
            last_height: 0.0,
        }
    }

    /// Watcher with an explicit poll interval.
    #[must_use]
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::new()
        }
    }

    /// Record the height the field was just generated for, so the next
    /// poll does not immediately re-trigger.
    pub fn prime(&mut self, doc_height: f32) {
        self.last_height = doc_height;
    }

    /// Check the height at `now`. Returns true when the field should be
    /// regenerated.
    pub fn observe(&mut self, now: Instant, doc_height: f32, viewport: Viewport) -> bool {
        if let Some(checked) = self.last_checked {
            if now.saturating_duration_since(checked) < self.interval {
                return false;
            }
        }
        self.last_checked = Some(now);
        if (doc_height - self.last_height).abs() > viewport.height {
            self.last_height = doc_height;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_height_floors_at_three_viewports() {
        let vp = Viewport::new(1000.0, 800.0);
        assert_eq!(world_height(vp, 100.0), 2400.0);
        assert_eq!(world_height(vp, 5000.0), 5000.0);
    }

    #[test]
    fn entity_count_scales_with_spans() {
        let vp = Viewport::new(1000.0, 800.0);
        // One span's worth: floor(800_000 * 2e-5) = 16.
        assert_eq!(entity_count(vp, 2400.0, 2e-5, 500), 48);
        assert_eq!(entity_count(vp, 8000.0, 2e-5, 500), 160);
    }

    #[test]
    fn entity_count_respects_cap() {
        let vp = Viewport::new(1000.0, 800.0);
        assert_eq!(entity_count(vp, 1_000_000.0, 2e-5, 500), 500);
    }

    #[test]
    fn entity_count_zero_for_empty_viewport() {
        assert_eq!(entity_count(Viewport::new(0.0, 0.0), 5000.0, 2e-5, 500), 0);
    }

    #[test]
    fn pacer_admits_at_interval() {
        let mut pacer = FramePacer::with_interval(Duration::from_millis(16));
        let t0 = Instant::now();
        assert!(pacer.admit(t0));
        assert!(!pacer.admit(t0 + Duration::from_millis(5)));
        assert!(!pacer.admit(t0 + Duration::from_millis(15)));
        assert!(pacer.admit(t0 + Duration::from_millis(16)));
        assert!(!pacer.admit(t0 + Duration::from_millis(17)));
    }

    #[test]
    fn watcher_triggers_on_first_unprimed_poll() {
        let vp = Viewport::new(1000.0, 800.0);
        let mut watcher = HeightWatcher::new();
        assert!(watcher.observe(Instant::now(), 2400.0, vp));
    }

    #[test]
    fn primed_watcher_stays_quiet_for_small_deltas() {
        let vp = Viewport::new(1000.0, 800.0);
        let mut watcher = HeightWatcher::new();
        watcher.prime(2400.0);
        let t0 = Instant::now();
        assert!(!watcher.observe(t0, 2400.0, vp));
        assert!(!watcher.observe(t0 + Duration::from_secs(2), 3100.0, vp));
    }

    #[test]
    fn watcher_triggers_on_viewport_sized_growth() {
        let vp = Viewport::new(1000.0, 800.0);
        let mut watcher = HeightWatcher::new();
        watcher.prime(2400.0);
        let t0 = Instant::now();
        assert!(!watcher.observe(t0, 2400.0, vp));
        assert!(watcher.observe(t0 + Duration::from_secs(2), 3300.0, vp));
        // Height recorded; the same height does not re-trigger.
        assert!(!watcher.observe(t0 + Duration::from_secs(4), 3300.0, vp));
    }

    #[test]
    fn watcher_polls_are_rate_limited() {
        let vp = Viewport::new(1000.0, 800.0);
        let mut watcher = HeightWatcher::new();
        watcher.prime(2400.0);
        let t0 = Instant::now();
        assert!(!watcher.observe(t0, 2400.0, vp));
        // Large delta, but inside the poll interval: not even checked.
        assert!(!watcher.observe(t0 + Duration::from_millis(500), 9000.0, vp));
        assert!(watcher.observe(t0 + Duration::from_secs(2), 9000.0, vp));
    }
}
