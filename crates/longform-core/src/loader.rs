#![forbid(unsafe_code)]

//! Progressive reveal state machine for chunked documents.
//!
//! Rendering starts with a single visible chunk; the rest are revealed one
//! at a time, in order, when the caller reports demand. Demand arrives
//! from either trigger:
//!
//! - the reveal sentinel scrolled into view ([`ProgressiveLoader::sentinel_visible`]),
//! - an explicit "show more" action ([`ProgressiveLoader::load_more`]).
//!
//! Both funnel into the same transition, so a sentinel firing while a
//! button-initiated load is pending is a no-op rather than a double
//! reveal. A short delay between demand and reveal keeps a fast scroll
//! from revealing the whole document in one frame; the caller pumps
//! [`ProgressiveLoader::tick`] with the current time to complete pending
//! loads.
//!
//! | State     | `load_more`          | `tick` (delay elapsed)      |
//! |-----------|----------------------|-----------------------------|
//! | Idle      | `Started` -> Loading | no-op                       |
//! | Loading   | `AlreadyLoading`     | reveal one chunk -> Idle    |
//! | Saturated | `Saturated`          | no-op                       |
//!
//! `visible()` is monotonically non-decreasing and never exceeds the
//! total; once every chunk is visible the loader is terminal and
//! [`ProgressiveLoader::needs_sentinel`] turns false so no further
//! trigger is rendered.

use std::time::{Duration, Instant};

const DEFAULT_REVEAL_DELAY: Duration = Duration::from_millis(100);

/// Outcome of a reveal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMore {
    /// The request was accepted; a reveal completes on a later `tick`.
    Started,
    /// A reveal is already pending; the request was absorbed.
    AlreadyLoading,
    /// Every chunk is already visible; the request did nothing.
    Saturated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Loading { since: Instant },
}

/// Reveal state for one chunked document.
#[derive(Debug, Clone)]
pub struct ProgressiveLoader {
    total: usize,
    visible: usize,
    phase: Phase,
    delay: Duration,
}

impl ProgressiveLoader {
    /// Create a loader over `total` chunks with one chunk visible
    /// (zero for an empty document).
    pub fn new(total: usize) -> Self {
        Self {
            total,
            visible: total.min(1),
            phase: Phase::Idle,
            delay: DEFAULT_REVEAL_DELAY,
        }
    }

    /// Override the demand-to-reveal delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of chunks currently visible.
    #[inline]
    pub fn visible(&self) -> usize {
        self.visible
    }

    /// Total number of chunks.
    #[inline]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Whether every chunk is visible.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.visible == self.total
    }

    /// Whether a reveal is pending.
    #[inline]
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    /// Whether the reveal sentinel should still be rendered.
    #[inline]
    pub fn needs_sentinel(&self) -> bool {
        self.visible < self.total
    }

    /// Request one more chunk.
    pub fn load_more(&mut self, now: Instant) -> LoadMore {
        if self.visible >= self.total {
            return LoadMore::Saturated;
        }
        if self.is_loading() {
            return LoadMore::AlreadyLoading;
        }
        self.phase = Phase::Loading { since: now };
        LoadMore::Started
    }

    /// The reveal sentinel entered the viewport. Same transition as
    /// [`ProgressiveLoader::load_more`].
    pub fn sentinel_visible(&mut self, now: Instant) -> LoadMore {
        self.load_more(now)
    }

    /// Complete a pending reveal once the delay has elapsed. Returns
    /// `true` exactly when a chunk became visible.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Phase::Loading { since } = self.phase else {
            return false;
        };
        if now.saturating_duration_since(since) < self.delay {
            return false;
        }
        self.visible = (self.visible + 1).min(self.total);
        self.phase = Phase::Idle;
        tracing::debug!(visible = self.visible, total = self.total, "chunk revealed");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn starts_with_one_visible() {
        let loader = ProgressiveLoader::new(40);
        assert_eq!(loader.visible(), 1);
        assert!(!loader.is_complete());
        assert!(loader.needs_sentinel());
    }

    #[test]
    fn empty_document_is_terminal() {
        let mut loader = ProgressiveLoader::new(0);
        assert_eq!(loader.visible(), 0);
        assert!(loader.is_complete());
        assert!(!loader.needs_sentinel());
        assert_eq!(loader.load_more(Instant::now()), LoadMore::Saturated);
    }

    #[test]
    fn reveal_completes_after_delay() {
        let t0 = Instant::now();
        let mut loader = ProgressiveLoader::new(3);
        assert_eq!(loader.load_more(t0), LoadMore::Started);
        assert!(loader.is_loading());
        assert_eq!(loader.visible(), 1);

        assert!(!loader.tick(t0 + Duration::from_millis(50)));
        assert_eq!(loader.visible(), 1);

        assert!(loader.tick(t0 + Duration::from_millis(100)));
        assert_eq!(loader.visible(), 2);
        assert!(!loader.is_loading());
    }

    #[test]
    fn demand_while_loading_is_absorbed() {
        let t0 = Instant::now();
        let mut loader = ProgressiveLoader::new(5);
        assert_eq!(loader.load_more(t0), LoadMore::Started);
        assert_eq!(loader.load_more(t0), LoadMore::AlreadyLoading);
        assert_eq!(loader.sentinel_visible(t0), LoadMore::AlreadyLoading);

        assert!(loader.tick(t0 + Duration::from_millis(100)));
        // Only one chunk revealed despite three requests.
        assert_eq!(loader.visible(), 2);
    }

    #[test]
    fn saturated_loader_ignores_demand() {
        let t0 = Instant::now();
        let mut loader = ProgressiveLoader::new(1);
        assert!(loader.is_complete());
        assert_eq!(loader.load_more(t0), LoadMore::Saturated);
        assert!(!loader.tick(t0 + Duration::from_secs(1)));
        assert_eq!(loader.visible(), 1);
    }

    #[test]
    fn sentinel_disappears_at_the_end() {
        let t0 = Instant::now();
        let mut loader = ProgressiveLoader::new(2).with_delay(Duration::ZERO);
        assert!(loader.needs_sentinel());
        loader.sentinel_visible(t0);
        assert!(loader.tick(t0));
        assert_eq!(loader.visible(), 2);
        assert!(!loader.needs_sentinel());
        assert_eq!(loader.sentinel_visible(t0), LoadMore::Saturated);
    }

    #[test]
    fn tick_before_any_demand_is_noop() {
        let mut loader = ProgressiveLoader::new(4);
        assert!(!loader.tick(Instant::now()));
        assert_eq!(loader.visible(), 1);
    }

    #[test]
    fn zero_delay_reveals_on_same_tick_instant() {
        let t0 = Instant::now();
        let mut loader = ProgressiveLoader::new(2).with_delay(Duration::ZERO);
        loader.load_more(t0);
        assert!(loader.tick(t0));
        assert_eq!(loader.visible(), 2);
    }

    #[derive(Debug, Clone, Copy)]
    enum Op {
        Demand,
        Sentinel,
        Tick(u64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Demand),
            Just(Op::Sentinel),
            (0u64..300).prop_map(Op::Tick),
        ]
    }

    proptest! {
        #[test]
        fn visible_is_monotonic_and_bounded(
            total in 0usize..50,
            ops in prop::collection::vec(op_strategy(), 0..200)
        ) {
            let t0 = Instant::now();
            let mut now = t0;
            let mut loader = ProgressiveLoader::new(total);
            let mut prev = loader.visible();
            for op in ops {
                match op {
                    Op::Demand => {
                        loader.load_more(now);
                    }
                    Op::Sentinel => {
                        loader.sentinel_visible(now);
                    }
                    Op::Tick(ms) => {
                        now += Duration::from_millis(ms);
                        loader.tick(now);
                    }
                }
                prop_assert!(loader.visible() >= prev);
                prop_assert!(loader.visible() <= total);
                prev = loader.visible();
            }
            prop_assert_eq!(loader.needs_sentinel(), loader.visible() < total);
        }
    }
}
