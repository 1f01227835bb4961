#![forbid(unsafe_code)]

//! Render fault boundary with panic recovery.
//!
//! Wraps document rendering in a safety boundary that catches panics and
//! produces a recovery report instead of crashing the host. The report
//! always offers a retry and a reload action, and for very long content
//! it adds a hint to split the document.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use crate::error::RenderError;

/// Captured error from a render panic.
#[derive(Debug, Clone)]
pub struct CapturedFault {
    /// Error message extracted from the panic payload.
    pub message: String,
    /// Length of the content that was being rendered, in bytes.
    pub content_len: usize,
    /// When the fault was captured.
    pub timestamp: Instant,
}

impl CapturedFault {
    fn from_panic(payload: Box<dyn std::any::Any + Send>, content_len: usize, now: Instant) -> Self {
        let mut message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        if let Some(stripped) = message.strip_prefix("internal error: entered unreachable code: ") {
            message = stripped.to_string();
        }

        Self {
            message,
            content_len,
            timestamp: now,
        }
    }

    /// This fault as a pipeline error, for hosts that log or propagate
    /// through [`RenderError`].
    #[must_use]
    pub fn to_error(&self) -> RenderError {
        RenderError::Unrecoverable {
            message: self.message.clone(),
        }
    }
}

/// State for a render boundary.
#[derive(Debug, Clone, Default)]
pub enum BoundaryState {
    /// Rendering normally.
    #[default]
    Healthy,
    /// Rendering panicked and the fault report is showing.
    Failed(CapturedFault),
    /// Attempting recovery after a failure.
    Recovering {
        /// Number of recovery attempts so far.
        attempts: u32,
        /// The fault that triggered recovery.
        last_fault: CapturedFault,
    },
}

impl BoundaryState {
    /// Returns the current fault, if any.
    #[must_use = "use the returned fault for diagnostics"]
    pub fn fault(&self) -> Option<&CapturedFault> {
        match self {
            Self::Healthy => None,
            Self::Failed(f) => Some(f),
            Self::Recovering { last_fault, .. } => Some(last_fault),
        }
    }

    /// Returns true if in a failed or recovering state.
    pub fn is_failed(&self) -> bool {
        !matches!(self, Self::Healthy)
    }

    /// Reset to healthy state.
    pub fn reset(&mut self) {
        *self = Self::Healthy;
    }

    /// Attempt recovery. Returns true if a recovery attempt was
    /// initiated.
    pub fn try_recover(&mut self, max_attempts: u32) -> bool {
        match self {
            Self::Failed(fault) => {
                if max_attempts > 0 {
                    *self = Self::Recovering {
                        attempts: 1,
                        last_fault: fault.clone(),
                    };
                    true
                } else {
                    false
                }
            }
            Self::Recovering {
                attempts,
                last_fault,
            } => {
                if *attempts < max_attempts {
                    *attempts += 1;
                    true
                } else {
                    *self = Self::Failed(last_fault.clone());
                    false
                }
            }
            Self::Healthy => true,
        }
    }
}

/// An action the fault report offers to the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Run the render again.
    Retry,
    /// Discard all state and start over.
    Reload,
}

impl RecoveryAction {
    /// Human-readable label for the action.
    pub fn label(self) -> &'static str {
        match self {
            Self::Retry => "Try again",
            Self::Reload => "Reload",
        }
    }
}

/// Suggestion to split an oversized document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitHint {
    /// Content size in kilobytes, rounded.
    pub content_kb: usize,
}

impl fmt::Display for SplitHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "document is {} KB; splitting it into smaller sections may avoid this failure",
            self.content_kb
        )
    }
}

/// Everything needed to present a render failure.
#[derive(Debug, Clone)]
pub struct FaultReport {
    /// The captured fault.
    pub fault: CapturedFault,
    /// Actions offered to the reader, in presentation order.
    pub actions: Vec<RecoveryAction>,
    /// Present when the content is long enough that splitting it is
    /// worth suggesting.
    pub split_hint: Option<SplitHint>,
}

/// The result of running a render through the boundary.
#[derive(Debug)]
pub enum BoundaryOutcome<T> {
    /// The render finished.
    Completed(T),
    /// The render panicked, or the boundary is failed and refused to
    /// run it.
    Faulted(FaultReport),
}

impl<T> BoundaryOutcome<T> {
    /// Whether the render finished.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// A boundary that catches panics from document rendering.
///
/// While failed, the boundary refuses to run the render and keeps
/// returning the stored report until [`RenderBoundary::retry`] or
/// [`RenderBoundary::reload`] rearms it.
#[derive(Debug, Clone)]
pub struct RenderBoundary {
    state: BoundaryState,
    max_retries: u32,
    hint_threshold: usize,
}

impl Default for RenderBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderBoundary {
    /// Default number of recovery attempts before permanent fallback.
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Content length above which the report suggests splitting.
    pub const DEFAULT_HINT_THRESHOLD: usize = 50_000;

    /// Create a boundary with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: BoundaryState::Healthy,
            max_retries: Self::DEFAULT_MAX_RETRIES,
            hint_threshold: Self::DEFAULT_HINT_THRESHOLD,
        }
    }

    /// Set maximum recovery attempts before permanent fallback.
    #[must_use]
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the content length above which the split hint appears.
    #[must_use]
    pub fn with_hint_threshold(mut self, threshold: usize) -> Self {
        self.hint_threshold = threshold;
        self
    }

    /// Current boundary state.
    pub fn state(&self) -> &BoundaryState {
        &self.state
    }

    /// Run a render under the boundary.
    ///
    /// A healthy or recovering boundary executes `render` and catches
    /// any panic; a failed boundary short-circuits to the stored fault
    /// without executing it. Success while recovering returns the
    /// boundary to healthy.
    pub fn run<T>(
        &mut self,
        content: &str,
        now: Instant,
        render: impl FnOnce(&str) -> T,
    ) -> BoundaryOutcome<T> {
        if let BoundaryState::Failed(fault) = &self.state {
            return BoundaryOutcome::Faulted(self.report(fault));
        }

        let result = catch_unwind(AssertUnwindSafe(|| render(content)));
        match result {
            Ok(value) => {
                if matches!(self.state, BoundaryState::Recovering { .. }) {
                    tracing::info!("render recovered");
                    self.state = BoundaryState::Healthy;
                }
                BoundaryOutcome::Completed(value)
            }
            Err(payload) => {
                let fault = CapturedFault::from_panic(payload, content.len(), now);
                tracing::error!(
                    message = %fault.message,
                    content_len = fault.content_len,
                    "render panicked"
                );
                let report = self.report(&fault);
                self.state = BoundaryState::Failed(fault);
                BoundaryOutcome::Faulted(report)
            }
        }
    }

    /// Begin a recovery attempt. Returns true when the next
    /// [`RenderBoundary::run`] will execute the render.
    pub fn retry(&mut self) -> bool {
        self.state.try_recover(self.max_retries)
    }

    /// Discard the failure entirely.
    pub fn reload(&mut self) {
        self.state.reset();
    }

    /// Apply a report action. Returns true when the render should run
    /// again.
    pub fn apply(&mut self, action: RecoveryAction) -> bool {
        match action {
            RecoveryAction::Retry => self.retry(),
            RecoveryAction::Reload => {
                self.reload();
                true
            }
        }
    }

    fn report(&self, fault: &CapturedFault) -> FaultReport {
        let split_hint = (fault.content_len > self.hint_threshold).then(|| SplitHint {
            content_kb: (fault.content_len + 512) / 1024,
        });
        FaultReport {
            fault: fault.clone(),
            actions: vec![RecoveryAction::Retry, RecoveryAction::Reload],
            split_hint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn completed_run_returns_value() {
        let mut boundary = RenderBoundary::new();
        let outcome = boundary.run("body", Instant::now(), |content| content.len());
        match outcome {
            BoundaryOutcome::Completed(len) => assert_eq!(len, 4),
            BoundaryOutcome::Faulted(_) => panic!("healthy render must complete"),
        }
        assert!(!boundary.state().is_failed());
    }

    #[test]
    fn panic_is_captured_with_message() {
        let mut boundary = RenderBoundary::new();
        let outcome: BoundaryOutcome<()> = boundary.run("body", Instant::now(), |_| {
            unreachable!("renderer exploded");
        });
        match outcome {
            BoundaryOutcome::Faulted(report) => {
                assert_eq!(report.fault.message, "renderer exploded");
                assert_eq!(report.fault.content_len, 4);
                assert_eq!(
                    report.actions,
                    vec![RecoveryAction::Retry, RecoveryAction::Reload]
                );
            }
            BoundaryOutcome::Completed(()) => panic!("panicking render must fault"),
        }
        assert!(boundary.state().is_failed());
    }

    #[test]
    fn captured_fault_joins_the_error_taxonomy() {
        let mut boundary = RenderBoundary::new();
        let outcome: BoundaryOutcome<()> =
            boundary.run("body", Instant::now(), |_| panic!("stack exhausted"));
        match outcome {
            BoundaryOutcome::Faulted(report) => {
                let error = report.fault.to_error();
                assert_eq!(error.to_string(), "render panicked: stack exhausted");
                assert_eq!(error.message(), "stack exhausted");
            }
            BoundaryOutcome::Completed(()) => panic!("panicking render must fault"),
        }
    }

    #[test]
    fn string_payloads_are_extracted() {
        let mut boundary = RenderBoundary::new();
        let outcome: BoundaryOutcome<()> = boundary.run("x", Instant::now(), |_| {
            panic!("{}", String::from("formatted failure"));
        });
        match outcome {
            BoundaryOutcome::Faulted(report) => {
                assert_eq!(report.fault.message, "formatted failure");
            }
            BoundaryOutcome::Completed(()) => panic!("panicking render must fault"),
        }
    }

    #[test]
    fn failed_boundary_does_not_rerun_render() {
        let mut boundary = RenderBoundary::new();
        let calls = Cell::new(0u32);
        let render = |_: &str| {
            calls.set(calls.get() + 1);
            panic!("boom");
        };
        let _: BoundaryOutcome<()> = boundary.run("x", Instant::now(), render);
        assert_eq!(calls.get(), 1);

        let outcome = boundary.run("x", Instant::now(), |_| {
            calls.set(calls.get() + 1);
        });
        assert!(!outcome.is_completed());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn retry_then_success_returns_to_healthy() {
        let mut boundary = RenderBoundary::new();
        let _: BoundaryOutcome<()> = boundary.run("x", Instant::now(), |_| panic!("boom"));
        assert!(boundary.state().is_failed());

        assert!(boundary.retry());
        assert!(matches!(
            boundary.state(),
            BoundaryState::Recovering { attempts: 1, .. }
        ));

        let outcome = boundary.run("x", Instant::now(), |content| content.to_string());
        assert!(outcome.is_completed());
        assert!(matches!(boundary.state(), BoundaryState::Healthy));
    }

    #[test]
    fn recovery_respects_max_attempts() {
        let mut state = BoundaryState::Failed(CapturedFault {
            message: "fault".to_string(),
            content_len: 10,
            timestamp: Instant::now(),
        });

        assert!(state.try_recover(2));
        assert!(matches!(state, BoundaryState::Recovering { attempts: 1, .. }));

        assert!(state.try_recover(2));
        assert!(matches!(state, BoundaryState::Recovering { attempts: 2, .. }));

        assert!(!state.try_recover(2));
        assert!(matches!(state, BoundaryState::Failed(_)));
    }

    #[test]
    fn zero_max_retries_denies_immediately() {
        let mut state = BoundaryState::Failed(CapturedFault {
            message: "fault".to_string(),
            content_len: 10,
            timestamp: Instant::now(),
        });

        assert!(!state.try_recover(0));
        assert!(matches!(state, BoundaryState::Failed(_)));
    }

    #[test]
    fn reload_clears_the_failure() {
        let mut boundary = RenderBoundary::new();
        let _: BoundaryOutcome<()> = boundary.run("x", Instant::now(), |_| panic!("boom"));
        assert!(boundary.state().is_failed());

        boundary.reload();
        assert!(!boundary.state().is_failed());

        let outcome = boundary.run("x", Instant::now(), |_| 7);
        assert!(outcome.is_completed());
    }

    #[test]
    fn apply_routes_actions() {
        let mut boundary = RenderBoundary::new();
        let _: BoundaryOutcome<()> = boundary.run("x", Instant::now(), |_| panic!("boom"));

        assert!(boundary.apply(RecoveryAction::Retry));
        assert!(matches!(
            boundary.state(),
            BoundaryState::Recovering { .. }
        ));

        let _: BoundaryOutcome<()> = boundary.run("x", Instant::now(), |_| panic!("boom again"));
        assert!(boundary.apply(RecoveryAction::Reload));
        assert!(matches!(boundary.state(), BoundaryState::Healthy));
    }

    #[test]
    fn split_hint_appears_for_long_content() {
        let mut boundary = RenderBoundary::new();
        let content = "a".repeat(204_800);
        let outcome: BoundaryOutcome<()> =
            boundary.run(&content, Instant::now(), |_| panic!("boom"));
        match outcome {
            BoundaryOutcome::Faulted(report) => {
                let hint = report.split_hint.expect("long content needs a hint");
                assert_eq!(hint.content_kb, 200);
                assert!(hint.to_string().contains("200 KB"));
            }
            BoundaryOutcome::Completed(()) => panic!("panicking render must fault"),
        }
    }

    #[test]
    fn no_split_hint_for_short_content() {
        let mut boundary = RenderBoundary::new();
        let outcome: BoundaryOutcome<()> =
            boundary.run("short", Instant::now(), |_| panic!("boom"));
        match outcome {
            BoundaryOutcome::Faulted(report) => assert!(report.split_hint.is_none()),
            BoundaryOutcome::Completed(()) => panic!("panicking render must fault"),
        }
    }
}
