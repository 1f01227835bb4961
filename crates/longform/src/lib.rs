#![forbid(unsafe_code)]

//! Longform public facade crate.
//!
//! This crate provides the stable surface area for users. It re-exports
//! common types from the internal crates and adds the pieces that tie a
//! page together: the platform link registry ([`links`]), preference
//! storage ([`prefs`]), and the persisted backdrop toggle ([`toggle`]).
//!
//! # Example
//!
//! ```
//! use longform::{Compiler, RenderOutcome};
//!
//! let compiler = Compiler::default();
//! match compiler.render("# Hello\n\nSome **bold** text.") {
//!     RenderOutcome::Direct(output) => {
//!         assert_eq!(output.tree.blocks.len(), 2);
//!     }
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! ```

use std::fmt;

pub mod links;
pub mod prefs;
pub mod toggle;

// --- Core re-exports -------------------------------------------------------

pub use longform_core::chunk::{Chunk, ChunkPolicy, split};
pub use longform_core::deferred::Deferred;
pub use longform_core::geometry::Viewport;
pub use longform_core::loader::{LoadMore, ProgressiveLoader};

// --- Markdown re-exports ---------------------------------------------------

pub use longform_markdown::boundary::{
    BoundaryOutcome, BoundaryState, CapturedFault, FaultReport, RecoveryAction, RenderBoundary,
    SplitHint,
};
pub use longform_markdown::chunked::{ChunkRenderer, ChunkView, ChunkedDocument};
pub use longform_markdown::compiler::{CompileOutput, Compiler, RenderOutcome, slugify};
pub use longform_markdown::error::RenderError;
pub use longform_markdown::node::{Inline, Node, NodeTree};
pub use longform_markdown::options::{
    CompileFlags, CompileLimits, CompileOptions, ContentResolver, NoResolver,
};
pub use longform_markdown::sanitize::sanitize_href;

// --- Backdrop re-exports ---------------------------------------------------

pub use longform_backdrop::color::Rgba;
pub use longform_backdrop::palette::{Mode, Palette};
pub use longform_backdrop::particle::{ParticleField, ParticleParams};
pub use longform_backdrop::rng::SeededRng;
pub use longform_backdrop::starry::{StarryField, StarryParams};
pub use longform_backdrop::surface::{DrawOp, Raster, Recording, Surface};
pub use longform_backdrop::world::{Backdrop, CULL_MARGIN, FrameCtx, FramePacer, HeightWatcher};

// --- Facade re-exports -----------------------------------------------------

pub use links::{Platform, is_supported, lookup};
pub use prefs::{FilePrefs, MemoryPrefs, PrefStore};
pub use toggle::{BACKDROP_PREF_KEY, BackdropKind, BackdropToggle};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for longform apps.
#[derive(Debug)]
pub enum Error {
    /// I/O failure while loading or persisting preferences.
    Io(std::io::Error),
    /// Preference store error with message.
    Prefs(String),
    /// Markdown render failure surfaced past the routing policy.
    Render(RenderError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "{err}"),
            Self::Prefs(msg) => write!(f, "preference store error: {msg}"),
            Self::Render(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Prefs(err.to_string())
    }
}

impl From<RenderError> for Error {
    fn from(err: RenderError) -> Self {
        Self::Render(err)
    }
}

/// Standard result type for longform APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Backdrop, BackdropKind, BackdropToggle, ChunkPolicy, Compiler, Error, FilePrefs, FrameCtx,
        MemoryPrefs, Palette, PrefStore, ProgressiveLoader, RenderBoundary, RenderOutcome, Result,
        Surface, Viewport,
    };

    pub use crate::{backdrop, core, markdown};
}

pub use longform_backdrop as backdrop;
pub use longform_core as core;
pub use longform_markdown as markdown;
