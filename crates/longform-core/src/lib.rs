#![forbid(unsafe_code)]

//! Core primitives for longform rendering:
//! - [`chunk`] - boundary-aware splitting of oversized documents
//! - [`loader`] - progressive reveal state machine for chunked documents
//! - [`deferred`] - one-shot lazy construction with a failure state
//! - [`geometry`] - viewport and world-extent math shared with the backdrop
//!
//! Everything here is pure and caller-driven: no clocks, no threads, no
//! I/O. Time enters as [`std::time::Instant`] arguments so every state
//! machine is testable with synthetic timelines.
//!
//! # Example
//! ```
//! use longform_core::chunk::{ChunkPolicy, split};
//! use longform_core::loader::ProgressiveLoader;
//!
//! let text = "alpha\n\nbeta\n\ngamma";
//! let chunks = split(text, &ChunkPolicy::default());
//! assert_eq!(chunks.len(), 1); // short documents stay whole
//!
//! let loader = ProgressiveLoader::new(chunks.len());
//! assert_eq!(loader.visible(), 1);
//! ```

pub mod chunk;
pub mod deferred;
pub mod geometry;
pub mod loader;

pub use chunk::{Chunk, ChunkPolicy, split};
pub use deferred::Deferred;
pub use geometry::Viewport;
pub use loader::{LoadMore, ProgressiveLoader};
