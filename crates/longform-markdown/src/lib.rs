#![forbid(unsafe_code)]

//! Markdown compilation for long-form documents.
//!
//! This crate turns markdown source into a renderable node tree and
//! keeps oversized or hostile input from taking the page down with it:
//!
//! - [`Compiler`] drives pulldown-cmark with the house extensions
//!   (heading anchors, alert quotes, tab groups, spoilers, mentions,
//!   fenced containers) and sanitized link destinations.
//! - [`Compiler::render`] applies the routing policy: documents over
//!   the direct-size limit, or combining risky markup with meaningful
//!   length, compile chunk by chunk through [`ChunkedDocument`]; tab
//!   failures reroute there with static substitutes; anything else
//!   that fails becomes an error panel carrying the raw source.
//! - [`RenderBoundary`] catches panics from the render itself and
//!   produces a recovery report with retry and reload actions.
//!
//! # Example
//!
//! ```
//! use longform_markdown::{Compiler, RenderOutcome};
//!
//! let compiler = Compiler::default();
//! match compiler.render("# Title\n\nBody text.") {
//!     RenderOutcome::Direct(output) => {
//!         assert_eq!(output.tree.blocks.len(), 2);
//!     }
//!     _ => unreachable!("small clean documents compile directly"),
//! }
//! ```

pub mod boundary;
pub mod chunked;
pub mod compiler;
pub mod error;
pub mod extensions;
pub mod node;
pub mod options;
pub mod sanitize;

pub use boundary::{
    BoundaryOutcome, BoundaryState, CapturedFault, FaultReport, RecoveryAction, RenderBoundary,
    SplitHint,
};
pub use chunked::{ChunkRenderer, ChunkView, ChunkedDocument};
pub use compiler::{CompileOutput, Compiler, RenderOutcome, slugify};
pub use error::RenderError;
pub use node::{Inline, Node, NodeTree};
pub use options::{CompileFlags, CompileLimits, CompileOptions, ContentResolver, NoResolver};
pub use sanitize::sanitize_href;
