#![forbid(unsafe_code)]

//! Chunked rendering for oversized or risky documents.
//!
//! A [`ChunkedDocument`] splits the source at safe boundaries, reveals
//! chunks progressively through a [`ProgressiveLoader`], and compiles
//! each revealed chunk independently. Chunk compilation always runs with
//! [`CompileFlags::STATIC_TABS`] so the constructs that sink the direct
//! path render as static substitutes here, and a chunk that still fails
//! degrades to its raw text instead of taking the document down.
//!
//! Compiled views are cached: a chunk is compiled at most once per
//! document.

use std::time::Instant;

use longform_core::chunk::{self, Chunk, ChunkPolicy};
use longform_core::deferred::Deferred;
use longform_core::loader::{LoadMore, ProgressiveLoader};

use crate::compiler::Compiler;
use crate::error::RenderError;
use crate::node::NodeTree;
use crate::options::{CompileFlags, CompileOptions};

/// The outcome of compiling one chunk.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkView {
    /// The chunk compiled; render the tree.
    Rendered(NodeTree),
    /// The chunk failed; present its raw text so nothing is lost.
    Fallback {
        /// The chunk source, verbatim.
        raw: String,
    },
}

impl ChunkView {
    /// Whether this view carries a compiled tree.
    pub fn is_rendered(&self) -> bool {
        matches!(self, Self::Rendered(_))
    }
}

/// Compiles individual chunks with the static tab substitute forced on.
#[derive(Debug, Clone)]
pub struct ChunkRenderer {
    compiler: Compiler,
}

impl ChunkRenderer {
    /// Build a renderer from document options. Tab markup is always
    /// compiled statically here regardless of the incoming flags.
    #[must_use]
    pub fn new(options: CompileOptions) -> Self {
        let flags = options.flags | CompileFlags::STATIC_TABS | CompileFlags::OMIT_WRAPPER;
        Self {
            compiler: Compiler::new(options.with_flags(flags)),
        }
    }

    /// Compile one chunk. Failure is contained to the chunk.
    pub fn render_chunk(&self, chunk: &Chunk) -> ChunkView {
        match self.compiler.compile(&chunk.text) {
            Ok(output) => ChunkView::Rendered(output.tree),
            Err(e) => {
                let error = RenderError::Chunk {
                    index: chunk.index,
                    message: e.message().to_string(),
                };
                tracing::warn!(error = %error, "chunk fell back to raw text");
                ChunkView::Fallback {
                    raw: chunk.text.clone(),
                }
            }
        }
    }
}

/// A document split into progressively revealed, independently compiled
/// chunks.
#[derive(Debug)]
pub struct ChunkedDocument {
    chunks: Vec<Chunk>,
    loader: ProgressiveLoader,
    views: Vec<ChunkView>,
    renderer: Deferred<ChunkRenderer>,
    options: CompileOptions,
}

impl ChunkedDocument {
    /// Split `source` under `policy` and prepare the reveal sequence.
    /// The first chunk is visible immediately.
    #[must_use]
    pub fn new(source: &str, policy: ChunkPolicy, options: CompileOptions) -> Self {
        let chunks = chunk::split(source, &policy);
        let loader = ProgressiveLoader::new(chunks.len());
        tracing::debug!(
            chunks = chunks.len(),
            source_len = source.len(),
            "document chunked"
        );
        Self {
            chunks,
            loader,
            views: Vec::new(),
            renderer: Deferred::new(),
            options,
        }
    }

    /// All chunks, revealed or not.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of chunks the document split into.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Number of chunks currently revealed.
    pub fn visible(&self) -> usize {
        self.loader.visible()
    }

    /// Whether every chunk is revealed.
    pub fn is_complete(&self) -> bool {
        self.loader.is_complete()
    }

    /// Whether a reveal is pending.
    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    /// Whether the end-of-content sentinel should stay mounted.
    pub fn needs_sentinel(&self) -> bool {
        self.loader.needs_sentinel()
    }

    /// Explicitly request the next chunk.
    pub fn load_more(&mut self, now: Instant) -> LoadMore {
        self.loader.load_more(now)
    }

    /// The sentinel entered the viewport.
    pub fn sentinel_visible(&mut self, now: Instant) -> LoadMore {
        self.loader.sentinel_visible(now)
    }

    /// Advance time; returns true when a chunk was revealed.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.loader.tick(now)
    }

    /// Supply the chunk renderer explicitly instead of letting the
    /// default one build on first use. Returns true when the factory
    /// ran and succeeded.
    pub fn resolve_renderer_with<E: std::fmt::Display>(
        &mut self,
        factory: impl FnOnce() -> Result<ChunkRenderer, E>,
    ) -> bool {
        self.renderer.resolve_with(factory).is_some()
    }

    /// Views for every revealed chunk, compiling any that have not been
    /// compiled yet. Chunks are compiled in order, once each; when the
    /// renderer is unavailable every outstanding view degrades to raw
    /// text.
    pub fn visible_views(&mut self) -> &[ChunkView] {
        let visible = self.loader.visible();
        if self.views.len() < visible {
            if self.renderer.is_pending() {
                let options = self.options.clone();
                self.renderer
                    .resolve_with(move || Ok::<_, RenderError>(ChunkRenderer::new(options)));
            }
            if let Some(reason) = self.renderer.failure() {
                let error = RenderError::ResourceLoad {
                    message: reason.to_string(),
                };
                tracing::error!(error = %error, "chunk renderer unavailable");
            }
            for index in self.views.len()..visible {
                let view = match self.renderer.get() {
                    Some(renderer) => renderer.render_chunk(&self.chunks[index]),
                    None => ChunkView::Fallback {
                        raw: self.chunks[index].text.clone(),
                    },
                };
                self.views.push(view);
            }
        }
        &self.views[..visible.min(self.views.len())]
    }
}
