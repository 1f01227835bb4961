#![forbid(unsafe_code)]

//! Compiler configuration.
//!
//! All thresholds are policy with documented defaults; nothing in the
//! compiler hard-codes them. The boolean switches live in a
//! [`CompileFlags`] set so option structs stay cheap to copy around.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use regex::Regex;

bitflags! {
    /// Boolean compiler switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CompileFlags: u8 {
        /// Keep `<script>` bodies in the tree as raw [`crate::node::Node::Html`].
        /// Off by default; scripts are dropped entirely.
        const ALLOW_SCRIPTS = 1 << 0;
        /// Do not record a wrapper element on the output.
        const OMIT_WRAPPER = 1 << 1;
        /// Compile tab markup to the static, side-effect-free substitute
        /// instead of the interactive group. Forced on the chunked path.
        const STATIC_TABS = 1 << 2;
        /// Leave heading ids empty instead of slugging the text.
        const NO_HEADING_IDS = 1 << 3;
    }
}

impl Default for CompileFlags {
    fn default() -> Self {
        Self::empty()
    }
}

/// Routing thresholds for [`crate::compiler::Compiler::render`].
#[derive(Debug, Clone)]
pub struct CompileLimits {
    /// Documents longer than this never attempt a direct compile.
    pub max_direct_len: usize,
    /// Documents longer than this that also match the risky pattern are
    /// routed to the chunked path.
    pub risky_direct_len: usize,
    /// Override for the risky-markup pattern. `None` uses the built-in
    /// tab-markup pattern.
    pub risky_pattern: Option<Regex>,
}

impl Default for CompileLimits {
    fn default() -> Self {
        Self {
            max_direct_len: 100_000,
            risky_direct_len: 10_000,
            risky_pattern: None,
        }
    }
}

impl CompileLimits {
    /// Override the direct-compile ceiling.
    #[must_use]
    pub fn with_max_direct_len(mut self, len: usize) -> Self {
        self.max_direct_len = len;
        self
    }

    /// Override the risky-markup ceiling.
    #[must_use]
    pub fn with_risky_direct_len(mut self, len: usize) -> Self {
        self.risky_direct_len = len;
        self
    }

    /// Supply a custom risky-markup pattern.
    #[must_use]
    pub fn with_risky_pattern(mut self, pattern: Regex) -> Self {
        self.risky_pattern = Some(pattern);
        self
    }
}

/// Resolves site-internal paths to content ids.
///
/// The compiler consults this when a footnote definition points at a
/// URL: if the URL is internal, the resolved id is attached to the
/// footnote reference so the presenter can show a rich preview card.
/// Returning `None` means "not our content"; the reference then renders
/// as a plain footnote.
pub trait ContentResolver: Send + Sync {
    /// Resolve a path (no leading slash) to a content id.
    fn resolve(&self, path: &str) -> Option<String>;
}

/// The default resolver: resolves nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl ContentResolver for NoResolver {
    fn resolve(&self, _path: &str) -> Option<String> {
        None
    }
}

/// Full compiler configuration.
#[derive(Clone)]
pub struct CompileOptions {
    /// Boolean switches.
    pub flags: CompileFlags,
    /// Wrapper element tag recorded on the output (unless
    /// [`CompileFlags::OMIT_WRAPPER`]).
    pub wrapper_tag: &'static str,
    /// Routing thresholds.
    pub limits: CompileLimits,
    /// Host name treated as "this site" when classifying footnote URLs.
    /// `None` means only relative URLs count as internal.
    pub site_host: Option<String>,
    /// Internal-content resolver for footnote preview cards.
    pub resolver: Arc<dyn ContentResolver>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            flags: CompileFlags::default(),
            wrapper_tag: "article",
            limits: CompileLimits::default(),
            site_host: None,
            resolver: Arc::new(NoResolver),
        }
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("flags", &self.flags)
            .field("wrapper_tag", &self.wrapper_tag)
            .field("limits", &self.limits)
            .field("site_host", &self.site_host)
            .finish_non_exhaustive()
    }
}

impl CompileOptions {
    /// Set switches.
    #[must_use]
    pub fn with_flags(mut self, flags: CompileFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the wrapper tag.
    #[must_use]
    pub fn with_wrapper_tag(mut self, tag: &'static str) -> Self {
        self.wrapper_tag = tag;
        self
    }

    /// Set routing thresholds.
    #[must_use]
    pub fn with_limits(mut self, limits: CompileLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the site host used to classify footnote URLs as internal.
    #[must_use]
    pub fn with_site_host(mut self, host: impl Into<String>) -> Self {
        self.site_host = Some(host.into());
        self
    }

    /// Set the internal-content resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ContentResolver>) -> Self {
        self.resolver = resolver;
        self
    }
}
