#![forbid(unsafe_code)]

//! The markdown compiler facade.
//!
//! [`Compiler::compile`] turns source text into a [`NodeTree`] by driving
//! a pulldown-cmark event stream through a tree builder, layered with the
//! custom rules:
//!
//! - heading anchor ids (explicit `{#id}` attribute, else a slug of the
//!   heading text),
//! - GFM alert block quotes, task-list items, tables, math, footnotes,
//! - sanitized link/image destinations with flattened link text,
//! - tab markup (`<Tabs>` / `<tab label="...">`), `<ins>`/`<mark>`,
//!   script/style handling,
//! - spoilers, mentions, and fenced containers from [`crate::extensions`].
//!
//! [`Compiler::render`] adds the routing policy on top: oversized
//! documents and risky markup go to the chunked path, tab failures are
//! rerouted there with the static substitute, and any other compile
//! failure becomes an error panel that preserves the raw source.
//! `render` itself never returns an error.
//!
//! Tab markup is recognized in both block and inline position. Pane
//! bodies separated from the tags by blank lines are parsed as full
//! markdown; tag runs without blank lines arrive as raw HTML, and text
//! between the tags then degrades to plain paragraphs.

use std::collections::HashMap;
use std::mem;

use once_cell::sync::Lazy;
use pulldown_cmark::{
    Alignment, BlockQuoteKind, CodeBlockKind, Event, Options, Parser, Tag, TagEnd,
};
use regex::Regex;

use longform_core::chunk::ChunkPolicy;

use crate::chunked::ChunkedDocument;
use crate::error::RenderError;
use crate::extensions::{self, HtmlPiece, HtmlTag, Segment};
use crate::node::{
    BlockQuote, CodeBlock, ColAlign, Container, ErrorPanel, FootnoteDef, FootnoteRef, Heading,
    Image, Inline, Link, List, ListItem, Math, Node, NodeTree, QuoteKind, TabGroup, TabPane,
    Table, TableCell, for_each_inline_mut, inline_plain_text,
};
use crate::options::{CompileFlags, CompileOptions};
use crate::sanitize::sanitize_href;

/// Markup that historically crashes the direct path when combined with a
/// large document. Matches the tab construct vocabulary.
static RISKY_MARKUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<Tabs[^>]*>|</Tabs>|<tab\s+label=").expect("risky-markup pattern is valid")
});

/// How much failure detail an error panel keeps, in characters.
const ERROR_DETAIL_LIMIT: usize = 512;

/// A finished direct compile.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutput {
    /// The compiled tree.
    pub tree: NodeTree,
    /// Wrapper element tag, `None` when the wrapping container is
    /// suppressed.
    pub wrapper: Option<&'static str>,
}

/// Where [`Compiler::render`] routed a document.
#[derive(Debug)]
pub enum RenderOutcome {
    /// Compiled in one pass.
    Direct(CompileOutput),
    /// Split into progressively revealed chunks.
    Chunked(ChunkedDocument),
    /// Direct compile failed for a non-tab reason; the panel preserves
    /// the raw source.
    Failed {
        /// The failure panel to present.
        panel: ErrorPanel,
    },
}

impl RenderOutcome {
    /// Whether the document compiled in one pass.
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct(_))
    }

    /// Whether the document went to the chunked path.
    pub fn is_chunked(&self) -> bool {
        matches!(self, Self::Chunked(_))
    }
}

/// The compiler facade.
#[derive(Debug, Clone)]
pub struct Compiler {
    options: CompileOptions,
    chunk_policy: ChunkPolicy,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl Compiler {
    /// Create a compiler with the given options.
    #[must_use]
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            chunk_policy: ChunkPolicy::default(),
        }
    }

    /// Override the chunking policy used by the chunked path.
    #[must_use]
    pub fn with_chunk_policy(mut self, policy: ChunkPolicy) -> Self {
        self.chunk_policy = policy;
        self
    }

    /// The configured options.
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile source text into a tree.
    pub fn compile(&self, source: &str) -> Result<CompileOutput, RenderError> {
        let (blocks, footnotes) = self.compile_blocks(source)?;
        let mut tree = NodeTree { blocks, footnotes };
        self.resolve_footnote_cards(&mut tree);
        let wrapper = if self.options.flags.contains(CompileFlags::OMIT_WRAPPER) {
            None
        } else {
            Some(self.options.wrapper_tag)
        };
        Ok(CompileOutput { tree, wrapper })
    }

    /// Compile with the routing policy applied. Never returns an error:
    /// every failure mode maps to a degraded-but-safe outcome.
    pub fn render(&self, source: &str) -> RenderOutcome {
        let limits = &self.options.limits;
        if source.len() > limits.max_direct_len {
            tracing::debug!(
                len = source.len(),
                limit = limits.max_direct_len,
                "document over direct limit; taking chunked path"
            );
            return RenderOutcome::Chunked(self.chunked(source));
        }
        if source.len() > limits.risky_direct_len && self.is_risky(source) {
            tracing::debug!(
                len = source.len(),
                limit = limits.risky_direct_len,
                "risky markup over threshold; taking chunked path"
            );
            return RenderOutcome::Chunked(self.chunked(source));
        }
        match self.compile(source) {
            Ok(output) => RenderOutcome::Direct(output),
            Err(e) if e.mentions_tabs() => {
                tracing::warn!(error = %e, "tab markup failed; rerouting to chunked path");
                RenderOutcome::Chunked(self.chunked(source))
            }
            Err(e) => {
                tracing::error!(error = %e, len = source.len(), "direct compile failed");
                RenderOutcome::Failed {
                    panel: error_panel(source, &e),
                }
            }
        }
    }

    /// Whether the source matches the risky-markup pattern.
    pub fn is_risky(&self, source: &str) -> bool {
        match &self.options.limits.risky_pattern {
            Some(pattern) => pattern.is_match(source),
            None => RISKY_MARKUP.is_match(source),
        }
    }

    fn chunked(&self, source: &str) -> ChunkedDocument {
        ChunkedDocument::new(source, self.chunk_policy, self.options.clone())
    }

    /// Compile a source fragment to blocks + footnotes, running the
    /// container pre-pass and recursing into container bodies.
    fn compile_blocks(&self, source: &str) -> Result<(Vec<Node>, Vec<FootnoteDef>), RenderError> {
        let mut blocks = Vec::new();
        let mut footnotes = Vec::new();
        for segment in extensions::split_containers(source) {
            match segment {
                Segment::Plain(text) => {
                    let mut builder = TreeBuilder::new(&self.options);
                    builder.process(Parser::new_ext(text, parse_options()))?;
                    let (mut segment_blocks, mut segment_footnotes) = builder.finish()?;
                    blocks.append(&mut segment_blocks);
                    footnotes.append(&mut segment_footnotes);
                }
                Segment::Container {
                    name,
                    payload,
                    body,
                } => {
                    let (inner_blocks, mut inner_footnotes) = self.compile_blocks(body)?;
                    footnotes.append(&mut inner_footnotes);
                    blocks.push(Node::Container(Container {
                        name: name.to_string(),
                        payload: payload.to_string(),
                        blocks: inner_blocks,
                    }));
                }
            }
        }
        Ok((blocks, footnotes))
    }

    /// Attach internal-content cards to footnote references whose
    /// definitions point at this site.
    fn resolve_footnote_cards(&self, tree: &mut NodeTree) {
        if tree.footnotes.is_empty() {
            return;
        }
        let mut cards: HashMap<String, String> = HashMap::new();
        for def in &tree.footnotes {
            let Some(url) = footnote_url(def) else {
                continue;
            };
            let Some(path) = extract_internal_path(&url, self.options.site_host.as_deref())
            else {
                continue;
            };
            if let Some(id) = self.options.resolver.resolve(&path) {
                cards.insert(def.label.clone(), id);
            }
        }
        if cards.is_empty() {
            return;
        }
        let mut attach = |inline: &mut Inline| {
            if let Inline::FootnoteRef(FootnoteRef { label, card }) = inline {
                if card.is_none() {
                    *card = cards.get(label.as_str()).cloned();
                }
            }
        };
        for_each_inline_mut(&mut tree.blocks, &mut attach);
        for def in &mut tree.footnotes {
            for_each_inline_mut(&mut def.blocks, &mut attach);
        }
    }
}

fn parse_options() -> Options {
    Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TABLES
        | Options::ENABLE_HEADING_ATTRIBUTES
        | Options::ENABLE_MATH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_GFM
}

/// Build the failure panel for a direct compile that could not be
/// rerouted. Keeps the raw source so nothing the author wrote is lost.
pub(crate) fn error_panel(source: &str, error: &RenderError) -> ErrorPanel {
    ErrorPanel {
        message: "markdown failed to compile".to_string(),
        raw: source.to_string(),
        detail: truncate_chars(&error.to_string(), ERROR_DETAIL_LIMIT),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max).collect();
    out.push('…');
    out
}

/// Slug for heading anchors: Unicode alphanumerics survive lowercased,
/// every other run collapses to a single dash, edges are trimmed.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.trim().chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// The path (no leading slash, no query/fragment) of a URL that refers
/// to this site: either site-relative, or absolute with a host equal to
/// `site_host`.
fn extract_internal_path(url: &str, site_host: Option<&str>) -> Option<String> {
    let path = if let Some(rest) = url.strip_prefix('/') {
        rest
    } else if let Some(rest) = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
    {
        let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
        let site = site_host?;
        if !host.eq_ignore_ascii_case(site) {
            return None;
        }
        path
    } else {
        return None;
    };
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .trim_end_matches('/');
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

/// First URL a footnote definition points at: its first link, else its
/// whole text when that text reads as a URL.
fn footnote_url(def: &FootnoteDef) -> Option<String> {
    fn first_href_in(inlines: &[Inline]) -> Option<String> {
        for inline in inlines {
            match inline {
                Inline::Link(link) => {
                    if let Some(href) = &link.href {
                        return Some(href.clone());
                    }
                }
                Inline::Emphasis(children)
                | Inline::Strong(children)
                | Inline::Strikethrough(children)
                | Inline::Mark(children)
                | Inline::Spoiler(children) => {
                    if let Some(href) = first_href_in(children) {
                        return Some(href);
                    }
                }
                _ => {}
            }
        }
        None
    }

    for block in &def.blocks {
        if let Node::Paragraph(inlines) = block {
            if let Some(href) = first_href_in(inlines) {
                return Some(href);
            }
        }
    }
    let text = def
        .blocks
        .first()
        .map(|b| b.plain_text())
        .unwrap_or_default();
    let text = text.trim();
    if text.starts_with("http://") || text.starts_with("https://") || text.starts_with('/') {
        Some(text.to_string())
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Event-stream tree builder
// ---------------------------------------------------------------------------

/// An inline container that is currently open.
#[derive(Debug)]
enum InlineKind {
    Emphasis,
    Strong,
    Strikethrough,
    Mark,
    Link { href: String, title: String },
    Image { src: String },
}

/// The leaf block the current inline run belongs to.
#[derive(Debug)]
enum LeafKind {
    Paragraph,
    Heading { level: u8, id: Option<String> },
}

/// A block container that is currently open. `saved` is the parent's
/// block sink, restored on close.
#[derive(Debug)]
enum OpenBlock {
    Quote {
        kind: QuoteKind,
        saved: Vec<Node>,
    },
    List {
        ordered: bool,
        start: u64,
        items: Vec<ListItem>,
        saved: Vec<Node>,
    },
    Item {
        task: Option<bool>,
        saved: Vec<Node>,
    },
    Tabs {
        panes: Vec<TabPane>,
        saved: Vec<Node>,
    },
    Pane {
        label: Option<String>,
        saved: Vec<Node>,
    },
    Footnote {
        label: String,
        saved: Vec<Node>,
    },
}

#[derive(Debug)]
enum ScriptMode {
    /// Scripts permitted: collect the verbatim body.
    Capturing(String),
    /// Scripts dropped: swallow everything until the close tag.
    Skipping,
}

struct TableCtx {
    alignments: Vec<ColAlign>,
    head: Vec<TableCell>,
    rows: Vec<Vec<TableCell>>,
    row: Vec<TableCell>,
    in_head: bool,
    cell_saved: Option<Vec<Inline>>,
}

struct TreeBuilder<'o> {
    options: &'o CompileOptions,
    blocks: Vec<Node>,
    container_stack: Vec<OpenBlock>,
    inlines: Vec<Inline>,
    inline_stack: Vec<(InlineKind, Vec<Inline>)>,
    leaf: Option<LeafKind>,
    in_code: bool,
    code_lang: Option<String>,
    code_text: String,
    table: Option<TableCtx>,
    script: Option<ScriptMode>,
    in_style: bool,
    footnotes: Vec<FootnoteDef>,
}

impl<'o> TreeBuilder<'o> {
    fn new(options: &'o CompileOptions) -> Self {
        Self {
            options,
            blocks: Vec::new(),
            container_stack: Vec::new(),
            inlines: Vec::new(),
            inline_stack: Vec::new(),
            leaf: None,
            in_code: false,
            code_lang: None,
            code_text: String::new(),
            table: None,
            script: None,
            in_style: false,
            footnotes: Vec::new(),
        }
    }

    fn static_tabs(&self) -> bool {
        self.options.flags.contains(CompileFlags::STATIC_TABS)
    }

    fn process<'a>(
        &mut self,
        parser: impl Iterator<Item = Event<'a>>,
    ) -> Result<(), RenderError> {
        for event in parser {
            match event {
                Event::Start(tag) => self.start_tag(tag),
                Event::End(tag) => self.end_tag(tag),
                Event::Text(text) => self.text(&text),
                Event::Code(code) => self.inline_code(&code),
                Event::SoftBreak => self.soft_break(),
                Event::HardBreak => self.hard_break(),
                Event::Rule => self.rule(),
                Event::TaskListMarker(checked) => self.task_list_marker(checked),
                Event::FootnoteReference(label) => self.footnote_reference(&label),
                Event::InlineMath(tex) => self.math(false, &tex),
                Event::DisplayMath(tex) => self.math(true, &tex),
                Event::Html(html) | Event::InlineHtml(html) => self.html(&html)?,
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<(Vec<Node>, Vec<FootnoteDef>), RenderError> {
        self.flush_leaf();
        while let Some(open) = self.container_stack.pop() {
            match open {
                OpenBlock::Tabs { .. } | OpenBlock::Pane { .. } if !self.static_tabs() => {
                    return Err(RenderError::structural(
                        "unbalanced <Tabs> group: missing close tag",
                    ));
                }
                OpenBlock::Pane { label, saved } => {
                    // Static mode: close the pane as written so far.
                    let blocks = mem::replace(&mut self.blocks, saved);
                    self.attach_pane(label, blocks);
                }
                OpenBlock::Tabs { panes, saved } => {
                    let _ = mem::replace(&mut self.blocks, saved);
                    self.push_tab_group(panes);
                }
                OpenBlock::Quote { kind, saved } => {
                    let blocks = mem::replace(&mut self.blocks, saved);
                    self.blocks.push(Node::BlockQuote(BlockQuote { kind, blocks }));
                }
                OpenBlock::List {
                    ordered,
                    start,
                    items,
                    saved,
                } => {
                    let _ = mem::replace(&mut self.blocks, saved);
                    self.blocks.push(Node::List(List {
                        ordered,
                        start,
                        items,
                    }));
                }
                OpenBlock::Item { task, saved } => {
                    let blocks = mem::replace(&mut self.blocks, saved);
                    if let Some(OpenBlock::List { items, .. }) = self.container_stack.last_mut() {
                        items.push(ListItem { task, blocks });
                    }
                }
                OpenBlock::Footnote { label, saved } => {
                    let blocks = mem::replace(&mut self.blocks, saved);
                    self.footnotes.push(FootnoteDef { label, blocks });
                }
            }
        }
        Ok((self.blocks, self.footnotes))
    }

    // -- block machinery ---------------------------------------------------

    fn open_block(&mut self, open: OpenBlock) {
        self.container_stack.push(open);
    }

    fn push_block(&mut self, node: Node) {
        self.blocks.push(node);
    }

    fn flush_leaf(&mut self) {
        while let Some((kind, parent)) = self.inline_stack.pop() {
            let children = mem::replace(&mut self.inlines, parent);
            let wrapped = self.wrap_inline(kind, children);
            self.inlines.push(wrapped);
        }
        let inlines = mem::take(&mut self.inlines);
        match self.leaf.take() {
            Some(LeafKind::Heading { level, id }) => {
                let id = if self.options.flags.contains(CompileFlags::NO_HEADING_IDS) {
                    String::new()
                } else {
                    id.unwrap_or_else(|| slugify(&inline_plain_text(&inlines)))
                };
                self.push_block(Node::Heading(Heading { level, id, inlines }));
            }
            Some(LeafKind::Paragraph) | None => {
                if !inlines.is_empty() {
                    self.push_block(Node::Paragraph(inlines));
                }
            }
        }
    }

    fn ensure_leaf(&mut self) {
        let in_cell = self
            .table
            .as_ref()
            .is_some_and(|t| t.cell_saved.is_some());
        if self.leaf.is_none() && !in_cell {
            self.leaf = Some(LeafKind::Paragraph);
        }
    }

    // -- inline machinery --------------------------------------------------

    fn open_inline(&mut self, kind: InlineKind) {
        self.inline_stack.push((kind, mem::take(&mut self.inlines)));
    }

    fn close_inline(&mut self, matches: impl Fn(&InlineKind) -> bool) {
        let Some(pos) = self.inline_stack.iter().rposition(|(k, _)| matches(k)) else {
            return;
        };
        while self.inline_stack.len() > pos + 1 {
            // Unwind containers left open above the one being closed.
            let (kind, parent) = self
                .inline_stack
                .pop()
                .unwrap_or((InlineKind::Emphasis, Vec::new()));
            let children = mem::replace(&mut self.inlines, parent);
            let wrapped = self.wrap_inline(kind, children);
            self.inlines.push(wrapped);
        }
        if let Some((kind, parent)) = self.inline_stack.pop() {
            let children = mem::replace(&mut self.inlines, parent);
            let wrapped = self.wrap_inline(kind, children);
            self.inlines.push(wrapped);
        }
    }

    fn wrap_inline(&self, kind: InlineKind, children: Vec<Inline>) -> Inline {
        match kind {
            InlineKind::Emphasis => Inline::Emphasis(children),
            InlineKind::Strong => Inline::Strong(children),
            InlineKind::Strikethrough => Inline::Strikethrough(children),
            InlineKind::Mark => Inline::Mark(children),
            InlineKind::Link { href, title } => Inline::Link(Link {
                href: sanitize_href(&href),
                title,
                text: inline_plain_text(&children),
                children,
            }),
            InlineKind::Image { src } => Inline::Image(Image {
                src: sanitize_href(&src),
                alt: inline_plain_text(&children),
            }),
        }
    }

    // -- event handlers ----------------------------------------------------

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => {
                self.flush_leaf();
                self.leaf = Some(LeafKind::Paragraph);
            }
            Tag::Heading { level, id, .. } => {
                self.flush_leaf();
                self.leaf = Some(LeafKind::Heading {
                    level: level as u8,
                    id: id.map(|s| s.to_string()),
                });
            }
            Tag::BlockQuote(kind) => {
                self.flush_leaf();
                let kind = match kind {
                    Some(BlockQuoteKind::Note) => QuoteKind::Note,
                    Some(BlockQuoteKind::Tip) => QuoteKind::Tip,
                    Some(BlockQuoteKind::Important) => QuoteKind::Important,
                    Some(BlockQuoteKind::Warning) => QuoteKind::Warning,
                    Some(BlockQuoteKind::Caution) => QuoteKind::Caution,
                    None => QuoteKind::Plain,
                };
                let saved = mem::take(&mut self.blocks);
                self.open_block(OpenBlock::Quote { kind, saved });
            }
            Tag::CodeBlock(kind) => {
                self.flush_leaf();
                self.in_code = true;
                self.code_text.clear();
                self.code_lang = match kind {
                    CodeBlockKind::Fenced(lang) => {
                        let lang = lang.to_string();
                        if lang.is_empty() { None } else { Some(lang) }
                    }
                    CodeBlockKind::Indented => None,
                };
            }
            Tag::List(start) => {
                self.flush_leaf();
                let saved = mem::take(&mut self.blocks);
                self.open_block(OpenBlock::List {
                    ordered: start.is_some(),
                    start: start.unwrap_or(1),
                    items: Vec::new(),
                    saved,
                });
            }
            Tag::Item => {
                self.flush_leaf();
                let saved = mem::take(&mut self.blocks);
                self.open_block(OpenBlock::Item { task: None, saved });
            }
            Tag::FootnoteDefinition(label) => {
                self.flush_leaf();
                let saved = mem::take(&mut self.blocks);
                self.open_block(OpenBlock::Footnote {
                    label: label.to_string(),
                    saved,
                });
            }
            Tag::Emphasis => self.open_inline(InlineKind::Emphasis),
            Tag::Strong => self.open_inline(InlineKind::Strong),
            Tag::Strikethrough => self.open_inline(InlineKind::Strikethrough),
            Tag::Link {
                dest_url, title, ..
            } => self.open_inline(InlineKind::Link {
                href: dest_url.to_string(),
                title: title.to_string(),
            }),
            Tag::Image { dest_url, .. } => self.open_inline(InlineKind::Image {
                src: dest_url.to_string(),
            }),
            Tag::Table(alignments) => {
                self.flush_leaf();
                self.table = Some(TableCtx {
                    alignments: alignments
                        .into_iter()
                        .map(|a| match a {
                            Alignment::None => ColAlign::None,
                            Alignment::Left => ColAlign::Left,
                            Alignment::Center => ColAlign::Center,
                            Alignment::Right => ColAlign::Right,
                        })
                        .collect(),
                    head: Vec::new(),
                    rows: Vec::new(),
                    row: Vec::new(),
                    in_head: false,
                    cell_saved: None,
                });
            }
            Tag::TableHead => {
                if let Some(table) = &mut self.table {
                    table.in_head = true;
                }
            }
            Tag::TableRow => {
                if let Some(table) = &mut self.table {
                    table.row.clear();
                }
            }
            Tag::TableCell => {
                let saved = mem::take(&mut self.inlines);
                if let Some(table) = &mut self.table {
                    table.cell_saved = Some(saved);
                }
            }
            Tag::HtmlBlock => self.flush_leaf(),
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) => self.flush_leaf(),
            TagEnd::BlockQuote(_) => {
                self.flush_leaf();
                if let Some(OpenBlock::Quote { kind, saved }) = self.pop_if(|o| {
                    matches!(o, OpenBlock::Quote { .. })
                }) {
                    let blocks = mem::replace(&mut self.blocks, saved);
                    self.push_block(Node::BlockQuote(BlockQuote { kind, blocks }));
                }
            }
            TagEnd::CodeBlock => {
                let lang = self.code_lang.take();
                let text = mem::take(&mut self.code_text);
                self.push_block(Node::CodeBlock(CodeBlock { lang, text }));
                self.in_code = false;
            }
            TagEnd::List(_) => {
                if let Some(OpenBlock::List {
                    ordered,
                    start,
                    items,
                    saved,
                }) = self.pop_if(|o| matches!(o, OpenBlock::List { .. }))
                {
                    let _ = mem::replace(&mut self.blocks, saved);
                    self.push_block(Node::List(List {
                        ordered,
                        start,
                        items,
                    }));
                }
            }
            TagEnd::Item => {
                self.flush_leaf();
                if let Some(OpenBlock::Item { task, saved }) =
                    self.pop_if(|o| matches!(o, OpenBlock::Item { .. }))
                {
                    let blocks = mem::replace(&mut self.blocks, saved);
                    if let Some(OpenBlock::List { items, .. }) =
                        self.container_stack.last_mut()
                    {
                        items.push(ListItem { task, blocks });
                    }
                }
            }
            TagEnd::FootnoteDefinition => {
                self.flush_leaf();
                if let Some(OpenBlock::Footnote { label, saved }) =
                    self.pop_if(|o| matches!(o, OpenBlock::Footnote { .. }))
                {
                    let blocks = mem::replace(&mut self.blocks, saved);
                    self.footnotes.push(FootnoteDef { label, blocks });
                }
            }
            TagEnd::Emphasis => self.close_inline(|k| matches!(k, InlineKind::Emphasis)),
            TagEnd::Strong => self.close_inline(|k| matches!(k, InlineKind::Strong)),
            TagEnd::Strikethrough => {
                self.close_inline(|k| matches!(k, InlineKind::Strikethrough));
            }
            TagEnd::Link => self.close_inline(|k| matches!(k, InlineKind::Link { .. })),
            TagEnd::Image => self.close_inline(|k| matches!(k, InlineKind::Image { .. })),
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.push_block(Node::Table(Table {
                        alignments: table.alignments,
                        head: table.head,
                        rows: table.rows,
                    }));
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = &mut self.table {
                    table.head = mem::take(&mut table.row);
                    table.in_head = false;
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = &mut self.table {
                    let row = mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = &mut self.table {
                    if let Some(saved) = table.cell_saved.take() {
                        let cell = mem::replace(&mut self.inlines, saved);
                        table.row.push(cell);
                    }
                }
            }
            _ => {}
        }
    }

    fn pop_if(&mut self, pred: impl Fn(&OpenBlock) -> bool) -> Option<OpenBlock> {
        if self.container_stack.last().is_some_and(pred) {
            self.container_stack.pop()
        } else {
            None
        }
    }

    fn text(&mut self, text: &str) {
        if let Some(ScriptMode::Capturing(buf)) = &mut self.script {
            buf.push_str(text);
            return;
        }
        if matches!(self.script, Some(ScriptMode::Skipping)) || self.in_style {
            return;
        }
        if self.in_code {
            self.code_text.push_str(text);
            return;
        }
        self.ensure_leaf();
        extensions::lex_inline(text, &mut self.inlines);
    }

    fn inline_code(&mut self, code: &str) {
        self.ensure_leaf();
        self.inlines.push(Inline::Code(code.to_string()));
    }

    fn soft_break(&mut self) {
        self.inlines.push(Inline::Text(" ".to_string()));
    }

    fn hard_break(&mut self) {
        self.inlines.push(Inline::HardBreak);
    }

    fn rule(&mut self) {
        self.flush_leaf();
        self.push_block(Node::Rule);
    }

    fn task_list_marker(&mut self, checked: bool) {
        for open in self.container_stack.iter_mut().rev() {
            if let OpenBlock::Item { task, .. } = open {
                *task = Some(checked);
                return;
            }
        }
    }

    fn footnote_reference(&mut self, label: &str) {
        self.ensure_leaf();
        self.inlines.push(Inline::FootnoteRef(FootnoteRef {
            label: label.to_string(),
            card: None,
        }));
    }

    fn math(&mut self, display: bool, tex: &str) {
        self.ensure_leaf();
        self.inlines.push(Inline::Math(Math {
            display,
            tex: tex.to_string(),
        }));
    }

    // -- html handling -----------------------------------------------------

    fn html(&mut self, raw: &str) -> Result<(), RenderError> {
        for piece in extensions::scan_html(raw) {
            match piece {
                HtmlPiece::Tag(tag) => self.html_tag(tag)?,
                HtmlPiece::Text(text) => self.html_text(text),
            }
        }
        Ok(())
    }

    fn html_text(&mut self, text: &str) {
        if let Some(ScriptMode::Capturing(buf)) = &mut self.script {
            buf.push_str(text);
            return;
        }
        if matches!(self.script, Some(ScriptMode::Skipping)) || self.in_style {
            return;
        }
        // Loose text inside tab markup becomes paragraph content;
        // unrecognized HTML elsewhere is dropped.
        if self.in_tab_context() && !text.trim().is_empty() {
            self.ensure_leaf();
            extensions::lex_inline(text, &mut self.inlines);
        }
    }

    fn in_tab_context(&self) -> bool {
        self.container_stack
            .iter()
            .any(|o| matches!(o, OpenBlock::Tabs { .. } | OpenBlock::Pane { .. }))
    }

    fn html_tag(&mut self, tag: HtmlTag) -> Result<(), RenderError> {
        // A captured or skipped script body honors only its close tag.
        if self.script.is_some() && !matches!(tag, HtmlTag::ScriptClose) {
            if let Some(ScriptMode::Capturing(buf)) = &mut self.script {
                buf.push_str(&raw_of(&tag));
            }
            return Ok(());
        }
        if self.in_style && !matches!(tag, HtmlTag::StyleClose) {
            return Ok(());
        }
        match tag {
            HtmlTag::TabsOpen => {
                self.flush_leaf();
                let saved = mem::take(&mut self.blocks);
                self.open_block(OpenBlock::Tabs {
                    panes: Vec::new(),
                    saved,
                });
            }
            HtmlTag::TabsClose => {
                self.flush_leaf();
                if let Some(OpenBlock::Pane { label, saved }) =
                    self.pop_if(|o| matches!(o, OpenBlock::Pane { .. }))
                {
                    if !self.static_tabs() {
                        return Err(RenderError::structural(
                            "unclosed <tab> pane inside <Tabs> group",
                        ));
                    }
                    let blocks = mem::replace(&mut self.blocks, saved);
                    self.attach_pane(label, blocks);
                }
                match self.pop_if(|o| matches!(o, OpenBlock::Tabs { .. })) {
                    Some(OpenBlock::Tabs { panes, saved }) => {
                        let _ = mem::replace(&mut self.blocks, saved);
                        self.push_tab_group(panes);
                    }
                    _ => {
                        if !self.static_tabs() {
                            return Err(RenderError::structural(
                                "stray close tag outside a <Tabs> group",
                            ));
                        }
                    }
                }
            }
            HtmlTag::TabOpen { label } => {
                self.flush_leaf();
                // Close an unclosed sibling pane first.
                if let Some(OpenBlock::Pane {
                    label: prev_label,
                    saved,
                }) = self.pop_if(|o| matches!(o, OpenBlock::Pane { .. }))
                {
                    if !self.static_tabs() {
                        return Err(RenderError::structural(
                            "unclosed <tab> pane inside <Tabs> group",
                        ));
                    }
                    let blocks = mem::replace(&mut self.blocks, saved);
                    self.attach_pane(prev_label, blocks);
                }
                if !matches!(self.container_stack.last(), Some(OpenBlock::Tabs { .. })) {
                    if !self.static_tabs() {
                        return Err(RenderError::structural(
                            "<tab> pane outside a <Tabs> group",
                        ));
                    }
                    // Static mode: open an implicit group.
                    let saved = mem::take(&mut self.blocks);
                    self.open_block(OpenBlock::Tabs {
                        panes: Vec::new(),
                        saved,
                    });
                }
                let saved = mem::take(&mut self.blocks);
                self.open_block(OpenBlock::Pane { label, saved });
            }
            HtmlTag::TabClose => {
                self.flush_leaf();
                match self.pop_if(|o| matches!(o, OpenBlock::Pane { .. })) {
                    Some(OpenBlock::Pane { label, saved }) => {
                        let blocks = mem::replace(&mut self.blocks, saved);
                        self.attach_pane(label, blocks);
                    }
                    _ => {
                        if !self.static_tabs() {
                            return Err(RenderError::structural(
                                "stray </tab> outside a <Tabs> group",
                            ));
                        }
                    }
                }
            }
            HtmlTag::InsOpen | HtmlTag::MarkOpen => self.open_inline(InlineKind::Mark),
            HtmlTag::InsClose | HtmlTag::MarkClose => {
                self.close_inline(|k| matches!(k, InlineKind::Mark));
            }
            HtmlTag::ScriptOpen { raw } => {
                self.flush_leaf();
                self.script = Some(
                    if self.options.flags.contains(CompileFlags::ALLOW_SCRIPTS) {
                        ScriptMode::Capturing(raw)
                    } else {
                        ScriptMode::Skipping
                    },
                );
            }
            HtmlTag::ScriptClose => {
                if let Some(ScriptMode::Capturing(mut buf)) = self.script.take() {
                    buf.push_str("</script>");
                    self.push_block(Node::Html(buf));
                }
            }
            HtmlTag::StyleOpen => {
                self.flush_leaf();
                self.in_style = true;
            }
            HtmlTag::StyleClose => {
                self.in_style = false;
            }
        }
        Ok(())
    }

    fn attach_pane(&mut self, label: Option<String>, blocks: Vec<Node>) {
        if let Some(OpenBlock::Tabs { panes, .. }) = self.container_stack.last_mut() {
            let label = label.unwrap_or_else(|| format!("Tab {}", panes.len() + 1));
            panes.push(TabPane { label, blocks });
        }
    }

    fn push_tab_group(&mut self, panes: Vec<TabPane>) {
        self.push_block(Node::TabGroup(TabGroup {
            interactive: !self.static_tabs(),
            panes,
        }));
    }
}

fn raw_of(tag: &HtmlTag) -> String {
    match tag {
        HtmlTag::TabsOpen => "<Tabs>".to_string(),
        HtmlTag::TabsClose => "</Tabs>".to_string(),
        HtmlTag::TabOpen { label } => match label {
            Some(l) => format!("<tab label=\"{l}\">"),
            None => "<tab>".to_string(),
        },
        HtmlTag::TabClose => "</tab>".to_string(),
        HtmlTag::InsOpen => "<ins>".to_string(),
        HtmlTag::InsClose => "</ins>".to_string(),
        HtmlTag::MarkOpen => "<mark>".to_string(),
        HtmlTag::MarkClose => "</mark>".to_string(),
        HtmlTag::ScriptOpen { raw } => raw.clone(),
        HtmlTag::ScriptClose => "</script>".to_string(),
        HtmlTag::StyleOpen => "<style>".to_string(),
        HtmlTag::StyleClose => "</style>".to_string(),
    }
}
