#![forbid(unsafe_code)]

//! The typed render tree.
//!
//! Compilation turns markdown source into an owned tree of [`Node`]
//! blocks over [`Inline`] spans. The tree is the hand-off point to
//! whatever presents the document; it carries no styling and no
//! behavior, only structure. Hrefs inside the tree are already
//! sanitized: a rejected target is represented as `href: None` so the
//! presenter renders the link text without a destination.

/// A complete compiled document: top-level blocks plus the footnote
/// definitions collected during the pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeTree {
    /// Top-level blocks in document order.
    pub blocks: Vec<Node>,
    /// Footnote definitions, in order of first appearance.
    pub footnotes: Vec<FootnoteDef>,
}

impl NodeTree {
    /// Flatten the whole tree to plain text (block contents joined by
    /// newlines). Footnote definitions are not included.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            let text = block.plain_text();
            if !text.is_empty() {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&text);
            }
        }
        out
    }
}

/// One footnote definition (`[^label]: ...`).
#[derive(Debug, Clone, PartialEq)]
pub struct FootnoteDef {
    /// The footnote label without brackets.
    pub label: String,
    /// The definition body.
    pub blocks: Vec<Node>,
}

/// A block-level node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A paragraph of inline content.
    Paragraph(Vec<Inline>),
    /// A heading with a stable anchor id.
    Heading(Heading),
    /// An ordered or unordered list.
    List(List),
    /// A fenced or indented code block.
    CodeBlock(CodeBlock),
    /// A block quote, possibly an alert-style callout.
    BlockQuote(BlockQuote),
    /// A table with optional column alignments.
    Table(Table),
    /// A thematic break.
    Rule,
    /// A group of labeled tab panes.
    TabGroup(TabGroup),
    /// A generic fenced container (`::: name`).
    Container(Container),
    /// Raw embedded HTML, only present when scripts are permitted.
    Html(String),
    /// A visibly marked failure panel carrying the original source text.
    ErrorPanel(ErrorPanel),
}

impl Node {
    /// Flatten this block to plain text.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Paragraph(inlines) => inline_plain_text(inlines),
            Self::Heading(h) => inline_plain_text(&h.inlines),
            Self::List(list) => {
                let mut out = String::new();
                for item in &list.items {
                    for block in &item.blocks {
                        let text = block.plain_text();
                        if !text.is_empty() {
                            if !out.is_empty() {
                                out.push('\n');
                            }
                            out.push_str(&text);
                        }
                    }
                }
                out
            }
            Self::CodeBlock(code) => code.text.clone(),
            Self::BlockQuote(quote) => blocks_plain_text(&quote.blocks),
            Self::Table(table) => {
                let mut out = String::new();
                for row in std::iter::once(&table.head).chain(table.rows.iter()) {
                    let cells: Vec<String> = row.iter().map(|c| inline_plain_text(c)).collect();
                    if !out.is_empty() {
                        out.push('\n');
                    }
                    out.push_str(&cells.join(" "));
                }
                out
            }
            Self::Rule => String::new(),
            Self::TabGroup(tabs) => {
                let mut out = String::new();
                for pane in &tabs.panes {
                    let text = blocks_plain_text(&pane.blocks);
                    if !text.is_empty() {
                        if !out.is_empty() {
                            out.push('\n');
                        }
                        out.push_str(&text);
                    }
                }
                out
            }
            Self::Container(container) => blocks_plain_text(&container.blocks),
            Self::Html(_) => String::new(),
            Self::ErrorPanel(panel) => panel.raw.clone(),
        }
    }
}

/// A heading block.
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    /// Level 1-6.
    pub level: u8,
    /// Anchor id: the explicit `{#id}` attribute when present, else the
    /// slug of the heading text. Empty when id generation is disabled.
    pub id: String,
    /// Heading content.
    pub inlines: Vec<Inline>,
}

/// An ordered or unordered list.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    /// Whether items are numbered.
    pub ordered: bool,
    /// First number of an ordered list (1 unless overridden).
    pub start: u64,
    /// The items.
    pub items: Vec<ListItem>,
}

/// One list item.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    /// Task-list state: `Some(done)` renders a read-only checkbox and
    /// gets task styling; `None` is a regular bullet/number.
    pub task: Option<bool>,
    /// Item content.
    pub blocks: Vec<Node>,
}

/// A code block.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    /// Fence language tag, if any.
    pub lang: Option<String>,
    /// Verbatim code text.
    pub text: String,
}

/// A block quote, plain or alert-flavored.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockQuote {
    /// Which flavor of callout this is.
    pub kind: QuoteKind,
    /// Quoted content.
    pub blocks: Vec<Node>,
}

/// Block quote flavor. GFM alert tags (`> [!NOTE]` etc.) map onto the
/// alert variants; everything else is `Plain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QuoteKind {
    /// Ordinary quotation.
    #[default]
    Plain,
    /// `[!NOTE]`
    Note,
    /// `[!TIP]`
    Tip,
    /// `[!IMPORTANT]`
    Important,
    /// `[!WARNING]`
    Warning,
    /// `[!CAUTION]`
    Caution,
}

impl QuoteKind {
    /// Uppercase label for alert callouts; `None` for a plain quote.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Plain => None,
            Self::Note => Some("NOTE"),
            Self::Tip => Some("TIP"),
            Self::Important => Some("IMPORTANT"),
            Self::Warning => Some("WARNING"),
            Self::Caution => Some("CAUTION"),
        }
    }
}

/// Inline content of one table cell.
pub type TableCell = Vec<Inline>;

/// A table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Per-column alignment.
    pub alignments: Vec<ColAlign>,
    /// Header row.
    pub head: Vec<TableCell>,
    /// Body rows.
    pub rows: Vec<Vec<TableCell>>,
}

/// Column alignment from the delimiter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColAlign {
    /// No alignment specified.
    #[default]
    None,
    /// `:---`
    Left,
    /// `:---:`
    Center,
    /// `---:`
    Right,
}

/// A group of labeled tab panes.
#[derive(Debug, Clone, PartialEq)]
pub struct TabGroup {
    /// `false` means the static substitute: panes render stacked with
    /// their labels as captions and carry no selection state.
    pub interactive: bool,
    /// The panes, in source order.
    pub panes: Vec<TabPane>,
}

/// One tab pane.
#[derive(Debug, Clone, PartialEq)]
pub struct TabPane {
    /// The pane's label.
    pub label: String,
    /// Pane content.
    pub blocks: Vec<Node>,
}

/// A generic fenced container (`::: banner warning` ... `:::`).
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    /// Container name (first word after the fence).
    pub name: String,
    /// Everything after the name on the fence line, trimmed.
    pub payload: String,
    /// Container content.
    pub blocks: Vec<Node>,
}

/// A visibly marked failure panel that preserves the original text.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorPanel {
    /// Short description of the failure.
    pub message: String,
    /// The literal source text the panel stands in for.
    pub raw: String,
    /// Truncated diagnostic detail.
    pub detail: String,
}

/// An inline-level node.
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    /// Plain text.
    Text(String),
    /// Inline code.
    Code(String),
    /// Emphasis (`*text*`).
    Emphasis(Vec<Inline>),
    /// Strong emphasis (`**text**`).
    Strong(Vec<Inline>),
    /// Strikethrough (`~~text~~`).
    Strikethrough(Vec<Inline>),
    /// Inserted/highlighted text (`<ins>`/`<mark>`).
    Mark(Vec<Inline>),
    /// A hyperlink with sanitized destination.
    Link(Link),
    /// An image reference.
    Image(Image),
    /// A footnote reference, optionally resolved to an internal card.
    FootnoteRef(FootnoteRef),
    /// Inline or display math.
    Math(Math),
    /// Hidden-until-revealed text (`||text||`).
    Spoiler(Vec<Inline>),
    /// A platform mention (`{GH@handle}`).
    Mention(Mention),
    /// An explicit line break.
    HardBreak,
}

/// A hyperlink.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Sanitized destination; `None` when the target was rejected.
    pub href: Option<String>,
    /// The markdown title attribute, possibly empty.
    pub title: String,
    /// Flattened plain text of the children, for presenters that need a
    /// string label (tooltips, accessibility).
    pub text: String,
    /// Styled link content.
    pub children: Vec<Inline>,
}

/// An image.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Sanitized source; `None` when the target was rejected.
    pub src: Option<String>,
    /// Alternative text.
    pub alt: String,
}

/// A footnote reference.
#[derive(Debug, Clone, PartialEq)]
pub struct FootnoteRef {
    /// The label as written.
    pub label: String,
    /// Internal content id when the footnote's target resolves to this
    /// site, enabling a rich preview card.
    pub card: Option<String>,
}

/// A math span.
#[derive(Debug, Clone, PartialEq)]
pub struct Math {
    /// `true` for display (`$$`), `false` for inline (`$`).
    pub display: bool,
    /// Raw TeX source.
    pub tex: String,
}

/// A platform mention.
#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    /// Canonical platform id (`github`, `twitter`, ...).
    pub platform: String,
    /// The mentioned handle.
    pub handle: String,
}

/// Flatten inline content to plain text. Spoiler content is included;
/// math renders as its TeX source; mentions as `@handle`.
pub fn inline_plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    push_plain_text(inlines, &mut out);
    out
}

fn push_plain_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Code(t) => out.push_str(t),
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children)
            | Inline::Mark(children)
            | Inline::Spoiler(children) => push_plain_text(children, out),
            Inline::Link(link) => push_plain_text(&link.children, out),
            Inline::Image(image) => out.push_str(&image.alt),
            Inline::FootnoteRef(fr) => {
                out.push('[');
                out.push_str(&fr.label);
                out.push(']');
            }
            Inline::Math(math) => out.push_str(&math.tex),
            Inline::Mention(m) => {
                out.push('@');
                out.push_str(&m.handle);
            }
            Inline::HardBreak => out.push('\n'),
        }
    }
}

fn blocks_plain_text(blocks: &[Node]) -> String {
    let mut out = String::new();
    for block in blocks {
        let text = block.plain_text();
        if !text.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(&text);
        }
    }
    out
}

/// Apply `f` to every inline in the tree, depth-first. Used by the
/// compiler's post-pass that resolves footnote cards.
pub fn for_each_inline_mut(blocks: &mut [Node], f: &mut impl FnMut(&mut Inline)) {
    for block in blocks {
        match block {
            Node::Paragraph(inlines) => visit_inlines(inlines, f),
            Node::Heading(h) => visit_inlines(&mut h.inlines, f),
            Node::List(list) => {
                for item in &mut list.items {
                    for_each_inline_mut(&mut item.blocks, f);
                }
            }
            Node::BlockQuote(quote) => for_each_inline_mut(&mut quote.blocks, f),
            Node::Table(table) => {
                for cell in &mut table.head {
                    visit_inlines(cell, f);
                }
                for row in &mut table.rows {
                    for cell in row {
                        visit_inlines(cell, f);
                    }
                }
            }
            Node::TabGroup(tabs) => {
                for pane in &mut tabs.panes {
                    for_each_inline_mut(&mut pane.blocks, f);
                }
            }
            Node::Container(container) => for_each_inline_mut(&mut container.blocks, f),
            Node::CodeBlock(_) | Node::Rule | Node::Html(_) | Node::ErrorPanel(_) => {}
        }
    }
}

fn visit_inlines(inlines: &mut [Inline], f: &mut impl FnMut(&mut Inline)) {
    for inline in inlines {
        f(inline);
        match inline {
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children)
            | Inline::Mark(children)
            | Inline::Spoiler(children) => visit_inlines(children, f),
            Inline::Link(link) => visit_inlines(&mut link.children, f),
            _ => {}
        }
    }
}
