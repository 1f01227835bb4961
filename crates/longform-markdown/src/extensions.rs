#![forbid(unsafe_code)]

//! Extension syntaxes layered over the base markdown grammar.
//!
//! Three small recognizers feed the compiler:
//!
//! - [`scan_html`] tokenizes the handful of HTML constructs the pipeline
//!   understands (tab markup, `<ins>`/`<mark>`, `<script>`/`<style>`);
//!   everything between recognized tags comes back as text pieces so the
//!   consumer decides what to do in its current context.
//! - [`lex_inline`] splits a plain-text run on the inline micro-syntaxes:
//!   spoilers (`||hidden||`) and platform mentions (`{GH@handle}`).
//!   Both match within a single text run only; markdown nested inside
//!   them is not re-parsed.
//! - [`split_containers`] segments a source document on generic fenced
//!   containers (`::: name payload` ... `:::`), skipping fenced code so
//!   a code sample showing container syntax is left alone.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::node::{Inline, Mention};

static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?(tabs|tab|ins|mark|script|style)\b[^>]*>")
        .expect("html-tag pattern is valid")
});

static TAB_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)label\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("tab-label pattern is valid")
});

static INLINE_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\|\|(?P<spoiler>[^|\n]+?)\|\||\{(?P<code>[A-Z]{1,6})@(?P<handle>[A-Za-z0-9_.-]+)\}")
        .expect("inline-syntax pattern is valid")
});

static CONTAINER_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^:::\s*([A-Za-z][\w-]*)\s*(.*)$").expect("container pattern is valid"));

/// Mention prefix codes and the canonical platform ids they stand for.
/// The vocabulary matches the platform link registry.
pub const MENTION_PLATFORMS: &[(&str, &str)] = &[
    ("GH", "github"),
    ("TW", "twitter"),
    ("X", "x"),
    ("TG", "telegram"),
    ("BLI", "bilibili"),
];

/// Canonical platform id for a mention prefix code.
pub fn mention_platform(code: &str) -> Option<&'static str> {
    MENTION_PLATFORMS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, platform)| *platform)
}

/// A recognized HTML tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlTag {
    /// `<Tabs ...>`
    TabsOpen,
    /// `</Tabs>`
    TabsClose,
    /// `<tab label="...">`
    TabOpen {
        /// The `label` attribute, when present.
        label: Option<String>,
    },
    /// `</tab>`
    TabClose,
    /// `<ins>`
    InsOpen,
    /// `</ins>`
    InsClose,
    /// `<mark>`
    MarkOpen,
    /// `</mark>`
    MarkClose,
    /// `<script ...>` with its verbatim tag text, so attributes like
    /// `src` survive when scripts are kept.
    ScriptOpen {
        /// The tag exactly as written.
        raw: String,
    },
    /// `</script>`
    ScriptClose,
    /// `<style ...>`
    StyleOpen,
    /// `</style>`
    StyleClose,
}

/// One piece of a scanned HTML run: a recognized tag or the text between
/// recognized tags (which may itself contain unrecognized HTML).
#[derive(Debug, Clone, PartialEq)]
pub enum HtmlPiece<'a> {
    /// A recognized tag.
    Tag(HtmlTag),
    /// Raw text between recognized tags.
    Text(&'a str),
}

/// Tokenize an HTML run into recognized tags and interleaved text.
///
/// The scanner is context-free: it reports tab tags even inside script
/// bodies. The consumer applies context (a compiler collecting a script
/// body honors only `ScriptClose`).
pub fn scan_html(text: &str) -> Vec<HtmlPiece<'_>> {
    let mut pieces = Vec::new();
    let mut last = 0usize;
    for m in HTML_TAG.find_iter(text) {
        if m.start() > last {
            pieces.push(HtmlPiece::Text(&text[last..m.start()]));
        }
        if let Some(tag) = classify_tag(m.as_str()) {
            pieces.push(HtmlPiece::Tag(tag));
        } else {
            pieces.push(HtmlPiece::Text(m.as_str()));
        }
        last = m.end();
    }
    if last < text.len() {
        pieces.push(HtmlPiece::Text(&text[last..]));
    }
    pieces
}

fn classify_tag(tag: &str) -> Option<HtmlTag> {
    let closing = tag.starts_with("</");
    let name_start = if closing { 2 } else { 1 };
    let name: String = tag[name_start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    Some(match (name.as_str(), closing) {
        ("tabs", false) => HtmlTag::TabsOpen,
        ("tabs", true) => HtmlTag::TabsClose,
        ("tab", false) => HtmlTag::TabOpen {
            label: TAB_LABEL.captures(tag).and_then(|c| {
                c.get(1).or_else(|| c.get(2)).map(|m| m.as_str().to_string())
            }),
        },
        ("tab", true) => HtmlTag::TabClose,
        ("ins", false) => HtmlTag::InsOpen,
        ("ins", true) => HtmlTag::InsClose,
        ("mark", false) => HtmlTag::MarkOpen,
        ("mark", true) => HtmlTag::MarkClose,
        ("script", false) => HtmlTag::ScriptOpen {
            raw: tag.to_string(),
        },
        ("script", true) => HtmlTag::ScriptClose,
        ("style", false) => HtmlTag::StyleOpen,
        ("style", true) => HtmlTag::StyleClose,
        _ => return None,
    })
}

/// Lex a plain-text run into text, spoilers, and mentions, appending to
/// `out`. Unknown mention codes are left as literal text.
pub fn lex_inline(text: &str, out: &mut Vec<Inline>) {
    let mut last = 0usize;
    for caps in INLINE_SYNTAX.captures_iter(text) {
        let m = caps.get(0).map(|m| (m.start(), m.end()));
        let Some((start, end)) = m else { continue };

        let produced = if let Some(spoiler) = caps.name("spoiler") {
            Some(Inline::Spoiler(vec![Inline::Text(
                spoiler.as_str().to_string(),
            )]))
        } else {
            let code = caps.name("code").map(|m| m.as_str()).unwrap_or_default();
            let handle = caps.name("handle").map(|m| m.as_str()).unwrap_or_default();
            mention_platform(code).map(|platform| {
                Inline::Mention(Mention {
                    platform: platform.to_string(),
                    handle: handle.to_string(),
                })
            })
        };

        let Some(node) = produced else { continue };
        if start > last {
            out.push(Inline::Text(text[last..start].to_string()));
        }
        out.push(node);
        last = end;
    }
    if last < text.len() {
        out.push(Inline::Text(text[last..].to_string()));
    }
}

/// A segment of a source document after the container pre-pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Ordinary markdown source.
    Plain(&'a str),
    /// The body of one fenced container.
    Container {
        /// Container name (first word after the fence).
        name: &'a str,
        /// Rest of the fence line, trimmed.
        payload: &'a str,
        /// Lines between the fences, compiled recursively.
        body: &'a str,
    },
}

/// Split a document on generic fenced containers.
///
/// Container fences inside fenced code blocks are ignored. Containers do
/// not nest; the first closing fence ends the container. An unclosed
/// container runs to the end of the document.
pub fn split_containers(source: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut plain_start = 0usize;
    let mut pos = 0usize;
    let mut in_code_fence = false;
    let mut open: Option<(&str, &str, usize)> = None; // name, payload, body start

    for line in source.split_inclusive('\n') {
        let line_start = pos;
        pos += line.len();
        let trimmed = line.trim_end_matches(['\n', '\r']).trim();

        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_code_fence = !in_code_fence;
            continue;
        }
        if in_code_fence {
            continue;
        }

        match open {
            None => {
                if let Some(caps) = CONTAINER_OPEN.captures(trimmed) {
                    if line_start > plain_start {
                        segments.push(Segment::Plain(&source[plain_start..line_start]));
                    }
                    let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
                    let payload = caps.get(2).map(|m| m.as_str().trim()).unwrap_or_default();
                    open = Some((name, payload, pos));
                }
            }
            Some((name, payload, body_start)) => {
                if trimmed == ":::" {
                    segments.push(Segment::Container {
                        name,
                        payload,
                        body: &source[body_start..line_start],
                    });
                    open = None;
                    plain_start = pos;
                }
            }
        }
    }

    match open {
        Some((name, payload, body_start)) => segments.push(Segment::Container {
            name,
            payload,
            body: &source[body_start..],
        }),
        None => {
            if plain_start < source.len() {
                segments.push(Segment::Plain(&source[plain_start..]));
            }
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_tab_markup() {
        let pieces = scan_html(r#"<Tabs><tab label="One">x</tab></Tabs>"#);
        assert_eq!(
            pieces,
            vec![
                HtmlPiece::Tag(HtmlTag::TabsOpen),
                HtmlPiece::Tag(HtmlTag::TabOpen {
                    label: Some("One".to_string())
                }),
                HtmlPiece::Text("x"),
                HtmlPiece::Tag(HtmlTag::TabClose),
                HtmlPiece::Tag(HtmlTag::TabsClose),
            ]
        );
    }

    #[test]
    fn tab_markup_is_case_insensitive() {
        let pieces = scan_html(r#"<tabs><TAB LABEL='a'></TAB></TABS>"#);
        assert_eq!(pieces[0], HtmlPiece::Tag(HtmlTag::TabsOpen));
        assert_eq!(
            pieces[1],
            HtmlPiece::Tag(HtmlTag::TabOpen {
                label: Some("a".to_string())
            })
        );
        assert_eq!(pieces[3], HtmlPiece::Tag(HtmlTag::TabsClose));
    }

    #[test]
    fn tab_without_label_scans_with_none() {
        let pieces = scan_html("<tab>");
        assert_eq!(pieces, vec![HtmlPiece::Tag(HtmlTag::TabOpen { label: None })]);
    }

    #[test]
    fn unrecognized_html_stays_text() {
        let pieces = scan_html("<div class=\"x\">hello</div>");
        assert!(pieces.iter().all(|p| matches!(p, HtmlPiece::Text(_))));
    }

    #[test]
    fn ins_mark_script_style_recognized() {
        let pieces = scan_html("<ins>a</ins><mark>b</mark><script>c</script><style>d</style>");
        let tags: Vec<_> = pieces
            .iter()
            .filter_map(|p| match p {
                HtmlPiece::Tag(t) => Some(t.clone()),
                HtmlPiece::Text(_) => None,
            })
            .collect();
        assert_eq!(
            tags,
            vec![
                HtmlTag::InsOpen,
                HtmlTag::InsClose,
                HtmlTag::MarkOpen,
                HtmlTag::MarkClose,
                HtmlTag::ScriptOpen {
                    raw: "<script>".to_string()
                },
                HtmlTag::ScriptClose,
                HtmlTag::StyleOpen,
                HtmlTag::StyleClose,
            ]
        );
    }

    #[test]
    fn lexes_spoilers() {
        let mut out = Vec::new();
        lex_inline("before ||hidden|| after", &mut out);
        assert_eq!(
            out,
            vec![
                Inline::Text("before ".to_string()),
                Inline::Spoiler(vec![Inline::Text("hidden".to_string())]),
                Inline::Text(" after".to_string()),
            ]
        );
    }

    #[test]
    fn lexes_mentions_with_known_codes() {
        let mut out = Vec::new();
        lex_inline("ping {GH@octocat}!", &mut out);
        assert_eq!(
            out,
            vec![
                Inline::Text("ping ".to_string()),
                Inline::Mention(Mention {
                    platform: "github".to_string(),
                    handle: "octocat".to_string(),
                }),
                Inline::Text("!".to_string()),
            ]
        );
    }

    #[test]
    fn unknown_mention_code_stays_literal() {
        let mut out = Vec::new();
        lex_inline("see {ZZ@nobody}", &mut out);
        assert_eq!(out, vec![Inline::Text("see {ZZ@nobody}".to_string())]);
    }

    #[test]
    fn plain_text_passes_through_whole() {
        let mut out = Vec::new();
        lex_inline("no syntax here | single pipe", &mut out);
        assert_eq!(
            out,
            vec![Inline::Text("no syntax here | single pipe".to_string())]
        );
    }

    #[test]
    fn splits_one_container() {
        let source = "before\n\n::: banner warning\ninside\n:::\n\nafter\n";
        let segments = split_containers(source);
        assert_eq!(
            segments,
            vec![
                Segment::Plain("before\n\n"),
                Segment::Container {
                    name: "banner",
                    payload: "warning",
                    body: "inside\n",
                },
                Segment::Plain("\nafter\n"),
            ]
        );
    }

    #[test]
    fn container_fence_inside_code_defused() {
        let source = "```\n::: banner\n```\ntext\n";
        let segments = split_containers(source);
        assert_eq!(segments.len(), 1);
        assert!(matches!(segments[0], Segment::Plain(_)));
    }

    #[test]
    fn unclosed_container_runs_to_end() {
        let source = "::: gallery\none\ntwo";
        let segments = split_containers(source);
        assert_eq!(
            segments,
            vec![Segment::Container {
                name: "gallery",
                payload: "",
                body: "one\ntwo",
            }]
        );
    }

    #[test]
    fn document_without_containers_is_one_plain_segment() {
        let source = "just text\n\nmore text";
        assert_eq!(split_containers(source), vec![Segment::Plain(source)]);
    }
}
