#![forbid(unsafe_code)]

//! Boundary-aware splitting of oversized documents.
//!
//! Documents longer than [`ChunkPolicy::max_len`] are cut into chunks that
//! can be compiled and revealed independently. Cuts prefer natural
//! boundaries so a chunk rarely ends mid-construct:
//!
//! 1. a paragraph break (`\n\s*\n`) inside the lookahead window,
//! 2. else a sentence end (`[.!?]\s*\n`) inside the same window,
//! 3. else a hard cut at `max_len`, pulled back to the nearest grapheme
//!    boundary so no chunk ever splits a character or cluster.
//!
//! Chunk text is trimmed of surrounding whitespace; a slice that trims to
//! nothing is dropped (the scan still advances). Joining chunk texts with
//! whitespace runs normalized reproduces the whitespace-normalized
//! document. Documents at or under `max_len` are returned whole and
//! untrimmed, as is a pathological document whose every slice trims to
//! nothing.
//!
//! All lengths and offsets are byte offsets into the original document.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::GraphemeCursor;

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("paragraph-break pattern is valid"));

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]\s*\n").expect("sentence-end pattern is valid"));

/// Cut-point policy for [`split`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    /// Target chunk size in bytes. Values below 1 are treated as 1.
    pub max_len: usize,
    /// How far past `max_len` to search for a natural boundary, in bytes.
    pub lookahead: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            max_len: 5_000,
            lookahead: 1_000,
        }
    }
}

impl ChunkPolicy {
    /// Override the target chunk size.
    #[must_use]
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Override the boundary search window.
    #[must_use]
    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }
}

/// One split-off piece of a document.
///
/// `span` is the scan window the chunk was carved from, before trimming;
/// spans of consecutive chunks never overlap and always advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position within the chunk sequence, starting at 0.
    pub index: usize,
    /// Trimmed chunk text (untrimmed in the single-chunk case).
    pub text: String,
    /// Byte range of the untrimmed slice in the original document.
    pub span: Range<usize>,
}

/// Split `text` into chunks according to `policy`.
///
/// Pure and deterministic: the same input always yields the same chunks.
/// Documents no longer than `policy.max_len` come back as a single chunk
/// equal to the whole document.
pub fn split(text: &str, policy: &ChunkPolicy) -> Vec<Chunk> {
    let len = text.len();
    let max_len = policy.max_len.max(1);
    if len <= max_len {
        return vec![whole(text)];
    }

    let mut chunks = Vec::new();
    let mut pos = 0usize;
    while pos < len {
        let mut cut = floor_char(text, pos + max_len);
        if cut < len {
            let window_end = floor_char(text, cut + policy.lookahead);
            let window = &text[cut..window_end];
            if let Some(m) = PARAGRAPH_BREAK.find(window) {
                cut += m.end();
            } else if let Some(m) = SENTENCE_END.find(window) {
                cut += m.end();
            } else {
                cut = grapheme_floor(text, cut);
            }
        } else {
            cut = len;
        }
        // A cut that cannot advance (grapheme pull-back against a tiny
        // max_len) would loop forever; force one grapheme of progress.
        if cut <= pos {
            cut = grapheme_ceil(text, pos + 1);
        }

        let slice = &text[pos..cut];
        let trimmed = slice.trim();
        if !trimmed.is_empty() {
            chunks.push(Chunk {
                index: chunks.len(),
                text: trimmed.to_string(),
                span: pos..cut,
            });
        }
        pos = cut;
    }

    if chunks.is_empty() {
        return vec![whole(text)];
    }
    tracing::debug!(len, chunks = chunks.len(), "split oversized document");
    chunks
}

fn whole(text: &str) -> Chunk {
    Chunk {
        index: 0,
        text: text.to_string(),
        span: 0..text.len(),
    }
}

/// Largest char boundary at or below `idx` (clamped to the text length).
fn floor_char(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Smallest char boundary at or above `idx` (clamped to the text length).
fn ceil_char(text: &str, idx: usize) -> usize {
    let mut idx = idx.min(text.len());
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// Largest grapheme-cluster boundary at or below `idx`.
fn grapheme_floor(text: &str, idx: usize) -> usize {
    let idx = floor_char(text, idx);
    let mut cursor = GraphemeCursor::new(idx, text.len(), true);
    match cursor.is_boundary(text, 0) {
        Ok(true) => idx,
        _ => cursor
            .prev_boundary(text, 0)
            .ok()
            .flatten()
            .unwrap_or(idx),
    }
}

/// Smallest grapheme-cluster boundary at or above `idx`.
fn grapheme_ceil(text: &str, idx: usize) -> usize {
    let idx = ceil_char(text, idx);
    let mut cursor = GraphemeCursor::new(idx, text.len(), true);
    match cursor.is_boundary(text, 0) {
        Ok(true) => idx,
        _ => cursor
            .next_boundary(text, 0)
            .ok()
            .flatten()
            .unwrap_or(text.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn normalized(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn short_document_is_returned_whole() {
        let text = "  hello world  ";
        let chunks = split(text, &ChunkPolicy::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
        assert_eq!(chunks[0].span, 0..text.len());
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn empty_document_is_single_empty_chunk() {
        let chunks = split("", &ChunkPolicy::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "");
        assert_eq!(chunks[0].span, 0..0);
    }

    #[test]
    fn exact_max_len_stays_whole() {
        let text = "a".repeat(5_000);
        let chunks = split(&text, &ChunkPolicy::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn uniform_text_hard_cuts_into_equal_chunks() {
        let text = "a".repeat(200_000);
        let chunks = split(&text, &ChunkPolicy::default());
        assert_eq!(chunks.len(), 40);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.text.len(), 5_000);
            assert_eq!(chunk.span, i * 5_000..(i + 1) * 5_000);
        }
    }

    #[test]
    fn paragraph_break_in_window_moves_the_cut() {
        let text = format!("{}\n\n{}", "a".repeat(5_200), "b".repeat(2_000));
        let chunks = split(&text, &ChunkPolicy::default());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "a".repeat(5_200));
        assert_eq!(chunks[0].span, 0..5_202);
        assert_eq!(chunks[1].text, "b".repeat(2_000));
    }

    #[test]
    fn sentence_end_used_when_no_paragraph_break() {
        let text = format!("{}.\n{}", "a".repeat(5_100), "b".repeat(3_000));
        let chunks = split(&text, &ChunkPolicy::default());
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].text.ends_with('.'));
        assert_eq!(chunks[0].span, 0..5_102);
    }

    #[test]
    fn paragraph_break_wins_even_when_sentence_comes_first() {
        // Sentence end at window offset ~100, paragraph break at ~500; the
        // later paragraph break is still preferred.
        let text = format!(
            "{}.\n{}\n\n{}",
            "a".repeat(5_100),
            "b".repeat(400),
            "c".repeat(3_000)
        );
        let chunks = split(&text, &ChunkPolicy::default());
        assert!(chunks[0].text.ends_with(&"b".repeat(400)));
        assert!(chunks[1].text.starts_with('c'));
    }

    #[test]
    fn boundary_past_lookahead_is_ignored() {
        let text = format!("{}\n\n{}", "a".repeat(6_500), "b".repeat(498));
        let chunks = split(&text, &ChunkPolicy::default());
        // No boundary within [5000, 6000): hard cut at 5000.
        assert_eq!(chunks[0].text, "a".repeat(5_000));
        assert_eq!(chunks[0].span, 0..5_000);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn hard_cut_lands_on_char_boundary() {
        let text = "中".repeat(2_000); // 6000 bytes, 3 each
        let chunks = split(&text, &ChunkPolicy::default());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].span, 0..4_998);
        assert_eq!(chunks[0].text.chars().count(), 1_666);
        let joined: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn hard_cut_does_not_split_grapheme_cluster() {
        // The ZWJ family cluster starts at byte 4996; a raw cut at 5000
        // would land between its scalars.
        let cluster = "\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
        let text = format!("{}{}{}", "a".repeat(4_996), cluster, "b".repeat(2_000));
        let chunks = split(&text, &ChunkPolicy::default());
        assert_eq!(chunks[0].text, "a".repeat(4_996));
        assert!(chunks[1].text.starts_with(cluster));
    }

    #[test]
    fn whitespace_only_long_document_falls_back_whole() {
        let text = " ".repeat(12_000);
        let chunks = split(&text, &ChunkPolicy::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, text);
    }

    #[test]
    fn zero_max_len_is_clamped() {
        let policy = ChunkPolicy::default().with_max_len(0).with_lookahead(0);
        let chunks = split("ab", &policy);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "a");
        assert_eq!(chunks[1].text, "b");
    }

    #[test]
    fn custom_policy_is_honored() {
        let policy = ChunkPolicy::default().with_max_len(10).with_lookahead(4);
        let text = "abcdefgh.\nijklmnopqrstu";
        let chunks = split(text, &policy);
        // Window [10, 14) holds no boundary ("." is at 8): hard cut at 10.
        assert_eq!(chunks[0].text, "abcdefgh.");
        assert_eq!(chunks[0].span, 0..10);
    }

    proptest! {
        #[test]
        fn reconstruction_modulo_whitespace(
            chars in prop::collection::vec(any::<char>(), 0..3_000)
        ) {
            let text: String = chars.into_iter().collect();
            let policy = ChunkPolicy::default().with_max_len(64).with_lookahead(16);
            let chunks = split(&text, &policy);
            let joined = chunks
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            prop_assert_eq!(normalized(&joined), normalized(&text));
        }

        #[test]
        fn spans_are_ordered_and_disjoint(
            chars in prop::collection::vec(any::<char>(), 0..3_000)
        ) {
            let text: String = chars.into_iter().collect();
            let policy = ChunkPolicy::default().with_max_len(64).with_lookahead(16);
            let chunks = split(&text, &policy);
            let mut prev_end = 0usize;
            for chunk in &chunks {
                prop_assert!(chunk.span.start >= prev_end);
                prop_assert!(chunk.span.end > chunk.span.start || text.is_empty());
                prop_assert!(chunk.span.end <= text.len());
                prev_end = chunk.span.end;
            }
        }

        #[test]
        fn multi_chunk_texts_are_never_empty(
            chars in prop::collection::vec(any::<char>(), 0..3_000)
        ) {
            let text: String = chars.into_iter().collect();
            let policy = ChunkPolicy::default().with_max_len(48).with_lookahead(8);
            let chunks = split(&text, &policy);
            if chunks.len() > 1 {
                for chunk in &chunks {
                    prop_assert!(!chunk.text.is_empty());
                }
            }
        }
    }
}
