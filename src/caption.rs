use once_cell::sync::Lazy;
use regex::Regex;

use crate::predicates::{has_style, is_emphasis, is_strong};
use crate::text::text_content;
use crate::types::{Block, Inline, Paragraph};

static TABLE_CAPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Table\s+\d+\s*[.:]").unwrap());

static CODE_CHUNK_CAPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:Figure|Table)\s+\d+\s*[.:]").unwrap());

static FIGURE_CAPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^Figure\s+\d+\s*[.:]").unwrap());

static TABLE_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*(Table\s*\d+)\s*[.:;]?(?:\s+(.*)|$)").unwrap());

static CODE_CHUNK_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*((?:Figure|Table)\s*\d+)\s*[.:;]?(?:\s+(.*)|$)").unwrap()
});

static FIGURE_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*(Figure\s*\d+)\s*[.:;]?(?:\s+(.*)|$)").unwrap());

/// Which kind of node a caption paragraph is being looked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionKind {
    Table,
    CodeChunk,
    Figure,
}

impl CaptionKind {
    /// Splits `<label> <ordinal>[.:;] <rest>` off the first caption text.
    fn label_pattern(self) -> &'static Regex {
        match self {
            CaptionKind::Table => &TABLE_LABEL_RE,
            CaptionKind::CodeChunk => &CODE_CHUNK_LABEL_RE,
            CaptionKind::Figure => &FIGURE_LABEL_RE,
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            CaptionKind::Table => &TABLE_CAPTION_RE,
            CaptionKind::CodeChunk => &CODE_CHUNK_CAPTION_RE,
            CaptionKind::Figure => &FIGURE_CAPTION_RE,
        }
    }

    fn styles(self) -> &'static [&'static str] {
        match self {
            CaptionKind::Table => &["table caption", "tablecaption", "table title"],
            CaptionKind::CodeChunk => &[
                "caption",
                "figure caption",
                "figurecaption",
                "table caption",
                "tablecaption",
                "code caption",
                "listing caption",
            ],
            CaptionKind::Figure => &["caption", "figure caption", "figurecaption"],
        }
    }

    /// A paragraph that reads like a caption for this kind of node: it
    /// starts with the label pattern, carries a caption style, or leads
    /// with emphasis/strong.
    pub fn matches(self, block: &Block) -> bool {
        let Block::Paragraph(_) = block else {
            return false;
        };
        self.pattern().is_match(&text_content(block))
            || has_style(block, self.styles())
            || is_emphasis(block)
            || is_strong(block)
    }
}

/// Split a caption paragraph into its leading label (`Figure 2`) and the
/// remaining caption content.
///
/// `kind` decides which label words are accepted. The paragraph's `style`
/// hint is dropped from the returned caption.
pub fn separate_label_caption(
    paragraph: Option<Paragraph>,
    kind: CaptionKind,
) -> (Option<String>, Option<Vec<Block>>) {
    let Some(Paragraph { content, id, mut meta }) = paragraph else {
        return (None, None);
    };
    meta.remove("style");

    let mut content = merge_adjacent_text(strip_leading_mark(content));
    let split = match content.first() {
        Some(Inline::Text(first)) => kind.label_pattern().captures(first).map(|caps| {
            let label = caps[1].trim().to_string();
            let rest = caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default();
            (label, rest)
        }),
        _ => None,
    };

    let label = split.map(|(label, rest)| {
        if rest.is_empty() {
            content.remove(0);
        } else {
            content[0] = Inline::Text(rest);
        }
        label
    });

    (label, Some(vec![Block::Paragraph(Paragraph { content, id, meta })]))
}

/// Replace a leading Emphasis/Strong node with its own content.
pub fn strip_leading_mark(content: Vec<Inline>) -> Vec<Inline> {
    let mut iter = content.into_iter();
    match iter.next() {
        Some(Inline::Emphasis(mark)) | Some(Inline::Strong(mark)) => {
            mark.content.into_iter().chain(iter).collect()
        }
        Some(first) => std::iter::once(first).chain(iter).collect(),
        None => Vec::new(),
    }
}

fn merge_adjacent_text(content: Vec<Inline>) -> Vec<Inline> {
    let mut merged: Vec<Inline> = Vec::with_capacity(content.len());
    for inline in content {
        match (merged.last_mut(), inline) {
            (Some(Inline::Text(prev)), Inline::Text(s)) => prev.push_str(&s),
            (_, inline) => merged.push(inline),
        }
    }
    merged
}
