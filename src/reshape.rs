//! Structural reshaping: a single forward pass over a flat block sequence
//! that infers title, authors, abstract, keywords, captions, code blocks
//! and the bibliography.
//!
//! Each step looks at the current raw block, the last block already
//! emitted and the next non-empty raw block. A step may absorb following blocks; it
//! reports how many raw blocks it consumed so the cursor skips them.

use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::caption::{CaptionKind, separate_label_caption, strip_leading_mark};
use crate::cite::reshape_citations;
use crate::config::ReshapeOptions;
use crate::error::Result;
use crate::markers::strip_ordinal;
use crate::predicates::{has_style, is_emphasis, is_empty_block, is_strong};
use crate::resolve::{Resolvers, assign_reference_ids, resolve_references};
use crate::text::{inline_text, text_content};
use crate::types::{
    Block, CodeBlock, CodeChunk, Document, Figure, Heading, Inline, Organization, Paragraph,
    Person, Table,
};

static ABSTRACT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^abstract\s*$").unwrap());

static PROPERTY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^([a-z]+)\s*:\s*(.*)$").unwrap());

static AUTHOR_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*(?:[,;&]|\band\b)\s*").unwrap());

static TRAILING_MARKER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(.*?\D)\s*(\d+)$").unwrap());

static AFFILIATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^\s*(\d+)\s*(\S.*)$").unwrap());

/// Bold paragraphs starting like this are captions or notes, not headings.
static NOT_A_HEADING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:figure|table|note)\b").unwrap());

static BIBLIOGRAPHY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:\d{1,2}|[ivxlc]{1,6})\.?\s+)?(?:references|bibliography)\s*$").unwrap()
});

const TITLE_STYLES: &[&str] = &["title"];
const CODE_STYLES: &[&str] = &["code", "code block", "codeblock", "source code"];

/// Reshaper with its resolvers and options bound.
#[derive(Clone)]
pub struct Reshaper {
    resolvers: Resolvers,
    options: ReshapeOptions,
}

impl Reshaper {
    pub fn new(resolvers: Resolvers, options: ReshapeOptions) -> Self {
        Self { resolvers, options }
    }

    pub fn options(&self) -> &ReshapeOptions {
        &self.options
    }

    pub fn reshape(&self, document: Document) -> Result<Document> {
        reshape(document, &self.resolvers, &self.options)
    }
}

/// Infer the semantic structure of `document` from its flat content.
///
/// Fields already set on the document are never overwritten, so running
/// this on its own output changes nothing. Lookup failures degrade to raw
/// reference text; only `ResolveError::Fatal` is returned as an error.
pub fn reshape(
    mut document: Document,
    resolvers: &Resolvers,
    options: &ReshapeOptions,
) -> Result<Document> {
    let content = document.content.take().unwrap_or_default();
    let mut pass = Pass {
        content: &content,
        leading: content.iter().position(|b| !is_empty_block(b)),
        out: Vec::with_capacity(content.len()),
        work: document,
        resolvers,
        options,
    };

    let mut index = 0;
    while index < content.len() {
        index += pass.step(index)?;
    }

    let Pass { out, mut work, .. } = pass;
    work.content = if out.is_empty() { None } else { Some(out) };
    if options.reshape_citations {
        reshape_citations(&mut work);
    }
    Ok(work)
}

struct Pass<'a> {
    content: &'a [Block],
    /// Index of the first non-empty raw block.
    leading: Option<usize>,
    out: Vec<Block>,
    work: Document,
    resolvers: &'a Resolvers,
    options: &'a ReshapeOptions,
}

impl<'a> Pass<'a> {
    /// Process the raw block at `index`; returns how many raw blocks were consumed.
    fn step(&mut self, index: usize) -> Result<usize> {
        let content = self.content;
        let node = &content[index];

        if self.leading == Some(index)
            && self.nothing_inferred()
            && let Some(title) = title_of(node)
        {
            debug!("Title from first block");
            self.work.title = Some(title);
            return Ok(1);
        }
        if self.out.is_empty()
            && self.work.authors.is_none()
            && let Some(consumed) = self.authors(index)
        {
            return Ok(consumed);
        }
        if self.work.description.is_none()
            && let Some(consumed) = self.abstract_section(index)
        {
            return Ok(consumed);
        }
        if self.work.keywords.is_none()
            && let Some(keywords) = keywords_of(node)
        {
            debug!("Keywords: {keywords:?}");
            self.work.keywords = Some(keywords);
            return Ok(1);
        }
        if is_empty_block(node) {
            return Ok(1);
        }

        let next = self.next_visible(index);
        let next_block = next.map(|(_, block)| block);
        let promoted = promote_strong(node, self.out.last(), next_block);
        let (node, consumed) = if let Some(heading) = promoted {
            (heading, 1)
        } else if let Some(code) = self.code_block(index) {
            code
        } else {
            match node {
                Block::Table(table) if table.caption.is_none() => self.caption_table(table, next),
                Block::CodeChunk(chunk) if chunk.caption.is_none() => {
                    self.caption_code_chunk(chunk, next)
                }
                Block::Paragraph(para) => self.figure(para, next).unwrap_or((node.clone(), 1)),
                _ => (node.clone(), 1),
            }
        };

        if self.work.references.is_none()
            && is_bibliography_heading(&node)
            && let Some(consumed) = self.bibliography(index)?
        {
            return Ok(consumed);
        }

        self.out.push(node);
        Ok(consumed)
    }

    /// The title is only taken before any other field is set. A preset
    /// field therefore blocks title inference, and a second pass cannot
    /// promote a block that was exposed by consumed front matter.
    fn nothing_inferred(&self) -> bool {
        let w = &self.work;
        w.title.is_none()
            && w.authors.is_none()
            && w.description.is_none()
            && w.keywords.is_none()
            && w.references.is_none()
    }

    /// The next raw block that is not empty, with its distance from `index`.
    /// Empty blocks are dropped anyway, so lookahead sees past them.
    fn next_visible(&self, index: usize) -> Option<(usize, &'a Block)> {
        let content = self.content;
        content
            .iter()
            .enumerate()
            .skip(index + 1)
            .find(|(_, block)| !is_empty_block(block))
            .map(|(i, block)| (i - index, block))
    }

    /// Author line: a paragraph with superscript affiliation markers,
    /// optionally followed by numbered affiliation paragraphs.
    fn authors(&mut self, index: usize) -> Option<usize> {
        let node = &self.content[index];
        let Block::Paragraph(para) = node else {
            return None;
        };
        if !para.content.iter().any(|i| matches!(i, Inline::Superscript(_))) {
            return None;
        }

        let mut authors: Vec<(Person, Vec<String>)> = Vec::new();
        for segment in AUTHOR_SPLIT_RE.split(&text_content(node)) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            if segment.chars().all(|c| c.is_ascii_digit()) {
                if let Some((_, markers)) = authors.last_mut() {
                    markers.push(segment.to_string());
                }
                continue;
            }
            let (name, marker) = split_marker(segment);
            let person = self.resolvers.person.resolve_person(name);
            if person.has_family_name() {
                authors.push((person, marker.into_iter().collect()));
            }
        }
        if authors.is_empty() {
            return None;
        }

        let mut consumed = 1;
        while let Some(next @ Block::Paragraph(_)) = self.content.get(index + consumed) {
            let text = text_content(next);
            let Some(caps) = AFFILIATION_RE.captures(&text) else {
                break;
            };
            let name = caps[2].trim().trim_end_matches([',', ';', '.']).to_string();
            for (person, markers) in authors.iter_mut() {
                if markers.iter().any(|m| m == &caps[1]) {
                    person.affiliations.push(Organization { name: name.clone() });
                }
            }
            consumed += 1;
        }

        debug!("Authors: {} from line, {} affiliation lines", authors.len(), consumed - 1);
        self.work.authors = Some(authors.into_iter().map(|(p, _)| p).collect());
        Some(consumed)
    }

    /// "Abstract" heading followed by the paragraphs that form it.
    fn abstract_section(&mut self, index: usize) -> Option<usize> {
        let node = &self.content[index];
        if !matches!(node, Block::Heading(_) | Block::Paragraph(_))
            || !ABSTRACT_RE.is_match(&text_content(node))
        {
            return None;
        }

        let mut end = index + 1;
        let mut paragraphs = Vec::new();
        while let Some(next @ Block::Paragraph(_)) = self.content.get(end) {
            if is_strong(next) {
                break;
            }
            if !is_empty_block(next) {
                paragraphs.push(next.clone());
            }
            end += 1;
        }
        if paragraphs.is_empty() {
            return None;
        }

        debug!("Abstract: {} paragraphs", paragraphs.len());
        self.work.description = Some(paragraphs);
        Some(end - index)
    }

    /// Paragraphs styled as code, merged with following same-styled
    /// paragraphs into one CodeBlock.
    fn code_block(&self, index: usize) -> Option<(Block, usize)> {
        let node = &self.content[index];
        let Block::Paragraph(first) = node else {
            return None;
        };
        if !has_style(node, CODE_STYLES) {
            return None;
        }

        let mut lines = Vec::new();
        let mut end = index;
        while let Some(block @ Block::Paragraph(para)) = self.content.get(end) {
            if !has_style(block, CODE_STYLES) {
                break;
            }
            lines.push(inline_text(&para.content));
            end += 1;
        }

        let mut meta = first.meta.clone();
        meta.remove("style");
        let code = CodeBlock {
            text: lines.join("\n"),
            programming_language: meta.remove("language"),
            id: first.id.clone(),
            meta,
        };
        Some((Block::CodeBlock(code), end - index))
    }

    fn caption_table(&mut self, table: &Table, next: Option<(usize, &Block)>) -> (Block, usize) {
        let Some((para, consumed)) = self.take_caption(CaptionKind::Table, next) else {
            return (Block::Table(table.clone()), 1);
        };
        let (label, caption) = separate_label_caption(Some(para), CaptionKind::Table);
        let table = Table {
            label: label.or_else(|| table.label.clone()),
            caption,
            ..table.clone()
        };
        (Block::Table(table), consumed)
    }

    fn caption_code_chunk(
        &mut self,
        chunk: &CodeChunk,
        next: Option<(usize, &Block)>,
    ) -> (Block, usize) {
        let Some((para, consumed)) = self.take_caption(CaptionKind::CodeChunk, next) else {
            return (Block::CodeChunk(chunk.clone()), 1);
        };
        let (label, caption) =
            separate_label_caption(Some(para), CaptionKind::CodeChunk);
        let chunk = CodeChunk {
            label: label.or_else(|| chunk.label.clone()),
            caption,
            ..chunk.clone()
        };
        (Block::CodeChunk(chunk), consumed)
    }

    /// A paragraph holding a single image or video becomes a Figure, but
    /// only when a caption paragraph is adjacent.
    fn figure(
        &mut self,
        para: &Paragraph,
        next: Option<(usize, &Block)>,
    ) -> Option<(Block, usize)> {
        let visible: Vec<&Inline> = para
            .content
            .iter()
            .filter(|i| !i.as_text().is_some_and(|s| s.trim().is_empty()))
            .collect();
        let [media] = visible.as_slice() else {
            return None;
        };
        if !media.is_media() {
            return None;
        }

        let (caption_para, consumed) = self.take_caption(CaptionKind::Figure, next)?;
        let (label, caption) =
            separate_label_caption(Some(caption_para), CaptionKind::Figure);
        let mut meta = para.meta.clone();
        meta.remove("style");
        let figure = Figure {
            content: vec![(*media).clone()],
            caption,
            label,
            id: para.id.clone(),
            meta,
        };
        debug!("Figure {:?}", figure.label);
        Some((Block::Figure(figure), consumed))
    }

    /// Take a caption paragraph from the last emitted block, else from the
    /// next visible raw block. Returns the paragraph and the number of raw
    /// blocks the current step consumes.
    fn take_caption(
        &mut self,
        kind: CaptionKind,
        next: Option<(usize, &Block)>,
    ) -> Option<(Paragraph, usize)> {
        if self.out.last().is_some_and(|prev| kind.matches(prev))
            && let Some(Block::Paragraph(para)) = self.out.pop()
        {
            return Some((para, 1));
        }
        if let Some((offset, block @ Block::Paragraph(para))) = next
            && kind.matches(block)
        {
            return Some((para.clone(), offset + 1));
        }
        None
    }

    /// Resolve the entries following a bibliography heading. Entries are
    /// contiguous paragraphs, or the items of directly following lists.
    fn bibliography(&mut self, index: usize) -> Result<Option<usize>> {
        let mut end = index + 1;
        let mut texts = Vec::new();
        loop {
            match self.content.get(end) {
                Some(block @ Block::Paragraph(_)) => push_entry(&mut texts, &text_content(block)),
                Some(Block::List(list)) => {
                    for item in &list.items {
                        push_entry(&mut texts, &text_content(item));
                    }
                }
                _ => break,
            }
            end += 1;
        }
        if texts.is_empty() {
            return Ok(None);
        }

        info!("Resolving {} bibliography entries", texts.len());
        let mut refs = resolve_references(&texts, self.resolvers, self.options.batch_size())?;
        assign_reference_ids(&mut refs);
        self.work.references = Some(refs);
        Ok(Some(end - index))
    }
}

fn push_entry(texts: &mut Vec<String>, text: &str) {
    let entry = strip_ordinal(text);
    if !entry.is_empty() {
        texts.push(entry.to_string());
    }
}

fn title_of(node: &Block) -> Option<Vec<Inline>> {
    let content = match node {
        Block::Heading(h) if h.depth == 1 => &h.content,
        Block::Paragraph(p)
            if has_style(node, TITLE_STYLES) || is_emphasis(node) || is_strong(node) =>
        {
            &p.content
        }
        _ => return None,
    };
    if text_content(node).is_empty() {
        return None;
    }
    Some(strip_leading_mark(content.clone()))
}

fn keywords_of(node: &Block) -> Option<Vec<String>> {
    let Block::Paragraph(_) = node else {
        return None;
    };
    let text = text_content(node);
    let caps = PROPERTY_RE.captures(&text)?;
    if caps[1].to_lowercase() != "keywords" {
        return None;
    }
    Some(
        caps[2]
            .split([',', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// A paragraph that is one bold run reads as a section heading, unless it
/// sits next to a figure or table, or starts like a caption.
fn promote_strong(node: &Block, prev: Option<&Block>, next: Option<&Block>) -> Option<Block> {
    let Block::Paragraph(para) = node else {
        return None;
    };
    let [Inline::Strong(strong)] = para.content.as_slice() else {
        return None;
    };
    if matches!(prev, Some(Block::Figure(_))) || matches!(next, Some(Block::Table(_))) {
        return None;
    }
    let text = text_content(node);
    if text.is_empty() || NOT_A_HEADING_RE.is_match(&text) {
        return None;
    }
    Some(Block::Heading(Heading {
        depth: 1,
        content: strong.content.clone(),
        id: para.id.clone(),
        meta: para.meta.clone(),
    }))
}

fn is_bibliography_heading(node: &Block) -> bool {
    matches!(node, Block::Heading(_)) && BIBLIOGRAPHY_RE.is_match(&text_content(node))
}

/// "Jane Doe12" -> ("Jane Doe", Some("12")).
fn split_marker(segment: &str) -> (&str, Option<String>) {
    match TRAILING_MARKER_RE.captures(segment) {
        Some(caps) => match (caps.get(1), caps.get(2)) {
            (Some(name), Some(marker)) => (name.as_str().trim(), Some(marker.as_str().to_string())),
            _ => (segment, None),
        },
        None => (segment, None),
    }
}
