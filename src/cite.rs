//! Numeric citation linking and citation grouping.
//!
//! Runs after all document fields are final: `[N]` markers in inline text
//! become `Cite` nodes targeting `references[N-1]`, and citations enclosed
//! by a matching `(...)` or `[...]` pair collapse into one `CiteGroup`.

use log::debug;

use crate::markers::{NUMERIC_CITATION_RE, parse_citation_numbers};
use crate::resolve::assign_reference_ids;
use crate::types::{Block, Cite, CiteGroup, Document, Inline};

/// Link and group citations throughout the document's content and
/// description. Assigns reference ids where missing.
pub fn reshape_citations(doc: &mut Document) {
    let targets: Vec<Option<String>> = match doc.references.as_mut() {
        Some(refs) => {
            assign_reference_ids(refs);
            refs.iter().map(|r| r.id().map(str::to_string)).collect()
        }
        None => Vec::new(),
    };

    let mut visit = |inlines: &mut Vec<Inline>| {
        let linked = link_numeric_citations(std::mem::take(inlines), &targets);
        *inlines = group_citations(linked);
    };
    if let Some(blocks) = doc.content.as_mut() {
        walk_blocks(blocks, &mut visit);
    }
    if let Some(blocks) = doc.description.as_mut() {
        walk_blocks(blocks, &mut visit);
    }
}

fn walk_blocks(blocks: &mut [Block], f: &mut dyn FnMut(&mut Vec<Inline>)) {
    for block in blocks {
        match block {
            Block::Heading(h) => walk_inlines(&mut h.content, f),
            Block::Paragraph(p) => walk_inlines(&mut p.content, f),
            Block::Figure(fig) => {
                walk_inlines(&mut fig.content, f);
                if let Some(caption) = fig.caption.as_mut() {
                    walk_blocks(caption, f);
                }
            }
            Block::Table(t) => {
                for cell in t.rows.iter_mut().flat_map(|r| r.cells.iter_mut()) {
                    walk_inlines(&mut cell.content, f);
                }
                if let Some(caption) = t.caption.as_mut() {
                    walk_blocks(caption, f);
                }
            }
            Block::CodeChunk(c) => {
                if let Some(caption) = c.caption.as_mut() {
                    walk_blocks(caption, f);
                }
            }
            Block::List(l) => {
                for item in &mut l.items {
                    walk_blocks(&mut item.content, f);
                }
            }
            Block::CodeBlock(_) | Block::ThematicBreak(_) => {}
        }
    }
}

fn walk_inlines(content: &mut Vec<Inline>, f: &mut dyn FnMut(&mut Vec<Inline>)) {
    for inline in content.iter_mut() {
        if let Inline::Emphasis(m) | Inline::Strong(m) | Inline::Superscript(m) = inline {
            walk_inlines(&mut m.content, f);
        }
    }
    f(content);
}

/// Replace whitespace-preceded `[N]` / `[N, M]` markers in text with
/// `Cite` / `CiteGroup` nodes. `targets[N-1]` is the id of entry N; a
/// marker naming a missing or id-less entry stays as text.
pub fn link_numeric_citations(content: Vec<Inline>, targets: &[Option<String>]) -> Vec<Inline> {
    let mut out = Vec::with_capacity(content.len());
    for inline in content {
        match inline {
            Inline::Text(s) => split_text(&s, targets, &mut out),
            other => out.push(other),
        }
    }
    out
}

fn split_text(text: &str, targets: &[Option<String>], out: &mut Vec<Inline>) {
    let mut last = 0;
    for caps in NUMERIC_CITATION_RE.captures_iter(text) {
        let (Some(whole), Some(space)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(mut cites) = parse_citation_numbers(&caps[2])
            .and_then(|numbers| resolve_targets(&numbers, targets))
        else {
            continue;
        };
        out.push(Inline::Text(text[last..space.end()].to_string()));
        out.push(if cites.len() == 1 {
            Inline::Cite(cites.remove(0))
        } else {
            Inline::CiteGroup(CiteGroup { items: cites })
        });
        debug!("Linked citation marker {}", whole.as_str().trim());
        last = whole.end();
    }
    if last < text.len() {
        out.push(Inline::Text(text[last..].to_string()));
    }
}

fn resolve_targets(numbers: &[usize], targets: &[Option<String>]) -> Option<Vec<Cite>> {
    numbers
        .iter()
        .map(|n| {
            targets
                .get(n.checked_sub(1)?)
                .cloned()
                .flatten()
                .map(Cite::new)
        })
        .collect()
}

/// Collapse citations enclosed in `(...)` or `[...]` into one CiteGroup.
/// Citations in the run may be separated by `,` / `;` text. Each grouped
/// citation loses its narrative mode; the delimiters are kept.
pub fn group_citations(content: Vec<Inline>) -> Vec<Inline> {
    let mut out = Vec::with_capacity(content.len());
    let mut i = 0;
    while i < content.len() {
        if let Some(close) = opener(&content[i])
            && let Some(end) = citation_run(&content, i + 1, close)
        {
            out.push(content[i].clone());
            out.push(collapse(&content[i + 1..end]));
            i = end;
            continue;
        }
        out.push(content[i].clone());
        i += 1;
    }
    out
}

fn opener(inline: &Inline) -> Option<char> {
    let text = inline.as_text()?.trim_end();
    if text.ends_with('(') {
        Some(')')
    } else if text.ends_with('[') {
        Some(']')
    } else {
        None
    }
}

/// Index of the closing text node if `content[start..]` is a run of
/// citations and separators ending at `close`.
fn citation_run(content: &[Inline], start: usize, close: char) -> Option<usize> {
    let mut j = start;
    let mut expect_citation = true;
    loop {
        let node = content.get(j)?;
        if expect_citation {
            if !node.is_citation() {
                return None;
            }
            expect_citation = false;
        } else {
            match node {
                Inline::Text(s) if s.trim_start().starts_with(close) => return Some(j),
                Inline::Text(s) if is_separator(s) => expect_citation = true,
                n if n.is_citation() => {}
                _ => return None,
            }
        }
        j += 1;
    }
}

fn is_separator(text: &str) -> bool {
    matches!(text.trim(), "," | ";")
}

fn collapse(run: &[Inline]) -> Inline {
    if let [single] = run {
        return match single {
            Inline::Cite(cite) => Inline::Cite(parenthetical(cite.clone())),
            Inline::CiteGroup(group) => Inline::CiteGroup(CiteGroup {
                items: group.items.iter().cloned().map(parenthetical).collect(),
            }),
            other => other.clone(),
        };
    }
    let items = run
        .iter()
        .flat_map(|inline| match inline {
            Inline::Cite(cite) => vec![cite.clone()],
            Inline::CiteGroup(group) => group.items.clone(),
            _ => Vec::new(),
        })
        .map(parenthetical)
        .collect();
    Inline::CiteGroup(CiteGroup { items })
}

fn parenthetical(mut cite: Cite) -> Cite {
    cite.citation_mode = None;
    cite
}
