use crate::types::{Block, Cite, Inline, ListItem, Reference, TableRow};

/// Collapse any content node into the text a reader would see, trimmed.
///
/// Sequences join with a single space; a node's own `content` joins with no
/// separator; `items` join with a space. Non-textual properties such as
/// heading depth are dropped.
pub fn text_content<T: TextContent + ?Sized>(node: &T) -> String {
    node.raw_text().trim().to_string()
}

/// Concatenated, untrimmed text of an inline sequence.
pub(crate) fn inline_text(content: &[Inline]) -> String {
    content.iter().map(TextContent::raw_text).collect()
}

pub trait TextContent {
    fn raw_text(&self) -> String;
}

impl TextContent for str {
    fn raw_text(&self) -> String {
        self.to_string()
    }
}

impl TextContent for String {
    fn raw_text(&self) -> String {
        self.clone()
    }
}

impl<T: TextContent> TextContent for Option<T> {
    fn raw_text(&self) -> String {
        self.as_ref().map(TextContent::raw_text).unwrap_or_default()
    }
}

impl<T: TextContent> TextContent for [T] {
    fn raw_text(&self) -> String {
        join_items(self)
    }
}

impl<T: TextContent> TextContent for Vec<T> {
    fn raw_text(&self) -> String {
        join_items(self)
    }
}

fn join_items<T: TextContent>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.raw_text().trim().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

impl TextContent for Inline {
    fn raw_text(&self) -> String {
        match self {
            Inline::Text(s) => s.clone(),
            Inline::Emphasis(m) | Inline::Strong(m) | Inline::Superscript(m) => {
                inline_text(&m.content)
            }
            Inline::Image(_) | Inline::Video(_) => String::new(),
            Inline::Cite(cite) => cite.raw_text(),
            Inline::CiteGroup(group) => join_items(&group.items),
        }
    }
}

impl TextContent for Cite {
    fn raw_text(&self) -> String {
        inline_text(&self.content)
    }
}

impl TextContent for Block {
    fn raw_text(&self) -> String {
        match self {
            Block::Heading(h) => inline_text(&h.content),
            Block::Paragraph(p) => inline_text(&p.content),
            Block::Figure(f) => inline_text(&f.content),
            Block::CodeBlock(c) => c.text.clone(),
            Block::CodeChunk(c) => c.text.clone(),
            Block::List(l) => join_items(&l.items),
            Block::Table(t) => join_items(&t.rows),
            Block::ThematicBreak(_) => String::new(),
        }
    }
}

impl TextContent for ListItem {
    fn raw_text(&self) -> String {
        self.content.iter().map(TextContent::raw_text).collect()
    }
}

impl TextContent for TableRow {
    fn raw_text(&self) -> String {
        self.cells
            .iter()
            .map(|cell| inline_text(&cell.content).trim().to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl TextContent for Reference {
    fn raw_text(&self) -> String {
        match self {
            Reference::Text(s) => s.clone(),
            Reference::Work(w) => w.title.clone().unwrap_or_default(),
        }
    }
}
