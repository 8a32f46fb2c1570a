use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Free-form style hints attached to a block (e.g. `style: "title"`).
pub type Meta = BTreeMap<String, String>;

/// A scholarly document: the flat content sequence plus the fields the
/// reshaper infers from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Vec<Inline>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authors: Option<Vec<Person>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Vec<Block>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<Reference>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Block>>,
}

/// Block-level content node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Block {
    Heading(Heading),
    Paragraph(Paragraph),
    List(List),
    Table(Table),
    CodeBlock(CodeBlock),
    Figure(Figure),
    CodeChunk(CodeChunk),
    ThematicBreak(ThematicBreak),
}

impl Block {
    pub fn meta(&self) -> &Meta {
        match self {
            Block::Heading(h) => &h.meta,
            Block::Paragraph(p) => &p.meta,
            Block::List(l) => &l.meta,
            Block::Table(t) => &t.meta,
            Block::CodeBlock(c) => &c.meta,
            Block::Figure(f) => &f.meta,
            Block::CodeChunk(c) => &c.meta,
            Block::ThematicBreak(t) => &t.meta,
        }
    }

    /// Inline content, for the variants that carry it directly.
    pub fn inline_content(&self) -> Option<&[Inline]> {
        match self {
            Block::Heading(h) => Some(&h.content),
            Block::Paragraph(p) => Some(&p.content),
            Block::Figure(f) => Some(&f.content),
            _ => None,
        }
    }
}

fn default_depth() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heading {
    #[serde(default = "default_depth")]
    pub depth: u8,
    #[serde(default)]
    pub content: Vec<Inline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

impl Heading {
    pub fn new(depth: u8, content: Vec<Inline>) -> Self {
        Self { depth, content, id: None, meta: Meta::new() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub content: Vec<Inline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

impl Paragraph {
    pub fn new(content: Vec<Inline>) -> Self {
        Self { content, id: None, meta: Meta::new() }
    }

    pub fn styled(content: Vec<Inline>, style: &str) -> Self {
        let mut meta = Meta::new();
        meta.insert("style".to_string(), style.to_string());
        Self { content, id: None, meta }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListOrder {
    Ascending,
    Descending,
    #[default]
    Unordered,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct List {
    #[serde(default)]
    pub order: ListOrder,
    #[serde(default)]
    pub items: Vec<ListItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    #[serde(default)]
    pub content: Vec<Block>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default)]
    pub rows: Vec<TableRow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<Vec<Block>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    #[serde(default)]
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub content: Vec<Inline>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeBlock {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programming_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    #[serde(default)]
    pub content: Vec<Inline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<Vec<Block>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeChunk {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub programming_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<Vec<Block>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThematicBreak {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

/// Inline-level content node. Plain text serializes as a bare JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "InlineRepr", into = "InlineRepr")]
pub enum Inline {
    Text(String),
    Emphasis(Mark),
    Strong(Mark),
    Superscript(Mark),
    Image(Media),
    Video(Media),
    Cite(Cite),
    CiteGroup(CiteGroup),
}

impl Inline {
    pub fn text(s: impl Into<String>) -> Self {
        Inline::Text(s.into())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Inline::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_media(&self) -> bool {
        matches!(self, Inline::Image(_) | Inline::Video(_))
    }

    pub fn is_citation(&self) -> bool {
        matches!(self, Inline::Cite(_) | Inline::CiteGroup(_))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum InlineRepr {
    Text(String),
    Node(InlineNode),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum InlineNode {
    Emphasis(Mark),
    Strong(Mark),
    Superscript(Mark),
    #[serde(rename = "ImageObject")]
    Image(Media),
    #[serde(rename = "VideoObject")]
    Video(Media),
    Cite(Cite),
    CiteGroup(CiteGroup),
}

impl From<InlineRepr> for Inline {
    fn from(repr: InlineRepr) -> Self {
        match repr {
            InlineRepr::Text(s) => Inline::Text(s),
            InlineRepr::Node(InlineNode::Emphasis(m)) => Inline::Emphasis(m),
            InlineRepr::Node(InlineNode::Strong(m)) => Inline::Strong(m),
            InlineRepr::Node(InlineNode::Superscript(m)) => Inline::Superscript(m),
            InlineRepr::Node(InlineNode::Image(m)) => Inline::Image(m),
            InlineRepr::Node(InlineNode::Video(m)) => Inline::Video(m),
            InlineRepr::Node(InlineNode::Cite(c)) => Inline::Cite(c),
            InlineRepr::Node(InlineNode::CiteGroup(g)) => Inline::CiteGroup(g),
        }
    }
}

impl From<Inline> for InlineRepr {
    fn from(inline: Inline) -> Self {
        match inline {
            Inline::Text(s) => InlineRepr::Text(s),
            Inline::Emphasis(m) => InlineRepr::Node(InlineNode::Emphasis(m)),
            Inline::Strong(m) => InlineRepr::Node(InlineNode::Strong(m)),
            Inline::Superscript(m) => InlineRepr::Node(InlineNode::Superscript(m)),
            Inline::Image(m) => InlineRepr::Node(InlineNode::Image(m)),
            Inline::Video(m) => InlineRepr::Node(InlineNode::Video(m)),
            Inline::Cite(c) => InlineRepr::Node(InlineNode::Cite(c)),
            Inline::CiteGroup(g) => InlineRepr::Node(InlineNode::CiteGroup(g)),
        }
    }
}

/// Emphasis, Strong and Superscript all wrap inline content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(default)]
    pub content: Vec<Inline>,
}

impl Mark {
    pub fn new(content: Vec<Inline>) -> Self {
        Self { content }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    pub content_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

/// Whether a citation reads as part of the sentence or stands apart from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CitationMode {
    Narrative,
    Parenthetical,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cite {
    /// Id of the cited entry in `Document::references`.
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation_mode: Option<CitationMode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Inline>,
}

impl Cite {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into(), citation_mode: None, content: Vec::new() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CiteGroup {
    #[serde(default)]
    pub items: Vec<Cite>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub family_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub affiliations: Vec<Organization>,
}

impl Person {
    pub fn has_family_name(&self) -> bool {
        self.family_names.iter().any(|n| !n.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
}

/// A bibliography entry: a structured record when a resolver found one,
/// otherwise the raw reference text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Work(CreativeWork),
    Text(String),
}

impl Reference {
    pub fn id(&self) -> Option<&str> {
        match self {
            Reference::Work(w) => w.id.as_deref(),
            Reference::Text(_) => None,
        }
    }
}

/// Bibliographic record. Fields a resolver knows about but this struct
/// does not name are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreativeWork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Person>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_part_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_type: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_text_serializes_as_bare_string() {
        let content = vec![
            Inline::text("See "),
            Inline::Strong(Mark::new(vec![Inline::text("this")])),
        ];
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(
            json,
            serde_json::json!(["See ", {"type": "Strong", "content": ["this"]}])
        );
        let back: Vec<Inline> = serde_json::from_value(json).unwrap();
        assert_eq!(back, content);
    }

    #[test]
    fn document_parses_from_decoder_json() {
        let doc: Document = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "Heading", "depth": 1, "content": ["My Title"]},
                    {"type": "Paragraph", "content": ["body"], "meta": {"style": "Normal"}},
                    {"type": "Paragraph", "content": [{"type": "ImageObject", "contentUrl": "a.png"}]}
                ]
            }"#,
        )
        .unwrap();
        let content = doc.content.unwrap();
        assert_eq!(content.len(), 3);
        assert_eq!(content[1].meta().get("style").map(String::as_str), Some("Normal"));
        assert!(matches!(
            content[2].inline_content(),
            Some([Inline::Image(Media { content_url, .. })]) if content_url == "a.png"
        ));
    }

    #[test]
    fn references_accept_strings_and_records() {
        let refs: Vec<Reference> = serde_json::from_str(
            r#"["Smith J. A paper. 2001.", {"id": "ref2", "title": "T", "score": 3.5}]"#,
        )
        .unwrap();
        assert_eq!(refs[0], Reference::Text("Smith J. A paper. 2001.".into()));
        let Reference::Work(work) = &refs[1] else {
            panic!("expected a structured reference");
        };
        assert_eq!(work.id.as_deref(), Some("ref2"));
        assert_eq!(work.extra.get("score"), Some(&serde_json::json!(3.5)));
    }
}
