use crate::types::{Block, Inline};

/// True if the block's `style` hint, case-folded, is one of `styles`.
/// `styles` are expected in lower case.
pub fn has_style(block: &Block, styles: &[&str]) -> bool {
    block
        .meta()
        .get("style")
        .map(|s| s.trim().to_lowercase())
        .is_some_and(|s| styles.contains(&s.as_str()))
}

pub fn is_emphasis(block: &Block) -> bool {
    matches!(first_inline(block), Some(Inline::Emphasis(_)))
}

pub fn is_strong(block: &Block) -> bool {
    matches!(first_inline(block), Some(Inline::Strong(_)))
}

/// A Paragraph or Heading with no visible inline content.
pub fn is_empty_block(block: &Block) -> bool {
    match block {
        Block::Paragraph(p) => is_blank(&p.content),
        Block::Heading(h) => is_blank(&h.content),
        _ => false,
    }
}

fn is_blank(content: &[Inline]) -> bool {
    content
        .iter()
        .all(|i| i.as_text().is_some_and(|s| s.trim().is_empty()))
}

fn first_inline(block: &Block) -> Option<&Inline> {
    block.inline_content().and_then(|c| c.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Heading, Mark, Paragraph, ThematicBreak};

    #[test]
    fn style_match_is_case_insensitive() {
        let para = Block::Paragraph(Paragraph::styled(vec![Inline::text("x")], "Title"));
        assert!(has_style(&para, &["title"]));
        assert!(!has_style(&para, &["subtitle"]));
    }

    #[test]
    fn missing_style_is_false() {
        let para = Block::Paragraph(Paragraph::new(vec![Inline::text("x")]));
        assert!(!has_style(&para, &["title"]));
        assert!(!has_style(&Block::ThematicBreak(ThematicBreak::default()), &["title"]));
    }

    #[test]
    fn leading_mark_detection() {
        let strong = Block::Paragraph(Paragraph::new(vec![
            Inline::Strong(Mark::new(vec![Inline::text("Bold")])),
            Inline::text(" tail"),
        ]));
        assert!(is_strong(&strong));
        assert!(!is_emphasis(&strong));

        let trailing = Block::Paragraph(Paragraph::new(vec![
            Inline::text("lead "),
            Inline::Emphasis(Mark::new(vec![Inline::text("it")])),
        ]));
        assert!(!is_emphasis(&trailing));
        assert!(!is_strong(&Block::ThematicBreak(ThematicBreak::default())));
    }

    #[test]
    fn empty_blocks() {
        assert!(is_empty_block(&Block::Paragraph(Paragraph::default())));
        assert!(is_empty_block(&Block::Heading(Heading::new(2, vec![Inline::text("  ")]))));
        assert!(!is_empty_block(&Block::Paragraph(Paragraph::new(vec![Inline::text("x")]))));
        assert!(!is_empty_block(&Block::ThematicBreak(ThematicBreak::default())));
    }
}
