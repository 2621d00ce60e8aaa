//! Keeps only the editable permission ranges of a DOCX bibliography region.
//!
//! Paragraphs are classified one at a time; nothing is revisited.
//! Library entry point only: neither the CLI nor the C ABI reaches it.

use log::debug;

use crate::xml::{NodeId, XmlTree};

pub const BIBLIOGRAPHY_HEADING_STYLE: &str = "DH-BibliographyHeading";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParagraphState {
    /// Before a `w:permStart`: only a non-empty bibliography heading survives.
    SeekPermStart,
    /// Inside a permission range: everything survives until `w:permEnd`.
    InPerm,
}

impl ParagraphState {
    /// Classifies `paragraph`, removing it from the tree when it falls outside a range.
    pub fn handle_paragraph(self, tree: &mut XmlTree, paragraph: NodeId) -> (Self, bool) {
        match self {
            Self::SeekPermStart => {
                if tree.first_child_named(paragraph, "w:permStart").is_some() {
                    (Self::InPerm, false)
                } else if is_bibliography_heading(tree, paragraph)
                    && tree.first_child_named(paragraph, "w:r").is_some()
                {
                    (Self::SeekPermStart, false)
                } else {
                    tree.detach(paragraph);
                    (Self::SeekPermStart, true)
                }
            }
            Self::InPerm => {
                let ends = tree
                    .descendants(paragraph)
                    .into_iter()
                    .any(|id| tree.is_element(id, "w:permEnd"));
                if ends {
                    (Self::SeekPermStart, false)
                } else {
                    (Self::InPerm, false)
                }
            }
        }
    }
}

fn is_bibliography_heading(tree: &XmlTree, paragraph: NodeId) -> bool {
    tree.first_child_named(paragraph, "w:pPr")
        .and_then(|ppr| tree.first_child_named(ppr, "w:pStyle"))
        .is_some_and(|style| tree.has_attr_value(style, "w:val", BIBLIOGRAPHY_HEADING_STYLE))
}

/// Top-level `w:p` children of `w:document/w:body`, in order.
pub fn body_paragraphs(tree: &XmlTree) -> Vec<NodeId> {
    tree.elements_at_path(&["w:document", "w:body", "w:p"])
}

/// Runs the classifier over `paragraphs`; returns how many were removed.
pub fn strip_outside_permissions(tree: &mut XmlTree, paragraphs: &[NodeId]) -> usize {
    let mut state = ParagraphState::SeekPermStart;
    let mut removed = 0usize;
    for paragraph in paragraphs {
        let (next, dropped) = state.handle_paragraph(tree, *paragraph);
        if dropped {
            removed += 1;
        }
        state = next;
    }
    debug!("removed {removed} paragraph(s) outside permission ranges");
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<w:document xmlns:w="urn:w"><w:body><w:p><w:r><w:t>Instructions</w:t></w:r></w:p><w:p><w:pPr><w:pStyle w:val="DH-BibliographyHeading"/></w:pPr><w:r><w:t>Bibliography</w:t></w:r></w:p><w:p><w:pPr><w:pStyle w:val="DH-BibliographyHeading"/></w:pPr></w:p><w:p><w:permStart w:id="1"/><w:r><w:t>Entry one</w:t></w:r></w:p><w:p><w:r><w:t>Entry two</w:t></w:r></w:p><w:p><w:r><w:t>Entry three</w:t></w:r><w:permEnd w:id="1"/></w:p><w:p><w:r><w:t>Trailing note</w:t></w:r></w:p><w:sectPr/></w:body></w:document>"#;

    fn texts(tree: &XmlTree) -> Vec<String> {
        body_paragraphs(tree)
            .into_iter()
            .map(|p| tree.text_content(p))
            .collect()
    }

    #[test]
    fn keeps_heading_and_permission_range_only() {
        let mut tree = XmlTree::parse("word/document.xml", DOC.as_bytes()).expect("parse");
        let paragraphs = body_paragraphs(&tree);
        assert_eq!(strip_outside_permissions(&mut tree, &paragraphs), 3);
        assert_eq!(
            texts(&tree),
            ["Bibliography", "Entry one", "Entry two", "Entry three"]
        );
        let body = tree.elements_at_path(&["w:document", "w:body"])[0];
        assert!(tree.first_child_named(body, "w:sectPr").is_some());
    }

    #[test]
    fn transitions() {
        let mut tree = XmlTree::parse("word/document.xml", DOC.as_bytes()).expect("parse");
        let paragraphs = body_paragraphs(&tree);
        let (s, dropped) = ParagraphState::SeekPermStart.handle_paragraph(&mut tree, paragraphs[3]);
        assert_eq!((s, dropped), (ParagraphState::InPerm, false));
        let (s, _) = ParagraphState::InPerm.handle_paragraph(&mut tree, paragraphs[4]);
        assert_eq!(s, ParagraphState::InPerm);
        let (s, _) = ParagraphState::InPerm.handle_paragraph(&mut tree, paragraphs[5]);
        assert_eq!(s, ParagraphState::SeekPermStart);
    }
}
