//! Named `text:section` anchors of the conference template.
//!
//! The marker names below are a contract with existing template files and must not
//! change without a new template version.

use log::debug;

use crate::error::{ConvertError, Result};
use crate::odf::ns;
use crate::xml::{NodeId, XmlTree};

pub const TITLE_SECTION: &str = "Title from ConfTool";
pub const AUTHORS_SECTION: &str = "Authors from ConfTool";
pub const GUIDELINES_SECTION: &str = "Guidelines";

/// Template-only sections removed before a submitted document is accepted.
pub const SCAFFOLDING_SECTIONS: [&str; 3] = [AUTHORS_SECTION, GUIDELINES_SECTION, TITLE_SECTION];

pub const TITLE_STYLE: &str = "P1";
pub const AUTHOR_STYLE: &str = "P6";

pub enum SectionContent<'a> {
    /// One paragraph styled [`TITLE_STYLE`].
    Single(&'a str),
    /// One paragraph per line styled [`AUTHOR_STYLE`], in order.
    Lines(&'a [String]),
}

/// All sections named `marker`, anywhere in the tree, in document order.
pub fn find_sections(tree: &XmlTree, marker: &str) -> Vec<NodeId> {
    tree.find_elements("text:section", "text:name", marker)
}

pub fn inject_labeled_section(
    tree: &mut XmlTree,
    marker: &str,
    content: SectionContent<'_>,
) -> Result<()> {
    let matches = find_sections(tree, marker);
    let [section] = matches.as_slice() else {
        return Err(ConvertError::AmbiguousOrMissingSection {
            marker: marker.to_string(),
            count: matches.len(),
        });
    };
    let section = *section;

    tree.ensure_namespace(ns::TEXT.prefix, ns::TEXT.uri);
    tree.remove_children(section);
    match content {
        SectionContent::Single(text) => append_paragraph(tree, section, TITLE_STYLE, text),
        SectionContent::Lines(lines) => {
            for line in lines {
                append_paragraph(tree, section, AUTHOR_STYLE, line);
            }
        }
    }
    debug!("filled section '{marker}'");
    Ok(())
}

fn append_paragraph(tree: &mut XmlTree, parent: NodeId, style: &str, text: &str) {
    let p = tree.append_element(parent, "text:p", &[("text:style-name", style)]);
    tree.append_text(p, text);
}

pub fn inject_title(tree: &mut XmlTree, title: &str) -> Result<()> {
    inject_labeled_section(tree, TITLE_SECTION, SectionContent::Single(title))
}

pub fn inject_authors(tree: &mut XmlTree, authors_and_affiliations: &[String]) -> Result<()> {
    inject_labeled_section(tree, AUTHORS_SECTION, SectionContent::Lines(authors_and_affiliations))
}

/// Removes every scaffolding section; returns how many were removed.
pub fn strip_template_sections(tree: &mut XmlTree) -> usize {
    let mut removed = 0usize;
    for marker in SCAFFOLDING_SECTIONS {
        for section in find_sections(tree, marker) {
            tree.detach(section);
            removed += 1;
        }
    }
    if removed > 0 {
        debug!("stripped {removed} template section(s)");
    }
    removed
}
