use std::collections::HashMap;

use log::debug;

use crate::xml::XmlTree;

/// Maps each automatic paragraph style to the named style it merely aliases.
pub fn automatic_paragraph_styles(tree: &XmlTree) -> HashMap<String, String> {
    let mut mapping = HashMap::new();
    for style in tree.elements_at_path(&[
        "office:document-content",
        "office:automatic-styles",
        "style:style",
    ]) {
        if !tree.has_attr_value(style, "style:family", "paragraph") {
            continue;
        }
        let (Some(adhoc), Some(defined)) = (
            tree.attr(style, "style:name"),
            tree.attr(style, "style:parent-style-name"),
        ) else {
            continue;
        };
        mapping.insert(adhoc, defined);
    }
    mapping
}

/// Points every body paragraph and heading that uses an automatic paragraph style at
/// that style's parent instead. Returns the number of rewritten references.
pub fn normalize_paragraph_styles(tree: &mut XmlTree) -> usize {
    let mapping = automatic_paragraph_styles(tree);
    if mapping.is_empty() {
        return 0;
    }

    let mut rewritten = 0usize;
    for body_text in tree.elements_at_path(&["office:document-content", "office:body", "office:text"]) {
        for id in tree.descendants(body_text) {
            if !(tree.is_element(id, "text:p") || tree.is_element(id, "text:h")) {
                continue;
            }
            let Some(defined) = tree
                .attr(id, "text:style-name")
                .and_then(|name| mapping.get(&name))
            else {
                continue;
            };
            tree.set_attr(id, "text:style-name", defined);
            rewritten += 1;
        }
    }
    debug!(
        "normalized {rewritten} paragraph style reference(s) over {} automatic style(s)",
        mapping.len()
    );
    rewritten
}
