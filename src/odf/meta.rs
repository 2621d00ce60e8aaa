//! Upserts into `meta.xml`: title, creator and the ConfTool paper id marker.

use log::debug;

use crate::error::{ConvertError, Result};
use crate::odf::ns;
use crate::xml::{NodeId, XmlTree};

pub const PAPER_ID_ATTRIBUTE_NAME: &str = "ConfToolPaperID";

const DOCUMENT_META: &str = "office:document-meta";
const META: &str = "office:meta";

fn meta_element(tree: &mut XmlTree) -> Result<NodeId> {
    let root = tree.root();
    if !tree.is_element(root, DOCUMENT_META) {
        return Err(ConvertError::InvalidMetadata(format!(
            "root element is <{}>, expected <{DOCUMENT_META}>",
            tree.name(root).unwrap_or_default()
        )));
    }
    Ok(match tree.first_child_named(root, META) {
        Some(meta) => meta,
        None => tree.append_element(root, META, &[]),
    })
}

/// Clears and refills the first `name` child of `office:meta`, creating it if absent.
fn upsert_text_element(tree: &mut XmlTree, name: &str, text: &str) -> Result<NodeId> {
    let meta = meta_element(tree)?;
    let el = match tree.first_child_named(meta, name) {
        Some(el) => el,
        None => tree.append_element(meta, name, &[]),
    };
    tree.remove_children(el);
    tree.append_text(el, text);
    Ok(el)
}

fn paper_id_markers(tree: &XmlTree) -> Vec<NodeId> {
    tree.elements_at_path(&[DOCUMENT_META, META, "meta:user-defined"])
        .into_iter()
        .filter(|id| tree.has_attr_value(*id, "meta:name", PAPER_ID_ATTRIBUTE_NAME))
        .collect()
}

pub fn inject_title(tree: &mut XmlTree, title: &str) -> Result<()> {
    tree.ensure_namespace(ns::DC.prefix, ns::DC.uri);
    upsert_text_element(tree, "dc:title", title)?;
    Ok(())
}

/// Writes all authors, joined by `"; "`, as initial creator and drops `dc:creator`.
pub fn inject_authors(tree: &mut XmlTree, authors_and_affiliations: &[String]) -> Result<()> {
    tree.ensure_namespace(ns::META.prefix, ns::META.uri);
    let creator = authors_and_affiliations.join("; ");
    let initial_creator = upsert_text_element(tree, "meta:initial-creator", &creator)?;
    if let Some(meta) = tree.parent(initial_creator) {
        if let Some(dc_creator) = tree.first_child_named(meta, "dc:creator") {
            tree.detach(dc_creator);
        }
    }
    Ok(())
}

/// Replaces every paper id marker with a single one carrying `paper_id`.
pub fn inject_paper_id(tree: &mut XmlTree, paper_id: i64) -> Result<()> {
    tree.ensure_namespace(ns::META.prefix, ns::META.uri);
    let meta = meta_element(tree)?;
    let stale = paper_id_markers(tree);
    if !stale.is_empty() {
        debug!("replacing {} existing paper id marker(s)", stale.len());
    }
    for marker in stale {
        tree.detach(marker);
    }
    let marker = tree.append_element(
        meta,
        "meta:user-defined",
        &[("meta:name", PAPER_ID_ATTRIBUTE_NAME)],
    );
    tree.append_text(marker, &paper_id.to_string());
    Ok(())
}

/// Reads the paper id marker. Absent and duplicated markers fail alike.
pub fn paper_id_from_meta(tree: &XmlTree) -> Result<i64> {
    let markers = paper_id_markers(tree);
    let [marker] = markers.as_slice() else {
        return Err(ConvertError::InvalidMetadata(format!(
            "{PAPER_ID_ATTRIBUTE_NAME} not found! (found {} markers)",
            markers.len()
        )));
    };
    let raw = tree.text_content(*marker);
    raw.trim().parse::<i64>().map_err(|e| {
        ConvertError::InvalidMetadata(format!(
            "{PAPER_ID_ATTRIBUTE_NAME} is not a number: {raw:?} ({e})"
        ))
    })
}
