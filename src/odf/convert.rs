use std::borrow::Cow;

use log::{info, warn};

use crate::conftool::{Paper, PaperLookup, User};
use crate::error::Result;
use crate::odf::template::BUNDLED_TEMPLATE;
use crate::odf::{meta, sections, styles, OdfPackage, CONTENT_PART, META_PART};

/// Converts between conference ODT documents and ConfTool metadata.
///
/// Every operation works on its own copy of the archive and only produces bytes once
/// all edits succeeded, so a failure never yields a half-updated document.
pub struct OdtConverter {
    template: Cow<'static, [u8]>,
}

impl Default for OdtConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl OdtConverter {
    pub fn new() -> Self {
        Self {
            template: Cow::Borrowed(BUNDLED_TEMPLATE),
        }
    }

    pub fn with_template(template: impl Into<Cow<'static, [u8]>>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn file_extension(&self) -> &'static str {
        "odt"
    }

    /// Accepts a submitted document: template scaffolding goes, the paper id recorded in
    /// the metadata selects the paper, and title and authors are refreshed from it.
    pub fn convert(&self, source: &[u8], user: &User, lookup: &dyn PaperLookup) -> Result<Vec<u8>> {
        let mut pkg = OdfPackage::open(source)?;

        let mut content = pkg.xml_part(CONTENT_PART)?;
        styles::normalize_paragraph_styles(&mut content);
        sections::strip_template_sections(&mut content);

        let mut meta_doc = pkg.xml_part(META_PART)?;
        let paper_id = meta::paper_id_from_meta(&meta_doc)?;
        let paper = lookup.paper(user, paper_id)?;

        meta::inject_title(&mut meta_doc, &paper.title)?;
        meta::inject_authors(&mut meta_doc, &paper.authors_and_affiliations)?;

        pkg.put_xml_part(CONTENT_PART, &content);
        pkg.put_xml_part(META_PART, &meta_doc);
        let out = pkg.to_bytes()?;
        info!(
            "converted submission for paper {} ({} bytes)",
            paper.paper_id,
            out.len()
        );
        Ok(out)
    }

    /// A copy of the template with the paper's title, authors and id filled in.
    pub fn personalized_template(&self, paper: &Paper) -> Result<Vec<u8>> {
        if paper.authors_and_affiliations.is_empty() {
            warn!("paper {} has no authors", paper.paper_id);
        }
        let mut pkg = OdfPackage::open(&self.template)?;

        let mut content = pkg.xml_part(CONTENT_PART)?;
        sections::inject_title(&mut content, &paper.title)?;
        sections::inject_authors(&mut content, &paper.authors_and_affiliations)?;
        pkg.put_xml_part(CONTENT_PART, &content);

        let mut meta_doc = pkg.xml_part(META_PART)?;
        meta::inject_title(&mut meta_doc, &paper.title)?;
        meta::inject_authors(&mut meta_doc, &paper.authors_and_affiliations)?;
        meta::inject_paper_id(&mut meta_doc, paper.paper_id)?;
        pkg.put_xml_part(META_PART, &meta_doc);

        let out = pkg.to_bytes()?;
        info!("personalized template for paper {}", paper.paper_id);
        Ok(out)
    }
}

/// The ConfTool paper id recorded in a document's metadata.
pub fn paper_id_of(source: &[u8]) -> Result<i64> {
    let pkg = OdfPackage::open(source)?;
    meta::paper_id_from_meta(&pkg.xml_part(META_PART)?)
}
