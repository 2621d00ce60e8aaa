use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const CONTENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" office:version="1.2"><office:automatic-styles><style:style style:name="P1" style:family="paragraph" style:parent-style-name="Title"/><style:style style:name="P2" style:family="paragraph" style:parent-style-name="Text_20_body"/><style:style style:name="P3" style:family="paragraph"/><style:style style:name="T1" style:family="text" style:parent-style-name="Emphasis"/></office:automatic-styles><office:body><office:text><text:section text:style-name="Sect1" text:name="Title from ConfTool"><text:p text:style-name="P1">Your title here</text:p></text:section><text:section text:style-name="Sect1" text:name="Authors from ConfTool"><text:p text:style-name="P2">Author (Affiliation)</text:p><text:p text:style-name="P2">Second author</text:p></text:section><text:section text:name="Guidelines"><text:p>Follow the guidelines.</text:p></text:section><text:p text:style-name="P2">Body <text:span text:style-name="T1">text</text:span></text:p><text:h text:style-name="P1" text:outline-level="1">Heading</text:h><text:p text:style-name="P3">Unparented</text:p><text:list><text:list-item><text:p text:style-name="P2">Listed</text:p></text:list-item></text:list></office:text></office:body></office:document-content>"#;

pub const META_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-meta xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:meta="urn:oasis:names:tc:opendocument:xmlns:meta:1.0" xmlns:dc="http://purl.org/dc/elements/1.1/" office:version="1.2"><office:meta><meta:generator>LibreOffice</meta:generator><dc:title>Old title</dc:title><dc:creator>Someone Else</dc:creator><meta:initial-creator>Template Author</meta:initial-creator><meta:user-defined meta:name="ConfToolPaperID">7</meta:user-defined><meta:user-defined meta:name="Other">x</meta:user-defined></office:meta></office:document-meta>"#;

/// Builds an in-memory zip; `mimetype` is stored, everything else deflated.
pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zout = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        let method = if *name == "mimetype" {
            CompressionMethod::Stored
        } else {
            CompressionMethod::Deflated
        };
        let opts = SimpleFileOptions::default().compression_method(method);
        zout.start_file(*name, opts).expect("start file");
        zout.write_all(data).expect("write file");
    }
    zout.finish().expect("finish zip").into_inner()
}

pub fn build_odt(content: &str, meta: &str) -> Vec<u8> {
    build_zip(&[
        ("mimetype", b"application/vnd.oasis.opendocument.text"),
        ("content.xml", content.as_bytes()),
        ("meta.xml", meta.as_bytes()),
        ("styles.xml", b"<office:document-styles xmlns:office=\"urn:oasis:names:tc:opendocument:xmlns:office:1.0\"/>"),
    ])
}
