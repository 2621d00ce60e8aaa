pub mod convert;
pub mod meta;
pub mod package;
pub mod sections;
pub mod styles;
pub mod template;

pub use convert::OdtConverter;
pub use package::OdfPackage;

pub const CONTENT_PART: &str = "content.xml";
pub const META_PART: &str = "meta.xml";

/// Namespace prefixes ODF parts are expected to use.
pub mod ns {
    pub struct Namespace {
        pub prefix: &'static str,
        pub uri: &'static str,
    }

    pub const TEXT: Namespace = Namespace {
        prefix: "text",
        uri: "urn:oasis:names:tc:opendocument:xmlns:text:1.0",
    };
    pub const DC: Namespace = Namespace {
        prefix: "dc",
        uri: "http://purl.org/dc/elements/1.1/",
    };
    pub const META: Namespace = Namespace {
        prefix: "meta",
        uri: "urn:oasis:names:tc:opendocument:xmlns:meta:1.0",
    };
}
