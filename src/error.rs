use thiserror::Error;

use crate::conftool::LookupError;

/// Failures of a single document conversion. Nothing is retried locally: any of these
/// aborts the whole conversion before an archive is produced.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("archive has no entry named {0}")]
    MissingPart(String),

    #[error("malformed xml in {part}: {message}")]
    MalformedXml { part: String, message: String },

    #[error("document does not contain exactly one section element '{marker}', found: {count}")]
    AmbiguousOrMissingSection { marker: String, count: usize },

    #[error("document has invalid meta section: {0}")]
    InvalidMetadata(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("zip write error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConvertError>;
