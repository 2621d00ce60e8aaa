use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use log::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ConvertError, Result};
use crate::xml::XmlTree;

/// A zip-packaged document held in memory. Entries keep their original order,
/// compression method and timestamps; only entries replaced through
/// [`OdfPackage::put_xml_part`] change on [`OdfPackage::to_bytes`].
pub struct OdfPackage {
    pub entries: Vec<OdfEntry>,
    replacements: HashMap<String, Vec<u8>>,
}

pub struct OdfEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub compression: CompressionMethod,
    pub last_modified: zip::DateTime,
    pub unix_mode: Option<u32>,
    pub is_dir: bool,
}

impl OdfPackage {
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let corrupt = |e: zip::result::ZipError| ConvertError::CorruptArchive(e.to_string());
        let mut zip = ZipArchive::new(Cursor::new(bytes)).map_err(corrupt)?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip.by_index(i).map_err(corrupt)?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .map_err(|e| ConvertError::CorruptArchive(format!("read {}: {e}", file.name())))?;
            entries.push(OdfEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                last_modified: file.last_modified().unwrap_or_default(),
                unix_mode: file.unix_mode(),
                is_dir: file.is_dir(),
            });
        }
        debug!("opened archive with {} entries", entries.len());
        Ok(Self {
            entries,
            replacements: HashMap::new(),
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::open(&bytes)
    }

    /// Current bytes of an entry, pending replacements included.
    pub fn entry_data(&self, path: &str) -> Option<&[u8]> {
        if let Some(data) = self.replacements.get(path) {
            return Some(data.as_slice());
        }
        self.entries
            .iter()
            .find(|e| e.name == path && !e.is_dir)
            .map(|e| e.data.as_slice())
    }

    pub fn xml_part(&self, path: &str) -> Result<XmlTree> {
        let data = self
            .entry_data(path)
            .ok_or_else(|| ConvertError::MissingPart(path.to_string()))?;
        XmlTree::parse(path, data)
    }

    pub fn put_xml_part(&mut self, path: &str, tree: &XmlTree) {
        self.replacements.insert(path.to_string(), tree.to_bytes());
    }

    pub fn xml_entries(&self) -> Vec<&OdfEntry> {
        self.entries
            .iter()
            .filter(|e| e.name.to_lowercase().ends_with(".xml"))
            .collect()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut zout = ZipWriter::new(Cursor::new(Vec::new()));
        for ent in &self.entries {
            let data = self.replacements.get(&ent.name).unwrap_or(&ent.data);
            let mut opts = SimpleFileOptions::default()
                .compression_method(ent.compression)
                .last_modified_time(ent.last_modified);
            if let Some(mode) = ent.unix_mode {
                opts = opts.unix_permissions(mode);
            }
            if ent.is_dir || ent.name.ends_with('/') {
                zout.add_directory(ent.name.as_str(), opts)?;
            } else {
                zout.start_file(ent.name.as_str(), opts)?;
                zout.write_all(data)?;
            }
        }
        // Parts put under a name the archive did not have yet.
        let mut added: Vec<&String> = self
            .replacements
            .keys()
            .filter(|k| !self.entries.iter().any(|e| &e.name == *k))
            .collect();
        added.sort();
        for name in added {
            let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            zout.start_file(name.as_str(), opts)?;
            zout.write_all(&self.replacements[name])?;
        }
        let out = zout.finish()?.into_inner();
        debug!(
            "serialized archive: {} bytes, {} replaced part(s)",
            out.len(),
            self.replacements.len()
        );
        Ok(out)
    }
}
