//! Fills ConfTool paper metadata into conference document templates and cleans template
//! scaffolding out of submitted documents.

pub mod config;
pub mod conftool;
pub mod docx;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod odf;
pub mod xml;

#[cfg(test)]
mod testutil;

pub use error::{ConvertError, Result};
