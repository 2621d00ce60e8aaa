use std::borrow::Cow;
use std::path::Path;

use log::debug;

use crate::error::Result;

pub const TEMPLATE_NAME: &str = "DH_template_v1";

/// The conference template every personalized document starts from.
pub static BUNDLED_TEMPLATE: &[u8] = include_bytes!("../../template/DH_template_v1.ott");

/// Template bytes from `path`, or the bundled template when no path is given.
pub fn load_template(path: Option<&Path>) -> Result<Cow<'static, [u8]>> {
    match path {
        Some(p) => {
            debug!("loading template from {}", p.display());
            Ok(Cow::Owned(std::fs::read(p)?))
        }
        None => Ok(Cow::Borrowed(BUNDLED_TEMPLATE)),
    }
}
