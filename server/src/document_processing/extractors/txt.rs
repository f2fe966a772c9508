// Plain text extractor
use crate::Error;
use std::fs;
use std::path::Path;

pub struct TxtExtractor;

impl TxtExtractor {
    /// Read a plain text file verbatim. `display_name` is what the error
    /// reports, since the on-disk path may be a transient scratch file.
    pub fn extract(txt_path: impl AsRef<Path>, display_name: &str) -> crate::Result<String> {
        let bytes = fs::read(txt_path.as_ref())?;
        String::from_utf8(bytes).map_err(|_| Error::DecodeError(display_name.to_string()))
    }
}
