use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ParserError;

/// Raw file contents decoded to text together with the content hash.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub path: PathBuf,
    pub file_hash: String,
    pub text: String,
    pub latin1: bool,
}

pub fn read_source(path: &Path) -> Result<SourceText, ParserError> {
    let bytes = fs::read(path).map_err(|source| ParserError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_hash = blake3::hash(&bytes).to_hex().to_string();
    let (text, latin1) = decode_text(&bytes);

    Ok(SourceText {
        path: path.to_path_buf(),
        file_hash,
        text,
        latin1,
    })
}

/// Decodes UTF-8, falling back to ISO-8859-1 when the bytes are not valid
/// UTF-8. The returned flag is true when the fallback was used.
pub fn decode_text(bytes: &[u8]) -> (String, bool) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => (text.to_string(), false),
        // every Latin-1 byte maps to the code point of the same value
        Err(_) => (bytes.iter().map(|&b| b as char).collect(), true),
    }
}
