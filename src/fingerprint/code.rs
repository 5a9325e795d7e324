use std::fmt;
use std::fs;
use std::path::PathBuf;

use super::{digest, strip::strip_source};
use crate::error::StorageError;

/// Point-in-time hash of a function's normalized source plus the normalized
/// contents of the configured auxiliary modules. Recomputed on every call
/// and compared against stored values; never persisted as "the" fingerprint
/// of a function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFingerprint(String);

impl CodeFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hashes the function source concatenated with each auxiliary module file,
/// all normalized the same way. Identical logic always yields an identical
/// fingerprint; edits to comments or incidental whitespace do not change it.
pub fn code_fingerprint(
    source: &str,
    auxiliary_modules: &[PathBuf],
) -> Result<CodeFingerprint, StorageError> {
    let mut text = strip_source(source);
    for path in auxiliary_modules {
        let module = fs::read_to_string(path)
            .map_err(|err| StorageError::io("reading auxiliary module", path, err))?;
        text.push_str(&strip_source(&module));
    }
    Ok(CodeFingerprint(digest(&text)))
}
