//! Fingerprint engine: derives the two independent content hashes that key
//! the registry — one over a function's normalized source text, one over
//! its call arguments.

pub mod code;
pub mod input;
pub mod strip;

pub use code::{CodeFingerprint, code_fingerprint};
pub use input::{CallArgs, InputFingerprint, input_fingerprint};

use sha1::{Digest, Sha1};

/// Hex digest of one text blob.
pub(crate) fn digest(text: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hex digest of an ordered group of strings. Each part is fed with a unit
/// separator so `["ab", "c"]` and `["a", "bc"]` hash differently.
pub(crate) fn digest_parts<S: AsRef<str>>(parts: &[S]) -> String {
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part.as_ref().as_bytes());
        hasher.update([0x1f]);
    }
    format!("{:x}", hasher.finalize())
}
