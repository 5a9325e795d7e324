use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};

use super::digest_parts;
use crate::error::CacheError;

/// Arguments of one call, canonicalized eagerly at build time so an
/// unhashable value fails here — strictly before the cache touches storage
/// or runs the computation.
///
/// Positional order is significant; keyword arguments are held sorted by
/// key, so the order they are added in never matters.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    positional: Vec<String>,
    keyword: BTreeMap<String, String>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional argument.
    pub fn arg<T: Serialize>(mut self, value: &T) -> Result<Self, CacheError> {
        let position = format!("positional argument {}", self.positional.len());
        self.positional.push(canonical(value, &position)?);
        Ok(self)
    }

    /// Sets a keyword argument. Setting the same key twice keeps the last
    /// value, matching call semantics.
    pub fn kwarg<T: Serialize>(mut self, key: &str, value: &T) -> Result<Self, CacheError> {
        let position = format!("keyword argument `{key}`");
        self.keyword.insert(key.to_owned(), canonical(value, &position)?);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.keyword.is_empty()
    }

    fn positional_digest(&self) -> String {
        digest_parts(&self.positional)
    }

    fn keyword_digest(&self) -> String {
        let pairs: Vec<String> = self
            .keyword
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        digest_parts(&pairs)
    }
}

/// Canonical deterministic string for one argument: the value serialized to
/// JSON with object keys sorted. Values with no such form — failing
/// serializers, maps without string keys, NaN or infinite floats — yield
/// [`CacheError::Unhashable`].
fn canonical<T: Serialize>(value: &T, position: &str) -> Result<String, CacheError> {
    let unhashable = |reason: String| CacheError::Unhashable {
        position: position.to_owned(),
        reason,
    };
    // serde_json renders non-finite floats as null, which would let NaN
    // share a slot with a genuine null or with infinity. A validation pass
    // with a rejecting formatter surfaces them before anything is hashed.
    let mut validator = Serializer::with_formatter(io::sink(), RejectNonFinite);
    value
        .serialize(&mut validator)
        .map_err(|err| unhashable(err.to_string()))?;

    let json = serde_json::to_value(value).map_err(|err| unhashable(err.to_string()))?;
    Ok(json.to_string())
}

/// Formatter whose only job is to fail on NaN and infinite floats; the
/// serialized bytes go to a sink and are never kept.
struct RejectNonFinite;

impl Formatter for RejectNonFinite {
    fn write_f32<W: ?Sized + Write>(&mut self, _writer: &mut W, value: f32) -> io::Result<()> {
        ensure_finite(f64::from(value))
    }

    fn write_f64<W: ?Sized + Write>(&mut self, _writer: &mut W, value: f64) -> io::Result<()> {
        ensure_finite(value)
    }
}

fn ensure_finite(value: f64) -> io::Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("float {value} has no deterministic JSON form"),
        ))
    }
}

/// Hash over a call's arguments. Empty when the call has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFingerprint(String);

impl InputFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InputFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Positional arguments hash as one ordered group and keyword arguments as
/// another; when both are present the two digests combine into one.
pub fn input_fingerprint(args: &CallArgs) -> InputFingerprint {
    let fingerprint = match (args.positional.is_empty(), args.keyword.is_empty()) {
        (true, true) => String::new(),
        (false, true) => args.positional_digest(),
        (true, false) => args.keyword_digest(),
        (false, false) => digest_parts(&[args.positional_digest(), args.keyword_digest()]),
    };
    InputFingerprint(fingerprint)
}
