//! Data model shared by the controller, the eviction pass, and the storage
//! backends: function identities, payload references, and the registry row
//! handle returned by searches.

use std::fmt;

use chrono::{SecondsFormat, Utc};

/// Stable name scoping one registry table. Functions never share entries or
/// limits; two functions with the same name in different modules are
/// distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionIdentity {
    module: String,
    name: String,
}

impl FunctionIdentity {
    pub fn new(module: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            name: name.into(),
        }
    }

    /// The dotted form stored in the registry's `name` column.
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.module, self.name)
    }

    /// Identifier-safe form used for database file names and payload
    /// references: dots are removed, any other non `[A-Za-z0-9_]` character
    /// becomes an underscore.
    pub fn compact(&self) -> String {
        self.qualified()
            .chars()
            .filter(|ch| *ch != '.')
            .map(|ch| {
                if ch.is_ascii_alphanumeric() || ch == '_' {
                    ch
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for FunctionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.name)
    }
}

/// Unique locator for one stored payload; doubles as the payload table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadReference(String);

impl PayloadReference {
    /// Builds a fresh reference from the function's compact identity plus a
    /// high-resolution clock reading, so consecutive stores never collide.
    pub fn generate(identity: &FunctionIdentity) -> Self {
        let now = Utc::now();
        let nanos = now
            .timestamp_nanos_opt()
            .unwrap_or_else(|| now.timestamp_micros());
        Self(format!("{}_{}", identity.compact(), nanos))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PayloadReference {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for PayloadReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to one registry row, as returned by search and eviction queries.
#[derive(Debug, Clone)]
pub struct EntryRef {
    pub id: i64,
    pub data_point: PayloadReference,
}

/// Current time in the registry's `timestamp` column format: RFC 3339 UTC
/// with nanosecond precision, which sorts lexicographically.
pub(crate) fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true)
}
