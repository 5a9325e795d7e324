//! Storage capability seam. The controller and the eviction pass only ever
//! talk to the [`Backend`] trait, so alternative stores (a remote service,
//! an in-memory map, a different database) plug in without touching either.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use crate::error::StorageError;
use crate::fingerprint::{CodeFingerprint, InputFingerprint};
use crate::registry::{EntryRef, FunctionIdentity, PayloadReference};

/// The exact set of operations the cache needs from a persistent store:
/// the per-function registry table plus the payload store keyed by
/// [`PayloadReference`]. All operations are synchronous and scoped to one
/// function's table; any resources a backend acquires for an operation must
/// be released on every exit path.
pub trait Backend {
    /// Looks up the row matching the (identity, code, input) triple.
    fn search(
        &self,
        identity: &FunctionIdentity,
        code: &CodeFingerprint,
        input: &InputFingerprint,
    ) -> Result<Option<EntryRef>, StorageError>;

    /// Inserts a fresh row; `id` is assigned by the backend, monotonic
    /// within the function's table.
    fn insert(
        &self,
        identity: &FunctionIdentity,
        code: &CodeFingerprint,
        input: &InputFingerprint,
        data_point: &PayloadReference,
        timestamp: &str,
    ) -> Result<(), StorageError>;

    /// Rewrites a row's timestamp; the recency clock for limit eviction.
    fn touch(
        &self,
        identity: &FunctionIdentity,
        id: i64,
        timestamp: &str,
    ) -> Result<(), StorageError>;

    /// Rows of this function whose stored code differs from `current_code`.
    fn list_obsolete(
        &self,
        identity: &FunctionIdentity,
        current_code: &CodeFingerprint,
    ) -> Result<Vec<EntryRef>, StorageError>;

    fn count(&self, identity: &FunctionIdentity) -> Result<u64, StorageError>;

    /// The row with the minimal timestamp, ties broken by lowest id.
    fn oldest_entry(&self, identity: &FunctionIdentity) -> Result<Option<EntryRef>, StorageError>;

    fn delete(&self, identity: &FunctionIdentity, id: i64) -> Result<(), StorageError>;

    fn write_payload(
        &self,
        identity: &FunctionIdentity,
        reference: &PayloadReference,
        bytes: &[u8],
    ) -> Result<(), StorageError>;

    fn read_payload(
        &self,
        identity: &FunctionIdentity,
        reference: &PayloadReference,
    ) -> Result<Vec<u8>, StorageError>;

    fn drop_payload(
        &self,
        identity: &FunctionIdentity,
        reference: &PayloadReference,
    ) -> Result<(), StorageError>;
}
