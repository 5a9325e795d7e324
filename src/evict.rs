//! Eviction pass, run after every miss-path insert. Two independent
//! policies, in order: obsolete cleanup (entries recorded under a different
//! code fingerprint), then limit enforcement (oldest-touched first, exactly
//! one per pass). Cleanup failures propagate as storage failures.

use tracing::debug;

use crate::backend::Backend;
use crate::config::CacheOptions;
use crate::error::StorageError;
use crate::facility::CallContext;
use crate::fingerprint::CodeFingerprint;
use crate::registry::FunctionIdentity;

pub(crate) fn run<B: Backend>(
    backend: &B,
    ctx: &CallContext,
    options: &CacheOptions,
) -> Result<(), StorageError> {
    if options.clean_obsolete {
        clean_obsolete(backend, &ctx.identity, &ctx.code)?;
    }
    if let Some(limit) = options.max_entries {
        if limit > 0 {
            enforce_limit(backend, &ctx.identity, limit)?;
        }
    }
    Ok(())
}

/// Deletes every entry of this function whose code fingerprint differs from
/// the current one, payload first. Because this runs on every miss, stale
/// entries outlive a code change by at most one miss-cycle.
fn clean_obsolete<B: Backend>(
    backend: &B,
    identity: &FunctionIdentity,
    current_code: &CodeFingerprint,
) -> Result<(), StorageError> {
    for entry in backend.list_obsolete(identity, current_code)? {
        backend.drop_payload(identity, &entry.data_point)?;
        backend.delete(identity, entry.id)?;
        debug!(function = %identity, id = entry.id, "evicted obsolete entry");
    }
    Ok(())
}

/// Deletes exactly one entry — the oldest by timestamp — when the count
/// exceeds the limit. The count can therefore exceed the limit by at most
/// one between a miss and its eviction.
fn enforce_limit<B: Backend>(
    backend: &B,
    identity: &FunctionIdentity,
    limit: u64,
) -> Result<(), StorageError> {
    if backend.count(identity)? <= limit {
        return Ok(());
    }
    if let Some(entry) = backend.oldest_entry(identity)? {
        backend.drop_payload(identity, &entry.data_point)?;
        backend.delete(identity, entry.id)?;
        debug!(function = %identity, id = entry.id, "evicted oldest entry");
    }
    Ok(())
}
